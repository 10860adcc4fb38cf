// Copyright (C) Parity Technologies (UK) Ltd.
// This file is part of Staking Ops.

// Staking Ops is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// Staking Ops is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with Staking Ops.  If not, see <http://www.gnu.org/licenses/>.

//! In-bag reordering: find the node a target could be put in front of.

use log::*;

use super::{classify::LOG_TARGET, weight::active_stake};
use crate::{
	chain::{AccountId, ChainApi},
	error::{Error, Result},
};

/// Scan the target's bag from its head and return the first node strictly
/// lighter than the target, i.e. the candidate for `put_in_front_of`.
///
/// `None` when the target is not in the list, is already optimally placed
/// (the scan reaches it first), or no lighter node exists ahead of it.
/// Position does not change bag membership, only processing priority within
/// the bag.
pub async fn find_lighter<C: ChainApi>(
	chain: &C,
	target: &AccountId,
) -> Result<Option<AccountId>> {
	let target_node = match chain.node(target).await? {
		Some(node) => node,
		None => {
			info!(target: LOG_TARGET, "{target} is not in the list");
			return Ok(None)
		},
	};
	let target_weight = active_stake(chain, target).await?;
	let bag = chain
		.bag(target_node.bag_upper)
		.await?
		.ok_or(Error::UnknownBagUpper { upper: target_node.bag_upper })?;

	// the whole list's population bounds any single bag.
	let cap = chain.counter_for_list_nodes().await?.max(1);
	let mut steps = 0u32;
	let mut cursor = bag.head;
	while let Some(who) = cursor {
		if who == *target {
			// everything ahead of the target is at least as heavy.
			return Ok(None)
		}
		if steps >= cap {
			return Err(Error::UnterminatedBag { upper: target_node.bag_upper, cap })
		}
		steps += 1;

		match active_stake(chain, &who).await {
			Ok(weight) if weight < target_weight => {
				info!(
					target: LOG_TARGET,
					"{target} (weight {target_weight}) can go in front of {who} (weight {weight})",
				);
				return Ok(Some(who))
			},
			Ok(_) => {},
			// a ledger-less node cannot be compared; skip it like the
			// traversal does.
			Err(Error::MissingLedger { stash }) => {
				warn!(target: LOG_TARGET, "😱 {stash} has no ledger, skipping in scan");
			},
			Err(fatal) => return Err(fatal),
		}
		cursor = chain
			.node(&who)
			.await?
			.ok_or(Error::MissingNode { who })?
			.next;
	}

	Ok(None)
}
