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

//! Ground-truth weight resolution: stash -> controller -> ledger -> active.

use futures::future::join_all;

use crate::{
	chain::{AccountId, ChainApi, Score},
	error::{Error, Result},
};

/// Active stake of a stash, saturated into the list score type.
///
/// The list structure guarantees every member has a controller and a ledger,
/// so an absent hop is a state-integrity violation ([`Error::MissingLedger`]),
/// not an ordinary empty read. Callers log it and skip the entry.
pub async fn active_stake<C: ChainApi>(chain: &C, stash: &AccountId) -> Result<Score> {
	let controller = chain
		.bonded(stash)
		.await?
		.ok_or_else(|| Error::MissingLedger { stash: stash.clone() })?;
	let ledger = chain
		.ledger(&controller)
		.await?
		.ok_or_else(|| Error::MissingLedger { stash: stash.clone() })?;
	Ok(ledger.active.min(Score::MAX as u128) as Score)
}

/// Resolve the weights of many stashes concurrently (fan-out/fan-in); this is
/// the dominant performance lever of a traversal, thousands of sequential
/// two-hop reads being the practical bottleneck.
///
/// Transport errors abort; per-stash [`Error::MissingLedger`] results are kept
/// so the caller can skip-and-log individually.
pub async fn active_stakes<C: ChainApi>(
	chain: &C,
	stashes: &[AccountId],
) -> Result<Vec<Result<Score>>> {
	let results = join_all(stashes.iter().map(|stash| active_stake(chain, stash))).await;
	results
		.into_iter()
		.map(|r| match r {
			Err(e @ Error::MissingLedger { .. }) => Ok(Err(e)),
			Err(fatal) => Err(fatal),
			Ok(score) => Ok(Ok(score)),
		})
		.collect()
}
