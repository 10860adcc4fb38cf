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

//! Full-list traversal with integrity checks and inline classification.

use log::*;

use super::{
	classify::{classify, CorrectiveAction, LOG_TARGET},
	thresholds::ThresholdTable,
	weight::active_stakes,
};
use crate::{
	chain::{AccountId, ChainApi, Score},
	error::{Error, Result},
};

/// One traversed bag: its bounds and membership in chain order.
#[derive(Debug, Clone)]
pub struct BagSummary {
	pub upper: Score,
	pub head: AccountId,
	pub tail: AccountId,
	pub members: Vec<AccountId>,
}

/// The aggregate outcome of a list check.
#[derive(Debug)]
pub struct ListCheck {
	pub bags: Vec<BagSummary>,
	/// Total members visited across all bags.
	pub visited: u32,
	/// Entries that need moving, in encounter order.
	pub misplaced: Vec<CorrectiveAction>,
	/// Members excluded for missing their controller/ledger linkage.
	pub skipped: u32,
	/// False when an early-stop limit cut the traversal short; the population
	/// check is only meaningful on a complete pass.
	pub complete: bool,
}

/// Walk every bag at the pinned block, validating structure and classifying
/// each member against its canonical bag.
///
/// `stop_after` bounds the number of misplaced entries collected (the CLI's
/// numeric target); `None` checks everything. On a complete pass the visited
/// total must match the on-chain node counter, else the whole run is
/// considered corrupt and aborts.
pub async fn check_list<C: ChainApi>(
	chain: &C,
	thresholds: &ThresholdTable,
	stop_after: Option<usize>,
) -> Result<ListCheck> {
	// the independent population count doubles as the cycle-detection cap.
	let counter = chain.counter_for_list_nodes().await?;

	let mut bags = Vec::new();
	for (upper, bag) in chain.bags().await? {
		let (head, tail) = match (bag.head, bag.tail) {
			(Some(head), Some(tail)) => (head, tail),
			(None, None) => continue,
			_ => return Err(Error::HalfOpenBag { upper }),
		};
		if !thresholds.contains(upper) {
			return Err(Error::UnknownBagUpper { upper })
		}
		bags.push(BagSummary { upper, head, tail, members: Vec::new() });
	}
	// deterministic output; storage order is hash order.
	bags.sort_by_key(|bag| bag.upper);

	let mut visited = 0u32;
	let mut skipped = 0u32;
	let mut misplaced = Vec::new();
	let mut complete = true;

	'bags: for bag in bags.iter_mut() {
		walk_bag(chain, bag, counter).await?;
		visited += bag.members.len() as u32;
		info!(
			target: LOG_TARGET,
			"👜 Bag {} - {} nodes: [{} .. -> {}]",
			bag.upper,
			bag.members.len(),
			bag.head,
			if bag.head != bag.tail { bag.tail.to_string() } else { String::new() },
		);

		// ground truth for the whole bag in one fan-out.
		let weights = active_stakes(chain, &bag.members).await?;
		for (who, weight) in bag.members.iter().zip(weights) {
			let weight = match weight {
				Ok(weight) => weight,
				Err(e) => {
					warn!(target: LOG_TARGET, "😱 {e}; excluding from corrections");
					skipped += 1;
					continue
				},
			};
			let action = classify(thresholds, who, bag.upper, weight);
			if action.needs_rebag() {
				misplaced.push(action);
				// checked only after a collection, so well-placed members
				// never trigger the stop.
				if stop_after.map_or(false, |limit| misplaced.len() >= limit) {
					info!(target: LOG_TARGET, "reached the requested {} misplaced entries, stopping early", misplaced.len());
					complete = false;
					break 'bags
				}
			}
		}
	}

	info!(target: LOG_TARGET, "📊 total count of nodes: {visited}");
	info!(target: LOG_TARGET, "..of which {} need a rebag ({skipped} excluded)", misplaced.len());

	if complete && visited != counter {
		return Err(Error::CounterMismatch { traversed: visited, counter })
	}
	if !complete {
		debug!(
			target: LOG_TARGET,
			"early stop: population check against the on-chain counter ({counter}) skipped",
		);
	}

	Ok(ListCheck { bags, visited, misplaced, skipped, complete })
}

/// Follow `next` from head to tail, filling `bag.members`.
///
/// `cap` converts a corrupted pointer cycle into an error instead of a hang;
/// any single bag is bounded by the whole list's population.
async fn walk_bag<C: ChainApi>(chain: &C, bag: &mut BagSummary, cap: u32) -> Result<()> {
	let mut cursor = Some(bag.head.clone());
	while let Some(who) = cursor {
		if bag.members.len() as u32 >= cap.max(1) {
			return Err(Error::UnterminatedBag { upper: bag.upper, cap })
		}
		let node = chain
			.node(&who)
			.await?
			.ok_or_else(|| Error::MissingNode { who: who.clone() })?;
		bag.members.push(who);
		cursor = node.next;
	}

	// first == head holds by construction; the tail check guards against a
	// chain that wandered off through malformed pointers.
	match bag.members.last() {
		Some(last) if *last == bag.tail => Ok(()),
		_ => Err(Error::TailMismatch { upper: bag.upper }),
	}
}

/// Classify one account only, without a full traversal. `Ok(None)` when the
/// account is not in the list at all.
pub async fn check_single<C: ChainApi>(
	chain: &C,
	thresholds: &ThresholdTable,
	who: &AccountId,
) -> Result<Option<CorrectiveAction>> {
	let node = match chain.node(who).await? {
		Some(node) => node,
		None => return Ok(None),
	};
	let weights = active_stakes(chain, std::slice::from_ref(who)).await?;
	match weights.into_iter().next().transpose() {
		Ok(Some(weight)) => Ok(Some(classify(thresholds, who, node.bag_upper, weight))),
		Ok(None) | Err(_) => {
			warn!(target: LOG_TARGET, "😱 {who} is in the list but has no ledger");
			Ok(None)
		},
	}
}
