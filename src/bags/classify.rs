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

//! Misplacement classification of visited entries.

use log::*;

use super::thresholds::ThresholdTable;
use crate::chain::{AccountId, Score};

pub(crate) const LOG_TARGET: &str = "bags";

/// The per-entry verdict. Computed fresh per traversal run, consumed straight
/// into a transaction batch, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrectiveAction {
	/// Correct spot.
	None,
	/// Canonical bag is above the stored one: grown stake, the common case.
	RebagHigher { who: AccountId, from: Score, to: Score },
	/// Canonical bag is below the stored one: shrunk stake. Rare: ordinary
	/// unbonding keeps `active` until withdrawal, so this usually means a
	/// slash and is worth operator attention.
	RebagLower { who: AccountId, from: Score, to: Score },
}

impl CorrectiveAction {
	pub fn needs_rebag(&self) -> bool {
		!matches!(self, Self::None)
	}

	pub fn who(&self) -> Option<&AccountId> {
		match self {
			Self::None => None,
			Self::RebagHigher { who, .. } | Self::RebagLower { who, .. } => Some(who),
		}
	}
}

/// Compare an entry's stored bag against its canonical one.
///
/// Pure; the weight comes in resolved so that ground truth is computed exactly
/// once per entry per run, by the caller's fan-out.
pub fn classify(
	thresholds: &ThresholdTable,
	who: &AccountId,
	stored_upper: Score,
	weight: Score,
) -> CorrectiveAction {
	let canonical = thresholds.canonical_upper_for(weight);
	if canonical > stored_upper {
		info!(
			target: LOG_TARGET,
			"\t ☝️ {who} needs a rebag from {stored_upper} to higher {canonical} [real weight = {weight}]",
		);
		CorrectiveAction::RebagHigher { who: who.clone(), from: stored_upper, to: canonical }
	} else if canonical < stored_upper {
		warn!(
			target: LOG_TARGET,
			"\t 👇 ☢️ {who} needs a rebag from {stored_upper} to lower {canonical} [real weight = {weight}]",
		);
		CorrectiveAction::RebagLower { who: who.clone(), from: stored_upper, to: canonical }
	} else {
		CorrectiveAction::None
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::mock::acc;

	fn table() -> ThresholdTable {
		ThresholdTable::new(vec![50, 100, 200]).unwrap()
	}

	#[test]
	fn grown_entry_goes_higher() {
		// weight 150 stored in the 100 bag, ladder [50, 100, 200]: canonical
		// is 200.
		assert_eq!(
			classify(&table(), &acc(1), 100, 150),
			CorrectiveAction::RebagHigher { who: acc(1), from: 100, to: 200 },
		);
	}

	#[test]
	fn shrunk_entry_goes_lower() {
		assert_eq!(
			classify(&table(), &acc(1), 200, 10),
			CorrectiveAction::RebagLower { who: acc(1), from: 200, to: 50 },
		);
	}

	#[test]
	fn entry_at_its_bag_value_is_correct_under_strict_greater_than() {
		// weight exactly equal to the bound of the bag *below* the stored one
		// means the stored bag is canonical.
		for (stored, weight) in [(100, 50), (100, 99), (200, 100), (50, 0)] {
			assert_eq!(classify(&table(), &acc(1), stored, weight), CorrectiveAction::None);
		}
	}

	#[test]
	fn classification_is_idempotent() {
		let first = classify(&table(), &acc(1), 100, 150);
		let second = classify(&table(), &acc(1), 100, 150);
		assert_eq!(first, second);
	}
}
