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

//! The immutable bag threshold ladder.

use crate::{
	chain::{ChainApi, Score},
	error::{Error, Result},
};

/// The top bag has no configured upper bound; this sentinel stands in for it.
pub const TOP_BAG: Score = Score::MAX;

/// The sorted set of bag upper bounds, fixed for the duration of a run.
#[derive(Debug, Clone)]
pub struct ThresholdTable {
	thresholds: Vec<Score>,
}

impl ThresholdTable {
	/// Fetch the ladder from the runtime. Rejects a non-ascending ladder:
	/// the canonical-bag search below relies on sortedness.
	pub async fn load<C: ChainApi>(chain: &C) -> Result<Self> {
		Self::new(chain.bag_thresholds().await?)
	}

	pub fn new(thresholds: Vec<Score>) -> Result<Self> {
		if !thresholds.windows(2).all(|pair| pair[0] < pair[1]) {
			return Err(Error::Metadata("bag thresholds are not strictly ascending".into()))
		}
		Ok(Self { thresholds })
	}

	/// The canonical bag of a weight: the smallest threshold *strictly
	/// greater* than it, or [`TOP_BAG`] when the weight clears the ladder.
	///
	/// A weight exactly at a threshold belongs to the bag above it; the same
	/// strict inequality is used everywhere in this toolkit.
	pub fn canonical_upper_for(&self, weight: Score) -> Score {
		let idx = self.thresholds.partition_point(|&t| t <= weight);
		self.thresholds.get(idx).copied().unwrap_or(TOP_BAG)
	}

	/// Whether `upper` is a bound the runtime could have assigned.
	pub fn contains(&self, upper: Score) -> bool {
		upper == TOP_BAG || self.thresholds.binary_search(&upper).is_ok()
	}

	pub fn len(&self) -> usize {
		self.thresholds.len()
	}

	pub fn is_empty(&self) -> bool {
		self.thresholds.is_empty()
	}
}
