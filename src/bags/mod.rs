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

//! The semi-sorted bags-list: threshold table, weight lookup, traversal and
//! validation, canonical-bag classification, and in-bag repositioning.

pub mod classify;
pub mod reposition;
pub mod thresholds;
pub mod traverse;
pub mod weight;

pub use classify::{classify, CorrectiveAction};
pub use reposition::find_lighter;
pub use thresholds::{ThresholdTable, TOP_BAG};
pub use traverse::{check_list, check_single, BagSummary, ListCheck};
pub use weight::{active_stake, active_stakes};
