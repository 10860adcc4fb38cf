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

//! Operator toolkit for staking chains with a bags-list style semi-sorted
//! voter list.
//!
//! Everything reads chain state pinned to one finalized block, computes a set
//! of corrective transactions locally, simulates them via the node's dry-run
//! RPC, and only then (on explicit request) signs and broadcasts. The
//! subcommands cover rebagging misplaced list members, in-bag repositioning,
//! chilling under-bonded nominators, reaping dusted stashes, and driving the
//! signed state-trie migration.

pub mod bags;
pub mod chain;
pub mod cli;
pub mod client;
pub mod error;
pub mod migration;
pub mod signer;
pub mod staking;
pub mod tx;

#[cfg(test)]
pub(crate) mod mock;
