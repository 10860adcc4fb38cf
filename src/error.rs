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

//! Error taxonomy shared by all commands.

use crate::chain::{AccountId, Score};

/// Everything that can go wrong while checking or repairing on-chain state.
///
/// The structural variants (`CounterMismatch`, `UnknownBagUpper`, `HalfOpenBag`,
/// `UnterminatedBag`, `MissingNode`) are fatal: they mean the traversal or the
/// source structure itself is inconsistent and no partial correction should be
/// attempted. `MissingLedger` is the one integrity violation callers are
/// expected to log and skip.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// RPC transport or node-side failure.
	#[error("rpc: {0}")]
	Rpc(#[from] jsonrpsee::core::ClientError),
	/// A storage value or RPC response failed to SCALE-decode.
	#[error("codec: {0}")]
	Codec(#[from] codec::Error),
	/// Runtime metadata is missing something we rely on.
	#[error("metadata: {0}")]
	Metadata(String),
	/// Invalid parameter combination, detected before any transaction activity.
	#[error("invalid configuration: {0}")]
	Config(String),
	/// The traversal visited a different number of nodes than the on-chain
	/// counter claims exist.
	#[error("node count mismatch: traversed {traversed}, on-chain counter says {counter}")]
	CounterMismatch { traversed: u32, counter: u32 },
	/// A stored bag upper bound is not a member of the threshold ladder.
	#[error("bag upper {upper} is not a member of the threshold ladder")]
	UnknownBagUpper { upper: Score },
	/// A bag has a head without a tail, or vice versa.
	#[error("bag {upper} has a head or a tail, but not both")]
	HalfOpenBag { upper: Score },
	/// Following `next` pointers did not reach the bag tail within the
	/// on-chain population bound. Almost certainly a cycle.
	#[error("bag {upper} did not terminate within {cap} nodes")]
	UnterminatedBag { upper: Score, cap: u32 },
	/// A bag's chain ended somewhere other than its stored tail.
	#[error("bag {upper} terminated at a node other than its tail")]
	TailMismatch { upper: Score },
	/// A node referenced by a head or `next` pointer does not exist.
	#[error("list node {who} does not exist")]
	MissingNode { who: AccountId },
	/// A list member without the controller/ledger linkage the staking pallet
	/// guarantees. Logged and skipped by the callers, never fatal on its own.
	#[error("stash {stash} is missing its controller or ledger")]
	MissingLedger { stash: AccountId },
	/// The simulated transaction was rejected.
	#[error("dry-run rejected the transaction: {0}")]
	DryRun(String),
	/// The transaction was included but its dispatch failed, despite a clean
	/// dry-run. State changed between simulation and inclusion.
	#[error("transaction failed after a clean dry-run ({0}); state changed before inclusion")]
	PostDispatch(String),
	/// A key that was enumerated at the pinned block has no value at that same
	/// block. Should be impossible; indicates a misbehaving node.
	#[error("storage value for {0} vanished under the pinned block")]
	VanishedValue(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
