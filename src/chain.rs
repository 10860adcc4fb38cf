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

//! Typed view over the chain state the toolkit consumes.
//!
//! Everything the engines read goes through the [`ChainApi`] trait, pinned to
//! one finalized block for the lifetime of the implementor. The RPC-backed
//! implementation lives in [`crate::client`]; tests substitute an in-memory
//! mock.

use async_trait::async_trait;
use codec::{Decode, Encode};

use crate::error::Result;

/// The bags-list score type: active stake, saturated into `u64`.
pub type Score = u64;
/// Native token amount.
pub type Balance = u128;
/// Account identity, SS58-rendered in logs.
pub type AccountId = sp_core::crypto::AccountId32;
/// Block hash.
pub type Hash = sp_core::H256;

/// One bag record, keyed in storage by its upper score bound.
///
/// Head and tail are both-or-neither: an empty bag stores neither.
#[derive(Debug, Clone, PartialEq, Eq, Decode, Encode)]
pub struct Bag {
	pub head: Option<AccountId>,
	pub tail: Option<AccountId>,
}

/// One list node. Nodes of a bag form a singly-followed chain from the bag
/// head via `next`.
///
/// Decoded as a prefix of the on-chain record: newer runtimes append a cached
/// score field which this toolkit intentionally ignores, since the score is
/// recomputed from the ledger as ground truth.
#[derive(Debug, Clone, PartialEq, Eq, Decode, Encode)]
pub struct Node {
	pub id: AccountId,
	pub prev: Option<AccountId>,
	pub next: Option<AccountId>,
	pub bag_upper: Score,
}

/// Prefix of the staking ledger record. Unlocking chunks and claimed-rewards
/// history are not read by any command and left undecoded.
#[derive(Debug, Clone, PartialEq, Eq, Decode, Encode)]
pub struct StakingLedger {
	pub stash: AccountId,
	#[codec(compact)]
	pub total: Balance,
	#[codec(compact)]
	pub active: Balance,
}

/// `MigrationLimits` of the state-trie-migration pallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Decode, Encode)]
pub struct MigrationLimits {
	pub size: u32,
	pub item: u32,
}

/// Cursor of one half (top or child trie) of the migration.
#[derive(Debug, Clone, PartialEq, Eq, Decode, Encode)]
pub enum MigrationProgress {
	ToStart,
	LastKey(Vec<u8>),
	Complete,
}

/// The full migration task. Re-encoded verbatim as the witness argument of
/// `continue_migrate`, so every field must round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Decode, Encode)]
pub struct MigrationTask {
	pub progress_top: MigrationProgress,
	pub progress_child: MigrationProgress,
	pub size: u32,
	pub top_items: u32,
	pub child_items: u32,
}

impl Default for MigrationTask {
	fn default() -> Self {
		Self {
			progress_top: MigrationProgress::ToStart,
			progress_child: MigrationProgress::ToStart,
			size: 0,
			top_items: 0,
			child_items: 0,
		}
	}
}

impl MigrationTask {
	/// The migration is done once the top-trie cursor reports complete; the
	/// child cursor completes strictly earlier.
	pub fn is_finished(&self) -> bool {
		matches!(self.progress_top, MigrationProgress::Complete)
	}
}

/// All domain-level reads the engines consume, at one pinned block.
///
/// Submission-time data (nonces, current migration witnesses) is intentionally
/// *not* behind this trait: transactions execute against whatever the state is
/// at inclusion, so pinning would be misleading there.
#[async_trait]
pub trait ChainApi: Sync {
	/// The immutable threshold ladder, ascending.
	async fn bag_thresholds(&self) -> Result<Vec<Score>>;
	/// All bag records, in storage order, with their upper bounds.
	async fn bags(&self) -> Result<Vec<(Score, Bag)>>;
	/// A single bag record.
	async fn bag(&self, upper: Score) -> Result<Option<Bag>>;
	/// A single list node.
	async fn node(&self, who: &AccountId) -> Result<Option<Node>>;
	/// Stash -> controller.
	async fn bonded(&self, stash: &AccountId) -> Result<Option<AccountId>>;
	/// Controller -> ledger.
	async fn ledger(&self, controller: &AccountId) -> Result<Option<StakingLedger>>;
	/// Independent on-chain population counter of the list.
	async fn counter_for_list_nodes(&self) -> Result<u32>;
	async fn counter_for_nominators(&self) -> Result<u32>;
	async fn counter_for_validators(&self) -> Result<u32>;
	/// All nominator stashes, with the number of votes each casts.
	async fn nominators(&self) -> Result<Vec<(AccountId, u32)>>;
	/// All staking ledgers, keyed by controller.
	async fn ledgers(&self) -> Result<Vec<(AccountId, StakingLedger)>>;
	/// Number of slashing spans of a stash, as `reap_stash` wants it.
	async fn slashing_spans(&self, stash: &AccountId) -> Result<u32>;
	async fn min_nominator_bond(&self) -> Result<Balance>;
	/// The chill ratio threshold, percent, if set.
	async fn chill_threshold(&self) -> Result<Option<u8>>;
	async fn max_nominators_count(&self) -> Result<Option<u32>>;
	async fn max_validators_count(&self) -> Result<Option<u32>>;
	/// The existential deposit constant.
	async fn existential_deposit(&self) -> Result<Balance>;
	/// `SignedMigrationMaxLimits`, if the pallet is configured for signed
	/// migration.
	async fn migration_max_limits(&self) -> Result<Option<MigrationLimits>>;
	/// Current migration task. Read *unpinned*: it is a submission witness.
	async fn migration_process(&self) -> Result<MigrationTask>;
	/// Free balance of an account, unpinned (fee accounting around
	/// submissions).
	async fn free_balance(&self, who: &AccountId) -> Result<Balance>;
}
