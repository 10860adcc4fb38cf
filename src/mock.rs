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

//! In-memory chain state and submitter for tests.

use std::{
	collections::{BTreeMap, VecDeque},
	sync::Mutex,
};

use async_trait::async_trait;
use sp_runtime::{DispatchError, ModuleError};

use crate::{
	chain::{
		AccountId, Bag, Balance, ChainApi, MigrationLimits, MigrationTask, Node, Score,
		StakingLedger,
	},
	error::Result,
	tx::{DryRunOutcome, EncodedCall, InclusionReport, Submitter},
};

pub fn acc(n: u8) -> AccountId {
	AccountId::new([n; 32])
}

/// A [`DispatchError::Module`] with the given pallet and error indices, as a
/// dry-run outcome.
pub fn module_error(pallet_index: u8, error_index: u8) -> DryRunOutcome {
	DryRunOutcome::Dispatch(DispatchError::Module(ModuleError {
		index: pallet_index,
		error: [error_index, 0, 0, 0],
		message: None,
	}))
}

/// Builder-style fake of [`ChainApi`], consistent by construction unless a
/// `with_*` corruption is applied.
#[derive(Default)]
pub struct MockChain {
	thresholds: Vec<Score>,
	bags: BTreeMap<Score, Bag>,
	nodes: BTreeMap<AccountId, Node>,
	bonded: BTreeMap<AccountId, AccountId>,
	ledgers: BTreeMap<AccountId, StakingLedger>,
	nominators: BTreeMap<AccountId, u32>,
	slashing_spans: BTreeMap<AccountId, u32>,
	free_balances: BTreeMap<AccountId, Balance>,
	counter_for_list_nodes: Option<u32>,
	counter_for_validators: u32,
	min_nominator_bond: Balance,
	chill_threshold: Option<u8>,
	max_nominators_count: Option<u32>,
	max_validators_count: Option<u32>,
	existential_deposit: Balance,
	migration_max_limits: Option<MigrationLimits>,
	migration_task: MigrationTask,
}

impl MockChain {
	pub fn new(thresholds: Vec<Score>) -> Self {
		Self { thresholds, ..Default::default() }
	}

	/// Append a fully-wired list member to the bag stored under `upper`:
	/// node chained at the bag tail, self-bonded stash, ledger with the given
	/// active stake.
	pub fn with_member(mut self, who: AccountId, upper: Score, active: Balance) -> Self {
		self.link_into_bag(who.clone(), upper);
		self = self.with_dangling_controller(who.clone());
		self.ledgers
			.insert(who.clone(), StakingLedger { stash: who, total: active, active });
		self
	}

	/// A member that is in the list but has no staking records at all.
	pub fn with_ledgerless_member(mut self, who: AccountId, upper: Score) -> Self {
		self.link_into_bag(who, upper);
		self
	}

	/// Bonded without a ledger under the controller.
	pub fn with_dangling_controller(mut self, stash: AccountId) -> Self {
		self.bonded.insert(stash.clone(), stash);
		self
	}

	/// A bonded nominator (not necessarily in the bags) casting `votes`.
	pub fn with_nominator(mut self, who: AccountId, active: Balance, votes: u32) -> Self {
		self = self.with_dangling_controller(who.clone());
		self.ledgers
			.insert(who.clone(), StakingLedger { stash: who.clone(), total: active, active });
		self.nominators.insert(who, votes);
		self
	}

	/// A nominator entry whose ledger lookup will fail.
	pub fn with_ledgerless_nominator(mut self, who: AccountId, votes: u32) -> Self {
		self.nominators.insert(who, votes);
		self
	}

	/// A raw ledger entry keyed by an explicit controller.
	pub fn with_ledger_entry(
		mut self,
		controller: AccountId,
		stash: AccountId,
		total: Balance,
		active: Balance,
	) -> Self {
		self.bonded.insert(stash.clone(), controller.clone());
		self.ledgers.insert(controller, StakingLedger { stash, total, active });
		self
	}

	pub fn with_slashing_spans(mut self, stash: AccountId, spans: u32) -> Self {
		self.slashing_spans.insert(stash, spans);
		self
	}

	pub fn with_free_balance(mut self, who: AccountId, balance: Balance) -> Self {
		self.free_balances.insert(who, balance);
		self
	}

	pub fn with_counter_for_list_nodes(mut self, counter: u32) -> Self {
		self.counter_for_list_nodes = Some(counter);
		self
	}

	pub fn with_counter_for_validators(mut self, counter: u32) -> Self {
		self.counter_for_validators = counter;
		self
	}

	pub fn with_min_nominator_bond(mut self, bond: Balance) -> Self {
		self.min_nominator_bond = bond;
		self
	}

	pub fn with_chill_threshold(mut self, percent: u8) -> Self {
		self.chill_threshold = Some(percent);
		self
	}

	pub fn with_max_nominators_count(mut self, max: u32) -> Self {
		self.max_nominators_count = Some(max);
		self
	}

	pub fn with_max_validators_count(mut self, max: u32) -> Self {
		self.max_validators_count = Some(max);
		self
	}

	pub fn with_existential_deposit(mut self, ed: Balance) -> Self {
		self.existential_deposit = ed;
		self
	}

	pub fn with_migration_limits(mut self, size: u32, item: u32) -> Self {
		self.migration_max_limits = Some(MigrationLimits { size, item });
		self
	}

	pub fn with_migration_task(mut self, task: MigrationTask) -> Self {
		self.migration_task = task;
		self
	}

	/// Corrupt the bag stored under `upper` into head-less form.
	pub fn with_headless_bag(mut self, upper: Score) -> Self {
		self.bags.get_mut(&upper).expect("bag must exist to corrupt").head = None;
		self
	}

	/// Point the bag's stored tail at an account other than its real chain
	/// end.
	pub fn with_wrong_tail(mut self, upper: Score, tail: AccountId) -> Self {
		self.bags.get_mut(&upper).expect("bag must exist to corrupt").tail = Some(tail);
		self
	}

	/// Point a node's `next` at an account with no node record.
	pub fn with_dangling_next(mut self, who: AccountId, next: AccountId) -> Self {
		self.nodes.get_mut(&who).expect("node must exist to corrupt").next = Some(next);
		self
	}

	/// Point the tail of the bag under `upper` back at its head.
	pub fn with_cycle(mut self, upper: Score) -> Self {
		let bag = self.bags.get(&upper).expect("bag must exist to corrupt").clone();
		let (head, tail) = (bag.head.expect("non-empty"), bag.tail.expect("non-empty"));
		self.nodes.get_mut(&tail).expect("tail node exists").next = Some(head);
		self
	}

	fn link_into_bag(&mut self, who: AccountId, upper: Score) {
		let bag = self.bags.entry(upper).or_insert(Bag { head: None, tail: None });
		let prev = bag.tail.clone();
		if let Some(prev) = &prev {
			self.nodes.get_mut(prev).expect("tail node exists").next = Some(who.clone());
		} else {
			bag.head = Some(who.clone());
		}
		bag.tail = Some(who.clone());
		self.nodes.insert(who.clone(), Node { id: who, prev, next: None, bag_upper: upper });
	}
}

#[async_trait]
impl ChainApi for MockChain {
	async fn bag_thresholds(&self) -> Result<Vec<Score>> {
		Ok(self.thresholds.clone())
	}

	async fn bags(&self) -> Result<Vec<(Score, Bag)>> {
		Ok(self.bags.iter().map(|(upper, bag)| (*upper, bag.clone())).collect())
	}

	async fn bag(&self, upper: Score) -> Result<Option<Bag>> {
		Ok(self.bags.get(&upper).cloned())
	}

	async fn node(&self, who: &AccountId) -> Result<Option<Node>> {
		Ok(self.nodes.get(who).cloned())
	}

	async fn bonded(&self, stash: &AccountId) -> Result<Option<AccountId>> {
		Ok(self.bonded.get(stash).cloned())
	}

	async fn ledger(&self, controller: &AccountId) -> Result<Option<StakingLedger>> {
		Ok(self.ledgers.get(controller).cloned())
	}

	async fn counter_for_list_nodes(&self) -> Result<u32> {
		Ok(self.counter_for_list_nodes.unwrap_or(self.nodes.len() as u32))
	}

	async fn counter_for_nominators(&self) -> Result<u32> {
		Ok(self.nominators.len() as u32)
	}

	async fn counter_for_validators(&self) -> Result<u32> {
		Ok(self.counter_for_validators)
	}

	async fn nominators(&self) -> Result<Vec<(AccountId, u32)>> {
		Ok(self.nominators.iter().map(|(who, votes)| (who.clone(), *votes)).collect())
	}

	async fn ledgers(&self) -> Result<Vec<(AccountId, StakingLedger)>> {
		Ok(self
			.ledgers
			.iter()
			.map(|(controller, ledger)| (controller.clone(), ledger.clone()))
			.collect())
	}

	async fn slashing_spans(&self, stash: &AccountId) -> Result<u32> {
		Ok(self.slashing_spans.get(stash).copied().unwrap_or(0))
	}

	async fn min_nominator_bond(&self) -> Result<Balance> {
		Ok(self.min_nominator_bond)
	}

	async fn chill_threshold(&self) -> Result<Option<u8>> {
		Ok(self.chill_threshold)
	}

	async fn max_nominators_count(&self) -> Result<Option<u32>> {
		Ok(self.max_nominators_count)
	}

	async fn max_validators_count(&self) -> Result<Option<u32>> {
		Ok(self.max_validators_count)
	}

	async fn existential_deposit(&self) -> Result<Balance> {
		Ok(self.existential_deposit)
	}

	async fn migration_max_limits(&self) -> Result<Option<MigrationLimits>> {
		Ok(self.migration_max_limits)
	}

	async fn migration_process(&self) -> Result<MigrationTask> {
		Ok(self.migration_task.clone())
	}

	async fn free_balance(&self, who: &AccountId) -> Result<Balance> {
		Ok(self.free_balances.get(who).copied().unwrap_or(0))
	}
}

/// Recording [`Submitter`] with a scriptable dry-run sequence.
pub struct MockSubmitter {
	script: Mutex<VecDeque<DryRunOutcome>>,
	fallback: DryRunOutcome,
	dry_runs: Mutex<usize>,
	submitted: Mutex<Vec<EncodedCall>>,
}

impl MockSubmitter {
	pub fn succeeding() -> Self {
		Self::scripted(vec![])
	}

	pub fn failing_dry_run() -> Self {
		Self {
			fallback: DryRunOutcome::Dispatch(DispatchError::BadOrigin),
			..Self::scripted(vec![])
		}
	}

	/// Dry-runs pop outcomes off `script` in order; once exhausted, every
	/// further dry-run succeeds.
	pub fn scripted(script: Vec<DryRunOutcome>) -> Self {
		Self {
			script: Mutex::new(script.into()),
			fallback: DryRunOutcome::Success,
			dry_runs: Mutex::new(0),
			submitted: Mutex::new(Vec::new()),
		}
	}

	pub fn dry_runs(&self) -> usize {
		*self.dry_runs.lock().unwrap()
	}

	pub fn broadcast_invoked(&self) -> bool {
		!self.submitted.lock().unwrap().is_empty()
	}

	pub fn submissions(&self) -> usize {
		self.submitted.lock().unwrap().len()
	}

	pub fn last_submitted(&self) -> Option<EncodedCall> {
		self.submitted.lock().unwrap().last().cloned()
	}
}

#[async_trait]
impl Submitter for MockSubmitter {
	async fn dry_run(&self, _call: &EncodedCall) -> Result<DryRunOutcome> {
		*self.dry_runs.lock().unwrap() += 1;
		Ok(self
			.script
			.lock()
			.unwrap()
			.pop_front()
			.unwrap_or_else(|| self.fallback.clone()))
	}

	async fn submit_and_finalize(&self, call: &EncodedCall) -> Result<InclusionReport> {
		self.submitted.lock().unwrap().push(call.clone());
		Ok(InclusionReport {
			tx_hash: Default::default(),
			in_block: Default::default(),
			finalized: Default::default(),
		})
	}
}
