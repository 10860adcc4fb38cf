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

//! Signed state-trie migration driver with adaptive item-limit backoff.

use log::*;
use num_format::{Locale, ToFormattedString};

use crate::{
	chain::{AccountId, ChainApi, MigrationLimits},
	error::{Error, Result},
	tx::{CallBuilder, DryRunOutcome, Submitter},
};

const LOG_TARGET: &str = "migration";

/// `SizeUpperBoundExceeded` in the state-trie-migration pallet.
const SIZE_UPPER_BOUND_EXCEEDED: u8 = 3;

/// Drive `continue_migrate` rounds until the top-trie cursor completes or
/// `count` rounds were finalized.
///
/// Each round re-reads the current task as its witness, simulates, and on a
/// `SizeUpperBoundExceeded` halves the item limit and retries; the byte limit
/// is never reduced, since a single oversized key must still fit. Hitting an
/// item limit of zero aborts: the next key cannot be migrated within twice
/// the byte limit and the operator has to pick new limits.
pub async fn run_migration<C: ChainApi, S: Submitter>(
	chain: &C,
	submitter: &S,
	builder: &CallBuilder,
	who: &AccountId,
	item_limit: u32,
	size_limit: u32,
	count: Option<usize>,
) -> Result<()> {
	let max = chain.migration_max_limits().await?.ok_or_else(|| {
		Error::Config("SignedMigrationMaxLimits is unset; signed migration is disabled".into())
	})?;
	if item_limit > max.item || size_limit > max.size {
		return Err(Error::Config(format!(
			"limits exceed the chain maximum: max {max:?}, requested {item_limit} items / {size_limit} bytes",
		)))
	}
	if item_limit == 0 {
		return Err(Error::Config("item limit must be at least 1".into()))
	}
	let pallet_index = builder
		.migration_pallet_index()
		.ok_or_else(|| Error::Metadata("state-trie-migration pallet not present".into()))?;

	let mut rounds = 0usize;
	loop {
		let task = chain.migration_process().await?;
		if task.is_finished() {
			info!(target: LOG_TARGET, "💯 migration is complete, nothing left to do");
			return Ok(())
		}
		info!(target: LOG_TARGET, "🎬 current task is {task:?}");

		let pre_balance = chain.free_balance(who).await?;
		migrate_one_round(chain, submitter, builder, pallet_index, item_limit, size_limit)
			.await?;
		let post_balance = chain.free_balance(who).await?;
		info!(
			target: LOG_TARGET,
			"💸 spent {} on submission",
			pre_balance.saturating_sub(post_balance).to_formatted_string(&Locale::en),
		);

		rounds += 1;
		if count.map_or(false, |count| rounds >= count) {
			info!(target: LOG_TARGET, "🛑 reached count limit {rounds}");
			return Ok(())
		}
	}
}

/// One finalized `continue_migrate`, halving the item limit until the
/// simulation accepts it.
async fn migrate_one_round<C: ChainApi, S: Submitter>(
	chain: &C,
	submitter: &S,
	builder: &CallBuilder,
	pallet_index: u8,
	item_limit: u32,
	size_limit: u32,
) -> Result<()> {
	let mut items = item_limit;
	loop {
		let limits = MigrationLimits { size: size_limit, item: items };
		// the witness must be the task exactly as the runtime will see it.
		let witness = chain.migration_process().await?;
		let call = builder.continue_migrate(limits, size_limit * 2, &witness)?;

		let outcome = submitter.dry_run(&call).await?;
		debug!(target: LOG_TARGET, "🌵 dry-run of {items} items: {outcome:?}");
		match outcome {
			DryRunOutcome::Success => {
				// post-inclusion verification failing here means the limits
				// passed simulation but not the real block; propagate.
				submitter.submit_and_finalize(&call).await?;
				return Ok(())
			},
			outcome if outcome.is_module_error(pallet_index, SIZE_UPPER_BOUND_EXCEEDED) => {
				items /= 2;
				if items == 0 {
					return Err(Error::DryRun(format!(
						"cannot fit even one key within 2x{size_limit} bytes; rerun with a larger size limit",
					)))
				}
				info!(
					target: LOG_TARGET,
					"🖖 halving the number of items to migrate from {item_limit} to {items}",
				);
			},
			DryRunOutcome::Dispatch(e) => {
				return Err(Error::DryRun(format!("unexpected dispatch error: {e:?}")))
			},
			DryRunOutcome::Invalid(detail) => return Err(Error::DryRun(detail)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		chain::{MigrationProgress, MigrationTask},
		mock::{acc, module_error, MockChain, MockSubmitter},
		tx::test_call_builder,
	};
	use assert_matches::assert_matches;
	use sp_runtime::DispatchError;

	const MIGRATION_PALLET: u8 = 98;

	fn unfinished_chain() -> MockChain {
		MockChain::new(vec![]).with_migration_limits(4096, 1024)
	}

	#[tokio::test]
	async fn finished_task_is_a_no_op() {
		let chain = unfinished_chain().with_migration_task(MigrationTask {
			progress_top: MigrationProgress::Complete,
			..Default::default()
		});
		let submitter = MockSubmitter::succeeding();
		run_migration(&chain, &submitter, &test_call_builder(), &acc(1), 1000, 2048, None)
			.await
			.unwrap();
		assert_eq!(submitter.dry_runs(), 0);
	}

	#[tokio::test]
	async fn halves_twice_then_submits() {
		let chain = unfinished_chain();
		let submitter = MockSubmitter::scripted(vec![
			module_error(MIGRATION_PALLET, SIZE_UPPER_BOUND_EXCEEDED),
			module_error(MIGRATION_PALLET, SIZE_UPPER_BOUND_EXCEEDED),
		]);
		let builder = test_call_builder();
		run_migration(&chain, &submitter, &builder, &acc(1), 1000, 2048, Some(1))
			.await
			.unwrap();

		assert_eq!(submitter.dry_runs(), 3);
		let expected = builder
			.continue_migrate(
				MigrationLimits { size: 2048, item: 250 },
				4096,
				&MigrationTask::default(),
			)
			.unwrap();
		assert_eq!(submitter.last_submitted().unwrap(), expected);
	}

	#[tokio::test]
	async fn backoff_floor_aborts() {
		let chain = unfinished_chain();
		// item limit 4 survives two halvings, the third hits zero.
		let submitter = MockSubmitter::scripted(vec![
			module_error(MIGRATION_PALLET, SIZE_UPPER_BOUND_EXCEEDED),
			module_error(MIGRATION_PALLET, SIZE_UPPER_BOUND_EXCEEDED),
			module_error(MIGRATION_PALLET, SIZE_UPPER_BOUND_EXCEEDED),
		]);
		let result =
			run_migration(&chain, &submitter, &test_call_builder(), &acc(1), 4, 2048, Some(1))
				.await;

		assert_matches!(result, Err(Error::DryRun(_)));
		assert_eq!(submitter.dry_runs(), 3);
		assert!(!submitter.broadcast_invoked());
	}

	#[tokio::test]
	async fn other_module_errors_are_not_retried() {
		let chain = unfinished_chain();
		let submitter = MockSubmitter::scripted(vec![module_error(MIGRATION_PALLET, 1)]);
		let result =
			run_migration(&chain, &submitter, &test_call_builder(), &acc(1), 1000, 2048, Some(1))
				.await;
		assert_matches!(result, Err(Error::DryRun(_)));
		assert_eq!(submitter.dry_runs(), 1);
	}

	#[tokio::test]
	async fn bad_origin_aborts() {
		let chain = unfinished_chain();
		let submitter =
			MockSubmitter::scripted(vec![DryRunOutcome::Dispatch(DispatchError::BadOrigin)]);
		let result =
			run_migration(&chain, &submitter, &test_call_builder(), &acc(1), 1000, 2048, Some(1))
				.await;
		assert_matches!(result, Err(Error::DryRun(_)));
	}

	#[tokio::test]
	async fn limits_above_the_chain_maximum_are_rejected() {
		let chain = unfinished_chain();
		let submitter = MockSubmitter::succeeding();
		assert_matches!(
			run_migration(&chain, &submitter, &test_call_builder(), &acc(1), 5000, 2048, None)
				.await,
			Err(Error::Config(_))
		);
	}

	#[tokio::test]
	async fn unset_max_limits_is_a_config_error() {
		let chain = MockChain::new(vec![]);
		let submitter = MockSubmitter::succeeding();
		assert_matches!(
			run_migration(&chain, &submitter, &test_call_builder(), &acc(1), 10, 10, None)
				.await,
			Err(Error::Config(_))
		);
	}

	#[tokio::test]
	async fn count_bounds_the_rounds() {
		// the mock task never finishes; the count must stop the loop.
		let chain = unfinished_chain();
		let submitter = MockSubmitter::succeeding();
		run_migration(&chain, &submitter, &test_call_builder(), &acc(1), 1000, 2048, Some(3))
			.await
			.unwrap();
		assert_eq!(submitter.submissions(), 3);
	}
}
