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

//! Bulk staker hygiene: chill under-bonded nominators and reap dusted
//! stashes.

use futures::future::join_all;
use log::*;
use num_format::{Locale, ToFormattedString};

use crate::{
	chain::{AccountId, Balance, ChainApi},
	error::{Error, Result},
	tx::{execute_batch, CallBuilder, SubmitOutcome, Submitter},
};

const LOG_TARGET: &str = "staking";

/// One permissionless-chill candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ChillCandidate {
	controller: AccountId,
	active: Balance,
}

/// Chill nominators whose active bond fell below `MinNominatorBond`.
///
/// Candidates are collected across the whole nominator set, sorted ascending
/// by active stake so the worst offenders go first, capped by how many chills
/// the `ChillThreshold` ratio still permits, and then batched through the
/// usual dry-run gate. `no_dry_run` skips the simulation for runtimes whose
/// node rejects `system_dryRun`.
pub async fn chill_other<C: ChainApi, S: Submitter>(
	chain: &C,
	submitter: &S,
	builder: &CallBuilder,
	limit: Option<usize>,
	send: bool,
	no_dry_run: bool,
) -> Result<SubmitOutcome> {
	let min_bond = chain.min_nominator_bond().await?;
	// an unset ratio behaves as zero: no permissionless chill headroom.
	let chill_percent = chain.chill_threshold().await?.unwrap_or(0);
	info!(
		target: LOG_TARGET,
		"📣 stake threshold for chilling is {}", min_bond.to_formatted_string(&Locale::en),
	);
	info!(target: LOG_TARGET, "📣 ratio threshold for chilling is {chill_percent}%");
	info!(
		target: LOG_TARGET,
		"📣 current status is {} / {:?} nominators -- {} / {:?} validators",
		chain.counter_for_nominators().await?,
		chain.max_nominators_count().await?,
		chain.counter_for_validators().await?,
		chain.max_validators_count().await?,
	);

	let (mut all, votes) = resolve_nominators(chain).await?;
	let population = all.len();
	all.sort_by_key(|candidate| candidate.active);
	let below: Vec<_> =
		all.into_iter().filter(|candidate| candidate.active < min_bond).collect();
	let ejected_stake: Balance = below.iter().map(|candidate| candidate.active).sum();

	// the ratio floors the nominator count; chilling below it would make the
	// whole batch fail on-chain.
	let max_count = chain.max_nominators_count().await?.unwrap_or(0) as u64;
	let floor = (max_count * chill_percent as u64 / 100) as usize;
	let chillable = population.saturating_sub(floor).min(below.len());
	info!(
		target: LOG_TARGET,
		"📊 a total of {} accounts with sum stake {} (from the {population} total and {votes} votes) are below the nominator threshold..",
		below.len(),
		ejected_stake.to_formatted_string(&Locale::en),
	);
	info!(target: LOG_TARGET, "\t.. which can be lowered to a minimum of {floor} via chill..");
	info!(target: LOG_TARGET, "\t.. thus {chillable} can be chilled to stay within the {chill_percent}% limit..");

	let calls: Vec<_> = below
		.iter()
		.take(chillable)
		.map(|candidate| {
			info!(
				target: LOG_TARGET,
				"will chill {} with stake {}",
				candidate.controller,
				candidate.active.to_formatted_string(&Locale::en),
			);
			builder.chill_other(&candidate.controller)
		})
		.collect();

	if no_dry_run && send && !calls.is_empty() {
		let corrections = calls.len().min(limit.unwrap_or(usize::MAX));
		let batch = builder.batch_all(&calls[..corrections]);
		let report = submitter.submit_and_finalize(&batch).await?;
		info!(target: LOG_TARGET, "ℹ️ {corrections} chills finalized in {:?}", report.finalized);
		return Ok(SubmitOutcome::Finalized { corrections, report })
	}

	execute_batch(submitter, builder, calls, limit, send, "chill").await
}

/// Resolve every nominator to its controller and active bond, also summing
/// the votes cast. Nominators with a broken stash/ledger linkage are logged
/// and excluded rather than failing the run.
async fn resolve_nominators<C: ChainApi>(
	chain: &C,
) -> Result<(Vec<ChillCandidate>, u64)> {
	let nominators = chain.nominators().await?;
	let votes = nominators.iter().map(|(_, votes)| *votes as u64).sum();

	let resolved = join_all(nominators.iter().map(|(stash, _)| async move {
		let controller = match chain.bonded(stash).await? {
			Some(controller) => controller,
			None => return Ok(None),
		};
		Ok::<_, Error>(
			chain
				.ledger(&controller)
				.await?
				.map(|ledger| ChillCandidate { controller, active: ledger.active }),
		)
	}))
	.await;

	let mut candidates = Vec::with_capacity(nominators.len());
	for ((stash, _), resolved) in nominators.iter().zip(resolved) {
		match resolved? {
			Some(candidate) => candidates.push(candidate),
			None => {
				warn!(target: LOG_TARGET, "😱 {stash} seems to have no ledger. This is a state bug.");
			},
		}
	}
	Ok((candidates, votes))
}

/// Reap stashes whose total ledger balance sank to the existential deposit or
/// below. Their bond can no longer back anything and only pollutes iteration.
pub async fn reap_stash<C: ChainApi, S: Submitter>(
	chain: &C,
	submitter: &S,
	builder: &CallBuilder,
	limit: Option<usize>,
	send: bool,
) -> Result<SubmitOutcome> {
	let ed = chain.existential_deposit().await?;
	info!(target: LOG_TARGET, "💸 existential deposit = {}", ed.to_formatted_string(&Locale::en));

	let ledgers = chain.ledgers().await?;
	let population = ledgers.len();
	let mut stale = Vec::new();
	for (controller, ledger) in ledgers {
		if ledger.total <= ed {
			warn!(
				target: LOG_TARGET,
				"🚨 {controller} has ledger total {}.", ledger.total.to_formatted_string(&Locale::en),
			);
			stale.push(ledger.stash);
			if limit.map_or(false, |limit| stale.len() >= limit) {
				break
			}
		}
	}
	info!(target: LOG_TARGET, "{} / {population} are stale", stale.len());

	let spans = join_all(stale.iter().map(|stash| chain.slashing_spans(stash))).await;
	let mut calls = Vec::with_capacity(stale.len());
	for (stash, spans) in stale.iter().zip(spans) {
		calls.push(builder.reap_stash(stash, spans?));
	}

	// already truncated while collecting.
	execute_batch(submitter, builder, calls, None, send, "reap").await
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		mock::{acc, MockChain, MockSubmitter},
		tx::test_call_builder,
	};
	use assert_matches::assert_matches;

	fn nominator_pool() -> MockChain {
		// bond floor 100; two nominators below it, one healthy.
		MockChain::new(vec![])
			.with_min_nominator_bond(100)
			.with_chill_threshold(50)
			.with_max_nominators_count(2)
			.with_nominator(acc(1), 50, 2)
			.with_nominator(acc(2), 150, 1)
			.with_nominator(acc(3), 10, 4)
	}

	#[tokio::test]
	async fn chills_below_bond_ascending_by_stake() {
		let chain = nominator_pool();
		let submitter = MockSubmitter::succeeding();
		let builder = test_call_builder();
		// floor = 2 * 50% = 1, population 3: 2 chills permitted.
		let outcome =
			chill_other(&chain, &submitter, &builder, None, true, false).await.unwrap();

		assert_matches!(outcome, SubmitOutcome::Finalized { corrections: 2, .. });
		let expected = builder
			.batch_all(&[builder.chill_other(&acc(3)), builder.chill_other(&acc(1))]);
		assert_eq!(submitter.last_submitted().unwrap(), expected);
	}

	#[tokio::test]
	async fn ratio_floor_caps_the_batch() {
		// floor = 4 * 50% = 2, population 3: only one chill permitted.
		let chain = nominator_pool().with_max_nominators_count(4);
		let submitter = MockSubmitter::succeeding();
		let builder = test_call_builder();
		let outcome =
			chill_other(&chain, &submitter, &builder, None, true, false).await.unwrap();

		assert_matches!(outcome, SubmitOutcome::Finalized { corrections: 1, .. });
		let expected = builder.batch_all(&[builder.chill_other(&acc(3))]);
		assert_eq!(submitter.last_submitted().unwrap(), expected);
	}

	#[tokio::test]
	async fn unset_ratio_means_no_floor() {
		let chain = MockChain::new(vec![])
			.with_min_nominator_bond(100)
			.with_nominator(acc(1), 50, 1);
		let submitter = MockSubmitter::succeeding();
		let outcome =
			chill_other(&chain, &submitter, &test_call_builder(), None, true, false)
				.await
				.unwrap();
		assert_matches!(outcome, SubmitOutcome::Finalized { corrections: 1, .. });
	}

	#[tokio::test]
	async fn broken_linkage_is_excluded_not_fatal() {
		let chain = nominator_pool().with_ledgerless_nominator(acc(9), 1);
		let submitter = MockSubmitter::succeeding();
		let outcome =
			chill_other(&chain, &submitter, &test_call_builder(), None, true, false)
				.await
				.unwrap();
		assert_matches!(outcome, SubmitOutcome::Finalized { corrections: 2, .. });
	}

	#[tokio::test]
	async fn healthy_pool_chills_no_one() {
		let chain = MockChain::new(vec![])
			.with_min_nominator_bond(100)
			.with_chill_threshold(50)
			.with_max_nominators_count(10)
			.with_nominator(acc(1), 200, 1);
		let submitter = MockSubmitter::succeeding();
		let outcome =
			chill_other(&chain, &submitter, &test_call_builder(), None, true, false)
				.await
				.unwrap();
		assert_matches!(outcome, SubmitOutcome::Empty);
		assert_eq!(submitter.dry_runs(), 0);
	}

	#[tokio::test]
	async fn no_dry_run_submits_directly() {
		let chain = nominator_pool();
		let submitter = MockSubmitter::succeeding();
		let outcome =
			chill_other(&chain, &submitter, &test_call_builder(), Some(1), true, true)
				.await
				.unwrap();
		assert_matches!(outcome, SubmitOutcome::Finalized { corrections: 1, .. });
		assert_eq!(submitter.dry_runs(), 0);
		assert!(submitter.broadcast_invoked());
	}

	#[tokio::test]
	async fn reaps_dusted_ledgers_with_their_spans() {
		let chain = MockChain::new(vec![])
			.with_existential_deposit(100)
			.with_ledger_entry(acc(1), acc(1), 50, 50)
			.with_ledger_entry(acc(2), acc(2), 500, 500)
			// exactly at the deposit counts as dust.
			.with_ledger_entry(acc(3), acc(3), 100, 100)
			.with_slashing_spans(acc(3), 2);
		let submitter = MockSubmitter::succeeding();
		let builder = test_call_builder();
		let outcome =
			reap_stash(&chain, &submitter, &builder, None, true).await.unwrap();

		assert_matches!(outcome, SubmitOutcome::Finalized { corrections: 2, .. });
		let expected = builder
			.batch_all(&[builder.reap_stash(&acc(1), 0), builder.reap_stash(&acc(3), 2)]);
		assert_eq!(submitter.last_submitted().unwrap(), expected);
	}

	#[tokio::test]
	async fn reap_limit_is_exact() {
		let chain = MockChain::new(vec![])
			.with_existential_deposit(100)
			.with_ledger_entry(acc(1), acc(1), 10, 10)
			.with_ledger_entry(acc(2), acc(2), 20, 20)
			.with_ledger_entry(acc(3), acc(3), 30, 30);
		let submitter = MockSubmitter::succeeding();
		let builder = test_call_builder();
		let outcome =
			reap_stash(&chain, &submitter, &builder, Some(2), true).await.unwrap();

		assert_matches!(outcome, SubmitOutcome::Finalized { corrections: 2, .. });
		let expected = builder
			.batch_all(&[builder.reap_stash(&acc(1), 0), builder.reap_stash(&acc(2), 0)]);
		assert_eq!(submitter.last_submitted().unwrap(), expected);
	}

	#[tokio::test]
	async fn nothing_stale_submits_nothing() {
		let chain = MockChain::new(vec![])
			.with_existential_deposit(10)
			.with_ledger_entry(acc(1), acc(1), 500, 500);
		let submitter = MockSubmitter::succeeding();
		let outcome =
			reap_stash(&chain, &submitter, &test_call_builder(), None, true).await.unwrap();
		assert_matches!(outcome, SubmitOutcome::Empty);
	}
}
