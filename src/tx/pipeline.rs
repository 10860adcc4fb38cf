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

//! The shared batch pipeline: truncate, batch, dry-run, conditionally send.

use log::*;

use super::{CallBuilder, DryRunOutcome, EncodedCall, InclusionReport, Submitter};
use crate::error::Result;

const LOG_TARGET: &str = "tx";

/// What the pipeline did. Dry-run failures are reported here rather than as
/// errors: the run itself completed, it just (correctly) sent nothing.
#[derive(Debug)]
pub enum SubmitOutcome {
	/// Nothing needed correction.
	Empty,
	/// The batch would fail; nothing was sent.
	DryRunFailed(String),
	/// The batch simulates fine, but sending was not requested.
	WouldSubmit(usize),
	/// Sent and finalized.
	Finalized { corrections: usize, report: InclusionReport },
}

/// Run the commit protocol over `calls`.
///
/// Order is preserved (the order corrections were encountered in); when a
/// limit is given the batch is truncated to it, bounding transaction weight.
/// The broadcast step is unreachable unless the dry-run succeeded.
pub async fn execute_batch<S: Submitter>(
	submitter: &S,
	builder: &CallBuilder,
	mut calls: Vec<EncodedCall>,
	limit: Option<usize>,
	send: bool,
	label: &str,
) -> Result<SubmitOutcome> {
	if let Some(limit) = limit {
		if calls.len() > limit {
			info!(
				target: LOG_TARGET,
				"truncating {label} batch from {} to the requested {limit}", calls.len(),
			);
			calls.truncate(limit);
		}
	}

	if calls.is_empty() {
		info!(target: LOG_TARGET, "0 {label} corrections, nothing to submit");
		return Ok(SubmitOutcome::Empty)
	}

	let corrections = calls.len();
	let batch = builder.batch_all(&calls);

	match submitter.dry_run(&batch).await? {
		DryRunOutcome::Success if send => {
			let report = submitter.submit_and_finalize(&batch).await?;
			info!(
				target: LOG_TARGET,
				"ℹ️ {corrections} {label} corrections finalized in {:?}", report.finalized,
			);
			Ok(SubmitOutcome::Finalized { corrections, report })
		},
		DryRunOutcome::Success => {
			info!(
				target: LOG_TARGET,
				"would submit {corrections} {label} corrections; no transaction sent (pass --send-tx)",
			);
			Ok(SubmitOutcome::WouldSubmit(corrections))
		},
		DryRunOutcome::Dispatch(e) => {
			warn!(target: LOG_TARGET, "dry-run failed, no transaction sent: {e:?}");
			Ok(SubmitOutcome::DryRunFailed(format!("{e:?}")))
		},
		DryRunOutcome::Invalid(detail) => {
			warn!(target: LOG_TARGET, "dry-run failed, no transaction sent: {detail}");
			Ok(SubmitOutcome::DryRunFailed(detail))
		},
	}
}
