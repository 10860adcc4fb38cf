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

//! The dry-run and broadcast seam.

use std::sync::Arc;

use async_trait::async_trait;
use codec::Decode;
use log::*;
use sp_runtime::{transaction_validity::TransactionValidityError, DispatchError};

use super::{extrinsic, EncodedCall, TxContext};
use crate::{
	chain::Hash,
	client::{RpcClient, TxStatus},
	error::{Error, Result},
	signer::Signer,
};

const LOG_TARGET: &str = "tx";

/// Outcome of simulating an extrinsic.
#[derive(Debug, Clone)]
pub enum DryRunOutcome {
	/// Would apply and dispatch successfully.
	Success,
	/// Would apply, but the dispatch itself fails.
	Dispatch(DispatchError),
	/// Would not even enter a block.
	Invalid(String),
}

impl DryRunOutcome {
	/// Decode raw `system_dryRun` output (`ApplyExtrinsicResult`).
	pub fn from_apply_result(bytes: &[u8]) -> Result<Self> {
		type ApplyResult = Result<Result<(), DispatchError>, TransactionValidityError>;
		Ok(match ApplyResult::decode(&mut &bytes[..])? {
			Ok(Ok(())) => Self::Success,
			Ok(Err(dispatch)) => Self::Dispatch(dispatch),
			Err(validity) => Self::Invalid(format!("{validity:?}")),
		})
	}

	/// Whether this is the given module error of the given pallet. Used to
	/// classify retryable dry-run failures (oversized migration batches).
	pub fn is_module_error(&self, pallet_index: u8, error_index: u8) -> bool {
		matches!(
			self,
			Self::Dispatch(DispatchError::Module(module))
				if module.index == pallet_index && module.error[0] == error_index
		)
	}
}

/// Where a sent transaction ended up.
#[derive(Debug, Clone)]
pub struct InclusionReport {
	pub tx_hash: Hash,
	pub in_block: Hash,
	pub finalized: Hash,
}

/// The commit protocol: simulate, then (separately) sign-broadcast-await.
///
/// A trait so tests can prove the pipeline never broadcasts what it has not
/// successfully dry-run.
#[async_trait]
pub trait Submitter: Sync {
	async fn dry_run(&self, call: &EncodedCall) -> Result<DryRunOutcome>;
	async fn submit_and_finalize(&self, call: &EncodedCall) -> Result<InclusionReport>;
}

/// RPC-backed [`Submitter`]. Builds a fresh signed extrinsic per operation so
/// retries always pick up the current nonce.
pub struct RpcSubmitter {
	client: Arc<RpcClient>,
	signer: Signer,
}

impl RpcSubmitter {
	pub fn new(client: Arc<RpcClient>, signer: Signer) -> Self {
		Self { client, signer }
	}

	pub fn signer(&self) -> &Signer {
		&self.signer
	}

	async fn build(&self, call: &EncodedCall) -> Result<Vec<u8>> {
		let ctx = TxContext {
			spec_version: self.client.spec_version(),
			transaction_version: self.client.transaction_version(),
			genesis_hash: self.client.genesis_hash(),
			nonce: self.client.account_next_index(self.signer.account()).await?,
		};
		Ok(extrinsic::build_signed(call, &self.signer, &ctx))
	}

	/// Re-simulate at the parent of the inclusion block. A dispatch error
	/// there means state changed between our dry-run and inclusion.
	async fn verify_inclusion(&self, xt: &[u8], in_block: Hash) -> Result<()> {
		let parent = self.client.parent_hash(in_block).await?;
		match DryRunOutcome::from_apply_result(&self.client.dry_run(xt, Some(parent)).await?)? {
			DryRunOutcome::Success => Ok(()),
			DryRunOutcome::Dispatch(e) => Err(Error::PostDispatch(format!("{e:?}"))),
			// Nonce and era checks at the parent block are not exactly the
			// broadcast-time ones; an apply-level rejection here proves
			// nothing about the dispatch.
			DryRunOutcome::Invalid(detail) => {
				debug!(
					target: LOG_TARGET,
					"post-inclusion re-simulation inconclusive ({detail}); assuming success",
				);
				Ok(())
			},
		}
	}
}

#[async_trait]
impl Submitter for RpcSubmitter {
	async fn dry_run(&self, call: &EncodedCall) -> Result<DryRunOutcome> {
		let xt = self.build(call).await?;
		let outcome = DryRunOutcome::from_apply_result(&self.client.dry_run(&xt, None).await?)?;
		debug!(target: LOG_TARGET, "🌵 dry-run outcome: {outcome:?}");
		Ok(outcome)
	}

	async fn submit_and_finalize(&self, call: &EncodedCall) -> Result<InclusionReport> {
		let xt = self.build(call).await?;
		let tx_hash = extrinsic::tx_hash(&xt);
		let mut watcher = self.client.submit_and_watch(&xt).await?;

		let mut in_block = None;
		while let Some(status) = watcher.next().await {
			match status.map_err(|e| Error::Rpc(e.into()))? {
				TxStatus::Ready | TxStatus::Future => {},
				TxStatus::Broadcast(_) => {
					info!(target: LOG_TARGET, "🚀 transaction {tx_hash:?} broadcast");
				},
				TxStatus::InBlock(hash) => {
					info!(target: LOG_TARGET, "📀 transaction {tx_hash:?} included in {hash:?}");
					in_block = Some(hash);
				},
				TxStatus::Retracted(hash) => {
					warn!(target: LOG_TARGET, "block {hash:?} retracted, waiting on");
					in_block = None;
				},
				TxStatus::Finalized(hash) => {
					info!(target: LOG_TARGET, "💯 transaction {tx_hash:?} finalized in {hash:?}");
					let in_block = in_block.unwrap_or(hash);
					self.verify_inclusion(&xt, in_block).await?;
					return Ok(InclusionReport { tx_hash, in_block, finalized: hash })
				},
				status @ (TxStatus::Usurped(_) |
				TxStatus::Dropped |
				TxStatus::Invalid |
				TxStatus::FinalityTimeout(_)) => {
					return Err(Error::PostDispatch(format!(
						"transaction left the pool after broadcast: {status:?}"
					)))
				},
			}
		}

		Err(Error::PostDispatch("status stream ended before finality".into()))
	}
}
