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

//! Command line interface of the toolkit.

mod chill_other;
mod in_front;
mod reap_stash;
mod rebag;
mod trie_migration;

use std::sync::Arc;

use structopt::StructOpt;

use crate::{
	chain::Hash,
	client::{RpcChain, RpcClient},
	error::{Error, Result},
	signer::Signer,
	tx::{CallBuilder, RpcSubmitter},
};

/// Parameters every subcommand takes.
#[derive(StructOpt, Debug)]
pub struct SharedParams {
	/// Websocket endpoint of the node. Submission commands need the unsafe
	/// RPCs enabled on it.
	#[structopt(long, short = "w", default_value = "wss://rpc.polkadot.io")]
	pub ws: String,
	/// Path to a file holding the raw or mnemonic seed, or the secret URI
	/// itself. Falls back to the SEED environment variable, then to the
	/// Alice dev account.
	#[structopt(long, short = "s")]
	pub seed: Option<String>,
	/// Block hash to pin all reads at. Latest finalized if omitted.
	#[structopt(long)]
	pub at: Option<String>,
}

/// Staking operator toolkit.
#[derive(StructOpt, Debug)]
#[structopt(name = "staking-ops")]
pub enum Command {
	/// Check the bags list for misplaced members and optionally submit the
	/// correcting rebag batch.
	Rebag(rebag::RebagParams),
	/// Find an account the target could be put in front of within its bag.
	InFront(in_front::InFrontParams),
	/// Chill nominators that fell below the minimum bond.
	ChillOther(chill_other::ChillOtherParams),
	/// Reap stashes whose ledger sank to the existential deposit.
	ReapStash(reap_stash::ReapStashParams),
	/// Drive the signed state-trie migration.
	TrieMigration(trie_migration::TrieMigrationParams),
}

impl Command {
	pub async fn run(self) -> anyhow::Result<()> {
		match self {
			Self::Rebag(params) => params.run().await,
			Self::InFront(params) => params.run().await,
			Self::ChillOther(params) => params.run().await,
			Self::ReapStash(params) => params.run().await,
			Self::TrieMigration(params) => params.run().await,
		}
	}
}

/// Everything a connected subcommand works with.
pub(crate) struct Ctx {
	pub chain: RpcChain,
	pub builder: CallBuilder,
	pub submitter: RpcSubmitter,
}

impl std::fmt::Debug for Ctx {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Ctx").finish_non_exhaustive()
	}
}

/// Connect, pin a block, resolve the signer and the call indices.
pub(crate) async fn setup(shared: &SharedParams) -> Result<Ctx> {
	// parameter validation comes before any network activity.
	let pinned = shared.at.as_deref().map(parse_hash).transpose()?;
	let client = Arc::new(RpcClient::connect(&shared.ws).await?);
	let at = match pinned {
		Some(at) => at,
		None => client.finalized_head().await?,
	};
	let chain = RpcChain::pinned(client.clone(), at)?;
	let builder = CallBuilder::from_metadata(client.metadata())?;
	let signer = Signer::resolve(shared.seed.as_deref(), client.ss58_prefix())?;
	let submitter = RpcSubmitter::new(client, signer);
	Ok(Ctx { chain, builder, submitter })
}

fn parse_hash(raw: &str) -> Result<Hash> {
	let bytes = hex::decode(raw.trim_start_matches("0x"))
		.map_err(|e| Error::Config(format!("malformed block hash {raw}: {e}")))?;
	if bytes.len() != 32 {
		return Err(Error::Config(format!("block hash must be 32 bytes, got {}", bytes.len())))
	}
	Ok(Hash::from_slice(&bytes))
}
