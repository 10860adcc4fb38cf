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

//! WebSocket chain client and the pinned, typed [`ChainApi`] implementation.

pub mod keys;
pub mod metadata;

use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use codec::Decode;
use futures::future::try_join_all;
use jsonrpsee::{
	core::client::{ClientT, Subscription, SubscriptionClientT},
	rpc_params,
	ws_client::{WsClient, WsClientBuilder},
};
use log::*;
use serde::Deserialize;
use sp_core::crypto::Ss58Codec;

use crate::{
	chain::{
		AccountId, Bag, Balance, ChainApi, Hash, MigrationLimits, MigrationTask, Node, Score,
		StakingLedger,
	},
	error::{Error, Result},
};
use metadata::ChainMetadata;

const LOG_TARGET: &str = "rpc";

/// Every RPC call is bounded by this; a stuck node should fail the run, not
/// hang it.
const RPC_TIMEOUT: Duration = Duration::from_secs(60);

/// Page size for key-range enumeration.
const KEYS_PAGE_SIZE: u32 = 512;

/// Value reads per fan-out chunk when hydrating enumerated entries.
const VALUE_FANOUT_CHUNK: usize = 256;

async fn with_timeout<T, F: Future<Output = T>>(future: F) -> Result<T> {
	tokio::time::timeout(RPC_TIMEOUT, future)
		.await
		.map_err(|_| Error::Rpc(jsonrpsee::core::ClientError::RequestTimeout))
}

/// Transaction status updates from `author_submitAndWatchExtrinsic`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TxStatus {
	Future,
	Ready,
	Broadcast(Vec<String>),
	InBlock(Hash),
	Retracted(Hash),
	FinalityTimeout(Hash),
	Finalized(Hash),
	Usurped(Hash),
	Dropped,
	Invalid,
}

/// A connected node, with its metadata digested.
pub struct RpcClient {
	ws: Arc<WsClient>,
	metadata: ChainMetadata,
	genesis_hash: Hash,
	spec_version: u32,
	transaction_version: u32,
	ss58_prefix: u16,
}

impl RpcClient {
	/// Connect and fetch the session-constant chain facts (metadata, genesis
	/// hash, runtime version).
	pub async fn connect(uri: &str) -> Result<Self> {
		debug!(target: LOG_TARGET, "connecting to {uri}");
		let ws = WsClientBuilder::default()
			.max_request_size(u32::MAX)
			.max_response_size(u32::MAX)
			.request_timeout(RPC_TIMEOUT)
			.build(uri)
			.await
			.map_err(Error::Rpc)?;
		let ws = Arc::new(ws);

		let chain: String = with_timeout(ws.request("system_chain", rpc_params![])).await??;
		let raw_metadata: String =
			with_timeout(ws.request("state_getMetadata", rpc_params![])).await??;
		let metadata = ChainMetadata::from_bytes(&decode_hex(&raw_metadata)?)?;
		let genesis_hash: Option<Hash> =
			with_timeout(ws.request("chain_getBlockHash", rpc_params![0u32])).await??;
		let genesis_hash = genesis_hash
			.ok_or_else(|| Error::Metadata("node does not know its genesis hash".into()))?;
		let version: RuntimeVersion =
			with_timeout(ws.request("state_getRuntimeVersion", rpc_params![])).await??;
		let ss58_prefix = metadata.constant::<u16>("System", "SS58Prefix").unwrap_or(42);

		info!(
			target: LOG_TARGET,
			"connected to {uri}: {chain} [ss58: {ss58_prefix}, spec: {}]", version.spec_version,
		);

		Ok(Self {
			ws,
			metadata,
			genesis_hash,
			spec_version: version.spec_version,
			transaction_version: version.transaction_version,
			ss58_prefix,
		})
	}

	pub fn metadata(&self) -> &ChainMetadata {
		&self.metadata
	}

	pub fn genesis_hash(&self) -> Hash {
		self.genesis_hash
	}

	pub fn spec_version(&self) -> u32 {
		self.spec_version
	}

	pub fn transaction_version(&self) -> u32 {
		self.transaction_version
	}

	pub fn ss58_prefix(&self) -> u16 {
		self.ss58_prefix
	}

	/// Render an account the way the connected chain does.
	pub fn ss58(&self, who: &AccountId) -> String {
		who.to_ss58check_with_version(self.ss58_prefix.into())
	}

	/// Latest finalized head; the pin point of a run.
	pub async fn finalized_head(&self) -> Result<Hash> {
		trace!(target: LOG_TARGET, "rpc: chain_getFinalizedHead");
		Ok(with_timeout(self.ws.request("chain_getFinalizedHead", rpc_params![])).await??)
	}

	/// Parent hash of a block, for post-inclusion verification.
	pub async fn parent_hash(&self, of: Hash) -> Result<Hash> {
		#[derive(Deserialize)]
		#[serde(rename_all = "camelCase")]
		struct Header {
			parent_hash: Hash,
		}
		let header: Header =
			with_timeout(self.ws.request("chain_getHeader", rpc_params![of])).await??;
		Ok(header.parent_hash)
	}

	/// Raw storage read at a block.
	pub async fn storage(&self, key: &[u8], at: Option<Hash>) -> Result<Option<Vec<u8>>> {
		trace!(target: LOG_TARGET, "rpc: state_getStorage 0x{}", hex::encode(key));
		let raw: Option<String> = with_timeout(
			self.ws.request("state_getStorage", rpc_params![encode_hex(key), at]),
		)
		.await??;
		raw.map(|r| decode_hex(&r)).transpose()
	}

	/// Typed storage read; `None` when the key has no value.
	pub async fn storage_value<T: Decode>(
		&self,
		key: &[u8],
		at: Option<Hash>,
	) -> Result<Option<T>> {
		match self.storage(key, at).await? {
			Some(bytes) => Ok(Some(T::decode(&mut &bytes[..])?)),
			None => Ok(None),
		}
	}

	/// All keys under a prefix at a block, paged through `state_getKeysPaged`.
	pub async fn keys_with_prefix(&self, prefix: &[u8], at: Option<Hash>) -> Result<Vec<Vec<u8>>> {
		let prefix_hex = encode_hex(prefix);
		let mut all = Vec::new();
		let mut start_key: Option<String> = None;
		loop {
			trace!(target: LOG_TARGET, "rpc: state_getKeysPaged from {start_key:?}");
			let page: Vec<String> = with_timeout(self.ws.request(
				"state_getKeysPaged",
				rpc_params![&prefix_hex, KEYS_PAGE_SIZE, &start_key, at],
			))
			.await??;
			let full_page = page.len() as u32 == KEYS_PAGE_SIZE;
			start_key = page.last().cloned();
			all.extend(page.into_iter().map(|k| decode_hex(&k)).collect::<Result<Vec<_>>>()?);
			if !full_page {
				break
			}
		}
		debug!(target: LOG_TARGET, "enumerated {} keys under 0x{}", all.len(), hex::encode(prefix));
		Ok(all)
	}

	/// Enumerate a whole map: keys under the prefix plus their values, fetched
	/// in bounded concurrent chunks (the fan-out/fan-in pattern; one request
	/// per value, many in flight).
	pub async fn map_entries(
		&self,
		prefix: &[u8],
		at: Option<Hash>,
	) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
		let keys = self.keys_with_prefix(prefix, at).await?;
		let mut entries = Vec::with_capacity(keys.len());
		for chunk in keys.chunks(VALUE_FANOUT_CHUNK) {
			let values = try_join_all(chunk.iter().map(|key| self.storage(key, at))).await?;
			for (key, value) in chunk.iter().zip(values) {
				let value = value.ok_or(Error::VanishedValue("map entry"))?;
				entries.push((key.clone(), value));
			}
		}
		Ok(entries)
	}

	/// Next nonce of an account, pool-aware.
	pub async fn account_next_index(&self, who: &AccountId) -> Result<u32> {
		Ok(with_timeout(
			self.ws.request("system_accountNextIndex", rpc_params![self.ss58(who)]),
		)
		.await??)
	}

	/// Simulate an extrinsic against (optionally pinned) chain state. Returns
	/// the raw SCALE `ApplyExtrinsicResult` bytes.
	pub async fn dry_run(&self, xt: &[u8], at: Option<Hash>) -> Result<Vec<u8>> {
		let raw: String =
			with_timeout(self.ws.request("system_dryRun", rpc_params![encode_hex(xt), at]))
				.await??;
		decode_hex(&raw)
	}

	/// Broadcast an extrinsic and stream its lifecycle.
	pub async fn submit_and_watch(&self, xt: &[u8]) -> Result<Subscription<TxStatus>> {
		Ok(with_timeout(self.ws.subscribe(
			"author_submitAndWatchExtrinsic",
			rpc_params![encode_hex(xt)],
			"author_unwatchExtrinsic",
		))
		.await??)
	}
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuntimeVersion {
	spec_version: u32,
	transaction_version: u32,
}

fn encode_hex(bytes: &[u8]) -> String {
	format!("0x{}", hex::encode(bytes))
}

fn decode_hex(s: &str) -> Result<Vec<u8>> {
	hex::decode(s.trim_start_matches("0x"))
		.map_err(|e| Error::Metadata(format!("invalid hex in RPC response: {e}")))
}

/// [`ChainApi`] over an [`RpcClient`], with all reads pinned to one block.
pub struct RpcChain {
	client: Arc<RpcClient>,
	at: Hash,
	bags_pallet: &'static str,
}

impl RpcChain {
	/// Pin a typed view to the given block.
	pub fn pinned(client: Arc<RpcClient>, at: Hash) -> Result<Self> {
		let bags_pallet = client.metadata().bags_list_pallet()?;
		info!(target: LOG_TARGET, "pinned reads to block {at:?} (list pallet: {bags_pallet})");
		Ok(Self { client, at, bags_pallet })
	}

	pub fn at(&self) -> Hash {
		self.at
	}

	pub fn client(&self) -> &Arc<RpcClient> {
		&self.client
	}

	async fn plain_value<T: Decode>(
		&self,
		pallet: &str,
		item: &str,
		pinned: bool,
	) -> Result<Option<T>> {
		let at = pinned.then_some(self.at);
		self.client.storage_value(&keys::item_prefix(pallet, item), at).await
	}
}

#[async_trait]
impl ChainApi for RpcChain {
	async fn bag_thresholds(&self) -> Result<Vec<Score>> {
		self.client.metadata().constant(self.bags_pallet, "BagThresholds")
	}

	async fn bags(&self) -> Result<Vec<(Score, Bag)>> {
		let prefix = keys::item_prefix(self.bags_pallet, "ListBags");
		self.client
			.map_entries(&prefix, Some(self.at))
			.await?
			.into_iter()
			.map(|(key, value)| {
				Ok((keys::score_from_entry_key(&key)?, Bag::decode(&mut &value[..])?))
			})
			.collect()
	}

	async fn bag(&self, upper: Score) -> Result<Option<Bag>> {
		let key = keys::twox64_concat_key(self.bags_pallet, "ListBags", &upper);
		self.client.storage_value(&key, Some(self.at)).await
	}

	async fn node(&self, who: &AccountId) -> Result<Option<Node>> {
		let key = keys::twox64_concat_key(self.bags_pallet, "ListNodes", who);
		self.client.storage_value(&key, Some(self.at)).await
	}

	async fn bonded(&self, stash: &AccountId) -> Result<Option<AccountId>> {
		let key = keys::twox64_concat_key("Staking", "Bonded", stash);
		self.client.storage_value(&key, Some(self.at)).await
	}

	async fn ledger(&self, controller: &AccountId) -> Result<Option<StakingLedger>> {
		let key = keys::blake2_128_concat_key("Staking", "Ledger", controller);
		self.client.storage_value(&key, Some(self.at)).await
	}

	async fn counter_for_list_nodes(&self) -> Result<u32> {
		Ok(self
			.plain_value(self.bags_pallet, "CounterForListNodes", true)
			.await?
			.unwrap_or(0))
	}

	async fn counter_for_nominators(&self) -> Result<u32> {
		Ok(self.plain_value("Staking", "CounterForNominators", true).await?.unwrap_or(0))
	}

	async fn counter_for_validators(&self) -> Result<u32> {
		Ok(self.plain_value("Staking", "CounterForValidators", true).await?.unwrap_or(0))
	}

	async fn nominators(&self) -> Result<Vec<(AccountId, u32)>> {
		// decoded as a prefix: only the vote targets are read.
		#[derive(Decode)]
		struct NominationsPrefix {
			targets: Vec<AccountId>,
		}
		let prefix = keys::item_prefix("Staking", "Nominators");
		self.client
			.map_entries(&prefix, Some(self.at))
			.await?
			.into_iter()
			.map(|(key, value)| {
				let nominations = NominationsPrefix::decode(&mut &value[..])?;
				Ok((keys::account_from_entry_key(&key)?, nominations.targets.len() as u32))
			})
			.collect()
	}

	async fn ledgers(&self) -> Result<Vec<(AccountId, StakingLedger)>> {
		let prefix = keys::item_prefix("Staking", "Ledger");
		self.client
			.map_entries(&prefix, Some(self.at))
			.await?
			.into_iter()
			.map(|(key, value)| {
				Ok((keys::account_from_entry_key(&key)?, StakingLedger::decode(&mut &value[..])?))
			})
			.collect()
	}

	async fn slashing_spans(&self, stash: &AccountId) -> Result<u32> {
		// span count = prior spans + the live one, 0 when never slashed.
		#[derive(Decode)]
		struct SlashingSpansPrefix {
			_span_index: u32,
			_last_start: u32,
			_last_nonzero_slash: u32,
			prior: Vec<u32>,
		}
		let key = keys::twox64_concat_key("Staking", "SlashingSpans", stash);
		Ok(self
			.client
			.storage_value::<SlashingSpansPrefix>(&key, Some(self.at))
			.await?
			.map(|spans| spans.prior.len() as u32 + 1)
			.unwrap_or(0))
	}

	async fn min_nominator_bond(&self) -> Result<Balance> {
		Ok(self.plain_value("Staking", "MinNominatorBond", true).await?.unwrap_or(0))
	}

	async fn chill_threshold(&self) -> Result<Option<u8>> {
		self.plain_value("Staking", "ChillThreshold", true).await
	}

	async fn max_nominators_count(&self) -> Result<Option<u32>> {
		self.plain_value("Staking", "MaxNominatorsCount", true).await
	}

	async fn max_validators_count(&self) -> Result<Option<u32>> {
		self.plain_value("Staking", "MaxValidatorsCount", true).await
	}

	async fn existential_deposit(&self) -> Result<Balance> {
		self.client.metadata().constant("Balances", "ExistentialDeposit")
	}

	async fn migration_max_limits(&self) -> Result<Option<MigrationLimits>> {
		self.plain_value("StateTrieMigration", "SignedMigrationMaxLimits", true).await
	}

	async fn migration_process(&self) -> Result<MigrationTask> {
		// read unpinned: this is the submission witness.
		Ok(self
			.plain_value("StateTrieMigration", "MigrationProcess", false)
			.await?
			.unwrap_or_default())
	}

	async fn free_balance(&self, who: &AccountId) -> Result<Balance> {
		#[derive(Decode)]
		struct AccountInfoPrefix {
			_nonce: u32,
			_consumers: u32,
			_providers: u32,
			_sufficients: u32,
			free: Balance,
		}
		let key = keys::blake2_128_concat_key("System", "Account", who);
		Ok(self
			.client
			.storage_value::<AccountInfoPrefix>(&key, None)
			.await?
			.map(|info| info.free)
			.unwrap_or(0))
	}
}
