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

//! Storage key construction and entry-key decoding.
//!
//! The toolkit never scrapes full state; it reads a handful of well-known maps
//! and values, so the hashers are hardcoded per item rather than derived from
//! metadata.

use codec::Encode;
use sp_crypto_hashing::{blake2_128, twox_128, twox_64};

use crate::{
	chain::{AccountId, Score},
	error::{Error, Result},
};

/// `twox128(pallet) ++ twox128(item)` prefix of a storage item.
pub fn item_prefix(pallet: &str, item: &str) -> Vec<u8> {
	let mut key = twox_128(pallet.as_bytes()).to_vec();
	key.extend(twox_128(item.as_bytes()));
	key
}

/// Full key of a `Twox64Concat`-hashed map entry.
pub fn twox64_concat_key(pallet: &str, item: &str, map_key: &impl Encode) -> Vec<u8> {
	let encoded = map_key.encode();
	let mut key = item_prefix(pallet, item);
	key.extend(twox_64(&encoded));
	key.extend(encoded);
	key
}

/// Full key of a `Blake2_128Concat`-hashed map entry.
pub fn blake2_128_concat_key(pallet: &str, item: &str, map_key: &impl Encode) -> Vec<u8> {
	let encoded = map_key.encode();
	let mut key = item_prefix(pallet, item);
	key.extend(blake2_128(&encoded));
	key.extend(encoded);
	key
}

/// Recover the `AccountId` map key from a concat-hashed entry key. Works for
/// both concat hashers, since the plain key is always the trailing bytes.
pub fn account_from_entry_key(key: &[u8]) -> Result<AccountId> {
	let raw: [u8; 32] = key
		.get(key.len().saturating_sub(32)..)
		.and_then(|tail| tail.try_into().ok())
		.ok_or_else(|| Error::Metadata(format!("entry key too short for an account: 0x{}", hex::encode(key))))?;
	Ok(AccountId::new(raw))
}

/// Recover the `Score` map key (little-endian `u64`) from a concat-hashed
/// entry key.
pub fn score_from_entry_key(key: &[u8]) -> Result<Score> {
	let raw: [u8; 8] = key
		.get(key.len().saturating_sub(8)..)
		.and_then(|tail| tail.try_into().ok())
		.ok_or_else(|| Error::Metadata(format!("entry key too short for a score: 0x{}", hex::encode(key))))?;
	Ok(Score::from_le_bytes(raw))
}
