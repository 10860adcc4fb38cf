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

//! Signed extrinsic assembly (v4, immortal era, zero tip).

use codec::{Compact, Encode};
use sp_crypto_hashing::blake2_256;
use sp_runtime::MultiSignature;

use super::EncodedCall;
use crate::{chain::Hash, signer::Signer};

/// Chain facts an extrinsic is bound to. The nonce is fetched fresh per
/// submission; the rest is constant per connection.
#[derive(Debug, Clone, Copy)]
pub struct TxContext {
	pub spec_version: u32,
	pub transaction_version: u32,
	pub genesis_hash: Hash,
	pub nonce: u32,
}

const EXTRINSIC_VERSION_SIGNED: u8 = 0x84;

/// Build a signed v4 extrinsic around `call`.
///
/// The signed payload is `call ++ extra ++ additional`; payloads longer than
/// 256 bytes are blake2-256 hashed before signing, per the runtime convention.
pub fn build_signed(call: &EncodedCall, signer: &Signer, ctx: &TxContext) -> Vec<u8> {
	// extra: (era, nonce, tip). Immortal era encodes as one zero byte.
	let mut extra = vec![0u8];
	Compact(ctx.nonce).encode_to(&mut extra);
	Compact(0u128).encode_to(&mut extra);

	// additional: checked alongside but not transmitted.
	let mut additional = Vec::new();
	ctx.spec_version.encode_to(&mut additional);
	ctx.transaction_version.encode_to(&mut additional);
	ctx.genesis_hash.encode_to(&mut additional);
	// immortal transactions anchor the era hash at genesis.
	ctx.genesis_hash.encode_to(&mut additional);

	let mut payload = call.0.clone();
	payload.extend_from_slice(&extra);
	payload.extend_from_slice(&additional);
	let signature = if payload.len() > 256 {
		signer.sign(&blake2_256(&payload))
	} else {
		signer.sign(&payload)
	};

	let mut body = vec![EXTRINSIC_VERSION_SIGNED];
	super::lookup_of(signer.account()).encode_to(&mut body);
	MultiSignature::from(signature).encode_to(&mut body);
	body.extend_from_slice(&extra);
	body.extend_from_slice(&call.0);

	let mut xt = Compact(body.len() as u32).encode();
	xt.extend_from_slice(&body);
	xt
}

/// Transaction hash of a built extrinsic.
pub fn tx_hash(xt: &[u8]) -> Hash {
	blake2_256(xt).into()
}
