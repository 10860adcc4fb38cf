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

//! Minimal runtime-metadata view: pallet constants and pallet/call indices.
//!
//! Parsed once per connection. We deliberately do not keep the full portable
//! type registry around; constants we read have statically known types and
//! are decoded directly from their value bytes.

use std::collections::HashMap;

use codec::Decode;
use frame_metadata::{RuntimeMetadata, RuntimeMetadataPrefixed};
use scale_info::{form::PortableForm, PortableRegistry, TypeDef};

use crate::error::{Error, Result};

/// Names the voter list pallet has carried across runtimes, in order of
/// preference.
const BAGS_LIST_ALIASES: &[&str] = &["VoterList", "BagsList"];

#[derive(Debug, Clone)]
struct PalletInfo {
	index: u8,
	constants: HashMap<String, Vec<u8>>,
	call_variants: HashMap<String, u8>,
}

/// The digested metadata of a connected runtime.
#[derive(Debug, Clone)]
pub struct ChainMetadata {
	pallets: HashMap<String, PalletInfo>,
}

impl ChainMetadata {
	/// Parse SCALE-encoded `state_getMetadata` output. V14 and V15 are
	/// supported; anything older predates the pallets this toolkit targets.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
		let prefixed = RuntimeMetadataPrefixed::decode(&mut &bytes[..])?;
		let pallets = match prefixed.1 {
			RuntimeMetadata::V14(m) => digest_pallets(&m.types, m.pallets.iter().map(|p| {
				(p.name.clone(), p.index, constants_of(&p.constants), p.calls.as_ref().map(|c| c.ty.id))
			})),
			RuntimeMetadata::V15(m) => digest_pallets(&m.types, m.pallets.iter().map(|p| {
				(p.name.clone(), p.index, constants_of(&p.constants), p.calls.as_ref().map(|c| c.ty.id))
			})),
			other => {
				return Err(Error::Metadata(format!(
					"unsupported metadata version {}",
					other.version()
				)))
			},
		};
		Ok(Self { pallets })
	}

	fn pallet(&self, name: &str) -> Result<&PalletInfo> {
		self.pallets
			.get(name)
			.ok_or_else(|| Error::Metadata(format!("pallet `{name}` not found in runtime")))
	}

	/// The actual on-chain name of the bags-list pallet.
	pub fn bags_list_pallet(&self) -> Result<&'static str> {
		BAGS_LIST_ALIASES
			.iter()
			.find(|name| self.pallets.contains_key(**name))
			.copied()
			.ok_or_else(|| {
				Error::Metadata("bags list does not appear to exist for this runtime".into())
			})
	}

	/// Whether a pallet exists at all.
	pub fn has_pallet(&self, name: &str) -> bool {
		self.pallets.contains_key(name)
	}

	/// Index of a pallet in the outer call/event enums.
	pub fn pallet_index(&self, name: &str) -> Result<u8> {
		Ok(self.pallet(name)?.index)
	}

	/// Raw SCALE value bytes of a pallet constant.
	pub fn constant_bytes(&self, pallet: &str, name: &str) -> Result<&[u8]> {
		self.pallet(pallet)?
			.constants
			.get(name)
			.map(|v| v.as_slice())
			.ok_or_else(|| Error::Metadata(format!("constant `{pallet}::{name}` not found")))
	}

	/// A pallet constant, decoded as `T`.
	pub fn constant<T: Decode>(&self, pallet: &str, name: &str) -> Result<T> {
		Ok(T::decode(&mut self.constant_bytes(pallet, name)?)?)
	}

	/// `(pallet_index, call_index)` of a dispatchable, by names.
	pub fn call_index(&self, pallet: &str, call: &str) -> Result<(u8, u8)> {
		let info = self.pallet(pallet)?;
		let call_index = info
			.call_variants
			.get(call)
			.copied()
			.ok_or_else(|| Error::Metadata(format!("call `{pallet}::{call}` not found")))?;
		Ok((info.index, call_index))
	}
}

fn constants_of(
	constants: &[frame_metadata::v14::PalletConstantMetadata<PortableForm>],
) -> HashMap<String, Vec<u8>> {
	constants.iter().map(|c| (c.name.clone(), c.value.clone())).collect()
}

fn digest_pallets(
	types: &PortableRegistry,
	pallets: impl Iterator<Item = (String, u8, HashMap<String, Vec<u8>>, Option<u32>)>,
) -> HashMap<String, PalletInfo> {
	pallets
		.map(|(name, index, constants, call_ty)| {
			let call_variants = call_ty
				.and_then(|id| types.resolve(id))
				.map(|ty| match &ty.type_def {
					TypeDef::Variant(v) =>
						v.variants.iter().map(|v| (v.name.clone(), v.index)).collect(),
					_ => HashMap::new(),
				})
				.unwrap_or_default();
			(name, PalletInfo { index, constants, call_variants })
		})
		.collect()
}
