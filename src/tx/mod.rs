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

//! Call encoding and the dry-run/submit pipeline.

mod extrinsic;
mod pipeline;
mod submit;

pub use extrinsic::{build_signed, TxContext};
pub use pipeline::{execute_batch, SubmitOutcome};
pub use submit::{DryRunOutcome, InclusionReport, RpcSubmitter, Submitter};

use codec::{Compact, Encode};
use sp_runtime::MultiAddress;

use crate::{
	chain::{AccountId, MigrationLimits, MigrationTask},
	client::metadata::ChainMetadata,
	error::{Error, Result},
};

/// A SCALE-encoded runtime call: `(pallet_index, call_index, args)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCall(pub Vec<u8>);

fn lookup_of(who: &AccountId) -> MultiAddress<AccountId, ()> {
	MultiAddress::Id(who.clone())
}

/// Encodes the dispatchables this toolkit submits, with pallet/call indices
/// resolved from the connected runtime's metadata.
#[derive(Debug, Clone)]
pub struct CallBuilder {
	rebag: (u8, u8),
	put_in_front_of: (u8, u8),
	chill_other: (u8, u8),
	reap_stash: (u8, u8),
	batch_all: (u8, u8),
	continue_migrate: Option<(u8, u8)>,
}

impl CallBuilder {
	/// Resolve all indices once. The migration pallet is optional; everything
	/// else must exist.
	pub fn from_metadata(metadata: &ChainMetadata) -> Result<Self> {
		let bags = metadata.bags_list_pallet()?;
		Ok(Self {
			rebag: metadata.call_index(bags, "rebag")?,
			put_in_front_of: metadata.call_index(bags, "put_in_front_of")?,
			chill_other: metadata.call_index("Staking", "chill_other")?,
			reap_stash: metadata.call_index("Staking", "reap_stash")?,
			batch_all: metadata.call_index("Utility", "batch_all")?,
			continue_migrate: metadata
				.has_pallet("StateTrieMigration")
				.then(|| metadata.call_index("StateTrieMigration", "continue_migrate"))
				.transpose()?,
		})
	}

	fn call(index: (u8, u8), args: impl Encode) -> EncodedCall {
		let mut bytes = vec![index.0, index.1];
		args.encode_to(&mut bytes);
		EncodedCall(bytes)
	}

	/// Move a misplaced account to its canonical bag.
	pub fn rebag(&self, dislocated: &AccountId) -> EncodedCall {
		Self::call(self.rebag, lookup_of(dislocated))
	}

	/// Reorder the signer's node in front of a lighter one in the same bag.
	pub fn put_in_front_of(&self, lighter: &AccountId) -> EncodedCall {
		Self::call(self.put_in_front_of, lookup_of(lighter))
	}

	pub fn chill_other(&self, stash: &AccountId) -> EncodedCall {
		Self::call(self.chill_other, stash)
	}

	pub fn reap_stash(&self, stash: &AccountId, num_slashing_spans: u32) -> EncodedCall {
		Self::call(self.reap_stash, (stash, num_slashing_spans))
	}

	/// `continue_migrate` with the current task as witness.
	pub fn continue_migrate(
		&self,
		limits: MigrationLimits,
		real_size_upper: u32,
		witness: &MigrationTask,
	) -> Result<EncodedCall> {
		let index = self.continue_migrate.ok_or_else(|| {
			Error::Metadata("state-trie-migration pallet not present in this runtime".into())
		})?;
		Ok(Self::call(index, (limits, real_size_upper, witness)))
	}

	/// Pallet index of the migration pallet, for classifying its module
	/// errors in dry-run output.
	pub fn migration_pallet_index(&self) -> Option<u8> {
		self.continue_migrate.map(|(pallet, _)| pallet)
	}

	/// All-or-nothing batch: one failing inner call fails the whole batch.
	pub fn batch_all(&self, calls: &[EncodedCall]) -> EncodedCall {
		let mut bytes = vec![self.batch_all.0, self.batch_all.1];
		Compact(calls.len() as u32).encode_to(&mut bytes);
		for call in calls {
			bytes.extend_from_slice(&call.0);
		}
		EncodedCall(bytes)
	}
}

#[cfg(test)]
pub(crate) fn test_call_builder() -> CallBuilder {
	CallBuilder {
		rebag: (36, 2),
		put_in_front_of: (36, 3),
		chill_other: (7, 23),
		reap_stash: (7, 20),
		batch_all: (26, 2),
		continue_migrate: Some((98, 1)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::chain::MigrationProgress;
	use codec::Decode;

	fn acc(n: u8) -> AccountId {
		AccountId::new([n; 32])
	}

	#[test]
	fn rebag_encodes_pallet_call_and_lookup() {
		let call = test_call_builder().rebag(&acc(9));
		assert_eq!(call.0[0], 36);
		assert_eq!(call.0[1], 2);
		// MultiAddress::Id discriminant, then the raw 32 bytes.
		assert_eq!(call.0[2], 0);
		assert_eq!(&call.0[3..], [9u8; 32]);
	}

	#[test]
	fn batch_all_concatenates_inner_calls() {
		let builder = test_call_builder();
		let inner = vec![builder.rebag(&acc(1)), builder.rebag(&acc(2))];
		let batch = builder.batch_all(&inner);

		assert_eq!(batch.0[0], 26);
		assert_eq!(batch.0[1], 2);
		let mut cursor = &batch.0[2..];
		let count = Compact::<u32>::decode(&mut cursor).unwrap().0;
		assert_eq!(count, 2);
		assert_eq!(cursor.len(), inner[0].0.len() + inner[1].0.len());
	}

	#[test]
	fn migration_witness_round_trips() {
		let task = MigrationTask {
			progress_top: MigrationProgress::LastKey(vec![1, 2, 3]),
			progress_child: MigrationProgress::Complete,
			size: 9,
			top_items: 2,
			child_items: 1,
		};
		let call = test_call_builder()
			.continue_migrate(MigrationLimits { size: 64, item: 8 }, 128, &task)
			.unwrap();
		// args: limits, size upper bound, then the witness verbatim.
		let mut cursor = &call.0[2..];
		let limits = MigrationLimits::decode(&mut cursor).unwrap();
		let upper = u32::decode(&mut cursor).unwrap();
		let witness = MigrationTask::decode(&mut cursor).unwrap();
		assert_eq!(limits, MigrationLimits { size: 64, item: 8 });
		assert_eq!(upper, 128);
		assert_eq!(witness, task);
	}
}
