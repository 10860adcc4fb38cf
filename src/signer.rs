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

//! Transaction signer resolution.
//!
//! Resolution order: explicit CLI value (a file path first, else the value is
//! treated as the secret URI itself), then the `SEED` environment variable,
//! then the `//Alice` dev account as a last resort.

use log::*;
use sp_core::{crypto::Ss58Codec, sr25519, Pair as _};

use crate::{
	chain::AccountId,
	error::{Error, Result},
};

const LOG_TARGET: &str = "signer";

/// Environment variable consulted when no seed is passed on the command line.
pub const SEED_ENV: &str = "SEED";

/// A resolved sr25519 signing identity.
#[derive(Clone)]
pub struct Signer {
	pair: sr25519::Pair,
	account: AccountId,
}

impl Signer {
	/// Resolve from an optional CLI argument, the environment, or `//Alice`.
	pub fn resolve(cli_seed: Option<&str>, ss58_prefix: u16) -> Result<Self> {
		let suri = match cli_seed.map(str::to_owned).or_else(|| std::env::var(SEED_ENV).ok()) {
			Some(value) => match std::fs::read_to_string(&value) {
				Ok(contents) => contents.trim().to_owned(),
				Err(_) => {
					debug!(
						target: LOG_TARGET,
						"seed argument is not a readable file, treating it as the suri itself",
					);
					value
				},
			},
			None => {
				info!(target: LOG_TARGET, "no seed configured, using the //Alice dev account");
				"//Alice".into()
			},
		};

		let pair = sr25519::Pair::from_string(&suri, None)
			.map_err(|e| Error::Config(format!("cannot derive keypair from seed: {e:?}")))?;
		let account = AccountId::from(pair.public());
		info!(
			target: LOG_TARGET,
			"📣 signing as {}",
			account.to_ss58check_with_version(ss58_prefix.into()),
		);
		Ok(Self { pair, account })
	}

	pub fn account(&self) -> &AccountId {
		&self.account
	}

	/// Sign an opaque payload.
	pub fn sign(&self, payload: &[u8]) -> sr25519::Signature {
		self.pair.sign(payload)
	}
}
