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

use log::*;
use sp_core::crypto::Ss58Codec;
use structopt::StructOpt;

use super::SharedParams;
use crate::{bags::find_lighter, chain::AccountId, error::Error};

#[derive(StructOpt, Debug)]
pub struct InFrontParams {
	#[structopt(flatten)]
	shared: SharedParams,
	/// The account whose bag position to examine, ss58.
	#[structopt(long, short = "t", parse(try_from_str = parse_account))]
	target: AccountId,
}

fn parse_account(raw: &str) -> Result<AccountId, Error> {
	AccountId::from_ss58check(raw)
		.map_err(|e| Error::Config(format!("target must be an ss58 account: {e:?}")))
}

impl InFrontParams {
	pub async fn run(self) -> anyhow::Result<()> {
		let ctx = super::setup(&self.shared).await?;
		match find_lighter(&ctx.chain, &self.target).await? {
			Some(lighter) => {
				info!(
					"{} can be put in front of {}; submit put_in_front_of as the target account",
					self.target, lighter,
				);
			},
			None => info!("{} cannot improve its position", self.target),
		}
		Ok(())
	}
}
