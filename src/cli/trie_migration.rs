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

use structopt::StructOpt;

use super::SharedParams;
use crate::migration;

#[derive(StructOpt, Debug)]
pub struct TrieMigrationParams {
	#[structopt(flatten)]
	shared: SharedParams,
	/// Number of items to try to migrate per round. Halved automatically when
	/// the simulation reports the size bound exceeded.
	#[structopt(long = "item-limit")]
	item_limit: u32,
	/// Byte budget per round. Never reduced automatically.
	#[structopt(long = "size-limit")]
	size_limit: u32,
	/// Total number of rounds to submit. Unlimited if not set.
	#[structopt(long, short = "c")]
	count: Option<usize>,
}

impl TrieMigrationParams {
	pub async fn run(self) -> anyhow::Result<()> {
		let ctx = super::setup(&self.shared).await?;
		let who = ctx.submitter.signer().account().clone();
		migration::run_migration(
			&ctx.chain,
			&ctx.submitter,
			&ctx.builder,
			&who,
			self.item_limit,
			self.size_limit,
			self.count,
		)
		.await?;
		Ok(())
	}
}
