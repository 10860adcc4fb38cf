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
use crate::staking;

#[derive(StructOpt, Debug)]
pub struct ReapStashParams {
	#[structopt(flatten)]
	shared: SharedParams,
	/// Send the reap batch instead of only reporting.
	#[structopt(long = "send-tx", short = "T")]
	send_tx: bool,
	/// Maximum number of stashes to reap.
	#[structopt(long, short = "c")]
	count: Option<usize>,
}

impl ReapStashParams {
	pub async fn run(self) -> anyhow::Result<()> {
		let ctx = super::setup(&self.shared).await?;
		staking::reap_stash(&ctx.chain, &ctx.submitter, &ctx.builder, self.count, self.send_tx)
			.await?;
		Ok(())
	}
}
