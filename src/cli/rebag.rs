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

use std::str::FromStr;

use log::*;
use sp_core::crypto::Ss58Codec;
use structopt::StructOpt;

use super::SharedParams;
use crate::{
	bags::{check_list, check_single, ThresholdTable},
	chain::AccountId,
	error::Error,
	tx::execute_batch,
};

/// Whose placement to examine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebagTarget {
	/// The whole list.
	All,
	/// Stop after this many misplaced entries.
	Count(usize),
	/// One account only.
	One(AccountId),
}

impl FromStr for RebagTarget {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		if raw == "all" {
			return Ok(Self::All)
		}
		if let Ok(count) = raw.parse::<usize>() {
			if count == 0 {
				return Err(Error::Config("target count must be at least 1".into()))
			}
			return Ok(Self::Count(count))
		}
		AccountId::from_ss58check(raw).map(Self::One).map_err(|e| {
			Error::Config(format!("target must be \"all\", a number, or an ss58 account: {e:?}"))
		})
	}
}

#[derive(StructOpt, Debug)]
pub struct RebagParams {
	#[structopt(flatten)]
	shared: SharedParams,
	/// Send the correcting transaction instead of only reporting.
	#[structopt(long = "send-tx", short = "T")]
	send_tx: bool,
	/// Who to target: "all", a number of misplaced entries to collect, or one
	/// ss58 account id.
	#[structopt(long, short = "t", default_value = "all")]
	target: RebagTarget,
}

impl RebagParams {
	pub async fn run(self) -> anyhow::Result<()> {
		let ctx = super::setup(&self.shared).await?;
		let thresholds = ThresholdTable::load(&ctx.chain).await?;
		info!("connected; {} thresholds, block {:?}", thresholds.len(), ctx.chain.at());

		let misplaced = match &self.target {
			RebagTarget::All => check_list(&ctx.chain, &thresholds, None).await?.misplaced,
			RebagTarget::Count(count) =>
				check_list(&ctx.chain, &thresholds, Some(*count)).await?.misplaced,
			RebagTarget::One(who) => check_single(&ctx.chain, &thresholds, who)
				.await?
				.filter(|action| action.needs_rebag())
				.into_iter()
				.collect(),
		};

		let calls = misplaced
			.iter()
			.filter_map(|action| action.who())
			.map(|who| ctx.builder.rebag(who))
			.collect();
		execute_batch(&ctx.submitter, &ctx.builder, calls, None, self.send_tx, "rebag")
			.await?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use assert_matches::assert_matches;

	#[test]
	fn parses_all_and_counts() {
		assert_eq!("all".parse::<RebagTarget>().unwrap(), RebagTarget::All);
		assert_eq!("17".parse::<RebagTarget>().unwrap(), RebagTarget::Count(17));
	}

	#[test]
	fn parses_an_ss58_account() {
		// the Alice dev account.
		let target = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY"
			.parse::<RebagTarget>()
			.unwrap();
		assert_matches!(target, RebagTarget::One(_));
	}

	#[test]
	fn garbage_target_is_a_config_error() {
		assert_matches!("certainly-not-an-account".parse::<RebagTarget>(), Err(Error::Config(_)));
	}

	#[test]
	fn zero_target_is_a_config_error() {
		assert_matches!("0".parse::<RebagTarget>(), Err(Error::Config(_)));
	}
}
