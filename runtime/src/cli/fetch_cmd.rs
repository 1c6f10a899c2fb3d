//! One acquisition run from the command line.

use crate::config::AcquisitionConfig;
use crate::dates::parse_target_dates;
use anyhow::{bail, Result};

pub async fn run(dates: &[String], pretty: bool) -> Result<()> {
    let config = AcquisitionConfig::from_env()?;
    let dates = parse_target_dates(dates);
    if dates.is_empty() {
        bail!("no valid dates given (expected YYYY-MM-DD)");
    }

    let acquisition = super::prepare_acquisition(config)?;
    let report = acquisition.run(&dates).await?;
    super::print_json(&report, pretty)
}
