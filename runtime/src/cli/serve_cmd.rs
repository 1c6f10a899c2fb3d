//! HTTP service mode.

use crate::config::AcquisitionConfig;
use crate::rest;
use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

pub async fn run(host: &str, port: u16) -> Result<()> {
    let config = AcquisitionConfig::from_env()?;
    let acquisition = super::prepare_acquisition(config)?;

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    info!("starting rentsched v{} on http://{addr}", env!("CARGO_PKG_VERSION"));
    rest::serve(addr, Arc::new(acquisition)).await
}
