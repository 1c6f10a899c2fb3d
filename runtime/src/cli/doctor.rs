//! Environment readiness check.

use crate::config::{AcquisitionConfig, ENV_FILE};
use crate::renderer::chromium::find_chromium;
use anyhow::Result;

/// Check Chromium availability, configuration and the work directory.
pub async fn run() -> Result<()> {
    println!("rentsched doctor");
    println!("================");
    println!();

    if std::path::Path::new(ENV_FILE).exists() {
        println!("[OK] Env file: {ENV_FILE}");
    } else {
        println!("[--] No {ENV_FILE} file; using process environment only");
    }

    let config = AcquisitionConfig::from_env();
    let chromium = match &config {
        Ok(c) if c.chromium_path.is_some() => c.chromium_path.clone().filter(|p| p.exists()),
        _ => find_chromium(),
    };
    match &chromium {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => println!("[!!] Chromium NOT found. Set RENTSCHED_CHROMIUM_PATH or install Chrome."),
    }

    match &config {
        Ok(c) => {
            println!("[OK] Login URL: {}", c.login_url);
            println!("[OK] Username: {}", c.credentials.username);
            let probe = c.work_dir.join("runs");
            match std::fs::create_dir_all(&probe) {
                Ok(()) => println!("[OK] Work dir writable: {}", c.work_dir.display()),
                Err(e) => println!("[!!] Work dir {} not writable: {e}", c.work_dir.display()),
            }
        }
        Err(e) => println!("[!!] Configuration: {e}"),
    }

    println!();
    if chromium.is_some() && config.is_ok() {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }
    Ok(())
}
