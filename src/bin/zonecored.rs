//! The daemon entry point.
//!
//! Reads a TOML configuration, launches logging, builds the zone database
//! from the configured zones, and then idles. Signal handling, PID files
//! and socket activation are external process-management concerns not
//! covered by this crate's scope.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};
use zonecore::config::Config;
use zonecore::interfaces::NoInterfaces;
use zonecore::Host;

fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/etc/zonecore/config.toml"));

    let config = match load_config(&config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("could not load configuration from '{}': {err}", config_path.display());
            std::process::exit(1);
        }
    };

    if let Err(err) = zonecore::log::Logger::launch(&config.logging) {
        eprintln!("could not initialize logging: {err}");
        std::process::exit(1);
    }

    let runtime = tokio::runtime::Runtime::new().expect("could not start the async runtime");
    runtime.block_on(run(config));
}

async fn run(config: Config) {
    // The real AF_XDP-backed interface table and the compiled-zone reader
    // are external collaborators; this binary wires in placeholders so the
    // reconciler and scheduler can be exercised end to end without them.
    let reader = Arc::new(zonecore::zone_reader::NullCompiledZoneReader);
    let host = Host::new(Arc::new(NoInterfaces), reader);

    match host.update_db_from_config(&config) {
        Ok(count) => info!("zone database ready with {count} zones"),
        Err(err) => error!("could not build the zone database: {err}"),
    }

    // A real daemon would now accept queries and reload on SIGHUP; both
    // are out of this crate's scope.
    std::future::pending::<()>().await;
}

fn load_config(path: &std::path::Path) -> Result<Config, String> {
    let text = std::fs::read_to_string(path).map_err(|err| err.to_string())?;
    toml::from_str(&text).map_err(|err| err.to_string())
}
