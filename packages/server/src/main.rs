#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Standalone entry point for the postcode map API server.
//!
//! Configuration comes from the embedded defaults, `POSTCODE_MAP_CONFIG`
//! and the environment. Pass `--interactive` to be prompted for the bind
//! address and port.

use postcode_map_config::AppConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = AppConfig::load(None).map_err(std::io::Error::other)?;

    if std::env::args().skip(1).any(|arg| arg == "--interactive") {
        return postcode_map_server::interactive::run(config).await;
    }

    postcode_map_server::run_server(config).await
}
