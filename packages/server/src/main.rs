#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Binary entry point for the siting map API server.

#[actix_web::main]
async fn main() -> Result<(), siting_map_server::ServerError> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    siting_map_server::run_server().await
}
