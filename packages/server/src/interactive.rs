//! Interactive mode for the server.
//!
//! Prompts for the bind address, port, and raster directory before
//! starting the server.

use dialoguer::{Confirm, Input};
use siting_map_database::paths;

/// Runs the server in interactive mode, prompting for configuration.
///
/// Sets `BIND_ADDR`, `PORT`, and `RASTER_DIR` from the answers and
/// delegates to [`super::run_server`].
///
/// # Errors
///
/// Returns [`super::ServerError`] if the underlying server fails to start.
#[allow(clippy::future_not_send)]
pub async fn run() -> Result<(), super::ServerError> {
    println!("Siting Map Server");
    println!();

    let bind_addr: String = Input::new()
        .with_prompt("Bind address")
        .default("127.0.0.1".to_string())
        .interact_text()
        .unwrap_or_else(|_| "127.0.0.1".to_string());

    let port_str: String = Input::new()
        .with_prompt("Port")
        .default("8080".to_string())
        .validate_with(|input: &String| -> Result<(), &str> {
            input.parse::<u16>().map(|_| ()).map_err(|_| "Not a valid port")
        })
        .interact_text()
        .unwrap_or_else(|_| "8080".to_string());

    let default_raster_dir = paths::from_env_or("RASTER_DIR", paths::raster_dir)
        .display()
        .to_string();
    let raster_dir: String = Input::new()
        .with_prompt("Raster directory")
        .default(default_raster_dir.clone())
        .interact_text()
        .unwrap_or(default_raster_dir);

    // SAFETY: We are single-threaded at this point (before server starts) and
    // these variables are only read once during server initialisation.
    unsafe {
        std::env::set_var("BIND_ADDR", &bind_addr);
        std::env::set_var("PORT", &port_str);
        std::env::set_var("RASTER_DIR", &raster_dir);
    }

    if !Confirm::new()
        .with_prompt(format!("Start server on {bind_addr}:{port_str}?"))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return Ok(());
    }

    super::run_server().await
}
