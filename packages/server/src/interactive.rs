//! Interactive mode for the server.
//!
//! Prompts the user for bind address and port before starting the server.

use dialoguer::{Confirm, Input};
use postcode_map_config::AppConfig;

/// Runs the server in interactive mode, prompting for configuration.
///
/// Asks for a bind address and port, defaulting to the values already in
/// `config`, and delegates to [`super::run_server`].
///
/// # Errors
///
/// Returns an `std::io::Result` error if the underlying server fails to
/// start.
#[allow(clippy::future_not_send)]
pub async fn run(mut config: AppConfig) -> std::io::Result<()> {
    println!("Postcode Map Server");
    println!();

    let default_addr = config.server.bind_addr.clone();
    config.server.bind_addr = Input::new()
        .with_prompt("Bind address")
        .default(default_addr.clone())
        .interact_text()
        .unwrap_or(default_addr);

    let default_port = config.server.port;
    config.server.port = Input::new()
        .with_prompt("Port")
        .default(default_port)
        .interact_text()
        .unwrap_or(default_port);

    if !Confirm::new()
        .with_prompt(format!(
            "Start server on {}:{}?",
            config.server.bind_addr, config.server.port
        ))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return Ok(());
    }

    super::run_server(config).await
}
