// SPDX-FileCopyrightText: 2026 Fieldline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fieldline - SMS notifications for small field-service businesses.
//!
//! Binary entry point: loads configuration, then dispatches to the
//! requested subcommand.

mod serve;

use clap::{Parser, Subcommand};

/// Fieldline - SMS notification service.
#[derive(Parser, Debug)]
#[command(name = "fieldline", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the SMS gateway server.
    Serve,
    /// Print the effective configuration (secrets redacted).
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match fieldline_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            fieldline_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("fieldline serve: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => {
            print_config(&config);
        }
        None => {
            println!("fieldline: use --help for available commands");
        }
    }
}

/// Prints the effective configuration with credentials redacted.
fn print_config(config: &fieldline_config::FieldlineConfig) {
    println!("[twilio]");
    println!(
        "account_sid = {}",
        config.twilio.account_sid.as_deref().unwrap_or("(unset)")
    );
    println!(
        "auth_token = {}",
        config.twilio.auth_token.as_ref().map_or("(unset)", |_| "[redacted]")
    );
    println!(
        "from_number = {}",
        config.twilio.from_number.as_deref().unwrap_or("(unset)")
    );
    println!("test_mode = {}", config.twilio.test_mode);
    println!();
    println!("[server]");
    println!("host = {}", config.server.host);
    println!("port = {}", config.server.port);
    println!(
        "admin_api_key = {}",
        config.server.admin_api_key.as_ref().map_or("(unset)", |_| "[redacted]")
    );
    println!(
        "public_url = {}",
        config.server.public_url.as_deref().unwrap_or("(unset)")
    );
    println!();
    println!("[storage]");
    println!("database_path = {}", config.storage.database_path);
    println!("wal_mode = {}", config.storage.wal_mode);
    println!();
    println!("[sms]");
    println!(
        "fail_open_on_store_error = {}",
        config.sms.fail_open_on_store_error
    );
    println!();
    println!("[log]");
    println!("level = {}", config.log.level);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_serve() {
        let cli = Cli::parse_from(["fieldline", "serve"]);
        assert!(matches!(cli.command, Some(Commands::Serve)));
    }

    #[test]
    fn cli_parses_no_subcommand() {
        let cli = Cli::parse_from(["fieldline"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
