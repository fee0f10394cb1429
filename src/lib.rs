pub mod cli;
pub mod commands;
pub mod logging;

use std::sync::Arc;

use clap::Parser;
use otp_provision_core::provision::{JsonSettingsFile, SettingsProvider};

use crate::cli::{AppCommands, Cli};

pub fn run() {
  let cli = Cli::parse();

  if let Err(e) = logging::init(cli.log_level.as_deref()) {
    eprintln!("{}", e);
    std::process::exit(2);
  }

  tracing::debug!(settings = ?cli.settings, "Starting otp-provision");

  match dispatch(cli) {
    Ok(output) => println!("{}", output),
    Err(e) => {
      log::error!("{}", e);
      std::process::exit(1);
    }
  }
}

fn dispatch(cli: Cli) -> Result<String, String> {
  let value = match cli.command {
    AppCommands::Parse { payload } => commands::parse(&payload)?,
    AppCommands::Normalize { secret } => commands::normalize(&secret)?,
    AppCommands::Settings { scan_seconds } => {
      let path = commands::settings_path(cli.settings)?;
      commands::settings(path, scan_seconds)?
    }
    AppCommands::Simulate {
      payload,
      fail_launch,
      no_image,
    } => {
      let path = commands::settings_path(cli.settings)?;
      let settings: Arc<dyn SettingsProvider> = Arc::new(JsonSettingsFile::open(path)?);
      let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start async runtime: {}", e))?;
      runtime.block_on(commands::simulate(settings, payload, fail_launch, no_image))?
    }
  };
  serde_json::to_string_pretty(&value).map_err(|e| e.to_string())
}
