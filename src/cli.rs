//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "otp-provision")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(arg_required_else_help = true)]
#[command(about = "Inspect and rehearse TOTP account provisioning")]
pub struct Cli {
    /// Settings file (defaults to <config dir>/otp-provision/settings.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `otp_provision_core=trace`. Overrides RUST_LOG.
    #[arg(long, global = true, value_name = "FILTER")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: AppCommands,
}

#[derive(Debug, Subcommand)]
pub enum AppCommands {
    /// Parse a decoded QR payload and print the resulting draft
    Parse {
        /// `otpauth://...` URI or bare query string
        payload: String,
    },
    /// Validate and normalise a Base32 secret
    Normalize {
        secret: String,
    },
    /// Show the effective scan settings, optionally updating them
    Settings {
        /// New capture delay / countdown length in seconds
        #[arg(long)]
        scan_seconds: Option<u32>,
    },
    /// Run a full scan cycle against in-memory collaborators
    Simulate {
        /// Text the simulated QR decoder returns
        payload: String,
        /// Fail the capture tool launch
        #[arg(long)]
        fail_launch: bool,
        /// Leave the clipboard empty
        #[arg(long)]
        no_image: bool,
    },
}
