//! CLI argument definitions

use clap::{Parser, Subcommand};
use weighbridge_types::OutputFormat;

#[derive(Parser)]
#[command(name = "weighbridge", version, about = "Vehicle weighbridge station")]
pub struct Cli {
    /// Store records without field encryption (demo/testing only)
    #[arg(long, global = true)]
    pub plaintext: bool,

    /// Output format for record listings
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Stream live weight readings from the scale indicator
    Listen,

    /// Weigh a vehicle in: start a transaction and record the first weight
    WeighIn {
        #[arg(long)]
        lorry: String,
        #[arg(long)]
        customer: String,
        #[arg(long)]
        product: String,
        #[arg(long)]
        driver: String,
        /// Seconds to wait for a stable reading
        #[arg(long, default_value_t = 30)]
        wait: u64,
    },

    /// Weigh a pending vehicle out and complete its transaction
    WeighOut {
        #[arg(long)]
        lorry: String,
        /// Seconds to wait for a stable reading
        #[arg(long, default_value_t = 30)]
        wait: u64,
    },

    /// List pending weigh records
    Pending,

    /// List completed weigh records
    Completed,

    /// Show one record by id
    Show { id: i64 },

    /// Show or change the serial link configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the stored serial configuration
    Show,

    /// Update serial parameters (takes effect on next start)
    Set {
        #[arg(long)]
        port: Option<String>,
        #[arg(long)]
        baud: Option<u32>,
        #[arg(long)]
        data_bits: Option<u8>,
        #[arg(long)]
        stop_bits: Option<u8>,
        /// none, even, or odd
        #[arg(long)]
        parity: Option<String>,
    },
}
