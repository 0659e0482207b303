use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::utils::constants::DEFAULT_CONFIG_FILE;

#[derive(Parser)]
#[command(name = "calima-detector")]
#[command(about = "Hourly air-quality store and calima episode detector")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Store snapshot path [default: from config]")]
    pub store: Option<PathBuf>,

    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE, help = "Configuration file")]
    pub config: PathBuf,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register the built-in Canary Islands locations
    Init,

    /// Register a measurement location
    AddLocation {
        #[arg(short, long)]
        name: String,

        #[arg(long, allow_hyphen_values = true)]
        latitude: f64,

        #[arg(long, allow_hyphen_values = true)]
        longitude: f64,
    },

    /// Delete a location with all its measurements and episodes
    RemoveLocation {
        #[arg(short, long)]
        name: String,
    },

    /// Import hourly measurements from a saved Open-Meteo response
    Import {
        #[arg(short, long)]
        location: String,

        #[arg(short, long, help = "Open-Meteo air-quality JSON response")]
        input_file: PathBuf,
    },

    /// Download hourly measurements from the Open-Meteo API and store them
    Fetch {
        #[arg(short, long)]
        location: String,

        #[arg(
            long,
            help = "Days of history to request, at most 90 [default: last 2 days plus 3 forecast days]"
        )]
        days: Option<u32>,
    },

    /// Detect and store new closed calima episodes
    Detect {
        #[arg(short, long, help = "Location to scan [default: all locations]")]
        location: Option<String>,

        #[arg(long, help = "Worker threads when scanning all locations [default: from config]")]
        max_workers: Option<usize>,
    },

    /// List stored calima episodes, newest first
    Events {
        #[arg(short, long)]
        location: String,

        #[arg(long, help = "Only episodes whose peak PM10 is at least this value")]
        min_pm10: Option<f64>,
    },

    /// Show daily averages (or maxima) of the stored measurements
    Daily {
        #[arg(short, long)]
        location: String,

        #[arg(long, default_value = "false")]
        max: bool,
    },

    /// Show the data point closest to now from a saved Open-Meteo response
    Current {
        #[arg(short, long)]
        location: String,

        #[arg(short, long)]
        input_file: PathBuf,

        #[arg(long, help = "RFC 3339 instant to look up [default: now]")]
        at: Option<String>,
    },
}
