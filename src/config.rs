use std::path::PathBuf;

use clap::{Parser, Subcommand};

use country_atlas::views::DEFAULT_TOPOLOGY_URL;

/// Rozmiar docelowy konturu kraju, gdy nie podano innego.
pub const COUNTRY_WIDTH: f64 = 640.0;
pub const COUNTRY_HEIGHT: f64 = 360.0;

#[derive(Parser, Debug)]
#[command(author, version, about = "Terminal world map with Equal Earth country shapes")]
pub struct Config {
    /// Directory holding the topology and country_info.json
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Topology resource path, resolved inside the data directory
    #[arg(long, default_value = DEFAULT_TOPOLOGY_URL)]
    pub topology: String,

    /// JSON object mapping ISO numeric codes to alpha-2 codes; the built-in
    /// ISO 3166-1 table is used when omitted
    #[arg(long)]
    pub iso_table: Option<PathBuf>,

    /// Open this country page at startup (alpha-2 code)
    #[arg(long)]
    pub country: Option<String>,

    /// Log file for the interactive mode
    #[arg(long, default_value = "country-atlas.log")]
    pub log_file: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Export the world map or one country as an SVG document
    Svg {
        /// Alpha-2 code; without it the whole world is exported
        #[arg(long)]
        country: Option<String>,

        /// Alpha-2 code drawn highlighted on the world map
        #[arg(long, conflicts_with = "country")]
        highlight: Option<String>,

        /// Target width (default 640 for a country, 980 for the world)
        #[arg(long)]
        width: Option<f64>,

        /// Target height (default 360 for a country, 520 for the world)
        #[arg(long)]
        height: Option<f64>,

        /// Output file; stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },
}
