//! CLI module for Fortell.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Fortell - PDF to narrated audio
///
/// Turn PDFs into single-narrator readings or two-speaker podcast episodes,
/// and search the indexed library semantically. The name comes from the
/// Norwegian "fortelle," to tell.
#[derive(Parser, Debug)]
#[command(name = "fortell")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize Fortell and verify system requirements
    Init,

    /// Check system requirements and configuration
    Doctor,

    /// Ingest PDFs into the document library and search index
    Ingest {
        /// Paths of PDF files to ingest
        paths: Vec<String>,
    },

    /// Generate audio from text or an ingested document
    Audio {
        /// Free text to read aloud
        #[arg(long, conflicts_with_all = ["file", "page", "entire"])]
        text: Option<String>,

        /// Document in the library to read from
        #[arg(long)]
        file: Option<String>,

        /// Page to read (1-based); requires --file
        #[arg(long, requires = "file", conflicts_with = "entire")]
        page: Option<u32>,

        /// Read the whole document; requires --file
        #[arg(long, requires = "file")]
        entire: bool,

        /// Podcast framing for the script
        #[arg(long)]
        podcast: bool,

        /// Two-speaker dialogue instead of a single narrator
        #[arg(long)]
        two_speakers: bool,

        /// Accent/register hint for the script
        #[arg(long, default_value = "")]
        accent: String,

        /// Delivery style hint
        #[arg(long, default_value = "")]
        style: String,

        /// Expressiveness level (brief, balanced, high)
        #[arg(long, default_value = "balanced")]
        expressiveness: String,

        /// Voice override, e.g. --voice "Speaker 1=Kore" (repeatable)
        #[arg(long = "voice")]
        voices: Vec<String>,
    },

    /// Search the indexed library semantically
    Search {
        /// Free-text query
        #[arg(long, conflicts_with_all = ["file", "page"])]
        text: Option<String>,

        /// Query by an indexed document page
        #[arg(long, requires = "page")]
        file: Option<String>,

        /// Page number of the query page (1-based)
        #[arg(long, requires = "file")]
        page: Option<u32>,

        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        k: usize,

        /// Candidate pool before page dedup (default 3k)
        #[arg(long)]
        fetch_k: Option<usize>,

        /// Minimum similarity score
        #[arg(long)]
        min_score: Option<f32>,

        /// Keep results from the query's own page
        #[arg(long)]
        include_self: bool,
    },

    /// Generate grounded insights for text or an indexed page
    Insights {
        /// Free text to analyze
        #[arg(long, conflicts_with_all = ["file", "page"])]
        text: Option<String>,

        /// Document page to analyze
        #[arg(long, requires = "page")]
        file: Option<String>,

        /// Page number (1-based)
        #[arg(long, requires = "file")]
        page: Option<u32>,

        /// Number of citations to retrieve
        #[arg(short, long, default_value = "5")]
        k: usize,
    },

    /// Compare documents: agreements and contradictions
    Cross {
        /// Restrict comparison to these documents (repeatable)
        #[arg(long = "file")]
        files: Vec<String>,

        /// Excerpts sampled per document
        #[arg(long, default_value = "5")]
        max_per_doc: usize,

        /// Sample more excerpts per document for a deeper comparison
        #[arg(long)]
        deep: bool,

        /// Optional focus for the comparison
        #[arg(long)]
        focus: Option<String>,
    },

    /// List indexed documents
    List,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "tts.workers")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Show configuration file path
    Path,
}
