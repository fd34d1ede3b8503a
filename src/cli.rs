use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Translate extracted content files into a mirrored output tree
    Translate {
        /// Directory of extracted content files (one subdirectory per category)
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Output directory for translated files
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Override the configured target language
        #[arg(short, long)]
        target_lang: Option<String>,
    },

    /// Report which content files already have a complete checkpoint
    Status {
        /// Directory of extracted content files
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Output directory holding prior translations
        #[arg(short, long)]
        output_dir: PathBuf,
    },

    /// Manage the local dictionary cache
    Dict {
        #[command(subcommand)]
        action: DictAction,
    },
}

#[derive(Subcommand)]
pub enum DictAction {
    /// Download the dictionary snapshot into the local cache
    Fetch,

    /// Show cache location, entry count and size
    Info,

    /// Remove the cached snapshot, forcing a re-fetch on next use
    Clear,
}
