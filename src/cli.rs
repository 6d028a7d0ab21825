use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "persona-digest",
    about = "Persona-driven section ranking for document collections",
    version
)]
pub struct Cli {
    /// Log at debug level (RUST_LOG still wins when set)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process a single challenge input file
    Process {
        /// Challenge input JSON
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the output JSON
        #[arg(short, long)]
        output: PathBuf,

        /// Directory holding the PDFs (default: PDFs/ or pdfs/ beside the input)
        #[arg(long)]
        pdf_dir: Option<PathBuf>,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Process every collection under a directory
    Batch {
        /// Directory of collections (default: ./collections)
        #[arg(short, long)]
        collections: Option<PathBuf>,

        #[command(flatten)]
        engine: EngineArgs,
    },
}

#[derive(Args)]
pub struct EngineArgs {
    /// Engine configuration JSON; missing fields keep their defaults
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Persona, job and category tables JSON (default: built-in tables)
    #[arg(long)]
    pub knowledge: Option<PathBuf>,

    /// Record per-stage timings in the output metadata
    #[arg(long)]
    pub timings: bool,

    /// Never fall back to the external pdftotext command
    #[arg(long)]
    pub no_pdftotext: bool,
}
