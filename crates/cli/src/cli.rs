use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docanon")]
#[command(about = "Rule-based document anonymization that keeps the page layout", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Rule file (YAML)
    #[arg(long, short, global = true, env = "DOCANON_CONFIG", default_value = "config/rules.yaml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Anonymize one document (.pdf, .docx, .txt, .md)
    Anonymize {
        /// Source document
        input: PathBuf,

        /// Destination path
        output: PathBuf,

        /// Try the OCR sidecar geometry before direct extraction (PDF only)
        #[arg(long)]
        ocr: bool,

        /// Search the result for originals that survived
        #[arg(long)]
        verify: bool,

        /// Write a JSON audit report to this path
        #[arg(long)]
        audit: Option<PathBuf>,
    },

    /// Print the paragraphs of a flowed-text document
    Text {
        input: PathBuf,

        /// Print as JSON instead of one paragraph per line
        #[arg(long)]
        json: bool,
    },

    /// Dump the word geometry of a PDF as interchange XML
    Extract {
        input: PathBuf,

        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Prefer the OCR sidecar geometry
        #[arg(long)]
        ocr: bool,
    },

    /// Poll a folder and anonymize every new document
    Watch {
        #[arg(long, env = "DOCANON_INPUT", default_value = "input")]
        input_dir: PathBuf,

        #[arg(long, env = "DOCANON_OUTPUT", default_value = "output")]
        output_dir: PathBuf,

        /// Poll interval in milliseconds
        #[arg(long, default_value = "1000")]
        interval_ms: u64,

        #[arg(long)]
        ocr: bool,

        #[arg(long)]
        verify: bool,

        /// Scan once and exit
        #[arg(long)]
        once: bool,
    },
}
