use clap::{Parser, Subcommand, ValueEnum};
use manualgen::manual::{DetailLevel, Language};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "manualgen")]
#[command(about = "Generate step-by-step operation manuals from screen recordings", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API
    Server(ServerArgs),
    /// Upload a video to a running server and write the generated manual
    Generate(GenerateArgs),
    /// Trigger the retention sweep on a running server
    Cleanup(CleanupArgs),
    /// Print the effective configuration (secrets are omitted)
    Config,
}

#[derive(clap::Args, Debug)]
pub struct ServerArgs {
    /// Address to bind the HTTP server to; defaults to `server.bind_addr`
    #[arg(long)]
    pub address: Option<SocketAddr>,
}

#[derive(clap::Args, Debug)]
pub struct GenerateArgs {
    /// Video file to upload (mp4, mov, avi, webm)
    #[arg(long)]
    pub file: PathBuf,

    #[arg(long, default_value = "ja")]
    pub language: Language,

    #[arg(long, default_value = "simple")]
    pub detail_level: DetailLevel,

    /// Base URL of the manualgen API
    #[arg(long, default_value = "http://localhost:8080")]
    pub server: String,

    /// Directory the exported files are written to
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = ExportFormat::Markdown)]
    pub format: ExportFormat,

    /// Inline screenshots into the HTML document as data URIs
    #[arg(long)]
    pub embed_images: bool,

    /// Accept the terms of use for uploaded content
    #[arg(long)]
    pub consent: bool,
}

#[derive(clap::Args, Debug)]
pub struct CleanupArgs {
    /// Base URL of the manualgen API
    #[arg(long, default_value = "http://localhost:8080")]
    pub server: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    Html,
    Both,
}

impl ExportFormat {
    pub fn markdown(&self) -> bool {
        matches!(self, ExportFormat::Markdown | ExportFormat::Both)
    }

    pub fn html(&self) -> bool {
        matches!(self, ExportFormat::Html | ExportFormat::Both)
    }
}
