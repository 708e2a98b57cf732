use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Kanban board for the studio's projects, backed by the remote store.
/// Configuration lives in ~/.tablero/config.json unless --config says
/// otherwise.
#[derive(Parser)]
#[command(name = "tablero", version, about = "Tablero de proyectos del estudio")]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
