//! # Tablero - Studio Project Board
//!
//! A single-user kanban board for a small creative studio, with a terminal
//! user interface and a remote row store behind a REST gateway.
//!
//! ## Key Features
//!
//! - **Four-column board**: nuevo → en curso → completo → terminado, with
//!   explicit card ordering inside each column
//! - **Checklists per project**: prioritised tasks with due dates
//! - **Completion records**: expenses, derived profit and a star rating are
//!   captured when a project is finished
//! - **Five screens**: board, month calendar, task list, history and a
//!   six-month profit summary
//! - **Google sync**: optional push of project and task dates to Google
//!   Calendar, Drive folders per project
//!
//! ## Quick Start
//!
//! ```bash
//! # Point at the remote store and sign in
//! export TABLERO_URL=https://xyz.supabase.co
//! export TABLERO_KEY=<anon key>
//! tablero auth login --email bel@estudio.mx --password ...
//!
//! # Launch the board
//! tablero board
//!
//! # Or poke around without a remote
//! tablero board --offline
//!
//! # Text summaries for scripts
//! tablero list
//! tablero history --sort utilidad
//! ```
//!
//! All local state lives in `~/.tablero/config.json`; the projects
//! themselves live in the remote store and are fetched on startup.

use clap::Parser;

pub mod cli;
pub mod cmd;
pub mod config;
pub mod gateway;
pub mod handlers;
pub mod import;
pub mod model;
pub mod session;
pub mod store;
pub mod sync;
pub mod tui {
    pub mod app;
    pub mod colors;
    pub mod form;
    pub mod input;
    pub mod run;
}
pub mod views {
    pub mod analytics;
    pub mod calendar;
    pub mod deadline;
    pub mod history;
    pub mod kanban;
    pub mod task_board;
}

use cli::Cli;
use cmd::Commands;
use config::Config;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(config::config_path);
    let mut config = Config::load(&config_path);
    config.apply_env();

    match cli.command {
        Commands::Board { offline } => cmd::cmd_board(&config, offline).await,
        Commands::List { status } => cmd::cmd_list(&config, status).await,
        Commands::History { sort } => cmd::cmd_history(&config, sort).await,
        Commands::Import { file } => cmd::cmd_import(&config, &file).await,
        Commands::Sync { pull } => cmd::cmd_sync(&config, pull).await,
        Commands::Auth { action } => cmd::cmd_auth(&config_path, &mut config, action).await,
        Commands::Completions { shell } => {
            cmd::cmd_completions(shell);
            Ok(())
        }
    }
}
