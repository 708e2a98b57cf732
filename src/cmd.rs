//! Command implementations for the CLI interface.
//!
//! Each subcommand gets a `cmd_*` function. Anything that talks to the
//! remote builds its gateway from the loaded configuration; the board can
//! also run against an in-memory gateway with `--offline`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::{Local, Utc};
use clap::Subcommand;
use clap_complete::{generate, Shell};

use crate::config::Config;
use crate::gateway::{MemoryGateway, ProjectGateway, RestGateway};
use crate::handlers;
use crate::import::import_file;
use crate::model::Status;
use crate::session::SessionProvider;
use crate::store::ProjectStore;
use crate::sync::GoogleSync;
use crate::tui::run::run_board_tui;
use crate::views::deadline::deadline_status;
use crate::views::history::{format_stars, project_history, HistorySort};
use crate::views::kanban::project_kanban;

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive board.
    Board {
        /// Run against an in-memory store, no remote or sign-in needed.
        #[arg(long)]
        offline: bool,
    },

    /// Print the board as a text summary.
    List {
        /// Only show one column.
        #[arg(long, value_enum)]
        status: Option<Status>,
    },

    /// Print the history of finished projects.
    History {
        /// Sort key for the list.
        #[arg(long, value_enum, default_value_t = HistorySort::Fecha)]
        sort: HistorySort,
    },

    /// Import a legacy JSON export into the remote store.
    Import {
        /// Path to the export file. The file itself is never modified.
        file: PathBuf,
    },

    /// Push project and task dates to Google Calendar.
    Sync {
        /// Also pull date changes made in the calendar back into the board.
        #[arg(long)]
        pull: bool,
    },

    /// Manage the remote session and Google authorisation.
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// Generate shell completion script to stdout.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum AuthAction {
    /// Sign in to the remote store with email and password.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Store a Google OAuth access token for the calendar/drive sync.
    Google {
        /// Access token from the OAuth flow.
        #[arg(long)]
        token: String,
        /// Token lifetime in seconds, as reported by Google.
        #[arg(long, default_value_t = 3600)]
        expires_in: i64,
    },
    /// Drop the stored session and Google token.
    Logout,
    /// Show who is signed in.
    Status,
}

fn build_gateway(config: &Config) -> anyhow::Result<RestGateway> {
    if !config.has_store() {
        bail!(
            "falta configurar el remoto: define TABLERO_URL y TABLERO_KEY \
             o edita {}",
            crate::config::config_path().display()
        );
    }
    Ok(RestGateway::new(
        &config.store_url,
        &config.store_key,
        config.session_token.as_deref(),
    ))
}

/// Validate the stored session and return the signed-in user's label.
async fn require_session(config: &Config) -> anyhow::Result<String> {
    let Some(token) = config.session_token.as_deref() else {
        bail!("no hay sesión activa, entra con `tablero auth login`");
    };
    let provider = SessionProvider::new(&config.store_url, &config.store_key);
    let session = provider
        .current_user(token)
        .await
        .context("la sesión expiró, entra de nuevo con `tablero auth login`")?;
    Ok(session.name)
}

async fn load_store(gateway: &dyn ProjectGateway) -> anyhow::Result<ProjectStore> {
    let mut store = ProjectStore::new();
    handlers::refresh(&mut store, gateway)
        .await
        .context("no se pudieron cargar los proyectos")?;
    Ok(store)
}

pub async fn cmd_board(config: &Config, offline: bool) -> anyhow::Result<()> {
    if offline {
        let gateway: Box<dyn ProjectGateway> = Box::new(MemoryGateway::new());
        run_board_tui(ProjectStore::new(), gateway, String::new(), true).await?;
        return Ok(());
    }

    let user_label = require_session(config).await?;
    let gateway = build_gateway(config)?;
    let store = load_store(&gateway).await?;
    run_board_tui(store, Box::new(gateway), user_label, false).await?;
    Ok(())
}

pub async fn cmd_list(config: &Config, status: Option<Status>) -> anyhow::Result<()> {
    let gateway = build_gateway(config)?;
    let store = load_store(&gateway).await?;
    let today = Local::now().date_naive();

    let resumen: Vec<String> = store
        .counts_by_status()
        .iter()
        .map(|(s, n)| format!("{} {n}", s.title()))
        .collect();
    println!("{}", resumen.join(" | "));
    println!();

    for column in project_kanban(&store, today) {
        if status.is_some_and(|s| s != column.status) {
            continue;
        }
        println!("{} ({})", column.status.title(), column.total);
        for card in &column.cards {
            let mut line = format!("  {}", card.project.nombre);
            if let Some(deadline) = deadline_status(card.project, today) {
                line.push_str(&format!("  [{}]", deadline.message));
            }
            if let Some(progress) = &card.progress {
                line.push_str(&format!("  ✓{}/{}", progress.completed, progress.total));
            }
            println!("{line}");
        }
        if column.status == Status::Terminado && column.total > column.cards.len() {
            println!("  ... y {} más en el historial", column.total - column.cards.len());
        }
        println!();
    }
    Ok(())
}

pub async fn cmd_history(config: &Config, sort: HistorySort) -> anyhow::Result<()> {
    let gateway = build_gateway(config)?;
    let store = load_store(&gateway).await?;

    let entries = project_history(&store, sort);
    if entries.is_empty() {
        println!("Todavía no hay proyectos terminados.");
        return Ok(());
    }
    println!("Historial, orden por {}:", sort.label());
    for entry in entries {
        println!(
            "  {}  {}  {}  ${:.0}",
            entry.fecha,
            entry.nombre,
            format_stars(entry.calificacion),
            entry.utilidad
        );
    }
    Ok(())
}

pub async fn cmd_import(config: &Config, file: &Path) -> anyhow::Result<()> {
    let gateway = build_gateway(config)?;
    let mut store = ProjectStore::new();
    let count = import_file(file, &mut store, &gateway, Utc::now())
        .await
        .with_context(|| format!("no se pudo importar {}", file.display()))?;
    println!("Importados {count} proyectos desde {}.", file.display());
    Ok(())
}

fn build_google_sync(config: &Config) -> anyhow::Result<GoogleSync> {
    let (Some(token), Some(expiry)) = (&config.google_token, config.google_token_expiry) else {
        bail!("falta autorizar Google, usa `tablero auth google --token ...`");
    };
    let mut sync = GoogleSync::new();
    sync.set_token_until(token, expiry);
    if !sync.has_valid_token(Utc::now()) {
        bail!("el token de Google expiró, autoriza de nuevo con `tablero auth google`");
    }
    Ok(sync)
}

pub async fn cmd_sync(config: &Config, pull: bool) -> anyhow::Result<()> {
    let gateway = build_gateway(config)?;
    let mut store = load_store(&gateway).await?;
    let sync = build_google_sync(config)?;
    let now = Utc::now();

    if pull {
        let updated = sync
            .fetch_updates_from_calendar(&mut store, now)
            .await
            .context("no se pudieron traer cambios del calendario")?;
        if updated > 0 {
            let snapshot: Vec<_> = store.all().to_vec();
            gateway.upsert_all(&snapshot).await?;
        }
        println!("Fechas actualizadas desde el calendario: {updated} proyectos.");
        return Ok(());
    }

    let mut folders = 0usize;
    for (id, nombre) in crate::sync::projects_without_folder(&store) {
        match sync.create_project_folder(&nombre, now).await {
            Ok(link) => {
                store.replace(&id, |p| p.drive_link = link);
                if let Some(project) = store.find(&id) {
                    gateway.update(project).await?;
                }
                folders += 1;
            }
            Err(e) => log::warn!("carpeta sin crear ({nombre}): {e}"),
        }
    }

    let mut events = 0usize;
    let mut skipped = 0usize;
    for project in store.all() {
        if project.status == Status::Terminado {
            continue;
        }
        match sync.sync_project_to_calendar(project, now).await {
            Ok(_) => events += 1,
            Err(crate::sync::SyncError::MissingDates) => skipped += 1,
            Err(e) => {
                log::warn!("no se pudo sincronizar {}: {e}", project.nombre);
                skipped += 1;
            }
        }
        for task in &project.tasks {
            if task.completed || task.due_date.is_none() {
                continue;
            }
            match sync.sync_task_to_calendar(project, task, now).await {
                Ok(_) => events += 1,
                Err(e) => log::warn!("tarea sin sincronizar ({}): {e}", task.text),
            }
        }
    }
    println!(
        "Eventos creados: {events}. Carpetas nuevas: {folders}. Proyectos sin fechas: {skipped}."
    );
    Ok(())
}

pub async fn cmd_auth(
    config_path: &Path,
    config: &mut Config,
    action: AuthAction,
) -> anyhow::Result<()> {
    match action {
        AuthAction::Login { email, password } => {
            if !config.has_store() {
                bail!("configura primero el remoto (TABLERO_URL / TABLERO_KEY)");
            }
            let provider = SessionProvider::new(&config.store_url, &config.store_key);
            let session = provider
                .login(&email, &password)
                .await
                .context("no se pudo iniciar sesión")?;
            config.session_token = Some(session.access_token.clone());
            config.save(config_path)?;
            println!("Sesión iniciada como {}.", session.name);
        }
        AuthAction::Google { token, expires_in } => {
            let mut sync = GoogleSync::new();
            sync.set_token(&token, expires_in, Utc::now());
            config.google_token = Some(token);
            config.google_token_expiry = sync.token_expiry();
            config.save(config_path)?;
            println!("Token de Google guardado.");
        }
        AuthAction::Logout => {
            config.session_token = None;
            config.google_token = None;
            config.google_token_expiry = None;
            config.save(config_path)?;
            println!("Sesión cerrada.");
        }
        AuthAction::Status => {
            if config.session_token.is_none() {
                println!("Sin sesión activa.");
            } else {
                match require_session(config).await {
                    Ok(name) => println!("Sesión activa: {name}."),
                    Err(e) => println!("Sesión guardada pero inválida: {e}."),
                }
            }
            match (&config.google_token, config.google_token_expiry) {
                (Some(_), Some(expiry)) if Utc::now() < expiry => {
                    println!("Google autorizado hasta {}.", expiry.to_rfc3339());
                }
                (Some(_), _) => println!("Token de Google expirado."),
                _ => println!("Google sin autorizar."),
            }
        }
    }
    Ok(())
}

pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    let mut cmd = crate::cli::Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
}
