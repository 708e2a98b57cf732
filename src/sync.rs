//! Best-effort Google Calendar and Drive integration.
//!
//! Everything here is optional: a sync failure is reported to the user and
//! logged, but never blocks or rolls back board operations. Tokens come from
//! an external OAuth flow and are held with a safety margin before expiry.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Priority, Project, Status, Task};
use crate::store::ProjectStore;

const CALENDAR_EVENTS_URL: &str =
    "https://www.googleapis.com/calendar/v3/calendars/primary/events";
const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const DRIVE_FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const DRIVE_ROOT_FOLDER: &str = "RANDOM Proyectos";

/// Events synced from the board carry this summary prefix so they can be
/// recognised on the way back.
const PROJECT_PREFIX: &str = "[KANBAN] ";
const TASK_PREFIX: &str = "[TAREA] ";

/// Margin subtracted from a token's lifetime so it is never used at the edge
/// of expiry.
const TOKEN_SKEW_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("conecta tu cuenta de Google primero")]
    NotAuthorised,
    #[error("el proyecto necesita fecha de inicio o fecha fin para sincronizar")]
    MissingDates,
    #[error("la tarea necesita fecha límite para sincronizar")]
    MissingDueDate,
    #[error("error de red: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Google rechazó la solicitud (HTTP {status}): {body}")]
    Remote { status: u16, body: String },
}

/// All-day event payload for the Calendar API.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CalendarEvent {
    pub summary: String,
    pub description: String,
    pub start: EventDate,
    pub end: EventDate,
    #[serde(rename = "colorId")]
    pub color_id: &'static str,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventDate {
    pub date: NaiveDate,
}

fn color_for_status(status: Status) -> &'static str {
    match status {
        Status::Nuevo => "7",
        Status::EnCurso => "9",
        Status::Terminado => "10",
        Status::Completo => "1",
    }
}

fn color_for_priority(priority: Priority) -> &'static str {
    match priority {
        Priority::Alta => "11",
        Priority::Media => "5",
        Priority::Normal => "1",
    }
}

fn join_lines(lines: Vec<String>) -> String {
    lines
        .into_iter()
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the all-day event for a project's date range.
pub fn project_event(project: &Project) -> Result<CalendarEvent, SyncError> {
    let (start, end) = project.date_range().ok_or(SyncError::MissingDates)?;

    let mut lines = Vec::new();
    if !project.cliente.is_empty() {
        lines.push(format!("Cliente: {}", project.cliente));
    }
    if !project.artista.is_empty() {
        lines.push(format!("Artista: {}", project.artista));
    }
    if !project.tipo.is_empty() {
        lines.push(format!("Tipo: {}", project.tipo));
    }
    if !project.contexto.is_empty() {
        lines.push(format!("\n{}", project.contexto));
    }
    if !project.drive_link.is_empty() {
        lines.push(format!("\nDrive: {}", project.drive_link));
    }

    Ok(CalendarEvent {
        summary: format!("{}{}", PROJECT_PREFIX, project.nombre),
        description: join_lines(lines),
        start: EventDate { date: start },
        end: EventDate { date: end.max(start) },
        color_id: color_for_status(project.status),
    })
}

/// Build the all-day event for a task's due date.
pub fn task_event(project: &Project, task: &Task) -> Result<CalendarEvent, SyncError> {
    let due = task.due_date.ok_or(SyncError::MissingDueDate)?;

    let mut lines = vec![format!("Proyecto: {}", project.nombre)];
    if !project.cliente.is_empty() {
        lines.push(format!("Cliente: {}", project.cliente));
    }
    if task.priority != Priority::Normal {
        lines.push(format!("Prioridad: {}", task.priority.as_str()));
    }

    Ok(CalendarEvent {
        summary: format!("{}{}", TASK_PREFIX, task.text),
        description: join_lines(lines),
        start: EventDate { date: due },
        end: EventDate { date: due },
        color_id: color_for_priority(task.priority),
    })
}

/// Active projects still lacking a Drive folder link, as (id, nombre) pairs.
/// The sync command creates a folder for each and writes the link back.
pub fn projects_without_folder(store: &ProjectStore) -> Vec<(String, String)> {
    store
        .all()
        .iter()
        .filter(|p| p.status != Status::Terminado && p.drive_link.is_empty())
        .map(|p| (p.id.clone(), p.nombre.clone()))
        .collect()
}

#[derive(Debug, Clone)]
struct Token {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Stateful client for the Calendar and Drive endpoints.
pub struct GoogleSync {
    client: reqwest::Client,
    token: Option<Token>,
}

impl Default for GoogleSync {
    fn default() -> Self {
        GoogleSync::new()
    }
}

impl GoogleSync {
    pub fn new() -> Self {
        GoogleSync {
            client: reqwest::Client::new(),
            token: None,
        }
    }

    /// Adopt a token from the OAuth flow. `expires_in` is the lifetime in
    /// seconds as reported by Google; the skew margin comes off it here.
    pub fn set_token(&mut self, access_token: &str, expires_in: i64, now: DateTime<Utc>) {
        self.token = Some(Token {
            access_token: access_token.to_string(),
            expires_at: now + Duration::seconds(expires_in - TOKEN_SKEW_SECS),
        });
    }

    /// Adopt a token with an already-computed expiry, as stored in config.
    pub fn set_token_until(&mut self, access_token: &str, expires_at: DateTime<Utc>) {
        self.token = Some(Token {
            access_token: access_token.to_string(),
            expires_at,
        });
    }

    /// Expiry instant of the current token, for persisting it.
    pub fn token_expiry(&self) -> Option<DateTime<Utc>> {
        self.token.as_ref().map(|t| t.expires_at)
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }

    pub fn has_valid_token(&self, now: DateTime<Utc>) -> bool {
        self.token.as_ref().is_some_and(|t| now < t.expires_at)
    }

    fn bearer(&self, now: DateTime<Utc>) -> Result<&str, SyncError> {
        match &self.token {
            Some(t) if now < t.expires_at => Ok(&t.access_token),
            _ => Err(SyncError::NotAuthorised),
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, SyncError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(SyncError::Remote {
                status: status.as_u16(),
                body,
            })
        }
    }

    async fn post_event(
        &self,
        event: &CalendarEvent,
        now: DateTime<Utc>,
    ) -> Result<String, SyncError> {
        let bearer = self.bearer(now)?;
        let response = self
            .client
            .post(CALENDAR_EVENTS_URL)
            .bearer_auth(bearer)
            .json(event)
            .send()
            .await?;

        #[derive(Deserialize)]
        struct Created {
            #[serde(rename = "htmlLink", default)]
            html_link: String,
        }
        let created: Created = Self::check(response).await?.json().await?;
        Ok(created.html_link)
    }

    /// Push one project to the primary calendar. Returns the event link.
    pub async fn sync_project_to_calendar(
        &self,
        project: &Project,
        now: DateTime<Utc>,
    ) -> Result<String, SyncError> {
        let event = project_event(project)?;
        let link = self.post_event(&event, now).await?;
        log::info!("evento creado para {}: {}", project.nombre, link);
        Ok(link)
    }

    /// Push one task deadline to the primary calendar.
    pub async fn sync_task_to_calendar(
        &self,
        project: &Project,
        task: &Task,
        now: DateTime<Utc>,
    ) -> Result<String, SyncError> {
        let event = task_event(project, task)?;
        self.post_event(&event, now).await
    }

    /// Pull project events back from the calendar and adopt any date changes
    /// made there. Matching is by event summary against the project name.
    /// Returns how many projects had their dates updated.
    pub async fn fetch_updates_from_calendar(
        &self,
        store: &mut ProjectStore,
        now: DateTime<Utc>,
    ) -> Result<usize, SyncError> {
        let bearer = self.bearer(now)?;
        // Look a year back so long-running projects are still found.
        let time_min = now - Duration::days(365);
        let response = self
            .client
            .get(CALENDAR_EVENTS_URL)
            .bearer_auth(bearer)
            .query(&[
                ("q", PROJECT_PREFIX.trim_end()),
                ("singleEvents", "true"),
                ("maxResults", "250"),
                ("timeMin", &time_min.to_rfc3339()),
            ])
            .send()
            .await?;

        #[derive(Deserialize)]
        struct EventList {
            #[serde(default)]
            items: Vec<EventItem>,
        }
        #[derive(Deserialize)]
        struct EventItem {
            #[serde(default)]
            summary: String,
            start: Option<EventDate>,
            end: Option<EventDate>,
        }
        let list: EventList = Self::check(response).await?.json().await?;

        let mut updated = 0;
        for item in list.items {
            let Some(nombre) = item.summary.strip_prefix(PROJECT_PREFIX) else {
                continue;
            };
            let Some(start) = item.start.map(|d| d.date) else {
                continue;
            };
            let end = item.end.map(|d| d.date).unwrap_or(start);

            let Some(id) = store
                .all()
                .iter()
                .find(|p| p.nombre == nombre && p.status != Status::Terminado)
                .map(|p| p.id.clone())
            else {
                continue;
            };
            let mut dates_changed = false;
            store.replace(&id, |p| {
                if p.fecha_inicio != Some(start) || p.fecha_fin != Some(end) {
                    p.fecha_inicio = Some(start);
                    p.fecha_fin = Some(end);
                    dates_changed = true;
                }
            });
            if dates_changed {
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn ensure_root_folder(&self, now: DateTime<Utc>) -> Result<String, SyncError> {
        let bearer = self.bearer(now)?;

        #[derive(Deserialize)]
        struct FileList {
            #[serde(default)]
            files: Vec<DriveFile>,
        }
        #[derive(Deserialize)]
        struct DriveFile {
            id: String,
        }

        let q = format!(
            "name='{DRIVE_ROOT_FOLDER}' and mimeType='{DRIVE_FOLDER_MIME}' and trashed=false"
        );
        let response = self
            .client
            .get(DRIVE_FILES_URL)
            .bearer_auth(bearer)
            .query(&[("q", q.as_str()), ("fields", "files(id,name)")])
            .send()
            .await?;
        let list: FileList = Self::check(response).await?.json().await?;
        if let Some(existing) = list.files.into_iter().next() {
            return Ok(existing.id);
        }

        let response = self
            .client
            .post(DRIVE_FILES_URL)
            .bearer_auth(bearer)
            .json(&serde_json::json!({
                "name": DRIVE_ROOT_FOLDER,
                "mimeType": DRIVE_FOLDER_MIME,
            }))
            .send()
            .await?;
        let created: DriveFile = Self::check(response).await?.json().await?;
        Ok(created.id)
    }

    /// Create a Drive folder for the project under the studio's root folder
    /// and return its shareable link.
    pub async fn create_project_folder(
        &self,
        nombre: &str,
        now: DateTime<Utc>,
    ) -> Result<String, SyncError> {
        let root_id = self.ensure_root_folder(now).await?;
        let bearer = self.bearer(now)?;

        #[derive(Deserialize)]
        struct DriveFile {
            id: String,
        }
        let response = self
            .client
            .post(DRIVE_FILES_URL)
            .bearer_auth(bearer)
            .json(&serde_json::json!({
                "name": nombre,
                "mimeType": DRIVE_FOLDER_MIME,
                "parents": [root_id],
            }))
            .send()
            .await?;
        let created: DriveFile = Self::check(response).await?.json().await?;
        let link = format!("https://drive.google.com/drive/folders/{}", created.id);
        log::info!("carpeta creada para {nombre}: {link}");
        Ok(link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::sample_project;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 29, 10, 0, 0).unwrap()
    }

    #[test]
    fn project_event_carries_range_and_status_color() {
        let mut p = sample_project("1", Status::EnCurso, 0.0);
        p.nombre = "Mural Centro".into();
        p.fecha_inicio = NaiveDate::from_ymd_opt(2026, 9, 1);
        p.fecha_fin = NaiveDate::from_ymd_opt(2026, 9, 10);

        let event = project_event(&p).unwrap();
        assert_eq!(event.summary, "[KANBAN] Mural Centro");
        assert_eq!(event.start.date, p.fecha_inicio.unwrap());
        assert_eq!(event.end.date, p.fecha_fin.unwrap());
        assert_eq!(event.color_id, "9");
        assert!(event.description.contains("Cliente: Casa Roja"));
        assert!(event.description.contains("Artista: Bel"));
    }

    #[test]
    fn project_event_requires_some_date() {
        let p = sample_project("1", Status::Nuevo, 0.0);
        assert!(matches!(project_event(&p), Err(SyncError::MissingDates)));
    }

    #[test]
    fn single_date_collapses_the_range() {
        let mut p = sample_project("1", Status::Nuevo, 0.0);
        p.fecha_fin = NaiveDate::from_ymd_opt(2026, 9, 10);
        let event = project_event(&p).unwrap();
        assert_eq!(event.start.date, event.end.date);
        assert_eq!(event.color_id, "7");
    }

    #[test]
    fn task_event_colors_follow_priority() {
        let p = sample_project("1", Status::EnCurso, 0.0);
        let mut t = Task::new(0);
        t.text = "comprar pintura".into();
        t.due_date = NaiveDate::from_ymd_opt(2026, 9, 5);

        t.priority = Priority::Alta;
        assert_eq!(task_event(&p, &t).unwrap().color_id, "11");
        t.priority = Priority::Media;
        assert_eq!(task_event(&p, &t).unwrap().color_id, "5");
        t.priority = Priority::Normal;
        let event = task_event(&p, &t).unwrap();
        assert_eq!(event.color_id, "1");
        assert_eq!(event.summary, "[TAREA] comprar pintura");
        assert!(!event.description.contains("Prioridad"));

        t.due_date = None;
        assert!(matches!(task_event(&p, &t), Err(SyncError::MissingDueDate)));
    }

    #[test]
    fn folder_pass_targets_active_projects_without_a_link() {
        let mut store = ProjectStore::new();
        store.add(sample_project("a", Status::Nuevo, 0.0));
        let mut linked = sample_project("b", Status::EnCurso, 0.0);
        linked.drive_link = "https://drive.example/b".into();
        store.add(linked);
        store.add(sample_project("done", Status::Terminado, 0.0));

        let pending = projects_without_folder(&store);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].0, "a");
    }

    #[test]
    fn token_expires_with_safety_margin() {
        let mut sync = GoogleSync::new();
        assert!(!sync.has_valid_token(now()));

        sync.set_token("tok", 3600, now());
        assert!(sync.has_valid_token(now()));
        assert!(sync.has_valid_token(now() + Duration::seconds(3539)));
        assert!(!sync.has_valid_token(now() + Duration::seconds(3540)));

        sync.clear_token();
        assert!(!sync.has_valid_token(now()));
    }
}
