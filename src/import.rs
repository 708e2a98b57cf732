//! One-time import of a legacy JSON export.
//!
//! The old tool kept the whole board as one JSON array with camelCase keys
//! and rather loose typing: numeric ids, text where numbers belong, statuses
//! that no longer exist. The parse here is deliberately lenient, the source
//! file is never modified, and everything lands through the normal bulk
//! upsert so re-running the import cannot duplicate rows.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::gateway::{GatewayError, ProjectGateway};
use crate::model::{Conclusion, Priority, Project, Status, Task};
use crate::store::ProjectStore;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("no se pudo leer el archivo: {0}")]
    Io(#[from] std::io::Error),
    #[error("el archivo no es un export válido: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyProject {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    nombre: String,
    #[serde(default)]
    tipo: String,
    #[serde(default)]
    artista: String,
    #[serde(default)]
    cliente: String,
    #[serde(default)]
    contacto: String,
    #[serde(default)]
    ubicacion: String,
    #[serde(default)]
    formato: String,
    #[serde(default)]
    medidas: String,
    #[serde(default)]
    contexto: String,
    #[serde(default)]
    drive_link: String,
    #[serde(default)]
    presupuesto: Option<f64>,
    #[serde(default)]
    fecha_inicio: Option<NaiveDate>,
    #[serde(default)]
    fecha_fin: Option<NaiveDate>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    order: Option<Value>,
    #[serde(default)]
    tasks: Vec<LegacyTask>,
    #[serde(default)]
    gastos: Option<f64>,
    #[serde(default)]
    utilidad: Option<f64>,
    #[serde(default)]
    conclusion: Option<Conclusion>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyTask {
    #[serde(default)]
    text: String,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    due_date: Option<NaiveDate>,
}

fn value_to_string(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_to_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Statuses the old tool used that the board no longer has fold into the
/// nearest current lane.
fn parse_status(raw: Option<&str>) -> Status {
    match raw {
        Some("en-curso") | Some("pausa") => Status::EnCurso,
        Some("completo") => Status::Completo,
        Some("terminado") => Status::Terminado,
        _ => Status::Nuevo,
    }
}

fn parse_priority(raw: Option<&str>) -> Priority {
    match raw {
        Some("alta") => Priority::Alta,
        Some("media") => Priority::Media,
        _ => Priority::Normal,
    }
}

fn convert(legacy: LegacyProject, fallback_order: usize, now: DateTime<Utc>) -> Project {
    // Legacy task order keys were often missing or duplicated; the array
    // order is what the old tool displayed, so it wins.
    let tasks: Vec<Task> = legacy
        .tasks
        .into_iter()
        .enumerate()
        .map(|(i, t)| Task {
            text: t.text,
            completed: t.completed,
            priority: parse_priority(t.priority.as_deref()),
            due_date: t.due_date,
            order: i,
        })
        .collect();

    Project {
        id: value_to_string(legacy.id)
            .unwrap_or_else(|| format!("{}-{}", Project::new_id(now), fallback_order)),
        nombre: legacy.nombre,
        tipo: legacy.tipo,
        artista: legacy.artista,
        cliente: legacy.cliente,
        contacto: legacy.contacto,
        ubicacion: legacy.ubicacion,
        formato: legacy.formato,
        medidas: legacy.medidas,
        contexto: legacy.contexto,
        drive_link: legacy.drive_link,
        presupuesto: legacy.presupuesto,
        fecha_inicio: legacy.fecha_inicio,
        fecha_fin: legacy.fecha_fin,
        status: parse_status(legacy.status.as_deref()),
        order: value_to_f64(legacy.order.as_ref()).unwrap_or(fallback_order as f64),
        tasks,
        gastos: legacy.gastos,
        utilidad: legacy.utilidad,
        conclusion: legacy.conclusion,
        completed_at: legacy.completed_at,
        created_at: legacy.created_at.unwrap_or(now),
    }
}

/// Parse a legacy export into projects. Pure half of the import, used by the
/// tests and the command alike.
pub fn parse_export(contents: &str, now: DateTime<Utc>) -> Result<Vec<Project>, ImportError> {
    let legacy: Vec<LegacyProject> = serde_json::from_str(contents)?;
    Ok(legacy
        .into_iter()
        .enumerate()
        .map(|(i, l)| convert(l, i, now))
        .collect())
}

/// Import a legacy export file: load it into the store and push the whole
/// batch to the gateway. Returns how many projects came across.
pub async fn import_file(
    path: &Path,
    store: &mut ProjectStore,
    gateway: &dyn ProjectGateway,
    now: DateTime<Utc>,
) -> Result<usize, ImportError> {
    let contents = std::fs::read_to_string(path)?;
    let projects = parse_export(&contents, now)?;
    let count = projects.len();

    store.load(projects.clone());
    gateway.upsert_all(&projects).await?;
    log::info!("importados {count} proyectos desde {}", path.display());
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryGateway;
    use chrono::TimeZone;
    use std::io::Write;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 29, 12, 0, 0).unwrap()
    }

    const EXPORT: &str = r#"[
        {
            "id": 1755000000000,
            "nombre": "Mural fachada",
            "tipo": "Mural",
            "status": "pausa",
            "order": "2",
            "presupuesto": 5000,
            "fechaInicio": "2026-09-01",
            "driveLink": "https://drive.example/a",
            "colorTag": "rojo",
            "tasks": [
                { "text": "boceto", "completed": true, "priority": "alta", "order": 5 },
                { "text": "pintura", "dueDate": "2026-09-03" }
            ]
        },
        {
            "nombre": "Logo café",
            "status": "terminado",
            "utilidad": 1200,
            "completedAt": "2026-07-01T10:00:00Z"
        }
    ]"#;

    #[test]
    fn lenient_parse_coerces_the_old_typing() {
        let projects = parse_export(EXPORT, now()).unwrap();
        assert_eq!(projects.len(), 2);

        let mural = &projects[0];
        assert_eq!(mural.id, "1755000000000");
        assert_eq!(mural.status, Status::EnCurso);
        assert_eq!(mural.order, 2.0);
        assert_eq!(mural.drive_link, "https://drive.example/a");
        assert_eq!(mural.created_at, now());
        // The export's stray order key is ignored; array order is kept and
        // reindexed from zero.
        assert_eq!(mural.tasks[0].text, "boceto");
        assert_eq!(mural.tasks[0].order, 0);
        assert_eq!(mural.tasks[0].priority, Priority::Alta);
        assert_eq!(mural.tasks[1].text, "pintura");
        assert_eq!(mural.tasks[1].order, 1);
        assert_eq!(mural.tasks[1].due_date, NaiveDate::from_ymd_opt(2026, 9, 3));

        let logo = &projects[1];
        assert_eq!(logo.status, Status::Terminado);
        assert_eq!(logo.utilidad, Some(1200.0));
        assert!(!logo.id.is_empty());
        // Minted ids stay distinct within a batch.
        assert_ne!(logo.id, mural.id);
    }

    #[tokio::test]
    async fn import_fills_store_and_gateway_without_touching_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(EXPORT.as_bytes()).unwrap();

        let mut store = ProjectStore::new();
        let gateway = MemoryGateway::new();
        let count = import_file(&path, &mut store, &gateway, now()).await.unwrap();

        assert_eq!(count, 2);
        assert_eq!(store.len(), 2);
        assert_eq!(gateway.row_count(), 2);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), EXPORT);

        // Re-running the import upserts the same ids, no duplicate rows.
        import_file(&path, &mut store, &gateway, now()).await.unwrap();
        assert_eq!(gateway.row_count(), 2);
    }
}
