//! Persistence gateway: translates projects to and from the remote row store.
//!
//! The remote keeps filterable fields as discrete columns and everything else
//! (tasks, conclusion, contextual metadata) in a single structured `data`
//! blob column. The mapping is an explicit, enumerated function pair in both
//! directions; unknown blob keys are rejected rather than silently merged.
//!
//! Callers apply mutations to the in-memory store before awaiting any call
//! here (optimistic update). A failed remote write is surfaced and logged but
//! never rolls the store back; swapping in a confirm-then-apply strategy only
//! requires a different implementation of [`ProjectGateway`].

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::model::{normalise_tasks, Conclusion, Project, Status, Task};

/// Remote persistence failure. Surfaced to the user, logged, never retried
/// automatically.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("error de red: {0}")]
    Http(#[from] reqwest::Error),
    #[error("la base de datos rechazó la operación (HTTP {status}): {body}")]
    Remote { status: u16, body: String },
}

/// One project row as the remote store holds it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectRow {
    pub id: String,
    pub nombre: String,
    pub status: Status,
    /// Numeric column; coerced back to a number on read because remote
    /// numeric columns may arrive as text.
    #[serde(deserialize_with = "order_from_number_or_text")]
    pub order: f64,
    pub tipo: String,
    pub artista: String,
    pub cliente: String,
    pub fecha_inicio: Option<NaiveDate>,
    pub fecha_fin: Option<NaiveDate>,
    pub data: RowData,
}

/// The structured blob column. Every key is enumerated here; a row carrying
/// anything else fails deserialization instead of merging silently.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RowData {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub conclusion: Option<Conclusion>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub contexto: String,
    #[serde(default)]
    pub ubicacion: String,
    #[serde(default)]
    pub formato: String,
    #[serde(default)]
    pub medidas: String,
    #[serde(default)]
    pub presupuesto: Option<f64>,
    #[serde(default)]
    pub contacto: String,
    #[serde(default)]
    pub drive_link: String,
    #[serde(default)]
    pub gastos: Option<f64>,
    #[serde(default)]
    pub utilidad: Option<f64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn order_from_number_or_text<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
    }

    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => Ok(n),
        NumberOrText::Text(s) => s.parse::<f64>().map_err(serde::de::Error::custom),
    }
}

/// Flatten a project into its wire row.
pub fn to_row(project: &Project) -> ProjectRow {
    ProjectRow {
        id: project.id.clone(),
        nombre: project.nombre.clone(),
        status: project.status,
        order: project.order,
        tipo: project.tipo.clone(),
        artista: project.artista.clone(),
        cliente: project.cliente.clone(),
        fecha_inicio: project.fecha_inicio,
        fecha_fin: project.fecha_fin,
        data: RowData {
            tasks: project.tasks.clone(),
            conclusion: project.conclusion.clone(),
            completed_at: project.completed_at,
            contexto: project.contexto.clone(),
            ubicacion: project.ubicacion.clone(),
            formato: project.formato.clone(),
            medidas: project.medidas.clone(),
            presupuesto: project.presupuesto,
            contacto: project.contacto.clone(),
            drive_link: project.drive_link.clone(),
            gastos: project.gastos,
            utilidad: project.utilidad,
            created_at: Some(project.created_at),
        },
    }
}

/// Rebuild a project from its wire row, normalising the task list.
pub fn from_row(row: ProjectRow) -> Project {
    let mut tasks = row.data.tasks;
    normalise_tasks(&mut tasks);
    Project {
        id: row.id,
        nombre: row.nombre,
        status: row.status,
        order: row.order,
        tipo: row.tipo,
        artista: row.artista,
        cliente: row.cliente,
        fecha_inicio: row.fecha_inicio,
        fecha_fin: row.fecha_fin,
        tasks,
        conclusion: row.data.conclusion,
        completed_at: row.data.completed_at,
        contexto: row.data.contexto,
        ubicacion: row.data.ubicacion,
        formato: row.data.formato,
        medidas: row.data.medidas,
        presupuesto: row.data.presupuesto,
        contacto: row.data.contacto,
        drive_link: row.data.drive_link,
        gastos: row.data.gastos,
        utilidad: row.data.utilidad,
        created_at: row.data.created_at.unwrap_or_else(Utc::now),
    }
}

/// CRUD + bulk upsert against the backing row store.
#[async_trait]
pub trait ProjectGateway {
    /// Fetch every row, ordered by the `order` column ascending.
    async fn fetch_all(&self) -> Result<Vec<Project>, GatewayError>;
    async fn create(&self, project: &Project) -> Result<(), GatewayError>;
    async fn update(&self, project: &Project) -> Result<(), GatewayError>;
    async fn delete(&self, id: &str) -> Result<(), GatewayError>;
    /// Bulk path used after any full-list reorder. Keyed by `id`, so
    /// re-submitting the same snapshot produces no duplicate rows.
    async fn upsert_all(&self, projects: &[Project]) -> Result<(), GatewayError>;
}

/// PostgREST-flavoured HTTP gateway.
pub struct RestGateway {
    client: reqwest::Client,
    table_url: String,
    api_key: String,
    bearer: String,
}

impl RestGateway {
    pub fn new(base_url: &str, api_key: &str, session_token: Option<&str>) -> Self {
        RestGateway {
            client: reqwest::Client::new(),
            table_url: format!("{}/rest/v1/projects", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            // Anonymous key doubles as the bearer until the user signs in.
            bearer: session_token.unwrap_or(api_key).to_string(),
        }
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.bearer)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(GatewayError::Remote {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl ProjectGateway for RestGateway {
    async fn fetch_all(&self) -> Result<Vec<Project>, GatewayError> {
        let url = format!("{}?select=*&order=order.asc", self.table_url);
        let response = self.request(reqwest::Method::GET, &url).send().await?;
        let rows: Vec<ProjectRow> = Self::check(response).await?.json().await?;
        Ok(rows.into_iter().map(from_row).collect())
    }

    async fn create(&self, project: &Project) -> Result<(), GatewayError> {
        let response = self
            .request(reqwest::Method::POST, &self.table_url)
            .header("Prefer", "return=minimal")
            .json(&[to_row(project)])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn update(&self, project: &Project) -> Result<(), GatewayError> {
        let url = format!("{}?id=eq.{}", self.table_url, project.id);
        let response = self
            .request(reqwest::Method::PATCH, &url)
            .header("Prefer", "return=minimal")
            .json(&to_row(project))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), GatewayError> {
        let url = format!("{}?id=eq.{}", self.table_url, id);
        let response = self.request(reqwest::Method::DELETE, &url).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn upsert_all(&self, projects: &[Project]) -> Result<(), GatewayError> {
        let rows: Vec<ProjectRow> = projects.iter().map(to_row).collect();
        let response = self
            .request(reqwest::Method::POST, &self.table_url)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&rows)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

/// In-process gateway backing the offline demo mode and the test suite.
/// Same upsert-by-id semantics as the remote.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    rows: Mutex<BTreeMap<String, ProjectRow>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        MemoryGateway::default()
    }

    /// Stored row count; used by tests and the offline status line.
    pub fn row_count(&self) -> usize {
        self.rows.lock().expect("gateway poisoned").len()
    }
}

#[async_trait]
impl ProjectGateway for MemoryGateway {
    async fn fetch_all(&self) -> Result<Vec<Project>, GatewayError> {
        let rows = self.rows.lock().expect("gateway poisoned");
        let mut rows: Vec<ProjectRow> = rows.values().cloned().collect();
        rows.sort_by(|a, b| a.order.total_cmp(&b.order));
        Ok(rows.into_iter().map(from_row).collect())
    }

    async fn create(&self, project: &Project) -> Result<(), GatewayError> {
        let mut rows = self.rows.lock().expect("gateway poisoned");
        rows.insert(project.id.clone(), to_row(project));
        Ok(())
    }

    async fn update(&self, project: &Project) -> Result<(), GatewayError> {
        let mut rows = self.rows.lock().expect("gateway poisoned");
        if rows.contains_key(&project.id) {
            rows.insert(project.id.clone(), to_row(project));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), GatewayError> {
        let mut rows = self.rows.lock().expect("gateway poisoned");
        rows.remove(id);
        Ok(())
    }

    async fn upsert_all(&self, projects: &[Project]) -> Result<(), GatewayError> {
        let mut rows = self.rows.lock().expect("gateway poisoned");
        for p in projects {
            rows.insert(p.id.clone(), to_row(p));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Priority;
    use crate::store::tests::sample_project;
    use chrono::TimeZone;

    fn full_project() -> Project {
        let mut p = sample_project("42", Status::Terminado, 2.0);
        p.contacto = "555-1234".into();
        p.ubicacion = "CDMX".into();
        p.formato = "Pared".into();
        p.medidas = "3x4m".into();
        p.contexto = "Fachada del café".into();
        p.drive_link = "https://drive.example/x".into();
        p.presupuesto = Some(5000.0);
        p.fecha_inicio = NaiveDate::from_ymd_opt(2026, 2, 1);
        p.fecha_fin = NaiveDate::from_ymd_opt(2026, 2, 20);
        p.gastos = Some(1200.0);
        p.utilidad = Some(3800.0);
        p.completed_at = Some(Utc.with_ymd_and_hms(2026, 2, 21, 18, 30, 0).unwrap());
        p.conclusion = Some(Conclusion {
            fecha: NaiveDate::from_ymd_opt(2026, 2, 21),
            calificacion: Some(5),
            notas: "Quedó muy bien".into(),
            link_resultado: "https://example.com/final".into(),
        });
        p.tasks = vec![
            Task {
                text: "boceto".into(),
                completed: true,
                priority: Priority::Alta,
                due_date: NaiveDate::from_ymd_opt(2026, 2, 3),
                order: 0,
            },
            Task {
                text: "compra de pintura".into(),
                completed: false,
                priority: Priority::Normal,
                due_date: None,
                order: 1,
            },
        ];
        p
    }

    #[test]
    fn row_round_trip_all_fields_present() {
        let project = full_project();
        let row = to_row(&project);
        let back = from_row(row.clone());
        assert_eq!(back, project);
        assert_eq!(to_row(&back), row);
    }

    #[test]
    fn row_round_trip_all_optionals_absent() {
        let project = sample_project("7", Status::Nuevo, 0.0);
        let row = to_row(&project);
        let back = from_row(row.clone());
        assert_eq!(back, project);
        assert_eq!(to_row(&back), row);
    }

    #[test]
    fn order_column_coerced_from_text() {
        let mut value = serde_json::to_value(to_row(&sample_project("1", Status::Nuevo, 3.5))).unwrap();
        value["order"] = serde_json::Value::String("3.5".into());
        let row: ProjectRow = serde_json::from_value(value).unwrap();
        assert_eq!(row.order, 3.5);
    }

    #[test]
    fn unknown_blob_key_is_rejected() {
        let mut value = serde_json::to_value(to_row(&sample_project("1", Status::Nuevo, 0.0))).unwrap();
        value["data"]["sorpresa"] = serde_json::Value::Bool(true);
        let result: Result<ProjectRow, _> = serde_json::from_value(value);
        assert!(result.is_err());
    }

    #[test]
    fn tasks_normalised_on_read() {
        let mut row = to_row(&full_project());
        row.data.tasks[0].order = 9;
        row.data.tasks[1].order = 4;
        let back = from_row(row);
        assert_eq!(back.tasks[0].text, "compra de pintura");
        assert_eq!(back.tasks.iter().map(|t| t.order).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[tokio::test]
    async fn upsert_all_is_idempotent() {
        let gateway = MemoryGateway::new();
        let snapshot = vec![
            sample_project("a", Status::Nuevo, 0.0),
            sample_project("b", Status::EnCurso, 1.0),
        ];

        gateway.upsert_all(&snapshot).await.unwrap();
        assert_eq!(gateway.row_count(), 2);
        gateway.upsert_all(&snapshot).await.unwrap();
        assert_eq!(gateway.row_count(), 2);
    }

    #[tokio::test]
    async fn fetch_all_ordered_by_order_column() {
        let gateway = MemoryGateway::new();
        gateway
            .upsert_all(&[
                sample_project("z", Status::Nuevo, 2.0),
                sample_project("a", Status::Nuevo, 0.0),
                sample_project("m", Status::Nuevo, 1.0),
            ])
            .await
            .unwrap();

        let fetched = gateway.fetch_all().await.unwrap();
        let ids: Vec<&str> = fetched.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "m", "z"]);
    }
}
