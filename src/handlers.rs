//! Mutation handlers and screen-independent application state.
//!
//! Every handler follows the same optimistic shape: mutate the in-memory
//! store first, then await the gateway write. A remote failure is returned to
//! the caller for display but the local mutation stands. Handlers that take a
//! project id treat a stale id as a silent no-op and report it through their
//! `bool` return instead of erroring.

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::gateway::{GatewayError, ProjectGateway};
use crate::model::{reindex_tasks, Conclusion, Priority, Project, Status, Task};
use crate::store::ProjectStore;
use crate::views::history::HistorySort;
use crate::views::task_board::TaskBoardFilter;

/// Which screen the application is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    Board,
    Calendar,
    Tasks,
    History,
    Analytics,
}

/// All cross-screen state, owned by the running application. Nothing here is
/// global; handlers receive it explicitly.
#[derive(Debug)]
pub struct AppState {
    pub view: View,
    /// Currently highlighted project, if any.
    pub selected: Option<String>,
    /// Project whose move to terminado is parked on the conclusion form.
    pub pending_completion: Option<String>,
    pub history_sort: HistorySort,
    pub task_filter: TaskBoardFilter,
    /// Month the calendar screen is looking at.
    pub calendar_year: i32,
    pub calendar_month: u32,
}

impl AppState {
    pub fn new(today: NaiveDate) -> Self {
        AppState {
            view: View::Board,
            selected: None,
            pending_completion: None,
            history_sort: HistorySort::default(),
            task_filter: TaskBoardFilter::default(),
            calendar_year: today.year(),
            calendar_month: today.month(),
        }
    }

    pub fn calendar_next_month(&mut self) {
        if self.calendar_month == 12 {
            self.calendar_year += 1;
            self.calendar_month = 1;
        } else {
            self.calendar_month += 1;
        }
    }

    pub fn calendar_prev_month(&mut self) {
        if self.calendar_month == 1 {
            self.calendar_year -= 1;
            self.calendar_month = 12;
        } else {
            self.calendar_month -= 1;
        }
    }
}

/// Editable project fields, as captured by the create/edit form. Status,
/// ordering, tasks and completion data are managed by their own handlers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectForm {
    pub nombre: String,
    pub tipo: String,
    pub artista: String,
    pub cliente: String,
    pub contacto: String,
    pub ubicacion: String,
    pub formato: String,
    pub medidas: String,
    pub contexto: String,
    pub drive_link: String,
    pub presupuesto: Option<f64>,
    pub fecha_inicio: Option<NaiveDate>,
    pub fecha_fin: Option<NaiveDate>,
}

impl ProjectForm {
    /// Pre-fill the form from an existing project, for editing.
    pub fn from_project(p: &Project) -> Self {
        ProjectForm {
            nombre: p.nombre.clone(),
            tipo: p.tipo.clone(),
            artista: p.artista.clone(),
            cliente: p.cliente.clone(),
            contacto: p.contacto.clone(),
            ubicacion: p.ubicacion.clone(),
            formato: p.formato.clone(),
            medidas: p.medidas.clone(),
            contexto: p.contexto.clone(),
            drive_link: p.drive_link.clone(),
            presupuesto: p.presupuesto,
            fecha_inicio: p.fecha_inicio,
            fecha_fin: p.fecha_fin,
        }
    }

    fn apply(&self, p: &mut Project) {
        p.nombre = self.nombre.clone();
        p.tipo = self.tipo.clone();
        p.artista = self.artista.clone();
        p.cliente = self.cliente.clone();
        p.contacto = self.contacto.clone();
        p.ubicacion = self.ubicacion.clone();
        p.formato = self.formato.clone();
        p.medidas = self.medidas.clone();
        p.contexto = self.contexto.clone();
        p.drive_link = self.drive_link.clone();
        p.presupuesto = self.presupuesto;
        p.fecha_inicio = self.fecha_inicio;
        p.fecha_fin = self.fecha_fin;
    }
}

/// Completion form captured before a project may enter terminado.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConclusionForm {
    pub fecha: Option<NaiveDate>,
    pub calificacion: Option<u8>,
    pub notas: String,
    pub link_resultado: String,
    pub gastos: f64,
}

/// Outcome of a status change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// The move happened (and was persisted, or at least attempted).
    Applied,
    /// Entering terminado needs the conclusion form first; nothing changed.
    NeedsConclusion,
}

/// Replace the store contents with a fresh fetch from the gateway.
pub async fn refresh(
    store: &mut ProjectStore,
    gateway: &dyn ProjectGateway,
) -> Result<(), GatewayError> {
    let projects = gateway.fetch_all().await?;
    store.load(projects);
    Ok(())
}

/// Create a project in nuevo, at the bottom of the column. Returns its id.
pub async fn create_project(
    store: &mut ProjectStore,
    gateway: &dyn ProjectGateway,
    form: &ProjectForm,
    now: DateTime<Utc>,
) -> Result<String, GatewayError> {
    let mut project = Project {
        id: Project::new_id(now),
        nombre: String::new(),
        tipo: String::new(),
        artista: String::new(),
        cliente: String::new(),
        contacto: String::new(),
        ubicacion: String::new(),
        formato: String::new(),
        medidas: String::new(),
        contexto: String::new(),
        drive_link: String::new(),
        presupuesto: None,
        fecha_inicio: None,
        fecha_fin: None,
        status: Status::Nuevo,
        order: store.next_order_in(Status::Nuevo),
        tasks: Vec::new(),
        gastos: None,
        utilidad: None,
        conclusion: None,
        completed_at: None,
        created_at: now,
    };
    form.apply(&mut project);

    let id = project.id.clone();
    store.add(project.clone());
    gateway.create(&project).await?;
    Ok(id)
}

/// Apply edited form fields to an existing project.
pub async fn update_project(
    store: &mut ProjectStore,
    gateway: &dyn ProjectGateway,
    id: &str,
    form: &ProjectForm,
) -> Result<bool, GatewayError> {
    if !store.replace(id, |p| form.apply(p)) {
        return Ok(false);
    }
    persist_one(store, gateway, id).await?;
    Ok(true)
}

/// Request a status change. Entering terminado is gated on the conclusion
/// form; every other move is an append at the end of the target column.
pub async fn request_status(
    store: &mut ProjectStore,
    gateway: &dyn ProjectGateway,
    id: &str,
    target: Status,
) -> Result<Option<StatusChange>, GatewayError> {
    let Some(current) = store.find(id).map(|p| p.status) else {
        return Ok(None);
    };
    if current == target {
        return Ok(Some(StatusChange::Applied));
    }
    if target == Status::Terminado {
        return Ok(Some(StatusChange::NeedsConclusion));
    }
    move_project(store, gateway, id, target, usize::MAX).await?;
    Ok(Some(StatusChange::Applied))
}

fn column_ids(store: &ProjectStore, status: Status, skip: &str) -> Vec<String> {
    let mut members: Vec<&Project> = store
        .all()
        .iter()
        .filter(|p| p.status == status && p.id != skip)
        .collect();
    members.sort_by(|a, b| a.order.total_cmp(&b.order));
    members.into_iter().map(|p| p.id.clone()).collect()
}

fn assign_orders(store: &mut ProjectStore, ids: &[String]) {
    for (i, pid) in ids.iter().enumerate() {
        store.replace(pid, |p| p.order = i as f64);
    }
}

/// Move a project into `target` at `target_index` (clamped), rewriting both
/// affected columns to contiguous 0..n-1 orders and persisting them in one
/// bulk upsert.
///
/// A project leaving terminado keeps its conclusion and financial fields;
/// they go stale rather than being cleared, and completing it again
/// overwrites them.
pub async fn move_project(
    store: &mut ProjectStore,
    gateway: &dyn ProjectGateway,
    id: &str,
    target: Status,
    target_index: usize,
) -> Result<bool, GatewayError> {
    let Some(source) = store.find(id).map(|p| p.status) else {
        return Ok(false);
    };

    let mut target_ids = column_ids(store, target, id);
    let idx = target_index.min(target_ids.len());
    target_ids.insert(idx, id.to_string());

    store.replace(id, |p| p.status = target);
    assign_orders(store, &target_ids);

    let mut affected = target_ids;
    if source != target {
        let source_ids = column_ids(store, source, id);
        assign_orders(store, &source_ids);
        affected.extend(source_ids);
    }

    let snapshot: Vec<Project> = affected
        .iter()
        .filter_map(|pid| store.find(pid).cloned())
        .collect();
    gateway.upsert_all(&snapshot).await?;
    Ok(true)
}

/// Complete a project: record the conclusion, derive the profit and move it
/// into terminado.
pub async fn complete_project(
    store: &mut ProjectStore,
    gateway: &dyn ProjectGateway,
    id: &str,
    form: &ConclusionForm,
    now: DateTime<Utc>,
) -> Result<bool, GatewayError> {
    let changed = store.replace(id, |p| {
        p.gastos = Some(form.gastos);
        p.utilidad = Some(p.presupuesto.unwrap_or(0.0) - form.gastos);
        p.conclusion = Some(Conclusion {
            fecha: form.fecha.or_else(|| Some(now.date_naive())),
            calificacion: form.calificacion,
            notas: form.notas.clone(),
            link_resultado: form.link_resultado.clone(),
        });
        p.completed_at = Some(now);
    });
    if !changed {
        return Ok(false);
    }
    move_project(store, gateway, id, Status::Terminado, usize::MAX).await
}

/// Delete a project and its whole checklist.
pub async fn delete_project(
    store: &mut ProjectStore,
    gateway: &dyn ProjectGateway,
    id: &str,
) -> Result<bool, GatewayError> {
    if store.remove(id).is_none() {
        return Ok(false);
    }
    gateway.delete(id).await?;
    Ok(true)
}

async fn persist_one(
    store: &ProjectStore,
    gateway: &dyn ProjectGateway,
    id: &str,
) -> Result<(), GatewayError> {
    if let Some(project) = store.find(id) {
        gateway.update(project).await?;
    }
    Ok(())
}

/// Append an empty-text task (or one with the given text) to a project.
pub async fn add_task(
    store: &mut ProjectStore,
    gateway: &dyn ProjectGateway,
    id: &str,
    text: &str,
) -> Result<bool, GatewayError> {
    let changed = store.replace(id, |p| {
        let mut task = Task::new(p.tasks.len());
        task.text = text.to_string();
        p.tasks.push(task);
    });
    if !changed {
        return Ok(false);
    }
    persist_one(store, gateway, id).await?;
    Ok(true)
}

/// Run `f` over one task of one project, then persist that project. A stale
/// project id or task index is a no-op.
async fn with_task(
    store: &mut ProjectStore,
    gateway: &dyn ProjectGateway,
    id: &str,
    index: usize,
    f: impl FnOnce(&mut Task),
) -> Result<bool, GatewayError> {
    let mut hit = false;
    store.replace(id, |p| {
        if let Some(task) = p.tasks.get_mut(index) {
            f(task);
            hit = true;
        }
    });
    if !hit {
        return Ok(false);
    }
    persist_one(store, gateway, id).await?;
    Ok(true)
}

pub async fn toggle_task(
    store: &mut ProjectStore,
    gateway: &dyn ProjectGateway,
    id: &str,
    index: usize,
) -> Result<bool, GatewayError> {
    with_task(store, gateway, id, index, |t| t.completed = !t.completed).await
}

pub async fn set_task_text(
    store: &mut ProjectStore,
    gateway: &dyn ProjectGateway,
    id: &str,
    index: usize,
    text: &str,
) -> Result<bool, GatewayError> {
    with_task(store, gateway, id, index, |t| t.text = text.to_string()).await
}

pub async fn set_task_due_date(
    store: &mut ProjectStore,
    gateway: &dyn ProjectGateway,
    id: &str,
    index: usize,
    due: Option<NaiveDate>,
) -> Result<bool, GatewayError> {
    with_task(store, gateway, id, index, |t| t.due_date = due).await
}

/// Advance a task one step around the alta → media → normal cycle.
pub async fn cycle_task_priority(
    store: &mut ProjectStore,
    gateway: &dyn ProjectGateway,
    id: &str,
    index: usize,
) -> Result<bool, GatewayError> {
    with_task(store, gateway, id, index, |t| t.priority = t.priority.cycled()).await
}

/// Remove one task and close the gap it leaves.
pub async fn delete_task(
    store: &mut ProjectStore,
    gateway: &dyn ProjectGateway,
    id: &str,
    index: usize,
) -> Result<bool, GatewayError> {
    let mut hit = false;
    store.replace(id, |p| {
        if index < p.tasks.len() {
            p.tasks.remove(index);
            reindex_tasks(&mut p.tasks);
            hit = true;
        }
    });
    if !hit {
        return Ok(false);
    }
    persist_one(store, gateway, id).await?;
    Ok(true)
}

/// Move a task from one checklist position to another (clamped).
pub async fn move_task(
    store: &mut ProjectStore,
    gateway: &dyn ProjectGateway,
    id: &str,
    from: usize,
    to: usize,
) -> Result<bool, GatewayError> {
    let mut hit = false;
    store.replace(id, |p| {
        if from < p.tasks.len() {
            let task = p.tasks.remove(from);
            let to = to.min(p.tasks.len());
            p.tasks.insert(to, task);
            reindex_tasks(&mut p.tasks);
            hit = true;
        }
    });
    if !hit {
        return Ok(false);
    }
    persist_one(store, gateway, id).await?;
    Ok(true)
}

/// Set every task's priority at once; the bulk action on the task board.
pub async fn set_all_priorities(
    store: &mut ProjectStore,
    gateway: &dyn ProjectGateway,
    id: &str,
    priority: Priority,
) -> Result<bool, GatewayError> {
    let changed = store.replace(id, |p| {
        for t in &mut p.tasks {
            t.priority = priority;
        }
    });
    if !changed {
        return Ok(false);
    }
    persist_one(store, gateway, id).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryGateway;
    use crate::store::tests::sample_project;

    fn now() -> DateTime<Utc> {
        chrono::TimeZone::with_ymd_and_hms(&Utc, 2026, 8, 29, 12, 0, 0).unwrap()
    }

    fn orders_in(store: &ProjectStore, status: Status) -> Vec<(String, f64)> {
        let mut members: Vec<(String, f64)> = store
            .all()
            .iter()
            .filter(|p| p.status == status)
            .map(|p| (p.id.clone(), p.order))
            .collect();
        members.sort_by(|a, b| a.1.total_cmp(&b.1));
        members
    }

    #[tokio::test]
    async fn create_lands_in_nuevo_and_persists() {
        let mut store = ProjectStore::new();
        let gateway = MemoryGateway::new();
        store.add(sample_project("existing", Status::Nuevo, 4.0));

        let form = ProjectForm {
            nombre: "Mural nuevo".into(),
            presupuesto: Some(5000.0),
            ..ProjectForm::default()
        };
        let id = create_project(&mut store, &gateway, &form, now())
            .await
            .unwrap();

        let created = store.find(&id).unwrap();
        assert_eq!(created.status, Status::Nuevo);
        assert_eq!(created.order, 5.0);
        assert_eq!(created.nombre, "Mural nuevo");
        assert_eq!(gateway.row_count(), 1);
    }

    #[tokio::test]
    async fn move_rewrites_both_columns_contiguously() {
        let mut store = ProjectStore::new();
        let gateway = MemoryGateway::new();
        store.add(sample_project("a", Status::Nuevo, 0.0));
        store.add(sample_project("b", Status::Nuevo, 1.0));
        store.add(sample_project("c", Status::Nuevo, 7.5));
        store.add(sample_project("x", Status::EnCurso, 0.0));

        let moved = move_project(&mut store, &gateway, "b", Status::EnCurso, 0)
            .await
            .unwrap();
        assert!(moved);

        assert_eq!(
            orders_in(&store, Status::EnCurso),
            vec![("b".to_string(), 0.0), ("x".to_string(), 1.0)]
        );
        assert_eq!(
            orders_in(&store, Status::Nuevo),
            vec![("a".to_string(), 0.0), ("c".to_string(), 1.0)]
        );
    }

    #[tokio::test]
    async fn reorder_within_a_column_clamps_the_index() {
        let mut store = ProjectStore::new();
        let gateway = MemoryGateway::new();
        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            store.add(sample_project(id, Status::Nuevo, i as f64));
        }

        move_project(&mut store, &gateway, "a", Status::Nuevo, 99)
            .await
            .unwrap();
        let ids: Vec<String> = orders_in(&store, Status::Nuevo)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn entering_terminado_demands_a_conclusion() {
        let mut store = ProjectStore::new();
        let gateway = MemoryGateway::new();
        store.add(sample_project("a", Status::Completo, 0.0));

        let outcome = request_status(&mut store, &gateway, "a", Status::Terminado)
            .await
            .unwrap();
        assert_eq!(outcome, Some(StatusChange::NeedsConclusion));
        // Nothing moved yet.
        assert_eq!(store.find("a").unwrap().status, Status::Completo);

        let outcome = request_status(&mut store, &gateway, "a", Status::EnCurso)
            .await
            .unwrap();
        assert_eq!(outcome, Some(StatusChange::Applied));
        assert_eq!(store.find("a").unwrap().status, Status::EnCurso);
    }

    #[tokio::test]
    async fn completion_derives_profit_from_budget() {
        let mut store = ProjectStore::new();
        let gateway = MemoryGateway::new();
        let mut p = sample_project("a", Status::Completo, 0.0);
        p.presupuesto = Some(5000.0);
        store.add(p);

        let form = ConclusionForm {
            calificacion: Some(4),
            notas: "Buen cierre".into(),
            gastos: 1200.0,
            ..ConclusionForm::default()
        };
        complete_project(&mut store, &gateway, "a", &form, now())
            .await
            .unwrap();

        let done = store.find("a").unwrap();
        assert_eq!(done.status, Status::Terminado);
        assert_eq!(done.gastos, Some(1200.0));
        assert_eq!(done.utilidad, Some(3800.0));
        assert_eq!(done.completed_at, Some(now()));
        let conclusion = done.conclusion.as_ref().unwrap();
        assert_eq!(conclusion.calificacion, Some(4));
        assert_eq!(conclusion.fecha, Some(now().date_naive()));
    }

    #[tokio::test]
    async fn completion_without_budget_books_negative_profit() {
        let mut store = ProjectStore::new();
        let gateway = MemoryGateway::new();
        store.add(sample_project("a", Status::Completo, 0.0));

        let form = ConclusionForm {
            gastos: 800.0,
            ..ConclusionForm::default()
        };
        complete_project(&mut store, &gateway, "a", &form, now())
            .await
            .unwrap();
        assert_eq!(store.find("a").unwrap().utilidad, Some(-800.0));
    }

    #[tokio::test]
    async fn leaving_terminado_keeps_stale_conclusion() {
        let mut store = ProjectStore::new();
        let gateway = MemoryGateway::new();
        let mut p = sample_project("a", Status::Completo, 0.0);
        p.presupuesto = Some(1000.0);
        store.add(p);

        let form = ConclusionForm {
            gastos: 100.0,
            ..ConclusionForm::default()
        };
        complete_project(&mut store, &gateway, "a", &form, now())
            .await
            .unwrap();
        move_project(&mut store, &gateway, "a", Status::EnCurso, 0)
            .await
            .unwrap();

        let back = store.find("a").unwrap();
        assert_eq!(back.status, Status::EnCurso);
        assert!(back.conclusion.is_some());
        assert_eq!(back.utilidad, Some(900.0));
    }

    #[tokio::test]
    async fn stale_ids_are_silent_noops() {
        let mut store = ProjectStore::new();
        let gateway = MemoryGateway::new();

        assert!(!update_project(&mut store, &gateway, "ghost", &ProjectForm::default())
            .await
            .unwrap());
        assert!(!move_project(&mut store, &gateway, "ghost", Status::Nuevo, 0)
            .await
            .unwrap());
        assert!(!delete_project(&mut store, &gateway, "ghost").await.unwrap());
        assert!(!toggle_task(&mut store, &gateway, "ghost", 0).await.unwrap());

        store.add(sample_project("real", Status::Nuevo, 0.0));
        assert!(!toggle_task(&mut store, &gateway, "real", 5).await.unwrap());
        assert_eq!(gateway.row_count(), 0);
    }

    #[tokio::test]
    async fn task_lifecycle_keeps_orders_contiguous() {
        let mut store = ProjectStore::new();
        let gateway = MemoryGateway::new();
        store.add(sample_project("a", Status::EnCurso, 0.0));

        for text in ["boceto", "pintura", "entrega"] {
            add_task(&mut store, &gateway, "a", text).await.unwrap();
        }
        toggle_task(&mut store, &gateway, "a", 0).await.unwrap();
        cycle_task_priority(&mut store, &gateway, "a", 1).await.unwrap();
        move_task(&mut store, &gateway, "a", 2, 0).await.unwrap();
        delete_task(&mut store, &gateway, "a", 1).await.unwrap();

        let tasks = &store.find("a").unwrap().tasks;
        let texts: Vec<&str> = tasks.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["entrega", "pintura"]);
        assert_eq!(tasks.iter().map(|t| t.order).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(tasks[1].priority, Priority::Alta);
        assert!(!tasks[0].completed);
    }

    #[tokio::test]
    async fn refresh_replaces_the_store() {
        let mut store = ProjectStore::new();
        store.add(sample_project("stale", Status::Nuevo, 0.0));

        let gateway = MemoryGateway::new();
        gateway
            .upsert_all(&[sample_project("fresh", Status::EnCurso, 0.0)])
            .await
            .unwrap();

        refresh(&mut store, &gateway).await.unwrap();
        assert!(store.find("stale").is_none());
        assert!(store.find("fresh").is_some());
    }

    #[test]
    fn calendar_cursor_wraps_across_years() {
        let mut state = AppState::new(NaiveDate::from_ymd_opt(2026, 12, 15).unwrap());
        state.calendar_next_month();
        assert_eq!((state.calendar_year, state.calendar_month), (2027, 1));
        state.calendar_prev_month();
        state.calendar_prev_month();
        assert_eq!((state.calendar_year, state.calendar_month), (2026, 11));
    }
}
