//! In-memory project store: the authoritative client-side collection for the
//! session.
//!
//! Every view reads from here and every handler mutates here first, then
//! persists through the gateway. Mutation is synchronous, so no reader in the
//! same turn can observe a half-applied change.

use crate::model::{Project, Status};

/// Session-wide ordered collection of projects, keyed by `id`.
///
/// No operation may leave two projects with the same id: `add` replaces any
/// existing project with the same id instead of duplicating it.
#[derive(Debug, Default)]
pub struct ProjectStore {
    projects: Vec<Project>,
}

impl ProjectStore {
    pub fn new() -> Self {
        ProjectStore::default()
    }

    /// Replace the whole collection with a freshly fetched snapshot.
    /// Later duplicates win, matching upsert semantics at the remote.
    pub fn load(&mut self, projects: Vec<Project>) {
        self.projects.clear();
        for p in projects {
            self.add(p);
        }
    }

    /// Insert a project, replacing any existing project with the same id.
    pub fn add(&mut self, project: Project) {
        match self.projects.iter().position(|p| p.id == project.id) {
            Some(i) => self.projects[i] = project,
            None => self.projects.push(project),
        }
    }

    /// Apply an in-place edit to the project with the given id.
    /// A stale id is a silent no-op; returns whether anything was touched.
    pub fn replace<F>(&mut self, id: &str, f: F) -> bool
    where
        F: FnOnce(&mut Project),
    {
        match self.projects.iter_mut().find(|p| p.id == id) {
            Some(p) => {
                f(p);
                true
            }
            None => false,
        }
    }

    /// Remove and return the project with the given id. Tasks go with it.
    pub fn remove(&mut self, id: &str) -> Option<Project> {
        let i = self.projects.iter().position(|p| p.id == id)?;
        Some(self.projects.remove(i))
    }

    pub fn find(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn all(&self) -> &[Project] {
        &self.projects
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Per-column project counts for the board header.
    pub fn counts_by_status(&self) -> [(Status, usize); 4] {
        Status::ALL.map(|s| {
            let n = self.projects.iter().filter(|p| p.status == s).count();
            (s, n)
        })
    }

    /// Next integer order key for a project appended to the given column.
    pub fn next_order_in(&self, status: Status) -> f64 {
        self.projects
            .iter()
            .filter(|p| p.status == status)
            .map(|p| p.order)
            .fold(-1.0_f64, f64::max)
            + 1.0
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    /// Minimal project for tests; callers override what they care about.
    pub fn sample_project(id: &str, status: Status, order: f64) -> Project {
        Project {
            id: id.to_string(),
            nombre: format!("Proyecto {id}"),
            tipo: "Mural".to_string(),
            artista: "Bel".to_string(),
            cliente: "Casa Roja".to_string(),
            contacto: String::new(),
            ubicacion: String::new(),
            formato: String::new(),
            medidas: String::new(),
            contexto: String::new(),
            drive_link: String::new(),
            presupuesto: None,
            fecha_inicio: None,
            fecha_fin: None,
            status,
            order,
            tasks: Vec::new(),
            gastos: None,
            utilidad: None,
            conclusion: None,
            completed_at: None,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn add_replaces_same_id() {
        let mut store = ProjectStore::new();
        store.add(sample_project("a", Status::Nuevo, 0.0));
        let mut again = sample_project("a", Status::EnCurso, 3.0);
        again.nombre = "Renombrado".to_string();
        store.add(again);

        assert_eq!(store.len(), 1);
        assert_eq!(store.find("a").unwrap().nombre, "Renombrado");
        assert_eq!(store.find("a").unwrap().status, Status::EnCurso);
    }

    #[test]
    fn replace_on_missing_id_is_noop() {
        let mut store = ProjectStore::new();
        store.add(sample_project("a", Status::Nuevo, 0.0));
        let touched = store.replace("ghost", |p| p.nombre.clear());
        assert!(!touched);
        assert_eq!(store.find("a").unwrap().nombre, "Proyecto a");
    }

    #[test]
    fn remove_cascades_tasks_with_project() {
        let mut store = ProjectStore::new();
        let mut p = sample_project("a", Status::Nuevo, 0.0);
        p.tasks.push(crate::model::Task::new(0));
        store.add(p);

        let removed = store.remove("a").unwrap();
        assert_eq!(removed.tasks.len(), 1);
        assert!(store.is_empty());
        assert!(store.remove("a").is_none());
    }

    #[test]
    fn counts_and_next_order() {
        let mut store = ProjectStore::new();
        store.add(sample_project("a", Status::Nuevo, 0.0));
        store.add(sample_project("b", Status::Nuevo, 4.0));
        store.add(sample_project("c", Status::Terminado, 0.0));

        let counts = store.counts_by_status();
        assert_eq!(counts[0], (Status::Nuevo, 2));
        assert_eq!(counts[3], (Status::Terminado, 1));
        assert_eq!(store.next_order_in(Status::Nuevo), 5.0);
        assert_eq!(store.next_order_in(Status::EnCurso), 0.0);
    }
}
