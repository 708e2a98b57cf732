//! Project and conclusion forms for the terminal user interface.
//!
//! Both forms are plain stacks of input fields with a focus index; parsing
//! only happens on submit, so half-typed dates and amounts never crash the
//! app, they just come back empty.

use chrono::NaiveDate;

use crate::handlers::{ConclusionForm, ProjectForm};
use crate::model::Project;
use crate::tui::input::InputField;

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

fn parse_amount(value: &str) -> Option<f64> {
    let cleaned = value.trim().trim_start_matches('$').replace(',', "");
    cleaned.parse().ok()
}

/// Create/edit form for a project's descriptive fields.
pub struct ProjectFormState {
    pub nombre: InputField,
    pub tipo: InputField,
    pub artista: InputField,
    pub cliente: InputField,
    pub contacto: InputField,
    pub ubicacion: InputField,
    pub formato: InputField,
    pub medidas: InputField,
    pub contexto: InputField,
    pub drive_link: InputField,
    pub presupuesto: InputField,
    pub fecha_inicio: InputField,
    pub fecha_fin: InputField,
    pub current_field: usize,
    /// Id of the project being edited; `None` when creating.
    pub editing: Option<String>,
}

impl ProjectFormState {
    pub fn new() -> Self {
        let mut form = ProjectFormState {
            nombre: InputField::new(),
            tipo: InputField::new(),
            artista: InputField::new(),
            cliente: InputField::new(),
            contacto: InputField::new(),
            ubicacion: InputField::new(),
            formato: InputField::new(),
            medidas: InputField::new(),
            contexto: InputField::new(),
            drive_link: InputField::new(),
            presupuesto: InputField::new(),
            fecha_inicio: InputField::new(),
            fecha_fin: InputField::new(),
            current_field: 0,
            editing: None,
        };
        form.update_active_field();
        form
    }

    pub fn from_project(project: &Project) -> Self {
        let mut form = ProjectFormState {
            nombre: InputField::with_value(&project.nombre),
            tipo: InputField::with_value(&project.tipo),
            artista: InputField::with_value(&project.artista),
            cliente: InputField::with_value(&project.cliente),
            contacto: InputField::with_value(&project.contacto),
            ubicacion: InputField::with_value(&project.ubicacion),
            formato: InputField::with_value(&project.formato),
            medidas: InputField::with_value(&project.medidas),
            contexto: InputField::with_value(&project.contexto),
            drive_link: InputField::with_value(&project.drive_link),
            presupuesto: InputField::with_value(
                &project.presupuesto.map(|p| p.to_string()).unwrap_or_default(),
            ),
            fecha_inicio: InputField::with_value(
                &project.fecha_inicio.map(|d| d.to_string()).unwrap_or_default(),
            ),
            fecha_fin: InputField::with_value(
                &project.fecha_fin.map(|d| d.to_string()).unwrap_or_default(),
            ),
            current_field: 0,
            editing: Some(project.id.clone()),
        };
        form.update_active_field();
        form
    }

    /// Field labels, in focus order. Keep in sync with [`fields_mut`].
    pub fn labels() -> [&'static str; 13] {
        [
            "Nombre",
            "Tipo",
            "Artista",
            "Cliente",
            "Contacto",
            "Ubicación",
            "Formato",
            "Medidas",
            "Contexto",
            "Link de Drive",
            "Presupuesto",
            "Fecha inicio (AAAA-MM-DD)",
            "Fecha fin (AAAA-MM-DD)",
        ]
    }

    pub fn fields_mut(&mut self) -> Vec<&mut InputField> {
        vec![
            &mut self.nombre,
            &mut self.tipo,
            &mut self.artista,
            &mut self.cliente,
            &mut self.contacto,
            &mut self.ubicacion,
            &mut self.formato,
            &mut self.medidas,
            &mut self.contexto,
            &mut self.drive_link,
            &mut self.presupuesto,
            &mut self.fecha_inicio,
            &mut self.fecha_fin,
        ]
    }

    pub fn field_count(&self) -> usize {
        Self::labels().len()
    }

    pub fn next_field(&mut self) {
        self.current_field = (self.current_field + 1) % self.field_count();
        self.update_active_field();
    }

    pub fn prev_field(&mut self) {
        let count = self.field_count();
        self.current_field = (self.current_field + count - 1) % count;
        self.update_active_field();
    }

    pub fn update_active_field(&mut self) {
        let current = self.current_field;
        for (i, field) in self.fields_mut().into_iter().enumerate() {
            field.active = i == current;
        }
    }

    pub fn active_field_mut(&mut self) -> &mut InputField {
        let current = self.current_field;
        self.fields_mut().swap_remove(current)
    }

    /// Parse the form into a handler payload. The name is the only required
    /// field; everything else degrades to empty.
    pub fn to_form(&self) -> Option<ProjectForm> {
        let nombre = self.nombre.value.trim().to_string();
        if nombre.is_empty() {
            return None;
        }
        Some(ProjectForm {
            nombre,
            tipo: self.tipo.value.trim().to_string(),
            artista: self.artista.value.trim().to_string(),
            cliente: self.cliente.value.trim().to_string(),
            contacto: self.contacto.value.trim().to_string(),
            ubicacion: self.ubicacion.value.trim().to_string(),
            formato: self.formato.value.trim().to_string(),
            medidas: self.medidas.value.trim().to_string(),
            contexto: self.contexto.value.trim().to_string(),
            drive_link: self.drive_link.value.trim().to_string(),
            presupuesto: parse_amount(&self.presupuesto.value),
            fecha_inicio: parse_date(&self.fecha_inicio.value),
            fecha_fin: parse_date(&self.fecha_fin.value),
        })
    }
}

/// Completion form shown before a project enters terminado.
pub struct ConclusionFormState {
    pub gastos: InputField,
    pub calificacion: InputField,
    pub notas: InputField,
    pub link_resultado: InputField,
    pub current_field: usize,
    /// The project this conclusion belongs to.
    pub project_id: String,
}

impl ConclusionFormState {
    pub fn new(project_id: &str) -> Self {
        let mut form = ConclusionFormState {
            gastos: InputField::new(),
            calificacion: InputField::new(),
            notas: InputField::new(),
            link_resultado: InputField::new(),
            current_field: 0,
            project_id: project_id.to_string(),
        };
        form.update_active_field();
        form
    }

    pub fn labels() -> [&'static str; 4] {
        [
            "Gastos",
            "Calificación (1-5)",
            "Notas",
            "Link del resultado",
        ]
    }

    pub fn fields_mut(&mut self) -> Vec<&mut InputField> {
        vec![
            &mut self.gastos,
            &mut self.calificacion,
            &mut self.notas,
            &mut self.link_resultado,
        ]
    }

    pub fn next_field(&mut self) {
        self.current_field = (self.current_field + 1) % Self::labels().len();
        self.update_active_field();
    }

    pub fn prev_field(&mut self) {
        let count = Self::labels().len();
        self.current_field = (self.current_field + count - 1) % count;
        self.update_active_field();
    }

    pub fn update_active_field(&mut self) {
        let current = self.current_field;
        for (i, field) in self.fields_mut().into_iter().enumerate() {
            field.active = i == current;
        }
    }

    pub fn active_field_mut(&mut self) -> &mut InputField {
        let current = self.current_field;
        self.fields_mut().swap_remove(current)
    }

    pub fn to_form(&self) -> ConclusionForm {
        ConclusionForm {
            fecha: None,
            calificacion: self
                .calificacion
                .value
                .trim()
                .parse::<u8>()
                .ok()
                .filter(|c| (1..=5).contains(c)),
            notas: self.notas.value.trim().to_string(),
            link_resultado: self.link_resultado.value.trim().to_string(),
            gastos: parse_amount(&self.gastos.value).unwrap_or(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_form_requires_a_name() {
        let mut form = ProjectFormState::new();
        assert!(form.to_form().is_none());

        form.nombre = InputField::with_value("Mural fachada");
        form.presupuesto = InputField::with_value("$5,000");
        form.fecha_inicio = InputField::with_value("2026-09-01");
        form.fecha_fin = InputField::with_value("no es fecha");

        let payload = form.to_form().unwrap();
        assert_eq!(payload.nombre, "Mural fachada");
        assert_eq!(payload.presupuesto, Some(5000.0));
        assert_eq!(payload.fecha_inicio, NaiveDate::from_ymd_opt(2026, 9, 1));
        assert_eq!(payload.fecha_fin, None);
    }

    #[test]
    fn focus_cycles_through_every_field() {
        let mut form = ProjectFormState::new();
        assert!(form.nombre.active);
        for _ in 0..form.field_count() {
            form.next_field();
        }
        assert_eq!(form.current_field, 0);
        form.prev_field();
        assert_eq!(form.current_field, form.field_count() - 1);
        assert!(form.fecha_fin.active);
    }

    #[test]
    fn conclusion_rating_is_bounded() {
        let mut form = ConclusionFormState::new("p1");
        form.gastos = InputField::with_value("1200");
        form.calificacion = InputField::with_value("9");
        let payload = form.to_form();
        assert_eq!(payload.gastos, 1200.0);
        assert_eq!(payload.calificacion, None);

        form.calificacion = InputField::with_value("4");
        assert_eq!(form.to_form().calificacion, Some(4));
    }
}
