//! Draft editing, request normalization and the create/update/delete calls.
//!
//! Nothing here touches collection state. A successful call returns a
//! [`MutationOutcome`] and the caller decides what to re-fetch.

use std::ops::RangeInclusive;

use shared::{
    domain::{Employee, EmployeeId, EmployeeStatus},
    protocol::{AgeInput, EmployeeInput, EmployeeUpdateInput, SubjectInput},
};
use tracing::{info, warn};

use crate::{
    api::{delete_not_applied, RosterApi},
    error::ClientError,
};

pub const DEFAULT_SUBJECT_CREDITS: i64 = 3;
/// Bounds declared by the form. Not enforced client-side.
pub const AGE_RANGE: RangeInclusive<i64> = 18..=100;
pub const DELETE_PROMPT: &str = "Are you sure you want to delete this employee?";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectDraft {
    pub name: String,
    pub code: String,
    pub credits: Option<i64>,
}

/// Editable fields of one employee as typed into the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub name: String,
    pub age: String,
    pub class: String,
    pub email: String,
    pub phone: String,
    pub department: String,
    pub position: String,
    pub status: Option<EmployeeStatus>,
    pub subjects: Vec<SubjectDraft>,
}

impl Default for Draft {
    fn default() -> Self {
        Self {
            name: String::new(),
            age: String::new(),
            class: String::new(),
            email: String::new(),
            phone: String::new(),
            department: String::new(),
            position: String::new(),
            status: Some(EmployeeStatus::Active),
            subjects: Vec::new(),
        }
    }
}

impl Draft {
    pub fn from_employee(employee: &Employee) -> Self {
        Self {
            name: employee.name.clone(),
            age: employee.age.to_string(),
            class: employee.class.clone(),
            email: employee.email.clone().unwrap_or_default(),
            phone: employee.phone.clone().unwrap_or_default(),
            department: employee.department.clone().unwrap_or_default(),
            position: employee.position.clone().unwrap_or_default(),
            status: Some(employee.status),
            subjects: employee
                .subjects
                .iter()
                .map(|subject| SubjectDraft {
                    name: subject.name.clone(),
                    code: subject.code.clone(),
                    credits: subject.credits,
                })
                .collect(),
        }
    }

    /// Appends a subject when both name and code are given. Credits fall back
    /// to [`DEFAULT_SUBJECT_CREDITS`] when missing, non-numeric or zero.
    pub fn add_subject(&mut self, name: &str, code: &str, credits: &str) -> bool {
        if name.is_empty() || code.is_empty() {
            return false;
        }
        let credits = parse_leading_int(credits)
            .filter(|credits| *credits != 0)
            .unwrap_or(DEFAULT_SUBJECT_CREDITS);
        self.subjects.push(SubjectDraft {
            name: name.to_string(),
            code: code.to_string(),
            credits: Some(credits),
        });
        true
    }

    pub fn remove_subject(&mut self, index: usize) -> Option<SubjectDraft> {
        (index < self.subjects.len()).then(|| self.subjects.remove(index))
    }

    pub fn to_create_input(&self) -> EmployeeInput {
        EmployeeInput {
            name: self.name.trim().to_string(),
            age: normalize_age(&self.age),
            class: self.class.trim().to_string(),
            status: self.status.unwrap_or_default(),
            subjects: subject_inputs(&self.subjects),
            email: non_empty(&self.email),
            phone: non_empty(&self.phone),
            department: non_empty(&self.department),
            position: non_empty(&self.position),
        }
    }

    pub fn to_update_input(&self) -> EmployeeUpdateInput {
        EmployeeUpdateInput {
            name: Some(self.name.trim().to_string()),
            age: Some(normalize_age(&self.age)),
            class: Some(self.class.trim().to_string()),
            status: self.status,
            subjects: Some(subject_inputs(&self.subjects)),
            email: non_empty(&self.email),
            phone: non_empty(&self.phone),
            department: non_empty(&self.department),
            position: non_empty(&self.position),
        }
    }
}

/// Integer prefix of `raw` after leading whitespace, with an optional sign.
fn parse_leading_int(raw: &str) -> Option<i64> {
    let raw = raw.trim_start();
    let (sign, digits) = match raw.as_bytes().first() {
        Some(b'-') => (-1, &raw[1..]),
        Some(b'+') => (1, &raw[1..]),
        _ => (1, raw),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    digits[..end].parse::<i64>().ok().map(|value| value * sign)
}

pub fn normalize_age(raw: &str) -> AgeInput {
    match parse_leading_int(raw) {
        Some(years) => AgeInput::Years(years),
        None => AgeInput::Unparsed(raw.trim().to_string()),
    }
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn subject_inputs(subjects: &[SubjectDraft]) -> Vec<SubjectInput> {
    subjects
        .iter()
        .filter(|subject| !subject.name.is_empty() && !subject.code.is_empty())
        .map(|subject| SubjectInput {
            name: subject.name.clone(),
            code: subject.code.clone(),
            credits: subject.credits.filter(|credits| *credits != 0),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(EmployeeId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Created(Employee),
    Updated(Employee),
    Deleted(EmployeeId),
}

/// An open create or edit form. The draft survives failed submissions.
#[derive(Debug, Clone)]
pub struct MutationForm {
    mode: FormMode,
    draft: Draft,
    last_error: Option<String>,
}

impl MutationForm {
    pub fn create() -> Self {
        Self {
            mode: FormMode::Create,
            draft: Draft::default(),
            last_error: None,
        }
    }

    pub fn edit(employee: &Employee) -> Self {
        Self {
            mode: FormMode::Edit(employee.id.clone()),
            draft: Draft::from_employee(employee),
            last_error: None,
        }
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn is_edit(&self) -> bool {
        matches!(self.mode, FormMode::Edit(_))
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut Draft {
        &mut self.draft
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub async fn submit(
        &mut self,
        api: &dyn RosterApi,
        token: &str,
    ) -> Result<MutationOutcome, ClientError> {
        self.last_error = None;
        let result = match &self.mode {
            FormMode::Create => api
                .add_employee(token, &self.draft.to_create_input())
                .await
                .map(MutationOutcome::Created),
            FormMode::Edit(id) => api
                .update_employee(token, id, &self.draft.to_update_input())
                .await
                .map(MutationOutcome::Updated),
        };

        match &result {
            Ok(MutationOutcome::Created(employee)) => {
                info!(employee_id = %employee.id, "employee created");
            }
            Ok(MutationOutcome::Updated(employee)) => {
                info!(employee_id = %employee.id, "employee updated");
            }
            Ok(MutationOutcome::Deleted(_)) => {}
            Err(err) => {
                warn!(mode = ?self.mode, "employee submission failed: {err}");
                self.last_error = Some(err.message());
            }
        }
        result
    }
}

/// A delete that has been asked for but not yet confirmed.
#[derive(Debug)]
pub struct DeleteRequest {
    id: EmployeeId,
    name: String,
}

/// Proof of an explicit yes to a [`DeleteRequest`]; the only way to reach
/// [`delete`].
#[derive(Debug)]
pub struct ConfirmedDelete {
    id: EmployeeId,
}

impl DeleteRequest {
    pub fn new(employee: &Employee) -> Self {
        Self {
            id: employee.id.clone(),
            name: employee.name.clone(),
        }
    }

    pub fn id(&self) -> &EmployeeId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prompt(&self) -> &'static str {
        DELETE_PROMPT
    }

    pub fn confirm(self) -> ConfirmedDelete {
        ConfirmedDelete { id: self.id }
    }

    pub fn decline(self) {}

    /// Confirms when `answer` is true, declines otherwise.
    pub fn resolve(self, answer: bool) -> Option<ConfirmedDelete> {
        answer.then(|| self.confirm())
    }
}

impl ConfirmedDelete {
    pub fn id(&self) -> &EmployeeId {
        &self.id
    }
}

pub async fn delete(
    api: &dyn RosterApi,
    token: &str,
    confirmed: ConfirmedDelete,
) -> Result<MutationOutcome, ClientError> {
    match api.delete_employee(token, &confirmed.id).await {
        Ok(true) => {
            info!(employee_id = %confirmed.id, "employee deleted");
            Ok(MutationOutcome::Deleted(confirmed.id))
        }
        Ok(false) => Err(delete_not_applied(&confirmed.id)),
        Err(err) => {
            warn!(employee_id = %confirmed.id, "employee delete failed: {err}");
            Err(err)
        }
    }
}

#[cfg(test)]
#[path = "tests/mutation_tests.rs"]
mod tests;
