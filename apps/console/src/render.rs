//! Plain-text presentation of listings, records and the signed-in user.

use client_core::Affordances;
use shared::domain::{Employee, EmployeePage, SortField, SortOrder, SortSpec, User};

const EMPTY_LISTING: &str = "No employees found.";

struct Column {
    label: &'static str,
    sort_field: Option<SortField>,
    cell: fn(&Employee) -> String,
}

fn optional(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

fn grid_columns() -> Vec<Column> {
    vec![
        Column {
            label: "ID",
            sort_field: None,
            cell: |e| e.id.to_string(),
        },
        Column {
            label: "Name",
            sort_field: Some(SortField::Name),
            cell: |e| e.name.clone(),
        },
        Column {
            label: "Age",
            sort_field: Some(SortField::Age),
            cell: |e| e.age.to_string(),
        },
        Column {
            label: "Class",
            sort_field: Some(SortField::Class),
            cell: |e| e.class.clone(),
        },
        Column {
            label: "Email",
            sort_field: Some(SortField::Email),
            cell: |e| optional(&e.email),
        },
        Column {
            label: "Phone",
            sort_field: Some(SortField::Phone),
            cell: |e| optional(&e.phone),
        },
        Column {
            label: "Department",
            sort_field: Some(SortField::Department),
            cell: |e| optional(&e.department),
        },
        Column {
            label: "Position",
            sort_field: Some(SortField::Position),
            cell: |e| optional(&e.position),
        },
        Column {
            label: "Subjects",
            sort_field: None,
            cell: |e| e.subjects.len().to_string(),
        },
        Column {
            label: "Attendance",
            sort_field: None,
            cell: |e| e.attendance.len().to_string(),
        },
        Column {
            label: "Status",
            sort_field: Some(SortField::Status),
            cell: |e| e.status.as_str().to_string(),
        },
    ]
}

fn header_label(column: &Column, sort: Option<SortSpec>) -> String {
    match (column.sort_field, sort) {
        (Some(field), Some(spec)) if spec.field == field => {
            let arrow = match spec.order {
                SortOrder::Asc => "↑",
                SortOrder::Desc => "↓",
            };
            format!("{} {arrow}", column.label)
        }
        _ => column.label.to_string(),
    }
}

fn row_actions(affordances: Affordances) -> String {
    let mut actions = Vec::new();
    if affordances.can_edit {
        actions.push("edit");
    }
    if affordances.can_delete {
        actions.push("delete");
    }
    actions.join(" | ")
}

pub fn render_grid(page: &EmployeePage, sort: Option<SortSpec>, affordances: Affordances) -> String {
    if page.employees.is_empty() {
        return EMPTY_LISTING.to_string();
    }

    let columns = grid_columns();
    let show_actions = affordances.can_edit || affordances.can_delete;

    let mut header: Vec<String> = columns.iter().map(|c| header_label(c, sort)).collect();
    let mut rows: Vec<Vec<String>> = page
        .employees
        .iter()
        .map(|employee| columns.iter().map(|c| (c.cell)(employee)).collect())
        .collect();
    if show_actions {
        header.push("Actions".to_string());
        for row in &mut rows {
            row.push(row_actions(affordances));
        }
    }

    let widths: Vec<usize> = (0..header.len())
        .map(|idx| {
            rows.iter()
                .map(|row| row[idx].chars().count())
                .chain(std::iter::once(header[idx].chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let format_row = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| {
                let pad = width.saturating_sub(cell.chars().count());
                format!("{cell}{}", " ".repeat(pad))
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![format_row(header.as_slice())];
    out.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    out.extend(rows.iter().map(|row| format_row(row.as_slice())));
    out.join("\n")
}

fn render_tile(employee: &Employee, affordances: Affordances) -> String {
    let initial = employee.initial().unwrap_or('?');
    let mut lines = vec![
        format!("[{initial}] {}  ({})", employee.name, employee.id),
        format!("    {} · class {} · {}", employee.age, employee.class, employee.status.as_str()),
    ];
    if let Some(position) = &employee.position {
        lines.push(format!("    {position}"));
    }
    lines.push(format!(
        "    Attendance {}% ({}/{})",
        employee.attendance_rate(),
        employee.present_count(),
        employee.attendance.len()
    ));
    if affordances.can_edit || affordances.can_delete {
        lines.push(format!("    actions: {}", row_actions(affordances)));
    }
    lines.join("\n")
}

pub fn render_tiles(page: &EmployeePage, affordances: Affordances) -> String {
    if page.employees.is_empty() {
        return EMPTY_LISTING.to_string();
    }
    page.employees
        .iter()
        .map(|employee| render_tile(employee, affordances))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn render_detail(employee: &Employee) -> String {
    let mut out = vec![
        format!("{} ({})", employee.name, employee.status.as_str()),
        String::new(),
        "Personal Information".to_string(),
        format!("  Age:        {}", employee.age),
        format!("  Class:      {}", employee.class),
    ];
    let optional_fields = [
        ("Email", &employee.email),
        ("Phone", &employee.phone),
        ("Department", &employee.department),
        ("Position", &employee.position),
    ];
    for (label, value) in optional_fields {
        if let Some(value) = value {
            out.push(format!("  {:<11} {value}", format!("{label}:")));
        }
    }

    out.push(String::new());
    out.push(format!("Subjects ({})", employee.subjects.len()));
    for subject in &employee.subjects {
        match subject.credits {
            Some(credits) if credits != 0 => {
                out.push(format!("  {} [{}] {credits} credits", subject.name, subject.code))
            }
            _ => out.push(format!("  {} [{}]", subject.name, subject.code)),
        }
    }

    out.push(String::new());
    out.push("Attendance".to_string());
    out.push(format!(
        "  Rate {}% · present {} · records {}",
        employee.attendance_rate(),
        employee.present_count(),
        employee.attendance.len()
    ));
    if employee.attendance.is_empty() {
        out.push("  No attendance records".to_string());
    }
    for entry in &employee.attendance {
        let status: String = entry.status.clone().into();
        match &entry.notes {
            Some(notes) => out.push(format!("  {}  {status}  {notes}", entry.date)),
            None => out.push(format!("  {}  {status}", entry.date)),
        }
    }
    out.join("\n")
}

pub fn render_user(user: &User) -> String {
    format!("{} <{}> ({})", user.username, user.email, user.role.as_str())
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
