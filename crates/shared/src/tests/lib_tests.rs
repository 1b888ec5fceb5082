use serde_json::json;

use crate::{
    domain::{
        AttendanceStatus, Employee, EmployeeStatus, Role, SortField, SortOrder,
        SortSpec,
    },
    error::{ApiError, ErrorCode},
    protocol::{
        AgeInput, EmployeeQuery, EmployeeUpdateInput, GraphqlError, GraphqlResponse, LoginData,
        SubjectInput,
    },
};

fn employee_json() -> serde_json::Value {
    json!({
        "id": "emp-1",
        "name": "ada lovelace",
        "age": 36,
        "class": "A",
        "email": null,
        "status": "on_leave",
        "subjects": [{ "name": "Math", "code": "M1", "credits": null }],
        "attendance": [
            { "date": "2024-01-01", "status": "present" },
            { "date": "2024-01-02", "status": "absent" },
            { "date": "2024-01-03", "status": "present" },
            { "date": "2024-01-04", "status": "late", "notes": "train" }
        ],
        "createdAt": "1700000000000"
    })
}

#[test]
fn employee_decodes_with_nulls_and_unknown_attendance_status() {
    let employee: Employee = serde_json::from_value(employee_json()).expect("decode");
    assert_eq!(employee.email, None);
    assert_eq!(employee.status, EmployeeStatus::OnLeave);
    assert_eq!(employee.subjects[0].credits, None);
    assert_eq!(
        employee.attendance[3].status,
        AttendanceStatus::Other("late".to_string())
    );
    assert_eq!(employee.created_at.as_deref(), Some("1700000000000"));
}

#[test]
fn attendance_rate_rounds_present_share() {
    let employee: Employee = serde_json::from_value(employee_json()).expect("decode");
    assert_eq!(employee.present_count(), 2);
    assert_eq!(employee.attendance_rate(), 50);
    assert_eq!(employee.initial(), Some('A'));
}

#[test]
fn attendance_rate_is_zero_without_entries() {
    let mut value = employee_json();
    value["attendance"] = json!([]);
    let employee: Employee = serde_json::from_value(value).expect("decode");
    assert_eq!(employee.attendance_rate(), 0);
}

#[test]
fn role_keeps_non_admin_values_verbatim() {
    let admin: Role = serde_json::from_value(json!("admin")).expect("admin");
    let viewer: Role = serde_json::from_value(json!("viewer")).expect("viewer");
    assert!(admin.is_admin());
    assert_eq!(viewer, Role::Member("viewer".to_string()));
    assert_eq!(serde_json::to_value(&viewer).expect("encode"), json!("viewer"));
}

#[test]
fn sort_toggle_flips_same_field_and_resets_new_field() {
    let sort = SortSpec {
        field: SortField::Name,
        order: SortOrder::Asc,
    };
    let flipped = sort.toggled(SortField::Name);
    assert_eq!(flipped.order, SortOrder::Desc);
    let moved = flipped.toggled(SortField::Age);
    assert_eq!(
        moved,
        SortSpec {
            field: SortField::Age,
            order: SortOrder::Asc
        }
    );
    assert_eq!(SortSpec::default().field, SortField::CreatedAt);
    assert_eq!(SortSpec::default().order, SortOrder::Desc);
}

#[test]
fn sort_field_parses_wire_and_snake_names() {
    assert_eq!(SortField::parse("createdAt"), Some(SortField::CreatedAt));
    assert_eq!(SortField::parse("created_at"), Some(SortField::CreatedAt));
    assert_eq!(SortField::parse("NAME"), Some(SortField::Name));
    assert_eq!(SortField::parse("subjects"), None);
}

#[test]
fn query_variables_omit_absent_sort() {
    let query = EmployeeQuery {
        page: 2,
        page_size: 12,
        sort: None,
    };
    assert_eq!(
        serde_json::to_value(query).expect("encode"),
        json!({ "page": 2, "pageSize": 12 })
    );

    let sorted = EmployeeQuery {
        sort: Some(SortSpec::default()),
        ..query
    };
    assert_eq!(
        serde_json::to_value(sorted).expect("encode")["sort"],
        json!({ "field": "createdAt", "order": "DESC" })
    );
}

#[test]
fn update_input_serializes_only_present_fields() {
    let input = EmployeeUpdateInput {
        name: Some("Ada".to_string()),
        age: Some(AgeInput::Unparsed("abc".to_string())),
        subjects: Some(vec![SubjectInput {
            name: "Math".to_string(),
            code: "M1".to_string(),
            credits: None,
        }]),
        ..EmployeeUpdateInput::default()
    };
    assert_eq!(
        serde_json::to_value(&input).expect("encode"),
        json!({
            "name": "Ada",
            "age": "abc",
            "subjects": [{ "name": "Math", "code": "M1" }]
        })
    );
}

#[test]
fn graphql_error_code_maps_to_taxonomy() {
    let response: GraphqlResponse<serde_json::Value> = serde_json::from_value(json!({
        "errors": [{ "message": "Not authenticated", "extensions": { "code": "UNAUTHENTICATED" } }]
    }))
    .expect("decode");
    assert!(response.data.is_none());
    let error: ApiError = response.errors[0].clone().into();
    assert_eq!(error.code, ErrorCode::Unauthenticated);
    assert_eq!(error.message, "Not authenticated");

    let bare = GraphqlError {
        message: "boom".to_string(),
        extensions: None,
    };
    assert_eq!(ApiError::from(bare).code, ErrorCode::Unknown);
}

#[test]
fn error_envelope_without_data_key_decodes_for_any_payload() {
    let response: GraphqlResponse<LoginData> = serde_json::from_value(json!({
        "errors": [{ "message": "Invalid credentials", "extensions": { "code": "UNAUTHENTICATED" } }]
    }))
    .expect("decode");

    assert!(response.data.is_none());
    assert_eq!(response.errors[0].message, "Invalid credentials");

    let explicit_null: GraphqlResponse<LoginData> =
        serde_json::from_value(json!({ "data": null, "errors": [] })).expect("decode");
    assert!(explicit_null.data.is_none());
}
