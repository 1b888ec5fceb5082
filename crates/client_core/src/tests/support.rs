use std::{cmp::Ordering, sync::Mutex};

use async_trait::async_trait;
use shared::{
    domain::{
        Employee, EmployeeId, EmployeePage, EmployeeStatus, Role, SortField,
        SortOrder, Subject, User, UserId,
    },
    protocol::{AgeInput, AuthPayload, EmployeeInput, EmployeeQuery, EmployeeUpdateInput},
};

use crate::{api::RosterApi, error::ClientError};

pub const VALID_TOKEN: &str = "token-valid";

pub fn admin_user() -> User {
    User {
        id: UserId("u-1".to_string()),
        username: "admin".to_string(),
        email: "admin@example.com".to_string(),
        role: Role::Admin,
    }
}

pub fn member_user() -> User {
    User {
        id: UserId("u-2".to_string()),
        username: "viewer".to_string(),
        email: "viewer@example.com".to_string(),
        role: Role::Member("user".to_string()),
    }
}

pub fn employee(id: &str, name: &str, age: i64) -> Employee {
    Employee {
        id: EmployeeId(id.to_string()),
        name: name.to_string(),
        age,
        class: "A".to_string(),
        email: None,
        phone: None,
        department: None,
        position: None,
        status: EmployeeStatus::Active,
        subjects: Vec::new(),
        attendance: Vec::new(),
        created_at: Some(format!("{id}-created")),
    }
}

pub fn roster(count: usize) -> Vec<Employee> {
    (1..=count)
        .map(|n| employee(&format!("emp-{n:02}"), &format!("Employee {n:02}"), 20 + n as i64))
        .collect()
}

fn total_pages_for(total_count: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    total_count.div_ceil(u64::from(page_size)) as u32
}

pub fn page_of(employees: Vec<Employee>, page: u32, page_size: u32, total_count: u64) -> EmployeePage {
    EmployeePage {
        employees,
        total_count,
        page,
        page_size,
        total_pages: total_pages_for(total_count, page_size),
    }
}

fn compare(a: &Employee, b: &Employee, field: SortField) -> Ordering {
    match field {
        SortField::Name => a.name.cmp(&b.name),
        SortField::Age => a.age.cmp(&b.age),
        SortField::Class => a.class.cmp(&b.class),
        SortField::Email => a.email.cmp(&b.email),
        SortField::Phone => a.phone.cmp(&b.phone),
        SortField::Department => a.department.cmp(&b.department),
        SortField::Position => a.position.cmp(&b.position),
        SortField::Status => a.status.as_str().cmp(b.status.as_str()),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
    }
}

/// In-memory roster service with call recording and failure injection.
pub struct FakeRosterApi {
    pub roster: Mutex<Vec<Employee>>,
    pub user: User,
    pub queries: Mutex<Vec<EmployeeQuery>>,
    pub created: Mutex<Vec<EmployeeInput>>,
    pub updated: Mutex<Vec<(EmployeeId, EmployeeUpdateInput)>>,
    pub deleted: Mutex<Vec<EmployeeId>>,
    pub me_calls: Mutex<u32>,
    fail_next: Mutex<Option<ClientError>>,
    next_id: Mutex<u32>,
}

impl FakeRosterApi {
    pub fn new(roster: Vec<Employee>, user: User) -> Self {
        Self {
            roster: Mutex::new(roster),
            user,
            queries: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
            updated: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            me_calls: Mutex::new(0),
            fail_next: Mutex::new(None),
            next_id: Mutex::new(100),
        }
    }

    pub fn fail_next(&self, err: ClientError) {
        *self.fail_next.lock().expect("lock") = Some(err);
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().expect("lock").len()
    }

    pub fn last_query(&self) -> Option<EmployeeQuery> {
        self.queries.lock().expect("lock").last().copied()
    }

    fn check(&self, token: &str) -> Result<(), ClientError> {
        if let Some(err) = self.fail_next.lock().expect("lock").take() {
            return Err(err);
        }
        if token != VALID_TOKEN {
            return Err(ClientError::Unauthenticated("invalid token".to_string()));
        }
        Ok(())
    }
}

fn age_of(age: &AgeInput) -> Result<i64, ClientError> {
    match age {
        AgeInput::Years(years) => Ok(*years),
        AgeInput::Unparsed(raw) => Err(ClientError::Api(shared::error::ApiException::new(
            shared::error::ErrorCode::Validation,
            format!("Int cannot represent non-integer value: \"{raw}\""),
        ))),
    }
}

#[async_trait]
impl RosterApi for FakeRosterApi {
    async fn me(&self, token: &str) -> Result<User, ClientError> {
        *self.me_calls.lock().expect("lock") += 1;
        self.check(token)?;
        Ok(self.user.clone())
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, ClientError> {
        if let Some(err) = self.fail_next.lock().expect("lock").take() {
            return Err(err);
        }
        if email == self.user.email && password == "secret" {
            Ok(AuthPayload {
                token: VALID_TOKEN.to_string(),
                user: self.user.clone(),
            })
        } else {
            Err(ClientError::Unauthenticated("Invalid credentials".to_string()))
        }
    }

    async fn employees(
        &self,
        token: &str,
        query: &EmployeeQuery,
    ) -> Result<EmployeePage, ClientError> {
        self.queries.lock().expect("lock").push(*query);
        self.check(token)?;
        let mut all = self.roster.lock().expect("lock").clone();
        if let Some(sort) = query.sort {
            all.sort_by(|a, b| {
                let ordering = compare(a, b, sort.field);
                match sort.order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
        }
        let total_count = all.len() as u64;
        let start = (query.page.saturating_sub(1) * query.page_size) as usize;
        let employees = all
            .into_iter()
            .skip(start)
            .take(query.page_size as usize)
            .collect();
        Ok(page_of(employees, query.page, query.page_size, total_count))
    }

    async fn add_employee(
        &self,
        token: &str,
        input: &EmployeeInput,
    ) -> Result<Employee, ClientError> {
        self.check(token)?;
        self.created.lock().expect("lock").push(input.clone());
        let age = age_of(&input.age)?;
        let id = {
            let mut next = self.next_id.lock().expect("lock");
            *next += 1;
            format!("emp-{next}")
        };
        let mut created = employee(&id, &input.name, age);
        created.class = input.class.clone();
        created.status = input.status;
        created.email = input.email.clone();
        created.subjects = input
            .subjects
            .iter()
            .map(|subject| Subject {
                name: subject.name.clone(),
                code: subject.code.clone(),
                credits: subject.credits,
            })
            .collect();
        self.roster.lock().expect("lock").push(created.clone());
        Ok(created)
    }

    async fn update_employee(
        &self,
        token: &str,
        id: &EmployeeId,
        input: &EmployeeUpdateInput,
    ) -> Result<Employee, ClientError> {
        self.check(token)?;
        self.updated
            .lock()
            .expect("lock")
            .push((id.clone(), input.clone()));
        let mut roster = self.roster.lock().expect("lock");
        let existing = roster
            .iter_mut()
            .find(|employee| &employee.id == id)
            .ok_or_else(|| ClientError::NotFound(format!("employee {id}")))?;
        if let Some(name) = &input.name {
            existing.name = name.clone();
        }
        if let Some(age) = &input.age {
            existing.age = age_of(age)?;
        }
        if let Some(status) = input.status {
            existing.status = status;
        }
        Ok(existing.clone())
    }

    async fn delete_employee(&self, token: &str, id: &EmployeeId) -> Result<bool, ClientError> {
        self.check(token)?;
        self.deleted.lock().expect("lock").push(id.clone());
        let mut roster = self.roster.lock().expect("lock");
        let before = roster.len();
        roster.retain(|employee| &employee.id != id);
        Ok(roster.len() != before)
    }
}
