//! Remote API seam and its GraphQL-over-HTTP implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use shared::{
    domain::{Employee, EmployeeId, EmployeePage, User},
    error::{ApiError, ApiException, ErrorCode},
    protocol::{
        AddEmployeeData, AuthPayload, DeleteEmployeeData, EmployeeInput, EmployeeQuery,
        EmployeeUpdateInput, EmployeesData, GraphqlRequest, GraphqlResponse, LoginData, MeData,
        UpdateEmployeeData,
    },
};
use tracing::{debug, warn};

use crate::error::ClientError;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const EMPLOYEE_FIELDS: &str = "
      id
      name
      age
      class
      email
      phone
      department
      position
      status
      subjects {
        name
        code
        credits
      }
      attendance {
        date
        status
        notes
      }
      createdAt";

pub const ME_QUERY: &str = "query Me {
  me {
    id
    username
    email
    role
  }
}";

pub const LOGIN_MUTATION: &str = "mutation Login($email: String!, $password: String!) {
  login(email: $email, password: $password) {
    token
    user {
      id
      username
      email
      role
    }
  }
}";

fn employees_query() -> String {
    format!(
        "query GetEmployees($page: Int, $pageSize: Int, $sort: SortInput) {{
  employees(page: $page, pageSize: $pageSize, sort: $sort) {{
    employees {{{EMPLOYEE_FIELDS}
    }}
    totalCount
    page
    pageSize
    totalPages
  }}
}}"
    )
}

fn add_employee_mutation() -> String {
    format!(
        "mutation AddEmployee($input: EmployeeInput!) {{
  addEmployee(input: $input) {{{EMPLOYEE_FIELDS}
  }}
}}"
    )
}

fn update_employee_mutation() -> String {
    format!(
        "mutation UpdateEmployee($id: ID!, $input: EmployeeUpdateInput!) {{
  updateEmployee(id: $id, input: $input) {{{EMPLOYEE_FIELDS}
  }}
}}"
    )
}

pub const DELETE_EMPLOYEE_MUTATION: &str = "mutation DeleteEmployee($id: ID!) {
  deleteEmployee(id: $id)
}";

/// Call contract of the roster service. Every call except `login` carries
/// the session token.
#[async_trait]
pub trait RosterApi: Send + Sync {
    async fn me(&self, token: &str) -> Result<User, ClientError>;
    async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, ClientError>;
    async fn employees(
        &self,
        token: &str,
        query: &EmployeeQuery,
    ) -> Result<EmployeePage, ClientError>;
    async fn add_employee(
        &self,
        token: &str,
        input: &EmployeeInput,
    ) -> Result<Employee, ClientError>;
    async fn update_employee(
        &self,
        token: &str,
        id: &EmployeeId,
        input: &EmployeeUpdateInput,
    ) -> Result<Employee, ClientError>;
    async fn delete_employee(&self, token: &str, id: &EmployeeId) -> Result<bool, ClientError>;
}

pub struct GraphqlClient {
    http: Client,
    endpoint: String,
}

impl GraphqlClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn with_timeout(
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn execute<V, T>(
        &self,
        token: Option<&str>,
        operation_name: &str,
        query: &str,
        variables: V,
    ) -> Result<T, ClientError>
    where
        V: Serialize + Send + Sync,
        T: DeserializeOwned + Send,
    {
        debug!(operation = operation_name, "sending graphql request");
        let mut request = self.http.post(&self.endpoint).json(&GraphqlRequest {
            operation_name,
            query,
            variables,
        });
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        let decoded = serde_json::from_slice::<GraphqlResponse<T>>(&body);
        if status == StatusCode::UNAUTHORIZED {
            let message = decoded
                .ok()
                .and_then(|resp| resp.errors.into_iter().next())
                .map(|err| err.message)
                .unwrap_or_else(|| "unauthorized".to_string());
            warn!(operation = operation_name, "graphql request rejected as unauthorized");
            return Err(ClientError::Unauthenticated(message));
        }

        let decoded = match decoded {
            Ok(decoded) => decoded,
            Err(err) if status.is_success() => {
                return Err(ClientError::Decode(format!(
                    "invalid {operation_name} response body: {err}"
                )));
            }
            Err(_) => {
                return Err(ClientError::Transport(format!(
                    "server responded with {status} to {operation_name}"
                )));
            }
        };

        if let Some(first) = decoded.errors.into_iter().next() {
            let api_error = ApiError::from(first);
            warn!(
                operation = operation_name,
                code = ?api_error.code,
                "graphql request returned an error"
            );
            return Err(api_error.into());
        }

        decoded.data.ok_or_else(|| {
            ClientError::Decode(format!("{operation_name} response contained no data"))
        })
    }
}

#[async_trait]
impl RosterApi for GraphqlClient {
    async fn me(&self, token: &str) -> Result<User, ClientError> {
        let data: MeData = self
            .execute(Some(token), "Me", ME_QUERY, json!({}))
            .await?;
        data.me
            .ok_or_else(|| ClientError::Unauthenticated("session is not valid".to_string()))
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, ClientError> {
        let data: LoginData = self
            .execute(
                None,
                "Login",
                LOGIN_MUTATION,
                json!({ "email": email, "password": password }),
            )
            .await?;
        Ok(data.login)
    }

    async fn employees(
        &self,
        token: &str,
        query: &EmployeeQuery,
    ) -> Result<EmployeePage, ClientError> {
        let data: EmployeesData = self
            .execute(Some(token), "GetEmployees", &employees_query(), query)
            .await?;
        Ok(data.employees)
    }

    async fn add_employee(
        &self,
        token: &str,
        input: &EmployeeInput,
    ) -> Result<Employee, ClientError> {
        let data: AddEmployeeData = self
            .execute(
                Some(token),
                "AddEmployee",
                &add_employee_mutation(),
                json!({ "input": input }),
            )
            .await?;
        Ok(data.add_employee)
    }

    async fn update_employee(
        &self,
        token: &str,
        id: &EmployeeId,
        input: &EmployeeUpdateInput,
    ) -> Result<Employee, ClientError> {
        let data: UpdateEmployeeData = self
            .execute(
                Some(token),
                "UpdateEmployee",
                &update_employee_mutation(),
                json!({ "id": id, "input": input }),
            )
            .await?;
        Ok(data.update_employee)
    }

    async fn delete_employee(&self, token: &str, id: &EmployeeId) -> Result<bool, ClientError> {
        let data: DeleteEmployeeData = self
            .execute(
                Some(token),
                "DeleteEmployee",
                DELETE_EMPLOYEE_MUTATION,
                json!({ "id": id }),
            )
            .await?;
        Ok(data.delete_employee)
    }
}

/// A `false` delete result means the server kept the record.
pub(crate) fn delete_not_applied(id: &EmployeeId) -> ClientError {
    ApiException::new(ErrorCode::NotFound, format!("employee {id} was not deleted")).into()
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
