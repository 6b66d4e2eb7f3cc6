//! JSON page payloads returned to the browser.
//!
//! Each page names the template it belongs to and always carries the
//! navigation menu (`tab_menu`), which is `null` when the server list could
//! not be fetched.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use barman_core::CoreError;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// A rendered page.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    /// Template name.
    pub page: &'static str,

    /// Tool output for the page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab: Option<Arc<Value>>,

    /// Navigation menu.
    pub tab_menu: Option<Arc<Value>>,

    /// Server the page acts on (delete, pre-launch, launch).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    /// Today's date as `YYYYMMDD` (backup list).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datejour: Option<String>,
}

impl Page {
    pub fn new(page: &'static str, tab_menu: Option<Arc<Value>>) -> Self {
        Self {
            page,
            tab: None,
            tab_menu,
            server: None,
            datejour: None,
        }
    }

    pub fn tab(mut self, tab: Arc<Value>) -> Self {
        self.tab = Some(tab);
        self
    }

    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    pub fn datejour(mut self, date: chrono::NaiveDate) -> Self {
        self.datejour = Some(date.format("%Y%m%d").to_string());
        self
    }
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[derive(Debug, Serialize)]
struct FailureBody<'a> {
    page: &'static str,
    error: &'static str,
    message: String,
    tab_menu: &'a Option<Arc<Value>>,
}

/// Failure page for a command that could not be run or parsed.
#[derive(Debug)]
pub struct FailurePage {
    pub error: CoreError,
    pub tab_menu: Option<Arc<Value>>,
}

impl FailurePage {
    pub fn new(error: CoreError, tab_menu: Option<Arc<Value>>) -> Self {
        Self { error, tab_menu }
    }

    /// HTTP status for the error kind.
    pub fn status(&self) -> StatusCode {
        match self.error {
            CoreError::Execution { .. } | CoreError::Parse { .. } => StatusCode::BAD_GATEWAY,
            CoreError::Arity { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            CoreError::InvalidIdentifier { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for FailurePage {
    fn into_response(self) -> Response {
        let body = FailureBody {
            page: "error",
            error: self.error.kind(),
            message: self.error.to_string(),
            tab_menu: &self.tab_menu,
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Rejection from the login/role gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No or wrong credentials.
    Unauthenticated,
    /// Logged in without the required role.
    Forbidden,
}

impl IntoResponse for AuthFailure {
    fn into_response(self) -> Response {
        match self {
            AuthFailure::Unauthenticated => {
                let mut response = (
                    StatusCode::UNAUTHORIZED,
                    Json(serde_json::json!({"page": "login", "error": "unauthenticated"})),
                )
                    .into_response();
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static(r#"Basic realm="barman-web""#),
                );
                response
            }
            AuthFailure::Forbidden => (
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({"page": "forbidden", "error": "forbidden"})),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_serialization_skips_absent_fields() {
        let page = Page::new("pre_launch_backup", None).server("main");
        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(
            value,
            json!({"page": "pre_launch_backup", "tab_menu": null, "server": "main"})
        );
    }

    #[test]
    fn test_page_datejour_format() {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let page = Page::new("list_backup", None).datejour(date);
        assert_eq!(page.datejour.as_deref(), Some("20240105"));
    }

    #[test]
    fn test_failure_status() {
        let exec = FailurePage::new(
            CoreError::Execution {
                program: "barman".into(),
                reason: "not found".into(),
            },
            None,
        );
        assert_eq!(exec.status(), StatusCode::BAD_GATEWAY);

        let arity = FailurePage::new(
            CoreError::Arity {
                operation: barman_core::Operation::Status,
                expected: 1,
                actual: 0,
            },
            None,
        );
        assert_eq!(arity.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let flag = FailurePage::new(
            CoreError::InvalidIdentifier {
                operation: barman_core::Operation::Status,
                identifier: "--help".into(),
            },
            None,
        );
        assert_eq!(flag.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_unauthenticated_challenges() {
        let response = AuthFailure::Unauthenticated.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }
}
