//! Request/response contract of the mutation endpoint.
//!
//! Every call is a `POST /rpc` whose body is a [`MutationRequest`]. A
//! successful call answers with the affected [`Todo`]; a failed one with an
//! [`ApiError`] and a status derived from its [`ErrorCode`].

use serde::{Deserialize, Serialize};

use crate::{
    domain::{Todo, TodoId},
    error::{ApiError, ErrorCode},
};

pub const RPC_ROUTE: &str = "/rpc";
pub const TODOS_ROUTE: &str = "/todos";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum MutationRequest {
    CreateTodo {
        title: String,
    },
    SetCompleted {
        id: TodoId,
        completed: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<u64>,
    },
}

impl MutationRequest {
    pub fn method(&self) -> &'static str {
        match self {
            Self::CreateTodo { .. } => "create_todo",
            Self::SetCompleted { .. } => "set_completed",
        }
    }
}

pub type MutationResponse = Todo;

/// Trims `raw` and rejects titles that are empty afterwards. Any other
/// text, however long, is accepted as typed.
pub fn validate_title(raw: &str) -> Result<String, ApiError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(ApiError::new(ErrorCode::Validation, "title cannot be empty"));
    }
    Ok(title.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_completed_request_uses_method_and_params_envelope() {
        let id = TodoId::new();
        let request = MutationRequest::SetCompleted {
            id,
            completed: true,
            version: Some(3),
        };
        let json = serde_json::to_value(&request).expect("json");
        assert_eq!(json["method"], "set_completed");
        assert_eq!(json["params"]["id"], id.to_string());
        assert_eq!(json["params"]["completed"], true);
        assert_eq!(json["params"]["version"], 3);
    }

    #[test]
    fn version_is_optional_on_the_wire() {
        let id = TodoId::new();
        let raw = format!(
            r#"{{"method":"set_completed","params":{{"id":"{id}","completed":false}}}}"#
        );
        let request: MutationRequest = serde_json::from_str(&raw).expect("decode");
        assert_eq!(
            request,
            MutationRequest::SetCompleted {
                id,
                completed: false,
                version: None,
            }
        );
    }

    #[test]
    fn rejects_only_blank_titles() {
        assert_eq!(validate_title("  Buy milk \n").expect("valid"), "Buy milk");
        assert_eq!(
            validate_title("   ").expect_err("blank").code,
            ErrorCode::Validation
        );
        let long = "x".repeat(5_000);
        assert_eq!(validate_title(&long).expect("long"), long);
        assert_eq!(
            validate_title("<b>Milk & eggs</b> 🥛").expect("markup"),
            "<b>Milk & eggs</b> 🥛"
        );
    }

    #[test]
    fn conflict_errors_carry_the_stored_record() {
        let todo = Todo {
            id: TodoId::new(),
            title: "Buy milk".to_string(),
            is_completed: true,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            version: 4,
        };
        let error = ApiError::conflict("version 2 is not newer than stored version 4", todo.clone());
        let json = serde_json::to_value(&error).expect("json");
        assert_eq!(json["code"], "conflict");
        assert_eq!(json["current"]["version"], 4);

        let decoded: ApiError = serde_json::from_value(json).expect("decode");
        assert_eq!(decoded.current.as_deref(), Some(&todo));

        let plain = serde_json::to_value(ApiError::new(ErrorCode::NotFound, "todo not found"))
            .expect("json");
        assert!(plain.get("current").is_none());
    }
}
