use rmcp::model::{CallToolResult, Content};
use rmcp::ErrorData as McpError;
use serde::Serialize;
use wikise_core::{Error as WikiseError, ResultSection};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    InvalidParams,
    Internal,
}

impl ErrorCode {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::InvalidParams => "invalid_params",
            Self::Internal => "internal",
        }
    }

    pub(crate) fn of(e: &WikiseError) -> Self {
        match e {
            WikiseError::InvalidArgument(_) => Self::InvalidParams,
            _ => Self::Internal,
        }
    }
}

pub(crate) fn error_obj(code: ErrorCode, message: impl ToString) -> serde_json::Value {
    #[derive(Serialize)]
    struct ErrorObject {
        code: &'static str,
        message: String,
    }

    let message = message.to_string();
    match serde_json::to_value(ErrorObject {
        code: code.as_str(),
        message: message.clone(),
    }) {
        Ok(v) => v,
        Err(_) => serde_json::json!({ "code": code.as_str(), "message": message }),
    }
}

/// Map a resolver error onto the MCP error channel. Only caller mistakes reach here;
/// lookup failures are already sections.
pub(crate) fn mcp_error(e: WikiseError) -> McpError {
    let code = ErrorCode::of(&e);
    let data = Some(error_obj(code, &e));
    match code {
        ErrorCode::InvalidParams => McpError::invalid_params(e.to_string(), data),
        ErrorCode::Internal => McpError::internal_error(e.to_string(), data),
    }
}

/// Server setup or transport failure outside any tool call.
pub(crate) fn internal_error(message: impl ToString) -> McpError {
    let message = message.to_string();
    let data = Some(error_obj(ErrorCode::Internal, &message));
    McpError::internal_error(message, data)
}

/// One text block per section, in order.
pub(crate) fn tool_result(sections: &[ResultSection]) -> CallToolResult {
    CallToolResult::success(
        sections
            .iter()
            .map(|s| Content::text(s.to_string()))
            .collect(),
    )
}
