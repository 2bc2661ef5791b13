//! Invocation responses returned to the triggering platform.

use serde::{Deserialize, Serialize};

/// Status code for a completed invocation.
pub const STATUS_OK: u16 = 200;
/// Status code for a run that found nothing to do.
pub const STATUS_NO_CONTENT: u16 = 204;

/// `{"statusCode": .., "body": ..}` as function-style invocations report it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub status_code: u16,
    pub body: String,
}

impl InvocationResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status_code: STATUS_OK,
            body: body.into(),
        }
    }

    pub fn no_content(body: impl Into<String>) -> Self {
        Self {
            status_code: STATUS_NO_CONTENT,
            body: body.into(),
        }
    }
}
