pub mod admin;
pub mod orders;

use serde::Serialize;

/// Bare acknowledgement body (`{"success":true}`).
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}
