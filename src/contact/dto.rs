use serde::{Deserialize, Serialize};

use crate::notice::Notice;

/// Contact form body. `reply_to` is optional and falls back to the
/// requester's account email.
#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    pub subject: String,
    pub message: String,
    pub reply_to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub notice: Notice,
}
