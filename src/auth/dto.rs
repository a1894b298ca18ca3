use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::notice::Notice;

/// Request body for signup: username, email, and the password pair.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

/// Response returned after login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

/// Response returned after signup: a logged-in session plus the
/// welcome-mail notice.
#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
    pub notice: Notice,
}
