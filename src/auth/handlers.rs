use axum::{
    extract::{FromRef, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, SignupRequest, SignupResponse},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::User,
    },
    error::ApiError,
    mail::{MailError, Outbound},
    notice::Notice,
    state::AppState,
};

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/accounts/signup", post(signup))
        .route("/accounts/login", post(login))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn validate_signup(payload: &SignupRequest) -> Result<(), ApiError> {
    if payload.username.trim().is_empty() {
        return Err(ApiError::validation("username", "Username is required"));
    }
    if !is_valid_email(&payload.email) {
        return Err(ApiError::validation("email", "Enter a valid email address"));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::validation("password", "Password too short"));
    }
    if payload.password != payload.password_confirm {
        return Err(ApiError::validation(
            "password_confirm",
            "Passwords do not match",
        ));
    }
    Ok(())
}

fn welcome_body(username: &str) -> String {
    format!(
        "Hello {username},\n\n\
         Welcome to eshop!\n\n\
         Your registration was successful. You can now log in and start shopping products.\n\n\
         Thanks,\n\
         eshop Team"
    )
}

/// A failed welcome email never blocks signup.
fn signup_notice(outcome: Result<(), MailError>) -> Notice {
    match outcome {
        Ok(()) => Notice::success("Welcome! Your account was created."),
        Err(MailError::BadHeader(_)) => Notice::error("Invalid header in welcome email."),
        Err(e @ MailError::Transport(_)) => {
            Notice::warning(format!("Signed up, but welcome email failed: {e}"))
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(mut payload): Json<SignupRequest>,
) -> Result<(StatusCode, HeaderMap, Json<SignupResponse>), ApiError> {
    payload.username = payload.username.trim().to_string();
    payload.email = payload.email.trim().to_lowercase();

    validate_signup(&payload)?;

    if User::find_by_username(&state.db, &payload.username)
        .await?
        .is_some()
    {
        warn!(username = %payload.username, "username already taken");
        return Err(ApiError::Conflict("Username already taken".into()));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, &payload.username, &payload.email, &hash).await?;

    // Establish a logged-in session right away.
    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id)?;

    let outcome = state
        .mailer
        .send(Outbound {
            subject: "Registration Successful - eshop".into(),
            body: welcome_body(&user.username),
            to: vec![user.email.clone()],
        })
        .await;
    if let Err(e) = &outcome {
        warn!(user_id = %user.id, error = %e, "welcome email failed");
    }

    info!(user_id = %user.id, username = %user.username, "user registered");

    let mut headers = HeaderMap::new();
    headers.insert(axum::http::header::LOCATION, "/".parse().unwrap());

    Ok((
        StatusCode::CREATED,
        headers,
        Json(SignupResponse {
            access_token,
            refresh_token,
            user: PublicUser {
                id: user.id,
                username: user.username,
                email: user.email,
            },
            notice: signup_notice(outcome),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.username = payload.username.trim().to_string();

    let user = User::find_by_username(&state.db, &payload.username)
        .await?
        .ok_or_else(|| {
            warn!(username = %payload.username, "login unknown username");
            ApiError::Unauthorized("Invalid credentials".into())
        })?;

    let ok = verify_password(&payload.password, &user.password_hash)?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id)?;

    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser {
            id: user.id,
            username: user.username,
            email: user.email,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::NoticeLevel;

    fn signup_payload() -> SignupRequest {
        SignupRequest {
            username: "alice".into(),
            email: "alice@shop.test".into(),
            password: "long-enough-pw".into(),
            password_confirm: "long-enough-pw".into(),
        }
    }

    #[test]
    fn valid_signup_passes() {
        assert!(validate_signup(&signup_payload()).is_ok());
    }

    #[test]
    fn empty_username_is_rejected() {
        let mut p = signup_payload();
        p.username = "  ".into();
        let err = validate_signup(&p).unwrap_err();
        assert!(matches!(err, ApiError::Validation { field: "username", .. }));
    }

    #[test]
    fn invalid_email_is_rejected() {
        let mut p = signup_payload();
        p.email = "not-an-email".into();
        let err = validate_signup(&p).unwrap_err();
        assert!(matches!(err, ApiError::Validation { field: "email", .. }));
    }

    #[test]
    fn short_password_is_rejected() {
        let mut p = signup_payload();
        p.password = "short".into();
        p.password_confirm = "short".into();
        let err = validate_signup(&p).unwrap_err();
        assert!(matches!(err, ApiError::Validation { field: "password", .. }));
    }

    #[test]
    fn mismatched_passwords_are_rejected() {
        let mut p = signup_payload();
        p.password_confirm = "something-else!".into();
        let err = validate_signup(&p).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation {
                field: "password_confirm",
                ..
            }
        ));
    }

    #[test]
    fn email_regex_accepts_plain_addresses() {
        assert!(is_valid_email("alice@shop.test"));
        assert!(!is_valid_email("alice@shop"));
        assert!(!is_valid_email("alice at shop.test"));
    }

    #[test]
    fn welcome_body_greets_by_username() {
        let body = welcome_body("alice");
        assert!(body.starts_with("Hello alice,"));
        assert!(body.contains("registration was successful"));
    }

    #[test]
    fn transport_failure_downgrades_to_warning() {
        let notice = signup_notice(Err(MailError::Transport("connection refused".into())));
        assert_eq!(notice.level, NoticeLevel::Warning);
        assert!(notice.message.contains("welcome email failed"));
    }

    #[test]
    fn bad_header_surfaces_as_error() {
        let notice = signup_notice(Err(MailError::BadHeader("bad from".into())));
        assert_eq!(notice.level, NoticeLevel::Error);
    }

    #[test]
    fn successful_send_is_a_success_notice() {
        let notice = signup_notice(Ok(()));
        assert_eq!(notice.level, NoticeLevel::Success);
    }
}
