use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    auth::{handlers::is_valid_email, jwt::AuthUser, repo::User},
    error::ApiError,
    mail::{MailError, Outbound},
    notice::Notice,
    state::AppState,
};

use super::dto::{ContactRequest, ContactResponse};

const SUBJECT_MAX_LEN: usize = 120;

fn validate_contact(payload: &ContactRequest) -> Result<(), ApiError> {
    let subject = payload.subject.trim();
    if subject.is_empty() {
        return Err(ApiError::validation("subject", "Subject is required"));
    }
    if subject.chars().count() > SUBJECT_MAX_LEN {
        return Err(ApiError::validation("subject", "Subject is too long"));
    }
    if payload.message.trim().is_empty() {
        return Err(ApiError::validation("message", "Message is required"));
    }
    if let Some(reply_to) = payload.reply_to.as_deref() {
        if !reply_to.is_empty() && !is_valid_email(reply_to) {
            return Err(ApiError::validation(
                "reply_to",
                "Enter a valid email address",
            ));
        }
    }
    Ok(())
}

fn relay_subject(subject: &str) -> String {
    format!("[Customer Query] {subject}")
}

fn relay_body(username: &str, user_id: Uuid, reply_to: &str, message: &str) -> String {
    format!(
        "Customer: {username} (id: {user_id})\n\
         Reply-To: {reply_to}\n\n\
         {message}"
    )
}

/// Unlike order/signup mail, a failed relay is an error: the message did
/// not reach anyone and the user has to resubmit it themselves.
fn contact_failure_notice(e: &MailError) -> Notice {
    match e {
        MailError::BadHeader(_) => Notice::error("Invalid header found."),
        MailError::Transport(_) => Notice::error(format!("Could not send your message: {e}")),
    }
}

/// POST /contact — relay a customer message to the admin address(es).
#[instrument(skip(state, payload))]
pub async fn submit_contact(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ContactRequest>,
) -> Result<(StatusCode, HeaderMap, Json<ContactResponse>), ApiError> {
    validate_contact(&payload)?;

    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let reply_to = payload
        .reply_to
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| user.email.clone());

    let mail = Outbound {
        subject: relay_subject(payload.subject.trim()),
        body: relay_body(&user.username, user.id, &reply_to, payload.message.trim()),
        to: state.config.mail.admin_recipients.clone(),
    };

    match state.mailer.send(mail).await {
        Ok(()) => {
            info!(user_id = %user.id, "contact message relayed");
            let mut headers = HeaderMap::new();
            headers.insert(axum::http::header::LOCATION, "/".parse().unwrap());
            Ok((
                StatusCode::SEE_OTHER,
                headers,
                Json(ContactResponse {
                    notice: Notice::success("Your message has been sent to the admin."),
                }),
            ))
        }
        Err(e) => {
            error!(user_id = %user.id, error = %e, "contact relay failed");
            // no retry; the form is re-rendered with the error notice
            Ok((
                StatusCode::OK,
                HeaderMap::new(),
                Json(ContactResponse {
                    notice: contact_failure_notice(&e),
                }),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::NoticeLevel;

    fn contact_payload() -> ContactRequest {
        ContactRequest {
            subject: "Help".into(),
            message: "Where is my order?".into(),
            reply_to: None,
        }
    }

    #[test]
    fn valid_contact_passes() {
        assert!(validate_contact(&contact_payload()).is_ok());
    }

    #[test]
    fn empty_subject_is_rejected() {
        let mut p = contact_payload();
        p.subject = " ".into();
        let err = validate_contact(&p).unwrap_err();
        assert!(matches!(err, ApiError::Validation { field: "subject", .. }));
    }

    #[test]
    fn overlong_subject_is_rejected() {
        let mut p = contact_payload();
        p.subject = "x".repeat(121);
        let err = validate_contact(&p).unwrap_err();
        assert!(matches!(err, ApiError::Validation { field: "subject", .. }));
    }

    #[test]
    fn empty_message_is_rejected() {
        let mut p = contact_payload();
        p.message = String::new();
        let err = validate_contact(&p).unwrap_err();
        assert!(matches!(err, ApiError::Validation { field: "message", .. }));
    }

    #[test]
    fn bad_reply_to_is_rejected() {
        let mut p = contact_payload();
        p.reply_to = Some("not-an-email".into());
        let err = validate_contact(&p).unwrap_err();
        assert!(matches!(err, ApiError::Validation { field: "reply_to", .. }));
    }

    #[test]
    fn relay_embeds_requester_and_literal_message() {
        let user_id = Uuid::new_v4();
        let body = relay_body("alice", user_id, "alice@shop.test", "Where is my order?");
        assert!(body.contains("Customer: alice"));
        assert!(body.contains(&format!("(id: {user_id})")));
        assert!(body.contains("Reply-To: alice@shop.test"));
        assert!(body.ends_with("Where is my order?"));
    }

    #[test]
    fn relay_subject_is_prefixed() {
        assert_eq!(relay_subject("Help"), "[Customer Query] Help");
    }

    #[test]
    fn any_relay_failure_is_an_error_notice() {
        let transport = contact_failure_notice(&MailError::Transport("timeout".into()));
        assert_eq!(transport.level, NoticeLevel::Error);
        assert!(transport.message.contains("Could not send your message"));

        let header = contact_failure_notice(&MailError::BadHeader("bad".into()));
        assert_eq!(header.level, NoticeLevel::Error);
    }
}
