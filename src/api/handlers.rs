// src/api/handlers.rs

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::api::{types::*, ApiState};
use crate::core::session::StatusView;
use crate::infra::errors::PurgeError;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn reject(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| reject(StatusCode::BAD_REQUEST, format!("Missing required parameter: {name}")))
}

/// JSON body into `T`; an empty body means all fields absent. Content type is
/// not checked.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| reject(StatusCode::BAD_REQUEST, format!("Invalid request body: {e}")))
}

/// Map a domain error onto an HTTP status.
pub fn error_response(err: PurgeError) -> ApiError {
    let status = match &err {
        PurgeError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        PurgeError::InvalidCallback(_) => StatusCode::BAD_REQUEST,
        PurgeError::TokenMismatch { .. } => StatusCode::FORBIDDEN,
        PurgeError::UpstreamAuth(_) | PurgeError::ItemOperation { .. } => StatusCode::BAD_GATEWAY,
        // Wrong phase for the request
        _ if err.is_precondition() => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    }
    reject(status, err.to_string())
}

/// POST /api/v1/auth — Begin authorization; returns where to send the user.
pub async fn begin_auth(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Json<AuthResponse>, ApiError> {
    let req: AuthRequest = parse_body(&body)?;

    let begun = state
        .service
        .begin_authorization(req.callback_url.as_deref())
        .await
        .map_err(error_response)?;

    Ok(Json(AuthResponse {
        auth_url: begun.authorize_url,
        session_id: begun.session_id,
    }))
}

/// POST /api/v1/callback — Complete the handshake for a pending session.
pub async fn complete_auth(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Json<CallbackResponse>, ApiError> {
    let body: CallbackRequest = parse_body(&body)?;
    let token = required(body.oauth_token, "oauthToken")?;
    let verifier = required(body.oauth_verifier, "oauthVerifier")?;
    let session_id = required(body.session_id, "sessionId")?;

    let user = state
        .service
        .complete_authorization(&session_id, &token, &verifier)
        .await
        .map_err(error_response)?;

    Ok(Json(CallbackResponse {
        success: true,
        user,
    }))
}

/// POST /api/v1/process — Start deleting in the background.
pub async fn start_processing(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<(StatusCode, Json<ProcessResponse>), ApiError> {
    let body: ProcessRequest = parse_body(&body)?;
    let session_id = required(body.session_id, "sessionId")?;

    state
        .service
        .start_processing(&session_id)
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ProcessResponse {
            success: true,
            message: "Processing started".into(),
        }),
    ))
}

/// GET /api/v1/status?sessionId= — Progress projection for polling.
pub async fn get_status(
    State(state): State<ApiState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<StatusView>, ApiError> {
    let session_id = required(query.session_id, "sessionId")?;
    let view = state
        .service
        .status(&session_id)
        .await
        .map_err(error_response)?;
    Ok(Json(view))
}

/// GET /api/v1/health
pub async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        active_runs: state.runner.active(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::SessionStatus;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (PurgeError::SessionNotFound("s".into()), StatusCode::NOT_FOUND),
            (
                PurgeError::TokenMismatch {
                    session_id: "s".into(),
                },
                StatusCode::FORBIDDEN,
            ),
            (
                PurgeError::InvalidState {
                    session_id: "s".into(),
                    expected: SessionStatus::Authenticated,
                    actual: SessionStatus::Pending,
                },
                StatusCode::CONFLICT,
            ),
            (
                PurgeError::IllegalTransition {
                    session_id: "s".into(),
                    from: SessionStatus::Completed,
                    to: SessionStatus::Processing,
                },
                StatusCode::CONFLICT,
            ),
            (PurgeError::UpstreamAuth("x".into()), StatusCode::BAD_GATEWAY),
            (
                PurgeError::RunSuperseded("s".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                PurgeError::InvalidCallback("x".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                PurgeError::Config("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(error_response(err).0, expected);
        }
    }

    #[test]
    fn test_parse_body_empty_and_malformed() {
        let empty: ProcessRequest = parse_body(&Bytes::from_static(b"  ")).unwrap();
        assert!(empty.session_id.is_none());

        let (status, Json(body)) = parse_body::<ProcessRequest>(&Bytes::from_static(b"not json"))
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.error.starts_with("Invalid request body"));
    }

    #[test]
    fn test_required_rejects_blank() {
        assert!(required(Some("  ".into()), "sessionId").is_err());
        assert!(required(None, "sessionId").is_err());
        assert_eq!(required(Some("abc".into()), "sessionId").unwrap(), "abc");
    }
}
