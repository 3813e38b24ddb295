use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use locker_core::{Identity, UserStatus};
use locker_db::repo::{SessionRepo, UserRepo};

use crate::app::AppState;
use crate::domains::auth::tokens::hash_token;

pub async fn auth_middleware(
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let state = request
        .extensions()
        .get::<AppState>()
        .cloned()
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;
    let token = request
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let identity = match identity_from_session_token(&state, token).await {
        Ok(identity) => identity,
        Err("db_error") => return Err(StatusCode::INTERNAL_SERVER_ERROR),
        Err(reason) => {
            tracing::warn!(event = "auth_failed", reason, "Session token rejected");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    tracing::Span::current().record("user_id", identity.user_id.to_string());
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

pub async fn identity_from_session_token(
    state: &AppState,
    token: &str,
) -> Result<Identity, &'static str> {
    let token_hash = hash_token(token, &state.token_pepper);
    let session = SessionRepo::new(&state.db)
        .get_by_access_token(&token_hash)
        .await
        .map_err(|err| {
            tracing::error!(
                event = "auth_session_lookup_failed",
                error = %err,
                "Failed to load session by access token"
            );
            "db_error"
        })?
        .ok_or("invalid_token")?;
    if session.access_expires_at < Utc::now() {
        return Err("token_expired");
    }
    let user = UserRepo::new(&state.db)
        .get_by_id(session.user_id)
        .await
        .map_err(|err| {
            tracing::error!(
                event = "auth_user_lookup_failed",
                error = %err,
                "Failed to load user"
            );
            "db_error"
        })?
        .ok_or("user_not_found")?;
    if user.status != UserStatus::Active {
        return Err("user_disabled");
    }
    Ok(Identity {
        user_id: user.id,
        email: user.email,
        session_id: session.id,
    })
}
