//! Opaque visitor tokens. The client keeps the token, the store keeps only
//! its SHA-256 hash together with the ranking state.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header, request::Parts, HeaderMap};
use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::constants::{SESSION_COOKIE_NAME, SESSION_HEADER_NAME, SESSION_TOKEN_BYTES};
use crate::ranking::types::SessionState;
use crate::response::AppError;
use crate::state::AppState;
use crate::store::operations::visitor_sessions::VisitorSession;
use crate::store::{Store, StoreError};

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn generate_token() -> String {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Creates a session for a freshly registered participant and returns the
/// token to hand to the client.
pub fn start_session(
    store: &Store,
    state: SessionState,
    ttl_minutes: i64,
) -> Result<String, StoreError> {
    let token = generate_token();
    let now = Utc::now();
    store.create_visitor_session(&VisitorSession {
        token_hash: hash_token(&token),
        state,
        created_at: now,
        expires_at: now + Duration::minutes(ttl_minutes),
    })?;
    Ok(token)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

fn header_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER_NAME)
        .and_then(|v| v.to_str().ok())
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    let prefix = format!("{SESSION_COOKIE_NAME}=");
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|cookie| cookie.split(';'))
        .find_map(|part| part.trim().strip_prefix(prefix.as_str()).map(str::to_string))
        .filter(|token| !token.is_empty())
}

pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers)
        .or_else(|| header_token(headers))
        .or_else(|| cookie_token(headers))
}

/// The calling participant, resolved from the visitor token.
#[derive(Debug, Clone)]
pub struct Visitor {
    pub token_hash: String,
    pub session: VisitorSession,
}

impl Visitor {
    pub fn state(&self) -> &SessionState {
        &self.session.state
    }

    pub fn participant_id(&self) -> u64 {
        self.session.state.participant_id
    }

    pub fn save_state(&self, store: &Store, state: &SessionState) -> Result<(), StoreError> {
        if state == &self.session.state {
            return Ok(());
        }
        store.update_visitor_session_state(&self.token_hash, state)
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Visitor
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let token = extract_token(&parts.headers)
            .ok_or_else(|| AppError::unauthorized("Register before continuing"))?;

        let token_hash = hash_token(&token);
        let session = app_state
            .store()
            .get_visitor_session(&token_hash)?
            .ok_or_else(|| AppError::unauthorized("Session not found or expired"))?;

        Ok(Visitor {
            token_hash,
            session,
        })
    }
}
