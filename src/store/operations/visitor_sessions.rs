use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ranking::types::SessionState;
use crate::store::keys;
use crate::store::{Store, StoreError};

/// Server-side state of one participant's browser session. Only the hash of
/// the visitor token is stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VisitorSession {
    pub token_hash: String,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl VisitorSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl Store {
    pub fn create_visitor_session(&self, session: &VisitorSession) -> Result<(), StoreError> {
        let key = keys::visitor_session_key(&session.token_hash);
        let cas_result = self.visitor_sessions.compare_and_swap(
            key.as_bytes(),
            None::<&[u8]>,
            Some(Self::serialize(session)?),
        )?;
        if cas_result.is_err() {
            return Err(StoreError::Conflict {
                entity: "visitor_session".to_string(),
                key,
            });
        }
        Ok(())
    }

    /// Returns the session unless it is missing or expired. Expired rows are
    /// left for `purge_expired_visitor_sessions`.
    pub fn get_visitor_session(
        &self,
        token_hash: &str,
    ) -> Result<Option<VisitorSession>, StoreError> {
        let key = keys::visitor_session_key(token_hash);
        let Some(raw) = self.visitor_sessions.get(key.as_bytes())? else {
            return Ok(None);
        };
        let session = Self::deserialize::<VisitorSession>(&raw)?;
        if session.is_expired(Utc::now()) {
            return Ok(None);
        }
        Ok(Some(session))
    }

    /// Replaces the ranking state of an existing session.
    pub fn update_visitor_session_state(
        &self,
        token_hash: &str,
        state: &SessionState,
    ) -> Result<(), StoreError> {
        let key = keys::visitor_session_key(token_hash);
        let Some(raw) = self.visitor_sessions.get(key.as_bytes())? else {
            return Err(StoreError::NotFound {
                entity: "visitor_session".to_string(),
                key,
            });
        };
        let mut session = Self::deserialize::<VisitorSession>(&raw)?;
        session.state = state.clone();
        self.visitor_sessions
            .insert(key.as_bytes(), Self::serialize(&session)?)?;
        Ok(())
    }

    pub fn delete_visitor_session(&self, token_hash: &str) -> Result<(), StoreError> {
        let key = keys::visitor_session_key(token_hash);
        self.visitor_sessions.remove(key.as_bytes())?;
        Ok(())
    }

    pub fn purge_expired_visitor_sessions(&self) -> Result<usize, StoreError> {
        let now = Utc::now();
        let mut expired = Vec::new();
        for entry in self.visitor_sessions.iter() {
            let (key, value) = entry?;
            match Self::deserialize::<VisitorSession>(&value) {
                Ok(session) if session.is_expired(now) => expired.push(key),
                Ok(_) => {}
                Err(error) => {
                    tracing::warn!(error = %error, "Dropping unreadable visitor session");
                    expired.push(key);
                }
            }
        }
        for key in &expired {
            self.visitor_sessions.remove(key)?;
        }
        Ok(expired.len())
    }
}
