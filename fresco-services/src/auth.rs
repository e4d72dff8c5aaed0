//! Session resolution and invalidation.
//!
//! Request-scoped operations receive a `RequestContext` carrying the
//! resolved session, if any. Services decide for themselves whether a
//! session is required.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use fresco_core::constants::SESSION_TTL_DAYS;
use fresco_core::error::{FrescoError, FrescoResult};
use fresco_models::{Database, User, UserSession};

use crate::event_bus::{AppEvent, EventBus};

/// An authenticated login session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

impl From<UserSession> for Session {
    fn from(s: UserSession) -> Self {
        Self {
            id: s.id,
            user_id: s.user_id,
            username: s.username,
            expires_at: s.expires_at,
        }
    }
}

/// What a request brings with it.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub session: Option<Session>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self { session: None }
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: Some(session),
        }
    }

    /// The attached session, or `Unauthorized` when there is none.
    pub fn require_session(&self, action: &str) -> FrescoResult<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| FrescoError::Unauthorized(format!("login required to {action}")))
    }
}

/// Resolves and invalidates sessions.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolve a session token. Unknown or expired tokens resolve to `None`.
    async fn get_server_session(&self, token: &str) -> FrescoResult<Option<Session>>;

    /// Invalidate a session.
    async fn sign_out(&self, session: &Session) -> FrescoResult<()>;

    /// Build a request context from an optional token.
    async fn request_context(&self, token: Option<&str>) -> FrescoResult<RequestContext> {
        match token {
            Some(t) => Ok(RequestContext {
                session: self.get_server_session(t).await?,
            }),
            None => Ok(RequestContext::anonymous()),
        }
    }
}

/// Sessions stored in the `user_sessions` table.
#[derive(Clone)]
pub struct DatabaseAuthProvider {
    database: Database,
    event_bus: EventBus,
}

impl DatabaseAuthProvider {
    pub fn new(database: Database, event_bus: EventBus) -> Self {
        Self {
            database,
            event_bus,
        }
    }

    /// Create a user and issue a session for it.
    pub fn sign_up(&self, username: &str) -> FrescoResult<Session> {
        let session = self.database.transaction(|conn| {
            let user = User::insert(conn, username)?;
            let expires_at = Utc::now() + Duration::days(SESSION_TTL_DAYS);
            UserSession::insert(conn, &user, expires_at)
        })?;
        info!("signed up {username}");
        Ok(session.into())
    }
}

#[async_trait]
impl AuthProvider for DatabaseAuthProvider {
    async fn get_server_session(&self, token: &str) -> FrescoResult<Option<Session>> {
        let conn = self.database.conn()?;
        let found = UserSession::find_valid(&conn, token, Utc::now())?;
        if found.is_none() {
            debug!("no live session for presented token");
        }
        Ok(found.map(Session::from))
    }

    async fn sign_out(&self, session: &Session) -> FrescoResult<()> {
        let conn = self.database.conn()?;
        if UserSession::delete(&conn, &session.id)? {
            info!("signed out {}", session.username);
        }
        self.event_bus.emit(AppEvent::SessionSignedOut {
            session_id: session.id.clone(),
        });
        Ok(())
    }
}
