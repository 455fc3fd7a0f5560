//! In-process login sessions
//!
//! A successful login stores a random token; the browser carries it back in
//! the `cinelog_session` cookie. Sessions expire after the configured
//! timeout and vanish on restart.

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "cinelog_session";

/// The logged-in account, attached to requests on protected routes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: i64,
    pub username: String,
    pub token: Uuid,
}

#[derive(Debug, Clone)]
struct Session {
    user_id: i64,
    username: String,
    expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
    timeout: Duration,
}

impl SessionStore {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            timeout: Duration::seconds(timeout_secs.min(u64::from(u32::MAX)) as i64),
        }
    }

    /// Open a session and return its token
    pub async fn create(&self, user_id: i64, username: &str) -> Uuid {
        let token = Uuid::new_v4();
        let session = Session {
            user_id,
            username: username.to_string(),
            expires_at: Utc::now() + self.timeout,
        };
        self.sessions.write().await.insert(token, session);
        token
    }

    /// Look up a live session; an expired one is dropped
    pub async fn get(&self, token: Uuid) -> Option<CurrentUser> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(&token) {
                Some(s) if s.expires_at > now => {
                    return Some(CurrentUser {
                        user_id: s.user_id,
                        username: s.username.clone(),
                        token,
                    })
                }
                Some(_) => {}
                None => return None,
            }
        }
        self.sessions.write().await.remove(&token);
        None
    }

    pub async fn remove(&self, token: Uuid) -> bool {
        self.sessions.write().await.remove(&token).is_some()
    }

    /// Drop every expired session, returning how many went
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Session token from the request's `Cookie` headers
pub fn token_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

/// `Set-Cookie` value carrying a fresh token
pub fn session_cookie(token: Uuid) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/",
        SESSION_COOKIE,
        token.simple()
    )
}

/// `Set-Cookie` value that makes the browser forget the token
pub fn clear_cookie() -> String {
    format!(
        "{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0",
        SESSION_COOKIE
    )
}
