//! Login sessions.
//!
//! A [`Session`] is created by a successful login and looked up by its bearer token on each
//! request. It carries the user's role (for permission checks) and the session's own
//! [`PrivacyGate`], so unlocking stock detail in one session never affects another.
//!
//! Credentials are demo-grade: passwords are compared in plain text and tokens are random
//! UUIDs. This is not an authentication boundary.

use crate::access::{Capabilities, Permission, Role};
use crate::constants::SESSION_TTL_HOURS;
use crate::privacy::PrivacyGate;
use crate::{ColdChainError, ColdChainResult};
use chrono::{DateTime, Duration, Utc};
use hemolink_types::{EmailAddress, NonEmptyText};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// A user allowed to log in.
#[derive(Clone, Debug)]
pub struct UserAccount {
    profile: UserProfile,
    password: String,
}

impl UserAccount {
    pub fn new(
        id: impl Into<String>,
        email: EmailAddress,
        name: NonEmptyText,
        role: Role,
        password: impl Into<String>,
    ) -> Self {
        Self {
            profile: UserProfile {
                id: id.into(),
                email,
                name,
                role,
            },
            password: password.into(),
        }
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }
}

/// Public view of a user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub email: EmailAddress,
    pub name: NonEmptyText,
    pub role: Role,
}

#[derive(Clone, Debug)]
pub struct Session {
    token: String,
    user: UserProfile,
    privacy: PrivacyGate,
    expires_at: DateTime<Utc>,
}

impl Session {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user(&self) -> &UserProfile {
        &self.user
    }

    pub fn privacy(&self) -> &PrivacyGate {
        &self.privacy
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn permissions(&self) -> &'static [Permission] {
        self.user.role.permissions()
    }
}

impl Capabilities for Session {
    fn can(&self, permission: Permission) -> bool {
        self.user.role.can(permission)
    }
}

#[derive(Debug)]
pub struct SessionStore {
    accounts: Vec<UserAccount>,
    sessions: RwLock<HashMap<String, Session>>,
    privacy_key: Arc<str>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(accounts: Vec<UserAccount>, privacy_key: &str) -> Self {
        Self {
            accounts,
            sessions: RwLock::new(HashMap::new()),
            privacy_key: Arc::from(privacy_key),
            ttl: Duration::hours(SESSION_TTL_HOURS),
        }
    }

    /// Starts a session for matching credentials.
    ///
    /// # Errors
    ///
    /// Returns `ColdChainError::Unauthorised` for an unknown email or wrong password. Both cases
    /// produce the same error.
    pub fn login(&self, email: &str, password: &str, now: DateTime<Utc>) -> ColdChainResult<Session> {
        let email = EmailAddress::parse(email).map_err(|_| ColdChainError::Unauthorised)?;
        let account = self
            .accounts
            .iter()
            .find(|a| a.profile.email == email && a.password == password)
            .ok_or_else(|| {
                tracing::warn!(email = %email, "login rejected");
                ColdChainError::Unauthorised
            })?;

        let session = Session {
            token: Uuid::new_v4().simple().to_string(),
            user: account.profile.clone(),
            privacy: PrivacyGate::new(self.privacy_key.clone()),
            expires_at: now + self.ttl,
        };

        let mut sessions = self.write()?;
        sessions.retain(|_, s| !s.is_expired(now));
        sessions.insert(session.token.clone(), session.clone());
        tracing::info!(user_id = %session.user.id, role = %session.user.role, "session started");

        Ok(session)
    }

    /// Ends a session. Returns `false` if the token was not active.
    pub fn logout(&self, token: &str) -> ColdChainResult<bool> {
        Ok(self.write()?.remove(token).is_some())
    }

    /// Looks up an active session.
    ///
    /// # Errors
    ///
    /// Returns `ColdChainError::Unauthorised` if the token is unknown or expired. Expired
    /// sessions are dropped.
    pub fn session(&self, token: &str, now: DateTime<Utc>) -> ColdChainResult<Session> {
        let mut sessions = self.write()?;
        match sessions.get(token) {
            Some(s) if !s.is_expired(now) => Ok(s.clone()),
            Some(_) => {
                sessions.remove(token);
                Err(ColdChainError::Unauthorised)
            }
            None => Err(ColdChainError::Unauthorised),
        }
    }

    /// Tries `candidate` against the privacy key for this session only.
    pub fn unlock_privacy(
        &self,
        token: &str,
        candidate: &str,
        now: DateTime<Utc>,
    ) -> ColdChainResult<bool> {
        self.with_live_session(token, now, |session| session.privacy.unlock(candidate))
    }

    pub fn lock_privacy(&self, token: &str, now: DateTime<Utc>) -> ColdChainResult<()> {
        self.with_live_session(token, now, |session| session.privacy.lock())
    }

    fn with_live_session<T>(
        &self,
        token: &str,
        now: DateTime<Utc>,
        f: impl FnOnce(&mut Session) -> T,
    ) -> ColdChainResult<T> {
        let mut sessions = self.write()?;
        match sessions.get_mut(token) {
            Some(s) if !s.is_expired(now) => Ok(f(s)),
            _ => Err(ColdChainError::Unauthorised),
        }
    }

    fn write(&self) -> ColdChainResult<std::sync::RwLockWriteGuard<'_, HashMap<String, Session>>> {
        self.sessions
            .write()
            .map_err(|_| ColdChainError::StatePoisoned)
    }
}
