use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use catalog_logging::{catalog_info, catalog_warn};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::persist::{remove_if_exists, write_atomic, PersistError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
    /// Seconds since the epoch; absent for session cookies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEntry {
    pub name: String,
    pub value: String,
}

/// localStorage of one origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginStorage {
    pub origin: String,
    #[serde(default)]
    pub local_storage: Vec<StorageEntry>,
}

/// Authenticated browser state, captured after a successful login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub captured_utc: DateTime<Utc>,
    #[serde(default)]
    pub cookies: Vec<StoredCookie>,
    #[serde(default)]
    pub origins: Vec<OriginStorage>,
}

impl Session {
    pub fn new(cookies: Vec<StoredCookie>, origins: Vec<OriginStorage>) -> Self {
        Self {
            captured_utc: Utc::now(),
            cookies,
            origins,
        }
    }

    /// A session with neither cookies nor storage cannot authenticate anything.
    pub fn validate(&self) -> Result<(), SessionError> {
        let has_storage = self.origins.iter().any(|o| !o.local_storage.is_empty());
        if self.cookies.is_empty() && !has_storage {
            return Err(SessionError::Invalid("session holds no cookies or storage".into()));
        }
        if let Some(cookie) = self.cookies.iter().find(|c| c.name.is_empty()) {
            return Err(SessionError::Invalid(format!(
                "cookie for domain {} has no name",
                cookie.domain
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no stored session at {0}")]
    NotFound(PathBuf),
    #[error("stored session {path} unreadable: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("stored session {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("session is invalid: {0}")]
    Invalid(String),
    #[error("session could not be serialized: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Single-slot persistence for the authenticated session.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Session, SessionError>;
    /// Persist `session`. On failure no artifact is left behind.
    fn save(&self, session: &Session) -> Result<(), SessionError>;
    fn delete(&self) -> Result<(), SessionError>;
}

/// JSON session file, replaced atomically on save.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Session, SessionError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(SessionError::NotFound(self.path.clone()))
            }
            Err(source) => {
                return Err(SessionError::Unreadable {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let session: Session =
            serde_json::from_str(&content).map_err(|source| SessionError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        session.validate()?;
        Ok(session)
    }

    fn save(&self, session: &Session) -> Result<(), SessionError> {
        let result = session
            .validate()
            .and_then(|()| serde_json::to_string_pretty(session).map_err(SessionError::Serialize))
            .and_then(|json| write_atomic(&self.path, &json).map_err(SessionError::from));

        match result {
            Ok(()) => {
                catalog_info!("Session state saved to {}", self.path.display());
                Ok(())
            }
            Err(err) => {
                catalog_warn!("Failed to save session state: {err}");
                if let Err(cleanup) = remove_if_exists(&self.path) {
                    catalog_warn!("Could not remove session artifact: {cleanup}");
                }
                Err(err)
            }
        }
    }

    fn delete(&self) -> Result<(), SessionError> {
        remove_if_exists(&self.path)?;
        Ok(())
    }
}
