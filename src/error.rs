//! Error taxonomy shared by the dispatcher and handlers, and its
//! translation into the uniform wire-level failure contract: a recoverable
//! `fail` (connection stays open) or an unrecoverable `fatal` (connection
//! closes after delivery).

use crate::db::DbError;
use crate::metrics;
use crate::perm::PermError;
use thiserror::Error;

/// What a handler invocation can go wrong with, independent of the verb.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("already logged in")]
    AlreadyLoggedIn,
    #[error("not logged in")]
    NotLoggedIn,
    #[error("no permissions")]
    NoPermission,
    #[error("no such {entity}: {name}")]
    NotFound { entity: &'static str, name: String },
    #[error("{0} already exists")]
    Conflict(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("you are banned")]
    Banned,
    #[error("not subscribed to that channel")]
    NotSubscribed,
    #[error("cannot target yourself")]
    SelfTarget,
    #[error("malformed request: {0}")]
    BadRequest(String),
    #[error("sorry, an internal database error has occurred")]
    Store(#[from] DbError),
}

/// Severity a `HandlerError` is reported with, per the dispatcher's
/// uniform failure contract: most errors are recoverable `fail`s, but a
/// handful (auth failures, store errors during register/login) close the
/// connection.
pub enum Severity {
    Fail,
    Fatal,
}

impl HandlerError {
    /// The message text placed in the `fail`/`fatal` envelope's `message` field.
    pub fn wire_message(&self) -> String {
        self.to_string()
    }

    /// Whether this error, for the given verb, should be reported as `fail`
    /// (connection survives) or `fatal` (connection closes). Store errors
    /// are `fatal` only during `register`/`login`; everywhere else they are
    /// `fail`, matching every other recoverable error.
    pub fn severity(&self, verb: &str) -> Severity {
        match self {
            HandlerError::Store(_) if matches!(verb, "register" | "login") => Severity::Fatal,
            HandlerError::InvalidCredentials | HandlerError::Banned => Severity::Fatal,
            _ => Severity::Fail,
        }
    }

    /// Maps a store lookup failure onto the handler-level NotFound variant,
    /// preserving entity/name for the wire message.
    pub fn from_store(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, name } => {
                metrics::record_store_error(entity);
                HandlerError::NotFound { entity, name }
            }
            DbError::Conflict { entity, name } => {
                metrics::record_store_error(entity);
                HandlerError::Conflict(format!("{entity} {name}"))
            }
            other => {
                metrics::record_store_error("unknown");
                HandlerError::Store(other)
            }
        }
    }

    pub fn from_perm(err: PermError) -> Self {
        match err {
            PermError::NotFound { entity, name } => HandlerError::NotFound { entity, name },
            PermError::Store(e) => HandlerError::from_store(e),
        }
    }
}
