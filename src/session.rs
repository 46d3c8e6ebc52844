//! Session binding over an external session store.
//!
//! Two independent locks are involved and they are never held together:
//!
//! - the store lock, owned by the [`SessionStore`] implementation, serializes
//!   session creation and lookup;
//! - the per-session lock, embedded in every [`Session`], serializes
//!   read-modify-write sequences on that session's attributes.
//!
//! Sessions with different ids can therefore be updated concurrently while
//! the store itself is being modified.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::SessionError;
use crate::exchange::Exchange;
use crate::message::{names, Header, Message, Request};
use crate::params::ParameterSet;

const SESSION_ID_PREFIX: &str = "SESSIONID=";

/// Server-side state for one user, keyed by session id.
#[derive(Debug)]
pub struct Session {
    id: String,
    attributes: Mutex<HashMap<String, String>>,
}

impl Session {
    /// Creates a session without attributes.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the session id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Merges attributes into the session under the session lock.
    pub fn merge_attributes<I, K, V>(&self, attributes: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut current = self.attributes.lock();
        current.extend(
            attributes
                .into_iter()
                .map(|(k, v)| (k.into(), v.into())),
        );
    }

    /// Returns one attribute.
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.lock().get(name).cloned()
    }

    /// Returns a snapshot of all attributes.
    pub fn attributes(&self) -> HashMap<String, String> {
        self.attributes.lock().clone()
    }
}

/// Creates and finds sessions.
///
/// Implementations own the lock protecting their session table and hold it
/// for the duration of a single call only.
pub trait SessionStore: Send + Sync {
    /// Creates the session `session_id` for the exchange, or returns the
    /// existing one with that id.
    fn create(&self, exchange: &Exchange, session_id: &str) -> Arc<Session>;

    /// Finds the session a request belongs to.
    fn lookup(&self, request: &Request) -> Option<Arc<Session>>;
}

/// Process-local session table.
///
/// Sessions never expire; expiry belongs to persistent store implementations.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, Arc<Session>>>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of sessions.
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Returns true if the store holds no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Drops the session `session_id`, returning it if it existed.
    pub fn remove(&self, session_id: &str) -> Option<Arc<Session>> {
        self.sessions.lock().remove(session_id)
    }
}

impl SessionStore for InMemorySessionStore {
    fn create(&self, exchange: &Exchange, session_id: &str) -> Arc<Session> {
        let session = {
            let mut sessions = self.sessions.lock();
            Arc::clone(
                sessions
                    .entry(session_id.to_string())
                    .or_insert_with(|| Arc::new(Session::new(session_id))),
            )
        };
        exchange
            .log()
            .debug(format_args!("session {} bound", session_id));
        session
    }

    fn lookup(&self, request: &Request) -> Option<Arc<Session>> {
        let found = extract_session_header(request.header()).ok()?;
        let session_id = extract_session_id(found.value()).ok()?;
        self.sessions.lock().get(&session_id).cloned()
    }
}

/// Result of locating the header that carries the session cookie.
///
/// Locating the header never changes it. When the cookie was found in a
/// `Cookie` field, [`SessionHeader::needs_rename`] is true and the caller
/// applies the rename explicitly with [`Header::apply_session_header`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHeader {
    index: usize,
    value: String,
    rename: bool,
}

impl SessionHeader {
    /// Position of the field within the header block.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Field value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// True if the field is a `Cookie` field that should become `Set-Cookie`.
    pub fn needs_rename(&self) -> bool {
        self.rename
    }
}

/// Finds the header field carrying the session cookie.
///
/// A `Set-Cookie` field is preferred; otherwise the first `Cookie` field is
/// returned, flagged for renaming.
///
/// # Errors
///
/// Returns [`SessionError::HeaderMissing`] if neither field exists.
///
/// # Examples
///
/// ```
/// use gateway_core::{extract_session_header, Header};
///
/// let mut header = Header::new();
/// header.add("Cookie", "SESSIONID=abc");
///
/// let found = extract_session_header(&header).unwrap();
/// assert!(found.needs_rename());
/// assert_eq!(header.fields()[0].name(), "Cookie"); // untouched
///
/// header.apply_session_header(&found);
/// assert_eq!(header.fields()[0].name(), "Set-Cookie");
/// ```
pub fn extract_session_header(header: &Header) -> Result<SessionHeader, SessionError> {
    if let Some(index) = header.position(names::SET_COOKIE) {
        return Ok(SessionHeader {
            index,
            value: header.fields()[index].value().to_string(),
            rename: false,
        });
    }
    if let Some(index) = header.position(names::COOKIE) {
        return Ok(SessionHeader {
            index,
            value: header.fields()[index].value().to_string(),
            rename: true,
        });
    }
    Err(SessionError::HeaderMissing)
}

/// Locates the session header of `message` and applies the rename in place.
///
/// # Errors
///
/// Returns [`SessionError::HeaderMissing`] if no cookie header exists.
pub fn take_session_header<M: Message + ?Sized>(
    message: &mut M,
) -> Result<SessionHeader, SessionError> {
    let found = extract_session_header(message.header())?;
    message.header_mut().apply_session_header(&found);
    Ok(found)
}

/// Returns the value following `SESSIONID=` in a cookie header value.
///
/// The value is split on spaces; a trailing `;` separator is not part of the
/// id.
///
/// # Errors
///
/// Returns [`SessionError::IdMissing`] if no token starts with `SESSIONID=`.
pub fn extract_session_id(header_value: &str) -> Result<String, SessionError> {
    header_value
        .split(' ')
        .find_map(|token| token.strip_prefix(SESSION_ID_PREFIX))
        .map(|id| id.trim_end_matches(';').to_string())
        .ok_or(SessionError::IdMissing)
}

/// Accessor the validators use to reach the session store.
#[derive(Clone)]
pub struct SessionBinding {
    store: Arc<dyn SessionStore>,
}

impl SessionBinding {
    /// Wraps a session store.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Creates (or reuses) the session `session_id`.
    pub fn create_session(&self, exchange: &Exchange, session_id: &str) -> Arc<Session> {
        self.store.create(exchange, session_id)
    }

    /// Finds the session of `request`.
    pub fn session(&self, request: &Request) -> Option<Arc<Session>> {
        self.store.lookup(request)
    }

    /// Copies all parameters into the session's attributes.
    pub fn add_params(&self, session: &Session, params: &ParameterSet) {
        session.merge_attributes(params.iter());
    }
}

impl std::fmt::Debug for SessionBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBinding").finish_non_exhaustive()
    }
}
