//! Document locking types, rules, and validation.
//!
//! This module lives in `core` (zero internal deps) so that the record
//! store, the broadcaster, and the lock engine can all reference the same
//! lock levels, record shape, and wire message protocol.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Lock level constants
// ---------------------------------------------------------------------------

/// Non-exclusive read lock. Many holders may coexist on one document.
pub const LEVEL_READ: &str = "read";
/// Exclusive whole-document edit lock.
pub const LEVEL_DOCUMENT: &str = "document";
/// Exclusive lock on a single sub-element of a document.
pub const LEVEL_ELEMENT: &str = "element";

/// All valid lock level names.
pub const VALID_LEVELS: &[&str] = &[LEVEL_READ, LEVEL_DOCUMENT, LEVEL_ELEMENT];

// ---------------------------------------------------------------------------
// LockLevel
// ---------------------------------------------------------------------------

/// The granularity/exclusivity class of a lock.
///
/// The set is closed: every lock in the system is exactly one of these
/// three, and dispatch on the level is a plain `match`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockLevel {
    Read,
    Document,
    Element,
}

impl LockLevel {
    /// Return the wire/log string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => LEVEL_READ,
            Self::Document => LEVEL_DOCUMENT,
            Self::Element => LEVEL_ELEMENT,
        }
    }

    /// Parse from a string, returning an error for unknown levels.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            LEVEL_READ => Ok(Self::Read),
            LEVEL_DOCUMENT => Ok(Self::Document),
            LEVEL_ELEMENT => Ok(Self::Element),
            other => Err(CoreError::Validation(format!(
                "Unknown lock level: '{other}'. Valid levels: {}",
                VALID_LEVELS.join(", ")
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// LockOperation
// ---------------------------------------------------------------------------

/// The kind of operation a [`LockActionResult`] reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LockOperation {
    Acquire,
    Release,
    Exists,
}

// ---------------------------------------------------------------------------
// LockHolder
// ---------------------------------------------------------------------------

/// The identity of a user requesting or holding a lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHolder {
    /// Stable account login. Matching is case-insensitive.
    pub login: String,
    /// Human-readable name, carried for UI and audit output only.
    pub display_name: Option<String>,
}

impl LockHolder {
    /// Create a holder with only the required login.
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            display_name: None,
        }
    }

    /// Attach a display name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}

// ---------------------------------------------------------------------------
// SessionMatch
// ---------------------------------------------------------------------------

/// How lookups treat the session of an existing record.
///
/// Idempotency checks require the exact session; admin queries and the
/// forced sweep do not care which session holds the lock. Spelling the
/// mode out at every call site avoids overloading an absent session id
/// to mean "don't care".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMatch<'a> {
    /// The existing record's session must equal this one.
    Exact(&'a str),
    /// Match regardless of which session holds the lock.
    AnySession,
}

// ---------------------------------------------------------------------------
// LockRecord
// ---------------------------------------------------------------------------

/// One held lock, as stored in the record store.
///
/// The record store owns the live records; everything else only ever
/// holds transient copies used for comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockRecord {
    /// Identifier of the locked document. Never empty.
    pub resource_id: String,
    /// Set by the coordinator at acquisition. Absent only on candidates
    /// reconstructed for lookup or removal.
    pub acquired_at: Option<Timestamp>,
    /// Stable identifier of the holder.
    pub user_login: String,
    /// Human-readable holder name, for UI/audit output only.
    pub user_display_name: Option<String>,
    /// The client session holding the lock. A real held lock always has
    /// one; lookup candidates built for admin queries may not.
    pub session_id: Option<String>,
    /// The lock's level.
    pub level: LockLevel,
    /// The locked sub-element. Present if and only if `level == Element`.
    pub element_id: Option<String>,
}

impl LockRecord {
    /// Create a record, enforcing the element/level invariant.
    ///
    /// `element_id` must be present exactly when `level` is
    /// [`LockLevel::Element`].
    pub fn new(
        resource_id: impl Into<String>,
        user_login: impl Into<String>,
        level: LockLevel,
        element_id: Option<&str>,
    ) -> Result<Self, CoreError> {
        let resource_id = resource_id.into();
        let user_login = user_login.into();
        validate_resource_id(&resource_id)?;
        validate_user_login(&user_login)?;
        match (level, element_id) {
            (LockLevel::Element, None) => {
                return Err(CoreError::Validation(
                    "An element lock requires an element_id".to_string(),
                ));
            }
            (LockLevel::Element, Some(el)) if el.is_empty() => {
                return Err(CoreError::Validation(
                    "element_id must not be empty".to_string(),
                ));
            }
            (LockLevel::Read | LockLevel::Document, Some(_)) => {
                return Err(CoreError::Validation(format!(
                    "A {} lock must not carry an element_id",
                    level.as_str()
                )));
            }
            _ => {}
        }
        Ok(Self {
            resource_id,
            acquired_at: None,
            user_login,
            user_display_name: None,
            session_id: None,
            level,
            element_id: element_id.map(str::to_string),
        })
    }

    /// Attach the holding session.
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Attach the holder's display name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.user_display_name = Some(display_name.into());
        self
    }

    /// Stamp the acquisition time.
    pub fn with_acquired_at(mut self, at: Timestamp) -> Self {
        self.acquired_at = Some(at);
        self
    }

    /// Whether this record and `other` name the same held lock, ignoring
    /// sessions: same resource, same level, same login (case-insensitive),
    /// and the same element when the level is `Element`.
    pub fn same_holder(&self, other: &LockRecord) -> bool {
        self.resource_id == other.resource_id
            && self.level == other.level
            && self.user_login.eq_ignore_ascii_case(&other.user_login)
            && (self.level != LockLevel::Element || self.element_id == other.element_id)
    }

    /// Whether this record matches `probe` under the given session mode.
    pub fn matches(&self, probe: &LockRecord, session: SessionMatch<'_>) -> bool {
        self.same_holder(probe)
            && match session {
                SessionMatch::Exact(s) => self.session_id.as_deref() == Some(s),
                SessionMatch::AnySession => true,
            }
    }

    /// Whether this record is identified by `probe` for removal: holder
    /// identity, plus the probe's session when it carries one.
    pub fn matched_by(&self, probe: &LockRecord) -> bool {
        let session = match probe.session_id.as_deref() {
            Some(s) => SessionMatch::Exact(s),
            None => SessionMatch::AnySession,
        };
        self.matches(probe, session)
    }
}

// ---------------------------------------------------------------------------
// LockActionResult
// ---------------------------------------------------------------------------

/// The outcome of a lock engine operation.
///
/// Conflicts and no-op releases are reported here with `success: false`;
/// they are expected business outcomes, not errors.
#[derive(Debug, Clone, Serialize)]
pub struct LockActionResult {
    /// Whether the operation changed (or, for `Exists`, found) anything.
    pub success: bool,
    /// What was attempted.
    pub operation: LockOperation,
    /// The record the operation was about, when there is one.
    pub record: Option<LockRecord>,
    /// The full post-operation snapshot for the resource, so a denied
    /// caller can see who holds the conflicting lock.
    pub current_records: Vec<LockRecord>,
}

impl LockActionResult {
    pub fn new(
        success: bool,
        operation: LockOperation,
        record: Option<LockRecord>,
        current_records: Vec<LockRecord>,
    ) -> Self {
        Self {
            success,
            operation,
            record,
            current_records,
        }
    }
}

// ---------------------------------------------------------------------------
// Lock update wire messages
// ---------------------------------------------------------------------------

/// Messages pushed to remote clients when lock state changes.
///
/// Serialized as JSON with an internally-tagged `"type"` discriminator so
/// that the frontend can route messages by type string. The transport
/// itself is owned by the embedding process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum LockUpdateMessage {
    /// A lock was acquired on a document or element.
    #[serde(rename = "lock.acquired")]
    Acquired {
        resource_id: String,
        user_login: String,
        level: LockLevel,
        element_id: Option<String>,
    },

    /// A lock was released.
    #[serde(rename = "lock.released")]
    Released {
        resource_id: String,
        user_login: String,
        level: LockLevel,
        element_id: Option<String>,
    },

    /// A lock acquisition was denied; `holders` lists who currently
    /// holds locks on the resource.
    #[serde(rename = "lock.denied")]
    Denied {
        resource_id: String,
        user_login: String,
        level: LockLevel,
        element_id: Option<String>,
        holders: Vec<String>,
    },
}

impl LockUpdateMessage {
    /// Build the wire message for a lock engine result, if the result is
    /// one clients need to hear about. Lookup results and no-op releases
    /// produce `None`.
    pub fn from_result(result: &LockActionResult) -> Option<Self> {
        let record = result.record.as_ref()?;
        match (result.operation, result.success) {
            (LockOperation::Acquire, true) => Some(Self::Acquired {
                resource_id: record.resource_id.clone(),
                user_login: record.user_login.clone(),
                level: record.level,
                element_id: record.element_id.clone(),
            }),
            (LockOperation::Acquire, false) => Some(Self::Denied {
                resource_id: record.resource_id.clone(),
                user_login: record.user_login.clone(),
                level: record.level,
                element_id: record.element_id.clone(),
                holders: result
                    .current_records
                    .iter()
                    .map(|r| r.user_login.clone())
                    .collect(),
            }),
            (LockOperation::Release, true) => Some(Self::Released {
                resource_id: record.resource_id.clone(),
                user_login: record.user_login.clone(),
                level: record.level,
                element_id: record.element_id.clone(),
            }),
            (LockOperation::Release, false) | (LockOperation::Exists, _) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

/// Validate that a resource id is non-empty.
pub fn validate_resource_id(resource_id: &str) -> Result<(), CoreError> {
    if resource_id.is_empty() {
        return Err(CoreError::Validation(
            "resource_id must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validate that a user login is non-empty.
pub fn validate_user_login(user_login: &str) -> Result<(), CoreError> {
    if user_login.is_empty() {
        return Err(CoreError::Validation(
            "user_login must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validate that a session id is non-empty.
pub fn validate_session_id(session_id: &str) -> Result<(), CoreError> {
    if session_id.is_empty() {
        return Err(CoreError::Validation(
            "session_id must not be empty".to_string(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
