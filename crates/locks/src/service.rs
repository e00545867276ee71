//! The lock coordinator.
//!
//! [`LockingService`] is the public entry point of the arbitration
//! engine: it validates requests, delegates to the correct level
//! handler, makes acquire/release idempotent, and hands every state
//! change to the broadcaster.
//!
//! All state-mutating operations run under a single service-wide mutex
//! so that the compatibility check and the store mutation are atomic
//! together. Broadcast happens after the store guard is dropped, so the
//! critical section's duration is bounded by store access alone.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use copydesk_core::locking::{validate_resource_id, validate_session_id};
use copydesk_core::{
    CoreError, LockActionResult, LockHolder, LockLevel, LockOperation, LockRecord, SessionMatch,
};
use copydesk_events::{ListenerId, LockBroadcaster, LockUpdateListener};
use copydesk_store::{LockStore, MemoryLockStore};

use crate::handlers::handler_for;

/// Coordinates lock acquisition and release for shared documents.
///
/// The broadcaster is an injected collaborator owned by the process
/// lifecycle; independent service instances (for tests, or separate
/// document pools) each carry their own.
pub struct LockingService<S: LockStore = MemoryLockStore> {
    store: Mutex<S>,
    broadcaster: Arc<LockBroadcaster>,
}

impl<S: LockStore + 'static> LockingService<S> {
    /// Create a service around a record store and a broadcaster.
    pub fn new(store: S, broadcaster: Arc<LockBroadcaster>) -> Self {
        Self {
            store: Mutex::new(store),
            broadcaster,
        }
    }

    /// The broadcaster this service publishes to.
    pub fn broadcaster(&self) -> &Arc<LockBroadcaster> {
        &self.broadcaster
    }

    // -----------------------------------------------------------------------
    // Acquire
    // -----------------------------------------------------------------------

    /// Acquire a whole-document lock (`Read` or `Document` level).
    ///
    /// Passing [`LockLevel::Element`] here is a caller error; element
    /// locks go through [`lock_element`](Self::lock_element).
    pub async fn lock_document(
        &self,
        resource_id: &str,
        holder: &LockHolder,
        session_id: &str,
        level: LockLevel,
    ) -> Result<LockActionResult, CoreError> {
        if level == LockLevel::Element {
            return Err(CoreError::Validation(
                "lock_document does not accept the element level; use lock_element".to_string(),
            ));
        }
        self.lock(resource_id, holder, session_id, level, None).await
    }

    /// Acquire an exclusive lock on one sub-element of a document.
    pub async fn lock_element(
        &self,
        resource_id: &str,
        holder: &LockHolder,
        session_id: &str,
        element_id: &str,
    ) -> Result<LockActionResult, CoreError> {
        self.lock(
            resource_id,
            holder,
            session_id,
            LockLevel::Element,
            Some(element_id),
        )
        .await
    }

    /// Common acquire path.
    ///
    /// A request for a lock the same (user, session, level, element)
    /// already holds is idempotent: it succeeds with the existing state
    /// and is not re-broadcast, since no state changed.
    async fn lock(
        &self,
        resource_id: &str,
        holder: &LockHolder,
        session_id: &str,
        level: LockLevel,
        element_id: Option<&str>,
    ) -> Result<LockActionResult, CoreError> {
        validate_session_id(session_id)?;
        let mut candidate = LockRecord::new(resource_id, &holder.login, level, element_id)?
            .with_session(session_id)
            .with_acquired_at(Utc::now());
        if let Some(name) = &holder.display_name {
            candidate = candidate.with_display_name(name.clone());
        }

        let handler = handler_for(level);
        let result = {
            let mut store = self.store.lock().await;
            let existing = store.get_current(resource_id);
            let held = handler.exists(&candidate, SessionMatch::Exact(session_id), &existing);
            if held.success {
                tracing::debug!(
                    resource_id = %resource_id,
                    user = %holder.login,
                    level = %level.as_str(),
                    "Lock already held by this session; acquire is a no-op"
                );
                return Ok(LockActionResult::new(
                    true,
                    LockOperation::Acquire,
                    held.record,
                    existing,
                ));
            }
            handler.acquire(candidate, &mut *store)
        };

        if result.success {
            tracing::info!(
                resource_id = %resource_id,
                user = %holder.login,
                session = %session_id,
                level = %level.as_str(),
                element = element_id,
                "Lock acquired"
            );
            self.broadcaster.broadcast(&result).await;
        }
        Ok(result)
    }

    // -----------------------------------------------------------------------
    // Release
    // -----------------------------------------------------------------------

    /// Release a whole-document lock (`Read` or `Document` level).
    pub async fn unlock_document(
        &self,
        resource_id: &str,
        user_login: &str,
        session_id: &str,
        level: LockLevel,
    ) -> Result<LockActionResult, CoreError> {
        if level == LockLevel::Element {
            return Err(CoreError::Validation(
                "unlock_document does not accept the element level; use unlock_element"
                    .to_string(),
            ));
        }
        self.unlock(resource_id, user_login, session_id, level, None)
            .await
    }

    /// Release an element lock.
    pub async fn unlock_element(
        &self,
        resource_id: &str,
        user_login: &str,
        session_id: &str,
        element_id: &str,
    ) -> Result<LockActionResult, CoreError> {
        self.unlock(
            resource_id,
            user_login,
            session_id,
            LockLevel::Element,
            Some(element_id),
        )
        .await
    }

    /// Common release path. Releasing a lock that is not held is a
    /// no-op failure: nothing changed, nothing is broadcast.
    async fn unlock(
        &self,
        resource_id: &str,
        user_login: &str,
        session_id: &str,
        level: LockLevel,
        element_id: Option<&str>,
    ) -> Result<LockActionResult, CoreError> {
        validate_session_id(session_id)?;
        let candidate = LockRecord::new(resource_id, user_login, level, element_id)?
            .with_session(session_id);

        let handler = handler_for(level);
        let result = {
            let mut store = self.store.lock().await;
            let existing = store.get_current(resource_id);
            let held = handler.exists(&candidate, SessionMatch::Exact(session_id), &existing);
            if !held.success {
                tracing::debug!(
                    resource_id = %resource_id,
                    user = %user_login,
                    level = %level.as_str(),
                    "No matching lock held; release is a no-op"
                );
                return Ok(LockActionResult::new(
                    false,
                    LockOperation::Release,
                    Some(candidate),
                    existing,
                ));
            }
            handler.release(candidate, &mut *store)
        };

        if result.success {
            tracing::info!(
                resource_id = %resource_id,
                user = %user_login,
                session = %session_id,
                level = %level.as_str(),
                element = element_id,
                "Lock released"
            );
            self.broadcaster.broadcast(&result).await;
        }
        Ok(result)
    }

    /// Release every lock a session holds on a resource.
    ///
    /// Used when a client session ends (browser close, timeout) so
    /// dangling locks are not left behind. Each release is attempted
    /// independently and broadcast individually; overall success is the
    /// AND of the individual releases.
    pub async fn release_session_locks(
        &self,
        resource_id: &str,
        session_id: &str,
    ) -> Result<LockActionResult, CoreError> {
        validate_resource_id(resource_id)?;
        validate_session_id(session_id)?;

        let (results, snapshot) = {
            let mut store = self.store.lock().await;
            let targets: Vec<LockRecord> = store
                .get_current(resource_id)
                .into_iter()
                .filter(|r| r.session_id.as_deref() == Some(session_id))
                .collect();

            let mut results = Vec::with_capacity(targets.len());
            for record in targets {
                let handler = handler_for(record.level);
                results.push(handler.release(record, &mut *store));
            }
            (results, store.get_current(resource_id))
        };

        let success = results.iter().all(|r| r.success);
        let released = results.iter().filter(|r| r.success).count();
        for result in &results {
            if result.success {
                self.broadcaster.broadcast(result).await;
            }
        }

        tracing::info!(
            resource_id = %resource_id,
            session = %session_id,
            released,
            "Session locks released"
        );
        Ok(LockActionResult::new(
            success,
            LockOperation::Release,
            None,
            snapshot,
        ))
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Snapshot of the locks currently held on a resource.
    pub async fn get_locks(&self, resource_id: &str) -> Vec<LockRecord> {
        self.store.lock().await.get_current(resource_id)
    }

    /// Whether this (user, session) holds a document lock on the resource.
    pub async fn is_document_locked_for(
        &self,
        resource_id: &str,
        user_login: &str,
        session_id: &str,
    ) -> Result<bool, CoreError> {
        self.exists_with(
            resource_id,
            user_login,
            LockLevel::Document,
            None,
            SessionMatch::Exact(session_id),
        )
        .await
    }

    /// Whether this (user, session) holds the element lock.
    pub async fn is_element_locked_for(
        &self,
        resource_id: &str,
        user_login: &str,
        session_id: &str,
        element_id: &str,
    ) -> Result<bool, CoreError> {
        self.exists_with(
            resource_id,
            user_login,
            LockLevel::Element,
            Some(element_id),
            SessionMatch::Exact(session_id),
        )
        .await
    }

    /// Whether the user holds a document lock under any session.
    pub async fn is_document_locked_by_user(
        &self,
        resource_id: &str,
        user_login: &str,
    ) -> Result<bool, CoreError> {
        self.exists_with(
            resource_id,
            user_login,
            LockLevel::Document,
            None,
            SessionMatch::AnySession,
        )
        .await
    }

    /// Whether the user holds the element lock under any session.
    pub async fn is_element_locked_by_user(
        &self,
        resource_id: &str,
        user_login: &str,
        element_id: &str,
    ) -> Result<bool, CoreError> {
        self.exists_with(
            resource_id,
            user_login,
            LockLevel::Element,
            Some(element_id),
            SessionMatch::AnySession,
        )
        .await
    }

    async fn exists_with(
        &self,
        resource_id: &str,
        user_login: &str,
        level: LockLevel,
        element_id: Option<&str>,
        session: SessionMatch<'_>,
    ) -> Result<bool, CoreError> {
        let candidate = LockRecord::new(resource_id, user_login, level, element_id)?;
        let store = self.store.lock().await;
        let existing = store.get_current(resource_id);
        Ok(handler_for(level).exists(&candidate, session, &existing).success)
    }

    // -----------------------------------------------------------------------
    // Listeners
    // -----------------------------------------------------------------------

    /// Register a lock update listener.
    pub async fn register_listener(&self, listener: Arc<dyn LockUpdateListener>) -> ListenerId {
        self.broadcaster.register(listener).await
    }

    /// Remove a previously registered listener.
    pub async fn unregister_listener(&self, id: ListenerId) -> bool {
        self.broadcaster.unregister(id).await
    }

    // -----------------------------------------------------------------------
    // Maintenance
    // -----------------------------------------------------------------------

    /// Log every record currently held across all resources.
    ///
    /// Side-effect only: no state change, no broadcast. Returns the
    /// number of held records.
    pub async fn audit_held_locks(&self) -> usize {
        let records = self.store.lock().await.get_all();
        if records.is_empty() {
            tracing::debug!("Lock audit: no locks currently held");
            return 0;
        }
        for r in &records {
            tracing::info!(
                resource_id = %r.resource_id,
                user = %r.user_login,
                level = %r.level.as_str(),
                session = r.session_id.as_deref(),
                element = r.element_id.as_deref(),
                acquired_at = ?r.acquired_at,
                "Lock audit: held lock"
            );
        }
        records.len()
    }

    /// Release every record across all resources through its level's
    /// handler, broadcasting each release.
    ///
    /// Safety net against lock leaks from crashed sessions. Returns the
    /// number of records released.
    pub async fn force_release_all(&self) -> usize {
        let results = {
            let mut store = self.store.lock().await;
            let all = store.get_all();
            let mut results = Vec::with_capacity(all.len());
            for record in all {
                let handler = handler_for(record.level);
                results.push(handler.release(record, &mut *store));
            }
            results
        };

        let released = results.iter().filter(|r| r.success).count();
        for result in &results {
            if result.success {
                self.broadcaster.broadcast(result).await;
            }
        }

        if released > 0 {
            tracing::info!(released, "Forced release of all held locks");
        } else {
            tracing::debug!("Forced release sweep: no locks held");
        }
        released
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
