//! Session lifecycle manager.
//!
//! Resolution runs once per request, before the handler:
//!
//! 1. No identity → **Absent**
//! 2. Store miss or malformed record → **Absent**
//! 3. Past expiry → **Expired** (record evicted)
//! 4. Pinning on, record has no IP hash → **Corrupted** (record evicted)
//! 5. Pinning on, IP does not verify → **Mismatch** (record kept)
//! 6. Otherwise → **Valid**
//!
//! Every non-valid state mints a fresh session. Write-back happens once,
//! from [`SessionManager::commit`], after the handler has finished.
//!
//! Concurrent requests sharing one session id are not serialized: each
//! loads, mutates and stores independently and the last write wins.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

use crate::config::SessionConfig;
use crate::context::{Baseline, CookieDirective, SessionContext};
use crate::error::{Error, Result};
use crate::events::{EventBus, SessionEvent};
use crate::hasher::IpHasher;
use crate::record::{SessionRecord, generate_session_id};
use crate::store::{Lookup, SessionStore, SharedBackend, StorageConfig, build_backend};
use crate::validator;

/// How a request's session identity resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Absent,
    Expired,
    Corrupted,
    Mismatch,
    Valid,
}

impl SessionState {
    pub fn is_valid(self) -> bool {
        self == SessionState::Valid
    }
}

/// What [`SessionManager::commit`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The record was written under this id.
    Persisted(String),
    /// Write-back was not needed for this id.
    Skipped(String),
    /// No session was bound and nothing was staged.
    Unbound,
}

/// Resolves, creates and persists sessions against a [`SessionStore`].
///
/// Cheap to clone; clones share the store, hasher and event bus.
#[derive(Debug, Clone)]
pub struct SessionManager {
    config: Arc<SessionConfig>,
    store: SessionStore,
    hasher: IpHasher,
    events: EventBus,
}

impl SessionManager {
    /// Create a manager over `backend`.
    pub fn new(config: SessionConfig, backend: SharedBackend) -> Self {
        let store = SessionStore::new(backend, config.store_prefix.clone());
        Self {
            config: Arc::new(config),
            store,
            hasher: IpHasher::new(),
            events: EventBus::default(),
        }
    }

    /// Create a manager with the backend described by `storage`.
    pub fn from_config(config: SessionConfig, storage: &StorageConfig) -> Result<Self> {
        let backend = build_backend(storage)?;
        info!(
            driver = storage.driver(),
            prefix = %config.store_prefix,
            "Session storage ready"
        );
        Ok(Self::new(config, backend))
    }

    /// Replace the IP hasher.
    pub fn with_hasher(mut self, hasher: IpHasher) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn hasher(&self) -> &IpHasher {
        &self.hasher
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn publish(&self, event: SessionEvent) {
        self.events.publish(event);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Resolution
    // ─────────────────────────────────────────────────────────────────────────

    /// Resolve the session for a request and bind it to `context`.
    ///
    /// `cookie_id` is the id presented by the client, `client_ip` the
    /// address used for pinning. Every non-valid outcome mints a new
    /// session; only storage and hashing failures are returned as errors.
    pub async fn resolve(
        &self,
        context: &SessionContext,
        cookie_id: Option<&str>,
        client_ip: Option<&str>,
    ) -> Result<SessionState> {
        context.set_client_ip(client_ip.map(str::to_string));

        let Some(id) = self.identity(context, cookie_id) else {
            self.mint(context).await?;
            return Ok(SessionState::Absent);
        };

        let (state, loaded) = self.classify(&id, client_ip).await?;
        match loaded {
            Some(loaded) if state.is_valid() => self.bind_valid(context, loaded),
            _ => {
                self.mint(context).await?;
            }
        }
        Ok(state)
    }

    /// The context's own id beats whatever the cookie says.
    fn identity(&self, context: &SessionContext, cookie_id: Option<&str>) -> Option<String> {
        match (context.id(), cookie_id) {
            (Some(bound), Some(cookie)) if bound != cookie => {
                debug!(
                    session_id = %bound,
                    "Cookie id disagrees with request context, ignoring cookie"
                );
                Some(bound)
            }
            (Some(bound), _) => Some(bound),
            (None, cookie) => cookie.filter(|id| !id.is_empty()).map(str::to_string),
        }
    }

    /// Run the validator chain against the stored record for `id`.
    async fn classify(
        &self,
        id: &str,
        client_ip: Option<&str>,
    ) -> Result<(SessionState, Option<SessionRecord>)> {
        let record = match self.store.lookup(id).await? {
            Lookup::Found(record) => record,
            Lookup::Missing | Lookup::Malformed => {
                trace!(session_id = %id, "No usable stored session");
                return Ok((SessionState::Absent, None));
            }
        };

        if validator::is_expired(&record, self.config.expiry, Utc::now()) {
            debug!(session_id = %id, "Session expired, evicting");
            self.store.delete(id).await?;
            self.publish(SessionEvent::Expired {
                session_id: id.to_string(),
            });
            return Ok((SessionState::Expired, None));
        }

        if self.config.ip_pinning.is_enabled() {
            match validator::check_ip(&record, client_ip, &self.hasher).await {
                Ok(()) => {}
                Err(Error::IpMissingFromSession) => {
                    warn!(session_id = %id, "Pinned session has no IP hash, evicting");
                    self.store.delete(id).await?;
                    self.publish(SessionEvent::Corrupted {
                        session_id: id.to_string(),
                    });
                    return Ok((SessionState::Corrupted, None));
                }
                Err(Error::IpMismatch) => {
                    warn!(
                        session_id = %id,
                        "Client IP does not match session, possible hijack attempt"
                    );
                    self.publish(SessionEvent::IpMismatch {
                        session_id: id.to_string(),
                    });
                    return Ok((SessionState::Mismatch, None));
                }
                Err(e) => return Err(e),
            }
        }

        Ok((SessionState::Valid, Some(record)))
    }

    fn bind_valid(&self, context: &SessionContext, loaded: SessionRecord) {
        let mut current = loaded.clone();

        if self.config.rolling {
            current.created_at = Utc::now();
            context.set_cookie(CookieDirective::Issue(current.id.clone()));
            debug!(session_id = %current.id, "Session renewed");
            self.publish(SessionEvent::Renewed {
                session_id: current.id.clone(),
            });
        } else {
            context.set_cookie(CookieDirective::Keep);
        }

        trace!(session_id = %current.id, "Session resolved");
        context.bind_loaded(loaded, current);
    }

    /// Mint a new session, bind it and schedule its cookie.
    async fn mint(&self, context: &SessionContext) -> Result<String> {
        let id = generate_session_id(self.config.id_length);
        let ip = if self.config.ip_pinning.is_enabled() {
            self.hasher.hash(context.client_ip().as_deref()).await?
        } else {
            None
        };

        let pristine = SessionRecord::new(id.clone(), Utc::now()).with_ip(ip);
        context.bind_minted(pristine);
        context.set_cookie(CookieDirective::Issue(id.clone()));

        info!(session_id = %id, "Session created");
        self.publish(SessionEvent::Created {
            session_id: id.clone(),
        });
        Ok(id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Write-back
    // ─────────────────────────────────────────────────────────────────────────

    /// Persist the context's session if policy calls for it.
    ///
    /// Called exactly once per request, after the handler is done. The id
    /// comes from the context, never from the inbound cookie. A new session
    /// that ends up not persisted also loses its pending cookie.
    pub async fn commit(&self, context: &SessionContext) -> Result<CommitOutcome> {
        let id = match context.id() {
            Some(id) => id,
            // Writes after a destroy (or before any resolution) still deserve a session.
            None if context.has_staged() => self.mint(context).await?,
            None => return Ok(CommitOutcome::Unbound),
        };

        let Some(record) = context.record() else {
            return Ok(CommitOutcome::Unbound);
        };

        // A pinned record without an IP hash would be evicted as corrupted
        // on its next use, so it is never written.
        let unhashed = record.ip.as_deref().is_none_or(str::is_empty);
        if self.config.ip_pinning.is_enabled() && unhashed {
            warn!(session_id = %id, "No client IP under IP pinning, not persisting session");
            context.set_cookie(CookieDirective::Keep);
            self.publish(SessionEvent::Skipped {
                session_id: id.clone(),
            });
            return Ok(CommitOutcome::Skipped(id));
        }

        let stored = self.store.get(&id).await?;
        let write = match stored {
            None => {
                let changed = match context.baseline() {
                    Some(Baseline::Pristine(ref pristine)) => &record != pristine,
                    _ => true,
                };
                self.config.save_uninitialized || changed
            }
            Some(ref stored) => self.config.resave || &record != stored,
        };

        if write {
            self.store.set(&id, &record).await?;
            debug!(session_id = %id, "Session persisted");
            self.publish(SessionEvent::Persisted {
                session_id: id.clone(),
            });
            return Ok(CommitOutcome::Persisted(id));
        }

        if stored.is_none() {
            context.set_cookie(CookieDirective::Keep);
        }
        debug!(session_id = %id, "Session unchanged, skipping write");
        self.publish(SessionEvent::Skipped {
            session_id: id.clone(),
        });
        Ok(CommitOutcome::Skipped(id))
    }

    /// Delete the context's session and schedule cookie removal.
    pub async fn destroy(&self, context: &SessionContext) -> Result<()> {
        if let Some(id) = context.id() {
            self.store.delete(&id).await?;
            info!(session_id = %id, "Session destroyed");
            self.publish(SessionEvent::Destroyed { session_id: id });
        }
        context.unbind();
        context.set_cookie(CookieDirective::Remove);
        Ok(())
    }
}
