// Tenant context: which companies the signed-in user belongs to and which one is current

pub mod observer;
pub mod snapshot;


use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::directory::{companies_for, TenantDirectory};
use crate::identity::{IdentitySource, IdentitySubscription};
use crate::models::{CompanyWithRole, Identity, MemberRole};
use crate::storage::{SelectionKey, SelectionStore};

pub use observer::{ContextEvent, ContextObserver, NoopObserver};
pub use snapshot::{ContextPhase, ContextSnapshot};

/// A load that has been issued but whose directory query has not run yet
#[derive(Debug)]
pub struct LoadTicket {
    generation: u64,
    identity: Option<Identity>,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// How a load ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    SignedOut,
    /// The directory query failed; carries the error message
    Failed(String),
    /// A newer load or sign-out was issued before this one finished
    Superseded,
}

/// Selection write computed under the state lock, applied after publishing
#[derive(Debug)]
struct PendingWrite {
    seq: u64,
    key: String,
    value: Option<String>,
}

/// Derives and publishes the tenant context for the current identity.
///
/// Construct one per application, share it as `Arc<TenantContext>`, and feed it
/// identity changes with [`TenantContext::follow`] or [`TenantContext::load`].
/// All state is published through a `watch` channel; mutation happens only via
/// `load`, `switch_company`, `refresh` and `shutdown`.
pub struct TenantContext {
    directory: Arc<dyn TenantDirectory>,
    store: Arc<dyn SelectionStore>,
    selection_key: SelectionKey,
    observer: Arc<dyn ContextObserver>,
    generation: AtomicU64,
    state: watch::Sender<ContextSnapshot>,
    write_seq: AtomicU64,
    persisted: Mutex<u64>,
}

impl TenantContext {
    pub fn new(directory: Arc<dyn TenantDirectory>, store: Arc<dyn SelectionStore>) -> Self {
        let (state, _) = watch::channel(ContextSnapshot::initial());
        Self {
            directory,
            store,
            selection_key: SelectionKey::default(),
            observer: Arc::new(NoopObserver),
            generation: AtomicU64::new(0),
            state,
            write_seq: AtomicU64::new(0),
            persisted: Mutex::new(0),
        }
    }

    pub fn with_selection_key(mut self, selection_key: SelectionKey) -> Self {
        self.selection_key = selection_key;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ContextObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver notified on every published change
    pub fn subscribe(&self) -> watch::Receiver<ContextSnapshot> {
        self.state.subscribe()
    }

    pub fn companies(&self) -> Vec<CompanyWithRole> {
        self.state.borrow().companies.clone()
    }

    pub fn current_company(&self) -> Option<CompanyWithRole> {
        self.state.borrow().current_company.clone()
    }

    pub fn user_role(&self) -> Option<MemberRole> {
        self.state.borrow().user_role
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity.clone()
    }

    /// Re-derive the context for `identity`; `None` signs out.
    ///
    /// Query failures are logged and reported to the observer; the previous
    /// companies stay in place when they belong to the same identity.
    pub async fn load(&self, identity: Option<Identity>) -> LoadOutcome {
        let ticket = self.begin_load(identity);
        self.finish_load(ticket).await
    }

    /// First half of [`load`](Self::load): claims a generation and publishes
    /// the transitional state without awaiting anything.
    pub fn begin_load(&self, identity: Option<Identity>) -> LoadTicket {
        let mut generation = 0;
        let signed_out = identity.is_none();

        self.state.send_modify(|state| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            match &identity {
                None => *state = ContextSnapshot::signed_out(),
                Some(identity) => {
                    state.identity = Some(identity.clone());
                    state.loading = true;
                }
            }
        });

        if signed_out {
            info!("Signed out, tenant context cleared");
            self.emit(ContextEvent::SignedOut);
        }

        LoadTicket { generation, identity }
    }

    /// Second half of [`load`](Self::load): queries the directory and applies
    /// the result if no newer load was issued meanwhile.
    pub async fn finish_load(&self, ticket: LoadTicket) -> LoadOutcome {
        let Some(identity) = ticket.identity else {
            return LoadOutcome::SignedOut;
        };

        let result = companies_for(self.directory.as_ref(), &identity).await;
        let mut events = Vec::new();

        let key = self.selection_key.resolve(&identity);
        let stored = match &result {
            Ok(_) => self.read_selection(&key, &mut events),
            Err(_) => None,
        };
        let mut pending = None;

        let applied = self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != ticket.generation {
                return false;
            }

            match &result {
                Err(err) => {
                    error!("Error fetching companies for user {}: {}", identity.id, err);
                    events.push(ContextEvent::LoadFailed {
                        user_id: identity.id.clone(),
                        error: err.to_string(),
                    });
                    if !state.owned_by(&identity) {
                        // Never show another identity's companies
                        state.companies.clear();
                        state.current_company = None;
                        state.user_role = None;
                        state.owner = None;
                    }
                    state.loading = false;
                }
                Ok(companies) => {
                    // The published selection of the same identity is the latest write
                    let baseline = if state.owned_by(&identity) {
                        state.current_company_id().map(str::to_string).or(stored.clone())
                    } else {
                        stored.clone()
                    };

                    let current = self.select_current(baseline.as_deref(), companies, &mut events);
                    let current_id = current.as_ref().map(|c| c.id().to_string());
                    if current_id != baseline {
                        pending = Some(self.pending_write(key.clone(), current_id.clone()));
                    }

                    events.push(ContextEvent::Loaded {
                        user_id: identity.id.clone(),
                        companies: companies.len(),
                        current_company: current_id,
                    });
                    *state = ContextSnapshot {
                        identity: Some(identity.clone()),
                        companies: companies.clone(),
                        user_role: current.as_ref().map(|c| c.user_role),
                        current_company: current,
                        loading: false,
                        loaded_at: Some(Utc::now()),
                        owner: Some(identity.clone()),
                    };
                }
            }
            true
        });

        if let Some(write) = pending {
            self.persist(write, &mut events);
        }

        let outcome = if !applied {
            debug!(
                "Discarding stale company load for user {} (generation {})",
                identity.id, ticket.generation
            );
            events.push(ContextEvent::StaleResponseDiscarded {
                user_id: identity.id.clone(),
                generation: ticket.generation,
            });
            LoadOutcome::Superseded
        } else {
            match &result {
                Ok(companies) => {
                    info!("Loaded {} companies for user {}", companies.len(), identity.id);
                    LoadOutcome::Loaded
                }
                Err(err) => LoadOutcome::Failed(err.to_string()),
            }
        };

        for event in &events {
            self.emit(event.clone());
        }
        outcome
    }

    fn read_selection(&self, key: &str, events: &mut Vec<ContextEvent>) -> Option<String> {
        match self.store.get(key) {
            Ok(stored) => stored,
            Err(err) => {
                warn!("Could not read saved company selection: {}", err);
                events.push(ContextEvent::StorageFailed {
                    key: key.to_string(),
                    error: err.to_string(),
                });
                None
            }
        }
    }

    /// Restore the saved company if it is still one of `companies`,
    /// otherwise fall back to the first.
    fn select_current(
        &self,
        stored: Option<&str>,
        companies: &[CompanyWithRole],
        events: &mut Vec<ContextEvent>,
    ) -> Option<CompanyWithRole> {
        let current = stored
            .and_then(|id| companies.iter().find(|c| c.id() == id))
            .or_else(|| companies.first())
            .cloned();

        if let Some(stored_id) = stored {
            let current_id = current.as_ref().map(|c| c.id());
            if current_id != Some(stored_id) {
                debug!("Saved company {} is no longer available", stored_id);
                events.push(ContextEvent::SelectionFallback {
                    stored: stored_id.to_string(),
                    selected: current_id.map(str::to_string),
                });
            }
        }

        current
    }

    /// Must be called while holding the state lock so write order follows publish order
    fn pending_write(&self, key: String, value: Option<String>) -> PendingWrite {
        PendingWrite {
            seq: self.write_seq.fetch_add(1, Ordering::SeqCst) + 1,
            key,
            value,
        }
    }

    /// Store a selection outside the state lock. A write overtaken by a
    /// later-published one is dropped.
    fn persist(&self, write: PendingWrite, events: &mut Vec<ContextEvent>) {
        let mut last = self.persisted.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if write.seq < *last {
            debug!("Skipping superseded selection write for {}", write.key);
            return;
        }
        *last = write.seq;

        let result = match &write.value {
            Some(id) => self.store.set(&write.key, id),
            None => self.store.remove(&write.key),
        };
        if let Err(err) = result {
            warn!("Could not save company selection: {}", err);
            events.push(ContextEvent::StorageFailed {
                key: write.key,
                error: err.to_string(),
            });
        }
    }

    /// Make `company_id` current. Ignored unless it is one of the loaded companies.
    ///
    /// The selection is saved for the identity the companies were loaded for,
    /// even while a load for another identity is in flight.
    pub fn switch_company(&self, company_id: &str) {
        let mut events = Vec::new();
        let mut pending = None;

        self.state.send_if_modified(|state| {
            let Some(company) = state.company(company_id).cloned() else {
                events.push(ContextEvent::SwitchIgnored {
                    company_id: company_id.to_string(),
                });
                return false;
            };

            if let Some(owner) = &state.owner {
                let key = self.selection_key.resolve(owner);
                pending = Some(self.pending_write(key, Some(company_id.to_string())));
            }

            state.user_role = Some(company.user_role);
            state.current_company = Some(company);
            events.push(ContextEvent::Switched {
                company_id: company_id.to_string(),
            });
            true
        });

        if let Some(write) = pending {
            self.persist(write, &mut events);
        }

        for event in &events {
            match event {
                ContextEvent::SwitchIgnored { .. } => debug!("Ignoring switch to unknown company {}", company_id),
                ContextEvent::Switched { .. } => info!("Switched current company to {}", company_id),
                _ => {}
            }
            self.emit(event.clone());
        }
    }

    /// Re-run the load for the current identity, e.g. after memberships changed elsewhere
    pub async fn refresh(&self) -> LoadOutcome {
        let identity = self.identity();
        self.load(identity).await
    }

    /// Feed every identity emitted by `source` into this context.
    ///
    /// Each emission claims its generation immediately and queries in the
    /// background, so a newer identity never waits for an older query. The
    /// subscription ends when the returned handle is dropped.
    pub fn follow(self: &Arc<Self>, source: &IdentitySource) -> IdentitySubscription {
        let mut identities = source.subscribe();
        let context = Arc::clone(self);

        let handle = tokio::spawn(async move {
            loop {
                let identity = identities.borrow_and_update().clone();
                let ticket = context.begin_load(identity);
                let worker = Arc::clone(&context);
                tokio::spawn(async move {
                    worker.finish_load(ticket).await;
                });

                if identities.changed().await.is_err() {
                    debug!("Identity source closed");
                    break;
                }
            }
        });

        IdentitySubscription::new(handle)
    }

    /// Discard in-flight loads and return to the initial state. Storage is untouched.
    pub fn shutdown(&self) {
        self.state.send_modify(|state| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            *state = ContextSnapshot::initial();
        });
        info!("Tenant context shut down");
    }

    fn emit(&self, event: ContextEvent) {
        self.observer.on_event(&event);
    }
}
