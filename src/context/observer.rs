use serde::Serialize;

/// Things the context manager does without telling its caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ContextEvent {
    Loaded {
        user_id: String,
        companies: usize,
        current_company: Option<String>,
    },
    SignedOut,
    LoadFailed {
        user_id: String,
        error: String,
    },
    /// A load finished after a newer one had been issued
    StaleResponseDiscarded {
        user_id: String,
        generation: u64,
    },
    /// The persisted company is no longer among the caller's companies
    SelectionFallback {
        stored: String,
        selected: Option<String>,
    },
    Switched {
        company_id: String,
    },
    SwitchIgnored {
        company_id: String,
    },
    StorageFailed {
        key: String,
        error: String,
    },
}

/// Hook for telemetry. Never changes what the manager does.
pub trait ContextObserver: Send + Sync {
    fn on_event(&self, event: &ContextEvent);
}

impl<F> ContextObserver for F
where
    F: Fn(&ContextEvent) + Send + Sync,
{
    fn on_event(&self, event: &ContextEvent) {
        self(event)
    }
}

pub struct NoopObserver;

impl ContextObserver for NoopObserver {
    fn on_event(&self, _event: &ContextEvent) {}
}
