//! Credential gating for the video generation path.
//!
//! The studio never stores or validates the provider credential itself.
//! A host capability answers whether a key is currently selected and runs
//! the interactive selection flow; the gate wraps that capability and
//! fails open when no host is attached.

use std::sync::Arc;

use async_trait::async_trait;

/// Host-provided key selection capability.
///
/// Injected into the session instead of being reached for globally, so a
/// fake host can stand in during tests.
#[async_trait]
pub trait KeyHost: Send + Sync {
    /// Whether the user currently has a usable API key selected.
    async fn has_selected_key(&self) -> bool;

    /// Run the interactive key selection flow until the user completes or
    /// abandons it.
    async fn open_select_key(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Outcome of the interactive key selection flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySelection {
    /// The user finished selecting a key; credential presence should now
    /// report true.
    Completed,
    /// The user gave up, or the host flow failed.
    Abandoned,
}

/// Gate consulted before credential-dependent operations.
#[derive(Clone)]
pub struct KeyGate {
    host: Option<Arc<dyn KeyHost>>,
}

impl KeyGate {
    /// Create a gate backed by a host capability.
    pub fn new(host: Arc<dyn KeyHost>) -> Self {
        Self { host: Some(host) }
    }

    /// Create a gate with no host capability attached. Every check passes:
    /// without a host there is nothing to gate on.
    pub fn detached() -> Self {
        Self { host: None }
    }

    /// Whether a host capability is attached.
    pub fn is_attached(&self) -> bool {
        self.host.is_some()
    }

    /// Ask the host whether a usable credential is present.
    ///
    /// The answer is queried on every call, never cached. A detached gate
    /// reports true.
    pub async fn has_credential(&self) -> bool {
        match &self.host {
            Some(host) => host.has_selected_key().await,
            None => true,
        }
    }

    /// Run the host's interactive key selection flow.
    ///
    /// Errors from the host are treated as an abandoned selection, never
    /// propagated. A detached gate reports `Completed` immediately.
    pub async fn request_credential(&self) -> KeySelection {
        let Some(host) = &self.host else {
            return KeySelection::Completed;
        };
        match host.open_select_key().await {
            Ok(()) => KeySelection::Completed,
            Err(err) => {
                log::warn!("key selection flow failed: {}", err);
                KeySelection::Abandoned
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    struct FakeHost {
        has_key: AtomicBool,
        open_succeeds: bool,
        open_calls: AtomicU32,
    }

    impl FakeHost {
        fn new(has_key: bool, open_succeeds: bool) -> Self {
            Self {
                has_key: AtomicBool::new(has_key),
                open_succeeds,
                open_calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl KeyHost for FakeHost {
        async fn has_selected_key(&self) -> bool {
            self.has_key.load(Ordering::SeqCst)
        }

        async fn open_select_key(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.open_calls.fetch_add(1, Ordering::SeqCst);
            if self.open_succeeds {
                self.has_key.store(true, Ordering::SeqCst);
                Ok(())
            } else {
                Err("selection dialog closed".into())
            }
        }
    }

    #[tokio::test]
    async fn test_detached_gate_fails_open() {
        let gate = KeyGate::detached();
        assert!(!gate.is_attached());
        assert!(gate.has_credential().await);
    }

    #[tokio::test]
    async fn test_detached_gate_completes_request_immediately() {
        let gate = KeyGate::detached();
        assert_eq!(gate.request_credential().await, KeySelection::Completed);
    }

    #[tokio::test]
    async fn test_attached_gate_queries_host() {
        let gate = KeyGate::new(Arc::new(FakeHost::new(false, true)));
        assert!(gate.is_attached());
        assert!(!gate.has_credential().await);
    }

    #[tokio::test]
    async fn test_credential_presence_is_not_cached() {
        let host = Arc::new(FakeHost::new(false, true));
        let gate = KeyGate::new(host.clone());

        assert!(!gate.has_credential().await);
        host.has_key.store(true, Ordering::SeqCst);
        assert!(gate.has_credential().await);
    }

    #[tokio::test]
    async fn test_successful_selection_reports_completed() {
        let host = Arc::new(FakeHost::new(false, true));
        let gate = KeyGate::new(host.clone());

        assert_eq!(gate.request_credential().await, KeySelection::Completed);
        assert_eq!(host.open_calls.load(Ordering::SeqCst), 1);
        assert!(gate.has_credential().await);
    }

    #[tokio::test]
    async fn test_host_error_maps_to_abandoned() {
        let gate = KeyGate::new(Arc::new(FakeHost::new(false, false)));
        assert_eq!(gate.request_credential().await, KeySelection::Abandoned);
    }
}
