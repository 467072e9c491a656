//! Per-route capability lifecycle: one-time asynchronous initialization
//! gating all traffic.
//!
//! An [`AgentLifecycle`] binds a capability to its deployment settings
//! and guarantees `initialize` completes before either handler runs.
//! Re-entrant callers while initialization is in flight wait on the
//! same run; failure is sticky and makes the instance unusable.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use crate::capability::Capability;
use crate::config::CapabilitySettings;
use crate::{AppError, Result};

/// Observable lifecycle state of one capability instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleStatus {
    /// `initialize` has not been attempted.
    Uninitialized,
    /// `initialize` is in flight; callers wait on its outcome.
    Initializing,
    /// `initialize` completed; handlers may run.
    Ready,
    /// `initialize` failed with this message; the instance never
    /// serves traffic.
    Failed(String),
}

/// Binds a capability instance to its settings and gates readiness.
pub struct AgentLifecycle {
    capability: Arc<dyn Capability>,
    settings: CapabilitySettings,
    status: watch::Sender<LifecycleStatus>,
    init_gate: Mutex<()>,
}

impl AgentLifecycle {
    /// Bind `capability` to `settings` in the `Uninitialized` state.
    #[must_use]
    pub fn new(capability: Arc<dyn Capability>, settings: CapabilitySettings) -> Self {
        let (status, _) = watch::channel(LifecycleStatus::Uninitialized);
        Self {
            capability,
            settings,
            status,
            init_gate: Mutex::new(()),
        }
    }

    /// The bound capability instance.
    #[must_use]
    pub fn capability(&self) -> Arc<dyn Capability> {
        Arc::clone(&self.capability)
    }

    /// Current lifecycle status snapshot.
    #[must_use]
    pub fn status(&self) -> LifecycleStatus {
        self.status.borrow().clone()
    }

    /// Watch lifecycle status transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LifecycleStatus> {
        self.status.subscribe()
    }

    /// Wait until the instance is `Ready`, running `initialize` if
    /// nobody has yet.
    ///
    /// The gate mutex serializes initializers, so concurrent callers on
    /// an uninitialized instance trigger exactly one underlying
    /// `initialize` execution and all observe the same terminal status.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Init`] when initialization failed, now or on
    /// a previous attempt.
    pub async fn ready(&self) -> Result<()> {
        // Fast path for warm instances, no gate contention.
        match self.status() {
            LifecycleStatus::Ready => return Ok(()),
            LifecycleStatus::Failed(msg) => return Err(AppError::Init(msg)),
            LifecycleStatus::Uninitialized | LifecycleStatus::Initializing => {}
        }

        let _guard = self.init_gate.lock().await;

        // A concurrent caller may have finished while we waited.
        match self.status() {
            LifecycleStatus::Ready => return Ok(()),
            LifecycleStatus::Failed(msg) => return Err(AppError::Init(msg)),
            LifecycleStatus::Uninitialized | LifecycleStatus::Initializing => {}
        }

        self.status.send_replace(LifecycleStatus::Initializing);
        match self.capability.initialize(&self.settings).await {
            Ok(()) => {
                self.status.send_replace(LifecycleStatus::Ready);
                Ok(())
            }
            Err(err) => {
                let msg = match err {
                    AppError::Init(msg) => msg,
                    other => other.to_string(),
                };
                self.status
                    .send_replace(LifecycleStatus::Failed(msg.clone()));
                Err(AppError::Init(msg))
            }
        }
    }
}
