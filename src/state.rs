use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceMode {
    Online,
    Maintenance,
}

/// Process-wide connectivity state.
///
/// Written exactly once by the bootstrapper, read by the maintenance gate and
/// the status endpoint. Until the bootstrapper has spoken the service counts
/// as being in maintenance.
#[derive(Clone, Default)]
pub struct ServiceStatus {
    mode: Arc<OnceCell<ServiceMode>>,
}

impl ServiceStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the bootstrap outcome. Returns false if a mode was already declared.
    pub fn declare(&self, mode: ServiceMode) -> bool {
        match self.mode.set(mode) {
            Ok(()) => true,
            Err(_) => {
                warn!(?mode, current = ?self.mode(), "Service mode already declared, ignoring");
                false
            }
        }
    }

    pub fn mode(&self) -> ServiceMode {
        self.mode.get().copied().unwrap_or(ServiceMode::Maintenance)
    }

    pub fn is_online(&self) -> bool {
        self.mode() == ServiceMode::Online
    }
}
