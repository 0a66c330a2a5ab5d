use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::request::RequestSettings;
use crate::scan::ExtensionSet;
use crate::units::{SizeLimits, UnitMode};

/// Default pause between units, to stay under the model service's rate limit.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(1000);

/// Everything one synchronisation run needs, apart from the service clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynchroniseConfig {
    /// Directory to scan. In feature mode this is the feature's subtree.
    pub root: PathBuf,
    pub mode: UnitMode,
    pub extensions: ExtensionSet,
    pub limits: SizeLimits,
    pub request: RequestSettings,
    /// Pause after each unit before the next one starts.
    pub cooldown: Duration,
    /// Base URL the diagram source is appended to (base64url) for image rendering.
    pub diagram_base_url: String,
}

impl SynchroniseConfig {
    pub fn trace_loaded(&self) {
        info!(
            root = %self.root.display(),
            mode = ?self.mode,
            model = %self.request.model,
            cooldown_ms = self.cooldown.as_millis() as u64,
            "Loaded SynchroniseConfig"
        );
        debug!(?self, "SynchroniseConfig loaded (full debug)");
    }
}
