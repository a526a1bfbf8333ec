// Bundling lifecycle events
//
// Every orchestrator operation reports what it did (or why it failed) as a
// `BundleEvent`. Observers receive them for logging or reporting; they can
// never change the outcome of the operation.

pub mod observer;

pub use observer::{BundleObserver, RecordingObserver, TracingObserver};

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum BundleEvent {
    BundleWritten {
        id: String,
        path: PathBuf,
        modules: usize,
    },

    BundleSkipped {
        root: String,
    },

    PackageSkipped {
        name: String,
        reason: String,
    },

    ConfigSaved {
        path: PathBuf,
    },

    Failed {
        operation: String,
        error: String,
    },
}

impl BundleEvent {
    pub fn name(&self) -> Cow<'static, str> {
        match self {
            BundleEvent::BundleWritten { .. } => Cow::Borrowed("bundle.written"),
            BundleEvent::BundleSkipped { .. } => Cow::Borrowed("bundle.skipped"),
            BundleEvent::PackageSkipped { .. } => Cow::Borrowed("package.skipped"),
            BundleEvent::ConfigSaved { .. } => Cow::Borrowed("config.saved"),
            BundleEvent::Failed { .. } => Cow::Borrowed("operation.failed"),
        }
    }
}
