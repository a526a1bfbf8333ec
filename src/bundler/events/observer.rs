// Observers for bundling events

use super::BundleEvent;
use parking_lot::Mutex;

/// Receives bundling events
///
/// Observers are notified synchronously from the operation that produced the
/// event. A `Failed` event is delivered before the error is returned to the
/// caller; the observer sees it but cannot swallow it.
pub trait BundleObserver: Send + Sync {
    fn record_event(&self, event: &BundleEvent);

    fn name(&self) -> &str;
}

/// Forwards events to `tracing`
#[derive(Debug, Default)]
pub struct TracingObserver;

impl BundleObserver for TracingObserver {
    fn record_event(&self, event: &BundleEvent) {
        match event {
            BundleEvent::BundleWritten { id, path, modules } => {
                tracing::info!(bundle = %id, path = %path.display(), modules, "Bundle written");
            }
            BundleEvent::BundleSkipped { root } => {
                tracing::debug!(root = %root, "Nothing left to bundle");
            }
            BundleEvent::PackageSkipped { name, reason } => {
                tracing::warn!(package = %name, reason = %reason, "Package skipped");
            }
            BundleEvent::ConfigSaved { path } => {
                tracing::info!(path = %path.display(), "Loader configuration saved");
            }
            BundleEvent::Failed { operation, error } => {
                tracing::error!(operation = %operation, error = %error, "Bundling failed");
            }
        }
    }

    fn name(&self) -> &str {
        "tracing"
    }
}

/// Keeps every event in memory, in arrival order
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<BundleEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BundleEvent> {
        self.events.lock().clone()
    }
}

impl BundleObserver for RecordingObserver {
    fn record_event(&self, event: &BundleEvent) {
        self.events.lock().push(event.clone());
    }

    fn name(&self) -> &str {
        "recording"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn observer_names() {
        assert_eq!(TracingObserver.name(), "tracing");
        assert_eq!(RecordingObserver::new().name(), "recording");
    }

    #[test]
    fn recording_observer_keeps_order() {
        let observer = RecordingObserver::new();
        observer.record_event(&BundleEvent::BundleSkipped {
            root: "components/a".to_string(),
        });
        observer.record_event(&BundleEvent::ConfigSaved {
            path: PathBuf::from("config.js"),
        });

        let names: Vec<_> = observer
            .events()
            .iter()
            .map(|e| e.name().into_owned())
            .collect();
        assert_eq!(names, ["bundle.skipped", "config.saved"]);
    }

    #[test]
    fn tracing_observer_accepts_every_event() {
        // no subscriber installed; must not panic
        let observer = TracingObserver;
        observer.record_event(&BundleEvent::Failed {
            operation: "bundle_package".to_string(),
            error: "boom".to_string(),
        });
        observer.record_event(&BundleEvent::PackageSkipped {
            name: "lodash".to_string(),
            reason: "no main file".to_string(),
        });
    }
}
