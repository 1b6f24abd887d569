// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Observer callbacks that record what fired, for asserting dispatch.

use std::sync::{Arc, Mutex, MutexGuard};

use lineage_core::{Annotation, ObserverResult};

/// Shared log of observer invocations.
///
/// Each callback produced by a probe appends its tag to one shared log, so
/// tests can assert both how often and in which order observers ran.
///
/// # Example
///
/// ```
/// use lineage_core::Provenance;
/// use lineage_dry_tests::ObserverProbe;
/// use serde_json::{json, Value};
///
/// let probe = ObserverProbe::new();
/// let mut session: Provenance<Value> = Provenance::new(json!({"a": 1}));
/// session.add_global_observer(probe.recorder::<Value>("global"));
/// session.apply("bump", |_| json!({"a": 2})).unwrap();
/// assert_eq!(probe.count("global"), 1);
/// ```
#[derive(Clone, Default, Debug)]
pub struct ObserverProbe {
    log: Arc<Mutex<Vec<String>>>,
}

impl ObserverProbe {
    /// Create a probe with an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// A global or path-scoped observer that logs `tag`.
    pub fn recorder<T: 'static>(
        &self,
        tag: &str,
    ) -> impl FnMut(&T) -> ObserverResult + Send + 'static {
        let log = Arc::clone(&self.log);
        let tag = tag.to_owned();
        move |_| {
            log.lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(tag.clone());
            Ok(())
        }
    }

    /// An artifact observer that logs `tag:<annotation count>`.
    pub fn artifact_recorder<T: 'static, A: 'static>(
        &self,
        tag: &str,
    ) -> impl FnMut(&T, &[Annotation<A>]) -> ObserverResult + Send + 'static {
        let log = Arc::clone(&self.log);
        let tag = tag.to_owned();
        move |_, extra| {
            log.lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(format!("{tag}:{}", extra.len()));
            Ok(())
        }
    }

    /// Every logged entry, oldest first.
    pub fn log(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// How many times `tag` was logged.
    pub fn count(&self, tag: &str) -> usize {
        self.lock().iter().filter(|entry| *entry == tag).count()
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.log.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// An observer that always fails with `message`.
pub fn failing_observer<T: 'static>(
    message: &str,
) -> impl FnMut(&T) -> ObserverResult + Send + 'static {
    let message = message.to_owned();
    move |_| Err(message.clone().into())
}
