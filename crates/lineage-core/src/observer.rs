// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Observer registries and change dispatch.
//!
//! Three independent registries: global observers run after every committed
//! transition, path-scoped observers run only when the transition's diff
//! touches their path, and artifact observers run when an annotation is
//! attached. Registration order is dispatch order.

use std::fmt;

use serde_json::Value;

use crate::diff::Diff;
use crate::error::{ObserverError, ProvenanceError, Result};
use crate::node::Annotation;

/// Outcome of one observer call.
pub type ObserverResult = std::result::Result<(), ObserverError>;

/// Callback run after a transition, given the new current state.
pub type Observer<T> = Box<dyn FnMut(&T) -> ObserverResult + Send>;

/// Callback run after an annotation is attached, given the annotated node's
/// state and its full annotation list.
pub type ArtifactObserver<T, A> = Box<dyn FnMut(&T, &[Annotation<A>]) -> ObserverResult + Send>;

struct ScopedObserver<T> {
    path: Vec<String>,
    callback: Observer<T>,
}

/// Holds the observer registries of one session.
pub struct EventManager<T, A> {
    global: Vec<Observer<T>>,
    scoped: Vec<ScopedObserver<T>>,
    artifact: Vec<ArtifactObserver<T, A>>,
}

impl<T, A> Default for EventManager<T, A> {
    fn default() -> Self {
        Self {
            global: Vec::new(),
            scoped: Vec::new(),
            artifact: Vec::new(),
        }
    }
}

impl<T, A> fmt::Debug for EventManager<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventManager")
            .field("global", &self.global.len())
            .field(
                "scoped",
                &self.scoped.iter().map(|s| s.path.join(".")).collect::<Vec<_>>(),
            )
            .field("artifact", &self.artifact.len())
            .finish()
    }
}

impl<T, A> EventManager<T, A> {
    /// Creates empty registries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer that runs on every transition.
    pub fn add_global(&mut self, callback: Observer<T>) {
        self.global.push(callback);
    }

    /// Registers an observer scoped to `path`.
    ///
    /// The path is not checked here; see [`validate_observer_path`].
    pub fn add_scoped(&mut self, path: Vec<String>, callback: Observer<T>) {
        self.scoped.push(ScopedObserver { path, callback });
    }

    /// Registers an annotation observer.
    pub fn add_artifact(&mut self, callback: ArtifactObserver<T, A>) {
        self.artifact.push(callback);
    }

    /// Total number of registered observers.
    pub fn len(&self) -> usize {
        self.global.len() + self.scoped.len() + self.artifact.len()
    }

    /// Returns `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs global observers, then every scoped observer whose path is
    /// touched by `diffs`.
    ///
    /// Stops at the first failing observer.
    ///
    /// # Errors
    ///
    /// [`ProvenanceError::Observer`] carrying the callback's error.
    pub fn dispatch(&mut self, state: &T, diffs: &[Diff]) -> Result<()> {
        for callback in &mut self.global {
            callback(state).map_err(ProvenanceError::Observer)?;
        }
        for scoped in &mut self.scoped {
            if diffs.iter().any(|d| d.touches(&scoped.path)) {
                (scoped.callback)(state).map_err(ProvenanceError::Observer)?;
            }
        }
        Ok(())
    }

    /// Runs every artifact observer with the node's annotations.
    ///
    /// # Errors
    ///
    /// [`ProvenanceError::Observer`] carrying the first callback error.
    pub fn dispatch_artifact(&mut self, state: &T, extra: &[Annotation<A>]) -> Result<()> {
        for callback in &mut self.artifact {
            callback(state, extra).map_err(ProvenanceError::Observer)?;
        }
        Ok(())
    }
}

/// Checks that every segment of `path` names an existing property of
/// `state`, descending one level per segment.
///
/// Object segments match keys; array segments must be in-range decimal
/// indices. The empty path addresses the whole state and always exists.
///
/// # Errors
///
/// [`ProvenanceError::ObserverPathNotFound`] naming the full path.
pub fn validate_observer_path<S: AsRef<str>>(state: &Value, path: &[S]) -> Result<()> {
    let mut cursor = state;
    for segment in path {
        let key = segment.as_ref();
        let next = match cursor {
            Value::Object(map) => map.get(key),
            Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        cursor = next.ok_or_else(|| ProvenanceError::ObserverPathNotFound {
            path: path.iter().map(AsRef::as_ref).collect::<Vec<_>>().join("."),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::diff::diff;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting(hits: &Arc<AtomicUsize>) -> Observer<Value> {
        let hits = Arc::clone(hits);
        Box::new(move |_| {
            hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn path_validation_walks_objects_and_arrays() {
        let state = json!({"a": {"b": 1}, "todos": [{"task": "x"}]});
        validate_observer_path::<&str>(&state, &[]).unwrap();
        validate_observer_path(&state, &["a", "b"]).unwrap();
        validate_observer_path(&state, &["todos", "0", "task"]).unwrap();

        let err = validate_observer_path(&state, &["a", "missing"]).unwrap_err();
        assert!(matches!(
            err,
            ProvenanceError::ObserverPathNotFound { ref path } if path == "a.missing"
        ));
        assert!(validate_observer_path(&state, &["todos", "1"]).is_err());
        assert!(validate_observer_path(&state, &["a", "b", "deeper"]).is_err());
    }

    #[test]
    fn scoped_observers_fire_only_for_touched_paths() {
        let ab = Arc::new(AtomicUsize::new(0));
        let c = Arc::new(AtomicUsize::new(0));
        let all = Arc::new(AtomicUsize::new(0));
        let mut events: EventManager<Value, ()> = EventManager::new();
        events.add_scoped(vec!["a".into(), "b".into()], counting(&ab));
        events.add_scoped(vec!["c".into()], counting(&c));
        events.add_global(counting(&all));
        assert_eq!(events.len(), 3);

        let old = json!({"a": {"b": 1}, "c": 1});
        let touch_ab = json!({"a": {"b": 2}, "c": 1});
        events.dispatch(&touch_ab, &diff(&old, &touch_ab)).unwrap();
        assert_eq!(ab.load(Ordering::SeqCst), 1);
        assert_eq!(c.load(Ordering::SeqCst), 0);

        let touch_c = json!({"a": {"b": 1}, "c": 2});
        events.dispatch(&touch_c, &diff(&old, &touch_c)).unwrap();
        assert_eq!(ab.load(Ordering::SeqCst), 1);
        assert_eq!(c.load(Ordering::SeqCst), 1);

        events.dispatch(&old, &[]).unwrap();
        assert_eq!(all.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn first_failure_stops_dispatch() {
        let after = Arc::new(AtomicUsize::new(0));
        let mut events: EventManager<Value, ()> = EventManager::new();
        events.add_global(Box::new(|_| Err("observer broke".into())));
        events.add_global(counting(&after));

        let err = events.dispatch(&json!({}), &[]).unwrap_err();
        assert!(matches!(err, ProvenanceError::Observer(_)));
        assert_eq!(err.to_string(), "observer failed: observer broke");
        assert_eq!(after.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn artifact_observers_see_the_full_list() {
        let seen = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&seen);
        let mut events: EventManager<Value, String> = EventManager::new();
        events.add_artifact(Box::new(move |_, extra| {
            sink.store(extra.len(), Ordering::SeqCst);
            Ok(())
        }));
        let notes = vec![
            Annotation {
                time: 1,
                value: "one".to_owned(),
            },
            Annotation {
                time: 2,
                value: "two".to_owned(),
            },
        ];
        events.dispatch_artifact(&json!(null), &notes).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
