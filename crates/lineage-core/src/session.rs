// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Session facade owning one live provenance graph.
//!
//! [`Provenance`] holds exactly one graph value. Every mutating call builds
//! the next graph with the pure functions in [`crate::graph`] and swaps it in
//! only when that succeeded, so a failed call leaves the session as it was.
//! After a swap the old and new current states are diffed and the result is
//! dispatched to observers.
//!
//! Sessions share nothing; any number can coexist. A session is `Send` but
//! not internally synchronized: callers sharing one across threads wrap it
//! in a mutex.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::action::Action;
use crate::codec::{self, StateCodec};
use crate::config::ProvenanceConfig;
use crate::diff::diff_states;
use crate::error::{ProvenanceError, Result};
use crate::graph::{self, ProvenanceGraph};
use crate::ident::{NodeId, Stamper, SystemStamper};
use crate::location::LocationSource;
use crate::node::{Annotation, ProvenanceNode};
use crate::observer::{validate_observer_path, EventManager, ObserverResult};

/// A provenance session over state type `T` with annotations of type `A`.
///
/// ```
/// use lineage_core::Provenance;
/// use serde_json::{json, Value};
///
/// let mut session: Provenance<Value> = Provenance::new(json!({"counter": 0}));
/// session.apply("increment", |mut s| {
///     s["counter"] = json!(1);
///     s
/// })?;
/// session.go_back_one_step()?;
/// assert_eq!(session.current_state()["counter"], 0);
/// # Ok::<(), lineage_core::ProvenanceError>(())
/// ```
pub struct Provenance<T, A = Value> {
    graph: ProvenanceGraph<T, A>,
    initial: T,
    events: EventManager<T, A>,
    config: ProvenanceConfig,
    codec: Box<dyn StateCodec>,
    stamper: Box<dyn Stamper>,
    location: Option<Box<dyn LocationSource>>,
}

/// Configures and creates a [`Provenance`] session.
pub struct ProvenanceBuilder<T, A = Value> {
    initial: T,
    config: ProvenanceConfig,
    codec: Option<Box<dyn StateCodec>>,
    stamper: Option<Box<dyn Stamper>>,
    location: Option<Box<dyn LocationSource>>,
    annotations: PhantomData<fn() -> A>,
}

impl<T, A> ProvenanceBuilder<T, A>
where
    T: Clone + Serialize + DeserializeOwned,
    A: Clone + Serialize + DeserializeOwned,
{
    fn new(initial: T) -> Self {
        Self {
            initial,
            config: ProvenanceConfig::default(),
            codec: None,
            stamper: None,
            location: None,
            annotations: PhantomData,
        }
    }

    /// Replaces the default configuration.
    pub fn config(mut self, config: ProvenanceConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the default [`DeflateCodec`](crate::DeflateCodec).
    pub fn codec(mut self, codec: impl StateCodec + 'static) -> Self {
        self.codec = Some(Box::new(codec));
        self
    }

    /// Replaces the default [`SystemStamper`].
    pub fn stamper(mut self, stamper: impl Stamper + 'static) -> Self {
        self.stamper = Some(Box::new(stamper));
        self
    }

    /// Sets the ambient location consulted by [`Provenance::done`].
    pub fn location(mut self, location: impl LocationSource + 'static) -> Self {
        self.location = Some(Box::new(location));
        self
    }

    /// Records the root node and returns the session.
    pub fn build(self) -> Provenance<T, A> {
        let Self {
            initial,
            config,
            codec,
            stamper,
            location,
            annotations: _,
        } = self;
        let mut stamper = stamper.unwrap_or_else(|| Box::new(SystemStamper));
        let codec =
            codec.unwrap_or_else(|| Box::new(config.codec()));
        let graph = graph::create_graph(initial.clone(), &config.root_label, stamper.as_mut());
        debug!(root = %graph.root(), codec = codec.name(), "created provenance session");
        Provenance {
            graph,
            initial,
            events: EventManager::new(),
            config,
            codec,
            stamper,
            location,
        }
    }
}

impl<T, A> Provenance<T, A>
where
    T: Clone + Serialize + DeserializeOwned,
    A: Clone + Serialize + DeserializeOwned,
{
    /// Starts a session at `initial` with default collaborators.
    pub fn new(initial: T) -> Self {
        Self::builder(initial).build()
    }

    /// Starts configuring a session at `initial`.
    pub fn builder(initial: T) -> ProvenanceBuilder<T, A> {
        ProvenanceBuilder::new(initial)
    }

    /// The live graph.
    pub fn graph(&self) -> &ProvenanceGraph<T, A> {
        &self.graph
    }

    /// The node under the cursor.
    pub fn current(&self) -> &ProvenanceNode<T, A> {
        self.graph.current_node()
    }

    /// The state under the cursor.
    pub fn current_state(&self) -> &T {
        self.current().state()
    }

    /// The root node.
    pub fn root(&self) -> &ProvenanceNode<T, A> {
        self.graph.root_node()
    }

    /// The baseline state imports are diffed against.
    pub fn initial_state(&self) -> &T {
        &self.initial
    }

    /// The session configuration.
    pub fn config(&self) -> &ProvenanceConfig {
        &self.config
    }

    /// Applies `action` to the current state and records the result.
    ///
    /// # Errors
    ///
    /// - [`ProvenanceError::Action`] if the transform fails; nothing changes.
    /// - [`ProvenanceError::Observer`] if an observer fails; the new node
    ///   stays committed.
    #[instrument(skip(self, action), fields(label = action.label()))]
    pub fn apply_action(&mut self, action: Action<'_, T, A>) -> Result<&T> {
        let next = graph::apply_action(&self.graph, action, self.stamper.as_mut())?;
        self.commit(next)?;
        Ok(self.current_state())
    }

    /// Applies an infallible closure without arguments, metadata, or
    /// artifact overrides.
    ///
    /// # Errors
    ///
    /// See [`Provenance::apply_action`].
    pub fn apply<F>(&mut self, label: impl Into<String>, apply: F) -> Result<&T>
    where
        F: FnOnce(T) -> T,
    {
        self.apply_action(Action::from_fn(label, apply))
    }

    /// Moves the cursor to `id`.
    ///
    /// # Errors
    ///
    /// [`ProvenanceError::UnknownNode`] for an id not in the graph.
    #[instrument(skip(self))]
    pub fn go_to_node(&mut self, id: &NodeId) -> Result<()> {
        let next = graph::go_to_node(&self.graph, id)?;
        self.commit(next)
    }

    /// Moves the cursor to the current node's parent.
    ///
    /// # Errors
    ///
    /// [`ProvenanceError::InvalidNavigation`] at the root.
    #[instrument(skip(self))]
    pub fn go_back_one_step(&mut self) -> Result<()> {
        let next = graph::go_back_one_step(&self.graph)?;
        self.commit(next)
    }

    /// Moves the cursor to the most recently added child.
    ///
    /// # Errors
    ///
    /// [`ProvenanceError::InvalidNavigation`] at a leaf.
    #[instrument(skip(self))]
    pub fn go_forward_one_step(&mut self) -> Result<()> {
        let next = graph::go_forward_one_step(&self.graph)?;
        self.commit(next)
    }

    /// Moves the cursor `n` parents up, or not at all.
    ///
    /// # Errors
    ///
    /// [`ProvenanceError::InvalidNavigation`] naming how many steps were
    /// possible; the cursor does not move.
    #[instrument(skip(self))]
    pub fn go_back_n_steps(&mut self, n: usize) -> Result<()> {
        let next = graph::go_back_n_steps(&self.graph, n)?;
        self.commit(next)
    }

    /// Moves the cursor to the root.
    ///
    /// # Errors
    ///
    /// Only observer failures.
    #[instrument(skip(self))]
    pub fn reset(&mut self) -> Result<()> {
        let next = graph::reset(&self.graph);
        self.commit(next)
    }

    /// Attaches an annotation to a state node and notifies artifact
    /// observers with the node's state and full annotation list.
    ///
    /// # Errors
    ///
    /// - [`ProvenanceError::UnknownNode`] or [`ProvenanceError::RootArtifact`];
    ///   nothing changes.
    /// - [`ProvenanceError::Observer`] after the annotation is stored.
    #[instrument(skip(self, extra))]
    pub fn add_extra_to_node_artifact(&mut self, id: &NodeId, extra: A) -> Result<()> {
        self.graph =
            graph::add_extra_to_node_artifact(&self.graph, id, extra, self.stamper.as_ref())?;
        let state = self.graph.get(id)?.state();
        let notes = graph::get_extra_from_artifact(&self.graph, id)?;
        debug!(node = %id, annotations = notes.len(), "annotated node");
        self.events.dispatch_artifact(state, notes)
    }

    /// Annotations of a state node, oldest first.
    ///
    /// # Errors
    ///
    /// [`ProvenanceError::UnknownNode`] or [`ProvenanceError::RootArtifact`].
    pub fn get_extra_from_artifact(&self, id: &NodeId) -> Result<&[Annotation<A>]> {
        graph::get_extra_from_artifact(&self.graph, id)
    }

    /// Registers an observer that runs when a transition changes the value
    /// at `path`, anything beneath it, or any ancestor of it.
    ///
    /// # Errors
    ///
    /// [`ProvenanceError::ObserverPathNotFound`] when `path` does not exist
    /// in the current state.
    pub fn add_observer<S, F>(&mut self, path: &[S], callback: F) -> Result<()>
    where
        S: AsRef<str>,
        F: FnMut(&T) -> ObserverResult + Send + 'static,
    {
        let state = serde_json::to_value(self.current_state())?;
        validate_observer_path(&state, path)?;
        let path = path.iter().map(|s| s.as_ref().to_owned()).collect();
        self.events.add_scoped(path, Box::new(callback));
        Ok(())
    }

    /// Registers an observer that runs after every transition.
    pub fn add_global_observer<F>(&mut self, callback: F)
    where
        F: FnMut(&T) -> ObserverResult + Send + 'static,
    {
        self.events.add_global(Box::new(callback));
    }

    /// Registers an observer that runs whenever an annotation is attached.
    pub fn add_artifact_observer<F>(&mut self, callback: F)
    where
        F: FnMut(&T, &[Annotation<A>]) -> ObserverResult + Send + 'static,
    {
        self.events.add_artifact(Box::new(callback));
    }

    /// Encodes the current state as an embeddable string.
    ///
    /// With `partial` set only the top-level fields that differ from the
    /// initial state are exported.
    ///
    /// # Errors
    ///
    /// Serialization or codec failures.
    pub fn export_state(&self, partial: bool) -> Result<String> {
        let current = serde_json::to_value(self.current_state())?;
        let exported = if partial {
            changed_fields(&serde_json::to_value(&self.initial)?, current)
        } else {
            current
        };
        Ok(codec::encode_state(
            self.codec.as_ref(),
            &exported,
            self.config.delimiter(),
        )?)
    }

    /// Decodes an exported state, merges it over the current state, and
    /// records the result as a new node diffed against the initial state.
    ///
    /// Fields in the export win; fields it lacks keep their current values.
    /// Delimiters around the payload are optional.
    ///
    /// # Errors
    ///
    /// Codec failures, or a merged value that does not fit `T`. Nothing
    /// changes in either case.
    #[instrument(skip_all)]
    pub fn import_state(&mut self, serialized: &str) -> Result<()> {
        let decoded =
            codec::decode_state(self.codec.as_ref(), serialized, self.config.delimiter())?;
        let merged = match (serde_json::to_value(self.current_state())?, decoded) {
            (Value::Object(mut base), Value::Object(patch)) => {
                base.extend(patch);
                Value::Object(base)
            }
            (_, whole) => whole,
        };
        let foreign: T = serde_json::from_value(merged)?;
        let next = graph::import_state(
            &self.graph,
            &self.initial,
            foreign,
            &self.config.import_label,
            self.stamper.as_mut(),
        )?;
        self.commit(next)
    }

    /// Encodes the whole graph as JSON.
    ///
    /// # Errors
    ///
    /// Serialization failures.
    pub fn export_provenance_graph(&self) -> Result<String> {
        self.graph.to_json()
    }

    /// Replaces the live graph with a previously exported one.
    ///
    /// The import baseline stays the state the session was created with.
    /// Observers see the change from the old current state to the loaded
    /// current state.
    ///
    /// # Errors
    ///
    /// Malformed or structurally invalid graphs; the session is unchanged.
    #[instrument(skip_all)]
    pub fn import_provenance_graph(&mut self, serialized: &str) -> Result<()> {
        let next: ProvenanceGraph<T, A> =
            ProvenanceGraph::from_json(serialized).inspect_err(|err| {
                warn!(error = %err, "rejected provenance graph");
            })?;
        info!(nodes = next.len(), current = %next.current(), "imported provenance graph");
        self.commit(next)
    }

    /// Finishes setup. Seeds the session from the ambient location when
    /// `load_from_location` is configured; otherwise does nothing.
    ///
    /// # Errors
    ///
    /// See [`Provenance::load_from_location`].
    pub fn done(&mut self) -> Result<()> {
        if self.config.load_from_location {
            self.load_from_location()
        } else {
            Ok(())
        }
    }

    /// Imports the state embedded in the ambient location, if any.
    ///
    /// A location without the delimiter is left alone.
    ///
    /// # Errors
    ///
    /// - [`ProvenanceError::EnvironmentUnavailable`] when no location source
    ///   is set or it reports none.
    /// - Any [`Provenance::import_state`] failure.
    #[instrument(skip(self))]
    pub fn load_from_location(&mut self) -> Result<()> {
        let location = self
            .location
            .as_ref()
            .and_then(|source| source.current_location())
            .ok_or(ProvenanceError::EnvironmentUnavailable)?;
        if !codec::has_delimiter(&location, self.config.delimiter()) {
            debug!("location carries no embedded state");
            return Ok(());
        }
        info!("seeding session from location");
        self.import_state(&location).inspect_err(|err| {
            warn!(error = %err, "rejected embedded state");
        })
    }

    // Swaps in `next`, then dispatches the current-state diff to observers.
    fn commit(&mut self, next: ProvenanceGraph<T, A>) -> Result<()> {
        let diffs = diff_states(
            self.graph.current_node().state(),
            next.current_node().state(),
        )?;
        debug!(
            from = %self.graph.current(),
            to = %next.current(),
            nodes = next.len(),
            diffs = diffs.len(),
            "committed transition"
        );
        self.graph = next;
        self.events.dispatch(self.graph.current_node().state(), &diffs)
    }
}

// Top-level fields of `current` that differ from `initial`. Non-object states
// are exported whole.
fn changed_fields(initial: &Value, current: Value) -> Value {
    match (initial, current) {
        (Value::Object(before), Value::Object(after)) => Value::Object(
            after
                .into_iter()
                .filter(|(key, value)| before.get(key) != Some(value))
                .collect(),
        ),
        (_, whole) => whole,
    }
}
