// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Provenance graph container and the pure functions that evolve it.
//!
//! Every function here takes a graph by reference and returns a new graph;
//! the argument is never altered. A failed call therefore leaves nothing to
//! roll back: the caller simply keeps the graph it already had.
//!
//! # Invariants
//!
//! - `root` names a [`ProvenanceNode::Root`] and it is the only root.
//! - Every state node's parent exists and lists it among its children.
//! - Every node is reachable from the root; no node has two parents.
//! - `current` names an existing node.
//!
//! Graphs built through this module uphold these by construction. Graphs
//! decoded from text are checked by [`ProvenanceGraph::validate`] before
//! they are handed out.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::action::Action;
use crate::diff::diff_states;
use crate::error::{NavigationError, ProvenanceError, Result};
use crate::ident::{NodeId, Stamper};
use crate::node::{
    Annotation, NodeMetadata, PartialArtifacts, ProvenanceNode, RootNode, StateNode,
};

/// Event kind recorded on the root node.
pub const ROOT_KIND: &str = "Root";

/// Tree of recorded states with a cursor at the current one.
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct ProvenanceGraph<T, A> {
    nodes: BTreeMap<NodeId, ProvenanceNode<T, A>>,
    root: NodeId,
    current: NodeId,
}

// Wire shape of a graph before its invariants have been checked.
#[derive(Deserialize)]
struct GraphRecord<T, A> {
    nodes: BTreeMap<NodeId, ProvenanceNode<T, A>>,
    root: NodeId,
    current: NodeId,
}

impl<T, A> From<GraphRecord<T, A>> for ProvenanceGraph<T, A> {
    fn from(record: GraphRecord<T, A>) -> Self {
        Self {
            nodes: record.nodes,
            root: record.root,
            current: record.current,
        }
    }
}

impl<'de, T, A> Deserialize<'de> for ProvenanceGraph<T, A>
where
    T: Deserialize<'de>,
    A: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let graph = Self::from(GraphRecord::<T, A>::deserialize(deserializer)?);
        graph.validate().map_err(serde::de::Error::custom)?;
        Ok(graph)
    }
}

impl<T, A> ProvenanceGraph<T, A> {
    /// All nodes keyed by id.
    pub fn nodes(&self) -> &BTreeMap<NodeId, ProvenanceNode<T, A>> {
        &self.nodes
    }

    /// Id of the root node.
    pub fn root(&self) -> &NodeId {
        &self.root
    }

    /// Id of the current node.
    pub fn current(&self) -> &NodeId {
        &self.current
    }

    /// Number of recorded nodes (root included).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A graph always holds its root, so it is never empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Looks up a node.
    pub fn node(&self, id: &NodeId) -> Option<&ProvenanceNode<T, A>> {
        self.nodes.get(id)
    }

    /// Looks up a node.
    ///
    /// # Errors
    ///
    /// [`ProvenanceError::UnknownNode`] if `id` is not in the graph.
    pub fn get(&self, id: &NodeId) -> Result<&ProvenanceNode<T, A>> {
        self.nodes
            .get(id)
            .ok_or_else(|| ProvenanceError::UnknownNode(id.clone()))
    }

    /// The node under the cursor.
    pub fn current_node(&self) -> &ProvenanceNode<T, A> {
        &self.nodes[&self.current]
    }

    /// The root node.
    pub fn root_node(&self) -> &ProvenanceNode<T, A> {
        &self.nodes[&self.root]
    }

    /// Ids from the root down to `id`, both inclusive.
    ///
    /// # Errors
    ///
    /// [`ProvenanceError::UnknownNode`] if `id` or one of its ancestors is
    /// missing.
    pub fn path_from_root(&self, id: &NodeId) -> Result<Vec<NodeId>> {
        let mut path = Vec::new();
        let mut cursor = Some(id.clone());
        while let Some(at) = cursor {
            let node = self.get(&at)?;
            cursor = node.parent().cloned();
            path.push(at);
            if path.len() > self.nodes.len() {
                return Err(ProvenanceError::CorruptGraph(format!(
                    "parent chain from {id} does not terminate"
                )));
            }
        }
        path.reverse();
        Ok(path)
    }

    /// Checks every structural invariant.
    ///
    /// # Errors
    ///
    /// Returns [`ProvenanceError::CorruptGraph`] describing the first
    /// violation found.
    pub fn validate(&self) -> Result<()> {
        let corrupt = |msg: String| Err(ProvenanceError::CorruptGraph(msg));

        match self.nodes.get(&self.root) {
            Some(ProvenanceNode::Root(_)) => {}
            Some(ProvenanceNode::State(_)) => {
                return corrupt(format!("root {} is not a root node", self.root))
            }
            None => return corrupt(format!("root {} is missing", self.root)),
        }
        if !self.nodes.contains_key(&self.current) {
            return corrupt(format!("current {} is missing", self.current));
        }

        for (key, node) in &self.nodes {
            if key != node.id() {
                return corrupt(format!("node stored under {key} has id {}", node.id()));
            }
            match node {
                ProvenanceNode::Root(_) if *key != self.root => {
                    return corrupt(format!("second root node {key}"));
                }
                ProvenanceNode::Root(_) => {}
                ProvenanceNode::State(state) => match self.nodes.get(&state.parent) {
                    Some(parent) if parent.children().contains(key) => {}
                    Some(_) => {
                        return corrupt(format!(
                            "parent {} does not list child {key}",
                            state.parent
                        ))
                    }
                    None => return corrupt(format!("parent {} of {key} is missing", state.parent)),
                },
            }
            for child in node.children() {
                match self.nodes.get(child).and_then(ProvenanceNode::parent) {
                    Some(parent) if parent == key => {}
                    _ => return corrupt(format!("child {child} of {key} does not point back")),
                }
            }
        }

        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([&self.root]);
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                return corrupt(format!("node {id} is reachable twice"));
            }
            if let Some(node) = self.nodes.get(id) {
                queue.extend(node.children());
            }
        }
        if seen.len() != self.nodes.len() {
            return corrupt(format!(
                "{} node(s) unreachable from root",
                self.nodes.len() - seen.len()
            ));
        }
        Ok(())
    }

    fn get_mut(&mut self, id: &NodeId) -> Result<&mut ProvenanceNode<T, A>> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| ProvenanceError::UnknownNode(id.clone()))
    }

    // Registers `node` under the current node and moves the cursor to it.
    fn attach(&mut self, node: StateNode<T, A>) -> Result<()> {
        let id = node.id.clone();
        self.get_mut(&node.parent)?.children_mut().push(id.clone());
        self.nodes.insert(id.clone(), ProvenanceNode::State(node));
        self.current = id;
        Ok(())
    }
}

impl<T: Serialize, A: Serialize> ProvenanceGraph<T, A> {
    /// Encodes the whole graph (node table, root id, current id) as JSON.
    ///
    /// # Errors
    ///
    /// [`ProvenanceError::Serialization`] if a state or annotation cannot be
    /// serialized.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl<T: DeserializeOwned, A: DeserializeOwned> ProvenanceGraph<T, A> {
    /// Decodes a graph produced by [`ProvenanceGraph::to_json`].
    ///
    /// # Errors
    ///
    /// - [`ProvenanceError::Serialization`] for malformed JSON or node data.
    /// - [`ProvenanceError::CorruptGraph`] when the structure is invalid.
    pub fn from_json(text: &str) -> Result<Self> {
        let record: GraphRecord<T, A> = serde_json::from_str(text)?;
        let graph = Self::from(record);
        graph.validate()?;
        Ok(graph)
    }
}

/// Builds a graph holding only the root node.
pub fn create_graph<T, A>(
    initial: T,
    label: &str,
    stamper: &mut dyn Stamper,
) -> ProvenanceGraph<T, A> {
    let root = RootNode {
        id: stamper.next_id(),
        label: label.to_owned(),
        metadata: NodeMetadata::stamped(stamper.now()).with_kind(ROOT_KIND),
        children: Vec::new(),
        state: initial,
    };
    let id = root.id.clone();
    ProvenanceGraph {
        nodes: BTreeMap::from([(id.clone(), ProvenanceNode::Root(root))]),
        root: id.clone(),
        current: id,
    }
}

/// Runs `action` against a copy of the current state and records the result
/// as a new child of the current node.
///
/// # Errors
///
/// - [`ProvenanceError::Action`] if the transform fails; no node is created.
/// - [`ProvenanceError::Serialization`] if either state cannot be diffed.
pub fn apply_action<T, A>(
    graph: &ProvenanceGraph<T, A>,
    action: Action<'_, T, A>,
    stamper: &mut dyn Stamper,
) -> Result<ProvenanceGraph<T, A>>
where
    T: Clone + Serialize,
    A: Clone,
{
    let parent = graph.current_node();
    let (outcome, record) = action.run(parent.state().clone());
    let state = outcome.map_err(ProvenanceError::Action)?;
    let diffs = diff_states(parent.state(), &state)?;

    let mut metadata = NodeMetadata::stamped(stamper.now());
    metadata.merge(record.metadata);
    let node = StateNode {
        id: stamper.next_id(),
        label: record.label,
        metadata,
        children: Vec::new(),
        state,
        parent: graph.current.clone(),
        artifacts: record.artifacts.resolve(diffs),
    };
    debug!(
        node = %node.id,
        label = %node.label,
        diffs = node.artifacts.diffs.len(),
        "recorded action"
    );

    let mut next = graph.clone();
    next.attach(node)?;
    Ok(next)
}

/// Moves the cursor to `id`.
///
/// # Errors
///
/// [`ProvenanceError::UnknownNode`] if `id` is not in the graph.
pub fn go_to_node<T: Clone, A: Clone>(
    graph: &ProvenanceGraph<T, A>,
    id: &NodeId,
) -> Result<ProvenanceGraph<T, A>> {
    graph.get(id)?;
    let mut next = graph.clone();
    next.current = id.clone();
    Ok(next)
}

/// Moves the cursor to the current node's parent.
///
/// # Errors
///
/// [`NavigationError::AtRoot`] when the cursor is on the root.
pub fn go_back_one_step<T: Clone, A: Clone>(
    graph: &ProvenanceGraph<T, A>,
) -> Result<ProvenanceGraph<T, A>> {
    go_back_n_steps(graph, 1).map_err(|err| match err {
        ProvenanceError::InvalidNavigation(NavigationError::NotEnoughHistory { .. }) => {
            NavigationError::AtRoot.into()
        }
        other => other,
    })
}

/// Moves the cursor `n` parents up.
///
/// The walk runs on a private copy; if the root is reached early the error
/// reports how many steps were possible and the input graph is untouched.
///
/// # Errors
///
/// [`NavigationError::NotEnoughHistory`] when fewer than `n` ancestors exist.
pub fn go_back_n_steps<T: Clone, A: Clone>(
    graph: &ProvenanceGraph<T, A>,
    n: usize,
) -> Result<ProvenanceGraph<T, A>> {
    let mut next = graph.clone();
    for step in 0..n {
        let parent = next.current_node().parent().cloned();
        match parent {
            Some(parent) => next.current = parent,
            None => {
                return Err(NavigationError::NotEnoughHistory {
                    requested: n,
                    reached: step,
                }
                .into())
            }
        }
    }
    Ok(next)
}

/// Moves the cursor to the most recently added child of the current node.
///
/// # Errors
///
/// [`NavigationError::NoChildren`] when the current node is a leaf.
pub fn go_forward_one_step<T: Clone, A: Clone>(
    graph: &ProvenanceGraph<T, A>,
) -> Result<ProvenanceGraph<T, A>> {
    let latest = graph
        .current_node()
        .children()
        .last()
        .cloned()
        .ok_or(NavigationError::NoChildren)?;
    go_to_node(graph, &latest)
}

/// Moves the cursor to the root.
pub fn reset<T: Clone, A: Clone>(graph: &ProvenanceGraph<T, A>) -> ProvenanceGraph<T, A> {
    let mut next = graph.clone();
    next.current = graph.root.clone();
    next
}

/// Records `foreign` as a new child of the current node.
///
/// The stored diff is taken against `baseline` (the session's initial
/// state), not against the parent, so the node describes everything the
/// imported state changes relative to the start of the session.
///
/// # Errors
///
/// [`ProvenanceError::Serialization`] if either state cannot be diffed.
pub fn import_state<T, A>(
    graph: &ProvenanceGraph<T, A>,
    baseline: &T,
    foreign: T,
    label: &str,
    stamper: &mut dyn Stamper,
) -> Result<ProvenanceGraph<T, A>>
where
    T: Clone + Serialize,
    A: Clone,
{
    let diffs = diff_states(baseline, &foreign)?;
    let node = StateNode {
        id: stamper.next_id(),
        label: label.to_owned(),
        metadata: NodeMetadata::stamped(stamper.now()),
        children: Vec::new(),
        state: foreign,
        parent: graph.current.clone(),
        artifacts: PartialArtifacts::default().resolve(diffs),
    };
    debug!(node = %node.id, diffs = node.artifacts.diffs.len(), "recorded imported state");

    let mut next = graph.clone();
    next.attach(node)?;
    Ok(next)
}

/// Appends a timestamped annotation to a state node.
///
/// # Errors
///
/// - [`ProvenanceError::UnknownNode`] if `id` is not in the graph.
/// - [`ProvenanceError::RootArtifact`] if `id` is the root.
pub fn add_extra_to_node_artifact<T: Clone, A: Clone>(
    graph: &ProvenanceGraph<T, A>,
    id: &NodeId,
    extra: A,
    stamper: &dyn Stamper,
) -> Result<ProvenanceGraph<T, A>> {
    let mut next = graph.clone();
    let node = next
        .get_mut(id)?
        .as_state_mut()
        .ok_or_else(|| ProvenanceError::RootArtifact(id.clone()))?;
    node.artifacts.extra.push(Annotation {
        time: stamper.now(),
        value: extra,
    });
    Ok(next)
}

/// Returns the annotations attached to a state node, oldest first.
///
/// # Errors
///
/// - [`ProvenanceError::UnknownNode`] if `id` is not in the graph.
/// - [`ProvenanceError::RootArtifact`] if `id` is the root.
pub fn get_extra_from_artifact<'g, T, A>(
    graph: &'g ProvenanceGraph<T, A>,
    id: &NodeId,
) -> Result<&'g [Annotation<A>]> {
    graph
        .get(id)?
        .artifacts()
        .map(|artifacts| artifacts.extra.as_slice())
        .ok_or_else(|| ProvenanceError::RootArtifact(id.clone()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::diff::{Diff, PathSegment};
    use crate::ident::Timestamp;
    use serde_json::{json, Value};

    #[derive(Default)]
    struct Counter(u64);

    impl Stamper for Counter {
        fn next_id(&mut self) -> NodeId {
            self.0 += 1;
            NodeId::new(format!("n{}", self.0))
        }

        fn now(&self) -> Timestamp {
            1_000 + self.0
        }
    }

    type Graph = ProvenanceGraph<Value, String>;

    fn set_counter(value: i64) -> Action<'static, Value, String> {
        Action::from_fn(format!("set {value}"), move |mut s: Value| {
            s["counter"] = json!(value);
            s
        })
    }

    fn fresh(stamper: &mut Counter) -> Graph {
        create_graph(json!({"counter": 0}), "Root", stamper)
    }

    #[test]
    fn create_graph_has_single_root_as_current() {
        let mut stamper = Counter::default();
        let graph = fresh(&mut stamper);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.root(), graph.current());
        let root = graph.root_node();
        assert!(root.is_root());
        assert_eq!(root.metadata().kind.as_deref(), Some(ROOT_KIND));
        graph.validate().unwrap();
    }

    #[test]
    fn apply_action_links_new_node_under_current() {
        let mut stamper = Counter::default();
        let graph = fresh(&mut stamper);
        let next = apply_action(&graph, set_counter(1), &mut stamper).unwrap();

        assert_eq!(graph.len(), 1, "input graph untouched");
        assert_eq!(next.len(), 2);
        let node = next.current_node();
        assert_eq!(node.parent(), Some(graph.root()));
        assert_eq!(node.label(), "set 1");
        assert_eq!(
            node.artifacts().unwrap().diffs,
            vec![Diff::Changed {
                path: vec![PathSegment::Key("counter".into())],
                old: json!(0),
                new: json!(1),
            }]
        );
        assert_eq!(
            next.root_node().children(),
            std::slice::from_ref(next.current())
        );
        next.validate().unwrap();
    }

    #[test]
    fn failing_action_produces_no_graph() {
        let mut stamper = Counter::default();
        let graph = fresh(&mut stamper);
        let action: Action<'_, Value, String> = Action::new("fail", |_, _| Err("nope".into()));
        let err = apply_action(&graph, action, &mut stamper).unwrap_err();
        assert!(matches!(err, ProvenanceError::Action(_)));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn navigation_moves_only_the_cursor() {
        let mut stamper = Counter::default();
        let g0 = fresh(&mut stamper);
        let g1 = apply_action(&g0, set_counter(1), &mut stamper).unwrap();
        let g2 = apply_action(&g1, set_counter(2), &mut stamper).unwrap();

        let back = go_back_one_step(&g2).unwrap();
        assert_eq!(back.current(), g1.current());
        assert_eq!(back.nodes(), g2.nodes());

        let root = go_back_n_steps(&g2, 2).unwrap();
        assert_eq!(root.current(), g2.root());

        let err = go_back_n_steps(&g2, 3).unwrap_err();
        assert!(matches!(
            err,
            ProvenanceError::InvalidNavigation(NavigationError::NotEnoughHistory {
                requested: 3,
                reached: 2
            })
        ));

        let err = go_back_one_step(&reset(&g2)).unwrap_err();
        assert!(matches!(
            err,
            ProvenanceError::InvalidNavigation(NavigationError::AtRoot)
        ));

        let err = go_forward_one_step(&g2).unwrap_err();
        assert!(matches!(
            err,
            ProvenanceError::InvalidNavigation(NavigationError::NoChildren)
        ));

        assert!(matches!(
            go_to_node(&g2, &NodeId::from("missing")),
            Err(ProvenanceError::UnknownNode(_))
        ));
    }

    #[test]
    fn forward_prefers_latest_branch() {
        let mut stamper = Counter::default();
        let g0 = fresh(&mut stamper);
        let first = apply_action(&g0, set_counter(1), &mut stamper).unwrap();
        let at_root = reset(&first);
        let second = apply_action(&at_root, set_counter(5), &mut stamper).unwrap();

        let forward = go_forward_one_step(&reset(&second)).unwrap();
        assert_eq!(forward.current(), second.current());
        assert_eq!(forward.root_node().children().len(), 2);
        second.validate().unwrap();
    }

    #[test]
    fn import_state_diffs_against_baseline_not_parent() {
        let mut stamper = Counter::default();
        let g0 = fresh(&mut stamper);
        let g1 = apply_action(&g0, set_counter(1), &mut stamper).unwrap();
        let baseline = json!({"counter": 0});

        let imported =
            import_state(&g1, &baseline, json!({"counter": 1}), "Imported state", &mut stamper)
                .unwrap();
        let node = imported.current_node();
        assert_eq!(node.parent(), Some(g1.current()));
        assert_eq!(node.label(), "Imported state");
        // Against the parent there would be no difference at all.
        assert_eq!(node.artifacts().unwrap().diffs.len(), 1);
    }

    #[test]
    fn annotations_append_and_root_is_rejected() {
        let mut stamper = Counter::default();
        let g0 = fresh(&mut stamper);
        let g1 = apply_action(&g0, set_counter(1), &mut stamper).unwrap();
        let id = g1.current().clone();

        assert!(get_extra_from_artifact(&g1, &id).unwrap().is_empty());
        let g2 = add_extra_to_node_artifact(&g1, &id, "first".to_owned(), &stamper).unwrap();
        let g3 = add_extra_to_node_artifact(&g2, &id, "second".to_owned(), &stamper).unwrap();
        let notes: Vec<&str> = get_extra_from_artifact(&g3, &id)
            .unwrap()
            .iter()
            .map(|a| a.value.as_str())
            .collect();
        assert_eq!(notes, ["first", "second"]);
        assert!(get_extra_from_artifact(&g1, &id).unwrap().is_empty());

        let root = g3.root().clone();
        assert!(matches!(
            add_extra_to_node_artifact(&g3, &root, "x".to_owned(), &stamper),
            Err(ProvenanceError::RootArtifact(_))
        ));
        assert!(matches!(
            get_extra_from_artifact(&g3, &root),
            Err(ProvenanceError::RootArtifact(_))
        ));
    }

    #[test]
    fn path_from_root_walks_parents() {
        let mut stamper = Counter::default();
        let g0 = fresh(&mut stamper);
        let g1 = apply_action(&g0, set_counter(1), &mut stamper).unwrap();
        let g2 = apply_action(&g1, set_counter(2), &mut stamper).unwrap();
        let path = g2.path_from_root(g2.current()).unwrap();
        assert_eq!(path, vec![g0.current().clone(), g1.current().clone(), g2.current().clone()]);
    }

    #[test]
    fn decoding_rejects_broken_graphs() {
        let mut stamper = Counter::default();
        let g0 = fresh(&mut stamper);
        let g1 = apply_action(&g0, set_counter(1), &mut stamper).unwrap();
        let mut raw = serde_json::to_value(&g1).unwrap();

        let ok: Graph = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(ok, g1);

        raw["current"] = json!("ghost");
        let err = serde_json::from_value::<Graph>(raw.clone()).unwrap_err();
        assert!(err.to_string().contains("current ghost is missing"));

        raw["current"] = json!(g1.current().as_str());
        let root_id = g1.root().as_str().to_owned();
        raw["nodes"][&root_id]["children"] = json!([]);
        let err = serde_json::from_value::<Graph>(raw).unwrap_err();
        assert!(err.to_string().contains("does not list child"));
    }
}
