// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Replay scripts: a JSON initial state plus a list of steps run against a
//! live session.
//!
//! ```json
//! {
//!   "initial": { "counter": 0 },
//!   "steps": [
//!     { "op": "set", "path": ["counter"], "value": 1 },
//!     { "op": "back" },
//!     { "op": "set", "path": ["counter"], "value": 2, "label": "branch" },
//!     { "op": "annotate", "note": "second branch" },
//!     { "op": "goto", "node": 1 }
//!   ]
//! }
//! ```
//!
//! `goto` addresses nodes by creation order: `0` is the root, `1` the first
//! node a step created, and so on.

use anyhow::{anyhow, Context, Result};
use lineage_core::{codec, Action, DeflateCodec, NodeId, Provenance, ProvenanceConfig};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// A parsed replay script.
#[derive(Debug, Deserialize)]
pub struct Script {
    /// State the session starts from.
    pub initial: Value,
    /// Steps in execution order.
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One scripted operation.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Writes `value` at `path`, creating missing object keys.
    Set {
        /// Object keys or array indices from the state root.
        path: Vec<String>,
        /// Value written at `path`.
        value: Value,
        /// Node label; defaults to `set <dotted path>`.
        #[serde(default)]
        label: Option<String>,
    },
    /// Deletes the object key or array element at `path`.
    Remove {
        /// Object keys or array indices from the state root.
        path: Vec<String>,
        /// Node label; defaults to `remove <dotted path>`.
        #[serde(default)]
        label: Option<String>,
    },
    /// Moves the cursor back `steps` times (default one).
    Back {
        /// Number of single steps.
        #[serde(default = "one")]
        steps: usize,
    },
    /// Follows the newest child of the current node.
    Forward,
    /// Jumps to the node created by the `node`-th step (0 is the root).
    Goto {
        /// Creation index.
        node: usize,
    },
    /// Returns to the root.
    Reset,
    /// Attaches `note` to the current node.
    Annotate {
        /// Annotation payload.
        note: Value,
    },
    /// Merges `state` over the current state via an encoded export.
    Import {
        /// Partial or whole state.
        state: Value,
    },
}

const fn one() -> usize {
    1
}

/// Runs `script` and returns the resulting session.
///
/// # Errors
///
/// The first failing step, with its index and operation as context.
pub fn replay(script: Script, config: ProvenanceConfig) -> Result<Provenance<Value, Value>> {
    let codec = config.codec();
    let delimiter = config.delimiter().to_owned();
    let mut session = Provenance::<Value, Value>::builder(script.initial)
        .config(config)
        .codec(codec)
        .build();
    let mut created: Vec<NodeId> = vec![session.root().id().clone()];

    for (index, step) in script.steps.into_iter().enumerate() {
        debug!(index, ?step, "replay step");
        let grows = matches!(
            step,
            Step::Set { .. } | Step::Remove { .. } | Step::Import { .. }
        );
        run_step(&mut session, step, &created, &codec, &delimiter)
            .with_context(|| format!("step {index} failed"))?;
        if grows {
            created.push(session.current().id().clone());
        }
    }
    Ok(session)
}

fn run_step(
    session: &mut Provenance<Value, Value>,
    step: Step,
    created: &[NodeId],
    codec: &DeflateCodec,
    delimiter: &str,
) -> Result<()> {
    match step {
        Step::Set { path, value, label } => {
            let label = label.unwrap_or_else(|| format!("set {}", path.join(".")));
            let action = Action::new(label, move |mut state: Value, _: &[Value]| {
                set_path(&mut state, &path, value)?;
                Ok(state)
            })
            .with_event_kind("Set");
            session.apply_action(action)?;
        }
        Step::Remove { path, label } => {
            let label = label.unwrap_or_else(|| format!("remove {}", path.join(".")));
            let action = Action::new(label, move |mut state: Value, _: &[Value]| {
                remove_path(&mut state, &path)?;
                Ok(state)
            })
            .with_event_kind("Remove");
            session.apply_action(action)?;
        }
        Step::Back { steps } => session.go_back_n_steps(steps)?,
        Step::Forward => session.go_forward_one_step()?,
        Step::Goto { node } => {
            let id = created
                .get(node)
                .ok_or_else(|| anyhow!("no node #{node}; {} created so far", created.len()))?;
            session.go_to_node(id)?;
        }
        Step::Reset => session.reset()?,
        Step::Annotate { note } => {
            let id = session.current().id().clone();
            session.add_extra_to_node_artifact(&id, note)?;
        }
        Step::Import { state } => {
            let exported = codec::encode_state(codec, &state, delimiter)?;
            session.import_state(&exported)?;
        }
    }
    Ok(())
}

fn set_path(state: &mut Value, path: &[String], value: Value) -> Result<(), String> {
    let Some((last, parents)) = path.split_last() else {
        *state = value;
        return Ok(());
    };
    let target = walk(state, parents, true)?;
    match target {
        Value::Object(map) => {
            map.insert(last.clone(), value);
            Ok(())
        }
        Value::Array(items) => {
            let slot = index(items, last)?;
            items[slot] = value;
            Ok(())
        }
        _ => Err(format!("cannot set `{last}` on a scalar")),
    }
}

fn remove_path(state: &mut Value, path: &[String]) -> Result<(), String> {
    let (last, parents) = path
        .split_last()
        .ok_or_else(|| "cannot remove the whole state".to_owned())?;
    match walk(state, parents, false)? {
        Value::Object(map) => map
            .remove(last)
            .map(drop)
            .ok_or_else(|| format!("no key `{last}`")),
        Value::Array(items) => {
            let slot = index(items, last)?;
            items.remove(slot);
            Ok(())
        }
        _ => Err(format!("cannot remove `{last}` from a scalar")),
    }
}

fn walk<'v>(
    mut value: &'v mut Value,
    path: &[String],
    create: bool,
) -> Result<&'v mut Value, String> {
    for key in path {
        value = match value {
            Value::Object(map) => {
                if create {
                    map.entry(key.clone())
                        .or_insert_with(|| Value::Object(serde_json::Map::new()))
                } else {
                    map.get_mut(key).ok_or_else(|| format!("no key `{key}`"))?
                }
            }
            Value::Array(items) => {
                let slot = index(items, key)?;
                &mut items[slot]
            }
            _ => return Err(format!("cannot descend into `{key}` on a scalar")),
        };
    }
    Ok(value)
}

fn index(items: &[Value], key: &str) -> Result<usize, String> {
    key.parse::<usize>()
        .ok()
        .filter(|&slot| slot < items.len())
        .ok_or_else(|| format!("`{key}` is not an index below {}", items.len()))
}

/// Parses a script from JSON text.
///
/// # Errors
///
/// Malformed JSON or unknown operations.
pub fn parse(text: &str) -> Result<Script> {
    serde_json::from_str(text).context("invalid replay script")
}
