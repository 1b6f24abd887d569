// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Structural diff over the generic JSON value tree.
//!
//! States of any shape are lowered to [`serde_json::Value`] and compared
//! recursively. The result is an ordered list of [`Diff`] entries, each
//! naming the path at which the two values disagree.
//!
//! # Ordering
//!
//! Objects are walked over the *new* value's keys first (recursing into
//! shared keys, emitting [`Diff::Added`] for new ones), then over the old
//! value's remaining keys (emitting [`Diff::Removed`]). Arrays are walked by
//! index the same way. Key order follows the map iteration order of
//! `serde_json::Map`, so identical inputs always produce identical output.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One step of a path into a state value.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Object property.
    Key(String),
    /// Array position.
    Index(usize),
}

impl PathSegment {
    /// Returns `true` when this segment addresses the property named `key`.
    ///
    /// Array positions match their decimal spelling, so `"0"` matches
    /// `Index(0)`.
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::Key(k) => k == key,
            Self::Index(i) => key.parse::<usize>().is_ok_and(|parsed| parsed == *i),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(k) => f.write_str(k),
            Self::Index(i) => write!(f, "{i}"),
        }
    }
}

/// A single difference between two state values.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diff {
    /// `path` exists only in the new value.
    Added {
        /// Location of the new value.
        path: Vec<PathSegment>,
        /// The value that appeared.
        new: Value,
    },
    /// `path` exists only in the old value.
    Removed {
        /// Location of the removed value.
        path: Vec<PathSegment>,
        /// The value that disappeared.
        old: Value,
    },
    /// `path` exists in both values with different contents.
    Changed {
        /// Location of the change.
        path: Vec<PathSegment>,
        /// Value before.
        old: Value,
        /// Value after.
        new: Value,
    },
}

impl Diff {
    /// Returns the path this entry refers to.
    pub fn path(&self) -> &[PathSegment] {
        match self {
            Self::Added { path, .. } | Self::Removed { path, .. } | Self::Changed { path, .. } => {
                path
            }
        }
    }

    /// Returns `true` when this entry affects the value at `observed`.
    ///
    /// That is the case when the entry sits at or beneath `observed`, or at
    /// an ancestor of it (the subtree holding `observed` was replaced).
    ///
    /// Ancestor matches are reported even when the value at `observed` comes
    /// out equal: replacing `{"a": [1]}` with `{"a": {"0": 1}}` is a single
    /// change at `a`, so an observer on `a.0` is notified although reading
    /// `a.0` yields `1` both before and after.
    pub fn touches<S: AsRef<str>>(&self, observed: &[S]) -> bool {
        self.path()
            .iter()
            .zip(observed)
            .all(|(segment, key)| segment.matches(key.as_ref()))
    }

    /// Renders the path as a dotted string (`user.todos.0`).
    pub fn dotted_path(&self) -> String {
        let parts: Vec<String> = self.path().iter().map(ToString::to_string).collect();
        parts.join(".")
    }
}

/// Computes the differences between `old` and `new`.
///
/// Equal values yield an empty list. Neither input is modified.
pub fn diff(old: &Value, new: &Value) -> Vec<Diff> {
    let mut out = Vec::new();
    let mut path = Vec::new();
    walk(old, new, &mut path, &mut out);
    out
}

/// Lowers both states to JSON values and diffs them.
///
/// # Errors
///
/// Fails when either state cannot be represented as a JSON value (for
/// example a map with non-string keys).
pub fn diff_states<T: Serialize>(old: &T, new: &T) -> Result<Vec<Diff>, serde_json::Error> {
    let old = serde_json::to_value(old)?;
    let new = serde_json::to_value(new)?;
    Ok(diff(&old, &new))
}

fn walk(old: &Value, new: &Value, path: &mut Vec<PathSegment>, out: &mut Vec<Diff>) {
    match (old, new) {
        (Value::Object(before), Value::Object(after)) => {
            for (key, next) in after {
                path.push(PathSegment::Key(key.clone()));
                match before.get(key) {
                    Some(prev) => walk(prev, next, path, out),
                    None => out.push(Diff::Added {
                        path: path.clone(),
                        new: next.clone(),
                    }),
                }
                path.pop();
            }
            for (key, prev) in before {
                if !after.contains_key(key) {
                    path.push(PathSegment::Key(key.clone()));
                    out.push(Diff::Removed {
                        path: path.clone(),
                        old: prev.clone(),
                    });
                    path.pop();
                }
            }
        }
        (Value::Array(before), Value::Array(after)) => {
            for (idx, next) in after.iter().enumerate() {
                path.push(PathSegment::Index(idx));
                match before.get(idx) {
                    Some(prev) => walk(prev, next, path, out),
                    None => out.push(Diff::Added {
                        path: path.clone(),
                        new: next.clone(),
                    }),
                }
                path.pop();
            }
            for (idx, prev) in before.iter().enumerate().skip(after.len()) {
                path.push(PathSegment::Index(idx));
                out.push(Diff::Removed {
                    path: path.clone(),
                    old: prev.clone(),
                });
                path.pop();
            }
        }
        _ if old == new => {}
        _ => out.push(Diff::Changed {
            path: path.clone(),
            old: old.clone(),
            new: new.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;
    use serde_json::json;

    fn key(k: &str) -> PathSegment {
        PathSegment::Key(k.to_owned())
    }

    #[test]
    fn equal_values_have_no_diff() {
        let v = json!({"a": {"b": [1, 2, {"c": null}]}, "d": "x"});
        assert!(diff(&v, &v).is_empty());
    }

    #[test]
    fn scalar_change_is_reported_at_its_path() {
        let d = diff(&json!({"counter": 0}), &json!({"counter": 1}));
        assert_eq!(
            d,
            vec![Diff::Changed {
                path: vec![key("counter")],
                old: json!(0),
                new: json!(1),
            }]
        );
    }

    #[test]
    fn added_and_removed_keys() {
        let d = diff(&json!({"a": 1, "gone": true}), &json!({"a": 1, "fresh": "y"}));
        assert_eq!(
            d,
            vec![
                Diff::Added {
                    path: vec![key("fresh")],
                    new: json!("y"),
                },
                Diff::Removed {
                    path: vec![key("gone")],
                    old: json!(true),
                },
            ]
        );
    }

    #[test]
    fn arrays_are_compared_by_index() {
        let d = diff(&json!({"xs": [1, 2, 3]}), &json!({"xs": [1, 5]}));
        assert_eq!(
            d,
            vec![
                Diff::Changed {
                    path: vec![key("xs"), PathSegment::Index(1)],
                    old: json!(2),
                    new: json!(5),
                },
                Diff::Removed {
                    path: vec![key("xs"), PathSegment::Index(2)],
                    old: json!(3),
                },
            ]
        );

        let grown = diff(&json!([]), &json!([{"k": 1}]));
        assert_eq!(
            grown,
            vec![Diff::Added {
                path: vec![PathSegment::Index(0)],
                new: json!({"k": 1}),
            }]
        );
    }

    #[test]
    fn type_mismatch_is_a_change_of_the_whole_subtree() {
        let d = diff(&json!({"a": [1]}), &json!({"a": {"0": 1}}));
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].path(), &[key("a")]);
        assert!(matches!(d[0], Diff::Changed { .. }));
    }

    #[test]
    fn root_level_replacement_has_empty_path() {
        let d = diff(&json!(1), &json!("one"));
        assert_eq!(d.len(), 1);
        assert!(d[0].path().is_empty());
        assert_eq!(d[0].dotted_path(), "");
    }

    #[test]
    fn touches_descendants_and_ancestors_only() {
        let nested = Diff::Changed {
            path: vec![key("a"), key("b"), key("c")],
            old: json!(1),
            new: json!(2),
        };
        assert!(nested.touches(&["a"]));
        assert!(nested.touches(&["a", "b"]));
        assert!(nested.touches(&["a", "b", "c"]));
        assert!(!nested.touches(&["a", "x"]));
        assert!(!nested.touches(&["c"]));

        let replaced_parent = Diff::Added {
            path: vec![key("a")],
            new: json!({"b": 1}),
        };
        assert!(replaced_parent.touches(&["a", "b"]));
    }

    #[test]
    fn container_kind_change_touches_paths_beneath_it() {
        let d = diff(&json!({"a": [1]}), &json!({"a": {"0": 1}}));
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].dotted_path(), "a");
        assert!(d[0].touches(&["a", "0"]));
    }

    #[test]
    fn index_segments_match_numeric_keys() {
        let d = Diff::Removed {
            path: vec![key("todos"), PathSegment::Index(3)],
            old: json!(null),
        };
        assert!(d.touches(&["todos", "3"]));
        assert!(!d.touches(&["todos", "2"]));
        assert_eq!(d.dotted_path(), "todos.3");
    }

    #[test]
    fn diff_serializes_with_kind_tag() {
        let d = Diff::Changed {
            path: vec![key("xs"), PathSegment::Index(0)],
            old: json!(0),
            new: json!(1),
        };
        let encoded = serde_json::to_value(&d).unwrap();
        assert_eq!(
            encoded,
            json!({"kind": "changed", "path": ["xs", 0], "old": 0, "new": 1})
        );
        let decoded: Diff = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, d);
    }

    #[test]
    fn diff_states_lowers_serializable_types() {
        #[derive(Serialize)]
        struct Counter {
            counter: i64,
        }
        let d = diff_states(&Counter { counter: 0 }, &Counter { counter: 1 }).unwrap();
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].dotted_path(), "counter");
    }
}
