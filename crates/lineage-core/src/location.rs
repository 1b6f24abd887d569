// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Ambient location port used to seed a session from an embedded export.

/// Supplies the current addressable location (for example a page URL).
pub trait LocationSource: Send {
    /// The location string, or `None` when the environment has none.
    fn current_location(&self) -> Option<String>;
}

/// A location fixed at construction time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FixedLocation(
    /// The reported location.
    pub Option<String>,
);

impl FixedLocation {
    /// A source that always reports `location`.
    pub fn new(location: impl Into<String>) -> Self {
        Self(Some(location.into()))
    }

    /// A source with no addressable location.
    pub fn unavailable() -> Self {
        Self(None)
    }
}

impl LocationSource for FixedLocation {
    fn current_location(&self) -> Option<String> {
        self.0.clone()
    }
}

impl<F> LocationSource for F
where
    F: Fn() -> Option<String> + Send,
{
    fn current_location(&self) -> Option<String> {
        self()
    }
}
