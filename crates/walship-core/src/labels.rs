//! Labelled Series Identity
//!
//! This module defines the `Labels` type - the identity of a time series as
//! declared in the WAL.
//!
//! ## What are Labels?
//! A series is identified by an ordered sequence of name/value pairs, e.g.
//! `{__name__="http_requests_total", job="api", instance="10.0.1.5:8080"}`.
//! The reserved name `__name__` carries the metric identifier; all other
//! pairs qualify the series.
//!
//! ## Design Decisions
//! - Order is preserved exactly as written by the producer; the forwarder
//!   never re-sorts labels on the sample path.
//! - Implements `Serialize`/`Deserialize` so outbound metrics can be
//!   emitted as JSON lines by the sidecar appender.
//! - Equality is positional, matching the producer's contract that a live
//!   ref's labels never change.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved label name carrying the metric identifier.
pub const METRIC_NAME_LABEL: &str = "__name__";

/// A single name/value pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An ordered sequence of labels identifying one series.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Labels(pub Vec<Label>);

impl Labels {
    pub fn new(labels: Vec<Label>) -> Self {
        Self(labels)
    }

    /// Build labels from `(name, value)` pairs, preserving the given order.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(n, v)| Label::new(*n, *v))
                .collect(),
        )
    }

    /// Value of the label with the given name, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.value.as_str())
    }

    /// The metric identifier carried by the reserved `__name__` label.
    pub fn metric_name(&self) -> Option<&str> {
        self.get(METRIC_NAME_LABEL)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Label> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Labels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, l) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={:?}", l.name, l.value)?;
        }
        write!(f, "}}")
    }
}

impl IntoIterator for Labels {
    type Item = Label;
    type IntoIter = std::vec::IntoIter<Label>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Labels {
    type Item = &'a Label;
    type IntoIter = std::slice::Iter<'a, Label>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
