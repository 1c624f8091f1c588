//! Dotted-path configuration trees.
//!
//! A config line `uno.build.mcu=atmega328p` is stored in a [`ConfigNode`] as
//! nested nodes `uno -> build -> mcu` holding the scalar `"atmega328p"`.
//! The raw lines are kept alongside in a [`FlatKeyMap`].
//!
//! # Examples
//!
//! ```
//! use bk_core::ConfigNode;
//!
//! let mut node = ConfigNode::new();
//! node.set_path("uno.build.mcu", "atmega328p");
//! node.set_path("uno.name", "Arduino Uno");
//!
//! assert_eq!(node.get_str("uno.build.mcu"), Some("atmega328p"));
//! assert!(node.lookup("uno.build").is_some_and(|v| v.as_node().is_some()));
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Raw `key=value` pairs of one config file, keyed by the literal key.
pub type FlatKeyMap = BTreeMap<String, String>;

/// A value stored in a [`ConfigNode`]: either a scalar or a subtree.
///
/// Serializes untagged, so a tree renders as plain nested JSON objects with
/// string leaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// An opaque string value. No type coercion is ever applied.
    Scalar(String),
    /// A nested node.
    Node(ConfigNode),
}

impl ConfigValue {
    /// Returns the scalar value, if this is a leaf.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::Node(_) => None,
        }
    }

    /// Returns the subtree, if this is a node.
    #[inline]
    #[must_use]
    pub const fn as_node(&self) -> Option<&ConfigNode> {
        match self {
            Self::Node(node) => Some(node),
            Self::Scalar(_) => None,
        }
    }
}

/// A tree of dotted path segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigNode {
    entries: BTreeMap<String, ConfigValue>,
}

impl ConfigNode {
    /// Creates an empty node.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the node has no children.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of direct children.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns the direct child named `segment`.
    #[must_use]
    pub fn get(&self, segment: &str) -> Option<&ConfigValue> {
        self.entries.get(segment)
    }

    /// Iterates over the direct children in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Resolves a dotted path such as `"build.core.path"`.
    #[must_use]
    pub fn lookup(&self, dotted: &str) -> Option<&ConfigValue> {
        let mut segments = dotted.split('.');
        let first = segments.next()?;
        let mut current = self.entries.get(first)?;
        for segment in segments {
            current = current.as_node()?.entries.get(segment)?;
        }
        Some(current)
    }

    /// Resolves a dotted path to a scalar.
    #[must_use]
    pub fn get_str(&self, dotted: &str) -> Option<&str> {
        self.lookup(dotted).and_then(ConfigValue::as_str)
    }

    /// Assigns `value` at a dotted path, creating intermediate nodes.
    ///
    /// A subtree always wins over a scalar at the same path: a scalar in the
    /// way of a deeper assignment is replaced by a node, and a scalar
    /// assigned where a subtree already exists is dropped. Callers that need
    /// every raw value keep a [`FlatKeyMap`] next to the tree.
    pub fn set_path(&mut self, dotted: &str, value: impl Into<String>) {
        let mut segments: Vec<&str> = dotted.split('.').collect();
        let Some(leaf) = segments.pop() else {
            return;
        };

        let mut node = self;
        for segment in segments {
            let slot = node
                .entries
                .entry(segment.to_owned())
                .or_insert_with(|| ConfigValue::Node(Self::default()));
            if !matches!(slot, ConfigValue::Node(_)) {
                *slot = ConfigValue::Node(Self::default());
            }
            let ConfigValue::Node(child) = slot else {
                return;
            };
            node = child;
        }

        if matches!(node.entries.get(leaf), Some(ConfigValue::Node(_))) {
            return;
        }
        node.entries
            .insert(leaf.to_owned(), ConfigValue::Scalar(value.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_path_creates_intermediate_nodes() {
        let mut node = ConfigNode::new();
        node.set_path("a.b.c", "1");
        assert_eq!(node.get_str("a.b.c"), Some("1"));
        assert!(node.get("a").and_then(ConfigValue::as_node).is_some());
        assert_eq!(node.len(), 1);
    }

    #[test]
    fn test_set_path_overwrites_scalar() {
        let mut node = ConfigNode::new();
        node.set_path("tools.avrdude.cmd", "avrdude");
        node.set_path("tools.avrdude.cmd", "avrdude.exe");
        assert_eq!(node.get_str("tools.avrdude.cmd"), Some("avrdude.exe"));
    }

    #[test]
    fn test_subtree_wins_over_scalar() {
        let mut node = ConfigNode::new();
        node.set_path("uno.upload.tool", "avrdude");
        node.set_path("uno.upload.tool.default", "avrdude");
        assert_eq!(node.get_str("uno.upload.tool.default"), Some("avrdude"));

        // Reverse order: the scalar does not clobber the existing subtree.
        node.set_path("uno.upload.tool", "avrdude");
        assert!(node.lookup("uno.upload.tool").is_some_and(|v| v.as_node().is_some()));
    }

    #[test]
    fn test_lookup_missing() {
        let mut node = ConfigNode::new();
        node.set_path("a.b", "1");
        assert!(node.lookup("a.c").is_none());
        assert!(node.lookup("a.b.c").is_none());
        assert!(node.get_str("a").is_none());
    }

    #[test]
    fn test_single_segment_key() {
        let mut node = ConfigNode::new();
        node.set_path("name", "Arduino AVR Boards");
        assert_eq!(node.get_str("name"), Some("Arduino AVR Boards"));
        assert_eq!(node.len(), 1);
    }

    #[test]
    fn test_serializes_as_nested_objects() {
        let mut node = ConfigNode::new();
        node.set_path("uno.name", "Arduino Uno");
        node.set_path("uno.build.mcu", "atmega328p");
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"uno": {"name": "Arduino Uno", "build": {"mcu": "atmega328p"}}})
        );

        let parsed: ConfigNode = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, node);
    }
}
