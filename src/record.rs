//! Record module defines the persisted form of a tree node.
//!
//! Every stored string begins with a one-character type tag so a reader
//! never has to guess what a node is: `'v'` marks a scalar value and the
//! payload is the raw string; `'p'` marks a container and the payload is
//! the encoded list of child segment names. An absent record means the
//! node does not exist, which is distinct from an explicit empty value.

use crate::{Error, Result};

/// Tag prefix for a value record.
pub const VALUE_TAG: char = 'v';

/// Tag prefix for a container record.
pub const CONTAINER_TAG: char = 'p';

/// Classification of an existing node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Holds one opaque scalar string; has no children.
    Value,
    /// Holds a set of child segment names.
    Container,
}

/// The decoded persisted record of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// A scalar payload.
    Value(String),
    /// A list of child segment names, insertion-ordered, no duplicates.
    Container(Vec<String>),
}

impl Record {
    /// The kind of node this record describes.
    pub fn kind(&self) -> NodeKind {
        match self {
            Record::Value(_) => NodeKind::Value,
            Record::Container(_) => NodeKind::Container,
        }
    }

    /// Encodes the record as `tag + payload`.
    pub fn encode(&self) -> String {
        match self {
            Record::Value(payload) => format!("{VALUE_TAG}{payload}"),
            Record::Container(children) => {
                // Child lists reuse the path codec's JSON array encoding.
                let payload = serde_json::to_string(children).unwrap_or_default();
                format!("{CONTAINER_TAG}{payload}")
            }
        }
    }

    /// Decodes a stored string back into a record.
    ///
    /// A missing tag, an unknown tag, or a container payload that does not
    /// parse as a child list indicates the backing store was mutated
    /// outside the engine's invariants, and is surfaced as
    /// `Error::Corruption` rather than masked as "no data".
    pub fn decode(raw: &str) -> Result<Record> {
        let mut chars = raw.chars();
        let tag = chars
            .next()
            .ok_or_else(|| Error::Corruption("empty record".to_string()))?;
        let payload = chars.as_str();
        match tag {
            VALUE_TAG => Ok(Record::Value(payload.to_string())),
            CONTAINER_TAG => {
                let children: Vec<String> = serde_json::from_str(payload).map_err(|e| {
                    Error::Corruption(format!("malformed container child list: {e}"))
                })?;
                if children.iter().any(|c| c.is_empty()) {
                    return Err(Error::Corruption(
                        "container child list holds an empty segment".to_string(),
                    ));
                }
                Ok(Record::Container(children))
            }
            other => Err(Error::Corruption(format!("unknown record tag {other:?}"))),
        }
    }
}
