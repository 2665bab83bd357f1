//! Typed builders for the store's SQL dialect.
//!
//! Every statement the client sends is rendered here, from validated parts:
//! class and property names must be plain identifiers, string values are
//! quoted and escaped, and record ids are parsed before they are spliced in.
//! The rendered text is what travels (percent-encoded) in request URLs or
//! inside batch scripts.

use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Document content: a flat JSON object of field → value.
pub type Content = serde_json::Map<String, Value>;

/// Build `{ field: value }` content from string pairs.
pub fn content_of<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Content {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect()
}

// ============================================================================
// Identifiers and record ids
// ============================================================================

/// A class or property name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(name: &str) -> Result<Self> {
        let mut chars = name.chars();
        let valid_head = chars
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '_')
            .unwrap_or(false);
        if valid_head && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            Ok(Self(name.to_string()))
        } else {
            Err(ClientError::InvalidIdentifier(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Identifier {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// Store-assigned record address, `#cluster:position`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    pub cluster: i64,
    pub position: i64,
}

impl RecordId {
    pub fn new(cluster: i64, position: i64) -> Self {
        Self { cluster, position }
    }

    /// `cluster:position`, the form used in document URLs.
    pub fn path_segment(&self) -> String {
        format!("{}:{}", self.cluster, self.position)
    }

    /// Read the `@rid` field of a result row.
    pub fn from_row(row: &Value) -> Result<Self> {
        row.get("@rid")
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::Decode(format!("row has no @rid: {row}")))?
            .parse()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.cluster, self.position)
    }
}

impl FromStr for RecordId {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        let bare = s.trim().trim_start_matches('#');
        let invalid = || ClientError::InvalidRecordId(s.to_string());
        let (cluster, position) = bare.split_once(':').ok_or_else(invalid)?;
        Ok(Self {
            cluster: cluster.parse().map_err(|_| invalid())?,
            position: position.parse().map_err(|_| invalid())?,
        })
    }
}

impl Serialize for RecordId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Literals
// ============================================================================

/// Render a JSON value as an SQL literal.
pub fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => quote(s),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Single-quote a string, escaping backslashes and quotes.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

// ============================================================================
// Queries
// ============================================================================

/// `SELECT FROM <class> [WHERE f = v AND ...] SKIP n [LIMIT m]`
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub target: Identifier,
    pub conditions: Vec<(Identifier, Value)>,
    pub limit: Option<u64>,
}

impl Select {
    pub fn from(target: Identifier) -> Self {
        Self {
            target,
            conditions: Vec::new(),
            limit: None,
        }
    }

    pub fn filter_eq(mut self, field: Identifier, value: impl Into<Value>) -> Self {
        self.conditions.push((field, value.into()));
        self
    }

    /// Match every field of `content` exactly.
    pub fn matching(target: Identifier, content: &Content) -> Result<Self> {
        let mut select = Self::from(target);
        for (field, value) in content {
            select = select.filter_eq(Identifier::new(field)?, value.clone());
        }
        Ok(select)
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn render(&self, skip: u64) -> String {
        let mut text = format!("SELECT FROM {}", self.target);
        if !self.conditions.is_empty() {
            let clauses: Vec<String> = self
                .conditions
                .iter()
                .map(|(field, value)| format!("{field} = {}", literal(value)))
                .collect();
            text.push_str(" WHERE ");
            text.push_str(&clauses.join(" AND "));
        }
        text.push_str(&format!(" SKIP {skip}"));
        if let Some(limit) = self.limit {
            text.push_str(&format!(" LIMIT {limit}"));
        }
        text
    }
}

/// Follow `from`'s outgoing edges of `class` and keep the one landing on `to`.
pub fn edge_exists_query(class: &Identifier, from: RecordId, to: RecordId) -> String {
    format!("SELECT FROM (SELECT expand(out('{class}')) FROM {from}) WHERE @rid = {to} LIMIT 1")
}

// ============================================================================
// Commands
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    String,
    Integer,
    Long,
    Double,
    Boolean,
    DateTime,
    Link,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::String => "STRING",
            PropertyType::Integer => "INTEGER",
            PropertyType::Long => "LONG",
            PropertyType::Double => "DOUBLE",
            PropertyType::Boolean => "BOOLEAN",
            PropertyType::DateTime => "DATETIME",
            PropertyType::Link => "LINK",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutating statements.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateVertexClass(Identifier),
    CreateEdgeClass(Identifier),
    CreateProperty {
        class: Identifier,
        property: Identifier,
        kind: PropertyType,
    },
    CreateVertex {
        class: Identifier,
        content: Content,
    },
    CreateEdge {
        class: Identifier,
        from: RecordId,
        to: RecordId,
        content: Option<Content>,
    },
}

impl Command {
    pub fn render(&self) -> String {
        match self {
            Command::CreateVertexClass(class) => format!("CREATE CLASS {class} EXTENDS V"),
            Command::CreateEdgeClass(class) => format!("CREATE CLASS {class} EXTENDS E"),
            Command::CreateProperty {
                class,
                property,
                kind,
            } => format!("CREATE PROPERTY {class}.{property} {kind}"),
            Command::CreateVertex { class, content } => {
                format!("CREATE VERTEX {class} CONTENT {}", Value::Object(content.clone()))
            }
            Command::CreateEdge {
                class,
                from,
                to,
                content,
            } => {
                let mut text = format!("CREATE EDGE {class} FROM {from} TO {to}");
                if let Some(content) = content {
                    text.push_str(&format!(" CONTENT {}", Value::Object(content.clone())));
                }
                text
            }
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
