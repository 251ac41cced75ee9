//! Deferred values.
//!
//! A [`Value`] is either a plain string or a promise of an identifier that
//! only exists once the provisioning engine has realized a resource. Every
//! cross-resource reference in the graph is one of these tagged variants
//! with a declared producer; nothing relies on incidental construction
//! order. Serialization renders the engine's native intrinsic forms.

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// A literal or deferred string value inside a resource declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A literal string, known at synthesis time.
    Str(String),
    /// The primary identifier of a resource in the same stack.
    Ref(String),
    /// A named attribute of a resource in the same stack.
    Attr(String, String),
    /// Concatenation of parts, at least one of which is deferred.
    Concat(Vec<Value>),
    /// A list of values.
    List(Vec<Value>),
    /// A read from the external parameter store, resolved at deploy time.
    Param(String),
    /// A value exported by a stack deployed earlier.
    Import(String),
    /// The region's availability zone list.
    GetAzs,
    /// Element selection out of a deferred list.
    Select(u32, Box<Value>),
}

impl Value {
    /// A literal string value.
    #[must_use]
    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    /// A reference to a resource's primary identifier.
    #[must_use]
    pub fn reference(logical_id: impl Into<String>) -> Self {
        Self::Ref(logical_id.into())
    }

    /// A reference to a resource attribute.
    #[must_use]
    pub fn attr(logical_id: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::Attr(logical_id.into(), attribute.into())
    }

    /// Concatenation of literal and deferred parts.
    #[must_use]
    pub fn concat(parts: impl IntoIterator<Item = Self>) -> Self {
        Self::Concat(parts.into_iter().collect())
    }

    /// The n-th availability zone of the deployment region.
    #[must_use]
    pub fn availability_zone(index: u32) -> Self {
        Self::Select(index, Box::new(Self::GetAzs))
    }

    /// Whether the value is fully known at synthesis time.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        match self {
            Self::Str(_) | Self::Param(_) => true,
            Self::Ref(_) | Self::Attr(_, _) | Self::Import(_) | Self::GetAzs => false,
            Self::Concat(parts) | Self::List(parts) => parts.iter().all(Self::is_literal),
            Self::Select(_, list) => list.is_literal(),
        }
    }

    /// Logical ids of same-stack resources this value refers to.
    #[must_use]
    pub fn local_refs(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        self.collect_local_refs(&mut ids);
        ids
    }

    fn collect_local_refs<'a>(&'a self, ids: &mut Vec<&'a str>) {
        match self {
            Self::Ref(id) | Self::Attr(id, _) => ids.push(id),
            Self::Concat(parts) | Self::List(parts) => {
                for part in parts {
                    part.collect_local_refs(ids);
                }
            }
            Self::Select(_, list) => list.collect_local_refs(ids),
            Self::Str(_) | Self::Param(_) | Self::Import(_) | Self::GetAzs => {}
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Str(s) => serializer.serialize_str(s),
            Self::Param(path) => {
                serializer.serialize_str(&format!("{{{{resolve:ssm:{path}}}}}"))
            }
            Self::Ref(id) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Ref", id)?;
                map.end()
            }
            Self::Attr(id, attribute) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::GetAtt", &[id.as_str(), attribute.as_str()])?;
                map.end()
            }
            Self::Concat(parts) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Join", &("", parts))?;
                map.end()
            }
            Self::List(parts) => {
                let mut seq = serializer.serialize_seq(Some(parts.len()))?;
                for part in parts {
                    seq.serialize_element(part)?;
                }
                seq.end()
            }
            Self::Import(name) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::ImportValue", name)?;
                map.end()
            }
            Self::GetAzs => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::GetAZs", "")?;
                map.end()
            }
            Self::Select(index, list) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Select", &(index, list))?;
                map.end()
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        // Serialization of Value is total; the fallback is unreachable.
        serde_json::to_value(&value).unwrap_or(Self::Null)
    }
}
