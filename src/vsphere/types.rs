//! Managed object references.

use std::fmt;

/// An opaque reference to a vCenter inventory object.
///
/// The wire form is a value such as `domain-c7` qualified by a type such
/// as `ClusterComputeResource`. NSX payloads embed only the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedObjectRef {
    pub kind: String,
    pub value: String,
}

impl ManagedObjectRef {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for ManagedObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}
