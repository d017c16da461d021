use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// metadata attached to every addressable resource.
///
/// `name` and `namespace` are independently optional. Which of them is
/// present decides the URL shape used when addressing the resource
/// (collection, cluster item, namespaced collection, namespaced item).
#[derive(Deserialize, Serialize, PartialEq, Eq, Debug, Default, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<String>,
}

impl ObjectMeta {
    /// name only, cluster scoped
    pub fn named<S: Into<String>>(name: S) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn namespaced<S: Into<String>>(namespace: S, name: S) -> Self {
        Self {
            name: Some(name.into()),
            namespace: Some(namespace.into()),
            ..Default::default()
        }
    }

    pub fn set_labels<T: Into<String>>(mut self, labels: Vec<(T, T)>) -> Self {
        for (key, value) in labels {
            self.labels.insert(key.into(), value.into());
        }
        self
    }
}

impl fmt::Display for ObjectMeta {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            self.namespace.as_deref().unwrap_or(""),
            self.name.as_deref().unwrap_or("")
        )
    }
}

/// identity capability every addressable resource type implements.
///
/// The client only ever looks at kind, apiVersion and metadata to build
/// request URLs. Business fields are opaque to it.
pub trait HasIdentity {
    fn kind(&self) -> &str;

    fn api_version(&self) -> &str;

    fn metadata(&self) -> &ObjectMeta;

    fn name(&self) -> Option<&str> {
        self.metadata().name.as_deref()
    }

    fn namespace(&self) -> Option<&str> {
        self.metadata().namespace.as_deref()
    }

    fn labels(&self) -> &BTreeMap<String, String> {
        &self.metadata().labels
    }
}

/// free standing resource descriptor.
///
/// Addresses a resource by runtime strings without requiring a full typed
/// value. Typically used as the identity argument when the decode target
/// type differs from the type being addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    kind: String,
    api_version: String,
    metadata: ObjectMeta,
}

impl ResourceRef {
    pub fn new<S: Into<String>>(kind: S, api_version: S) -> Self {
        Self {
            kind: kind.into(),
            api_version: api_version.into(),
            metadata: ObjectMeta::default(),
        }
    }

    pub fn named<S: Into<String>>(mut self, name: S) -> Self {
        self.metadata.name = Some(name.into());
        self
    }

    pub fn within<S: Into<String>>(mut self, namespace: S) -> Self {
        self.metadata.namespace = Some(namespace.into());
        self
    }

    /// bare label term, matches any value
    pub fn label<S: Into<String>>(mut self, key: S) -> Self {
        self.metadata.labels.insert(key.into(), String::new());
        self
    }

    pub fn label_value<S: Into<String>>(mut self, key: S, value: S) -> Self {
        self.metadata.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_metadata(mut self, metadata: ObjectMeta) -> Self {
        self.metadata = metadata;
        self
    }
}

impl HasIdentity for ResourceRef {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn api_version(&self) -> &str {
        &self.api_version
    }

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }
}
