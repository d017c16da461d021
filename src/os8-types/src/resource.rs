use serde::Deserialize;
use serde::Serialize;

/// wrapper for list responses, only `items` is interesting to callers
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceList<K> {
    pub api_version: Option<String>,
    pub kind: Option<String>,
    pub items: Vec<K>,
}

impl<K> Default for ResourceList<K> {
    fn default() -> Self {
        Self {
            api_version: None,
            kind: None,
            items: Vec::new(),
        }
    }
}

/// api server status body, returned for background deletes and errors
#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Status {
    pub kind: String,
    pub api_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
}

/// single event from a watch stream
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(tag = "type", content = "object", rename_all = "UPPERCASE")]
pub enum WatchEvent<K> {
    Added(K),
    Modified(K),
    Deleted(K),
    Error(Status),
}

impl<K> WatchEvent<K> {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Added(_) => "ADDED",
            Self::Modified(_) => "MODIFIED",
            Self::Deleted(_) => "DELETED",
            Self::Error(_) => "ERROR",
        }
    }
}
