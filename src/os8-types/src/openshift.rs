use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::HasIdentity;
use crate::ObjectMeta;

/// scale sub resource body.
///
/// OpenShift 3.11 serves `extensions/v1beta1` for the scale body even though
/// the sub resource itself lives under `apps.openshift.io/v1`. Preserved as is.
#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Scale {
    pub kind: String,
    pub api_version: String,
    pub metadata: ObjectMeta,
    pub spec: ScaleSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ScaleStatus>,
}

impl Scale {
    pub fn new<S: Into<String>>(namespace: S, name: S, replicas: i32) -> Self {
        Self {
            kind: "Scale".to_owned(),
            api_version: "extensions/v1beta1".to_owned(),
            metadata: ObjectMeta::namespaced(namespace, name),
            spec: ScaleSpec { replicas },
            status: None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ScaleSpec {
    pub replicas: i32,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ScaleStatus {
    pub replicas: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

/// fixed payload for the `/instantiate` sub resource
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRequest {
    pub kind: String,
    pub api_version: String,
    pub name: String,
    pub latest: bool,
    pub force: bool,
}

impl DeploymentRequest {
    /// rollout request: redeploy latest, forced
    pub fn latest<S: Into<String>>(name: S) -> Self {
        Self {
            kind: "DeploymentRequest".to_owned(),
            api_version: "apps.openshift.io/v1".to_owned(),
            name: name.into(),
            latest: true,
            force: true,
        }
    }
}

/// deployment config, spec and status are opaque to this client
#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DeploymentConfig {
    pub metadata: ObjectMeta,
    pub spec: Value,
    pub status: Value,
}

impl DeploymentConfig {
    pub fn named<S: Into<String>>(namespace: S, name: S) -> Self {
        Self {
            metadata: ObjectMeta::namespaced(namespace, name),
            ..Default::default()
        }
    }
}

impl HasIdentity for DeploymentConfig {
    fn kind(&self) -> &str {
        "DeploymentConfig"
    }

    fn api_version(&self) -> &str {
        "apps.openshift.io/v1"
    }

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub kind: String,
    pub api_version: String,
    pub metadata: ObjectMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub identities: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
}

impl HasIdentity for User {
    fn kind(&self) -> &str {
        "User"
    }

    fn api_version(&self) -> &str {
        "user.openshift.io/v1"
    }

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }
}

#[cfg(test)]
mod test {

    use super::DeploymentRequest;
    use super::Scale;

    #[test]
    fn test_scale_body() {
        let scale = Scale::new("ns1", "app1", 3);
        let body = serde_json::to_value(&scale).unwrap();
        assert_eq!(body["apiVersion"], "extensions/v1beta1");
        assert_eq!(body["spec"]["replicas"], 3);
        assert_eq!(body["metadata"]["namespace"], "ns1");
    }

    #[test]
    fn test_deployment_request_body() {
        let request = DeploymentRequest::latest("app1");
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["kind"], "DeploymentRequest");
        assert_eq!(body["apiVersion"], "apps.openshift.io/v1");
        assert_eq!(body["latest"], true);
        assert_eq!(body["force"], true);
    }
}
