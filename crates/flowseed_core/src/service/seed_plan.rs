//! Declarative description of what the seeder ensures.
//!
//! # Responsibility
//! - Describe groups, users, the process deployment and the demo model.
//! - Provide the built-in plan used when configuration does not override it.

use crate::model::identity::GroupType;
use serde::{Deserialize, Serialize};

/// Deployment name under which the process bundle is registered.
pub const WORKFLOW_DEPLOYMENT_NAME: &str = "WorkFlow processes";

/// Process definitions bundled into the workflow deployment, in deploy order.
pub const WORKFLOW_RESOURCES: [&str; 16] = [
    "bannerCreationProcess.bpmn",
    "crmCreationProcess.bpmn",
    "crmGetProcess.bpmn",
    "crmUpdateProcess.bpmn",
    "notificationProcess.bpmn",
    "userNotificationProcess.bpmn",
    "csuChange.bpmn",
    "devolutionPostponement.bpmn",
    "modalityChange.bpmn",
    "programChange.bpmn",
    "reAdmission.bpmn",
    "requestForms.bpmn",
    "scheduleChange.bpmn",
    "siteChange.bpmn",
    "studentIdentification.bpmn",
    "supplementaryExam.bpmn",
];

/// One group to ensure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: GroupType,
}

impl GroupSpec {
    pub fn new(id: impl Into<String>, kind: GroupType) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

/// One user to ensure.
///
/// `profile` is a flattened `key, value, key, value, ...` list and must have
/// even length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSpec {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub email: String,
    /// Resource name of a JPEG avatar.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub profile: Vec<String>,
}

/// Named bundle of process-definition resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSpec {
    pub name: String,
    pub resources: Vec<String>,
}

/// Design model created by the disabled demo path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub name: String,
    pub description: String,
    /// Resource name of the editor JSON source.
    pub editor_source: String,
    /// Resource name of the SVG thumbnail.
    pub thumbnail: String,
}

/// Everything the startup sequence ensures, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedPlan {
    pub groups: Vec<GroupSpec>,
    pub users: Vec<UserSpec>,
    pub deployment: DeploymentSpec,
}

impl Default for SeedPlan {
    fn default() -> Self {
        Self {
            groups: vec![
                GroupSpec::new("student", GroupType::Assignment),
                GroupSpec::new("backoffice", GroupType::Assignment),
                GroupSpec::new("user", GroupType::SecurityRole),
                GroupSpec::new("admin", GroupType::SecurityRole),
            ],
            users: vec![UserSpec {
                id: "admin".to_string(),
                first_name: "admin".to_string(),
                last_name: "admin".to_string(),
                password: "admin".to_string(),
                email: "francisco.mantaras@santexgroup.com".to_string(),
                avatar: None,
                groups: ["student", "backoffice", "user", "admin"]
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
                profile: Vec::new(),
            }],
            deployment: DeploymentSpec {
                name: WORKFLOW_DEPLOYMENT_NAME.to_string(),
                resources: WORKFLOW_RESOURCES.iter().map(|name| name.to_string()).collect(),
            },
        }
    }
}

/// Demo model kept for the disabled model-seeding path.
pub fn demo_model_spec() -> ModelSpec {
    ModelSpec {
        name: "Demo model".to_string(),
        description: "This is a demo model".to_string(),
        editor_source: "demo/model/test.model.json".to_string(),
        thumbnail: "demo/model/test.svg".to_string(),
    }
}
