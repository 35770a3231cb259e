//! On-disk documents shared by the workload generator and the embedded
//! engine.

use serde::{Deserialize, Serialize};

use super::{AuthorizationRequest, Decision};

/// Engine settings file, shared by all namespaces.
pub const SETTINGS_FILE: &str = "pdp.json";

/// Suffix of every policy document inside a namespace.
pub const POLICY_SUFFIX: &str = ".policy.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CombiningAlgorithm {
    #[default]
    DenyOverrides,
    PermitOverrides,
    FirstApplicable,
}

impl CombiningAlgorithm {
    /// Combine the effects of all applicable policies, in document order.
    pub fn combine(&self, effects: impl IntoIterator<Item = Effect>) -> Decision {
        let mut permit = false;
        let mut deny = false;
        for effect in effects {
            if *self == CombiningAlgorithm::FirstApplicable {
                return effect.into();
            }
            match effect {
                Effect::Permit => permit = true,
                Effect::Deny => deny = true,
            }
        }

        match self {
            CombiningAlgorithm::DenyOverrides if deny => Decision::Deny,
            CombiningAlgorithm::DenyOverrides if permit => Decision::Permit,
            CombiningAlgorithm::PermitOverrides if permit => Decision::Permit,
            CombiningAlgorithm::PermitOverrides if deny => Decision::Deny,
            _ => Decision::NotApplicable,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default)]
    pub algorithm: CombiningAlgorithm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Effect {
    Permit,
    Deny,
}

impl From<Effect> for Decision {
    fn from(effect: Effect) -> Self {
        match effect {
            Effect::Permit => Decision::Permit,
            Effect::Deny => Decision::Deny,
        }
    }
}

/// Attribute constraints of a policy. A missing attribute matches anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
}

impl Target {
    pub fn matches(&self, request: &AuthorizationRequest) -> bool {
        fn attr(constraint: &Option<String>, value: &str) -> bool {
            constraint.as_deref().is_none_or(|c| c == value)
        }
        attr(&self.subject, &request.subject)
            && attr(&self.action, &request.action)
            && attr(&self.resource, &request.resource)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    pub name: String,
    pub effect: Effect,
    #[serde(default)]
    pub target: Target,
}
