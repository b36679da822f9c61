//! Authorization decision documents.
//!
//! A decision names a principal and carries a policy document with exactly
//! one statement granting or refusing `execute-api:Invoke` on one resource.
//! Field names follow the gateway's wire format (`principalId`,
//! `policyDocument`, `Version`, `Statement`, `Action`, `Effect`, `Resource`).

use serde::{Deserialize, Serialize};

/// Policy language version.
pub const POLICY_VERSION: &str = "2012-10-17";

/// The only action a decision governs.
pub const INVOKE_ACTION: &str = "execute-api:Invoke";

/// Statement effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    pub action: String,
    pub effect: Effect,
    pub resource: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<Statement>,
}

/// Result returned to the gateway for an authorized request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationDecision {
    pub principal_id: String,
    pub policy_document: PolicyDocument,
}

impl AuthorizationDecision {
    /// The single statement of this decision.
    pub fn statement(&self) -> Option<&Statement> {
        self.policy_document.statement.first()
    }

    /// Effect of the single statement.
    pub fn effect(&self) -> Option<Effect> {
        self.statement().map(|s| s.effect)
    }

    /// Resource of the single statement.
    pub fn resource(&self) -> Option<&str> {
        self.statement().map(|s| s.resource.as_str())
    }
}

/// Build a decision for `principal_id` with one statement on `resource`.
///
/// `resource` is copied verbatim, including the empty string.
pub fn generate_decision(principal_id: &str, effect: Effect, resource: &str) -> AuthorizationDecision {
    AuthorizationDecision {
        principal_id: principal_id.to_string(),
        policy_document: PolicyDocument {
            version: POLICY_VERSION.to_string(),
            statement: vec![Statement {
                action: INVOKE_ACTION.to_string(),
                effect,
                resource: resource.to_string(),
            }],
        },
    }
}
