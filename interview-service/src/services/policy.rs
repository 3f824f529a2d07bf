//! Access control for mutating question operations.

use crate::dtos::{Claims, GroupsClaim};
use axum::http::StatusCode;
use service_core::error::AppError;
use std::collections::BTreeSet;

pub const ADMIN_GROUP: &str = "Admin";

const DENIAL_MESSAGE: &str = "Admin access required";

/// Caller identity with group membership normalized to a set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerIdentity {
    pub subject: Option<String>,
    pub groups: BTreeSet<String>,
}

impl CallerIdentity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// The only place the claim shape is inspected. Absent claims, an absent
    /// group claim and an empty string all yield an empty set.
    pub fn from_claims(claims: Option<&Claims>) -> Self {
        let Some(claims) = claims else {
            return Self::anonymous();
        };

        let groups = match &claims.groups {
            None => BTreeSet::new(),
            Some(GroupsClaim::Single(value)) => split_groups(value),
            Some(GroupsClaim::List(values)) => values.iter().flat_map(|v| split_groups(v)).collect(),
        };

        Self {
            subject: claims.sub.clone().filter(|s| !s.is_empty()),
            groups,
        }
    }

    pub fn subject_or_unknown(&self) -> &str {
        self.subject.as_deref().unwrap_or("unknown")
    }
}

fn split_groups(value: &str) -> BTreeSet<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect()
}

/// Structured refusal of a mutating operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    pub status: StatusCode,
    pub error: &'static str,
    pub message: String,
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        AppError::Forbidden(denial.message)
    }
}

pub trait AccessPolicy: Send + Sync {
    fn is_admin(&self, identity: &CallerIdentity) -> bool;

    /// `None` when the caller may proceed.
    fn require_admin(&self, identity: &CallerIdentity, operation: &str) -> Option<Denial>;
}

/// Grants mutation rights to members of a single named group.
#[derive(Debug, Clone)]
pub struct GroupPolicy {
    admin_group: String,
}

impl GroupPolicy {
    pub fn new(admin_group: impl Into<String>) -> Self {
        Self {
            admin_group: admin_group.into(),
        }
    }
}

impl Default for GroupPolicy {
    fn default() -> Self {
        Self::new(ADMIN_GROUP)
    }
}

impl AccessPolicy for GroupPolicy {
    fn is_admin(&self, identity: &CallerIdentity) -> bool {
        identity.groups.contains(&self.admin_group)
    }

    fn require_admin(&self, identity: &CallerIdentity, operation: &str) -> Option<Denial> {
        if self.is_admin(identity) {
            return None;
        }

        tracing::warn!(
            user_id = %identity.subject_or_unknown(),
            operation = %operation,
            "Non-admin caller attempted a mutating operation"
        );

        Some(Denial {
            status: StatusCode::FORBIDDEN,
            error: "Forbidden",
            message: DENIAL_MESSAGE.to_string(),
        })
    }
}
