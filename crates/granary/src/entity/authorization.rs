// A subject's consent: the scopes a user has granted to an application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use granary_core::codes::new_id;

/// A recorded grant of scopes from a subject to an application.
///
/// At most one live authorization exists per (subject, application) pair;
/// later consents union their scopes into the existing row instead of
/// creating another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Authorization {
    pub id: String,
    pub created_on: DateTime<Utc>,
    pub subject: String,
    pub application: String,
    /// Ordered set: insertion order is preserved, duplicates are not added.
    pub scopes: Vec<String>,
    pub version: i64,
}

impl Authorization {
    pub fn new(
        subject: impl Into<String>,
        application: impl Into<String>,
        scopes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let mut authorization = Self {
            id: new_id(),
            created_on: Utc::now(),
            subject: subject.into(),
            application: application.into(),
            scopes: Vec::new(),
            version: 0,
        };
        authorization.grant_scopes(scopes);
        authorization
    }

    /// Union new scopes into the grant. Returns true if anything was added.
    pub fn grant_scopes(&mut self, scopes: impl IntoIterator<Item = impl Into<String>>) -> bool {
        let mut changed = false;
        for scope in scopes {
            let scope = scope.into();
            if !self.scopes.contains(&scope) {
                self.scopes.push(scope);
                changed = true;
            }
        }
        changed
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}
