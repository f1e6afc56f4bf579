// An issued token record: access, refresh, or identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use granary_core::codes::new_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
    Identity,
}

/// An issued token record.
///
/// Application and authorization references can be attached after issuance,
/// which is why they are optional here while the subject is not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Token {
    pub id: String,
    pub created_on: DateTime<Utc>,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization: Option<String>,
    #[serde(rename = "Type")]
    pub kind: TokenKind,
    pub version: i64,
}

impl Token {
    pub fn new(subject: impl Into<String>, kind: TokenKind) -> Self {
        Self {
            id: new_id(),
            created_on: Utc::now(),
            subject: subject.into(),
            application: None,
            authorization: None,
            kind,
            version: 0,
        }
    }

    pub fn with_application(mut self, application: impl Into<String>) -> Self {
        self.application = Some(application.into());
        self
    }

    pub fn with_authorization(mut self, authorization: impl Into<String>) -> Self {
        self.authorization = Some(authorization.into());
        self
    }
}
