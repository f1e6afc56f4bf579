// A registered OAuth2 client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use granary_core::codes::new_id;
use granary_core::error::{StoreError, StoreResult};

use super::state::Deletion;

/// Client confidentiality class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationKind {
    /// Cannot keep a secret (native apps, SPAs, constrained devices).
    Public,
    /// Holds a hashed client secret.
    Confidential,
}

/// A registered OAuth2 client application.
///
/// Applications are never hard-deleted; [`delete`](Application::delete) sets
/// the tombstone and the row stays behind for audit. `ClientId` uniqueness
/// holds among live rows only, so a deleted client's id can be re-registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Application {
    pub id: String,
    pub created_on: DateTime<Utc>,
    pub client_id: String,
    /// Hashed secret, confidential clients only. Hashing policy belongs to
    /// the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logout_redirect_uri: Option<String>,
    #[serde(rename = "Type")]
    pub kind: ApplicationKind,
    #[serde(rename = "DeletedOn")]
    pub deleted: Deletion,
    pub version: i64,
}

impl Application {
    pub fn new(
        client_id: impl Into<String>,
        display_name: impl Into<String>,
        kind: ApplicationKind,
    ) -> Self {
        Self {
            id: new_id(),
            created_on: Utc::now(),
            client_id: client_id.into(),
            client_secret: None,
            display_name: display_name.into(),
            redirect_uri: None,
            logout_redirect_uri: None,
            kind,
            deleted: Deletion::Active,
            version: 0,
        }
    }

    pub fn with_client_secret(mut self, hashed_secret: impl Into<String>) -> Self {
        self.client_secret = Some(hashed_secret.into());
        self
    }

    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    pub fn with_logout_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.logout_redirect_uri = Some(uri.into());
        self
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.is_deleted()
    }

    /// Set the soft-delete tombstone. Deleting twice is a double transition
    /// and fails with [`StoreError::Conflict`].
    pub fn delete(&mut self, at: DateTime<Utc>) -> StoreResult<()> {
        if self.deleted.is_deleted() {
            return Err(StoreError::Conflict(format!(
                "application '{}' is already deleted",
                self.id
            )));
        }
        self.deleted = Deletion::Deleted(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_application_is_live() {
        let app = Application::new("cli", "CLI tool", ApplicationKind::Public);
        assert!(!app.is_deleted());
        assert_eq!(app.version, 0);
        assert!(app.client_secret.is_none());
    }

    #[test]
    fn test_delete_twice_conflicts() {
        let mut app = Application::new("cli", "CLI tool", ApplicationKind::Public);
        app.delete(Utc::now()).unwrap();
        assert!(app.is_deleted());
        assert!(matches!(
            app.delete(Utc::now()),
            Err(StoreError::Conflict(_))
        ));
    }

    #[test]
    fn test_wire_attribute_names() {
        let app = Application::new("web", "Web portal", ApplicationKind::Confidential)
            .with_client_secret("hash")
            .with_logout_redirect_uri("https://example.com/signout");
        let value = serde_json::to_value(&app).unwrap();
        let doc = value.as_object().unwrap();

        for key in ["Id", "CreatedOn", "ClientId", "ClientSecret", "DisplayName", "LogoutRedirectUri", "Type", "DeletedOn", "Version"] {
            assert!(doc.contains_key(key), "missing attribute {key}");
        }
        assert_eq!(doc["Type"], "confidential");
        assert_eq!(doc["DeletedOn"], Deletion::NOT_DELETED);
        assert!(!doc.contains_key("RedirectUri"));
    }
}
