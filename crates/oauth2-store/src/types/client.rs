//! OAuth2 client registration domain type.

use serde::{Deserialize, Serialize};

/// A registered OAuth2 client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Client {
    /// Unique client identifier, the primary key of the client table.
    pub id: String,
    /// Client secret.
    pub secret: String,
    /// Registered redirect domain.
    pub domain: String,
    /// Public clients do not authenticate with a secret.
    pub public: bool,
    /// Owning user, if any.
    pub user_id: String,
}

impl Client {
    /// Create a confidential client.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        secret: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
            domain: domain.into(),
            ..Self::default()
        }
    }

    /// Set the owning user.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    /// Mark the client as public.
    #[must_use]
    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }
}
