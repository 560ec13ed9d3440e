//! OAuth2 grant domain type.
//!
//! A [`Token`] carries one authorization-code grant or one access grant
//! (optionally with a refresh token). It is persisted as an opaque JSON
//! blob next to the three lookup keys.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{StorageError, StorageResult};

/// An authorization code, access token or refresh token grant.
///
/// Empty strings mean "absent". A code grant has `code` set and `access` /
/// `refresh` empty; an access grant has `access` set and may carry `refresh`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Token {
    /// Client the grant was issued to.
    pub client_id: String,
    /// Resource owner that authorized the grant.
    pub user_id: String,
    /// Redirect URI bound to the authorization code.
    pub redirect_uri: String,
    /// Granted scopes (space-separated).
    pub scope: String,

    /// Authorization code.
    pub code: String,
    /// PKCE code challenge.
    pub code_challenge: String,
    /// PKCE code challenge method (`plain` or `S256`).
    pub code_challenge_method: String,
    #[serde(with = "time::serde::rfc3339")]
    pub code_create_at: OffsetDateTime,
    #[serde(with = "humantime_serde")]
    pub code_expires_in: Duration,

    /// Access token.
    pub access: String,
    #[serde(with = "time::serde::rfc3339")]
    pub access_create_at: OffsetDateTime,
    #[serde(with = "humantime_serde")]
    pub access_expires_in: Duration,

    /// Refresh token.
    pub refresh: String,
    #[serde(with = "time::serde::rfc3339")]
    pub refresh_create_at: OffsetDateTime,
    #[serde(with = "humantime_serde")]
    pub refresh_expires_in: Duration,
}

impl Default for Token {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            user_id: String::new(),
            redirect_uri: String::new(),
            scope: String::new(),
            code: String::new(),
            code_challenge: String::new(),
            code_challenge_method: String::new(),
            code_create_at: OffsetDateTime::UNIX_EPOCH,
            code_expires_in: Duration::ZERO,
            access: String::new(),
            access_create_at: OffsetDateTime::UNIX_EPOCH,
            access_expires_in: Duration::ZERO,
            refresh: String::new(),
            refresh_create_at: OffsetDateTime::UNIX_EPOCH,
            refresh_expires_in: Duration::ZERO,
        }
    }
}

impl Token {
    /// Create an authorization code grant.
    #[must_use]
    pub fn authorization_code(
        client_id: impl Into<String>,
        code: impl Into<String>,
        created_at: OffsetDateTime,
        lifetime: Duration,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            code: code.into(),
            code_create_at: created_at,
            code_expires_in: lifetime,
            ..Self::default()
        }
    }

    /// Create an access token grant without a refresh token.
    #[must_use]
    pub fn access_token(
        client_id: impl Into<String>,
        access: impl Into<String>,
        created_at: OffsetDateTime,
        lifetime: Duration,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            access: access.into(),
            access_create_at: created_at,
            access_expires_in: lifetime,
            ..Self::default()
        }
    }

    /// Attach a refresh token to an access grant.
    #[must_use]
    pub fn with_refresh(
        mut self,
        refresh: impl Into<String>,
        created_at: OffsetDateTime,
        lifetime: Duration,
    ) -> Self {
        self.refresh = refresh.into();
        self.refresh_create_at = created_at;
        self.refresh_expires_in = lifetime;
        self
    }

    /// Set the resource owner.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    /// Set the granted scopes.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Returns `true` if this is an authorization code grant.
    #[must_use]
    pub fn is_code_grant(&self) -> bool {
        !self.code.is_empty()
    }

    /// Code expiry, or `None` if it is past the representable range.
    #[must_use]
    pub fn code_expires_at(&self) -> Option<OffsetDateTime> {
        expiry(self.code_create_at, self.code_expires_in)
    }

    /// Access token expiry, or `None` if it is past the representable range.
    #[must_use]
    pub fn access_expires_at(&self) -> Option<OffsetDateTime> {
        expiry(self.access_create_at, self.access_expires_in)
    }

    /// Refresh token expiry, or `None` if it is past the representable range.
    #[must_use]
    pub fn refresh_expires_at(&self) -> Option<OffsetDateTime> {
        expiry(self.refresh_create_at, self.refresh_expires_in)
    }

    /// When the stored record may be garbage collected.
    ///
    /// The longest-lived sub-token governs: the code expiry for a code
    /// grant, otherwise the refresh expiry when a refresh token is present,
    /// otherwise the access expiry.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGrant` if the governing lifetime overflows the
    /// timestamp range.
    pub fn retention_deadline(&self) -> StorageResult<OffsetDateTime> {
        let (deadline, kind) = if self.is_code_grant() {
            (self.code_expires_at(), "code")
        } else if !self.refresh.is_empty() {
            (self.refresh_expires_at(), "refresh token")
        } else {
            (self.access_expires_at(), "access token")
        };

        deadline.ok_or_else(|| {
            StorageError::invalid_grant(format!("{kind} lifetime overflows the timestamp range"))
        })
    }
}

fn expiry(created_at: OffsetDateTime, lifetime: Duration) -> Option<OffsetDateTime> {
    time::Duration::try_from(lifetime)
        .ok()
        .and_then(|lifetime| created_at.checked_add(lifetime))
}
