//! Strong type definitions for the Vestibule session core.
//!
//! Identity material is wrapped in newtypes to prevent misuse at compile
//! time; the access token additionally redacts itself from `Debug` output.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A homeserver a client can connect to.
///
/// Uniquely identified by `url`. The known-homeserver set is ordered and
/// deduplicated by URL; two entries with the same URL are the same server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Homeserver {
    /// Display name, usually the URL host.
    pub name: String,
    /// Base URL of the server. The identity of this record.
    pub url: String,
    /// Optional human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether this entry is promoted in selection UIs.
    #[serde(default)]
    pub featured: bool,
    /// Whether the user marked this entry as a favorite.
    #[serde(default)]
    pub favorite: bool,
}

impl Homeserver {
    /// Create a minimal entry for `url`, deriving the display name from the
    /// URL host. Falls back to the raw string when the URL does not parse;
    /// this constructor never fails.
    pub fn from_url(url: &str) -> Self {
        Self {
            name: derive_name(url),
            url: url.to_string(),
            description: None,
            featured: false,
            favorite: false,
        }
    }

    /// Mark this entry as a favorite.
    pub fn favorite(mut self, favorite: bool) -> Self {
        self.favorite = favorite;
        self
    }

    /// Attach a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl fmt::Display for Homeserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.url)
    }
}

/// Derive a display name from a homeserver URL.
///
/// `https://example.org/path` becomes `example.org`. Strings that do not
/// parse as URLs (or have no host, like `mailto:`) are used verbatim.
fn derive_name(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

/// A stable per-installation device identifier.
///
/// Generated once (UUID v4) and persisted; the protocol client scopes
/// encryption keys and verification state to this value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Generate a fresh random device identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An opaque credential authorizing a client session.
///
/// The token value never appears in `Debug` output; a leaked debug line
/// must not be a leaked credential.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Expose the secret for handing to the protocol client.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

/// A fully-qualified user identifier resolved by the homeserver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wrap an identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An authentication method advertised by a homeserver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginFlow {
    /// Protocol identifier of the method, e.g. `m.login.password`.
    pub kind: String,
}

impl LoginFlow {
    /// Password login.
    pub const PASSWORD: &'static str = "m.login.password";
    /// Single sign-on.
    pub const SSO: &'static str = "m.login.sso";
    /// Token login (used to complete an SSO round-trip).
    pub const TOKEN: &'static str = "m.login.token";

    /// Create a flow for the given protocol identifier.
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }

    /// Whether this flow is password-based.
    pub fn is_password(&self) -> bool {
        self.kind == Self::PASSWORD
    }

    /// Whether this flow is single sign-on.
    pub fn is_sso(&self) -> bool {
        self.kind == Self::SSO
    }
}
