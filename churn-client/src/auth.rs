//! Authentication context
//!
//! The identity and bearer credential are passed explicitly to every
//! operation rather than read from ambient state. Both are written once,
//! when a session is established, and only read afterwards.
//!
//! Every request the client issues authenticates the same way: an
//! `Authorization: Bearer` header when a token is held. No cookies are sent.

use reqwest::RequestBuilder;

/// Identity used when no user has been established
pub const ANONYMOUS_IDENTITY: &str = "anonymous";

/// Login credentials for session establishment
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Who is making a request and how it is authenticated
#[derive(Clone, Default)]
pub struct AuthContext {
    identity: Option<String>,
    bearer_token: Option<String>,
    credentials: Option<Credentials>,
    require_session: bool,
}

impl AuthContext {
    /// Weak-identity mode: no token, identity `"anonymous"`
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Require a bearer token before uploading
    pub fn requiring_session(mut self) -> Self {
        self.require_session = true;
        self
    }

    /// Identity to send, falling back to [`ANONYMOUS_IDENTITY`]
    pub fn identity(&self) -> &str {
        self.identity
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or(ANONYMOUS_IDENTITY)
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.bearer_token.as_deref()
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// True when a token must be acquired before an upload can proceed
    pub fn needs_session(&self) -> bool {
        self.require_session && self.bearer_token.is_none()
    }

    /// Record a newly established session
    ///
    /// The token replaces any previous one; the backend-assigned identity is
    /// only adopted when no identity was set explicitly.
    pub fn establish_session(&mut self, token: String, user_id: Option<String>) {
        self.bearer_token = Some(token);
        if self.identity.is_none() {
            self.identity = user_id.filter(|id| !id.is_empty());
        }
    }

    /// Attach the bearer credential to a request
    pub fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("identity", &self.identity())
            .field("has_token", &self.bearer_token.is_some())
            .field("credentials", &self.credentials)
            .field("require_session", &self.require_session)
            .finish()
    }
}
