/// Issues access tokens for the authorization server.
///
/// The token type is what appears in `WWW-Authenticate` challenges and in
/// token responses.
pub trait TokenIssuer: Send + Sync {
    /// Returns the token type, e.g. `Bearer`.
    fn token_type(&self) -> &str;

    /// Issues a new opaque access token.
    fn issue_token(&self) -> String;
}

/// Issues random opaque bearer tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct BearerTokenIssuer;

impl TokenIssuer for BearerTokenIssuer {
    fn token_type(&self) -> &str {
        "Bearer"
    }

    fn issue_token(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}
