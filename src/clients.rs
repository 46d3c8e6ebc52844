use std::collections::HashMap;

use crate::secret::ClientSecret;

/// A client registered with the authorization server.
#[derive(Debug)]
pub struct Client {
    client_id: String,
    secret: ClientSecret,
    redirect_uri: String,
    scopes: Vec<String>,
}

impl Client {
    /// Creates a client allowed to request `scopes`.
    pub fn new(
        client_id: impl Into<String>,
        secret: impl Into<String>,
        redirect_uri: impl Into<String>,
        scopes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            secret: ClientSecret::new(secret),
            redirect_uri: redirect_uri.into(),
            scopes: scopes.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the client id.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the client's secret.
    pub fn secret(&self) -> &ClientSecret {
        &self.secret
    }

    /// Returns the single registered redirect URI.
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Returns true if the client may request `scope`.
    pub fn allows_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

/// Registered clients by id.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: HashMap<String, Client>,
}

impl ClientRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `client`, replacing any client with the same id.
    pub fn register(&mut self, client: Client) {
        self.clients.insert(client.client_id.clone(), client);
    }

    /// Registers `client` and returns the registry.
    pub fn with_client(mut self, client: Client) -> Self {
        self.register(client);
        self
    }

    /// Looks up a client.
    pub fn get(&self, client_id: &str) -> Option<&Client> {
        self.clients.get(client_id)
    }

    /// Returns the client only if `secret` authenticates it.
    pub fn authenticate(&self, client_id: &str, secret: &str) -> Option<&Client> {
        self.get(client_id).filter(|c| c.secret.verify(secret))
    }

    /// Returns the number of registered clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no clients are registered.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
