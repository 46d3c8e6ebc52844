//! Authorization-code flow served as an interceptor-chain stage.
//!
//! [`AuthorizationServer`] answers requests to the configured authorize and
//! token paths and ignores everything else, so it can sit anywhere in a
//! chain. Each endpoint is a [`ProtocolValidator`] run through
//! [`validate_request`].

mod authorize;
mod token;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

pub use authorize::AuthorizeRequest;
pub use token::TokenRequest;

use crate::chain::Stage;
use crate::clients::ClientRegistry;
use crate::config::AuthServerConfig;
use crate::error::ExchangeError;
use crate::exchange::Exchange;
use crate::message::Response;
use crate::params::{ParamSource, UrlParamSource};
use crate::session::{InMemorySessionStore, SessionBinding, SessionStore};
use crate::token::{BearerTokenIssuer, TokenIssuer};
use crate::validator::{validate_request, ProtocolValidator, ValidationContext};

/// What an issued authorization code was granted for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeGrant {
    /// Client the code was issued to.
    pub client_id: String,
    /// Redirect URI the code was delivered to.
    pub redirect_uri: String,
    /// Granted scope.
    pub scope: String,
    /// Session the authorization happened in.
    pub session_id: String,
}

/// Authorization server stage.
pub struct AuthorizationServer {
    config: AuthServerConfig,
    clients: ClientRegistry,
    sessions: SessionBinding,
    token_issuer: Arc<dyn TokenIssuer>,
    param_source: Arc<dyn ParamSource>,
    codes: Mutex<HashMap<String, CodeGrant>>,
}

impl AuthorizationServer {
    /// Creates a server with an in-memory session store, bearer tokens and
    /// URL parameter decoding.
    pub fn new(config: AuthServerConfig, clients: ClientRegistry) -> Self {
        Self {
            config,
            clients,
            sessions: SessionBinding::new(Arc::new(InMemorySessionStore::new())),
            token_issuer: Arc::new(BearerTokenIssuer),
            param_source: Arc::new(UrlParamSource),
            codes: Mutex::new(HashMap::new()),
        }
    }

    /// Uses `store` for sessions.
    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.sessions = SessionBinding::new(store);
        self
    }

    /// Uses `issuer` for access tokens.
    pub fn with_token_issuer(mut self, issuer: Arc<dyn TokenIssuer>) -> Self {
        self.token_issuer = issuer;
        self
    }

    /// Uses `source` to extract request parameters.
    pub fn with_param_source(mut self, source: Arc<dyn ParamSource>) -> Self {
        self.param_source = source;
        self
    }

    /// Returns the registered clients.
    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    /// Returns the number of issued, unredeemed codes.
    pub fn pending_codes(&self) -> usize {
        self.codes.lock().len()
    }

    pub(crate) fn store_code(&self, code: String, grant: CodeGrant) {
        self.codes.lock().insert(code, grant);
    }

    pub(crate) fn code_matches(&self, code: &str, client_id: &str, redirect_uri: &str) -> bool {
        self.codes
            .lock()
            .get(code)
            .is_some_and(|g| g.client_id == client_id && g.redirect_uri == redirect_uri)
    }

    pub(crate) fn take_code(&self, code: &str) -> Option<CodeGrant> {
        self.codes.lock().remove(code)
    }

    fn run<V: ProtocolValidator>(
        &self,
        validator: &mut V,
        exchange: &mut Exchange,
    ) -> Result<Response, ExchangeError> {
        let mut ctx = ValidationContext::new(
            exchange,
            self.param_source.as_ref(),
            self.sessions.clone(),
            Arc::clone(&self.token_issuer),
        )?;
        validate_request(validator, &mut ctx)
    }
}

impl Stage for AuthorizationServer {
    fn name(&self) -> &str {
        "authorization-server"
    }

    fn handle_request(&self, exchange: &mut Exchange) -> Result<(), ExchangeError> {
        let path = exchange.request().path();
        let response = if path == self.config.authorize_path {
            self.run(&mut AuthorizeRequest::new(self), exchange)?
        } else if path == self.config.token_path {
            self.run(&mut TokenRequest::new(self), exchange)?
        } else {
            return Ok(());
        };
        exchange.set_response(response);
        Ok(())
    }
}

impl std::fmt::Debug for AuthorizationServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationServer")
            .field("config", &self.config)
            .field("clients", &self.clients.len())
            .finish_non_exhaustive()
    }
}

/// Appends `name=value` to `uri`, choosing `?` or `&` as separator.
pub(crate) fn append_query(uri: &str, name: &str, value: &str) -> String {
    let separator = if uri.contains('?') { '&' } else { '?' };
    format!("{uri}{separator}{name}={}", urlencoding::encode(value))
}
