//! Request validation and error recovery core of an OAuth2-capable gateway.
//!
//! The crate has two halves:
//! - **Validation template**: every authorization-protocol endpoint is a
//!   [`ProtocolValidator`] whose three phases are run by [`validate_request`]
//!   against a [`ValidationContext`] holding the normalized [`ParameterSet`],
//!   the [`SessionBinding`] and the error-body helpers.
//! - **Dispatch**: an [`ExchangeDispatcher`] runs each [`Exchange`] through an
//!   [`InterceptorChain`] of [`Stage`]s and guarantees that a response exists
//!   afterwards, synthesizing a content-negotiated error body when a stage
//!   fails.
//!
//! # Core Types
//!
//! - [`Exchange`]: one request and its eventual response
//! - [`ExchangeError`] / [`FailureKind`]: classified failures; the kind
//!   decides whether the dispatcher rethrows or swallows
//! - [`AuthorizationServer`]: authorization-code flow built on the template
//! - [`GatewayConfig`]: TOML-loadable settings
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use gateway_core::{
//!     AuthorizationServer, Client, ClientRegistry, Exchange, ExchangeDispatcher,
//!     GatewayConfig, InterceptorChain, Request, Stage,
//! };
//!
//! let config = GatewayConfig::default();
//! let clients = ClientRegistry::new().with_client(Client::new(
//!     "abc",
//!     "secret",
//!     "https://app.example/cb",
//!     ["openid"],
//! ));
//! let server: Arc<dyn Stage> = Arc::new(AuthorizationServer::new(
//!     config.authorization_server.clone(),
//!     clients,
//! ));
//! let dispatcher = ExchangeDispatcher::new(Arc::new(InterceptorChain::new(vec![server])), &config);
//!
//! let mut exchange = Exchange::new(Request::get(
//!     "/oauth2/auth?client_id=abc&redirect_uri=https%3A%2F%2Fapp.example%2Fcb\
//!      &response_type=code&scope=openid&state=xyz",
//! ));
//! dispatcher.dispatch(&mut exchange).expect("handled");
//!
//! let response = exchange.response().expect("response set");
//! assert_eq!(response.status().as_u16(), 302);
//! assert!(response.location().unwrap().ends_with("&state=xyz"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod chain;
mod clients;
mod config;
mod dispatch;
mod endpoints;
mod error;
mod exchange;
mod formatter;
mod json;
mod logging;
mod message;
mod negotiate;
mod params;
mod secret;
mod session;
mod token;
mod validator;

pub use chain::{invoke_stages, InterceptorChain, Stage, StageList};
pub use clients::{Client, ClientRegistry};
pub use config::{AuthServerConfig, ConfigError, GatewayConfig, DEFAULT_TRANSPORT_DOCS_URL};
pub use dispatch::{ExchangeDispatcher, NO_RESPONSE_MESSAGE};
pub use endpoints::{AuthorizationServer, AuthorizeRequest, CodeGrant, TokenRequest};
pub use error::{Disposition, ExchangeError, FailureKind, SessionError, ValidatorError};
pub use exchange::Exchange;
pub use formatter::{escape_xml, html_error_page, soap_fault_body, ErrorFormatter};
pub use json::JsonBodyWriter;
pub use logging::ExchangeLog;
pub use message::{mime, names, Header, HeaderField, Message, Request, Response, ResponseBuilder};
pub use negotiate::{detect, ErrorRepresentation};
pub use params::{prune_empty, ParamSource, ParameterSet, UrlParamSource};
pub use secret::ClientSecret;
pub use session::{
    extract_session_header, extract_session_id, take_session_header, InMemorySessionStore, Session,
    SessionBinding, SessionHeader, SessionStore,
};
pub use token::{BearerTokenIssuer, TokenIssuer};
pub use validator::{
    is_absolute_uri, is_open_id_scope, validate_request, ProtocolValidator, ValidationContext,
    ValidationOutcome,
};

/// Well-known request parameter names.
pub mod param_names {
    pub use crate::params::{
        CLIENT_ID, CLIENT_SECRET, CODE, GRANT_TYPE, PROMPT, REDIRECT_URI, RESPONSE_TYPE, SCOPE,
        SCOPE_INVALID, STATE,
    };
}
