//! Three-phase validation template for authorization-protocol requests.
//!
//! Every protocol endpoint implements [`ProtocolValidator`] and is run through
//! [`validate_request`]:
//!
//! ```text
//! check_missing_parameters --Continue--> validate_with_parameters --Continue--> get_response
//!          |                                      |                                  |
//!       Decided                                Decided                            Response
//! ```
//!
//! The first phase that decides short-circuits the rest. Only `get_response`
//! may perform the protocol's side effect. Protocol errors (missing or invalid
//! parameters) are always answered with a decided [`Response`]; `Err` is
//! reserved for failures the dispatcher must handle.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{ExchangeError, SessionError, ValidatorError};
use crate::exchange::Exchange;
use crate::json::JsonBodyWriter;
use crate::message::{mime, names, Response, ResponseBuilder};
use crate::params::{ParamSource, ParameterSet};
use crate::session::{take_session_header, SessionBinding, SessionHeader};
use crate::token::TokenIssuer;

/// Result of a validation phase that may decline to decide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// No decision yet; the next phase runs.
    Continue,
    /// The response for this request is decided.
    Decided(Response),
}

impl ValidationOutcome {
    /// Returns true if a response was decided.
    pub fn is_decided(&self) -> bool {
        matches!(self, ValidationOutcome::Decided(_))
    }
}

impl From<Response> for ValidationOutcome {
    fn from(response: Response) -> Self {
        ValidationOutcome::Decided(response)
    }
}

/// One protocol endpoint's validation logic.
pub trait ProtocolValidator {
    /// Checks that all required parameters are present.
    fn check_missing_parameters(
        &mut self,
        ctx: &mut ValidationContext<'_>,
    ) -> Result<ValidationOutcome, ExchangeError>;

    /// Checks parameter values: redirect URIs, scopes, client credentials.
    fn validate_with_parameters(
        &mut self,
        ctx: &mut ValidationContext<'_>,
    ) -> Result<ValidationOutcome, ExchangeError>;

    /// Performs the protocol side effect and produces the final response.
    fn get_response(&mut self, ctx: &mut ValidationContext<'_>) -> Result<Response, ExchangeError>;
}

/// Runs the three phases of `validator` in order.
///
/// # Errors
///
/// Propagates any failure raised by a phase; protocol errors are never
/// reported through `Err`.
pub fn validate_request<V: ProtocolValidator + ?Sized>(
    validator: &mut V,
    ctx: &mut ValidationContext<'_>,
) -> Result<Response, ExchangeError> {
    if let ValidationOutcome::Decided(response) = validator.check_missing_parameters(ctx)? {
        ctx.log_decision("check_missing_parameters", &response);
        return Ok(response);
    }
    if let ValidationOutcome::Decided(response) = validator.validate_with_parameters(ctx)? {
        ctx.log_decision("validate_with_parameters", &response);
        return Ok(response);
    }
    let response = validator.get_response(ctx)?;
    ctx.log_decision("get_response", &response);
    Ok(response)
}

/// Shared state and helpers handed to every validation phase.
///
/// A context lives for exactly one request. It owns the request's
/// [`ParameterSet`] and its own JSON error-body writer, so partially written
/// error bodies of different requests can never interleave.
pub struct ValidationContext<'a> {
    exchange: &'a mut Exchange,
    params: ParameterSet,
    sessions: SessionBinding,
    token_issuer: Arc<dyn TokenIssuer>,
    json: Mutex<JsonBodyWriter>,
}

impl<'a> ValidationContext<'a> {
    /// Extracts and prunes the request parameters and sets up the helpers.
    ///
    /// # Errors
    ///
    /// Propagates the parameter source's failure.
    pub fn new(
        exchange: &'a mut Exchange,
        source: &dyn ParamSource,
        sessions: SessionBinding,
        token_issuer: Arc<dyn TokenIssuer>,
    ) -> Result<Self, ExchangeError> {
        let params = ParameterSet::new(source.params(exchange)?);
        Ok(Self {
            exchange,
            params,
            sessions,
            token_issuer,
            json: Mutex::new(JsonBodyWriter::new()),
        })
    }

    /// Returns the exchange being validated.
    pub fn exchange(&self) -> &Exchange {
        self.exchange
    }

    /// Returns the exchange being validated for modification.
    pub fn exchange_mut(&mut self) -> &mut Exchange {
        self.exchange
    }

    /// Returns the request parameters.
    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    /// Returns the request parameters for the `scope` setters.
    pub fn params_mut(&mut self) -> &mut ParameterSet {
        &mut self.params
    }

    /// Returns the session binding.
    pub fn sessions(&self) -> &SessionBinding {
        &self.sessions
    }

    /// Returns the configured token issuer.
    pub fn token_issuer(&self) -> &dyn TokenIssuer {
        self.token_issuer.as_ref()
    }

    /// Finds the request's session cookie header, renaming a `Cookie` field
    /// to `Set-Cookie` on the request.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::HeaderMissing`] if the request has no cookie.
    pub fn request_session_header(&mut self) -> Result<SessionHeader, SessionError> {
        take_session_header(self.exchange.request_mut())
    }

    /// Builds a `400` JSON error body from alternating keys and values.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError::OddArgumentCount`] without writing anything
    /// if `pairs` has odd length.
    pub fn json_error_response(&self, pairs: &[&str]) -> Result<Response, ValidatorError> {
        if pairs.len() % 2 != 0 {
            return Err(ValidatorError::OddArgumentCount(pairs.len()));
        }
        let json = {
            let mut writer = self.json.lock();
            let object = writer.reset_and_get();
            for pair in pairs.chunks_exact(2) {
                object.insert(pair[0].to_string(), Value::String(pair[1].to_string()));
            }
            writer.get_json()
        };

        Ok(Response::bad_request()
            .body(json)
            .content_type(mime::APPLICATION_JSON_UTF8)
            .dont_cache()
            .build())
    }

    /// Builds a front-channel redirect to `url`, appending `&state=` when a
    /// state is given.
    ///
    /// The state is URL-encoded; `url` is used as given.
    pub fn form_urlencoded_redirect(&self, state: Option<&str>, url: &str) -> Response {
        let location = match state {
            Some(state) => format!("{url}&state={}", urlencoding::encode(state)),
            None => url.to_string(),
        };
        Response::redirect(location, false)
            .header(names::CONTENT_TYPE, mime::APPLICATION_X_WWW_FORM_URLENCODED)
            .body_empty()
            .dont_cache()
            .build()
    }

    /// Finishes `builder` as a bearer challenge with an empty body.
    pub fn www_authenticate_error(&self, builder: ResponseBuilder, error_value: &str) -> Response {
        builder
            .body_empty()
            .header(
                names::WWW_AUTHENTICATE,
                format!(
                    "{} error=\"{}\"",
                    self.token_issuer.token_type(),
                    error_value
                ),
            )
            .build()
    }

    fn log_decision(&self, phase: &str, response: &Response) {
        self.exchange.log().debug(format_args!(
            "{} decided with status {}",
            phase,
            response.status().as_u16()
        ));
    }
}

/// Returns true if splitting on `"://"` yields exactly two segments.
///
/// Trailing empty segments are ignored. This is a deliberately cheap
/// approximation, not URI parsing: a relative URI that carries `://` inside
/// a query parameter is classified as absolute.
///
/// # Examples
///
/// ```
/// use gateway_core::is_absolute_uri;
///
/// assert!(is_absolute_uri("http://host/path"));
/// assert!(!is_absolute_uri("relative/path"));
/// assert!(!is_absolute_uri(""));
/// ```
pub fn is_absolute_uri(uri: &str) -> bool {
    let mut segments: Vec<&str> = uri.split("://").collect();
    while segments.last().is_some_and(|s| s.is_empty()) {
        segments.pop();
    }
    segments.len() == 2
}

/// Returns true if the space-delimited `scope` contains the token `openid`.
pub fn is_open_id_scope(scope: &str) -> bool {
    scope.split(' ').any(|token| token == "openid")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use http::StatusCode;

    use super::*;
    use crate::message::{Message, Request};
    use crate::session::InMemorySessionStore;
    use crate::token::BearerTokenIssuer;

    struct FixedParams(HashMap<String, String>);

    impl ParamSource for FixedParams {
        fn params(&self, _exchange: &Exchange) -> Result<HashMap<String, String>, ExchangeError> {
            Ok(self.0.clone())
        }
    }

    fn context<'a>(exchange: &'a mut Exchange, pairs: &[(&str, &str)]) -> ValidationContext<'a> {
        let source = FixedParams(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        ValidationContext::new(
            exchange,
            &source,
            SessionBinding::new(Arc::new(InMemorySessionStore::new())),
            Arc::new(BearerTokenIssuer),
        )
        .unwrap()
    }

    /// Records how often each phase ran and which phase decides.
    #[derive(Default)]
    struct CountingValidator {
        decide_in: Option<usize>,
        calls: [usize; 3],
        scope_seen_last: Option<String>,
    }

    impl CountingValidator {
        fn deciding_in(phase: usize) -> Self {
            Self {
                decide_in: Some(phase),
                ..Self::default()
            }
        }
    }

    impl ProtocolValidator for CountingValidator {
        fn check_missing_parameters(
            &mut self,
            _ctx: &mut ValidationContext<'_>,
        ) -> Result<ValidationOutcome, ExchangeError> {
            self.calls[0] += 1;
            if self.decide_in == Some(1) {
                return Ok(Response::bad_request().build().into());
            }
            Ok(ValidationOutcome::Continue)
        }

        fn validate_with_parameters(
            &mut self,
            ctx: &mut ValidationContext<'_>,
        ) -> Result<ValidationOutcome, ExchangeError> {
            self.calls[1] += 1;
            ctx.params_mut().set_scope("openid");
            if self.decide_in == Some(2) {
                return Ok(Response::unauthorized().build().into());
            }
            Ok(ValidationOutcome::Continue)
        }

        fn get_response(
            &mut self,
            ctx: &mut ValidationContext<'_>,
        ) -> Result<Response, ExchangeError> {
            self.calls[2] += 1;
            self.scope_seen_last = ctx.params().scope().map(str::to_string);
            Ok(Response::ok().build())
        }
    }

    #[test]
    fn first_phase_decision_short_circuits() {
        let mut exchange = Exchange::new(Request::get("/"));
        let mut ctx = context(&mut exchange, &[]);
        let mut validator = CountingValidator::deciding_in(1);

        let response = validate_request(&mut validator, &mut ctx).unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(validator.calls, [1, 0, 0]);
    }

    #[test]
    fn second_phase_decision_skips_response_phase() {
        let mut exchange = Exchange::new(Request::get("/"));
        let mut ctx = context(&mut exchange, &[]);
        let mut validator = CountingValidator::deciding_in(2);

        let response = validate_request(&mut validator, &mut ctx).unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(validator.calls, [1, 1, 0]);
    }

    #[test]
    fn all_phases_run_in_order_when_undecided() {
        let mut exchange = Exchange::new(Request::get("/"));
        let mut ctx = context(&mut exchange, &[("scope", "openid profile")]);
        let mut validator = CountingValidator::default();

        let response = validate_request(&mut validator, &mut ctx).unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(validator.calls, [1, 1, 1]);
        // scope narrowed while validating is what the response phase sees
        assert_eq!(validator.scope_seen_last.as_deref(), Some("openid"));
    }

    #[test]
    fn context_prunes_empty_params() {
        let mut exchange = Exchange::new(Request::get("/"));
        let ctx = context(&mut exchange, &[("client_id", "abc"), ("state", "")]);

        assert_eq!(ctx.params().len(), 1);
        assert_eq!(ctx.params().client_id(), Some("abc"));
    }

    #[test]
    fn json_error_response_is_flat_object() {
        let mut exchange = Exchange::new(Request::get("/"));
        let ctx = context(&mut exchange, &[]);

        let response = ctx
            .json_error_response(&["error", "invalid_request", "error_description", "x"])
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!response.is_cacheable());
        assert_eq!(
            response.header().content_type(),
            Some(mime::APPLICATION_JSON_UTF8)
        );
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["error"], "invalid_request");
        assert_eq!(body["error_description"], "x");
    }

    #[test]
    fn json_error_response_rejects_odd_count() {
        let mut exchange = Exchange::new(Request::get("/"));
        let ctx = context(&mut exchange, &[]);

        assert_eq!(
            ctx.json_error_response(&["error"]),
            Err(ValidatorError::OddArgumentCount(1))
        );
    }

    #[test]
    fn json_writer_is_reset_between_responses() {
        let mut exchange = Exchange::new(Request::get("/"));
        let ctx = context(&mut exchange, &[]);

        ctx.json_error_response(&["a", "1"]).unwrap();
        let second = ctx.json_error_response(&["b", "2"]).unwrap();

        assert_eq!(second.body_text(), r#"{"b":"2"}"#);
    }

    #[test]
    fn redirect_appends_encoded_state() {
        let mut exchange = Exchange::new(Request::get("/"));
        let ctx = context(&mut exchange, &[]);

        let response = ctx.form_urlencoded_redirect(Some("a b&c"), "http://x?error=e");

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.location(), Some("http://x?error=e&state=a%20b%26c"));
        assert_eq!(
            response.header().content_type(),
            Some(mime::APPLICATION_X_WWW_FORM_URLENCODED)
        );
        assert!(response.body().is_empty());
        assert!(!response.is_cacheable());
    }

    #[test]
    fn www_authenticate_uses_token_type() {
        let mut exchange = Exchange::new(Request::get("/"));
        let ctx = context(&mut exchange, &[]);

        let response =
            ctx.www_authenticate_error(Response::unauthorized().body("dropped"), "invalid_token");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.body().is_empty());
        assert_eq!(
            response.header().first_value(names::WWW_AUTHENTICATE),
            Some("Bearer error=\"invalid_token\"")
        );
    }

    #[test]
    fn request_session_header_renames_cookie() {
        let mut exchange = Exchange::new(Request::get("/").with_header("Cookie", "SESSIONID=s1"));
        let mut ctx = context(&mut exchange, &[]);

        let found = ctx.request_session_header().unwrap();

        assert_eq!(found.value(), "SESSIONID=s1");
        assert!(ctx.exchange().request().header().contains(names::SET_COOKIE));
        assert!(!ctx.exchange().request().header().contains(names::COOKIE));
    }

    #[test]
    fn absolute_uri_heuristic() {
        assert!(is_absolute_uri("https://example.com/cb"));
        assert!(!is_absolute_uri("/cb"));
        assert!(!is_absolute_uri("http://"));
        assert!(!is_absolute_uri("a://b://c"));
        // documented approximation
        assert!(is_absolute_uri("/cb?next=http://evil"));
    }

    #[test]
    fn open_id_scope_matches_whole_token() {
        assert!(is_open_id_scope("profile openid email"));
        assert!(is_open_id_scope("openid"));
        assert!(!is_open_id_scope("openidconnect"));
        assert!(!is_open_id_scope(""));
    }
}
