use serde_json::json;

use crate::error::ExchangeError;
use crate::message::{mime, Response};
use crate::params::{CLIENT_ID, CLIENT_SECRET, CODE, GRANT_TYPE, REDIRECT_URI};
use crate::validator::{ProtocolValidator, ValidationContext, ValidationOutcome};

use super::AuthorizationServer;

const AUTHORIZATION_CODE: &str = "authorization_code";

/// Back-channel token request redeeming an authorization code.
#[derive(Debug)]
pub struct TokenRequest<'s> {
    server: &'s AuthorizationServer,
}

impl<'s> TokenRequest<'s> {
    /// Creates the validator for one request.
    pub fn new(server: &'s AuthorizationServer) -> Self {
        Self { server }
    }
}

impl ProtocolValidator for TokenRequest<'_> {
    fn check_missing_parameters(
        &mut self,
        ctx: &mut ValidationContext<'_>,
    ) -> Result<ValidationOutcome, ExchangeError> {
        let params = ctx.params();
        let missing = [GRANT_TYPE, CODE, CLIENT_ID, CLIENT_SECRET, REDIRECT_URI]
            .into_iter()
            .find(|name| !params.contains(name));

        match missing {
            Some(name) => {
                let description = format!("missing parameter {name}");
                Ok(ctx
                    .json_error_response(&[
                        "error",
                        "invalid_request",
                        "error_description",
                        description.as_str(),
                    ])?
                    .into())
            }
            None => Ok(ValidationOutcome::Continue),
        }
    }

    fn validate_with_parameters(
        &mut self,
        ctx: &mut ValidationContext<'_>,
    ) -> Result<ValidationOutcome, ExchangeError> {
        let params = ctx.params();
        if params.grant_type() != Some(AUTHORIZATION_CODE) {
            return Ok(ctx
                .json_error_response(&["error", "unsupported_grant_type"])?
                .into());
        }

        let client_id = params.client_id().unwrap_or_default();
        let secret = params.client_secret().unwrap_or_default();
        if self.server.clients().authenticate(client_id, secret).is_none() {
            ctx.exchange()
                .log()
                .warn(format_args!("client authentication failed for {}", client_id));
            return Ok(ctx
                .www_authenticate_error(Response::unauthorized(), "invalid_client")
                .into());
        }

        let code = params.code().unwrap_or_default();
        let redirect_uri = params.redirect_uri().unwrap_or_default();
        if !self.server.code_matches(code, client_id, redirect_uri) {
            return Ok(ctx.json_error_response(&["error", "invalid_grant"])?.into());
        }
        Ok(ValidationOutcome::Continue)
    }

    fn get_response(&mut self, ctx: &mut ValidationContext<'_>) -> Result<Response, ExchangeError> {
        let code = ctx.params().code().unwrap_or_default();
        // Redeemed by a concurrent request since validation.
        let Some(grant) = self.server.take_code(code) else {
            return Ok(ctx.json_error_response(&["error", "invalid_grant"])?);
        };

        let issuer = ctx.token_issuer();
        let body = json!({
            "access_token": issuer.issue_token(),
            "token_type": issuer.token_type(),
            "scope": grant.scope,
        });
        Ok(Response::ok()
            .content_type(mime::APPLICATION_JSON_UTF8)
            .body(body.to_string())
            .dont_cache()
            .build())
    }
}
