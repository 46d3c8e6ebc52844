use crate::error::{ExchangeError, SessionError};
use crate::message::{names, Message, Response};
use crate::session::{extract_session_header, extract_session_id};
use crate::validator::{
    is_absolute_uri, is_open_id_scope, ProtocolValidator, ValidationContext, ValidationOutcome,
};

use super::{append_query, AuthorizationServer, CodeGrant};

/// Front-channel authorization request (`response_type=code`).
///
/// Errors detected before the client and its registered redirect URI are
/// verified are answered with a JSON body; later errors are delivered to the
/// client's redirect URI.
///
/// The response binds the request to the session named by its `SESSIONID`
/// cookie. A request without any cookie header starts a new session; a cookie
/// header lacking `SESSIONID` is a [`SessionError::IdMissing`] failure.
#[derive(Debug)]
pub struct AuthorizeRequest<'s> {
    server: &'s AuthorizationServer,
}

impl<'s> AuthorizeRequest<'s> {
    /// Creates the validator for one request.
    pub fn new(server: &'s AuthorizationServer) -> Self {
        Self { server }
    }

    fn redirect_error(ctx: &ValidationContext<'_>, error: &str) -> ValidationOutcome {
        let params = ctx.params();
        let redirect_uri = params.redirect_uri().unwrap_or_default();
        ctx.form_urlencoded_redirect(params.state(), &append_query(redirect_uri, "error", error))
            .into()
    }
}

impl ProtocolValidator for AuthorizeRequest<'_> {
    fn check_missing_parameters(
        &mut self,
        ctx: &mut ValidationContext<'_>,
    ) -> Result<ValidationOutcome, ExchangeError> {
        let params = ctx.params();
        if params.client_id().is_none() || params.redirect_uri().is_none() {
            return Ok(ctx
                .json_error_response(&[
                    "error",
                    "invalid_request",
                    "error_description",
                    "client_id and redirect_uri are required",
                ])?
                .into());
        }
        Ok(ValidationOutcome::Continue)
    }

    fn validate_with_parameters(
        &mut self,
        ctx: &mut ValidationContext<'_>,
    ) -> Result<ValidationOutcome, ExchangeError> {
        let params = ctx.params();
        let client_id = params.client_id().unwrap_or_default();
        let redirect_uri = params.redirect_uri().unwrap_or_default();

        let Some(client) = self.server.clients().get(client_id) else {
            return Ok(ctx.json_error_response(&["error", "invalid_client"])?.into());
        };
        if !is_absolute_uri(redirect_uri) || redirect_uri != client.redirect_uri() {
            return Ok(ctx
                .json_error_response(&[
                    "error",
                    "invalid_request",
                    "error_description",
                    "redirect_uri does not match the registered one",
                ])?
                .into());
        }
        match params.response_type() {
            None => return Ok(Self::redirect_error(ctx, "invalid_request")),
            Some("code") => {}
            Some(_) => return Ok(Self::redirect_error(ctx, "unsupported_response_type")),
        }

        let (allowed, rejected): (Vec<&str>, Vec<&str>) = params
            .scope()
            .unwrap_or_default()
            .split(' ')
            .filter(|s| !s.is_empty())
            .partition(|s| client.allows_scope(s));
        let allowed = allowed.join(" ");
        let rejected = rejected.join(" ");

        let params = ctx.params_mut();
        params.set_scope_invalid(rejected);
        params.set_scope(allowed);

        let Some(scope) = ctx.params().scope() else {
            return Ok(Self::redirect_error(ctx, "invalid_scope"));
        };
        if ctx.params().prompt() == Some("none")
            && is_open_id_scope(scope)
            && ctx
                .sessions()
                .session(ctx.exchange().request())
                .is_none()
        {
            return Ok(Self::redirect_error(ctx, "login_required"));
        }
        Ok(ValidationOutcome::Continue)
    }

    fn get_response(&mut self, ctx: &mut ValidationContext<'_>) -> Result<Response, ExchangeError> {
        // A cookie without SESSIONID fails before the request is touched.
        let found = extract_session_header(ctx.exchange().request().header());
        let session_id = match found {
            Ok(found) => {
                let session_id = extract_session_id(found.value())?;
                ctx.request_session_header()?;
                session_id
            }
            Err(SessionError::HeaderMissing) => uuid::Uuid::new_v4().simple().to_string(),
            Err(err) => return Err(err.into()),
        };

        let session = ctx.sessions().create_session(ctx.exchange(), &session_id);
        ctx.sessions().add_params(&session, ctx.params());

        let params = ctx.params();
        let redirect_uri = params.redirect_uri().unwrap_or_default();
        let code = uuid::Uuid::new_v4().simple().to_string();
        self.server.store_code(
            code.clone(),
            CodeGrant {
                client_id: params.client_id().unwrap_or_default().to_string(),
                redirect_uri: redirect_uri.to_string(),
                scope: params.scope().unwrap_or_default().to_string(),
                session_id: session_id.clone(),
            },
        );
        ctx.exchange()
            .log()
            .info(format_args!("issued authorization code in session {}", session_id));

        let mut response =
            ctx.form_urlencoded_redirect(params.state(), &append_query(redirect_uri, "code", &code));
        response
            .header_mut()
            .add(names::SET_COOKIE, format!("SESSIONID={session_id}; Path=/"));
        Ok(response)
    }
}
