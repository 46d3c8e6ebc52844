use std::collections::HashMap;
use std::sync::Arc;

use gateway_core::{
    AuthorizationServer, Client, ClientRegistry, Exchange, ExchangeDispatcher, GatewayConfig,
    InMemorySessionStore, InterceptorChain, Message, Request, Response, SessionStore, Stage,
};

const REDIRECT: &str = "https://app.example/cb";
const REDIRECT_ENCODED: &str = "https%3A%2F%2Fapp.example%2Fcb";

struct Gateway {
    dispatcher: ExchangeDispatcher,
    sessions: Arc<InMemorySessionStore>,
}

impl Gateway {
    fn new() -> Self {
        let config = GatewayConfig::default();
        let clients = ClientRegistry::new().with_client(Client::new(
            "abc",
            "s3cr3t",
            REDIRECT,
            ["openid", "profile"],
        ));
        let sessions = Arc::new(InMemorySessionStore::new());
        let server = AuthorizationServer::new(config.authorization_server.clone(), clients)
            .with_session_store(sessions.clone());
        let stages: Vec<Arc<dyn Stage>> = vec![Arc::new(server)];

        Self {
            dispatcher: ExchangeDispatcher::new(Arc::new(InterceptorChain::new(stages)), &config),
            sessions,
        }
    }

    fn send(&self, request: Request) -> Response {
        let mut exchange = Exchange::new(request);
        self.dispatcher
            .dispatch(&mut exchange)
            .expect("no transport failure");
        exchange.take_response().expect("response always set")
    }
}

fn authorize(query: &str) -> Request {
    Request::get(format!("/oauth2/auth?{query}"))
}

fn token(form: &str) -> Request {
    Request::post("/oauth2/token")
        .with_header("Content-Type", "application/x-www-form-urlencoded")
        .with_body(form.to_string())
}

fn json_body(response: &Response) -> serde_json::Value {
    serde_json::from_slice(response.body()).unwrap()
}

fn query_of(location: &str) -> HashMap<String, String> {
    let query = location.split_once('?').map(|(_, q)| q).unwrap_or_default();
    serde_urlencoded::from_str(query).unwrap()
}

#[test]
fn missing_client_id_is_json_error() {
    let gateway = Gateway::new();

    let response = gateway.send(authorize(&format!("redirect_uri={REDIRECT_ENCODED}")));

    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(json_body(&response)["error"], "invalid_request");
    assert!(!response.is_cacheable());
}

#[test]
fn empty_values_count_as_missing() {
    let gateway = Gateway::new();

    let response = gateway.send(authorize(&format!(
        "client_id=&redirect_uri={REDIRECT_ENCODED}&response_type=code"
    )));

    assert_eq!(json_body(&response)["error"], "invalid_request");
}

#[test]
fn missing_response_type_redirects_with_state() {
    let gateway = Gateway::new();

    let response = gateway.send(authorize(&format!(
        "client_id=abc&redirect_uri={REDIRECT_ENCODED}&state=xyz"
    )));

    assert_eq!(response.status().as_u16(), 302);
    assert_eq!(
        response.location(),
        Some("https://app.example/cb?error=invalid_request&state=xyz")
    );
    assert!(response.body().is_empty());
}

#[test]
fn missing_response_type_never_redirects_to_unverified_uri() {
    let gateway = Gateway::new();

    let unknown_client = gateway.send(authorize(
        "client_id=nobody&redirect_uri=https%3A%2F%2Fevil.example%2Fsteal&state=x",
    ));
    assert_eq!(unknown_client.status().as_u16(), 400);
    assert!(unknown_client.location().is_none());
    assert_eq!(json_body(&unknown_client)["error"], "invalid_client");

    let foreign_uri = gateway.send(authorize(
        "client_id=abc&redirect_uri=https%3A%2F%2Fevil.example%2Fsteal&state=x",
    ));
    assert_eq!(foreign_uri.status().as_u16(), 400);
    assert!(foreign_uri.location().is_none());
}

#[test]
fn unknown_client_is_json_error() {
    let gateway = Gateway::new();

    let response = gateway.send(authorize(&format!(
        "client_id=nobody&redirect_uri={REDIRECT_ENCODED}&response_type=code&scope=openid"
    )));

    assert_eq!(json_body(&response)["error"], "invalid_client");
}

#[test]
fn foreign_redirect_uri_is_not_followed() {
    let gateway = Gateway::new();

    let response = gateway.send(authorize(
        "client_id=abc&redirect_uri=https%3A%2F%2Fevil.example%2Fcb&response_type=code&scope=openid",
    ));

    assert_eq!(response.status().as_u16(), 400);
    assert!(response.location().is_none());
}

#[test]
fn unsupported_response_type_redirects() {
    let gateway = Gateway::new();

    let response = gateway.send(authorize(&format!(
        "client_id=abc&redirect_uri={REDIRECT_ENCODED}&response_type=token&scope=openid"
    )));

    let params = query_of(response.location().unwrap());
    assert_eq!(params["error"], "unsupported_response_type");
    assert!(!params.contains_key("state"));
}

#[test]
fn disallowed_scopes_only_is_invalid_scope() {
    let gateway = Gateway::new();

    let response = gateway.send(authorize(&format!(
        "client_id=abc&redirect_uri={REDIRECT_ENCODED}&response_type=code&scope=admin&state=s"
    )));

    let params = query_of(response.location().unwrap());
    assert_eq!(params["error"], "invalid_scope");
    assert_eq!(params["state"], "s");
}

#[test]
fn prompt_none_without_session_requires_login() {
    let gateway = Gateway::new();

    let response = gateway.send(authorize(&format!(
        "client_id=abc&redirect_uri={REDIRECT_ENCODED}&response_type=code&scope=openid&prompt=none"
    )));

    assert_eq!(query_of(response.location().unwrap())["error"], "login_required");
}

#[test]
fn authorization_code_flow_end_to_end() {
    let gateway = Gateway::new();

    let response = gateway.send(
        authorize(&format!(
            "client_id=abc&redirect_uri={REDIRECT_ENCODED}&response_type=code\
             &scope=openid%20admin%20profile&state=a%20b"
        ))
        .with_header("Cookie", "SESSIONID=sess-1"),
    );

    assert_eq!(response.status().as_u16(), 302);
    let location = response.location().unwrap();
    assert!(location.starts_with("https://app.example/cb?code="));
    assert!(location.ends_with("&state=a%20b"));
    assert_eq!(
        response.header().first_value("Set-Cookie"),
        Some("SESSIONID=sess-1; Path=/")
    );

    // The session now carries the filtered request parameters.
    let lookup_request = Request::get("/").with_header("Cookie", "SESSIONID=sess-1");
    let session = gateway.sessions.lookup(&lookup_request).expect("session bound");
    assert_eq!(session.attribute("client_id").as_deref(), Some("abc"));
    assert_eq!(session.attribute("scope").as_deref(), Some("openid profile"));
    assert_eq!(session.attribute("scope_invalid").as_deref(), Some("admin"));

    let code = query_of(location)["code"].clone();
    let form = format!(
        "grant_type=authorization_code&code={code}&client_id=abc&client_secret=s3cr3t\
         &redirect_uri={REDIRECT_ENCODED}"
    );

    let response = gateway.send(token(&form));
    assert_eq!(response.status().as_u16(), 200);
    assert!(!response.is_cacheable());
    let body = json_body(&response);
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["scope"], "openid profile");
    assert!(!body["access_token"].as_str().unwrap().is_empty());

    // Codes are single use.
    let replay = gateway.send(token(&form));
    assert_eq!(replay.status().as_u16(), 400);
    assert_eq!(json_body(&replay)["error"], "invalid_grant");
}

#[test]
fn prompt_none_with_existing_session_succeeds() {
    let gateway = Gateway::new();
    let query = format!("client_id=abc&redirect_uri={REDIRECT_ENCODED}&response_type=code&scope=openid");

    gateway.send(authorize(&query).with_header("Cookie", "SESSIONID=known"));
    let response = gateway.send(
        authorize(&format!("{query}&prompt=none")).with_header("Cookie", "SESSIONID=known"),
    );

    assert!(query_of(response.location().unwrap()).contains_key("code"));
}

#[test]
fn token_request_with_wrong_secret_is_challenged() {
    let gateway = Gateway::new();

    let response = gateway.send(token(&format!(
        "grant_type=authorization_code&code=c&client_id=abc&client_secret=nope\
         &redirect_uri={REDIRECT_ENCODED}"
    )));

    assert_eq!(response.status().as_u16(), 401);
    assert!(response.body().is_empty());
    assert_eq!(
        response.header().first_value("WWW-Authenticate"),
        Some("Bearer error=\"invalid_client\"")
    );
}

#[test]
fn token_request_checks_grant_type_first() {
    let gateway = Gateway::new();

    let response = gateway.send(token(&format!(
        "grant_type=password&code=c&client_id=abc&client_secret=nope&redirect_uri={REDIRECT_ENCODED}"
    )));

    assert_eq!(json_body(&response)["error"], "unsupported_grant_type");
}

#[test]
fn token_request_names_missing_parameter() {
    let gateway = Gateway::new();

    let response = gateway.send(token("grant_type=authorization_code"));

    let body = json_body(&response);
    assert_eq!(body["error"], "invalid_request");
    assert_eq!(body["error_description"], "missing parameter code");
}

#[test]
fn other_paths_fall_through() {
    let gateway = Gateway::new();
    let mut exchange = Exchange::new(Request::get("/elsewhere"));

    let err = gateway.dispatcher.dispatch(&mut exchange).unwrap_err();

    assert_eq!(err.kind(), gateway_core::FailureKind::Abort);
}

#[test]
fn cookie_without_session_id_fails_the_request() {
    let gateway = Gateway::new();
    let mut exchange = Exchange::new(
        authorize(&format!(
            "client_id=abc&redirect_uri={REDIRECT_ENCODED}&response_type=code&scope=openid"
        ))
        .with_header("Cookie", "theme=dark"),
    );

    // Session failures are swallowed after a 500 body is synthesized.
    gateway.dispatcher.dispatch(&mut exchange).unwrap();

    let response = exchange.response().unwrap();
    assert_eq!(response.status().as_u16(), 500);
    assert!(response.location().is_none());
    assert!(response.header().first_value("Set-Cookie").is_none());
    assert!(response
        .body_text()
        .contains("processing error: session binding failed"));

    let cookie = &exchange.request().header().fields()[0];
    assert_eq!(cookie.name(), "Cookie");
    assert_eq!(cookie.value(), "theme=dark");
    assert!(gateway.sessions.is_empty());
}

#[test]
fn request_without_cookie_starts_new_session() {
    let gateway = Gateway::new();

    let response = gateway.send(authorize(&format!(
        "client_id=abc&redirect_uri={REDIRECT_ENCODED}&response_type=code&scope=openid"
    )));

    assert_eq!(response.status().as_u16(), 302);
    let cookie = response.header().first_value("Set-Cookie").unwrap();
    assert!(cookie.starts_with("SESSIONID="));
    assert_eq!(gateway.sessions.len(), 1);
}
