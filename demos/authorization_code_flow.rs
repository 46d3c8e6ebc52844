//! Authorization-code flow through the dispatcher.
//!
//! This example shows a gateway serving the authorization server stage:
//! 1. Register a client
//! 2. Authorize with a session cookie and receive a code
//! 3. Redeem the code for an access token
//! 4. See how an unhandled failure is rendered for a JSON client
//!
//! Run with: `cargo run --example authorization_code_flow`

use std::collections::HashMap;
use std::sync::Arc;

use gateway_core::{
    AuthorizationServer, Client, ClientRegistry, Exchange, ExchangeDispatcher, ExchangeError,
    GatewayConfig, InterceptorChain, Message, Request, Stage,
};

/// Stage standing in for a backend that is down.
struct BrokenBackend;

impl Stage for BrokenBackend {
    fn name(&self) -> &str {
        "broken-backend"
    }

    fn handle_request(&self, exchange: &mut Exchange) -> Result<(), ExchangeError> {
        if exchange.request().path().starts_with("/api") {
            return Err(ExchangeError::generic("backend unavailable"));
        }
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let config = GatewayConfig::from_toml_str(
        r#"
        print_stack_trace = false

        [authorization_server]
        authorize_path = "/oauth2/auth"
        token_path = "/oauth2/token"
        "#,
    )?;

    println!("=== Step 1: Register client ===");
    let clients = ClientRegistry::new().with_client(Client::new(
        "demo-app",
        "demo-secret",
        "https://app.example/callback",
        ["openid", "profile"],
    ));
    println!("registered clients: {}", clients.len());

    let stages: Vec<Arc<dyn Stage>> = vec![
        Arc::new(AuthorizationServer::new(
            config.authorization_server.clone(),
            clients,
        )),
        Arc::new(BrokenBackend),
    ];
    let dispatcher = ExchangeDispatcher::new(Arc::new(InterceptorChain::new(stages)), &config);

    println!("\n=== Step 2: Authorize ===");
    let mut exchange = Exchange::new(
        Request::get(
            "/oauth2/auth?client_id=demo-app\
             &redirect_uri=https%3A%2F%2Fapp.example%2Fcallback\
             &response_type=code&scope=openid%20email&state=af0ifjsldkj",
        )
        .with_header("Cookie", "SESSIONID=demo-session"),
    );
    dispatcher.dispatch(&mut exchange)?;
    let response = exchange.response().ok_or("no response")?;
    let location = response.location().ok_or("no redirect")?;
    println!("status:   {}", response.status());
    println!("location: {location}");

    let query = location.split_once('?').map(|(_, q)| q).unwrap_or_default();
    let params: HashMap<String, String> = serde_urlencoded::from_str(query)?;
    let code = params.get("code").ok_or("no code issued")?;

    println!("\n=== Step 3: Redeem code ===");
    let form = format!(
        "grant_type=authorization_code&code={code}&client_id=demo-app\
         &client_secret=demo-secret&redirect_uri=https%3A%2F%2Fapp.example%2Fcallback"
    );
    let mut exchange = Exchange::new(
        Request::post("/oauth2/token")
            .with_header("Content-Type", "application/x-www-form-urlencoded")
            .with_body(form),
    );
    dispatcher.dispatch(&mut exchange)?;
    let response = exchange.response().ok_or("no response")?;
    println!("status: {}", response.status());
    println!("body:   {}", response.body_text());

    println!("\n=== Step 4: Unhandled failure ===");
    let mut exchange =
        Exchange::new(Request::get("/api/orders").with_header("Accept", "application/json"));
    dispatcher.dispatch(&mut exchange)?;
    let response = exchange.response().ok_or("no response")?;
    println!("status: {}", response.status());
    println!("body:   {}", response.body_text());

    Ok(())
}
