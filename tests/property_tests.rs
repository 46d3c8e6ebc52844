//! Property tests for parameter normalization, scope matching and the
//! front-channel redirect helper.

use std::collections::HashMap;
use std::sync::Arc;

use gateway_core::{
    is_absolute_uri, is_open_id_scope, prune_empty, BearerTokenIssuer, Exchange, ExchangeError,
    InMemorySessionStore, ParamSource, ParameterSet, Request, SessionBinding, ValidationContext,
};
use proptest::prelude::*;

struct NoParams;

impl ParamSource for NoParams {
    fn params(&self, _exchange: &Exchange) -> Result<HashMap<String, String>, ExchangeError> {
        Ok(HashMap::new())
    }
}

// Strategy: raw parameter maps where roughly a third of the values are empty
fn arb_raw_params() -> impl Strategy<Value = HashMap<String, String>> {
    prop::collection::hash_map(
        "[a-z_]{1,12}",
        prop_oneof![Just(String::new()), "[ -~]{1,16}", "[a-z]{1,8}"],
        0..16,
    )
}

fn arb_scope_token() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("openid".to_string()),
        Just("profile".to_string()),
        Just("openidx".to_string()),
        Just("xopenid".to_string()),
        "[a-z]{1,8}",
    ]
}

proptest! {
    /// Property: pruning removes exactly the empty entries
    #[test]
    fn proptest_prune_removes_exactly_empty_values(raw in arb_raw_params()) {
        let mut pruned = raw.clone();
        prune_empty(&mut pruned);

        for (key, value) in &raw {
            if value.is_empty() {
                prop_assert!(!pruned.contains_key(key));
            } else {
                prop_assert_eq!(pruned.get(key), Some(value));
            }
        }
        prop_assert!(pruned.len() <= raw.len());
    }

    /// Property: a ParameterSet never exposes an empty value
    #[test]
    fn proptest_parameter_set_has_no_empty_values(raw in arb_raw_params(), scope in "[a-z ]{0,10}") {
        let mut params = ParameterSet::new(raw);
        params.set_scope(scope.clone());

        prop_assert!(params.iter().all(|(_, v)| !v.is_empty()));
        prop_assert_eq!(params.scope().is_some(), !scope.is_empty());
    }

    /// Property: openid matches as a whole space-delimited token only
    #[test]
    fn proptest_open_id_scope_is_whole_token(tokens in prop::collection::vec(arb_scope_token(), 0..6)) {
        let scope = tokens.join(" ");
        let expected = tokens.iter().any(|t| t == "openid");

        prop_assert_eq!(is_open_id_scope(&scope), expected);
    }

    /// Property: scheme-qualified URIs without further separators are absolute
    #[test]
    fn proptest_absolute_uri_accepts_scheme_and_rest(
        scheme in "[a-z]{1,8}",
        rest in "[a-z0-9./?=&]{1,20}",
    ) {
        let absolute = format!("{scheme}://{rest}");
        prop_assert!(is_absolute_uri(&absolute));
        prop_assert!(!is_absolute_uri(&rest));
    }

    /// Property: redirect location is the url with an encoded state appended
    #[test]
    fn proptest_redirect_appends_state(
        url in "https://[a-z]{1,10}/[a-z]{0,8}\\?error=[a-z_]{1,12}",
        state in prop::option::of("[ -~]{1,16}"),
    ) {
        let mut exchange = Exchange::new(Request::get("/"));
        let ctx = ValidationContext::new(
            &mut exchange,
            &NoParams,
            SessionBinding::new(Arc::new(InMemorySessionStore::new())),
            Arc::new(BearerTokenIssuer),
        )
        .unwrap();

        let response = ctx.form_urlencoded_redirect(state.as_deref(), &url);
        let location = response.location().unwrap().to_string();

        match &state {
            Some(state) => {
                let suffix = format!("&state={}", urlencoding::encode(state));
                prop_assert_eq!(location, format!("{url}{suffix}"));
            }
            None => prop_assert_eq!(location, url),
        }
    }
}

#[test]
fn redirect_state_example() {
    let mut exchange = Exchange::new(Request::get("/"));
    let ctx = ValidationContext::new(
        &mut exchange,
        &NoParams,
        SessionBinding::new(Arc::new(InMemorySessionStore::new())),
        Arc::new(BearerTokenIssuer),
    )
    .unwrap();

    assert_eq!(
        ctx.form_urlencoded_redirect(Some("abc"), "http://x").location(),
        Some("http://x&state=abc")
    );
    assert_eq!(
        ctx.form_urlencoded_redirect(None, "http://x").location(),
        Some("http://x")
    );
}
