//! Request parameter extraction and the normalized [`ParameterSet`].

use std::collections::HashMap;

use crate::error::ExchangeError;
use crate::exchange::Exchange;
use crate::message::{mime, Message};

/// `redirect_uri`
pub const REDIRECT_URI: &str = "redirect_uri";
/// `client_id`
pub const CLIENT_ID: &str = "client_id";
/// `response_type`
pub const RESPONSE_TYPE: &str = "response_type";
/// `scope`
pub const SCOPE: &str = "scope";
/// `state`
pub const STATE: &str = "state";
/// `prompt`
pub const PROMPT: &str = "prompt";
/// Synthetic parameter listing the requested scopes that were rejected.
pub const SCOPE_INVALID: &str = "scope_invalid";
/// `code`
pub const CODE: &str = "code";
/// `client_secret`
pub const CLIENT_SECRET: &str = "client_secret";
/// `grant_type`
pub const GRANT_TYPE: &str = "grant_type";

/// Removes every entry whose value is the empty string.
pub fn prune_empty(params: &mut HashMap<String, String>) {
    params.retain(|_, value| !value.is_empty());
}

/// Normalized request parameters.
///
/// No entry ever holds an empty value: empty values are pruned on
/// construction and setters remove the key instead of storing `""`. Apart
/// from `scope` and `scope_invalid` the set is fixed once built.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use gateway_core::ParameterSet;
///
/// let mut raw = HashMap::new();
/// raw.insert("client_id".to_string(), "abc".to_string());
/// raw.insert("state".to_string(), String::new());
///
/// let params = ParameterSet::new(raw);
/// assert_eq!(params.client_id(), Some("abc"));
/// assert_eq!(params.state(), None);
/// assert_eq!(params.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    params: HashMap<String, String>,
}

impl ParameterSet {
    /// Builds a set from raw parameters, dropping empty values.
    pub fn new(mut params: HashMap<String, String>) -> Self {
        prune_empty(&mut params);
        Self { params }
    }

    /// Returns the value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Returns true if `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    /// Returns the number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns true if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterates over all parameters in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the underlying map.
    pub fn as_map(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// Returns `client_id`.
    pub fn client_id(&self) -> Option<&str> {
        self.get(CLIENT_ID)
    }

    /// Returns `redirect_uri`.
    pub fn redirect_uri(&self) -> Option<&str> {
        self.get(REDIRECT_URI)
    }

    /// Returns `response_type`.
    pub fn response_type(&self) -> Option<&str> {
        self.get(RESPONSE_TYPE)
    }

    /// Returns `scope`.
    pub fn scope(&self) -> Option<&str> {
        self.get(SCOPE)
    }

    /// Returns `state`.
    pub fn state(&self) -> Option<&str> {
        self.get(STATE)
    }

    /// Returns `prompt`.
    pub fn prompt(&self) -> Option<&str> {
        self.get(PROMPT)
    }

    /// Returns `code`.
    pub fn code(&self) -> Option<&str> {
        self.get(CODE)
    }

    /// Returns `client_secret`.
    pub fn client_secret(&self) -> Option<&str> {
        self.get(CLIENT_SECRET)
    }

    /// Returns `grant_type`.
    pub fn grant_type(&self) -> Option<&str> {
        self.get(GRANT_TYPE)
    }

    /// Returns `scope_invalid`.
    pub fn scope_invalid(&self) -> Option<&str> {
        self.get(SCOPE_INVALID)
    }

    /// Overwrites `scope`; later validation phases observe the new value.
    pub fn set_scope(&mut self, scope: impl Into<String>) {
        self.put(SCOPE, scope.into());
    }

    /// Records the requested scopes that were rejected.
    pub fn set_scope_invalid(&mut self, invalid_scopes: impl Into<String>) {
        self.put(SCOPE_INVALID, invalid_scopes.into());
    }

    fn put(&mut self, name: &str, value: String) {
        if value.is_empty() {
            self.params.remove(name);
        } else {
            self.params.insert(name.to_string(), value);
        }
    }
}

impl FromIterator<(String, String)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Supplies the raw parameters of a request.
///
/// The core never tokenizes query strings itself; a `ParamSource` hands it a
/// flat name/value map.
pub trait ParamSource: Send + Sync {
    /// Extracts the parameters of the exchange's request.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::FailureKind::UriSyntax`] failure if the request
    /// carries undecodable parameters.
    fn params(&self, exchange: &Exchange) -> Result<HashMap<String, String>, ExchangeError>;
}

/// Decodes parameters from the query string and form-encoded bodies.
///
/// Body parameters win over query parameters of the same name.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlParamSource;

impl ParamSource for UrlParamSource {
    fn params(&self, exchange: &Exchange) -> Result<HashMap<String, String>, ExchangeError> {
        let request = exchange.request();
        let mut params = HashMap::new();

        if let Some(query) = request.query() {
            let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).map_err(|e| {
                ExchangeError::with_source(
                    crate::FailureKind::UriSyntax,
                    "malformed query string",
                    e,
                )
            })?;
            params.extend(pairs);
        }

        let is_form = request
            .header()
            .content_type()
            .is_some_and(|ct| ct.starts_with(mime::APPLICATION_X_WWW_FORM_URLENCODED));
        if is_form && !request.body().is_empty() {
            let pairs: Vec<(String, String)> =
                serde_urlencoded::from_bytes(request.body()).map_err(|e| {
                    ExchangeError::with_source(
                        crate::FailureKind::UriSyntax,
                        "malformed form body",
                        e,
                    )
                })?;
            params.extend(pairs);
        }

        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{names, Request};

    fn raw(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn prune_removes_only_empty_values() {
        let mut params = raw(&[("a", ""), ("b", "1"), ("c", " "), ("d", "")]);
        prune_empty(&mut params);

        assert_eq!(params, raw(&[("b", "1"), ("c", " ")]));
    }

    #[test]
    fn setters_mutate_live_map() {
        let mut params = ParameterSet::new(raw(&[("scope", "openid profile")]));
        params.set_scope("openid");
        params.set_scope_invalid("profile");

        assert_eq!(params.scope(), Some("openid"));
        assert_eq!(params.scope_invalid(), Some("profile"));
    }

    #[test]
    fn setting_empty_scope_removes_it() {
        let mut params = ParameterSet::new(raw(&[("scope", "openid")]));
        params.set_scope("");

        assert!(!params.contains(SCOPE));
    }

    #[test]
    fn url_source_reads_query() {
        let exchange = Exchange::new(Request::get(
            "/oauth2/auth?client_id=abc&redirect_uri=http%3A%2F%2Fx%2Fcb&state=",
        ));

        let params = UrlParamSource.params(&exchange).unwrap();

        assert_eq!(params.get("client_id").map(String::as_str), Some("abc"));
        assert_eq!(params.get("redirect_uri").map(String::as_str), Some("http://x/cb"));
        assert_eq!(params.get("state").map(String::as_str), Some(""));
    }

    #[test]
    fn url_source_reads_form_body() {
        let request = Request::post("/oauth2/token?code=from-query")
            .with_header(names::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .with_body("code=from-body&grant_type=authorization_code");
        let exchange = Exchange::new(request);

        let params = UrlParamSource.params(&exchange).unwrap();

        assert_eq!(params.get("code").map(String::as_str), Some("from-body"));
        assert_eq!(
            params.get("grant_type").map(String::as_str),
            Some("authorization_code")
        );
    }

    #[test]
    fn url_source_ignores_non_form_body() {
        let request = Request::post("/oauth2/token")
            .with_header(names::CONTENT_TYPE, "application/json")
            .with_body(r#"{"code":"x"}"#);

        let params = UrlParamSource.params(&Exchange::new(request)).unwrap();
        assert!(params.is_empty());
    }
}
