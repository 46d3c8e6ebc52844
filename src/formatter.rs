//! Content-negotiated bodies for failures the interceptor chain did not handle.

use http::StatusCode;
use serde_json::json;

use crate::config::GatewayConfig;
use crate::error::{ExchangeError, FailureKind};
use crate::message::{mime, Request, Response};
use crate::negotiate::{detect, ErrorRepresentation};

/// Renders a dispatcher failure as an error response.
///
/// The body format follows the representation the client expects (see
/// [`detect`]). With stack traces enabled the message carries the failure's
/// whole source chain, otherwise only its one-line display.
#[derive(Debug, Clone)]
pub struct ErrorFormatter {
    print_stack_trace: bool,
    docs_url: String,
}

impl ErrorFormatter {
    /// Creates a formatter.
    pub fn new(print_stack_trace: bool, docs_url: impl Into<String>) -> Self {
        Self {
            print_stack_trace,
            docs_url: docs_url.into(),
        }
    }

    /// Creates a formatter from the gateway configuration.
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.print_stack_trace, config.transport_docs_url.clone())
    }

    /// Returns true if failure bodies include the source chain.
    pub fn prints_stack_trace(&self) -> bool {
        self.print_stack_trace
    }

    /// Hint telling the operator how to toggle stack traces.
    pub fn comment(&self) -> String {
        format!(
            "Stack traces can be {}abled by setting the print_stack_trace option on \
             <a href=\"{}\">transport</a>. More details might be found in the log.",
            if self.print_stack_trace { "dis" } else { "en" },
            self.docs_url
        )
    }

    /// Returns the message shown to the client for `err`.
    pub fn message_for(&self, err: &ExchangeError) -> String {
        if self.print_stack_trace {
            err.report()
        } else {
            err.to_string()
        }
    }

    /// Builds the error response for `err` raised while handling `request`.
    ///
    /// URI syntax failures answer `400`, everything else `500`.
    pub fn error_response(&self, err: &ExchangeError, request: &Request) -> Response {
        let status = match err.kind() {
            FailureKind::UriSyntax => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = self.message_for(err);
        let comment = self.comment();

        let (content_type, body) = match detect(request) {
            ErrorRepresentation::Xml => (
                mime::TEXT_XML_UTF8,
                format!(
                    "<error><message>{}</message><comment>{}</comment></error>",
                    escape_xml(&message),
                    escape_xml(&comment)
                ),
            ),
            ErrorRepresentation::Json => (
                mime::APPLICATION_JSON_UTF8,
                json!({ "error": message, "comment": comment }).to_string(),
            ),
            ErrorRepresentation::Soap => (
                mime::TEXT_XML_UTF8,
                soap_fault_body(&format!("{message} {comment}")),
            ),
            ErrorRepresentation::Unknown => (
                mime::TEXT_HTML_UTF8,
                html_error_page(status, &message, &comment),
            ),
        };

        Response::builder(status)
            .content_type(content_type)
            .body(body)
            .dont_cache()
            .build()
    }
}

/// Escapes the five XML special characters.
pub fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// SOAP 1.1 server fault with `detail` as fault detail.
pub fn soap_fault_body(detail: &str) -> String {
    format!(
        concat!(
            r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/">"#,
            "<soapenv:Body><soapenv:Fault>",
            "<faultcode>soapenv:Server</faultcode>",
            "<faultstring>Internal Server Error</faultstring>",
            "<detail>{}</detail>",
            "</soapenv:Fault></soapenv:Body></soapenv:Envelope>"
        ),
        escape_xml(detail)
    )
}

/// Minimal HTML error page. `message` is escaped; `comment` is trusted markup.
pub fn html_error_page(status: StatusCode, message: &str, comment: &str) -> String {
    let title = format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Error")
    );
    format!(
        "<!DOCTYPE html>\n<html><head><title>{title}</title></head>\
         <body><h1>{title}</h1><pre>{}</pre><p>{comment}</p></body></html>",
        escape_xml(message)
    )
}
