//! Classification of the error representation a client expects.

use crate::message::{names, Message, Request};

const SOAP_11_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const SOAP_12_ENVELOPE_NS: &str = "http://www.w3.org/2003/05/soap-envelope";

/// Representation used for a synthesized error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorRepresentation {
    /// Plain XML document.
    Xml,
    /// JSON object.
    Json,
    /// SOAP 1.1 fault.
    Soap,
    /// Nothing recognizable; an HTML page is rendered.
    Unknown,
}

/// Classifies the error representation expected by the sender of `request`.
///
/// `Content-Type` is consulted first. An XML payload is treated as SOAP when
/// its body carries a SOAP envelope namespace. Without a recognizable
/// content type the first recognizable `Accept` entry decides; an HTML entry
/// selects the HTML page.
///
/// # Examples
///
/// ```
/// use gateway_core::{detect, ErrorRepresentation, Request};
///
/// let request = Request::post("/api").with_header("Content-Type", "application/json");
/// assert_eq!(detect(&request), ErrorRepresentation::Json);
///
/// assert_eq!(detect(&Request::get("/")), ErrorRepresentation::Unknown);
/// ```
pub fn detect(request: &Request) -> ErrorRepresentation {
    if let Some(content_type) = request.header().content_type() {
        match classify_media_type(content_type) {
            Some(ErrorRepresentation::Xml) if has_soap_envelope(request) => {
                return ErrorRepresentation::Soap
            }
            Some(representation) => return representation,
            None => {}
        }
    }

    request
        .header()
        .values(names::ACCEPT)
        .flat_map(|value| value.split(','))
        .find_map(classify_accepted)
        .unwrap_or(ErrorRepresentation::Unknown)
}

fn essence(value: &str) -> String {
    value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn classify_accepted(value: &str) -> Option<ErrorRepresentation> {
    match essence(value).as_str() {
        "text/html" | "application/xhtml+xml" => Some(ErrorRepresentation::Unknown),
        _ => classify_media_type(value),
    }
}

fn classify_media_type(value: &str) -> Option<ErrorRepresentation> {
    match essence(value).as_str() {
        "application/soap+xml" => Some(ErrorRepresentation::Soap),
        "text/xml" | "application/xml" => Some(ErrorRepresentation::Xml),
        "application/json" => Some(ErrorRepresentation::Json),
        other if other.ends_with("+xml") => Some(ErrorRepresentation::Xml),
        other if other.ends_with("+json") => Some(ErrorRepresentation::Json),
        _ => None,
    }
}

fn has_soap_envelope(request: &Request) -> bool {
    let body = request.body_text();
    body.contains(SOAP_11_ENVELOPE_NS) || body.contains(SOAP_12_ENVELOPE_NS)
}
