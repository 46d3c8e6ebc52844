//! Failure taxonomy shared by the dispatcher, validators and session layer.
//!
//! Every failure that leaves a pipeline stage is an [`ExchangeError`] carrying
//! a [`FailureKind`]. The kind alone decides what the dispatcher does with it
//! (see [`FailureKind::disposition`]); no caller inspects concrete error types.

use std::error::Error as StdError;
use std::fmt;
use std::io;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// What the dispatcher does with a failure after a response has been secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Hand the failure back to the connection layer unchanged.
    Rethrow,
    /// Log at WARN and continue with the synthesized error response.
    LogAndContinue,
}

/// Classification of a failure escaping the interceptor chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The peer closed the stream.
    EndOfStream,
    /// Processing was aborted, including "no response was generated".
    Abort,
    /// The connection will carry no further requests.
    NoMoreRequests,
    /// The stream ended or broke while reading the request line.
    MalformedFirstLine,
    /// The exchange must end without any response being written.
    NoResponse,
    /// Transport-level I/O failure.
    Io,
    /// The request URI could not be parsed.
    UriSyntax,
    /// Any other processing failure.
    Generic,
}

impl FailureKind {
    /// Maps the kind onto the dispatcher's rethrow/swallow table.
    ///
    /// Connection-lifecycle kinds must reach the transport so it can decide
    /// whether to keep reading from the socket.
    pub fn disposition(self) -> Disposition {
        match self {
            FailureKind::EndOfStream
            | FailureKind::Abort
            | FailureKind::NoMoreRequests
            | FailureKind::MalformedFirstLine
            | FailureKind::NoResponse
            | FailureKind::Io => Disposition::Rethrow,
            FailureKind::UriSyntax | FailureKind::Generic => Disposition::LogAndContinue,
        }
    }

    /// Returns true for kinds the transport layer must observe.
    pub fn is_transport(self) -> bool {
        self.disposition() == Disposition::Rethrow
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::EndOfStream => write!(f, "end of stream"),
            FailureKind::Abort => write!(f, "aborted"),
            FailureKind::NoMoreRequests => write!(f, "no more requests"),
            FailureKind::MalformedFirstLine => write!(f, "malformed first line"),
            FailureKind::NoResponse => write!(f, "no response"),
            FailureKind::Io => write!(f, "i/o error"),
            FailureKind::UriSyntax => write!(f, "uri syntax error"),
            FailureKind::Generic => write!(f, "processing error"),
        }
    }
}

/// A classified failure raised by a pipeline stage or by the dispatcher.
///
/// # Examples
///
/// ```
/// use gateway_core::{Disposition, ExchangeError, FailureKind};
///
/// let err = ExchangeError::end_of_stream("peer closed connection");
/// assert_eq!(err.kind(), FailureKind::EndOfStream);
/// assert_eq!(err.kind().disposition(), Disposition::Rethrow);
/// assert_eq!(err.to_string(), "end of stream: peer closed connection");
/// ```
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ExchangeError {
    kind: FailureKind,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl ExchangeError {
    /// Creates a failure of the given kind.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a failure of the given kind caused by `source`.
    pub fn with_source(
        kind: FailureKind,
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// The peer closed the stream.
    pub fn end_of_stream(message: impl Into<String>) -> Self {
        Self::new(FailureKind::EndOfStream, message)
    }

    /// Processing was aborted.
    pub fn abort(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Abort, message)
    }

    /// The connection carries no further requests.
    pub fn no_more_requests(message: impl Into<String>) -> Self {
        Self::new(FailureKind::NoMoreRequests, message)
    }

    /// The request line could not be read.
    pub fn malformed_first_line(message: impl Into<String>) -> Self {
        Self::new(FailureKind::MalformedFirstLine, message)
    }

    /// The exchange ends without writing a response.
    pub fn no_response(message: impl Into<String>) -> Self {
        Self::new(FailureKind::NoResponse, message)
    }

    /// The request URI is malformed.
    pub fn uri_syntax(message: impl Into<String>) -> Self {
        Self::new(FailureKind::UriSyntax, message)
    }

    /// Any other processing failure.
    pub fn generic(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Generic, message)
    }

    /// Returns the failure kind.
    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    /// Returns the message without the kind prefix.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Renders the failure together with its whole source chain.
    ///
    /// This is the gateway's equivalent of a stack trace and is only exposed
    /// to clients when stack traces are enabled in the configuration.
    pub fn report(&self) -> String {
        let mut out = format!("{self}");
        let mut cause = StdError::source(self);
        while let Some(err) = cause {
            out.push_str("\n\tcaused by: ");
            out.push_str(&err.to_string());
            cause = err.source();
        }
        out
    }
}

impl From<io::Error> for ExchangeError {
    fn from(err: io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::UnexpectedEof => FailureKind::EndOfStream,
            _ => FailureKind::Io,
        };
        Self::with_source(kind, "transport i/o failed", err)
    }
}

impl From<SessionError> for ExchangeError {
    fn from(err: SessionError) -> Self {
        Self::with_source(FailureKind::Generic, "session binding failed", err)
    }
}

impl From<ValidatorError> for ExchangeError {
    fn from(err: ValidatorError) -> Self {
        Self::with_source(FailureKind::Generic, "validator misuse", err)
    }
}

/// Failures binding a request to its server-side session.
///
/// These are unrecoverable at the validation layer and surface as
/// [`FailureKind::Generic`] failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Neither a `Set-Cookie` nor a `Cookie` header is present.
    #[error("no Set-Cookie or Cookie header present")]
    HeaderMissing,
    /// The session header carries no `SESSIONID=` token.
    #[error("SessionId not found in session header")]
    IdMissing,
}

/// Programming errors in validator code, as opposed to request errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidatorError {
    /// A key/value argument list had an odd number of entries.
    #[error("the number of strings passed as params is not even (got {0})")]
    OddArgumentCount(usize),
}
