use crate::logging::ExchangeLog;
use crate::message::{Request, Response};

/// One request and its eventual response travelling through the pipeline.
///
/// An exchange is owned by the dispatch call handling it and is never shared
/// between workers. The response stays unset until a stage (or the
/// dispatcher's error synthesis) provides one.
///
/// # Examples
///
/// ```
/// use gateway_core::{Exchange, Request, Response};
///
/// let mut exchange = Exchange::with_id("req-1", Request::get("/health"));
/// assert!(exchange.response().is_none());
///
/// exchange.set_response(Response::ok().build());
/// assert_eq!(exchange.response().unwrap().status().as_u16(), 200);
/// ```
#[derive(Debug, Clone)]
pub struct Exchange {
    id: String,
    request: Request,
    response: Option<Response>,
    stage_index: usize,
}

impl Exchange {
    /// Wraps a request, assigning a random request id.
    pub fn new(request: Request) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), request)
    }

    /// Wraps a request under a caller-supplied request id.
    pub fn with_id(id: impl Into<String>, request: Request) -> Self {
        Self {
            id: id.into(),
            request,
            response: None,
            stage_index: 0,
        }
    }

    /// Returns the request id used for log correlation.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the request.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Returns the request for modification.
    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    /// Returns the response, if one has been set.
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    /// Returns the response for modification, if one has been set.
    pub fn response_mut(&mut self) -> Option<&mut Response> {
        self.response.as_mut()
    }

    /// Sets the response, replacing any previous one.
    pub fn set_response(&mut self, response: Response) {
        self.response = Some(response);
    }

    /// Removes and returns the response.
    pub fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }

    /// Index of the stage currently or most recently run.
    pub fn stage_index(&self) -> usize {
        self.stage_index
    }

    pub(crate) fn set_stage_index(&mut self, index: usize) {
        self.stage_index = index;
    }

    /// Returns a logger tagged with this exchange's request id.
    pub fn log(&self) -> ExchangeLog<'_> {
        ExchangeLog::new(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_assigns_distinct_ids() {
        let a = Exchange::new(Request::get("/"));
        let b = Exchange::new(Request::get("/"));

        assert!(!a.id().is_empty());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn take_response_clears_it() {
        let mut exchange = Exchange::with_id("req-1", Request::get("/"));
        exchange.set_response(Response::ok().build());

        assert!(exchange.take_response().is_some());
        assert!(exchange.response().is_none());
    }
}
