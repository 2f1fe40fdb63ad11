//! Response interpretation hook.
//!
//! Every reply, whether it came back on the single-call path or as one part of
//! a combined reply, passes through a [`ResponseInterpreter`] before it reaches
//! its caller. The hook may reclassify a status as a failure, rewrite the body,
//! or leave the reply alone.

use crate::types::{HttpResponse, LogicalRequest};
use crate::{Error, Result};

pub trait ResponseInterpreter: Send + Sync {
    fn interpret(&self, response: HttpResponse, request: &LogicalRequest) -> Result<HttpResponse>;
}

/// Passes every reply through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityInterpreter;

impl ResponseInterpreter for IdentityInterpreter {
    fn interpret(&self, response: HttpResponse, _request: &LogicalRequest) -> Result<HttpResponse> {
        Ok(response)
    }
}

/// Turns non-2xx replies into [`Error::Remote`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusInterpreter;

impl ResponseInterpreter for StatusInterpreter {
    fn interpret(&self, response: HttpResponse, _request: &LogicalRequest) -> Result<HttpResponse> {
        if response.is_success() {
            Ok(response)
        } else {
            Err(Error::Remote {
                status: response.status,
                status_text: response.status_text,
                body: response.body,
            })
        }
    }
}

impl<F> ResponseInterpreter for F
where
    F: Fn(HttpResponse, &LogicalRequest) -> Result<HttpResponse> + Send + Sync,
{
    fn interpret(&self, response: HttpResponse, request: &LogicalRequest) -> Result<HttpResponse> {
        self(response, request)
    }
}
