//! Response handling module that converts handler results into HTTP responses.
//!
//! This module provides the [`Responder`] trait which defines how different types
//! can be converted into HTTP responses. A responder may also decline to build a
//! response, in which case the pipeline returns the context's response draft.

use crate::RequestContext;
use crate::body::ResponseBody;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Response, StatusCode};
use serde::Serialize;
use tracing::error;

const APPLICATION_JSON: &str = "application/json";
const TEXT_PLAIN_UTF_8: &str = "text/plain; charset=utf-8";

/// A trait for types that can be returned from a handler.
///
/// `None` means "no explicit response": the draft held by the [`RequestContext`] is used.
pub trait Responder: Send {
    fn respond_to(self, ctx: &mut RequestContext) -> Option<Response<ResponseBody>>;
}

/// Serializes the inner value as an `application/json` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Json<T>(pub T);

/// An explicit `204 No Content` response.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NoContent;

/// Leaves the response draft in charge.
impl Responder for () {
    fn respond_to(self, _ctx: &mut RequestContext) -> Option<Response<ResponseBody>> {
        None
    }
}

/// None case falls back to the response draft.
impl<T: Responder> Responder for Option<T> {
    fn respond_to(self, ctx: &mut RequestContext) -> Option<Response<ResponseBody>> {
        self.and_then(|t| t.respond_to(ctx))
    }
}

/// Pre-built responses pass through, the body is converted to the internal ResponseBody type.
impl<B> Responder for Response<B>
where
    B: Into<ResponseBody> + Send,
{
    fn respond_to(self, _ctx: &mut RequestContext) -> Option<Response<ResponseBody>> {
        Some(self.map(Into::into))
    }
}

/// Sets a status code along with the content. When the content declines to respond,
/// the status is applied to the draft instead.
impl<T: Responder> Responder for (StatusCode, T) {
    fn respond_to(self, ctx: &mut RequestContext) -> Option<Response<ResponseBody>> {
        let (status, responder) = self;
        match responder.respond_to(ctx) {
            Some(mut response) => {
                *response.status_mut() = status;
                Some(response)
            }
            None => {
                ctx.set_status(status);
                None
            }
        }
    }
}

impl Responder for &'static str {
    fn respond_to(self, _ctx: &mut RequestContext) -> Option<Response<ResponseBody>> {
        Some(text_response(ResponseBody::from(self)))
    }
}

impl Responder for String {
    fn respond_to(self, _ctx: &mut RequestContext) -> Option<Response<ResponseBody>> {
        Some(text_response(ResponseBody::from(self)))
    }
}

impl Responder for NoContent {
    fn respond_to(self, _ctx: &mut RequestContext) -> Option<Response<ResponseBody>> {
        let mut response = Response::new(ResponseBody::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        Some(response)
    }
}

impl<T: Serialize + Send> Responder for Json<T> {
    fn respond_to(self, _ctx: &mut RequestContext) -> Option<Response<ResponseBody>> {
        let mut response = match serde_json::to_vec(&self.0) {
            Ok(bytes) => Response::new(ResponseBody::from(bytes)),
            Err(e) => {
                error!(cause = %e, "serialize json response error");
                let mut response = Response::new(ResponseBody::empty());
                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                return Some(response);
            }
        };

        response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        Some(response)
    }
}

pub(crate) fn text_response(body: ResponseBody) -> Response<ResponseBody> {
    let mut response = Response::new(body);
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN_UTF_8));
    response
}
