//! HTTP helpers for Lambda functions.

use lambda_http::{Body, Response};
use serde::Serialize;

use crate::{Error, Result};

/// Message returned when an id lookup misses.
pub const EVENT_NOT_FOUND: &str = "The event doesn't exist!";

/// Body shape for plain status messages.
#[derive(Debug, Serialize)]
pub struct MessageBody<'a> {
    pub message: &'a str,
}

/// Create a JSON response with the given status code and data.
pub fn json_response<T: Serialize>(status: u16, data: &T) -> Result<Response<Body>> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_string(data)?))?)
}

/// Create a `{"message": ...}` response.
pub fn message_response(status: u16, message: &str) -> Result<Response<Body>> {
    json_response(status, &MessageBody { message })
}

/// Create a response with no body.
pub fn empty_response(status: u16) -> Result<Response<Body>> {
    Ok(Response::builder().status(status).body(Body::Empty)?)
}

/// Translate an error into the response the API promises for it.
///
/// Malformed requests get a bare 400 so callers cannot tell the sub-reason
/// apart; misses carry the fixed not-found message.
pub fn error_response(error: &Error) -> Result<Response<Body>> {
    match error.status_code() {
        400 => empty_response(400),
        404 => message_response(404, EVENT_NOT_FOUND),
        status => message_response(status, "Internal server error"),
    }
}
