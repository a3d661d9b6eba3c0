//! HTTP helpers for the Lambda function.

use lambda_http::http::header::{ALLOW, AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use lambda_http::http::Method;
use lambda_http::{Body, Request, Response};
use serde::Serialize;
use tracing::info;

use crate::rpc;
use crate::tools::Dispatcher;

/// Create a JSON response with the given status code and data.
pub fn json_response<T: Serialize>(
    status: u16,
    data: &T,
) -> Result<Response<Body>, lambda_http::Error> {
    let mut builder = Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json");

    if status == 401 {
        builder = builder.header(WWW_AUTHENTICATE, "Bearer");
    }

    Ok(builder
        .body(Body::from(serde_json::to_string(data)?))
        .map_err(Box::new)?)
}

/// Create a response without a body.
pub fn empty_response(status: u16) -> Result<Response<Body>, lambda_http::Error> {
    Ok(Response::builder()
        .status(status)
        .body(Body::Empty)
        .map_err(Box::new)?)
}

/// Route one HTTP request into the JSON-RPC handler.
pub async fn handle_request(
    dispatcher: &Dispatcher,
    event: Request,
) -> Result<Response<Body>, lambda_http::Error> {
    if event.method() != Method::POST {
        info!(method = %event.method(), "Rejected non-POST request");
        return Ok(Response::builder()
            .status(405)
            .header(ALLOW, "POST")
            .body(Body::Empty)
            .map_err(Box::new)?);
    }

    let authorization = event
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let reply = rpc::handle(dispatcher, authorization, event.body().as_ref()).await;

    match reply.body {
        Some(body) => json_response(reply.status, &body),
        None => empty_response(reply.status),
    }
}
