//! Response helpers shared by the handlers and the auth-check middleware

use http::header::{CONTENT_TYPE, HeaderValue};
use http::{Response, StatusCode};
use serde::Serialize;

fn application_json() -> HeaderValue {
    HeaderValue::from_static("application/json")
}

/// Empty-bodied response with the given status
pub(crate) fn status_response(status: StatusCode) -> Response<String> {
    let mut response = Response::new(String::new());
    *response.status_mut() = status;
    response
}

/// Response carrying `body` untouched
pub(crate) fn raw_response(status: StatusCode, body: String) -> Response<String> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
}

/// `{"error": "<message>"}` JSON response
pub(crate) fn error_response(status: StatusCode, message: &str) -> Response<String> {
    let body = serde_json::json!({ "error": message }).to_string();
    let mut response = raw_response(status, body);
    response
        .headers_mut()
        .insert(CONTENT_TYPE, application_json());
    response
}

/// 200 response with `value` serialized as JSON
pub(crate) fn json_response<T: Serialize>(value: &T) -> Response<String> {
    match serde_json::to_string(value) {
        Ok(body) => {
            let mut response = raw_response(StatusCode::OK, body);
            response
                .headers_mut()
                .insert(CONTENT_TYPE, application_json());
            response
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}
