use std::any::Any;

use axum::{
    body::Body,
    http::{header, Response, StatusCode},
};
use hackvote_http_errors::ErrorResponseData;

/// Render a caught handler panic as a 500 carrying the shared
/// `{error: {kind, message}}` body, so gateway clients can recover the kind
/// like any other rejection. The panic message is only exposed outside
/// production.
pub fn handle_panic(production: bool, err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let message = if production {
        "Server error".to_string()
    } else if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic message".to_string()
    };

    let body = ErrorResponseData::new("panic", message);
    let body = serde_json::to_string(&body).expect("Serializing panic body");

    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .expect("Building panic response")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn panic_body_uses_the_shared_error_shape() {
        let response = handle_panic(false, Box::new(String::from("boom")));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let parsed: ErrorResponseData = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed.kind(), "panic");
        assert_eq!(parsed.message(), "boom");
    }

    #[tokio::test]
    async fn production_hides_the_panic_message() {
        let response = handle_panic(true, Box::new("secret detail"));
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let parsed: ErrorResponseData = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed.kind(), "panic");
        assert_eq!(parsed.message(), "Server error");
    }
}
