//! Panic recovery
//!
//! Wraps every route just inside the security headers layer. A panic anywhere
//! below it is logged with a backtrace and turned into a plain 500 that asks
//! the client to close the connection. Nothing from the panic payload reaches
//! the response.

use axum::{
    body::Body,
    http::{header, HeaderValue, Response, StatusCode},
};
use std::any::Any;
use std::backtrace::Backtrace;
use tower_http::catch_panic::CatchPanicLayer;

/// Function signature accepted by [`CatchPanicLayer::custom`]
pub type PanicHandler = fn(Box<dyn Any + Send + 'static>) -> Response<Body>;

/// Layer that converts handler panics into 500 responses
#[must_use]
pub fn recover_panic() -> CatchPanicLayer<PanicHandler> {
    CatchPanicLayer::custom(handle_panic as PanicHandler)
}

/// Log `payload` with a backtrace and build the 500 response.
#[must_use]
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let message = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    let trace = Backtrace::force_capture();
    tracing::error!(panic = %message, backtrace = %trace, "recovered from panic");

    let mut response = Response::new(Body::from("Internal Server Error"));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    let headers = response.headers_mut();
    headers.insert(header::CONNECTION, HeaderValue::from_static("close"));
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::to_bytes, http::Request, routing::get, Router};
    use tower::ServiceExt;

    async fn boom() -> &'static str {
        panic!("database password is hunter2")
    }

    #[tokio::test]
    async fn test_panic_becomes_generic_500() {
        let app = Router::new().route("/", get(boom)).layer(recover_panic());
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[header::CONNECTION], "close");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Internal Server Error");
    }

    #[tokio::test]
    async fn test_normal_responses_pass_through() {
        let app = Router::new()
            .route("/", get(|| async { "fine" }))
            .layer(recover_panic());
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::CONNECTION).is_none());
    }
}
