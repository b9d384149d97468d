//! Session load-and-save middleware
//!
//! For each request the middleware:
//!
//! 1. reads the session token from the cookie and locks it, so concurrent
//!    requests carrying the same token run one at a time
//! 2. loads the record (or starts an empty session) and puts the
//!    [`Session`](crate::session::Session) handle in the request extensions
//! 3. runs the inner service
//! 4. saves the session and sets the cookie if the handler changed it,
//!    whatever status the handler returned
//!
//! A store failure in step 2 or 4 becomes a 500.

use crate::error::server_error;
use crate::session::SessionManager;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderValue},
    response::Response,
};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Layer that loads and saves the session around the inner service
#[derive(Debug, Clone)]
pub struct SessionLayer {
    manager: SessionManager,
}

impl SessionLayer {
    /// Create a layer using the state's session manager
    #[must_use]
    pub fn new(state: &AppState) -> Self {
        Self::from_manager(state.sessions().clone())
    }

    /// Create a layer from a session manager
    #[must_use]
    pub const fn from_manager(manager: SessionManager) -> Self {
        Self { manager }
    }
}

impl<S> Layer<S> for SessionLayer {
    type Service = SessionMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionMiddleware {
            inner,
            manager: self.manager.clone(),
        }
    }
}

/// Service that loads and saves the session around the inner service
#[derive(Debug, Clone)]
pub struct SessionMiddleware<S> {
    inner: S,
    manager: SessionManager,
}

impl<S> Service<Request> for SessionMiddleware<S>
where
    S: Service<Request, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let manager = self.manager.clone();
        // Take the service that was driven to readiness, leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let token = manager.token_from_headers(req.headers());
            let _guard = match &token {
                Some(token) => Some(manager.lock(token).await),
                None => None,
            };

            let session = match manager.load(token).await {
                Ok(session) => session,
                Err(e) => return Ok(server_error(&e)),
            };
            req.extensions_mut().insert(session.clone());

            let mut response = inner.call(req).await?;
            response
                .headers_mut()
                .append(header::VARY, HeaderValue::from_static("Cookie"));

            match manager.save(&session).await {
                Ok(Some(cookie)) => match HeaderValue::from_str(&cookie) {
                    Ok(value) => {
                        let headers = response.headers_mut();
                        headers.append(header::SET_COOKIE, value);
                        headers.insert(
                            header::CACHE_CONTROL,
                            HeaderValue::from_static(r#"no-cache="Set-Cookie""#),
                        );
                    }
                    Err(e) => return Ok(server_error(&e)),
                },
                Ok(None) => {}
                Err(e) => return Ok(server_error(&e)),
            }

            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::store::MockSessionStore;
    use crate::session::{
        MemorySessionStore, Session, SessionConfig, SessionError, SessionStore, SessionToken,
    };
    use axum::{
        http::StatusCode,
        routing::{get, post},
        Router,
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(manager: SessionManager) -> Router {
        Router::new()
            .route(
                "/put",
                post(|session: Session| async move {
                    session.put("flash", "saved").unwrap();
                    StatusCode::SEE_OTHER
                }),
            )
            .route(
                "/pop",
                get(|session: Session| async move {
                    session.pop_string("flash").unwrap_or_default()
                }),
            )
            .route("/noop", get(|| async { "nothing" }))
            .layer(SessionLayer::from_manager(manager))
    }

    fn manager() -> SessionManager {
        SessionManager::new(Arc::new(MemorySessionStore::new()), SessionConfig::default())
    }

    fn cookie_token(response: &Response) -> SessionToken {
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        let value = cookie
            .strip_prefix("session=")
            .and_then(|rest| rest.split(';').next())
            .unwrap();
        SessionToken::parse(value).unwrap()
    }

    fn request(method: &str, uri: &str, token: Option<&SessionToken>) -> Request {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::COOKIE, format!("session={token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_untouched_session_sets_no_cookie() {
        let response = app(manager())
            .oneshot(request("GET", "/noop", None))
            .await
            .unwrap();
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_write_is_saved_whatever_the_status() {
        let manager = manager();
        let response = app(manager.clone())
            .oneshot(request("POST", "/put", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let token = cookie_token(&response);
        assert!(SessionStore::find(manager.store().as_ref(), &token)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_flash_is_read_once() {
        let manager = manager();
        let app = app(manager);
        let response = app
            .clone()
            .oneshot(request("POST", "/put", None))
            .await
            .unwrap();
        let token = cookie_token(&response);

        let first = app
            .clone()
            .oneshot(request("GET", "/pop", Some(&token)))
            .await
            .unwrap();
        assert_eq!(body(first).await, "saved");

        let second = app
            .oneshot(request("GET", "/pop", Some(&token)))
            .await
            .unwrap();
        assert_eq!(body(second).await, "");
    }

    #[tokio::test]
    async fn test_load_failure_is_server_error() {
        let mut store = MockSessionStore::new();
        store
            .expect_find()
            .returning(|_| Err(SessionError::NotLoaded));
        let manager = SessionManager::new(Arc::new(store), SessionConfig::default());

        let token = SessionToken::generate();
        let response = app(manager)
            .oneshot(request("GET", "/noop", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_save_failure_is_server_error() {
        let mut store = MockSessionStore::new();
        store
            .expect_commit()
            .returning(|_, _| Err(SessionError::NotLoaded));
        let manager = SessionManager::new(Arc::new(store), SessionConfig::default());

        let response = app(manager)
            .oneshot(request("POST", "/put", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
