//! Route table
//!
//! | Method | Path                | Chain    |
//! |--------|---------------------|----------|
//! | GET    | `/static/*`         | standard |
//! | GET    | `/`                 | dynamic  |
//! | GET    | `/snippet/view/{id}`| dynamic  |
//! | GET    | `/snippet/create`   | dynamic  |
//! | POST   | `/snippet/create`   | dynamic  |
//! | GET    | `/user/signup`      | dynamic  |
//! | POST   | `/user/signup`      | dynamic  |
//! | GET    | `/user/login`       | dynamic  |
//! | POST   | `/user/login`       | dynamic  |
//! | POST   | `/user/logout`      | dynamic  |
//!
//! The standard chain (security headers, panic recovery, request logging)
//! wraps everything, including 404, 405 and panic responses. The dynamic
//! chain (session, authenticate) wraps only the page handlers; a 405 is
//! answered without it.

use crate::error::client_error;
use crate::handlers::{snippets, users};
use crate::middleware::{
    authenticate, log_request, recover_panic, SecurityHeadersConfig, SecurityHeadersLayer,
    SessionLayer,
};
use crate::state::AppState;
use axum::{
    extract::Request,
    handler::Handler,
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{MethodRouter, Route},
    Router,
};
use std::convert::Infallible;
use tower::{Layer, Service, ServiceBuilder};
use tower_http::services::ServeDir;

/// Builder for one path's method table
///
/// Records methods in registration order so a request with any other method
/// gets a 405 whose `Allow` header lists them, e.g. `GET, POST`.
///
/// ```rust
/// use axum::Router;
/// use snippetbox::router::Endpoint;
///
/// let app: Router = Router::new().route(
///     "/snippet/create",
///     Endpoint::new()
///         .get(|| async { "form" })
///         .post(|| async { "created" })
///         .into_method_router(),
/// );
/// ```
#[derive(Debug)]
pub struct Endpoint<S = ()> {
    methods: Vec<Method>,
    router: MethodRouter<S>,
}

impl<S> Default for Endpoint<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self {
            methods: Vec::new(),
            router: MethodRouter::new(),
        }
    }
}

impl<S> Endpoint<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Empty method table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Route GET requests to `handler`.
    #[must_use]
    pub fn get<H, T>(mut self, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.methods.push(Method::GET);
        self.router = self.router.get(handler);
        self
    }

    /// Route POST requests to `handler`.
    #[must_use]
    pub fn post<H, T>(mut self, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.methods.push(Method::POST);
        self.router = self.router.post(handler);
        self
    }

    /// Wrap the registered handlers, but not the 405 answer, in `layer`.
    ///
    /// Layers added later run first.
    #[must_use]
    pub fn route_layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<Route> + Clone + Send + Sync + 'static,
        L::Service: Service<Request, Error = Infallible> + Clone + Send + Sync + 'static,
        <L::Service as Service<Request>>::Response: IntoResponse + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        self.router = self.router.route_layer(layer);
        self
    }

    /// Methods registered so far, in registration order
    #[must_use]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Finish the table, answering every other method with 405.
    #[must_use]
    pub fn into_method_router(self) -> MethodRouter<S> {
        let allow = allow_header(&self.methods);
        self.router.fallback(move || {
            let allow = allow.clone();
            async move { method_not_allowed(&allow) }
        })
    }
}

/// Join methods as an `Allow` header value.
#[must_use]
pub fn allow_header(methods: &[Method]) -> String {
    methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn method_not_allowed(allow: &str) -> Response {
    let mut response = client_error(StatusCode::METHOD_NOT_ALLOWED);
    if let Ok(value) = HeaderValue::from_str(allow) {
        response.headers_mut().insert(header::ALLOW, value);
    }
    response
}

async fn not_found() -> Response {
    client_error(StatusCode::NOT_FOUND)
}

/// Wrap `router` in the standard chain: security headers outermost, then
/// panic recovery, then request logging.
///
/// Headers are set outside panic recovery so the 500 built from a panic
/// carries them too.
pub fn with_standard_chain<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(SecurityHeadersLayer::new(SecurityHeadersConfig::default()))
            .layer(recover_panic())
            .layer(from_fn(log_request)),
    )
}

/// Finish `endpoint` with the session and authenticate middleware around its
/// handlers.
fn dynamic(state: &AppState, endpoint: Endpoint<AppState>) -> MethodRouter<AppState> {
    endpoint
        .route_layer(from_fn_with_state(state.clone(), authenticate))
        .route_layer(SessionLayer::new(state))
        .into_method_router()
}

/// Build the application router over `state`.
pub fn routes(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.config().static_files.dir);

    let router = Router::new()
        .route("/", dynamic(&state, Endpoint::new().get(snippets::home)))
        .route(
            "/snippet/view/{id}",
            dynamic(&state, Endpoint::new().get(snippets::view)),
        )
        .route(
            "/snippet/create",
            dynamic(
                &state,
                Endpoint::new()
                    .get(snippets::create)
                    .post(snippets::create_post),
            ),
        )
        .route(
            "/user/signup",
            dynamic(
                &state,
                Endpoint::new().get(users::signup).post(users::signup_post),
            ),
        )
        .route(
            "/user/login",
            dynamic(
                &state,
                Endpoint::new().get(users::login).post(users::login_post),
            ),
        )
        .route(
            "/user/logout",
            dynamic(&state, Endpoint::new().post(users::logout_post)),
        )
        .nest_service("/static", static_files)
        .fallback(not_found);

    with_standard_chain(router).with_state(state)
}
