//! Security headers middleware
//!
//! Adds security-related headers to every response, static files and error
//! pages included:
//! - Content-Security-Policy: restrict where resources load from
//! - Referrer-Policy: limit referrer information
//! - X-Content-Type-Options: prevent MIME sniffing
//! - X-Frame-Options: prevent clickjacking
//! - X-XSS-Protection: turn off the legacy XSS auditor
//!
//! # Example
//!
//! ```rust,no_run
//! use axum::Router;
//! use snippetbox::middleware::{SecurityHeadersConfig, SecurityHeadersLayer};
//!
//! let app: Router<()> = Router::new()
//!     .layer(SecurityHeadersLayer::new(SecurityHeadersConfig::default()));
//! ```

use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, Request, Response},
};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Policy allowing same-origin resources plus Google Fonts
pub const DEFAULT_CSP: &str =
    "default-src 'self'; style-src 'self' fonts.googleapis.com; font-src fonts.gstatic.com";

/// X-Frame-Options values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOptions {
    /// Never render in a frame
    Deny,
    /// Render only in frames from the same origin
    SameOrigin,
}

impl fmt::Display for FrameOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deny => write!(f, "deny"),
            Self::SameOrigin => write!(f, "sameorigin"),
        }
    }
}

/// Referrer-Policy values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferrerPolicy {
    /// Never send a referrer
    NoReferrer,
    /// Full URL same-origin, origin only cross-origin
    OriginWhenCrossOrigin,
    /// Like `OriginWhenCrossOrigin`, nothing on HTTPS to HTTP
    StrictOriginWhenCrossOrigin,
}

impl fmt::Display for ReferrerPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoReferrer => write!(f, "no-referrer"),
            Self::OriginWhenCrossOrigin => write!(f, "origin-when-cross-origin"),
            Self::StrictOriginWhenCrossOrigin => write!(f, "strict-origin-when-cross-origin"),
        }
    }
}

/// Which headers to set and their values
///
/// `None` leaves the header off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityHeadersConfig {
    /// Content-Security-Policy
    pub csp: Option<String>,
    /// Referrer-Policy
    pub referrer_policy: Option<ReferrerPolicy>,
    /// Send `X-Content-Type-Options: nosniff`
    pub content_type_options: bool,
    /// X-Frame-Options
    pub frame_options: Option<FrameOptions>,
    /// Send `X-XSS-Protection: 0`
    pub disable_xss_auditor: bool,
}

impl Default for SecurityHeadersConfig {
    fn default() -> Self {
        Self {
            csp: Some(DEFAULT_CSP.to_string()),
            referrer_policy: Some(ReferrerPolicy::OriginWhenCrossOrigin),
            content_type_options: true,
            frame_options: Some(FrameOptions::Deny),
            disable_xss_auditor: true,
        }
    }
}

impl SecurityHeadersConfig {
    /// Replace the Content-Security-Policy
    #[must_use]
    pub fn with_csp(mut self, policy: impl Into<String>) -> Self {
        self.csp = Some(policy.into());
        self
    }

    /// Resolve to header pairs, dropping values that are not valid headers.
    fn headers(&self) -> Vec<(HeaderName, HeaderValue)> {
        let mut headers = Vec::with_capacity(5);
        let mut push = |name: HeaderName, value: String| match HeaderValue::from_str(&value) {
            Ok(value) => headers.push((name, value)),
            Err(_) => tracing::warn!(header = %name, %value, "invalid security header value"),
        };

        if let Some(csp) = &self.csp {
            push(header::CONTENT_SECURITY_POLICY, csp.clone());
        }
        if let Some(policy) = self.referrer_policy {
            push(header::REFERRER_POLICY, policy.to_string());
        }
        if self.content_type_options {
            push(header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string());
        }
        if let Some(options) = self.frame_options {
            push(header::X_FRAME_OPTIONS, options.to_string());
        }
        if self.disable_xss_auditor {
            push(header::X_XSS_PROTECTION, "0".to_string());
        }
        headers
    }
}

/// Layer that adds security headers to responses
#[derive(Debug, Clone)]
pub struct SecurityHeadersLayer {
    headers: std::sync::Arc<[(HeaderName, HeaderValue)]>,
}

impl SecurityHeadersLayer {
    /// Create a layer from `config`
    #[must_use]
    pub fn new(config: SecurityHeadersConfig) -> Self {
        Self {
            headers: config.headers().into(),
        }
    }
}

impl<S> tower::Layer<S> for SecurityHeadersLayer {
    type Service = SecurityHeadersMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecurityHeadersMiddleware {
            inner,
            headers: self.headers.clone(),
        }
    }
}

/// Service that adds security headers to responses
#[derive(Debug, Clone)]
pub struct SecurityHeadersMiddleware<S> {
    inner: S,
    headers: std::sync::Arc<[(HeaderName, HeaderValue)]>,
}

impl<S, ResBody> tower::Service<Request<Body>> for SecurityHeadersMiddleware<S>
where
    S: tower::Service<Request<Body>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let headers = self.headers.clone();
        let future = self.inner.call(request);

        Box::pin(async move {
            let mut response = future.await?;
            let target = response.headers_mut();
            for (name, value) in headers.iter() {
                target.insert(name.clone(), value.clone());
            }
            Ok(response)
        })
    }
}
