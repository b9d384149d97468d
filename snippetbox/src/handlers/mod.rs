//! Page handlers and the helpers they share

pub mod snippets;
pub mod users;

use crate::auth::AuthContext;
use crate::error::AppError;
use crate::forms::FormFields;
use crate::models::Snippet;
use crate::session::Session;
use crate::state::AppState;
use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Form,
};
use chrono::{Datelike, Utc};
use serde::Serialize;

/// Session key of the one-shot flash message
pub const FLASH: &str = "flash";

/// Everything a page template can read
#[derive(Debug, Default, Serialize)]
pub struct TemplateData {
    /// Year shown in the footer
    pub current_year: i32,
    /// Snippet on the view page
    pub snippet: Option<Snippet>,
    /// Snippets on the home page
    pub snippets: Vec<Snippet>,
    /// Form values and validation errors
    pub form: Option<minijinja::Value>,
    /// Flash message, removed from the session when read
    pub flash: Option<String>,
    /// Whether to show the logged-in navigation
    pub is_authenticated: bool,
}

impl TemplateData {
    /// Defaults for every page; pops the flash message.
    #[must_use]
    pub fn new(session: &Session, auth: AuthContext) -> Self {
        Self {
            current_year: Utc::now().year(),
            flash: session.pop_string(FLASH),
            is_authenticated: auth.is_authenticated(),
            ..Self::default()
        }
    }

    /// Attach a form for the template to echo back.
    #[must_use]
    pub fn with_form<F: Serialize>(mut self, form: &F) -> Self {
        self.form = Some(minijinja::Value::from_serialize(form));
        self
    }
}

/// Raw `name=value` pairs of a url-encoded request body
///
/// Any body axum cannot read as a form (wrong content type, bad encoding)
/// is rejected as [`AppError::BadRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormPairs(pub Vec<(String, String)>);

impl<S> FromRequest<S> for FormPairs
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        Ok(Self(pairs))
    }
}

/// Render `page` in full, then send it with `status`.
pub fn render(
    state: &AppState,
    status: StatusCode,
    page: &str,
    data: &TemplateData,
) -> Result<Response, AppError> {
    let body = state.templates().render(page, data)?;
    Ok((status, Html(body)).into_response())
}

/// Decode a submitted form into `T`.
///
/// A bad value is the client's fault and becomes a 400. A target type that
/// disagrees with its own field table is a bug.
///
/// # Panics
///
/// Panics on [`FormError::InvalidTarget`](crate::forms::FormError::InvalidTarget).
pub fn decode_post_form<T: FormFields>(
    state: &AppState,
    raw: &[(String, String)],
) -> Result<T, AppError> {
    match state.forms().decode(raw) {
        Ok(form) => Ok(form),
        Err(e) if e.is_invalid_target() => panic!("{e}"),
        Err(e) => Err(AppError::BadRequest(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::forms::{FormField, SnippetCreateForm};
    use crate::models::{MockSnippetStore, MockUserStore};
    use crate::router::with_standard_chain;
    use crate::session::{MemorySessionStore, SessionConfig, SessionManager};
    use crate::template::TemplateCache;
    use axum::{
        body::{to_bytes, Body},
        extract::State,
        http::{header, Request},
        routing::post,
        Router,
    };
    use serde::Deserialize;
    use std::sync::Arc;
    use tower::ServiceExt;

    /// A form whose field table omits a field the struct requires
    #[derive(Debug, Deserialize)]
    struct Mismatched {
        #[allow(dead_code)]
        title: String,
        #[allow(dead_code)]
        votes: i64,
    }

    impl FormFields for Mismatched {
        const FIELDS: &'static [FormField] = &[FormField::text("title")];
    }

    fn state() -> AppState {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("partials")).unwrap();
        std::fs::create_dir_all(dir.path().join("pages")).unwrap();
        std::fs::write(dir.path().join("base.html"), "").unwrap();
        std::fs::write(dir.path().join("partials/nav.html"), "").unwrap();

        AppState::new(
            Config::default(),
            Arc::new(MockSnippetStore::new()),
            Arc::new(MockUserStore::new()),
            TemplateCache::build(dir.path()).unwrap(),
            SessionManager::new(
                Arc::new(MemorySessionStore::new()),
                SessionConfig::default(),
            ),
        )
    }

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_decode_post_form_valid() {
        let form: SnippetCreateForm = decode_post_form(
            &state(),
            &pairs(&[("title", "t"), ("content", "c"), ("expires", "7")]),
        )
        .unwrap();
        assert_eq!(form.expires, 7);
    }

    #[test]
    fn test_decode_post_form_bad_value_is_400() {
        let result: Result<SnippetCreateForm, _> =
            decode_post_form(&state(), &pairs(&[("expires", "soon")]));
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    #[should_panic(expected = "Mismatched")]
    fn test_decode_post_form_panics_on_invalid_target() {
        let _ = decode_post_form::<Mismatched>(&state(), &pairs(&[("title", "t")]));
    }

    async fn mismatched(State(state): State<AppState>, FormPairs(raw): FormPairs) -> String {
        let form: Mismatched = match decode_post_form(&state, &raw) {
            Ok(form) => form,
            Err(e) => return e.to_string(),
        };
        format!("{form:?}")
    }

    #[tokio::test]
    async fn test_invalid_target_becomes_generic_500() {
        let app = with_standard_chain(Router::new().route("/", post(mismatched)))
            .with_state(state());

        let response = app
            .oneshot(
                Request::post("/")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("title=t"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[header::CONNECTION], "close");
        assert!(response
            .headers()
            .contains_key(header::CONTENT_SECURITY_POLICY));
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Internal Server Error");
    }

    #[tokio::test]
    async fn test_form_pairs_rejects_non_form_body() {
        let request = Request::post("/")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("title=t"))
            .unwrap();
        let result = FormPairs::from_request(request, &()).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_form_pairs_keeps_order_and_duplicates() {
        let request = Request::post("/")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("b=2&a=1&b=3"))
            .unwrap();
        let FormPairs(raw) = FormPairs::from_request(request, &()).await.unwrap();
        assert_eq!(raw, pairs(&[("b", "2"), ("a", "1"), ("b", "3")]));
    }
}
