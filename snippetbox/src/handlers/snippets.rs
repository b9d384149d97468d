//! Snippet pages

use super::{decode_post_form, render, FormPairs, TemplateData, FLASH};
use crate::auth::AuthContext;
use crate::error::AppError;
use crate::forms::SnippetCreateForm;
use crate::session::Session;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

/// `GET /`: the latest snippets.
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    auth: AuthContext,
) -> Result<Response, AppError> {
    let snippets = state.snippets().latest().await?;

    let data = TemplateData {
        snippets,
        ..TemplateData::new(&session, auth)
    };
    render(&state, StatusCode::OK, "home.html", &data)
}

/// `GET /snippet/view/{id}`: one snippet.
///
/// Ids that are not positive integers are 404s.
pub async fn view(
    State(state): State<AppState>,
    session: Session,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = match id.parse::<i64>() {
        Ok(id) if id >= 1 => id,
        _ => return Err(AppError::NotFound),
    };
    let snippet = state.snippets().get(id).await?;

    let data = TemplateData {
        snippet: Some(snippet),
        ..TemplateData::new(&session, auth)
    };
    render(&state, StatusCode::OK, "view.html", &data)
}

/// `GET /snippet/create`: empty creation form.
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    auth: AuthContext,
) -> Result<Response, AppError> {
    let data = TemplateData::new(&session, auth).with_form(&SnippetCreateForm::default());
    render(&state, StatusCode::OK, "create.html", &data)
}

/// `POST /snippet/create`: validate, store and redirect to the new snippet.
pub async fn create_post(
    State(state): State<AppState>,
    session: Session,
    auth: AuthContext,
    FormPairs(raw): FormPairs,
) -> Result<Response, AppError> {
    let mut form: SnippetCreateForm = decode_post_form(&state, &raw)?;
    form.validate();
    if !form.validator.valid() {
        let data = TemplateData::new(&session, auth).with_form(&form);
        return render(&state, StatusCode::UNPROCESSABLE_ENTITY, "create.html", &data);
    }

    let id = state
        .snippets()
        .insert(&form.title, &form.content, form.expires)
        .await?;
    session.put(FLASH, "Snippet successfully created!")?;

    Ok(Redirect::to(&format!("/snippet/view/{id}")).into_response())
}
