//! Signup, login and logout

use super::{decode_post_form, render, FormPairs, TemplateData, FLASH};
use crate::auth::{AuthContext, AUTHENTICATED_USER_ID};
use crate::error::AppError;
use crate::forms::{UserLoginForm, UserSignupForm};
use crate::models::ModelError;
use crate::session::Session;
use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

/// `GET /user/signup`
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    auth: AuthContext,
) -> Result<Response, AppError> {
    let data = TemplateData::new(&session, auth).with_form(&UserSignupForm::default());
    render(&state, StatusCode::OK, "signup.html", &data)
}

/// `POST /user/signup`: create the account, then send the user to log in.
pub async fn signup_post(
    State(state): State<AppState>,
    session: Session,
    auth: AuthContext,
    FormPairs(raw): FormPairs,
) -> Result<Response, AppError> {
    let mut form: UserSignupForm = decode_post_form(&state, &raw)?;
    form.validate();

    if form.validator.valid() {
        match state
            .users()
            .insert(&form.name, &form.email, &form.password)
            .await
        {
            Ok(_) => {
                session.put(FLASH, "Your signup was successful. Please log in.")?;
                return Ok(Redirect::to("/user/login").into_response());
            }
            Err(ModelError::DuplicateEmail) => {
                form.validator
                    .add_field_error("email", "Email address is already in use");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let data = TemplateData::new(&session, auth).with_form(&form);
    render(&state, StatusCode::UNPROCESSABLE_ENTITY, "signup.html", &data)
}

/// `GET /user/login`
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    auth: AuthContext,
) -> Result<Response, AppError> {
    let data = TemplateData::new(&session, auth).with_form(&UserLoginForm::default());
    render(&state, StatusCode::OK, "login.html", &data)
}

/// `POST /user/login`: check credentials and start an authenticated session.
///
/// The session token is renewed before the user id is stored.
pub async fn login_post(
    State(state): State<AppState>,
    session: Session,
    auth: AuthContext,
    FormPairs(raw): FormPairs,
) -> Result<Response, AppError> {
    let mut form: UserLoginForm = decode_post_form(&state, &raw)?;
    form.validate();

    if form.validator.valid() {
        match state.users().authenticate(&form.email, &form.password).await {
            Ok(user_id) => {
                session.renew_token().await?;
                session.put(AUTHENTICATED_USER_ID, user_id)?;
                return Ok(Redirect::to("/snippet/create").into_response());
            }
            Err(ModelError::InvalidCredentials) => {
                form.validator
                    .add_non_field_error("Email or password is incorrect");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let data = TemplateData::new(&session, auth).with_form(&form);
    render(&state, StatusCode::UNPROCESSABLE_ENTITY, "login.html", &data)
}

/// `POST /user/logout`: renew the token, forget the user, go home.
pub async fn logout_post(session: Session) -> Result<Response, AppError> {
    session.renew_token().await?;
    session.remove(AUTHENTICATED_USER_ID);
    session.put(FLASH, "You've been logged out successfully!")?;
    Ok(Redirect::to("/").into_response())
}
