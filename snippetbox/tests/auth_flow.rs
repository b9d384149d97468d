//! Signup, login, logout and the session lifecycle around them

mod common;

use axum::http::StatusCode;
use common::{location, TestApp, PASSWORD};
use snippetbox::session::{SessionBackend, SessionToken};

async fn record_exists(app: &TestApp, token: &str) -> bool {
    let token = SessionToken::parse(token).unwrap();
    app.state
        .sessions()
        .store()
        .find(&token)
        .await
        .unwrap()
        .is_some()
}

async fn user_count(app: &TestApp) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&app.pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_signup_then_login_then_logout_renews_token_each_time() {
    let mut app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/user/signup",
            &[
                ("name", "Alice"),
                ("email", "alice@example.com"),
                ("password", PASSWORD),
            ],
        )
        .await;
    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/user/login");
    let signed_up = app.token().unwrap().to_string();

    let response = app
        .post_form(
            "/user/login",
            &[("email", "alice@example.com"), ("password", PASSWORD)],
        )
        .await;
    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/snippet/create");
    let logged_in = app.token().unwrap().to_string();
    assert_ne!(signed_up, logged_in);
    assert!(!record_exists(&app, &signed_up).await);

    // The signup flash was never read, so it survived the renewal.
    let body = app.get("/snippet/create").await.text();
    assert!(body.contains("Your signup was successful. Please log in."));
    assert!(body.contains("Logout"));

    let response = app.post_form("/user/logout", &[]).await;
    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    let logged_out = app.token().unwrap().to_string();
    assert_ne!(logged_in, logged_out);
    assert!(!record_exists(&app, &logged_in).await);

    let body = app.get("/").await.text();
    assert!(body.contains("You've been logged out successfully!"));
    assert!(body.contains("/user/login"));
    assert!(!body.contains("Logout"));

    let response = app
        .post_form(
            "/user/login",
            &[("email", "alice@example.com"), ("password", PASSWORD)],
        )
        .await;
    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    assert_ne!(app.token().unwrap(), logged_out);
}

#[tokio::test]
async fn test_flash_is_shown_exactly_once() {
    let mut app = TestApp::spawn().await;
    app.login_as("Bob", "bob@example.com").await;

    let response = app.post_form("/user/logout", &[]).await;
    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);

    let first = app.get("/").await.text();
    let second = app.get("/").await.text();
    let third = app.get("/").await.text();
    assert!(first.contains("You've been logged out successfully!"));
    assert!(!second.contains("You've been logged out successfully!"));
    assert!(!third.contains("You've been logged out successfully!"));
}

#[tokio::test]
async fn test_duplicate_signup_is_a_field_error() {
    let mut app = TestApp::spawn().await;
    let form = [
        ("name", "Carol"),
        ("email", "carol@example.com"),
        ("password", PASSWORD),
    ];

    let response = app.post_form("/user/signup", &form).await;
    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);

    let response = app.post_form("/user/signup", &form).await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.text();
    assert!(body.contains("Email address is already in use"));
    assert!(body.contains("carol@example.com"));
    assert!(!body.contains(PASSWORD));

    assert_eq!(user_count(&app).await, 1);
}

#[tokio::test]
async fn test_signup_validation_errors() {
    let mut app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/user/signup",
            &[("name", ""), ("email", "not-an-email"), ("password", "short")],
        )
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.text();
    assert!(body.contains("This field cannot be blank"));
    assert!(body.contains("This field must be a valid email address"));
    assert!(body.contains("This field must be at least 8 characters long"));
    assert_eq!(user_count(&app).await, 0);
}

#[tokio::test]
async fn test_wrong_password_is_a_generic_error() {
    let mut app = TestApp::spawn().await;
    app.state
        .users()
        .insert("Dave", "dave@example.com", PASSWORD)
        .await
        .unwrap();

    for (email, password) in [
        ("dave@example.com", "wrong-password"),
        ("nobody@example.com", PASSWORD),
    ] {
        let response = app
            .post_form("/user/login", &[("email", email), ("password", password)])
            .await;
        assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = response.text();
        assert!(body.contains("Email or password is incorrect"));
        assert!(body.contains(email));
        assert!(!body.contains(password));
    }
}

#[tokio::test]
async fn test_deleted_user_is_treated_as_anonymous() {
    let mut app = TestApp::spawn().await;
    let id = app.login_as("Erin", "erin@example.com").await;
    assert!(app.get("/").await.text().contains("Logout"));

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(&app.pool)
        .await
        .unwrap();

    let body = app.get("/").await.text();
    assert!(!body.contains("Logout"));
    assert!(body.contains("/user/login"));
}

#[tokio::test]
async fn test_forged_cookie_starts_a_fresh_session() {
    let mut app = TestApp::spawn().await;
    app.login_as("Frank", "frank@example.com").await;
    app.clear_cookie();

    let response = app
        .server
        .get("/")
        .add_header(
            axum::http::header::COOKIE,
            axum::http::HeaderValue::from_static("session=not-a-real-token"),
        )
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(!response.text().contains("Logout"));
}

#[tokio::test]
async fn test_database_backend_persists_sessions() {
    let mut app = TestApp::spawn_with(SessionBackend::Database).await;
    app.login_as("Grace", "grace@example.com").await;

    let token = app.token().unwrap().to_string();
    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE token = ?")
        .bind(&token)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);

    assert!(app.get("/snippet/create").await.text().contains("Logout"));
}
