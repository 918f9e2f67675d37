use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use axum_extra::extract::cookie::PrivateCookieJar;
use serde::Deserialize;

use crate::{
    auth::{self, CurrentUser},
    error::AppError,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/login", get(login_form).post(login_submit))
        .route("/signup", get(signup_form).post(signup_submit))
        .route("/logout", get(logout))
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    logged_in: bool,
    username: String,
}

async fn index(current: CurrentUser) -> impl IntoResponse {
    AskamaTemplateResponse::into_response(IndexTemplate {
        logged_in: current.is_logged_in(),
        username: current
            .0
            .map(|user| user.username)
            .unwrap_or_default(),
    })
}

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    logged_in: bool,
    show_error: bool,
    error_message: String,
    username: String,
}

async fn login_form(current: CurrentUser) -> Response {
    if current.is_logged_in() {
        return Redirect::to("/plan_trip").into_response();
    }
    AskamaTemplateResponse::into_response(LoginTemplate {
        logged_in: false,
        show_error: false,
        error_message: String::new(),
        username: String::new(),
    })
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login_submit(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    match auth::authenticate_user(&state, &form.username, &form.password).await {
        Ok(user) => {
            let session_id = auth::create_session(&state, user.id).await?;
            Ok((
                auth::apply_session_cookie(jar, &session_id),
                Redirect::to("/plan_trip"),
            )
                .into_response())
        }
        Err(AppError::Unauthorized) => Ok(render_login_error(
            form.username,
            "Invalid username or password.".into(),
        )),
        Err(AppError::BadRequest(msg)) => Ok(render_login_error(form.username, msg)),
        Err(err) => Err(err),
    }
}

fn render_login_error(username: String, message: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        AskamaTemplateResponse::into_response(LoginTemplate {
            logged_in: false,
            show_error: true,
            error_message: message,
            username,
        }),
    )
        .into_response()
}

#[derive(Template)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    logged_in: bool,
    show_error: bool,
    error_message: String,
    username: String,
}

async fn signup_form(current: CurrentUser) -> Response {
    if current.is_logged_in() {
        return Redirect::to("/plan_trip").into_response();
    }
    AskamaTemplateResponse::into_response(SignupTemplate {
        logged_in: false,
        show_error: false,
        error_message: String::new(),
        username: String::new(),
    })
}

#[derive(Deserialize)]
struct SignupForm {
    username: String,
    password: String,
    password_confirm: String,
}

async fn signup_submit(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    if form.password != form.password_confirm {
        return Ok(render_signup_error(
            form.username,
            "The passwords do not match.".into(),
        ));
    }

    match auth::register_user(&state, &form.username, &form.password).await {
        Ok(user) => {
            let session_id = auth::create_session(&state, user.id).await?;
            Ok((
                auth::apply_session_cookie(jar, &session_id),
                Redirect::to("/plan_trip"),
            )
                .into_response())
        }
        Err(AppError::BadRequest(msg)) => Ok(render_signup_error(form.username, msg)),
        Err(err) => Err(err),
    }
}

fn render_signup_error(username: String, message: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        AskamaTemplateResponse::into_response(SignupTemplate {
            logged_in: false,
            show_error: true,
            error_message: message,
            username,
        }),
    )
        .into_response()
}

async fn logout(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, Redirect), AppError> {
    if let Some(cookie) = jar.get(auth::SESSION_COOKIE) {
        auth::destroy_session(&state, cookie.value()).await?;
    }
    Ok((auth::clear_session_cookie(jar), Redirect::to("/")))
}
