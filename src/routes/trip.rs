use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use axum_extra::extract::Form;
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    auth::CurrentUser,
    error::AppError,
    models::trip::{TripForm, TripResponse},
    services::pdf::render_itinerary_pdf,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/plan_trip", get(plan_trip))
        .route("/view_trip", post(view_trip))
        .route("/create_trip", post(view_trip))
        .route("/download_pdf", post(download_pdf))
}

#[derive(Template, Default)]
#[template(path = "plan_trip.html")]
pub struct PlanTripTemplate {
    logged_in: bool,
    username: String,
    show_error: bool,
    error_message: String,
    location: String,
    trip_start: String,
    trip_end: String,
    trip_name: String,
}

async fn plan_trip(current: CurrentUser) -> Result<Response, AppError> {
    let user = current.require_user()?;
    Ok(AskamaTemplateResponse::into_response(PlanTripTemplate {
        logged_in: true,
        username: user.username.clone(),
        ..Default::default()
    }))
}

#[derive(Template)]
#[template(path = "view_trip.html")]
pub struct ViewTripTemplate {
    logged_in: bool,
    username: String,
    trip: TripResponse,
    trip_json: String,
}

async fn view_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    Form(form): Form<TripForm>,
) -> Result<Response, AppError> {
    let user = current.require_user()?;

    let sticky = PlanTripTemplate {
        logged_in: true,
        username: user.username.clone(),
        show_error: true,
        error_message: String::new(),
        location: form.location.clone().unwrap_or_default(),
        trip_start: form.trip_start.clone().unwrap_or_default(),
        trip_end: form.trip_end.clone().unwrap_or_default(),
        trip_name: form.trip_name.clone().unwrap_or_default(),
    };
    let request = match form.into_request() {
        Ok(request) => request,
        Err(missing) => {
            warn!(user = %user.username, ?missing, "trip form incomplete");
            let page = PlanTripTemplate {
                error_message: format!("Please fill in: {}.", missing.join(", ")),
                ..sticky
            };
            return Ok((
                StatusCode::BAD_REQUEST,
                AskamaTemplateResponse::into_response(page),
            )
                .into_response());
        }
    };

    info!(user = %user.username, location = %request.location, "trip requested");
    match state.planner.plan(&request).await {
        Ok(trip) => Ok(AskamaTemplateResponse::into_response(ViewTripTemplate {
            logged_in: true,
            username: user.username.clone(),
            trip_json: trip.to_json(),
            trip,
        })),
        Err(err @ (AppError::Validation(_) | AppError::Llm(_))) => Ok(render_error(
            &current,
            StatusCode::BAD_GATEWAY,
            "We couldn't build an itinerary for this trip. Please try again.",
            err.to_string(),
        )),
        Err(err) => Err(err),
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    logged_in: bool,
    username: String,
    title: String,
    message: String,
}

fn render_error(
    current: &CurrentUser,
    status: StatusCode,
    title: &str,
    message: String,
) -> Response {
    (
        status,
        AskamaTemplateResponse::into_response(ErrorTemplate {
            logged_in: current.is_logged_in(),
            username: current
                .0
                .as_ref()
                .map(|user| user.username.clone())
                .unwrap_or_default(),
            title: title.to_string(),
            message,
        }),
    )
        .into_response()
}

#[derive(Deserialize)]
struct PdfForm {
    itinerary: String,
}

async fn download_pdf(
    current: CurrentUser,
    Form(form): Form<PdfForm>,
) -> Result<Response, AppError> {
    let user = current.require_user()?;
    let trip = TripResponse::from_json_str(&form.itinerary).map_err(AppError::BadRequest)?;
    let bytes = render_itinerary_pdf(&trip).await?;
    info!(user = %user.username, trip = %trip.trip_name, bytes = bytes.len(), "pdf rendered");

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.pdf\"", trip.slug()),
            ),
        ],
        bytes,
    )
        .into_response())
}
