//! HTTP route handlers for the web server.
//!
//! A trigger surface only: an external cron hits the fleet pass, and
//! on-demand runs / schedule lookups are exposed per user. All business
//! logic lives in `crate::fleet` and `crate::schedule`.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tracing::info;

use crate::fleet::{RunAction, UserRunResult};
use crate::schedule::{zoned_now, EffectiveSchedule};
use crate::settings::SettingsStore;
use crate::AppState;

/// JSON error response helper
fn err_response(status: StatusCode, msg: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({ "error": msg })))
}

/// Build the API router with all endpoints.
pub fn api_router(state: Arc<AppState>) -> Router {
    Router::new()
        // External cron trigger: one fleet pass
        .route("/cron/check-schedule", get(run_cron))
        // On-demand action for one user
        .route("/users/:user_id/run", post(run_action))
        // Display projection of today's effective schedule
        .route("/users/:user_id/schedule", get(get_schedule))
        // Auth middleware (only if AUTOPUNCH_WEB_PASS is set)
        .layer(middleware::from_fn(super::auth::basic_auth_middleware))
        .layer(Extension(state))
}

async fn run_cron(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    info!("Cron trigger: checking schedules for all users");
    let started = Instant::now();
    let report = state.fleet.check_and_execute_for_all_users().await;
    let executed = report
        .results
        .iter()
        .filter(|r| matches!(r.result, UserRunResult::Executed(_)))
        .count();
    Json(serde_json::json!({
        "success": true,
        "checked": report.checked,
        "executed": executed,
        "durationMs": started.elapsed().as_millis() as u64,
        "results": report.results,
    }))
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunRequest {
    action: RunAction,
}

async fn run_action(
    Extension(state): Extension<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(request): Json<RunRequest>,
) -> impl IntoResponse {
    info!("On-demand {:?} for user {}", request.action, user_id);
    // The outcome carries its own success flag; HTTP 200 either way.
    Json(state.fleet.execute_for_user(&user_id, request.action).await)
}

async fn get_schedule(
    Extension(state): Extension<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let settings = match state.store.get(&user_id).await {
        Ok(Some(settings)) => settings,
        Ok(None) => {
            return err_response(StatusCode::NOT_FOUND, "settings not found").into_response()
        }
        Err(e) => {
            return err_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
                .into_response()
        }
    };

    let schedule = match EffectiveSchedule::from_settings(&settings) {
        Ok(schedule) => schedule,
        Err(e) => return err_response(StatusCode::BAD_REQUEST, &e.to_string()).into_response(),
    };

    let now = zoned_now(&settings.timezone);
    let display = schedule.display_times(now.naive_local());
    Json(serde_json::json!({
        "userId": settings.user_id,
        "timezone": settings.timezone,
        "schedulerEnabled": settings.scheduler_enabled,
        "nextCheckIn": display.next_check_in,
        "nextCheckOut": display.next_check_out,
    }))
    .into_response()
}
