//! HTTP handlers for recurring order schedules

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::schedule::{CreateScheduleInput, ScheduleRunReport};
use crate::AppState;
use shared::models::RecurringOrderSchedule;

/// Create a recurring order schedule
pub async fn create_schedule(
    State(state): State<AppState>,
    Json(input): Json<CreateScheduleInput>,
) -> AppResult<impl IntoResponse> {
    let schedule = state.schedule_service().create_schedule(input).await?;
    Ok((StatusCode::CREATED, Json(schedule)))
}

/// Get a schedule
pub async fn get_schedule(
    State(state): State<AppState>,
    Path(schedule_id): Path<Uuid>,
) -> AppResult<Json<RecurringOrderSchedule>> {
    let schedule = state.schedule_service().get_schedule(schedule_id).await?;
    Ok(Json(schedule))
}

/// List a buyer's schedules
pub async fn list_buyer_schedules(
    State(state): State<AppState>,
    Path(buyer_id): Path<Uuid>,
) -> AppResult<Json<Vec<RecurringOrderSchedule>>> {
    let schedules = state
        .schedule_service()
        .list_schedules_for_buyer(buyer_id)
        .await?;
    Ok(Json(schedules))
}

/// Pause an active schedule
pub async fn pause_schedule(
    State(state): State<AppState>,
    Path(schedule_id): Path<Uuid>,
) -> AppResult<Json<RecurringOrderSchedule>> {
    let schedule = state.schedule_service().pause_schedule(schedule_id).await?;
    Ok(Json(schedule))
}

/// Resume a paused schedule
pub async fn resume_schedule(
    State(state): State<AppState>,
    Path(schedule_id): Path<Uuid>,
) -> AppResult<Json<RecurringOrderSchedule>> {
    let schedule = state.schedule_service().resume_schedule(schedule_id).await?;
    Ok(Json(schedule))
}

/// Cancel a schedule
pub async fn cancel_schedule(
    State(state): State<AppState>,
    Path(schedule_id): Path<Uuid>,
) -> AppResult<Json<RecurringOrderSchedule>> {
    let schedule = state.schedule_service().cancel_schedule(schedule_id).await?;
    Ok(Json(schedule))
}

/// Run all due schedules immediately (also driven by the periodic job)
pub async fn run_due_schedules(
    State(state): State<AppState>,
) -> AppResult<Json<ScheduleRunReport>> {
    let orders = state.order_service();
    let report = state
        .schedule_service()
        .run_due_schedules(&orders, state.config.scheduler.batch_size)
        .await?;
    Ok(Json(report))
}
