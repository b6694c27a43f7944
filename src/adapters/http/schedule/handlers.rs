//! HTTP handlers for schedule endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::adapters::http::error::{parse_id, ApiResult};
use crate::adapters::http::identity::Caller;
use crate::application::handlers::{
    CreateScheduleCommand, CreateScheduleHandler, DeleteScheduleCommand, DeleteScheduleHandler,
    UpdateScheduleHandler,
};
use crate::application::SyncQueries;
use crate::domain::foundation::PatrolAreaId;
use crate::domain::schedule::Schedule;

use super::dto::{CreateScheduleRequest, ListSchedulesQuery, UpdateScheduleRequest};

// ════════════════════════════════════════════════════════════════════════════
// Handler state
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct ScheduleHandlers {
    create_handler: Arc<CreateScheduleHandler>,
    update_handler: Arc<UpdateScheduleHandler>,
    delete_handler: Arc<DeleteScheduleHandler>,
    queries: SyncQueries,
}

impl ScheduleHandlers {
    pub fn new(
        create_handler: Arc<CreateScheduleHandler>,
        update_handler: Arc<UpdateScheduleHandler>,
        delete_handler: Arc<DeleteScheduleHandler>,
        queries: SyncQueries,
    ) -> Self {
        Self {
            create_handler,
            update_handler,
            delete_handler,
            queries,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HTTP handlers
// ════════════════════════════════════════════════════════════════════════════

/// GET /api/schedules - Full schedule collection, status computed now
pub async fn list_schedules(
    State(handlers): State<ScheduleHandlers>,
    caller: Caller,
    Query(query): Query<ListSchedulesQuery>,
) -> ApiResult<Json<Vec<Schedule>>> {
    let officer = query.mine.then_some(&caller.user_id);
    let schedules = handlers.queries.list_schedules(officer).await?;
    Ok(Json(schedules))
}

/// POST /api/schedules - Create a shift and notify its roster
pub async fn create_schedule(
    State(handlers): State<ScheduleHandlers>,
    caller: Caller,
    Json(req): Json<CreateScheduleRequest>,
) -> ApiResult<(StatusCode, Json<Schedule>)> {
    let cmd = CreateScheduleCommand {
        shift: req.shift,
        start: req.start,
        end: req.end,
        roster: req.roster,
        area: PatrolAreaId::new(req.area)?,
    };

    let result = handlers.create_handler.handle(cmd, caller.metadata()).await?;
    Ok((StatusCode::CREATED, Json(result.schedule)))
}

/// PATCH /api/schedules/:id - Edit an upcoming shift
pub async fn update_schedule(
    State(handlers): State<ScheduleHandlers>,
    caller: Caller,
    Path(schedule_id): Path<String>,
    Json(req): Json<UpdateScheduleRequest>,
) -> ApiResult<Json<Schedule>> {
    let schedule_id = parse_id(&schedule_id, "schedule ID")?;
    let cmd = req.into_command(schedule_id)?;

    let result = handlers.update_handler.handle(cmd, caller.metadata()).await?;
    Ok(Json(result.schedule))
}

/// DELETE /api/schedules/:id - Delete a shift that is not running
pub async fn delete_schedule(
    State(handlers): State<ScheduleHandlers>,
    caller: Caller,
    Path(schedule_id): Path<String>,
) -> ApiResult<Json<Schedule>> {
    let cmd = DeleteScheduleCommand {
        schedule_id: parse_id(&schedule_id, "schedule ID")?,
    };

    let deleted = handlers.delete_handler.handle(cmd, caller.metadata()).await?;
    Ok(Json(deleted))
}
