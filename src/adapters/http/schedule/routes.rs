//! HTTP routes for schedule endpoints.

use axum::{
    routing::{get, patch},
    Router,
};

use super::handlers::{
    create_schedule, delete_schedule, list_schedules, update_schedule, ScheduleHandlers,
};

/// Creates the schedule router, mounted under `/api`.
pub fn schedule_routes(handlers: ScheduleHandlers) -> Router {
    Router::new()
        .route("/schedules", get(list_schedules).post(create_schedule))
        .route(
            "/schedules/:id",
            patch(update_schedule).delete(delete_schedule),
        )
        .with_state(handlers)
}
