mod handlers;

use axum::{routing::delete, routing::get, Router};

use crate::core::state::AppState;

/// Routes mounted under `/courses`.
pub(crate) fn course_routes() -> Router<AppState> {
    Router::new().route(
        "/:course_id/materials",
        get(handlers::list_materials).post(handlers::upload_material),
    )
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:material_id", delete(handlers::delete_material))
        .route("/:material_id/file", get(handlers::download_material))
}

#[cfg(test)]
mod tests;
