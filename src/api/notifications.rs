use axum::{
    extract::State,
    routing::{get, post},
    Router,
};

use crate::api::errors::ApiError;
use crate::api::extract::{Json, Path, Query};
use crate::api::guards::CurrentUser;
use crate::api::pagination::{normalize, PaginatedResponse};
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::notification::{
    MarkAllReadResponse, NotificationListQuery, NotificationResponse,
};
use crate::schemas::MessageResponse;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/read-all", post(mark_all_read))
        .route("/:notification_id/read", post(mark_read))
}

async fn list_notifications(
    Query(params): Query<NotificationListQuery>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<NotificationResponse>>, ApiError> {
    let (skip, limit) = normalize(params.skip, params.limit);

    let (items, total_count) = repositories::notifications::list_for_user(
        state.db(),
        user.id,
        params.unread_only,
        skip,
        limit,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list notifications"))?;

    Ok(Json(PaginatedResponse {
        items: items.into_iter().map(NotificationResponse::from_db).collect(),
        total_count,
        skip,
        limit,
    }))
}

async fn mark_read(
    Path(notification_id): Path<i64>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, ApiError> {
    let found = repositories::notifications::mark_read(state.db(), notification_id, user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update notification"))?;

    if found {
        Ok(Json(MessageResponse::new("Notification marked as read")))
    } else {
        Err(ApiError::NotFound("Notification not found".to_string()))
    }
}

async fn mark_all_read(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<MarkAllReadResponse>, ApiError> {
    let updated = repositories::notifications::mark_all_read(state.db(), user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update notifications"))?;

    Ok(Json(MarkAllReadResponse { updated }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use tower::ServiceExt;

    use crate::core::time::primitive_now_utc;
    use crate::db::types::UserRole;
    use crate::repositories;
    use crate::test_support;

    #[tokio::test]
    async fn notifications_are_private_and_can_be_marked_read() {
        let Some(ctx) = test_support::setup_test_context().await else {
            return;
        };

        let owner =
            test_support::insert_user(ctx.state.db(), "stud01", UserRole::Student, "stud-pass")
                .await;
        let other =
            test_support::insert_user(ctx.state.db(), "stud02", UserRole::Student, "stud-pass")
                .await;
        for message in ["first", "second", "third"] {
            repositories::notifications::insert(
                ctx.state.db(),
                owner.id,
                message,
                primitive_now_utc(),
            )
            .await
            .expect("insert notification");
        }
        let owner_token = test_support::bearer_token(&owner, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                "/api/v1/notifications?unread_only=true&limit=2",
                Some(&owner_token),
                None,
            ))
            .await
            .expect("list notifications");
        let listed = test_support::read_json(response).await;
        assert_eq!(listed["total_count"], 3);
        assert_eq!(listed["items"].as_array().map(Vec::len), Some(2));
        let first_id = listed["items"][0]["id"].as_i64().expect("notification id");

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/notifications/{first_id}/read"),
                Some(&test_support::bearer_token(&other, ctx.state.settings())),
                None,
            ))
            .await
            .expect("mark someone else's notification");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/notifications/{first_id}/read"),
                Some(&owner_token),
                None,
            ))
            .await
            .expect("mark read");
        assert_eq!(response.status(), StatusCode::OK);

        let response = ctx
            .app
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/notifications/read-all",
                Some(&owner_token),
                None,
            ))
            .await
            .expect("mark all read");
        let body = test_support::read_json(response).await;
        assert_eq!(body["updated"], 2);

        let unread = repositories::notifications::count_unread(ctx.state.db(), owner.id)
            .await
            .expect("count unread");
        assert_eq!(unread, 0);
    }
}
