use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;
use crate::repositories::users::{CreateUser, UpdateUser};

/// Makes sure the configured first admin exists, is an active admin and
/// accepts the configured password.
pub(crate) async fn ensure_first_admin(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.first_admin_password.is_empty() {
        tracing::warn!("FIRST_ADMIN_PASSWORD not configured; skipping admin bootstrap");
        return Ok(());
    }

    let username = admin.first_admin_username.as_str();
    let existing = repositories::users::find_by_username(state.db(), username).await?;

    let Some(user) = existing else {
        let hashed_password = security::hash_password(&admin.first_admin_password)?;
        let created = repositories::users::create(
            state.db(),
            CreateUser {
                username,
                hashed_password,
                first_name: "Portal",
                last_name: "Administrator",
                email: &admin.first_admin_email,
                role: UserRole::Admin,
                active: true,
                created_at: primitive_now_utc(),
            },
        )
        .await?;
        tracing::info!(user_id = created.id, username, "Created first admin");
        return Ok(());
    };

    let password_matches =
        security::verify_password(&admin.first_admin_password, &user.hashed_password)
            .unwrap_or(false);
    if password_matches && user.role == UserRole::Admin && user.active {
        tracing::debug!(username, "First admin already up to date");
        return Ok(());
    }

    let hashed_password = if password_matches {
        None
    } else {
        Some(security::hash_password(&admin.first_admin_password)?)
    };

    repositories::users::update(
        state.db(),
        user.id,
        UpdateUser {
            first_name: None,
            last_name: None,
            email: None,
            role: Some(UserRole::Admin),
            active: Some(true),
            hashed_password,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, username, "Updated first admin");
    Ok(())
}
