//! Admin dashboard stats (requires the is_admin flag)

use axum::{extract::State, Json};

use crate::api::session_middleware::CurrentUser;
use crate::db::study::{admin_stats, AdminStats};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /api/admin/stats
pub async fn stats(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<AdminStats>> {
    if !user.is_admin {
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }

    Ok(Json(admin_stats(&state.db).await?))
}
