//! Tag HTTP handlers.

use axum::extract::State;

use crate::error::ApiError;
use crate::response::DataResponse;
use crate::state::AppState;

/// List every stored tag, sorted.
///
/// GET /v1/tags
#[utoipa::path(get, path = "/v1/tags", tag = "Tags",
    responses((status = 200, description = "Tag names", body = [String])))]
pub async fn list_tags(
    State(state): State<AppState>,
) -> Result<DataResponse<Vec<String>>, ApiError> {
    let tags = state
        .tags
        .list()
        .await
        .map_err(|e| ApiError::with_message(e, "Couldn't get tags, something went wrong"))?;
    Ok(DataResponse::new(tags))
}
