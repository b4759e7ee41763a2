//! Slot catalog HTTP handlers

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;

use crate::application::SlotCatalogService;
use crate::interfaces::http::common::{ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::middleware::AuthenticatedUser;

use super::dto::*;

#[derive(Clone)]
pub struct SlotAppState {
    pub catalog: Arc<SlotCatalogService>,
}

#[utoipa::path(
    get,
    path = "/api/v1/sub-venues/{sub_venue_id}/slots",
    tag = "Slots",
    security(("bearer_auth" = [])),
    params(
        ("sub_venue_id" = String, Path, description = "Sub-venue ID"),
        SlotDayQuery
    ),
    responses(
        (status = 200, description = "Slots of the day", body = ApiResponse<SlotCollectionDto>),
        (status = 404, description = "No slots created for this date")
    )
)]
pub async fn get_slot_day(
    State(state): State<SlotAppState>,
    _user: AuthenticatedUser,
    Path(sub_venue_id): Path<String>,
    Query(query): Query<SlotDayQuery>,
) -> ApiResult<SlotCollectionDto> {
    let collection = state.catalog.get_day(&sub_venue_id, query.date).await?;
    Ok(Json(ApiResponse::success(SlotCollectionDto::from(&collection))))
}

#[utoipa::path(
    post,
    path = "/api/v1/sub-venues/{sub_venue_id}/slots",
    tag = "Slots",
    security(("bearer_auth" = [])),
    params(("sub_venue_id" = String, Path, description = "Sub-venue ID")),
    request_body = CreateSlotDayRequest,
    responses(
        (status = 200, description = "Day created, all slots blocked", body = ApiResponse<SlotCollectionDto>),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Sub-venue not found"),
        (status = 409, description = "Slots already exist for this date"),
        (status = 422, description = "Invalid windows")
    )
)]
pub async fn create_slot_day(
    State(state): State<SlotAppState>,
    user: AuthenticatedUser,
    Path(sub_venue_id): Path<String>,
    ValidatedJson(request): ValidatedJson<CreateSlotDayRequest>,
) -> ApiResult<SlotCollectionDto> {
    user.require_admin()?;

    let collection = state
        .catalog
        .create_day(&sub_venue_id, request.date, request.windows())
        .await?;
    Ok(Json(ApiResponse::success(SlotCollectionDto::from(&collection))))
}

#[utoipa::path(
    patch,
    path = "/api/v1/slot-collections/{collection_id}/slots/{slot_id}",
    tag = "Slots",
    security(("bearer_auth" = [])),
    params(
        ("collection_id" = String, Path, description = "Slot collection ID"),
        ("slot_id" = String, Path, description = "Slot ID")
    ),
    request_body = UpdateSlotRequest,
    responses(
        (status = 200, description = "Updated slot", body = ApiResponse<SlotDto>),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Slot not found"),
        (status = 409, description = "Slot is booked")
    )
)]
pub async fn update_slot(
    State(state): State<SlotAppState>,
    user: AuthenticatedUser,
    Path((collection_id, slot_id)): Path<(String, String)>,
    ValidatedJson(request): ValidatedJson<UpdateSlotRequest>,
) -> ApiResult<SlotDto> {
    user.require_admin()?;

    let update = request.into_update()?;
    let slot = state
        .catalog
        .update_slot(&collection_id, &slot_id, update)
        .await?;
    Ok(Json(ApiResponse::success(SlotDto::from(&slot))))
}
