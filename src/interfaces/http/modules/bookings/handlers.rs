//! Booking HTTP handlers

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;

use crate::application::{
    BookingQueries, CheckoutService, DirectCheckout, PaymentReconciler, RetryService,
};
use crate::interfaces::http::common::{ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::middleware::AuthenticatedUser;

use super::dto::*;

/// Application state for booking handlers.
#[derive(Clone)]
pub struct BookingAppState {
    pub checkout: Arc<CheckoutService>,
    pub retry: Arc<RetryService>,
    pub reconciler: Arc<PaymentReconciler>,
    pub queries: Arc<BookingQueries>,
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    request_body = DirectCheckoutRequest,
    responses(
        (status = 200, description = "Slot claimed, payment session opened", body = ApiResponse<CheckoutResponse>),
        (status = 404, description = "Sub-venue or slot not found"),
        (status = 409, description = "Slot is no longer available"),
        (status = 422, description = "Invalid request"),
        (status = 502, description = "Payment provider unavailable")
    )
)]
pub async fn create_booking(
    State(state): State<BookingAppState>,
    user: AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<DirectCheckoutRequest>,
) -> ApiResult<CheckoutResponse> {
    let outcome = state
        .checkout
        .checkout_direct(DirectCheckout {
            payer_id: user.user_id,
            sub_venue_id: request.sub_venue_id,
            collection_id: request.collection_id,
            slot_id: request.slot_id,
            category: request.category,
        })
        .await?;

    Ok(Json(ApiResponse::success(outcome.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/games/{game_id}/booking",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    params(("game_id" = String, Path, description = "Game ID")),
    responses(
        (status = 200, description = "Game slot claimed, payment session opened", body = ApiResponse<CheckoutResponse>),
        (status = 403, description = "Caller is not the game host"),
        (status = 404, description = "Game not found"),
        (status = 409, description = "Slot is no longer available")
    )
)]
pub async fn book_game(
    State(state): State<BookingAppState>,
    user: AuthenticatedUser,
    Path(game_id): Path<String>,
) -> ApiResult<CheckoutResponse> {
    let outcome = state.checkout.checkout_game(&user.user_id, &game_id).await?;
    Ok(Json(ApiResponse::success(outcome.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{booking_id}/retry",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    params(("booking_id" = String, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "New payment session opened", body = ApiResponse<CheckoutResponse>),
        (status = 403, description = "Booking belongs to another payer"),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Slot taken or booking not retryable")
    )
)]
pub async fn retry_booking(
    State(state): State<BookingAppState>,
    user: AuthenticatedUser,
    Path(booking_id): Path<String>,
) -> ApiResult<CheckoutResponse> {
    let outcome = state.retry.retry_payment(&user.user_id, &booking_id).await?;
    Ok(Json(ApiResponse::success(outcome.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings/verify",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    params(VerifyQuery),
    responses(
        (status = 200, description = "Booking after reconciling with the gateway", body = ApiResponse<BookingDto>),
        (status = 403, description = "Booking belongs to another payer"),
        (status = 404, description = "No booking for this session")
    )
)]
pub async fn verify_booking(
    State(state): State<BookingAppState>,
    user: AuthenticatedUser,
    Query(query): Query<VerifyQuery>,
) -> ApiResult<BookingDto> {
    let booking = state
        .reconciler
        .verify_payment(&user.user_id, &query.session_id)
        .await?;
    Ok(Json(ApiResponse::success(BookingDto::from(&booking))))
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's bookings, newest first", body = ApiResponse<Vec<BookingDto>>)
    )
)]
pub async fn list_bookings(
    State(state): State<BookingAppState>,
    user: AuthenticatedUser,
) -> ApiResult<Vec<BookingDto>> {
    let bookings = state.queries.list_for_payer(&user.user_id).await?;
    Ok(Json(ApiResponse::success(
        bookings.iter().map(BookingDto::from).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings/{booking_id}",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    params(("booking_id" = String, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking details", body = ApiResponse<BookingDto>),
        (status = 403, description = "Booking belongs to another payer"),
        (status = 404, description = "Booking not found")
    )
)]
pub async fn get_booking(
    State(state): State<BookingAppState>,
    user: AuthenticatedUser,
    Path(booking_id): Path<String>,
) -> ApiResult<BookingDto> {
    let booking = state.queries.get_for_payer(&user.user_id, &booking_id).await?;
    Ok(Json(ApiResponse::success(BookingDto::from(&booking))))
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings/{booking_id}/calendar-link",
    tag = "Bookings",
    security(("bearer_auth" = [])),
    params(("booking_id" = String, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Calendar event link", body = ApiResponse<CalendarLinkResponse>),
        (status = 404, description = "Booking not found")
    )
)]
pub async fn calendar_link(
    State(state): State<BookingAppState>,
    user: AuthenticatedUser,
    Path(booking_id): Path<String>,
) -> ApiResult<CalendarLinkResponse> {
    let url = state.queries.calendar_link(&user.user_id, &booking_id).await?;
    Ok(Json(ApiResponse::success(CalendarLinkResponse {
        url: url.to_string(),
    })))
}
