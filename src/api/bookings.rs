//! Booking API handlers
//!
//! POST /api/bookings/check-availability  public pre-flight check
//! POST /api/bookings/book                reserve a room (pending, unpaid)
//! GET  /api/bookings/user                caller's bookings
//! GET  /api/bookings/hotel               owner dashboard
//! PUT  /api/bookings/:id/cancel          guest cancellation
//! PUT  /api/bookings/:id/status          hotel status change
//! PUT  /api/bookings/:id/fix-status      confirm one paid booking stuck in pending
//! POST /api/bookings/stripe-payment      start checkout
//! POST /api/bookings/cleanup-unpaid      run the stale-booking sweep now (owners)
//! POST /api/bookings/fix-all-paid        run the paid-pending repair now (owners)

use super::auth::CurrentUser;
use super::error::ApiError;
use super::extract::{ApiJson, ApiPath};
use super::state::AppState;
use crate::models::Booking;
use axum::extract::State;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRequest {
    pub room: Uuid,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub room: Uuid,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub guests: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub booking_id: Uuid,
}

type ApiResult = Result<Json<Value>, ApiError>;

async fn owned_booking(state: &AppState, user: &CurrentUser, id: Uuid) -> Result<Booking, ApiError> {
    let booking = state.bookings.get_booking(id).await?;
    if booking.user_id != user.id {
        return Err(ApiError::Forbidden("You can only manage your own bookings"));
    }
    Ok(booking)
}

async fn owns_hotel_of(state: &AppState, user: &CurrentUser, booking: &Booking) -> Result<bool, ApiError> {
    let hotel = state
        .hotels
        .find_hotel(booking.hotel_id)
        .await
        .map_err(|e| ApiError::Booking(e.into()))?;
    Ok(hotel.is_some_and(|hotel| hotel.owner_id == user.id))
}

async fn require_hotel_owner(state: &AppState, user: &CurrentUser) -> Result<(), ApiError> {
    let is_owner = state
        .users
        .find_user(&user.id)
        .await
        .map_err(|e| ApiError::Booking(e.into()))?
        .is_some_and(|u| u.is_hotel_owner());
    if !is_owner {
        return Err(ApiError::Forbidden("Only hotel owners can run maintenance jobs"));
    }
    Ok(())
}

pub async fn check_availability(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<AvailabilityRequest>,
) -> ApiResult {
    let is_available = state
        .bookings
        .check_availability(req.room, req.check_in_date, req.check_out_date)
        .await?;

    Ok(Json(json!({ "success": true, "isAvailable": is_available })))
}

pub async fn create_booking(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<BookingRequest>,
) -> ApiResult {
    let booking = state
        .bookings
        .create_booking(&user.id, req.room, req.check_in_date, req.check_out_date, req.guests)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Booking created successfully",
        "booking": booking,
    })))
}

pub async fn user_bookings(State(state): State<AppState>, user: CurrentUser) -> ApiResult {
    let bookings = state.bookings.get_user_bookings(&user.id).await?;
    Ok(Json(json!({ "success": true, "bookings": bookings })))
}

pub async fn hotel_bookings(State(state): State<AppState>, user: CurrentUser) -> ApiResult {
    let dashboard = state.bookings.get_hotel_bookings(&user.id).await?;
    Ok(Json(json!({ "success": true, "dashboardData": dashboard })))
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    body: Option<Json<CancelRequest>>,
) -> ApiResult {
    owned_booking(&state, &user, id).await?;

    let reason = body.and_then(|Json(req)| req.reason);
    let booking = state.bookings.cancel_booking(id, reason).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Booking cancelled successfully",
        "booking": booking,
    })))
}

pub async fn update_status(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> ApiResult {
    let booking = state.bookings.get_booking(id).await?;
    if !owns_hotel_of(&state, &user, &booking).await? {
        return Err(ApiError::Forbidden("Only the hotel owner can change booking status"));
    }

    let booking = state.bookings.update_status(id, &req.status).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Booking status updated to {}", booking.status),
        "booking": booking,
    })))
}

pub async fn stripe_payment(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<PaymentRequest>,
) -> ApiResult {
    owned_booking(&state, &user, req.booking_id).await?;

    let session = state.payments.create_payment_session(req.booking_id).await?;
    Ok(Json(json!({ "success": true, "url": session.url })))
}

pub async fn cleanup_unpaid(State(state): State<AppState>, user: CurrentUser) -> ApiResult {
    require_hotel_owner(&state, &user).await?;

    let threshold = state.sweeper.staleness_threshold();
    let count = state.sweeper.cancel_stale_unpaid(threshold).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Cancelled {} unpaid bookings", count),
        "count": count,
    })))
}

pub async fn fix_all_paid(State(state): State<AppState>, user: CurrentUser) -> ApiResult {
    require_hotel_owner(&state, &user).await?;

    let count = state.sweeper.repair_paid_pending().await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Confirmed {} paid bookings", count),
        "count": count,
    })))
}

pub async fn fix_status(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult {
    let booking = state.bookings.get_booking(id).await?;
    if booking.user_id != user.id && !owns_hotel_of(&state, &user, &booking).await? {
        return Err(ApiError::Forbidden("You can only manage your own bookings"));
    }

    let applied = state.bookings.fix_paid_status(id).await?;
    let message = if applied.changed() {
        "Booking status fixed"
    } else {
        "Booking does not need fixing"
    };

    Ok(Json(json!({
        "success": true,
        "message": message,
        "fixed": applied.changed(),
        "booking": applied.after,
    })))
}
