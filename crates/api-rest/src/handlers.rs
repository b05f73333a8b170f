//! Request handlers.
//!
//! Every handler other than health, login and donor registration needs an
//! `Authorization: Bearer <token>` header from `POST /api/auth/login`.

use crate::convert;
use crate::error::{rejection, ApiResult};
use crate::AppState;
use api_shared::{auth::bearer_token, wire, HealthService};
use axum::{
    extract::{Path as AxumPath, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
};
use chrono::Utc;
use futures::stream::{self, Stream};
use hemolink_core::{ColdChainError, Session, UnitSnapshot};
use std::convert::Infallible;
use tokio::sync::broadcast::error::RecvError;

fn session(state: &AppState, headers: &HeaderMap) -> ApiResult<Session> {
    let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let token = bearer_token(header).ok_or((StatusCode::UNAUTHORIZED, "Authentication required"))?;
    state
        .engine
        .session(token, Utc::now())
        .map_err(|e| rejection("Session lookup", e))
}

fn token(headers: &HeaderMap) -> ApiResult<&str> {
    let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    bearer_token(header).ok_or((StatusCode::UNAUTHORIZED, "Authentication required"))
}

#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Health check response", body = wire::HealthRes)
    )
)]
/// Health check endpoint for the REST API
#[axum::debug_handler]
pub(crate) async fn health(State(_state): State<AppState>) -> Json<wire::HealthRes> {
    Json(HealthService::check_health())
}

// Auth

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = wire::LoginReq,
    responses(
        (status = 200, description = "Session started", body = wire::LoginRes),
        (status = 401, description = "Invalid credentials")
    )
)]
/// Log in with a demo account and receive a bearer token.
#[axum::debug_handler]
pub(crate) async fn login(
    State(state): State<AppState>,
    Json(req): Json<wire::LoginReq>,
) -> ApiResult<Json<wire::LoginRes>> {
    match state.engine.login(&req.email, &req.password, Utc::now()) {
        Ok(session) => Ok(Json(wire::LoginRes {
            user: convert::user(&session),
            token: session.token().to_string(),
            expires_at: session.expires_at().to_rfc3339(),
        })),
        Err(ColdChainError::Unauthorised) => {
            tracing::warn!("Login failed for {}", req.email);
            Err((StatusCode::UNAUTHORIZED, "Invalid credentials"))
        }
        Err(e) => Err(rejection("Login", e)),
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 204, description = "Session ended"),
        (status = 401, description = "Authentication required")
    )
)]
#[axum::debug_handler]
pub(crate) async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<StatusCode> {
    let token = token(&headers)?;
    match state.engine.logout(token) {
        Ok(true) => Ok(StatusCode::NO_CONTENT),
        Ok(false) => Err((StatusCode::UNAUTHORIZED, "Authentication required")),
        Err(e) => Err(rejection("Logout", e)),
    }
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user and permissions", body = wire::UserRes),
        (status = 401, description = "Authentication required")
    )
)]
#[axum::debug_handler]
pub(crate) async fn me(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<wire::UserRes>> {
    let session = session(&state, &headers)?;
    Ok(Json(convert::user(&session)))
}

#[utoipa::path(
    post,
    path = "/api/auth/privacy",
    request_body = wire::PrivacyReq,
    responses(
        (status = 200, description = "Whether the key unlocked stock detail", body = wire::PrivacyRes),
        (status = 401, description = "Authentication required")
    )
)]
/// Unlock per-type hospital stock for this session.
///
/// A wrong key returns `unlocked: false` and leaves an earlier unlock in place.
#[axum::debug_handler]
pub(crate) async fn unlock_privacy(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<wire::PrivacyReq>,
) -> ApiResult<Json<wire::PrivacyRes>> {
    let token = token(&headers)?;
    match state.engine.unlock_privacy(token, &req.key, Utc::now()) {
        Ok(unlocked) => Ok(Json(wire::PrivacyRes { unlocked })),
        Err(e) => Err(rejection("Privacy unlock", e)),
    }
}

#[utoipa::path(
    delete,
    path = "/api/auth/privacy",
    responses(
        (status = 200, description = "Stock detail hidden again", body = wire::PrivacyRes),
        (status = 401, description = "Authentication required")
    )
)]
#[axum::debug_handler]
pub(crate) async fn lock_privacy(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<wire::PrivacyRes>> {
    let token = token(&headers)?;
    match state.engine.lock_privacy(token, Utc::now()) {
        Ok(()) => Ok(Json(wire::PrivacyRes { unlocked: false })),
        Err(e) => Err(rejection("Privacy lock", e)),
    }
}

// Inventory

#[utoipa::path(
    get,
    path = "/api/inventory",
    responses(
        (status = 200, description = "Units, earliest-expiring first", body = [wire::BloodUnitRes]),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Missing inventory permission")
    )
)]
/// List every unit in FIFO-by-expiry order.
///
/// Days to expiry, expiry class and temperature band are derived for today on each call.
#[axum::debug_handler]
pub(crate) async fn list_inventory(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<wire::BloodUnitRes>>> {
    let session = session(&state, &headers)?;
    match state
        .engine
        .list_inventory(&session, Utc::now().date_naive())
    {
        Ok(units) => Ok(Json(units.iter().map(convert::unit).collect())),
        Err(e) => Err(rejection("List inventory", e)),
    }
}

#[utoipa::path(
    post,
    path = "/api/inventory/{id}/transfer",
    request_body(content = wire::TransferUnitReq, description = "Optional destination"),
    params(("id" = String, Path, description = "Unit identifier")),
    responses(
        (status = 200, description = "Unit moved", body = wire::BloodUnitRes),
        (status = 404, description = "Unknown unit or destination"),
        (status = 409, description = "Unit is locked after a breach")
    )
)]
/// Move a single unit, by default to the home facility.
#[axum::debug_handler]
pub(crate) async fn transfer_unit(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    headers: HeaderMap,
    req: Option<Json<wire::TransferUnitReq>>,
) -> ApiResult<Json<wire::BloodUnitRes>> {
    let session = session(&state, &headers)?;
    let destination = req.and_then(|Json(r)| r.destination);
    match state
        .engine
        .transfer_unit(&session, &id, destination.as_deref())
    {
        Ok(unit) => Ok(Json(convert::unit(&UnitSnapshot::of(
            unit,
            Utc::now().date_naive(),
        )))),
        Err(e) => Err(rejection("Transfer unit", e)),
    }
}

#[utoipa::path(
    patch,
    path = "/api/inventory/{id}/temperature",
    request_body = wire::TemperatureReq,
    params(("id" = String, Path, description = "Unit identifier")),
    responses(
        (status = 200, description = "Reading recorded", body = wire::TemperatureRes),
        (status = 404, description = "Unknown unit"),
        (status = 422, description = "Invalid reading or unit already locked")
    )
)]
/// Record a temperature reading. `breached` is true when the reading locked the unit.
#[axum::debug_handler]
pub(crate) async fn update_temperature(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    headers: HeaderMap,
    Json(req): Json<wire::TemperatureReq>,
) -> ApiResult<Json<wire::TemperatureRes>> {
    let session = session(&state, &headers)?;
    let now = Utc::now();
    match state
        .engine
        .update_temperature(&session, &id, req.temperature, now)
    {
        Ok(update) => Ok(Json(convert::temperature(update, now.date_naive()))),
        Err(e) => Err(rejection("Update temperature", e)),
    }
}

// Hospitals and transfers

#[utoipa::path(
    get,
    path = "/api/hospitals",
    responses(
        (status = 200, description = "Hospitals; stock omitted unless unlocked", body = [wire::HospitalRes]),
        (status = 401, description = "Authentication required")
    )
)]
#[axum::debug_handler]
pub(crate) async fn list_hospitals(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<wire::HospitalRes>>> {
    let session = session(&state, &headers)?;
    match state.engine.list_hospitals(&session) {
        Ok(hospitals) => Ok(Json(hospitals.into_iter().map(convert::hospital).collect())),
        Err(e) => Err(rejection("List hospitals", e)),
    }
}

#[utoipa::path(
    post,
    path = "/api/transfers",
    request_body = wire::TransferReq,
    responses(
        (status = 201, description = "Transfer submitted", body = wire::TransferRes),
        (status = 400, description = "Bad request"),
        (status = 403, description = "Missing transfers permission"),
        (status = 409, description = "Insufficient eligible stock")
    )
)]
/// Request stock from a hospital. Counts and tracked units move at once.
#[axum::debug_handler]
pub(crate) async fn request_transfer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<wire::TransferReq>,
) -> ApiResult<(StatusCode, Json<wire::TransferRes>)> {
    let session = session(&state, &headers)?;
    let request = convert::transfer_request(&req).map_err(|e| rejection("Transfer request", e))?;
    match state.engine.request_transfer(
        &session,
        &request,
        req.destination.as_deref(),
        Utc::now(),
    ) {
        Ok(record) => Ok((StatusCode::CREATED, Json(convert::transfer(record)))),
        Err(e) => Err(rejection("Request transfer", e)),
    }
}

#[utoipa::path(
    get,
    path = "/api/transfers",
    responses(
        (status = 200, description = "Transfers in submission order", body = [wire::TransferRes]),
        (status = 403, description = "Missing transfers permission")
    )
)]
#[axum::debug_handler]
pub(crate) async fn list_transfers(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<wire::TransferRes>>> {
    let session = session(&state, &headers)?;
    match state.engine.list_transfers(&session) {
        Ok(records) => Ok(Json(records.into_iter().map(convert::transfer).collect())),
        Err(e) => Err(rejection("List transfers", e)),
    }
}

#[utoipa::path(
    post,
    path = "/api/transfers/{id}/accept",
    params(("id" = String, Path, description = "Transfer identifier")),
    responses(
        (status = 200, description = "Transfer accepted", body = wire::TransferRes),
        (status = 404, description = "Unknown transfer"),
        (status = 409, description = "Transfer is no longer submitted")
    )
)]
#[axum::debug_handler]
pub(crate) async fn accept_transfer(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    headers: HeaderMap,
) -> ApiResult<Json<wire::TransferRes>> {
    let session = session(&state, &headers)?;
    match state.engine.accept_transfer(&session, &id, Utc::now()) {
        Ok(record) => Ok(Json(convert::transfer(record))),
        Err(e) => Err(rejection("Accept transfer", e)),
    }
}

#[utoipa::path(
    post,
    path = "/api/transfers/{id}/reject",
    params(("id" = String, Path, description = "Transfer identifier")),
    responses(
        (status = 200, description = "Transfer rejected and stock returned", body = wire::TransferRes),
        (status = 404, description = "Unknown transfer"),
        (status = 409, description = "Transfer cannot be reversed")
    )
)]
#[axum::debug_handler]
pub(crate) async fn reject_transfer(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    headers: HeaderMap,
) -> ApiResult<Json<wire::TransferRes>> {
    let session = session(&state, &headers)?;
    match state.engine.reject_transfer(&session, &id, Utc::now()) {
        Ok(record) => Ok(Json(convert::transfer(record))),
        Err(e) => Err(rejection("Reject transfer", e)),
    }
}

// Dashboard

#[utoipa::path(
    get,
    path = "/api/dashboard/stats",
    responses(
        (status = 200, description = "Dashboard counters", body = wire::DashboardStatsRes),
        (status = 401, description = "Authentication required")
    )
)]
#[axum::debug_handler]
pub(crate) async fn dashboard_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<wire::DashboardStatsRes>> {
    let session = session(&state, &headers)?;
    match state
        .engine
        .dashboard_stats(&session, Utc::now().date_naive())
    {
        Ok(stats) => Ok(Json(convert::stats(stats))),
        Err(e) => Err(rejection("Dashboard stats", e)),
    }
}

// Donors

#[utoipa::path(
    post,
    path = "/api/donors/register",
    request_body = wire::DonorRegisterReq,
    responses(
        (status = 201, description = "Appointment booked", body = wire::DonorCardRes),
        (status = 400, description = "Bad request"),
        (status = 409, description = "Donor is not yet eligible")
    )
)]
/// Book a donation appointment. No login required.
#[axum::debug_handler]
pub(crate) async fn register_donor(
    State(state): State<AppState>,
    Json(req): Json<wire::DonorRegisterReq>,
) -> ApiResult<(StatusCode, Json<wire::DonorCardRes>)> {
    let registration = convert::registration(req).map_err(|e| rejection("Donor registration", e))?;
    match state
        .engine
        .register_donor(registration, Utc::now().date_naive())
    {
        Ok(card) => Ok((StatusCode::CREATED, Json(convert::donor_card(card)))),
        Err(e) => Err(rejection("Register donor", e)),
    }
}

#[utoipa::path(
    post,
    path = "/api/donors/{id}/donations",
    request_body(content = wire::DonationReq, description = "Donation date and facility"),
    params(("id" = String, Path, description = "Donor identifier")),
    responses(
        (status = 201, description = "Donation recorded and unit admitted", body = wire::DonationRes),
        (status = 400, description = "Donation date is in the future or too old"),
        (status = 404, description = "Unknown donor or facility"),
        (status = 409, description = "Donor is not yet eligible")
    )
)]
#[axum::debug_handler]
pub(crate) async fn record_donation(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    headers: HeaderMap,
    req: Option<Json<wire::DonationReq>>,
) -> ApiResult<(StatusCode, Json<wire::DonationRes>)> {
    let session = session(&state, &headers)?;
    let req = req.map(|Json(r)| r).unwrap_or_default();
    let today = Utc::now().date_naive();
    let date = match req.date.as_deref() {
        Some(d) => convert::date(d).map_err(|e| rejection("Record donation", e))?,
        None => today,
    };

    match state
        .engine
        .record_donation(&session, &id, date, req.facility.as_deref(), today)
    {
        Ok((donor, unit)) => Ok((
            StatusCode::CREATED,
            Json(wire::DonationRes {
                donor_id: donor.id,
                donations: donor.donations,
                last_donation: date.format("%Y-%m-%d").to_string(),
                unit: convert::unit(&UnitSnapshot::of(unit, today)),
            }),
        )),
        Err(e) => Err(rejection("Record donation", e)),
    }
}

#[utoipa::path(
    get,
    path = "/api/donors/appointments",
    responses(
        (status = 200, description = "Scheduled appointments", body = [wire::AppointmentRes]),
        (status = 403, description = "Missing appointments permission")
    )
)]
#[axum::debug_handler]
pub(crate) async fn appointments(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<wire::AppointmentRes>>> {
    let session = session(&state, &headers)?;
    match state.engine.appointments(&session) {
        Ok(list) => Ok(Json(
            list.iter()
                .map(|(a, d)| convert::appointment(a, d))
                .collect(),
        )),
        Err(e) => Err(rejection("List appointments", e)),
    }
}

// Events

#[utoipa::path(
    get,
    path = "/api/events",
    responses(
        (status = 200, description = "Server-sent stream of breach, low-stock and transfer events", body = String, content_type = "text/event-stream")
    )
)]
/// Stream engine events as server-sent events named after the event type.
pub(crate) async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.engine.subscribe();
    let stream = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let sse = Event::default()
                        .event(event.kind())
                        .json_data(&event)
                        .unwrap_or_else(|e| {
                            tracing::error!("Event serialisation error: {:?}", e);
                            Event::default().comment("unserialisable event")
                        });
                    return Some((Ok(sse), rx));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event stream subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
