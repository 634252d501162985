//! REST boundary over a [`DepositSystem`].
//!
//! Requires the `http` feature. The calling client is identified by the
//! `x-client-id` header. Errors map to the status code of their
//! [`DepositError`] kind with `{ "error": message }` as body.
//!
//! | Route | Operation |
//! |---|---|
//! | `GET /health` | liveness |
//! | `POST /deposits` | request a deposit (202) |
//! | `GET /deposits` | active deposits |
//! | `GET /deposits/:id` | one deposit |
//! | `POST /deposits/:id/withdrawal` | early withdrawal (202) |
//! | `PUT /deposits/:id/auto-renewal` | toggle auto-renewal |
//! | `POST /cards` | request a card (202) |
//! | `GET /cards/:id`, `DELETE /cards/:id` | card info, removal |
//! | `GET /cards/:id/view` | card with account and product |
//! | `GET /cards/:id/number` | card number, any owner |
//! | `PUT /cards/:id/status`, `PUT /cards/:id/limit` | status, limit (by card number) |
//! | `PUT /cards/:id/pin` | request a new PIN (by card number, 202) |
//! | `GET /accounts` | accounts with their cards |
//! | `POST /accounts/:number/refill` | refill |
//! | `GET /products[/:id]`, `GET /card-products[/:id]` | catalogs |

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::domain::CardStatus;
use crate::error::DepositError;
use crate::events::{NewCardRequested, NewDepositRequested};
use crate::system::DepositSystem;

type AppState = Arc<DepositSystem>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WithdrawalBody {
    card_number: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AutoRenewalBody {
    auto_renewal: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardRequestBody {
    product_id: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusBody {
    status: CardStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LimitBody {
    limit: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PinBody {
    new_pin: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefillBody {
    sum: Decimal,
    details: Option<String>,
}

/// Build an axum `Router` serving the deposit API.
pub fn router(system: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/deposits", post(request_deposit).get(active_deposits))
        .route("/deposits/:id", get(deposit))
        .route("/deposits/:id/withdrawal", post(request_withdrawal))
        .route("/deposits/:id/auto-renewal", put(toggle_auto_renewal))
        .route("/cards", post(request_card))
        .route("/cards/:id", get(card_info).delete(delete_card))
        .route("/cards/:id/status", put(change_status))
        .route("/cards/:id/limit", put(change_limit))
        .route("/cards/:id/pin", put(change_pin_code))
        .route("/cards/:id/view", get(view_card))
        .route("/cards/:id/number", get(card_number))
        .route("/accounts", get(accounts))
        .route("/accounts/:number/refill", post(refill))
        .route("/products", get(products))
        .route("/products/:id", get(product))
        .route("/card-products", get(card_products))
        .route("/card-products/:id", get(card_product))
        .with_state(system)
}

/// Serve the API at `addr` (e.g. `"0.0.0.0:8080"`).
pub async fn serve(system: AppState, addr: &str) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(system)).await
}

fn respond<T: Serialize>(result: Result<T, DepositError>, ok: StatusCode) -> Response {
    match result {
        Ok(value) => (ok, Json(value)).into_response(),
        Err(err) => error_response(&err),
    }
}

fn error_response(err: &DepositError) -> Response {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

fn client_id(headers: &HeaderMap) -> Result<Uuid, Response> {
    headers
        .get("x-client-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "missing or invalid x-client-id header" })),
            )
                .into_response()
        })
}

async fn health() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn request_deposit(
    State(system): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<NewDepositRequested>,
) -> Response {
    let client_id = match client_id(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let result = system
        .deposits()
        .request_deposit(client_id, body)
        .map(|message_id| json!({ "messageId": message_id }));
    respond(result, StatusCode::ACCEPTED)
}

async fn active_deposits(State(system): State<AppState>, headers: HeaderMap) -> Response {
    match client_id(&headers) {
        Ok(client_id) => respond(system.deposit_service().active_deposits(client_id), StatusCode::OK),
        Err(response) => response,
    }
}

async fn deposit(State(system): State<AppState>, headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    match client_id(&headers) {
        Ok(client_id) => respond(system.deposit_service().deposit(client_id, id), StatusCode::OK),
        Err(response) => response,
    }
}

async fn request_withdrawal(
    State(system): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<WithdrawalBody>,
) -> Response {
    let client_id = match client_id(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    if let Err(err) = system.ledger().client_card_by_number(client_id, &body.card_number) {
        return error_response(&err);
    }
    respond(
        system.withdrawals().request_withdrawal(id, &body.card_number),
        StatusCode::ACCEPTED,
    )
}

async fn toggle_auto_renewal(
    State(system): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<AutoRenewalBody>,
) -> Response {
    match client_id(&headers) {
        Ok(client_id) => respond(
            system.auto_renewal().toggle(client_id, id, body.auto_renewal),
            StatusCode::OK,
        ),
        Err(response) => response,
    }
}

async fn request_card(
    State(system): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CardRequestBody>,
) -> Response {
    let client_id = match client_id(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let result = system
        .card_issuance()
        .request_card(NewCardRequested {
            client_id,
            product_id: body.product_id,
        })
        .map(|message_id| json!({ "messageId": message_id }));
    respond(result, StatusCode::ACCEPTED)
}

async fn card_info(State(system): State<AppState>, headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    match client_id(&headers) {
        Ok(client_id) => respond(system.cards().card_info(client_id, id), StatusCode::OK),
        Err(response) => response,
    }
}

async fn delete_card(State(system): State<AppState>, headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    match client_id(&headers) {
        Ok(client_id) => match system.cards().delete_card(client_id, id) {
            Ok(()) => StatusCode::NO_CONTENT.into_response(),
            Err(err) => error_response(&err),
        },
        Err(response) => response,
    }
}

async fn change_status(
    State(system): State<AppState>,
    headers: HeaderMap,
    Path(number): Path<String>,
    Json(body): Json<StatusBody>,
) -> Response {
    match client_id(&headers) {
        Ok(client_id) => respond(
            system.card_status().change_status(client_id, &number, body.status),
            StatusCode::OK,
        ),
        Err(response) => response,
    }
}

async fn change_limit(
    State(system): State<AppState>,
    headers: HeaderMap,
    Path(number): Path<String>,
    Json(body): Json<LimitBody>,
) -> Response {
    match client_id(&headers) {
        Ok(client_id) => respond(
            system.cards().change_limit(client_id, &number, body.limit),
            StatusCode::OK,
        ),
        Err(response) => response,
    }
}

async fn change_pin_code(
    State(system): State<AppState>,
    headers: HeaderMap,
    Path(number): Path<String>,
    Json(body): Json<PinBody>,
) -> Response {
    match client_id(&headers) {
        Ok(client_id) => match system.cards().change_pin_code(client_id, &number, &body.new_pin) {
            Ok(()) => StatusCode::ACCEPTED.into_response(),
            Err(err) => error_response(&err),
        },
        Err(response) => response,
    }
}

async fn view_card(State(system): State<AppState>, headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    match client_id(&headers) {
        Ok(client_id) => respond(system.accounts().view_card(client_id, id), StatusCode::OK),
        Err(response) => response,
    }
}

async fn card_number(State(system): State<AppState>, Path(id): Path<Uuid>) -> Response {
    let result = system
        .cards()
        .card_number(id)
        .map(|number| json!({ "cardNumber": number }));
    respond(result, StatusCode::OK)
}

async fn accounts(State(system): State<AppState>, headers: HeaderMap) -> Response {
    match client_id(&headers) {
        Ok(client_id) => respond(system.accounts().accounts_with_cards(client_id), StatusCode::OK),
        Err(response) => response,
    }
}

async fn refill(
    State(system): State<AppState>,
    headers: HeaderMap,
    Path(number): Path<String>,
    Json(body): Json<RefillBody>,
) -> Response {
    match client_id(&headers) {
        Ok(client_id) => respond(
            system
                .deposit_service()
                .refill(client_id, &number, body.sum, body.details),
            StatusCode::OK,
        ),
        Err(response) => response,
    }
}

async fn products(State(system): State<AppState>) -> Response {
    respond(system.catalog().active_products(), StatusCode::OK)
}

async fn product(State(system): State<AppState>, Path(id): Path<u32>) -> Response {
    respond(system.catalog().product(id), StatusCode::OK)
}

async fn card_products(State(system): State<AppState>) -> Response {
    respond(system.catalog().active_card_products(), StatusCode::OK)
}

async fn card_product(State(system): State<AppState>, Path(id): Path<u32>) -> Response {
    respond(system.catalog().card_product(id), StatusCode::OK)
}
