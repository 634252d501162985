//! HTTP boundary tests.
//!
//! Starts the axum router on an ephemeral port and drives it with reqwest.
//! Saga replies are applied between calls with `run_until_idle`.

use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use deposit_service::domain::{Account, CardProduct, CurrencyCode, PaymentSystem, Product};
use deposit_service::{http, DepositConfig, DepositSystem, FixedClock};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use uuid::Uuid;

const ACCOUNT_NUMBER: &str = "40817810000000000077";

fn system() -> (Arc<DepositSystem>, Uuid) {
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 5, 20, 12, 0, 0).unwrap());
    let system = DepositSystem::simulated(DepositConfig::default(), Arc::new(clock), Some(11));
    let ledger = system.ledger();
    ledger
        .add_product(&Product {
            id: 1,
            name: "Flexible".into(),
            currency_code: CurrencyCode::RUB,
            interest_rate_early: Some(Decimal::new(101, 2)),
            is_capitalization: false,
            is_revocable: true,
            is_active: true,
            amount_min: Decimal::from(100),
            amount_max: Decimal::from(500_000),
            min_interest_rate: Decimal::ONE,
            max_interest_rate: Decimal::from(10),
            min_duration_months: 3,
            max_duration_months: 24,
        })
        .unwrap();
    ledger
        .add_card_product(&CardProduct {
            id: 1,
            card_name: "Classic".into(),
            payment_system: PaymentSystem::Visa,
            currency_code: CurrencyCode::RUB,
            cashback: None,
            is_virtual: false,
            service_price: Decimal::ZERO,
            product_price: Decimal::ZERO,
            card_duration_months: Some(60),
            is_active: true,
        })
        .unwrap();

    let client_id = Uuid::new_v4();
    ledger
        .open_account(Account::open(
            ACCOUNT_NUMBER,
            client_id,
            CurrencyCode::RUB,
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        ))
        .unwrap();
    (Arc::new(system), client_id)
}

async fn start_server(system: Arc<DepositSystem>) -> String {
    let app = http::router(system);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn health_check() {
    let (system, _) = system();
    let base = start_server(system).await;

    let resp = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn missing_client_header_is_unauthorized() {
    let (system, _) = system();
    let base = start_server(system).await;

    let resp = reqwest::get(format!("{base}/deposits")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn card_then_deposit_then_withdrawal() {
    let (system, client_id) = system();
    let base = start_server(system.clone()).await;
    let client = reqwest::Client::new();
    let client_header = client_id.to_string();

    let resp = client
        .post(format!("{base}/cards"))
        .header("x-client-id", &client_header)
        .json(&json!({ "productId": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    system.run_until_idle().unwrap();

    let accounts: Value = client
        .get(format!("{base}/accounts"))
        .header("x-client-id", &client_header)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let card_number = accounts[0]["cards"][0]["cardNumber"]
        .as_str()
        .unwrap()
        .to_string();

    let resp = client
        .post(format!("{base}/deposits"))
        .header("x-client-id", &client_header)
        .json(&json!({
            "productId": 1,
            "initialAmount": "5000",
            "cardNumber": card_number,
            "autoRenewal": false,
            "interestRate": "6.5",
            "durationMonths": 6
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    system.run_until_idle().unwrap();

    let deposits: Value = client
        .get(format!("{base}/deposits"))
        .header("x-client-id", &client_header)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let agreement_id = deposits[0]["id"].as_str().unwrap().to_string();

    let resp = client
        .post(format!("{base}/deposits/{agreement_id}/withdrawal"))
        .header("x-client-id", &client_header)
        .json(&json!({ "cardNumber": card_number }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let withdrawal: Value = resp.json().await.unwrap();
    assert_eq!(withdrawal["status"], "PENDING");

    let again = client
        .post(format!("{base}/deposits/{agreement_id}/withdrawal"))
        .header("x-client-id", &client_header)
        .json(&json!({ "cardNumber": card_number }))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::UNPROCESSABLE_ENTITY);

    system.run_until_idle().unwrap();
    let card = system.ledger().card_by_number(&card_number).unwrap();
    assert_eq!(card.balance, Decimal::from(10_050));
}

#[tokio::test]
async fn repeated_status_is_a_client_error() {
    let (system, client_id) = system();
    let base = start_server(system.clone()).await;
    let client = reqwest::Client::new();

    system
        .card_issuance()
        .request_card(deposit_service::events::NewCardRequested {
            client_id,
            product_id: 1,
        })
        .unwrap();
    system.run_until_idle().unwrap();
    let card_number = system.cards().client_cards(client_id).unwrap()[0]
        .card_number
        .clone();

    let url = format!("{base}/cards/{card_number}/status");
    let first = client
        .put(&url)
        .header("x-client-id", client_id.to_string())
        .json(&json!({ "status": "BLOCKED" }))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = client
        .put(&url)
        .header("x-client-id", client_id.to_string())
        .json(&json!({ "status": "BLOCKED" }))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    let body: Value = second.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("BLOCKED"));
}

#[tokio::test]
async fn unknown_product_is_not_found() {
    let (system, _) = system();
    let base = start_server(system).await;

    let resp = reqwest::get(format!("{base}/products/99")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn pin_change_view_and_number_of_a_card() {
    use deposit_service::outbox::OutboxStoreExt;

    let (system, client_id) = system();
    let base = start_server(system.clone()).await;
    let client = reqwest::Client::new();

    system
        .card_issuance()
        .request_card(deposit_service::events::NewCardRequested {
            client_id,
            product_id: 1,
        })
        .unwrap();
    system.run_until_idle().unwrap();
    let card = system.cards().client_cards(client_id).unwrap()[0].clone();

    let resp = client
        .put(format!("{base}/cards/{}/pin", card.card_number))
        .header("x-client-id", client_id.to_string())
        .json(&json!({ "newPin": "2468" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let foreign = client
        .put(format!("{base}/cards/{}/pin", card.card_number))
        .header("x-client-id", Uuid::new_v4().to_string())
        .json(&json!({ "newPin": "2468" }))
        .send()
        .await
        .unwrap();
    assert_eq!(foreign.status(), StatusCode::NOT_FOUND);

    system.run_until_idle().unwrap();
    let pin_messages: Vec<_> = system
        .ledger()
        .store()
        .outbox_messages()
        .unwrap()
        .into_iter()
        .filter(|m| m.event_type == "PinCodeChangeRequested")
        .collect();
    assert_eq!(pin_messages.len(), 1);
    assert!(pin_messages[0].is_published());

    let view: Value = client
        .get(format!("{base}/cards/{}/view", card.id))
        .header("x-client-id", client_id.to_string())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view["cardName"], "Classic");
    assert_eq!(view["accountNumber"], ACCOUNT_NUMBER);

    let number: Value = reqwest::get(format!("{base}/cards/{}/number", card.id))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(number["cardNumber"], card.card_number.as_str());
}
