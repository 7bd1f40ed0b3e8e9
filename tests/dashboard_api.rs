//! End-to-end tests of the dashboard router over an in-memory store.

#![allow(clippy::panic, clippy::indexing_slicing)]

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use tenant_analytics::api;
use tenant_analytics::app_state::AppState;
use tenant_analytics::cache::NoopCache;
use tenant_analytics::domain::records::{Booking, Car, Company};
use tenant_analytics::domain::{BookingId, BookingStatus, CarId, CompanyId, TenantId};
use tenant_analytics::persistence::MemoryStore;
use tenant_analytics::service::{DashboardService, DashboardSettings};

const LAST_YEAR_QUERY: &str = "year=2025&start_year=2025&end_year=2025";

fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
    let Some(t) = NaiveDate::from_ymd_opt(y, m, d).and_then(|d| d.and_hms_opt(15, 30, 0)) else {
        panic!("invalid fixture date");
    };
    t
}

fn car(id: i64, company: i64, plate: &str) -> Car {
    Car {
        id: CarId::new(id),
        company_id: CompanyId::new(company),
        plate_number: plate.to_string(),
        brand: "Nissan".to_string(),
        model: "Urvan".to_string(),
        availability_status: "available".to_string(),
        vehicle_class: Some("Van".to_string()),
    }
}

/// A 2024 booking of car 30 that ended on `end` and, unless still out,
/// came back the same moment.
fn booking_2024(id: i64, status: BookingStatus, end: NaiveDateTime, amount: Decimal) -> Booking {
    Booking {
        id: BookingId::new(id),
        car_id: CarId::new(30),
        company_id: CompanyId::new(3),
        borrower_name: format!("Borrower {id}"),
        destination: None,
        start: end - chrono::Duration::days(4),
        end: Some(end),
        expected_return: Some(end),
        actual_return: (status != BookingStatus::Ongoing).then_some(end),
        status,
        total_amount: amount,
    }
}

fn store() -> MemoryStore {
    let returned = at(2025, 4, 12);
    MemoryStore::new()
        .with_company(Company {
            id: CompanyId::new(1),
            owner: TenantId::new(1),
            name: "Island Wheels".to_string(),
            currency: Some("PHP".to_string()),
        })
        .with_company(Company {
            id: CompanyId::new(2),
            owner: TenantId::new(2),
            name: "Metro Drive".to_string(),
            currency: Some("USD".to_string()),
        })
        .with_company(Company {
            id: CompanyId::new(3),
            owner: TenantId::new(3),
            name: "Cebu Car Hire".to_string(),
            currency: Some("PHP".to_string()),
        })
        .with_car(car(20, 2, "USA 2020"))
        .with_car(car(30, 3, "CEB 3030"))
        .with_booking(booking_2024(30, BookingStatus::Completed, at(2024, 3, 10), dec!(85000)))
        .with_booking(booking_2024(31, BookingStatus::Ongoing, at(2024, 8, 20), dec!(42000)))
        .with_booking(booking_2024(32, BookingStatus::Cancelled, at(2024, 5, 1), dec!(31000)))
        .with_car(Car {
            id: CarId::new(10),
            company_id: CompanyId::new(1),
            plate_number: "NAB 1234".to_string(),
            brand: "Toyota".to_string(),
            model: "Innova".to_string(),
            availability_status: "available".to_string(),
            vehicle_class: Some("MPV".to_string()),
        })
        .with_booking(Booking {
            id: BookingId::new(1),
            car_id: CarId::new(10),
            company_id: CompanyId::new(1),
            borrower_name: "Juan dela Cruz".to_string(),
            destination: Some("Baguio".to_string()),
            start: returned - chrono::Duration::days(3),
            end: Some(returned),
            expected_return: Some(returned),
            actual_return: Some(returned),
            status: BookingStatus::Completed,
            total_amount: dec!(18500),
        })
}

fn app() -> Router {
    let service = DashboardService::new(
        Arc::new(store()),
        Arc::new(NoopCache::default()),
        DashboardSettings::default(),
    );
    api::build_router().with_state(AppState::new(service))
}

async fn get(uri: &str, tenant: Option<&str>) -> (StatusCode, Value) {
    let Ok(server) = TestServer::new(app()) else {
        panic!("test server failed to start");
    };
    let mut request = server.get(uri);
    if let Some(tenant) = tenant {
        request = request.add_header("x-tenant-id", tenant);
    }
    let response = request.await;
    (response.status_code(), response.json::<Value>())
}

#[tokio::test]
async fn summary_reports_owned_revenue() {
    let (status, body) = get(
        &format!("/api/v1/dashboard/summary?{LAST_YEAR_QUERY}"),
        Some("1"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totals"]["annualRevenue"], 18_500.0);
    assert_eq!(body["totals"]["bookingsYtd"], 1);
    assert_eq!(body["meta"]["currency"], "PHP");
    assert_eq!(body["period"]["year"], 2025);
}

#[tokio::test]
async fn missing_tenant_is_unauthorized() {
    let (status, body) = get("/api/v1/dashboard/summary", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 1001);
}

#[tokio::test]
async fn foreign_company_is_forbidden() {
    let (status, body) = get("/api/v1/dashboard/summary?company_id=2", Some("1")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "not allowed to access the requested company");
}

#[tokio::test]
async fn foreign_car_is_forbidden() {
    let (status, body) = get("/api/v1/dashboard/summary?car_id=20", Some("1")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 2001);
}

#[tokio::test]
async fn full_year_custom_range_counts_live_bookings_only() {
    let (status, body) = get(
        "/api/v1/dashboard/summary?year=2024&preset=custom&start_date=2024-01-01&end_date=2024-12-31",
        Some("3"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totals"]["annualRevenue"], 127_000.0);
    assert_eq!(body["totals"]["bookingsYtd"], 2);
    assert_eq!(body["totals"]["averageBookingValue"], 63_500.0);
}

#[tokio::test]
async fn tenant_without_companies_gets_zeros() {
    let (status, body) = get("/api/v1/dashboard/summary", Some("77")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totals"]["annualRevenue"], 0.0);
    assert_eq!(body["totals"]["bookingsYtd"], 0);
    assert_eq!(body["totals"]["averageBookingValue"], 0.0);
    assert_eq!(
        body["period"]["year"],
        Utc::now().with_timezone(&chrono_tz::Asia::Manila).year()
    );
}

#[tokio::test]
async fn malformed_filters_fall_back_to_defaults() {
    let (status, body) = get(
        "/api/v1/dashboard/summary?year=abc&preset=weekly&status=bogus&date_field=nope",
        Some("1"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["period"]["preset"], "year_to_date");
    assert_eq!(body["meta"]["dateField"], "actual_return");
    assert_eq!(
        body["meta"]["statuses"],
        serde_json::json!(["Reserved", "Ongoing", "Completed"])
    );
}

#[tokio::test]
async fn monthly_sales_places_booking_in_its_return_month() {
    let (status, body) = get(
        &format!("/api/v1/dashboard/monthly-sales?{LAST_YEAR_QUERY}"),
        Some("1"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let Some(series) = body["series"].as_array() else {
        panic!("series missing");
    };
    assert_eq!(series.len(), 12);
    assert_eq!(series[3]["month"], "2025-04-01");
    assert_eq!(series[3]["actual_return"], 18_500.0);
    assert_eq!(series[3]["completed_bookings"], 1);
    assert_eq!(series[0]["actual_return"], 0.0);
}

#[tokio::test]
async fn top_vehicles_lists_booked_car() {
    let (status, body) = get(
        &format!("/api/v1/dashboard/top-vehicles?{LAST_YEAR_QUERY}"),
        Some("1"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["vehicles"][0]["plate_number"], "NAB 1234");
    assert_eq!(body["vehicles"][0]["label"], "Toyota Innova");
}

#[tokio::test]
async fn presets_catalog_flags_defaults() {
    let (status, body) = get("/config/presets", None).await;
    assert_eq!(status, StatusCode::OK);
    let Some(presets) = body["presets"].as_array() else {
        panic!("presets missing");
    };
    let defaults: Vec<&Value> = presets
        .iter()
        .filter(|p| p["default"] == true)
        .map(|p| &p["value"])
        .collect();
    assert_eq!(defaults, vec!["year_to_date"]);
}
