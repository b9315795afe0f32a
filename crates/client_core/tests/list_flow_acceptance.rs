use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch},
    Json, Router,
};
use client_core::{
    BookingList, FilterKey, FilterValue, HttpMarketplaceClient, ListStatus,
    MutationOutcome, PageSize, ResourceKind, SessionProvider, StaticSession, WishlistList,
};
use serde_json::{json, Value};
use shared::domain::{BookingId, BookingStatus, UserId, WishlistItemId};
use tokio::{net::TcpListener, sync::Mutex};

const TOKEN: &str = "acceptance-token";

#[derive(Default)]
struct Backend {
    bookings: Vec<Value>,
    wishlist: Vec<Value>,
    cancel_calls: usize,
    delete_calls: usize,
}

type Shared = Arc<Mutex<Backend>>;

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        == Some(format!("Bearer {TOKEN}").as_str())
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Not authorized" })),
    )
        .into_response()
}

fn paginate(items: Vec<Value>, params: &HashMap<String, String>, key: &str) -> Json<Value> {
    let page: usize = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let limit: usize = params.get("limit").and_then(|l| l.parse().ok()).unwrap_or(10);
    let total = items.len();
    let slice: Vec<Value> = items
        .into_iter()
        .skip((page - 1) * limit)
        .take(limit)
        .collect();
    Json(json!({ key: slice, "total": total }))
}

async fn list_bookings(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let backend = backend.lock().await;
    let items = backend
        .bookings
        .iter()
        .filter(|booking| match params.get("status") {
            Some(status) => booking["status"] == status.as_str(),
            None => true,
        })
        .cloned()
        .collect();
    paginate(items, &params, "bookings").into_response()
}

async fn cancel_booking(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut backend = backend.lock().await;
    backend.cancel_calls += 1;
    let Some(booking) = backend.bookings.iter_mut().find(|b| b["_id"] == id.as_str()) else {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "Booking not found" }))).into_response();
    };
    booking["status"] = json!("cancelled");
    Json(json!({ "status": "success" })).into_response()
}

async fn list_wishlist(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let items = backend.lock().await.wishlist.clone();
    paginate(items, &params, "wishlistItems").into_response()
}

async fn remove_wishlist(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Path(service_id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut backend = backend.lock().await;
    backend.delete_calls += 1;
    backend
        .wishlist
        .retain(|item| item["serviceId"]["_id"] != service_id.as_str());
    StatusCode::NO_CONTENT.into_response()
}

fn booking(index: usize, status: BookingStatus) -> Value {
    json!({
        "_id": format!("b-{index}"),
        "serviceId": { "_id": format!("s-{index}"), "title": "In-home elder care" },
        "providerId": { "_id": "p-1", "firstName": "Marta", "lastName": "Lopes" },
        "dateTime": "2026-05-02T10:00:00Z",
        "duration": 60,
        "totalPrice": 35.0,
        "status": status.as_str()
    })
}

async fn spawn_backend(backend: Backend) -> (String, Shared) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let shared: Shared = Arc::new(Mutex::new(backend));
    let app = Router::new()
        .route("/api/bookings/user", get(list_bookings))
        .route("/api/bookings/:id/cancel", patch(cancel_booking))
        .route("/api/wishlist", get(list_wishlist))
        .route("/api/wishlist/:service_id", delete(remove_wishlist))
        .with_state(shared.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    (format!("http://{addr}/api"), shared)
}

fn session() -> Arc<dyn SessionProvider> {
    Arc::new(StaticSession::signed_in(UserId::new("u-7"), TOKEN))
}

#[tokio::test]
async fn bookings_filter_cancel_and_refresh_acceptance() {
    let statuses = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Completed,
    ];
    let backend = Backend {
        bookings: (1..=12).map(|i| booking(i, statuses[i % 3])).collect(),
        ..Backend::default()
    };
    let (base_url, shared) = spawn_backend(backend).await;
    let api = Arc::new(HttpMarketplaceClient::new(&base_url, session()).expect("client"));
    let bookings = BookingList::new(ResourceKind::Bookings, api.clone(), PageSize::DEFAULT);

    bookings
        .mount(session().as_ref(), "/auth/login")
        .await
        .expect("mount");
    let snapshot = bookings.snapshot().await;
    assert_eq!(snapshot.status, ListStatus::Loaded);
    assert_eq!(snapshot.total_count, 12);
    assert_eq!(snapshot.total_pages, 2);

    bookings.set_page(2).await;
    bookings
        .set_filter(FilterKey::Status, Some(FilterValue::from(BookingStatus::Confirmed)))
        .await;
    let snapshot = bookings.snapshot().await;
    assert_eq!(snapshot.query.page, 1);
    assert_eq!(snapshot.total_count, 4);
    assert!(snapshot
        .items
        .iter()
        .all(|b| b.status == BookingStatus::Confirmed));

    let target = snapshot.items[0].id.clone();
    let outcome = bookings.cancel_booking(api.as_ref(), target.clone()).await;
    assert_eq!(outcome, MutationOutcome::Completed);
    let snapshot = bookings.snapshot().await;
    assert_eq!(snapshot.total_count, 3);
    assert!(snapshot.items.iter().all(|b| b.id != target));
    assert_eq!(shared.lock().await.cancel_calls, 1);

    bookings
        .set_filter(FilterKey::Status, Some(FilterValue::from(BookingStatus::Completed)))
        .await;
    let completed = bookings.snapshot().await.items[0].id.clone();
    let outcome = bookings.cancel_booking(api.as_ref(), completed.clone()).await;
    assert_eq!(
        outcome,
        MutationOutcome::Failed("action not allowed: completed bookings cannot be cancelled".into())
    );
    assert!(bookings.mutation_error(&completed).await.is_some());
    assert_eq!(bookings.status().await, ListStatus::Loaded);
    assert_eq!(shared.lock().await.cancel_calls, 1);

    let outcome = bookings
        .cancel_booking(api.as_ref(), BookingId::new("b-999"))
        .await;
    assert_eq!(outcome, MutationOutcome::UnknownItem);
}

#[tokio::test]
async fn wishlist_removal_acceptance() {
    let backend = Backend {
        wishlist: vec![
            json!({ "_id": "w-1", "serviceId": { "_id": "s-1", "title": "Meal preparation" } }),
            json!({ "_id": "w-2", "serviceId": null }),
            json!({ "_id": "w-3", "serviceId": { "_id": "s-3", "title": "Medication reminders" } }),
        ],
        ..Backend::default()
    };
    let (base_url, shared) = spawn_backend(backend).await;
    let api = Arc::new(HttpMarketplaceClient::new(&base_url, session()).expect("client"));
    let wishlist = WishlistList::from_location(
        ResourceKind::Wishlist,
        api.clone(),
        PageSize::DEFAULT,
        "?status=pending",
    );

    wishlist
        .mount(session().as_ref(), "/auth/login")
        .await
        .expect("mount");
    assert_eq!(wishlist.snapshot().await.items.len(), 3);

    let orphan = wishlist
        .remove_from_wishlist(api.as_ref(), WishlistItemId::new("w-2"))
        .await;
    assert!(matches!(orphan, MutationOutcome::Failed(_)));
    assert_eq!(shared.lock().await.delete_calls, 0);

    let outcome = wishlist
        .remove_from_wishlist(api.as_ref(), WishlistItemId::new("w-1"))
        .await;
    assert_eq!(outcome, MutationOutcome::Completed);
    let snapshot = wishlist.snapshot().await;
    assert_eq!(snapshot.total_count, 2);
    assert_eq!(snapshot.summary(), "Showing 2 of 2 saved services");
    assert_eq!(shared.lock().await.delete_calls, 1);
}

#[tokio::test]
async fn expired_token_surfaces_as_list_error() {
    let (base_url, _shared) = spawn_backend(Backend::default()).await;
    let stale: Arc<dyn SessionProvider> =
        Arc::new(StaticSession::signed_in(UserId::new("u-7"), "expired"));
    let api = Arc::new(HttpMarketplaceClient::new(&base_url, stale.clone()).expect("client"));
    let bookings = BookingList::new(ResourceKind::Bookings, api, PageSize::DEFAULT);

    bookings
        .mount(stale.as_ref(), "/auth/login")
        .await
        .expect("session present");

    assert_eq!(
        bookings.status().await,
        ListStatus::Error("Not authorized".to_string())
    );
    assert!(bookings.snapshot().await.items.is_empty());
}
