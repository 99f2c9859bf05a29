// ============================================================================
// HTTP API
// ============================================================================
//
// Thin actix-web layer: decode JSON / path / query, call the order core,
// wrap the result in `{"data": ...}` or map the error to a status code.
//
// Routes (under /e_commerce/api/v1):
//   POST   /order        place
//   GET    /order        list (customer_id, offset, limit)
//   GET    /order/{id}   get
//   PUT    /order/{id}   update header
//   DELETE /order/{id}   delete
//
// Plus /ping, /health and /metrics at the root.
//
// ============================================================================

mod dto;
mod error;
mod handlers;

pub use error::ApiError;

use actix::Addr;
use actix_web::{web, HttpRequest};
use prometheus::Registry;

use crate::actors::HealthMonitorActor;
use crate::domain::order::{OrderCommandHandler, OrderQueryService};
use crate::metrics::metrics_handler;

pub const BASE_PATH: &str = "/e_commerce/api/v1";

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub commands: OrderCommandHandler,
    pub queries: OrderQueryService,
    pub health: Addr<HealthMonitorActor>,
}

fn bad_request(reason: String, req: &HttpRequest) -> actix_web::Error {
    tracing::debug!(path = %req.path(), reason = %reason, "Rejected malformed request");
    ApiError::BadRequest(reason).into()
}

/// Extractor settings so that undecodable input is reported as 400 with
/// the regular error body.
fn extractor_config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default().error_handler(|err, req| bad_request(err.to_string(), req)),
    )
    .app_data(
        web::PathConfig::default().error_handler(|err, req| bad_request(err.to_string(), req)),
    )
    .app_data(
        web::QueryConfig::default().error_handler(|err, req| bad_request(err.to_string(), req)),
    );
}

/// Register every route. `registry` is served on /metrics.
pub fn configure(state: AppState, registry: Registry) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        extractor_config(cfg);
        cfg.app_data(web::Data::new(state))
            .app_data(web::Data::new(registry))
            .route("/ping", web::get().to(handlers::ping))
            .route("/health", web::get().to(handlers::health))
            .route("/metrics", web::get().to(metrics_handler))
            .service(
                web::scope(BASE_PATH).service(
                    web::scope("/order")
                        .route("", web::post().to(handlers::create_order))
                        .route("", web::get().to(handlers::list_orders))
                        .route("/{id}", web::get().to(handlers::get_order))
                        .route("/{id}", web::put().to(handlers::update_order))
                        .route("/{id}", web::delete().to(handlers::delete_order)),
                ),
            );
    }
}

// ============================================================================
// Handler Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{CommandSettings, PageLimits};
    use crate::metrics::Metrics;
    use crate::store::memory::MemoryStore;
    use crate::store::OrderStore;
    use actix::Actor;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use uuid::Uuid;

    fn state(store: &MemoryStore) -> (AppState, Registry) {
        let metrics = Arc::new(Metrics::new().unwrap());
        let shared: Arc<dyn OrderStore> = Arc::new(store.clone());
        let health =
            HealthMonitorActor::new(shared.clone(), metrics.clone(), Duration::from_secs(60)).start();
        let registry = metrics.registry().clone();
        let state = AppState {
            commands: OrderCommandHandler::new(shared.clone(), metrics.clone(), CommandSettings::default()),
            queries: OrderQueryService::new(
                shared,
                metrics,
                PageLimits::default(),
                Duration::from_secs(5),
            ),
            health,
        };
        (state, registry)
    }

    fn create_body(customer: Uuid, items: Value) -> Value {
        json!({
            "order": {
                "customer_id": customer,
                "address_name": "Sergeli 7",
                "longitude": 69.2,
                "latitude": 41.2,
                "delivery_status": "courier",
                "delivery_cost": "12.50",
                "payment_method": "card",
                "payment_status": "unpaid"
            },
            "items": items
        })
    }

    #[actix_web::test]
    async fn test_order_lifecycle_over_http() {
        let store = MemoryStore::new();
        let product = store.add_product(Decimal::new(1000, 2)).await;
        let color = store.add_variant(product, 5).await;
        let (state, registry) = state(&store);
        let app = test::init_service(App::new().configure(configure(state, registry))).await;

        let customer = Uuid::new_v4();
        let req = test::TestRequest::post()
            .uri("/e_commerce/api/v1/order")
            .set_json(create_body(
                customer,
                json!([{"product_id": product, "color_id": color, "quantity": 2}]),
            ))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        let order_id = created["data"]["id"].as_str().unwrap().to_string();
        assert_eq!(created["data"]["total_price"], json!("20.00"));
        assert_eq!(created["data"]["order_items"].as_array().unwrap().len(), 1);

        let req = test::TestRequest::get()
            .uri(&format!("/e_commerce/api/v1/order/{order_id}"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri(&format!("/e_commerce/api/v1/order?customer_id={customer}&limit=5"))
            .to_request();
        let listed: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(listed["data"]["count"], json!(1));

        let req = test::TestRequest::put()
            .uri(&format!("/e_commerce/api/v1/order/{order_id}"))
            .set_json(json!({
                "address_name": "Sergeli 8",
                "longitude": 69.2,
                "latitude": 41.2,
                "total_price": "20.00",
                "status": "confirmed",
                "delivery_status": "courier",
                "delivery_cost": "12.50",
                "payment_method": "card",
                "payment_status": "paid"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);

        let req = test::TestRequest::delete()
            .uri(&format!("/e_commerce/api/v1/order/{order_id}"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let req = test::TestRequest::get()
            .uri(&format!("/e_commerce/api/v1/order/{order_id}"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_insufficient_stock_is_conflict() {
        let store = MemoryStore::new();
        let product = store.add_product(Decimal::new(1000, 2)).await;
        let color = store.add_variant(product, 1).await;
        let (state, registry) = state(&store);
        let app = test::init_service(App::new().configure(configure(state, registry))).await;

        let req = test::TestRequest::post()
            .uri("/e_commerce/api/v1/order")
            .set_json(create_body(
                Uuid::new_v4(),
                json!([{"product_id": product, "color_id": color, "quantity": 3}]),
            ))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], json!("insufficient_stock"));
        assert_eq!(body["error"]["available"], json!(1));
        assert_eq!(store.stock(color).await, Some(1));
    }

    #[actix_web::test]
    async fn test_malformed_input_is_bad_request() {
        let store = MemoryStore::new();
        let (state, registry) = state(&store);
        let app = test::init_service(App::new().configure(configure(state, registry))).await;

        let req = test::TestRequest::get()
            .uri("/e_commerce/api/v1/order/not-a-uuid")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri("/e_commerce/api/v1/order?limit=abc")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri("/e_commerce/api/v1/order?offset=-1")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/e_commerce/api/v1/order")
            .set_json(create_body(Uuid::new_v4(), json!([])))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], json!("validation"));
    }

    #[actix_web::test]
    async fn test_update_without_status_is_bad_request() {
        let store = MemoryStore::new();
        let product = store.add_product(Decimal::new(1000, 2)).await;
        let color = store.add_variant(product, 5).await;
        let (state, registry) = state(&store);
        let app = test::init_service(App::new().configure(configure(state, registry))).await;

        let req = test::TestRequest::post()
            .uri("/e_commerce/api/v1/order")
            .set_json(create_body(
                Uuid::new_v4(),
                json!([{"product_id": product, "color_id": color, "quantity": 1}]),
            ))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        let order_id = created["data"]["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::put()
            .uri(&format!("/e_commerce/api/v1/order/{order_id}"))
            .set_json(json!({
                "address_name": "Sergeli 9",
                "longitude": 69.2,
                "latitude": 41.2,
                "total_price": "10.00"
            }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri(&format!("/e_commerce/api/v1/order/{order_id}"))
            .to_request();
        let fetched: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(fetched["data"]["address_name"], json!("Sergeli 7"));
        assert_eq!(fetched["data"]["status"], json!("pending"));
    }

    #[actix_web::test]
    async fn test_unstorable_total_is_bad_request() {
        let store = MemoryStore::new();
        let product = store.add_product(Decimal::new(600_000_000_000, 0)).await;
        let color = store.add_variant(product, 5).await;
        let (state, registry) = state(&store);
        let app = test::init_service(App::new().configure(configure(state, registry))).await;

        let req = test::TestRequest::post()
            .uri("/e_commerce/api/v1/order")
            .set_json(create_body(
                Uuid::new_v4(),
                json!([{"product_id": product, "color_id": color, "quantity": 2}]),
            ))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], json!("validation"));
        assert_eq!(store.stock(color).await, Some(5));
    }

    #[actix_web::test]
    async fn test_ping_and_metrics() {
        let store = MemoryStore::new();
        let (state, registry) = state(&store);
        let app = test::init_service(App::new().configure(configure(state, registry))).await;

        let req = test::TestRequest::get().uri("/ping").to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "pong");

        let req = test::TestRequest::get().uri("/metrics").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_health_reports_database() {
        let store = MemoryStore::new();
        let (state, registry) = state(&store);
        let app = test::init_service(App::new().configure(configure(state, registry))).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["overall_status"]["state"], json!("healthy"));
        assert!(body["components"]["database"].is_object());
    }
}
