use actix_web::{web, HttpResponse};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{CreateOrderRequest, Data, ListOrdersQuery};
use super::error::ApiError;
use super::AppState;
use crate::actors::{GetSystemHealth, HealthStatus};
use crate::domain::order::{OrderHeaderUpdate, PlaceOrder};
use crate::store::OrderFilter;

#[instrument(name = "handler::create_order", skip_all, fields(item_count = body.items.len()))]
pub async fn create_order(
    state: web::Data<AppState>,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, ApiError> {
    let command = PlaceOrder::from(body.into_inner());
    let aggregate = state.commands.place_order(command).await?;
    Ok(HttpResponse::Created().json(Data::new(aggregate)))
}

#[instrument(name = "handler::get_order", skip(state))]
pub async fn get_order(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let aggregate = state.queries.get_order(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(Data::new(aggregate)))
}

#[instrument(name = "handler::list_orders", skip(state))]
pub async fn list_orders(
    state: web::Data<AppState>,
    query: web::Query<ListOrdersQuery>,
) -> Result<HttpResponse, ApiError> {
    let ListOrdersQuery {
        customer_id,
        offset,
        limit,
    } = query.into_inner();

    let page = state
        .queries
        .list_orders(OrderFilter { customer_id }, offset, limit)
        .await?;
    Ok(HttpResponse::Ok().json(Data::new(page)))
}

#[instrument(name = "handler::update_order", skip(state, body))]
pub async fn update_order(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<OrderHeaderUpdate>,
) -> Result<HttpResponse, ApiError> {
    let aggregate = state
        .commands
        .update_order(path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Accepted().json(Data::new(aggregate)))
}

#[instrument(name = "handler::delete_order", skip(state))]
pub async fn delete_order(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    state.commands.delete_order(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn ping() -> HttpResponse {
    HttpResponse::Ok().body("pong")
}

pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    match state.health.send(GetSystemHealth).await {
        Ok(report) if report.overall_status.is_unhealthy() => {
            HttpResponse::ServiceUnavailable().json(report)
        }
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => {
            tracing::error!(error = %e, "Health monitor unreachable");
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "overall_status": HealthStatus::Unhealthy("health monitor unreachable".to_string())
            }))
        }
    }
}
