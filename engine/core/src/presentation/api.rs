// HTTP adapter over the lifecycle services.
//
// Transport only: no auth lives here. The caller identity arrives in the
// `x-caller-id` header (placed there by the upstream identity layer) and
// is trusted; the services perform their own ownership and assignment
// checks on top of it.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{sse, IntoResponse, Response, Sse},
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde_json::json;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::application::{
    CollectionService, DeliveryService, FeeService, FinalLineItem, SaleService, ValidationService,
};
use crate::domain::collection::{CollectionId, LineItemId};
use crate::domain::delivery::{DeliveryId, PaymentStatus, PickupStatus};
use crate::domain::error::EngineError;
use crate::domain::sale::SaleId;
use crate::domain::{AdminId, AgentId, BankId, MaterialId, SellerId};
use crate::infrastructure::event_bus::EventBus;

pub struct AppState {
    pub collections: Arc<dyn CollectionService>,
    pub validations: Arc<dyn ValidationService>,
    pub deliveries: Arc<dyn DeliveryService>,
    pub sales: Arc<dyn SaleService>,
    pub fees: Arc<dyn FeeService>,
    pub events: EventBus,
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/collections", post(create_collection).delete(delete_collection))
        .route("/collections/mine", get(my_collection))
        .route("/collections/items", post(add_item).put(set_item_quantity))
        .route("/collections/items/{material_id}", delete(remove_item))
        .route("/collections/{id}/assign", post(assign_agent))
        .route("/collections/{id}/redirect", post(redirect_order))
        .route(
            "/collections/{id}/items/{item_id}",
            put(update_item_validating).delete(delete_item_validating),
        )
        .route("/collections/{id}/cancel", post(cancel_order))
        .route("/collections/{id}/validate", post(validate_collection))
        .route("/validations/pending", get(pending_validations))
        .route("/validations/history", get(validation_history))
        .route("/deliveries", post(create_delivery))
        .route("/deliveries/history", get(delivery_history))
        .route("/deliveries/{id}/status", patch(update_delivery_status))
        .route("/sales", post(create_sale).get(my_sales))
        .route("/sales/{id}", get(get_sale))
        .route("/sales/{id}/status", patch(update_sale_status))
        .route("/fees", get(get_fee).post(set_fee))
        .route("/events/stream", get(stream_events))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
            EngineError::Conflict(_) => StatusCode::CONFLICT,
            EngineError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = Json(json!({ "status": "fail", "message": self.0.to_string() }));
        (status, body).into_response()
    }
}

fn caller(headers: &HeaderMap) -> Result<Uuid, ApiError> {
    headers
        .get("x-caller-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value).ok())
        .ok_or_else(|| ApiError(EngineError::validation("missing or invalid x-caller-id header")))
}

fn success(data: serde_json::Value) -> Json<serde_json::Value> {
    Json(json!({ "status": "success", "data": data }))
}

// ---- seller: cart ----

#[derive(serde::Deserialize)]
struct AddItemRequest {
    material_id: Uuid,
    quantity: Decimal,
}

#[derive(serde::Deserialize)]
struct SetQuantityRequest {
    item_id: Uuid,
    new_quantity: Decimal,
}

async fn create_collection(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let seller = SellerId(caller(&headers)?);
    let collection = state.collections.create_collection(seller).await?;
    Ok((
        StatusCode::CREATED,
        success(json!({ "collection": collection })),
    ))
}

async fn my_collection(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let seller = SellerId(caller(&headers)?);
    let collection = state.collections.my_collection(seller).await?;
    Ok(success(json!({ "collection": collection })))
}

async fn add_item(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<AddItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let seller = SellerId(caller(&headers)?);
    let collection = state
        .collections
        .add_item(seller, MaterialId(body.material_id), body.quantity)
        .await?;
    Ok(success(json!({ "collection": collection })))
}

async fn set_item_quantity(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<SetQuantityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let seller = SellerId(caller(&headers)?);
    let collection = state
        .collections
        .set_item_quantity(seller, LineItemId(body.item_id), body.new_quantity)
        .await?;
    Ok(success(json!({ "collection": collection })))
}

async fn remove_item(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(material_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let seller = SellerId(caller(&headers)?);
    let collection = state
        .collections
        .remove_item(seller, MaterialId(material_id))
        .await?;
    Ok(success(json!({ "collection": collection })))
}

async fn delete_collection(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let seller = SellerId(caller(&headers)?);
    state.collections.delete_collection(seller).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "collection deleted"
    })))
}

// ---- assignment & validation ----

#[derive(serde::Deserialize)]
struct AssignAgentRequest {
    agent_id: Uuid,
}

#[derive(serde::Deserialize)]
struct RedirectRequest {
    new_agent_id: Uuid,
}

#[derive(serde::Deserialize)]
struct UpdateItemRequest {
    new_quantity: Decimal,
}

#[derive(serde::Deserialize)]
struct ValidateRequest {
    #[serde(default)]
    materials: Option<Vec<FinalLineItem>>,
}

async fn assign_agent(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<AssignAgentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let seller = SellerId(caller(&headers)?);
    let collection = state
        .validations
        .assign_agent(CollectionId(id), seller, AgentId(body.agent_id))
        .await?;
    Ok(success(json!({ "collection": collection })))
}

async fn redirect_order(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<RedirectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let agent = AgentId(caller(&headers)?);
    let collection = state
        .validations
        .redirect_order(CollectionId(id), agent, AgentId(body.new_agent_id))
        .await?;
    Ok(success(json!({ "collection": collection })))
}

async fn update_item_validating(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let agent = AgentId(caller(&headers)?);
    let collection = state
        .validations
        .update_item(CollectionId(id), agent, LineItemId(item_id), body.new_quantity)
        .await?;
    Ok(success(json!({ "collection": collection })))
}

async fn delete_item_validating(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let agent = AgentId(caller(&headers)?);
    let collection = state
        .validations
        .delete_item(CollectionId(id), agent, LineItemId(item_id))
        .await?;
    Ok(success(json!({ "collection": collection })))
}

async fn cancel_order(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let agent = AgentId(caller(&headers)?);
    state.validations.cancel_order(CollectionId(id), agent).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "order cancelled"
    })))
}

async fn validate_collection(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<ValidateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let agent = AgentId(caller(&headers)?);
    let collection = state
        .validations
        .validate(CollectionId(id), agent, body.materials)
        .await?;
    Ok(success(json!({ "collection": collection })))
}

async fn pending_validations(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let agent = AgentId(caller(&headers)?);
    let collections = state.validations.pending_validations(agent).await?;
    Ok(success(json!({
        "results": collections.len(),
        "collections": collections
    })))
}

// ---- deliveries ----

#[derive(serde::Deserialize)]
struct CreateDeliveryRequest {
    collection_ids: Vec<Uuid>,
    #[serde(default)]
    payout_bank: Option<Uuid>,
}

#[derive(serde::Deserialize)]
struct UpdateDeliveryStatusRequest {
    #[serde(default)]
    pickup_status: Option<PickupStatus>,
    #[serde(default)]
    agent_payment_status: Option<PaymentStatus>,
}

async fn create_delivery(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateDeliveryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let agent = AgentId(caller(&headers)?);
    let collection_ids: Vec<CollectionId> =
        body.collection_ids.into_iter().map(CollectionId).collect();
    let delivery = state
        .deliveries
        .create_delivery(agent, collection_ids, body.payout_bank.map(BankId))
        .await?;
    Ok((StatusCode::CREATED, success(json!({ "delivery": delivery }))))
}

async fn delivery_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let agent = AgentId(caller(&headers)?);
    let deliveries = state.deliveries.delivery_history(agent).await?;
    Ok(success(json!({
        "results": deliveries.len(),
        "deliveries": deliveries
    })))
}

async fn validation_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let agent = AgentId(caller(&headers)?);
    let previews = state.deliveries.validation_history(agent).await?;
    Ok(success(json!({
        "results": previews.len(),
        "collections": previews
    })))
}

async fn update_delivery_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateDeliveryStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let delivery = state
        .deliveries
        .update_delivery_status(DeliveryId(id), body.pickup_status, body.agent_payment_status)
        .await?;
    Ok(success(json!({ "delivery": delivery })))
}

// ---- sales ----

#[derive(serde::Deserialize)]
struct CreateSaleRequest {
    collection_id: Uuid,
    bank_id: Uuid,
}

#[derive(serde::Deserialize)]
struct UpdateSaleStatusRequest {
    status: PaymentStatus,
}

async fn create_sale(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateSaleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let seller = SellerId(caller(&headers)?);
    let sale = state
        .sales
        .create_sale(seller, CollectionId(body.collection_id), BankId(body.bank_id))
        .await?;
    Ok((StatusCode::CREATED, success(json!({ "sale": sale }))))
}

async fn my_sales(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let seller = SellerId(caller(&headers)?);
    let sales = state.sales.my_sales(seller).await?;
    Ok(success(json!({ "results": sales.len(), "sales": sales })))
}

async fn get_sale(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let seller = SellerId(caller(&headers)?);
    let sale = state.sales.sale(seller, SaleId(id)).await?;
    Ok(success(json!({ "sale": sale })))
}

async fn update_sale_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateSaleStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let sale = state.sales.update_sale_status(SaleId(id), body.status).await?;
    Ok(success(json!({ "sale": sale })))
}

// ---- fees ----

#[derive(serde::Deserialize)]
struct SetFeeRequest {
    fee_per_kg: Decimal,
}

async fn get_fee(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let current = state.fees.current_fee().await?;
    let history = state.fees.fee_history().await?;
    Ok(success(json!({
        "fee_per_kg": current,
        "history": history
    })))
}

async fn set_fee(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<SetFeeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let admin = AdminId(caller(&headers)?);
    let entry = state.fees.set_fee(body.fee_per_kg, admin).await?;
    Ok(success(json!({
        "fee_per_kg": entry.fee_per_kg,
        "message": "agent fee updated successfully"
    })))
}

// ---- events ----

async fn stream_events(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let receiver = state.events.subscribe().into_inner();
    let stream = BroadcastStream::new(receiver).filter_map(|event| match event {
        Ok(event) => Some(Ok::<_, axum::Error>(
            sse::Event::default().data(serde_json::to_string(&event).unwrap_or_default()),
        )),
        // Lagged receivers skip dropped events and keep streaming.
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(sse::KeepAlive::default())
}
