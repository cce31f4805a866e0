use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    commands::transfers::{
        initiate_transfer_command::NewTransferItem,
        receive_transfer_items_command::ItemReceipt, CancelTransferCommand,
        DispatchReturnCommand, DispatchTransferCommand, DisposeRejectedItemCommand,
        InitiateTransferCommand, ReceiveTransferItemsCommand, ReturnRejectedItemCommand,
    },
    entities::{warehouse_transfer, warehouse_transfer_item, warehouse_transfer_log},
    errors::ServiceError,
    services::transfers::TransferWithHistory,
    ApiResponse, AppState, PaginatedResponse,
};

/// The actor identity is resolved by the external auth layer and forwarded
/// on every mutating call.
const ACTOR_HEADER: &str = "x-actor-id";
const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

fn actor_from_headers(headers: &HeaderMap) -> Result<Uuid, ServiceError> {
    headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
        .filter(|id| !id.is_nil())
        .ok_or(ServiceError::UnauthenticatedCaller)
}

fn origin_ip_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct TransferListQuery {
    /// Page number (1-indexed)
    pub page: Option<u64>,
    /// Page size (max 100)
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewTransferItemRequest {
    pub product_id: Uuid,
    pub quantity_sent: i32,
    pub batch_number: Option<String>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub unit_price: Option<Decimal>,
    pub currency_code: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTransferRequest {
    pub source_warehouse_id: Uuid,
    pub target_warehouse_id: Uuid,
    pub items: Vec<NewTransferItemRequest>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DispatchTransferRequest {
    pub courier_name: String,
    pub tracking_number: Option<String>,
    pub expected_delivery_date: Option<DateTime<Utc>>,
    pub version: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ItemReceiptRequest {
    pub item_id: Uuid,
    pub quantity_received: i32,
    pub quantity_rejected: i32,
    pub rejection_reason: Option<String>,
    pub condition_notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReceiveItemsRequest {
    pub actions: Vec<ItemReceiptRequest>,
    pub notes: Option<String>,
    pub version: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DisposeItemRequest {
    pub quantity: Option<i32>,
    pub reason: String,
    pub version: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReturnItemRequest {
    pub quantity: Option<i32>,
    pub version: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DispatchReturnRequest {
    pub courier_name: String,
    pub tracking_number: Option<String>,
    pub version: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CancelTransferRequest {
    pub reason: String,
    pub version: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransferSummary {
    pub id: Uuid,
    pub transfer_number: String,
    pub source_warehouse_id: Uuid,
    pub target_warehouse_id: Uuid,
    pub status: String,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<warehouse_transfer::Model> for TransferSummary {
    fn from(model: warehouse_transfer::Model) -> Self {
        Self {
            id: model.id,
            transfer_number: model.transfer_number,
            source_warehouse_id: model.source_warehouse_id,
            target_warehouse_id: model.target_warehouse_id,
            status: model.status.to_string(),
            version: model.version,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransferDetail {
    pub transfer: warehouse_transfer::Model,
    pub items: Vec<warehouse_transfer_item::Model>,
}

#[derive(Debug, Serialize)]
pub struct TransferHistory {
    pub transfer: warehouse_transfer::Model,
    pub items: Vec<warehouse_transfer_item::Model>,
    pub logs: Vec<warehouse_transfer_log::Model>,
}

impl From<TransferWithHistory> for TransferHistory {
    fn from(value: TransferWithHistory) -> Self {
        Self {
            transfer: value.transfer,
            items: value.items,
            logs: value.logs,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_transfer).get(list_transfers))
        .route("/:id", get(get_transfer))
        .route("/:id/dispatch", post(dispatch_transfer))
        .route("/:id/receive", post(receive_items))
        .route("/:id/return-dispatch", post(dispatch_return))
        .route("/:id/cancel", post(cancel_transfer))
        .route("/items/:item_id/dispose", post(dispose_item))
        .route("/items/:item_id/return", post(return_item))
}

async fn create_transfer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateTransferRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TransferDetail>>), ServiceError> {
    let actor_id = actor_from_headers(&headers)?;

    let command = InitiateTransferCommand {
        source_warehouse_id: payload.source_warehouse_id,
        target_warehouse_id: payload.target_warehouse_id,
        items: payload
            .items
            .into_iter()
            .map(|i| NewTransferItem {
                product_id: i.product_id,
                quantity_sent: i.quantity_sent,
                batch_number: i.batch_number,
                expiry_date: i.expiry_date,
                unit_price: i.unit_price,
                currency_code: i.currency_code,
            })
            .collect(),
        actor_id,
        origin_ip: origin_ip_from_headers(&headers),
    };

    let result = state.services.transfers.initiate_transfer(command).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(TransferDetail {
            transfer: result.transfer,
            items: result.items,
        })),
    ))
}

async fn list_transfers(
    State(state): State<AppState>,
    Query(query): Query<TransferListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<TransferSummary>>>, ServiceError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let (records, total) = state.services.transfers.list_transfers(page, limit).await?;
    let total_pages = total.div_ceil(limit);

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items: records.into_iter().map(TransferSummary::from).collect(),
        total,
        page,
        limit,
        total_pages,
    })))
}

async fn get_transfer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TransferHistory>>, ServiceError> {
    let history = state
        .services
        .transfers
        .get_transfer_with_history(&id)
        .await?;
    Ok(Json(ApiResponse::success(history.into())))
}

async fn dispatch_transfer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<DispatchTransferRequest>,
) -> Result<Json<ApiResponse<TransferSummary>>, ServiceError> {
    let actor_id = actor_from_headers(&headers)?;

    let result = state
        .services
        .transfers
        .dispatch_transfer(DispatchTransferCommand {
            transfer_id: id,
            courier_name: payload.courier_name,
            tracking_number: payload.tracking_number,
            expected_delivery_date: payload.expected_delivery_date,
            actor_id,
            version: payload.version,
            origin_ip: origin_ip_from_headers(&headers),
        })
        .await?;

    Ok(Json(ApiResponse::success(result.transfer.into())))
}

async fn receive_items(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<ReceiveItemsRequest>,
) -> Result<Json<ApiResponse<TransferDetail>>, ServiceError> {
    let actor_id = actor_from_headers(&headers)?;

    let result = state
        .services
        .transfers
        .receive_items(ReceiveTransferItemsCommand {
            transfer_id: id,
            actions: payload
                .actions
                .into_iter()
                .map(|a| ItemReceipt {
                    item_id: a.item_id,
                    quantity_received: a.quantity_received,
                    quantity_rejected: a.quantity_rejected,
                    rejection_reason: a.rejection_reason,
                    condition_notes: a.condition_notes,
                })
                .collect(),
            actor_id,
            notes: payload.notes,
            version: payload.version,
            origin_ip: origin_ip_from_headers(&headers),
        })
        .await?;

    Ok(Json(ApiResponse::success(TransferDetail {
        transfer: result.transfer,
        items: result.items,
    })))
}

async fn dispatch_return(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<DispatchReturnRequest>,
) -> Result<Json<ApiResponse<TransferSummary>>, ServiceError> {
    let actor_id = actor_from_headers(&headers)?;

    let result = state
        .services
        .transfers
        .dispatch_return(DispatchReturnCommand {
            transfer_id: id,
            courier_name: payload.courier_name,
            tracking_number: payload.tracking_number,
            actor_id,
            version: payload.version,
            origin_ip: origin_ip_from_headers(&headers),
        })
        .await?;

    Ok(Json(ApiResponse::success(result.transfer.into())))
}

async fn cancel_transfer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<CancelTransferRequest>,
) -> Result<Json<ApiResponse<TransferSummary>>, ServiceError> {
    let actor_id = actor_from_headers(&headers)?;

    let result = state
        .services
        .transfers
        .cancel_transfer(CancelTransferCommand {
            transfer_id: id,
            reason: payload.reason,
            actor_id,
            version: payload.version,
            origin_ip: origin_ip_from_headers(&headers),
        })
        .await?;

    Ok(Json(ApiResponse::success(result.transfer.into())))
}

async fn dispose_item(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<DisposeItemRequest>,
) -> Result<Json<ApiResponse<warehouse_transfer_item::Model>>, ServiceError> {
    let actor_id = actor_from_headers(&headers)?;

    let result = state
        .services
        .transfers
        .dispose_rejected_item(DisposeRejectedItemCommand {
            item_id,
            quantity: payload.quantity,
            reason: payload.reason,
            actor_id,
            version: payload.version,
            origin_ip: origin_ip_from_headers(&headers),
        })
        .await?;

    Ok(Json(ApiResponse::success(result.item)))
}

async fn return_item(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<ReturnItemRequest>,
) -> Result<Json<ApiResponse<warehouse_transfer_item::Model>>, ServiceError> {
    let actor_id = actor_from_headers(&headers)?;

    let result = state
        .services
        .transfers
        .return_rejected_item(ReturnRejectedItemCommand {
            item_id,
            quantity: payload.quantity,
            actor_id,
            version: payload.version,
            origin_ip: origin_ip_from_headers(&headers),
        })
        .await?;

    Ok(Json(ApiResponse::success(result.item)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_header_must_be_a_uuid() {
        let mut headers = HeaderMap::new();
        assert!(actor_from_headers(&headers).is_err());

        headers.insert(ACTOR_HEADER, "not-a-uuid".parse().unwrap());
        assert!(actor_from_headers(&headers).is_err());

        headers.insert(
            ACTOR_HEADER,
            Uuid::nil().to_string().parse().unwrap(),
        );
        assert!(actor_from_headers(&headers).is_err());

        let actor = Uuid::new_v4();
        headers.insert(ACTOR_HEADER, actor.to_string().parse().unwrap());
        assert_eq!(actor_from_headers(&headers).unwrap(), actor);
    }

    #[test]
    fn origin_ip_takes_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        assert_eq!(origin_ip_from_headers(&headers), None);

        headers.insert(
            FORWARDED_FOR_HEADER,
            "203.0.113.9, 10.0.0.1".parse().unwrap(),
        );
        assert_eq!(
            origin_ip_from_headers(&headers).as_deref(),
            Some("203.0.113.9")
        );
    }
}
