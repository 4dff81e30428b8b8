use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub item: String,
    pub quantity: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub item: String,
    pub quantity: u32,
    pub created_at: String,
}

pub async fn create_order(
    State(_state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Value>, StatusCode> {
    info!("Create order requested: {:?}", payload);

    if payload.item.is_empty() || payload.quantity == 0 {
        warn!("Invalid order creation request: missing item or zero quantity");
        return Err(StatusCode::BAD_REQUEST);
    }

    let order = Order {
        id: uuid::Uuid::new_v4().to_string(),
        item: payload.item,
        quantity: payload.quantity,
        created_at: chrono::Utc::now().to_rfc3339(),
    };

    Ok(Json(json!({
        "order": order,
        "message": "Order created successfully",
        "note": "Mock data - order storage not yet implemented"
    })))
}

pub async fn get_order(
    State(_state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Value>, StatusCode> {
    info!(order_id = id, "Fetch order requested");

    // Mock ledger; id 0 simulates the order store being offline
    if id == 0 {
        warn!(order_id = id, "Order store unavailable");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(json!({
        "order": {
            "id": id.to_string(),
            "item": "widget",
            "quantity": 1,
            "created_at": chrono::Utc::now().to_rfc3339(),
        },
        "note": "Mock data - order storage not yet implemented"
    })))
}
