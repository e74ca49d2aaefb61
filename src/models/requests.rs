use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::types::SettlementChoice;

#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct BookingRequest {
    pub slot_id: String,
    pub parking_id: String,
    pub parking_name: String,
    pub rate_per_hour: Decimal,
    pub duration_hours: Decimal,
}

#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct ExtendRequest {
    pub extension_hours: Decimal,
}

#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct SettleRequest {
    pub choice: SettlementChoice,
}
