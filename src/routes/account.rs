use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::{
    app::api::AppContext, error::EngineError, models::responses::ApiResponse, services::standing,
};

#[utoipa::path(
    get,
    path = "/accounts/{account_id}/standing",
    tag = "Accounts",
    params(("account_id" = String, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account standing and booking eligibility", body = ApiResponse)
    )
)]
pub async fn get_standing(
    State(context): State<AppContext>,
    Path(account_id): Path<String>,
) -> Result<impl IntoResponse, EngineError> {
    let current = context.state.standing(&account_id).await?;

    Ok(Json(ApiResponse::success(
        "Standing fetched.",
        json!({
            "standing": current,
            "can_book": standing::can_book(&current),
            "outstanding_amount": standing::get_outstanding(&current)
        }),
    )))
}

#[utoipa::path(
    post,
    path = "/accounts/{account_id}/dues/pay",
    tag = "Accounts",
    params(("account_id" = String, Path, description = "Account id")),
    responses(
        (status = 200, description = "Dues cleared, bookings unblocked", body = ApiResponse),
        (status = 402, description = "Payment declined", body = ApiResponse),
        (status = 409, description = "Nothing outstanding", body = ApiResponse)
    )
)]
pub async fn pay_dues(
    State(context): State<AppContext>,
    Path(account_id): Path<String>,
) -> Result<impl IntoResponse, EngineError> {
    let cleared = context.state.pay_dues(&account_id).await?;

    Ok(Json(ApiResponse::success(
        "Dues cleared.",
        json!({
            "standing": cleared,
            "can_book": standing::can_book(&cleared)
        }),
    )))
}
