use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::{
    app::api::AppContext,
    error::EngineError,
    models::{
        requests::{BookingRequest, ExtendRequest, SettleRequest},
        responses::ApiResponse,
    },
    services::standing,
};

#[utoipa::path(
    post,
    path = "/accounts/{account_id}/sessions",
    tag = "Sessions",
    request_body = BookingRequest,
    params(("account_id" = String, Path, description = "Account making the booking")),
    responses(
        (status = 201, description = "Session booked and paid", body = ApiResponse),
        (status = 400, description = "Invalid booking", body = ApiResponse),
        (status = 402, description = "Payment declined", body = ApiResponse),
        (status = 403, description = "Account blocked by unpaid dues", body = ApiResponse),
        (status = 409, description = "Another session is still open", body = ApiResponse)
    )
)]
pub async fn book_session(
    State(context): State<AppContext>,
    Path(account_id): Path<String>,
    Json(req): Json<BookingRequest>,
) -> Result<impl IntoResponse, EngineError> {
    let session = context.state.book(&account_id, req).await?;
    let view = context.state.session_view(&account_id, &session.id)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Session booked.", json!(view))),
    ))
}

#[utoipa::path(
    get,
    path = "/accounts/{account_id}/sessions",
    tag = "Sessions",
    params(("account_id" = String, Path, description = "Account id")),
    responses(
        (status = 200, description = "Booking history, newest first", body = ApiResponse)
    )
)]
pub async fn list_sessions(
    State(context): State<AppContext>,
    Path(account_id): Path<String>,
) -> Result<impl IntoResponse, EngineError> {
    let views = context.state.list_sessions(&account_id)?;

    Ok(Json(ApiResponse::success(
        "Sessions fetched.",
        json!({
            "account_id": account_id,
            "sessions": views,
            "count": views.len()
        }),
    )))
}

#[utoipa::path(
    get,
    path = "/accounts/{account_id}/sessions/{session_id}",
    tag = "Sessions",
    params(
        ("account_id" = String, Path, description = "Account id"),
        ("session_id" = String, Path, description = "Session id")
    ),
    responses(
        (status = 200, description = "Live countdown and penalty view", body = ApiResponse),
        (status = 404, description = "Session not found", body = ApiResponse)
    )
)]
pub async fn get_session(
    State(context): State<AppContext>,
    Path((account_id, session_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, EngineError> {
    let view = context.state.session_view(&account_id, &session_id)?;

    Ok(Json(ApiResponse::success("Session fetched.", json!(view))))
}

#[utoipa::path(
    post,
    path = "/accounts/{account_id}/sessions/{session_id}/extend",
    tag = "Sessions",
    request_body = ExtendRequest,
    params(
        ("account_id" = String, Path, description = "Account id"),
        ("session_id" = String, Path, description = "Session id")
    ),
    responses(
        (status = 200, description = "Extension paid and applied", body = ApiResponse),
        (status = 400, description = "Invalid extension", body = ApiResponse),
        (status = 402, description = "Payment declined", body = ApiResponse),
        (status = 404, description = "Session not found", body = ApiResponse)
    )
)]
pub async fn extend_session(
    State(context): State<AppContext>,
    Path((account_id, session_id)): Path<(String, String)>,
    Json(req): Json<ExtendRequest>,
) -> Result<impl IntoResponse, EngineError> {
    let view = context
        .state
        .extend(&account_id, &session_id, req.extension_hours)
        .await?;

    Ok(Json(ApiResponse::success("Session extended.", json!(view))))
}

#[utoipa::path(
    post,
    path = "/accounts/{account_id}/sessions/{session_id}/end",
    tag = "Sessions",
    params(
        ("account_id" = String, Path, description = "Account id"),
        ("session_id" = String, Path, description = "Session id")
    ),
    responses(
        (status = 200, description = "Session ended, final bill issued", body = ApiResponse),
        (status = 404, description = "Session not found", body = ApiResponse),
        (status = 409, description = "Session already ended", body = ApiResponse)
    )
)]
pub async fn end_session(
    State(context): State<AppContext>,
    Path((account_id, session_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, EngineError> {
    let bill = context.state.end_session(&account_id, &session_id).await?;

    Ok(Json(ApiResponse::success("Final bill issued.", json!(bill))))
}

#[utoipa::path(
    post,
    path = "/accounts/{account_id}/sessions/{session_id}/settle",
    tag = "Sessions",
    request_body = SettleRequest,
    params(
        ("account_id" = String, Path, description = "Account id"),
        ("session_id" = String, Path, description = "Session id")
    ),
    responses(
        (status = 200, description = "Bill settled or deferred", body = ApiResponse),
        (status = 402, description = "Payment declined, bill still pending", body = ApiResponse),
        (status = 409, description = "No bill yet, or already settled", body = ApiResponse)
    )
)]
pub async fn settle_session(
    State(context): State<AppContext>,
    Path((account_id, session_id)): Path<(String, String)>,
    Json(req): Json<SettleRequest>,
) -> Result<impl IntoResponse, EngineError> {
    let standing = context
        .state
        .settle(&account_id, &session_id, req.choice)
        .await?;

    Ok(Json(ApiResponse::success(
        "Bill settled.",
        json!({
            "standing": standing,
            "can_book": standing::can_book(&standing)
        }),
    )))
}
