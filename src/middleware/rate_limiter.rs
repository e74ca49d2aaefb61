use std::net::SocketAddr;

use axum::{
    extract::ConnectInfo,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::{models::responses::ApiResponse, utils::rate_limiter::RateLimiter};

pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(rate_limiter) = req.extensions().get::<RateLimiter>() else {
        tracing::error!("Rate limiter extension missing from request");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::failure("Rate limiter unavailable", 500)),
        )
            .into_response();
    };

    let client_key = rate_limiter.get_client_key(&addr);

    if !rate_limiter.check_rate_limit(&client_key) {
        tracing::warn!("Rate limit exceeded for {}", client_key);
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ApiResponse::failure("Too many requests", 429)),
        )
            .into_response();
    }

    next.run(req).await
}
