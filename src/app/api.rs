use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    app::state::AppState,
    config::GlobalConfig,
    middleware::rate_limiter::rate_limit_middleware,
    routes::{
        account::{get_standing, pay_dues},
        event::sse_handler,
        health::health_check,
        session::{
            book_session, end_session, extend_session, get_session, list_sessions, settle_session,
        },
    },
    utils::rate_limiter::RateLimiter,
};

#[derive(Clone)]
pub struct AppContext {
    pub state: AppState,
    pub config: GlobalConfig,
    pub rate_limiter: RateLimiter,
}

#[derive(OpenApi)]
#[openapi(
    info(title = "ParkEase Session & Billing API", version = "1.0.0"),
    paths(
        crate::routes::health::health_check,
        crate::routes::event::sse_handler,
        crate::routes::session::book_session,
        crate::routes::session::list_sessions,
        crate::routes::session::get_session,
        crate::routes::session::extend_session,
        crate::routes::session::end_session,
        crate::routes::session::settle_session,
        crate::routes::account::get_standing,
        crate::routes::account::pay_dues,
    ),
    components(schemas(
        crate::models::responses::ApiResponse,
        crate::models::requests::BookingRequest,
        crate::models::requests::ExtendRequest,
        crate::models::requests::SettleRequest,
        crate::models::types::SettlementChoice,
        crate::models::types::AccountStatus,
    ))
)]
struct ApiDoc;

pub fn create_api_router(context: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(
            context
                .config
                .server
                .cors_allowed_origins
                .iter()
                .filter_map(|origin| match origin.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                        None
                    }
                })
                .collect::<Vec<_>>(),
        )
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::CACHE_CONTROL,
        ])
        .allow_credentials(true);

    Router::new()
        .route("/health", get(health_check))
        .route("/events", get(sse_handler))
        .route(
            "/accounts/{account_id}/sessions",
            post(book_session).get(list_sessions),
        )
        .route(
            "/accounts/{account_id}/sessions/{session_id}",
            get(get_session),
        )
        .route(
            "/accounts/{account_id}/sessions/{session_id}/extend",
            post(extend_session),
        )
        .route(
            "/accounts/{account_id}/sessions/{session_id}/end",
            post(end_session),
        )
        .route(
            "/accounts/{account_id}/sessions/{session_id}/settle",
            post(settle_session),
        )
        .route("/accounts/{account_id}/standing", get(get_standing))
        .route("/accounts/{account_id}/dues/pay", post(pay_dues))
        .merge(SwaggerUi::new("/swagger-ui").url("/docs/openapi.json", ApiDoc::openapi()))
        .layer(axum::middleware::from_fn(rate_limit_middleware))
        .layer(axum::Extension(context.rate_limiter.clone()))
        .layer(cors)
        .with_state(context)
}
