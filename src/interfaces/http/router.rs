//! API Router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::application::{
    BookingQueries, CheckoutService, PaymentReconciler, RetryService, SlotCatalogService,
};
use crate::infrastructure::crypto::jwt::JwtConfig;
use crate::infrastructure::payments::WebhookVerifier;
use crate::interfaces::http::common::ApiResponse;
use crate::interfaces::http::middleware::{auth_middleware, AuthState};
use crate::interfaces::http::modules::{bookings, health, metrics, request_id, slots, webhooks};

/// Application services the HTTP layer dispatches to
#[derive(Clone)]
pub struct ApiServices {
    pub checkout: Arc<CheckoutService>,
    pub retry: Arc<RetryService>,
    pub reconciler: Arc<PaymentReconciler>,
    pub queries: Arc<BookingQueries>,
    pub catalog: Arc<SlotCatalogService>,
}

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT Bearer token"))
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        bookings::create_booking,
        bookings::book_game,
        bookings::retry_booking,
        bookings::verify_booking,
        bookings::list_bookings,
        bookings::get_booking,
        bookings::calendar_link,
        slots::get_slot_day,
        slots::create_slot_day,
        slots::update_slot,
        webhooks::payment_webhook,
    ),
    components(
        schemas(
            ApiResponse<String>,
            health::HealthResponse,
            health::ComponentHealth,
            bookings::DirectCheckoutRequest,
            bookings::CheckoutResponse,
            bookings::BookingDto,
            bookings::CalendarLinkResponse,
            slots::SlotWindowDto,
            slots::CreateSlotDayRequest,
            slots::UpdateSlotRequest,
            slots::SlotDto,
            slots::SlotCollectionDto,
            crate::domain::slot::Category,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Server health check"),
        (name = "Bookings", description = "Slot checkout, payment retry and verification, booking lookup"),
        (name = "Slots", description = "Per-day slot catalog of a sub-venue"),
        (name = "Payments", description = "Payment gateway webhooks"),
    ),
    info(
        title = "Slot Booking Service API",
        version = "1.0.0",
        description = "Venue slot reservation with hosted-checkout payment reconciliation",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Create the API router with all routes
pub fn create_api_router(
    services: ApiServices,
    jwt_config: JwtConfig,
    webhook_verifier: WebhookVerifier,
    db: Option<DatabaseConnection>,
    prometheus_handle: PrometheusHandle,
) -> Router {
    let auth_state = AuthState { jwt_config };

    let booking_state = bookings::BookingAppState {
        checkout: services.checkout,
        retry: services.retry,
        reconciler: services.reconciler.clone(),
        queries: services.queries,
    };

    let booking_routes = Router::new()
        .route(
            "/bookings",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route("/bookings/verify", get(bookings::verify_booking))
        .route("/bookings/{booking_id}", get(bookings::get_booking))
        .route("/bookings/{booking_id}/retry", post(bookings::retry_booking))
        .route(
            "/bookings/{booking_id}/calendar-link",
            get(bookings::calendar_link),
        )
        .route("/games/{game_id}/booking", post(bookings::book_game))
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            auth_middleware,
        ))
        .with_state(booking_state);

    let slot_routes = Router::new()
        .route(
            "/sub-venues/{sub_venue_id}/slots",
            get(slots::get_slot_day).post(slots::create_slot_day),
        )
        .route(
            "/slot-collections/{collection_id}/slots/{slot_id}",
            patch(slots::update_slot),
        )
        .layer(middleware::from_fn_with_state(auth_state, auth_middleware))
        .with_state(slots::SlotAppState {
            catalog: services.catalog,
        });

    // Authenticated by signature, not JWT
    let webhook_routes = Router::new()
        .route("/payments/webhook", post(webhooks::payment_webhook))
        .with_state(webhooks::WebhookAppState {
            verifier: webhook_verifier,
            reconciler: services.reconciler,
        });

    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .with_state(health::HealthState {
            db,
            started_at: Arc::new(Instant::now()),
        });

    let metrics_routes = Router::new()
        .route("/metrics", get(metrics::prometheus_metrics))
        .with_state(metrics::MetricsState {
            handle: prometheus_handle,
        });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let swagger_routes = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    Router::new()
        .merge(swagger_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .nest(
            "/api/v1",
            booking_routes.merge(slot_routes).merge(webhook_routes),
        )
        .layer(middleware::from_fn(metrics::http_metrics_middleware))
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// ── Tests ──────────────────────────────────────────────────────
