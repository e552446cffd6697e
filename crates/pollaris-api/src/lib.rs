//! pollaris-api — REST surface for the Pollaris and Targets services.
//!
//! # API Routes
//!
//! | Method | Path | Body | Response |
//! |---|---|---|---|
//! | POST | `/api/v1/pollaris` | template | empty |
//! | PUT | `/api/v1/pollaris` | template | empty |
//! | POST | `/api/v1/targets` | target, target list, or action | empty |
//! | PUT | `/api/v1/targets` | target | empty |
//! | PATCH | `/api/v1/targets` | target | empty |
//! | GET | `/api/v1/targets` | query | target list |
//! | DELETE | `/api/v1/targets` | query | empty |

pub mod handlers;

use std::sync::Arc;

use axum::routing::post;
use axum::Router;

use pollaris_registry::PollarisRegistry;
use pollaris_targets::TargetService;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub registry: Arc<PollarisRegistry>,
    pub targets: Arc<TargetService>,
}

/// Build the complete API router.
pub fn build_router(registry: Arc<PollarisRegistry>, targets: Arc<TargetService>) -> Router {
    let state = ApiState { registry, targets };

    let api_routes = Router::new()
        .route(
            "/pollaris",
            post(handlers::post_pollaris).put(handlers::put_pollaris),
        )
        .route(
            "/targets",
            post(handlers::post_targets)
                .put(handlers::put_target)
                .patch(handlers::patch_target)
                .get(handlers::get_targets)
                .delete(handlers::delete_targets),
        )
        .with_state(state);

    Router::new().nest("/api/v1", api_routes)
}
