use axum::Router;

use crate::state::SharedState;

/// Swagger UI routes.
pub mod docs;
/// Session lifecycle and player command routes.
pub mod game;
/// Health check routes.
pub mod health;
/// Server-Sent Events routes.
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(sse::router())
        .merge(game::router())
        .merge(docs::router())
        .with_state(state)
}
