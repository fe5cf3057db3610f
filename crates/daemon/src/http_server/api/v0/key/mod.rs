use axum::routing::post;
use axum::Router;

use crate::ServiceState;

pub mod request;
pub mod store;

pub use request::{KeyRequest, KeyResponse};
pub use store::{KeyStoreRequest, KeyStoreResponse};

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/store", post(store::handler))
        .route("/request", post(request::handler))
        .with_state(state)
}
