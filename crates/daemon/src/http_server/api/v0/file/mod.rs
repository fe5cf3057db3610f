//! Whole-file endpoints. Uploads and results pass through the proxy in
//! plaintext, so these are the less private option next to `/key`.

use axum::routing::{get, post};
use axum::Router;

use crate::ServiceState;

pub mod fetch;
pub mod request;
pub mod status;
pub mod store;

pub use fetch::{FetchRequest, StoredFile};
pub use request::{FileRequest, FileRequestResponse};
pub use status::StatusRequest;
pub use store::{FileStoreRequest, FileStoreResponse};

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/store", post(store::handler))
        .route("/request", post(request::handler))
        .route("/status/:uuid", get(status::handler))
        .route("/:uuid", get(fetch::handler))
        .with_state(state)
}
