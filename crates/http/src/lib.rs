mod router;
mod server;

pub use router::{AppState, HttpError, app_router};
pub use server::serve_http;
