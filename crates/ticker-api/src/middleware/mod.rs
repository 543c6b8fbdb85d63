//! API 서버용 HTTP middleware.

mod metrics;
pub mod origin;
mod ticker;

pub use metrics::metrics_layer;
pub use origin::{normalize_host, origin_label, request_origin, UNKNOWN_ORIGIN};
pub use ticker::resolve_ticker;
