//! 도메인 서비스.

pub mod publication;

pub use publication::{PublicationError, PublicationService};
