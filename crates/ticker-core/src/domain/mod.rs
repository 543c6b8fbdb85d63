//! 티커 서비스 도메인 모델.

mod message;
mod settings;
mod ticker;
mod upload;
mod user;

pub use message::*;
pub use settings::*;
pub use ticker::*;
pub use upload::*;
pub use user::*;
