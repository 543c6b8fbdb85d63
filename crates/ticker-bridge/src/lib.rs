//! # Ticker Bridge
//!
//! 티커 메시지를 외부 플랫폼으로 복제하는 아웃바운드 브리지.
//!
//! 지원 플랫폼:
//! - Telegram (Bot API)
//! - Mastodon
//! - Bluesky (AT Protocol)
//! - Signal 그룹 (signal-cli JSON-RPC)
//! - Matrix 룸
//!
//! 브리지 전송은 최선 노력 방식입니다. 실패는 기록되고 다른 브리지의
//! 실행을 막지 않습니다.

pub mod bluesky;
pub mod mastodon;
pub mod matrix;
pub mod media;
pub mod registry;
pub mod richtext;
pub mod signal_group;
pub mod telegram;
pub mod types;

pub use bluesky::BlueskyBridge;
pub use mastodon::MastodonBridge;
pub use matrix::{sanitize_room_name, MatrixBridge};
pub use media::{MediaFile, MediaLoader};
pub use registry::Bridges;
pub use richtext::{extract_hashtags, extract_urls, TextSpan};
pub use signal_group::SignalGroupBridge;
pub use telegram::TelegramBridge;
pub use types::*;
