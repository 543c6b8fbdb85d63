//! 관리자 인증.
//!
//! - [`Claims`]: JWT 페이로드
//! - [`JwtAuth`]: 인증된 사용자를 불러오는 Axum 추출기
//! - Argon2 비밀번호 해싱

mod extractor;
mod jwt;
mod password;

pub use extractor::JwtAuth;
pub use jwt::{create_token, decode_token, Claims, JwtError};
pub use password::{hash_password, verify_password, PasswordError};
