pub mod jwt;
pub mod crypto;

pub use jwt::{JwtService, Claims};
pub use crypto::*;
