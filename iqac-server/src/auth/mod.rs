//! Authentication and authorization
//!
//! Bearer tokens are HS256 JWTs. The middleware verifies the token, reloads
//! the account and hands handlers a [`CurrentUser`]; role checks live in
//! [`guards`].

pub mod guards;
pub mod jwt;
pub mod middleware;

pub use guards::{require_admin, require_role, require_staff_department};
pub use jwt::{Claims, JwtKeys};
pub use middleware::{auth_middleware, CurrentUser};
