/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and validation
/// - [`jwt`]: JWT token generation and validation
/// - [`middleware`]: Request authentication context for Axum
/// - [`access`]: Project membership and role resolution (task→board→project)
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id with 64 MB memory, 3 iterations
/// - **JWT Tokens**: HS256 signing with configurable expiration
/// - **Constant-time Comparison**: Verification uses constant-time operations

pub mod access;
pub mod jwt;
pub mod middleware;
pub mod password;
