/// API route handlers
///
/// Organized by resource:
///
/// - `health`: health check endpoint
/// - `auth`: authentication endpoints (register, login, refresh)
/// - `projects`: projects and member management
/// - `boards`: boards, columns, column reorder
/// - `tasks`: task CRUD and move
/// - `comments`: comments with @mentions
/// - `activities`: project activity feed
/// - `notifications`: notification list and read flags
/// - `ws`: WebSocket endpoint for the real-time relay

pub mod activities;
pub mod auth;
pub mod boards;
pub mod comments;
pub mod health;
pub mod notifications;
pub mod projects;
pub mod tasks;
pub mod ws;
