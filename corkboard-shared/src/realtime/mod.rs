/// Real-time broadcast relay
///
/// After a state mutation is durably applied, a compact mutation descriptor
/// ([`event::BoardEvent`]) is published to the board's (or project's) room.
/// Other connections subscribed to that room receive it; the originating
/// connection is excluded because it already applied the change
/// optimistically.
///
/// The relay carries no state beyond room membership. Delivery is
/// at-most-once and fire-and-forget: lagged subscribers skip, nothing is
/// persisted, and a reconnecting client re-fetches full board state.
///
/// # Architecture
///
/// ```text
/// REST handler ──publish──> RoomRegistry ──> local WebSocket connections
///        │                        ▲
///        └──PUBLISH──> Redis ─────┘  (frames from other instances)
/// ```

pub mod event;
pub mod fanout;
pub mod rooms;

pub use event::BoardEvent;
pub use fanout::RedisFanout;
pub use rooms::{Publication, RoomId, RoomRegistry};
