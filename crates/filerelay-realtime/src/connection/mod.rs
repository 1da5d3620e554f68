//! WebSocket connection management: handles, pool, heartbeat.

pub mod handle;
pub mod heartbeat;
pub mod pool;

pub use handle::ConnectionHandle;
pub use pool::ConnectionPool;
