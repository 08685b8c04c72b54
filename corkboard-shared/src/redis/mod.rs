/// Redis integration
///
/// Corkboard uses Redis pub/sub to fan room broadcasts out across server
/// instances: every local room publish is also PUBLISHed on a shared
/// channel, and a background subscriber feeds frames from other instances
/// into the local room registry. Delivery is at-most-once with no
/// persistence; a reconnecting client re-fetches board state instead of
/// replaying missed events.
///
/// # Example
///
/// ```no_run
/// use corkboard_shared::redis::client::{RedisClient, RedisConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = RedisConfig::from_env()?;
/// let client = RedisClient::new(config).await?;
///
/// let healthy = client.ping().await?;
/// println!("Redis healthy: {}", healthy);
/// # Ok(())
/// # }
/// ```

pub mod client;

pub use client::{RedisClient, RedisClientError, RedisConfig};
