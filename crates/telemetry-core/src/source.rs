//! Trait abstraction for sensor sample producers.
//!
//! Hardware drivers live outside this crate. Anything that can produce one
//! scalar sample on demand implements [`SensorSource`] and can be polled by
//! the agent's collector; [`SimulatedSource`](crate::SimulatedSource) and
//! [`ScriptedSource`](crate::ScriptedSource) are the in-tree implementations.

use async_trait::async_trait;

use crate::error::Result;

/// Trait abstracting a single-value sensor.
///
/// # Example
///
/// ```ignore
/// use telemetry_core::{SensorSource, StreamTracker, Result};
///
/// async fn sample_once<S: SensorSource>(source: &S, tracker: &mut StreamTracker) -> Result<()> {
///     let value = source.read().await?;
///     tracker.track(value);
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait SensorSource: Send + Sync {
    /// Human-readable source name, used in logs.
    fn name(&self) -> &str;

    /// Read one sample.
    ///
    /// Implementations should return finite values; the tracker does not
    /// filter them.
    async fn read(&self) -> Result<f32>;
}
