//! Status reporting seam.

use async_trait::async_trait;

use crate::error::SinkResult;

/// Receives debounced health transitions.
///
/// The monitor calls `report` only when the computed status differs from
/// the last one it reported. Encoding the flag for the wire is up to the
/// implementation.
#[async_trait]
pub trait StatusSink: Send {
    async fn report(&mut self, healthy: bool) -> SinkResult<()>;
}

/// Sink used when no reporting channel is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

#[async_trait]
impl StatusSink for NoopSink {
    async fn report(&mut self, _healthy: bool) -> SinkResult<()> {
        Ok(())
    }
}
