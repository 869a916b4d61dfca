//! How the driver yields between chunks.

use std::time::Duration;

use async_trait::async_trait;

/// Called by the driver after every chunk.
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Yield for roughly `interval` before the next chunk starts.
    async fn between_chunks(&self, interval: Duration);
}

/// Sleeps for the requested interval.
#[derive(Debug, Default, Clone, Copy)]
pub struct IntervalScheduler;

#[async_trait]
impl Scheduler for IntervalScheduler {
    async fn between_chunks(&self, interval: Duration) {
        if interval.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(interval).await;
        }
    }
}

/// Ignores the interval and only yields to the runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateScheduler;

#[async_trait]
impl Scheduler for ImmediateScheduler {
    async fn between_chunks(&self, _interval: Duration) {
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_interval_scheduler_sleeps() {
        let start = Instant::now();
        IntervalScheduler
            .between_chunks(Duration::from_millis(30))
            .await;
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_immediate_scheduler_ignores_interval() {
        let start = Instant::now();
        ImmediateScheduler
            .between_chunks(Duration::from_secs(60))
            .await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
