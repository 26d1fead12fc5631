//! SimulatedPublisher - 実際にはアップロードしない Publisher
//!
//! 一定時間待ってから `v` + 5 桁の仮 video id を返す。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::domain::SheetRow;
use crate::ports::{Clock, Publication, PublishError, Publisher};

pub const DEFAULT_PUBLISH_DELAY: Duration = Duration::from_millis(1500);

pub struct SimulatedPublisher {
    clock: Arc<dyn Clock>,
    delay: Duration,
    fail_next: AtomicBool,
}

impl SimulatedPublisher {
    pub fn new(clock: Arc<dyn Clock>, delay: Duration) -> Self {
        Self {
            clock,
            delay,
            fail_next: AtomicBool::new(false),
        }
    }

    /// The next publish call fails once.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

/// `v` + last five digits of the epoch milliseconds.
pub fn placeholder_video_id(epoch_ms: i64) -> String {
    format!("v{:05}", epoch_ms.rem_euclid(100_000))
}

#[async_trait::async_trait]
impl Publisher for SimulatedPublisher {
    async fn publish(&self, row: &SheetRow) -> Result<Publication, PublishError> {
        tokio::time::sleep(self.delay).await;

        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(PublishError(format!("simulated failure for {}", row.id)));
        }

        let now = self.clock.now();
        let video_id = placeholder_video_id(now.timestamp_millis());
        tracing::debug!(row = %row.id, video_id, "simulated upload");
        Ok(Publication {
            video_id,
            published_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RowId;
    use crate::ports::FixedClock;
    use chrono::{TimeZone, Utc};
    use ulid::Ulid;

    #[test]
    fn video_id_is_v_plus_five_digits() {
        assert_eq!(placeholder_video_id(1_700_000_012_345), "v12345");
        assert_eq!(placeholder_video_id(1_700_000_000_042), "v00042");
    }

    #[tokio::test(start_paused = true)]
    async fn publish_waits_then_returns_placeholder() {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let publisher = SimulatedPublisher::new(Arc::new(FixedClock::new(at)), DEFAULT_PUBLISH_DELAY);
        let row = SheetRow::pending(RowId::from_ulid(Ulid::new()), "t");

        let started = tokio::time::Instant::now();
        let publication = publisher.publish(&row).await.unwrap();
        assert!(started.elapsed() >= DEFAULT_PUBLISH_DELAY);
        assert_eq!(publication.published_at, at);
        assert_eq!(publication.video_id.len(), 6);

        publisher.fail_next();
        assert!(publisher.publish(&row).await.is_err());
        assert!(publisher.publish(&row).await.is_ok());
    }
}
