//! Shared fixtures for the app-layer tests.

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use crate::app::{App, AppBuilder};
use crate::config::PlannerSettings;
use crate::domain::{ChannelProfile, Credential, ProfileId};
use crate::impls::{ActivityLog, KvStateStore, MemoryKvStore, OfflineGenerator, SimulatedPublisher};
use crate::ports::FixedClock;

pub struct Harness {
    pub app: App,
    pub kv: MemoryKvStore,
    pub log: ActivityLog,
    pub generator: OfflineGenerator,
    pub publisher: Arc<SimulatedPublisher>,
    pub clock: FixedClock,
}

pub fn harness() -> Harness {
    harness_with(PlannerSettings::default())
}

pub fn harness_with(settings: PlannerSettings) -> Harness {
    let kv = MemoryKvStore::new();
    let log = ActivityLog::default();
    let generator = OfflineGenerator::new();
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap());
    let publisher = Arc::new(SimulatedPublisher::new(
        Arc::new(clock.clone()),
        settings.publish_delay(),
    ));

    let app = AppBuilder::new()
        .store(Arc::new(KvStateStore::new(Arc::new(kv.clone()))))
        .generator(Arc::new(generator.clone()))
        .publisher(publisher.clone())
        .clock(Arc::new(clock.clone()))
        .activity_log(log.clone())
        .settings(settings)
        .build()
        .unwrap();

    Harness {
        app,
        kv,
        log,
        generator,
        publisher,
        clock,
    }
}

/// A profile with an AI key and a 1s upload cooldown.
pub fn keyed_profile() -> ChannelProfile {
    let mut profile = ChannelProfile::new(ProfileId::from_ulid(ulid::Ulid::new()), "Test Channel");
    profile.gemini_api_key = Credential::new("test-key");
    profile.auto_upload_delay = 1;
    profile
}
