//! ProfileService - チャンネルプロファイルの管理
//!
//! SystemState を唯一の正本としてメモリに持ち、変更のたびに保存する。
//! 変更は clone に対して行い、保存に成功してから差し替える。

use rand::seq::SliceRandom;
use tokio::sync::Mutex;

use crate::app::AppContext;
use crate::domain::profile::AVATAR_COLORS;
use crate::domain::{ChannelProfile, LogLevel, ProfileId, ProfileUpdate, SystemState};
use crate::error::{Result, TubeError};
use crate::ports::{IdGenerator, StateStore};

pub struct ProfileService {
    ctx: AppContext,
    state: Mutex<SystemState>,
}

impl ProfileService {
    /// Reads the stored state. Missing or unreadable state is replaced by a seeded one.
    pub async fn load(ctx: AppContext) -> Result<Self> {
        let state = match ctx.store.load_system().await {
            Ok(Some(state)) => {
                if state.has_legacy_encryption() {
                    ctx.log(
                        LogLevel::Warning,
                        "Stored credentials are flagged as obfuscated by an older version; they are used as stored.",
                    );
                }
                state
            }
            Ok(None) => {
                let state = SystemState::seeded(ctx.ids.profile_id());
                ctx.store.save_system(&state).await?;
                tracing::info!("seeded default profile");
                state
            }
            Err(e) if e.is_corrupt() => {
                ctx.log(
                    LogLevel::Warning,
                    format!("System state was unreadable and has been reset ({e})."),
                );
                let state = SystemState::seeded(ctx.ids.profile_id());
                ctx.store.save_system(&state).await?;
                state
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            ctx,
            state: Mutex::new(state),
        })
    }

    pub async fn snapshot(&self) -> SystemState {
        self.state.lock().await.clone()
    }

    pub async fn list(&self) -> Vec<ChannelProfile> {
        self.state.lock().await.profiles.clone()
    }

    pub async fn get(&self, id: ProfileId) -> Result<ChannelProfile> {
        self.state
            .lock()
            .await
            .profile(id)
            .cloned()
            .ok_or(TubeError::ProfileNotFound(id))
    }

    pub async fn active(&self) -> Result<ChannelProfile> {
        self.state
            .lock()
            .await
            .active_profile()
            .cloned()
            .ok_or(TubeError::NoActiveProfile)
    }

    /// New profile with template settings. It becomes the active one.
    pub async fn add(&self, name: Option<String>) -> Result<ChannelProfile> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();

        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("New Channel {}", next.profiles.len() + 1));
        let mut profile = ChannelProfile::new(self.ctx.ids.profile_id(), name);
        profile.avatar_color = AVATAR_COLORS
            .choose(&mut rand::thread_rng())
            .map(|c| c.to_string());

        next.profiles.push(profile.clone());
        next.active_profile_id = Some(profile.id);
        self.ctx.store.save_system(&next).await?;
        *state = next;

        tracing::info!(profile = %profile.id, name = %profile.name, "profile added");
        Ok(profile)
    }

    pub async fn update(&self, id: ProfileId, update: ProfileUpdate) -> Result<ChannelProfile> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let profile = next.profile_mut(id).ok_or(TubeError::ProfileNotFound(id))?;
        profile.apply(update);
        let updated = profile.clone();

        self.ctx.store.save_system(&next).await?;
        *state = next;
        Ok(updated)
    }

    /// Removes a profile. Its rows, scripts and audit stay in the store.
    pub async fn delete(&self, id: ProfileId) -> Result<()> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        if !next.remove_profile(id) {
            return Err(TubeError::ProfileNotFound(id));
        }
        self.ctx.store.save_system(&next).await?;
        *state = next;
        tracing::info!(profile = %id, "profile deleted");
        Ok(())
    }

    pub async fn switch(&self, id: ProfileId) -> Result<ChannelProfile> {
        let mut state = self.state.lock().await;
        let profile = state
            .profile(id)
            .cloned()
            .ok_or(TubeError::ProfileNotFound(id))?;
        let mut next = state.clone();
        next.active_profile_id = Some(id);
        self.ctx.store.save_system(&next).await?;
        *state = next;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::harness;
    use crate::domain::Credential;
    use crate::impls::kv_state_store::SYSTEM_KEY;
    use crate::ports::KeyValueStore;

    #[tokio::test]
    async fn first_load_seeds_and_saves_demo_profile() {
        let h = harness();
        let service = h.app.profiles().await.unwrap();
        let active = service.active().await.unwrap();
        assert_eq!(active.name, "Demo Channel");
        assert!(h.kv.snapshot(SYSTEM_KEY).is_some());

        // second load reads the same state
        let again = h.app.profiles().await.unwrap();
        assert_eq!(again.active().await.unwrap().id, active.id);
    }

    #[tokio::test]
    async fn corrupt_state_is_reseeded_with_warning() {
        let h = harness();
        h.kv.put(SYSTEM_KEY, "{broken".into()).await.unwrap();
        let service = h.app.profiles().await.unwrap();
        assert_eq!(service.list().await.len(), 1);
        assert!(h.log.contains("reset"));
    }

    #[tokio::test]
    async fn add_names_and_activates_new_profile() {
        let h = harness();
        let service = h.app.profiles().await.unwrap();
        let added = service.add(None).await.unwrap();
        assert_eq!(added.name, "New Channel 2");
        assert_eq!(added.auto_upload_delay, 10);
        assert!(AVATAR_COLORS.contains(&added.avatar_color.as_deref().unwrap()));
        assert_eq!(service.active().await.unwrap().id, added.id);

        let named = service.add(Some("  Cooking  ".into())).await.unwrap();
        assert_eq!(named.name, "Cooking");
    }

    #[tokio::test]
    async fn delete_active_falls_back_and_switch_persists() {
        let h = harness();
        let service = h.app.profiles().await.unwrap();
        let demo = service.active().await.unwrap();
        let second = service.add(Some("Second".into())).await.unwrap();

        service.switch(demo.id).await.unwrap();
        service.delete(demo.id).await.unwrap();
        assert_eq!(service.active().await.unwrap().id, second.id);

        let reloaded = h.app.profiles().await.unwrap();
        assert_eq!(reloaded.list().await.len(), 1);
        assert!(matches!(
            reloaded.delete(demo.id).await,
            Err(TubeError::ProfileNotFound(_))
        ));
    }

    #[tokio::test]
    async fn update_saves_credential() {
        let h = harness();
        let service = h.app.profiles().await.unwrap();
        let id = service.active().await.unwrap().id;
        service
            .update(
                id,
                ProfileUpdate {
                    gemini_api_key: Some(Credential::new("key-1")),
                    auto_upload_delay: Some(3),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let reloaded = h.app.profiles().await.unwrap();
        let profile = reloaded.get(id).await.unwrap();
        assert_eq!(profile.gemini_api_key.expose(), "key-1");
        assert_eq!(profile.auto_upload_delay, 3);
    }

    #[tokio::test]
    async fn legacy_flag_logs_warning() {
        let h = harness();
        let service = h.app.profiles().await.unwrap();
        let mut state = service.snapshot().await;
        state.is_encrypted = true;
        h.app.context().store.save_system(&state).await.unwrap();

        h.app.profiles().await.unwrap();
        assert!(h.log.contains("obfuscated"));
    }
}
