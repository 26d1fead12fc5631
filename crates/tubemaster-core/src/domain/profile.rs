//! Channel profiles and the app-wide state root.
//!
//! # 認証情報について
//! API キーなどはローカルストアに平文で保存される。
//! メモリ上では `Credential` で包み、`Debug` やログには伏せ字だけを出す。

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ProfileId;

/// Avatar colour tags a new profile picks from.
pub const AVATAR_COLORS: [&str; 4] = ["bg-red-500", "bg-blue-500", "bg-green-500", "bg-purple-500"];

pub const DEMO_PROFILE_NAME: &str = "Demo Channel";
pub const DEMO_AVATAR_COLOR: &str = "bg-indigo-500";
pub const DEFAULT_UPLOAD_DELAY_SECS: u64 = 10;
pub const DEFAULT_TONE: &str = "Hài hước & Năng động";

/// Credential は秘密の文字列
///
/// serde では素の文字列として読み書きする（保存形式は平文）。
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Blank or whitespace only.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// The raw value, for the adapter that sends it.
    pub fn expose(&self) -> &str {
        self.0.trim()
    }

    /// `AIza…9xQ2` style preview for display.
    pub fn masked(&self) -> String {
        let value = self.expose();
        let count = value.chars().count();
        if count == 0 {
            return String::new();
        }
        if count <= 8 {
            return "*".repeat(count);
        }
        let head: String = value.chars().take(4).collect();
        let tail: String = value.chars().skip(count - 4).collect();
        format!("{head}…{tail}")
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.masked())
    }
}

impl From<&str> for Credential {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// ChannelProfile は 1 チャンネル分の設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    pub id: ProfileId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_color: Option<String>,

    #[serde(default)]
    pub youtube_api_key: Credential,
    #[serde(default)]
    pub youtube_client_id: Credential,
    #[serde(default)]
    pub youtube_client_secret: Credential,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub sheet_id: String,
    #[serde(default)]
    pub gemini_api_key: Credential,

    /// Seconds to wait between optimize and upload while the auto-pilot runs.
    #[serde(default = "default_upload_delay")]
    pub auto_upload_delay: u64,
    #[serde(default = "default_tone")]
    pub default_tone: String,

    /// Set by data written with the old obfuscation scheme. Values are read as-is.
    #[serde(default)]
    pub is_encrypted: bool,
}

fn default_upload_delay() -> u64 {
    DEFAULT_UPLOAD_DELAY_SECS
}

fn default_tone() -> String {
    DEFAULT_TONE.to_string()
}

impl ChannelProfile {
    /// Template values with the given id and name.
    pub fn new(id: ProfileId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            avatar_color: None,
            youtube_api_key: Credential::default(),
            youtube_client_id: Credential::default(),
            youtube_client_secret: Credential::default(),
            channel_id: String::new(),
            sheet_id: String::new(),
            gemini_api_key: Credential::default(),
            auto_upload_delay: DEFAULT_UPLOAD_DELAY_SECS,
            default_tone: DEFAULT_TONE.to_string(),
            is_encrypted: false,
        }
    }

    /// The seeded profile used when no state exists yet.
    pub fn demo(id: ProfileId) -> Self {
        let mut profile = Self::new(id, DEMO_PROFILE_NAME);
        profile.description = Some("Default profile".to_string());
        profile.avatar_color = Some(DEMO_AVATAR_COLOR.to_string());
        profile
    }

    /// The AI key, if one is configured.
    pub fn ai_credential(&self) -> Option<&Credential> {
        (!self.gemini_api_key.is_empty()).then_some(&self.gemini_api_key)
    }

    pub fn has_sheet_link(&self) -> bool {
        !self.sheet_id.trim().is_empty()
    }

    /// Cooldown a planner starts with. A stored 0 falls back to the default.
    pub fn initial_upload_delay(&self) -> u64 {
        match self.auto_upload_delay {
            0 => DEFAULT_UPLOAD_DELAY_SECS,
            secs => secs,
        }
    }

    pub fn apply(&mut self, update: ProfileUpdate) {
        let ProfileUpdate {
            name,
            description,
            avatar_color,
            youtube_api_key,
            youtube_client_id,
            youtube_client_secret,
            channel_id,
            sheet_id,
            gemini_api_key,
            auto_upload_delay,
            default_tone,
        } = update;

        if let Some(v) = name {
            self.name = v;
        }
        if let Some(v) = description {
            self.description = (!v.is_empty()).then_some(v);
        }
        if let Some(v) = avatar_color {
            self.avatar_color = Some(v);
        }
        if let Some(v) = youtube_api_key {
            self.youtube_api_key = v;
        }
        if let Some(v) = youtube_client_id {
            self.youtube_client_id = v;
        }
        if let Some(v) = youtube_client_secret {
            self.youtube_client_secret = v;
        }
        if let Some(v) = channel_id {
            self.channel_id = v;
        }
        if let Some(v) = sheet_id {
            self.sheet_id = v;
        }
        if let Some(v) = gemini_api_key {
            self.gemini_api_key = v;
        }
        if let Some(v) = auto_upload_delay {
            self.auto_upload_delay = v;
        }
        if let Some(v) = default_tone {
            self.default_tone = v;
        }
    }
}

/// Partial edit of a profile. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    /// Empty string clears the description.
    pub description: Option<String>,
    pub avatar_color: Option<String>,
    pub youtube_api_key: Option<Credential>,
    pub youtube_client_id: Option<Credential>,
    pub youtube_client_secret: Option<Credential>,
    pub channel_id: Option<String>,
    pub sheet_id: Option<String>,
    pub gemini_api_key: Option<Credential>,
    pub auto_upload_delay: Option<u64>,
    pub default_tone: Option<String>,
}

/// SystemState はアプリ全体の設定のルート
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemState {
    pub profiles: Vec<ChannelProfile>,
    pub active_profile_id: Option<ProfileId>,
    #[serde(default)]
    pub is_encrypted: bool,
}

impl SystemState {
    /// One demo profile, active.
    pub fn seeded(demo_id: ProfileId) -> Self {
        Self {
            profiles: vec![ChannelProfile::demo(demo_id)],
            active_profile_id: Some(demo_id),
            is_encrypted: false,
        }
    }

    pub fn profile(&self, id: ProfileId) -> Option<&ChannelProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    pub fn profile_mut(&mut self, id: ProfileId) -> Option<&mut ChannelProfile> {
        self.profiles.iter_mut().find(|p| p.id == id)
    }

    pub fn active_profile(&self) -> Option<&ChannelProfile> {
        self.active_profile_id.and_then(|id| self.profile(id))
    }

    /// Removes a profile. Returns false when it did not exist.
    ///
    /// If the active profile goes, the first remaining one (or none) becomes active.
    pub fn remove_profile(&mut self, id: ProfileId) -> bool {
        let before = self.profiles.len();
        self.profiles.retain(|p| p.id != id);
        if self.profiles.len() == before {
            return false;
        }
        if self.active_profile_id == Some(id) {
            self.active_profile_id = self.profiles.first().map(|p| p.id);
        }
        true
    }

    /// Whether any stored profile still carries the legacy obfuscation flag.
    pub fn has_legacy_encryption(&self) -> bool {
        self.is_encrypted || self.profiles.iter().any(|p| p.is_encrypted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    fn pid() -> ProfileId {
        ProfileId::from_ulid(Ulid::new())
    }

    #[test]
    fn credential_debug_is_masked() {
        let key = Credential::new("AIzaSyD-secret-value-9xQ2");
        let debug = format!("{key:?}");
        assert!(!debug.contains("secret"));
        assert_eq!(key.masked(), "AIza…9xQ2");
        assert_eq!(Credential::new("short").masked(), "*****");
        assert!(Credential::new("   ").is_empty());
    }

    #[test]
    fn zero_upload_delay_starts_at_default() {
        let mut profile = ChannelProfile::new(pid(), "x");
        profile.auto_upload_delay = 0;
        assert_eq!(profile.initial_upload_delay(), DEFAULT_UPLOAD_DELAY_SECS);
        profile.auto_upload_delay = 4;
        assert_eq!(profile.initial_upload_delay(), 4);
    }

    #[test]
    fn credential_serializes_as_plain_string() {
        let key = Credential::new("abc");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"abc\"");
    }

    #[test]
    fn seeded_state_has_active_demo_profile() {
        let id = pid();
        let state = SystemState::seeded(id);
        let active = state.active_profile().unwrap();
        assert_eq!(active.name, "Demo Channel");
        assert_eq!(active.avatar_color.as_deref(), Some("bg-indigo-500"));
        assert_eq!(active.auto_upload_delay, 10);
        assert!(active.ai_credential().is_none());
    }

    #[test]
    fn removing_active_profile_falls_back_to_first() {
        let (a, b) = (pid(), pid());
        let mut state = SystemState::seeded(a);
        state.profiles.push(ChannelProfile::new(b, "Second"));

        assert!(state.remove_profile(a));
        assert_eq!(state.active_profile_id, Some(b));

        assert!(state.remove_profile(b));
        assert_eq!(state.active_profile_id, None);
        assert!(!state.remove_profile(b));
    }

    #[test]
    fn update_touches_only_given_fields() {
        let mut p = ChannelProfile::new(pid(), "Old");
        p.apply(ProfileUpdate {
            gemini_api_key: Some(Credential::new("k-123")),
            description: Some(String::new()),
            ..Default::default()
        });
        assert_eq!(p.name, "Old");
        assert_eq!(p.ai_credential().map(Credential::expose), Some("k-123"));
        assert!(p.description.is_none());
    }

    #[test]
    fn missing_settings_get_template_defaults() {
        let id = pid();
        let json = format!(r#"{{"id":"{id}","name":"Legacy"}}"#);
        let p: ChannelProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(p.auto_upload_delay, 10);
        assert_eq!(p.default_tone, DEFAULT_TONE);
        assert!(!p.is_encrypted);
    }
}
