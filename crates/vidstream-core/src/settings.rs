use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::errors::VidstreamError;
use crate::join::UserRole;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Settings {
    /// Application id handed to the engine factory.
    #[serde(default)]
    pub app_id: String,
    /// Channel token; `None` for projects without token auth.
    #[serde(default)]
    pub app_token: Option<String>,
    #[serde(default)]
    pub last_channel_name: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub mic_muted_on_join: bool,
    #[serde(default)]
    pub camera_muted_on_join: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            app_token: None,
            last_channel_name: None,
            role: UserRole::Broadcaster,
            mic_muted_on_join: false,
            camera_muted_on_join: false,
        }
    }
}

/// JSON-backed settings persisted under the app data directory.
pub struct SettingsStore {
    settings: Mutex<Settings>,
    file_path: PathBuf,
}

impl SettingsStore {
    pub fn new(data_dir: &str) -> Self {
        let file_path = PathBuf::from(data_dir).join("settings.json");
        let settings = Self::load(&file_path);
        Self {
            settings: Mutex::new(settings),
            file_path,
        }
    }

    pub fn get(&self) -> Settings {
        self.lock().clone()
    }

    pub fn set_app_credentials(&self, app_id: String, app_token: Option<String>) -> Result<(), VidstreamError> {
        {
            let mut s = self.lock();
            s.app_id = app_id;
            s.app_token = app_token;
        }
        self.save()
    }

    pub fn set_last_channel_name(&self, name: Option<String>) -> Result<(), VidstreamError> {
        self.lock().last_channel_name = name;
        self.save()
    }

    pub fn set_role(&self, role: UserRole) -> Result<(), VidstreamError> {
        self.lock().role = role;
        self.save()
    }

    pub fn set_mic_muted_on_join(&self, muted: bool) -> Result<(), VidstreamError> {
        self.lock().mic_muted_on_join = muted;
        self.save()
    }

    pub fn set_camera_muted_on_join(&self, muted: bool) -> Result<(), VidstreamError> {
        self.lock().camera_muted_on_join = muted;
        self.save()
    }

    fn lock(&self) -> MutexGuard<'_, Settings> {
        match self.settings.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn save(&self) -> Result<(), VidstreamError> {
        let settings = self.get();
        if let Some(parent) = self.file_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| VidstreamError::Settings(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(&settings)
            .map_err(|e| VidstreamError::Settings(e.to_string()))?;
        std::fs::write(&self.file_path, json).map_err(|e| VidstreamError::Settings(e.to_string()))
    }

    fn load(path: &Path) -> Settings {
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("corrupt settings file {}: {e}", path.display());
                Settings::default()
            }),
            Err(_) => Settings::default(),
        }
    }
}
