//! Service configuration file
//!
//! Optional TOML file; a missing file means defaults. Command-line values
//! are layered on top through `apply_overrides`.

use std::fs;
use std::path::Path;

use crate::models::settings::{AppConfig, SettingsUpdate};
use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Default)]
pub struct ConfigService {
    config: AppConfig,
}

impl ConfigService {
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let config = match path {
            Some(p) if p.exists() => Self::read(p)?,
            Some(p) => {
                tracing::warn!("[config] {} not found, using defaults", p.display());
                AppConfig::default()
            }
            None => AppConfig::default(),
        };
        Ok(Self { config })
    }

    fn read(path: &Path) -> AppResult<AppConfig> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| AppError::config(format!("{}: {}", path.display(), e)))?;
        config.validate().map_err(AppError::config)?;
        tracing::info!("[config] loaded {}", path.display());
        Ok(config)
    }

    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    /// Layer CLI values over the file; the result must still validate.
    pub fn apply_overrides(&mut self, update: SettingsUpdate) -> AppResult<AppConfig> {
        let mut next = self.config.clone();
        next.apply_update(update);
        next.validate().map_err(AppError::config)?;
        self.config = next;
        Ok(self.config.clone())
    }
}
