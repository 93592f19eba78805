use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::planner::DEFAULT_REMINDER_THRESHOLD_DAYS;

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "Planner";
const APP_NAME: &str = "planner";
const DEFAULT_PROFILE: &str = "default";

pub const CONFIG_ENV: &str = "PLANNER_CONFIG";
pub const DATA_ENV: &str = "PLANNER_DATA";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        Ok(Self { paths })
    }

    pub fn with_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        if !self.paths.config_file.exists() {
            let mut default_cfg = AppConfig::default();
            default_cfg.post_load(&self.paths)?;
            self.write_default_config(&default_cfg)?;
            tracing::info!(path = %self.paths.config_file.display(), "wrote default config");
            return Ok(default_cfg);
        }

        self.load()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        cfg.post_load(&self.paths)?;
        Ok(cfg)
    }

    fn write_default_config(&self, cfg: &AppConfig) -> Result<()> {
        let toml = toml::to_string_pretty(cfg).context("serializing default config")?;
        if let Some(parent) = self.paths.config_file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = fs::File::create(&self.paths.config_file)
            .with_context(|| format!("creating config {}", self.paths.config_file.display()))?;
        file.write_all(toml.as_bytes())
            .context("writing default config")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let override_config = env::var(CONFIG_ENV).ok().map(PathBuf::from);
        let override_data = env::var(DATA_ENV).ok().map(PathBuf::from);

        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let config_dir = override_config
            .clone()
            .map(|p| {
                if p.is_dir() {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| project_dirs.config_dir().to_path_buf());

        let config_file = override_config
            .filter(|p| p.is_file() || p.extension().is_some())
            .unwrap_or_else(|| config_dir.join("config.toml"));

        let data_dir = override_data.unwrap_or_else(|| project_dirs.data_dir().to_path_buf());
        Ok(Self::rooted(config_dir, config_file, data_dir))
    }

    /// Paths under explicit directories, bypassing XDG discovery.
    pub fn rooted(config_dir: PathBuf, config_file: PathBuf, data_dir: PathBuf) -> Self {
        let database_path = data_dir.join("planner.db");
        Self {
            config_dir,
            config_file,
            data_dir,
            database_path,
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.config_dir, &self.data_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Every task and grocery list is owned by one profile; only the active
    /// profile's rows are visible.
    pub profile: String,
    pub reminders: ReminderOptions,
    pub display: DisplayOptions,
    pub storage: StorageOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: DEFAULT_PROFILE.to_string(),
            reminders: ReminderOptions::default(),
            display: DisplayOptions::default(),
            storage: StorageOptions::default(),
        }
    }
}

impl AppConfig {
    fn post_load(&mut self, paths: &ConfigPaths) -> Result<()> {
        self.storage
            .resolve(paths)
            .context("resolving storage paths")?;
        let trimmed = self.profile.trim();
        if trimmed.is_empty() {
            tracing::warn!("empty profile in config, falling back to '{DEFAULT_PROFILE}'");
            self.profile = DEFAULT_PROFILE.to_string();
        } else if trimmed.len() != self.profile.len() {
            self.profile = trimmed.to_string();
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderOptions {
    pub enabled: bool,
    pub threshold_days: u32,
}

impl Default for ReminderOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_days: DEFAULT_REMINDER_THRESHOLD_DAYS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayOptions {
    /// Prefix each listed row with its short id.
    pub show_ids: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self { show_ids: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    #[serde(skip)]
    pub database_path: PathBuf,
    pub wal_autocheckpoint: u32,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            database_path: PathBuf::new(),
            wal_autocheckpoint: 1000,
        }
    }
}

impl StorageOptions {
    fn resolve(&mut self, paths: &ConfigPaths) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            self.database_path = paths.database_path.clone();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_paths(root: &TempDir) -> ConfigPaths {
        let config_dir = root.path().join("config");
        ConfigPaths::rooted(
            config_dir.clone(),
            config_dir.join("config.toml"),
            root.path().join("data"),
        )
    }

    #[test]
    fn load_or_init_writes_defaults_on_first_run() -> Result<()> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        let loader = ConfigLoader::with_paths(paths.clone());

        let cfg = loader.load_or_init()?;
        assert!(paths.config_file.exists());
        assert_eq!(cfg.profile, "default");
        assert_eq!(cfg.reminders.threshold_days, 3);
        assert!(cfg.reminders.enabled);
        assert_eq!(cfg.storage.database_path, paths.database_path);

        let reloaded = loader.load()?;
        assert_eq!(reloaded.profile, cfg.profile);
        assert_eq!(reloaded.storage.wal_autocheckpoint, 1000);
        Ok(())
    }

    #[test]
    fn partial_config_keeps_defaults_for_missing_sections() -> Result<()> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        paths.ensure_directories()?;
        fs::write(
            &paths.config_file,
            "profile = \"  kitchen \"\n\n[reminders]\nthreshold_days = 7\n",
        )?;

        let cfg = ConfigLoader::with_paths(paths).load_or_init()?;
        assert_eq!(cfg.profile, "kitchen");
        assert_eq!(cfg.reminders.threshold_days, 7);
        assert!(cfg.reminders.enabled);
        assert!(cfg.display.show_ids);
        Ok(())
    }

    #[test]
    fn blank_profile_falls_back_to_default() -> Result<()> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        paths.ensure_directories()?;
        fs::write(&paths.config_file, "profile = \"   \"\n")?;

        let cfg = ConfigLoader::with_paths(paths).load()?;
        assert_eq!(cfg.profile, "default");
        Ok(())
    }

    #[test]
    fn malformed_toml_is_reported() -> Result<()> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        paths.ensure_directories()?;
        fs::write(&paths.config_file, "[reminders\nthreshold_days = ")?;

        let err = ConfigLoader::with_paths(paths)
            .load()
            .expect_err("config should not parse");
        assert!(format!("{err:#}").contains("parsing config toml"));
        Ok(())
    }
}
