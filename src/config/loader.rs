//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::{Config, LogFormat};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "PROBE_HARNESS";

/// Config file name
const CONFIG_FILE_NAME: &str = "probe-harness.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "PROBE_HARNESS_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `PROBE_HARNESS_CONFIG` environment variable (explicit path)
    /// 2. `./probe-harness.toml` (current directory)
    /// 3. The platform config directory (`~/.config/probe-harness/` on Linux)
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables override file values, and the result is
    /// validated.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => Config::default(),
        };

        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self { config_path, config })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Built-in defaults plus environment overrides, without looking for a
    /// file.
    pub fn with_defaults() -> ConfigResult<Self> {
        let mut config = Config::default();
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path: None,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Save the current configuration to file.
    pub fn save(&self) -> ConfigResult<()> {
        let path = self.config_path.as_ref().ok_or(ConfigError::NoWriteTarget)?;

        save_to_file(&self.config, path)
    }

    /// Save the current configuration to a specific file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        save_to_file(&self.config, path.as_ref())
    }

    /// Reload configuration from file (if path is set).
    pub fn reload(&mut self) -> ConfigResult<()> {
        if let Some(ref path) = self.config_path {
            let mut config = load_from_file(path)?;
            apply_env_overrides(&mut config)?;
            config.validate()?;
            self.config = config;
        }
        Ok(())
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    get_default_config_path().filter(|p| p.exists())
}

/// Get the default config directory for creating new config files.
pub fn get_default_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "probe-harness").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the default config file path for creating new config files.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_default_config_dir().map(|d| d.join(CONFIG_FILE_NAME))
}

fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|source| ConfigError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

fn save_to_file(config: &Config, path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Unwritable {
            path: path.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Unwritable {
        path: path.to_path_buf(),
        source,
    })
}

fn env_var(key: &str) -> Option<(String, String)> {
    let var = format!("{}_{}", ENV_PREFIX, key);
    std::env::var(&var).ok().map(|val| (var, val))
}

fn parse_env<T>(var: &str, val: &str, expected: &'static str) -> ConfigResult<T>
where
    T: std::str::FromStr,
{
    val.trim()
        .parse()
        .map_err(|_| ConfigError::bad_override(var, val, expected))
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern `PROBE_HARNESS_<SECTION>_<KEY>`:
/// - `PROBE_HARNESS_SERIAL_PORT=/dev/ttyACM0`
/// - `PROBE_HARNESS_SERIAL_BAUD_RATE=57600`
/// - `PROBE_HARNESS_PROTOCOL_READ_DEADLINE_MS=5000`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    if let Some((_, val)) = env_var("SERIAL_PORT") {
        config.serial.port = Some(val).filter(|v| !v.trim().is_empty());
    }
    if let Some((var, val)) = env_var("SERIAL_BAUD_RATE") {
        config.serial.baud_rate = parse_env(&var, &val, "baud rate")?;
    }
    if let Some((var, val)) = env_var("SERIAL_OPEN_TIMEOUT_MS") {
        config.serial.open_timeout_ms = parse_env(&var, &val, "timeout in ms")?;
    }

    if let Some((var, val)) = env_var("PROTOCOL_SETTLE_MS") {
        config.protocol.settle_ms = parse_env(&var, &val, "delay in ms")?;
    }
    if let Some((var, val)) = env_var("PROTOCOL_PRE_FLUSH_MS") {
        config.protocol.pre_flush_ms = parse_env(&var, &val, "delay in ms")?;
    }
    if let Some((var, val)) = env_var("PROTOCOL_READ_DEADLINE_MS") {
        config.protocol.read_deadline_ms = parse_env(&var, &val, "deadline in ms")?;
    }
    if let Some((var, val)) = env_var("PROTOCOL_PWM_TOLERANCE") {
        config.protocol.pwm_tolerance = parse_env(&var, &val, "tolerance")?;
    }
    if let Some((var, val)) = env_var("PROTOCOL_PROBE_TOLERANCE") {
        config.protocol.probe_tolerance = parse_env(&var, &val, "tolerance")?;
    }

    if let Some((_, val)) = env_var("UPLOAD_PROGRAM") {
        config.upload.program = val;
    }

    if let Some((_, val)) = env_var("LOGGING_LEVEL") {
        config.logging.level = val;
    }
    if let Some((var, val)) = env_var("LOGGING_FORMAT") {
        config.logging.format = match val.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            "compact" => LogFormat::Compact,
            _ => return Err(ConfigError::bad_override(var, val, "log format")),
        };
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    #[serial]
    fn test_default_loader() {
        let loader = ConfigLoader::with_defaults().unwrap();
        assert_eq!(loader.config().serial.baud_rate, 115_200);
        assert!(loader.config_path.is_none());
    }

    #[test]
    #[serial]
    fn test_env_override() {
        env::set_var("PROBE_HARNESS_SERIAL_BAUD_RATE", "57600");
        env::set_var("PROBE_HARNESS_SERIAL_PORT", "COM7");

        let loader = ConfigLoader::with_defaults().unwrap();
        assert_eq!(loader.config().serial.baud_rate, 57600);
        assert_eq!(loader.config().serial.port.as_deref(), Some("COM7"));

        env::remove_var("PROBE_HARNESS_SERIAL_BAUD_RATE");
        env::remove_var("PROBE_HARNESS_SERIAL_PORT");
    }

    #[test]
    #[serial]
    fn test_bad_env_value_is_reported() {
        env::set_var("PROBE_HARNESS_PROTOCOL_READ_DEADLINE_MS", "soon");

        let err = ConfigLoader::with_defaults().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::BadOverride { ref value, .. } if value == "soon"
        ));

        env::remove_var("PROBE_HARNESS_PROTOCOL_READ_DEADLINE_MS");
    }

    #[test]
    #[serial]
    fn test_save_writes_back_to_loaded_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe-harness.toml");
        std::fs::write(&path, "[serial]\nport = \"/dev/ttyACM0\"\n").unwrap();

        let mut loader = ConfigLoader::load_from(&path).unwrap();
        loader.config.protocol.read_deadline_ms = 4000;
        loader.save().unwrap();

        let reread = ConfigLoader::load_from(&path).unwrap();
        assert_eq!(reread.config().protocol.read_deadline_ms, 4000);
        assert_eq!(reread.config().serial.port.as_deref(), Some("/dev/ttyACM0"));
    }

    #[test]
    #[serial]
    fn test_save_without_path_fails() {
        let loader = ConfigLoader::with_defaults().unwrap();
        assert!(matches!(loader.save(), Err(ConfigError::NoWriteTarget)));
    }

    #[test]
    #[serial]
    fn test_reload_picks_up_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe-harness.toml");
        std::fs::write(&path, "[protocol]\nsettle_ms = 2000\n").unwrap();
        let mut loader = ConfigLoader::load_from(&path).unwrap();
        assert_eq!(loader.config().protocol.settle_ms, 2000);

        std::fs::write(&path, "[protocol]\nsettle_ms = 250\nprobe_tolerance = 40\n").unwrap();
        loader.reload().unwrap();

        assert_eq!(loader.config().protocol.settle_ms, 250);
        assert_eq!(loader.config().protocol.probe_tolerance, 40);
    }

    #[test]
    #[serial]
    fn test_reload_keeps_old_config_on_bad_edit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe-harness.toml");
        std::fs::write(&path, "[serial]\nbaud_rate = 9600\n").unwrap();
        let mut loader = ConfigLoader::load_from(&path).unwrap();

        std::fs::write(&path, "[serial\nbaud_rate = 57600\n").unwrap();
        let err = loader.reload().unwrap_err();

        match err {
            ConfigError::Malformed { path: failed, .. } => assert_eq!(failed, path),
            other => panic!("expected Malformed, got {:?}", other),
        }
        assert_eq!(loader.config().serial.baud_rate, 9600);
    }

    #[test]
    #[serial]
    fn test_load_from_file_and_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe-harness.toml");
        std::fs::write(
            &path,
            "[protocol]\nsettle_ms = 0\nprobe_tolerance = 25\n",
        )
        .unwrap();

        let loader = ConfigLoader::load_from(&path).unwrap();
        assert_eq!(loader.config().protocol.settle_ms, 0);
        assert_eq!(loader.config().protocol.probe_tolerance, 25);

        let copy = dir.path().join("nested").join("copy.toml");
        loader.save_to(&copy).unwrap();
        let reloaded = ConfigLoader::load_from(&copy).unwrap();
        assert_eq!(reloaded.config().protocol, loader.config().protocol);
    }

    #[test]
    #[serial]
    fn test_invalid_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[serial]\nbaud_rate = 0\n").unwrap();

        let err = ConfigLoader::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { key: "baud_rate", .. }));
    }

    #[test]
    #[serial]
    fn test_explicit_path_env_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("explicit.toml");
        std::fs::write(&path, "[serial]\nbaud_rate = 9600\n").unwrap();
        env::set_var(CONFIG_PATH_ENV, &path);

        assert_eq!(resolve_config_path(), Some(path.clone()));
        let loader = ConfigLoader::load().unwrap();
        assert_eq!(loader.config().serial.baud_rate, 9600);

        env::remove_var(CONFIG_PATH_ENV);
    }
}
