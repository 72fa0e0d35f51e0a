//! Configuration – reads/writes `~/.scs/config.toml`.
//!
//! Every section is optional in the file; missing keys take the competition
//! defaults.

use std::fs;
use std::path::{Path, PathBuf};

use scs_perception::{ColorConfig, FusionConfig};
use scs_runtime::{IntakeConfig, PerceptionTaskConfig, TunerConfig};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Persisted configuration of the whole core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding calibration records such as the tuned gains.
    pub calibration_dir: PathBuf,
    /// Distance driven by `/tune` when none is given.
    pub tune_distance: f64,
    pub fusion: FusionConfig,
    pub color: ColorConfig,
    pub perception: PerceptionTaskConfig,
    pub tuner: TunerConfig,
    pub intake: IntakeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            calibration_dir: scs_dir_for_home(&home_dir()).join("calibration"),
            tune_distance: 24.0,
            fusion: FusionConfig::default(),
            color: ColorConfig::default(),
            perception: PerceptionTaskConfig::default(),
            tuner: TunerConfig::default(),
            intake: IntakeConfig::default(),
        }
    }
}

fn home_dir() -> String {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string())
}

fn scs_dir_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".scs")
}

/// `~/.scs/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(&home_dir())
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    scs_dir_for_home(home).join("config.toml")
}

/// Load the config.  `Ok(None)` when no file exists yet.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {e}", path.display()))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {e}"))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `SCS_*` environment overrides.
///
/// | Variable | Field |
/// |---|---|
/// | `SCS_TEAM_COLOR` | `color.team_color` (`red` / `blue`) |
/// | `SCS_ALLIANCE_COLOR` | `intake.alliance_color` (`red` / `blue` / `neutral`) |
/// | `SCS_CALIBRATION_DIR` | `calibration_dir` |
/// | `SCS_FUSION_ALPHA` | `fusion.alpha` |
///
/// Unparseable values are logged and ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    apply_overrides_from(cfg, |key| std::env::var(key).ok());
}

pub(crate) fn apply_overrides_from(cfg: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("SCS_TEAM_COLOR") {
        match v.parse() {
            Ok(team) => cfg.color.team_color = team,
            Err(e) => warn!(error = %e, "ignoring SCS_TEAM_COLOR"),
        }
    }
    if let Some(v) = lookup("SCS_ALLIANCE_COLOR") {
        match v.parse() {
            Ok(color) => cfg.intake.alliance_color = color,
            Err(e) => warn!(error = %e, "ignoring SCS_ALLIANCE_COLOR"),
        }
    }
    if let Some(v) = lookup("SCS_CALIBRATION_DIR")
        && !v.trim().is_empty()
    {
        cfg.calibration_dir = PathBuf::from(v);
    }
    if let Some(v) = lookup("SCS_FUSION_ALPHA") {
        match v.trim().parse::<f64>() {
            Ok(alpha) if (0.0..=1.0).contains(&alpha) => cfg.fusion.alpha = alpha,
            _ => warn!(value = %v, "ignoring SCS_FUSION_ALPHA, expected a number in [0, 1]"),
        }
    }
}

/// Save the config, creating `~/.scs/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {e}"))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {e}"))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {e}"))?;
    write_private(path, raw.as_bytes())
        .map_err(|e| format!("Failed to write config at {}: {e}", path.display()))
}

#[cfg(unix)]
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?
        .write_all(bytes)
}

#[cfg(not(unix))]
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    fs::write(path, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scs_types::{SortColor, TeamColor};
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let cfg = Config::default();
        save_to(&cfg, &path).expect("save");
        let loaded = load_from(&path).expect("load ok").expect("some");

        assert_eq!(loaded.tune_distance, 24.0);
        assert_eq!(loaded.tuner.storage_key, "ai_pid.txt");
        assert_eq!(loaded.intake.jam_check_ms, 300);
        assert_eq!(loaded.color.debounce_count, 4);
    }

    #[cfg(unix)]
    #[test]
    fn config_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        save_to(&Config::default(), &path).expect("save");

        let file_mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        let dir_mode = fs::metadata(path.parent().unwrap()).unwrap().permissions().mode() & 0o777;
        assert_eq!(dir_mode, 0o700);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "tune_distance = 36.0\n\n[color]\nteam_color = \"blue\"\n\n[intake]\nreject_pause_ms = 120\n",
        )
        .unwrap();

        let cfg = load_from(&path).unwrap().unwrap();
        assert_eq!(cfg.tune_distance, 36.0);
        assert_eq!(cfg.color.team_color, TeamColor::Blue);
        assert_eq!(cfg.color.window, 5);
        assert_eq!(cfg.intake.reject_pause_ms, 120);
        assert_eq!(cfg.intake.cycle_ms, 20);
        assert_eq!(cfg.fusion.alpha, 0.85);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "tune_distance = \"far\"").unwrap();
        assert!(load_from(&path).is_err());
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn config_path_points_to_scs_dir() {
        let p = config_path_for_home("/home/driver");
        assert_eq!(p, PathBuf::from("/home/driver/.scs/config.toml"));
    }

    #[test]
    fn overrides_apply_every_variable() {
        let mut cfg = Config::default();
        apply_overrides_from(
            &mut cfg,
            env(&[
                ("SCS_TEAM_COLOR", "Blue"),
                ("SCS_ALLIANCE_COLOR", "neutral"),
                ("SCS_CALIBRATION_DIR", "/usd"),
                ("SCS_FUSION_ALPHA", "0.9"),
            ]),
        );
        assert_eq!(cfg.color.team_color, TeamColor::Blue);
        assert_eq!(cfg.intake.alliance_color, SortColor::Neutral);
        assert_eq!(cfg.calibration_dir, PathBuf::from("/usd"));
        assert_eq!(cfg.fusion.alpha, 0.9);
    }

    #[test]
    fn invalid_overrides_are_ignored() {
        let mut cfg = Config::default();
        let original = cfg.clone();
        apply_overrides_from(
            &mut cfg,
            env(&[
                ("SCS_TEAM_COLOR", "green"),
                ("SCS_ALLIANCE_COLOR", "purple"),
                ("SCS_CALIBRATION_DIR", "  "),
                ("SCS_FUSION_ALPHA", "1.5"),
            ]),
        );
        assert_eq!(cfg, original);
    }

    #[test]
    fn no_overrides_leaves_config_untouched() {
        let mut cfg = Config::default();
        let original = cfg.clone();
        apply_overrides_from(&mut cfg, env(&[]));
        assert_eq!(cfg, original);
    }
}
