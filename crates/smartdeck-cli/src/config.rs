//! Deck configuration loading – reads `smartdeck.toml` and layers environment
//! and command-line overrides on top.

use std::fs;
use std::path::Path;

use smartdeck_types::DeckConfig;

/// Load the config from `path`.  Returns `None` if the file does not exist.
///
/// `SMARTDECK_*` environment overrides are applied to a loaded file.
pub fn load_from(path: &Path) -> Result<Option<DeckConfig>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: DeckConfig =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Load `path`, falling back to the default (vehicle-less) config with
/// environment overrides when the file is missing.
pub fn load_or_default(path: &Path) -> Result<DeckConfig, String> {
    match load_from(path)? {
        Some(cfg) => Ok(cfg),
        None => {
            let mut cfg = DeckConfig::default();
            apply_env_overrides(&mut cfg);
            Ok(cfg)
        }
    }
}

/// Apply `SMARTDECK_*` environment variable overrides to `cfg`.
///
/// Supported variables:
///
/// | Variable | Config field |
/// |---|---|
/// | `SMARTDECK_SERIAL_PORT` | `serial.port` |
/// | `SMARTDECK_BAUD_RATE` | `serial.baud_rate` |
/// | `SMARTDECK_CONTROLLER_COUNT` | `controller_count` |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut DeckConfig) {
    if let Ok(v) = std::env::var("SMARTDECK_SERIAL_PORT") {
        cfg.serial.port = Some(v);
    }
    if let Ok(v) = std::env::var("SMARTDECK_BAUD_RATE")
        && let Ok(baud) = v.parse::<u32>()
    {
        cfg.serial.baud_rate = baud;
    }
    if let Ok(v) = std::env::var("SMARTDECK_CONTROLLER_COUNT")
        && let Ok(count) = v.parse::<u8>()
    {
        cfg.controller_count = count;
    }
}

/// Apply `--serial` and `--device`.  `device` replaces the device type of
/// every configured vehicle.
pub fn apply_cli_overrides(cfg: &mut DeckConfig, serial: Option<&str>, device: Option<&str>) {
    if let Some(port) = serial {
        cfg.serial.port = Some(port.to_string());
    }
    if let Some(device) = device {
        for vehicle in &mut cfg.vehicles {
            vehicle.device_type = device.to_string();
        }
    }
}
