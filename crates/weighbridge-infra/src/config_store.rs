//! Key/value configuration store
//!
//! Config stored at `~/.config/weighbridge/config.json`, a flat
//! key/value map. The serial link parameters live here under
//! `com_port`, `baud_rate`, `data_bits`, `stop_bits`, `parity`; the UI
//! keeps its own keys (e.g. `ui_scale_factor`) in the same file.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::debug;

use weighbridge_types::{ConfigError, Parity, SerialConfig};

pub struct ConfigStore {
    config_path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl ConfigStore {
    /// Default config directory under the platform config dir.
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        let dir = dirs::config_dir()
            .ok_or(ConfigError::NotFound)?
            .join("weighbridge");
        Ok(dir)
    }

    /// Open the store in the default location.
    pub fn open_default() -> Result<Self, ConfigError> {
        Self::open(Self::default_dir()?)
    }

    /// Create or load a store at `config_dir/config.json`.
    pub fn open(config_dir: PathBuf) -> Result<Self, ConfigError> {
        fs::create_dir_all(&config_dir)?;
        let config_path = config_dir.join("config.json");

        let values = if config_path.exists() {
            let file = File::open(&config_path)?;
            let reader = BufReader::new(file);
            serde_json::from_reader(reader)?
        } else {
            BTreeMap::new()
        };

        debug!(path = %config_path.display(), "config store opened");
        Ok(Self {
            config_path,
            values: Mutex::new(values),
        })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| ConfigError::Parse("config lock poisoned".to_string()))?;
        values.insert(key.to_string(), value.to_string());

        let file = File::create(&self.config_path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &*values)?;
        Ok(())
    }

    /// Build the serial configuration from the stored keys, falling
    /// back to the shipped defaults for anything missing.
    pub fn load_serial_config(&self) -> Result<SerialConfig, ConfigError> {
        let mut cfg = SerialConfig::default();

        if let Some(port) = self.get("com_port") {
            cfg.port_name = port;
        }
        if let Some(v) = self.get("baud_rate") {
            cfg.baud_rate = parse_key("baud_rate", &v)?;
        }
        if let Some(v) = self.get("data_bits") {
            cfg.data_bits = parse_key("data_bits", &v)?;
        }
        if let Some(v) = self.get("stop_bits") {
            cfg.stop_bits = parse_key("stop_bits", &v)?;
        }
        if let Some(v) = self.get("parity") {
            cfg.parity = v
                .parse::<Parity>()
                .map_err(ConfigError::Parse)?;
        }

        Ok(cfg)
    }

    pub fn save_serial_config(&self, cfg: &SerialConfig) -> Result<(), ConfigError> {
        self.set("com_port", &cfg.port_name)?;
        self.set("baud_rate", &cfg.baud_rate.to_string())?;
        self.set("data_bits", &cfg.data_bits.to_string())?;
        self.set("stop_bits", &cfg.stop_bits.to_string())?;
        self.set("parity", &cfg.parity.to_string())?;
        Ok(())
    }

    /// UI scale factor passthrough; defaults to 1.0 when unset or
    /// unparseable.
    pub fn ui_scale_factor(&self) -> f64 {
        self.get("ui_scale_factor")
            .and_then(|v| v.parse().ok())
            .unwrap_or(1.0)
    }
}

fn parse_key<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Parse(format!("invalid {key}: '{value}'")))
}
