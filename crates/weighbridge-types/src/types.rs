use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Output format for CLI results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Status letter reported by the scale indicator in each frame.
///
/// `P` (print) and `T` (total) mean the platform has settled and the
/// reading may be used for a transaction; any other letter means the
/// load is still in motion and the reading is display-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    Print,
    Total,
    /// Indicator letter outside the settled set, carried verbatim.
    Motion(char),
}

impl DeviceStatus {
    pub fn from_code(code: char) -> Self {
        match code {
            'P' => DeviceStatus::Print,
            'T' => DeviceStatus::Total,
            other => DeviceStatus::Motion(other),
        }
    }

    /// Raw status letter as sent by the device.
    pub fn code(&self) -> char {
        match self {
            DeviceStatus::Print => 'P',
            DeviceStatus::Total => 'T',
            DeviceStatus::Motion(c) => *c,
        }
    }

    /// Whether the platform has settled enough to record this reading.
    pub fn is_stable(&self) -> bool {
        matches!(self, DeviceStatus::Print | DeviceStatus::Total)
    }
}

/// One decoded reading from the indicator. Ephemeral: produced per
/// frame, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeightSample {
    /// Weight in kilograms, rounded to the nearest 5 kg.
    pub kg: i32,
    pub status: DeviceStatus,
}

impl WeightSample {
    pub fn is_stable(&self) -> bool {
        self.status.is_stable()
    }
}

/// Lifecycle status of a weigh record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordStatus {
    #[default]
    Pending,
    Completed,
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordStatus::Pending => write!(f, "PENDING"),
            RecordStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}

impl std::str::FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(RecordStatus::Pending),
            "COMPLETED" => Ok(RecordStatus::Completed),
            other => Err(format!("unknown record status: {other}")),
        }
    }
}

/// Parity setting for the serial link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    #[default]
    Even,
    Odd,
}

impl std::fmt::Display for Parity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Parity::None => write!(f, "none"),
            Parity::Even => write!(f, "even"),
            Parity::Odd => write!(f, "odd"),
        }
    }
}

impl std::str::FromStr for Parity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Parity::None),
            "even" => Ok(Parity::Even),
            "odd" => Ok(Parity::Odd),
            other => Err(format!("unknown parity: {other}")),
        }
    }
}

/// Serial link parameters, loaded once at startup and immutable for the
/// lifetime of a reader instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialConfig {
    #[serde(default = "default_port_name")]
    pub port_name: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_data_bits")]
    pub data_bits: u8,

    /// 1 or 2.
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,

    #[serde(default)]
    pub parity: Parity,
}

fn default_port_name() -> String {
    "COM1".to_string()
}

fn default_baud_rate() -> u32 {
    2400
}

fn default_data_bits() -> u8 {
    7
}

fn default_stop_bits() -> u8 {
    1
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port_name: default_port_name(),
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            stop_bits: default_stop_bits(),
            parity: Parity::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_status_letters() {
        assert!(DeviceStatus::from_code('P').is_stable());
        assert!(DeviceStatus::from_code('T').is_stable());
        assert!(!DeviceStatus::from_code('M').is_stable());
        assert!(!DeviceStatus::from_code('U').is_stable());
    }

    #[test]
    fn test_status_code_round_trip() {
        for c in ['P', 'T', 'M', 'X'] {
            assert_eq!(DeviceStatus::from_code(c).code(), c);
        }
    }

    #[test]
    fn test_record_status_display_parse() {
        assert_eq!(RecordStatus::Pending.to_string(), "PENDING");
        assert_eq!(
            "COMPLETED".parse::<RecordStatus>().unwrap(),
            RecordStatus::Completed
        );
        assert!("DONE".parse::<RecordStatus>().is_err());
    }

    #[test]
    fn test_serial_config_defaults() {
        let cfg = SerialConfig::default();
        assert_eq!(cfg.baud_rate, 2400);
        assert_eq!(cfg.data_bits, 7);
        assert_eq!(cfg.stop_bits, 1);
        assert_eq!(cfg.parity, Parity::Even);
    }
}
