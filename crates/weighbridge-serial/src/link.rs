//! Serial port seam
//!
//! The reader only sees the [`WeighPort`] / [`PortOpener`] traits, so it
//! can be driven by a scripted port in tests and by a real
//! `serialport` device in production. The hardware port is opened with
//! a finite read timeout: a timed-out read reports zero bytes, which
//! lets the read loop observe a stop request in bounded time without
//! busy-spinning.

use std::io::Read;
use std::time::Duration;

use tracing::{debug, info};

use weighbridge_types::{LinkError, Parity, SerialConfig};

/// How long one blocking read waits for bytes before reporting none.
/// Bounds the reader's reaction time to `stop()`.
pub const READ_POLL: Duration = Duration::from_millis(200);

/// One open byte-oriented link to the indicator.
pub trait WeighPort: Send {
    /// Read available bytes into `buf`.
    ///
    /// `Ok(0)` means no data arrived within the poll window; callers
    /// must treat it as "try again", never as end-of-stream. The port
    /// is closed by dropping it.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError>;
}

/// Opens a fresh link. Called again by the reader after every link
/// failure; does not retry internally.
pub trait PortOpener: Send {
    fn open(&self) -> Result<Box<dyn WeighPort>, LinkError>;

    /// Port identifier for log messages.
    fn port_name(&self) -> &str;
}

/// `serialport`-backed opener configured from [`SerialConfig`].
pub struct SerialPortOpener {
    config: SerialConfig,
}

impl SerialPortOpener {
    pub fn new(config: SerialConfig) -> Self {
        Self { config }
    }
}

impl PortOpener for SerialPortOpener {
    fn open(&self) -> Result<Box<dyn WeighPort>, LinkError> {
        let cfg = &self.config;
        let open_failed = |reason: String| LinkError::OpenFailed {
            port: cfg.port_name.clone(),
            reason,
        };

        let data_bits = match cfg.data_bits {
            5 => serialport::DataBits::Five,
            6 => serialport::DataBits::Six,
            7 => serialport::DataBits::Seven,
            8 => serialport::DataBits::Eight,
            other => return Err(open_failed(format!("unsupported data bits: {other}"))),
        };
        let stop_bits = match cfg.stop_bits {
            1 => serialport::StopBits::One,
            2 => serialport::StopBits::Two,
            other => return Err(open_failed(format!("unsupported stop bits: {other}"))),
        };
        let parity = match cfg.parity {
            Parity::None => serialport::Parity::None,
            Parity::Even => serialport::Parity::Even,
            Parity::Odd => serialport::Parity::Odd,
        };

        debug!(
            port = %cfg.port_name,
            baud = cfg.baud_rate,
            data_bits = cfg.data_bits,
            stop_bits = cfg.stop_bits,
            parity = ?cfg.parity,
            "opening serial port"
        );

        let port = serialport::new(&cfg.port_name, cfg.baud_rate)
            .data_bits(data_bits)
            .stop_bits(stop_bits)
            .parity(parity)
            .timeout(READ_POLL)
            .open()
            .map_err(|e| open_failed(e.to_string()))?;

        info!(port = %cfg.port_name, "serial port opened");
        Ok(Box::new(SerialLink { port }))
    }

    fn port_name(&self) -> &str {
        &self.config.port_name
    }
}

/// An open hardware link. Dropping it closes the port.
struct SerialLink {
    port: Box<dyn serialport::SerialPort>,
}

impl WeighPort for SerialLink {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(LinkError::ReadFailed(e.to_string())),
        }
    }
}
