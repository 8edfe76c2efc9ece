use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::synthetic::SyntheticAnalyzer;

/// Factory baud rate of the LI-820/LI-840 RS-232 port.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

const SYNTHETIC_SCHEME: &str = "sim://";
const DEFAULT_SYNTHETIC_INTERVAL: Duration = Duration::from_secs(1);

/// Serial line settings applied when opening a physical device.
#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub baud_rate: u32,
    /// Upper bound on a single blocking read. An idle analyzer surfaces as
    /// `ErrorKind::TimedOut` after this long, which readers treat as "no data yet".
    pub read_timeout: Duration,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: Duration::from_secs(1),
        }
    }
}

/// Where the analyzer's byte stream comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceAddress {
    /// A serial device path such as `/dev/ttyS1`.
    Serial(String),
    /// The built-in synthetic analyzer (`sim://` or `sim://<interval-ms>`).
    Synthetic { interval: Duration },
}

impl FromStr for DeviceAddress {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix(SYNTHETIC_SCHEME) {
            if rest.is_empty() {
                return Ok(Self::Synthetic {
                    interval: DEFAULT_SYNTHETIC_INTERVAL,
                });
            }
            let millis: u64 = rest
                .parse()
                .map_err(|_| TransportError::InvalidAddress(s.to_string()))?;
            return Ok(Self::Synthetic {
                interval: Duration::from_millis(millis),
            });
        }
        if s.is_empty() {
            return Err(TransportError::InvalidAddress(s.to_string()));
        }
        Ok(Self::Serial(s.to_string()))
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceAddress::Serial(path) => f.write_str(path),
            DeviceAddress::Synthetic { interval } => {
                write!(f, "{SYNTHETIC_SCHEME}{}", interval.as_millis())
            }
        }
    }
}

/// An open analyzer stream.
///
/// The stream is closed when this value is dropped.
pub struct DeviceStream {
    inner: DeviceStreamInner,
    address: DeviceAddress,
}

enum DeviceStreamInner {
    Serial(Box<dyn SerialPort>),
    Synthetic(SyntheticAnalyzer),
}

impl DeviceStream {
    /// Open the device at `address`.
    ///
    /// `frame_tag` is only used by the synthetic analyzer, which needs to know
    /// which model's frames to emit.
    pub fn open(address: &DeviceAddress, settings: &SerialSettings, frame_tag: &str) -> Result<Self> {
        let inner = match address {
            DeviceAddress::Serial(path) => {
                let port = serialport::new(path.as_str(), settings.baud_rate)
                    .data_bits(DataBits::Eight)
                    .parity(Parity::None)
                    .stop_bits(StopBits::One)
                    .flow_control(FlowControl::None)
                    .timeout(settings.read_timeout)
                    .open()
                    .map_err(|source| TransportError::Open {
                        device: path.clone(),
                        source,
                    })?;
                info!(device = %path, baud = settings.baud_rate, "opened serial device");
                DeviceStreamInner::Serial(port)
            }
            DeviceAddress::Synthetic { interval } => {
                info!(interval_ms = interval.as_millis() as u64, "using synthetic analyzer");
                DeviceStreamInner::Synthetic(SyntheticAnalyzer::new(frame_tag, *interval))
            }
        };

        Ok(Self {
            inner,
            address: address.clone(),
        })
    }

    /// The address this stream was opened from.
    pub fn address(&self) -> &DeviceAddress {
        &self.address
    }
}

impl Read for DeviceStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            DeviceStreamInner::Serial(port) => port.read(buf),
            DeviceStreamInner::Synthetic(sim) => sim.read(buf),
        }
    }
}

impl Write for DeviceStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            DeviceStreamInner::Serial(port) => port.write(buf),
            DeviceStreamInner::Synthetic(sim) => sim.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            DeviceStreamInner::Serial(port) => port.flush(),
            DeviceStreamInner::Synthetic(sim) => sim.flush(),
        }
    }
}

impl Drop for DeviceStream {
    fn drop(&mut self) {
        debug!(device = %self.address, "closing device stream");
    }
}

impl fmt::Debug for DeviceStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.inner {
            DeviceStreamInner::Serial(_) => "serial",
            DeviceStreamInner::Synthetic(_) => "synthetic",
        };
        f.debug_struct("DeviceStream")
            .field("type", &kind)
            .field("address", &self.address)
            .finish()
    }
}
