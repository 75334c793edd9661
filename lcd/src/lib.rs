pub mod expander;
pub mod hd44780;
pub mod i2c;

use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum LcdError {
    #[error("invalid argument")]
    InvalidArgument,
    #[error("row {row} is out of range for a {lines}-line display")]
    RowOutOfRange { row: u8, lines: u8 },
    #[error("the operation is not supported by this driver")]
    NotSupported,
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
    #[error("error: {0}")]
    Other(String),
}

impl From<std::io::Error> for LcdError {
    fn from(err: std::io::Error) -> Self {
        LcdError::Io(err.kind())
    }
}

pub type LcdResult<T> = Result<T, LcdError>;

/// Write-only master access to an addressed serial bus.
///
/// This is the only seam between the driver and the outside world. The
/// HD44780 protocol used here is open-loop, so there is no read
/// counterpart; a failed write is reported to the caller as-is and is
/// never retried internally.
pub trait I2cBus: Debug {
    /// Writes a single byte to the device at the given bus address.
    fn write_byte(&mut self, address: u16, value: u8) -> LcdResult<()>;
}
