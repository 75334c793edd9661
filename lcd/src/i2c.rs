//! Linux I2C character device backend.
//!
//! Implements [I2cBus] on top of `/dev/i2c-N` through the [i2cdev] crate.
//! This is the only platform-specific part of the crate; everything above
//! it only sees the [I2cBus] trait.

use crate::{I2cBus, LcdError, LcdResult};
use i2cdev::core::I2CDevice;
use i2cdev::linux::{LinuxI2CDevice, LinuxI2CError};
use std::fmt;

impl From<LinuxI2CError> for LcdError {
    fn from(err: LinuxI2CError) -> Self {
        LcdError::Other(err.to_string())
    }
}

/// [I2cBus] backed by a Linux I2C character device.
///
/// The kernel ties one slave address to the open file descriptor at a time,
/// so the backend re-targets the device whenever a write names a different
/// address than the previous one.
pub struct DevI2cBus {
    dev: LinuxI2CDevice,
    address: u16,
}

impl DevI2cBus {
    /// Opens `/dev/i2c-<bus>` targeting the given slave address.
    pub fn open(bus: u8, address: u16) -> LcdResult<Self> {
        let dev = LinuxI2CDevice::new(format!("/dev/i2c-{bus}"), address)?;
        Ok(DevI2cBus { dev, address })
    }
}

impl fmt::Debug for DevI2cBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DevI2cBus")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl I2cBus for DevI2cBus {
    fn write_byte(&mut self, address: u16, value: u8) -> LcdResult<()> {
        if address != self.address {
            self.dev.set_slave_address(address)?;
            self.address = address;
        }
        self.dev.smbus_write_byte(value)?;
        Ok(())
    }
}
