//! I2C port expander link.
//!
//! The LCD backpack wires the controller's four data lines, E, RS and the
//! backlight transistor to one 8-bit expander register, so every state the
//! driver wants on those lines goes out as a single byte write. The
//! backlight bit rides along on every write, whatever its primary purpose.

use crate::{I2cBus, LcdResult};
use log::trace;

/// Backlight control bit of the expander register.
const BACKLIGHT: u8 = 0b00001000;

/// Owns the bus address of one expander and its persistent backlight state.
///
/// This is the only type that touches the transport. There is no read path
/// and no retry; a transport error aborts the write and propagates.
#[derive(Debug)]
pub struct Expander<'a> {
    bus: &'a mut dyn I2cBus,
    address: u16,
    backlight: bool,
}

impl<'a> Expander<'a> {
    /// Creates a link to the expander at `address`. Backlight starts on.
    pub fn new(bus: &'a mut dyn I2cBus, address: u16) -> Self {
        Expander {
            bus,
            address,
            backlight: true,
        }
    }

    /// Writes the raw 8-bit expander state, with the backlight bit OR-ed in.
    pub fn write_state(&mut self, value: u8) -> LcdResult<()> {
        let frame = value | if self.backlight { BACKLIGHT } else { 0 };
        trace!("Expander write: {:08b}", frame);
        self.bus.write_byte(self.address, frame)
    }

    /// Updates the persisted backlight bit.
    ///
    /// Pure local state change; the new value reaches the hardware with the
    /// next [Expander::write_state] call. Callers that want it applied
    /// immediately issue a zero-payload write, which leaves the latch lines
    /// untouched.
    pub fn set_backlight(&mut self, on: bool) {
        self.backlight = on;
    }

    /// Gets the persisted backlight state.
    pub fn backlight(&self) -> bool {
        self.backlight
    }
}
