//! HD44780 LCD module.
//!
//! Command opcodes and flag bits of the HD44780 instruction set, plus the
//! control-line bits as wired on the I2C expander backpack. The driver
//! itself lives in [driver].

pub mod driver;

// Commands
pub const CLEAR_DISPLAY: u8 = 0b00000001;
pub const RETURN_HOME: u8 = 0b00000010;
pub const ENTRY_MODE_SET: u8 = 0b00000100;
pub const DISPLAY_CONTROL: u8 = 0b00001000;
pub const FUNCTION_SET: u8 = 0b00100000;
pub const SET_CGRAM_ADDR: u8 = 0b01000000;
pub const SET_DDRAM_ADDR: u8 = 0b10000000;

// Flags for entry mode set
pub const ENTRY_LEFT: u8 = 0b00000010;
pub const ENTRY_SHIFT_INCREMENT: u8 = 0b00000001;

// Flags for display control
pub const DISPLAY_ON: u8 = 0b00000100;
pub const CURSOR_ON: u8 = 0b00000010;
pub const BLINK_ON: u8 = 0b00000001;

// Flags for function set. 4-bit mode and the 5x8 font are the zero values
// of their fields.
pub const MODE_8BIT: u8 = 0b00010000;
pub const TWO_LINE: u8 = 0b00001000;
pub const FONT_5X10: u8 = 0b00000100;

/// DDRAM address of column 0 of each row.
pub const ROW_OFFSETS: [u8; 4] = [0x00, 0x40, 0x14, 0x54];

// Control-line bits on the expander register. The data nibble occupies
// bits 4-7, the backlight bit (owned by the expander link) bit 3.
pub const ENABLE: u8 = 0b00000100;
pub const REGISTER_SELECT: u8 = 0b00000001;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CursorDirection {
    /// Moves the cursor to the left after writing data.
    Left,
    /// Moves the cursor to the right after writing data.
    Right,
}
