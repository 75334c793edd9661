use crate::expander::Expander;
use crate::hd44780::{
    CLEAR_DISPLAY, CursorDirection, DISPLAY_CONTROL, DISPLAY_ON, ENABLE, ENTRY_LEFT,
    ENTRY_MODE_SET, FUNCTION_SET, REGISTER_SELECT, RETURN_HOME, ROW_OFFSETS, SET_CGRAM_ADDR,
    SET_DDRAM_ADDR, TWO_LINE,
};
use crate::{I2cBus, LcdError, LcdResult};
use log::trace;
use std::thread::sleep;
use std::time::Duration;

// Protocol delays, datasheet minimums with margin. The protocol is
// open-loop: undershooting a delay loses the command silently, so these
// are contracts, not tunables.
const POWER_ON_SETTLE: Duration = Duration::from_millis(50);
const RESET_SETTLE: Duration = Duration::from_secs(1);
const MODE_SWITCH_SETTLE_LONG: Duration = Duration::from_micros(4500);
const MODE_SWITCH_SETTLE_SHORT: Duration = Duration::from_micros(150);
const ENABLE_PULSE_WIDTH: Duration = Duration::from_micros(1);
const COMMAND_SETTLE: Duration = Duration::from_micros(50);
const SLOW_COMMAND_SETTLE: Duration = Duration::from_millis(2);

/// Driver for an HD44780 LCD controller behind an I2C port expander.
///
/// The controller is driven in 4-bit mode: every command or data byte goes
/// out as two expander half-transfers, high nibble first, each strobed in
/// by an enable pulse. The protocol is write-only and open-loop; correct
/// timing is the only synchronization with the controller.
///
/// The driver is not safe for concurrent use. Every operation is a
/// sequence of bus writes interleaved with blocking delays and must run to
/// completion before the next one starts.
#[derive(Debug)]
pub struct I2cHD44780Driver<'a> {
    expander: Expander<'a>,
    lines: u8,
    display_control: u8,
    entry_mode: u8,
}

impl<'a> I2cHD44780Driver<'a> {
    /// Creates a driver for the display at the given bus address.
    ///
    /// `lines` is the number of display lines, 1 to 4. No bus traffic
    /// happens until [I2cHD44780Driver::init] is called.
    ///
    /// # Errors
    /// - [LcdError::InvalidArgument] if `lines` is out of range.
    pub fn new(bus: &'a mut dyn I2cBus, address: u16, lines: u8) -> LcdResult<Self> {
        if lines == 0 || lines > 4 {
            return Err(LcdError::InvalidArgument);
        }
        Ok(I2cHD44780Driver {
            expander: Expander::new(bus, address),
            lines,
            display_control: 0,
            entry_mode: 0,
        })
    }

    /// Runs the power-on initialization sequence and leaves the controller
    /// in 4-bit mode with the display on, cursor and blinking off, and
    /// left-to-right entry mode.
    ///
    /// The sequence follows the HD44780 datasheet, figure 24 (pg 46): the
    /// controller powers up in 8-bit mode in an undefined state, so it is
    /// first forced to resynchronize by timing alone, then switched to the
    /// 4-bit interface. Clears the display at the end if `clear` is set.
    pub fn init(&mut self, clear: bool) -> LcdResult<()> {
        // The datasheet wants at least 40 ms after the supply rises above
        // 2.7 V; wait 50 to cover slow power ramps.
        sleep(POWER_ON_SETTLE);

        // Pull RS and R/W low and clear the data lines; only the backlight
        // bit goes out. Whatever state the controller was in, the next
        // nibbles now read as fresh commands.
        self.expander.write_state(0)?;
        sleep(RESET_SETTLE);

        // Still assumed to be in 8-bit mode; wait min 4.1 ms twice, then
        // the short settle in case it already switched.
        for settle in [
            MODE_SWITCH_SETTLE_LONG,
            MODE_SWITCH_SETTLE_LONG,
            MODE_SWITCH_SETTLE_SHORT,
        ] {
            self.write_nibble(0b0011 << 4)?;
            sleep(settle);
        }

        // Commit to the 4-bit interface.
        self.write_nibble(0b0010 << 4)?;

        // 4-bit mode, 5x8 font, line count.
        let mut function = FUNCTION_SET;
        if self.lines > 1 {
            function |= TWO_LINE;
        }
        self.send_command(function)?;

        self.display_control = DISPLAY_ON;
        self.send_command(DISPLAY_CONTROL | self.display_control)?;

        self.entry_mode = ENTRY_LEFT;
        self.send_command(ENTRY_MODE_SET | self.entry_mode)?;

        if clear {
            self.clear_display()?;
        }
        Ok(())
    }

    /// Gets the configured number of display lines.
    pub fn lines(&self) -> u8 {
        self.lines
    }

    /// Clears the display and sets the cursor to the home position.
    pub fn clear_display(&mut self) -> LcdResult<()> {
        self.send_command(CLEAR_DISPLAY)?;
        // This command takes much longer than the others.
        sleep(SLOW_COMMAND_SETTLE);
        Ok(())
    }

    /// Sets the cursor to the home position.
    pub fn return_home(&mut self) -> LcdResult<()> {
        self.send_command(RETURN_HOME)?;
        sleep(SLOW_COMMAND_SETTLE);
        Ok(())
    }

    /// Sets the cursor to the given column and row.
    ///
    /// The column is not range-checked; the controller itself wraps
    /// out-of-range DDRAM addresses.
    ///
    /// # Errors
    /// - [LcdError::RowOutOfRange] if `row` is not below the configured
    ///   line count. Nothing is written to the bus in that case.
    pub fn set_cursor(&mut self, col: u8, row: u8) -> LcdResult<()> {
        if row >= self.lines {
            return Err(LcdError::RowOutOfRange {
                row,
                lines: self.lines,
            });
        }
        self.send_command(SET_DDRAM_ADDR | col.wrapping_add(ROW_OFFSETS[row as usize]))
    }

    /// Turns the display on or off, preserving DDRAM contents.
    pub fn set_display_enabled(&mut self, on: bool) -> LcdResult<()> {
        if on {
            self.display_control |= DISPLAY_ON;
        } else {
            self.display_control &= !DISPLAY_ON;
        }
        self.send_command(DISPLAY_CONTROL | self.display_control)
    }

    /// Turns the backlight on or off.
    ///
    /// The backlight bit lives on the expander, not in the controller, so
    /// this issues a zero-payload expander write that carries the new bit
    /// without touching the command/data latch lines.
    pub fn set_backlight(&mut self, on: bool) -> LcdResult<()> {
        self.expander.set_backlight(on);
        self.expander.write_state(0)
    }

    /// Fills one of the 8 CGRAM slots with a custom 5x8 character.
    ///
    /// Each of the 8 glyph bytes is one pixel row, lower 5 bits used. The
    /// slot is masked to 3 bits, so slot 9 aliases slot 1; this matches
    /// the controller's CGRAM addressing and is relied upon by existing
    /// callers.
    pub fn create_char(&mut self, slot: u8, glyph: &[u8; 8]) -> LcdResult<()> {
        let slot = slot & 0b00000111;
        self.send_command(SET_CGRAM_ADDR | (slot << 3))?;
        for row in glyph {
            self.send_data(*row)?;
        }
        Ok(())
    }

    /// Writes the bytes of `text` at the cursor, in DDRAM address order.
    ///
    /// No line wrapping is done; writing past the addressable region
    /// follows the controller's own wrap behavior.
    pub fn print(&mut self, text: &str) -> LcdResult<()> {
        for byte in text.bytes() {
            self.send_data(byte)?;
        }
        Ok(())
    }

    /// Writes `text` starting at column 0 of the given row.
    pub fn print_line(&mut self, row: u8, text: &str) -> LcdResult<()> {
        self.set_cursor(0, row)?;
        self.print(text)
    }

    /// Shows or hides the underline cursor.
    ///
    /// # Errors
    /// - [LcdError::NotSupported] — deliberately unimplemented. Fails
    ///   loudly instead of silently ignoring the call.
    pub fn set_cursor_visible(&mut self, _visible: bool) -> LcdResult<()> {
        Err(LcdError::NotSupported)
    }

    /// Enables or disables cursor blinking.
    ///
    /// # Errors
    /// - [LcdError::NotSupported] — deliberately unimplemented.
    pub fn set_cursor_blink(&mut self, _blink: bool) -> LcdResult<()> {
        Err(LcdError::NotSupported)
    }

    /// Scrolls the display contents without changing DDRAM.
    ///
    /// # Errors
    /// - [LcdError::NotSupported] — deliberately unimplemented.
    pub fn scroll_display(&mut self, _direction: CursorDirection) -> LcdResult<()> {
        Err(LcdError::NotSupported)
    }

    /// Sets the direction text flows in.
    ///
    /// # Errors
    /// - [LcdError::NotSupported] — deliberately unimplemented.
    pub fn set_text_direction(&mut self, _direction: CursorDirection) -> LcdResult<()> {
        Err(LcdError::NotSupported)
    }

    /// Enables or disables shifting the display on every write.
    ///
    /// # Errors
    /// - [LcdError::NotSupported] — deliberately unimplemented.
    pub fn set_autoscroll(&mut self, _autoscroll: bool) -> LcdResult<()> {
        Err(LcdError::NotSupported)
    }

    /// Sends a command byte to the controller. RS is 0 (command).
    pub fn send_command(&mut self, command: u8) -> LcdResult<()> {
        self.send(command, false)
    }

    /// Sends a data byte to the controller. RS is 1 (data).
    pub fn send_data(&mut self, data: u8) -> LcdResult<()> {
        self.send(data, true)
    }

    fn send(&mut self, value: u8, rs: bool) -> LcdResult<()> {
        trace!("Sending data: {:08b}, RS: {}", value, rs);

        let mode = if rs { REGISTER_SELECT } else { 0 };
        let high_nibble = value & 0xF0;
        let low_nibble = (value << 4) & 0xF0;
        self.write_nibble(high_nibble | mode)?;
        self.write_nibble(low_nibble | mode)
    }

    /// Strobes one nibble frame into the controller. The nibble must
    /// already sit in bits 4-7; the frame may carry the RS bit.
    fn write_nibble(&mut self, frame: u8) -> LcdResult<()> {
        self.expander.write_state(frame | ENABLE)?;
        // Enable pulse must be >450 ns
        sleep(ENABLE_PULSE_WIDTH);
        self.expander.write_state(frame & !ENABLE)?;
        // Commands need >37 us to settle
        sleep(COMMAND_SETTLE);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::RecordingBus;

    const ADDR: u16 = 0x27;
    const BL: u8 = 0b00001000;

    /// The two frames of one half-transfer: enable high, then enable low.
    fn half(frame: u8, backlight: bool) -> [u8; 2] {
        let bl = if backlight { BL } else { 0 };
        [frame | ENABLE | bl, frame | bl]
    }

    /// The four frames of a full byte transfer, high nibble first.
    fn transfer(value: u8, rs: bool, backlight: bool) -> Vec<u8> {
        let mode = if rs { REGISTER_SELECT } else { 0 };
        let mut frames = Vec::new();
        frames.extend(half((value & 0xF0) | mode, backlight));
        frames.extend(half(((value << 4) & 0xF0) | mode, backlight));
        frames
    }

    fn driver<'a>(bus: &'a mut RecordingBus, lines: u8) -> I2cHD44780Driver<'a> {
        I2cHD44780Driver::new(bus, ADDR, lines).unwrap()
    }

    #[test]
    fn new_rejects_invalid_line_counts() {
        let mut bus = RecordingBus::default();
        assert_eq!(
            I2cHD44780Driver::new(&mut bus, ADDR, 0).err(),
            Some(LcdError::InvalidArgument)
        );
        let mut bus = RecordingBus::default();
        assert_eq!(
            I2cHD44780Driver::new(&mut bus, ADDR, 5).err(),
            Some(LcdError::InvalidArgument)
        );
    }

    #[test]
    fn send_splits_bytes_into_two_half_transfers() {
        let mut bus = RecordingBus::default();
        {
            let mut lcd = driver(&mut bus, 2);
            lcd.send_data(0xAB).unwrap();
        }
        assert_eq!(bus.frames(), transfer(0xAB, true, true));

        let mut bus = RecordingBus::default();
        {
            let mut lcd = driver(&mut bus, 2);
            lcd.send_command(0xAB).unwrap();
        }
        assert_eq!(bus.frames(), transfer(0xAB, false, true));
    }

    #[test]
    fn set_cursor_issues_ddram_address_command() {
        for (row, offset) in ROW_OFFSETS.iter().enumerate() {
            let mut bus = RecordingBus::default();
            {
                let mut lcd = driver(&mut bus, 4);
                lcd.set_cursor(3, row as u8).unwrap();
            }
            assert_eq!(
                bus.frames(),
                transfer(SET_DDRAM_ADDR | (3 + offset), false, true),
                "row {row}"
            );
        }
    }

    #[test]
    fn set_cursor_rejects_row_beyond_line_count() {
        let mut bus = RecordingBus::default();
        {
            let mut lcd = driver(&mut bus, 2);
            assert_eq!(
                lcd.set_cursor(0, 2),
                Err(LcdError::RowOutOfRange { row: 2, lines: 2 })
            );
        }
        assert!(bus.writes.is_empty());
    }

    #[test]
    fn clear_and_home_issue_single_commands() {
        let mut bus = RecordingBus::default();
        {
            let mut lcd = driver(&mut bus, 2);
            lcd.clear_display().unwrap();
        }
        assert_eq!(bus.frames(), transfer(CLEAR_DISPLAY, false, true));

        let mut bus = RecordingBus::default();
        {
            let mut lcd = driver(&mut bus, 2);
            lcd.return_home().unwrap();
        }
        assert_eq!(bus.frames(), transfer(RETURN_HOME, false, true));
    }

    #[test]
    fn backlight_bit_persists_across_writes() {
        let mut bus = RecordingBus::default();
        {
            let mut lcd = driver(&mut bus, 2);
            lcd.set_backlight(false).unwrap();
            lcd.send_data(0x41).unwrap();
            lcd.set_backlight(true).unwrap();
            lcd.send_data(0x41).unwrap();
        }
        let mut expected = vec![0x00];
        expected.extend(transfer(0x41, true, false));
        expected.push(BL);
        expected.extend(transfer(0x41, true, true));
        assert_eq!(bus.frames(), expected);
    }

    #[test]
    fn display_toggle_resends_persisted_control_flags() {
        let mut bus = RecordingBus::default();
        {
            let mut lcd = driver(&mut bus, 2);
            lcd.set_display_enabled(false).unwrap();
            lcd.set_display_enabled(true).unwrap();
        }
        let mut expected = transfer(DISPLAY_CONTROL, false, true);
        expected.extend(transfer(DISPLAY_CONTROL | DISPLAY_ON, false, true));
        assert_eq!(bus.frames(), expected);
    }

    #[test]
    fn create_char_slot_nine_aliases_slot_one() {
        let glyph = [0b00100, 0b01110, 0b10101, 0b00100, 0b00100, 0b00100, 0b00100, 0b00000];

        let mut bus_a = RecordingBus::default();
        {
            let mut lcd = driver(&mut bus_a, 2);
            lcd.create_char(9, &glyph).unwrap();
        }
        let mut bus_b = RecordingBus::default();
        {
            let mut lcd = driver(&mut bus_b, 2);
            lcd.create_char(1, &glyph).unwrap();
        }
        assert_eq!(bus_a.frames(), bus_b.frames());

        let mut expected = transfer(SET_CGRAM_ADDR | (1 << 3), false, true);
        for row in glyph {
            expected.extend(transfer(row, true, true));
        }
        assert_eq!(bus_a.frames(), expected);
    }

    #[test]
    fn print_streams_bytes_in_order() {
        let mut bus = RecordingBus::default();
        {
            let mut lcd = driver(&mut bus, 2);
            lcd.print("Hi").unwrap();
        }
        let mut expected = transfer(b'H', true, true);
        expected.extend(transfer(b'i', true, true));
        assert_eq!(bus.frames(), expected);
    }

    #[test]
    fn print_line_sets_cursor_first() {
        let mut bus = RecordingBus::default();
        {
            let mut lcd = driver(&mut bus, 2);
            lcd.print_line(1, "A").unwrap();
        }
        let mut expected = transfer(SET_DDRAM_ADDR | ROW_OFFSETS[1], false, true);
        expected.extend(transfer(b'A', true, true));
        assert_eq!(bus.frames(), expected);
    }

    #[test]
    fn unsupported_operations_fail_without_bus_traffic() {
        let mut bus = RecordingBus::default();
        {
            let mut lcd = driver(&mut bus, 2);
            let results = [
                lcd.set_cursor_visible(true),
                lcd.set_cursor_visible(false),
                lcd.set_cursor_blink(true),
                lcd.set_cursor_blink(false),
                lcd.scroll_display(CursorDirection::Left),
                lcd.scroll_display(CursorDirection::Right),
                lcd.set_text_direction(CursorDirection::Left),
                lcd.set_text_direction(CursorDirection::Right),
                lcd.set_autoscroll(true),
                lcd.set_autoscroll(false),
            ];
            for result in results {
                assert_eq!(result, Err(LcdError::NotSupported));
            }
        }
        assert!(bus.writes.is_empty());
    }

    #[test]
    fn init_sequence_matches_datasheet_byte_for_byte() {
        let mut bus = RecordingBus::default();
        {
            let mut lcd = driver(&mut bus, 2);
            lcd.init(true).unwrap();
        }

        // Backlight-only reset frame, three 0x30 half-transfers, the 4-bit
        // commit, then function set, display control, entry mode, clear.
        let mut expected = vec![BL];
        for _ in 0..3 {
            expected.extend(half(0x30, true));
        }
        expected.extend(half(0x20, true));
        expected.extend(transfer(FUNCTION_SET | TWO_LINE, false, true));
        expected.extend(transfer(DISPLAY_CONTROL | DISPLAY_ON, false, true));
        expected.extend(transfer(ENTRY_MODE_SET | ENTRY_LEFT, false, true));
        expected.extend(transfer(CLEAR_DISPLAY, false, true));
        assert_eq!(bus.frames(), expected);

        assert!(bus.writes.iter().all(|(address, _)| *address == ADDR));
    }

    #[test]
    fn single_line_init_omits_two_line_flag() {
        let mut bus = RecordingBus::default();
        {
            let mut lcd = driver(&mut bus, 1);
            lcd.init(false).unwrap();
        }
        let function_frames = transfer(FUNCTION_SET, false, true);
        assert_eq!(&bus.frames()[9..13], function_frames.as_slice());
    }
}
