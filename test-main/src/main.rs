use dotenv::dotenv;
use eyre::eyre;
use log::{debug, info};
use picrystal_lcd::hd44780::driver::I2cHD44780Driver;
use picrystal_lcd::i2c::DevI2cBus;
use std::env::var;
use std::thread::sleep;
use std::time::Duration;

fn env_or(key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|_| default.to_string())
}

fn main() -> eyre::Result<()> {
    dotenv().ok();
    pretty_env_logger::init();

    // Bus number and address of the expander backpack, e.g.
    // PICRYSTAL_I2C_BUS=1 PICRYSTAL_LCD_ADDR=0x27 PICRYSTAL_LCD_LINES=2
    let bus_no: u8 = env_or("PICRYSTAL_I2C_BUS", "1").parse()?;
    let addr_str = env_or("PICRYSTAL_LCD_ADDR", "0x27");
    let address = u16::from_str_radix(
        addr_str
            .strip_prefix("0x")
            .ok_or_else(|| eyre!("PICRYSTAL_LCD_ADDR must be hex, e.g. 0x27"))?,
        16,
    )?;
    let lines: u8 = env_or("PICRYSTAL_LCD_LINES", "2").parse()?;

    info!(
        "LCD @ /dev/i2c-{}, address 0x{:02x}, {} lines",
        bus_no, address, lines
    );

    let mut bus = DevI2cBus::open(bus_no, address)?;
    let mut lcd = I2cHD44780Driver::new(&mut bus, address, lines)?;

    debug!("Initializing display...");
    lcd.init(true)?;
    debug!("Display initialized.");

    // An up arrow in CGRAM slot 0
    lcd.create_char(
        0,
        &[
            0b00100, 0b01110, 0b10101, 0b00100, 0b00100, 0b00100, 0b00100, 0b00000,
        ],
    )?;

    lcd.print_line(0, "Hello, world!")?;
    if lines > 1 {
        lcd.set_cursor(0, 1)?;
        lcd.print("\x00 custom glyph")?;
    }

    // Blink the backlight a few times so the wiring is easy to verify
    for _ in 0..3 {
        sleep(Duration::from_millis(500));
        lcd.set_backlight(false)?;
        sleep(Duration::from_millis(500));
        lcd.set_backlight(true)?;
    }

    sleep(Duration::from_secs(2));
    lcd.set_display_enabled(false)?;
    sleep(Duration::from_secs(1));
    lcd.set_display_enabled(true)?;

    info!("Done.");
    Ok(())
}
