//! Lumen - ST7789 Splash and Sprite Firmware
//!
//! Firmware binary for RP2040 boards with a 320x240 ST7789 TFT and an SD
//! card sharing SPI0. Shows a solid splash, loads the splash image from the
//! card, then bounces a sprite across the screen on a fixed frame period.
//!
//! Display units are clocked out by DMA from a transfer task on a
//! higher-priority interrupt executor; the main task keeps working while a
//! frame is on the wire.

#![no_std]
#![no_main]

use defmt::*;
use embassy_embedded_hal::shared_bus::asynch::spi::SpiDeviceWithConfig;
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_rp::gpio::{Level, Output};
use embassy_rp::interrupt;
use embassy_rp::interrupt::{InterruptExt, Priority};
use embassy_rp::spi::Spi;
use embassy_sync::mutex::Mutex;
use embassy_time::{Delay, Duration, Ticker, Timer};
use embedded_sdmmc::{SdCard, VolumeManager};
use static_cell::{ConstStaticCell, StaticCell};
use {defmt_rtt as _, panic_probe as _};

use lumen_core::bitmap::{decode_image, read_header, ImageInfo};
use lumen_core::config::{parse_config, BoardConfig};
use lumen_core::geometry::{Area, SCREEN_PIXELS, WIDTH};
use lumen_core::scene::{self, Bounce};
use lumen_core::Rgb565;
use lumen_drivers::{Config as DisplayDriverConfig, DisplayDriver};
use lumen_hal::sdmmc::{FixedTimeSource, SdmmcStorage};
use lumen_hal::{ChannelQueue, QueuedSpi, SpiConfig};

use crate::bus::{bus_config, ClockedDevice, SharedBus};
use crate::transfer::{transfer_task, DisplayQueue, CHANNELS};

mod bus;
mod transfer;

/// Embedded board configuration (compiled into firmware)
/// Edit board.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../board.toml");

/// SD cards must be initialised at 400 kHz or less
const SD_INIT_FREQUENCY: u32 = 400_000;

/// Largest sprite the firmware reserves memory for (64x64)
const SPRITE_PIXELS: usize = 64 * 64;

type Display = DisplayDriver<DisplayQueue, Output<'static>, Output<'static>>;

type Storage = SdmmcStorage<SdCard<ClockedDevice, Delay>, FixedTimeSource>;

/// Runs the display transfer task above the main task
static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn SWI_IRQ_1() {
    EXECUTOR_HIGH.on_interrupt()
}

// Static cells for the bus and the large buffers (must live forever)
static BUS: StaticCell<SharedBus> = StaticCell::new();
static DISPLAY: StaticCell<Display> = StaticCell::new();
static FRAME: ConstStaticCell<[Rgb565; SCREEN_PIXELS]> =
    ConstStaticCell::new([Rgb565::BLACK; SCREEN_PIXELS]);
static SPRITE: ConstStaticCell<[Rgb565; SPRITE_PIXELS]> =
    ConstStaticCell::new([Rgb565::BLACK; SPRITE_PIXELS]);

/// Main entry point
#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("Lumen firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = load_config();

    let display_spi = match config.display.spi_config() {
        Some(spi) => spi,
        None => {
            warn!("Invalid display spi_mode {}, using mode 0", config.display.spi_mode);
            SpiConfig {
                frequency: config.display.frequency_hz,
                ..SpiConfig::default()
            }
        }
    };
    let sd_spi = SpiConfig {
        frequency: SD_INIT_FREQUENCY,
        ..SpiConfig::default()
    };

    // SPI0: CLK=GPIO18, MOSI=GPIO19, MISO=GPIO16, DMA on channels 0 and 1
    let bus: &'static SharedBus = BUS.init(Mutex::new(Spi::new(
        p.SPI0,
        p.PIN_18,
        p.PIN_19,
        p.PIN_16,
        p.DMA_CH0,
        p.DMA_CH1,
        bus_config(&display_spi),
    )));

    // Chip selects idle high
    let display_device = SpiDeviceWithConfig::new(
        bus,
        Output::new(p.PIN_17, Level::High),
        bus_config(&display_spi),
    );
    let sd_device = ClockedDevice::new(bus, Output::new(p.PIN_5, Level::High), bus_config(&sd_spi));

    interrupt::SWI_IRQ_1.set_priority(Priority::P2);
    let transfer_spawner = EXECUTOR_HIGH.start(interrupt::SWI_IRQ_1);
    transfer_spawner
        .spawn(transfer_task(display_device, Output::new(p.PIN_20, Level::Low)))
        .unwrap();

    let transport: DisplayQueue = ChannelQueue::new(&CHANNELS, &display_spi);
    info!("Display queue depth {}", transport.queue_depth());
    let rst = Output::new(p.PIN_21, Level::High);
    let bl = Output::new(p.PIN_22, Level::Low);
    let driver_config = DisplayDriverConfig {
        reset_pulse_ms: config.display.reset_pulse_ms,
        post_command_delay_ms: config.display.post_command_delay_ms,
        backlight_active_low: config.display.backlight_active_low,
    };
    let display = DISPLAY.init_with(|| DisplayDriver::new(transport, rst, bl, driver_config));

    display.init(&mut Delay);

    match display.fill(Area::screen(), Rgb565::ORANGE) {
        Ok(transfer) => transfer.drain(),
        Err(e) => warn!("Splash fill failed: {}", e),
    }
    Timer::after_millis(config.app.splash_hold_ms.into()).await;

    let frame = FRAME.take();
    let sprite = SPRITE.take();

    let mut storage = mount_card(sd_device, config.storage.frequency_hz);

    if let Some(storage) = storage.as_mut() {
        match decode_image(storage, &config.app.splash_path, &mut frame[..]) {
            Ok(info) => show(display, info.area_at(0, 0), &frame[..]),
            Err(e) => warn!("Splash image not shown: {}", e),
        }
    }
    Timer::after_millis(config.app.logo_hold_ms.into()).await;

    let sprite_info = storage
        .as_mut()
        .and_then(|storage| load_sprite(storage, &config.app.sprite_path, &mut sprite[..]));

    let Some(info) = sprite_info else {
        warn!("No sprite loaded, animation disabled");
        core::future::pending::<()>().await;
        return;
    };

    let row = i32::from(config.app.sprite_row);
    let mut bounce = Bounce::new(
        config.app.sprite_speed,
        i32::from(WIDTH) - i32::from(info.width),
    );
    let mut ticker = Ticker::every(Duration::from_millis(config.app.frame_period_ms.into()));

    info!("Animation running");
    let mut x = bounce.step();
    loop {
        scene::clear(&mut frame[..], Rgb565::WHITE);
        scene::draw_sprite(&mut frame[..], x, row, info.width, info.height, &sprite[..]);

        match display.blit_screen(&frame[..]) {
            Ok(transfer) => {
                // Frame is on the wire while the next position and tick come
                x = bounce.step();
                ticker.next().await;
                transfer.drain();
            }
            Err(e) => {
                warn!("Frame blit failed: {}", e);
                x = bounce.step();
                ticker.next().await;
            }
        }
    }
}

/// Parse the embedded board file, falling back to defaults
fn load_config() -> BoardConfig {
    match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!("Board config loaded");
            config
        }
        Err(e) => {
            warn!("Invalid board.toml ({}), using defaults", e);
            BoardConfig::default()
        }
    }
}

/// Initialise the card at the safe clock, then mount its first volume
fn mount_card(device: ClockedDevice, frequency_hz: u32) -> Option<Storage> {
    let sdcard = SdCard::new(device, Delay);

    // The first access runs card initialisation
    match sdcard.num_bytes() {
        Ok(bytes) => info!("SD card: {} bytes", bytes),
        Err(e) => {
            warn!("SD card not responding: {}", Debug2Format(&e));
            return None;
        }
    }
    sdcard.spi(|device| device.set_frequency(frequency_hz));

    match SdmmcStorage::mount(VolumeManager::new(sdcard, FixedTimeSource)) {
        Ok(storage) => Some(storage),
        Err(e) => {
            warn!("SD mount failed: {}", e);
            None
        }
    }
}

/// Decode the sprite if it fits the reserved buffer
fn load_sprite(storage: &mut Storage, path: &str, out: &mut [Rgb565]) -> Option<ImageInfo> {
    let info = match read_header(storage, path) {
        Ok(info) => info,
        Err(e) => {
            warn!("Sprite {} unreadable: {}", path, e);
            return None;
        }
    };
    if info.pixel_count() > out.len() {
        warn!(
            "Sprite {}x{} exceeds {} pixels",
            info.width,
            info.height,
            out.len()
        );
        return None;
    }

    match decode_image(storage, path, out) {
        Ok(info) => Some(info),
        Err(e) => {
            warn!("Sprite {} not decoded: {}", path, e);
            None
        }
    }
}

fn show(display: &mut Display, area: Area, pixels: &[Rgb565]) {
    match display.blit(area, pixels) {
        Ok(transfer) => transfer.drain(),
        Err(e) => warn!("Blit failed: {}", e),
    }
}
