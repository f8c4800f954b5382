//! ST7789 display driver
//!
//! Drives a 320x240 ST7789 panel through a [`QueuedSpi`] transport.
//!
//! - Bring-up replays [`init::ST7789_INIT`] over the synchronous path.
//! - Blits are planned into at most [`transfer::MAX_UNITS`] units and
//!   submitted to the transport queue without waiting.
//! - The returned [`InFlight`] guard keeps the pixel buffer borrowed until
//!   every unit has completed; dropping it drains the queue.
//!
//! Transport and pin failures are not recoverable here: the driver logs
//! them and panics.

pub mod command;
pub mod init;
pub mod transfer;

use core::fmt::Debug;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{OutputPin, PinState};
use heapless::Vec;
use lumen_core::color::Rgb565;
use lumen_core::geometry::{Area, SCREEN_PIXELS};
use lumen_hal::{QueuedSpi, Transaction, MAX_TRANSFER_SIZE};

use self::transfer::{Source, MAX_UNITS};

/// Pixels in the constant-fill buffer, one maximum-size transfer
pub const FILL_PIXELS: usize = MAX_TRANSFER_SIZE / 2;

/// Display driver errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError {
    /// Blit requested before `init`
    NotInitialized,
    /// Empty rectangle, or origin outside the surface
    InvalidCoordinates,
    /// Pixel buffer smaller than the rectangle
    BufferTooSmall,
    /// Blit needs more units than the queue can hold
    BufferOverflow,
}

/// Bring-up timing and control line polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Reset low time, and settle time after release
    pub reset_pulse_ms: u32,
    /// Wait after init commands flagged with a delay
    pub post_command_delay_ms: u32,
    /// Backlight is lit by driving its pin low
    pub backlight_active_low: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reset_pulse_ms: 100,
            post_command_delay_ms: 100,
            backlight_active_low: false,
        }
    }
}

/// Log a hardware fault and halt
#[cold]
#[track_caller]
pub(crate) fn fatal<E: Debug>(operation: &str, error: E) -> ! {
    #[cfg(feature = "defmt")]
    defmt::error!("{=str} failed: {}", operation, defmt::Debug2Format(&error));
    panic!("{} failed: {:?}", operation, error)
}

/// ST7789 driver owning the transport and control pins
pub struct DisplayDriver<SPI, RST, BL> {
    spi: SPI,
    rst: RST,
    bl: BL,
    config: Config,
    initialized: bool,
    /// Units submitted and not yet collected
    in_flight: usize,
    fill: [Rgb565; FILL_PIXELS],
}

impl<SPI, RST, BL> DisplayDriver<SPI, RST, BL>
where
    SPI: QueuedSpi,
    RST: OutputPin,
    BL: OutputPin,
{
    /// Create a new driver; call [`init`](Self::init) before drawing
    pub fn new(spi: SPI, rst: RST, bl: BL, config: Config) -> Self {
        Self {
            spi,
            rst,
            bl,
            config,
            initialized: false,
            in_flight: 0,
            fill: [Rgb565::BLACK; FILL_PIXELS],
        }
    }

    /// Reset the panel, replay the init table and light the backlight
    pub fn init<D: DelayNs>(&mut self, delay: &mut D) {
        #[cfg(feature = "defmt")]
        defmt::info!("ST7789 bring-up");

        // Idle levels: out of reset, backlight off
        self.set_backlight(false);
        set_pin(&mut self.rst, PinState::High, "reset");

        set_pin(&mut self.rst, PinState::Low, "reset");
        delay.delay_ms(self.config.reset_pulse_ms);
        set_pin(&mut self.rst, PinState::High, "reset");
        delay.delay_ms(self.config.reset_pulse_ms);

        let sent = init::run_init_sequence(
            &mut self.spi,
            &init::ST7789_INIT,
            delay,
            self.config.post_command_delay_ms,
        );

        self.set_backlight(true);
        self.initialized = true;

        #[cfg(feature = "defmt")]
        defmt::info!("ST7789 ready ({=usize} init commands)", sent);
        #[cfg(not(feature = "defmt"))]
        let _ = sent;
    }

    /// Check if bring-up has completed
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Units submitted by the last blit and not yet drained
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Draw `pixels` (row-major, `area.width` per row) into `area`
    ///
    /// Any earlier blit is drained first. The returned guard borrows the
    /// pixels until the transfer has completed.
    pub fn blit<'a>(
        &'a mut self,
        area: Area,
        pixels: &'a [Rgb565],
    ) -> Result<InFlight<'a, SPI>, DisplayError> {
        if !self.initialized {
            return Err(DisplayError::NotInitialized);
        }
        self.drain();

        let bytes: &'a [u8] = bytemuck::cast_slice(pixels);
        let units = transfer::plan(&area, Source::Pixels(bytes), MAX_TRANSFER_SIZE)?;
        Ok(submit(&mut self.spi, &mut self.in_flight, units))
    }

    /// Draw a full-surface buffer of 320x240 pixels
    pub fn blit_screen<'a>(
        &'a mut self,
        pixels: &'a [Rgb565],
    ) -> Result<InFlight<'a, SPI>, DisplayError> {
        if pixels.len() < SCREEN_PIXELS {
            return Err(DisplayError::BufferTooSmall);
        }
        self.blit(Area::screen(), pixels)
    }

    /// Fill `area` with one colour
    ///
    /// Every payload chunk sends the same pre-filled buffer.
    pub fn fill(&mut self, area: Area, color: Rgb565) -> Result<InFlight<'_, SPI>, DisplayError> {
        if !self.initialized {
            return Err(DisplayError::NotInitialized);
        }
        self.drain();

        let pixels = area.pixel_count().min(FILL_PIXELS);
        self.fill[..pixels].fill(color);

        let Self {
            spi,
            in_flight,
            fill,
            ..
        } = self;
        let bytes: &[u8] = bytemuck::cast_slice(&fill[..pixels]);
        let units = transfer::plan(&area, Source::Constant(bytes), MAX_TRANSFER_SIZE)?;
        Ok(submit(spi, in_flight, units))
    }

    /// Wait for every unit of the last blit to complete
    pub fn drain(&mut self) {
        drain_units(&mut self.spi, &mut self.in_flight);
    }

    /// Release the transport and pins
    pub fn release(mut self) -> (SPI, RST, BL) {
        self.drain();
        (self.spi, self.rst, self.bl)
    }

    fn set_backlight(&mut self, on: bool) {
        let level = PinState::from(on != self.config.backlight_active_low);
        set_pin(&mut self.bl, level, "backlight");
    }
}

fn set_pin<P: OutputPin>(pin: &mut P, level: PinState, name: &str) {
    if let Err(e) = pin.set_state(level) {
        fatal(name, e);
    }
}

/// Queue every unit in order and record how many are in flight
///
/// The units move into the guard before anything is queued, so every
/// transaction handed to the transport lives as long as the guard does.
fn submit<'a, SPI: QueuedSpi>(
    spi: &'a mut SPI,
    in_flight: &'a mut usize,
    units: Vec<Transaction<'a>, MAX_UNITS>,
) -> InFlight<'a, SPI> {
    if units.len() > spi.queue_depth() {
        fatal("queue depth", units.len());
    }

    #[cfg(feature = "defmt")]
    defmt::debug!("blit: {=usize} units", units.len());

    let mut guard = InFlight {
        spi,
        in_flight,
        units,
    };
    guard.queue_all();
    guard
}

fn drain_units<SPI: QueuedSpi>(spi: &mut SPI, in_flight: &mut usize) {
    while *in_flight > 0 {
        if let Err(e) = spi.transaction_result() {
            fatal("transaction_result", e);
        }
        *in_flight -= 1;
    }
}

/// A submitted blit whose units may still be in flight
///
/// Holds the pixel source borrowed until the transfer is complete.
/// Dropping the guard drains; [`InFlight::drain`] does the same
/// explicitly. Code that runs between the blit and the drain overlaps
/// with the transfer.
#[must_use = "dropping the guard immediately waits for the transfer"]
pub struct InFlight<'a, SPI: QueuedSpi> {
    spi: &'a mut SPI,
    in_flight: &'a mut usize,
    units: Vec<Transaction<'a>, MAX_UNITS>,
}

impl<SPI: QueuedSpi> InFlight<'_, SPI> {
    fn queue_all(&mut self) {
        for unit in self.units.iter() {
            if let Err(e) = self.spi.queue_transaction(unit) {
                fatal("queue_transaction", e);
            }
            *self.in_flight += 1;
        }
    }

    /// Units submitted for this blit, in submission order
    pub fn units(&self) -> &[Transaction<'_>] {
        &self.units
    }

    /// Units not yet collected
    pub fn pending(&self) -> usize {
        *self.in_flight
    }

    /// Wait for the transfer to complete
    pub fn drain(self) {
        // Drop does the work
    }
}

impl<SPI: QueuedSpi> Drop for InFlight<'_, SPI> {
    fn drop(&mut self) {
        drain_units(&mut *self.spi, &mut *self.in_flight);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use core::convert::Infallible;
    use lumen_core::geometry::WIDTH;
    use lumen_hal::DcLevel;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::vec::Vec as StdVec;

    /// Pin, delay and bus activity in the order it happened
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Event {
        Unit(StdVec<u8>),
        Pin(&'static str, bool),
        Delay(u32),
    }

    pub type EventLog = Rc<RefCell<StdVec<Event>>>;

    fn log_event(log: &Option<EventLog>, event: Event) {
        if let Some(log) = log {
            log.borrow_mut().push(event);
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Path {
        Polling,
        Queued,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct Unit {
        pub bytes: StdVec<u8>,
        pub dc: DcLevel,
        pub path: Path,
    }

    /// Records every unit and completion; completes in order
    pub struct MockSpi {
        pub units: StdVec<Unit>,
        pub queued: usize,
        pub collected: usize,
        pub depth: usize,
        pub fail_transmit: bool,
        pub fail_result: bool,
        pub log: Option<EventLog>,
    }

    impl MockSpi {
        pub fn new() -> Self {
            Self {
                units: StdVec::new(),
                queued: 0,
                collected: 0,
                depth: 12,
                fail_transmit: false,
                fail_result: false,
                log: None,
            }
        }

        pub fn logged(log: &EventLog) -> Self {
            Self {
                log: Some(log.clone()),
                ..Self::new()
            }
        }

        fn record(&mut self, t: &Transaction<'_>, path: Path) {
            log_event(&self.log, Event::Unit(t.bytes().to_vec()));
            self.units.push(Unit {
                bytes: t.bytes().to_vec(),
                dc: t.dc(),
                path,
            });
        }

        pub fn queued_units(&self) -> impl Iterator<Item = &Unit> {
            self.units.iter().filter(|u| u.path == Path::Queued)
        }
    }

    #[derive(Debug)]
    pub struct MockError;

    impl QueuedSpi for MockSpi {
        type Error = MockError;

        fn queue_depth(&self) -> usize {
            self.depth
        }

        fn polling_transmit(&mut self, t: &Transaction<'_>) -> Result<(), MockError> {
            if self.fail_transmit {
                return Err(MockError);
            }
            self.record(t, Path::Polling);
            Ok(())
        }

        fn queue_transaction(&mut self, t: &Transaction<'_>) -> Result<(), MockError> {
            if self.fail_transmit {
                return Err(MockError);
            }
            self.record(t, Path::Queued);
            self.queued += 1;
            Ok(())
        }

        fn transaction_result(&mut self) -> Result<(), MockError> {
            assert!(self.collected < self.queued, "collected more than queued");
            if self.fail_result {
                return Err(MockError);
            }
            self.collected += 1;
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    pub struct MockPin {
        pub high: bool,
        pub transitions: StdVec<bool>,
        pub name: &'static str,
        pub log: Option<EventLog>,
    }

    impl MockPin {
        pub fn logged(name: &'static str, log: &EventLog) -> Self {
            Self {
                name,
                log: Some(log.clone()),
                ..Self::default()
            }
        }
    }

    impl embedded_hal::digital::ErrorType for MockPin {
        type Error = Infallible;
    }

    impl OutputPin for MockPin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.high = false;
            self.transitions.push(false);
            log_event(&self.log, Event::Pin(self.name, false));
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.high = true;
            self.transitions.push(true);
            log_event(&self.log, Event::Pin(self.name, true));
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    pub struct MockDelay {
        pub total_ms: u32,
        pub calls: StdVec<u32>,
        pub log: Option<EventLog>,
    }

    impl MockDelay {
        pub fn logged(log: &EventLog) -> Self {
            Self {
                log: Some(log.clone()),
                ..Self::default()
            }
        }
    }

    impl DelayNs for MockDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ms += ns / 1_000_000;
        }

        fn delay_ms(&mut self, ms: u32) {
            self.total_ms += ms;
            self.calls.push(ms);
            log_event(&self.log, Event::Delay(ms));
        }
    }

    type TestDriver = DisplayDriver<MockSpi, MockPin, MockPin>;

    fn make_driver() -> TestDriver {
        DisplayDriver::new(
            MockSpi::new(),
            MockPin::default(),
            MockPin::default(),
            Config::default(),
        )
    }

    fn ready_driver() -> TestDriver {
        let mut driver = make_driver();
        driver.init(&mut MockDelay::default());
        driver
    }

    #[test]
    fn test_init_sequence() {
        let mut driver = make_driver();
        let mut delay = MockDelay::default();
        driver.init(&mut delay);

        assert!(driver.is_initialized());
        // Reset pulse then two flagged init commands
        assert_eq!(delay.calls, vec![100, 100, 100, 100]);

        let (spi, rst, bl) = driver.release();
        assert_eq!(rst.transitions, vec![true, false, true]);
        assert_eq!(bl.transitions, vec![false, true]);
        assert!(spi.units.iter().all(|u| u.path == Path::Polling));
        assert_eq!(spi.units[0].bytes, vec![0x36]);
    }

    #[test]
    fn test_reset_completes_before_first_command() {
        let log = EventLog::default();
        let mut driver = DisplayDriver::new(
            MockSpi::logged(&log),
            MockPin::logged("rst", &log),
            MockPin::logged("bl", &log),
            Config::default(),
        );
        driver.init(&mut MockDelay::logged(&log));

        let events = log.borrow();
        let first_unit = events
            .iter()
            .position(|e| matches!(e, Event::Unit(_)))
            .unwrap();
        assert_eq!(
            events[..first_unit],
            [
                Event::Pin("bl", false),
                Event::Pin("rst", true),
                Event::Pin("rst", false),
                Event::Delay(100),
                Event::Pin("rst", true),
                Event::Delay(100),
            ]
        );
        assert_eq!(events[first_unit], Event::Unit(vec![0x36]));

        // Backlight comes on only after DISPON and its delay
        let last_unit = events
            .iter()
            .rposition(|e| matches!(e, Event::Unit(_)))
            .unwrap();
        assert_eq!(events[last_unit], Event::Unit(vec![0x29]));
        assert_eq!(
            events[last_unit + 1..],
            [Event::Delay(100), Event::Pin("bl", true)]
        );
    }

    #[test]
    fn test_backlight_active_low() {
        let mut driver = DisplayDriver::new(
            MockSpi::new(),
            MockPin::default(),
            MockPin::default(),
            Config {
                backlight_active_low: true,
                ..Config::default()
            },
        );
        driver.init(&mut MockDelay::default());
        let (_, _, bl) = driver.release();
        assert_eq!(bl.transitions, vec![true, false]);
    }

    #[test]
    fn test_blit_before_init() {
        let mut driver = make_driver();
        let pixels = [Rgb565::RED; 4];
        assert_eq!(
            driver.blit(Area::new(0, 0, 2, 2), &pixels).err(),
            Some(DisplayError::NotInitialized)
        );
        assert_eq!(
            driver.fill(Area::new(0, 0, 2, 2), Rgb565::RED).err(),
            Some(DisplayError::NotInitialized)
        );
    }

    #[test]
    fn test_blit_submits_header_and_payload() {
        let mut driver = ready_driver();
        let pixels = [Rgb565::RED, Rgb565::GREEN, Rgb565::BLUE, Rgb565::WHITE];

        let guard = driver.blit(Area::new(10, 20, 2, 2), &pixels).unwrap();
        assert_eq!(guard.units().len(), 6);
        assert_eq!(guard.pending(), 6);
        guard.drain();

        assert_eq!(driver.in_flight(), 0);
        let (spi, _, _) = driver.release();
        let queued: StdVec<&Unit> = spi.queued_units().collect();
        assert_eq!(queued.len(), 6);
        assert_eq!(queued[1].bytes, vec![0, 10, 0, 11]);
        assert_eq!(queued[3].bytes, vec![0, 20, 0, 21]);
        assert_eq!(
            queued[5].bytes,
            vec![0xF8, 0x00, 0x07, 0xE0, 0x00, 0x1F, 0xFF, 0xFF]
        );
        assert_eq!(queued[5].dc, DcLevel::Data);
        assert_eq!(spi.collected, 6);
    }

    #[test]
    fn test_full_screen_fill_then_blit() {
        let mut driver = ready_driver();
        driver
            .fill(Area::screen(), Rgb565::WHITE)
            .unwrap()
            .drain();
        assert_eq!(driver.in_flight(), 0);

        let row = [Rgb565::ORANGE; WIDTH as usize];
        driver.blit(Area::new(0, 0, WIDTH, 1), &row).unwrap().drain();

        let (spi, _, _) = driver.release();
        assert_eq!(spi.queued, 11 + 6);
        assert_eq!(spi.collected, 17);

        // Every fill chunk carries the same white bytes
        let fill_chunks: StdVec<&Unit> = spi.queued_units().skip(5).take(6).collect();
        assert!(fill_chunks
            .iter()
            .all(|u| u.bytes.len() == MAX_TRANSFER_SIZE && u.bytes.iter().all(|b| *b == 0xFF)));
    }

    #[test]
    fn test_small_fill_uses_part_of_buffer() {
        let mut driver = ready_driver();
        driver
            .fill(Area::new(5, 5, 3, 2), Rgb565::BLUE)
            .unwrap()
            .drain();
        let (spi, _, _) = driver.release();
        let payload = spi.queued_units().last().unwrap();
        assert_eq!(payload.bytes.len(), 12);
        assert_eq!(&payload.bytes[..2], &[0x00, 0x1F]);
    }

    #[test]
    fn test_next_blit_drains_forgotten_transfer() {
        let mut driver = ready_driver();
        let pixels = [Rgb565::RED; 4];

        let guard = driver.blit(Area::new(0, 0, 2, 2), &pixels).unwrap();
        core::mem::forget(guard);
        assert_eq!(driver.in_flight(), 6);

        let guard = driver.blit(Area::new(2, 2, 2, 2), &pixels).unwrap();
        // Previous six collected before the new six were queued
        assert_eq!(guard.pending(), 6);
        drop(guard);

        let (spi, _, _) = driver.release();
        assert_eq!(spi.queued, 12);
        assert_eq!(spi.collected, 12);
    }

    #[test]
    fn test_invalid_area_leaves_no_units() {
        let mut driver = ready_driver();
        let pixels = [Rgb565::RED; 4];
        assert_eq!(
            driver.blit(Area::new(0, 0, 0, 2), &pixels).err(),
            Some(DisplayError::InvalidCoordinates)
        );
        assert_eq!(
            driver.blit(Area::new(0, 0, 4, 4), &pixels).err(),
            Some(DisplayError::BufferTooSmall)
        );
        assert_eq!(driver.in_flight(), 0);
        let (spi, _, _) = driver.release();
        assert_eq!(spi.queued, 0);
    }

    #[test]
    fn test_blit_screen_checks_size() {
        let mut driver = ready_driver();
        let pixels = [Rgb565::RED; 100];
        assert_eq!(
            driver.blit_screen(&pixels).err(),
            Some(DisplayError::BufferTooSmall)
        );

        let screen = std::vec![Rgb565::BLACK; SCREEN_PIXELS];
        let guard = driver.blit_screen(&screen).unwrap();
        assert_eq!(guard.units().len(), 11);
    }

    #[test]
    fn test_blit_returns_while_units_in_flight() {
        use embassy_futures::block_on;
        use embassy_sync::blocking_mutex::raw::NoopRawMutex;
        use lumen_hal::{ChannelQueue, SpiConfig, TransferChannels};

        let channels: TransferChannels<NoopRawMutex, MockError, 12> = TransferChannels::new();
        let mut driver = DisplayDriver::new(
            ChannelQueue::new(&channels, &SpiConfig::default()),
            MockPin::default(),
            MockPin::default(),
            Config::default(),
        );
        // Bring-up waits on the worker, which this test plays by hand
        driver.initialized = true;

        let screen = std::vec![Rgb565::BLUE; SCREEN_PIXELS];
        let guard = driver.blit_screen(&screen).unwrap();

        // Everything is still waiting for the worker
        assert_eq!(guard.pending(), 11);
        assert_eq!(channels.pending_requests(), 11);

        let mut clocked = 0;
        while channels.pending_requests() > 0 {
            let request = block_on(channels.next_request());
            clocked += request.len();
            block_on(channels.complete(&request, Ok(())));
        }
        // 3 command bytes, 2 window ranges, 6 payload chunks
        assert_eq!(clocked, 3 + 8 + SCREEN_PIXELS * 2);

        guard.drain();
        assert_eq!(driver.in_flight(), 0);
    }

    #[test]
    #[should_panic(expected = "transaction_result failed")]
    fn test_completion_error_is_fatal() {
        let mut driver = ready_driver();
        driver.spi.fail_result = true;
        let pixels = [Rgb565::RED; 4];
        driver.blit(Area::new(0, 0, 2, 2), &pixels).unwrap().drain();
    }

    #[test]
    #[should_panic(expected = "queue depth failed")]
    fn test_shallow_queue_is_fatal() {
        let mut driver = ready_driver();
        driver.spi.depth = 4;
        let pixels = [Rgb565::RED; 4];
        let _ = driver.blit(Area::new(0, 0, 2, 2), &pixels);
    }
}
