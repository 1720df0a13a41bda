use embedded_hal::spi::{Mode, MODE_0};

/// The chip is specified up to 33 MHz for plain reads.
pub const DEFAULT_FREQUENCY_HZ: u32 = 30_000_000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitOrder {
    #[default]
    MsbFirst,
    LsbFirst,
}

/// Electrical parameters handed to [`ConfigureBus::configure`](crate::traits::ConfigureBus::configure).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusSettings {
    pub frequency_hz: u32,
    pub bit_order: BitOrder,
    pub mode: Mode,
}

impl BusSettings {
    pub const fn new() -> Self {
        Self {
            frequency_hz: DEFAULT_FREQUENCY_HZ,
            bit_order: BitOrder::MsbFirst,
            mode: MODE_0,
        }
    }
}

impl Default for BusSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether other peripherals use the same SPI bus.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusSharing {
    /// The bus is configured once in `begin` and left alone.
    #[default]
    Dedicated,
    /// Another device may have left the bus in a different mode, so it is
    /// reconfigured, followed by a settle delay, before every command.
    Shared,
}

/// What a single-page write does when `addr + len` runs past the page end.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PageWrap {
    /// Refuse with [`Error::PageBoundary`](crate::Error::PageBoundary).
    #[default]
    Reject,
    /// Send it anyway. The chip wraps back to the start of the same page and
    /// overwrites whatever is there. Only that page has to lie on the chip.
    Allow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub sharing: BusSharing,
    pub settings: BusSettings,
    /// Delay after reconfiguring a shared bus.
    pub settle_delay_us: u32,
    /// Sleep between two reads of the WIP bit.
    pub poll_interval_us: u32,
    pub page_wrap: PageWrap,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            sharing: BusSharing::Dedicated,
            settings: BusSettings::new(),
            settle_delay_us: 1_000,
            poll_interval_us: 1_000,
            page_wrap: PageWrap::Reject,
        }
    }

    pub const fn with_sharing(mut self, sharing: BusSharing) -> Self {
        self.sharing = sharing;
        self
    }

    pub const fn with_settings(mut self, settings: BusSettings) -> Self {
        self.settings = settings;
        self
    }

    pub const fn with_settle_delay_us(mut self, us: u32) -> Self {
        self.settle_delay_us = us;
        self
    }

    pub const fn with_poll_interval_us(mut self, us: u32) -> Self {
        self.poll_interval_us = us;
        self
    }

    pub const fn with_page_wrap(mut self, page_wrap: PageWrap) -> Self {
        self.page_wrap = page_wrap;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
