use embedded_hal::spi::ErrorType;

use crate::config::BusSettings;

/// Puts an SPI bus into the clock rate, bit order and mode the flash needs.
///
/// HAL bus drivers usually take these at construction time. The flash
/// driver calls this once from `begin` on a dedicated bus, and before every
/// command on a shared one.
pub trait ConfigureBus: ErrorType {
    fn configure(&mut self, settings: &BusSettings) -> Result<(), Self::Error>;
}

impl<T: ConfigureBus + ?Sized> ConfigureBus for &mut T {
    fn configure(&mut self, settings: &BusSettings) -> Result<(), Self::Error> {
        T::configure(self, settings)
    }
}
