//! `embedded-storage` traits on top of the page-splitting API.

use core::fmt::Debug;

use embedded_hal::digital::OutputPin;
use embedded_storage::nor_flash::{
    ErrorType, MultiwriteNorFlash, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};
use embedded_storage_async::nor_flash as asynch;

use crate::async_comms::AsyncFlashSpi;
use crate::comms::FlashSpi;
use crate::error::Error;
use crate::geometry::{CAPACITY, SECTOR_SIZE};
use crate::traits::ConfigureBus;

impl<S: Debug, P: Debug> NorFlashError for Error<S, P> {
    fn kind(&self) -> NorFlashErrorKind {
        match self {
            Error::OutOfBounds { .. } => NorFlashErrorKind::OutOfBounds,
            Error::NotAligned { .. } => NorFlashErrorKind::NotAligned,
            _ => NorFlashErrorKind::Other,
        }
    }
}

impl<SPI, CS, D> ErrorType for FlashSpi<SPI, CS, D>
where
    SPI: embedded_hal::spi::ErrorType,
    CS: OutputPin,
{
    type Error = Error<SPI::Error, CS::Error>;
}

impl<SPI, CS, D> ReadNorFlash for FlashSpi<SPI, CS, D>
where
    SPI: embedded_hal::spi::SpiBus + ConfigureBus,
    CS: OutputPin,
    D: embedded_hal::delay::DelayNs,
{
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        self.read_data(offset, bytes)
    }

    fn capacity(&self) -> usize {
        CAPACITY as usize
    }
}

impl<SPI, CS, D> NorFlash for FlashSpi<SPI, CS, D>
where
    SPI: embedded_hal::spi::SpiBus + ConfigureBus,
    CS: OutputPin,
    D: embedded_hal::delay::DelayNs,
{
    const WRITE_SIZE: usize = 1;
    const ERASE_SIZE: usize = SECTOR_SIZE as usize;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        self.erase_range(from, to)
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        self.write_data(offset, bytes)
    }
}

impl<SPI, CS, D> MultiwriteNorFlash for FlashSpi<SPI, CS, D>
where
    SPI: embedded_hal::spi::SpiBus + ConfigureBus,
    CS: OutputPin,
    D: embedded_hal::delay::DelayNs,
{
}

impl<SPI, CS, D> ErrorType for AsyncFlashSpi<SPI, CS, D>
where
    SPI: embedded_hal::spi::ErrorType,
    CS: OutputPin,
{
    type Error = Error<SPI::Error, CS::Error>;
}

impl<SPI, CS, D> asynch::ReadNorFlash for AsyncFlashSpi<SPI, CS, D>
where
    SPI: embedded_hal_async::spi::SpiBus + ConfigureBus,
    CS: OutputPin,
    D: embedded_hal_async::delay::DelayNs,
{
    const READ_SIZE: usize = 1;

    async fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        self.read_data(offset, bytes).await
    }

    fn capacity(&self) -> usize {
        CAPACITY as usize
    }
}

impl<SPI, CS, D> asynch::NorFlash for AsyncFlashSpi<SPI, CS, D>
where
    SPI: embedded_hal_async::spi::SpiBus + ConfigureBus,
    CS: OutputPin,
    D: embedded_hal_async::delay::DelayNs,
{
    const WRITE_SIZE: usize = 1;
    const ERASE_SIZE: usize = SECTOR_SIZE as usize;

    async fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        self.erase_range(from, to).await
    }

    async fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        self.write_data(offset, bytes).await
    }
}

impl<SPI, CS, D> asynch::MultiwriteNorFlash for AsyncFlashSpi<SPI, CS, D>
where
    SPI: embedded_hal_async::spi::SpiBus + ConfigureBus,
    CS: OutputPin,
    D: embedded_hal_async::delay::DelayNs,
{
}
