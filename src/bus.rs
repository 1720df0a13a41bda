//! Chip-select bracketing for one command sequence.
//!
//! Every command is a single transaction: the bus is (re)configured if it is
//! shared, CS goes low, the operations run, and CS goes high again whatever
//! the operations returned.
//!
//! This is embedded-hal-bus's `ExclusiveDevice::transaction` with one hook
//! added: a shared bus is reconfigured and allowed to settle before CS is
//! asserted, which an `SpiDevice` gives no place for.

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::Operation;

use crate::config::{BusSharing, Config};
use crate::error::Error;
use crate::traits::ConfigureBus;

pub(crate) struct Bus<SPI, CS, D> {
    spi: SPI,
    cs: CS,
    pub(crate) delay: D,
    pub(crate) config: Config,
    /// Set while an async transaction holds CS low. Still set afterwards
    /// only if its future was dropped before completing.
    in_flight: bool,
}

impl<SPI, CS, D> Bus<SPI, CS, D> {
    pub(crate) fn new(spi: SPI, cs: CS, delay: D, config: Config) -> Self {
        Self {
            spi,
            cs,
            delay,
            config,
            in_flight: false,
        }
    }

    pub(crate) fn free(self) -> (SPI, CS, D) {
        (self.spi, self.cs, self.delay)
    }

    pub(crate) fn in_flight(&self) -> bool {
        self.in_flight
    }
}

impl<SPI, CS, D> Bus<SPI, CS, D>
where
    SPI: ConfigureBus,
    CS: OutputPin,
{
    /// Deselects the chip and, on a dedicated bus, configures it for good.
    pub(crate) fn setup(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.release()?;
        if self.config.sharing == BusSharing::Dedicated {
            self.spi
                .configure(&self.config.settings)
                .map_err(Error::Spi)?;
        }
        Ok(())
    }

    pub(crate) fn release(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.cs.set_high().map_err(Error::Pin)
    }

    fn select(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.cs.set_low().map_err(Error::Pin)
    }
}

impl<SPI, CS, D> Bus<SPI, CS, D>
where
    SPI: embedded_hal::spi::SpiBus + ConfigureBus,
    CS: OutputPin,
    D: embedded_hal::delay::DelayNs,
{
    fn acquire(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        if self.config.sharing == BusSharing::Shared {
            self.spi
                .configure(&self.config.settings)
                .map_err(Error::Spi)?;
            self.delay.delay_us(self.config.settle_delay_us);
        }
        self.select()
    }

    pub(crate) fn transaction(
        &mut self,
        operations: &mut [Operation<'_, u8>],
    ) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.acquire()?;

        let op_res = operations.iter_mut().try_for_each(|op| match op {
            Operation::Read(buf) => self.spi.read(buf),
            Operation::Write(buf) => self.spi.write(buf),
            Operation::Transfer(read, write) => self.spi.transfer(read, write),
            Operation::TransferInPlace(buf) => self.spi.transfer_in_place(buf),
            Operation::DelayNs(ns) => {
                self.spi.flush()?;
                self.delay.delay_ns(*ns);
                Ok(())
            }
        });

        // On failure, flush and release anyway.
        let flush_res = self.spi.flush();
        let cs_res = self.release();

        op_res.map_err(Error::Spi)?;
        flush_res.map_err(Error::Spi)?;
        cs_res?;

        Ok(())
    }
}

impl<SPI, CS, D> Bus<SPI, CS, D>
where
    SPI: embedded_hal_async::spi::SpiBus + ConfigureBus,
    CS: OutputPin,
    D: embedded_hal_async::delay::DelayNs,
{
    async fn acquire_async(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        if self.config.sharing == BusSharing::Shared {
            self.spi
                .configure(&self.config.settings)
                .map_err(Error::Spi)?;
            self.delay.delay_us(self.config.settle_delay_us).await;
        }
        self.select()
    }

    /// Like [`Bus::transaction`], but refuses to start while an abandoned
    /// transfer still owns the bus.
    pub(crate) async fn transaction_async(
        &mut self,
        operations: &mut [Operation<'_, u8>],
    ) -> Result<(), Error<SPI::Error, CS::Error>> {
        if self.in_flight {
            return Err(Error::TransferPending);
        }
        self.acquire_async().await?;
        self.in_flight = true;

        let mut op_res = Ok(());
        for op in operations.iter_mut() {
            let res = match op {
                Operation::Read(buf) => self.spi.read(buf).await,
                Operation::Write(buf) => self.spi.write(buf).await,
                Operation::Transfer(read, write) => self.spi.transfer(read, write).await,
                Operation::TransferInPlace(buf) => self.spi.transfer_in_place(buf).await,
                Operation::DelayNs(ns) => match self.spi.flush().await {
                    Ok(()) => {
                        self.delay.delay_ns(*ns).await;
                        Ok(())
                    }
                    Err(e) => Err(e),
                },
            };
            if let Err(e) = res {
                op_res = Err(e);
                break;
            }
        }

        let flush_res = self.spi.flush().await;
        let cs_res = self.release();
        self.in_flight = false;

        op_res.map_err(Error::Spi)?;
        flush_res.map_err(Error::Spi)?;
        cs_res?;

        Ok(())
    }

    /// Waits out a transfer whose future was dropped and deselects the chip.
    /// Returns whether there was anything to recover.
    pub(crate) async fn recover_async(&mut self) -> Result<bool, Error<SPI::Error, CS::Error>> {
        if !self.in_flight {
            return Ok(false);
        }
        log_warn!("Recovering from an abandoned transfer");
        let flush_res = self.spi.flush().await;
        let cs_res = self.release();
        self.in_flight = false;

        flush_res.map_err(Error::Spi)?;
        cs_res?;
        Ok(true)
    }
}
