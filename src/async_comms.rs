//! Async counterpart of [`crate::comms`].

use core::fmt::Debug;

use crate::bus::Bus;
use crate::command::{self, Opcode, WRITE_ENABLE_SETTLE_US};
use crate::config::Config;
use crate::error::Error;
use crate::geometry::{self, BLOCK_SIZE, SECTOR_SIZE};
use crate::identification::Identification;
use crate::status::Status;
use crate::traits::ConfigureBus;
use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::spi::{Operation, SpiBus};

/// Async driver.
///
/// Every operation borrows the handle mutably until its future resolves, so
/// a second operation cannot be started on the same chip while one is
/// outstanding:
///
/// ```compile_fail
/// # async fn twice<F: issi_is25lq_nor_flash_rs::traits::ConfigureBus + embedded_hal_async::spi::SpiBus, C: embedded_hal::digital::OutputPin, D: embedded_hal_async::delay::DelayNs>(flash: &mut issi_is25lq_nor_flash_rs::AsyncFlashSpi<F, C, D>) {
/// let mut a = [0u8; 4];
/// let mut b = [0u8; 4];
/// let first = flash.read_page(0, &mut a);
/// let second = flash.read_page(4, &mut b);
/// let _ = (first.await, second.await);
/// # }
/// ```
///
/// A future resolves only after chip-select has been released. If one is
/// dropped halfway instead, the transfer it started may still be running and
/// CS stays asserted; every further call then fails with
/// [`Error::TransferPending`] until [`AsyncFlashSpi::recover`] is awaited.
pub struct AsyncFlashSpi<SPI, CS, D> {
    bus: Bus<SPI, CS, D>,
}

impl<SPI, CS, D> Debug for AsyncFlashSpi<SPI, CS, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AsyncFlashSpi")
            .field("transfer_pending", &self.bus.in_flight())
            .finish()
    }
}

impl<SPI, CS, D> AsyncFlashSpi<SPI, CS, D> {
    pub fn new(spi: SPI, cs: CS, delay: D, config: Config) -> Self {
        Self {
            bus: Bus::new(spi, cs, delay, config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.bus.config
    }

    /// Whether a dropped future left a transfer behind.
    pub fn is_transfer_pending(&self) -> bool {
        self.bus.in_flight()
    }

    pub fn free(self) -> (SPI, CS, D) {
        self.bus.free()
    }
}

impl<SPI, CS, D> AsyncFlashSpi<SPI, CS, D>
where
    SPI: SpiBus + ConfigureBus,
    CS: OutputPin,
    D: DelayNs,
{
    pub async fn init(
        spi: SPI,
        cs: CS,
        delay: D,
        config: Config,
    ) -> Result<Self, Error<SPI::Error, CS::Error>> {
        let mut this = Self::new(spi, cs, delay, config);
        this.begin().await?;
        Ok(this)
    }

    pub async fn begin(&mut self) -> Result<Status, Error<SPI::Error, CS::Error>> {
        self.bus.setup()?;
        let status = loop {
            let status = self.read_status().await?;
            if !status.contains(Status::WIP) {
                break status;
            }
            log_warn!("Flash is not ready: {:?}. Waiting...", status);
            self.poll_delay().await;
        };
        log_debug!("Initial status: {:?}", status);
        Ok(status)
    }

    /// Finishes a transfer whose future was dropped: waits for the bus to
    /// go idle and releases chip-select. Returns `false` if there was none.
    pub async fn recover(&mut self) -> Result<bool, Error<SPI::Error, CS::Error>> {
        self.bus.recover_async().await
    }

    pub async fn read_jedec_id(&mut self) -> Result<Identification, Error<SPI::Error, CS::Error>> {
        let tx = [Opcode::ReadJedecId as u8, 0, 0, 0];
        let mut rx = [0u8; 4];
        self.bus
            .transaction_async(&mut [Operation::Transfer(&mut rx, &tx)])
            .await?;
        Ok(Identification::from_jedec_id(&rx[1..]))
    }

    pub async fn is_valid_chip(&mut self) -> Result<bool, Error<SPI::Error, CS::Error>> {
        let id = self.read_jedec_id().await?;
        log_debug!("JEDEC ID: {:?}", id);
        Ok(id.is_expected())
    }

    /// Reads the status register.
    pub async fn read_status(&mut self) -> Result<Status, Error<SPI::Error, CS::Error>> {
        let tx = [Opcode::ReadStatus as u8, 0];
        let mut rx = [0u8; 2];
        self.bus
            .transaction_async(&mut [Operation::Transfer(&mut rx, &tx)])
            .await?;
        Ok(Status::from_bits_truncate(rx[1]))
    }

    pub async fn is_write_in_progress(&mut self) -> Result<bool, Error<SPI::Error, CS::Error>> {
        let status = self.read_status().await?;
        Ok(status.contains(Status::WIP))
    }

    pub async fn is_write_enabled(&mut self) -> Result<bool, Error<SPI::Error, CS::Error>> {
        let status = self.read_status().await?;
        Ok(status.contains(Status::WEL))
    }

    /// Polls WIP until the chip is idle, yielding to the executor for
    /// `poll_interval_us` between reads.
    pub async fn wait_for_write_complete(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        while self.is_write_in_progress().await? {
            self.poll_delay().await;
        }
        Ok(())
    }

    /// Write Status Register (01h)
    pub async fn write_status(
        &mut self,
        status: Status,
    ) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.wait_for_write_complete().await?;
        self.write_enable().await?;
        self.bus
            .transaction_async(&mut [Operation::Write(&[Opcode::WriteStatus as u8, status.bits()])])
            .await
    }

    pub async fn read_data(
        &mut self,
        addr: u32,
        buf: &mut [u8],
    ) -> Result<(), Error<SPI::Error, CS::Error>> {
        geometry::check_range(addr, buf.len())?;
        for chunk in geometry::pages(addr, buf.len()) {
            self.read_page(chunk.addr, &mut buf[chunk.offset..chunk.offset + chunk.len])
                .await?;
        }
        Ok(())
    }

    /// Programs `data` page by page. Unlike [`AsyncFlashSpi::write_page`]
    /// this waits for each program cycle, so the data is durable once it
    /// returns.
    pub async fn write_data(
        &mut self,
        addr: u32,
        data: &[u8],
    ) -> Result<(), Error<SPI::Error, CS::Error>> {
        geometry::check_range(addr, data.len())?;
        for chunk in geometry::pages(addr, data.len()) {
            self.write_page(chunk.addr, &data[chunk.offset..chunk.offset + chunk.len])
                .await?;
        }
        self.wait_for_write_complete().await
    }

    /// From datasheet (Read Data (03h))
    /// Reads up to a page of flash contents into `buf`, starting at `addr`.
    ///
    /// Only 24 bits of `addr` are transferred to the device; the driver
    /// refuses anything past the end of the chip.
    ///
    /// # Parameters
    ///
    /// * `addr`: 24-bit address to start reading at.
    /// * `buf`: Destination buffer to fill.
    pub async fn read_page(
        &mut self,
        addr: u32,
        buf: &mut [u8],
    ) -> Result<(), Error<SPI::Error, CS::Error>> {
        geometry::check_page_read(addr, buf.len())?;
        if buf.is_empty() {
            return Ok(());
        }
        self.bus
            .transaction_async(&mut [
                Operation::Write(&command::frame(Opcode::Read, addr)),
                Operation::Read(buf),
            ])
            .await
    }

    /// From datasheet (Page Program (02h))
    /// Programs up to 256 bytes of previously erased memory.
    ///
    /// Waits for an earlier cycle before starting, but not for this one:
    /// once the future resolves `data` may be reused, while the chip may
    /// still be programming. Poll [`AsyncFlashSpi::is_write_in_progress`] or
    /// await [`AsyncFlashSpi::wait_for_write_complete`] for durability.
    pub async fn write_page(
        &mut self,
        addr: u32,
        data: &[u8],
    ) -> Result<(), Error<SPI::Error, CS::Error>> {
        geometry::check_page_write(addr, data.len(), self.bus.config.page_wrap)?;
        if data.is_empty() {
            return Ok(());
        }
        self.wait_for_write_complete().await?;
        self.write_enable().await?;
        let status = self.read_status().await?;
        if !status.contains(Status::WEL) {
            log_warn!("WEL should be set: {:?}", status);
        }

        self.bus
            .transaction_async(&mut [
                Operation::Write(&command::frame(Opcode::PageProgram, addr)),
                Operation::Write(data),
            ])
            .await
    }

    /// Sector Erase (D7h), 4 KiB. Waits for the erase to finish.
    pub async fn sector_erase(&mut self, addr: u32) -> Result<(), Error<SPI::Error, CS::Error>> {
        // Address should be the start of a sector
        geometry::check_erase(addr, SECTOR_SIZE)?;
        log_debug!("Erasing sector at {:#x}", addr);
        self.erase_command(&command::frame(Opcode::SectorErase, addr)).await
    }

    /// Block Erase (D8h), 64 KiB. Waits for the erase to finish.
    pub async fn block_erase(&mut self, addr: u32) -> Result<(), Error<SPI::Error, CS::Error>> {
        geometry::check_erase(addr, BLOCK_SIZE)?;
        log_debug!("Erasing block at {:#x}", addr);
        self.erase_command(&command::frame(Opcode::BlockErase, addr)).await
    }

    /// Chip Erase (C7h)
    /// The Chip Erase instruction sets all memory within the device to the
    /// erased state of all 1s (FFh). Same polling as every other erase, it
    /// just takes longer.
    pub async fn chip_erase(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        log_debug!("Erasing chip");
        self.erase_command(&[Opcode::ChipErase as u8]).await
    }

    pub async fn erase_range(
        &mut self,
        from: u32,
        to: u32,
    ) -> Result<(), Error<SPI::Error, CS::Error>> {
        geometry::check_erase_range(from, to)?;
        let mut addr = from;
        while addr < to {
            if addr % BLOCK_SIZE == 0 && to - addr >= BLOCK_SIZE {
                self.block_erase(addr).await?;
                addr += BLOCK_SIZE;
            } else {
                self.sector_erase(addr).await?;
                addr += SECTOR_SIZE;
            }
        }
        Ok(())
    }

    async fn erase_command(&mut self, cmd: &[u8]) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.wait_for_write_complete().await?;
        self.write_enable().await?;
        self.bus
            .transaction_async(&mut [Operation::Write(cmd)])
            .await?;
        self.wait_for_write_complete().await
    }

    /// Write Enable (06h)
    /// The WEL bit must be set prior to every Page Program, Sector Erase,
    /// Block Erase, Chip Erase and Write Status Register instruction.
    async fn write_enable(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.bus
            .transaction_async(&mut [Operation::Write(&[Opcode::WriteEnable as u8])])
            .await?;
        self.bus.delay.delay_us(WRITE_ENABLE_SETTLE_US).await;
        Ok(())
    }

    async fn poll_delay(&mut self) {
        let us = self.bus.config.poll_interval_us;
        self.bus.delay.delay_us(us).await;
    }
}
