//! Refer to datasheet:
//! <https://www.issi.com/WW/pdf/25LQ080.pdf>

use core::fmt::Debug;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::{Operation, SpiBus};

use crate::bus::Bus;
use crate::command::{self, Opcode, WRITE_ENABLE_SETTLE_US};
use crate::config::Config;
use crate::error::Error;
use crate::geometry::{self, BLOCK_SIZE, SECTOR_SIZE};
use crate::identification::Identification;
use crate::status::Status;
use crate::traits::ConfigureBus;

/// Blocking driver. Every call returns only once its bytes have been
/// clocked and chip-select is released again.
pub struct FlashSpi<SPI, CS, D> {
    bus: Bus<SPI, CS, D>,
}

impl<SPI, CS, D> Debug for FlashSpi<SPI, CS, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "FlashSpi")
    }
}

impl<SPI, CS, D> FlashSpi<SPI, CS, D> {
    /// Wraps the bus without touching it. Call [`FlashSpi::begin`] before
    /// anything else, or use [`FlashSpi::init`].
    pub fn new(spi: SPI, cs: CS, delay: D, config: Config) -> Self {
        Self {
            bus: Bus::new(spi, cs, delay, config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.bus.config
    }

    /// Gives back the bus, chip-select pin and delay.
    pub fn free(self) -> (SPI, CS, D) {
        self.bus.free()
    }
}

impl<SPI, CS, D> FlashSpi<SPI, CS, D>
where
    SPI: SpiBus + ConfigureBus,
    CS: OutputPin,
    D: DelayNs,
{
    pub fn init(
        spi: SPI,
        cs: CS,
        delay: D,
        config: Config,
    ) -> Result<Self, Error<SPI::Error, CS::Error>> {
        let mut this = Self::new(spi, cs, delay, config);
        this.begin()?;
        Ok(this)
    }

    /// Deselects the chip, configures a dedicated bus and waits until any
    /// cycle left over from before reset has finished.
    pub fn begin(&mut self) -> Result<Status, Error<SPI::Error, CS::Error>> {
        self.bus.setup()?;
        let status = loop {
            let status = self.read_status()?;
            if !status.contains(Status::WIP) {
                break status;
            }
            log_warn!("Flash is not ready: {:?}", status);
            self.poll_delay();
        };
        log_debug!("Initial status: {:?}", status);
        Ok(status)
    }

    /// Reads the JEDEC manufacturer/device identification.
    pub fn read_jedec_id(&mut self) -> Result<Identification, Error<SPI::Error, CS::Error>> {
        let tx = [Opcode::ReadJedecId as u8, 0, 0, 0];
        let mut rx = [0u8; 4];
        self.bus
            .transaction(&mut [Operation::Transfer(&mut rx, &tx)])?;

        // Skip rx[0], clocked out while the opcode was shifted in
        Ok(Identification::from_jedec_id(&rx[1..]))
    }

    /// Whether the chip on the bus identifies as an IS25LQ080.
    pub fn is_valid_chip(&mut self) -> Result<bool, Error<SPI::Error, CS::Error>> {
        let id = self.read_jedec_id()?;
        log_debug!("JEDEC ID: {:?}", id);
        Ok(id.is_expected())
    }

    /// Reads the status register.
    pub fn read_status(&mut self) -> Result<Status, Error<SPI::Error, CS::Error>> {
        let tx = [Opcode::ReadStatus as u8, 0];
        let mut rx = [0u8; 2];
        self.bus
            .transaction(&mut [Operation::Transfer(&mut rx, &tx)])?;

        Ok(Status::from_bits_truncate(rx[1]))
    }

    pub fn is_write_in_progress(&mut self) -> Result<bool, Error<SPI::Error, CS::Error>> {
        Ok(self.read_status()?.contains(Status::WIP))
    }

    pub fn is_write_enabled(&mut self) -> Result<bool, Error<SPI::Error, CS::Error>> {
        Ok(self.read_status()?.contains(Status::WEL))
    }

    /// Polls WIP, sleeping `poll_interval_us` between reads, until the chip
    /// is idle. Returns after a single status read if it already is.
    pub fn wait_for_write_complete(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        while self.is_write_in_progress()? {
            self.poll_delay();
        }
        Ok(())
    }

    /// Write Status Register (01h)
    /// Does not wait for the status write cycle; the next command that
    /// needs an idle chip will.
    pub fn write_status(&mut self, status: Status) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.wait_for_write_complete()?;
        self.write_enable()?;
        self.bus
            .transaction(&mut [Operation::Write(&[Opcode::WriteStatus as u8, status.bits()])])
    }

    /// Reads `buf.len()` bytes starting at `addr`, one page-sized read at a
    /// time.
    pub fn read_data(
        &mut self,
        addr: u32,
        buf: &mut [u8],
    ) -> Result<(), Error<SPI::Error, CS::Error>> {
        geometry::check_range(addr, buf.len())?;
        for chunk in geometry::pages(addr, buf.len()) {
            self.read_page(chunk.addr, &mut buf[chunk.offset..chunk.offset + chunk.len])?;
        }
        Ok(())
    }

    /// Programs `data` starting at `addr`, split so no page program crosses
    /// a page boundary. Returns once the last page is durable.
    pub fn write_data(
        &mut self,
        addr: u32,
        data: &[u8],
    ) -> Result<(), Error<SPI::Error, CS::Error>> {
        geometry::check_range(addr, data.len())?;
        for chunk in geometry::pages(addr, data.len()) {
            self.write_page(chunk.addr, &data[chunk.offset..chunk.offset + chunk.len])?;
        }
        Ok(())
    }

    /// Read Data (03h)
    /// Reads up to a page of flash contents into `buf`, starting at `addr`.
    /// Unlike programming, reading runs on linearly past page boundaries.
    ///
    /// # Parameters
    ///
    /// * `addr`: 24-bit address to start reading at.
    /// * `buf`: Destination buffer to fill, at most [`PAGE_SIZE`](crate::PAGE_SIZE) bytes.
    pub fn read_page(
        &mut self,
        addr: u32,
        buf: &mut [u8],
    ) -> Result<(), Error<SPI::Error, CS::Error>> {
        geometry::check_page_read(addr, buf.len())?;
        if buf.is_empty() {
            return Ok(());
        }
        self.bus.transaction(&mut [
            Operation::Write(&command::frame(Opcode::Read, addr)),
            Operation::Read(buf),
        ])
    }

    /// Page Program (02h)
    /// Programs up to 256 bytes of previously erased memory and waits for
    /// the program cycle to finish.
    ///
    /// If `addr + data.len()` runs past the end of the page, the chip wraps
    /// back to the start of the same page. This is refused unless the
    /// handle was configured with [`PageWrap::Allow`](crate::PageWrap::Allow);
    /// [`FlashSpi::write_data`] never needs it.
    pub fn write_page(
        &mut self,
        addr: u32,
        data: &[u8],
    ) -> Result<(), Error<SPI::Error, CS::Error>> {
        geometry::check_page_write(addr, data.len(), self.bus.config.page_wrap)?;
        if data.is_empty() {
            return Ok(());
        }
        self.wait_for_write_complete()?;
        self.write_enable()?;
        let status = self.read_status()?;
        if !status.contains(Status::WEL) {
            log_warn!("WEL should be set: {:?}", status);
        }

        self.bus.transaction(&mut [
            Operation::Write(&command::frame(Opcode::PageProgram, addr)),
            Operation::Write(data),
        ])?;
        self.wait_for_write_complete()
    }

    /// Sector Erase (D7h)
    /// Sets the 4 KiB sector starting at `addr` to all 1s (FFh).
    pub fn sector_erase(&mut self, addr: u32) -> Result<(), Error<SPI::Error, CS::Error>> {
        geometry::check_erase(addr, SECTOR_SIZE)?;
        log_debug!("Erasing sector at {:#x}", addr);
        self.erase_command(&command::frame(Opcode::SectorErase, addr))
    }

    /// Block Erase (D8h)
    /// Sets the 64 KiB block starting at `addr` to all 1s (FFh).
    pub fn block_erase(&mut self, addr: u32) -> Result<(), Error<SPI::Error, CS::Error>> {
        geometry::check_erase(addr, BLOCK_SIZE)?;
        log_debug!("Erasing block at {:#x}", addr);
        self.erase_command(&command::frame(Opcode::BlockErase, addr))
    }

    /// Chip Erase (C7h)
    /// Sets the whole device to all 1s (FFh). Blocks for a long time.
    pub fn chip_erase(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        log_debug!("Erasing chip");
        self.erase_command(&[Opcode::ChipErase as u8])
    }

    /// Erases the sector-aligned range `from..to`, using block erase
    /// wherever a whole block is covered.
    pub fn erase_range(&mut self, from: u32, to: u32) -> Result<(), Error<SPI::Error, CS::Error>> {
        geometry::check_erase_range(from, to)?;
        let mut addr = from;
        while addr < to {
            if addr % BLOCK_SIZE == 0 && to - addr >= BLOCK_SIZE {
                self.block_erase(addr)?;
                addr += BLOCK_SIZE;
            } else {
                self.sector_erase(addr)?;
                addr += SECTOR_SIZE;
            }
        }
        Ok(())
    }

    fn erase_command(&mut self, cmd: &[u8]) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.wait_for_write_complete()?;
        self.write_enable()?;
        self.bus.transaction(&mut [Operation::Write(cmd)])?;
        self.wait_for_write_complete()
    }

    /// Write Enable (06h)
    /// Sets the Write Enable Latch. Must directly precede every Page
    /// Program, Sector/Block/Chip Erase and Write Status Register, and CS
    /// has to stay high for tRES before that command.
    fn write_enable(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.bus
            .transaction(&mut [Operation::Write(&[Opcode::WriteEnable as u8])])?;
        self.bus.delay.delay_us(WRITE_ENABLE_SETTLE_US);
        Ok(())
    }

    fn poll_delay(&mut self) {
        let us = self.bus.config.poll_interval_us;
        self.bus.delay.delay_us(us);
    }
}
