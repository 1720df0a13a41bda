#![allow(dead_code)]

//! A simulated IS25LQ080 behind mock SPI bus, chip-select and delay.

use std::cell::RefCell;
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use issi_is25lq_nor_flash_rs::{BusSettings, ConfigureBus, BLOCK_SIZE, CAPACITY, SECTOR_SIZE};

const WIP: u8 = 0x01;
const WEL: u8 = 0x02;

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Select,
    Deselect,
    Configure(BusSettings),
    Delay { ns: u64 },
}

pub struct Chip {
    pub memory: Vec<u8>,
    pub status: u8,
    pub id: [u8; 3],
    /// Number of status reads that still report WIP after a cycle starts.
    pub cycle_polls: u32,
    pub events: Vec<Event>,
    /// MOSI bytes of every finished CS session.
    pub commands: Vec<Vec<u8>>,
    /// Commands issued while WIP was set, which the chip drops.
    pub ignored: usize,
    /// Makes the next async `read` return `Pending` once.
    pub stall_next_read: bool,
    /// Fails the bus operation after this many more have succeeded.
    pub fail_after_ops: Option<u32>,
    busy_polls: u32,
    selected: bool,
    ignoring: bool,
    session: Vec<u8>,
}

impl Chip {
    pub fn new() -> Self {
        Self {
            memory: vec![0xFF; CAPACITY as usize],
            status: 0,
            id: [0x9D, 0x13, 0x44],
            cycle_polls: 3,
            events: Vec::new(),
            commands: Vec::new(),
            ignored: 0,
            stall_next_read: false,
            fail_after_ops: None,
            busy_polls: 0,
            selected: false,
            ignoring: false,
            session: Vec::new(),
        }
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn commands_with_opcode(&self, opcode: u8) -> Vec<Vec<u8>> {
        self.commands
            .iter()
            .filter(|c| c.first() == Some(&opcode))
            .cloned()
            .collect()
    }

    /// Pretends a program/erase cycle is running for `polls` status reads.
    pub fn start_busy(&mut self, polls: u32) {
        self.status |= WIP;
        self.busy_polls = polls;
    }

    pub fn clear_log(&mut self) {
        self.events.clear();
        self.commands.clear();
    }

    fn check_fault(&mut self) -> Result<(), SimError> {
        match self.fail_after_ops {
            Some(0) => {
                self.fail_after_ops = None;
                Err(SimError)
            }
            Some(n) => {
                self.fail_after_ops = Some(n - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn select(&mut self) {
        self.events.push(Event::Select);
        self.selected = true;
        self.ignoring = false;
        self.session.clear();
    }

    fn deselect(&mut self) {
        self.events.push(Event::Deselect);
        if !self.selected {
            return;
        }
        self.selected = false;
        let session = std::mem::take(&mut self.session);
        if !session.is_empty() && !self.ignoring {
            self.execute(&session);
        }
        self.commands.push(session);
    }

    fn exchange(&mut self, mosi: u8) -> u8 {
        if !self.selected {
            return 0xFF;
        }
        let idx = self.session.len();
        self.session.push(mosi);
        if idx == 0 {
            if self.status & WIP != 0 && mosi != 0x05 {
                self.ignoring = true;
                self.ignored += 1;
            }
            return 0xFF;
        }
        if self.ignoring {
            return 0xFF;
        }
        let opcode = self.session[0];
        match opcode {
            0x9F => self.id.get(idx - 1).copied().unwrap_or(0xFF),
            0x05 => self.poll_status(),
            0x03 if idx >= 4 => {
                let addr = address_of(&self.session) + idx - 4;
                self.memory[addr % self.memory.len()]
            }
            0x02 if idx >= 4 => {
                if self.status & WEL != 0 {
                    let addr = address_of(&self.session);
                    let page = addr & !0xFF;
                    let offset = (addr + idx - 4) & 0xFF;
                    let cell = &mut self.memory[(page + offset) % CAPACITY as usize];
                    *cell &= mosi;
                }
                0xFF
            }
            _ => 0xFF,
        }
    }

    fn poll_status(&mut self) -> u8 {
        let status = self.status;
        if self.busy_polls > 0 {
            self.busy_polls -= 1;
            if self.busy_polls == 0 {
                self.status &= !WIP;
            }
        }
        status
    }

    fn start_cycle(&mut self) {
        self.status &= !WEL;
        if self.cycle_polls > 0 {
            self.status |= WIP;
            self.busy_polls = self.cycle_polls;
        }
    }

    fn erase(&mut self, session: &[u8], unit: u32) {
        let start = (address_of(session) & !(unit as usize - 1)) % CAPACITY as usize;
        self.memory[start..start + unit as usize].fill(0xFF);
        self.start_cycle();
    }

    fn execute(&mut self, session: &[u8]) {
        let wel = self.status & WEL != 0;
        match session[0] {
            0x06 => self.status |= WEL,
            0x02 if wel && session.len() > 4 => self.start_cycle(),
            0x01 if wel && session.len() >= 2 => {
                self.status = (self.status & (WIP | WEL)) | (session[1] & !(WIP | WEL));
                self.start_cycle();
            }
            0xD7 if wel && session.len() >= 4 => self.erase(session, SECTOR_SIZE),
            0xD8 if wel && session.len() >= 4 => self.erase(session, BLOCK_SIZE),
            0xC7 if wel => {
                self.memory.fill(0xFF);
                self.start_cycle();
            }
            _ => {}
        }
    }
}

fn address_of(session: &[u8]) -> usize {
    (session[1] as usize) << 16 | (session[2] as usize) << 8 | session[3] as usize
}

pub type SharedChip = Rc<RefCell<Chip>>;

/// Injected bus failure, see [`Chip::fail_after_ops`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimError;

impl embedded_hal::spi::Error for SimError {
    fn kind(&self) -> embedded_hal::spi::ErrorKind {
        embedded_hal::spi::ErrorKind::Other
    }
}

pub struct SimBus {
    chip: SharedChip,
}

pub struct SimCs {
    chip: SharedChip,
}

pub struct SimDelay {
    chip: SharedChip,
}

pub fn parts() -> (SharedChip, SimBus, SimCs, SimDelay) {
    let chip = Rc::new(RefCell::new(Chip::new()));
    (
        chip.clone(),
        SimBus { chip: chip.clone() },
        SimCs { chip: chip.clone() },
        SimDelay { chip },
    )
}

impl embedded_hal::spi::ErrorType for SimBus {
    type Error = SimError;
}

impl embedded_hal::spi::SpiBus for SimBus {
    fn read(&mut self, words: &mut [u8]) -> Result<(), SimError> {
        let mut chip = self.chip.borrow_mut();
        chip.check_fault()?;
        for word in words {
            *word = chip.exchange(0x00);
        }
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), SimError> {
        let mut chip = self.chip.borrow_mut();
        chip.check_fault()?;
        for word in words {
            chip.exchange(*word);
        }
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), SimError> {
        let mut chip = self.chip.borrow_mut();
        chip.check_fault()?;
        for i in 0..read.len().max(write.len()) {
            let miso = chip.exchange(write.get(i).copied().unwrap_or(0x00));
            if let Some(word) = read.get_mut(i) {
                *word = miso;
            }
        }
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), SimError> {
        let mut chip = self.chip.borrow_mut();
        chip.check_fault()?;
        for word in words {
            *word = chip.exchange(*word);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SimError> {
        Ok(())
    }
}

impl embedded_hal_async::spi::SpiBus for SimBus {
    async fn read(&mut self, words: &mut [u8]) -> Result<(), SimError> {
        let stall = std::mem::take(&mut self.chip.borrow_mut().stall_next_read);
        if stall {
            YieldOnce::default().await;
        }
        <Self as embedded_hal::spi::SpiBus>::read(self, words)
    }

    async fn write(&mut self, words: &[u8]) -> Result<(), SimError> {
        <Self as embedded_hal::spi::SpiBus>::write(self, words)
    }

    async fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), SimError> {
        <Self as embedded_hal::spi::SpiBus>::transfer(self, read, write)
    }

    async fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), SimError> {
        <Self as embedded_hal::spi::SpiBus>::transfer_in_place(self, words)
    }

    async fn flush(&mut self) -> Result<(), SimError> {
        Ok(())
    }
}

impl ConfigureBus for SimBus {
    fn configure(&mut self, settings: &BusSettings) -> Result<(), SimError> {
        self.chip.borrow_mut().events.push(Event::Configure(*settings));
        Ok(())
    }
}

impl embedded_hal::digital::ErrorType for SimCs {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for SimCs {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.chip.borrow_mut().select();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.chip.borrow_mut().deselect();
        Ok(())
    }
}

impl SimDelay {
    fn record(&mut self, ns: u64) {
        self.chip.borrow_mut().events.push(Event::Delay { ns });
    }
}

impl embedded_hal::delay::DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.record(u64::from(ns));
    }

    fn delay_us(&mut self, us: u32) {
        self.record(u64::from(us) * 1_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.record(u64::from(ms) * 1_000_000);
    }
}

impl embedded_hal_async::delay::DelayNs for SimDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.record(u64::from(ns));
    }

    async fn delay_us(&mut self, us: u32) {
        self.record(u64::from(us) * 1_000);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.record(u64::from(ms) * 1_000_000);
    }
}

#[derive(Default)]
struct YieldOnce {
    yielded: bool,
}

impl Future for YieldOnce {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}
