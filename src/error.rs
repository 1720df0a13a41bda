use core::fmt::{self, Debug};

/// The error type used by this library.
///
/// This can encapsulate an SPI or chip-select error, and adds the driver's
/// own precondition errors on top of that. The chip itself never reports a
/// failure, so everything besides `Spi` and `Pin` is detected before any
/// byte is clocked out.
#[derive(PartialEq, Eq)]
pub enum Error<S, P> {
    /// An SPI transfer failed.
    Spi(S),
    /// Driving the chip-select line failed.
    Pin(P),
    /// `addr..addr + len` does not fit in the chip.
    OutOfBounds { addr: u32, len: usize },
    /// Erase address is not aligned to the erase unit.
    NotAligned { addr: u32 },
    /// A single-page request is longer than a page, or a single-page write
    /// would wrap around inside its page.
    PageBoundary { addr: u32, len: usize },
    /// An earlier async transfer was dropped before it completed. Call
    /// `AsyncFlashSpi::recover` before issuing anything else.
    TransferPending,
}

#[cfg(feature = "defmt")]
impl<S, P> defmt::Format for Error<S, P> {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Error::Spi(_spi) => defmt::write!(fmt, "Error::Spi"),
            Error::Pin(_pin) => defmt::write!(fmt, "Error::Pin"),
            Error::OutOfBounds { addr, len } => {
                defmt::write!(fmt, "Error::OutOfBounds({=u32:#x}, {=usize})", addr, len)
            }
            Error::NotAligned { addr } => defmt::write!(fmt, "Error::NotAligned({=u32:#x})", addr),
            Error::PageBoundary { addr, len } => {
                defmt::write!(fmt, "Error::PageBoundary({=u32:#x}, {=usize})", addr, len)
            }
            Error::TransferPending => defmt::write!(fmt, "Error::TransferPending"),
        }
    }
}

impl<S, P> Debug for Error<S, P>
where
    S: Debug,
    P: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Spi(spi) => write!(f, "Error::Spi({:?})", spi),
            Error::Pin(pin) => write!(f, "Error::Pin({:?})", pin),
            Error::OutOfBounds { addr, len } => {
                write!(f, "Error::OutOfBounds {{ addr: {:#x}, len: {} }}", addr, len)
            }
            Error::NotAligned { addr } => write!(f, "Error::NotAligned {{ addr: {:#x} }}", addr),
            Error::PageBoundary { addr, len } => {
                write!(f, "Error::PageBoundary {{ addr: {:#x}, len: {} }}", addr, len)
            }
            Error::TransferPending => write!(f, "Error::TransferPending"),
        }
    }
}
