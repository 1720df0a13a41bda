//! Page, sector and block arithmetic for the IS25LQ080 (8 Mbit).
//!
//! Nothing here is stored; pages, sectors and blocks are derived from plain
//! byte addresses.

use crate::config::PageWrap;
use crate::error::Error;

/// Program granularity. A page program wraps inside its page.
pub const PAGE_SIZE: u32 = 256;
/// Smallest erasable unit.
pub const SECTOR_SIZE: u32 = 4096;
pub const NUM_SECTORS: u32 = 256;
/// 16 sectors.
pub const BLOCK_SIZE: u32 = 65536;
pub const NUM_BLOCKS: u32 = 16;
/// 1 MiB.
pub const CAPACITY: u32 = SECTOR_SIZE * NUM_SECTORS;

/// Start of the page containing `addr`.
pub const fn page_start(addr: u32) -> u32 {
    addr - addr % PAGE_SIZE
}

/// First address of the page after the one containing `addr`.
pub const fn page_boundary(addr: u32) -> u32 {
    page_start(addr) + PAGE_SIZE
}

/// Whether `len` bytes starting at `addr` spill past the end of `addr`'s page.
pub const fn crosses_page(addr: u32, len: usize) -> bool {
    (addr % PAGE_SIZE) as usize + len > PAGE_SIZE as usize
}

/// One single-page piece of a larger transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageChunk {
    /// Flash address of the first byte.
    pub addr: u32,
    /// Offset of the first byte in the caller's buffer.
    pub offset: usize,
    pub len: usize,
}

/// Splits `len` bytes starting at `addr` into pieces that each stay inside
/// one page.
pub const fn pages(addr: u32, len: usize) -> Pages {
    Pages {
        addr,
        offset: 0,
        remaining: len,
    }
}

#[derive(Clone, Debug)]
pub struct Pages {
    addr: u32,
    offset: usize,
    remaining: usize,
}

impl Iterator for Pages {
    type Item = PageChunk;

    fn next(&mut self) -> Option<PageChunk> {
        if self.remaining == 0 {
            return None;
        }
        let to_boundary = (PAGE_SIZE - self.addr % PAGE_SIZE) as usize;
        let len = to_boundary.min(self.remaining);
        let chunk = PageChunk {
            addr: self.addr,
            offset: self.offset,
            len,
        };
        self.addr = self.addr.wrapping_add(len as u32);
        self.offset += len;
        self.remaining -= len;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = if self.remaining == 0 {
            0
        } else {
            let head = (PAGE_SIZE - self.addr % PAGE_SIZE) as usize;
            1 + self.remaining.saturating_sub(head).div_ceil(PAGE_SIZE as usize)
        };
        (n, Some(n))
    }
}

impl ExactSizeIterator for Pages {}

pub(crate) fn check_range<S, P>(addr: u32, len: usize) -> Result<(), Error<S, P>> {
    if u64::from(addr) + len as u64 > u64::from(CAPACITY) {
        return Err(Error::OutOfBounds { addr, len });
    }
    Ok(())
}

pub(crate) fn check_page_read<S, P>(addr: u32, len: usize) -> Result<(), Error<S, P>> {
    check_range(addr, len)?;
    if len > PAGE_SIZE as usize {
        return Err(Error::PageBoundary { addr, len });
    }
    Ok(())
}

pub(crate) fn check_page_write<S, P>(
    addr: u32,
    len: usize,
    wrap: PageWrap,
) -> Result<(), Error<S, P>> {
    if wrap == PageWrap::Allow && len <= PAGE_SIZE as usize && crosses_page(addr, len) {
        // Wrapped bytes land at the start of the same page.
        if page_start(addr) >= CAPACITY {
            return Err(Error::OutOfBounds { addr, len });
        }
        return Ok(());
    }
    check_page_read(addr, len)?;
    if crosses_page(addr, len) {
        return Err(Error::PageBoundary { addr, len });
    }
    Ok(())
}

pub(crate) fn check_erase<S, P>(addr: u32, unit: u32) -> Result<(), Error<S, P>> {
    if addr >= CAPACITY {
        return Err(Error::OutOfBounds {
            addr,
            len: unit as usize,
        });
    }
    if addr % unit != 0 {
        return Err(Error::NotAligned { addr });
    }
    Ok(())
}

pub(crate) fn check_erase_range<S, P>(from: u32, to: u32) -> Result<(), Error<S, P>> {
    if from > to || to > CAPACITY {
        return Err(Error::OutOfBounds {
            addr: from,
            len: to.saturating_sub(from) as usize,
        });
    }
    if from % SECTOR_SIZE != 0 {
        return Err(Error::NotAligned { addr: from });
    }
    if to % SECTOR_SIZE != 0 {
        return Err(Error::NotAligned { addr: to });
    }
    Ok(())
}
