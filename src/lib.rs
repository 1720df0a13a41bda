//! Driver for the ISSI IS25LQ080 8 Mbit SPI NOR flash.
//!
//! [`FlashSpi`] (blocking) and [`AsyncFlashSpi`] (async) own the SPI bus,
//! the chip-select pin and a delay. Each chip command is one transaction
//! bracketed by chip-select; multi-byte reads and writes are split on the
//! chip's 256-byte pages, and program/erase calls poll the WIP bit with a
//! configurable sleep in between.
//!
//! Both drivers also implement the `embedded-storage` NOR flash traits.
#![cfg_attr(not(test), no_std)]

mod fmt;

pub mod async_comms;
mod bus;
pub mod command;
pub mod comms;
pub mod config;
pub mod error;
pub mod geometry;
pub mod identification;
pub mod status;
mod storage;
pub mod traits;

pub use async_comms::AsyncFlashSpi;
pub use comms::FlashSpi;
pub use config::{BitOrder, BusSettings, BusSharing, Config, PageWrap};
pub use error::Error;
pub use geometry::{BLOCK_SIZE, CAPACITY, NUM_BLOCKS, NUM_SECTORS, PAGE_SIZE, SECTOR_SIZE};
pub use identification::Identification;
pub use status::{Status, STATUS_SRWD, STATUS_WEL, STATUS_WIP};
pub use traits::ConfigureBus;
