//! Interrupt-driven I2C transfer engine for eUSCI_B style controllers.
//!
//! Foreground code describes a transfer (write, read, or write followed by a read after a
//! repeated START) as a [`TransferDescriptor`] and submits it. The controller's interrupt
//! handler then moves it forward one byte per interrupt, and the foreground context sleeps in
//! low power mode until the transfer is handed back. A controller configured as a slave stores
//! everything it receives in a wrapping [`SlaveRing`](slave::SlaveRing).
//!
//! All hardware access goes through the [`I2cHal`] trait. With the `msp430fr2355` feature the
//! eUSCI_B0 and eUSCI_B1 peripherals of the MSP430FR2355 implement it. Here are the
//! [`datasheet`] and [`User's guide`] for reference.
//!
//! [`datasheet`]: http://www.ti.com/lit/ds/symlink/msp430fr2355.pdf
//! [`User's guide`]: http://www.ti.com/lit/ug/slau445i/slau445i.pdf
//!
//! # Usage
//!
//! Building for the MSP430 requires `msp430-elf-gcc` installed and in $PATH, plus a nightly
//! compiler for `asm_experimental_arch`. The engine itself is target independent and is tested
//! on the host against a simulated controller.
//!
//! ```ignore
//! static I2C: SharedEngine<pac::E_USCI_B0, 16> = SharedEngine::new();
//!
//! I2C.install(I2cTransferEngine::master(periph.E_USCI_B0, &MasterConfig::new(8_000_000)));
//! let mut temp = [0; 2];
//! I2C.write_read(0x48, &[0x00], &mut temp)?;
//! ```
//!
//! # Features
//!
//! * `msp430fr2355`: eUSCI_B backend and LPM0 wait for the MSP430FR2355
//! * `defmt`: log engine activity and derive `defmt::Format` on public types

#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "msp430fr2355", feature(asm_experimental_arch))]
#![deny(missing_docs)]

#[macro_use]
mod fmt;

pub mod config;
pub mod engine;
pub mod error;
pub mod hal;
pub mod shared;
pub mod slave;
pub mod transfer;

#[cfg(feature = "msp430fr2355")]
pub mod i2c;
#[cfg(feature = "msp430fr2355")]
pub mod lpm;
#[cfg(feature = "msp430fr2355")]
mod hw_traits;
#[cfg(feature = "msp430fr2355")]
mod util;

pub use config::{ClockSource, DataRate, MasterConfig, NackPolicy, SlaveConfig};
pub use engine::{EngineStats, Event, I2cTransferEngine, Phase, Role};
pub use error::I2cError;
pub use hal::{I2cHal, InterruptFlags};
pub use shared::SharedEngine;
pub use transfer::{Address, Direction, TransferDescriptor};

#[cfg(feature = "msp430fr2355")]
pub use msp430fr2355 as pac;
