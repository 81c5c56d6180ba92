//! Engine shared between foreground code and the interrupt handler
//!
//! [`SharedEngine`] keeps an [`I2cTransferEngine`] behind a [`critical_section::Mutex`] so it
//! can live in a `static` reachable from both contexts. Foreground code calls
//! [`transfer`](SharedEngine::transfer), which arms the transfer and sleeps in low power mode
//! until the interrupt handler, calling [`on_interrupt`](SharedEngine::on_interrupt), hands the
//! finished descriptor back.
//!
//! ```ignore
//! static I2C: SharedEngine<pac::E_USCI_B0, 16> = SharedEngine::new();
//!
//! #[entry]
//! fn main() -> ! {
//!     // ... clocks, pins ...
//!     I2C.install(I2cTransferEngine::master(periph.E_USCI_B0, &MasterConfig::new(8_000_000)));
//!     unsafe { msp430::interrupt::enable() };
//!     let mut buf = [0; 10];
//!     loop {
//!         I2C.write_read(0x48, &[0x04], &mut buf).ok();
//!     }
//! }
//!
//! #[interrupt(wake_cpu)]
//! fn EUSCI_B0() {
//!     I2C.on_interrupt();
//! }
//! ```

use crate::engine::I2cTransferEngine;
use crate::error::I2cError;
use crate::hal::I2cHal;
use crate::transfer::{Address, TransferDescriptor};
use core::cell::RefCell;
use critical_section::Mutex;
use embedded_hal::i2c::{ErrorType, I2c, Operation, SevenBitAddress};
use heapless::Vec;

/// Slot holding the engine of one controller
pub struct SharedEngine<H: I2cHal, const N: usize> {
    inner: Mutex<RefCell<Option<I2cTransferEngine<H, N>>>>,
}

impl<H: I2cHal, const N: usize> Default for SharedEngine<H, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: I2cHal, const N: usize> SharedEngine<H, N> {
    /// Empty slot
    pub const fn new() -> Self {
        SharedEngine {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    /// Put `engine` in the slot, returning whatever was there
    pub fn install(&self, engine: I2cTransferEngine<H, N>) -> Option<I2cTransferEngine<H, N>> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).replace(engine))
    }

    /// Empty the slot
    pub fn take(&self) -> Option<I2cTransferEngine<H, N>> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).take())
    }

    /// Run `f` on the installed engine inside a critical section
    pub fn with<R>(&self, f: impl FnOnce(&mut I2cTransferEngine<H, N>) -> R) -> Option<R> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).as_mut().map(f))
    }

    /// Arm `xfer` without waiting for it
    pub fn submit(&self, xfer: TransferDescriptor<N>) -> Result<(), I2cError> {
        self.with(|engine| engine.submit_transfer(xfer))
            .unwrap_or(Err(I2cError::NotInstalled))
    }

    /// Collect the armed transfer if it has finished
    pub fn poll(&self) -> nb::Result<TransferDescriptor<N>, I2cError> {
        critical_section::with(|cs| Self::poll_in(&mut self.inner.borrow_ref_mut(cs)))
    }

    fn poll_in(
        slot: &mut Option<I2cTransferEngine<H, N>>,
    ) -> nb::Result<TransferDescriptor<N>, I2cError> {
        match slot.as_mut() {
            Some(engine) => match engine.take_finished() {
                Some(Ok(xfer)) => Ok(xfer),
                Some(Err(err)) => Err(nb::Error::Other(err)),
                None => Err(nb::Error::WouldBlock),
            },
            None => Err(nb::Error::Other(I2cError::NotInstalled)),
        }
    }

    /// Run `xfer` to completion, sleeping between interrupts.
    ///
    /// The finished check and the low power entry happen in one critical section, so the
    /// interrupt completing the transfer can't slip in between them.
    pub fn transfer(&self, xfer: TransferDescriptor<N>) -> Result<TransferDescriptor<N>, I2cError> {
        self.submit(xfer)?;
        loop {
            let polled = critical_section::with(|cs| {
                let polled = Self::poll_in(&mut self.inner.borrow_ref_mut(cs));
                if let Err(nb::Error::WouldBlock) = polled {
                    H::enter_low_power_wait();
                }
                polled
            });
            match polled {
                Ok(xfer) => return Ok(xfer),
                Err(nb::Error::Other(err)) => return Err(err),
                Err(nb::Error::WouldBlock) => (),
            }
        }
    }

    /// Interrupt handler entry
    pub fn on_interrupt(&self) {
        critical_section::with(|cs| {
            if let Some(engine) = self.inner.borrow_ref_mut(cs).as_mut() {
                engine.on_interrupt();
            }
        })
    }

    /// Blocking write
    pub fn write(&self, address: u8, bytes: &[u8]) -> Result<(), I2cError> {
        let xfer = TransferDescriptor::write(Address::new(address)?, bytes)?;
        self.transfer(xfer).map(|_| ())
    }

    /// Blocking read
    pub fn read(&self, address: u8, buffer: &mut [u8]) -> Result<(), I2cError> {
        let xfer = TransferDescriptor::read(Address::new(address)?, buffer.len())?;
        let done = self.transfer(xfer)?;
        buffer.copy_from_slice(done.read_buf());
        Ok(())
    }

    /// Blocking write, repeated START, blocking read
    pub fn write_read(&self, address: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), I2cError> {
        let xfer = TransferDescriptor::write_read(Address::new(address)?, bytes, buffer.len())?;
        let done = self.transfer(xfer)?;
        buffer.copy_from_slice(done.read_buf());
        Ok(())
    }
}

impl<H: I2cHal, const N: usize> ErrorType for &SharedEngine<H, N> {
    type Error = I2cError;
}

/// The whole transaction runs as one transfer: consecutive writes are sent back to back, then
/// consecutive reads fill their buffers in order after a repeated START, and a single STOP
/// ends it. A write after a read would need a second repeated START, which the engine can't
/// issue, so such sequences fail with [`I2cError::UnsupportedSequence`] before touching the bus.
impl<H: I2cHal, const N: usize> I2c<SevenBitAddress> for &SharedEngine<H, N> {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let engine: &SharedEngine<H, N> = self;
        let address = Address::new(address)?;
        if operations.is_empty() {
            return Ok(());
        }

        let mut out: Vec<u8, N> = Vec::new();
        let mut read_len = 0;
        for op in operations.iter() {
            match op {
                Operation::Write(bytes) => {
                    if read_len > 0 {
                        return Err(I2cError::UnsupportedSequence);
                    }
                    out.extend_from_slice(bytes)
                        .map_err(|_| I2cError::BufferTooLarge)?;
                }
                Operation::Read(buffer) => read_len += buffer.len(),
            }
        }

        let xfer = if read_len == 0 {
            TransferDescriptor::write(address, &out)?
        } else if out.is_empty() {
            TransferDescriptor::read(address, read_len)?
        } else {
            TransferDescriptor::write_read(address, &out, read_len)?
        };
        let done = engine.transfer(xfer)?;

        let mut received = done.read_buf();
        for op in operations.iter_mut() {
            if let Operation::Read(buffer) = op {
                let (head, rest) = received.split_at(buffer.len());
                buffer.copy_from_slice(head);
                received = rest;
            }
        }
        Ok(())
    }
}
