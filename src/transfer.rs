//! Transfer descriptors
//!
//! A [`TransferDescriptor`] owns the bytes of one I2C operation. It is moved into the engine on
//! submission and handed back, filled in, once the transfer completes.

use crate::engine::Phase;
use crate::error::I2cError;
use heapless::Vec;

/// Shape of a master transfer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// START, address+W, data..., STOP
    Write,
    /// START, address+R, data..., STOP
    Read,
    /// START, address+W, data..., repeated START, address+R, data..., STOP
    WriteThenRead,
}

/// 7-bit I2C slave address
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Address(u8);

impl Address {
    /// Rejects anything wider than 7 bits
    pub const fn new(addr: u8) -> Result<Self, I2cError> {
        if addr > 0x7F {
            Err(I2cError::InvalidAddress)
        } else {
            Ok(Address(addr))
        }
    }

    /// Raw address, without the R/W bit
    #[inline(always)]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Address {
    type Error = I2cError;

    fn try_from(addr: u8) -> Result<Self, Self::Error> {
        Address::new(addr)
    }
}

impl From<Address> for u8 {
    fn from(addr: Address) -> u8 {
        addr.0
    }
}

/// One in-flight I2C operation with up to `N` bytes in each direction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferDescriptor<const N: usize> {
    direction: Direction,
    address: Address,
    write: Vec<u8, N>,
    read: Vec<u8, N>,
    pub(crate) cursor: usize,
    pub(crate) phase: Phase,
}

impl<const N: usize> TransferDescriptor<N> {
    fn build(
        direction: Direction,
        address: Address,
        bytes: &[u8],
        read_len: usize,
    ) -> Result<Self, I2cError> {
        let write = Vec::from_slice(bytes).map_err(|_| I2cError::BufferTooLarge)?;
        let mut read = Vec::new();
        read.resize(read_len, 0).map_err(|_| I2cError::BufferTooLarge)?;
        Ok(TransferDescriptor {
            direction,
            address,
            write,
            read,
            cursor: 0,
            phase: Phase::Idle,
        })
    }

    /// Write `bytes` to `address`
    pub fn write(address: Address, bytes: &[u8]) -> Result<Self, I2cError> {
        Self::build(Direction::Write, address, bytes, 0)
    }

    /// Read `len` bytes from `address`
    pub fn read(address: Address, len: usize) -> Result<Self, I2cError> {
        Self::build(Direction::Read, address, &[], len)
    }

    /// Write `bytes` to `address`, then read `len` bytes after a repeated START
    pub fn write_read(address: Address, bytes: &[u8], len: usize) -> Result<Self, I2cError> {
        Self::build(Direction::WriteThenRead, address, bytes, len)
    }

    /// Check the buffers required by the direction are present
    pub fn validate(&self) -> Result<(), I2cError> {
        let ok = match self.direction {
            Direction::Write => !self.write.is_empty(),
            Direction::Read => !self.read.is_empty(),
            Direction::WriteThenRead => !self.write.is_empty() && !self.read.is_empty(),
        };
        if ok {
            Ok(())
        } else {
            Err(I2cError::EmptyBuffer)
        }
    }

    /// Transfer shape
    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Target slave
    #[inline]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Bytes to transmit
    #[inline]
    pub fn write_buf(&self) -> &[u8] {
        &self.write
    }

    /// Received bytes. Zero-filled past the cursor until the transfer completes.
    #[inline]
    pub fn read_buf(&self) -> &[u8] {
        &self.read
    }

    /// Index into the active buffer
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Phase the descriptor was last in
    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Bytes of the active buffer not moved yet
    pub fn remaining(&self) -> usize {
        self.active_len().saturating_sub(self.cursor)
    }

    /// True once the read half is the active buffer
    pub(crate) fn reading(&self) -> bool {
        match self.phase {
            Phase::StartWrite => false,
            Phase::StartRead | Phase::RepeatedStartRead => true,
            Phase::StopPending | Phase::Idle => self.direction != Direction::Write,
        }
    }

    fn active_len(&self) -> usize {
        if self.reading() {
            self.read.len()
        } else {
            self.write.len()
        }
    }

    /// Next byte to transmit, advancing the cursor
    pub(crate) fn next_tx(&mut self) -> Option<u8> {
        let byte = *self.write.get(self.cursor)?;
        self.cursor += 1;
        Some(byte)
    }

    /// Store a received byte at the cursor. Bytes past the end are dropped.
    pub(crate) fn store_rx(&mut self, byte: u8) {
        if let Some(slot) = self.read.get_mut(self.cursor) {
            *slot = byte;
            self.cursor += 1;
        }
    }
}
