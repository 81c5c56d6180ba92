//! Transfer errors

use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};

/// I2C transfer errors
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cError {
    /// A transfer was submitted while another one still owns the controller
    EngineBusy,
    /// The slave did not acknowledge its address or a data byte, and the NACK policy gave up
    NotAcknowledged,
    /// Slave address does not fit in 7 bits
    InvalidAddress,
    /// A buffer required by the transfer direction is empty
    EmptyBuffer,
    /// Data does not fit in the engine's buffer capacity
    BufferTooLarge,
    /// Master operation requested from a slave engine, or vice versa
    WrongRole,
    /// No engine has been installed in the shared slot
    NotInstalled,
    /// Operation sequence that can't run as a single transfer, such as a write after a read
    UnsupportedSequence,
}

impl embedded_hal::i2c::Error for I2cError {
    fn kind(&self) -> ErrorKind {
        match self {
            I2cError::NotAcknowledged => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown),
            _ => ErrorKind::Other,
        }
    }
}
