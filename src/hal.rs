//! Hardware collaborator
//!
//! The engine never touches registers itself. Everything it needs from the controller goes
//! through [`I2cHal`], which a target implements over its peripheral access crate (see the
//! `msp430fr2355` feature) and tests implement over a simulated bus.

use crate::config::{ClockSource, DataRate};
use crate::transfer::Address;
use bitflags::bitflags;

bitflags! {
    /// Interrupt sources of an eUSCI_B controller in I2C mode.
    ///
    /// Bit positions match the `UCBxIE` and `UCBxIFG` registers.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct InterruptFlags: u16 {
        /// Receive buffer full
        const RECEIVE0 = 1 << 0;
        /// Transmit buffer empty
        const TRANSMIT0 = 1 << 1;
        /// START condition received (slave)
        const START = 1 << 2;
        /// STOP condition on the bus
        const STOP = 1 << 3;
        /// Arbitration lost
        const ARBITRATION_LOST = 1 << 4;
        /// Not-acknowledge received
        const NACK = 1 << 5;
        /// Byte counter threshold reached
        const BYTE_COUNTER = 1 << 6;
        /// Clock low timeout
        const CLOCK_LOW_TIMEOUT = 1 << 7;
    }
}

/// Register-level operations an I2C controller provides to the transfer engine.
///
/// All methods are called either from foreground code with the controller idle or from the
/// controller's interrupt handler, never concurrently.
pub trait I2cHal {
    /// Put the controller in master mode and set up the bit-rate generator
    fn configure_master(&mut self, source: ClockSource, clock_hz: u32, rate: DataRate);

    /// Put the controller in slave receive mode answering to `own`
    fn configure_slave(&mut self, own: Address);

    /// Address used by the next START
    fn set_slave_address(&mut self, addr: Address);

    /// Release the controller from reset
    fn enable_module(&mut self);

    /// Switch to transmit mode, generate START plus address, and load `byte` as the first data byte
    fn send_start(&mut self, byte: u8);

    /// Load the next byte into the transmit buffer
    fn send_next(&mut self, byte: u8);

    /// Generate STOP after the byte currently being transmitted
    fn send_stop(&mut self);

    /// Switch to receive mode and generate (repeated) START plus address
    fn receive_start(&mut self);

    /// Read the receive buffer, freeing it for the next byte
    fn receive_next(&mut self) -> u8;

    /// Generate STOP (with NACK) after the byte currently being received
    fn receive_stop(&mut self);

    /// Read the receive buffer in slave mode
    fn slave_get_data(&mut self) -> u8;

    /// True while a requested STOP has not been put on the bus yet
    fn is_stop_pending(&self) -> bool;

    /// Pending interrupt flags, masked by the enabled sources
    fn interrupt_status(&self) -> InterruptFlags;

    /// Clear the given pending flags
    fn clear_interrupt_flags(&mut self, flags: InterruptFlags);

    /// Enable the given interrupt sources
    fn enable_interrupt(&mut self, flags: InterruptFlags);

    /// Disable the given interrupt sources
    fn disable_interrupt(&mut self, flags: InterruptFlags);

    /// Suspend the foreground context until an interrupt has been serviced.
    ///
    /// Called with interrupts disabled. Must enable interrupts and sleep in one atomic step so an
    /// interrupt arriving in between can't be missed.
    fn enter_low_power_wait();

    /// Called from interrupt context once a transfer has reached a terminal phase, so the
    /// foreground context resumes after the handler returns.
    fn exit_low_power_wait();
}
