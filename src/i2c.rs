//! eUSCI_B backend
//!
//! Peripherals eUSCI_B0 and eUSCI_B1 implement [`I2cHal`] and can be handed straight to
//! [`I2cTransferEngine`](crate::I2cTransferEngine).
//!
//! Pins used, to be put in alternate function 1 before the engine is created:
//!
//! eUSCI_B0: {SCL:P1.3, SDA:P1.2}
//!
//! eUSCI_B1: {SCL:P4.7, SDA:P4.6}
//!
//! The interrupt handler must be declared with `#[interrupt(wake_cpu)]` so returning from it
//! ends the low power wait of [`SharedEngine::transfer`](crate::SharedEngine::transfer).

use crate::config::{ClockSource, DataRate};
use crate::hal::{I2cHal, InterruptFlags};
use crate::hw_traits::eusci::{
    EUsciB, Ucssel, UCMODE_I2C, UCMST, UCOAEN, UCSWRST, UCSYNC, UCTR, UCTXSTP, UCTXSTT,
};
use crate::lpm;
use crate::transfer::Address;

impl From<ClockSource> for Ucssel {
    fn from(src: ClockSource) -> Ucssel {
        match src {
            ClockSource::Aclk => Ucssel::Aclk,
            ClockSource::Smclk => Ucssel::Smclk,
        }
    }
}

impl<USCI: EUsciB> I2cHal for USCI {
    fn configure_master(&mut self, source: ClockSource, clock_hz: u32, rate: DataRate) {
        self.ctlw0_wr(UCSWRST);
        self.ctlw0_wr(UCSWRST | UCMODE_I2C | UCMST | UCSYNC | Ucssel::from(source).ctlw0_bits());
        // No automatic STOP, no byte counter
        self.ctlw1_wr(0);
        self.brw_wr(rate.prescaler(clock_hz));
    }

    fn configure_slave(&mut self, own: Address) {
        self.ctlw0_wr(UCSWRST);
        self.ctlw0_wr(UCSWRST | UCMODE_I2C | UCSYNC);
        self.ctlw1_wr(0);
        self.i2coa0_wr(u16::from(own.get()) | UCOAEN);
    }

    #[inline]
    fn set_slave_address(&mut self, addr: Address) {
        self.i2csa_wr(addr.get().into());
    }

    #[inline]
    fn enable_module(&mut self) {
        self.ctlw0_clear(UCSWRST);
    }

    fn send_start(&mut self, byte: u8) {
        let tx = InterruptFlags::TRANSMIT0.bits();
        let ie = self.ie_rd();
        self.ie_wr(ie & !tx);
        self.ctlw0_set(UCTR | UCTXSTT);
        // TXIFG0 is raised once START has gone out
        while self.ifg_rd() & tx == 0 {
            msp430::asm::nop();
        }
        self.txbuf_wr(byte);
        self.ie_wr(ie);
    }

    #[inline]
    fn send_next(&mut self, byte: u8) {
        self.txbuf_wr(byte);
    }

    #[inline]
    fn send_stop(&mut self) {
        self.ctlw0_set(UCTXSTP);
    }

    #[inline]
    fn receive_start(&mut self) {
        self.ctlw0_wr((self.ctlw0_rd() & !UCTR) | UCTXSTT);
    }

    #[inline]
    fn receive_next(&mut self) -> u8 {
        self.rxbuf_rd()
    }

    #[inline]
    fn receive_stop(&mut self) {
        self.ctlw0_set(UCTXSTP);
    }

    #[inline]
    fn slave_get_data(&mut self) -> u8 {
        self.rxbuf_rd()
    }

    #[inline]
    fn is_stop_pending(&self) -> bool {
        self.ctlw0_check(UCTXSTP)
    }

    #[inline]
    fn interrupt_status(&self) -> InterruptFlags {
        InterruptFlags::from_bits_truncate(self.ifg_rd() & self.ie_rd())
    }

    #[inline]
    fn clear_interrupt_flags(&mut self, flags: InterruptFlags) {
        self.ifg_wr(self.ifg_rd() & !flags.bits());
    }

    #[inline]
    fn enable_interrupt(&mut self, flags: InterruptFlags) {
        self.ie_wr(self.ie_rd() | flags.bits());
    }

    #[inline]
    fn disable_interrupt(&mut self, flags: InterruptFlags) {
        self.ie_wr(self.ie_rd() & !flags.bits());
    }

    #[inline(always)]
    fn enter_low_power_wait() {
        lpm::enter_lpm0_enable_interrupts();
    }

    // Handled by `#[interrupt(wake_cpu)]`
    #[inline(always)]
    fn exit_low_power_wait() {}
}
