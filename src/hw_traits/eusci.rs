use crate::util::BitsExt;
use msp430fr2355 as pac;

// UCBxCTLW0
pub const UCSWRST: u16 = 1 << 0;
pub const UCTXSTT: u16 = 1 << 1;
pub const UCTXSTP: u16 = 1 << 2;
pub const UCTR: u16 = 1 << 4;
pub const UCSYNC: u16 = 1 << 8;
pub const UCMODE_I2C: u16 = 0b11 << 9;
pub const UCMST: u16 = 1 << 11;

// UCBxI2COA0
pub const UCOAEN: u16 = 1 << 10;

pub enum Ucssel {
    Aclk = 1,
    Smclk = 2,
}

impl Ucssel {
    #[inline(always)]
    pub const fn ctlw0_bits(self) -> u16 {
        (self as u16) << 6
    }
}

/// Raw register access to an eUSCI_B controller in I2C mode
pub trait EUsciB {
    fn ctlw0_rd(&self) -> u16;
    fn ctlw0_wr(&self, bits: u16);

    // only call while in reset state
    fn ctlw1_wr(&self, bits: u16);

    // only call while in reset state
    fn brw_wr(&self, ucbr: u16);

    fn i2csa_wr(&self, addr: u16);

    // only call while in reset state
    fn i2coa0_wr(&self, bits: u16);

    fn txbuf_wr(&self, byte: u8);
    fn rxbuf_rd(&self) -> u8;

    fn ie_rd(&self) -> u16;
    fn ie_wr(&self, bits: u16);
    fn ifg_rd(&self) -> u16;
    fn ifg_wr(&self, bits: u16);

    #[inline(always)]
    fn ctlw0_set(&self, mask: u16) {
        self.ctlw0_wr(self.ctlw0_rd().set_mask(mask));
    }

    #[inline(always)]
    fn ctlw0_clear(&self, mask: u16) {
        self.ctlw0_wr(self.ctlw0_rd().clear_mask(mask));
    }

    #[inline(always)]
    fn ctlw0_check(&self, mask: u16) -> bool {
        self.ctlw0_rd().check_mask(mask)
    }
}

macro_rules! eusci_b_impl {
    ($EUsci:ty, $ucbxctlw0:ident, $ucbxctlw1:ident, $ucbxbrw:ident, $ucbxi2csa:ident,
     $ucbxi2coa0:ident, $ucbxtxbuf:ident, $ucbxrxbuf:ident, $ucbxie:ident, $ucbxifg:ident) => {
        impl EUsciB for $EUsci {
            #[inline(always)]
            fn ctlw0_rd(&self) -> u16 {
                self.$ucbxctlw0().read().bits()
            }

            #[inline(always)]
            fn ctlw0_wr(&self, bits: u16) {
                self.$ucbxctlw0().write(|w| unsafe { w.bits(bits) });
            }

            #[inline(always)]
            fn ctlw1_wr(&self, bits: u16) {
                self.$ucbxctlw1().write(|w| unsafe { w.bits(bits) });
            }

            #[inline(always)]
            fn brw_wr(&self, ucbr: u16) {
                self.$ucbxbrw().write(|w| unsafe { w.bits(ucbr) });
            }

            #[inline(always)]
            fn i2csa_wr(&self, addr: u16) {
                self.$ucbxi2csa().write(|w| unsafe { w.bits(addr) });
            }

            #[inline(always)]
            fn i2coa0_wr(&self, bits: u16) {
                self.$ucbxi2coa0().write(|w| unsafe { w.bits(bits) });
            }

            #[inline(always)]
            fn txbuf_wr(&self, byte: u8) {
                self.$ucbxtxbuf().write(|w| unsafe { w.bits(byte.into()) });
            }

            #[inline(always)]
            fn rxbuf_rd(&self) -> u8 {
                self.$ucbxrxbuf().read().bits() as u8
            }

            #[inline(always)]
            fn ie_rd(&self) -> u16 {
                self.$ucbxie().read().bits()
            }

            #[inline(always)]
            fn ie_wr(&self, bits: u16) {
                self.$ucbxie().write(|w| unsafe { w.bits(bits) });
            }

            #[inline(always)]
            fn ifg_rd(&self) -> u16 {
                self.$ucbxifg().read().bits()
            }

            #[inline(always)]
            fn ifg_wr(&self, bits: u16) {
                self.$ucbxifg().write(|w| unsafe { w.bits(bits) });
            }
        }
    };
}

eusci_b_impl!(
    pac::E_USCI_B0,
    ucb0ctlw0,
    ucb0ctlw1,
    ucb0brw,
    ucb0i2csa,
    ucb0i2coa0,
    ucb0txbuf,
    ucb0rxbuf,
    ucb0ie,
    ucb0ifg
);

eusci_b_impl!(
    pac::E_USCI_B1,
    ucb1ctlw0,
    ucb1ctlw1,
    ucb1brw,
    ucb1i2csa,
    ucb1i2coa0,
    ucb1txbuf,
    ucb1rxbuf,
    ucb1ie,
    ucb1ifg
);
