//! Low Power Mode (LPM) control
//!
//! Transfers wait in LPM0, which turns off the CPU and MCLK while SMCLK, ACLK and the eUSCI
//! keep running. The interrupt handler leaves LPM0 by clearing CPUOFF in the stacked status
//! register on return, which `msp430-rt` does for handlers declared with
//! `#[interrupt(wake_cpu)]`.

use core::arch::asm;

// Status register:
// SCG1 SCG0 OSC_OFF CPU_OFF GIE N Z C
// 7    6    5       4       3   2 1 0
const CPU_OFF: u8 = 1<<4;
const GIE:     u8 = 1<<3;

/// For each set bit in the bitmask, set the corresponding bit in the status register.
#[inline(always)]
fn set_sr_bits<const MASK: u8>() {
    unsafe { asm!("bis.b #{mask}, SR", mask = const MASK, options(nomem, nostack)) };
}

/// Enable interrupts and enter Low Power Mode 0 (LPM0) with a single instruction.
///
/// Setting GIE and CPUOFF together means an interrupt that became pending while interrupts were
/// disabled is serviced after the CPU is already asleep, and wakes it.
///
/// Power draw in LPM0: Approx 40 uA / MHz.
#[inline(always)]
pub fn enter_lpm0_enable_interrupts() {
    const LPM0_GIE: u8 = CPU_OFF + GIE;
    set_sr_bits::<LPM0_GIE>();
    // GIE takes effect after the next instruction
    msp430::asm::nop();
}
