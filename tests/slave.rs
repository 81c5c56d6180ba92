mod common;

use common::{pump, SimHal};
use msp430_i2c_xfer::{Address, I2cTransferEngine, InterruptFlags, Phase, Role, SlaveConfig};

fn slave<const N: usize>(config: SlaveConfig) -> I2cTransferEngine<SimHal, N> {
    I2cTransferEngine::slave(SimHal::new(), &config)
}

fn own() -> Address {
    Address::new(0x48).unwrap()
}

#[test]
fn slave_setup_arms_receive_interrupt() {
    let engine = slave::<8>(SlaveConfig::new(own()));
    assert_eq!(engine.role(), Role::Slave);
    let bus = engine.hal().bus.borrow();
    assert_eq!(bus.own, Some(0x48));
    assert!(bus.enabled);
    assert_eq!(bus.ie, InterruptFlags::RECEIVE0);
}

#[test]
fn ring_wraps_after_capacity() {
    let mut engine = slave::<8>(SlaveConfig::new(own()).capacity(4));
    engine.hal().bus.borrow_mut().incoming.extend([1, 2, 3]);
    pump(&mut engine);
    let ring = engine.slave_ring().unwrap();
    assert_eq!(ring.cursor(), 3);
    assert_eq!(ring.as_slice(), &[1, 2, 3, 0]);

    engine.hal().bus.borrow_mut().incoming.extend([4, 5, 6]);
    pump(&mut engine);
    let ring = engine.slave_ring().unwrap();
    assert_eq!(ring.cursor(), 2);
    assert_eq!(ring.as_slice(), &[5, 6, 3, 4]);
    assert_eq!(ring.received(), 6);
}

#[test]
fn default_capacity_is_engine_capacity() {
    let mut engine = slave::<4>(SlaveConfig::new(own()));
    engine.hal().bus.borrow_mut().incoming.extend(0..9);
    assert_eq!(pump(&mut engine), 9);
    let ring = engine.slave_ring().unwrap();
    assert_eq!(ring.capacity(), 4);
    assert_eq!(ring.cursor(), 1);
    assert_eq!(ring.as_slice(), &[8, 5, 6, 7]);
}

#[test]
fn slave_never_leaves_idle() {
    let mut engine = slave::<4>(SlaveConfig::new(own()));
    engine.hal().bus.borrow_mut().incoming.extend([0xAA, 0xBB]);
    pump(&mut engine);
    assert_eq!(engine.phase(), Phase::Idle);
    assert!(engine.take_finished().is_none());
    assert_eq!(engine.stats().unexpected, 0);
    assert_eq!(engine.hal().bus.borrow().calls_to("slave_get_data"), 2);
}

#[test]
fn master_engine_has_no_ring() {
    let engine: I2cTransferEngine<SimHal, 4> =
        I2cTransferEngine::master(SimHal::new(), &msp430_i2c_xfer::MasterConfig::new(1_000_000));
    assert!(engine.slave_ring().is_none());
    assert_eq!(engine.role(), Role::Master);
}
