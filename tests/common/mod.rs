//! Simulated eUSCI_B controller for host tests.
//!
//! The bus only moves when [`Bus::tick`] is called, one hardware step at a time, so tests
//! decide exactly when the interrupt handler runs.
#![allow(dead_code)]

use msp430_i2c_xfer::{
    Address, ClockSource, DataRate, I2cHal, I2cTransferEngine, InterruptFlags, SharedEngine,
};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

const TICK_LIMIT: usize = 10_000;

/// Something visible on the wire
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusOp {
    Start { addr: u8, read: bool },
    Nack,
    Byte(u8),
    Read(u8),
    Stop,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Idle,
    Transmit,
    Receive,
}

#[derive(Debug)]
pub struct Bus {
    pub ie: InterruptFlags,
    pub ifg: InterruptFlags,
    /// HAL methods called by the engine, in order
    pub calls: Vec<&'static str>,
    /// Wire activity, in order
    pub log: Vec<BusOp>,
    /// Flags seen by each interrupt handler run
    pub serviced: Vec<InterruptFlags>,
    /// Slaves present on the bus and the bytes they return when read
    pub devices: HashMap<u8, Vec<u8>>,
    /// Bytes each slave acknowledged
    pub written: HashMap<u8, Vec<u8>>,
    /// Address phases to NACK before acknowledging again
    pub nack_next: usize,
    /// NACK the data byte at this index after the next START, once
    pub nack_byte: Option<usize>,
    /// Bytes a remote master will send to us in slave mode
    pub incoming: VecDeque<u8>,
    pub prescaler: Option<u16>,
    pub source: Option<ClockSource>,
    pub own: Option<u8>,
    pub enabled: bool,

    address: Option<u8>,
    mode: Mode,
    start_pending: Option<bool>,
    tx_loaded: Option<u8>,
    rx_buf: Option<u8>,
    clocked: usize,
    limit: Option<usize>,
    stop_requested: bool,
    acked_this_start: usize,
    ticks: usize,
}

impl Bus {
    fn new() -> Self {
        Bus {
            ie: InterruptFlags::empty(),
            ifg: InterruptFlags::empty(),
            calls: Vec::new(),
            log: Vec::new(),
            serviced: Vec::new(),
            devices: HashMap::new(),
            written: HashMap::new(),
            nack_next: 0,
            nack_byte: None,
            incoming: VecDeque::new(),
            prescaler: None,
            source: None,
            own: None,
            enabled: false,
            address: None,
            mode: Mode::Idle,
            start_pending: None,
            tx_loaded: None,
            rx_buf: None,
            clocked: 0,
            limit: None,
            stop_requested: false,
            acked_this_start: 0,
            ticks: 0,
        }
    }

    fn nack(&mut self) {
        self.log.push(BusOp::Nack);
        self.ifg |= InterruptFlags::NACK;
        self.mode = Mode::Idle;
        self.tx_loaded = None;
    }

    fn finish_stop(&mut self) {
        self.log.push(BusOp::Stop);
        self.ifg |= InterruptFlags::STOP;
        self.stop_requested = false;
        self.mode = Mode::Idle;
    }

    fn transmit(&mut self, byte: u8) {
        if self.nack_byte == Some(self.acked_this_start) {
            self.nack_byte = None;
            self.nack();
            return;
        }
        let addr = self.address.unwrap_or(0);
        self.log.push(BusOp::Byte(byte));
        self.written.entry(addr).or_default().push(byte);
        self.acked_this_start += 1;
        self.ifg |= InterruptFlags::TRANSMIT0;
    }

    /// Advance the hardware by one step. Returns false when nothing could happen.
    pub fn tick(&mut self) -> bool {
        self.ticks += 1;
        assert!(self.ticks < TICK_LIMIT, "bus never went quiet");

        if let Some(read) = self.start_pending.take() {
            let addr = self.address.unwrap_or(0);
            self.log.push(BusOp::Start { addr, read });
            self.acked_this_start = 0;
            if !self.devices.contains_key(&addr) || self.nack_next > 0 {
                self.nack_next = self.nack_next.saturating_sub(1);
                self.nack();
                return true;
            }
            if read {
                self.mode = Mode::Receive;
            } else {
                self.mode = Mode::Transmit;
                if let Some(byte) = self.tx_loaded.take() {
                    self.transmit(byte);
                }
            }
            return true;
        }

        match self.mode {
            Mode::Transmit => {
                if let Some(byte) = self.tx_loaded.take() {
                    self.transmit(byte);
                    true
                } else if self.stop_requested {
                    self.finish_stop();
                    true
                } else {
                    false
                }
            }
            Mode::Receive => {
                let more = self.limit.map_or(true, |limit| self.clocked < limit);
                if self.rx_buf.is_none() && more {
                    let addr = self.address.unwrap_or(0);
                    let byte = self
                        .devices
                        .get(&addr)
                        .and_then(|data| data.get(self.clocked).copied())
                        .unwrap_or(0xFF);
                    self.log.push(BusOp::Read(byte));
                    self.rx_buf = Some(byte);
                    self.clocked += 1;
                    self.ifg |= InterruptFlags::RECEIVE0;
                    true
                } else if self.stop_requested && !more {
                    self.finish_stop();
                    true
                } else {
                    false
                }
            }
            Mode::Idle => {
                if self.stop_requested {
                    self.finish_stop();
                    true
                } else if self.own.is_some() && self.enabled && self.rx_buf.is_none() {
                    match self.incoming.pop_front() {
                        Some(byte) => {
                            self.rx_buf = Some(byte);
                            self.ifg |= InterruptFlags::RECEIVE0;
                            true
                        }
                        None => false,
                    }
                } else {
                    false
                }
            }
        }
    }

    pub fn pending(&self) -> InterruptFlags {
        self.ifg & self.ie
    }

    pub fn count(&self, op: BusOp) -> usize {
        self.log.iter().filter(|&&o| o == op).count()
    }

    pub fn reads(&self) -> usize {
        self.log.iter().filter(|o| matches!(o, BusOp::Read(_))).count()
    }

    pub fn serviced_with(&self, flag: InterruptFlags) -> usize {
        self.serviced.iter().filter(|f| f.contains(flag)).count()
    }

    pub fn calls_to(&self, name: &str) -> usize {
        self.calls.iter().filter(|&&c| c == name).count()
    }
}

thread_local! {
    static PUMP: RefCell<Option<Box<dyn FnMut()>>> = RefCell::new(None);
    static WAKES: Cell<u32> = Cell::new(0);
}

/// Low power wake-ups requested by the engine on this thread
pub fn wakes() -> u32 {
    WAKES.with(|w| w.get())
}

#[derive(Clone, Debug)]
pub struct SimHal {
    pub bus: Rc<RefCell<Bus>>,
}

impl SimHal {
    pub fn new() -> Self {
        SimHal {
            bus: Rc::new(RefCell::new(Bus::new())),
        }
    }

    pub fn with_device(self, addr: u8, data: &[u8]) -> Self {
        self.bus.borrow_mut().devices.insert(addr, data.to_vec());
        self
    }

    fn call(&self, name: &'static str) -> std::cell::RefMut<'_, Bus> {
        let mut bus = self.bus.borrow_mut();
        bus.calls.push(name);
        bus
    }
}

impl I2cHal for SimHal {
    fn configure_master(&mut self, source: ClockSource, clock_hz: u32, rate: DataRate) {
        let mut bus = self.call("configure_master");
        bus.source = Some(source);
        bus.prescaler = Some(rate.prescaler(clock_hz));
    }

    fn configure_slave(&mut self, own: Address) {
        self.call("configure_slave").own = Some(own.get());
    }

    fn set_slave_address(&mut self, addr: Address) {
        self.call("set_slave_address").address = Some(addr.get());
    }

    fn enable_module(&mut self) {
        self.call("enable_module").enabled = true;
    }

    fn send_start(&mut self, byte: u8) {
        let mut bus = self.call("send_start");
        bus.start_pending = Some(false);
        bus.tx_loaded = Some(byte);
    }

    fn send_next(&mut self, byte: u8) {
        self.call("send_next").tx_loaded = Some(byte);
    }

    fn send_stop(&mut self) {
        self.call("send_stop").stop_requested = true;
    }

    fn receive_start(&mut self) {
        let mut bus = self.call("receive_start");
        bus.start_pending = Some(true);
        bus.clocked = 0;
        bus.limit = None;
        bus.rx_buf = None;
    }

    fn receive_next(&mut self) -> u8 {
        self.call("receive_next").rx_buf.take().unwrap_or(0xFF)
    }

    fn receive_stop(&mut self) {
        let mut bus = self.call("receive_stop");
        bus.limit = Some(if bus.start_pending.is_some() { 1 } else { bus.clocked + 1 });
        bus.stop_requested = true;
    }

    fn slave_get_data(&mut self) -> u8 {
        self.call("slave_get_data").rx_buf.take().unwrap_or(0xFF)
    }

    fn is_stop_pending(&self) -> bool {
        let mut bus = self.call("is_stop_pending");
        if bus.stop_requested {
            bus.finish_stop();
            true
        } else {
            false
        }
    }

    fn interrupt_status(&self) -> InterruptFlags {
        let mut bus = self.call("interrupt_status");
        let pending = bus.pending();
        bus.serviced.push(pending);
        pending
    }

    fn clear_interrupt_flags(&mut self, flags: InterruptFlags) {
        self.call("clear_interrupt_flags").ifg.remove(flags);
    }

    fn enable_interrupt(&mut self, flags: InterruptFlags) {
        self.call("enable_interrupt").ie.insert(flags);
    }

    fn disable_interrupt(&mut self, flags: InterruptFlags) {
        self.call("disable_interrupt").ie.remove(flags);
    }

    fn enter_low_power_wait() {
        PUMP.with(|pump| match pump.borrow_mut().as_mut() {
            Some(step) => step(),
            None => panic!("sleeping with nothing to wake us"),
        })
    }

    fn exit_low_power_wait() {
        WAKES.with(|w| w.set(w.get() + 1));
    }
}

/// Run the bus and the interrupt handler until neither has anything left to do.
/// Returns the number of interrupt handler runs.
pub fn pump<const N: usize>(engine: &mut I2cTransferEngine<SimHal, N>) -> usize {
    let bus = engine.hal().bus.clone();
    let mut isrs = 0;
    loop {
        let progressed = bus.borrow_mut().tick();
        if !bus.borrow().pending().is_empty() {
            engine.on_interrupt();
            isrs += 1;
        } else if !progressed {
            return isrs;
        }
    }
}

/// Leak a shared engine and let its low power waits drive the simulated bus.
pub fn shared<const N: usize>(
    engine: I2cTransferEngine<SimHal, N>,
) -> (&'static SharedEngine<SimHal, N>, Rc<RefCell<Bus>>) {
    let bus = engine.hal().bus.clone();
    let shared: &'static SharedEngine<SimHal, N> = Box::leak(Box::new(SharedEngine::new()));
    shared.install(engine);

    let wire = bus.clone();
    PUMP.with(|pump| {
        *pump.borrow_mut() = Some(Box::new(move || {
            // One interrupt per wait, like the real thing
            loop {
                let progressed = wire.borrow_mut().tick();
                if !wire.borrow().pending().is_empty() {
                    shared.on_interrupt();
                    return;
                }
                assert!(progressed, "transfer stalled");
            }
        }));
    });
    (shared, bus)
}
