//! Interrupt-driven transfer engine
//!
//! [`I2cTransferEngine`] owns the transfer state of one I2C controller. Foreground code arms a
//! transfer with [`submit_transfer`](I2cTransferEngine::submit_transfer), then the controller's
//! interrupt handler moves it one byte per interrupt by calling
//! [`on_interrupt`](I2cTransferEngine::on_interrupt). The finished descriptor is collected with
//! [`take_finished`](I2cTransferEngine::take_finished). [`SharedEngine`](crate::SharedEngine)
//! wraps all three into a single suspending call.
//!
//! Master write followed by a read:
//!
//! ```text
//! Idle -> StartWrite -> (transmit)* -> RepeatedStartRead -> (receive)* -> StopPending -> Idle
//! ```
//!
//! Every step is looked up in a (phase, event) table. Pairs missing from the table are counted
//! as unexpected events and otherwise ignored.
//!
//! When reading, STOP is requested while the second-to-last byte is still in the receive buffer
//! so it is already scheduled when the last byte clocks in. Requesting it any later makes the
//! controller clock out one extra byte. Peripherals with different receive timing may need the
//! STOP at another offset.

use crate::config::{MasterConfig, NackPolicy, SlaveConfig};
use crate::error::I2cError;
use crate::hal::{I2cHal, InterruptFlags};
use crate::slave::SlaveRing;
use crate::transfer::{Address, Direction, TransferDescriptor};

/// Position of the engine in the transfer state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// No transfer owns the bus
    Idle,
    /// START sent in transmit mode, write buffer being sent
    StartWrite,
    /// START sent in receive mode, read buffer being filled
    StartRead,
    /// Repeated START sent after the write half, read buffer being filled
    RepeatedStartRead,
    /// STOP requested but not seen on the bus yet
    StopPending,
}

/// Controller role
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Role {
    /// Drives the clock and addresses slaves
    Master,
    /// Answers to its own address and stores everything it receives
    Slave,
}

/// Something the controller reported in one interrupt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// Slave did not acknowledge
    Nack,
    /// Master receive buffer full
    ReceiveReady,
    /// Master transmit buffer empty
    TransmitReady,
    /// STOP seen on the bus
    StopDetected,
    /// Slave receive buffer full
    SlaveReceived,
}

/// Response to an event, as chosen by [`step`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    SendNext,
    RepeatedStart,
    StopAfterWrite,
    Receive,
    StopThenReceive,
    ReceiveLast,
    Restart,
    RestartAfterStop,
    GiveUp,
    Finish,
    Store,
    Ignore,
    Unexpected,
}

/// Transition table
pub(crate) fn step<const N: usize>(
    phase: Phase,
    event: Event,
    xfer: Option<&TransferDescriptor<N>>,
    may_retry: bool,
) -> Action {
    use Phase::*;
    match (phase, event, xfer) {
        (Idle, Event::SlaveReceived, None) => Action::Store,

        (StartWrite, Event::TransmitReady, Some(x)) => {
            if x.cursor() < x.write_buf().len() {
                Action::SendNext
            } else if x.direction() == Direction::WriteThenRead {
                Action::RepeatedStart
            } else {
                Action::StopAfterWrite
            }
        }

        (StartRead | RepeatedStartRead, Event::ReceiveReady, Some(x)) => {
            if x.cursor() + 2 == x.read_buf().len() {
                Action::StopThenReceive
            } else {
                Action::Receive
            }
        }
        (StopPending, Event::ReceiveReady, Some(x)) if x.remaining() > 0 => Action::ReceiveLast,

        (StartWrite | StartRead | RepeatedStartRead, Event::Nack, Some(_)) => {
            if may_retry {
                Action::Restart
            } else {
                Action::GiveUp
            }
        }
        // Address NACK on a single byte read, STOP already scheduled
        (StopPending, Event::Nack, Some(x)) if x.cursor() == 0 && x.remaining() > 0 => {
            if may_retry {
                Action::RestartAfterStop
            } else {
                Action::GiveUp
            }
        }
        // Slaves commonly NACK the last byte of a write
        (StopPending, Event::Nack, _) => Action::Ignore,

        (StopPending, Event::StopDetected, _) => Action::Finish,

        _ => Action::Unexpected,
    }
}

/// Engine counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EngineStats {
    /// Transfers handed back successfully
    pub completed: u32,
    /// Transfers handed back with an error
    pub failed: u32,
    /// NACKs received
    pub nacks: u32,
    /// Events that didn't fit the current phase
    pub unexpected: u32,
}

/// Per-controller transfer state
#[derive(Debug)]
pub struct EngineState<const N: usize> {
    phase: Phase,
    current: Option<TransferDescriptor<N>>,
    finished: Option<Result<TransferDescriptor<N>, I2cError>>,
    slave_address: Option<Address>,
    stop_pending: bool,
    restart_pending: bool,
    retries: u8,
    stats: EngineStats,
}

impl<const N: usize> EngineState<N> {
    const fn new() -> Self {
        EngineState {
            phase: Phase::Idle,
            current: None,
            finished: None,
            slave_address: None,
            stop_pending: false,
            restart_pending: false,
            retries: 0,
            stats: EngineStats {
                completed: 0,
                failed: 0,
                nacks: 0,
                unexpected: 0,
            },
        }
    }

    /// Current phase
    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Transfer currently owned by the engine
    #[inline]
    pub fn current(&self) -> Option<&TransferDescriptor<N>> {
        self.current.as_ref()
    }

    /// Address last programmed into the controller
    #[inline]
    pub fn slave_address(&self) -> Option<Address> {
        self.slave_address
    }

    /// True between requesting STOP and seeing it on the bus
    #[inline]
    pub fn stop_pending(&self) -> bool {
        self.stop_pending
    }

    /// NACK retries spent on the current transfer
    #[inline]
    pub fn retries(&self) -> u8 {
        self.retries
    }

    /// Counters
    #[inline]
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        if let Some(xfer) = self.current.as_mut() {
            xfer.phase = phase;
        }
    }

    fn request_stop<H: I2cHal>(&mut self, hal: &mut H) {
        hal.enable_interrupt(InterruptFlags::STOP);
        self.stop_pending = true;
        self.enter(Phase::StopPending);
    }

    fn begin_write<H: I2cHal>(&mut self, hal: &mut H) {
        self.enter(Phase::StartWrite);
        let Some(xfer) = self.current.as_mut() else { return };
        xfer.cursor = 0;
        let Some(first) = xfer.next_tx() else { return };
        hal.disable_interrupt(InterruptFlags::RECEIVE0);
        hal.clear_interrupt_flags(InterruptFlags::TRANSMIT0 | InterruptFlags::NACK);
        hal.enable_interrupt(InterruptFlags::TRANSMIT0 | InterruptFlags::NACK);
        hal.send_start(first);
    }

    fn begin_read<H: I2cHal>(&mut self, hal: &mut H, repeated: bool) {
        self.enter(if repeated { Phase::RepeatedStartRead } else { Phase::StartRead });
        let Some(xfer) = self.current.as_mut() else { return };
        xfer.cursor = 0;
        let single = xfer.read_buf().len() == 1;
        hal.disable_interrupt(InterruptFlags::TRANSMIT0);
        hal.clear_interrupt_flags(InterruptFlags::RECEIVE0);
        hal.enable_interrupt(InterruptFlags::RECEIVE0 | InterruptFlags::NACK);
        hal.receive_start();
        if single {
            hal.receive_stop();
            self.request_stop(hal);
        }
    }

    fn complete<H: I2cHal>(&mut self, result: Result<TransferDescriptor<N>, I2cError>) {
        match result {
            Ok(_) => self.stats.completed += 1,
            Err(_) => self.stats.failed += 1,
        }
        self.finished = Some(result);
        H::exit_low_power_wait();
    }
}

enum Mode<const N: usize> {
    Master { policy: NackPolicy },
    Slave { ring: SlaveRing<N> },
}

/// Transfer engine for one I2C controller, with buffers of up to `N` bytes
pub struct I2cTransferEngine<H: I2cHal, const N: usize> {
    hal: H,
    state: EngineState<N>,
    mode: Mode<N>,
}

impl<H: I2cHal, const N: usize> I2cTransferEngine<H, N> {
    /// Configure the controller as a master and enable it
    pub fn master(mut hal: H, config: &MasterConfig) -> Self {
        hal.configure_master(config.clock_source, config.clock_hz, config.data_rate);
        hal.enable_module();
        debug!("i2c: master ready");
        I2cTransferEngine {
            hal,
            state: EngineState::new(),
            mode: Mode::Master {
                policy: config.nack_policy,
            },
        }
    }

    /// Configure the controller as a slave, enable it and arm the receive interrupt
    pub fn slave(mut hal: H, config: &SlaveConfig) -> Self {
        hal.configure_slave(config.own_address);
        hal.enable_module();
        hal.clear_interrupt_flags(InterruptFlags::RECEIVE0);
        hal.enable_interrupt(InterruptFlags::RECEIVE0);
        debug!("i2c: slave ready at {=u8:#x}", config.own_address.get());
        I2cTransferEngine {
            hal,
            state: EngineState::new(),
            mode: Mode::Slave {
                ring: SlaveRing::new(config.capacity.unwrap_or(N)),
            },
        }
    }

    /// Role the controller was configured for
    pub fn role(&self) -> Role {
        match self.mode {
            Mode::Master { .. } => Role::Master,
            Mode::Slave { .. } => Role::Slave,
        }
    }

    /// Arm `xfer` and start it on the bus.
    ///
    /// If the previous transfer's STOP is still on its way out, busy-waits until the controller
    /// reports it sent. Fails with [`I2cError::EngineBusy`] without touching the hardware while
    /// another transfer is in flight or its result hasn't been collected.
    pub fn submit_transfer(&mut self, xfer: TransferDescriptor<N>) -> Result<(), I2cError> {
        if self.role() != Role::Master {
            return Err(I2cError::WrongRole);
        }
        if self.state.current.is_some() || self.state.finished.is_some() {
            return Err(I2cError::EngineBusy);
        }
        xfer.validate()?;

        if self.state.phase == Phase::StopPending {
            while self.hal.is_stop_pending() {
                core::hint::spin_loop();
            }
            self.settle();
        }
        if self.state.phase != Phase::Idle {
            return Err(I2cError::EngineBusy);
        }

        let address = xfer.address();
        if self.state.slave_address != Some(address) {
            self.hal.set_slave_address(address);
            self.state.slave_address = Some(address);
        }

        trace!(
            "i2c: submit {} to {=u8:#x}, {=usize} out, {=usize} in",
            xfer.direction(),
            address.get(),
            xfer.write_buf().len(),
            xfer.read_buf().len()
        );

        let direction = xfer.direction();
        self.state.retries = 0;
        self.state.current = Some(xfer);
        match direction {
            Direction::Write | Direction::WriteThenRead => self.state.begin_write(&mut self.hal),
            Direction::Read => self.state.begin_read(&mut self.hal, false),
        }
        Ok(())
    }

    /// Interrupt handler entry. Reads and clears the pending flags, then handles them.
    pub fn on_interrupt(&mut self) {
        let flags = self.hal.interrupt_status();
        self.hal.clear_interrupt_flags(flags);
        self.on_interrupt_event(flags);
    }

    /// Handle an already latched and cleared set of interrupt flags.
    ///
    /// Events are handled in the order NACK, receive, transmit, STOP. A NACK discards the byte
    /// events latched with it. Never blocks.
    pub fn on_interrupt_event(&mut self, flags: InterruptFlags) {
        let known = InterruptFlags::NACK
            | InterruptFlags::RECEIVE0
            | InterruptFlags::TRANSMIT0
            | InterruptFlags::STOP;

        match self.mode {
            Mode::Slave { .. } => {
                if flags.contains(InterruptFlags::RECEIVE0) {
                    self.handle(Event::SlaveReceived);
                }
            }
            Mode::Master { .. } => {
                if !flags.difference(known).is_empty() {
                    self.state.stats.unexpected += 1;
                    warn!("i2c: unhandled flags {=u16:#x}", flags.difference(known).bits());
                }
                let mut flags = flags;
                if flags.contains(InterruptFlags::NACK) {
                    self.handle(Event::Nack);
                    // Byte flags latched alongside a NACK belong to the abandoned attempt
                    flags.remove(InterruptFlags::RECEIVE0 | InterruptFlags::TRANSMIT0);
                }
                for (flag, event) in [
                    (InterruptFlags::RECEIVE0, Event::ReceiveReady),
                    (InterruptFlags::TRANSMIT0, Event::TransmitReady),
                    (InterruptFlags::STOP, Event::StopDetected),
                ] {
                    if flags.contains(flag) {
                        self.handle(event);
                    }
                }
            }
        }
    }

    fn may_retry(&self) -> bool {
        match self.mode {
            Mode::Master { policy } => match policy {
                NackPolicy::Abort => false,
                NackPolicy::Retry(max) => self.state.retries < max,
                NackPolicy::RetryForever => true,
            },
            Mode::Slave { .. } => false,
        }
    }

    fn handle(&mut self, event: Event) {
        if event == Event::Nack {
            self.state.stats.nacks += 1;
        }
        let action = step(self.state.phase, event, self.state.current.as_ref(), self.may_retry());
        let state = &mut self.state;
        let hal = &mut self.hal;

        match action {
            Action::SendNext => {
                if let Some(byte) = state.current.as_mut().and_then(|x| x.next_tx()) {
                    hal.send_next(byte);
                }
            }
            Action::RepeatedStart => state.begin_read(hal, true),
            Action::StopAfterWrite => {
                hal.send_stop();
                hal.disable_interrupt(InterruptFlags::TRANSMIT0 | InterruptFlags::NACK);
                state.request_stop(hal);
                if let Some(xfer) = state.current.take() {
                    state.complete::<H>(Ok(xfer));
                }
            }
            Action::Receive | Action::ReceiveLast => {
                let byte = hal.receive_next();
                if let Some(xfer) = state.current.as_mut() {
                    xfer.store_rx(byte);
                }
            }
            Action::StopThenReceive => {
                // STOP goes out before the buffer is read, see module docs
                hal.receive_stop();
                state.request_stop(hal);
                let byte = hal.receive_next();
                if let Some(xfer) = state.current.as_mut() {
                    xfer.store_rx(byte);
                }
            }
            Action::Restart => {
                state.retries = state.retries.saturating_add(1);
                debug!("i2c: NACK, restart #{=u8}", state.retries);
                let phase = state.phase;
                match phase {
                    Phase::StartWrite => state.begin_write(hal),
                    _ => state.begin_read(hal, phase == Phase::RepeatedStartRead),
                }
            }
            Action::RestartAfterStop => {
                state.retries = state.retries.saturating_add(1);
                debug!("i2c: NACK, restart #{=u8} after STOP", state.retries);
                state.restart_pending = true;
            }
            Action::GiveUp => {
                warn!("i2c: NACK, giving up after {=u8} retries", state.retries);
                hal.send_stop();
                hal.disable_interrupt(
                    InterruptFlags::TRANSMIT0 | InterruptFlags::RECEIVE0 | InterruptFlags::NACK,
                );
                state.current = None;
                state.request_stop(hal);
                state.complete::<H>(Err(I2cError::NotAcknowledged));
            }
            Action::Finish if state.restart_pending => {
                state.restart_pending = false;
                state.stop_pending = false;
                state.begin_read(hal, false);
            }
            Action::Finish => {
                let undrained = state.current.as_ref().map_or(false, |x| x.remaining() > 0);
                if undrained {
                    let byte = hal.receive_next();
                    if let Some(xfer) = state.current.as_mut() {
                        xfer.store_rx(byte);
                    }
                }
                hal.disable_interrupt(
                    InterruptFlags::TRANSMIT0
                        | InterruptFlags::RECEIVE0
                        | InterruptFlags::NACK
                        | InterruptFlags::STOP,
                );
                state.stop_pending = false;
                state.enter(Phase::Idle);
                if let Some(xfer) = state.current.take() {
                    state.complete::<H>(Ok(xfer));
                }
            }
            Action::Store => {
                if let Mode::Slave { ring } = &mut self.mode {
                    ring.push(hal.slave_get_data());
                }
            }
            Action::Ignore => (),
            Action::Unexpected => {
                state.stats.unexpected += 1;
                warn!("i2c: unexpected {} in {}", event, state.phase);
            }
        }
    }

    /// STOP confirmed by polling instead of by interrupt
    fn settle(&mut self) {
        self.hal.disable_interrupt(InterruptFlags::STOP);
        self.hal.clear_interrupt_flags(InterruptFlags::STOP);
        self.state.stop_pending = false;
        self.state.enter(Phase::Idle);
    }

    /// Collect the result of the last transfer, if it has finished
    pub fn take_finished(&mut self) -> Option<Result<TransferDescriptor<N>, I2cError>> {
        self.state.finished.take()
    }

    /// Current phase
    #[inline]
    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// True when no transfer owns the bus
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.state.phase == Phase::Idle && self.state.current.is_none()
    }

    /// Transfer state
    #[inline]
    pub fn state(&self) -> &EngineState<N> {
        &self.state
    }

    /// Counters
    #[inline]
    pub fn stats(&self) -> EngineStats {
        self.state.stats
    }

    /// Slave receive ring. `None` in master role.
    pub fn slave_ring(&self) -> Option<&SlaveRing<N>> {
        match &self.mode {
            Mode::Slave { ring } => Some(ring),
            Mode::Master { .. } => None,
        }
    }

    /// Underlying hardware
    #[inline]
    pub fn hal(&self) -> &H {
        &self.hal
    }

    /// Underlying hardware
    #[inline]
    pub fn hal_mut(&mut self) -> &mut H {
        &mut self.hal
    }

    /// Give the hardware back
    pub fn release(self) -> H {
        self.hal
    }
}
