//! Controller configuration
//!
//! Begin master configuration with [`MasterConfig::new()`] and slave configuration with
//! [`SlaveConfig::new()`]. The finished config is handed to
//! [`I2cTransferEngine::master`](crate::engine::I2cTransferEngine::master) or
//! [`I2cTransferEngine::slave`](crate::engine::I2cTransferEngine::slave), which program the
//! peripheral through the [`I2cHal`](crate::hal::I2cHal).

use crate::transfer::Address;

/// Clock feeding the bit-rate generator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockSource {
    /// Auxiliary clock
    Aclk,
    /// Subsystem master clock
    Smclk,
}

/// SCL frequency
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataRate {
    /// Standard mode, 100 kHz
    _100kbps,
    /// Fast mode, 400 kHz
    _400kbps,
    /// Fast mode plus, 1 MHz
    _1Mbps,
}

impl DataRate {
    /// Bus frequency in Hz
    #[inline]
    pub const fn hz(self) -> u32 {
        match self {
            DataRate::_100kbps => 100_000,
            DataRate::_400kbps => 400_000,
            DataRate::_1Mbps => 1_000_000,
        }
    }

    /// Bit-rate prescaler for a source clock of `clock_hz`. Never returns 0.
    #[inline]
    pub const fn prescaler(self, clock_hz: u32) -> u16 {
        // u32::MAX / 100 kHz still fits in 16 bits
        let div = clock_hz / self.hz();
        if div == 0 {
            1
        } else {
            div as u16
        }
    }
}

/// What the engine does when the addressed slave answers with a NACK
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NackPolicy {
    /// Send STOP and report [`I2cError::NotAcknowledged`](crate::I2cError::NotAcknowledged)
    Abort,
    /// Re-send START up to this many times before giving up
    Retry(u8),
    /// Re-send START until the slave answers. The transfer hangs if it never does.
    RetryForever,
}

impl Default for NackPolicy {
    fn default() -> Self {
        NackPolicy::Retry(3)
    }
}

/// Master mode configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MasterConfig {
    pub(crate) clock_source: ClockSource,
    pub(crate) clock_hz: u32,
    pub(crate) data_rate: DataRate,
    pub(crate) nack_policy: NackPolicy,
}

impl MasterConfig {
    /// SMCLK at `clock_hz`, 100 kHz bus, default NACK policy
    pub const fn new(clock_hz: u32) -> Self {
        MasterConfig {
            clock_source: ClockSource::Smclk,
            clock_hz,
            data_rate: DataRate::_100kbps,
            nack_policy: NackPolicy::Retry(3),
        }
    }

    /// Clock the bus from SMCLK running at `clock_hz`
    #[inline]
    pub const fn use_smclk(mut self, clock_hz: u32) -> Self {
        self.clock_source = ClockSource::Smclk;
        self.clock_hz = clock_hz;
        self
    }

    /// Clock the bus from ACLK running at `clock_hz`
    #[inline]
    pub const fn use_aclk(mut self, clock_hz: u32) -> Self {
        self.clock_source = ClockSource::Aclk;
        self.clock_hz = clock_hz;
        self
    }

    /// Set the SCL frequency
    #[inline]
    pub const fn data_rate(mut self, rate: DataRate) -> Self {
        self.data_rate = rate;
        self
    }

    /// Set the NACK handling policy
    #[inline]
    pub const fn nack_policy(mut self, policy: NackPolicy) -> Self {
        self.nack_policy = policy;
        self
    }

    /// Selected clock source
    pub const fn clock_source(&self) -> ClockSource {
        self.clock_source
    }

    /// Source clock frequency in Hz
    pub const fn clock_hz(&self) -> u32 {
        self.clock_hz
    }

    /// Selected SCL frequency
    pub const fn rate(&self) -> DataRate {
        self.data_rate
    }

    /// Selected NACK policy
    pub const fn policy(&self) -> NackPolicy {
        self.nack_policy
    }
}

/// Slave mode configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlaveConfig {
    pub(crate) own_address: Address,
    pub(crate) capacity: Option<usize>,
}

impl SlaveConfig {
    /// Respond to `own_address`. The receive ring uses the engine's full capacity.
    pub const fn new(own_address: Address) -> Self {
        SlaveConfig {
            own_address,
            capacity: None,
        }
    }

    /// Wrap the receive ring after `len` bytes. Clamped to `1..=N` by the engine.
    #[inline]
    pub const fn capacity(mut self, len: usize) -> Self {
        self.capacity = Some(len);
        self
    }

    /// Address this controller answers to
    pub const fn own_address(&self) -> Address {
        self.own_address
    }
}
