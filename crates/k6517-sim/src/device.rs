//! Simulated electrometer measurement model
//!
//! [`Device`] holds the two measurement channels, the selected channel, the
//! latest reading, the idle flag and the error queue. Operations that take a
//! channel name record [`codes::PROGRAM_SYNTAX_ERROR`] when the name is
//! unknown and return [`DeviceError`] so the caller knows nothing changed.

use k6517_protocol::ChannelName;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::channel::Channel;
use crate::error::{codes, DeviceError};
use crate::error_queue::{ErrorQueue, PushOutcome};

/// Configuration for creating a simulated device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Synthesize a random reading on every measurement trigger
    pub random_mode: bool,
    /// Seed for random readings; entropy-seeded when absent
    pub seed: Option<u64>,
    /// Initial VOLT range
    pub volt_range: f64,
    /// Initial CURR range
    pub curr_range: f64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            random_mode: true,
            seed: None,
            volt_range: 0.0,
            curr_range: 0.0,
        }
    }
}

/// Snapshot of one channel, for the test backdoor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    pub name: ChannelName,
    pub range: f64,
    pub pending: Vec<f64>,
}

/// Snapshot of the whole device, for the test backdoor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub selected_channel: ChannelName,
    pub latest_reading: f64,
    pub idle: bool,
    pub random_mode: bool,
    pub channels: Vec<ChannelSnapshot>,
    pub errors: Vec<i32>,
}

/// A simulated electrometer
#[derive(Debug)]
pub struct Device {
    /// Indexed by [`ChannelName::index`]
    channels: [Channel; 2],
    selected: ChannelName,
    latest_reading: f64,
    idle: bool,
    errors: ErrorQueue,
    random_mode: bool,
    rng: StdRng,
}

impl Device {
    /// Create a device with default settings
    pub fn new() -> Self {
        Self::from_config(DeviceConfig::default())
    }

    /// Create a device from configuration
    pub fn from_config(config: DeviceConfig) -> Self {
        let mut channels = ChannelName::ALL.map(Channel::new);
        channels[ChannelName::Volt.index()].set_range(config.volt_range);
        channels[ChannelName::Curr.index()].set_range(config.curr_range);

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            channels,
            selected: ChannelName::Volt,
            latest_reading: 0.0,
            idle: true,
            errors: ErrorQueue::new(),
            random_mode: config.random_mode,
            rng,
        }
    }

    /// Resolve a channel name, recording a syntax error if it is unknown
    fn resolve(&mut self, name: &str) -> Result<ChannelName, DeviceError> {
        name.parse::<ChannelName>().map_err(|_| {
            let err = DeviceError::UnknownChannel(name.to_string());
            warn!("{}", err);
            self.add_error(err.code());
            err
        })
    }

    /// Get a channel
    pub fn channel(&self, name: ChannelName) -> &Channel {
        &self.channels[name.index()]
    }

    /// Get a channel mutably
    pub fn channel_mut(&mut self, name: ChannelName) -> &mut Channel {
        &mut self.channels[name.index()]
    }

    /// Select the measurement function by name
    pub fn select_channel(&mut self, name: &str) -> Result<(), DeviceError> {
        let channel = self.resolve(name)?;
        self.set_selected_channel(channel);
        Ok(())
    }

    /// Select the measurement function
    pub fn set_selected_channel(&mut self, channel: ChannelName) {
        self.selected = channel;
    }

    /// Get the selected measurement function
    pub fn selected_channel(&self) -> ChannelName {
        self.selected
    }

    /// Get the uppercase name of the selected measurement function
    pub fn selected_channel_name(&self) -> &'static str {
        self.selected.as_str()
    }

    /// Set a channel's range by name
    pub fn set_range(&mut self, name: &str, value: f64) -> Result<(), DeviceError> {
        let channel = self.resolve(name)?;
        self.channel_mut(channel).set_range(value);
        Ok(())
    }

    /// Get a channel's range by name
    pub fn get_range(&mut self, name: &str) -> Result<f64, DeviceError> {
        let channel = self.resolve(name)?;
        Ok(self.channel(channel).range())
    }

    /// Consume one reading from the selected channel
    ///
    /// In random mode a fresh reading in `[0, range)` is queued first. A
    /// reading above range records [`codes::PARAMETER_OUT_OF_RANGE`] and is
    /// then clamped into `[0, range]`. With nothing pending the reading is 0.
    pub fn measure(&mut self) {
        let channel = &mut self.channels[self.selected.index()];

        if self.random_mode {
            let sample = self.rng.gen::<f64>() * channel.range();
            channel.push_reading(sample);
        }

        let range = channel.range();
        let popped = channel.pop_reading();

        self.latest_reading = match popped {
            Some(value) => {
                if value > range {
                    warn!("{} reading {} exceeds range {}", self.selected, value, range);
                    self.add_error(codes::PARAMETER_OUT_OF_RANGE);
                }
                value.min(range).max(0.0)
            }
            None => 0.0,
        };

        debug!("Measured {} on {}", self.latest_reading, self.selected);
    }

    /// Leave idle and take a measurement
    pub fn initiate(&mut self) {
        self.idle = false;
        self.measure();
    }

    /// Return to idle and zero the latest reading
    pub fn abort(&mut self) {
        self.idle = true;
        self.latest_reading = 0.0;
    }

    /// Latest reading, without triggering a measurement
    pub fn fetch(&self) -> f64 {
        self.latest_reading
    }

    /// Check if the trigger model is idle
    pub fn is_idle(&self) -> bool {
        self.idle
    }

    /// Record an error code
    pub fn add_error(&mut self, code: i32) -> PushOutcome {
        let outcome = self.errors.push(code);
        if outcome == PushOutcome::Dropped {
            debug!("Error queue full, discarded {}", code);
        }
        outcome
    }

    /// Remove and return the oldest error code, or 0 when none are pending
    pub fn pop_error(&mut self) -> i32 {
        self.errors.pop()
    }

    /// Remove every pending error code
    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    /// Get the error queue
    pub fn errors(&self) -> &ErrorQueue {
        &self.errors
    }

    /// Queue the fixed codes 2, 5 and 10
    pub fn add_mock_errors(&mut self) {
        for code in [2, 5, 10] {
            self.add_error(code);
        }
    }

    /// Queue readings on a channel exactly as given
    pub fn insert_mock_readings(&mut self, values: &[f64], channel: ChannelName) {
        let channel = self.channel_mut(channel);
        for &value in values {
            channel.push_reading(value);
        }
    }

    /// Check if random readings are synthesized
    pub fn random_mode(&self) -> bool {
        self.random_mode
    }

    /// Enable or disable random readings
    pub fn set_random_mode(&mut self, enabled: bool) {
        self.random_mode = enabled;
    }

    /// Capture the full device state
    pub fn snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            selected_channel: self.selected,
            latest_reading: self.latest_reading,
            idle: self.idle,
            random_mode: self.random_mode,
            channels: self
                .channels
                .iter()
                .map(|c| ChannelSnapshot {
                    name: c.name(),
                    range: c.range(),
                    pending: c.pending().collect(),
                })
                .collect(),
            errors: self.errors.iter().collect(),
        }
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_queue::ERROR_QUEUE_DEPTH;

    fn mock_device() -> Device {
        Device::from_config(DeviceConfig {
            random_mode: false,
            ..Default::default()
        })
    }

    #[test]
    fn test_initial_state() {
        let device = Device::new();
        assert_eq!(device.selected_channel(), ChannelName::Volt);
        assert_eq!(device.fetch(), 0.0);
        assert!(device.is_idle());
        assert!(device.random_mode());
        assert!(device.errors().is_empty());
        for name in ChannelName::ALL {
            assert_eq!(device.channel(name).range(), 0.0);
            assert_eq!(device.channel(name).pending_count(), 0);
        }
    }

    #[test]
    fn test_mock_readings_clamped_with_error() {
        let mut device = mock_device();
        device.set_range("VOLT", 2.0).unwrap();
        device.insert_mock_readings(&[0.1, 1.1, 2.0, 2.5], ChannelName::Volt);

        let readings: Vec<f64> = (0..4)
            .map(|_| {
                device.measure();
                device.fetch()
            })
            .collect();

        assert_eq!(readings, vec![0.1, 1.1, 2.0, 2.0]);
        assert_eq!(device.pop_error(), codes::PARAMETER_OUT_OF_RANGE);
        assert_eq!(device.pop_error(), codes::NO_ERROR);
    }

    #[test]
    fn test_measure_empty_queue_reads_zero() {
        let mut device = mock_device();
        device.insert_mock_readings(&[0.0], ChannelName::Volt);
        device.set_range("volt", 1.0).unwrap();
        device.insert_mock_readings(&[0.5], ChannelName::Volt);

        device.measure();
        device.measure();
        assert_eq!(device.fetch(), 0.5);

        device.measure();
        assert_eq!(device.fetch(), 0.0);
        assert!(device.errors().is_empty());
    }

    #[test]
    fn test_measure_uses_selected_channel_only() {
        let mut device = mock_device();
        device.set_range("CURR", 0.02).unwrap();
        device.insert_mock_readings(&[0.005], ChannelName::Curr);
        device.insert_mock_readings(&[0.0], ChannelName::Volt);

        device.select_channel("CURR").unwrap();
        device.measure();

        assert_eq!(device.fetch(), 0.005);
        assert_eq!(device.channel(ChannelName::Volt).pending_count(), 1);
        assert_eq!(device.channel(ChannelName::Curr).pending_count(), 0);
    }

    #[test]
    fn test_random_mode_stays_in_range() {
        let mut device = Device::from_config(DeviceConfig {
            random_mode: true,
            seed: Some(7),
            volt_range: 5.0,
            curr_range: 0.0,
        });

        for _ in 0..100 {
            device.measure();
            let reading = device.fetch();
            assert!((0.0..5.0).contains(&reading), "reading {}", reading);
        }
        assert!(device.errors().is_empty());
        assert_eq!(device.channel(ChannelName::Volt).pending_count(), 0);
    }

    #[test]
    fn test_random_mode_consumes_mock_readings_first() {
        let mut device = Device::from_config(DeviceConfig {
            seed: Some(1),
            volt_range: 1.0,
            ..Default::default()
        });
        device.insert_mock_readings(&[0.75], ChannelName::Volt);

        device.measure();
        assert_eq!(device.fetch(), 0.75);
        // The synthesized reading is still queued behind it
        assert_eq!(device.channel(ChannelName::Volt).pending_count(), 1);
    }

    #[test]
    fn test_seeded_devices_agree() {
        let config = DeviceConfig {
            seed: Some(42),
            volt_range: 10.0,
            ..Default::default()
        };
        let mut a = Device::from_config(config.clone());
        let mut b = Device::from_config(config);

        for _ in 0..5 {
            a.measure();
            b.measure();
            assert_eq!(a.fetch(), b.fetch());
        }
    }

    #[test]
    fn test_fetch_is_idempotent() {
        let mut device = mock_device();
        device.set_range("VOLT", 3.0).unwrap();
        device.insert_mock_readings(&[1.5, 2.5], ChannelName::Volt);
        device.initiate();

        assert_eq!(device.fetch(), 1.5);
        assert_eq!(device.fetch(), 1.5);
        assert_eq!(device.channel(ChannelName::Volt).pending_count(), 1);
    }

    #[test]
    fn test_initiate_and_abort() {
        let mut device = mock_device();
        device.set_range("VOLT", 3.0).unwrap();
        device.insert_mock_readings(&[1.5, 2.5], ChannelName::Volt);
        device.insert_mock_readings(&[0.01], ChannelName::Curr);

        device.initiate();
        assert!(!device.is_idle());
        assert_eq!(device.fetch(), 1.5);

        device.abort();
        assert!(device.is_idle());
        assert_eq!(device.fetch(), 0.0);
        assert_eq!(device.channel(ChannelName::Volt).pending_count(), 1);
        assert_eq!(device.channel(ChannelName::Curr).pending_count(), 1);
    }

    #[test]
    fn test_select_unknown_channel() {
        let mut device = mock_device();
        device.select_channel("CURR").unwrap();

        let result = device.select_channel("bogus");

        assert_eq!(result, Err(DeviceError::UnknownChannel("bogus".into())));
        assert_eq!(device.selected_channel(), ChannelName::Curr);
        assert_eq!(device.pop_error(), codes::PROGRAM_SYNTAX_ERROR);
    }

    #[test]
    fn test_select_channel_case_insensitive() {
        let mut device = mock_device();
        device.select_channel("curr").unwrap();
        assert_eq!(device.selected_channel_name(), "CURR");
    }

    #[test]
    fn test_range_round_trip() {
        let mut device = mock_device();
        device.set_range("VOLT", 5.0).unwrap();
        assert_eq!(device.get_range("VOLT"), Ok(5.0));
        assert_eq!(device.get_range("CURR"), Ok(0.0));
    }

    #[test]
    fn test_range_unknown_channel() {
        let mut device = mock_device();

        assert!(device.set_range("RES", 1.0).is_err());
        assert!(device.get_range("RES").is_err());

        assert_eq!(device.pop_error(), codes::PROGRAM_SYNTAX_ERROR);
        assert_eq!(device.pop_error(), codes::PROGRAM_SYNTAX_ERROR);
        assert_eq!(device.pop_error(), codes::NO_ERROR);
    }

    #[test]
    fn test_add_mock_errors() {
        let mut device = mock_device();
        device.add_mock_errors();

        assert_eq!(device.pop_error(), 2);
        assert_eq!(device.pop_error(), 5);
        assert_eq!(device.pop_error(), 10);
        assert_eq!(device.pop_error(), 0);
    }

    #[test]
    fn test_clear_then_pop() {
        let mut device = mock_device();
        device.add_mock_errors();
        device.clear_errors();
        assert_eq!(device.pop_error(), 0);
    }

    #[test]
    fn test_add_error_reports_outcome() {
        let mut device = mock_device();
        for code in 1..ERROR_QUEUE_DEPTH as i32 {
            assert_eq!(device.add_error(code), PushOutcome::Recorded);
        }
        assert_eq!(device.add_error(99), PushOutcome::Overflowed);
        assert_eq!(device.add_error(100), PushOutcome::Dropped);

        // Over-range readings take the same path once the queue is full
        device.set_range("VOLT", 1.0).unwrap();
        device.insert_mock_readings(&[5.0], ChannelName::Volt);
        device.measure();
        assert_eq!(device.fetch(), 1.0);
        assert_eq!(device.errors().len(), ERROR_QUEUE_DEPTH);
    }

    #[test]
    fn test_snapshot() {
        let mut device = mock_device();
        device.set_range("CURR", 0.02).unwrap();
        device.insert_mock_readings(&[0.01], ChannelName::Curr);
        device.add_error(5);

        let snapshot = device.snapshot();
        assert_eq!(snapshot.selected_channel, ChannelName::Volt);
        assert!(snapshot.idle);
        assert!(!snapshot.random_mode);
        assert_eq!(snapshot.channels[1].name, ChannelName::Curr);
        assert_eq!(snapshot.channels[1].range, 0.02);
        assert_eq!(snapshot.channels[1].pending, vec![0.01]);
        assert_eq!(snapshot.errors, vec![5]);
    }
}
