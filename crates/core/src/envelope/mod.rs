//! Attack/decay buffers, hysteresis gates and the soft-knee clipper.
//!
//! State is keyed by a caller-chosen fixture or zone identifier. Keys are
//! expected to be stable for a session, so tables are small and fixed in
//! capacity; when a table fills up the least recently touched key is recycled.

use crate::frame::unit;

/// Values under this level decay straight to zero.
pub const NOISE_FLOOR: f32 = 0.02;

/// Consecutive frames a hysteresis flip must persist before it is honoured.
pub const MIN_STABLE_FRAMES: u32 = 2;

/// Capacity used by [`KeyedTable::default`].
pub const DEFAULT_CAPACITY: usize = 32;

const SOFT_KNEE_FLOOR: f32 = 0.15;
const SOFT_KNEE_CEILING: f32 = 0.25;

/// Fixture family selecting the decay factor range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneKind {
    /// Wash/PAR fixtures: sharper cut.
    Par,
    /// Moving heads: longer, more liquid tail.
    Mover,
}

impl ZoneKind {
    /// Per-frame multiplicative decay factor for a speed in `1..=10`.
    pub fn decay_factor(self, speed: u8) -> f32 {
        let steps = (speed.clamp(1, 10) - 1) as f32;
        match self {
            ZoneKind::Par => 0.65 + steps * 0.03,
            ZoneKind::Mover => 0.70 + steps * 0.02,
        }
    }
}

/// Small fixed-capacity map from string keys to per-key state.
#[derive(Debug, Clone)]
pub struct KeyedTable<T> {
    slots: Vec<Slot<T>>,
    capacity: usize,
    clock: u64,
}

#[derive(Debug, Clone)]
struct Slot<T> {
    key: String,
    touched: u64,
    state: T,
}

impl<T: Default> Default for KeyedTable<T> {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl<T: Default> KeyedTable<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            clock: 0,
        }
    }

    /// Returns the state for `key`, creating it on first use.
    pub fn entry(&mut self, key: &str) -> &mut T {
        self.clock += 1;
        let clock = self.clock;

        let found = self.slots.iter().position(|slot| slot.key == key);
        let index = match found {
            Some(index) => index,
            None if self.slots.len() < self.capacity => {
                self.slots.push(Slot {
                    key: key.to_string(),
                    touched: clock,
                    state: T::default(),
                });
                self.slots.len() - 1
            }
            None => {
                let index = self
                    .slots
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, slot)| slot.touched)
                    .map(|(index, _)| index)
                    .unwrap_or(0);
                tracing::debug!(evicted = %self.slots[index].key, key, "envelope table full");
                self.slots[index] = Slot {
                    key: key.to_string(),
                    touched: clock,
                    state: T::default(),
                };
                index
            }
        };

        let slot = &mut self.slots[index];
        slot.touched = clock;
        &mut slot.state
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.slots
            .iter()
            .find(|slot| slot.key == key)
            .map(|slot| &slot.state)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.clock = 0;
    }
}

/// Last output value of one decay buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnvelopeState {
    pub value: f32,
}

/// Keyed attack/decay envelopes with instantaneous attack.
#[derive(Debug, Clone, Default)]
pub struct DecayBuffers {
    table: KeyedTable<EnvelopeState>,
}

impl DecayBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            table: KeyedTable::with_capacity(capacity),
        }
    }

    /// Advances the envelope for `key` one frame toward `target`.
    ///
    /// Rising targets are taken immediately. Falling values are multiplied by
    /// the zone kind's decay factor and snap to zero under [`NOISE_FLOOR`].
    pub fn step(&mut self, key: &str, target: f32, decay_speed: u8, kind: ZoneKind) -> f32 {
        let target = unit(target);
        let state = self.table.entry(key);

        let next = if target >= state.value {
            target
        } else {
            (state.value * kind.decay_factor(decay_speed)).max(target)
        };

        state.value = if next < NOISE_FLOOR { 0.0 } else { next };
        state.value
    }

    /// Older multiplicative decay: `max(previous * rate, target)`.
    pub fn legacy_decay(&mut self, key: &str, target: f32, rate: f32) -> f32 {
        let target = unit(target);
        let state = self.table.entry(key);
        state.value = if target > state.value {
            target
        } else {
            (state.value * unit(rate)).max(target)
        };
        state.value
    }

    pub fn value(&self, key: &str) -> f32 {
        self.table.get(key).map(|state| state.value).unwrap_or(0.0)
    }

    pub fn set_value(&mut self, key: &str, value: f32) {
        self.table.entry(key).value = unit(value);
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn reset(&mut self) {
        self.table.clear();
    }
}

/// Thresholds and smoothing for a [`HysteresisGate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HysteresisConfig {
    pub activation: f32,
    /// Must sit below `activation`; the gap is the dead zone.
    pub deactivation: f32,
    pub min_stable_frames: u32,
    /// Output under this level is forced to zero.
    pub visibility_floor: f32,
    /// Fraction of the gap closed per frame while rising.
    pub attack: f32,
    /// Share of the previous value kept per frame while falling.
    pub decay_keep: f32,
    /// Share of the previous value targeted while inside the dead zone.
    pub hold: f32,
}

impl Default for HysteresisConfig {
    fn default() -> Self {
        Self {
            activation: 0.15,
            deactivation: 0.09,
            min_stable_frames: MIN_STABLE_FRAMES,
            visibility_floor: 0.18,
            attack: 0.85,
            decay_keep: 0.4,
            hold: 0.4,
        }
    }
}

impl HysteresisConfig {
    /// Builds a config from an activation level and a dead-zone margin.
    pub fn with_margin(activation: f32, margin: f32) -> Self {
        Self {
            activation,
            deactivation: (activation - margin).max(0.08),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GateState {
    pub on: bool,
    pub value: f32,
    pub pending_frames: u32,
    pub flips: u32,
}

/// Keyed on/off gate with a dead zone and flip debouncing.
#[derive(Debug, Clone)]
pub struct HysteresisGate {
    config: HysteresisConfig,
    table: KeyedTable<GateState>,
}

impl HysteresisGate {
    pub fn new(config: HysteresisConfig) -> Self {
        Self {
            config,
            table: KeyedTable::default(),
        }
    }

    pub fn config(&self) -> &HysteresisConfig {
        &self.config
    }

    /// Feeds one frame of `signal` for `key` and returns the smoothed output.
    ///
    /// A silent signal blanks the output at once, but the on/off state still
    /// goes through the normal debounce.
    pub fn update(&mut self, key: &str, signal: f32) -> f32 {
        let config = self.config;
        let signal = if signal.is_finite() { signal.max(0.0) } else { 0.0 };
        let silent = signal < crate::frame::SILENCE_FLOOR;
        let state = self.table.entry(key);

        let wants_on = if state.on {
            signal >= config.deactivation
        } else {
            signal >= config.activation
        };

        if wants_on != state.on {
            state.pending_frames += 1;
            if state.pending_frames >= config.min_stable_frames {
                state.on = wants_on;
                state.pending_frames = 0;
                state.flips += 1;
            }
        } else {
            state.pending_frames = 0;
        }

        if silent {
            state.value = 0.0;
            return 0.0;
        }

        let target = if !state.on {
            0.0
        } else if signal >= config.activation {
            let span = (1.0 - config.activation).max(f32::EPSILON);
            0.25 + (signal.min(1.0) - config.activation) / span * 0.75
        } else {
            state.value * config.hold
        };

        let previous = state.value;
        let smoothed = if target > previous {
            previous + (target - previous) * config.attack
        } else {
            previous * config.decay_keep + target * (1.0 - config.decay_keep)
        };

        state.value = if smoothed < config.visibility_floor {
            0.0
        } else {
            unit(smoothed)
        };
        state.value
    }

    pub fn is_on(&self, key: &str) -> bool {
        self.table.get(key).map(|state| state.on).unwrap_or(false)
    }

    pub fn value(&self, key: &str) -> f32 {
        self.table.get(key).map(|state| state.value).unwrap_or(0.0)
    }

    /// Number of honoured state flips for `key` since the last reset.
    pub fn flips(&self, key: &str) -> u32 {
        self.table.get(key).map(|state| state.flips).unwrap_or(0)
    }

    pub fn reset(&mut self) {
        self.table.clear();
    }
}

/// Compresses the band just above the noise floor instead of hard-gating it.
pub fn soft_knee(value: f32) -> f32 {
    let value = unit(value);
    if value < SOFT_KNEE_FLOOR {
        0.0
    } else if value < SOFT_KNEE_CEILING {
        (value - SOFT_KNEE_FLOOR) / (SOFT_KNEE_CEILING - SOFT_KNEE_FLOOR) * SOFT_KNEE_CEILING
    } else {
        value
    }
}

/// Maps `value` above `gate` onto `[0, 1]`; zero at or below the gate.
pub fn gate(value: f32, gate: f32) -> f32 {
    if value <= gate {
        0.0
    } else {
        ((value - gate) / (1.0 - gate).max(f32::EPSILON)).min(1.0)
    }
}

/// Exponential smoothing coefficient for a time constant.
pub fn smoothing_alpha(delta_ms: f32, tau_ms: f32) -> f32 {
    if tau_ms <= 0.0 {
        return 1.0;
    }
    1.0 - (-delta_ms.max(0.0) / tau_ms).exp()
}
