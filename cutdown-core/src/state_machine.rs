// state_machine.rs

use crate::config::TerminationConfig;
use crate::readings::Readings;
use crate::types::{CutReason, FlightState, SystemMode};

/// All volatile runtime state, reset at power-on.
///
/// Latches are intentionally not persisted: a reset returns the system
/// to a safe pre-launch posture for ground testing, and the physical
/// release is irreversible by mechanism rather than software.
///
/// Timekeeping is strictly tick-domain: `t_power_s` and friends advance
/// by the scheduler's `dt_s`, never by reading the wall clock. The
/// `*_ms` fields only record when a latch was set.
pub struct RuntimeState {
    pub flight_state: FlightState,
    pub system_mode: SystemMode,

    /// Seconds since boot (tick domain).
    pub t_power_s: u32,

    /// Launch latch. One-shot; only the first detection matters.
    pub launch_detected: bool,
    pub launch_ms: u32,
    /// Seconds since launch (0 until launched).
    pub t_launch_s: u32,

    /// Cut latch. One-shot until power cycle.
    pub cut_fired: bool,
    pub cut_reason: CutReason,
    pub cut_ms: u32,

    /// Termination latch: cut fired OR balloon pop detected.
    pub terminated: bool,
    pub terminated_ms: u32,
    /// Seconds since termination (0 until terminated).
    pub t_terminated_s: u32,

    /// Highest GPS altitude seen since entering flight.
    pub peak_alt_m: f32,
    /// Lowest pressure seen since entering flight.
    pub min_pressure_hpa: f32,
    /// Consecutive seconds the descent predicate has held.
    pub descent_count_s: u16,
}

impl RuntimeState {
    pub fn new(initial_mode: SystemMode) -> Self {
        Self {
            flight_state: FlightState::Ground,
            system_mode: initial_mode,
            t_power_s: 0,
            launch_detected: false,
            launch_ms: 0,
            t_launch_s: 0,
            cut_fired: false,
            cut_reason: CutReason::None,
            cut_ms: 0,
            terminated: false,
            terminated_ms: 0,
            t_terminated_s: 0,
            peak_alt_m: f32::NEG_INFINITY,
            min_pressure_hpa: f32::INFINITY,
            descent_count_s: 0,
        }
    }

    /// Advances the tick-domain time counters by `dt_s` elapsed seconds
    /// and recomputes the flight state.
    pub fn on_tick(&mut self, dt_s: u16) {
        let dt = if dt_s == 0 { 1 } else { dt_s as u32 };

        self.t_power_s = self.t_power_s.saturating_add(dt);

        if self.launch_detected {
            self.t_launch_s = self.t_launch_s.saturating_add(dt);
        } else {
            self.t_launch_s = 0;
        }

        if self.terminated {
            self.t_terminated_s = self.t_terminated_s.saturating_add(dt);
        } else {
            self.t_terminated_s = 0;
        }

        self.refresh_flight_state();
    }

    /// Recomputes the flight state from the latches. Termination
    /// dominates; otherwise the launch latch decides ground vs flight.
    pub fn refresh_flight_state(&mut self) {
        self.flight_state = if self.terminated {
            FlightState::Terminated
        } else if self.launch_detected {
            FlightState::InFlight
        } else {
            FlightState::Ground
        };
    }

    /// One-shot launch latch. Entering flight resets the peak/minimum
    /// trackers and the descent counter so the balloon-pop detector
    /// starts from a clean baseline. Returns whether the transition
    /// occurred.
    pub fn set_launch_detected(&mut self, now_ms: u32) -> bool {
        if self.launch_detected {
            return false;
        }

        self.launch_detected = true;
        self.launch_ms = now_ms;
        self.t_launch_s = 0;
        self.peak_alt_m = f32::NEG_INFINITY;
        self.min_pressure_hpa = f32::INFINITY;
        self.descent_count_s = 0;
        true
    }

    /// One-shot termination latch; transitions to `Terminated`
    /// immediately. Returns whether the transition occurred.
    pub fn set_terminated(&mut self, now_ms: u32) -> bool {
        if self.terminated {
            return false;
        }

        self.terminated = true;
        self.terminated_ms = now_ms;
        self.t_terminated_s = 0;
        self.flight_state = FlightState::Terminated;
        true
    }

    /// One-shot cut latch. A cut always implies termination. This only
    /// records the event; the release latch executes the physical cut.
    /// Returns whether the transition occurred.
    pub fn set_cut_fired(&mut self, reason: CutReason, now_ms: u32) -> bool {
        if self.cut_fired || reason == CutReason::None {
            return false;
        }

        self.cut_fired = true;
        self.cut_reason = reason;
        self.cut_ms = now_ms;
        self.set_terminated(now_ms);
        true
    }

    /// Mode changes never touch flight state or any latch.
    pub fn set_system_mode(&mut self, mode: SystemMode) {
        self.system_mode = mode;
    }

    /// Balloon-pop detector: peak-drop on GPS altitude and/or min-rise
    /// on pressure, sustained for the configured number of seconds.
    ///
    /// Runs only while in flight and not yet terminated. Each tick the
    /// watermarks advance on valid samples, the descent predicate is
    /// re-evaluated, and the sustain counter climbs or clears.
    pub fn update_termination(
        &mut self,
        readings: &Readings,
        config: &TerminationConfig,
        now_ms: u32,
    ) {
        if self.terminated || self.flight_state != FlightState::InFlight {
            return;
        }
        if !config.enabled {
            return;
        }

        let mut gps_descending = false;
        let mut pressure_descending = false;

        if config.use_gps && readings.gps_alt.valid {
            let alt_m = readings.gps_alt.value;
            if alt_m > self.peak_alt_m {
                self.peak_alt_m = alt_m;
            }
            if self.peak_alt_m - alt_m >= config.gps_drop_m {
                gps_descending = true;
            }
        }

        if config.use_pressure && readings.pressure.valid {
            let p_hpa = readings.pressure.value;
            if p_hpa < self.min_pressure_hpa {
                self.min_pressure_hpa = p_hpa;
            }
            if p_hpa - self.min_pressure_hpa >= config.pressure_rise_hpa {
                pressure_descending = true;
            }
        }

        if gps_descending || pressure_descending {
            self.descent_count_s = self.descent_count_s.saturating_add(1);
        } else {
            self.descent_count_s = 0;
        }

        if self.descent_count_s >= config.sustain_s {
            self.set_terminated(now_ms);
        }
    }
}

#[cfg(test)]
mod tests;
