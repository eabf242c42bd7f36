// readings.rs

use crate::config::SystemConfig;
use crate::state_machine::RuntimeState;
use crate::types::{
    VariableId, EXT_DEBOUNCE_ACCUM_CAP_MS, GPS_MAX_FIELD_AGE_MS, NUM_EXTERNAL_INPUTS,
    VARIABLE_COUNT,
};

/// A numeric value with an explicit validity bit. Consumers must check
/// `valid` before trusting `value`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurement {
    pub value: f32,
    pub valid: bool,
}

impl Measurement {
    pub const INVALID: Self = Self {
        value: 0.0,
        valid: false,
    };

    pub const fn valid(value: f32) -> Self {
        Self { value, valid: true }
    }

    /// The value, or the NaN sentinel used by log and telemetry
    /// encoders for invalid fields.
    pub fn or_nan(self) -> f32 {
        if self.valid {
            self.value
        } else {
            f32::NAN
        }
    }
}

/// A driver sample with its age. Freshness is decided here, not in the
/// driver: `age_ms` exactly at the threshold is already stale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgedSample {
    pub value: f32,
    pub age_ms: u32,
}

impl AgedSample {
    /// A sample that was never decoded.
    pub const NEVER: Self = Self {
        value: 0.0,
        age_ms: u32::MAX,
    };

    fn to_measurement(self, max_age_ms: u32) -> Measurement {
        if self.age_ms < max_age_ms {
            Measurement::valid(self.value)
        } else {
            Measurement::INVALID
        }
    }
}

impl Default for AgedSample {
    fn default() -> Self {
        Self::NEVER
    }
}

/// Raw GPS state as reported by the receiver driver.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GpsRaw {
    /// The receiver is alive and talking (comm health, not fix).
    pub link_ok: bool,
    pub lat_deg: AgedSample,
    pub lon_deg: AgedSample,
    pub alt_m: AgedSample,
}

/// Raw environmental sensor state. The driver marks each field valid
/// only when its last conversion succeeded.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnvRaw {
    pub pressure_hpa: Measurement,
    pub temp_c: Measurement,
    pub humidity_pct: Measurement,
}

/// Everything the sensor collaborator hands the core each tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawSensors {
    pub gps: GpsRaw,
    pub env: EnvRaw,
    /// Raw pin levels of the optoisolated inputs (true = high).
    pub ext_level_high: [bool; NUM_EXTERNAL_INPUTS],
}

/// Sensor collaborator: pulled once per tick for the current view of
/// the physical world.
pub trait SensorSource {
    fn sample(&mut self, now_ms: u32) -> RawSensors;
}

/// Runtime interpretation of one optoisolated input.
///
/// Debounce is tick-quantized: an active tick adds 1000 ms to the
/// accumulator (saturating), an inactive tick clears it. Short pulses
/// are filtered; any sustained activation latches active within one
/// tick of crossing the configured debounce.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExternalInputReading {
    /// Raw active after polarity mapping.
    pub raw_active: bool,
    pub debounced_active: bool,
    pub active_accum_ms: u32,
}

/// The per-tick sensor/input snapshot. Rebuilt every tick; runtime
/// state only, never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Readings {
    /// GPS subsystem alive (validity of the `gps_fix` variable).
    pub gps_fix_valid: bool,
    /// Usable position fix right now.
    pub gps_fix: bool,
    pub gps_lat: Measurement,
    pub gps_lon: Measurement,
    pub gps_alt: Measurement,

    pub pressure: Measurement,
    pub temp: Measurement,
    pub humidity: Measurement,

    pub ext: [ExternalInputReading; NUM_EXTERNAL_INPUTS],
}

impl Readings {
    pub const fn new() -> Self {
        Self {
            gps_fix_valid: false,
            gps_fix: false,
            gps_lat: Measurement::INVALID,
            gps_lon: Measurement::INVALID,
            gps_alt: Measurement::INVALID,
            pressure: Measurement::INVALID,
            temp: Measurement::INVALID,
            humidity: Measurement::INVALID,
            ext: [ExternalInputReading {
                raw_active: false,
                debounced_active: false,
                active_accum_ms: 0,
            }; NUM_EXTERNAL_INPUTS],
        }
    }

    /// Rebuilds the snapshot from raw driver state, applying GPS
    /// freshness limits and the external-input debounce.
    pub fn refresh(&mut self, raw: &RawSensors, config: &SystemConfig) {
        self.gps_lat = raw.gps.lat_deg.to_measurement(GPS_MAX_FIELD_AGE_MS);
        self.gps_lon = raw.gps.lon_deg.to_measurement(GPS_MAX_FIELD_AGE_MS);
        self.gps_alt = raw.gps.alt_m.to_measurement(GPS_MAX_FIELD_AGE_MS);

        self.gps_fix_valid = raw.gps.link_ok;
        // A usable fix requires a fresh position solution.
        self.gps_fix = self.gps_lat.valid && self.gps_lon.valid;

        self.pressure = raw.env.pressure_hpa;
        self.temp = raw.env.temp_c;
        self.humidity = raw.env.humidity_pct;

        for i in 0..NUM_EXTERNAL_INPUTS {
            update_external_input(
                &mut self.ext[i],
                raw.ext_level_high[i],
                &config.external_inputs[i],
            );
        }
    }

    /// True when a GPS fix is present and the fix variable is valid.
    pub fn gps_fix_present(&self) -> bool {
        self.gps_fix_valid && self.gps_fix
    }

    /// Builds the variable table the rule engine evaluates against.
    /// Time-domain variables are always valid; sensor-backed variables
    /// inherit their field's validity.
    pub fn variables(&self, state: &RuntimeState) -> VariableTable {
        let mut table = VariableTable::new();
        for id in VariableId::ALL {
            let m = match id {
                VariableId::TPowerS => Measurement::valid(state.t_power_s as f32),
                VariableId::TLaunchS => Measurement::valid(state.t_launch_s as f32),
                VariableId::GpsAltM => self.gps_alt,
                VariableId::GpsLatDeg => self.gps_lat,
                VariableId::GpsLonDeg => self.gps_lon,
                VariableId::GpsFix => {
                    if self.gps_fix_valid {
                        Measurement::valid(if self.gps_fix { 1.0 } else { 0.0 })
                    } else {
                        Measurement::INVALID
                    }
                }
                VariableId::PressureHpa => self.pressure,
                VariableId::TempC => self.temp,
                VariableId::HumidityPct => self.humidity,
            };
            table.set(id, m);
        }
        table
    }
}

fn update_external_input(
    input: &mut ExternalInputReading,
    level_high: bool,
    config: &crate::config::ExternalInputConfig,
) {
    if !config.enabled {
        *input = ExternalInputReading::default();
        return;
    }

    let raw_active = if config.active_high {
        level_high
    } else {
        !level_high
    };
    input.raw_active = raw_active;

    if raw_active {
        input.active_accum_ms = input
            .active_accum_ms
            .saturating_add(1000)
            .min(EXT_DEBOUNCE_ACCUM_CAP_MS);
    } else {
        input.active_accum_ms = 0;
    }

    input.debounced_active = input.active_accum_ms >= config.debounce_ms as u32;
}

/// Fixed-size parallel value/validity arrays indexed by [`VariableId`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariableTable {
    values: [f32; VARIABLE_COUNT],
    valid: [bool; VARIABLE_COUNT],
}

impl VariableTable {
    pub const fn new() -> Self {
        Self {
            values: [0.0; VARIABLE_COUNT],
            valid: [false; VARIABLE_COUNT],
        }
    }

    pub fn get(&self, id: VariableId) -> Measurement {
        Measurement {
            value: self.values[id.index()],
            valid: self.valid[id.index()],
        }
    }

    pub fn set(&mut self, id: VariableId, m: Measurement) {
        self.values[id.index()] = m.value;
        self.valid[id.index()] = m.valid;
    }
}

impl Default for VariableTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SystemMode;

    fn fresh(value: f32) -> AgedSample {
        AgedSample { value, age_ms: 0 }
    }

    #[test]
    fn gps_age_at_threshold_is_stale() {
        let mut readings = Readings::new();
        let config = SystemConfig::safe_defaults();
        let mut raw = RawSensors::default();
        raw.gps.link_ok = true;
        raw.gps.alt_m = AgedSample {
            value: 120.0,
            age_ms: GPS_MAX_FIELD_AGE_MS,
        };
        readings.refresh(&raw, &config);
        assert!(!readings.gps_alt.valid);

        raw.gps.alt_m.age_ms = GPS_MAX_FIELD_AGE_MS - 1;
        readings.refresh(&raw, &config);
        assert!(readings.gps_alt.valid);
        assert_eq!(readings.gps_alt.value, 120.0);
    }

    #[test]
    fn fix_requires_fresh_position() {
        let mut readings = Readings::new();
        let config = SystemConfig::safe_defaults();
        let mut raw = RawSensors::default();
        raw.gps.link_ok = true;
        readings.refresh(&raw, &config);
        assert!(readings.gps_fix_valid);
        assert!(!readings.gps_fix);
        assert!(!readings.gps_fix_present());

        raw.gps.lat_deg = fresh(45.0);
        raw.gps.lon_deg = fresh(-122.0);
        readings.refresh(&raw, &config);
        assert!(readings.gps_fix_present());
    }

    #[test]
    fn debounce_latches_after_threshold() {
        let mut readings = Readings::new();
        let mut config = SystemConfig::safe_defaults();
        config.external_inputs[0].debounce_ms = 2500;

        let mut raw = RawSensors::default();
        raw.ext_level_high[0] = true;

        // 1000, 2000: below 2500 ms.
        readings.refresh(&raw, &config);
        assert!(readings.ext[0].raw_active);
        assert!(!readings.ext[0].debounced_active);
        readings.refresh(&raw, &config);
        assert!(!readings.ext[0].debounced_active);
        // 3000: crossed.
        readings.refresh(&raw, &config);
        assert!(readings.ext[0].debounced_active);

        // One inactive tick resets completely.
        raw.ext_level_high[0] = false;
        readings.refresh(&raw, &config);
        assert!(!readings.ext[0].debounced_active);
        assert_eq!(readings.ext[0].active_accum_ms, 0);
    }

    #[test]
    fn debounce_accumulator_saturates() {
        let mut readings = Readings::new();
        let config = SystemConfig::safe_defaults();
        let mut raw = RawSensors::default();
        raw.ext_level_high[0] = true;
        for _ in 0..100 {
            readings.refresh(&raw, &config);
        }
        assert_eq!(readings.ext[0].active_accum_ms, EXT_DEBOUNCE_ACCUM_CAP_MS);
    }

    #[test]
    fn active_low_polarity() {
        let mut readings = Readings::new();
        let mut config = SystemConfig::safe_defaults();
        config.external_inputs[0].active_high = false;

        let raw = RawSensors::default(); // pin low
        readings.refresh(&raw, &config);
        assert!(readings.ext[0].raw_active);
        assert!(readings.ext[0].debounced_active); // 1000 >= 50 ms
    }

    #[test]
    fn disabled_input_reports_inactive() {
        let mut readings = Readings::new();
        let config = SystemConfig::safe_defaults();
        let mut raw = RawSensors::default();
        raw.ext_level_high[1] = true; // input 1 disabled by default
        readings.refresh(&raw, &config);
        assert!(!readings.ext[1].raw_active);
        assert!(!readings.ext[1].debounced_active);
        assert_eq!(readings.ext[1].active_accum_ms, 0);
    }

    #[test]
    fn time_variables_always_valid() {
        let readings = Readings::new();
        let mut state = RuntimeState::new(SystemMode::Normal);
        state.t_power_s = 42;
        let table = readings.variables(&state);

        let t = table.get(VariableId::TPowerS);
        assert!(t.valid);
        assert_eq!(t.value, 42.0);
        assert!(table.get(VariableId::TLaunchS).valid);
        // Sensor-backed variables start invalid.
        assert!(!table.get(VariableId::GpsAltM).valid);
        assert!(!table.get(VariableId::PressureHpa).valid);
    }

    #[test]
    fn fix_variable_exposed_as_float() {
        let mut readings = Readings::new();
        let config = SystemConfig::safe_defaults();
        let mut raw = RawSensors::default();
        raw.gps.link_ok = true;
        raw.gps.lat_deg = fresh(10.0);
        raw.gps.lon_deg = fresh(20.0);
        readings.refresh(&raw, &config);

        let state = RuntimeState::new(SystemMode::Normal);
        let table = readings.variables(&state);
        let fix = table.get(VariableId::GpsFix);
        assert!(fix.valid);
        assert_eq!(fix.value, 1.0);
    }
}
