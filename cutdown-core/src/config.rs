// config.rs

use heapless::String;

use crate::types::{
    CompareOp, VariableId, MAX_BUCKET_CONDITIONS, MAX_SERIAL_NUMBER, NUM_EXTERNAL_INPUTS,
};

/// Transmit intervals must be 0 (silent) or within [10 s, 7 days].
const MIN_INTERVAL_S: u32 = 10;
const MAX_INTERVAL_S: u32 = 7 * 24 * 3600;

/// One rule condition evaluated against a single variable.
///
/// `for_seconds` is the dwell requirement: how long the comparison must
/// hold continuously before the condition counts as satisfied. Zero
/// means immediate. The dwell accumulator itself is runtime state owned
/// by the rule engine, never part of the stored configuration.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Condition {
    pub enabled: bool,
    pub var_id: VariableId,
    pub op: CompareOp,
    pub threshold: f32,
    pub for_seconds: u16,
}

impl Condition {
    /// A disabled placeholder slot.
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            var_id: VariableId::TPowerS,
            op: CompareOp::Gt,
            threshold: 0.0,
            for_seconds: 0,
        }
    }
}

/// Global gating requirements applied before a rule-based cut may fire.
/// Immediate cut sources (external inputs, remote command) bypass these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GlobalCutConfig {
    pub require_launch_before_cut: bool,
    pub require_gps_fix_before_cut: bool,
}

/// Configuration for one optoisolated external cut input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExternalInputConfig {
    pub enabled: bool,
    /// Active when the pin reads high; otherwise active-low.
    pub active_high: bool,
    pub debounce_ms: u16,
}

/// Satellite uplink behavior: remote cut authorization and the
/// per-phase telemetry cadence. An interval of 0 means "do not
/// transmit in that phase".
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UplinkConfig {
    /// Master enable; some units fly without the modem installed.
    pub enabled: bool,
    /// Allow the remote cut command.
    pub remote_cut_enabled: bool,
    /// ASCII token required to authorize a remote cut.
    pub cutdown_token: String<16>,

    pub ground_interval_s: u32,
    pub ascent_interval_s: u32,
    pub descent_interval_s: u32,
    pub beacon_interval_s: u32,
    /// Seconds after termination during which the descent cadence
    /// applies; 0 switches straight to beacon.
    pub descent_duration_s: u32,
    /// Mailbox polling cadence, checked only until cut or termination.
    pub mailbox_check_interval_s: u32,
}

/// Balloon-pop detector tuning.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TerminationConfig {
    pub enabled: bool,
    /// Consecutive seconds the descent predicate must hold.
    pub sustain_s: u16,
    pub use_gps: bool,
    /// Drop below the altitude peak that counts as descending (m).
    pub gps_drop_m: f32,
    pub use_pressure: bool,
    /// Rise above the pressure minimum that counts as descending (hPa).
    pub pressure_rise_hpa: f32,
}

/// Device identity and CONFIG-mode AP credentials.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DeviceConfig {
    /// 0..=9,999,999; 0 means unassigned.
    pub serial_number: u32,
    /// WPA2 password for the CONFIG-mode AP; must be at least 8 chars.
    pub ap_password: String<32>,
}

/// The full user configuration, loaded at boot and read-only in flight.
///
/// Bucket semantics: Bucket A requires ALL enabled conditions (empty
/// bucket is true); Bucket B requires ANY enabled condition (empty
/// bucket is false).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SystemConfig {
    pub global_cut: GlobalCutConfig,
    pub bucket_a: [Condition; MAX_BUCKET_CONDITIONS],
    pub bucket_b: [Condition; MAX_BUCKET_CONDITIONS],
    pub external_inputs: [ExternalInputConfig; NUM_EXTERNAL_INPUTS],
    pub uplink: UplinkConfig,
    pub term: TerminationConfig,
    pub device: DeviceConfig,
}

/// Why a candidate configuration was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    SerialOutOfRange,
    ApPasswordTooShort,
    NonFiniteThreshold,
    ThresholdOutOfRange,
    BadTransmitInterval,
    BadDescentDuration,
}

impl SystemConfig {
    /// Conservative factory defaults: no rule-based cut armed, external
    /// input 0 enabled active-high with 50 ms debounce, remote cut
    /// command allowed but modem disabled, launch gate on, fix gate
    /// off, balloon-pop detector on.
    pub fn safe_defaults() -> Self {
        let mut token = String::new();
        let _ = token.push_str("CUTDOWN");
        let mut ap_password = String::new();
        let _ = ap_password.push_str("l33mange0");

        Self {
            global_cut: GlobalCutConfig {
                require_launch_before_cut: true,
                require_gps_fix_before_cut: false,
            },
            bucket_a: [Condition::disabled(); MAX_BUCKET_CONDITIONS],
            bucket_b: [Condition::disabled(); MAX_BUCKET_CONDITIONS],
            external_inputs: [
                ExternalInputConfig {
                    enabled: true,
                    active_high: true,
                    debounce_ms: 50,
                },
                ExternalInputConfig {
                    enabled: false,
                    active_high: true,
                    debounce_ms: 50,
                },
            ],
            uplink: UplinkConfig {
                enabled: false,
                remote_cut_enabled: true,
                cutdown_token: token,
                ground_interval_s: 0,
                ascent_interval_s: 300,
                descent_interval_s: 300,
                beacon_interval_s: 3600,
                descent_duration_s: 3600,
                mailbox_check_interval_s: 300,
            },
            term: TerminationConfig {
                enabled: true,
                sustain_s: 15,
                use_gps: true,
                gps_drop_m: 60.0,
                use_pressure: true,
                pressure_rise_hpa: 50.0,
            },
            device: DeviceConfig {
                serial_number: 0,
                ap_password,
            },
        }
    }

    /// Sanity checks for a candidate configuration.
    ///
    /// Kept intentionally permissive: the aim is to reject corruption,
    /// not to second-guess deliberate operator choices.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device.serial_number > MAX_SERIAL_NUMBER {
            return Err(ConfigError::SerialOutOfRange);
        }
        if self.device.ap_password.len() < 8 {
            return Err(ConfigError::ApPasswordTooShort);
        }

        for cond in self.bucket_a.iter().chain(self.bucket_b.iter()) {
            validate_condition(cond)?;
        }

        for interval in [
            self.uplink.ground_interval_s,
            self.uplink.ascent_interval_s,
            self.uplink.descent_interval_s,
            self.uplink.beacon_interval_s,
            self.uplink.mailbox_check_interval_s,
        ] {
            if !interval_ok(interval) {
                return Err(ConfigError::BadTransmitInterval);
            }
        }

        if !interval_ok(self.uplink.descent_duration_s) {
            return Err(ConfigError::BadDescentDuration);
        }

        Ok(())
    }

    /// Restores defaults in place without touching the serial number,
    /// preserving unit identity across factory resets.
    pub fn reset_to_defaults(&mut self) {
        let serial = self.device.serial_number;
        *self = Self::safe_defaults();
        self.device.serial_number = serial;
    }
}

/// Collaborator that yields the stored configuration at boot, if any.
pub trait ConfigStore {
    /// Returns the stored candidate, or `None` when nothing (or
    /// nothing readable) is stored.
    fn load(&mut self) -> Option<SystemConfig>;
}

/// Loads and validates configuration, falling back to safe defaults on
/// any failure. The result is always usable.
pub fn load_or_defaults<S: ConfigStore>(store: &mut S) -> SystemConfig {
    match store.load() {
        Some(candidate) if candidate.validate().is_ok() => candidate,
        _ => SystemConfig::safe_defaults(),
    }
}

fn validate_condition(cond: &Condition) -> Result<(), ConfigError> {
    if !cond.threshold.is_finite() {
        return Err(ConfigError::NonFiniteThreshold);
    }

    // Physically bounded variables get range-checked thresholds; a
    // latitude condition past the poles can never fire and is treated
    // as corruption.
    let in_range = match cond.var_id {
        VariableId::GpsLatDeg => (-90.0..=90.0).contains(&cond.threshold),
        VariableId::GpsLonDeg => (-180.0..=180.0).contains(&cond.threshold),
        VariableId::HumidityPct => (0.0..=100.0).contains(&cond.threshold),
        _ => true,
    };
    if !in_range {
        return Err(ConfigError::ThresholdOutOfRange);
    }

    Ok(())
}

fn interval_ok(seconds: u32) -> bool {
    seconds == 0 || (MIN_INTERVAL_S..=MAX_INTERVAL_S).contains(&seconds)
}
