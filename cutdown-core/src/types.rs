// types.rs

/// Maximum number of conditions per rule bucket.
pub const MAX_BUCKET_CONDITIONS: usize = 10;

/// Number of optoisolated external cut inputs on the board.
pub const NUM_EXTERNAL_INPUTS: usize = 2;

/// Max acceptable age for a GPS field (ms) to be treated as fresh.
/// A sample aged exactly at this bound is stale.
pub const GPS_MAX_FIELD_AGE_MS: u32 = 3000;

/// Launch detect threshold: GPS altitude rise above baseline (meters).
pub const LAUNCH_GPS_ALT_RISE_M: f32 = 30.0;

/// Launch detect threshold: barometric pressure drop below baseline (hPa).
pub const LAUNCH_PRESSURE_DROP_HPA: f32 = 5.0;

/// Launch detect persistence: consecutive 1 Hz candidate ticks required.
pub const LAUNCH_PERSIST_REQUIRED_S: u8 = 5;

/// Saturation cap for the external-input debounce accumulator (ms).
pub const EXT_DEBOUNCE_ACCUM_CAP_MS: u32 = 60_000;

/// Largest serial number a unit can carry (7 decimal digits).
/// 0 means "unassigned".
pub const MAX_SERIAL_NUMBER: u32 = 9_999_999;

/// Physical reality state machine: what the balloon is doing.
///
/// Orthogonal to [`SystemMode`]. Transitions are monotonic:
/// `Ground -> InFlight -> Terminated`, never backwards.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlightState {
    /// On the ground, pre-launch.
    #[default]
    Ground = 0,
    /// Launch detected and still flying.
    InFlight = 1,
    /// Descent has begun: cut fired or balloon pop detected.
    Terminated = 2,
}

/// Firmware behavior mode: what the MCU is doing.
///
/// `Config` pauses autonomous flight logic; it never changes
/// [`FlightState`] or cancels a latch.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SystemMode {
    /// Autonomous flight operation.
    #[default]
    Normal = 0,
    /// Configuration UI active; autonomous decisions paused.
    Config = 1,
}

/// Why the cut fired. Latched once per power cycle; meaningful only
/// while `cut_fired` is set.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CutReason {
    #[default]
    None = 0,
    /// Bucket A/B rule engine fired.
    BucketLogic = 1,
    /// Optoisolated external input forced the cut.
    ExternalInput = 2,
    /// Authorized satellite remote command.
    IridiumRemote = 3,
    /// Operator command from the config UI.
    Manual = 4,
}

/// Identifiers for the numeric variables rule conditions can test.
///
/// Booleans are exposed as 0.0/1.0 so every condition compares floats.
/// The discriminants index the parallel value/validity arrays in
/// `readings::VariableTable`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VariableId {
    /// Seconds since boot (tick domain).
    TPowerS = 0,
    /// Seconds since launch detection (0 until launched).
    TLaunchS = 1,
    /// GPS altitude in meters.
    GpsAltM = 2,
    /// Latitude in degrees.
    GpsLatDeg = 3,
    /// Longitude in degrees.
    GpsLonDeg = 4,
    /// GPS fix present (0/1).
    GpsFix = 5,
    /// Ambient pressure in hPa.
    PressureHpa = 6,
    /// Temperature in degrees C.
    TempC = 7,
    /// Relative humidity in percent.
    HumidityPct = 8,
}

/// Number of distinct [`VariableId`] values.
pub const VARIABLE_COUNT: usize = 9;

const _: () = assert!(
    VariableId::HumidityPct as usize + 1 == VARIABLE_COUNT,
    "VARIABLE_COUNT must track the VariableId enum"
);

impl VariableId {
    /// Every variable, in discriminant order.
    pub const ALL: [VariableId; VARIABLE_COUNT] = [
        VariableId::TPowerS,
        VariableId::TLaunchS,
        VariableId::GpsAltM,
        VariableId::GpsLatDeg,
        VariableId::GpsLonDeg,
        VariableId::GpsFix,
        VariableId::PressureHpa,
        VariableId::TempC,
        VariableId::HumidityPct,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Comparison operators available to rule conditions.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CompareOp {
    Lt = 0,
    Le = 1,
    Eq = 2,
    Ge = 3,
    Gt = 4,
}

impl CompareOp {
    /// Applies `lhs OP rhs`.
    pub fn compare(self, lhs: f32, rhs: f32) -> bool {
        match self {
            CompareOp::Lt => lhs < rhs,
            CompareOp::Le => lhs <= rhs,
            CompareOp::Eq => lhs == rhs,
            CompareOp::Ge => lhs >= rhs,
            CompareOp::Gt => lhs > rhs,
        }
    }
}
