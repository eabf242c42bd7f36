// launch.rs

use crate::readings::Readings;
use crate::types::{LAUNCH_GPS_ALT_RISE_M, LAUNCH_PERSIST_REQUIRED_S, LAUNCH_PRESSURE_DROP_HPA};

/// Ground-to-flight detector.
///
/// Captures a baseline independently for each sensor on the first tick
/// that sensor is valid, then watches for a GPS altitude rise or a
/// barometric pressure drop past the launch thresholds. A candidate
/// must persist for [`LAUNCH_PERSIST_REQUIRED_S`] consecutive ticks
/// before the latch fires, so gusts and sensor noise at ground level
/// cannot trigger it.
///
/// While any Critical error is active the detector stands down: a
/// baseline captured from a sick sensor cannot be trusted.
pub struct LaunchDetector {
    base_gps_alt_m: Option<f32>,
    base_pressure_hpa: Option<f32>,
    persist_s: u8,
}

impl LaunchDetector {
    pub const fn new() -> Self {
        Self {
            base_gps_alt_m: None,
            base_pressure_hpa: None,
            persist_s: 0,
        }
    }

    /// Evaluates one tick. Returns true exactly when the launch latch
    /// should fire; the caller owns the latch itself.
    pub fn update(&mut self, readings: &Readings, critical_fault_active: bool) -> bool {
        if critical_fault_active {
            // Startup is not healthy yet; do not accumulate toward
            // launch. Baselines already captured are kept.
            self.persist_s = 0;
            return false;
        }

        if self.base_gps_alt_m.is_none() && readings.gps_alt.valid {
            self.base_gps_alt_m = Some(readings.gps_alt.value);
        }
        if self.base_pressure_hpa.is_none() && readings.pressure.valid {
            self.base_pressure_hpa = Some(readings.pressure.value);
        }

        let mut candidate = false;

        if let Some(base) = self.base_gps_alt_m {
            if readings.gps_alt.valid && readings.gps_alt.value - base >= LAUNCH_GPS_ALT_RISE_M {
                candidate = true;
            }
        }

        if let Some(base) = self.base_pressure_hpa {
            if readings.pressure.valid && base - readings.pressure.value >= LAUNCH_PRESSURE_DROP_HPA
            {
                candidate = true;
            }
        }

        if candidate {
            self.persist_s = self.persist_s.saturating_add(1);
        } else {
            self.persist_s = 0;
        }

        self.persist_s >= LAUNCH_PERSIST_REQUIRED_S
    }
}

impl Default for LaunchDetector {
    fn default() -> Self {
        Self::new()
    }
}
