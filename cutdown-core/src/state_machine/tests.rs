// state_machine/tests.rs
#[cfg(test)]
mod tests {
    use crate::config::{SystemConfig, TerminationConfig};
    use crate::readings::{Measurement, Readings};
    use crate::types::{CutReason, FlightState, SystemMode};
    use crate::RuntimeState;

    fn in_flight_state() -> RuntimeState {
        let mut state = RuntimeState::new(SystemMode::Normal);
        state.set_launch_detected(5_000);
        state.refresh_flight_state();
        state
    }

    fn readings_with_alt(alt_m: f32) -> Readings {
        let mut readings = Readings::new();
        readings.gps_alt = Measurement::valid(alt_m);
        readings
    }

    #[test]
    fn initial_state_is_safe() {
        let state = RuntimeState::new(SystemMode::Normal);
        assert_eq!(state.flight_state, FlightState::Ground);
        assert!(!state.launch_detected);
        assert!(!state.cut_fired);
        assert!(!state.terminated);
        assert_eq!(state.cut_reason, CutReason::None);
    }

    #[test]
    fn tick_advances_time_counters_by_dt() {
        let mut state = RuntimeState::new(SystemMode::Normal);
        state.on_tick(1);
        state.on_tick(1);
        assert_eq!(state.t_power_s, 2);
        assert_eq!(state.t_launch_s, 0);

        state.set_launch_detected(2_000);
        state.on_tick(3); // stall catch-up keeps counters continuous
        assert_eq!(state.t_power_s, 5);
        assert_eq!(state.t_launch_s, 3);
        assert_eq!(state.t_terminated_s, 0);

        state.set_terminated(6_000);
        state.on_tick(1);
        assert_eq!(state.t_terminated_s, 1);
    }

    #[test]
    fn launch_latch_is_one_shot() {
        let mut state = RuntimeState::new(SystemMode::Normal);
        assert!(state.set_launch_detected(3_000));
        assert!(!state.set_launch_detected(9_000));
        assert_eq!(state.launch_ms, 3_000);

        state.refresh_flight_state();
        assert_eq!(state.flight_state, FlightState::InFlight);
    }

    #[test]
    fn entering_flight_resets_descent_trackers() {
        let mut state = RuntimeState::new(SystemMode::Normal);
        state.peak_alt_m = 500.0;
        state.min_pressure_hpa = 900.0;
        state.descent_count_s = 7;

        state.set_launch_detected(1_000);
        assert_eq!(state.peak_alt_m, f32::NEG_INFINITY);
        assert_eq!(state.min_pressure_hpa, f32::INFINITY);
        assert_eq!(state.descent_count_s, 0);
    }

    #[test]
    fn cut_implies_termination() {
        let mut state = in_flight_state();
        assert!(state.set_cut_fired(CutReason::BucketLogic, 10_000));
        assert!(state.cut_fired);
        assert!(state.terminated);
        assert_eq!(state.flight_state, FlightState::Terminated);
        assert_eq!(state.cut_reason, CutReason::BucketLogic);

        // Second cut ignored; first reason wins.
        assert!(!state.set_cut_fired(CutReason::Manual, 20_000));
        assert_eq!(state.cut_reason, CutReason::BucketLogic);
        assert_eq!(state.cut_ms, 10_000);
    }

    #[test]
    fn cut_with_reason_none_is_rejected() {
        let mut state = in_flight_state();
        assert!(!state.set_cut_fired(CutReason::None, 10_000));
        assert!(!state.cut_fired);
        assert!(!state.terminated);
    }

    #[test]
    fn mode_change_preserves_flight_state() {
        let mut state = in_flight_state();
        state.set_system_mode(SystemMode::Config);
        assert_eq!(state.flight_state, FlightState::InFlight);
        assert!(state.launch_detected);
        state.set_system_mode(SystemMode::Normal);
        assert_eq!(state.system_mode, SystemMode::Normal);
    }

    #[test]
    fn peak_altitude_watermark_is_monotone() {
        let mut state = in_flight_state();
        let config = SystemConfig::safe_defaults().term;

        for alt in [1000.0, 1500.0, 1400.0, 1450.0] {
            state.update_termination(&readings_with_alt(alt), &config, 0);
        }
        assert_eq!(state.peak_alt_m, 1500.0);
    }

    #[test]
    fn balloon_pop_latches_after_sustained_drop() {
        // GPS drop 60 m, sustain 15 s.
        let config = TerminationConfig {
            enabled: true,
            sustain_s: 15,
            use_gps: true,
            gps_drop_m: 60.0,
            use_pressure: false,
            pressure_rise_hpa: 50.0,
        };
        let mut state = in_flight_state();

        // Ascend to a 25 km peak.
        for alt in [24_800.0, 24_900.0, 25_000.0] {
            state.update_termination(&readings_with_alt(alt), &config, 0);
        }
        assert!(!state.terminated);

        // Descend with drop >= 60 m for 16 consecutive ticks; the latch
        // must close on the 15th.
        let drops = [
            24_940.0_f32,
            24_930.0,
            24_920.0,
            24_910.0,
            24_905.0,
            24_900.0,
            24_890.0,
            24_880.0,
            24_870.0,
            24_860.0,
            24_850.0,
            24_840.0,
            24_830.0,
            24_820.0,
        ];
        for (i, alt) in drops.iter().enumerate() {
            state.update_termination(&readings_with_alt(*alt), &config, 1_000 * i as u32);
            assert!(!state.terminated, "latched early at descent tick {}", i + 1);
        }

        state.update_termination(&readings_with_alt(24_939.0), &config, 99_000);
        assert!(state.terminated);
        assert_eq!(state.flight_state, FlightState::Terminated);
        assert!(!state.cut_fired);
        assert_eq!(state.cut_reason, CutReason::None);
    }

    #[test]
    fn descent_counter_resets_on_recovery() {
        let config = SystemConfig::safe_defaults().term;
        let mut state = in_flight_state();

        state.update_termination(&readings_with_alt(25_000.0), &config, 0);
        for _ in 0..5 {
            state.update_termination(&readings_with_alt(24_900.0), &config, 0);
        }
        assert_eq!(state.descent_count_s, 5);

        // Back above the drop threshold: counter clears.
        state.update_termination(&readings_with_alt(24_990.0), &config, 0);
        assert_eq!(state.descent_count_s, 0);
    }

    #[test]
    fn pressure_rise_path_detects_descent() {
        let config = TerminationConfig {
            enabled: true,
            sustain_s: 2,
            use_gps: false,
            gps_drop_m: 60.0,
            use_pressure: true,
            pressure_rise_hpa: 50.0,
        };
        let mut state = in_flight_state();

        let mut readings = Readings::new();
        for p in [300.0, 250.0, 200.0] {
            readings.pressure = Measurement::valid(p);
            state.update_termination(&readings, &config, 0);
        }
        assert_eq!(state.min_pressure_hpa, 200.0);

        readings.pressure = Measurement::valid(251.0);
        state.update_termination(&readings, &config, 0);
        assert!(!state.terminated);
        state.update_termination(&readings, &config, 0);
        assert!(state.terminated);
    }

    #[test]
    fn detector_idle_when_disabled_or_on_ground() {
        let mut config = SystemConfig::safe_defaults().term;
        config.enabled = false;

        let mut state = in_flight_state();
        state.update_termination(&readings_with_alt(25_000.0), &config, 0);
        state.update_termination(&readings_with_alt(10_000.0), &config, 0);
        assert!(!state.terminated);
        assert_eq!(state.descent_count_s, 0);

        // On the ground the detector never runs at all.
        config.enabled = true;
        let mut grounded = RuntimeState::new(SystemMode::Normal);
        grounded.update_termination(&readings_with_alt(100.0), &config, 0);
        assert_eq!(grounded.peak_alt_m, f32::NEG_INFINITY);
    }

    #[test]
    fn invalid_samples_do_not_move_watermarks() {
        let config = SystemConfig::safe_defaults().term;
        let mut state = in_flight_state();
        state.update_termination(&readings_with_alt(25_000.0), &config, 0);

        let mut invalid = Readings::new();
        invalid.gps_alt = Measurement {
            value: 10.0,
            valid: false,
        };
        state.update_termination(&invalid, &config, 0);
        assert_eq!(state.peak_alt_m, 25_000.0);
        assert_eq!(state.descent_count_s, 0);
    }
}
