// controller.rs

use crate::config::SystemConfig;
use crate::cut_logic::{CutInputs, RuleEngine};
use crate::errors::ErrorRegistry;
use crate::flight_log::{push_record, FlightRecord, TickRecord};
use crate::launch::LaunchDetector;
use crate::readings::{Readings, SensorSource};
use crate::release::{ReleaseActuator, ReleaseLatch};
use crate::scheduler::TickScheduler;
use crate::state_machine::RuntimeState;
use crate::telemetry::{transmit_interval_s, TelemetryPacket, UplinkMailbox};
use crate::types::{CutReason, SystemMode, NUM_EXTERNAL_INPUTS};

/// What happened on an emitted tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickReport {
    /// Elapsed whole seconds applied this tick (>1 after a stall).
    pub dt_s: u16,
    /// Cut latched this tick, with its reason.
    pub cut: Option<CutReason>,
    /// Launch latch closed this tick.
    pub launch_latched: bool,
    /// Termination latch closed this tick (by pop or by cut).
    pub terminated_latched: bool,
    /// Current telemetry cadence for the uplink collaborator; 0 means
    /// silent in this phase.
    pub tx_interval_s: u32,
}

/// The flight control core: one owner for configuration, runtime
/// state, and every per-tick component. Collaborators reach it only
/// through `service` and the explicit command methods.
pub struct CutdownController {
    config: SystemConfig,
    state: RuntimeState,
    scheduler: TickScheduler,
    readings: Readings,
    launch: LaunchDetector,
    rules: RuleEngine,
    errors: ErrorRegistry,
    release: ReleaseLatch,
}

impl CutdownController {
    /// Builds the core around a validated configuration. The release
    /// latch starts `Unknown`; call [`Self::init_release`] once the
    /// actuator is ready.
    pub fn new(config: SystemConfig) -> Self {
        Self {
            config,
            state: RuntimeState::new(SystemMode::Normal),
            scheduler: TickScheduler::new(),
            readings: Readings::new(),
            launch: LaunchDetector::new(),
            rules: RuleEngine::new(),
            errors: ErrorRegistry::new(),
            release: ReleaseLatch::new(),
        }
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn state(&self) -> &RuntimeState {
        &self.state
    }

    pub fn readings(&self) -> &Readings {
        &self.readings
    }

    pub fn errors(&self) -> &ErrorRegistry {
        &self.errors
    }

    /// Drivers latch and clear their fault sources through here.
    pub fn errors_mut(&mut self) -> &mut ErrorRegistry {
        &mut self.errors
    }

    pub fn release(&self) -> &ReleaseLatch {
        &self.release
    }

    /// Boot-time actuator bring-up: command lock.
    pub fn init_release<A: ReleaseActuator>(&mut self, actuator: &mut A) {
        self.release.init(actuator);
    }

    /// Ground-test life check; never latches release.
    pub fn ground_test_wiggle<A: ReleaseActuator>(&mut self, actuator: &mut A) {
        self.release.wiggle(actuator);
    }

    /// Ground-test lock; rejected after release.
    pub fn ground_test_lock<A: ReleaseActuator>(&mut self, actuator: &mut A) -> bool {
        self.release.lock(actuator)
    }

    /// Mode is owned by the config-UI collaborator; changing it never
    /// touches flight state or latches.
    pub fn set_system_mode(&mut self, mode: SystemMode) {
        self.state.set_system_mode(mode);
    }

    /// Operator-commanded cut from the config UI. One-shot like every
    /// other cut source; returns whether it fired.
    pub fn manual_cut<A: ReleaseActuator>(&mut self, now_ms: u32, actuator: &mut A) -> bool {
        if !self.state.set_cut_fired(CutReason::Manual, now_ms) {
            return false;
        }
        self.release.release(actuator);
        self.state.refresh_flight_state();
        crate::warn!("manual cut commanded");
        true
    }

    /// Runs the control loop once. Returns `None` between ticks;
    /// otherwise executes the full per-tick pipeline in contract
    /// order and reports what happened.
    ///
    /// In `Config` mode the timebase, snapshot, and flight log keep
    /// running but the detectors and the cut decision are paused, and
    /// a pending remote-cut edge stays latched in the mailbox.
    pub fn service<S, A>(
        &mut self,
        now_ms: u32,
        sensors: &mut S,
        actuator: &mut A,
        mailbox: &UplinkMailbox,
    ) -> Option<TickReport>
    where
        S: SensorSource,
        A: ReleaseActuator,
    {
        let dt_s = self.scheduler.tick(now_ms)?;

        let mut report = TickReport {
            dt_s,
            ..TickReport::default()
        };

        // Tick-domain time advances before anything reads it.
        self.state.on_tick(dt_s);

        let raw = sensors.sample(now_ms);
        self.readings.refresh(&raw, &self.config);

        if self.state.system_mode == SystemMode::Normal {
            let was_terminated = self.state.terminated;

            report.launch_latched = self.update_launch(now_ms);
            self.update_termination(now_ms);

            if let Some(reason) = self.decide_cut(now_ms, actuator, mailbox) {
                report.cut = Some(reason);
            }

            report.terminated_latched = !was_terminated && self.state.terminated;
            self.state.refresh_flight_state();

            if self.state.cut_fired || self.state.terminated {
                mailbox.lock_out();
            }
        }

        crate::debug!(
            "t={}s mode={:?} flight={:?} launch={} cut={} ext=[{},{}]",
            self.state.t_power_s,
            self.state.system_mode,
            self.state.flight_state,
            self.state.launch_detected as u8,
            self.state.cut_fired as u8,
            self.readings.ext[0].debounced_active as u8,
            self.readings.ext[1].debounced_active as u8,
        );

        push_record(FlightRecord::Tick(TickRecord::capture(
            &self.state,
            &self.readings,
        )));

        mailbox.publish(TelemetryPacket::capture(
            &self.config.device,
            &self.state,
            &self.readings,
        ));
        report.tx_interval_s = transmit_interval_s(&self.config.uplink, &self.state);

        Some(report)
    }

    fn update_launch(&mut self, now_ms: u32) -> bool {
        if self.state.launch_detected {
            return false;
        }
        if !self.launch.update(&self.readings, self.errors.any_critical_active()) {
            return false;
        }
        let latched = self.state.set_launch_detected(now_ms);
        if latched {
            crate::info!("launch detected at t={}s", self.state.t_power_s);
        }
        latched
    }

    fn update_termination(&mut self, now_ms: u32) {
        let before = self.state.terminated;
        self.state
            .update_termination(&self.readings, &self.config.term, now_ms);
        if !before && self.state.terminated {
            crate::info!("termination detected at t={}s", self.state.t_power_s);
        }
    }

    fn decide_cut<A: ReleaseActuator>(
        &mut self,
        now_ms: u32,
        actuator: &mut A,
        mailbox: &UplinkMailbox,
    ) -> Option<CutReason> {
        if self.state.cut_fired {
            return None;
        }

        let mut external_active = [false; NUM_EXTERNAL_INPUTS];
        for (i, slot) in external_active.iter_mut().enumerate() {
            *slot = self.readings.ext[i].debounced_active;
        }

        let inputs = CutInputs {
            vars: self.readings.variables(&self.state),
            launch_detected: self.state.launch_detected,
            gps_fix_present: self.readings.gps_fix_present(),
            external_active,
            // The edge is consumed exactly once per tick.
            remote_cut_request: mailbox.take_remote_cut(),
            manual_cut_request: false,
        };

        let decision = self.rules.evaluate(&self.config, &inputs, self.state.cut_fired);
        if !decision.should_cut {
            return None;
        }

        // Latch first so every later stage of this same tick sees it,
        // then execute the physical release.
        self.state.set_cut_fired(decision.reason, now_ms);
        self.release.release(actuator);
        crate::warn!("cut fired: {:?}", decision.reason);
        Some(decision.reason)
    }
}
