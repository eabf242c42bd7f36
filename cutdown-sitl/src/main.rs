//! Software-in-the-loop harness for the cutdown flight core.
//!
//! Drives `CutdownController` through a scripted balloon flight at a
//! simulated 1 Hz: pad idle, ascent, a rule-based cut (or natural
//! burst), and descent to the ground. Stands in for every collaborator:
//! sensors, release actuator, uplink mailbox, and the flight-log drain.
//!
//! Run with `RUST_LOG=debug` to see the per-tick status stream.

// Links the std critical-section implementation the core's channel and
// data cells rely on.
use critical_section as _;

use std::cell::Cell;
use std::error::Error;
use std::fs::File;
use std::io::Write as _;
use std::rc::Rc;

use cutdown_core::config::Condition;
use cutdown_core::flight_log::{FlightRecord, RecordBuffer, DROPPED_RECORDS, FLIGHT_LOG};
use cutdown_core::readings::{AgedSample, Measurement, RawSensors, SensorSource};
use cutdown_core::release::{ReleaseActuator, ReleaseCommand};
use cutdown_core::telemetry::UplinkMailbox;
use cutdown_core::types::{CompareOp, FlightState, VariableId};
use cutdown_core::{CutdownController, SystemConfig, MAX_RECORD_LINE_LEN};

const SEA_LEVEL_HPA: f32 = 1013.25;
const SCALE_HEIGHT_M: f32 = 8434.0;

const PAD_ALT_M: f32 = 150.0;
const ASCENT_RATE_MPS: f32 = 40.0;
const DESCENT_RATE_MPS: f32 = 25.0;
const BURST_ALT_M: f32 = 30_000.0;

/// GPS cold start: the receiver talks after 3 s, fixes after 8 s.
const GPS_LINK_UP_S: u32 = 3;
const GPS_FIX_S: u32 = 8;

/// Launch happens 20 s into the simulation.
const LAUNCH_S: u32 = 20;

fn pressure_at(alt_m: f32) -> f32 {
    SEA_LEVEL_HPA * (-alt_m / SCALE_HEIGHT_M).exp()
}

/// Scripted balloon: pad idle, constant-rate ascent, descent after the
/// release fires or the envelope bursts.
struct BalloonSensors {
    released: Rc<Cell<bool>>,
    /// Altitude where descent began, captured at the transition.
    descent_from: Option<(u32, f32)>,
}

impl BalloonSensors {
    fn new(released: Rc<Cell<bool>>) -> Self {
        Self {
            released,
            descent_from: None,
        }
    }

    fn altitude_at(&mut self, t_s: u32) -> f32 {
        if let Some((start_s, start_alt)) = self.descent_from {
            let fallen = (t_s - start_s) as f32 * DESCENT_RATE_MPS;
            return (start_alt - fallen).max(PAD_ALT_M);
        }

        let alt = if t_s <= LAUNCH_S {
            PAD_ALT_M
        } else {
            PAD_ALT_M + (t_s - LAUNCH_S) as f32 * ASCENT_RATE_MPS
        };

        if self.released.get() || alt >= BURST_ALT_M {
            self.descent_from = Some((t_s, alt.min(BURST_ALT_M)));
        }
        alt.min(BURST_ALT_M)
    }
}

impl SensorSource for BalloonSensors {
    fn sample(&mut self, now_ms: u32) -> RawSensors {
        let t_s = now_ms / 1000;
        let alt = self.altitude_at(t_s);

        let mut raw = RawSensors::default();
        raw.gps.link_ok = t_s >= GPS_LINK_UP_S;
        if t_s >= GPS_FIX_S {
            raw.gps.lat_deg = AgedSample {
                value: 44.0505,
                age_ms: 0,
            };
            raw.gps.lon_deg = AgedSample {
                value: -121.3153,
                age_ms: 0,
            };
            raw.gps.alt_m = AgedSample {
                value: alt,
                age_ms: 0,
            };
        }

        raw.env.pressure_hpa = Measurement::valid(pressure_at(alt));
        raw.env.temp_c = Measurement::valid(15.0 - alt * 0.0065);
        raw.env.humidity_pct = Measurement::valid(35.0);
        raw
    }
}

/// Release driver that flips the shared flag the sensor model watches.
struct SimActuator {
    released: Rc<Cell<bool>>,
}

impl ReleaseActuator for SimActuator {
    fn drive(&mut self, command: ReleaseCommand) {
        log::info!("actuator: {command:?}");
        if command == ReleaseCommand::Release {
            self.released.set(true);
        }
    }
}

/// Persistence collaborator: drains the flight-log channel to a CSV.
struct LogDrain {
    file: File,
    buffer: RecordBuffer<MAX_RECORD_LINE_LEN>,
}

impl LogDrain {
    fn create(path: &str) -> Result<Self, Box<dyn Error>> {
        let mut drain = Self {
            file: File::create(path)?,
            buffer: RecordBuffer::new(),
        };
        let mut header = RecordBuffer::<256>::new();
        FlightRecord::write_schema(&mut header)?;
        drain.file.write_all(header.as_bytes())?;
        Ok(drain)
    }

    fn drain(&mut self) -> Result<(), Box<dyn Error>> {
        while let Ok(record) = FLIGHT_LOG.try_receive() {
            self.buffer.clear();
            if record.format_to(&mut self.buffer).is_ok() {
                self.file.write_all(self.buffer.as_bytes())?;
            }
        }
        Ok(())
    }
}

fn sim_config() -> SystemConfig {
    let mut config = SystemConfig::safe_defaults();
    config.device.serial_number = 1_234_567;
    // Flight plan: cut once we've held 28 km for 10 s.
    config.bucket_b[0] = Condition {
        enabled: true,
        var_id: VariableId::GpsAltM,
        op: CompareOp::Ge,
        threshold: 28_000.0,
        for_seconds: 10,
    };
    config.global_cut.require_gps_fix_before_cut = true;
    config
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let config = sim_config();
    if let Err(e) = config.validate() {
        return Err(format!("sim config rejected: {e:?}").into());
    }

    println!("cutdown-sitl (core {})", cutdown_core::VERSION);

    let released = Rc::new(Cell::new(false));
    let mut sensors = BalloonSensors::new(released.clone());
    let mut actuator = SimActuator { released };
    let mailbox = UplinkMailbox::new();
    let mut drain = LogDrain::create("flight_log.csv")?;

    let mut controller = CutdownController::new(config);
    controller.init_release(&mut actuator);
    controller.ground_test_wiggle(&mut actuator);

    let mut last_state = FlightState::Ground;
    let mut ticks_after_landing = 0u32;

    // 5 Hz polling of a 1 Hz scheduler, as the firmware loop would.
    let mut now_ms: u32 = 0;
    while now_ms < 3_600_000 {
        if let Some(report) = controller.service(now_ms, &mut sensors, &mut actuator, &mailbox) {
            let state = controller.state();

            if state.flight_state != last_state {
                println!(
                    "t={:5}s  {:?} -> {:?}  (alt {:.0} m)",
                    state.t_power_s,
                    last_state,
                    state.flight_state,
                    controller.readings().gps_alt.value,
                );
                last_state = state.flight_state;
            }

            if let Some(reason) = report.cut {
                println!("t={:5}s  CUT ({reason:?})", state.t_power_s);
            }

            drain.drain()?;

            // A few beacon ticks on the ground, then stop.
            if state.terminated && controller.readings().gps_alt.value <= PAD_ALT_M {
                ticks_after_landing += 1;
                if ticks_after_landing > 10 {
                    break;
                }
            }
        }
        now_ms += 200;
    }

    drain.drain()?;

    let state = controller.state();
    println!();
    println!("flight summary");
    println!("  launch      t={} s", state.launch_ms / 1000);
    println!("  cut         t={} s ({:?})", state.cut_ms / 1000, state.cut_reason);
    println!("  terminated  t={} s", state.terminated_ms / 1000);
    println!("  released    {}", controller.release().is_released());
    println!(
        "  log records dropped: {}",
        DROPPED_RECORDS.load(std::sync::atomic::Ordering::Relaxed)
    );

    Ok(())
}
