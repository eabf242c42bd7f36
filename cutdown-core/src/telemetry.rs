// telemetry.rs

use crate::config::{DeviceConfig, UplinkConfig};
use crate::datacells::DataCell;
use crate::readings::Readings;
use crate::state_machine::RuntimeState;

/// Mobile-originated telemetry packet.
///
/// Encoded with postcard, which is not self-describing: the ground
/// decoder must use this exact field order and these exact types.
/// Invalid sensor fields carry NaN.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TelemetryPacket {
    pub serial_number: u32,
    pub t_power_s: u32,
    /// `FlightState` discriminant.
    pub flight_state: u8,
    pub lat_deg: f32,
    pub lon_deg: f32,
    pub alt_m: f32,
    pub temp_c: f32,
    pub pressure_hpa: f32,
    pub humidity_pct: f32,
    pub cut_fired: bool,
    /// `CutReason` discriminant.
    pub cut_reason: u8,
}

/// Worst-case encoded size (postcard varints can pad past the packed
/// struct size).
pub const MAX_PACKET_LEN: usize = 64;

impl TelemetryPacket {
    /// Builds the packet for the current tick.
    pub fn capture(device: &DeviceConfig, state: &RuntimeState, readings: &Readings) -> Self {
        Self {
            serial_number: device.serial_number,
            t_power_s: state.t_power_s,
            flight_state: state.flight_state as u8,
            lat_deg: readings.gps_lat.or_nan(),
            lon_deg: readings.gps_lon.or_nan(),
            alt_m: readings.gps_alt.or_nan(),
            temp_c: readings.temp.or_nan(),
            pressure_hpa: readings.pressure.or_nan(),
            humidity_pct: readings.humidity.or_nan(),
            cut_fired: state.cut_fired,
            cut_reason: state.cut_reason as u8,
        }
    }

    /// Serializes into the caller's buffer, returning the used length.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, postcard::Error> {
        let used = postcard::to_slice(self, buf)?;
        Ok(used.len())
    }

    /// Decodes a packet, for the ground side and loopback tests.
    pub fn decode(buf: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(buf)
    }
}

/// Maps the flight phase to the transmit interval in seconds; 0 means
/// "do not transmit in this phase".
///
/// Ground until launch, ascent until termination, then the descent
/// cadence for `descent_duration_s` (recovery-critical window), then
/// the long-tail beacon. `descent_duration_s == 0` goes straight to
/// beacon.
pub fn transmit_interval_s(config: &UplinkConfig, state: &RuntimeState) -> u32 {
    if !state.launch_detected {
        return config.ground_interval_s;
    }

    if !state.terminated {
        return config.ascent_interval_s;
    }

    let descent_window = config.descent_duration_s;
    if descent_window == 0 {
        return config.beacon_interval_s;
    }

    if state.t_terminated_s <= descent_window {
        config.descent_interval_s
    } else {
        config.beacon_interval_s
    }
}

/// Mailbox polling interval in seconds; 0 once polling stops. The
/// mailbox is only worth paying for while a remote cut could still
/// change the flight.
pub fn mailbox_poll_interval_s(config: &UplinkConfig, state: &RuntimeState) -> u32 {
    if state.cut_fired || state.terminated {
        return 0;
    }
    config.mailbox_check_interval_s
}

/// The uplink collaborator's two-way contact surface with the core:
/// a single-slot latest-snapshot cell flowing out and a one-shot
/// remote-cut signal flowing in. The uplink task never touches core
/// state directly.
pub struct UplinkMailbox {
    latest: DataCell<TelemetryPacket>,
    remote_cut: DataCell<bool>,
    lockout: DataCell<bool>,
}

impl UplinkMailbox {
    pub const fn new() -> Self {
        Self {
            latest: DataCell::new(TelemetryPacket {
                serial_number: 0,
                t_power_s: 0,
                flight_state: 0,
                lat_deg: f32::NAN,
                lon_deg: f32::NAN,
                alt_m: f32::NAN,
                temp_c: f32::NAN,
                pressure_hpa: f32::NAN,
                humidity_pct: f32::NAN,
                cut_fired: false,
                cut_reason: 0,
            }),
            remote_cut: DataCell::new(false),
            lockout: DataCell::new(false),
        }
    }

    /// Core side: publishes this tick's snapshot.
    pub fn publish(&self, packet: TelemetryPacket) {
        self.latest.store(packet);
    }

    /// Uplink side: the most recent snapshot for transmission.
    pub fn latest(&self) -> TelemetryPacket {
        self.latest.load()
    }

    /// Uplink side: latches an authorized remote-cut request. Returns
    /// whether the request was accepted; requests after cut or
    /// termination are refused.
    pub fn request_remote_cut(&self) -> bool {
        if self.lockout.load() {
            return false;
        }
        self.remote_cut.store(true);
        true
    }

    /// Core side: consumes the one-shot remote-cut edge, at most once
    /// per tick.
    pub fn take_remote_cut(&self) -> bool {
        self.remote_cut.swap(false)
    }

    /// Core side: permanently refuses further remote-cut requests once
    /// the flight is cut or terminated.
    pub fn lock_out(&self) {
        self.lockout.store(true);
        self.remote_cut.store(false);
    }
}

impl Default for UplinkMailbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SystemConfig;
    use crate::readings::Measurement;
    use crate::types::{CutReason, SystemMode};

    fn uplink_config() -> UplinkConfig {
        let mut config = SystemConfig::safe_defaults().uplink;
        config.ground_interval_s = 600;
        config.ascent_interval_s = 300;
        config.descent_interval_s = 120;
        config.beacon_interval_s = 1800;
        config.descent_duration_s = 3600;
        config
    }

    #[test]
    fn phase_selection_follows_the_flight() {
        let config = uplink_config();
        let mut state = RuntimeState::new(SystemMode::Normal);

        assert_eq!(transmit_interval_s(&config, &state), 600);

        state.set_launch_detected(1_000);
        assert_eq!(transmit_interval_s(&config, &state), 300);

        state.set_terminated(2_000);
        state.t_terminated_s = 0;
        assert_eq!(transmit_interval_s(&config, &state), 120);

        // Boundary: still descent exactly at the window edge.
        state.t_terminated_s = 3600;
        assert_eq!(transmit_interval_s(&config, &state), 120);

        state.t_terminated_s = 3601;
        assert_eq!(transmit_interval_s(&config, &state), 1800);
    }

    #[test]
    fn zero_descent_window_goes_straight_to_beacon() {
        let mut config = uplink_config();
        config.descent_duration_s = 0;
        let mut state = RuntimeState::new(SystemMode::Normal);
        state.set_launch_detected(1_000);
        state.set_terminated(2_000);
        assert_eq!(transmit_interval_s(&config, &state), 1800);
    }

    #[test]
    fn zero_interval_means_silent_phase() {
        let mut config = uplink_config();
        config.ground_interval_s = 0;
        let state = RuntimeState::new(SystemMode::Normal);
        assert_eq!(transmit_interval_s(&config, &state), 0);
    }

    #[test]
    fn mailbox_polling_stops_after_termination() {
        let config = uplink_config();
        let mut state = RuntimeState::new(SystemMode::Normal);
        assert_eq!(mailbox_poll_interval_s(&config, &state), 300);

        state.set_launch_detected(1_000);
        assert_eq!(mailbox_poll_interval_s(&config, &state), 300);

        state.set_terminated(2_000);
        assert_eq!(mailbox_poll_interval_s(&config, &state), 0);
    }

    #[test]
    fn packet_round_trips_through_postcard() {
        let mut state = RuntimeState::new(SystemMode::Normal);
        state.t_power_s = 99;
        state.set_launch_detected(1_000);
        state.set_cut_fired(CutReason::IridiumRemote, 5_000);

        let mut readings = Readings::new();
        readings.gps_alt = Measurement::valid(28_111.0);

        let device = DeviceConfig {
            serial_number: 1_234_567,
            ap_password: heapless::String::new(),
        };
        let packet = TelemetryPacket::capture(&device, &state, &readings);

        let mut buf = [0u8; MAX_PACKET_LEN];
        let len = packet.encode(&mut buf).unwrap();
        let decoded = TelemetryPacket::decode(&buf[..len]).unwrap();

        assert_eq!(decoded.serial_number, 1_234_567);
        assert_eq!(decoded.alt_m, 28_111.0);
        assert!(decoded.lat_deg.is_nan());
        assert!(decoded.cut_fired);
        assert_eq!(decoded.cut_reason, CutReason::IridiumRemote as u8);
        assert_eq!(decoded.flight_state, 2);
    }

    #[test]
    fn mailbox_remote_cut_is_one_shot() {
        let mailbox = UplinkMailbox::new();
        assert!(!mailbox.take_remote_cut());

        assert!(mailbox.request_remote_cut());
        assert!(mailbox.take_remote_cut());
        assert!(!mailbox.take_remote_cut());
    }

    #[test]
    fn mailbox_lockout_refuses_late_requests() {
        let mailbox = UplinkMailbox::new();
        mailbox.lock_out();
        assert!(!mailbox.request_remote_cut());
        assert!(!mailbox.take_remote_cut());
    }

    #[test]
    fn lockout_clears_a_pending_request() {
        let mailbox = UplinkMailbox::new();
        assert!(mailbox.request_remote_cut());
        mailbox.lock_out();
        assert!(!mailbox.take_remote_cut());
    }
}
