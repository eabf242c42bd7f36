// flight_log.rs

use core::fmt::Write;
use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use proc_macros::TelemetryPayload;

use crate::readings::Readings;
use crate::state_machine::RuntimeState;

/// Safe upper bound for a single formatted record line.
pub const MAX_RECORD_LINE_LEN: usize = 192;

/// Capacity of the flight-log channel. Sized so a slow storage flush
/// can fall a minute behind the 1 Hz record stream without loss.
pub const FLIGHT_LOG_DEPTH: usize = 64;

/// Severity of a free-text note record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    const fn letter(self) -> &'static str {
        match self {
            LogLevel::Info => "I",
            LogLevel::Warn => "W",
            LogLevel::Error => "E",
        }
    }
}

/// One flight record per 1 Hz tick. Invalid numeric fields carry the
/// NaN sentinel so post-flight tooling can distinguish "no sample"
/// from a real zero.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize, TelemetryPayload)]
pub struct TickRecord {
    pub t_power_s: u32,
    pub launch_detected: bool,
    pub cut_fired: bool,
    pub cut_reason: u8,
    pub gps_fix: bool,
    pub lat_deg: f32,
    pub lon_deg: f32,
    pub alt_m: f32,
    pub temp_c: f32,
    pub pressure_hpa: f32,
    pub humidity_pct: f32,
}

impl TickRecord {
    /// Captures the per-tick record from the current state + snapshot.
    pub fn capture(state: &RuntimeState, readings: &Readings) -> Self {
        Self {
            t_power_s: state.t_power_s,
            launch_detected: state.launch_detected,
            cut_fired: state.cut_fired,
            cut_reason: state.cut_reason as u8,
            gps_fix: readings.gps_fix_present(),
            lat_deg: readings.gps_lat.or_nan(),
            lon_deg: readings.gps_lon.or_nan(),
            alt_m: readings.gps_alt.or_nan(),
            temp_c: readings.temp.or_nan(),
            pressure_hpa: readings.pressure.or_nan(),
            humidity_pct: readings.humidity.or_nan(),
        }
    }
}

/// A type that can be rendered as one tagged CSV log row.
pub trait Loggable {
    /// Row tag identifying the record type (e.g. "T").
    const TAG: &'static str;

    /// Writes only the payload fields and separating commas; the tag
    /// and newline belong to the framing code.
    fn format_payload<const SIZE: usize>(&self, out: &mut RecordBuffer<SIZE>)
        -> core::fmt::Result;
}

impl Loggable for TickRecord {
    const TAG: &'static str = "T";

    fn format_payload<const SIZE: usize>(
        &self,
        out: &mut RecordBuffer<SIZE>,
    ) -> core::fmt::Result {
        write!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{}",
            self.t_power_s,
            self.launch_detected as u8,
            self.cut_fired as u8,
            self.cut_reason,
            self.gps_fix as u8,
            self.lat_deg,
            self.lon_deg,
            self.alt_m,
            self.temp_c,
            self.pressure_hpa,
            self.humidity_pct
        )
    }
}

/// Records flowing to the persistence collaborator.
#[derive(Debug, Clone)]
pub enum FlightRecord {
    /// The per-tick flight record.
    Tick(TickRecord),
    /// Free-text note from the logging macros. Notes carry no
    /// timestamp of their own; they land between the tick rows that
    /// bracket them.
    Note(LogLevel, heapless::String<48>),
}

impl FlightRecord {
    /// Writes the log-file schema header: one comment row per record
    /// type plus firmware identity.
    pub fn write_schema<const SIZE: usize>(out: &mut RecordBuffer<SIZE>) -> core::fmt::Result {
        writeln!(out, "# cutdown-core {}", crate::VERSION)?;
        writeln!(out, "# {},{}", TickRecord::TAG, TickRecord::CSV_HEADER)?;
        writeln!(out, "# N,level,message")?;
        Ok(())
    }

    /// Renders the record as one framed CSV row.
    pub fn format_to<const SIZE: usize>(&self, out: &mut RecordBuffer<SIZE>) -> core::fmt::Result {
        match self {
            FlightRecord::Tick(record) => {
                write!(out, "{},", TickRecord::TAG)?;
                record.format_payload(out)?;
                writeln!(out)
            }
            FlightRecord::Note(level, message) => {
                writeln!(out, "N,{},{}", level.letter(), message.as_str())
            }
        }
    }
}

/// Bounded queue between the tick path and the storage collaborator.
pub static FLIGHT_LOG: Channel<CriticalSectionRawMutex, FlightRecord, FLIGHT_LOG_DEPTH> =
    Channel::new();

/// Records lost to backpressure since boot.
pub static DROPPED_RECORDS: AtomicU32 = AtomicU32::new(0);

/// Enqueues a record, counting it as dropped when the channel is full.
/// The tick path never blocks on storage.
pub fn push_record(record: FlightRecord) {
    if FLIGHT_LOG.try_send(record).is_err() {
        DROPPED_RECORDS.fetch_add(1, Ordering::Relaxed);
    }
}

/// Fixed-capacity byte buffer implementing `core::fmt::Write`, used to
/// render records without allocation. A write that would overflow
/// fails cleanly instead of truncating.
pub struct RecordBuffer<const SIZE: usize> {
    buf: [u8; SIZE],
    len: usize,
}

impl<const SIZE: usize> RecordBuffer<SIZE> {
    pub const fn new() -> Self {
        Self {
            buf: [0u8; SIZE],
            len: 0,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn as_str(&self) -> &str {
        // Only `write_str` appends, so the contents are valid UTF-8.
        core::str::from_utf8(self.as_bytes()).unwrap_or("")
    }

    pub fn remaining(&self) -> usize {
        SIZE - self.len
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl<const SIZE: usize> Default for RecordBuffer<SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const SIZE: usize> core::fmt::Write for RecordBuffer<SIZE> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let bytes = s.as_bytes();
        if bytes.len() > self.remaining() {
            return Err(core::fmt::Error);
        }
        self.buf[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
        Ok(())
    }
}
