// errors.rs

/// Fault sources tracked by the registry.
#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorCode {
    /// Environmental (pressure/temp/humidity) sensor failure.
    EnvSensor = 0,
    /// Storage media not present.
    StorageMissing = 1,
    /// Storage mounted but read/write failed.
    StorageIo = 2,
    /// GPS receiver not talking or misconfigured (not "no fix yet").
    GpsLink = 3,
    /// Satellite modem failure.
    UplinkModem = 4,
    Unspecified = 5,
}

pub const ERROR_COUNT: usize = 6;

const _: () = assert!(
    ErrorCode::Unspecified as usize + 1 == ERROR_COUNT,
    "ERROR_COUNT must track the ErrorCode enum"
);

/// Aggregate fault severity. Critical dominates Warn dominates None.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Severity {
    #[default]
    None = 0,
    Warn = 1,
    Critical = 2,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; ERROR_COUNT] = [
        ErrorCode::EnvSensor,
        ErrorCode::StorageMissing,
        ErrorCode::StorageIo,
        ErrorCode::GpsLink,
        ErrorCode::UplinkModem,
        ErrorCode::Unspecified,
    ];

    /// Compile-time severity assignment. A missing card only degrades
    /// post-flight analysis; everything else compromises the cut
    /// decision or recovery and blocks the launch latch.
    pub const fn severity(self) -> Severity {
        match self {
            ErrorCode::StorageMissing => Severity::Warn,
            ErrorCode::EnvSensor
            | ErrorCode::StorageIo
            | ErrorCode::GpsLink
            | ErrorCode::UplinkModem
            | ErrorCode::Unspecified => Severity::Critical,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ErrorCode::EnvSensor => "Env sensor",
            ErrorCode::StorageMissing => "Storage missing",
            ErrorCode::StorageIo => "Storage I/O",
            ErrorCode::GpsLink => "GPS",
            ErrorCode::UplinkModem => "Uplink modem",
            ErrorCode::Unspecified => "Unspecified",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ErrorEntry {
    active: bool,
    first_seen_s: u32,
}

/// Sticky per-source fault latches.
///
/// Each source is set with the tick-domain time it was first seen and
/// stays active until explicitly cleared when the underlying condition
/// resolves. Latched flight events (cut, terminated, launch) are never
/// cancelled by errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorRegistry {
    entries: [ErrorEntry; ERROR_COUNT],
}

impl ErrorRegistry {
    pub const fn new() -> Self {
        Self {
            entries: [ErrorEntry {
                active: false,
                first_seen_s: 0,
            }; ERROR_COUNT],
        }
    }

    /// Latches a fault. Only the first set records `first_seen_s`.
    pub fn set(&mut self, code: ErrorCode, now_s: u32) {
        let entry = &mut self.entries[code as usize];
        if !entry.active {
            entry.active = true;
            entry.first_seen_s = now_s;
        }
    }

    /// Clears a fault once the underlying condition resolves.
    pub fn clear(&mut self, code: ErrorCode) {
        self.entries[code as usize] = ErrorEntry::default();
    }

    pub fn is_active(&self, code: ErrorCode) -> bool {
        self.entries[code as usize].active
    }

    /// Seconds-since-boot when the fault first latched, while active.
    pub fn first_seen_s(&self, code: ErrorCode) -> Option<u32> {
        let entry = self.entries[code as usize];
        entry.active.then_some(entry.first_seen_s)
    }

    pub fn any_active(&self) -> bool {
        self.entries.iter().any(|e| e.active)
    }

    pub fn any_critical_active(&self) -> bool {
        ErrorCode::ALL
            .iter()
            .any(|code| self.is_active(*code) && code.severity() == Severity::Critical)
    }

    pub fn overall_severity(&self) -> Severity {
        let mut worst = Severity::None;
        for code in ErrorCode::ALL {
            if self.is_active(code) && code.severity() > worst {
                worst = code.severity();
            }
        }
        worst
    }
}
