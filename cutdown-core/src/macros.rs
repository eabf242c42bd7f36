// Logging macros: every operational message goes to the host logger
// and, for info and above, also into the flight log as a note record so
// post-flight analysis sees the same narrative the operator did.
//
// Notes are bounded; a message that does not fit the note buffer is
// still logged, just not recorded.

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {{
        ::log::info!($($arg)*);
        $crate::flight_note!($crate::flight_log::LogLevel::Info, $($arg)*);
    }};
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {{
        ::log::warn!($($arg)*);
        $crate::flight_note!($crate::flight_log::LogLevel::Warn, $($arg)*);
    }};
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {{
        ::log::error!($($arg)*);
        $crate::flight_note!($crate::flight_log::LogLevel::Error, $($arg)*);
    }};
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        ::log::debug!($($arg)*);
    };
}

#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        ::log::trace!($($arg)*);
    };
}

#[macro_export]
macro_rules! flight_note {
    ($level:expr, $($arg:tt)*) => {{
        use core::fmt::Write;
        let mut note = ::heapless::String::<48>::new();
        if write!(note, $($arg)*).is_ok() {
            $crate::flight_log::push_record(
                $crate::flight_log::FlightRecord::Note($level, note),
            );
        }
    }};
}
