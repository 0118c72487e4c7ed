//! Diagnostics for graph processing, written to stderr.
//!
//! `EngineConfig::verbosity` picks how much is reported; at 0 the macros
//! expand to a single comparison and print nothing.
//! - 0: SILENT
//! - 1: CHANGES (what the engine did to the input: stripped self-loops,
//!   inserted placeholders, rolled-up parent figures)
//! - 2: CHECKS (each defect as it is found, skipped records, clamped numbers)
//! - 3: DEBUG (cut cycle links, candidate path counts, interval sweeps)

/// Verbosity level constants.
pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_CHANGES: u8 = 1;
pub const VERBOSITY_CHECKS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// Log at CHANGES level (verbosity >= 1).
///
/// Used for: repairs the builder and validator apply to the graph.
#[macro_export]
macro_rules! log_changes {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHANGES {
            eprintln!($($arg)*);
        }
    };
}

/// Log at CHECKS level (verbosity >= 2).
///
/// Used for: detected defects, ignored input rows.
#[macro_export]
macro_rules! log_checks {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHECKS {
            eprintln!($($arg)*);
        }
    };
}

/// Log at DEBUG level (verbosity >= 3).
///
/// Used for: links cut to break cycles, critical path candidates, interval
/// boundaries.
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DEBUG {
            eprintln!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_ordering() {
        assert!(VERBOSITY_SILENT < VERBOSITY_CHANGES);
        assert!(VERBOSITY_CHANGES < VERBOSITY_CHECKS);
        assert!(VERBOSITY_CHECKS < VERBOSITY_DEBUG);
    }

    #[test]
    fn test_log_macros_compile() {
        let verbosity = VERBOSITY_SILENT;
        log_changes!(verbosity, "repaired {}", "a");
        log_checks!(verbosity, "defect {}", 2);
        log_debug!(verbosity, "paths {}", 3);
    }
}
