//! Progress reporting for a cover run.
//!
//! Only the global root rank reports; every other rank holds a disabled
//! logger and all calls are no-ops. Verbosity gates how much of the run
//! is narrated, from nothing through phase summaries to per-round
//! selection lines.

/// How much progress output a run produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// No output.
    Silent,
    /// Phase summaries (dataset shape, preparation results, totals).
    #[default]
    Summary,
    /// Summaries plus per-round and per-rank detail.
    Rounds,
}

impl Verbosity {
    /// Map a numeric CLI level to a verbosity.
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Verbosity::Silent,
            1 => Verbosity::Summary,
            _ => Verbosity::Rounds,
        }
    }
}

/// Run progress logger, enabled only on the root rank.
#[derive(Debug, Clone)]
pub struct RunLogger {
    verbosity: Verbosity,
    enabled: bool,
}

impl RunLogger {
    pub fn new(verbosity: Verbosity, is_root: bool) -> Self {
        Self {
            verbosity,
            enabled: is_root,
        }
    }

    /// Logger that never prints; useful in tests.
    pub fn disabled() -> Self {
        Self::new(Verbosity::Silent, false)
    }

    /// Phase-level progress line.
    pub fn phase(&self, message: &str) {
        if self.enabled && self.verbosity >= Verbosity::Summary {
            println!("{message}");
        }
    }

    /// Detail line, shown only at [`Verbosity::Rounds`].
    pub fn detail(&self, message: &str) {
        if self.enabled && self.verbosity >= Verbosity::Rounds {
            println!("{message}");
        }
    }

    /// Per-round selection line.
    pub fn round(&self, round: usize, attribute: i64, covers: u64) {
        if self.enabled && self.verbosity >= Verbosity::Rounds {
            println!("  round {round}: selected attribute #{attribute}, covers {covers} lines");
        }
    }
}
