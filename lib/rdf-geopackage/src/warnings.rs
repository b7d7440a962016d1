use std::collections::BTreeMap;
use std::fmt;

/// A recoverable problem with the geometries of a table, e.g., an unsupported geometry type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Warning {
    pub table: String,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Table \"{}\": \"{}\"; skipped", self.table, self.message)
    }
}

/// Counts the recoverable problems of a run by table and message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarningCounter {
    counts: BTreeMap<Warning, u64>,
}

impl WarningCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, table: &str, message: impl Into<String>) {
        *self
            .counts
            .entry(Warning {
                table: table.to_owned(),
                message: message.into(),
            })
            .or_default() += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// The number of recorded problems, counting repetitions.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// The distinct warnings and how often each occurred, ordered by table and message.
    pub fn iter(&self) -> impl Iterator<Item = (&Warning, u64)> {
        self.counts.iter().map(|(warning, count)| (warning, *count))
    }

    /// Logs one line per distinct warning.
    pub fn log_summary(&self) {
        for (warning, count) in self.iter() {
            tracing::warn!("{warning} ({count}x)");
        }
    }
}

impl fmt::Display for WarningCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (warning, count) in self.iter() {
            writeln!(f, "{warning} ({count}x)")?;
        }
        Ok(())
    }
}
