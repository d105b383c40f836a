//! In-memory row sink for testing.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::output::{OutputError, RowSink};
use crate::pipeline::EnrichedRow;
use crate::source::DateWindow;

/// A captured `write` call.
#[derive(Debug, Clone)]
pub struct RecordedWrite {
    pub window: DateWindow,
    pub rows: Vec<EnrichedRow>,
}

/// [`RowSink`] that keeps every write in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    writes: Mutex<Vec<RecordedWrite>>,
    next_error: Mutex<Option<OutputError>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, error: OutputError) {
        *lock(&self.next_error) = Some(error);
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        lock(&self.writes).clone()
    }
}

impl RowSink for MemorySink {
    fn write(&self, window: &DateWindow, rows: &[EnrichedRow]) -> Result<PathBuf, OutputError> {
        if let Some(error) = lock(&self.next_error).take() {
            return Err(error);
        }
        lock(&self.writes).push(RecordedWrite {
            window: *window,
            rows: rows.to_vec(),
        });
        Ok(PathBuf::from(format!("memory/enriched_news_{}.csv", window.end_tag())))
    }
}
