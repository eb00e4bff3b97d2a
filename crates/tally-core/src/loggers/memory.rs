//! Logger that records every event in memory.

use parking_lot::Mutex;
use serde::Serialize;

use super::Logger;
use crate::models::{Mode, Status, TestInfo};

/// Kind of a recorded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Begin,
    End,
    ModuleBegin,
    ModuleEnd,
    Test,
    Info,
}

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub kind: EntryKind,
    /// Plan that was running when the event arrived
    pub plan: Option<String>,
    pub module_names: Vec<String>,
    pub test: Option<String>,
    pub status: Option<Status>,
    pub mode: Option<Mode>,
    pub message: Option<String>,
}

impl LogEntry {
    fn boundary(kind: EntryKind, plan: Option<String>, module_names: Vec<String>) -> Self {
        Self {
            kind,
            plan,
            module_names,
            test: None,
            status: None,
            mode: None,
            message: None,
        }
    }

    /// Hierarchical module name, segments joined by `.`.
    pub fn module(&self) -> String {
        self.module_names.join(".")
    }
}

#[derive(Debug, Default)]
struct History {
    entries: Vec<LogEntry>,
    current_plan: Option<String>,
}

/// Records log history for later inspection.
///
/// Mostly useful for testing log output, including testing the scheduler
/// itself.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    history: Mutex<History>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the recorded history.
    pub fn reset(&self) {
        *self.history.lock() = History::default();
    }

    /// Snapshot of every recorded event, oldest first.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.history.lock().entries.clone()
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.history.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First event matching `predicate`.
    pub fn find<P>(&self, predicate: P) -> Option<LogEntry>
    where
        P: Fn(&LogEntry) -> bool,
    {
        self.history.lock().entries.iter().find(|e| predicate(e)).cloned()
    }

    /// Index of the first event matching `predicate`.
    pub fn position<P>(&self, predicate: P) -> Option<usize>
    where
        P: Fn(&LogEntry) -> bool,
    {
        self.history.lock().entries.iter().position(predicate)
    }

    /// Assertion events only, in order.
    pub fn assertions(&self) -> Vec<LogEntry> {
        self.history
            .lock()
            .entries
            .iter()
            .filter(|e| e.kind == EntryKind::Test)
            .cloned()
            .collect()
    }

    /// Number of assertion events with `status`.
    pub fn count(&self, status: Status) -> usize {
        self.history
            .lock()
            .entries
            .iter()
            .filter(|e| e.status == Some(status))
            .count()
    }

    fn push_test_event(
        &self,
        kind: EntryKind,
        status: Option<Status>,
        info: &TestInfo,
        message: &str,
    ) {
        let mut history = self.history.lock();
        let plan = history.current_plan.clone();
        history.entries.push(LogEntry {
            kind,
            plan,
            module_names: info.module_names.clone(),
            test: Some(info.test_name.clone()),
            status,
            mode: Some(info.mode),
            message: Some(message.to_string()),
        });
    }
}

impl Logger for MemoryLogger {
    fn begin(&self, plan: &str) {
        let mut history = self.history.lock();
        history.entries.push(LogEntry::boundary(
            EntryKind::Begin,
            Some(plan.to_string()),
            Vec::new(),
        ));
        history.current_plan = Some(plan.to_string());
    }

    fn end(&self, plan: &str) {
        let mut history = self.history.lock();
        history.entries.push(LogEntry::boundary(
            EntryKind::End,
            Some(plan.to_string()),
            Vec::new(),
        ));
        history.current_plan = None;
    }

    fn add(&self, status: Status, info: &TestInfo, message: &str) {
        self.push_test_event(EntryKind::Test, Some(status), info, message);
    }

    fn module_begin(&self, module_names: &[String]) {
        let mut history = self.history.lock();
        let plan = history.current_plan.clone();
        history.entries.push(LogEntry::boundary(
            EntryKind::ModuleBegin,
            plan,
            module_names.to_vec(),
        ));
    }

    fn module_end(&self, module_names: &[String]) {
        let mut history = self.history.lock();
        let plan = history.current_plan.clone();
        history.entries.push(LogEntry::boundary(
            EntryKind::ModuleEnd,
            plan,
            module_names.to_vec(),
        ));
    }

    fn info(&self, info: &TestInfo, message: &str) {
        self.push_test_event(EntryKind::Info, None, info, message);
    }
}
