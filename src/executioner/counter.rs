use serde::Serialize;

/// Tallies for one `execute`/`execute_by_ids` call. Only ever grows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counter {
    event_count: usize,
    evaluated_count: usize,
    executed_count: usize,
    total_scheduled_count: usize,
}

impl Counter {
    pub fn event_count(&self) -> usize {
        self.event_count
    }

    pub fn evaluated_count(&self) -> usize {
        self.evaluated_count
    }

    pub fn executed_count(&self) -> usize {
        self.executed_count
    }

    pub fn total_scheduled_count(&self) -> usize {
        self.total_scheduled_count
    }

    pub fn advance_event_count(&mut self) {
        self.event_count += 1;
    }

    pub fn advance_evaluated(&mut self, step: usize) {
        self.evaluated_count += step;
    }

    pub fn advance_executed(&mut self, step: usize) {
        self.executed_count += step;
    }

    pub fn advance_total_scheduled(&mut self, step: usize) {
        self.total_scheduled_count += step;
    }
}
