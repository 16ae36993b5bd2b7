use chrono::{Local, NaiveDate};
use std::sync::Mutex;

/// Source of the calendar day that partitions the usage ledger
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Process-local wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Manually driven clock for exercising day rollover
#[derive(Debug)]
pub struct FixedClock {
    day: Mutex<NaiveDate>,
}

impl FixedClock {
    pub fn new(day: NaiveDate) -> Self {
        Self {
            day: Mutex::new(day),
        }
    }

    pub fn set(&self, day: NaiveDate) {
        let mut guard = self.day.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = day;
    }

    pub fn advance_days(&self, days: u64) {
        let mut guard = self.day.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(next) = guard.checked_add_days(chrono::Days::new(days)) {
            *guard = next;
        }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.day.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
