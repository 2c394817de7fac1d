use std::fmt;

use chrono::{DateTime, Local};

/// Source of the timestamps used for records and segment names.
pub trait Clock: fmt::Debug + Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// The wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}
