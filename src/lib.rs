pub mod buf;
pub mod codec;
pub mod exporter;

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Deserialize;

pub use buf::MetricsBuffer;
pub use exporter::{HttpPushClient, PushClient};

type MetricKey = String;

/// Seconds since the Unix epoch.
pub type Time = u64;

/// Label name to label value.
pub type Groups = BTreeMap<String, String>;

/// A sample value. Integers and floats render differently on the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
}
macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(value: $t) -> Self {
                Self::Int(i64::from(value))
            }
        })*
    };
}
impl_from_int!(i8, i16, i32, i64, u8, u16, u32);
impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}
impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricEvent {
    pub name: MetricKey,
    pub value: Value,
    /// `None` is resolved to the current time when the event is encoded.
    pub time: Option<Time>,
}
impl MetricEvent {
    pub fn new(name: impl Into<MetricKey>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            time: None,
        }
    }
    /// Pins the timestamp. `0` is written as `0`, not replaced by the current time.
    pub fn at(mut self, time: Time) -> Self {
        self.time = Some(time);
        self
    }
}

/// Where and under which grouping key a buffer pushes its lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    pub job: Option<String>,
    pub groups: Groups,
    /// Drop buffered lines after a successful flush. Off by default, so
    /// repeated flushes resend everything collected so far.
    pub clear_on_flush: bool,
}
impl PushConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn job(mut self, job: impl Into<String>) -> Self {
        self.job = Some(job.into());
        self
    }
    pub fn group(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.groups.insert(name.into(), value.into());
        self
    }
    pub fn clear_on_flush(mut self, clear: bool) -> Self {
        self.clear_on_flush = clear;
        self
    }
}

pub fn now() -> Time {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
