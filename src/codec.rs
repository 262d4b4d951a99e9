use core::fmt::{self, Write};

use crate::{MetricEvent, Time, Value};

/// Digits after the decimal point for float values.
pub const FLOAT_PRECISION: usize = 18;

pub fn encode_value(wtr: &mut impl Write, value: Value) -> fmt::Result {
    match value {
        Value::Int(v) => write!(wtr, "{v}"),
        Value::Float(v) => write!(wtr, "{v:.prec$}", prec = FLOAT_PRECISION),
    }
}

/// `<name> <value> <time>\n`
pub fn encode_line(wtr: &mut impl Write, name: &str, value: Value, time: Time) -> fmt::Result {
    wtr.write_str(name)?;
    wtr.write_char(' ')?;
    encode_value(wtr, value)?;
    writeln!(wtr, " {time}")
}

/// Encodes `event`, taking the timestamp from `now` when the event has none.
pub fn encode_event(event: &MetricEvent, now: impl FnOnce() -> Time) -> String {
    let time = event.time.unwrap_or_else(now);
    let mut line = String::with_capacity(event.name.len() + FLOAT_PRECISION + 16);
    // Writing into a `String` cannot fail.
    let _ = encode_line(&mut line, &event.name, event.value, time);
    line
}
