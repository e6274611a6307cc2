//! Wall-clock helpers for last-write-wins stamping.
//!
//! Records carry plain milliseconds since the Unix epoch rather than a logical
//! clock; ordering between devices is only as good as their clocks.

/// Milliseconds since the Unix epoch.
pub type Millis = i64;

/// Returns the current wall-clock time in milliseconds.
#[must_use]
pub fn now_millis() -> Millis {
    chrono::Utc::now().timestamp_millis()
}
