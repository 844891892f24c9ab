use std::time::{SystemTime, UNIX_EPOCH};

pub type EpochMillis = u64;

pub fn now_epoch_millis() -> EpochMillis {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    duration.as_millis() as EpochMillis
}

/// Whole seconds elapsed between two instants, zero when `end` precedes `start`.
pub fn elapsed_secs(start: EpochMillis, end: EpochMillis) -> u64 {
    end.saturating_sub(start) / 1000
}
