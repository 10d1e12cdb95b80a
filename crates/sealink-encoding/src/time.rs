//! Timestamps.
//!
//! A timestamp is an `Int` counting microseconds since the Unix epoch.
//! Times before the epoch are negative.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::{
    Decode, Encode, EncodedValue,
    errors::{DecodeError, Result},
};

/// Microseconds per second on the wire.
pub const MICROS_PER_SECOND: i64 = 1_000_000;

/// Microseconds since the Unix epoch, saturating at the `i64` range.
#[must_use]
pub fn to_unix_micros(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_micros()).unwrap_or(i64::MAX),
        Err(before) => i64::try_from(before.duration().as_micros()).map_or(i64::MIN, |m| -m),
    }
}

/// Time at `micros` microseconds from the Unix epoch.
///
/// Returns `None` if the platform clock cannot represent it.
#[must_use]
pub fn from_unix_micros(micros: i64) -> Option<SystemTime> {
    let magnitude = Duration::from_micros(micros.unsigned_abs());
    if micros >= 0 {
        UNIX_EPOCH.checked_add(magnitude)
    } else {
        UNIX_EPOCH.checked_sub(magnitude)
    }
}

impl Encode for SystemTime {
    fn encode(&self) -> EncodedValue {
        to_unix_micros(*self).encode()
    }
}

impl Decode for SystemTime {
    fn decode(value: &EncodedValue) -> Result<Self> {
        let micros = i64::decode(value)?;
        from_unix_micros(micros)
            .ok_or(DecodeError::OutOfRange { value: micros, target: "SystemTime" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_second_is_a_million_micros() {
        let t = UNIX_EPOCH + Duration::from_secs(1);
        assert_eq!(to_unix_micros(t), MICROS_PER_SECOND);
        assert_eq!(t.encode(), MICROS_PER_SECOND.encode());
    }

    #[test]
    fn sub_microsecond_precision_truncated() {
        let t = UNIX_EPOCH + Duration::from_nanos(1_234_567_891);
        let decoded = SystemTime::decode(&t.encode()).expect("valid");
        assert_eq!(decoded, UNIX_EPOCH + Duration::from_micros(1_234_567));
    }

    #[test]
    fn pre_epoch_round_trip() {
        let t = UNIX_EPOCH - Duration::from_micros(42);
        assert_eq!(to_unix_micros(t), -42);
        assert_eq!(SystemTime::decode(&t.encode()), Ok(t));
    }
}
