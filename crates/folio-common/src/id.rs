use snowflake::SnowflakeIdBucket;
use std::sync::{Mutex, MutexGuard};

static ID_GENERATOR: Mutex<Option<SnowflakeIdBucket>> = Mutex::new(None);

fn generator() -> MutexGuard<'static, Option<SnowflakeIdBucket>> {
    ID_GENERATOR
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Initialise the snowflake generator.
///
/// `machine_id` and `node_id` must both be in `0..=31`. Only the first call
/// takes effect; a fresh bucket could reissue ids within the same millisecond.
/// Calling `next_id` without `init` falls back to `(1, 1)`.
pub fn init(machine_id: i32, node_id: i32) {
    let mut gen = generator();
    if gen.is_none() {
        *gen = Some(SnowflakeIdBucket::new(machine_id, node_id));
    }
}

/// Next row id, rendered as a decimal string.
pub fn next_id() -> String {
    let mut gen = generator();
    let bucket = gen.get_or_insert_with(|| SnowflakeIdBucket::new(1, 1));
    bucket.get_id().to_string()
}

/// Whether `raw` could have been produced by [`next_id`].
///
/// Handlers use this to answer 404 for obviously bogus path ids without a
/// database round trip.
pub fn looks_like_id(raw: &str) -> bool {
    !raw.is_empty() && raw.len() <= 20 && raw.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique_and_numeric() {
        init(1, 1);
        let mut ids = HashSet::new();
        for _ in 0..1000 {
            let id = next_id();
            assert!(id.parse::<i64>().is_ok(), "id should be an i64: {id}");
            assert!(ids.insert(id), "duplicate id generated");
        }
    }

    #[test]
    fn looks_like_id_rejects_garbage() {
        assert!(looks_like_id(&next_id()));
        assert!(!looks_like_id(""));
        assert!(!looks_like_id("12a"));
        assert!(!looks_like_id("../etc"));
    }
}
