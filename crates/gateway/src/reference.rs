//! Transaction references.

use chrono::Utc;
use rand::Rng;
use rand::distr::Alphanumeric;

const RANDOM_LEN: usize = 10;

/// Builds `{PREFIX}_{unix_millis}_{random}`.
///
/// The random tail is alphanumeric, so the result is safe in URLs and
/// accepted by the processor's reference charset.
pub fn generate_reference(prefix: &str) -> String {
    let tail: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_LEN)
        .map(char::from)
        .collect();
    format!(
        "{}_{}_{}",
        prefix.to_uppercase(),
        Utc::now().timestamp_millis(),
        tail
    )
}
