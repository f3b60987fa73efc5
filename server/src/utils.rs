use rand::Rng;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Get current timestamp in milliseconds
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

// Random 8 hex character match id
pub fn new_match_id<R: Rng>(rng: &mut R) -> String {
    format!("{:08x}", rng.gen::<u32>())
}
