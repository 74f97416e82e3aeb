use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Deserialize;
use uuid::Uuid;

/// Display name written over references to a deleted profile.
pub const DELETED_ACCOUNT: &str = "Deleted Account";

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    /// `<prefix><millis base36><6 random base36 chars>`
    #[default]
    TimeRandom,
    Uuid,
}

pub fn generate_id(prefix: &str, strategy: IdStrategy, now: DateTime<Utc>) -> String {
    match strategy {
        IdStrategy::TimeRandom => {
            let mut id = prefix.to_owned();
            id.push_str(&to_base36(now.timestamp_millis().max(0) as u64));
            id.push_str(&random_suffix(6));
            id
        }
        IdStrategy::Uuid => format!("{}{}", prefix, Uuid::new_v4().simple()),
    }
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

fn random_suffix(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

/// Source of wall-clock time for every timestamp the core writes.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}
