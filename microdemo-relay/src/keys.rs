//! Object key scheme

use chrono::{DateTime, Utc};
use microdemo_core::RelayConfig;
use parking_lot::Mutex;

/// Issues `{prefix}/{unix_millis}.{extension}` keys.
///
/// Keys from one scheme are strictly increasing: when the clock has not moved
/// past the last issued millisecond, the next millisecond is used instead.
/// Two relay processes can still produce the same key.
#[derive(Debug)]
pub struct KeyScheme {
    prefix: String,
    extension: String,
    clock: fn() -> DateTime<Utc>,
    last_millis: Mutex<Option<i64>>,
}

impl KeyScheme {
    pub fn new(prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().trim_end_matches('/').to_string(),
            extension: extension.into().trim_start_matches('.').to_string(),
            clock: Utc::now,
            last_millis: Mutex::new(None),
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(&config.key_prefix, &config.key_extension)
    }

    /// Read time from `clock` instead of the system clock
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Key for the current time
    pub fn next_key(&self) -> String {
        self.key_at((self.clock)())
    }

    pub fn key_at(&self, at: DateTime<Utc>) -> String {
        let mut last = self.last_millis.lock();
        let millis = match *last {
            Some(prev) if at.timestamp_millis() <= prev => prev + 1,
            _ => at.timestamp_millis(),
        };
        *last = Some(millis);
        drop(last);

        self.format(millis)
    }

    fn format(&self, millis: i64) -> String {
        match (self.prefix.is_empty(), self.extension.is_empty()) {
            (true, true) => millis.to_string(),
            (true, false) => format!("{}.{}", millis, self.extension),
            (false, true) => format!("{}/{}", self.prefix, millis),
            (false, false) => format!("{}/{}.{}", self.prefix, millis, self.extension),
        }
    }
}

impl Default for KeyScheme {
    fn default() -> Self {
        Self::from_config(&RelayConfig::default())
    }
}
