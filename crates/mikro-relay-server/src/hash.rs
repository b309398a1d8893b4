use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use md5::{Digest, Md5};

/// Timezone whose calendar day buckets the Mikro password hash.
pub const HASH_TIMEZONE: Tz = chrono_tz::Europe::Istanbul;

/// Source of the current instant. Swapped for [`FixedClock`] in tests.
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

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Formats `instant` as `YYYY-MM-DD` in the given timezone.
pub fn calendar_date(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format("%Y-%m-%d").to_string()
}

/// MD5 of `"{date} {secret}"` as lowercase hex.
///
/// An unset secret is hashed as the literal `undefined`, which is what the
/// Mikro side expects from a client with no password configured. Callers
/// that care must check for the secret themselves.
pub fn daily_hash(date: &str, secret: Option<&str>) -> String {
    let input = format!("{date} {}", secret.unwrap_or("undefined"));
    hex::encode(Md5::digest(input.as_bytes()))
}

/// Produces the daily Mikro password. Recomputed on every call; never cached.
#[derive(Clone)]
pub struct DailyHasher {
    secret: Option<String>,
    tz: Tz,
    clock: Arc<dyn Clock>,
}

impl DailyHasher {
    pub fn new(secret: Option<String>, tz: Tz, clock: Arc<dyn Clock>) -> Self {
        Self { secret, tz, clock }
    }

    pub fn current_date(&self) -> String {
        calendar_date(self.clock.now(), self.tz)
    }

    pub fn current(&self) -> String {
        daily_hash(&self.current_date(), self.secret.as_deref())
    }

    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }
}
