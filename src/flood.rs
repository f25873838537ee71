//! Posting flood protection.
//!
//! A user may have at most one post accepted per cooldown interval. The gate
//! keeps no state of its own: the only thing it reads and writes is the
//! user's `last_posted_on` timestamp, handed in through [`PostingTimestamp`].

use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;

use crate::clock::Clock;
use crate::models::UserRecord;

pub const DEFAULT_COOLDOWN_SECS: i64 = 60;

pub fn default_cooldown() -> TimeDelta {
    TimeDelta::seconds(DEFAULT_COOLDOWN_SECS)
}

/// Cooldown has not elapsed since the previous accepted post.
///
/// This is an expected outcome, not a fault: the caller aborts the posting
/// pipeline and tells the user to come back after `retry_after`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("You can't post message so quickly after previous one.")]
pub struct FloodRejected {
    pub retry_after: TimeDelta,
}

impl FloodRejected {
    pub fn retry_after_secs(&self) -> u64 {
        whole_seconds(self.retry_after)
    }
}

/// Seconds to wait, rounded up and never below one.
pub fn whole_seconds(wait: TimeDelta) -> u64 {
    let millis = wait.num_milliseconds().max(0) as u64;
    millis.div_ceil(1000).max(1)
}

/// Read/write access to the "last accepted post" timestamp.
pub trait PostingTimestamp {
    fn last_posted_on(&self) -> Option<DateTime<Utc>>;
    fn set_last_posted_on(&mut self, at: DateTime<Utc>);
}

impl PostingTimestamp for UserRecord {
    fn last_posted_on(&self) -> Option<DateTime<Utc>> {
        self.last_posted_on
    }

    fn set_last_posted_on(&mut self, at: DateTime<Utc>) {
        self.last_posted_on = Some(at);
    }
}

impl PostingTimestamp for Option<DateTime<Utc>> {
    fn last_posted_on(&self) -> Option<DateTime<Utc>> {
        *self
    }

    fn set_last_posted_on(&mut self, at: DateTime<Utc>) {
        *self = Some(at);
    }
}

/// Decide whether a post attempt made at `now` may proceed.
///
/// Exempt users always pass. Everyone else passes when they never posted or
/// when at least `cooldown` has elapsed since their last accepted post. The
/// timestamp is set to `now` on every pass and left alone on rejection.
pub fn check_and_record<T>(
    user: &mut T,
    now: DateTime<Utc>,
    cooldown: TimeDelta,
    is_exempt: bool,
) -> Result<(), FloodRejected>
where
    T: PostingTimestamp + ?Sized,
{
    if is_exempt {
        user.set_last_posted_on(now);
        return Ok(());
    }

    let Some(last) = user.last_posted_on() else {
        user.set_last_posted_on(now);
        return Ok(());
    };

    let elapsed = now - last;
    if elapsed >= cooldown {
        user.set_last_posted_on(now);
        return Ok(());
    }

    // a skewed clock makes elapsed negative; saturate instead of overflowing
    Err(FloodRejected {
        retry_after: cooldown.checked_sub(&elapsed).unwrap_or(TimeDelta::MAX),
    })
}

/// Everything one flood check needs, built per request and used once.
pub struct FloodCheckContext<'a> {
    user: &'a mut dyn PostingTimestamp,
    cooldown: TimeDelta,
    clock: &'a dyn Clock,
}

impl<'a> FloodCheckContext<'a> {
    pub fn new(user: &'a mut dyn PostingTimestamp, cooldown: TimeDelta, clock: &'a dyn Clock) -> Self {
        Self {
            user,
            cooldown,
            clock,
        }
    }

    pub fn check(self, is_exempt: bool) -> Result<(), FloodRejected> {
        let now = self.clock.now();
        check_and_record(self.user, now, self.cooldown, is_exempt)
    }
}
