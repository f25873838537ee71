//! Posting pipeline.
//!
//! A new post passes through an ordered list of middleware. Each step either
//! lets the post through or returns a [`PostingInterrupt`], which stops the
//! remaining steps and goes back to the caller.

use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::flood::{FloodCheckContext, FloodRejected};
use crate::metrics::POSTING_INTERRUPTS;
use crate::models::UserRecord;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PostingInterrupt {
    pub message: String,
    // set when the user just has to wait
    pub retry_after: Option<TimeDelta>,
}

impl PostingInterrupt {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retry_after: None,
        }
    }
}

impl From<FloodRejected> for PostingInterrupt {
    fn from(rejected: FloodRejected) -> Self {
        Self {
            message: rejected.to_string(),
            retry_after: Some(rejected.retry_after),
        }
    }
}

// State shared by the steps of one posting attempt
pub struct PostingContext<'a> {
    pub user: &'a mut UserRecord,
    pub content: &'a str,
    pub now: DateTime<Utc>,
    pub can_omit_flood_protection: bool,
}

pub trait PostingMiddleware: Send + Sync {
    fn name(&self) -> &'static str;

    fn use_this_middleware(&self, _ctx: &PostingContext<'_>) -> bool {
        true
    }

    fn interrupt_posting(&self, ctx: &mut PostingContext<'_>) -> Result<(), PostingInterrupt>;
}

/// Rejects messages that are too short or too long. Length is counted in
/// characters after trimming.
pub struct PostLengthMiddleware {
    pub min_length: usize,
    pub max_length: usize,
}

impl PostingMiddleware for PostLengthMiddleware {
    fn name(&self) -> &'static str {
        "post_length"
    }

    fn interrupt_posting(&self, ctx: &mut PostingContext<'_>) -> Result<(), PostingInterrupt> {
        let length = ctx.content.trim().chars().count();

        if length < self.min_length {
            return Err(PostingInterrupt::new(format!(
                "Posted message should be at least {} characters long (it has {}).",
                self.min_length, length
            )));
        }
        if length > self.max_length {
            return Err(PostingInterrupt::new(format!(
                "Posted message cannot be longer than {} characters (it has {}).",
                self.max_length, length
            )));
        }
        Ok(())
    }
}

pub struct FloodProtectionMiddleware {
    pub cooldown: TimeDelta,
}

impl PostingMiddleware for FloodProtectionMiddleware {
    fn name(&self) -> &'static str {
        "flood_protection"
    }

    fn interrupt_posting(&self, ctx: &mut PostingContext<'_>) -> Result<(), PostingInterrupt> {
        let user_id = ctx.user.id;
        let exempt = ctx.can_omit_flood_protection;

        FloodCheckContext::new(&mut *ctx.user, self.cooldown, &ctx.now)
            .check(exempt)
            .map_err(|rejected| {
                warn!(
                    "Flood protection stopped user {} (retry in {}s)",
                    user_id,
                    rejected.retry_after_secs()
                );
                PostingInterrupt::from(rejected)
            })
    }
}

pub struct PostingPipeline {
    middlewares: Vec<Box<dyn PostingMiddleware>>,
}

impl PostingPipeline {
    pub fn new(middlewares: Vec<Box<dyn PostingMiddleware>>) -> Self {
        Self { middlewares }
    }

    // Length check first so a rejected message doesn't burn the cooldown
    pub fn standard(min_length: usize, max_length: usize, cooldown: TimeDelta) -> Self {
        let middlewares = vec![
            Box::new(PostLengthMiddleware {
                min_length,
                max_length,
            }) as Box<dyn PostingMiddleware>,
            Box::new(FloodProtectionMiddleware { cooldown }),
        ];
        Self::new(middlewares)
    }

    pub fn run(&self, ctx: &mut PostingContext<'_>) -> Result<(), PostingInterrupt> {
        for middleware in &self.middlewares {
            if !middleware.use_this_middleware(ctx) {
                debug!("Skipping {} for user {}", middleware.name(), ctx.user.id);
                continue;
            }

            middleware.interrupt_posting(ctx).inspect_err(|_| {
                POSTING_INTERRUPTS.with_label_values(&[middleware.name()]).inc();
            })?;
        }
        Ok(())
    }
}
