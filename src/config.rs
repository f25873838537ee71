use anyhow::{Context, bail};
use clap::Parser;
use chrono::TimeDelta;
use std::path::PathBuf;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "forum-gate")]
#[command(about = "Forum posting service with flood protection")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // URL prefix of forum pages; error pages outside it may use site pages
    #[arg(long, default_value = "/forum")]
    pub forum_prefix: String,

    // Minimum seconds between two posts of one user
    #[arg(long, default_value_t = 60)]
    pub flood_cooldown: u64,

    #[arg(long, default_value_t = 5)]
    pub post_min_length: usize,

    #[arg(long, default_value_t = 60000)]
    pub post_max_length: usize,

    // JSON file with users to register at startup
    #[arg(short, long)]
    pub users_file: Option<PathBuf>,

    // HTML served for 403s outside the forum
    #[arg(long)]
    pub custom_403: Option<PathBuf>,

    // HTML served for 404s outside the forum
    #[arg(long)]
    pub custom_404: Option<PathBuf>,

    // Skip the CSRF token check on unsafe methods
    #[arg(long)]
    pub no_csrf: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            port: 8080,
            forum_prefix: "/forum".to_string(),
            flood_cooldown: 60,
            post_min_length: 5,
            post_max_length: 60000,
            users_file: None,
            custom_403: None,
            custom_404: None,
            no_csrf: false,
        }
    }
}

impl Args {
    pub fn cooldown(&self) -> anyhow::Result<TimeDelta> {
        i64::try_from(self.flood_cooldown)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .with_context(|| format!("flood cooldown of {} seconds is too large", self.flood_cooldown))
    }

    /// Forum prefix as a route path: leading slash, no trailing slash, and
    /// empty for a forum mounted at the root.
    pub fn forum_path(&self) -> anyhow::Result<String> {
        let trimmed = self.forum_prefix.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Ok(String::new());
        }
        if trimmed.contains(['{', '}', '*', '?', '#']) || trimmed.chars().any(char::is_whitespace) {
            bail!("invalid forum prefix {:?}", self.forum_prefix);
        }
        Ok(format!("/{trimmed}"))
    }
}
