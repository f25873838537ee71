//! In-memory persistence for users and posts.
//!
//! Users live in a `DashMap`, so [`UserStore::update`] holds the user's shard
//! lock for the duration of the closure. Posting decisions made inside it are
//! serialized per user.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, info};

use crate::acl::Acl;
use crate::models::{Capability, Post, ThreadId, ThreadSummary, UserId, UserRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("User {0} not found")]
    UserNotFound(UserId),

    #[error("Username \"{0}\" is already taken")]
    UsernameTaken(String),

    #[error("Username can't be empty")]
    InvalidUsername,

    #[error("Failed to read seed file: {0}")]
    SeedIo(#[from] std::io::Error),

    #[error("Malformed seed file: {0}")]
    SeedFormat(#[from] serde_json::Error),
}

// Seed file layout
#[derive(Debug, Deserialize)]
struct SeedFile {
    users: Vec<SeedUser>,
}

#[derive(Debug, Deserialize)]
struct SeedUser {
    username: String,
    #[serde(default)]
    capabilities: Vec<Capability>,
    #[serde(default)]
    ban_message: Option<String>,
}

#[derive(Debug)]
pub struct UserStore {
    users: DashMap<UserId, UserRecord>,
    usernames: DashMap<String, UserId>, // lowercased name -> id
    next_user_id: AtomicU64,
    posts: DashMap<u64, Post>,
    next_post_id: AtomicU64,
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl UserStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            usernames: DashMap::new(),
            next_user_id: AtomicU64::new(1),
            posts: DashMap::new(),
            next_post_id: AtomicU64::new(1),
        }
    }

    pub fn create_user(&self, username: &str, now: DateTime<Utc>) -> Result<UserRecord, StoreError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(StoreError::InvalidUsername);
        }

        let id = match self.usernames.entry(username.to_lowercase()) {
            Entry::Occupied(_) => return Err(StoreError::UsernameTaken(username.to_string())),
            Entry::Vacant(slot) => {
                let id = self.next_user_id.fetch_add(1, Ordering::Relaxed);
                slot.insert(id);
                id
            }
        };

        let user = UserRecord::new(id, username, now);
        self.users.insert(id, user.clone());
        debug!("Created user {} ({})", user.username, id);
        Ok(user)
    }

    // Snapshot of the user record
    pub fn get(&self, id: UserId) -> Result<UserRecord, StoreError> {
        self.users
            .get(&id)
            .map(|user| user.clone())
            .ok_or(StoreError::UserNotFound(id))
    }

    /// Run `f` against the stored user while holding its entry lock.
    pub fn update<T>(&self, id: UserId, f: impl FnOnce(&mut UserRecord) -> T) -> Result<T, StoreError> {
        let mut user = self.users.get_mut(&id).ok_or(StoreError::UserNotFound(id))?;
        Ok(f(&mut user))
    }

    pub fn set_ban(&self, id: UserId, message: Option<String>) -> Result<(), StoreError> {
        self.update(id, |user| user.ban_message = message)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn add_post(
        &self,
        thread_id: ThreadId,
        poster_id: UserId,
        content: String,
        posted_on: DateTime<Utc>,
    ) -> Post {
        let id = self.next_post_id.fetch_add(1, Ordering::Relaxed);
        let post = Post {
            id,
            thread_id,
            poster_id,
            content,
            posted_on,
        };
        self.posts.insert(id, post.clone());
        post
    }

    pub fn thread_posts(&self, thread_id: ThreadId) -> Vec<Post> {
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|p| p.thread_id == thread_id)
            .map(|p| p.clone())
            .collect();
        posts.sort_by_key(|p| p.id);
        posts
    }

    pub fn threads(&self) -> Vec<ThreadSummary> {
        let mut threads: BTreeMap<ThreadId, ThreadSummary> = BTreeMap::new();
        for post in self.posts.iter() {
            threads
                .entry(post.thread_id)
                .and_modify(|t| {
                    t.posts += 1;
                    t.last_post_on = t.last_post_on.max(post.posted_on);
                })
                .or_insert(ThreadSummary {
                    thread_id: post.thread_id,
                    posts: 1,
                    last_post_on: post.posted_on,
                });
        }
        threads.into_values().collect()
    }

    /// Register users listed in a JSON seed file, granting their capabilities.
    pub fn load_seed(&self, path: &Path, acl: &Acl, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let raw = std::fs::read_to_string(path)?;
        self.load_seed_str(&raw, acl, now)
    }

    pub fn load_seed_str(&self, raw: &str, acl: &Acl, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let seed: SeedFile = serde_json::from_str(raw)?;
        let count = seed.users.len();

        for entry in seed.users {
            let user = self.create_user(&entry.username, now)?;
            for cap in entry.capabilities {
                acl.grant(user.id, cap);
            }
            if entry.ban_message.is_some() {
                self.set_ban(user.id, entry.ban_message)?;
            }
        }

        info!("Loaded {} seeded users", count);
        Ok(count)
    }
}
