use anyhow::Context;
use std::sync::Arc;

use crate::acl::Acl;
use crate::clock::{Clock, SystemClock};
use crate::config::Args;
use crate::error_pages::ErrorPages;
use crate::metrics::USERS;
use crate::posting::PostingPipeline;
use crate::store::UserStore;

// app's shared state
pub struct AppState {
    pub users: UserStore,
    pub acl: Acl,
    pub pipeline: PostingPipeline,
    pub error_pages: Arc<ErrorPages>,
    pub clock: Arc<dyn Clock>,
    pub csrf_enabled: bool,
    pub forum_prefix: String,
}

impl AppState {
    pub fn new(args: &Args, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let forum_prefix = args.forum_path()?;
        Ok(Self {
            users: UserStore::new(),
            acl: Acl::new(),
            pipeline: PostingPipeline::standard(
                args.post_min_length,
                args.post_max_length,
                args.cooldown()?,
            ),
            error_pages: Arc::new(ErrorPages::new(&forum_prefix)),
            clock,
            csrf_enabled: !args.no_csrf,
            forum_prefix,
        })
    }

    /// Build state from CLI args, reading seed users and custom pages from
    /// disk.
    pub fn load(args: &Args) -> anyhow::Result<Arc<Self>> {
        let mut state = Self::new(args, Arc::new(SystemClock))?;

        let mut pages = ErrorPages::new(&state.forum_prefix);
        if let Some(path) = &args.custom_403 {
            let html = std::fs::read_to_string(path)
                .with_context(|| format!("reading custom 403 page {}", path.display()))?;
            pages = pages.with_site_403(html);
        }
        if let Some(path) = &args.custom_404 {
            let html = std::fs::read_to_string(path)
                .with_context(|| format!("reading custom 404 page {}", path.display()))?;
            pages = pages.with_site_404(html);
        }
        state.error_pages = Arc::new(pages);

        if let Some(path) = &args.users_file {
            state
                .users
                .load_seed(path, &state.acl, state.clock.now())
                .with_context(|| format!("loading users from {}", path.display()))?;
        }
        USERS.set(state.users.user_count() as f64);

        Ok(Arc::new(state))
    }
}
