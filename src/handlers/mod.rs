mod fallback;
mod forum;
mod health;
mod metrics;
mod posts;
mod users;

pub use fallback::{method_not_allowed_handler, not_found_handler};
pub use forum::{forum_index_handler, thread_page_handler};
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use posts::{create_post_handler, list_posts_handler};
pub use users::{create_user_handler, get_user_handler};
