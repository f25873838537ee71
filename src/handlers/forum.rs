use axum::{
    extract::{Path, State},
    response::Html,
};
use std::fmt::Write;
use std::sync::Arc;

use crate::error_pages::{ErrorPage, escape_html};
use crate::models::ThreadId;
use crate::state::AppState;

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{title}</title></head>\n<body>\n\
         <div class=\"page\">\n<div class=\"container\">\n<h1>{title}</h1>\n{body}</div>\n</div>\n</body>\n</html>\n",
        title = escape_html(title),
    ))
}

// Thread list
pub async fn forum_index_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    let threads = state.users.threads();
    if threads.is_empty() {
        return page("Forum", "<p>No threads yet.</p>\n");
    }

    let mut body = String::from("<ul class=\"thread-list\">\n");
    for thread in threads {
        let _ = writeln!(
            body,
            "<li><a href=\"{}/threads/{}\">Thread #{}</a> ({} posts, last {})</li>",
            state.forum_prefix,
            thread.thread_id,
            thread.thread_id,
            thread.posts,
            thread.last_post_on.to_rfc3339(),
        );
    }
    body.push_str("</ul>\n");
    page("Forum", &body)
}

pub async fn thread_page_handler(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<ThreadId>,
) -> Result<Html<String>, ErrorPage> {
    let posts = state.users.thread_posts(thread_id);
    if posts.is_empty() {
        return Err(ErrorPage::not_found());
    }

    let mut body = String::new();
    for post in posts {
        let poster = state
            .users
            .get(post.poster_id)
            .map(|u| u.username)
            .unwrap_or_else(|_| "Deleted user".to_string());
        let _ = writeln!(
            body,
            "<article class=\"post\" id=\"post-{}\"><h4>{}</h4><p>{}</p></article>",
            post.id,
            escape_html(&poster),
            escape_html(&post.content),
        );
    }
    Ok(page(&format!("Thread #{thread_id}"), &body))
}
