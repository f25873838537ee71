use lazy_static::lazy_static;
use prometheus::{
    Counter, Encoder, Gauge, Histogram, IntCounterVec, TextEncoder, register_counter, register_gauge,
    register_histogram, register_int_counter_vec,
};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("forum_requests_total", "Total number of posting requests").unwrap();
    pub static ref POSTS_ACCEPTED: Counter =
        register_counter!("forum_posts_accepted_total", "Posts that passed the pipeline").unwrap();
    pub static ref POSTING_INTERRUPTS: IntCounterVec = register_int_counter_vec!(
        "forum_posting_interrupts_total",
        "Posting attempts stopped, by middleware",
        &["middleware"]
    )
    .unwrap();
    pub static ref ERROR_PAGES: IntCounterVec = register_int_counter_vec!(
        "forum_error_pages_total",
        "Error pages rendered, by status code",
        &["status"]
    )
    .unwrap();
    pub static ref POSTING_LATENCY: Histogram = register_histogram!(
        "forum_posting_latency_seconds",
        "Posting latency in seconds"
    )
    .unwrap();
    pub static ref USERS: Gauge =
        register_gauge!("forum_users", "Current number of registered users").unwrap();
}

// Text exposition of everything registered
pub fn gather_text() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
