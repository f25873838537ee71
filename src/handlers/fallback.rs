use crate::error_pages::ErrorPage;

// No route matched the path
pub async fn not_found_handler() -> ErrorPage {
    ErrorPage::not_found()
}

// Path matched, method didn't
pub async fn method_not_allowed_handler() -> ErrorPage {
    ErrorPage::NotAllowed
}
