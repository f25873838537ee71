use crate::error::AppError;
use crate::metrics::gather_text;

pub async fn metrics_handler() -> Result<String, AppError> {
    Ok(gather_text()?)
}
