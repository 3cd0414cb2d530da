use std::time::Duration;

use reqwest::Client;

use crate::errors::AppError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(8);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Shared by the token exchange and the install webhook, both bounded so a hung peer can't hold the request.
pub fn build_http_client() -> Result<Client, AppError> {
    let client = Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()?;

    Ok(client)
}
