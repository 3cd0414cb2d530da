use std::env;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Installs the global subscriber. JSON inside Lambda so CloudWatch can index fields, compact otherwise.
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if env::var("AWS_LAMBDA_FUNCTION_NAME").is_ok() {
        let fmt_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .without_time()
            .with_filter(env_filter);

        let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
    } else {
        let fmt_layer = fmt::layer()
            .compact()
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .with_filter(env_filter);

        let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
    }
}
