use aws_lambda_events::http::Method;
use clap::Parser;
use serde_json::json;
use slack_workspace_installer::{config::Config, errors::AppError, logging, InstallationHandler};

/// Runs the install flow once against the configured Slack app, storage and webhook.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Authorization code from the Slack redirect
    #[arg(long, env = "SLACK_OAUTH_CODE")]
    code: String,

    #[arg(long)]
    state: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    logging::init();
    let args = Args::parse();

    let handler = InstallationHandler::from_config(Config::load().await).await?;

    let body = json!({ "code": args.code, "state": args.state }).to_string();
    let response = handler.handle(&Method::POST, Some(&body)).await;

    println!("{}", serde_json::to_string_pretty(&response.body)?);

    if response.status_code != 200 {
        return Err(AppError::UnexpectedError(format!("install failed with status {}", response.status_code)));
    }

    Ok(())
}
