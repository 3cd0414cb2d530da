use std::sync::Arc;

use aws_lambda_events::event::apigw::{ApiGatewayProxyRequest, ApiGatewayProxyResponse};

use lambda_runtime::{service_fn, LambdaEvent, Error};
use slack_workspace_installer::{config::Config, errors::AppError, logging, InstallationHandler};
use tracing::error;

#[tokio::main]
async fn main() -> Result<(), Error> {
    logging::init();

    let handler = Arc::new(InstallationHandler::from_config(Config::load().await).await?);

    let func = service_fn(move |event: LambdaEvent<ApiGatewayProxyRequest>| {
        let handler = handler.clone();
        async move { func(&handler, event).await }
    });

    let result = lambda_runtime::run(func).await;
    if let Err(err) = &result {
        error!(error = %err, "Lambda runtime stopped");
    }
    result
}

async fn func(handler: &InstallationHandler, event: LambdaEvent<ApiGatewayProxyRequest>) -> Result<ApiGatewayProxyResponse, AppError> {
    let (request, _context) = event.into_parts();

    Ok(handler.handle_api_gateway(request).await)
}
