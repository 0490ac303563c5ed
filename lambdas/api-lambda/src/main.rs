mod http_handler;

use std::sync::Arc;

use bloomcart_shared::AppState;
use http_handler::function_handler;
use lambda_http::{run, service_fn, Error};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .without_time()
        .init();

    let state = Arc::new(AppState::from_env().await);

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { function_handler(event, state).await }
    }))
    .await
}
