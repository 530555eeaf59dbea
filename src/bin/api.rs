pub use tldr_pages::api::handler;

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    tldr_pages::setup_logging();
    lambda_runtime::run(lambda_runtime::service_fn(handler)).await
}
