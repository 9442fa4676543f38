use hemmer_provider_authsignal::{init_logging, serve, AuthsignalProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    serve(AuthsignalProvider::new(env!("CARGO_PKG_VERSION"))).await
}
