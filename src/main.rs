use claimgate::config::AppConfig;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    claimgate::init_tracing();
    let config = AppConfig::from_env();
    claimgate::run(config).await
}
