// Entry point for `cargo run -p web-server`. The `etsynova serve` command in the
// root binary does the same with CLI overrides.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = configuration::load_config()?;
    let _guard = configuration::init_tracing(&config.logging)?;
    web_server::run_server(config).await
}
