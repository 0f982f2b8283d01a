use clap::Parser;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    color_eyre::install()?;
    dotenv::dotenv().ok();
    let config = hackvote_api::config::Config::parse();

    hackvote_api::tracing_config::configure()?;

    let server = hackvote_api::run_server(config).await?;
    server.server.await?;

    Ok(())
}
