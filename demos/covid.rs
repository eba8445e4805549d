use anyhow::Result;
use covidviz::{report, Config, HtmlRenderer, Render};
use tracing_subscriber::EnvFilter;

// cargo run --example covid -- [config.toml]
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let table = covidviz::load(&config.dataset_url).await?.filter_confirmed()?;
    let charts = report::build(&table, &config)?;

    let renderer = HtmlRenderer::new(&config.output_dir);
    for (i, chart) in charts.iter().enumerate() {
        let path = renderer.render(i + 1, chart).await?;
        println!("{}", path.display());
    }

    Ok(())
}
