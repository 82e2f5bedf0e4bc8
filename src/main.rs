mod catalog;
mod engine;
mod interpreter;
mod query;
mod settings;
mod web;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};

use crate::interpreter::QueryInterpreter;
use crate::settings::{Args, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let args = Args::parse();
    let settings =
        Settings::load(args.config.as_deref()).context("failed to load settings")?;

    let dishes = catalog::load(settings.catalog.path.as_deref())
        .context("failed to load the dish catalog")?;
    info!("loaded {} dishes", dishes.len());

    let interpreter = QueryInterpreter::new(&settings.interpreter)
        .context("failed to build the query interpreter")?;
    info!(
        "query interpreter uses model {} at {}",
        settings.interpreter.model, settings.interpreter.ollama_url
    );

    let routes = web::routes(Arc::new(dishes), Arc::new(interpreter));
    info!("listening on {}", settings.web.address);
    warp::serve(routes).run(settings.web.address).await;

    Ok(())
}
