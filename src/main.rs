mod color;
mod config;
mod data;
mod pipeline;
mod plot;
mod summary;

use std::path::Path;

use anyhow::Result;

use config::PlotConfig;

fn main() -> Result<()> {
    env_logger::init();

    // Optional JSON config as the single argument; defaults otherwise.
    let config = match std::env::args_os().nth(1) {
        Some(path) => PlotConfig::from_file(Path::new(&path))?,
        None => PlotConfig::default(),
    };

    let out = pipeline::run(&config)?;
    println!("[✓] Figure saved to {}", out.display());
    Ok(())
}
