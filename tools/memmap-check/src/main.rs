//! Tool for normalizing a textual list of memory descriptors and printing the resolved address
//! decoder.

use std::io;

use anyhow::{Context, Result};
use log::info;
use memory_map::MemoryMap;

mod cli;

fn main() -> Result<()> {
    let config = cli::get_config();

    env_logger::Builder::new()
        .filter_level(config.level_filter())
        .parse_default_env()
        .init();

    let text = std::fs::read_to_string(&config.descriptors)
        .with_context(|| format!("error reading \"{}\"", config.descriptors.display()))?;
    let descriptors = memmap_check::parse_descriptors(&text)
        .with_context(|| format!("error parsing \"{}\"", config.descriptors.display()))?;

    let mut map = MemoryMap::new();
    for descriptor in descriptors {
        map.insert(descriptor);
    }
    info!("loaded {} descriptors", map.count());

    map.normalize().context("error normalizing descriptors")?;
    memmap_check::write_report(&map, io::stdout().lock())?;

    Ok(())
}
