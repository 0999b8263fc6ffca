use std::{fs, time::Duration};

use anyhow::{Context, Result};
use log::info;

use pitchmark::accent::AccentResolver;
use pitchmark::cache::AccentCache;
use pitchmark::config::load_config;
use pitchmark::dict::WeblioClient;
use pitchmark::morph::MorphTagger;
use pitchmark::render;

fn main() -> Result<()> {
    env_logger::init();

    let config = load_config();

    let text = fs::read_to_string(&config.paths.source)
        .with_context(|| format!("reading source text {:?}", config.paths.source))?;

    let tagger = MorphTagger::new()?;
    let tokens = tagger.tag(&text)?;
    info!("tagged {} tokens", tokens.len());

    let cache = AccentCache::load(&config.paths.cache);
    let client = WeblioClient::new(
        &config.dictionary.base_url,
        config.dictionary.retries,
        Duration::from_millis(config.dictionary.backoff_ms),
    )?;
    let mut resolver =
        AccentResolver::new(client, cache)?.with_overrides(config.override_records());

    let annotated = resolver.resolve(&tokens);
    render::write_document(&annotated, &config.document.title, &config.paths.output)?;

    let cache = resolver.into_cache();
    cache.save(&config.paths.cache)?;
    info!("saved {} accent records", cache.len());

    Ok(())
}
