use crate::{EnumArgs, open_cache};
use anyhow::Context;
use rscache::formats::category::ENUMS;
use rscache::formats::enum_file::EnumFile;
use rscache::{Cache, CacheConfig};

/// Decode one enum entry and print it as JSON.
pub async fn handle(args: EnumArgs, config: CacheConfig) -> anyhow::Result<()> {
    let source = open_cache(args.cache_dir.as_deref(), &config)?;
    let cache = Cache::new(source, config);

    let enum_file: EnumFile = cache
        .get_typed(ENUMS, args.file, Some(args.entry))
        .await
        .with_context(|| format!("Failed to read enum {}/{}", args.file, args.entry))?;

    println!("{}", serde_json::to_string_pretty(&enum_file)?);
    Ok(())
}
