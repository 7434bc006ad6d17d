use crate::{InfoArgs, open_cache};
use rscache::CacheConfig;
use tracing::info;

/// Print one line per category: index slots, stored files and the
/// reference table version.
pub fn handle(args: &InfoArgs, config: &CacheConfig) -> anyhow::Result<()> {
    let cache = open_cache(args.cache_dir.as_deref(), config)?;
    let store = cache.store();
    info!("Reading cache at {}", store.directory().display());

    println!("Cache: {}", store.directory().display());
    println!("{:>8}  {:>8}  {:>8}  table", "category", "slots", "files");

    let categories = store.categories();
    let mut tables = 0;
    for &category in &categories {
        let slots = store.file_count(category)?;
        let table = cache.reference_table(category)?;
        let files = match &table {
            Some(table) => table.entries.len(),
            None => (0..slots)
                .filter_map(|id| u32::try_from(id).ok())
                .filter(|&id| {
                    store
                        .read_index_record(category, id)
                        .is_ok_and(|record| !record.is_empty())
                })
                .count(),
        };
        let version = match &table {
            Some(table) => {
                tables += 1;
                table
                    .version
                    .map_or_else(|| "unversioned".to_string(), |v| format!("v{v}"))
            }
            None => "-".to_string(),
        };
        println!("{category:>8}  {slots:>8}  {files:>8}  {version}");
    }

    let count = categories.len();
    println!("{count} categories, {tables} with reference tables");
    Ok(())
}
