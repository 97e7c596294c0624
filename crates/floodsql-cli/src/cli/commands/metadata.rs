use crate::cli::args::MetadataArgs;
use floodsql_core::catalog::{build_catalog, Descriptions};
use floodsql_core::dataset::DatasetStore;

pub fn execute(args: MetadataArgs) -> anyhow::Result<i32> {
    let store = DatasetStore::discover(&args.data_dir)?;
    if store.table_names().is_empty() {
        anyhow::bail!("no parquet tables under {}", args.data_dir.display());
    }

    let descriptions = Descriptions::load(&args.descriptions)?;
    let conn = store.open_session()?;
    let catalog = build_catalog(&store, &conn, &descriptions, args.sample_rows)?;

    if let Some(parent) = args.out.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(&args.out, catalog.to_json_string()?)?;
    eprintln!(
        "Metadata for {} tables written to {}",
        catalog.tables.len(),
        args.out.display()
    );
    Ok(0)
}
