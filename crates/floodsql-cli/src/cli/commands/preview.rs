use crate::cli::args::PreviewArgs;
use floodsql_core::dataset::DatasetStore;

pub fn execute(args: PreviewArgs) -> anyhow::Result<i32> {
    let store = DatasetStore::discover(&args.data_dir)?;
    if store.table_names().is_empty() {
        eprintln!("no parquet tables under {}", args.data_dir.display());
        return Ok(0);
    }

    let conn = store.open_session()?;
    for table in store.table_names() {
        let file = store.table_file(&table).unwrap_or_default();
        println!("\n===== {} ({}) =====", table, file);
        for (name, ty) in store.describe(&conn, &table)? {
            println!("  {:<40} {}", name, ty);
        }
    }
    Ok(0)
}
