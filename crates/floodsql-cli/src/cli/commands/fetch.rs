use crate::cli::args::FetchArgs;
use floodsql_core::hub;

pub async fn execute(args: FetchArgs) -> anyhow::Result<i32> {
    let files = hub::fetch_dataset(&args.repo, &args.out).await?;
    eprintln!(
        "Fetched {} files from {} into {}",
        files.len(),
        args.repo,
        args.out.display()
    );
    Ok(0)
}
