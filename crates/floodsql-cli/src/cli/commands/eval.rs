use crate::cli::args::EvalArgs;
use floodsql_core::dataset::DatasetStore;
use floodsql_core::errors::ConfigError;
use floodsql_core::eval::{evaluate, load_expected};
use floodsql_core::metrics_api::EvalContext;
use floodsql_core::model::load_run_records;
use floodsql_core::providers::embedder::build_embedder;
use floodsql_core::report::console::print_eval_summary;
use floodsql_core::report::junit::write_junit;
use std::sync::Arc;
use std::time::Duration;

pub async fn execute(args: EvalArgs) -> anyhow::Result<i32> {
    let records = load_run_records(&args.predictions)?;
    let metric = floodsql_metrics::metric_for_mode(&args.mode)?;

    let mut ctx = EvalContext::new();
    ctx.query_timeout = Duration::from_secs(args.timeout_seconds);

    match args.mode.as_str() {
        "exec" => {
            let data_dir = args.data_dir.as_ref().ok_or_else(|| {
                ConfigError("eval --mode exec requires --data-dir".into())
            })?;
            ctx.store = Some(Arc::new(DatasetStore::discover(data_dir)?));
            if let Some(expected) = &args.expected {
                ctx.expected = load_expected(expected)?;
            }
        }
        _ => {
            let embedder = build_embedder(&args.embedder, &args.embedding_model, None)?
                .ok_or_else(|| {
                    ConfigError("eval --mode semantic requires an embedder (openai|fake)".into())
                })?;
            ctx.embedder = Some(embedder);
        }
    }

    let report = evaluate(&records, metric, &ctx).await?;

    if let Some(parent) = args.out.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(&args.out, serde_json::to_string_pretty(&report)?)?;
    if let Some(junit) = &args.junit {
        write_junit("floodsql", &report, junit)?;
    }

    print_eval_summary(&report);
    eprintln!("Scores saved to {}", args.out.display());
    Ok(0)
}
