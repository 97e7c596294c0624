use crate::cli::args::RunArgs;
use floodsql_core::catalog::Catalog;
use floodsql_core::config::RunConfig;
use floodsql_core::engine::runner::write_records;
use floodsql_core::engine::{RunPolicy, Runner};
use floodsql_core::errors::ConfigError;
use floodsql_core::model::load_benchmark;
use floodsql_core::providers::embedder::build_embedder;
use floodsql_core::providers::llm::build_client;
use floodsql_core::report::console::print_run_summary;
use floodsql_core::retrieval::Retriever;
use floodsql_core::storage::Store;
use std::sync::Arc;
use std::time::Duration;

pub async fn execute(args: RunArgs) -> anyhow::Result<i32> {
    let mut cfg = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    if let Some(model) = args.model {
        cfg.model = model;
    }
    if let Some(provider) = args.provider {
        cfg.provider = provider;
    }
    if let Some(embedder) = args.embedder {
        cfg.embedder = embedder;
    }
    if let Some(embedding_model) = args.embedding_model {
        cfg.embedding_model = embedding_model;
    }
    if let Some(parallel) = args.parallel {
        cfg.parallel = parallel;
    }
    if let Some(timeout) = args.timeout_seconds {
        cfg.timeout_seconds = timeout;
    }
    if args.top_k.is_some() {
        cfg.top_k = args.top_k;
    }
    cfg.validate()?;

    let catalog = Arc::new(Catalog::load(&args.metadata)?);
    let items = load_benchmark(&args.benchmark)?;

    let store = Store::open(&args.db)?;
    store.init_schema()?;

    let embedder = build_embedder(&cfg.embedder, &cfg.embedding_model, None)?
        .ok_or_else(|| ConfigError("run requires an embedder (openai|fake)".into()))?;
    let client = build_client(&cfg.provider, &cfg.model, None)?;

    let runner = Runner {
        client,
        retriever: Arc::new(
            Retriever::new(embedder, store.clone()).refresh_embeddings(args.refresh_embeddings),
        ),
        catalog,
        store,
        model: cfg.model.clone(),
        policy: RunPolicy {
            parallel: cfg.parallel,
            timeout: Duration::from_secs(cfg.timeout_seconds),
            top_k: cfg.top_k,
        },
    };

    let artifacts = runner.run_benchmark(&items).await?;
    write_records(&args.out, &artifacts.records)?;
    print_run_summary(&artifacts);
    eprintln!("Predictions saved to {}", args.out.display());
    Ok(0)
}
