mod cli;

use std::sync::Arc;

use clap::Parser;
use eyre::WrapErr;

use labeld::Labeler;
use labeld_auth::{AllowList, EmitAuthorizer, HttpDidResolver};
use labeld_server::LabelerConfig;
use labeld_store::SqliteStore;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let args = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = LabelerConfig::from_strings(&args.did, &args.signing_key)
        .wrap_err("invalid labeler configuration")?;

    let store = SqliteStore::open(&args.db)
        .wrap_err_with(|| format!("open label database at {}", args.db.display()))?;

    let resolver = Arc::new(HttpDidResolver::with_plc_url(&args.plc_url));

    let authorizer: Option<Arc<dyn EmitAuthorizer>> = if args.allow_dids.is_empty() {
        None // default: labeler-only
    } else {
        let mut dids = args.allow_dids.clone();
        dids.push(args.did.clone());
        Some(Arc::new(AllowList::new(dids)))
    };

    let labeler = Labeler::new(config, Arc::new(store), resolver, authorizer)
        .await
        .wrap_err("initialize labeler")?;

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .wrap_err_with(|| format!("bind {}", args.bind))?;

    tracing::info!(
        addr = %args.bind,
        did = %labeler.did(),
        db = %args.db.display(),
        "labeld listening"
    );

    labeler
        .serve(listener, async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await
        .wrap_err("serve")?;

    Ok(())
}
