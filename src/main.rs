use std::env;
use std::sync::Arc;

use blogdb::constants::DEFAULT_PAGE_SIZE;
use blogdb::domain::blog::articles;
use blogdb::domain::pagination::{Direction, Pagination};
use blogdb::engine::{SingleStatementResult, TransactionManager, drain_errors};
use blogdb::{Database, DatabaseConfig, LogErr};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Page request from PAGE_SIZE / CURSOR / DIRECTION
fn pagination_from_env() -> Pagination {
    let limit = env::var("PAGE_SIZE")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_PAGE_SIZE);
    let direction = match env::var("DIRECTION").ok().as_deref() {
        None => Direction::Forward,
        other => Direction::from_str(other),
    };
    let cursor = env::var("CURSOR").ok().filter(|c| !c.is_empty());
    Pagination::new(direction, limit, cursor)
}

#[tokio::main]
async fn main() -> blogdb::Result<()> {
    init_tracing();

    let config = DatabaseConfig::from_env();
    let db = Arc::new(Database::from_config(&config).log_err("invalid database configuration")?);
    let manager = TransactionManager::new(Arc::clone(&db))
        .with_statement_timeout(config.statement_timeout);

    let tx = manager.get_and_start();
    let errors = tx.subscribe_error();

    let page = SingleStatementResult::new();
    let mut stmt = articles::list_articles(pagination_from_env(), page.clone());

    let outcome = match tx.execute_statement(&mut stmt).await {
        Ok(()) => tx.commit().await,
        Err(e) => {
            tx.rollback().await.warn_ok("rollback after failed listing");
            Err(e)
        }
    };

    if let Some(errors) = errors {
        for e in drain_errors(errors).await {
            tracing::warn!(transaction = %tx.id(), error = %e, "transaction reported an error");
        }
    }
    outcome.log_err("listing articles")?;

    let page = page.get_strict()?;
    match serde_json::to_string_pretty(&page) {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::error!(error = %e, "failed to serialize page"),
    }

    db.invalidate().await;
    Ok(())
}
