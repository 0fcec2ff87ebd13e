//! Recomputes score, recommended country and quality for every stored lead.
//!
//! Rows whose derived fields already match their inputs are left untouched.
//! Pass `--dry-run` to only report how many rows are stale.

use dotenvy::dotenv;
use std::env;

use study_abroad_crm::db::Database;
use study_abroad_crm::storage::LeadStorage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "study_abroad_crm=info".into()),
        )
        .init();

    let dry_run = env::args().any(|arg| arg == "--dry-run");
    let database_url = env::var("DATABASE_URL")
        .or_else(|_| env::var("DB_URL"))
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

    let db = Database::new(&database_url).await?;
    db.migrate().await?;
    let storage = LeadStorage::new(db.pool.clone());

    if dry_run {
        let leads = storage
            .export_rows()
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        let stale = leads.iter().filter(|l| !l.is_assessment_current()).count();
        println!("{} of {} leads have stale scores", stale, leads.len());
        for lead in leads.iter().filter(|l| !l.is_assessment_current()) {
            println!("- {} ({}): stored score {}", lead.id, lead.name, lead.lead_score);
        }
        return Ok(());
    }

    let rewritten = storage
        .rescore_all()
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    println!("Rescored {} lead(s)", rewritten);

    Ok(())
}
