// src/store/postgres.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use std::time::Duration;

use super::{Snapshot, SnapshotBackend};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS portfolio_snapshot (
    id SERIAL PRIMARY KEY,
    source_url TEXT UNIQUE NOT NULL,
    names JSONB NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
)";

/// One row per source: `source_url → names` (JSON array) plus update timestamp.
#[derive(Clone)]
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await
            .context("connecting to postgres")?;

        sqlx::query(CREATE_TABLE)
            .execute(&pool)
            .await
            .context("ensuring portfolio_snapshot table")?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl SnapshotBackend for PgBackend {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn load_all(&self) -> Result<Snapshot> {
        let rows = sqlx::query_as::<_, (String, Json<Vec<String>>)>(
            "SELECT source_url, names FROM portfolio_snapshot ORDER BY source_url",
        )
        .fetch_all(&self.pool)
        .await
        .context("loading snapshot rows")?;

        Ok(rows
            .into_iter()
            .map(|(url, Json(names))| (url, names.into_iter().collect()))
            .collect())
    }

    async fn save_all(&self, snapshot: &Snapshot) -> Result<()> {
        let mut tx = self.pool.begin().await.context("begin snapshot tx")?;
        for (url, names) in snapshot {
            let names: Vec<&String> = names.iter().collect();
            sqlx::query(
                "INSERT INTO portfolio_snapshot (source_url, names, updated_at)
                 VALUES ($1, $2, now())
                 ON CONFLICT (source_url)
                 DO UPDATE SET names = EXCLUDED.names, updated_at = now()",
            )
            .bind(url)
            .bind(Json(names))
            .execute(&mut *tx)
            .await
            .with_context(|| format!("upserting snapshot for {url}"))?;
        }
        tx.commit().await.context("commit snapshot tx")?;
        Ok(())
    }
}
