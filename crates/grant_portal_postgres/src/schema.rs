use anyhow::{Context, Result};
use sqlx::PgPool;

const SCHEMA: &[&str] = &[
    "CREATE SCHEMA IF NOT EXISTS grant_portal",
    r#"
    CREATE TABLE IF NOT EXISTS grant_portal.documents (
        collection  TEXT        NOT NULL,
        doc_id      TEXT        NOT NULL,
        parent_id   TEXT,
        body        JSONB       NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (collection, doc_id)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS documents_parent_idx
        ON grant_portal.documents (collection, parent_id)
        WHERE parent_id IS NOT NULL
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS documents_one_current_cycle
        ON grant_portal.documents (collection)
        WHERE collection = 'applicationCycles' AND (body->>'current')::boolean
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS documents_whitelist_email
        ON grant_portal.documents ((body->>'email'))
        WHERE collection = 'reviewer-whitelist'
    "#,
];

/// Create the document table and its indexes if missing.
pub async fn initialize_schema(pool: &PgPool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("schema statement failed: {}", statement.trim()))?;
    }
    tracing::info!("grant_portal schema ready");
    Ok(())
}
