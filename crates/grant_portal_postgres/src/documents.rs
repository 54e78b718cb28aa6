//! JSONB document helpers over `grant_portal.documents`.
//!
//! All helpers take a `PgConnection` so the same code runs on a pooled
//! connection or inside a transaction (`&mut *tx`).

use anyhow::anyhow;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::PgConnection;

use grant_portal_core::error::{PortalError, Result};

pub(crate) const CYCLES: &str = "applicationCycles";
pub(crate) const APPLICATIONS: &str = "applications";
pub(crate) const DECISIONS: &str = "decision-data";
pub(crate) const REVIEWS: &str = "reviews";
pub(crate) const REPORTS: &str = "post-grant-reports";
pub(crate) const WHITELIST: &str = "reviewer-whitelist";
pub(crate) const APPLICANTS: &str = "applicants";
pub(crate) const REVIEWERS: &str = "reviewers";
pub(crate) const FAQS: &str = "FAQs";

fn encode<T: Serialize>(doc: &T) -> Result<serde_json::Value> {
    serde_json::to_value(doc).map_err(|e| PortalError::Internal(anyhow!(e)))
}

fn decode<T: DeserializeOwned>(body: serde_json::Value) -> Result<T> {
    serde_json::from_value(body).map_err(|e| PortalError::Internal(anyhow!(e)))
}

fn decode_all<T: DeserializeOwned>(bodies: Vec<serde_json::Value>) -> Result<Vec<T>> {
    bodies.into_iter().map(decode).collect()
}

/// Serialise writers of one logical key until the transaction ends.
pub(crate) async fn lock(conn: &mut PgConnection, key: &str) -> Result<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(key)
        .execute(conn)
        .await
        .map_err(|e| anyhow!(e))?;
    Ok(())
}

pub(crate) async fn get<T: DeserializeOwned>(
    conn: &mut PgConnection,
    collection: &str,
    doc_id: &str,
) -> Result<Option<T>> {
    let body = sqlx::query_scalar::<_, serde_json::Value>(
        "SELECT body FROM grant_portal.documents WHERE collection = $1 AND doc_id = $2",
    )
    .bind(collection)
    .bind(doc_id)
    .fetch_optional(conn)
    .await
    .map_err(|e| anyhow!(e))?;
    body.map(decode).transpose()
}

pub(crate) async fn list<T: DeserializeOwned>(
    conn: &mut PgConnection,
    collection: &str,
) -> Result<Vec<T>> {
    let bodies = sqlx::query_scalar::<_, serde_json::Value>(
        "SELECT body FROM grant_portal.documents WHERE collection = $1 ORDER BY created_at DESC",
    )
    .bind(collection)
    .fetch_all(conn)
    .await
    .map_err(|e| anyhow!(e))?;
    decode_all(bodies)
}

pub(crate) async fn children<T: DeserializeOwned>(
    conn: &mut PgConnection,
    collection: &str,
    parent_id: &str,
) -> Result<Vec<T>> {
    let bodies = sqlx::query_scalar::<_, serde_json::Value>(
        r#"
        SELECT body FROM grant_portal.documents
        WHERE collection = $1 AND parent_id = $2
        ORDER BY created_at
        "#,
    )
    .bind(collection)
    .bind(parent_id)
    .fetch_all(conn)
    .await
    .map_err(|e| anyhow!(e))?;
    decode_all(bodies)
}

/// Documents whose top-level text field equals `value`.
pub(crate) async fn find_by<T: DeserializeOwned>(
    conn: &mut PgConnection,
    collection: &str,
    field: &str,
    value: &str,
) -> Result<Vec<T>> {
    let bodies = sqlx::query_scalar::<_, serde_json::Value>(
        r#"
        SELECT body FROM grant_portal.documents
        WHERE collection = $1 AND body->>$2 = $3
        ORDER BY created_at DESC
        "#,
    )
    .bind(collection)
    .bind(field)
    .bind(value)
    .fetch_all(conn)
    .await
    .map_err(|e| anyhow!(e))?;
    decode_all(bodies)
}

pub(crate) async fn get_many<T: DeserializeOwned>(
    conn: &mut PgConnection,
    collection: &str,
    doc_ids: &[String],
) -> Result<Vec<T>> {
    let bodies = sqlx::query_scalar::<_, serde_json::Value>(
        "SELECT body FROM grant_portal.documents WHERE collection = $1 AND doc_id = ANY($2)",
    )
    .bind(collection)
    .bind(doc_ids)
    .fetch_all(conn)
    .await
    .map_err(|e| anyhow!(e))?;
    decode_all(bodies)
}

/// Insert or replace.
pub(crate) async fn put<T: Serialize>(
    conn: &mut PgConnection,
    collection: &str,
    doc_id: &str,
    parent_id: Option<&str>,
    doc: &T,
) -> Result<()> {
    let body = encode(doc)?;
    sqlx::query(
        r#"
        INSERT INTO grant_portal.documents (collection, doc_id, parent_id, body)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (collection, doc_id)
        DO UPDATE SET body = EXCLUDED.body,
                      parent_id = EXCLUDED.parent_id,
                      updated_at = now()
        "#,
    )
    .bind(collection)
    .bind(doc_id)
    .bind(parent_id)
    .bind(&body)
    .execute(conn)
    .await
    .map_err(|e| anyhow!(e))?;
    Ok(())
}

/// Insert only. Returns `false` when the id is taken.
pub(crate) async fn insert<T: Serialize>(
    conn: &mut PgConnection,
    collection: &str,
    doc_id: &str,
    parent_id: Option<&str>,
    doc: &T,
) -> Result<bool> {
    let body = encode(doc)?;
    let result = sqlx::query(
        r#"
        INSERT INTO grant_portal.documents (collection, doc_id, parent_id, body)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (collection, doc_id) DO NOTHING
        "#,
    )
    .bind(collection)
    .bind(doc_id)
    .bind(parent_id)
    .bind(&body)
    .execute(conn)
    .await
    .map_err(|e| anyhow!(e))?;
    Ok(result.rows_affected() == 1)
}

/// Replace an existing document. Returns `false` when it does not exist.
pub(crate) async fn replace<T: Serialize>(
    conn: &mut PgConnection,
    collection: &str,
    doc_id: &str,
    doc: &T,
) -> Result<bool> {
    let body = encode(doc)?;
    let result = sqlx::query(
        r#"
        UPDATE grant_portal.documents
        SET body = $3, updated_at = now()
        WHERE collection = $1 AND doc_id = $2
        "#,
    )
    .bind(collection)
    .bind(doc_id)
    .bind(&body)
    .execute(conn)
    .await
    .map_err(|e| anyhow!(e))?;
    Ok(result.rows_affected() == 1)
}

pub(crate) async fn delete(conn: &mut PgConnection, collection: &str, doc_id: &str) -> Result<bool> {
    let result =
        sqlx::query("DELETE FROM grant_portal.documents WHERE collection = $1 AND doc_id = $2")
            .bind(collection)
            .bind(doc_id)
            .execute(conn)
            .await
            .map_err(|e| anyhow!(e))?;
    Ok(result.rows_affected() == 1)
}
