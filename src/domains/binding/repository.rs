use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::errors::{DbError, DomainError, DomainResult};

use super::types::{AudioRef, BindingRecord, CategoryRef, TextRef};

/// Read side of the binding/category/audio/text join consumed by the export
/// pipeline. The whole dataset is expected to fit in memory for one export,
/// so this returns a plain list rather than a cursor.
#[async_trait]
pub trait BindingRepository: Send + Sync {
    /// Every binding whose audio has finished ingest, optionally filtered to
    /// non-blank transcript text and/or a single category name.
    async fn list_for_export(
        &self,
        omit_empty: bool,
        category_name: Option<&str>,
    ) -> DomainResult<Vec<BindingRecord>>;
}

pub struct SqliteBindingRepository {
    pool: SqlitePool,
}

impl SqliteBindingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BindingRow {
    id: String,
    category_id: Option<String>,
    category_name: Option<String>,
    audio_id: String,
    object_key: String,
    file_name: String,
    duration_seconds: f64,
    text_id: String,
    body: String,
}

fn parse_uuid(s: &str) -> DomainResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| DomainError::InvalidUuid(e.to_string()))
}

impl TryFrom<BindingRow> for BindingRecord {
    type Error = DomainError;

    fn try_from(row: BindingRow) -> DomainResult<Self> {
        let category = match (row.category_id, row.category_name) {
            (Some(id), Some(name)) => Some(CategoryRef {
                id: parse_uuid(&id)?,
                name,
            }),
            _ => None,
        };
        Ok(BindingRecord {
            id: parse_uuid(&row.id)?,
            category,
            audio: AudioRef {
                id: parse_uuid(&row.audio_id)?,
                object_key: row.object_key,
                file_name: row.file_name,
                duration_seconds: row.duration_seconds,
            },
            text: TextRef {
                id: parse_uuid(&row.text_id)?,
                body: row.body,
            },
        })
    }
}

#[async_trait]
impl BindingRepository for SqliteBindingRepository {
    async fn list_for_export(
        &self,
        omit_empty: bool,
        category_name: Option<&str>,
    ) -> DomainResult<Vec<BindingRecord>> {
        let mut sql = String::from(
            "SELECT b.id, b.category_id, c.name AS category_name,
                    a.id AS audio_id, a.object_key, a.file_name, a.duration_seconds,
                    t.id AS text_id, t.body
             FROM bindings b
             LEFT JOIN categories c ON c.id = b.category_id
             JOIN audios a ON a.id = b.audio_id
             JOIN texts t ON t.id = b.text_id
             WHERE a.status = 'ready'",
        );
        if omit_empty {
            sql.push_str(" AND TRIM(t.body) != ''");
        }
        if category_name.is_some() {
            sql.push_str(" AND c.name = ?");
        }
        sql.push_str(" ORDER BY b.created_at, b.id");

        let mut query = sqlx::query_as::<_, BindingRow>(&sql);
        if let Some(name) = category_name {
            query = query.bind(name);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::Sqlx(e)))?;

        rows.into_iter().map(BindingRecord::try_from).collect()
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use sqlx::SqlitePool;
    use uuid::Uuid;

    /// Insert a binding with its audio and text rows, returning the binding id.
    pub async fn seed_binding(
        pool: &SqlitePool,
        category: Option<&str>,
        file_name: &str,
        text: &str,
    ) -> Uuid {
        seed_binding_with_status(pool, category, file_name, text, "ready").await
    }

    pub async fn seed_binding_with_status(
        pool: &SqlitePool,
        category: Option<&str>,
        file_name: &str,
        text: &str,
        audio_status: &str,
    ) -> Uuid {
        let category_id = match category {
            Some(name) => {
                let existing: Option<(String,)> =
                    sqlx::query_as("SELECT id FROM categories WHERE name = ?")
                        .bind(name)
                        .fetch_optional(pool)
                        .await
                        .unwrap();
                let id = match existing {
                    Some((id,)) => id,
                    None => {
                        let id = Uuid::new_v4().to_string();
                        sqlx::query("INSERT INTO categories (id, name) VALUES (?, ?)")
                            .bind(&id)
                            .bind(name)
                            .execute(pool)
                            .await
                            .unwrap();
                        id
                    }
                };
                Some(id)
            }
            None => None,
        };

        let audio_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO audios (id, object_key, file_name, duration_seconds, status)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(audio_id.to_string())
        .bind(format!("raw/{file_name}"))
        .bind(file_name)
        .bind(1.5_f64)
        .bind(audio_status)
        .execute(pool)
        .await
        .unwrap();

        let text_id = Uuid::new_v4();
        sqlx::query("INSERT INTO texts (id, body) VALUES (?, ?)")
            .bind(text_id.to_string())
            .bind(text)
            .execute(pool)
            .await
            .unwrap();

        let binding_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO bindings (id, category_id, audio_id, text_id) VALUES (?, ?, ?, ?)",
        )
        .bind(binding_id.to_string())
        .bind(category_id)
        .bind(audio_id.to_string())
        .bind(text_id.to_string())
        .execute(pool)
        .await
        .unwrap();

        binding_id
    }
}
