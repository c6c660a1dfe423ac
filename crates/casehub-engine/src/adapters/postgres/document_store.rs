//! JSONB document table with a compare-and-swap `version` column

use std::marker::PhantomData;

use serde::{de::DeserializeOwned, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use casehub::DomainError;

use crate::adapters::versioned::Versioned;

/// Internal row type for sqlx mapping
#[derive(sqlx::FromRow)]
struct DocumentRow {
    version: i64,
    data: Json<serde_json::Value>,
}

pub(crate) struct DocumentStore<T> {
    pool: PgPool,
    table: &'static str,
    _entity: PhantomData<fn() -> T>,
}

impl<T> DocumentStore<T>
where
    T: Versioned + Serialize + DeserializeOwned,
{
    pub(crate) fn new(pool: PgPool, table: &'static str) -> Self {
        Self {
            pool,
            table,
            _entity: PhantomData,
        }
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub(crate) async fn get(&self, id: Uuid) -> Result<Option<T>, DomainError> {
        let query = format!("SELECT version, data FROM {} WHERE id = $1", self.table);
        let row = sqlx::query_as::<_, DocumentRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(repository_error)?;

        row.map(decode).transpose()
    }

    pub(crate) async fn all(&self) -> Result<Vec<T>, DomainError> {
        let query = format!("SELECT version, data FROM {}", self.table);
        let rows = sqlx::query_as::<_, DocumentRow>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(repository_error)?;

        rows.into_iter().map(decode).collect()
    }

    /// Documents containing `criteria` (JSONB `@>`)
    pub(crate) async fn find_containing(
        &self,
        criteria: &serde_json::Value,
    ) -> Result<Vec<T>, DomainError> {
        let query = format!("SELECT version, data FROM {} WHERE data @> $1", self.table);
        let rows = sqlx::query_as::<_, DocumentRow>(&query)
            .bind(Json(criteria))
            .fetch_all(&self.pool)
            .await
            .map_err(repository_error)?;

        rows.into_iter().map(decode).collect()
    }

    pub(crate) async fn insert(&self, entity: &T) -> Result<T, DomainError> {
        let query = format!(
            "INSERT INTO {} (id, version, data) VALUES ($1, $2, $3)",
            self.table
        );
        sqlx::query(&query)
            .bind(entity.id())
            .bind(version_column(entity.version())?)
            .bind(Json(encode(entity)?))
            .execute(&self.pool)
            .await
            .map_err(repository_error)?;

        Ok(entity.clone())
    }

    pub(crate) async fn save(&self, entity: &T, expected_version: u64) -> Result<T, DomainError> {
        let mut next = entity.clone();
        next.set_version(expected_version + 1);
        next.touch();

        let query = format!(
            "UPDATE {} SET version = $3, data = $4, updated_at = NOW() \
             WHERE id = $1 AND version = $2",
            self.table
        );
        let result = sqlx::query(&query)
            .bind(entity.id())
            .bind(version_column(expected_version)?)
            .bind(version_column(next.version())?)
            .bind(Json(encode(&next)?))
            .execute(&self.pool)
            .await
            .map_err(repository_error)?;

        if result.rows_affected() == 1 {
            return Ok(next);
        }

        // Lost the race or the row is gone; report which
        let query = format!("SELECT version FROM {} WHERE id = $1", self.table);
        let actual = sqlx::query_scalar::<_, i64>(&query)
            .bind(entity.id())
            .fetch_optional(&self.pool)
            .await
            .map_err(repository_error)?;

        match actual {
            None => Err(DomainError::not_found(T::ENTITY, entity.id())),
            Some(actual) => Err(DomainError::lock_conflict(
                T::ENTITY,
                entity.id(),
                expected_version,
                actual.max(0) as u64,
            )),
        }
    }
}

fn decode<T: Versioned + DeserializeOwned>(row: DocumentRow) -> Result<T, DomainError> {
    let mut entity: T = serde_json::from_value(row.data.0).map_err(|e| {
        DomainError::Repository(format!("Failed to decode {}: {}", T::ENTITY, e))
    })?;
    // the column is authoritative
    entity.set_version(row.version.max(0) as u64);
    Ok(entity)
}

fn encode<T: Versioned + Serialize>(entity: &T) -> Result<serde_json::Value, DomainError> {
    serde_json::to_value(entity)
        .map_err(|e| DomainError::Repository(format!("Failed to encode {}: {}", T::ENTITY, e)))
}

fn version_column(version: u64) -> Result<i64, DomainError> {
    i64::try_from(version).map_err(|_| DomainError::Repository(format!("version {} out of range", version)))
}

pub(crate) fn repository_error(e: sqlx::Error) -> DomainError {
    DomainError::Repository(e.to_string())
}
