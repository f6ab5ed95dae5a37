use std::collections::HashMap;

use sqlx::Row;

use crate::db::DatabasePool;
use crate::error::{AppError, AppResult};
use crate::models::{Prop, Weight, WeightUnit};

/// Read-only view of the prop inventory. Props are owned by the external
/// inventory system and synced into the `props` table; this service never
/// writes them.
pub struct InventoryService {
    db: DatabasePool,
}

impl InventoryService {
    pub fn new(db: DatabasePool) -> Self {
        Self { db }
    }

    pub async fn list_props(&self, show_id: Option<&str>) -> AppResult<Vec<Prop>> {
        match &self.db {
            DatabasePool::Postgres(pool) => {
                let rows = match show_id {
                    Some(show) => {
                        sqlx::query(
                            "SELECT id, name, show_id, weight_value, weight_unit FROM props WHERE show_id = $1 ORDER BY name",
                        )
                        .bind(show)
                        .fetch_all(pool)
                        .await?
                    }
                    None => {
                        sqlx::query(
                            "SELECT id, name, show_id, weight_value, weight_unit FROM props ORDER BY name",
                        )
                        .fetch_all(pool)
                        .await?
                    }
                };
                Ok(rows
                    .into_iter()
                    .map(|row| self.row_to_prop_postgres(row))
                    .collect())
            }
            DatabasePool::Sqlite(pool) => {
                let rows = match show_id {
                    Some(show) => {
                        sqlx::query(
                            "SELECT id, name, show_id, weight_value, weight_unit FROM props WHERE show_id = ?1 ORDER BY name",
                        )
                        .bind(show)
                        .fetch_all(pool)
                        .await?
                    }
                    None => {
                        sqlx::query(
                            "SELECT id, name, show_id, weight_value, weight_unit FROM props ORDER BY name",
                        )
                        .fetch_all(pool)
                        .await?
                    }
                };
                Ok(rows.into_iter().map(|row| self.row_to_prop(row)).collect())
            }
        }
    }

    pub async fn get_prop(&self, id: &str) -> AppResult<Prop> {
        match &self.db {
            DatabasePool::Postgres(pool) => {
                let row = sqlx::query(
                    "SELECT id, name, show_id, weight_value, weight_unit FROM props WHERE id = $1",
                )
                .bind(id)
                .fetch_optional(pool)
                .await?;
                match row {
                    Some(row) => Ok(self.row_to_prop_postgres(row)),
                    None => Err(AppError::NotFound(format!("Prop {} not found", id))),
                }
            }
            DatabasePool::Sqlite(pool) => {
                let row = sqlx::query(
                    "SELECT id, name, show_id, weight_value, weight_unit FROM props WHERE id = ?1",
                )
                .bind(id)
                .fetch_optional(pool)
                .await?;
                match row {
                    Some(row) => Ok(self.row_to_prop(row)),
                    None => Err(AppError::NotFound(format!("Prop {} not found", id))),
                }
            }
        }
    }

    /// Catalog keyed by prop id, loaded once per request so tree and weight
    /// lookups never go back to the database per container.
    pub async fn props_by_id(&self) -> AppResult<HashMap<String, Prop>> {
        let props = self.list_props(None).await?;
        Ok(props.into_iter().map(|p| (p.id.clone(), p)).collect())
    }

    fn row_to_prop(&self, row: sqlx::sqlite::SqliteRow) -> Prop {
        let weight = Self::weight_from_columns(
            row.get::<Option<f64>, _>("weight_value"),
            row.get::<Option<String>, _>("weight_unit"),
        );
        Prop {
            id: row.get("id"),
            name: row.get("name"),
            show_id: row.get("show_id"),
            weight,
        }
    }

    fn row_to_prop_postgres(&self, row: sqlx::postgres::PgRow) -> Prop {
        let weight = Self::weight_from_columns(
            row.get::<Option<f64>, _>("weight_value"),
            row.get::<Option<String>, _>("weight_unit"),
        );
        Prop {
            id: row.get("id"),
            name: row.get("name"),
            show_id: row.get("show_id"),
            weight,
        }
    }

    // Unknown units are treated as an unrecorded weight rather than an error,
    // the same way a missing prop contributes zero to container totals.
    fn weight_from_columns(value: Option<f64>, unit: Option<String>) -> Option<Weight> {
        match (value, unit) {
            (Some(value), Some(unit)) => {
                WeightUnit::parse(&unit).map(|unit| Weight { value, unit })
            }
            _ => None,
        }
    }
}
