//! Database connection management and the Postgres event store.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

use crate::models::{Event, NewEvent};
use crate::secrets::get_database_credentials;
use crate::store::EventStore;
use crate::{Config, Error, Result};

/// Create a database connection pool.
pub async fn create_pool(config: &Config) -> Result<PgPool> {
    let database_url = match &config.database_url {
        Some(url) => url.clone(),
        None => get_database_credentials(config)
            .await?
            .connection_url(config)?,
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&database_url)
        .await
        .map_err(Error::Database)?;

    Ok(pool)
}

/// Create the `event` table if this is a fresh database.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS event (
            id INTEGER GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
            event TEXT NOT NULL,
            "date" DATE NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    info!("Event table ready");
    Ok(())
}

/// Row shape of the `event` table.
#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: i32,
    event: String,
    date: NaiveDate,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Self {
            id: row.id,
            event: row.event,
            date: row.date,
        }
    }
}

/// [`EventStore`] backed by the Postgres `event` table.
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn insert(&self, new_event: NewEvent) -> Result<Event> {
        let row: EventRow = sqlx::query_as(
            r#"
            INSERT INTO event (event, "date")
            VALUES ($1, $2)
            RETURNING id, event, "date"
            "#,
        )
        .bind(&new_event.event)
        .bind(new_event.date)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Event>> {
        let row: Option<EventRow> =
            sqlx::query_as(r#"SELECT id, event, "date" FROM event WHERE id = $1"#)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Event::from))
    }

    async fn find_all(&self) -> Result<Vec<Event>> {
        let rows: Vec<EventRow> =
            sqlx::query_as(r#"SELECT id, event, "date" FROM event ORDER BY id"#)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn delete(&self, event: &Event) -> Result<()> {
        sqlx::query("DELETE FROM event WHERE id = $1")
            .bind(event.id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
