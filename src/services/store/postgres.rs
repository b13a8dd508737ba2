use super::{Catalog, EventLog, Identity, VoteLedger};
use crate::config::PostgresConfig;
use crate::error::{DiscoveryError, Result};
use crate::models::*;
use crate::utils::validation::validate_item;
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS items (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        category TEXT,
        region TEXT,
        latitude DOUBLE PRECISION,
        longitude DOUBLE PRECISION,
        popularity_score BIGINT NOT NULL DEFAULT 0,
        approve_count INTEGER NOT NULL DEFAULT 0,
        disapprove_count INTEGER NOT NULL DEFAULT 0,
        description TEXT NOT NULL DEFAULT '',
        location TEXT NOT NULL DEFAULT ''
    )"#,
    r#"CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        preferences TEXT[] NOT NULL DEFAULT '{}',
        discovery_style TEXT,
        distance_preference TEXT,
        reference_location TEXT
    )"#,
    r#"CREATE TABLE IF NOT EXISTS interaction_events (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL,
        item_id UUID NOT NULL,
        kind TEXT NOT NULL,
        duration_secs DOUBLE PRECISION NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    "CREATE INDEX IF NOT EXISTS interaction_events_user_idx ON interaction_events (user_id)",
    "CREATE INDEX IF NOT EXISTS interaction_events_item_idx ON interaction_events (item_id)",
    r#"CREATE UNIQUE INDEX IF NOT EXISTS interaction_events_one_vote
        ON interaction_events (user_id, item_id)
        WHERE kind IN ('approve', 'disapprove')"#,
];

const ITEM_COLUMNS: &str = "id, name, category, region, latitude, longitude, popularity_score, \
     approve_count, disapprove_count, description, location";

const EVENT_COLUMNS: &str = "id, user_id, item_id, kind, duration_secs, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;
        info!("Connected to postgres (max_connections={})", config.max_connections);
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Postgres schema ready");
        Ok(())
    }

    pub async fn insert_item(&self, item: &Item) -> Result<()> {
        validate_item(item)?;
        sqlx::query(
            r#"INSERT INTO items (id, name, category, region, latitude, longitude, popularity_score,
                                  approve_count, disapprove_count, description, location)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
               ON CONFLICT (id) DO UPDATE SET
                   name = EXCLUDED.name,
                   category = EXCLUDED.category,
                   region = EXCLUDED.region,
                   latitude = EXCLUDED.latitude,
                   longitude = EXCLUDED.longitude,
                   popularity_score = EXCLUDED.popularity_score,
                   approve_count = EXCLUDED.approve_count,
                   disapprove_count = EXCLUDED.disapprove_count,
                   description = EXCLUDED.description,
                   location = EXCLUDED.location"#,
        )
        .bind(item.id)
        .bind(&item.name)
        .bind(item.category.map(|c| c.as_str()))
        .bind(&item.region)
        .bind(item.latitude)
        .bind(item.longitude)
        .bind(item.popularity_score)
        .bind(item.approve_count as i32)
        .bind(item.disapprove_count as i32)
        .bind(&item.description)
        .bind(&item.location)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn batch_insert_items(&self, items: &[Item]) -> Result<()> {
        for item in items {
            self.insert_item(item).await?;
        }
        info!("Batch inserted {} items", items.len());
        Ok(())
    }
}

fn parse_category(raw: Option<String>, context: Uuid) -> Option<Category> {
    let raw = raw?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse() {
        Ok(category) => Some(category),
        Err(_) => {
            warn!("Ignoring unknown category {:?} on {}", trimmed, context);
            None
        }
    }
}

fn count_from_row(row: &PgRow, column: &str) -> Result<u32> {
    let value: i32 = row.try_get(column)?;
    Ok(value.max(0) as u32)
}

fn item_from_row(row: &PgRow) -> Result<Item> {
    let id: Uuid = row.try_get("id")?;
    Ok(Item {
        id,
        name: row.try_get("name")?,
        category: parse_category(row.try_get("category")?, id),
        region: row.try_get("region")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        popularity_score: row.try_get("popularity_score")?,
        approve_count: count_from_row(row, "approve_count")?,
        disapprove_count: count_from_row(row, "disapprove_count")?,
        description: row.try_get("description")?,
        location: row.try_get("location")?,
    })
}

fn user_from_row(row: &PgRow) -> Result<User> {
    let id: Uuid = row.try_get("id")?;
    let preferences: Vec<String> = row.try_get("preferences")?;
    let style: Option<String> = row.try_get("discovery_style")?;
    let band: Option<String> = row.try_get("distance_preference")?;

    Ok(User {
        id,
        preferences: preferences
            .into_iter()
            .filter_map(|raw| parse_category(Some(raw), id))
            .collect(),
        discovery_style: DiscoveryStyle::from_label(style.as_deref().unwrap_or_default()),
        distance_preference: DistancePreference::from_label(band.as_deref().unwrap_or_default()),
        reference_location: row.try_get("reference_location")?,
    })
}

/// Rows with a kind this crate does not know are skipped.
fn events_from_rows(rows: Vec<PgRow>) -> Result<Vec<InteractionEvent>> {
    let mut events = Vec::with_capacity(rows.len());
    for row in rows {
        let kind: String = row.try_get("kind")?;
        let Ok(kind) = kind.parse::<InteractionKind>() else {
            warn!("Skipping interaction event with unknown kind {:?}", kind);
            continue;
        };
        events.push(InteractionEvent {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            item_id: row.try_get("item_id")?,
            kind,
            duration_secs: row.try_get("duration_secs")?,
            timestamp: row.try_get("created_at")?,
        });
    }
    Ok(events)
}

#[async_trait]
impl Catalog for PgStore {
    async fn all_items(&self) -> Result<Vec<Item>> {
        let rows = sqlx::query(&format!("SELECT {} FROM items ORDER BY name", ITEM_COLUMNS))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(item_from_row).collect()
    }

    async fn item(&self, item_id: Uuid) -> Result<Option<Item>> {
        let row = sqlx::query(&format!("SELECT {} FROM items WHERE id = $1", ITEM_COLUMNS))
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(item_from_row).transpose()
    }

    async fn items_by_category(&self, category: Category) -> Result<Vec<Item>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM items WHERE category = $1 ORDER BY name",
            ITEM_COLUMNS
        ))
        .bind(category.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(item_from_row).collect()
    }
}

#[async_trait]
impl Identity for PgStore {
    async fn user(&self, user_id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, preferences, discovery_style, distance_preference, reference_location \
             FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn upsert_user(&self, user: &User) -> Result<()> {
        let preferences: Vec<String> = user.preferences.iter().map(|c| c.to_string()).collect();
        sqlx::query(
            r#"INSERT INTO users (id, preferences, discovery_style, distance_preference,
                                  reference_location)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT (id) DO UPDATE SET
                   preferences = EXCLUDED.preferences,
                   discovery_style = EXCLUDED.discovery_style,
                   distance_preference = EXCLUDED.distance_preference,
                   reference_location = EXCLUDED.reference_location"#,
        )
        .bind(user.id)
        .bind(preferences)
        .bind(user.discovery_style.as_str())
        .bind(user.distance_preference.as_str())
        .bind(&user.reference_location)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(deleted.rows_affected() > 0)
    }
}

#[async_trait]
impl EventLog for PgStore {
    async fn append(&self, event: &InteractionEvent) -> Result<()> {
        sqlx::query(
            "INSERT INTO interaction_events \
             (id, user_id, item_id, kind, duration_secs, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(event.id)
        .bind(event.user_id)
        .bind(event.item_id)
        .bind(event.kind.as_str())
        .bind(event.duration_secs)
        .bind(event.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn events_for_user(&self, user_id: Uuid) -> Result<Vec<InteractionEvent>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM interaction_events WHERE user_id = $1 ORDER BY created_at",
            EVENT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        events_from_rows(rows)
    }

    async fn events_for_item(&self, item_id: Uuid) -> Result<Vec<InteractionEvent>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM interaction_events WHERE item_id = $1 ORDER BY created_at",
            EVENT_COLUMNS
        ))
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;
        events_from_rows(rows)
    }

    async fn interaction_counts(&self) -> Result<HashMap<Uuid, u64>> {
        let rows = sqlx::query(
            "SELECT item_id, COUNT(*) AS total FROM interaction_events GROUP BY item_id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts = HashMap::with_capacity(rows.len());
        for row in rows {
            let item_id: Uuid = row.try_get("item_id")?;
            let total: i64 = row.try_get("total")?;
            counts.insert(item_id, total.max(0) as u64);
        }
        Ok(counts)
    }
}

#[async_trait]
impl VoteLedger for PgStore {
    async fn prior_vote(&self, user_id: Uuid, item_id: Uuid) -> Result<Option<VoteDirection>> {
        let kind: Option<String> = sqlx::query_scalar(
            "SELECT kind FROM interaction_events \
             WHERE user_id = $1 AND item_id = $2 AND kind IN ('approve', 'disapprove') \
             ORDER BY created_at LIMIT 1",
        )
        .bind(user_id)
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(kind
            .and_then(|k| k.parse::<InteractionKind>().ok())
            .and_then(VoteDirection::from_kind))
    }

    async fn record_vote(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        direction: VoteDirection,
    ) -> Result<VoteWrite> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM items WHERE id = $1 FOR UPDATE")
                .bind(item_id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            tx.rollback().await?;
            return Err(DiscoveryError::validation(format!("Unknown item: {}", item_id)));
        }

        let inserted = sqlx::query(
            "INSERT INTO interaction_events \
             (id, user_id, item_id, kind, duration_secs, created_at) \
             VALUES ($1, $2, $3, $4, 0, now()) \
             ON CONFLICT (user_id, item_id) WHERE kind IN ('approve', 'disapprove') DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(item_id)
        .bind(direction.as_str())
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            let existing: Option<String> = sqlx::query_scalar(
                "SELECT kind FROM interaction_events \
                 WHERE user_id = $1 AND item_id = $2 AND kind IN ('approve', 'disapprove') \
                 ORDER BY created_at LIMIT 1",
            )
            .bind(user_id)
            .bind(item_id)
            .fetch_optional(&mut *tx)
            .await?;
            tx.rollback().await?;

            let existing = existing
                .and_then(|k| k.parse::<InteractionKind>().ok())
                .and_then(VoteDirection::from_kind)
                .ok_or_else(|| {
                    DiscoveryError::Storage("vote conflict without a stored vote".into())
                })?;
            return Ok(VoteWrite::AlreadyVoted(existing));
        }

        let update = match direction {
            VoteDirection::Approve => {
                "UPDATE items SET approve_count = approve_count + 1 WHERE id = $1 \
                 RETURNING approve_count, disapprove_count"
            }
            VoteDirection::Disapprove => {
                "UPDATE items SET disapprove_count = disapprove_count + 1 WHERE id = $1 \
                 RETURNING approve_count, disapprove_count"
            }
        };
        let row = sqlx::query(update).bind(item_id).fetch_one(&mut *tx).await?;
        let approve_count = count_from_row(&row, "approve_count")?;
        let disapprove_count = count_from_row(&row, "disapprove_count")?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM interaction_events WHERE item_id = $1")
                .bind(item_id)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;

        Ok(VoteWrite::Recorded(VoteAggregates {
            item_id,
            direction,
            approve_count,
            disapprove_count,
            total_interactions: total.max(0) as u64,
            approval_percentage: crate::utils::approval_percentage(approve_count, disapprove_count),
        }))
    }
}
