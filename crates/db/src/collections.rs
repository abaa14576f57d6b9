//! Waste collection queries.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};

use crate::models::{CollectionStatus, WasteCollection};
use crate::DbPool;

const COLLECTION_COLUMNS: &str = "id, driver_id, location_name, address, latitude, longitude, \
     scheduled_time, actual_collection_time, status, notes, route_id, route_position, \
     customer_location_id, created_at, updated_at";

/// Fields for a new collection.
#[derive(Debug, Clone)]
pub struct NewCollection {
    pub driver_id: i64,
    pub location_name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub scheduled_time: DateTime<Utc>,
    pub status: CollectionStatus,
    pub notes: Option<String>,
    pub customer_location_id: Option<i64>,
}

/// Partial update of a collection. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct CollectionChanges {
    pub status: Option<CollectionStatus>,
    pub notes: Option<String>,
    pub actual_collection_time: Option<DateTime<Utc>>,
}

/// Filters shared by listing, counting and analytics.
///
/// The time bounds apply to `scheduled_time`; `scheduled_from` is inclusive,
/// `scheduled_to` inclusive unless `exclusive_end` is set. `unrouted` keeps
/// only collections not yet assigned to a route.
#[derive(Debug, Clone, Default)]
pub struct CollectionFilter {
    pub search: Option<String>,
    pub status: Option<CollectionStatus>,
    pub driver_id: Option<i64>,
    pub scheduled_from: Option<DateTime<Utc>>,
    pub scheduled_to: Option<DateTime<Utc>>,
    pub exclusive_end: bool,
    pub unrouted: bool,
}

impl CollectionFilter {
    /// Collections of one driver scheduled in `[start, end)`.
    pub fn driver_window(driver_id: i64, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            driver_id: Some(driver_id),
            scheduled_from: Some(start),
            scheduled_to: Some(end),
            exclusive_end: true,
            ..Default::default()
        }
    }

    fn push_where(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        builder.push(" WHERE 1 = 1");

        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search);
            builder
                .push(" AND (location_name LIKE ")
                .push_bind(pattern.clone())
                .push(" OR address LIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(status) = self.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some(driver_id) = self.driver_id {
            builder.push(" AND driver_id = ").push_bind(driver_id);
        }
        if let Some(from) = self.scheduled_from {
            builder.push(" AND scheduled_time >= ").push_bind(from);
        }
        if let Some(to) = self.scheduled_to {
            let op = if self.exclusive_end { " < " } else { " <= " };
            builder.push(" AND scheduled_time").push(op).push_bind(to);
        }
        if self.unrouted {
            builder.push(" AND route_id IS NULL");
        }
    }
}

pub async fn insert(db: &DbPool, collection: &NewCollection) -> Result<WasteCollection> {
    let now = Utc::now();
    let row = sqlx::query_as::<_, WasteCollection>(&format!(
        "INSERT INTO waste_collections (driver_id, location_name, address, latitude, longitude, \
         scheduled_time, status, notes, customer_location_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {COLLECTION_COLUMNS}"
    ))
    .bind(collection.driver_id)
    .bind(&collection.location_name)
    .bind(&collection.address)
    .bind(collection.latitude)
    .bind(collection.longitude)
    .bind(collection.scheduled_time)
    .bind(collection.status)
    .bind(collection.notes.as_ref())
    .bind(collection.customer_location_id)
    .bind(now)
    .bind(now)
    .fetch_one(db.pool())
    .await?;

    Ok(row)
}

pub async fn get(db: &DbPool, id: i64) -> Result<Option<WasteCollection>> {
    let row = sqlx::query_as::<_, WasteCollection>(&format!(
        "SELECT {COLLECTION_COLUMNS} FROM waste_collections WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(db.pool())
    .await?;

    Ok(row)
}

/// Fetch a collection only if it is assigned to `driver_id`.
pub async fn get_for_driver(db: &DbPool, id: i64, driver_id: i64) -> Result<Option<WasteCollection>> {
    let row = sqlx::query_as::<_, WasteCollection>(&format!(
        "SELECT {COLLECTION_COLUMNS} FROM waste_collections WHERE id = ? AND driver_id = ?"
    ))
    .bind(id)
    .bind(driver_id)
    .fetch_optional(db.pool())
    .await?;

    Ok(row)
}

/// Page through collections matching `filter`, oldest schedule first.
pub async fn list(
    db: &DbPool,
    filter: &CollectionFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<WasteCollection>> {
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {COLLECTION_COLUMNS} FROM waste_collections"));
    filter.push_where(&mut builder);
    builder
        .push(" ORDER BY scheduled_time, id LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows = builder
        .build_query_as::<WasteCollection>()
        .fetch_all(db.pool())
        .await?;

    Ok(rows)
}

/// Every collection matching `filter`, oldest schedule first.
pub async fn list_all(db: &DbPool, filter: &CollectionFilter) -> Result<Vec<WasteCollection>> {
    list(db, filter, -1, 0).await
}

pub async fn count(db: &DbPool, filter: &CollectionFilter) -> Result<i64> {
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT COUNT(*) FROM waste_collections");
    filter.push_where(&mut builder);

    let total: i64 = builder
        .build_query_scalar()
        .fetch_one(db.pool())
        .await?;

    Ok(total)
}

/// Number of collections per status among those matching `filter`.
pub async fn status_counts(
    db: &DbPool,
    filter: &CollectionFilter,
) -> Result<Vec<(CollectionStatus, i64)>> {
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT status, COUNT(*) FROM waste_collections");
    filter.push_where(&mut builder);
    builder.push(" GROUP BY status");

    let rows: Vec<(CollectionStatus, i64)> = builder
        .build_query_as()
        .fetch_all(db.pool())
        .await?;

    Ok(rows)
}

/// The collection a driver is currently working on, if any.
pub async fn current_for_driver(db: &DbPool, driver_id: i64) -> Result<Option<WasteCollection>> {
    let row = sqlx::query_as::<_, WasteCollection>(&format!(
        "SELECT {COLLECTION_COLUMNS} FROM waste_collections \
         WHERE driver_id = ? AND status = ? ORDER BY scheduled_time, id LIMIT 1"
    ))
    .bind(driver_id)
    .bind(CollectionStatus::InProgress)
    .fetch_optional(db.pool())
    .await?;

    Ok(row)
}

/// Collections of a route in visiting order.
pub async fn by_route(db: &DbPool, route_id: i64) -> Result<Vec<WasteCollection>> {
    let rows = sqlx::query_as::<_, WasteCollection>(&format!(
        "SELECT {COLLECTION_COLUMNS} FROM waste_collections \
         WHERE route_id = ? ORDER BY route_position, id"
    ))
    .bind(route_id)
    .fetch_all(db.pool())
    .await?;

    Ok(rows)
}

/// Apply `changes` and stamp `updated_at`. Returns `None` when the collection does not exist.
pub async fn update(
    db: &DbPool,
    id: i64,
    changes: CollectionChanges,
) -> Result<Option<WasteCollection>> {
    let row = sqlx::query_as::<_, WasteCollection>(&format!(
        "UPDATE waste_collections SET \
         status = COALESCE(?, status), \
         notes = COALESCE(?, notes), \
         actual_collection_time = COALESCE(?, actual_collection_time), \
         updated_at = ? \
         WHERE id = ? RETURNING {COLLECTION_COLUMNS}"
    ))
    .bind(changes.status)
    .bind(changes.notes)
    .bind(changes.actual_collection_time)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(db.pool())
    .await?;

    Ok(row)
}

/// Move a collection from status `from` to `to` in one conditional write.
///
/// Returns `false` when the collection is missing or no longer in `from`.
pub async fn transition(
    db: &DbPool,
    id: i64,
    from: CollectionStatus,
    to: CollectionStatus,
    notes: Option<String>,
    actual_collection_time: Option<DateTime<Utc>>,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE waste_collections SET status = ?, notes = COALESCE(?, notes), \
         actual_collection_time = COALESCE(?, actual_collection_time), updated_at = ? \
         WHERE id = ? AND status = ?",
    )
    .bind(to)
    .bind(notes)
    .bind(actual_collection_time)
    .bind(Utc::now())
    .bind(id)
    .bind(from)
    .execute(db.pool())
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a collection. Returns `false` when nothing was deleted.
pub async fn delete(db: &DbPool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM waste_collections WHERE id = ?")
        .bind(id)
        .execute(db.pool())
        .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers;
    use chrono::{Duration, TimeZone};

    async fn setup() -> DbPool {
        let db = DbPool::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        drivers::seed_sample_drivers(&db).await.unwrap();
        db
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, hour, 0, 0).unwrap()
    }

    fn new_collection(driver_id: i64, name: &str, address: &str, when: DateTime<Utc>) -> NewCollection {
        NewCollection {
            driver_id,
            location_name: name.to_string(),
            address: address.to_string(),
            latitude: 5.6,
            longitude: -0.19,
            scheduled_time: when,
            status: CollectionStatus::Pending,
            notes: None,
            customer_location_id: None,
        }
    }

    #[tokio::test]
    async fn test_filters_and_paging() {
        let db = setup().await;
        insert(&db, &new_collection(1, "Makola Market", "Kojo Thompson Rd", at(8))).await.unwrap();
        insert(&db, &new_collection(1, "Osu Castle", "Castle Rd", at(9))).await.unwrap();
        insert(&db, &new_collection(2, "Kaneshie Market", "Winneba Rd", at(10))).await.unwrap();

        let markets = CollectionFilter {
            search: Some("market".to_string()),
            ..Default::default()
        };
        assert_eq!(count(&db, &markets).await.unwrap(), 2);

        let by_address = CollectionFilter {
            search: Some("castle".to_string()),
            ..Default::default()
        };
        assert_eq!(count(&db, &by_address).await.unwrap(), 1);

        let driver_one = CollectionFilter {
            driver_id: Some(1),
            ..Default::default()
        };
        let page = list(&db, &driver_one, 1, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].location_name, "Osu Castle");

        let inclusive = CollectionFilter {
            scheduled_from: Some(at(9)),
            scheduled_to: Some(at(10)),
            ..Default::default()
        };
        assert_eq!(count(&db, &inclusive).await.unwrap(), 2);

        let window = CollectionFilter::driver_window(1, at(0), at(0) + Duration::days(1));
        assert_eq!(list_all(&db, &window).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_and_status_counts() {
        let db = setup().await;
        let a = insert(&db, &new_collection(1, "A", "a", at(8))).await.unwrap();
        insert(&db, &new_collection(1, "B", "b", at(9))).await.unwrap();

        let updated = update(
            &db,
            a.id,
            CollectionChanges {
                status: Some(CollectionStatus::InProgress),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(updated.status, CollectionStatus::InProgress);
        assert!(updated.notes.is_none());

        let current = current_for_driver(&db, 1).await.unwrap().unwrap();
        assert_eq!(current.id, a.id);
        assert!(current_for_driver(&db, 2).await.unwrap().is_none());

        let mut counts = status_counts(&db, &CollectionFilter::default()).await.unwrap();
        counts.sort_by_key(|(status, _)| status.as_str());
        assert_eq!(
            counts,
            vec![(CollectionStatus::InProgress, 1), (CollectionStatus::Pending, 1)]
        );

        assert!(update(&db, 999, CollectionChanges::default()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transition_requires_expected_status() {
        let db = setup().await;
        let a = insert(&db, &new_collection(1, "A", "a", at(8))).await.unwrap();

        assert!(transition(&db, a.id, CollectionStatus::Pending, CollectionStatus::InProgress, None, None)
            .await
            .unwrap());
        // A second writer that still believes the collection is pending loses.
        assert!(!transition(&db, a.id, CollectionStatus::Pending, CollectionStatus::InProgress, None, None)
            .await
            .unwrap());

        assert!(transition(
            &db,
            a.id,
            CollectionStatus::InProgress,
            CollectionStatus::Completed,
            Some("Done".to_string()),
            Some(at(9)),
        )
        .await
        .unwrap());
        assert!(!transition(&db, a.id, CollectionStatus::InProgress, CollectionStatus::Skipped, None, None)
            .await
            .unwrap());

        let stored = get(&db, a.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CollectionStatus::Completed);
        assert_eq!(stored.notes.as_deref(), Some("Done"));
        assert_eq!(stored.actual_collection_time, Some(at(9)));
    }

    #[tokio::test]
    async fn test_unrouted_filter() {
        let db = setup().await;
        let a = insert(&db, &new_collection(1, "A", "a", at(8))).await.unwrap();
        insert(&db, &new_collection(1, "B", "b", at(9))).await.unwrap();
        sqlx::query("INSERT INTO routes (driver_id, date, status, distance, created_at) VALUES (1, '2024-03-04', 'PENDING', 0, ?)")
            .bind(Utc::now())
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("UPDATE waste_collections SET route_id = 1 WHERE id = ?")
            .bind(a.id)
            .execute(db.pool())
            .await
            .unwrap();

        let filter = CollectionFilter {
            unrouted: true,
            ..Default::default()
        };
        let rows = list_all(&db, &filter).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].location_name, "B");
    }

    #[tokio::test]
    async fn test_delete_and_driver_scope() {
        let db = setup().await;
        let a = insert(&db, &new_collection(1, "A", "a", at(8))).await.unwrap();

        assert!(get_for_driver(&db, a.id, 1).await.unwrap().is_some());
        assert!(get_for_driver(&db, a.id, 2).await.unwrap().is_none());

        assert!(delete(&db, a.id).await.unwrap());
        assert!(!delete(&db, a.id).await.unwrap());
        assert!(get(&db, a.id).await.unwrap().is_none());
    }
}
