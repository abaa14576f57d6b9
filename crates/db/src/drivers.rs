//! Driver queries.

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::models::Driver;
use crate::DbPool;

const DRIVER_COLUMNS: &str =
    "id, name, phone, email, is_active, current_lat, current_lng, last_update";

/// Fields required to register a driver.
#[derive(Debug, Clone)]
pub struct NewDriver {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

/// Profile fields a driver may change. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct DriverChanges {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub current_lat: Option<f64>,
    pub current_lng: Option<f64>,
}

pub async fn insert(db: &DbPool, driver: &NewDriver) -> Result<Driver> {
    let row = sqlx::query_as::<_, Driver>(&format!(
        "INSERT INTO drivers (name, phone, email, is_active, last_update) \
         VALUES (?, ?, ?, 1, ?) RETURNING {DRIVER_COLUMNS}"
    ))
    .bind(&driver.name)
    .bind(&driver.phone)
    .bind(driver.email.as_ref())
    .bind(Utc::now())
    .fetch_one(db.pool())
    .await?;

    Ok(row)
}

pub async fn get(db: &DbPool, id: i64) -> Result<Option<Driver>> {
    let row = sqlx::query_as::<_, Driver>(&format!(
        "SELECT {DRIVER_COLUMNS} FROM drivers WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(db.pool())
    .await?;

    Ok(row)
}

/// All drivers, or only `driver_id` when given.
pub async fn list(db: &DbPool, driver_id: Option<i64>) -> Result<Vec<Driver>> {
    let rows = sqlx::query_as::<_, Driver>(&format!(
        "SELECT {DRIVER_COLUMNS} FROM drivers WHERE (?1 IS NULL OR id = ?1) ORDER BY id"
    ))
    .bind(driver_id)
    .fetch_all(db.pool())
    .await?;

    Ok(rows)
}

pub async fn find_by_phone(db: &DbPool, phone: &str) -> Result<Option<Driver>> {
    let row = sqlx::query_as::<_, Driver>(&format!(
        "SELECT {DRIVER_COLUMNS} FROM drivers WHERE phone = ?"
    ))
    .bind(phone)
    .fetch_optional(db.pool())
    .await?;

    Ok(row)
}

pub async fn find_by_email(db: &DbPool, email: &str) -> Result<Option<Driver>> {
    let row = sqlx::query_as::<_, Driver>(&format!(
        "SELECT {DRIVER_COLUMNS} FROM drivers WHERE email = ?"
    ))
    .bind(email)
    .fetch_optional(db.pool())
    .await?;

    Ok(row)
}

/// Apply `changes` to an existing driver and stamp `last_update`.
pub async fn update(db: &DbPool, current: &Driver, changes: DriverChanges) -> Result<Driver> {
    let row = sqlx::query_as::<_, Driver>(&format!(
        "UPDATE drivers SET name = ?, phone = ?, email = ?, current_lat = ?, current_lng = ?, \
         last_update = ? WHERE id = ? RETURNING {DRIVER_COLUMNS}"
    ))
    .bind(changes.name.unwrap_or_else(|| current.name.clone()))
    .bind(changes.phone.unwrap_or_else(|| current.phone.clone()))
    .bind(changes.email.or_else(|| current.email.clone()))
    .bind(changes.current_lat.or(current.current_lat))
    .bind(changes.current_lng.or(current.current_lng))
    .bind(Utc::now())
    .bind(current.id)
    .fetch_one(db.pool())
    .await?;

    Ok(row)
}

/// Record a position report. Returns `false` when the driver does not exist.
pub async fn update_position(
    db: &DbPool,
    id: i64,
    lat: f64,
    lng: f64,
    reported_at: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE drivers SET current_lat = ?, current_lng = ?, last_update = ? WHERE id = ?",
    )
    .bind(lat)
    .bind(lng)
    .bind(reported_at)
    .bind(id)
    .execute(db.pool())
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Enable or disable a driver. Returns `false` when the driver does not exist.
pub async fn set_active(db: &DbPool, id: i64, active: bool) -> Result<bool> {
    let result = sqlx::query("UPDATE drivers SET is_active = ?, last_update = ? WHERE id = ?")
        .bind(active)
        .bind(Utc::now())
        .bind(id)
        .execute(db.pool())
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count(db: &DbPool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM drivers")
        .fetch_one(db.pool())
        .await?;
    Ok(count)
}

/// Insert the sample drivers into an empty database.
///
/// Returns the number of drivers created; zero when any driver already exists.
pub async fn seed_sample_drivers(db: &DbPool) -> Result<usize> {
    if count(db).await? > 0 {
        info!("Skipping initial data creation, drivers already exist");
        return Ok(0);
    }

    let samples = [
        ("John Doe", "+233123456789"),
        ("Jane Smith", "+233987654321"),
    ];

    let mut tx = db.pool().begin().await?;
    for (name, phone) in samples {
        sqlx::query("INSERT INTO drivers (name, phone, is_active, last_update) VALUES (?, ?, 1, ?)")
            .bind(name)
            .bind(phone)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    info!("Created {} sample drivers", samples.len());
    Ok(samples.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> DbPool {
        let db = DbPool::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_seed_only_once() {
        let db = setup().await;
        assert_eq!(seed_sample_drivers(&db).await.unwrap(), 2);
        assert_eq!(seed_sample_drivers(&db).await.unwrap(), 0);
        assert_eq!(count(&db).await.unwrap(), 2);

        let jane = find_by_phone(&db, "+233987654321").await.unwrap().unwrap();
        assert_eq!(jane.name, "Jane Smith");
        assert!(jane.is_active);
        assert!(jane.position().is_none());
    }

    #[tokio::test]
    async fn test_update_keeps_unchanged_fields() {
        let db = setup().await;
        let driver = insert(
            &db,
            &NewDriver {
                name: "Ama".to_string(),
                phone: "+233200000001".to_string(),
                email: Some("ama@example.com".to_string()),
            },
        )
        .await
        .unwrap();

        let updated = update(
            &db,
            &driver,
            DriverChanges {
                name: Some("Ama Mensah".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.name, "Ama Mensah");
        assert_eq!(updated.phone, "+233200000001");
        assert_eq!(updated.email.as_deref(), Some("ama@example.com"));
        assert!(updated.last_update >= driver.last_update);
    }

    #[tokio::test]
    async fn test_update_position() {
        let db = setup().await;
        seed_sample_drivers(&db).await.unwrap();

        assert!(update_position(&db, 1, 5.6, -0.2, Utc::now()).await.unwrap());
        assert!(!update_position(&db, 99, 5.6, -0.2, Utc::now()).await.unwrap());

        let driver = get(&db, 1).await.unwrap().unwrap();
        assert_eq!(driver.position(), Some((5.6, -0.2)));
        assert_eq!(list(&db, None).await.unwrap().len(), 2);
        assert_eq!(list(&db, Some(2)).await.unwrap().len(), 1);
    }
}
