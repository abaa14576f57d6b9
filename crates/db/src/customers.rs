//! Customer location queries.

use anyhow::Result;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};

use crate::models::CustomerLocation;
use crate::DbPool;

const CUSTOMER_COLUMNS: &str = "id, name, address, latitude, longitude, contact_name, \
     contact_number, collection_frequency, is_active, notes, created_at, updated_at";

/// Fields for a new customer location.
#[derive(Debug, Clone)]
pub struct NewCustomerLocation {
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub contact_name: Option<String>,
    pub contact_number: Option<String>,
    pub collection_frequency: Option<String>,
    pub notes: Option<String>,
}

pub async fn insert(db: &DbPool, customer: &NewCustomerLocation) -> Result<CustomerLocation> {
    let now = Utc::now();
    let row = sqlx::query_as::<_, CustomerLocation>(&format!(
        "INSERT INTO customer_locations (name, address, latitude, longitude, contact_name, \
         contact_number, collection_frequency, is_active, notes, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?) RETURNING {CUSTOMER_COLUMNS}"
    ))
    .bind(&customer.name)
    .bind(&customer.address)
    .bind(customer.latitude)
    .bind(customer.longitude)
    .bind(customer.contact_name.as_ref())
    .bind(customer.contact_number.as_ref())
    .bind(customer.collection_frequency.as_ref())
    .bind(customer.notes.as_ref())
    .bind(now)
    .bind(now)
    .fetch_one(db.pool())
    .await?;

    Ok(row)
}

pub async fn get(db: &DbPool, id: i64) -> Result<Option<CustomerLocation>> {
    let row = sqlx::query_as::<_, CustomerLocation>(&format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customer_locations WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(db.pool())
    .await?;

    Ok(row)
}

pub async fn list(db: &DbPool, include_inactive: bool) -> Result<Vec<CustomerLocation>> {
    let rows = sqlx::query_as::<_, CustomerLocation>(&format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customer_locations \
         WHERE (? OR is_active = 1) ORDER BY name, id"
    ))
    .bind(include_inactive)
    .fetch_all(db.pool())
    .await?;

    Ok(rows)
}

/// Fetch every customer location whose id is in `ids`.
pub async fn by_ids(db: &DbPool, ids: &[i64]) -> Result<Vec<CustomerLocation>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customer_locations WHERE id IN ("
    ));
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let rows = builder
        .build_query_as::<CustomerLocation>()
        .fetch_all(db.pool())
        .await?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str) -> NewCustomerLocation {
        NewCustomerLocation {
            name: name.to_string(),
            address: "Ring Road".to_string(),
            latitude: 5.56,
            longitude: -0.2,
            contact_name: Some("Kofi".to_string()),
            contact_number: None,
            collection_frequency: Some("weekly".to_string()),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = DbPool::in_memory().await.unwrap();
        db.migrate().await.unwrap();

        let a = insert(&db, &sample("Makola Market")).await.unwrap();
        let b = insert(&db, &sample("Accra Mall")).await.unwrap();

        assert!(a.is_active);
        assert_eq!(get(&db, a.id).await.unwrap().unwrap().name, "Makola Market");
        assert!(get(&db, 999).await.unwrap().is_none());

        let listed = list(&db, false).await.unwrap();
        assert_eq!(listed[0].name, "Accra Mall");

        let found = by_ids(&db, &[b.id, 12345]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(by_ids(&db, &[]).await.unwrap().is_empty());
    }
}
