//! Management of collection records.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use wastetrack_db::collections::{self, CollectionChanges, CollectionFilter, NewCollection};
use wastetrack_db::models::{CollectionStatus, WasteCollection};
use wastetrack_db::{customers, drivers, DbPool};
use wastetrack_routing::Coordinate;

use crate::validation::validate_paging;
use crate::{Page, ServiceError, ServiceResult};

/// Query for the paginated collection listing.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionQuery {
    pub search: Option<String>,
    pub status: Option<CollectionStatus>,
    pub driver_id: Option<i64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    10
}

impl Default for CollectionQuery {
    fn default() -> Self {
        Self {
            search: None,
            status: None,
            driver_id: None,
            start_date: None,
            end_date: None,
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

/// Request body for scheduling a collection.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCollection {
    pub driver_id: i64,
    pub location_name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub scheduled_time: DateTime<Utc>,
    #[serde(default)]
    pub status: CollectionStatus,
    pub notes: Option<String>,
    pub customer_location_id: Option<i64>,
}

/// Request body for a partial collection update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCollection {
    pub status: Option<CollectionStatus>,
    pub notes: Option<String>,
    pub actual_collection_time: Option<DateTime<Utc>>,
}

/// Create, read, update and delete collections on behalf of management.
#[derive(Clone)]
pub struct CollectionService {
    db: DbPool,
}

impl CollectionService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn list(&self, query: CollectionQuery) -> ServiceResult<Page<WasteCollection>> {
        validate_paging(query.page, query.page_size)?;

        let filter = CollectionFilter {
            search: query.search,
            status: query.status,
            driver_id: query.driver_id,
            scheduled_from: query.start_date,
            scheduled_to: query.end_date,
            exclusive_end: false,
            unrouted: false,
        };

        let offset = (query.page - 1)
            .checked_mul(query.page_size)
            .ok_or_else(|| ServiceError::Validation("page is out of range".to_string()))?;
        let total = collections::count(&self.db, &filter).await?;
        let items = collections::list(&self.db, &filter, query.page_size, offset).await?;

        Ok(Page {
            total,
            page: query.page,
            page_size: query.page_size,
            items,
        })
    }

    pub async fn create(&self, request: CreateCollection) -> ServiceResult<WasteCollection> {
        Coordinate::new(request.latitude, request.longitude)?;

        let driver = drivers::get(&self.db, request.driver_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Driver with ID {} not found", request.driver_id))
            })?;
        if !driver.is_active {
            return Err(ServiceError::BadRequest(format!(
                "Driver with ID {} is not active",
                request.driver_id
            )));
        }

        if let Some(customer_id) = request.customer_location_id {
            if customers::get(&self.db, customer_id).await?.is_none() {
                return Err(ServiceError::NotFound(format!(
                    "Customer location with ID {} not found",
                    customer_id
                )));
            }
        }

        let collection = collections::insert(
            &self.db,
            &NewCollection {
                driver_id: request.driver_id,
                location_name: request.location_name,
                address: request.address,
                latitude: request.latitude,
                longitude: request.longitude,
                scheduled_time: request.scheduled_time,
                status: request.status,
                notes: request.notes,
                customer_location_id: request.customer_location_id,
            },
        )
        .await?;

        info!(
            collection_id = collection.id,
            driver_id = collection.driver_id,
            "Scheduled collection at {}",
            collection.location_name
        );
        Ok(collection)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<WasteCollection> {
        collections::get(&self.db, id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    pub async fn update(&self, id: i64, request: UpdateCollection) -> ServiceResult<WasteCollection> {
        let changes = CollectionChanges {
            status: request.status,
            notes: request.notes,
            actual_collection_time: request.actual_collection_time,
        };

        collections::update(&self.db, id, changes)
            .await?
            .ok_or_else(|| not_found(id))
    }

    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        if collections::delete(&self.db, id).await? {
            info!(collection_id = id, "Deleted collection");
            Ok(())
        } else {
            Err(not_found(id))
        }
    }
}

fn not_found(id: i64) -> ServiceError {
    ServiceError::NotFound(format!("Collection with ID {} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{at, seeded_db};

    fn request(driver_id: i64, name: &str, day: u32) -> CreateCollection {
        CreateCollection {
            driver_id,
            location_name: name.to_string(),
            address: "Independence Ave".to_string(),
            latitude: 5.55,
            longitude: -0.2,
            scheduled_time: at(day, 9),
            status: CollectionStatus::Pending,
            notes: None,
            customer_location_id: None,
        }
    }

    #[tokio::test]
    async fn test_create_requires_existing_active_driver() {
        let db = seeded_db().await;
        let service = CollectionService::new(db.clone());

        assert!(matches!(
            service.create(request(42, "A", 4)).await,
            Err(ServiceError::NotFound(_))
        ));

        deactivate(&db, 2).await;
        assert!(matches!(
            service.create(request(2, "A", 4)).await,
            Err(ServiceError::BadRequest(_))
        ));

        let mut bad = request(1, "A", 4);
        bad.latitude = 123.0;
        assert!(matches!(service.create(bad).await, Err(ServiceError::Validation(_))));

        let created = service.create(request(1, "A", 4)).await.unwrap();
        assert_eq!(created.status, CollectionStatus::Pending);
    }

    #[tokio::test]
    async fn test_list_pages() {
        let db = seeded_db().await;
        let service = CollectionService::new(db);
        for day in 1..=5 {
            service.create(request(1, &format!("Stop {}", day), day)).await.unwrap();
        }

        let page = service
            .list(CollectionQuery {
                page: 2,
                page_size: 2,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].location_name, "Stop 3");

        let windowed = service
            .list(CollectionQuery {
                start_date: Some(at(2, 0)),
                end_date: Some(at(3, 9)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(windowed.total, 2);

        assert!(matches!(
            service
                .list(CollectionQuery {
                    page_size: 500,
                    ..Default::default()
                })
                .await,
            Err(ServiceError::Validation(_))
        ));

        assert!(matches!(
            service
                .list(CollectionQuery {
                    page: i64::MAX,
                    page_size: 100,
                    ..Default::default()
                })
                .await,
            Err(ServiceError::Validation(msg)) if msg == "page is out of range"
        ));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = seeded_db().await;
        let service = CollectionService::new(db);
        let created = service.create(request(1, "A", 4)).await.unwrap();

        let updated = service
            .update(
                created.id,
                UpdateCollection {
                    notes: Some("Gate locked".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.notes.as_deref(), Some("Gate locked"));
        assert_eq!(updated.status, CollectionStatus::Pending);

        service.delete(created.id).await.unwrap();
        assert!(matches!(service.get(created.id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(service.delete(created.id).await, Err(ServiceError::NotFound(_))));
    }

    async fn deactivate(db: &DbPool, driver_id: i64) {
        wastetrack_db::drivers::set_active(db, driver_id, false).await.unwrap();
    }
}
