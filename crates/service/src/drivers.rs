//! Driver-facing operations: profile, daily work list and status changes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;
use wastetrack_db::collections::{self, CollectionFilter};
use wastetrack_db::drivers::{self, DriverChanges};
use wastetrack_db::models::{CollectionStatus, CustomerLocation, Driver, WasteCollection};
use wastetrack_db::{customers, DbPool};
use wastetrack_routing::{Coordinate, NavigationInfo};
use wastetrack_telemetry::Metrics;

use crate::validation::{validate_email, validate_phone};
use crate::{day_bounds, ServiceError, ServiceResult};

/// Request body for a profile update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub current_lat: Option<f64>,
    pub current_lng: Option<f64>,
}

/// Request body for a driver's status change.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: CollectionStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusUpdateResponse {
    pub message: String,
    pub collection_id: i64,
    pub new_status: CollectionStatus,
}

/// Contact details of the customer behind a collection.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerSummary {
    pub name: String,
    pub address: String,
    pub contact_name: Option<String>,
    pub contact_number: Option<String>,
}

/// A collection as shown to the driver.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionView {
    pub id: i64,
    pub location_name: String,
    pub address: String,
    pub scheduled_time: DateTime<Utc>,
    pub status: CollectionStatus,
    pub notes: Option<String>,
    pub customer_location: Option<CustomerSummary>,
    pub navigation: Option<NavigationInfo>,
}

/// A collection joined with its customer location, if it has one.
#[derive(Debug, Clone)]
pub(crate) struct Assignment {
    pub collection: WasteCollection,
    pub customer: Option<CustomerLocation>,
}

impl Assignment {
    /// Where the truck has to go: the customer site when linked, else the collection's own point.
    pub fn location(&self) -> Coordinate {
        match &self.customer {
            Some(customer) => Coordinate {
                lat: customer.latitude,
                lng: customer.longitude,
            },
            None => Coordinate {
                lat: self.collection.latitude,
                lng: self.collection.longitude,
            },
        }
    }

    pub fn into_view(self, navigation: Option<NavigationInfo>) -> CollectionView {
        let (location_name, address) = match &self.customer {
            Some(customer) => (customer.name.clone(), customer.address.clone()),
            None => (self.collection.location_name, self.collection.address),
        };

        CollectionView {
            id: self.collection.id,
            location_name,
            address,
            scheduled_time: self.collection.scheduled_time,
            status: self.collection.status,
            notes: self.collection.notes,
            customer_location: self.customer.map(|c| CustomerSummary {
                name: c.name,
                address: c.address,
                contact_name: c.contact_name,
                contact_number: c.contact_number,
            }),
            navigation,
        }
    }
}

/// Join collections with their customer locations in one lookup.
pub(crate) async fn with_customers(
    db: &DbPool,
    rows: Vec<WasteCollection>,
) -> anyhow::Result<Vec<Assignment>> {
    let mut ids: Vec<i64> = rows.iter().filter_map(|c| c.customer_location_id).collect();
    ids.sort_unstable();
    ids.dedup();

    let by_id: HashMap<i64, CustomerLocation> = customers::by_ids(db, &ids)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    Ok(rows
        .into_iter()
        .map(|collection| {
            let customer = collection
                .customer_location_id
                .and_then(|id| by_id.get(&id).cloned());
            Assignment {
                collection,
                customer,
            }
        })
        .collect())
}

/// Look up a driver or fail with a not-found error.
pub(crate) async fn require_driver(db: &DbPool, driver_id: i64) -> ServiceResult<Driver> {
    drivers::get(db, driver_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Driver with ID {} not found", driver_id)))
}

#[derive(Clone)]
pub struct DriverService {
    db: DbPool,
    metrics: Metrics,
}

impl DriverService {
    pub fn new(db: DbPool, metrics: Metrics) -> Self {
        Self { db, metrics }
    }

    pub async fn profile(&self, driver_id: i64) -> ServiceResult<Driver> {
        require_driver(&self.db, driver_id).await
    }

    pub async fn update_profile(&self, driver_id: i64, update: ProfileUpdate) -> ServiceResult<Driver> {
        let driver = require_driver(&self.db, driver_id).await?;

        if let Some(phone) = update.phone.as_deref() {
            validate_phone(phone)?;
            if phone != driver.phone && drivers::find_by_phone(&self.db, phone).await?.is_some() {
                return Err(ServiceError::BadRequest("Phone number already registered".to_string()));
            }
        }

        if let Some(email) = update.email.as_deref() {
            validate_email(email)?;
            if driver.email.as_deref() != Some(email)
                && drivers::find_by_email(&self.db, email).await?.is_some()
            {
                return Err(ServiceError::BadRequest("Email already registered".to_string()));
            }
        }

        let lat = update.current_lat.or(driver.current_lat);
        let lng = update.current_lng.or(driver.current_lng);
        match (lat, lng) {
            (Some(lat), Some(lng)) => {
                Coordinate::new(lat, lng)?;
            }
            (None, None) => {}
            _ => {
                return Err(ServiceError::Validation(
                    "current_lat and current_lng must be set together".to_string(),
                ))
            }
        }

        let updated = drivers::update(
            &self.db,
            &driver,
            DriverChanges {
                name: update.name,
                phone: update.phone,
                email: update.email,
                current_lat: update.current_lat,
                current_lng: update.current_lng,
            },
        )
        .await?;

        info!(driver_id, "Updated driver profile");
        Ok(updated)
    }

    /// The driver's collections scheduled on `date`.
    pub async fn collections_for_day(
        &self,
        driver_id: i64,
        date: NaiveDate,
    ) -> ServiceResult<Vec<CollectionView>> {
        require_driver(&self.db, driver_id).await?;

        let (start, end) = day_bounds(date);
        let rows = collections::list_all(&self.db, &CollectionFilter::driver_window(driver_id, start, end)).await?;
        let assignments = with_customers(&self.db, rows).await?;

        Ok(assignments.into_iter().map(|a| a.into_view(None)).collect())
    }

    /// One of the driver's collections, with directions from the driver's last known position.
    pub async fn collection_detail(&self, driver_id: i64, collection_id: i64) -> ServiceResult<CollectionView> {
        let driver = require_driver(&self.db, driver_id).await?;
        let collection = collections::get_for_driver(&self.db, collection_id, driver_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Collection not found".to_string()))?;

        let assignment = with_customers(&self.db, vec![collection])
            .await?
            .pop()
            .ok_or_else(|| ServiceError::NotFound("Collection not found".to_string()))?;

        let navigation = driver
            .position()
            .map(|(lat, lng)| NavigationInfo::between(Coordinate { lat, lng }, assignment.location()));

        Ok(assignment.into_view(navigation))
    }

    /// Move a collection along its lifecycle.
    pub async fn update_status(
        &self,
        driver_id: i64,
        collection_id: i64,
        update: StatusUpdate,
    ) -> ServiceResult<StatusUpdateResponse> {
        let collection = collections::get_for_driver(&self.db, collection_id, driver_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Collection not found".to_string()))?;

        if !collection.status.can_transition_to(update.status) {
            return Err(ServiceError::BadRequest(format!(
                "Invalid status transition from {} to {}",
                collection.status, update.status
            )));
        }

        let actual_collection_time = match update.status {
            CollectionStatus::Completed => Some(Utc::now()),
            _ => None,
        };

        let applied = collections::transition(
            &self.db,
            collection_id,
            collection.status,
            update.status,
            update.notes.filter(|n| !n.is_empty()),
            actual_collection_time,
        )
        .await?;
        if !applied {
            return Err(ServiceError::BadRequest(format!(
                "Collection {} changed status while the update was in flight",
                collection_id
            )));
        }

        self.metrics.inc_status_updates(update.status.as_str());
        info!(
            driver_id,
            collection_id,
            "Collection moved from {} to {}",
            collection.status,
            update.status
        );

        Ok(StatusUpdateResponse {
            message: "Status updated successfully".to_string(),
            collection_id,
            new_status: update.status,
        })
    }
}
