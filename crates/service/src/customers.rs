//! Customer locations.

use serde::Deserialize;
use tracing::info;
use wastetrack_db::customers::{self, NewCustomerLocation};
use wastetrack_db::models::CustomerLocation;
use wastetrack_db::DbPool;
use wastetrack_routing::Coordinate;

use crate::{ServiceError, ServiceResult};

/// Request body for registering a customer location.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCustomerLocation {
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub contact_name: Option<String>,
    pub contact_number: Option<String>,
    pub collection_frequency: Option<String>,
    pub notes: Option<String>,
}

impl From<CreateCustomerLocation> for NewCustomerLocation {
    fn from(request: CreateCustomerLocation) -> Self {
        Self {
            name: request.name,
            address: request.address,
            latitude: request.latitude,
            longitude: request.longitude,
            contact_name: request.contact_name,
            contact_number: request.contact_number,
            collection_frequency: request.collection_frequency,
            notes: request.notes,
        }
    }
}

#[derive(Clone)]
pub struct CustomerService {
    db: DbPool,
}

impl CustomerService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn create(&self, request: CreateCustomerLocation) -> ServiceResult<CustomerLocation> {
        Coordinate::new(request.latitude, request.longitude)?;
        if request.name.trim().is_empty() {
            return Err(ServiceError::Validation("name must not be empty".to_string()));
        }

        let customer = customers::insert(&self.db, &request.into()).await?;
        info!(customer_id = customer.id, "Registered customer location {}", customer.name);
        Ok(customer)
    }

    pub async fn list(&self, include_inactive: bool) -> ServiceResult<Vec<CustomerLocation>> {
        Ok(customers::list(&self.db, include_inactive).await?)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<CustomerLocation> {
        customers::get(&self.db, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer location with ID {} not found", id)))
    }
}
