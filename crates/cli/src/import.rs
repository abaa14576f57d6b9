//! CSV import of customer locations.

use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};
use wastetrack_db::DbPool;
use wastetrack_service::customers::CreateCustomerLocation;
use wastetrack_service::{CustomerService, ServiceError};

#[derive(Debug, Deserialize)]
struct CustomerRecord {
    name: String,
    address: String,
    latitude: f64,
    longitude: f64,
    contact_name: Option<String>,
    contact_number: Option<String>,
    collection_frequency: Option<String>,
}

#[derive(Debug, Default, PartialEq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

/// Insert every valid row of the CSV at `csv_path`.
///
/// Rows that fail to parse or validate are logged and skipped; database
/// errors abort the import.
pub async fn import_customers(db: &DbPool, csv_path: &Path) -> anyhow::Result<ImportSummary> {
    info!("Importing customer locations from {:?}", csv_path);

    let service = CustomerService::new(db.clone());
    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut summary = ImportSummary::default();

    for (index, result) in reader.deserialize::<CustomerRecord>().enumerate() {
        let line = index + 2;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping line {}: {}", line, e);
                summary.skipped += 1;
                continue;
            }
        };

        let request = CreateCustomerLocation {
            name: record.name,
            address: record.address,
            latitude: record.latitude,
            longitude: record.longitude,
            contact_name: non_empty(record.contact_name),
            contact_number: non_empty(record.contact_number),
            collection_frequency: non_empty(record.collection_frequency),
            notes: None,
        };

        match service.create(request).await {
            Ok(_) => summary.imported += 1,
            Err(ServiceError::Internal(e)) => return Err(e),
            Err(e) => {
                warn!("Skipping line {}: {}", line, e);
                summary.skipped += 1;
            }
        }
    }

    Ok(summary)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
