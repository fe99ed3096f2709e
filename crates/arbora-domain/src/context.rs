//! Read-only job context
//!
//! Identity and location of the parties involved, supplied at job start.
//! The coordinator holds this by value and never writes to it; chat turns
//! that try to edit these fields are deflected by the context guard before
//! anything else runs.

use serde::{Deserialize, Serialize};

/// Postal address shared by both parties' profiles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    /// Street line
    pub street: String,
    /// City
    pub city: String,
    /// State or province
    pub state: String,
    /// Postal code
    pub postal_code: String,
    /// Country
    pub country: String,
}

/// The assessing arborist's identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArboristInfo {
    /// Full name
    pub name: String,
    /// Company name
    pub company: String,
    /// Phone number
    pub phone: String,
    /// Email address
    pub email: String,
    /// License identifier
    pub license: String,
    /// Certification identifier
    pub certification: String,
    /// Business address
    pub address: Address,
}

/// The customer's identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerInfo {
    /// Full name
    pub name: String,
    /// Company name, if any
    pub company: String,
    /// Phone number
    pub phone: String,
    /// Email address
    pub email: String,
    /// Service address
    pub address: Address,
}

/// Precise geocoordinates of the assessed tree
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

/// Read-only companion data for one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobContext {
    /// Job identifier assigned outside the coordinator
    pub job_id: String,
    /// Assessing arborist
    pub arborist: ArboristInfo,
    /// Customer
    pub customer: CustomerInfo,
    /// Tree location
    pub location: GeoPoint,
}

impl JobContext {
    /// A fully-populated context for tests and local development
    pub fn sample() -> JobContext {
        let address = Address {
            street: "100 Cedar Ln".to_string(),
            city: "Portland".to_string(),
            state: "OR".to_string(),
            postal_code: "97201".to_string(),
            country: "USA".to_string(),
        };
        JobContext {
            job_id: "JOB-0001".to_string(),
            arborist: ArboristInfo {
                name: "R. Alder".to_string(),
                company: "Canopy Works".to_string(),
                phone: "555-0100".to_string(),
                email: "alder@canopyworks.example".to_string(),
                license: "OR-ARB-4411".to_string(),
                certification: "ISA WE-1234A".to_string(),
                address: address.clone(),
            },
            customer: CustomerInfo {
                name: "J. Rowan".to_string(),
                company: String::new(),
                phone: "555-0199".to_string(),
                email: "rowan@example.com".to_string(),
                address,
            },
            location: GeoPoint {
                latitude: 45.5152,
                longitude: -122.6784,
            },
        }
    }
}
