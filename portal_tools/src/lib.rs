mod api;
mod config;
mod error;

mod data_objects;

pub use api::{PortalApi, CHECKOUT_JOURNEY_PATH, TRANSACTIONS_PATH};
pub use config::PortalConfig;
pub use data_objects::{PageEnvelope, PortalRecord};
pub use error::PortalApiError;
