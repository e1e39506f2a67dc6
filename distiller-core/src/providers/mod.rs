//! Clients for the remote APIs the workers drive: the record store fronting
//! the relational database, and the Super-Facility API fronting the HPC
//! scheduler.

pub mod record_store;
pub mod sfapi;

pub use record_store::{HttpRecordStore, RecordStore};
pub use sfapi::{SfApi, SfApiClient};

#[cfg(test)]
pub use record_store::MockRecordStore;
#[cfg(test)]
pub use sfapi::MockSfApi;
