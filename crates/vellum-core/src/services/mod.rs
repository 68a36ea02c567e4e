//! Domain services built on the versioned store.
//!
//! Services decide which writes archive a snapshot: content changes are
//! versioned, metadata changes (status, login time, file names) are not.

mod agreement;
mod document;
mod financial;
mod user;

pub use agreement::AgreementService;
pub use document::{DocumentService, Upload};
pub use financial::{DisclosureRevision, FinancialService};
pub use user::{NewUser, ProfilePatch, UserService};

use std::sync::Arc;

use crate::store::VersionedStore;
use crate::traits::TableBackend;

/// Every service sharing one store.
pub struct Services {
    pub store: Arc<VersionedStore>,
    pub users: UserService,
    pub agreements: AgreementService,
    pub finances: FinancialService,
    pub documents: DocumentService,
}

impl Services {
    pub fn new(table: Arc<dyn TableBackend>) -> Self {
        let store = Arc::new(VersionedStore::new(table));
        Self {
            users: UserService::new(store.clone()),
            agreements: AgreementService::new(store.clone()),
            finances: FinancialService::new(store.clone()),
            documents: DocumentService::new(store.clone()),
            store,
        }
    }
}
