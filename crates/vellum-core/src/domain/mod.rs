//! Typed domain records stored through the versioned store.
//!
//! Each type maps onto the free-form field map of one entity kind. Fields
//! computed from other records (totals, cached partner email) are derived by
//! the service that writes them; the store keeps no cross-entity links.

mod agreement;
mod disclosure;
mod document;
mod signature;
mod user;

pub use agreement::{is_jurisdiction, Agreement, AgreementStatus, JURISDICTIONS};
pub use disclosure::{FinancialDisclosure, LineItem, Party};
pub use document::DocumentRecord;
pub use signature::{InvitationStatus, PartnerInvitation, Signature};
pub use user::{normalize_email, UserProfile};
