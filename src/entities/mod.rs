//! Record types bound to concrete stores

pub mod catalog;
pub mod lending;
pub mod member;

pub use catalog::{CatalogItem, CatalogItemPatch, CatalogStore, NewCatalogItem};
pub use lending::{LendingOp, LendingRecord, LendingStore, LoanStatus, NewLendingRecord};
pub use member::{Member, MemberPatch, MemberStore, NewMember, DEFAULT_MAX_LOANS};
