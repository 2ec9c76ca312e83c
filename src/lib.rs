//! # shelf - fixed-record stores for a lending library
//!
//! Catalog items, members and lending records each live in their own flat
//! binary file. Every file is a small fixed-record store:
//!
//! - **8-byte header**: slot count and the head of a free list
//! - **fixed-width slots**: one record each, little-endian, space-padded text
//! - **free list**: deleted slots are linked through their trailing
//!   `next_free` field and reused LIFO before the file grows
//!
//! ```text
//! books.dat    [hdr][B001][B002][free → -1][B004] ...
//! members.dat  [hdr][M001][M002] ...
//! loans.dat    [hdr][L001][L002][L003] ...
//! ```
//!
//! Lending touches two files (catalog copies and the lending record) with
//! two separate durable writes. A small intent log records each such
//! operation before it starts so an interrupted one is finished on the next
//! open.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shelf::{Library, NewCatalogItem, NewMember, Result};
//!
//! # fn main() -> Result<()> {
//! let library = Library::open_dir("library-data")?;
//!
//! let book = library.add_item(NewCatalogItem {
//!     title: "Dune".into(),
//!     category: "SF".into(),
//!     creator: "Frank Herbert".into(),
//!     publisher: "Chilton".into(),
//!     year: "1965".into(),
//!     copies_available: 2,
//! })?;
//! let member = library.add_member(NewMember {
//!     name: "Ada".into(),
//!     birth_date: "1990-01-01".into(),
//!     max_loans: None,
//! })?;
//!
//! let outcome = library.lend(&member.id, &[book.id.as_str()])?;
//! println!("{:?}", outcome);
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod entities;
pub mod error;
pub mod header;
pub mod ids;
pub mod intent;
pub mod io;
pub mod library;
pub mod sequencer;
pub mod store;
pub mod summary;

pub use codec::{Record, RecordStatus, Slot};
pub use config::LibraryConfig;
pub use entities::{
    CatalogItem, CatalogItemPatch, CatalogStore, LendingOp, LendingRecord, LendingStore,
    LoanStatus, Member, MemberPatch, MemberStore, NewCatalogItem, NewLendingRecord, NewMember,
};
pub use error::{Result, ShelfError};
pub use header::{StoreHeader, HEADER_SIZE, NO_FREE_SLOT};
pub use intent::{Intent, IntentLog};
pub use library::Library;
pub use sequencer::{ItemLendOutcome, LendOutcome, ReturnOutcome, Sequencer};
pub use store::{Created, DeleteOutcome, Draft, Patch, RecordStore, UpdateOutcome};
pub use summary::LibrarySummary;
