//! Catalog items

use crate::codec::{FieldReader, FieldWriter, Record, RecordStatus, TRAILER_SIZE};
use crate::ids::ID_WIDTH;
use crate::store::{Draft, Patch, RecordStore};
use serde::{Deserialize, Serialize};

pub const TITLE_WIDTH: usize = 60;
pub const CATEGORY_WIDTH: usize = 20;
pub const CREATOR_WIDTH: usize = 30;
pub const PUBLISHER_WIDTH: usize = 30;
pub const YEAR_WIDTH: usize = 4;

pub type CatalogStore = RecordStore<CatalogItem>;

/// A lendable catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub title: String,
    pub category: String,
    /// Author or other primary creator
    pub creator: String,
    pub publisher: String,
    pub year: String,
    pub copies_available: u32,
    pub status: RecordStatus,
}

impl Record for CatalogItem {
    const KIND: &'static str = "catalog item";
    const ID_PREFIX: char = 'B';
    const WIDTH: usize = ID_WIDTH
        + TITLE_WIDTH
        + CATEGORY_WIDTH
        + CREATOR_WIDTH
        + PUBLISHER_WIDTH
        + YEAR_WIDTH
        + 4
        + TRAILER_SIZE;

    fn id(&self) -> &str {
        &self.id
    }

    fn is_active(&self) -> bool {
        self.status == RecordStatus::Active
    }

    fn mark_deleted(&mut self) {
        self.status = RecordStatus::Deleted;
    }

    fn write_fields(&self, w: &mut FieldWriter) {
        w.text(&self.id, ID_WIDTH)
            .text(&self.title, TITLE_WIDTH)
            .text(&self.category, CATEGORY_WIDTH)
            .text(&self.creator, CREATOR_WIDTH)
            .text(&self.publisher, PUBLISHER_WIDTH)
            .text(&self.year, YEAR_WIDTH)
            .u32(self.copies_available)
            .u8(self.status as u8);
    }

    fn read_fields(r: &mut FieldReader<'_>) -> Self {
        CatalogItem {
            id: r.text(ID_WIDTH),
            title: r.text(TITLE_WIDTH),
            category: r.text(CATEGORY_WIDTH),
            creator: r.text(CREATOR_WIDTH),
            publisher: r.text(PUBLISHER_WIDTH),
            year: r.text(YEAR_WIDTH),
            copies_available: r.u32(),
            status: RecordStatus::from_u8(r.u8()),
        }
    }
}

/// Fields for a new catalog item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCatalogItem {
    pub title: String,
    pub category: String,
    pub creator: String,
    pub publisher: String,
    pub year: String,
    pub copies_available: u32,
}

impl Draft for NewCatalogItem {
    type Record = CatalogItem;

    fn into_record(self, id: String) -> CatalogItem {
        CatalogItem {
            id,
            title: self.title,
            category: self.category,
            creator: self.creator,
            publisher: self.publisher,
            year: self.year,
            copies_available: self.copies_available,
            status: RecordStatus::Active,
        }
    }
}

/// Replacement values for a catalog item; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItemPatch {
    pub title: Option<String>,
    pub category: Option<String>,
    pub creator: Option<String>,
    pub publisher: Option<String>,
    pub year: Option<String>,
    pub copies_available: Option<u32>,
}

impl Patch<CatalogItem> for CatalogItemPatch {
    fn apply_to(self, item: &mut CatalogItem) {
        if let Some(title) = self.title {
            item.title = title;
        }
        if let Some(category) = self.category {
            item.category = category;
        }
        if let Some(creator) = self.creator {
            item.creator = creator;
        }
        if let Some(publisher) = self.publisher {
            item.publisher = publisher;
        }
        if let Some(year) = self.year {
            item.year = year;
        }
        if let Some(copies) = self.copies_available {
            item.copies_available = copies;
        }
    }
}
