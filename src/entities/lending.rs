//! Lending records
//!
//! One record per borrowed item. Returning rewrites the same record in
//! place: operation becomes [`LendingOp::Return`], status becomes
//! [`LoanStatus::Closed`] and the return date is filled in. Closed records
//! keep status byte 0 on disk, the same value a freed slot carries, but
//! they are never linked into the free list.

use crate::codec::{FieldReader, FieldWriter, Record, TRAILER_SIZE};
use crate::ids::ID_WIDTH;
use crate::store::{Draft, RecordStore};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

pub const DATE_WIDTH: usize = 10;

/// On-disk date format
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Return date of a loan that is still out
pub const RETURN_PENDING: &str = "-";

pub type LendingStore = RecordStore<LendingRecord>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum LendingOp {
    Borrow = 1,
    Return = 2,
}

impl LendingOp {
    /// Unknown values read as `Borrow`
    pub fn from_u8(value: u8) -> Self {
        match value {
            2 => Self::Return,
            _ => Self::Borrow,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum LoanStatus {
    Closed = 0,
    Outstanding = 1,
}

impl LoanStatus {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Outstanding,
            _ => Self::Closed,
        }
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, DATE_FORMAT).ok()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LendingRecord {
    pub id: String,
    pub operation: LendingOp,
    pub member_id: String,
    pub item_id: String,
    pub loan_date: String,
    pub due_date: String,
    /// [`RETURN_PENDING`] until the loan is closed
    pub return_date: String,
    pub status: LoanStatus,
}

impl LendingRecord {
    pub fn is_outstanding(&self) -> bool {
        self.status == LoanStatus::Outstanding
    }

    /// Close the loan as returned on `date`
    pub fn close(&mut self, date: NaiveDate) {
        self.operation = LendingOp::Return;
        self.status = LoanStatus::Closed;
        self.return_date = format_date(date);
    }
}

impl Record for LendingRecord {
    const KIND: &'static str = "lending record";
    const ID_PREFIX: char = 'L';
    const WIDTH: usize = ID_WIDTH + 1 + ID_WIDTH + ID_WIDTH + 3 * DATE_WIDTH + TRAILER_SIZE;

    fn id(&self) -> &str {
        &self.id
    }

    fn is_active(&self) -> bool {
        self.is_outstanding()
    }

    fn mark_deleted(&mut self) {
        self.status = LoanStatus::Closed;
    }

    fn write_fields(&self, w: &mut FieldWriter) {
        w.text(&self.id, ID_WIDTH)
            .u8(self.operation as u8)
            .text(&self.member_id, ID_WIDTH)
            .text(&self.item_id, ID_WIDTH)
            .text(&self.loan_date, DATE_WIDTH)
            .text(&self.due_date, DATE_WIDTH)
            .text(&self.return_date, DATE_WIDTH)
            .u8(self.status as u8);
    }

    fn read_fields(r: &mut FieldReader<'_>) -> Self {
        LendingRecord {
            id: r.text(ID_WIDTH),
            operation: LendingOp::from_u8(r.u8()),
            member_id: r.text(ID_WIDTH),
            item_id: r.text(ID_WIDTH),
            loan_date: r.text(DATE_WIDTH),
            due_date: r.text(DATE_WIDTH),
            return_date: r.text(DATE_WIDTH),
            status: LoanStatus::from_u8(r.u8()),
        }
    }
}

/// A new outstanding loan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLendingRecord {
    pub member_id: String,
    pub item_id: String,
    pub loan_date: NaiveDate,
    pub due_date: NaiveDate,
}

impl NewLendingRecord {
    /// Loan starting `loan_date`, due `loan_period_days` later
    pub fn new(
        member_id: impl Into<String>,
        item_id: impl Into<String>,
        loan_date: NaiveDate,
        loan_period_days: u32,
    ) -> Self {
        let due_date = loan_date
            .checked_add_days(Days::new(loan_period_days as u64))
            .unwrap_or(NaiveDate::MAX);

        NewLendingRecord {
            member_id: member_id.into(),
            item_id: item_id.into(),
            loan_date,
            due_date,
        }
    }
}

impl Draft for NewLendingRecord {
    type Record = LendingRecord;

    fn into_record(self, id: String) -> LendingRecord {
        LendingRecord {
            id,
            operation: LendingOp::Borrow,
            member_id: self.member_id,
            item_id: self.item_id,
            loan_date: format_date(self.loan_date),
            due_date: format_date(self.due_date),
            return_date: RETURN_PENDING.to_string(),
            status: LoanStatus::Outstanding,
        }
    }
}
