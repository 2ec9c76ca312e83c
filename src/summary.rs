//! Aggregate counts over all three stores

use crate::codec::Record;
use crate::entities::{CatalogItem, LendingOp, LendingRecord, Member};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MostBorrowed {
    pub item_id: String,
    /// Title, if the item is still in the catalog
    pub title: Option<String>,
    pub count: usize,
}

/// Snapshot of catalog and lending totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibrarySummary {
    pub total_items: usize,
    pub active_items: usize,
    pub deleted_items: usize,
    /// Loans still outstanding
    pub borrowed_now: usize,
    /// Sum of available copies over active items
    pub available_now: u64,
    pub most_borrowed: Option<MostBorrowed>,
    pub active_members: usize,
}

impl LibrarySummary {
    pub fn compute(items: &[CatalogItem], members: &[Member], loans: &[LendingRecord]) -> Self {
        let active_items = items.iter().filter(|i| i.is_active()).count();

        // Returning rewrites the operation to Return, so this tallies
        // borrows that are still open.
        let mut borrow_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for loan in loans.iter().filter(|l| l.operation == LendingOp::Borrow) {
            *borrow_counts.entry(loan.item_id.as_str()).or_default() += 1;
        }

        let most_borrowed = borrow_counts
            .iter()
            .fold(None::<(&str, usize)>, |best, (&id, &count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((id, count)),
            })
            .map(|(item_id, count)| MostBorrowed {
                item_id: item_id.to_string(),
                title: items
                    .iter()
                    .find(|i| i.id == item_id)
                    .map(|i| i.title.clone()),
                count,
            });

        LibrarySummary {
            total_items: items.len(),
            active_items,
            deleted_items: items.len() - active_items,
            borrowed_now: loans.iter().filter(|l| l.is_outstanding()).count(),
            available_now: items
                .iter()
                .filter(|i| i.is_active())
                .map(|i| i.copies_available as u64)
                .sum(),
            most_borrowed,
            active_members: members.iter().filter(|m| m.is_active()).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::RecordStatus;
    use crate::entities::{LoanStatus, NewLendingRecord};
    use crate::store::Draft;
    use chrono::NaiveDate;

    fn item(id: &str, copies: u32, status: RecordStatus) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            title: format!("Title {}", id),
            category: String::new(),
            creator: String::new(),
            publisher: String::new(),
            year: String::new(),
            copies_available: copies,
            status,
        }
    }

    fn loan(id: &str, item_id: &str) -> LendingRecord {
        NewLendingRecord::new("M001", item_id, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 7)
            .into_record(id.to_string())
    }

    #[test]
    fn test_empty() {
        let summary = LibrarySummary::compute(&[], &[], &[]);
        assert_eq!(summary.total_items, 0);
        assert_eq!(summary.most_borrowed, None);
    }

    #[test]
    fn test_counts() {
        let items = vec![
            item("B001", 2, RecordStatus::Active),
            item("B002", 9, RecordStatus::Deleted),
            item("B003", 1, RecordStatus::Active),
        ];
        let mut closed = loan("L003", "B001");
        closed.close(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        let loans = vec![loan("L001", "B003"), loan("L002", "B003"), closed];

        let summary = LibrarySummary::compute(&items, &[], &loans);

        assert_eq!(summary.total_items, 3);
        assert_eq!(summary.active_items, 2);
        assert_eq!(summary.deleted_items, 1);
        assert_eq!(summary.available_now, 3);
        assert_eq!(summary.borrowed_now, 2);
        assert_eq!(
            summary.most_borrowed,
            Some(MostBorrowed {
                item_id: "B003".to_string(),
                title: Some("Title B003".to_string()),
                count: 2,
            })
        );
        assert_eq!(loans[2].status, LoanStatus::Closed);
    }

    #[test]
    fn test_most_borrowed_tie_goes_to_lowest_id() {
        let loans = vec![loan("L001", "B002"), loan("L002", "B001")];
        let summary = LibrarySummary::compute(&[], &[], &loans);
        let most = summary.most_borrowed.unwrap();
        assert_eq!(most.item_id, "B001");
        assert_eq!(most.title, None);
    }
}
