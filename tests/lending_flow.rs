//! End-to-end lend and return through the library facade

use chrono::NaiveDate;
use shelf::{
    CatalogItemPatch, Draft, ItemLendOutcome, LendOutcome, LendingOp, LendingStore, Library,
    LibraryConfig, LoanStatus, NewCatalogItem, NewLendingRecord, NewMember, ReturnOutcome,
    ShelfError, UpdateOutcome,
};
use tempfile::TempDir;

fn open(dir: &TempDir) -> Library {
    let config = LibraryConfig {
        sync_writes: false,
        ..LibraryConfig::with_data_dir(dir.path())
    };
    Library::open(config).unwrap()
}

fn book(title: &str, copies: u32) -> NewCatalogItem {
    NewCatalogItem {
        title: title.to_string(),
        category: "Novel".to_string(),
        creator: "Writer".to_string(),
        publisher: "House".to_string(),
        year: "1980".to_string(),
        copies_available: copies,
    }
}

fn member(name: &str, max_loans: Option<u32>) -> NewMember {
    NewMember {
        name: name.to_string(),
        birth_date: "1985-05-05".to_string(),
        max_loans,
    }
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

#[test]
fn test_lend_then_return() {
    let dir = TempDir::new().unwrap();
    let library = open(&dir);

    assert_eq!(library.add_item(book("Dune", 2)).unwrap().id, "B001");
    assert_eq!(library.add_member(member("Ada", None)).unwrap().id, "M001");

    let outcome = library.lend_on("M001", &["B001"], day(1)).unwrap();
    assert_eq!(
        outcome,
        LendOutcome::Processed {
            member_id: "M001".to_string(),
            items: vec![ItemLendOutcome::Lent {
                item_id: "B001".to_string(),
                loan_id: "L001".to_string(),
                due_date: "2024-03-08".to_string(),
            }],
        }
    );

    assert_eq!(library.item("B001").unwrap().unwrap().copies_available, 1);
    let loan = library.loan("L001").unwrap().unwrap();
    assert_eq!(loan.operation, LendingOp::Borrow);
    assert_eq!(loan.status, LoanStatus::Outstanding);
    assert_eq!(loan.loan_date, "2024-03-01");
    assert_eq!(loan.return_date, "-");
    assert_eq!(library.outstanding_loans("M001").unwrap().len(), 1);

    let returned = library.return_loans_on(&["L001"], day(4)).unwrap();
    assert_eq!(
        returned,
        vec![ReturnOutcome::Returned {
            loan_id: "L001".to_string(),
            item_id: "B001".to_string(),
        }]
    );

    assert_eq!(library.item("B001").unwrap().unwrap().copies_available, 2);
    let loan = library.loan("L001").unwrap().unwrap();
    assert_eq!(loan.operation, LendingOp::Return);
    assert_eq!(loan.status, LoanStatus::Closed);
    assert_eq!(loan.return_date, "2024-03-04");
    assert!(library.outstanding_loans("M001").unwrap().is_empty());

    assert_eq!(
        library.return_loans_on(&["L001", "L404"], day(5)).unwrap(),
        vec![
            ReturnOutcome::AlreadyClosed {
                loan_id: "L001".to_string()
            },
            ReturnOutcome::NotFound {
                loan_id: "L404".to_string()
            },
        ]
    );
}

#[test]
fn test_deleted_item_cannot_be_lent() {
    let dir = TempDir::new().unwrap();
    let library = open(&dir);

    library.add_item(book("Gone", 3)).unwrap();
    library.add_member(member("Bo", None)).unwrap();
    library.delete_item("B001").unwrap();

    let outcome = library.lend_on("M001", &["B001", "B002"], day(1)).unwrap();
    assert_eq!(
        outcome,
        LendOutcome::Processed {
            member_id: "M001".to_string(),
            items: vec![
                ItemLendOutcome::ItemInactive {
                    item_id: "B001".to_string()
                },
                ItemLendOutcome::ItemNotFound {
                    item_id: "B002".to_string()
                },
            ],
        }
    );
    assert!(library.loans().unwrap().is_empty());
    assert_eq!(
        library
            .update_item("B001", CatalogItemPatch::default())
            .unwrap(),
        UpdateOutcome::Inactive
    );
}

#[test]
fn test_loan_limit_applies_within_one_request() {
    let dir = TempDir::new().unwrap();
    let library = open(&dir);

    for title in ["A", "B", "C"] {
        library.add_item(book(title, 1)).unwrap();
    }
    library.add_member(member("Cy", Some(2))).unwrap();

    let outcome = library
        .lend_on("M001", &["B001", "B002", "B003"], day(10))
        .unwrap();
    let LendOutcome::Processed { items, .. } = &outcome else {
        panic!("member should be accepted: {:?}", outcome);
    };

    assert_eq!(outcome.lent().count(), 2);
    assert_eq!(
        items[2],
        ItemLendOutcome::LimitReached {
            item_id: "B003".to_string(),
            max_loans: 2
        }
    );
    assert_eq!(library.item("B003").unwrap().unwrap().copies_available, 1);

    // Returning one frees room for another.
    library.return_loans_on(&["L001"], day(11)).unwrap();
    let outcome = library.lend_on("M001", &["B003"], day(12)).unwrap();
    assert_eq!(outcome.lent().count(), 1);
}

#[test]
fn test_default_max_loans_from_config() {
    let dir = TempDir::new().unwrap();
    let config = LibraryConfig {
        default_max_loans: 1,
        loan_period_days: 14,
        sync_writes: false,
        ..LibraryConfig::with_data_dir(dir.path())
    };
    let library = Library::open(config).unwrap();

    library.add_item(book("X", 5)).unwrap();
    library.add_member(member("Di", None)).unwrap();
    assert_eq!(library.member("M001").unwrap().unwrap().max_loans, 1);

    let outcome = library.lend_on("M001", &["B001", "B001"], day(1)).unwrap();
    let LendOutcome::Processed { items, .. } = outcome else {
        panic!("member should be accepted");
    };
    assert!(matches!(
        &items[0],
        ItemLendOutcome::Lent { due_date, .. } if due_date == "2024-03-15"
    ));
    assert!(matches!(items[1], ItemLendOutcome::LimitReached { .. }));
}

#[test]
fn test_unknown_and_deleted_members() {
    let dir = TempDir::new().unwrap();
    let library = open(&dir);

    library.add_item(book("Y", 1)).unwrap();
    library.add_member(member("Ed", None)).unwrap();
    library.delete_member("M001").unwrap();

    assert_eq!(
        library.lend_on("M001", &["B001"], day(1)).unwrap(),
        LendOutcome::MemberInactive {
            member_id: "M001".to_string()
        }
    );
    assert_eq!(
        library.lend_on("M002", &["B001"], day(1)).unwrap(),
        LendOutcome::MemberNotFound {
            member_id: "M002".to_string()
        }
    );
}

#[test]
fn test_closed_loans_are_not_recycled() {
    let dir = TempDir::new().unwrap();
    let library = open(&dir);

    library.add_item(book("Z", 2)).unwrap();
    library.add_member(member("Fa", None)).unwrap();
    library.lend_on("M001", &["B001"], day(1)).unwrap();
    library.return_loans_on(&["L001"], day(2)).unwrap();
    library.lend_on("M001", &["B001"], day(3)).unwrap();

    let loans = library.loans().unwrap();
    assert_eq!(loans.len(), 2);
    assert_eq!(loans[0].id, "L001");
    assert_eq!(loans[1].id, "L002");
}

#[test]
fn test_summary() {
    let dir = TempDir::new().unwrap();
    let library = open(&dir);

    library.add_item(book("P", 3)).unwrap();
    library.add_item(book("Q", 1)).unwrap();
    library.add_item(book("R", 1)).unwrap();
    library.add_member(member("Gi", None)).unwrap();
    library.delete_item("B003").unwrap();
    library.lend_on("M001", &["B001", "B001", "B002"], day(1)).unwrap();

    let summary = library.summary().unwrap();
    assert_eq!(summary.total_items, 3);
    assert_eq!(summary.active_items, 2);
    assert_eq!(summary.deleted_items, 1);
    assert_eq!(summary.borrowed_now, 3);
    assert_eq!(summary.available_now, 1);
    assert_eq!(summary.active_members, 1);
    let most = summary.most_borrowed.unwrap();
    assert_eq!(most.item_id, "B001");
    assert_eq!(most.count, 2);
}

#[test]
fn test_library_open_twice_is_locked() {
    let dir = TempDir::new().unwrap();
    let _library = open(&dir);

    let second = Library::open(LibraryConfig::with_data_dir(dir.path()));
    assert!(matches!(second, Err(ShelfError::StoreLocked(_))));
}

#[test]
fn test_invalid_config_rejected() {
    let dir = TempDir::new().unwrap();
    let config = LibraryConfig {
        loan_period_days: 0,
        ..LibraryConfig::with_data_dir(dir.path())
    };
    assert!(matches!(Library::open(config), Err(ShelfError::Config(_))));
}

#[test]
fn test_exhausted_loan_ids_reported_per_item() {
    let dir = TempDir::new().unwrap();
    let config = LibraryConfig {
        sync_writes: false,
        ..LibraryConfig::with_data_dir(dir.path())
    };
    {
        let mut lending = LendingStore::open_with(config.lending_path(), false).unwrap();
        let mut old = NewLendingRecord::new("M900", "B900", day(1), 7).into_record("L998".into());
        old.close(day(2));
        lending.append_or_reuse(&old).unwrap();
    }

    let library = Library::open(config).unwrap();
    library.add_item(book("First", 1)).unwrap();
    library.add_item(book("Second", 1)).unwrap();
    library.add_member(member("Ix", None)).unwrap();

    let outcome = library.lend_on("M001", &["B001", "B002"], day(3)).unwrap();
    assert_eq!(
        outcome,
        LendOutcome::Processed {
            member_id: "M001".to_string(),
            items: vec![
                ItemLendOutcome::Lent {
                    item_id: "B001".to_string(),
                    loan_id: "L999".to_string(),
                    due_date: "2024-03-10".to_string(),
                },
                ItemLendOutcome::IdentifiersExhausted {
                    item_id: "B002".to_string()
                },
            ],
        }
    );

    assert_eq!(library.item("B001").unwrap().unwrap().copies_available, 0);
    assert_eq!(library.item("B002").unwrap().unwrap().copies_available, 1);
    let ids: Vec<String> = library.loans().unwrap().into_iter().map(|l| l.id).collect();
    assert_eq!(ids, vec!["L998", "L999"]);
}
