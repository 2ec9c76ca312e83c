//! Lend and return across the catalog and lending stores
//!
//! Neither operation is atomic. Each is two durable writes to two files:
//!
//! ```text
//! lend:    intent → catalog (copies - 1) → lending (append loan)   → clear
//! return:  intent → lending (close loan) → catalog (copies + 1)    → clear
//! ```
//!
//! A crash between the two writes leaves the stores disagreeing. The
//! intent written first lets [`Sequencer::recover`] finish the operation on
//! the next open. Nothing is rolled back.

use crate::codec::Slot;
use crate::entities::lending::{format_date, parse_date, NewLendingRecord, RETURN_PENDING};
use crate::entities::{
    CatalogStore, LendingOp, LendingRecord, LendingStore, LoanStatus, MemberStore,
};
use crate::error::{Result, ShelfError};
use crate::intent::{Intent, IntentLog};
use crate::store::Draft;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Result of a lend request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum LendOutcome {
    MemberNotFound {
        member_id: String,
    },
    MemberInactive {
        member_id: String,
    },
    /// Member accepted; one outcome per requested item, in input order
    Processed {
        member_id: String,
        items: Vec<ItemLendOutcome>,
    },
}

impl LendOutcome {
    /// Loans created by this request
    pub fn lent(&self) -> impl Iterator<Item = &ItemLendOutcome> {
        let items: &[ItemLendOutcome] = match self {
            LendOutcome::Processed { items, .. } => items.as_slice(),
            _ => &[],
        };
        items
            .iter()
            .filter(|o| matches!(o, ItemLendOutcome::Lent { .. }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ItemLendOutcome {
    Lent {
        item_id: String,
        loan_id: String,
        due_date: String,
    },
    LimitReached {
        item_id: String,
        max_loans: u32,
    },
    ItemNotFound {
        item_id: String,
    },
    ItemInactive {
        item_id: String,
    },
    NoCopiesAvailable {
        item_id: String,
    },
    /// Lending store has no identifiers left for a new loan
    IdentifiersExhausted {
        item_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ReturnOutcome {
    Returned { loan_id: String, item_id: String },
    /// Loan closed, but the item no longer exists or is deleted
    ReturnedItemMissing { loan_id: String, item_id: String },
    NotFound { loan_id: String },
    AlreadyClosed { loan_id: String },
}

/// Borrowed view over the stores one lend/return touches
pub struct Sequencer<'a> {
    catalog: &'a mut CatalogStore,
    members: &'a MemberStore,
    lending: &'a mut LendingStore,
    intents: &'a mut IntentLog,
    loan_period_days: u32,
}

impl<'a> Sequencer<'a> {
    pub fn new(
        catalog: &'a mut CatalogStore,
        members: &'a MemberStore,
        lending: &'a mut LendingStore,
        intents: &'a mut IntentLog,
        loan_period_days: u32,
    ) -> Self {
        Sequencer {
            catalog,
            members,
            lending,
            intents,
            loan_period_days,
        }
    }

    /// Lend each of `item_ids` to `member_id` on `today`
    ///
    /// Items are handled one at a time; a refused item does not stop the
    /// rest. Storage errors abort the request.
    pub fn lend<S: AsRef<str>>(
        &mut self,
        member_id: &str,
        item_ids: &[S],
        today: NaiveDate,
    ) -> Result<LendOutcome> {
        let member = match self.members.find_by_id(member_id)? {
            None => {
                return Ok(LendOutcome::MemberNotFound {
                    member_id: member_id.to_string(),
                })
            }
            Some((_, Slot::Free { .. })) => {
                return Ok(LendOutcome::MemberInactive {
                    member_id: member_id.to_string(),
                })
            }
            Some((_, Slot::Active(member))) => member,
        };

        let mut borrowed = self.outstanding_for(member_id)?;
        let mut items = Vec::with_capacity(item_ids.len());

        for item_id in item_ids.iter().map(|s| s.as_ref().trim()) {
            if item_id.is_empty() {
                continue;
            }

            if borrowed >= member.max_loans {
                items.push(ItemLendOutcome::LimitReached {
                    item_id: item_id.to_string(),
                    max_loans: member.max_loans,
                });
                continue;
            }

            let outcome = self.lend_one(member_id, item_id, today)?;
            if matches!(outcome, ItemLendOutcome::Lent { .. }) {
                borrowed += 1;
            }
            items.push(outcome);
        }

        Ok(LendOutcome::Processed {
            member_id: member_id.to_string(),
            items,
        })
    }

    fn lend_one(
        &mut self,
        member_id: &str,
        item_id: &str,
        today: NaiveDate,
    ) -> Result<ItemLendOutcome> {
        let (item_index, mut item) = match self.catalog.find_by_id(item_id)? {
            None => {
                return Ok(ItemLendOutcome::ItemNotFound {
                    item_id: item_id.to_string(),
                })
            }
            Some((_, Slot::Free { .. })) => {
                return Ok(ItemLendOutcome::ItemInactive {
                    item_id: item_id.to_string(),
                })
            }
            Some((index, Slot::Active(item))) => (index, item),
        };

        if item.copies_available == 0 {
            return Ok(ItemLendOutcome::NoCopiesAvailable {
                item_id: item_id.to_string(),
            });
        }

        let loan_id = match self.lending.next_id() {
            Ok(id) => id,
            Err(ShelfError::IdentifiersExhausted { prefix }) => {
                warn!("No {} identifiers left; cannot lend {}", prefix, item_id);
                return Ok(ItemLendOutcome::IdentifiersExhausted {
                    item_id: item_id.to_string(),
                });
            }
            Err(e) => return Err(e),
        };
        let loan = NewLendingRecord::new(member_id, item_id, today, self.loan_period_days)
            .into_record(loan_id.clone());

        self.intents.record(&Intent::Lend {
            loan_id: loan_id.clone(),
            member_id: member_id.to_string(),
            item_id: item_id.to_string(),
            copies_before: item.copies_available,
            loan_date: loan.loan_date.clone(),
            due_date: loan.due_date.clone(),
        })?;

        item.copies_available -= 1;
        self.catalog.write(item_index, &item)?;
        let loan_index = self.lending.append_or_reuse(&loan)?;

        self.intents.clear()?;

        debug!(
            "Lent {} to {} as {} (slot {}), due {}",
            item_id, member_id, loan_id, loan_index, loan.due_date
        );

        Ok(ItemLendOutcome::Lent {
            item_id: item_id.to_string(),
            loan_id,
            due_date: loan.due_date,
        })
    }

    /// Close each of `loan_ids` as returned on `today`
    pub fn return_loans<S: AsRef<str>>(
        &mut self,
        loan_ids: &[S],
        today: NaiveDate,
    ) -> Result<Vec<ReturnOutcome>> {
        let mut outcomes = Vec::with_capacity(loan_ids.len());

        for loan_id in loan_ids.iter().map(|s| s.as_ref().trim()) {
            if loan_id.is_empty() {
                continue;
            }
            outcomes.push(self.return_one(loan_id, today)?);
        }

        Ok(outcomes)
    }

    fn return_one(&mut self, loan_id: &str, today: NaiveDate) -> Result<ReturnOutcome> {
        let (loan_index, mut loan) = match self.lending.find_by_id(loan_id)? {
            None => {
                return Ok(ReturnOutcome::NotFound {
                    loan_id: loan_id.to_string(),
                })
            }
            Some((index, slot)) => (index, slot.into_record()),
        };

        if !loan.is_outstanding() {
            return Ok(ReturnOutcome::AlreadyClosed {
                loan_id: loan_id.to_string(),
            });
        }

        let item = match self.catalog.find_by_id(&loan.item_id)? {
            Some((index, Slot::Active(item))) => Some((index, item)),
            _ => None,
        };

        self.intents.record(&Intent::Return {
            loan_id: loan_id.to_string(),
            item_id: loan.item_id.clone(),
            copies_before: item.as_ref().map(|(_, item)| item.copies_available),
            return_date: format_date(today),
        })?;

        loan.close(today);
        self.lending.write(loan_index, &loan)?;

        let outcome = match item {
            Some((item_index, mut item)) => {
                item.copies_available = item.copies_available.saturating_add(1);
                self.catalog.write(item_index, &item)?;
                ReturnOutcome::Returned {
                    loan_id: loan_id.to_string(),
                    item_id: loan.item_id,
                }
            }
            None => {
                warn!(
                    "Loan {} closed but item {} is missing or deleted",
                    loan_id, loan.item_id
                );
                ReturnOutcome::ReturnedItemMissing {
                    loan_id: loan_id.to_string(),
                    item_id: loan.item_id,
                }
            }
        };

        self.intents.clear()?;
        Ok(outcome)
    }

    /// Outstanding loans currently held by `member_id`
    pub fn outstanding_for(&self, member_id: &str) -> Result<u32> {
        let mut count = 0;
        for entry in self.lending.list_all() {
            let (_, slot) = entry?;
            let loan = slot.record();
            if loan.member_id == member_id && loan.is_outstanding() {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Finish a half-applied lend or return left by a crash
    ///
    /// Returns the intent that was replayed, if any.
    pub fn recover(&mut self) -> Result<Option<Intent>> {
        let intent = match self.intents.pending()? {
            None => return Ok(None),
            Some(intent) => intent,
        };

        info!("Replaying pending intent {:?}", intent);

        match &intent {
            Intent::Lend {
                loan_id,
                member_id,
                item_id,
                copies_before,
                loan_date,
                due_date,
            } => {
                if self.lending.find_by_id(loan_id)?.is_none() {
                    if let Some((index, Slot::Active(mut item))) =
                        self.catalog.find_by_id(item_id)?
                    {
                        if item.copies_available == *copies_before && *copies_before > 0 {
                            item.copies_available -= 1;
                            self.catalog.write(index, &item)?;
                        }
                    }

                    let loan = LendingRecord {
                        id: loan_id.clone(),
                        operation: LendingOp::Borrow,
                        member_id: member_id.clone(),
                        item_id: item_id.clone(),
                        loan_date: loan_date.clone(),
                        due_date: due_date.clone(),
                        return_date: RETURN_PENDING.to_string(),
                        status: LoanStatus::Outstanding,
                    };
                    self.lending.append_or_reuse(&loan)?;
                }
            }
            Intent::Return {
                loan_id,
                item_id,
                copies_before,
                return_date,
            } => {
                if let Some((index, slot)) = self.lending.find_by_id(loan_id)? {
                    let mut loan = slot.into_record();
                    if loan.is_outstanding() {
                        loan.close(
                            parse_date(return_date)
                                .unwrap_or_else(|| chrono::Local::now().date_naive()),
                        );
                        self.lending.write(index, &loan)?;
                    }
                }

                if let Some(before) = copies_before {
                    if let Some((index, Slot::Active(mut item))) =
                        self.catalog.find_by_id(item_id)?
                    {
                        if item.copies_available == *before {
                            item.copies_available = before.saturating_add(1);
                            self.catalog.write(index, &item)?;
                        }
                    }
                }
            }
        }

        self.intents.clear()?;
        Ok(Some(intent))
    }
}
