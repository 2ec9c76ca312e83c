//! Library facade over the three stores

use crate::codec::Slot;
use crate::config::LibraryConfig;
use crate::entities::{
    CatalogItem, CatalogItemPatch, CatalogStore, LendingRecord, LendingStore, Member,
    MemberPatch, MemberStore, NewCatalogItem, NewMember,
};
use crate::error::Result;
use crate::intent::{Intent, IntentLog};
use crate::sequencer::{LendOutcome, ReturnOutcome, Sequencer};
use crate::store::{Created, DeleteOutcome, UpdateOutcome};
use crate::summary::LibrarySummary;
use chrono::NaiveDate;
use parking_lot::Mutex;
use tracing::{debug, info};

struct Stores {
    catalog: CatalogStore,
    members: MemberStore,
    lending: LendingStore,
    intents: IntentLog,
}

impl Stores {
    fn sequencer(&mut self, loan_period_days: u32) -> Sequencer<'_> {
        Sequencer::new(
            &mut self.catalog,
            &self.members,
            &mut self.lending,
            &mut self.intents,
            loan_period_days,
        )
    }
}

/// Catalog, member and lending stores opened together
///
/// Every operation takes one lock for its whole duration, so the two writes
/// of a lend or return never interleave with another operation.
pub struct Library {
    config: LibraryConfig,
    stores: Mutex<Stores>,
    recovered: Option<Intent>,
}

impl Library {
    /// Open every store under `config.data_dir`, replaying any
    /// half-finished lend or return
    pub fn open(config: LibraryConfig) -> Result<Self> {
        config.check()?;
        std::fs::create_dir_all(&config.data_dir)?;

        let sync = config.sync_writes;
        let mut stores = Stores {
            catalog: CatalogStore::open_with(config.catalog_path(), sync)?,
            members: MemberStore::open_with(config.members_path(), sync)?,
            lending: LendingStore::open_with(config.lending_path(), sync)?,
            intents: IntentLog::open(config.intent_path(), sync)?,
        };

        let recovered = stores.sequencer(config.loan_period_days).recover()?;

        info!(
            "Opened library at {:?} ({} items, {} members, {} loans)",
            config.data_dir,
            stores.catalog.record_count(),
            stores.members.record_count(),
            stores.lending.record_count()
        );

        Ok(Library {
            config,
            stores: Mutex::new(stores),
            recovered,
        })
    }

    /// Open with default settings rooted at `data_dir`
    pub fn open_dir<P: Into<std::path::PathBuf>>(data_dir: P) -> Result<Self> {
        Self::open(LibraryConfig::with_data_dir(data_dir))
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    /// Intent replayed while opening, if the last run stopped mid-operation
    pub fn recovered(&self) -> Option<&Intent> {
        self.recovered.as_ref()
    }

    pub fn add_item(&self, item: NewCatalogItem) -> Result<Created> {
        let created = self.stores.lock().catalog.create(item)?;
        debug!("Added item {} at slot {}", created.id, created.index);
        Ok(created)
    }

    pub fn update_item(&self, id: &str, patch: CatalogItemPatch) -> Result<UpdateOutcome> {
        self.stores.lock().catalog.update(id, patch)
    }

    pub fn delete_item(&self, id: &str) -> Result<DeleteOutcome> {
        self.stores.lock().catalog.soft_delete(id)
    }

    /// Every catalog item, deleted ones included
    pub fn items(&self) -> Result<Vec<CatalogItem>> {
        self.stores.lock().catalog.list()
    }

    pub fn item(&self, id: &str) -> Result<Option<CatalogItem>> {
        Ok(self
            .stores
            .lock()
            .catalog
            .find_by_id(id)?
            .map(|(_, slot)| slot.into_record()))
    }

    /// Add a member; a missing loan limit takes the configured default
    pub fn add_member(&self, mut member: NewMember) -> Result<Created> {
        member.max_loans = member.max_loans.or(Some(self.config.default_max_loans));
        let created = self.stores.lock().members.create(member)?;
        debug!("Added member {} at slot {}", created.id, created.index);
        Ok(created)
    }

    pub fn update_member(&self, id: &str, patch: MemberPatch) -> Result<UpdateOutcome> {
        self.stores.lock().members.update(id, patch)
    }

    pub fn delete_member(&self, id: &str) -> Result<DeleteOutcome> {
        self.stores.lock().members.soft_delete(id)
    }

    pub fn members(&self) -> Result<Vec<Member>> {
        self.stores.lock().members.list()
    }

    pub fn member(&self, id: &str) -> Result<Option<Member>> {
        Ok(self
            .stores
            .lock()
            .members
            .find_by_id(id)?
            .map(|(_, slot)| slot.into_record()))
    }

    pub fn loans(&self) -> Result<Vec<LendingRecord>> {
        self.stores.lock().lending.list()
    }

    pub fn loan(&self, id: &str) -> Result<Option<LendingRecord>> {
        Ok(self
            .stores
            .lock()
            .lending
            .find_by_id(id)?
            .map(|(_, slot)| slot.into_record()))
    }

    /// Outstanding loans for `member_id`
    pub fn outstanding_loans(&self, member_id: &str) -> Result<Vec<LendingRecord>> {
        let stores = self.stores.lock();
        let mut loans = Vec::new();
        for entry in stores.lending.list_all() {
            if let (_, Slot::Active(loan)) = entry? {
                if loan.member_id == member_id {
                    loans.push(loan);
                }
            }
        }
        Ok(loans)
    }

    /// Lend items to a member as of today's local date
    pub fn lend<S: AsRef<str>>(&self, member_id: &str, item_ids: &[S]) -> Result<LendOutcome> {
        self.lend_on(member_id, item_ids, chrono::Local::now().date_naive())
    }

    pub fn lend_on<S: AsRef<str>>(
        &self,
        member_id: &str,
        item_ids: &[S],
        today: NaiveDate,
    ) -> Result<LendOutcome> {
        let mut stores = self.stores.lock();
        stores
            .sequencer(self.config.loan_period_days)
            .lend(member_id, item_ids, today)
    }

    /// Return loans as of today's local date
    pub fn return_loans<S: AsRef<str>>(&self, loan_ids: &[S]) -> Result<Vec<ReturnOutcome>> {
        self.return_loans_on(loan_ids, chrono::Local::now().date_naive())
    }

    pub fn return_loans_on<S: AsRef<str>>(
        &self,
        loan_ids: &[S],
        today: NaiveDate,
    ) -> Result<Vec<ReturnOutcome>> {
        let mut stores = self.stores.lock();
        stores
            .sequencer(self.config.loan_period_days)
            .return_loans(loan_ids, today)
    }

    pub fn summary(&self) -> Result<LibrarySummary> {
        let stores = self.stores.lock();
        Ok(LibrarySummary::compute(
            &stores.catalog.list()?,
            &stores.members.list()?,
            &stores.lending.list()?,
        ))
    }
}
