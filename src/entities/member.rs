//! Library members

use crate::codec::{FieldReader, FieldWriter, Record, RecordStatus, TRAILER_SIZE};
use crate::ids::ID_WIDTH;
use crate::store::{Draft, Patch, RecordStore};
use serde::{Deserialize, Serialize};

pub const NAME_WIDTH: usize = 50;
pub const BIRTH_DATE_WIDTH: usize = 10;

/// Concurrent loan limit for members created without an explicit one
pub const DEFAULT_MAX_LOANS: u32 = 5;

pub type MemberStore = RecordStore<Member>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub name: String,
    /// `YYYY-MM-DD`, stored as entered
    pub birth_date: String,
    pub max_loans: u32,
    pub status: RecordStatus,
}

impl Record for Member {
    const KIND: &'static str = "member";
    const ID_PREFIX: char = 'M';
    const WIDTH: usize = ID_WIDTH + NAME_WIDTH + BIRTH_DATE_WIDTH + 4 + TRAILER_SIZE;

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
            .text(&self.name, NAME_WIDTH)
            .text(&self.birth_date, BIRTH_DATE_WIDTH)
            .u32(self.max_loans)
            .u8(self.status as u8);
    }

    fn read_fields(r: &mut FieldReader<'_>) -> Self {
        Member {
            id: r.text(ID_WIDTH),
            name: r.text(NAME_WIDTH),
            birth_date: r.text(BIRTH_DATE_WIDTH),
            max_loans: r.u32(),
            status: RecordStatus::from_u8(r.u8()),
        }
    }
}

/// Fields for a new member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMember {
    pub name: String,
    pub birth_date: String,
    /// Falls back to [`DEFAULT_MAX_LOANS`]
    #[serde(default)]
    pub max_loans: Option<u32>,
}

impl Draft for NewMember {
    type Record = Member;

    fn into_record(self, id: String) -> Member {
        Member {
            id,
            name: self.name,
            birth_date: self.birth_date,
            max_loans: self.max_loans.unwrap_or(DEFAULT_MAX_LOANS),
            status: RecordStatus::Active,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberPatch {
    pub name: Option<String>,
    pub birth_date: Option<String>,
    pub max_loans: Option<u32>,
}

impl Patch<Member> for MemberPatch {
    fn apply_to(self, member: &mut Member) {
        if let Some(name) = self.name {
            member.name = name;
        }
        if let Some(birth_date) = self.birth_date {
            member.birth_date = birth_date;
        }
        if let Some(max_loans) = self.max_loans {
            member.max_loans = max_loans;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Slot;

    #[test]
    fn test_width() {
        assert_eq!(Member::WIDTH, 73);
    }

    #[test]
    fn test_default_max_loans() {
        let member = NewMember {
            name: "Ada".to_string(),
            birth_date: "1990-01-31".to_string(),
            max_loans: None,
        }
        .into_record("M001".to_string());

        assert_eq!(member.max_loans, DEFAULT_MAX_LOANS);
        assert!(member.is_active());
    }

    #[test]
    fn test_freed_member_round_trip() {
        let member = NewMember {
            name: "Grace".to_string(),
            birth_date: "1985-12-09".to_string(),
            max_loans: Some(2),
        }
        .into_record("M004".to_string());

        let bytes = Slot::free(member.clone(), 7).encode();
        assert_eq!(bytes[68], 0);

        match Slot::<Member>::decode(&bytes).unwrap() {
            Slot::Free { next_free, record } => {
                assert_eq!(next_free, 7);
                assert_eq!(record.name, "Grace");
                assert_eq!(record.status, RecordStatus::Deleted);
            }
            other => panic!("expected free slot, got {:?}", other),
        }
    }

    #[test]
    fn test_short_input_is_malformed() {
        assert!(matches!(
            Slot::<Member>::decode(&[0u8; 72]),
            Err(crate::error::ShelfError::MalformedRecord {
                expected: 73,
                actual: 72,
                ..
            })
        ));
    }
}
