//! Patrol roster with its team-leader invariant.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode, UserId};

/// Smallest roster a shift may run with.
pub const MIN_ROSTER_SIZE: usize = 2;

/// One officer assigned to a shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterMember {
    pub officer_id: UserId,
    pub is_leader: bool,
}

impl RosterMember {
    pub fn member(officer_id: UserId) -> Self {
        Self {
            officer_id,
            is_leader: false,
        }
    }

    pub fn leader(officer_id: UserId) -> Self {
        Self {
            officer_id,
            is_leader: true,
        }
    }
}

/// Officers assigned to a shift.
///
/// # Invariants
///
/// - at least [`MIN_ROSTER_SIZE`] members
/// - no officer appears twice
/// - exactly one member is flagged team leader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<RosterMember>", into = "Vec<RosterMember>")]
pub struct Roster {
    members: Vec<RosterMember>,
}

impl Roster {
    /// Builds a roster, validating every invariant.
    pub fn new(members: Vec<RosterMember>) -> Result<Self, DomainError> {
        Self::validate(&members)?;
        Ok(Self { members })
    }

    pub fn members(&self) -> &[RosterMember] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns the current team leader.
    pub fn leader(&self) -> Option<&UserId> {
        self.members
            .iter()
            .find(|m| m.is_leader)
            .map(|m| &m.officer_id)
    }

    pub fn contains(&self, officer_id: &UserId) -> bool {
        self.members.iter().any(|m| &m.officer_id == officer_id)
    }

    /// Iterates over every rostered officer.
    pub fn officer_ids(&self) -> impl Iterator<Item = &UserId> {
        self.members.iter().map(|m| &m.officer_id)
    }

    /// Adds an officer. A second leader is refused; use [`Roster::set_leader`].
    pub fn add_member(&mut self, member: RosterMember) -> Result<(), DomainError> {
        let mut next = self.members.clone();
        next.push(member);
        Self::validate(&next)?;
        self.members = next;
        Ok(())
    }

    /// Removes an officer. Removing the leader or shrinking below the
    /// minimum size is refused.
    pub fn remove_member(&mut self, officer_id: &UserId) -> Result<(), DomainError> {
        if !self.contains(officer_id) {
            return Err(roster_error(format!(
                "Officer {} is not on this roster",
                officer_id
            )));
        }
        let next: Vec<RosterMember> = self
            .members
            .iter()
            .filter(|m| &m.officer_id != officer_id)
            .cloned()
            .collect();
        Self::validate(&next)?;
        self.members = next;
        Ok(())
    }

    /// Moves the leader flag to an existing member.
    pub fn set_leader(&mut self, officer_id: &UserId) -> Result<(), DomainError> {
        if !self.contains(officer_id) {
            return Err(roster_error(format!(
                "Officer {} is not on this roster",
                officer_id
            )));
        }
        for member in &mut self.members {
            member.is_leader = &member.officer_id == officer_id;
        }
        Ok(())
    }

    fn validate(members: &[RosterMember]) -> Result<(), DomainError> {
        if members.len() < MIN_ROSTER_SIZE {
            return Err(roster_error(format!(
                "A roster needs at least {} officers",
                MIN_ROSTER_SIZE
            )));
        }

        let mut seen = std::collections::HashSet::new();
        if let Some(dup) = members.iter().find(|m| !seen.insert(&m.officer_id)) {
            return Err(roster_error(format!(
                "Officer {} is listed twice",
                dup.officer_id
            )));
        }

        match members.iter().filter(|m| m.is_leader).count() {
            1 => Ok(()),
            0 => Err(roster_error("A roster needs exactly one team leader")),
            _ => Err(roster_error("A roster cannot have more than one team leader")),
        }
    }
}

impl TryFrom<Vec<RosterMember>> for Roster {
    type Error = DomainError;

    fn try_from(members: Vec<RosterMember>) -> Result<Self, Self::Error> {
        Roster::new(members)
    }
}

impl From<Roster> for Vec<RosterMember> {
    fn from(roster: Roster) -> Self {
        roster.members
    }
}

fn roster_error(message: impl Into<String>) -> DomainError {
    DomainError::new(ErrorCode::RosterInvariant, message)
}
