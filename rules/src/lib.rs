//! Invariant checks for hackathon voting and team membership.
//!
//! Every function here is a pure predicate over a snapshot of rows. The
//! mutation gateway runs these inside the store's write transaction, which
//! makes its answer authoritative. A replica may run the same checks against
//! its merged local view for fast rejection, but that answer is only advisory
//! since local state can be stale relative to other clients.

use chrono::{DateTime, Utc};
use thiserror::Error;

pub const AWARD_NAME_MAX: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("You have already voted for this hack for this award")]
    DuplicateVote,

    #[error("The award and the hack belong to different events")]
    CrossEventVote,

    #[error("This user is already a member of the team")]
    DuplicateMembership,

    #[error("Teams with votes can only be deleted by an admin")]
    TeamHasVotes,

    #[error("Awards with votes cannot be deleted")]
    AwardHasVotes,

    #[error("Name must not be empty")]
    EmptyName,

    #[error("Name must be at most {AWARD_NAME_MAX} characters")]
    NameTooLong,

    #[error("This event is not a hackathon")]
    NotAHackathon,

    #[error("This event has already ended")]
    EventEnded,

    #[error("The hacking period has closed")]
    HackingClosed,

    #[error("Voting has closed")]
    VotingClosed,
}

/// No vote with this exact (hack, award, user) triple may already exist.
pub fn unique_vote<H, A, U>(
    existing: impl IntoIterator<Item = (H, A, U)>,
    hack: &H,
    award: &A,
    user: &U,
) -> Result<(), Violation>
where
    H: PartialEq,
    A: PartialEq,
    U: PartialEq,
{
    for (h, a, u) in existing {
        if &h == hack && &a == award && &u == user {
            return Err(Violation::DuplicateVote);
        }
    }
    Ok(())
}

/// A vote is only valid when the award and the hack are scoped to the same
/// event.
pub fn same_event<E: PartialEq>(award_event: &E, hack_event: &E) -> Result<(), Violation> {
    if award_event == hack_event {
        Ok(())
    } else {
        Err(Violation::CrossEventVote)
    }
}

/// No membership with this exact (hack, user) pair may already exist.
pub fn unique_membership<H, U>(
    existing: impl IntoIterator<Item = (H, U)>,
    hack: &H,
    user: &U,
) -> Result<(), Violation>
where
    H: PartialEq,
    U: PartialEq,
{
    for (h, u) in existing {
        if &h == hack && &u == user {
            return Err(Violation::DuplicateMembership);
        }
    }
    Ok(())
}

/// A team that has collected votes may only be deleted by an admin, whose
/// delete cascades over the votes first.
pub fn deletable_team(vote_count: usize, actor_is_admin: bool) -> Result<(), Violation> {
    if vote_count == 0 || actor_is_admin {
        Ok(())
    } else {
        Err(Violation::TeamHasVotes)
    }
}

pub fn deletable_award(vote_count: usize) -> Result<(), Violation> {
    if vote_count == 0 {
        Ok(())
    } else {
        Err(Violation::AwardHasVotes)
    }
}

/// Team and award names must be 1..=100 characters after trimming.
pub fn valid_name(name: &str) -> Result<&str, Violation> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err(Violation::EmptyName)
    } else if trimmed.chars().count() > AWARD_NAME_MAX {
        Err(Violation::NameTooLong)
    } else {
        Ok(trimmed)
    }
}

/// Teams can only register for hackathon events that have not yet ended.
pub fn event_accepts_teams(
    is_hackathon: bool,
    end_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), Violation> {
    if !is_hackathon {
        return Err(Violation::NotAHackathon);
    }
    if end_time < now {
        return Err(Violation::EventEnded);
    }
    Ok(())
}

/// Advisory check against the hacking deadline, if one is set.
pub fn within_hacking_window(
    hack_until: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(), Violation> {
    match hack_until {
        Some(deadline) if now > deadline => Err(Violation::HackingClosed),
        _ => Ok(()),
    }
}

/// Check against the voting deadline, if one is set. The gateway enforces
/// this one authoritatively.
pub fn within_voting_window(
    vote_until: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(), Violation> {
    match vote_until {
        Some(deadline) if now > deadline => Err(Violation::VotingClosed),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn unique_vote_rejects_exact_triple_only() {
        let existing = vec![("h1", "a1", "u1"), ("h2", "a1", "u1")];

        assert_eq!(
            unique_vote(existing.clone(), &"h1", &"a1", &"u1"),
            Err(Violation::DuplicateVote)
        );
        // Same user, same award, different team is allowed.
        assert_eq!(unique_vote(existing.clone(), &"h3", &"a1", &"u1"), Ok(()));
        // Same user, same team, different award is allowed.
        assert_eq!(unique_vote(existing.clone(), &"h1", &"a2", &"u1"), Ok(()));
        // Different user entirely.
        assert_eq!(unique_vote(existing, &"h1", &"a1", &"u2"), Ok(()));
    }

    #[test]
    fn same_event_requires_equality() {
        assert_eq!(same_event(&"e1", &"e1"), Ok(()));
        assert_eq!(same_event(&"e1", &"e2"), Err(Violation::CrossEventVote));
    }

    #[test]
    fn unique_membership_rejects_pair() {
        let existing = vec![("h1", "u1")];
        assert_eq!(
            unique_membership(existing.clone(), &"h1", &"u1"),
            Err(Violation::DuplicateMembership)
        );
        assert_eq!(unique_membership(existing.clone(), &"h1", &"u2"), Ok(()));
        assert_eq!(unique_membership(existing, &"h2", &"u1"), Ok(()));
    }

    #[test]
    fn deletable_team_admin_override() {
        assert_eq!(deletable_team(0, false), Ok(()));
        assert_eq!(deletable_team(3, false), Err(Violation::TeamHasVotes));
        assert_eq!(deletable_team(3, true), Ok(()));
    }

    #[test]
    fn deletable_award_never_with_votes() {
        assert_eq!(deletable_award(0), Ok(()));
        assert_eq!(deletable_award(1), Err(Violation::AwardHasVotes));
    }

    #[test]
    fn valid_name_trims_and_bounds() {
        assert_eq!(valid_name("  Team Rocket  "), Ok("Team Rocket"));
        assert_eq!(valid_name("   "), Err(Violation::EmptyName));
        assert_eq!(valid_name(&"x".repeat(100)).is_ok(), true);
        assert_eq!(valid_name(&"x".repeat(101)), Err(Violation::NameTooLong));
    }

    #[test]
    fn event_gates() {
        let now = Utc::now();
        let future = now + Duration::days(1);
        let past = now - Duration::days(1);

        assert_eq!(event_accepts_teams(true, future, now), Ok(()));
        assert_eq!(
            event_accepts_teams(false, future, now),
            Err(Violation::NotAHackathon)
        );
        assert_eq!(
            event_accepts_teams(true, past, now),
            Err(Violation::EventEnded)
        );
    }

    #[test]
    fn deadline_windows() {
        let now = Utc::now();
        let future = Some(now + Duration::hours(1));
        let past = Some(now - Duration::hours(1));

        assert_eq!(within_hacking_window(None, now), Ok(()));
        assert_eq!(within_hacking_window(future, now), Ok(()));
        assert_eq!(
            within_hacking_window(past, now),
            Err(Violation::HackingClosed)
        );

        assert_eq!(within_voting_window(None, now), Ok(()));
        assert_eq!(
            within_voting_window(past, now),
            Err(Violation::VotingClosed)
        );
    }
}
