use crate::models::{Candidate, Decision, Requester, SearchCriteria, Sex};

/// Why a record from a search page was not surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    SelfReference,
    Inactive,
    NoVisiblePhoto,
    OutsideCriteria,
    AlreadySeen,
    Blocked,
    Favorite,
    Excluded(Decision),
}

/// Check a candidate against everything decidable without the store
///
/// Stage 1 of candidate screening; store-backed checks (seen, blocked,
/// favourite, exclusion policy) run after this passes.
#[inline]
pub fn screen_candidate(
    candidate: &Candidate,
    requester: &Requester,
    criteria: &SearchCriteria,
) -> Option<SkipReason> {
    if candidate.id == requester.id {
        return Some(SkipReason::SelfReference);
    }

    if !candidate.active {
        return Some(SkipReason::Inactive);
    }

    if !candidate.has_visible_photo {
        return Some(SkipReason::NoVisiblePhoto);
    }

    if !matches_criteria(candidate, criteria) {
        return Some(SkipReason::OutsideCriteria);
    }

    None
}

/// Check the fields the remote search is supposed to have filtered on.
///
/// Unknown values (hidden birth year, unspecified sex) pass.
#[inline]
pub fn matches_criteria(candidate: &Candidate, criteria: &SearchCriteria) -> bool {
    if criteria.sex != Sex::Any && candidate.sex != Sex::Any && candidate.sex != criteria.sex {
        return false;
    }

    if let Some(age) = candidate.age {
        if age < criteria.age_from || age > criteria.age_to {
            return false;
        }
    }

    true
}
