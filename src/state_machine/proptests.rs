//! Property-based tests for the session state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::transition::*;
use super::*;
use crate::catalog::{Building, Catalog, Requirement};
use crate::ledger::{Faction, Resources};
use proptest::prelude::*;
use std::sync::Arc;

// ============================================================================
// Test Helpers
// ============================================================================

const RESOURCES: [&str; 4] = ["steel", "oil", "gold", "food"];

fn test_context(buildings: Vec<Building>, snapshot: Resources, owned: Vec<u32>) -> SessionContext {
    SessionContext::new("test-session", "owner", Arc::new(Catalog::new(buildings)), snapshot)
        .with_owned(owned)
}

fn count_commits(effects: &[Effect]) -> usize {
    effects
        .iter()
        .filter(|e| matches!(e, Effect::CommitConstruction { .. }))
        .count()
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_requirements() -> impl Strategy<Value = Vec<Requirement>> {
    proptest::sample::subsequence(RESOURCES.to_vec(), 0..=RESOURCES.len()).prop_flat_map(|keys| {
        let n = keys.len();
        proptest::collection::vec(0i64..2000, n).prop_map(move |amounts| {
            keys.iter()
                .zip(amounts)
                .map(|(k, amount)| Requirement {
                    resource: (*k).to_string(),
                    amount,
                })
                .collect()
        })
    })
}

fn arb_catalog() -> impl Strategy<Value = Vec<Building>> {
    proptest::collection::vec(arb_requirements(), 1..20).prop_map(|reqs| {
        reqs.into_iter()
            .enumerate()
            .map(|(i, requirements)| Building {
                id: u32::try_from(i).unwrap_or(u32::MAX) + 1,
                name: format!("Building {i}"),
                description: String::new(),
                requirements,
            })
            .collect()
    })
}

fn arb_snapshot() -> impl Strategy<Value = Resources> {
    proptest::collection::vec(0i64..2000, RESOURCES.len()).prop_map(|amounts| {
        RESOURCES
            .iter()
            .zip(amounts)
            .map(|(k, v)| (*k, v))
            .collect()
    })
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        Just(Event::Navigate { direction: Direction::Prev }),
        Just(Event::Navigate { direction: Direction::Next }),
        Just(Event::Construct),
        Just(Event::Confirm),
        Just(Event::Cancel),
        Just(Event::Timeout),
        proptest::sample::select(Faction::ALL.to_vec())
            .prop_map(|faction| Event::ChooseFaction { faction }),
        Just(Event::WriteSucceeded),
        "[a-z ]{1,20}".prop_map(|reason| Event::WriteFailed { reason }),
    ]
}

fn arb_terminal_state() -> impl Strategy<Value = SessionState> {
    prop_oneof![
        "[A-Za-z ]{1,20}".prop_map(|building| SessionState::Committed { building }),
        proptest::sample::select(Faction::ALL.to_vec())
            .prop_map(|faction| SessionState::FactionChosen { faction }),
        "[a-z ]{1,20}".prop_map(|reason| SessionState::Failed { reason }),
        Just(SessionState::Cancelled),
        Just(SessionState::Expired),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Construct succeeds exactly when the building is unowned and every
    // requirement is covered by the snapshot
    #[test]
    fn prop_construct_iff_requirements_met(
        buildings in arb_catalog(),
        snapshot in arb_snapshot(),
        cursor_seed in any::<usize>(),
        owns_it in any::<bool>(),
    ) {
        let ctx = test_context(buildings, snapshot, vec![]);
        let cursor = cursor_seed % ctx.page_count();
        let building = ctx.catalog.get(cursor).cloned().unwrap();
        let ctx = if owns_it { ctx.with_owned([building.id]) } else { ctx };

        let meets = building
            .requirements
            .iter()
            .all(|r| ctx.snapshot.get(&r.resource) >= r.amount);

        let result = transition(&SessionState::Browsing { cursor }, &ctx, Event::Construct);
        match result {
            Ok(r) => {
                prop_assert!(!owns_it && meets);
                let is_pending = matches!(r.new_state, SessionState::ConfirmPending { .. });
                prop_assert!(is_pending);
            }
            Err(TransitionError::AlreadyOwned(_)) => prop_assert!(owns_it),
            Err(TransitionError::InsufficientResources { have, need, .. }) => {
                prop_assert!(!owns_it && !meets);
                prop_assert!(have < need);
            }
            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
        }
    }

    // The cursor never leaves [0, page_count - 1]
    #[test]
    fn prop_cursor_stays_in_bounds(
        buildings in arb_catalog(),
        events in proptest::collection::vec(arb_event(), 0..40),
    ) {
        let ctx = test_context(buildings, Resources::default(), vec![]);
        let mut state = SessionState::Browsing { cursor: 0 };

        for event in events {
            if let Ok(result) = transition(&state, &ctx, event) {
                state = result.new_state;
            }
            if let SessionState::Browsing { cursor }
            | SessionState::ConfirmPending { cursor, .. } = state
            {
                prop_assert!(cursor <= ctx.last_page());
            }
        }
    }

    // A session emits at most one commit over its whole lifetime
    #[test]
    fn prop_at_most_one_commit(
        buildings in arb_catalog(),
        snapshot in arb_snapshot(),
        events in proptest::collection::vec(arb_event(), 0..40),
    ) {
        let ctx = test_context(buildings, snapshot, vec![]);
        let mut state = SessionState::Browsing { cursor: 0 };
        let mut commits = 0;

        for event in events {
            if let Ok(result) = transition(&state, &ctx, event) {
                commits += count_commits(&result.effects);
                state = result.new_state;
            }
        }
        prop_assert!(commits <= 1);
    }

    // Terminal states reject every event
    #[test]
    fn prop_terminal_states_absorb(
        state in arb_terminal_state(),
        event in arb_event(),
        buildings in arb_catalog(),
    ) {
        let ctx = test_context(buildings, Resources::default(), vec![]);
        let result = transition(&state, &ctx, event);
        let is_invalid = matches!(result, Err(TransitionError::InvalidState { .. }));
        prop_assert!(is_invalid);
    }

    // Every transition into a terminal state asks for the session to close
    #[test]
    fn prop_terminal_transition_closes(
        buildings in arb_catalog(),
        snapshot in arb_snapshot(),
        events in proptest::collection::vec(arb_event(), 0..40),
    ) {
        let ctx = test_context(buildings, snapshot, vec![]);
        let mut state = SessionState::Browsing { cursor: 0 };

        for event in events {
            if let Ok(result) = transition(&state, &ctx, event) {
                if result.new_state.is_terminal() {
                    prop_assert!(result.effects.contains(&Effect::Close));
                } else {
                    prop_assert!(!result.effects.contains(&Effect::Close));
                }
                state = result.new_state;
            }
        }
    }

    // Only a successful write reaches a success state, and only after a
    // write was requested
    #[test]
    fn prop_success_requires_acknowledged_write(
        buildings in arb_catalog(),
        snapshot in arb_snapshot(),
        menu in any::<bool>(),
        events in proptest::collection::vec(arb_event(), 0..40),
    ) {
        let ctx = test_context(buildings, snapshot, vec![]);
        let mut state = if menu {
            start_faction_menu().new_state
        } else {
            SessionState::Browsing { cursor: 0 }
        };
        let mut write_requested = false;

        for event in events {
            let acknowledged = event == Event::WriteSucceeded;
            if let Ok(result) = transition(&state, &ctx, event) {
                write_requested |= result.effects.iter().any(|e| {
                    matches!(e, Effect::CommitConstruction { .. } | Effect::SetFaction { .. })
                });
                let success = matches!(
                    result.new_state,
                    SessionState::Committed { .. } | SessionState::FactionChosen { .. }
                );
                if success {
                    prop_assert!(write_requested && acknowledged);
                }
                state = result.new_state;
            }
        }
    }

    // Timeout is accepted from every live state and yields Expired
    #[test]
    fn prop_timeout_expires_live_states(
        buildings in arb_catalog(),
        cursor_seed in any::<usize>(),
        which in 0usize..3,
    ) {
        let ctx = test_context(buildings, Resources::default(), vec![]);
        let cursor = cursor_seed % ctx.page_count();
        let state = match which {
            0 => SessionState::Browsing { cursor },
            1 => {
                let building = ctx.catalog.get(cursor).unwrap().name.clone();
                SessionState::ConfirmPending { cursor, building }
            }
            _ => SessionState::ChoosingFaction,
        };

        let result = transition(&state, &ctx, Event::Timeout).unwrap();
        prop_assert_eq!(result.new_state, SessionState::Expired);
        prop_assert_eq!(count_commits(&result.effects), 0);
    }
}
