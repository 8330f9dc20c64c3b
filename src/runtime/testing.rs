//! Mock implementations for testing
//!
//! These mocks enable runtime and command tests without a real store.

use crate::ledger::{
    Faction, Inventory, Ledger, LedgerError, LedgerResult, OwnedBuilding, Profile,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

// ============================================================================
// In-Memory Ledger
// ============================================================================

/// Ledger backed by hash maps. Uses the trait's default commit composition.
#[derive(Default)]
pub struct InMemoryLedger {
    profiles: Mutex<HashMap<String, Profile>>,
    inventories: Mutex<HashMap<String, Inventory>>,
    counters: Mutex<HashMap<String, i64>>,
    /// Number of successful `push_building` calls
    pub pushes: AtomicUsize,
    /// When set, every write fails with a store error
    pub fail_writes: AtomicBool,
}

#[allow(dead_code)]
impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a profile directly, bypassing `insert_profile`
    pub fn with_profile(self, profile: Profile) -> Self {
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.user_id.clone(), profile);
        self
    }

    pub fn with_inventory(self, inventory: Inventory) -> Self {
        self.inventories
            .lock()
            .unwrap()
            .insert(inventory.user_id.clone(), inventory);
        self
    }

    pub fn profile(&self, user_id: &str) -> Option<Profile> {
        self.profiles.lock().unwrap().get(user_id).cloned()
    }

    pub fn inventory(&self, user_id: &str) -> Option<Inventory> {
        self.inventories.lock().unwrap().get(user_id).cloned()
    }

    pub fn counter(&self, name: &str) -> i64 {
        self.counters.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    pub fn push_count(&self) -> usize {
        self.pushes.load(Ordering::SeqCst)
    }

    fn check_writable(&self) -> LedgerResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(LedgerError::Store("store unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn find_profile(&self, user_id: &str) -> LedgerResult<Option<Profile>> {
        Ok(self.profile(user_id))
    }

    async fn insert_profile(&self, profile: &Profile) -> LedgerResult<()> {
        self.check_writable()?;
        let mut profiles = self.profiles.lock().unwrap();
        if profiles.contains_key(&profile.user_id) {
            return Err(LedgerError::ProfileExists(profile.user_id.clone()));
        }
        profiles.insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }

    async fn set_faction(&self, user_id: &str, faction: Faction) -> LedgerResult<()> {
        self.check_writable()?;
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles
            .get_mut(user_id)
            .ok_or_else(|| LedgerError::ProfileNotFound(user_id.to_string()))?;
        profile.faction = Some(faction);
        Ok(())
    }

    async fn find_inventory(&self, user_id: &str) -> LedgerResult<Option<Inventory>> {
        Ok(self.inventory(user_id))
    }

    async fn insert_inventory(&self, inventory: &Inventory) -> LedgerResult<()> {
        self.check_writable()?;
        self.inventories
            .lock()
            .unwrap()
            .entry(inventory.user_id.clone())
            .or_insert_with(|| inventory.clone());
        Ok(())
    }

    async fn increment(&self, user_id: &str, deltas: &[(String, i64)]) -> LedgerResult<()> {
        self.check_writable()?;
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles
            .get_mut(user_id)
            .ok_or_else(|| LedgerError::ProfileNotFound(user_id.to_string()))?;
        for (resource, delta) in deltas {
            profile.resources.add(resource, *delta);
        }
        Ok(())
    }

    async fn push_building(&self, user_id: &str, building: &OwnedBuilding) -> LedgerResult<()> {
        self.check_writable()?;
        self.inventories
            .lock()
            .unwrap()
            .entry(user_id.to_string())
            .or_insert_with(|| Inventory::empty(user_id))
            .buildings
            .push(building.clone());
        self.pushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn increment_counter(&self, name: &str) -> LedgerResult<i64> {
        self.check_writable()?;
        let mut counters = self.counters.lock().unwrap();
        let value = counters.entry(name.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Building, Catalog, Emojis, Requirement};
    use crate::ledger::Resources;
    use crate::runtime::{DispatchError, SessionManager, SseEvent};
    use crate::state_machine::{SessionState, TransitionError};
    use crate::view::{Reply, GENERIC_ERROR, TIMED_OUT_NOTICE};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::broadcast;

    const OWNER: &str = "owner-1";

    fn building(id: u32, name: &str, reqs: &[(&str, i64)]) -> Building {
        Building {
            id,
            name: name.to_string(),
            description: format!("{name} description"),
            requirements: reqs
                .iter()
                .map(|(r, a)| Requirement {
                    resource: (*r).to_string(),
                    amount: *a,
                })
                .collect(),
        }
    }

    fn catalog() -> Arc<Catalog> {
        Arc::new(Catalog::new(vec![
            building(1, "Oil Refinery", &[("steel", 1000)]),
            building(2, "Steel Foundry", &[("steel", 1000), ("gold", 500)]),
            building(3, "Grain Silos", &[("food", 50)]),
        ]))
    }

    fn setup(resources: &[(&str, i64)]) -> (Arc<InMemoryLedger>, SessionManager) {
        let mut profile = Profile::new(OWNER, 0);
        profile.resources = resources.iter().map(|(k, v)| (*k, *v)).collect::<Resources>();
        let ledger = Arc::new(InMemoryLedger::new().with_profile(profile));
        let manager = SessionManager::new(ledger.clone(), catalog(), Arc::new(Emojis::fallback()));
        (ledger, manager)
    }

    async fn start(manager: &SessionManager, ledger: &InMemoryLedger) -> String {
        let snapshot = ledger.profile(OWNER).unwrap().resources;
        let (id, _view) = manager.start_build_session(OWNER, snapshot, []).await;
        id
    }

    async fn closed_state(rx: &mut broadcast::Receiver<SseEvent>) -> SessionState {
        loop {
            match rx.recv().await {
                Ok(SseEvent::Closed { state }) => return state,
                Ok(SseEvent::View { .. }) => {}
                Err(e) => panic!("stream ended before close: {e}"),
            }
        }
    }

    fn update_title(reply: &Reply) -> &str {
        match reply {
            Reply::Update { view } => &view.title,
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_in_memory_ledger_default_commit() {
        let ledger = InMemoryLedger::new().with_profile(Profile::new("u", 0));
        let foundry = building(2, "Steel Foundry", &[("steel", 1000), ("gold", 500)]);

        ledger.commit_construction("u", &foundry).await.unwrap();
        let profile = ledger.profile("u").unwrap();
        assert_eq!(profile.resources.get("steel"), 0);
        assert_eq!(profile.resources.get("gold"), 500);
        assert!(ledger.inventory("u").unwrap().owns(2));

        let again = ledger.commit_construction("u", &foundry).await.unwrap_err();
        assert!(matches!(again, LedgerError::Insufficient { .. }));
    }

    #[tokio::test]
    async fn test_initial_view_is_first_page() {
        let (ledger, manager) = setup(&[("steel", 1000)]);
        let snapshot = ledger.profile(OWNER).unwrap().resources;
        let (_id, view) = manager.start_build_session(OWNER, snapshot, []).await;
        assert_eq!(view.title, "Building: Oil Refinery");
        assert_eq!(view.footer.as_deref(), Some("Building 1/3"));
        assert_eq!(manager.active_sessions().await, 1);
    }

    #[tokio::test]
    async fn test_non_owner_is_denied_without_state_change() {
        let (ledger, manager) = setup(&[("steel", 1000)]);
        let id = start(&manager, &ledger).await;

        let err = manager.dispatch(&id, "intruder", "next").await.unwrap_err();
        assert_eq!(err, DispatchError::NotOwner);
        assert_eq!(err.to_string(), "You can't use these buttons!");

        // Owner still sees page 1 -> 2
        let reply = manager.dispatch(&id, OWNER, "next").await.unwrap();
        let Reply::Update { view } = reply else {
            panic!("expected update");
        };
        assert_eq!(view.footer.as_deref(), Some("Building 2/3"));
    }

    #[tokio::test]
    async fn test_full_construction_commits_once() {
        let (ledger, manager) = setup(&[("steel", 1000), ("gold", 500)]);
        let id = start(&manager, &ledger).await;
        let mut rx = manager.subscribe(&id).await.unwrap();

        manager.dispatch(&id, OWNER, "next").await.unwrap();
        let reply = manager.dispatch(&id, OWNER, "construct").await.unwrap();
        assert_eq!(update_title(&reply), "Confirm Construction");

        let reply = manager.dispatch(&id, OWNER, "confirm").await.unwrap();
        assert_eq!(update_title(&reply), "Construction Complete");

        let profile = ledger.profile(OWNER).unwrap();
        assert_eq!(profile.resources.get("steel"), 0);
        assert_eq!(profile.resources.get("gold"), 0);
        assert_eq!(ledger.push_count(), 1);

        // The session is gone; a second confirm cannot commit again
        let err = manager.dispatch(&id, OWNER, "confirm").await.unwrap_err();
        assert!(matches!(err, DispatchError::NotFound(_)));
        assert_eq!(ledger.push_count(), 1);

        assert_eq!(
            closed_state(&mut rx).await,
            SessionState::Committed { building: "Steel Foundry".into() }
        );
    }

    #[tokio::test]
    async fn test_insufficient_resources_keeps_browsing() {
        let (ledger, manager) = setup(&[("steel", 500)]);
        let id = start(&manager, &ledger).await;

        let err = manager.dispatch(&id, OWNER, "construct").await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Rejected(TransitionError::InsufficientResources {
                have: 500,
                need: 1000,
                ..
            })
        ));
        assert_eq!(err.to_string(), "You don't meet the requirements to build this!");

        // Still browsing
        let reply = manager.dispatch(&id, OWNER, "next").await.unwrap();
        assert!(matches!(reply, Reply::Update { .. }));
        assert_eq!(ledger.push_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_leaves_ledger_untouched() {
        let (ledger, manager) = setup(&[("steel", 1000)]);
        let id = start(&manager, &ledger).await;

        manager.dispatch(&id, OWNER, "construct").await.unwrap();
        let reply = manager.dispatch(&id, OWNER, "cancel").await.unwrap();
        assert_eq!(update_title(&reply), "Construction Cancelled");
        assert_eq!(ledger.profile(OWNER).unwrap().resources.get("steel"), 1000);
        assert_eq!(ledger.push_count(), 0);
    }

    #[tokio::test]
    async fn test_commit_rechecks_live_balances() {
        let (ledger, manager) = setup(&[("steel", 1000)]);
        let id = start(&manager, &ledger).await;
        let mut rx = manager.subscribe(&id).await.unwrap();
        manager.dispatch(&id, OWNER, "construct").await.unwrap();

        // Balance spent elsewhere after the snapshot was taken
        ledger
            .increment(OWNER, &[("steel".to_string(), -600)])
            .await
            .unwrap();

        let reply = manager.dispatch(&id, OWNER, "confirm").await.unwrap();
        assert_eq!(update_title(&reply), "Construction Failed");
        assert_eq!(ledger.profile(OWNER).unwrap().resources.get("steel"), 400);
        assert_eq!(ledger.push_count(), 0);
        assert_eq!(
            closed_state(&mut rx).await,
            SessionState::Failed { reason: "Insufficient steel: have 400, need 1000".into() }
        );
    }

    #[tokio::test]
    async fn test_store_failure_renders_generic_error() {
        let (ledger, manager) = setup(&[("steel", 1000)]);
        let id = start(&manager, &ledger).await;
        let mut rx = manager.subscribe(&id).await.unwrap();
        manager.dispatch(&id, OWNER, "construct").await.unwrap();
        ledger.fail_writes.store(true, Ordering::SeqCst);

        let Reply::Update { view } = manager.dispatch(&id, OWNER, "confirm").await.unwrap() else {
            panic!("expected update");
        };
        assert_eq!(view.title, "Construction Failed");
        assert!(view.description.contains(GENERIC_ERROR));

        // Nothing was written, so the session must not close as committed
        assert_eq!(ledger.push_count(), 0);
        assert_eq!(
            closed_state(&mut rx).await,
            SessionState::Failed { reason: GENERIC_ERROR.into() }
        );
    }

    #[tokio::test]
    async fn test_faction_menu_answers_only_its_owner() {
        let (ledger, manager) = setup(&[]);
        let intruder = Profile::new("intruder", 0);
        ledger.insert_profile(&intruder).await.unwrap();
        let (id, view) = manager.start_faction_menu(OWNER).await;
        assert_eq!(view.title, "Choose Your Faction");
        let mut rx = manager.subscribe(&id).await.unwrap();

        let err = manager
            .dispatch(&id, "intruder", "faction:nova_pact")
            .await
            .unwrap_err();
        assert_eq!(err, DispatchError::NotOwner);
        assert_eq!(ledger.profile("intruder").unwrap().faction, None);

        let reply = manager
            .dispatch(&id, OWNER, "faction:sentinel_order")
            .await
            .unwrap();
        assert_eq!(update_title(&reply), "Faction Selected");
        assert_eq!(
            ledger.profile(OWNER).unwrap().faction,
            Some(Faction::SentinelOrder)
        );
        assert_eq!(
            closed_state(&mut rx).await,
            SessionState::FactionChosen { faction: Faction::SentinelOrder }
        );

        // The menu is spent after one pick
        let err = manager
            .dispatch(&id, OWNER, "faction:crimson_reign")
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_faction_menu_rechecks_existing_choice() {
        let (ledger, manager) = setup(&[]);
        let (first, _) = manager.start_faction_menu(OWNER).await;
        let (second, _) = manager.start_faction_menu(OWNER).await;

        manager.dispatch(&first, OWNER, "faction:nova_pact").await.unwrap();
        let reply = manager
            .dispatch(&second, OWNER, "faction:crimson_reign")
            .await
            .unwrap();
        let Reply::Update { view } = reply else {
            panic!("expected update");
        };
        assert_eq!(view.description, "You have already chosen your faction!");
        assert_eq!(ledger.profile(OWNER).unwrap().faction, Some(Faction::NovaPact));
    }

    #[tokio::test(start_paused = true)]
    async fn test_faction_menu_expires_after_thirty_seconds() {
        let (ledger, manager) = setup(&[]);
        let (id, _) = manager.start_faction_menu(OWNER).await;
        let mut rx = manager.subscribe(&id).await.unwrap();

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(manager.active_sessions().await, 1);
        tokio::time::sleep(Duration::from_secs(2)).await;

        let Ok(SseEvent::View { view, state }) = rx.recv().await else {
            panic!("expected timed-out view");
        };
        assert_eq!(state, SessionState::Expired);
        assert_eq!(view.title, "Choose Your Faction");
        assert!(view.description.ends_with(TIMED_OUT_NOTICE));
        assert!(view.buttons.iter().all(|b| b.disabled));

        assert!(manager.dispatch(&id, OWNER, "faction:nova_pact").await.is_err());
        assert_eq!(ledger.profile(OWNER).unwrap().faction, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_browsing_expires_and_is_reclaimed() {
        let (ledger, manager) = setup(&[("steel", 1000)]);
        let id = start(&manager, &ledger).await;
        let mut rx = manager.subscribe(&id).await.unwrap();

        tokio::time::sleep(Duration::from_secs(61)).await;

        let Ok(SseEvent::View { view, state }) = rx.recv().await else {
            panic!("expected timed-out view");
        };
        assert_eq!(state, SessionState::Expired);
        assert_eq!(view.title, "Building: Oil Refinery");
        assert!(view.description.ends_with(TIMED_OUT_NOTICE));
        assert!(view.buttons.iter().all(|b| b.disabled));

        let err = manager.dispatch(&id, OWNER, "next").await.unwrap_err();
        assert!(matches!(err, DispatchError::NotFound(_)));
        assert_eq!(err.to_string(), "This interaction is no longer active.");

        tokio::task::yield_now().await;
        assert_eq!(manager.active_sessions().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_presses_keep_browsing_alive() {
        let (ledger, manager) = setup(&[("steel", 1000)]);
        let id = start(&manager, &ledger).await;

        tokio::time::sleep(Duration::from_secs(50)).await;
        manager.dispatch(&id, OWNER, "next").await.unwrap();
        tokio::time::sleep(Duration::from_secs(50)).await;

        let reply = manager.dispatch(&id, OWNER, "prev").await.unwrap();
        assert!(matches!(reply, Reply::Update { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmation_expires_after_ten_seconds() {
        let (ledger, manager) = setup(&[("steel", 1000)]);
        let id = start(&manager, &ledger).await;
        manager.dispatch(&id, OWNER, "construct").await.unwrap();
        let mut rx = manager.subscribe(&id).await.unwrap();

        tokio::time::sleep(Duration::from_secs(11)).await;

        let Ok(SseEvent::View { view, state }) = rx.recv().await else {
            panic!("expected timed-out view");
        };
        assert_eq!(state, SessionState::Expired);
        assert_eq!(view.title, "Confirm Construction");
        assert!(view.description.ends_with(TIMED_OUT_NOTICE));

        assert!(manager.dispatch(&id, OWNER, "confirm").await.is_err());
        assert_eq!(ledger.push_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_action_and_session() {
        let (ledger, manager) = setup(&[]);
        let id = start(&manager, &ledger).await;

        let err = manager.dispatch(&id, OWNER, "demolish").await.unwrap_err();
        assert_eq!(err, DispatchError::UnknownAction("demolish".into()));

        let err = manager.dispatch("missing", OWNER, "next").await.unwrap_err();
        assert!(matches!(err, DispatchError::NotFound(_)));
    }
}
