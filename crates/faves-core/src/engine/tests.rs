use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use tempfile::tempdir;
use tokio::sync::Notify;

use super::*;
use crate::cache::FavoritesSnapshot;
use crate::client::ApiResult;
use crate::models::{FavoriteId, FavoriteRecord};
use crate::store::LibSqlFavoritesStore;

/// Scripted in-process stand-in for the favorites backend.
#[derive(Default)]
struct FakeApi {
    records: StdMutex<Vec<FavoriteRecord>>,
    catalogs: StdMutex<Vec<Catalog>>,
    calls: StdMutex<Vec<String>>,
    next_id: AtomicU64,
    fail_create: AtomicBool,
    fail_delete: AtomicBool,
    fail_list: AtomicBool,
    create_gate: Option<Arc<Notify>>,
    /// Holds a list response after its snapshot was taken
    list_gate: Option<Arc<Notify>>,
    delete_gate: Option<Arc<Notify>>,
}

impl FakeApi {
    fn with_records(records: Vec<FavoriteRecord>) -> Self {
        Self {
            records: StdMutex::new(records),
            ..Self::default()
        }
    }

    fn gated(gate: Arc<Notify>) -> Self {
        Self {
            create_gate: Some(gate),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn server_ids(&self) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|record| record.id.clone())
            .collect()
    }

    fn rejected() -> ApiError {
        ApiError::Status {
            status: 500,
            message: "simulated failure".to_string(),
        }
    }
}

impl FavoritesApi for FakeApi {
    async fn create_favorite(&self, target: &TargetKey) -> ApiResult<FavoriteId> {
        self.calls.lock().unwrap().push(format!("create {target}"));
        if let Some(gate) = &self.create_gate {
            gate.notified().await;
        }
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(Self::rejected());
        }

        let mut records = self.records.lock().unwrap();
        if let Some(existing) = records
            .iter()
            .find(|record| crate::models::validate(record).ok().as_ref() == Some(target))
        {
            return FavoriteId::server(existing.id.clone())
                .map_err(|error| ApiError::InvalidPayload(error.to_string()));
        }
        let id = format!("srv-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        records.push(FavoriteRecord::new(id.clone(), target, Utc::now()));
        FavoriteId::server(id).map_err(|error| ApiError::InvalidPayload(error.to_string()))
    }

    async fn delete_favorite(&self, id: &FavoriteId) -> ApiResult<()> {
        self.calls.lock().unwrap().push(format!("delete {id}"));
        if let Some(gate) = &self.delete_gate {
            gate.notified().await;
        }
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Self::rejected());
        }
        let id = id.to_string();
        self.records.lock().unwrap().retain(|record| record.id != id);
        Ok(())
    }

    async fn list_favorites(&self) -> ApiResult<Vec<FavoriteRecord>> {
        self.calls.lock().unwrap().push("list".to_string());
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(Self::rejected());
        }
        let snapshot = self.records.lock().unwrap().clone();
        if let Some(gate) = &self.list_gate {
            gate.notified().await;
        }
        Ok(snapshot)
    }

    async fn get_catalog(&self, catalog_id: &str) -> ApiResult<Catalog> {
        self.catalogs
            .lock()
            .unwrap()
            .iter()
            .find(|catalog| catalog.id == catalog_id)
            .cloned()
            .ok_or(ApiError::Status {
                status: 404,
                message: format!("catalog {catalog_id} not found"),
            })
    }
}

fn record(id: &str, catalog_id: Option<&str>, product_id: Option<&str>) -> FavoriteRecord {
    FavoriteRecord {
        id: id.to_string(),
        created_at: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
        target_kind: None,
        catalog_id: catalog_id.map(ToString::to_string),
        product_id: product_id.map(ToString::to_string),
    }
}

/// Wait until the fake has seen `count` calls, polling the other futures meanwhile.
async fn wait_for_calls(api: &FakeApi, count: usize) {
    for _ in 0..2_000 {
        if api.calls().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("expected {count} calls, saw {:?}", api.calls());
}

/// Wait until no sync is running.
async fn wait_for_sync<A: FavoritesApi, S: FavoritesPersistence>(
    engine: &ReconciliationEngine<A, S>,
) {
    for _ in 0..2_000 {
        if !engine.status().await.loading {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("sync did not finish");
}

async fn engine_with(api: FakeApi) -> ReconciliationEngine<FakeApi, LibSqlFavoritesStore> {
    let store = LibSqlFavoritesStore::open_in_memory().await.unwrap();
    ReconciliationEngine::init(api, store).await.unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn add_confirms_with_server_id() {
    let engine = engine_with(FakeApi::default()).await;

    engine.add_favorite(TargetKind::Catalog, "C1").await.unwrap();

    let favorite = engine.get(TargetKind::Catalog, "C1").await.unwrap();
    assert_eq!(favorite.id, FavoriteId::Server("srv-1".to_string()));
    assert_eq!(engine.api().calls(), vec!["create catalog:C1"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn add_keeps_position_and_created_at_when_confirmed() {
    let engine = engine_with(FakeApi::with_records(vec![
        record("srv-a", Some("C0"), None),
        record("srv-b", None, Some("P0")),
    ]))
    .await;
    engine.sync_from_server().await.unwrap();

    let before = Utc::now().timestamp_millis();
    engine.add_favorite(TargetKind::Product, "P1").await.unwrap();

    let listed = engine.list(None).await;
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[2].target_id, "P1");
    assert!(!listed[2].id.is_temporary());
    assert!(listed[2].created_at >= before);
}

#[tokio::test(flavor = "multi_thread")]
async fn add_failure_rolls_back_optimistic_insert() {
    let api = FakeApi::default();
    api.fail_create.store(true, Ordering::SeqCst);
    let engine = engine_with(api).await;

    let error = engine
        .add_favorite(TargetKind::Catalog, "X")
        .await
        .unwrap_err();

    assert!(matches!(error, Error::AddFavoriteFailed { ref target, .. } if target.target_id == "X"));
    assert!(!engine.is_favorite(TargetKind::Catalog, "X").await);
    assert!(engine.list(None).await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn add_existing_favorite_is_a_noop() {
    let engine = engine_with(FakeApi::with_records(vec![record("srv-1", Some("C1"), None)])).await;
    engine.sync_from_server().await.unwrap();

    engine.add_favorite(TargetKind::Catalog, "C1").await.unwrap();

    assert_eq!(engine.list(None).await.len(), 1);
    assert_eq!(engine.api().calls(), vec!["list"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn remove_failure_restores_identical_entity() {
    let engine = engine_with(FakeApi::with_records(vec![record("srv-7", None, Some("Y"))])).await;
    engine.sync_from_server().await.unwrap();
    let before = engine.get(TargetKind::Product, "Y").await.unwrap();
    engine.api().fail_delete.store(true, Ordering::SeqCst);

    let error = engine
        .remove_favorite(TargetKind::Product, "Y")
        .await
        .unwrap_err();

    assert!(matches!(error, Error::RemoveFavoriteFailed { .. }));
    assert!(engine.is_favorite(TargetKind::Product, "Y").await);
    let after = engine.get(TargetKind::Product, "Y").await.unwrap();
    assert_eq!(after.id, before.id);
    assert_eq!(after.created_at, before.created_at);
}

#[tokio::test(flavor = "multi_thread")]
async fn remove_failure_restores_original_position() {
    let engine = engine_with(FakeApi::with_records(vec![
        record("srv-1", Some("C1"), None),
        record("srv-2", None, Some("P1")),
        record("srv-3", Some("C2"), None),
    ]))
    .await;
    engine.sync_from_server().await.unwrap();
    let before = engine.list(None).await;
    engine.api().fail_delete.store(true, Ordering::SeqCst);

    assert!(engine.toggle_favorite(TargetKind::Product, "P1").await.is_err());

    assert_eq!(engine.list(None).await, before);
}

#[tokio::test(flavor = "multi_thread")]
async fn remove_absent_target_is_a_noop() {
    let engine = engine_with(FakeApi::default()).await;

    engine
        .remove_favorite(TargetKind::Product, "missing")
        .await
        .unwrap();

    assert!(engine.api().calls().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn remove_deletes_by_server_id() {
    let engine = engine_with(FakeApi::with_records(vec![record("srv-3", Some("C3"), None)])).await;
    engine.sync_from_server().await.unwrap();

    engine.remove_favorite(TargetKind::Catalog, "C3").await.unwrap();

    assert!(!engine.is_favorite(TargetKind::Catalog, "C3").await);
    assert_eq!(engine.api().calls(), vec!["list", "delete srv-3"]);
    assert!(engine.api().server_ids().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn toggle_converges_on_parity() {
    let engine = engine_with(FakeApi::default()).await;

    for round in 1..=6 {
        let favorited = engine.toggle_favorite(TargetKind::Catalog, "C1").await.unwrap();
        assert_eq!(favorited, round % 2 == 1);
        assert_eq!(engine.is_favorite(TargetKind::Catalog, "C1").await, favorited);
    }

    assert!(engine.list(None).await.is_empty());
    assert!(engine.api().server_ids().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn toggle_failure_reverts_to_previous_state() {
    let engine = engine_with(FakeApi::default()).await;
    engine.api().fail_create.store(true, Ordering::SeqCst);

    assert!(engine.toggle_favorite(TargetKind::Product, "P1").await.is_err());
    assert!(!engine.is_favorite(TargetKind::Product, "P1").await);
}

#[tokio::test(flavor = "multi_thread")]
async fn readers_normalize_target_ids_like_mutations() {
    let engine = engine_with(FakeApi::default()).await;

    assert!(engine.toggle_favorite(TargetKind::Catalog, " C1 ").await.unwrap());

    assert!(engine.is_favorite(TargetKind::Catalog, " C1 ").await);
    assert!(engine.is_favorite(TargetKind::Catalog, "C1").await);
    assert_eq!(
        engine.get(TargetKind::Catalog, "\tC1").await.unwrap().target_id,
        "C1"
    );
    assert!(!engine.is_favorite(TargetKind::Catalog, "  ").await);
    assert!(engine.get(TargetKind::Catalog, "").await.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn toggle_rejects_blank_target() {
    let engine = engine_with(FakeApi::default()).await;

    let error = engine
        .toggle_favorite(TargetKind::Catalog, "  ")
        .await
        .unwrap_err();
    assert!(matches!(error, Error::InvalidFavoriteShape(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn overlapping_toggles_on_one_target_are_serialized() {
    let gate = Arc::new(Notify::new());
    let engine = engine_with(FakeApi::gated(gate.clone())).await;

    let (first, second, ()) = tokio::join!(
        engine.toggle_favorite(TargetKind::Catalog, "C1"),
        engine.toggle_favorite(TargetKind::Catalog, "C1"),
        async {
            wait_for_calls(engine.api(), 1).await;
            tokio::time::sleep(Duration::from_millis(20)).await;
            // The second toggle must still be queued behind the first.
            assert_eq!(engine.api().calls(), vec!["create catalog:C1"]);
            assert!(engine.is_favorite(TargetKind::Catalog, "C1").await);
            gate.notify_one();
        }
    );

    assert!(first.unwrap());
    assert!(!second.unwrap());
    assert_eq!(
        engine.api().calls(),
        vec!["create catalog:C1", "delete srv-1"]
    );
    assert!(!engine.is_favorite(TargetKind::Catalog, "C1").await);
    assert!(engine.in_flight.lock().await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn mutations_on_different_targets_do_not_wait_for_each_other() {
    let gate = Arc::new(Notify::new());
    let engine = engine_with(FakeApi::gated(gate.clone())).await;

    let (first, second, ()) = tokio::join!(
        engine.add_favorite(TargetKind::Catalog, "C1"),
        engine.add_favorite(TargetKind::Catalog, "C2"),
        async {
            wait_for_calls(engine.api(), 2).await;
            assert_eq!(
                engine.api().calls(),
                vec!["create catalog:C1", "create catalog:C2"]
            );
            gate.notify_one();
            gate.notify_one();
        }
    );

    first.unwrap();
    second.unwrap();
    assert_eq!(engine.list(None).await.len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn sync_replaces_instead_of_merging() {
    let engine = engine_with(FakeApi::with_records(vec![record("srv-1", Some("C1"), None)])).await;
    {
        // A leftover unconfirmed entity, e.g. restored from a crashed run
        let mut cache = engine.cache.lock().await;
        cache
            .insert(Favorite::optimistic(&TargetKey::new(TargetKind::Product, "stale")))
            .unwrap();
    }

    let count = engine.sync_from_server().await.unwrap();

    assert_eq!(count, 1);
    assert_eq!(
        engine.list(None).await,
        vec![Favorite {
            id: FavoriteId::Server("srv-1".to_string()),
            target_kind: TargetKind::Catalog,
            target_id: "C1".to_string(),
            created_at: 1_700_000_000_000,
        }]
    );
    let status = engine.status().await;
    assert!(status.synced);
    assert!(!status.loading);
    assert!(status.last_synced_at.is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_sync_preserves_cache_and_clears_loading() {
    let engine = engine_with(FakeApi::with_records(vec![
        record("srv-1", Some("C1"), None),
        record("srv-2", None, Some("P1")),
    ]))
    .await;
    engine.sync_from_server().await.unwrap();
    let before = engine.list(None).await;
    engine.api().fail_list.store(true, Ordering::SeqCst);

    let error = engine.sync_from_server().await.unwrap_err();

    assert!(matches!(error, Error::SyncFailed(_)));
    assert_eq!(engine.list(None).await, before);
    assert!(!engine.status().await.loading);
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_server_record_fails_sync_without_partial_replace() {
    let engine = engine_with(FakeApi::default()).await;
    engine.add_favorite(TargetKind::Catalog, "C9").await.unwrap();
    let before = engine.list(None).await;
    engine
        .api()
        .records
        .lock()
        .unwrap()
        .push(record("srv-bad", Some("C1"), Some("P1")));

    let error = engine.sync_from_server().await.unwrap_err();

    assert!(matches!(error, Error::SyncFailed(ApiError::InvalidPayload(_))));
    assert_eq!(engine.list(None).await, before);
    let status = engine.status().await;
    assert!(!status.loading);
    assert!(!status.synced);
}

#[tokio::test(flavor = "multi_thread")]
async fn repeated_sync_is_idempotent() {
    let engine = engine_with(FakeApi::with_records(vec![record("srv-1", Some("C1"), None)])).await;

    engine.sync_from_server().await.unwrap();
    let first = engine.list(None).await;
    engine.sync_from_server().await.unwrap();

    assert_eq!(engine.list(None).await, first);
    assert_eq!(engine.api().calls(), vec!["list", "list"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn removing_unconfirmed_favorite_skips_delete_request() {
    let engine = engine_with(FakeApi::default()).await;
    engine
        .cache
        .lock()
        .await
        .insert(Favorite::optimistic(&TargetKey::new(TargetKind::Catalog, "C1")))
        .unwrap();

    engine.remove_favorite(TargetKind::Catalog, "C1").await.unwrap();

    assert!(!engine.is_favorite(TargetKind::Catalog, "C1").await);
    assert!(engine.api().calls().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn favorites_survive_restart_as_provisional_state() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("faves.db");

    {
        let store = LibSqlFavoritesStore::open_path(&path).await.unwrap();
        let engine = ReconciliationEngine::init(FakeApi::default(), store)
            .await
            .unwrap();
        engine.add_favorite(TargetKind::Product, "P1").await.unwrap();
        engine.add_favorite(TargetKind::Catalog, "C1").await.unwrap();
        engine.remove_favorite(TargetKind::Product, "P1").await.unwrap();
    }

    let store = LibSqlFavoritesStore::open_path(&path).await.unwrap();
    let restarted = ReconciliationEngine::init(FakeApi::default(), store)
        .await
        .unwrap();

    assert!(restarted.is_favorite(TargetKind::Catalog, "C1").await);
    assert!(!restarted.is_favorite(TargetKind::Product, "P1").await);
    assert_eq!(restarted.status().await, SyncStatus::default());
}

#[tokio::test(flavor = "multi_thread")]
async fn persisted_snapshot_tracks_rollbacks() {
    let store = LibSqlFavoritesStore::open_in_memory().await.unwrap();
    let api = FakeApi::default();
    api.fail_create.store(true, Ordering::SeqCst);
    let engine = ReconciliationEngine::init(api, store.clone()).await.unwrap();

    engine.add_favorite(TargetKind::Catalog, "C1").await.ok();

    assert_eq!(
        store.load().await.unwrap(),
        Some(FavoritesSnapshot::default())
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn catalog_status_is_read_through() {
    let api = FakeApi::default();
    api.catalogs.lock().unwrap().push(Catalog {
        id: "C1".to_string(),
        name: "Spring line".to_string(),
        status: CatalogStatus::Published,
        updated_at: Utc::now(),
    });
    let engine = engine_with(api).await;

    assert_eq!(
        engine.catalog_status("C1").await.unwrap(),
        CatalogStatus::Published
    );
    assert!(matches!(
        engine.catalog_status("C2").await,
        Err(Error::Api(ApiError::Status { status: 404, .. }))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_confirmed_after_stale_sync_stays_removed() {
    let list_gate = Arc::new(Notify::new());
    let delete_gate = Arc::new(Notify::new());
    let engine = engine_with(FakeApi {
        list_gate: Some(list_gate.clone()),
        delete_gate: Some(delete_gate.clone()),
        ..FakeApi::with_records(vec![record("srv-1", Some("C1"), None)])
    })
    .await;
    list_gate.notify_one();
    engine.sync_from_server().await.unwrap();

    let (synced, removed, ()) = tokio::join!(
        engine.sync_from_server(),
        async {
            // Start the delete only once the sync holds a snapshot with srv-1.
            wait_for_calls(engine.api(), 2).await;
            engine.remove_favorite(TargetKind::Catalog, "C1").await
        },
        async {
            wait_for_calls(engine.api(), 3).await;
            list_gate.notify_one();
            wait_for_sync(&engine).await;
            // The stale snapshot put the favorite back.
            assert!(engine.is_favorite(TargetKind::Catalog, "C1").await);
            delete_gate.notify_one();
        }
    );

    assert_eq!(synced.unwrap(), 1);
    removed.unwrap();
    assert_eq!(engine.api().calls(), vec!["list", "list", "delete srv-1"]);
    assert!(engine.api().server_ids().is_empty());
    assert!(!engine.is_favorite(TargetKind::Catalog, "C1").await);
    assert!(engine.list(None).await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn create_confirmed_after_stale_sync_stays_favorited() {
    let create_gate = Arc::new(Notify::new());
    let list_gate = Arc::new(Notify::new());
    let store = LibSqlFavoritesStore::open_in_memory().await.unwrap();
    let engine = ReconciliationEngine::init(
        FakeApi {
            create_gate: Some(create_gate.clone()),
            list_gate: Some(list_gate.clone()),
            ..FakeApi::default()
        },
        store.clone(),
    )
    .await
    .unwrap();

    let (added, synced, optimistic) = tokio::join!(
        engine.add_favorite(TargetKind::Catalog, "C1"),
        async {
            // The create is pending, so the server snapshot is still empty.
            wait_for_calls(engine.api(), 1).await;
            engine.sync_from_server().await
        },
        async {
            wait_for_calls(engine.api(), 2).await;
            let optimistic = engine.get(TargetKind::Catalog, "C1").await.unwrap();
            list_gate.notify_one();
            wait_for_sync(&engine).await;
            // The sync dropped the unconfirmed entity.
            assert!(!engine.is_favorite(TargetKind::Catalog, "C1").await);
            create_gate.notify_one();
            optimistic
        }
    );

    added.unwrap();
    assert_eq!(synced.unwrap(), 0);
    assert!(optimistic.id.is_temporary());
    let favorite = engine.get(TargetKind::Catalog, "C1").await.unwrap();
    assert_eq!(favorite.id, FavoriteId::Server("srv-1".to_string()));
    assert_eq!(favorite.created_at, optimistic.created_at);
    assert_eq!(engine.api().server_ids(), vec!["srv-1"]);
    assert_eq!(store.load().await.unwrap().unwrap().favorites, vec![favorite]);
}
