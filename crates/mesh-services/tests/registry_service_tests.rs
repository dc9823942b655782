use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use mesh_agent_registry::{
    AgentRecord, AgentStore, CapabilityDeclaration, DependencySpec, HealthPolicy, HealthState,
    KnownResolution, LeadershipCoordinator, LeaseProvider, MemoryAgentStore, MemoryLeaseProvider,
    TimeoutStore,
};
use mesh_services::{
    startup_cleanup, AgentFilter, AgentMetadata, HeartbeatCheck, HeartbeatParams, RegisterParams,
    RegistryService, RegistryServiceImpl, ServiceError,
};

fn policy() -> HealthPolicy {
    HealthPolicy::new(
        Duration::from_secs(10),
        Duration::from_secs(30),
        Duration::from_secs(20),
    )
}

fn make_service() -> (Arc<MemoryAgentStore>, RegistryServiceImpl) {
    let store = Arc::new(MemoryAgentStore::new());
    let service = RegistryServiceImpl::new(
        store.clone(),
        policy(),
        Arc::new(LeadershipCoordinator::disabled("test")),
    )
    .with_sweep_batch_size(2);
    (store, service)
}

fn provider(agent_id: &str, capability: &str, tags: &[&str]) -> RegisterParams {
    RegisterParams {
        agent_id: agent_id.to_string(),
        metadata: AgentMetadata {
            endpoint: format!("http://{}:9000", agent_id),
            version: "1.0.0".to_string(),
            capabilities: vec![CapabilityDeclaration::new(capability)
                .with_tags(tags.iter().copied())
                .with_version("1.0.0")],
            ..Default::default()
        },
    }
}

fn consumer(agent_id: &str, needs: &[&str]) -> RegisterParams {
    RegisterParams {
        agent_id: agent_id.to_string(),
        metadata: AgentMetadata {
            endpoint: format!("http://{}:9000", agent_id),
            dependencies: needs.iter().map(|c| DependencySpec::new(*c)).collect(),
            ..Default::default()
        },
    }
}

fn heartbeat(agent_id: &str) -> HeartbeatParams {
    HeartbeatParams {
        agent_id: agent_id.to_string(),
        ..Default::default()
    }
}

/// Pretend the agent went silent `secs` seconds ago
async fn backdate(store: &MemoryAgentStore, agent_id: &str, secs: i64) {
    let mut record = store.get(agent_id).await.unwrap().unwrap();
    record.last_heartbeat_at = Utc::now() - chrono::Duration::seconds(secs);
    store.upsert(&record).await.unwrap();
}

#[tokio::test]
async fn register_returns_every_dependency() {
    let (_, service) = make_service();
    service.register(provider("date-agent", "date", &[])).await.unwrap();

    let outcome = service
        .register(consumer("app", &["date", "weather"]))
        .await
        .unwrap();

    assert_eq!(outcome.resolutions.len(), 2);
    let date = &outcome.resolutions[0];
    assert_eq!(date.dep_index, 0);
    assert_eq!(date.provider.as_ref().unwrap().agent_id, "date-agent");
    assert_eq!(date.provider.as_ref().unwrap().endpoint, "http://date-agent:9000");
    assert!(!outcome.resolutions[1].is_resolved());
}

#[tokio::test]
async fn reregistration_is_idempotent() {
    let (_, service) = make_service();
    let first = service.register(provider("a1", "date", &["system"])).await.unwrap();
    service.register(provider("a1", "date", &["system"])).await.unwrap();

    assert_eq!(service.index().providers("date").len(), 1);
    let agents = service.list_agents(AgentFilter::default()).await.unwrap();
    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0].record.registered_at, first.timestamp);
    assert_eq!(agents[0].health, HealthState::Healthy);
}

#[tokio::test]
async fn invalid_registration_leaves_no_trace() {
    let (store, service) = make_service();
    let mut params = provider("a1", "date", &[]);
    params.metadata.endpoint = "ftp://nowhere".to_string();

    let err = service.register(params).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidRequest(_)));
    assert!(store.list().await.unwrap().is_empty());
    assert!(service.index().providers("date").is_empty());

    let err = service.register(provider("", "date", &[])).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidRequest(_)));
}

#[tokio::test]
async fn heartbeat_for_unknown_agent_is_not_registered() {
    let (_, service) = make_service();
    let err = service.heartbeat(heartbeat("ghost")).await.unwrap_err();
    assert_eq!(err, ServiceError::NotRegistered("ghost".to_string()));
}

#[tokio::test]
async fn heartbeat_reports_only_changes() {
    let (_, service) = make_service();
    service.register(provider("p1", "date", &[])).await.unwrap();
    service.register(consumer("app", &["date"])).await.unwrap();

    let known = vec![KnownResolution {
        dep_index: 0,
        agent_id: Some("p1".to_string()),
        endpoint: Some("http://p1:9000".to_string()),
    }];
    let outcome = service
        .heartbeat(HeartbeatParams {
            known_resolutions: Some(known.clone()),
            ..heartbeat("app")
        })
        .await
        .unwrap();
    assert!(outcome.resolutions.is_empty());

    service.deregister("p1").await.unwrap();
    let outcome = service
        .heartbeat(HeartbeatParams {
            known_resolutions: Some(known),
            ..heartbeat("app")
        })
        .await
        .unwrap();
    assert_eq!(outcome.resolutions.len(), 1);
    assert!(!outcome.resolutions[0].is_resolved());

    // Without known state the full set comes back
    let outcome = service.heartbeat(heartbeat("app")).await.unwrap();
    assert_eq!(outcome.resolutions.len(), 1);
}

#[tokio::test]
async fn self_reported_unhealthy_is_clamped() {
    let (_, service) = make_service();
    service.register(provider("p1", "date", &[])).await.unwrap();

    let outcome = service
        .heartbeat(HeartbeatParams {
            status: Some("unhealthy".to_string()),
            ..heartbeat("p1")
        })
        .await
        .unwrap();
    assert_eq!(outcome.health, HealthState::Degraded);

    let outcome = service
        .heartbeat(HeartbeatParams {
            status: Some("healthy".to_string()),
            ..heartbeat("p1")
        })
        .await
        .unwrap();
    assert_eq!(outcome.health, HealthState::Healthy);
}

#[tokio::test]
async fn unknown_status_is_rejected() {
    let (_, service) = make_service();
    service.register(provider("p1", "date", &[])).await.unwrap();

    let err = service
        .heartbeat(HeartbeatParams {
            status: Some("sleepy".to_string()),
            ..heartbeat("p1")
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidRequest(_)));
}

#[tokio::test]
async fn heartbeat_metadata_replaces_capabilities() {
    let (_, service) = make_service();
    service.register(provider("p1", "date", &[])).await.unwrap();

    let replacement = provider("p1", "weather", &[]).metadata;
    service
        .heartbeat(HeartbeatParams {
            metadata: Some(replacement),
            ..heartbeat("p1")
        })
        .await
        .unwrap();

    assert!(service.index().providers("date").is_empty());
    assert_eq!(service.index().providers("weather").len(), 1);
}

#[tokio::test]
async fn silent_agent_walks_every_state() {
    let (store, service) = make_service();
    service.register(provider("p1", "date", &[])).await.unwrap();
    backdate(&store, "p1", 1_000).await;

    let mut seen = Vec::new();
    for _ in 0..3 {
        service.sweep().await.unwrap();
        match service.get_agent("p1").await {
            Ok(snapshot) => seen.push(snapshot.record.health),
            Err(ServiceError::NotRegistered(_)) => seen.push(HealthState::Evicted),
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(
        seen,
        vec![HealthState::Degraded, HealthState::Unhealthy, HealthState::Evicted]
    );
    assert_eq!(service.index().agent_count(), 0);
}

#[tokio::test]
async fn eviction_frees_capability_slot() {
    let (store, service) = make_service();
    service.register(provider("p1", "date", &[])).await.unwrap();
    let registered = service.register(consumer("app", &["date"])).await.unwrap();
    assert!(registered.resolutions[0].is_resolved());

    backdate(&store, "p1", 1_000).await;
    for _ in 0..3 {
        service.sweep().await.unwrap();
    }

    let known = vec![KnownResolution {
        dep_index: 0,
        agent_id: Some("p1".to_string()),
        endpoint: Some("http://p1:9000".to_string()),
    }];
    let outcome = service
        .heartbeat(HeartbeatParams {
            known_resolutions: Some(known),
            ..heartbeat("app")
        })
        .await
        .unwrap();
    assert_eq!(outcome.resolutions.len(), 1);
    assert!(!outcome.resolutions[0].is_resolved());

    service.register(provider("p2", "date", &[])).await.unwrap();
    let outcome = service
        .heartbeat(HeartbeatParams {
            known_resolutions: Some(vec![KnownResolution {
                dep_index: 0,
                agent_id: None,
                endpoint: None,
            }]),
            ..heartbeat("app")
        })
        .await
        .unwrap();
    assert_eq!(outcome.resolutions[0].provider.as_ref().unwrap().agent_id, "p2");
}

#[tokio::test]
async fn late_heartbeat_recovers_unhealthy_agent() {
    let (store, service) = make_service();
    service.register(provider("p1", "date", &[])).await.unwrap();
    backdate(&store, "p1", 35).await;

    service.sweep().await.unwrap();
    service.sweep().await.unwrap();
    assert_eq!(
        service.get_agent("p1").await.unwrap().record.health,
        HealthState::Unhealthy
    );

    let outcome = service.heartbeat(heartbeat("p1")).await.unwrap();
    assert_eq!(outcome.health, HealthState::Healthy);
}

#[tokio::test]
async fn degraded_provider_loses_to_healthy_one() {
    let (_, service) = make_service();
    service.register(provider("a-provider", "date", &[])).await.unwrap();
    service.register(provider("b-provider", "date", &[])).await.unwrap();
    service
        .heartbeat(HeartbeatParams {
            status: Some("degraded".to_string()),
            ..heartbeat("a-provider")
        })
        .await
        .unwrap();

    let outcome = service.register(consumer("app", &["date"])).await.unwrap();
    assert_eq!(
        outcome.resolutions[0].provider.as_ref().unwrap().agent_id,
        "b-provider"
    );
}

#[tokio::test]
async fn deregister_is_idempotent() {
    let (_, service) = make_service();
    service.register(provider("p1", "date", &[])).await.unwrap();

    assert!(service.deregister("p1").await.unwrap());
    assert!(!service.deregister("p1").await.unwrap());
    assert!(service.index().providers("date").is_empty());
}

#[tokio::test]
async fn deregister_of_impossible_id_is_a_no_op() {
    let (_, service) = make_service();
    let too_long = "a".repeat(300);

    assert!(!service.deregister(&too_long).await.unwrap());
    assert!(!service.deregister("").await.unwrap());
}

#[tokio::test]
async fn heartbeat_probe_tracks_topology() {
    let (_, service) = make_service();
    service.register(consumer("app", &["date"])).await.unwrap();
    assert_eq!(service.check_heartbeat("app").await.unwrap(), HeartbeatCheck::Unchanged);

    service.register(provider("p1", "date", &[])).await.unwrap();
    assert_eq!(
        service.check_heartbeat("app").await.unwrap(),
        HeartbeatCheck::TopologyChanged
    );

    service.heartbeat(heartbeat("app")).await.unwrap();
    assert_eq!(service.check_heartbeat("app").await.unwrap(), HeartbeatCheck::Unchanged);

    assert!(matches!(
        service.check_heartbeat("ghost").await,
        Err(ServiceError::NotRegistered(_))
    ));
}

#[tokio::test]
async fn list_filters() {
    let (_, service) = make_service();
    service.register(provider("p1", "weather_forecast", &[])).await.unwrap();
    service.register(provider("p2", "date", &[])).await.unwrap();
    service
        .heartbeat(HeartbeatParams {
            status: Some("degraded".to_string()),
            ..heartbeat("p2")
        })
        .await
        .unwrap();

    let exact = service
        .list_agents(AgentFilter {
            capability: Some("weather".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(exact.is_empty());

    let fuzzy = service
        .list_agents(AgentFilter {
            capability: Some("WEATHER".to_string()),
            fuzzy: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(fuzzy.len(), 1);
    assert_eq!(fuzzy[0].record.agent_id, "p1");

    let degraded = service
        .list_agents(AgentFilter {
            status: Some(HealthState::Degraded),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(degraded.len(), 1);
    assert_eq!(degraded[0].record.agent_id, "p2");
}

#[tokio::test]
async fn concurrent_registrations_are_not_lost() {
    let (_, service) = make_service();
    let service = Arc::new(service);

    let mut handles = Vec::new();
    for i in 0..50 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .register(provider(&format!("agent-{i}"), "echo", &[]))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(service.list_agents(AgentFilter::default()).await.unwrap().len(), 50);
    assert_eq!(service.index().providers("echo").len(), 50);
}

#[tokio::test]
async fn persisted_records_are_indexed_on_first_write() {
    let store = Arc::new(MemoryAgentStore::new());
    let mut record = AgentRecord::new("p1", Utc::now());
    record.endpoint = "http://p1:9000".to_string();
    record.health = HealthState::Healthy;
    record.capabilities = vec![CapabilityDeclaration::new("date")];
    store.upsert(&record).await.unwrap();

    let service = RegistryServiceImpl::new(
        store,
        policy(),
        Arc::new(LeadershipCoordinator::disabled("test")),
    );
    let outcome = service.register(consumer("app", &["date"])).await.unwrap();
    assert_eq!(outcome.resolutions[0].provider.as_ref().unwrap().agent_id, "p1");
}

#[tokio::test]
async fn startup_cleanup_demotes_stale_records() {
    let store = Arc::new(MemoryAgentStore::new());
    let mut record = AgentRecord::new("stale", Utc::now() - chrono::Duration::seconds(600));
    record.health = HealthState::Healthy;
    store.upsert(&record).await.unwrap();

    let service = RegistryServiceImpl::new(
        store,
        policy(),
        Arc::new(LeadershipCoordinator::disabled("test")),
    );
    let report = startup_cleanup(&service).await.unwrap();
    assert_eq!(report.demoted, 1);
    assert_eq!(
        service.get_agent("stale").await.unwrap().record.health,
        HealthState::Degraded
    );
}

#[tokio::test]
async fn follower_rejects_writes_but_serves_reads() {
    let lease = Arc::new(MemoryLeaseProvider::new());
    lease.try_acquire("other-replica", Duration::from_secs(60)).await.unwrap();
    let leadership = Arc::new(LeadershipCoordinator::new(lease, "me", Duration::from_secs(15)));
    assert!(!leadership.tick().await);

    let service = RegistryServiceImpl::new(Arc::new(MemoryAgentStore::new()), policy(), leadership);

    assert_eq!(
        service.register(provider("p1", "date", &[])).await.unwrap_err(),
        ServiceError::NotLeader
    );
    assert_eq!(service.sweep().await.unwrap_err(), ServiceError::NotLeader);
    assert!(service.list_agents(AgentFilter::default()).await.unwrap().is_empty());
    assert!(!service.stats().is_leader);
}

/// Store that never answers
struct StalledStore;

#[async_trait]
impl AgentStore for StalledStore {
    async fn upsert(&self, _record: &AgentRecord) -> mesh_agent_registry::Result<()> {
        std::future::pending().await
    }

    async fn get(&self, _agent_id: &str) -> mesh_agent_registry::Result<Option<AgentRecord>> {
        std::future::pending().await
    }

    async fn list(&self) -> mesh_agent_registry::Result<Vec<AgentRecord>> {
        std::future::pending().await
    }

    async fn delete(&self, _agent_id: &str) -> mesh_agent_registry::Result<bool> {
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn store_timeout_surfaces_as_unavailable() {
    let store = Arc::new(TimeoutStore::new(Arc::new(StalledStore), Duration::from_millis(50)));
    let service = RegistryServiceImpl::new(
        store,
        policy(),
        Arc::new(LeadershipCoordinator::disabled("test")),
    );

    assert!(matches!(
        service.register(provider("p1", "date", &[])).await,
        Err(ServiceError::StoreUnavailable(_))
    ));
    assert!(matches!(
        service.get_agent("p1").await,
        Err(ServiceError::StoreUnavailable(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn regained_leadership_reloads_index_from_store() {
    let ttl = Duration::from_secs(15);
    let store: Arc<dyn AgentStore> = Arc::new(MemoryAgentStore::new());
    let lease = Arc::new(MemoryLeaseProvider::new());
    let leader_a = Arc::new(LeadershipCoordinator::new(lease.clone(), "a", ttl));
    let leader_b = Arc::new(LeadershipCoordinator::new(lease, "b", ttl));
    let replica_a = RegistryServiceImpl::new(store.clone(), policy(), leader_a.clone());
    let replica_b = RegistryServiceImpl::new(store.clone(), policy(), leader_b.clone());

    assert!(leader_a.tick().await);
    replica_a.register(provider("p1", "date", &[])).await.unwrap();

    // a stops renewing; b takes over and changes the topology
    tokio::time::advance(ttl + Duration::from_secs(1)).await;
    assert!(!leader_a.is_leader());
    assert!(leader_b.tick().await);
    assert!(replica_b.deregister("p1").await.unwrap());
    replica_b.register(provider("p2", "date", &[])).await.unwrap();
    leader_b.step_down().await;

    // a leads again without having seen a write as follower
    assert!(leader_a.tick().await);
    let outcome = replica_a.register(consumer("c", &["date"])).await.unwrap();

    let winner = outcome.resolutions[0].provider.as_ref().map(|p| p.agent_id.as_str());
    assert_eq!(winner, Some("p2"));
    assert!(replica_a.index().providers("date").iter().all(|slot| slot.agent_id != "p1"));
}
