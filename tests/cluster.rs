//! End-to-end cluster tests for ringkv
//!
//! Each test assembles a real master (axum on an ephemeral port) and real
//! storage nodes (tonic services over tempdir-backed stores) in-process,
//! then drives the cluster through the public HTTP API.

use ringkv::master::cluster::Status;
use ringkv::master::coordinator::Coordinator;
use ringkv::master::http::{create_router, MasterState};
use ringkv::node::grpc::NodeStorageService;
use ringkv::node::store::KvStore;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;

async fn spawn_master() -> (SocketAddr, Arc<Coordinator>) {
    let coordinator = Arc::new(Coordinator::new());
    let router = create_router(MasterState {
        coordinator: coordinator.clone(),
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    (addr, coordinator)
}

type NodeHandle = (SocketAddr, Arc<RwLock<KvStore>>, JoinHandle<()>);

async fn spawn_node(dir: &TempDir, name: &str) -> NodeHandle {
    let store = Arc::new(RwLock::new(KvStore::open(dir.path().join(name)).unwrap()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = spawn_node_on(listener, store.clone());
    (addr, store, handle)
}

fn spawn_node_on(
    listener: tokio::net::TcpListener,
    store: Arc<RwLock<KvStore>>,
) -> JoinHandle<()> {
    let service = NodeStorageService::new(store);
    tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(service.into_server())
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    })
}

async fn join(client: &reqwest::Client, master: SocketAddr, id: &str, port: u16) {
    let response = client
        .post(format!("http://{}/join", master))
        .query(&[("id", id.to_string()), ("port", port.to_string())])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

async fn set(client: &reqwest::Client, master: SocketAddr, key: &str, value: &str) -> u16 {
    client
        .post(format!("http://{}/set", master))
        .json(&serde_json::json!({ "key": key, "value": value }))
        .send()
        .await
        .unwrap()
        .status()
        .as_u16()
}

async fn get(
    client: &reqwest::Client,
    master: SocketAddr,
    key: &str,
) -> (u16, Option<serde_json::Value>) {
    let response = client
        .get(format!("http://{}/get", master))
        .query(&[("key", key)])
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    let body = if status == 200 {
        Some(response.json().await.unwrap())
    } else {
        None
    };
    (status, body)
}

#[tokio::test]
async fn test_set_get_update_delete_roundtrip() {
    let (master, _coordinator) = spawn_master().await;
    let dir = TempDir::new().unwrap();
    let (node_addr, _store, _handle) = spawn_node(&dir, "n1").await;

    let client = reqwest::Client::new();
    join(&client, master, "n1", node_addr.port()).await;

    assert_eq!(set(&client, master, "user:1", "v1").await, 200);

    let (status, body) = get(&client, master, "user:1").await;
    assert_eq!(status, 200);
    let body = body.unwrap();
    assert_eq!(body["key"], "user:1");
    assert_eq!(body["value"], "v1");

    let status = client
        .post(format!("http://{}/update", master))
        .json(&serde_json::json!({ "key": "user:1", "value": "v2" }))
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, 200);

    let (status, body) = get(&client, master, "user:1").await;
    assert_eq!(status, 200);
    assert_eq!(body.unwrap()["value"], "v2");

    let status = client
        .delete(format!("http://{}/delete", master))
        .query(&[("key", "user:1")])
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, 200);

    let (status, _) = get(&client, master, "user:1").await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_unknown_keys_are_not_found() {
    let (master, _coordinator) = spawn_master().await;
    let client = reqwest::Client::new();

    // A key never written is never found, even with no nodes to ask.
    let (status, _) = get(&client, master, "never-written").await;
    assert_eq!(status, 404);

    let status = client
        .delete(format!("http://{}/delete", master))
        .query(&[("key", "never-written")])
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, 404);

    let status = client
        .post(format!("http://{}/update", master))
        .json(&serde_json::json!({ "key": "never-written", "value": "v" }))
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_set_with_no_members_fails() {
    let (master, _coordinator) = spawn_master().await;
    let client = reqwest::Client::new();
    assert_eq!(set(&client, master, "k", "v").await, 404);
}

#[tokio::test]
async fn test_invalid_json_is_bad_request() {
    let (master, _coordinator) = spawn_master().await;
    let client = reqwest::Client::new();

    for path in ["set", "update"] {
        let status = client
            .post(format!("http://{}/{}", master, path))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap()
            .status();
        assert_eq!(status, 400, "POST /{}", path);
    }
}

#[tokio::test]
async fn test_dial_failure_marks_failed_and_rejoin_recovers() {
    let (master, coordinator) = spawn_master().await;
    let dir = TempDir::new().unwrap();
    let (node_addr, store, handle) = spawn_node(&dir, "n1").await;

    let client = reqwest::Client::new();
    join(&client, master, "n1", node_addr.port()).await;
    assert_eq!(set(&client, master, "k", "v").await, 200);

    // Take the node down; its port stops accepting.
    handle.abort();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let (status, _) = get(&client, master, "k").await;
    assert_eq!(status, 404);
    assert_eq!(
        coordinator.cluster().node("n1").unwrap().status(),
        Status::Failed
    );

    // A SET with zero successful replicas reports failure and must not
    // disturb the placement recorded by the earlier successful SET.
    assert_eq!(set(&client, master, "k", "clobbered").await, 404);

    // Bring the node back on the same port and rejoin under the same ID;
    // the registry revives it instead of duplicating it.
    let listener = loop {
        match tokio::net::TcpListener::bind(node_addr).await {
            Ok(listener) => break listener,
            Err(_) => tokio::time::sleep(Duration::from_millis(50)).await,
        }
    };
    let _handle = spawn_node_on(listener, store);
    join(&client, master, "n1", node_addr.port()).await;

    assert_eq!(coordinator.cluster().len(), 1);
    assert_eq!(
        coordinator.cluster().node("n1").unwrap().status(),
        Status::Active
    );

    // The key still carries the value from before the outage: the failed
    // SET touched neither the replicas nor the placement record.
    let (status, body) = get(&client, master, "k").await;
    assert_eq!(status, 200);
    assert_eq!(body.unwrap()["value"], "v");
}

#[tokio::test]
async fn test_replicated_cluster_stores_and_serves() {
    let (master, coordinator) = spawn_master().await;
    let dir = TempDir::new().unwrap();
    let client = reqwest::Client::new();

    let mut stores = Vec::new();
    for i in 0..6 {
        let name = format!("n{}", i);
        let (addr, store, _handle) = spawn_node(&dir, &name).await;
        stores.push(store);
        join(&client, master, &name, addr.port()).await;
    }
    assert!(coordinator.cluster().is_replicated());

    assert_eq!(set(&client, master, "user:1", "v1").await, 200);

    let (status, body) = get(&client, master, "user:1").await;
    assert_eq!(status, 200);
    let body = body.unwrap();
    assert_eq!(body["key"], "user:1");
    assert_eq!(body["value"], "v1");

    // The value must sit on at least one replica, and never more than the
    // replica-set width.
    let copies = stores
        .iter()
        .filter(|store| store.read().unwrap().get(b"user:1").is_some())
        .count();
    assert!((1..=3).contains(&copies), "stored on {} nodes", copies);
}

#[tokio::test]
async fn test_membership_visible_through_health() {
    let (master, _coordinator) = spawn_master().await;
    let client = reqwest::Client::new();

    for i in 0..6u16 {
        join(&client, master, &format!("n{}", i), 9100 + i).await;
    }

    let health: serde_json::Value = client
        .get(format!("http://{}/health", master))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["members"], 6);
    assert_eq!(health["replication"], true);

    let status = client
        .post(format!("http://{}/leave", master))
        .query(&[("id", "n0")])
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, 200);

    let health: serde_json::Value = client
        .get(format!("http://{}/health", master))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["members"], 5);
    assert_eq!(health["replication"], false);
}

#[tokio::test]
async fn test_placement_survives_membership_change() {
    // A node leaving after a SET does not retroactively re-route the key:
    // the cached placement still names the departed node, and the GET
    // falls through to the surviving replica or reports not-found.
    let (master, _coordinator) = spawn_master().await;
    let dir = TempDir::new().unwrap();
    let client = reqwest::Client::new();

    let (addr, _store, _handle) = spawn_node(&dir, "n1").await;
    join(&client, master, "n1", addr.port()).await;
    assert_eq!(set(&client, master, "pinned", "v").await, 200);

    // A new node joining does not move the key.
    let (addr2, store2, _handle2) = spawn_node(&dir, "n2").await;
    join(&client, master, "n2", addr2.port()).await;

    let (status, body) = get(&client, master, "pinned").await;
    assert_eq!(status, 200);
    assert_eq!(body.unwrap()["value"], "v");
    assert!(store2.read().unwrap().is_empty());
}
