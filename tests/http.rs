use once_cell::sync::Lazy;
use reqwest::Client;
use serde::Deserialize;
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
struct GoalView {
    id: String,
    current: i64,
    remaining: i64,
    days_left: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ChecklistView {
    id: String,
    checked: bool,
}

#[derive(Debug, Deserialize)]
struct CardSnapshot {
    title: String,
    goals: Vec<GoalView>,
    checklist: Vec<ChecklistView>,
}

const CARD_CONFIG: &str = r#"{
  "title": "Daily goals",
  "goals": [
    { "name": "Water", "target": 100, "avg_per_day": 2 },
    { "name": "Steps", "target": 8000, "avgPerDay": 900 }
  ],
  "checklist": [
    { "label": "Vitamins" },
    { "label": "Stretch" }
  ]
}"#;

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::Once;
    use std::sync::atomic::{AtomicI32, Ordering};

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_path(tag: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("goal_card_{tag}_{}_{}.json", std::process::id(), nanos))
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/card")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let config_path = unique_path("card");
    let data_path = unique_path("counters");
    std::fs::write(&config_path, CARD_CONFIG).expect("write card config");

    let child = Command::new(env!("CARGO_BIN_EXE_goal_card"))
        .env("PORT", port.to_string())
        .env("CARD_CONFIG_PATH", &config_path)
        .env("CARD_DATA_PATH", &data_path)
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn fetch_card(client: &Client, base_url: &str) -> CardSnapshot {
    client
        .get(format!("{base_url}/api/card"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

fn goal<'a>(snapshot: &'a CardSnapshot, id: &str) -> &'a GoalView {
    snapshot
        .goals
        .iter()
        .find(|goal| goal.id == id)
        .unwrap_or_else(|| panic!("missing goal '{id}'"))
}

fn item<'a>(snapshot: &'a CardSnapshot, id: &str) -> &'a ChecklistView {
    snapshot
        .checklist
        .iter()
        .find(|item| item.id == id)
        .unwrap_or_else(|| panic!("missing checklist item '{id}'"))
}

#[tokio::test]
async fn http_card_lists_configured_goals() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let snapshot = fetch_card(&client, &server.base_url).await;
    assert_eq!(snapshot.title, "Daily goals");
    let ids: Vec<&str> = snapshot.goals.iter().map(|goal| goal.id.as_str()).collect();
    assert_eq!(ids, vec!["water", "steps"]);
    let ids: Vec<&str> = snapshot.checklist.iter().map(|item| item.id.as_str()).collect();
    assert_eq!(ids, vec!["vitamins", "stretch"]);
}

#[tokio::test]
async fn http_increment_is_optimistic_then_persisted() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let before = fetch_card(&client, &server.base_url).await;
    let base = goal(&before, "water").current;

    let snapshot: CardSnapshot = client
        .post(format!("{}/api/goal/water/increment", server.base_url))
        .json(&serde_json::json!({ "amount": 9 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(goal(&snapshot, "water").current, base + 9, "optimistic, before any flush");

    let snapshot: CardSnapshot = client
        .post(format!("{}/api/goal/water/increment", server.base_url))
        .json(&serde_json::json!({ "amount": 18 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let water = goal(&snapshot, "water");
    assert_eq!(water.current, base + 27);
    if water.remaining > 0 {
        assert_eq!(water.days_left, Some((water.remaining + 1) / 2));
    }

    // Past the debounce window the coalesced delta is in the store.
    sleep(Duration::from_millis(1500)).await;
    let after = fetch_card(&client, &server.base_url).await;
    assert_eq!(goal(&after, "water").current, base + 27);
    assert_eq!(goal(&after, "steps").current, goal(&before, "steps").current);
}

#[tokio::test]
async fn http_toggle_checklist_roundtrip() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let snapshot: CardSnapshot = client
        .post(format!("{}/api/check/vitamins", server.base_url))
        .json(&serde_json::json!({ "checked": true }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(item(&snapshot, "vitamins").checked);
    assert!(!item(&snapshot, "stretch").checked);

    let snapshot: CardSnapshot = client
        .post(format!("{}/api/check/vitamins", server.base_url))
        .json(&serde_json::json!({ "checked": false }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!item(&snapshot, "vitamins").checked);
}

#[tokio::test]
async fn http_rejects_unknown_ids_and_zero_amounts() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/api/goal/nope/increment", server.base_url))
        .json(&serde_json::json!({ "amount": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let response = client
        .post(format!("{}/api/goal/water/increment", server.base_url))
        .json(&serde_json::json!({ "amount": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let response = client
        .post(format!("{}/api/check/nope", server.base_url))
        .json(&serde_json::json!({ "checked": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn http_config_update_replaces_the_card() {
    let _guard = TEST_LOCK.lock().await;
    // Private server: this test rewrites the configuration.
    let server = spawn_server().await;
    let client = Client::new();

    let snapshot: CardSnapshot = client
        .put(format!("{}/api/config", server.base_url))
        .json(&serde_json::json!({
            "title": "Evening goals",
            "goals": [{ "name": "Reading", "target": 50, "per_day": 5 }]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(snapshot.title, "Evening goals");
    let ids: Vec<&str> = snapshot.goals.iter().map(|goal| goal.id.as_str()).collect();
    assert_eq!(ids, vec!["reading"]);
    assert!(snapshot.checklist.is_empty());

    let config: serde_json::Value = client
        .get(format!("{}/api/config", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(config["title"], "Evening goals");
    assert_eq!(config["goals"][0]["id"], "reading");
    assert_eq!(config["goals"][0]["avg_per_day"], 5.0);
}

#[tokio::test]
async fn http_checklist_import_skips_existing_labels() {
    let _guard = TEST_LOCK.lock().await;
    // Private server: this test grows the checklist.
    let server = spawn_server().await;
    let client = Client::new();

    let snapshot: CardSnapshot = client
        .post(format!("{}/api/checklist/items", server.base_url))
        .json(&serde_json::json!({
            "labels": ["vitamins", "Read 10 pages", "   ", "STRETCH"]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let ids: Vec<&str> = snapshot.checklist.iter().map(|item| item.id.as_str()).collect();
    assert_eq!(ids, vec!["vitamins", "stretch", "read_10_pages"]);
}
