use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn docsync() -> Command {
    let mut cmd = Command::cargo_bin("docsync").expect("Binary exists");
    cmd.env_remove("DOCSYNC_CONFIG")
        .env("ANTHROPIC_BASE_URL", "http://127.0.0.1:9")
        .env("NOTION_BASE_URL", "http://127.0.0.1:9");
    cmd
}

#[test]
fn missing_root_exits_non_zero() {
    let workdir = TempDir::new().unwrap();

    docsync()
        .current_dir(workdir.path())
        .arg("does-not-exist")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn default_root_is_src_in_working_directory() {
    let workdir = TempDir::new().unwrap();

    docsync()
        .current_dir(workdir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist").and(predicate::str::contains("src")));
}

#[test]
fn root_without_eligible_files_fails() {
    let workdir = TempDir::new().unwrap();
    let root = workdir.path().join("src");
    fs::create_dir_all(root.join("node_modules")).unwrap();
    fs::write(root.join("node_modules/dep.js"), "x").unwrap();
    fs::write(root.join("notes.txt"), "hello").unwrap();

    docsync()
        .current_dir(workdir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no eligible"));
}

#[test]
fn invalid_settings_file_fails_before_any_request() {
    let workdir = TempDir::new().unwrap();
    fs::create_dir_all(workdir.path().join("src")).unwrap();
    fs::write(workdir.path().join("src/a.rs"), "fn a() {}").unwrap();
    fs::write(workdir.path().join("docsync.yaml"), "extensions: cobol\n").unwrap();

    docsync()
        .current_dir(workdir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported extensions preset"));
}

fn file_artifact(title: &str) -> String {
    json!({
        "title": title,
        "description": "Counts things.",
        "mechanism": "Increments a value.",
        "technical_notes": "- uses u64",
        "error_catalog": [{"error_message": "overflow", "explanation": "too many"}],
        "diagram": ""
    })
    .to_string()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn per_file_run_creates_records_through_both_services() {
    let model = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": file_artifact("Counter")}]
        })))
        .expect(1)
        .mount(&model)
        .await;

    let notion = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/databases/db-1/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .expect(1)
        .mount(&notion)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/pages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "page-1"})))
        .expect(1)
        .mount(&notion)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/v1/blocks/page-1/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .expect(1)
        .mount(&notion)
        .await;

    let workdir = TempDir::new().unwrap();
    let root = workdir.path().join("app");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("counter.rs"), "pub struct Counter(u64);").unwrap();
    fs::write(workdir.path().join("docsync.yaml"), "cooldown_ms: 0\n").unwrap();

    let model_uri = model.uri();
    let notion_uri = notion.uri();
    let workdir_path = workdir.path().to_path_buf();
    let assert = tokio::task::spawn_blocking(move || {
        docsync()
            .current_dir(&workdir_path)
            .arg("app")
            .env("ANTHROPIC_BASE_URL", model_uri)
            .env("ANTHROPIC_API_KEY", "sk-test")
            .env("NOTION_BASE_URL", notion_uri)
            .env("NOTION_API_KEY", "secret")
            .env("NOTION_DATABASE_ID", "db-1")
            .assert()
    })
    .await
    .unwrap();

    assert
        .success()
        .stderr(predicate::str::contains("Documentation run complete"));
}

struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use docsync::cli::{run, Cli};

    let cli = Cli {
        root: std::path::PathBuf::from("definitely/not/here"),
    };

    let _ = run(cli).await;

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
