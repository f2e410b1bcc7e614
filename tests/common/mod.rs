#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

/// Companies A, B and C; u1 is a user of A and admin of B, u2 is super admin of C
pub fn fixture() -> Value {
    json!({
        "companies": [
            {"id": "A", "name": "Acme", "slug": "acme", "logo_url": null, "status": "active"},
            {"id": "B", "name": "Beta", "slug": "beta", "logo_url": null, "status": "trial"},
            {"id": "C", "name": "Core", "slug": "core", "logo_url": null, "status": "active"}
        ],
        "members": [
            {"user_id": "u1", "company_id": "A", "role": "user"},
            {"user_id": "u1", "company_id": "B", "role": "admin"},
            {"user_id": "u2", "company_id": "C", "role": "super_admin"}
        ]
    })
}

/// Scratch directory holding the directory fixture and the persisted selection
pub struct Workspace {
    pub root: PathBuf,
}

impl Workspace {
    pub fn new() -> Result<Self> {
        let root = std::env::temp_dir().join(format!("company-context-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(root.join("state")).context("failed to create workspace")?;
        std::fs::write(root.join("fixture.json"), serde_json::to_vec_pretty(&fixture())?)
            .context("failed to write directory fixture")?;
        Ok(Self { root })
    }

    pub fn fixture_path(&self) -> PathBuf {
        self.root.join("fixture.json")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join("state")
    }

    pub fn selection_file(&self) -> PathBuf {
        self.state_dir().join("selection.json")
    }

    /// Environment every binary needs to run against this workspace
    fn apply(&self, cmd: &mut Command) {
        cmd.env("APP_ENV", "development")
            .env("DIRECTORY_BACKEND", "fixture")
            .env("DIRECTORY_FIXTURE", self.fixture_path())
            .env("COMPANY_CONTEXT_STATE_DIR", self.state_dir())
            .env_remove("SELECTION_SCOPE")
            .env_remove("SELECTION_KEY")
            .env_remove("DASHBOARD_TOKEN")
            .env_remove("DASHBOARD_USER_ID")
            .env_remove("DASHBOARD_EMAIL")
            .env_remove("SUPABASE_JWT_SECRET");
    }

    /// Run the dashboard CLI against this workspace
    pub fn dashboard(&self, args: &[&str]) -> Result<Output> {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_dashboard"));
        self.apply(&mut cmd);
        cmd.args(args).stdin(Stdio::null());
        cmd.output().context("failed to run dashboard binary")
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub workspace: Arc<Workspace>,
    child: Child,
}

impl TestServer {
    fn spawn(workspace: Arc<Workspace>) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_company-context"));
        workspace.apply(&mut cmd);
        cmd.env("COMPANY_CONTEXT_PORT", port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self {
            port,
            base_url,
            workspace,
            child,
        })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Poll GET /api/context until `done` accepts the context body
    pub async fn wait_for_context(&self, done: impl Fn(&Value) -> bool) -> Result<Value> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let body: Value = client.get(self.url("/api/context")).send().await?.json().await?;
            if done(&body["data"]) {
                return Ok(body["data"].clone());
            }
            if Instant::now() > deadline {
                anyhow::bail!("context never settled, last seen: {}", body);
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Start a bridge on a fresh workspace. Each test gets its own process since
/// the bridge holds a single signed-in identity.
pub async fn start_server() -> Result<TestServer> {
    start_server_in(Arc::new(Workspace::new()?)).await
}

/// Start a bridge on an existing workspace, e.g. to simulate a restart
pub async fn start_server_in(workspace: Arc<Workspace>) -> Result<TestServer> {
    let server = TestServer::spawn(workspace)?;
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// Signed-in identity id and loading flag both settled
pub fn settled_for(user_id: &str) -> impl Fn(&Value) -> bool + '_ {
    move |data| data["identity"]["id"] == user_id && data["loading"] == false
}

pub fn read_selection(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).context("selection file missing")?;
    Ok(serde_json::from_str(&content)?)
}
