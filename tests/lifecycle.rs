//! End-to-end runs of the approve, queue and execute pipeline.

use std::sync::Arc;
use std::time::Duration;

use devops_commander::config::Settings;
use devops_commander::policy::LOCAL_EXECUTION_DISABLED;
use devops_commander::queue::{ChannelQueue, JobQueue, SpoolQueue};
use devops_commander::runner::ExecutionRunner;
use devops_commander::store::{
    Execution, ExecutionStatus, FileStore, MemoryStore, NewProject, PlanStatus, Store,
};
use devops_commander::worker::Worker;
use devops_commander::workflow::Workflow;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn remote_project(name: &str) -> NewProject {
    NewProject {
        name: name.to_string(),
        repo_path: None,
        repo_url: Some(format!("https://github.com/acme/{name}")),
    }
}

/// Registers the project, parses and approves `text`, drains the queue and
/// returns the finished execution.
async fn approve_and_drain(
    store: Arc<dyn Store>,
    queue: Arc<dyn JobQueue>,
    settings: Settings,
    project: NewProject,
    text: &str,
) -> Execution {
    let workflow = Workflow::new(store.as_ref(), queue.as_ref(), &settings);
    let project = workflow.create_project(project).await.unwrap();
    let plan = workflow.parse_command(project.id, text).await.unwrap();
    let receipt = workflow.approve_plan(plan.id).await.unwrap();

    let runner = ExecutionRunner::new(store.clone(), Arc::new(settings.clone()));
    let worker = Worker::new(queue.clone(), runner, Duration::from_millis(10));
    assert_eq!(worker.drain().await.unwrap(), 1);

    store
        .get_execution(receipt.execution_id)
        .await
        .unwrap()
        .unwrap()
}

async fn plan_status(store: &dyn Store, execution: &Execution) -> PlanStatus {
    store
        .get_plan(execution.plan_id)
        .await
        .unwrap()
        .unwrap()
        .status
}

#[tokio::test]
async fn dry_run_survives_restart() {
    let data = TempDir::new().unwrap();
    let mut settings = Settings::default();
    settings.storage.data_dir = data.path().to_path_buf();

    let store = Arc::new(FileStore::new(data.path()));
    let queue = Arc::new(SpoolQueue::new(data.path(), "ai-devops"));

    let workflow = Workflow::new(store.as_ref(), queue.as_ref(), &settings);
    let project = workflow.create_project(remote_project("web")).await.unwrap();
    let plan = workflow
        .parse_command(project.id, "Deploy v1.6 to staging and run tests")
        .await
        .unwrap();
    assert_eq!(plan.status, PlanStatus::PendingApproval);
    assert_eq!(plan.version.as_deref(), Some("1.6"));

    let receipt = workflow.approve_plan(plan.id).await.unwrap();
    assert_eq!(queue.pending().await.unwrap(), 1);

    let runner = ExecutionRunner::new(store.clone(), Arc::new(settings.clone()));
    let worker = Worker::new(queue.clone(), runner, Duration::from_millis(10));
    assert_eq!(worker.drain().await.unwrap(), 1);
    assert_eq!(queue.pending().await.unwrap(), 0);

    let reopened = FileStore::new(data.path());
    let execution = reopened
        .get_execution(receipt.execution_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(execution.status, ExecutionStatus::Succeeded);
    assert_eq!(
        execution.logs,
        vec![
            String::from("DRY_RUN=true"),
            String::from("DEPLOY_PROVIDER=local"),
            String::from("Action=deploy Version=1.6 Env=[staging]"),
            String::from("PostSteps=[run_tests]"),
            String::from("[DRY RUN] Would deploy via local: git checkout, build, deploy"),
        ]
    );
    assert_eq!(plan_status(&reopened, &execution).await, PlanStatus::Succeeded);
}

#[tokio::test]
async fn local_execution_refused_by_policy() {
    let mut settings = Settings::default();
    settings.safety.dry_run = false;
    settings.safety.enable_local_execution = false;

    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let project = NewProject {
        name: String::from("web"),
        repo_path: Some(String::from("/srv/web")),
        repo_url: None,
    };
    let execution = approve_and_drain(
        store.clone(),
        Arc::new(ChannelQueue::new("test")),
        settings,
        project,
        "deploy to dev",
    )
    .await;

    assert_eq!(execution.status, ExecutionStatus::Failed);
    let last = execution.logs.last().unwrap();
    assert!(last.starts_with("ERROR: "), "{last}");
    assert!(last.contains(LOCAL_EXECUTION_DISABLED));
    assert_eq!(plan_status(store.as_ref(), &execution).await, PlanStatus::Failed);
}

#[tokio::test]
async fn render_failure_stops_before_next_environment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/services/srv-1/deploys"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .expect(1)
        .mount(&server)
        .await;

    let mut settings = Settings::default();
    settings.safety.dry_run = false;
    settings.deploy.provider = String::from("render");
    settings.deploy.render.api_key = Some(String::from("rnd_key"));
    settings.deploy.render.service_id = Some(String::from("srv-1"));
    settings.deploy.render.api_base = server.uri();

    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let execution = approve_and_drain(
        store.clone(),
        Arc::new(ChannelQueue::new("test")),
        settings,
        remote_project("api"),
        "deploy to staging and production",
    )
    .await;

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert!(execution.logs.contains(&String::from("Deploying to staging...")));
    assert!(!execution.logs.contains(&String::from("Deploying to production...")));
    assert!(execution.logs.contains(&String::from("Deploy failed: upstream exploded")));
    assert!(
        execution
            .logs
            .iter()
            .any(|l| l.starts_with("ERROR: ") && l.contains("Render deploy failed: 500"))
    );
    assert_eq!(plan_status(store.as_ref(), &execution).await, PlanStatus::Failed);
}

#[tokio::test]
async fn dry_run_leaves_cloud_provider_untouched() {
    let server = MockServer::start().await;

    let mut settings = Settings::default();
    settings.safety.dry_run = true;
    settings.deploy.provider = String::from("render");
    settings.deploy.render.api_key = Some(String::from("rnd_key"));
    settings.deploy.render.service_id = Some(String::from("srv-1"));
    settings.deploy.render.api_base = server.uri();

    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let execution = approve_and_drain(
        store.clone(),
        Arc::new(ChannelQueue::new("test")),
        settings,
        remote_project("api"),
        "deploy to staging and production",
    )
    .await;

    assert!(server.received_requests().await.unwrap_or_default().is_empty());
    assert_eq!(execution.status, ExecutionStatus::Succeeded);
    assert_eq!(
        execution.logs.last().map(String::as_str),
        Some("[DRY RUN] Would deploy via render: git checkout, build, deploy")
    );
    assert_eq!(plan_status(store.as_ref(), &execution).await, PlanStatus::Succeeded);
}

#[tokio::test]
async fn vercel_redeploy_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v6/deployments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "deployments": [{"uid": "dpl_old", "url": "shop-old.vercel.app", "state": "READY"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v13/deployments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "dpl_new",
            "url": "shop-new.vercel.app",
            "readyState": "QUEUED"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut settings = Settings::default();
    settings.safety.dry_run = false;
    settings.deploy.provider = String::from("vercel");
    settings.deploy.vercel.token = Some(String::from("vercel-token"));
    settings.deploy.vercel.project_id = Some(String::from("prj_1"));
    settings.deploy.vercel.api_base = server.uri();

    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let execution = approve_and_drain(
        store.clone(),
        Arc::new(ChannelQueue::new("test")),
        settings,
        remote_project("shop"),
        "ship it to prod",
    )
    .await;

    assert_eq!(execution.status, ExecutionStatus::Succeeded, "{:?}", execution.logs);
    assert!(execution.logs.contains(&String::from("Deploying to Vercel...")));
    assert!(
        execution
            .logs
            .contains(&String::from("Deployment URL: https://shop-new.vercel.app"))
    );
    assert!(execution.started_at.is_some());
    assert!(execution.finished_at.is_some());
    assert_eq!(plan_status(store.as_ref(), &execution).await, PlanStatus::Succeeded);
}

#[cfg(unix)]
mod local_build {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn live_settings() -> Settings {
        let mut settings = Settings::default();
        settings.safety.dry_run = false;
        settings.safety.enable_local_execution = true;
        settings.deploy.local.build_tool = String::from("fakenpm");
        settings
    }

    /// A checkout whose `.env.production` points `PATH` at a fake build tool.
    fn checkout(script: &str) -> (TempDir, TempDir) {
        let repo = TempDir::new().unwrap();
        let bin = TempDir::new().unwrap();
        let tool = bin.path().join("fakenpm");
        std::fs::write(&tool, script).unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        std::fs::write(
            repo.path().join(".env.production"),
            format!("PATH={}\n", bin.path().display()),
        )
        .unwrap();
        (repo, bin)
    }

    fn local_project(repo: &TempDir) -> NewProject {
        NewProject {
            name: String::from("site"),
            repo_path: Some(repo.path().display().to_string()),
            repo_url: None,
        }
    }

    #[tokio::test]
    async fn build_runs_install_then_build() {
        let (repo, _bin) = checkout("#!/bin/sh\necho \"fake $*\"\n");
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());

        let execution = approve_and_drain(
            store.clone(),
            Arc::new(ChannelQueue::new("test")),
            live_settings(),
            local_project(&repo),
            "deploy to staging",
        )
        .await;

        assert_eq!(execution.status, ExecutionStatus::Succeeded, "{:?}", execution.logs);
        let install = execution
            .logs
            .iter()
            .position(|l| l == "fake install")
            .unwrap();
        let build = execution
            .logs
            .iter()
            .position(|l| l == "fake run build")
            .unwrap();
        assert!(install < build);
    }

    #[tokio::test]
    async fn failed_install_skips_build() {
        let (repo, _bin) = checkout(
            "#!/bin/sh\nif [ \"$1\" = install ]; then echo \"registry unreachable\" >&2; exit 3; fi\necho built\n",
        );
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());

        let execution = approve_and_drain(
            store.clone(),
            Arc::new(ChannelQueue::new("test")),
            live_settings(),
            local_project(&repo),
            "deploy to staging",
        )
        .await;

        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert!(execution.logs.contains(&String::from("registry unreachable")));
        assert!(execution.logs.contains(&String::from("Command failed with exit code 3")));
        assert!(!execution.logs.contains(&String::from("built")));
        assert_eq!(plan_status(store.as_ref(), &execution).await, PlanStatus::Failed);
    }
}
