use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use chrono::Utc;
use hangar_auth::{HttpAuthenticator, TokenStore, mask_key, publication_env_var, resolve_api_key};
use hangar_client::{
    DispatchError, Dispatcher, FilePart, Method, MultipartBody, RequestBody, http_client,
};
use hangar_config::{DEFAULT_JOBS, DEFAULT_TIMEOUT_SECS, ResolvedPublication};
use hangar_types::{
    Artifact, FailureClass, OperationKind, OperationReport, OperationStatus, Page, Publication,
    RunReport, VersionUpload,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Multipart part carrying the version metadata.
pub const VERSION_UPLOAD_PART: &str = "versionUpload";

/// Multipart part name used for every uploaded jar.
pub const FILES_PART: &str = "files";

pub trait Reporter {
    fn info(&mut self, msg: &str);
    fn warn(&mut self, msg: &str);
    fn error(&mut self, msg: &str);
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Maximum concurrent page syncs per publication
    pub jobs: usize,
    /// Timeout for every HTTP request
    pub timeout: Duration,
    /// Overrides `$HANGAR_HOME` for credential lookup
    pub hangar_home: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            jobs: DEFAULT_JOBS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            hangar_home: None,
        }
    }
}

struct Failure {
    class: FailureClass,
    message: String,
}

impl Failure {
    fn invalid(message: impl Into<String>) -> Self {
        Self {
            class: FailureClass::Invalid,
            message: message.into(),
        }
    }
}

impl From<DispatchError> for Failure {
    fn from(err: DispatchError) -> Self {
        Self {
            class: err.class(),
            message: err.to_string(),
        }
    }
}

#[derive(Serialize)]
struct PageEdit<'a> {
    path: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct UploadResponse {
    url: String,
}

/// Runs publish and page-sync operations through one shared [`Dispatcher`].
#[derive(Debug, Clone)]
pub struct Engine {
    dispatcher: Dispatcher,
    jobs: usize,
    hangar_home: Option<PathBuf>,
}

impl Engine {
    /// Build an engine talking to Hangar over HTTP.
    pub fn new(opts: &RunOptions) -> Result<Self> {
        let client = http_client(opts.timeout)?;
        let tokens = Arc::new(TokenStore::new(HttpAuthenticator::with_client(client.clone())));
        let dispatcher = Dispatcher::with_client(client, tokens, opts.timeout);
        Ok(Self::with_dispatcher(dispatcher, opts))
    }

    pub fn with_dispatcher(dispatcher: Dispatcher, opts: &RunOptions) -> Self {
        Self {
            dispatcher,
            jobs: opts.jobs.max(1),
            hangar_home: opts.hangar_home.clone(),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    fn api_key(&self, target: &ResolvedPublication) -> Result<String, Failure> {
        let name = &target.publication.name;
        let info = resolve_api_key(name, target.api_key.as_deref(), self.hangar_home.as_deref());
        match info.key {
            Some(key) => {
                debug!(publication = %name, source = %info.source, key = %mask_key(&key), "resolved api key");
                Ok(key)
            }
            None => Err(Failure {
                class: FailureClass::Auth,
                message: format!(
                    "no API key for publication '{name}'; set {} or HANGAR_API_KEY",
                    publication_env_var(name)
                ),
            }),
        }
    }

    /// Upload the publication's version.
    pub fn publish_version(&self, target: &ResolvedPublication) -> OperationReport {
        let publication = &target.publication;
        timed(
            publication,
            OperationKind::CreateVersion,
            &publication.version,
            || self.upload_version(target),
        )
    }

    fn upload_version(&self, target: &ResolvedPublication) -> Result<Option<String>, Failure> {
        let publication = &target.publication;
        for platform in &publication.platforms {
            if let Artifact::Jar(path) = &platform.artifact
                && !path.is_file()
            {
                return Err(Failure::invalid(format!(
                    "jar for platform {} not found: {}",
                    platform.name,
                    path.display()
                )));
            }
        }

        let api_key = self.api_key(target)?;
        let (upload, jars) = VersionUpload::from_publication(publication);
        let json = serde_json::to_value(&upload)
            .map_err(|e| Failure::invalid(format!("failed to serialize version upload: {e}")))?;
        let body = RequestBody::Multipart(MultipartBody {
            json_part: VERSION_UPLOAD_PART.to_string(),
            json,
            files: jars
                .into_iter()
                .map(|path| FilePart {
                    part_name: FILES_PART.to_string(),
                    path,
                })
                .collect(),
        });

        let response = self
            .dispatcher
            .execute(
                Method::POST,
                &publication.api_endpoint,
                &publication.upload_path(),
                &api_key,
                Some(body),
            )
            .into_result()?;

        match serde_json::from_str::<UploadResponse>(&response) {
            Ok(parsed) => {
                info!(
                    slug = %publication.slug,
                    version = %publication.version,
                    url = %parsed.url,
                    "published version to Hangar"
                );
                Ok(Some(parsed.url))
            }
            Err(e) => {
                warn!(slug = %publication.slug, error = %e, "upload succeeded without a version url");
                Ok(None)
            }
        }
    }

    /// Replace the content of one page.
    pub fn sync_page(&self, target: &ResolvedPublication, page: &Page) -> OperationReport {
        let publication = &target.publication;
        timed(publication, OperationKind::SyncPage, &page.name, || {
            let api_key = self.api_key(target)?;
            let body = RequestBody::json(&PageEdit {
                path: page.path(),
                content: &page.content,
            })
            .map_err(|e| Failure::invalid(format!("failed to serialize page: {e}")))?;

            self.dispatcher
                .execute(
                    Method::PATCH,
                    &publication.api_endpoint,
                    &publication.page_edit_path(),
                    &api_key,
                    Some(body),
                )
                .into_result()?;
            info!(slug = %publication.slug, page = %page.name, "synced page");
            Ok(None)
        })
    }

    /// Sync the publication's pages, or only the page named `only`.
    ///
    /// Up to `jobs` pages are synced at once. Reports come back in
    /// declaration order.
    pub fn sync_pages(&self, target: &ResolvedPublication, only: Option<&str>) -> Vec<OperationReport> {
        let pages: Vec<&Page> = target
            .publication
            .pages
            .iter()
            .filter(|page| only.is_none_or(|name| page.name == name))
            .collect();

        let mut reports = Vec::with_capacity(pages.len());
        for chunk in pages.chunks(self.jobs) {
            thread::scope(|scope| {
                let handles: Vec<_> = chunk
                    .iter()
                    .map(|&page| (page, scope.spawn(move || self.sync_page(target, page))))
                    .collect();
                for (page, handle) in handles {
                    let report = handle.join().unwrap_or_else(|_| {
                        timed(&target.publication, OperationKind::SyncPage, &page.name, || {
                            Err(Failure {
                                class: FailureClass::Transport,
                                message: "page sync thread panicked".to_string(),
                            })
                        })
                    });
                    reports.push(report);
                }
            });
        }
        reports
    }

    /// Create a version for every target, one after another.
    pub fn run_publish(
        &self,
        targets: &[ResolvedPublication],
        reporter: &mut dyn Reporter,
    ) -> RunReport {
        let started_at = Utc::now();
        let mut operations = Vec::with_capacity(targets.len());

        for target in targets {
            let publication = &target.publication;
            reporter.info(&format!(
                "publishing {} version {} ({})",
                publication.namespace(),
                publication.version,
                publication.name
            ));
            let report = self.publish_version(target);
            report_outcome(reporter, &report);
            operations.push(report);
        }

        RunReport {
            started_at,
            finished_at: Utc::now(),
            operations,
        }
    }

    /// Sync pages of every target. Fails up front when `page` names a page
    /// no target declares.
    pub fn run_sync(
        &self,
        targets: &[ResolvedPublication],
        page: Option<&str>,
        reporter: &mut dyn Reporter,
    ) -> Result<RunReport> {
        if let Some(name) = page
            && !targets.iter().any(|t| t.publication.page(name).is_some())
        {
            bail!("no selected publication declares page '{name}'");
        }

        let started_at = Utc::now();
        let mut operations = Vec::new();

        for target in targets {
            let publication = &target.publication;
            let count = publication
                .pages
                .iter()
                .filter(|p| page.is_none_or(|name| p.name == name))
                .count();
            if count == 0 {
                if page.is_none() {
                    reporter.warn(&format!("publication '{}' has no pages to sync", publication.name));
                }
                continue;
            }

            reporter.info(&format!(
                "syncing {count} page(s) of {} ({})",
                publication.namespace(),
                publication.name
            ));
            for report in self.sync_pages(target, page) {
                report_outcome(reporter, &report);
                operations.push(report);
            }
        }

        Ok(RunReport {
            started_at,
            finished_at: Utc::now(),
            operations,
        })
    }
}

fn timed(
    publication: &Publication,
    kind: OperationKind,
    target: &str,
    op: impl FnOnce() -> Result<Option<String>, Failure>,
) -> OperationReport {
    let started_at = Utc::now();
    let start = Instant::now();
    let status = match op() {
        Ok(detail) => OperationStatus::Succeeded { detail },
        Err(failure) => OperationStatus::Failed {
            class: failure.class,
            message: failure.message,
        },
    };
    OperationReport {
        publication: publication.name.clone(),
        kind,
        target: target.to_string(),
        status,
        started_at,
        finished_at: Utc::now(),
        duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
    }
}

fn report_outcome(reporter: &mut dyn Reporter, report: &OperationReport) {
    match &report.status {
        OperationStatus::Succeeded { detail } => {
            let what = match report.kind {
                OperationKind::CreateVersion => format!("published version {}", report.target),
                OperationKind::SyncPage => format!("synced page '{}'", report.target),
            };
            match detail {
                Some(detail) => reporter.info(&format!("{}: {what}: {detail}", report.publication)),
                None => reporter.info(&format!("{}: {what}", report.publication)),
            }
        }
        OperationStatus::Failed { class, message } => reporter.error(&format!(
            "{}: {} {} failed ({class}): {message}",
            report.publication, report.kind, report.target
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::io::Read;
    use std::sync::Mutex;

    use hangar_types::{DEFAULT_API_ENDPOINT, Platform, RESOURCE_PAGE_ID};
    use serial_test::serial;
    use tempfile::tempdir;
    use tiny_http::{Header, Response, Server, StatusCode};

    use super::*;

    #[derive(Default)]
    struct CollectingReporter {
        infos: Vec<String>,
        warns: Vec<String>,
        errors: Vec<String>,
    }

    impl Reporter for CollectingReporter {
        fn info(&mut self, msg: &str) {
            self.infos.push(msg.to_string());
        }

        fn warn(&mut self, msg: &str) {
            self.warns.push(msg.to_string());
        }

        fn error(&mut self, msg: &str) {
            self.errors.push(msg.to_string());
        }
    }

    #[derive(Debug, Clone)]
    struct SeenRequest {
        method: String,
        path: String,
        authorization: Option<String>,
        body: Vec<u8>,
    }

    struct TestRegistryServer {
        base_url: String,
        seen: Arc<Mutex<Vec<SeenRequest>>>,
        handle: thread::JoinHandle<()>,
    }

    impl TestRegistryServer {
        fn endpoint(&self) -> String {
            format!("{}/api/v1/", self.base_url)
        }

        fn join(self) -> Vec<SeenRequest> {
            self.handle.join().expect("join server");
            self.seen.lock().expect("lock").clone()
        }
    }

    /// Serves `expected_requests` requests. A route's last response is
    /// repeated once the ones before it are used up.
    fn spawn_registry_server(
        mut routes: BTreeMap<String, Vec<(u16, String)>>,
        expected_requests: usize,
    ) -> TestRegistryServer {
        let server = Server::http("127.0.0.1:0").expect("server");
        let base_url = format!("http://{}", server.server_addr());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_thread = Arc::clone(&seen);

        let handle = thread::spawn(move || {
            for _ in 0..expected_requests {
                let Ok(Some(mut req)) = server.recv_timeout(Duration::from_secs(10)) else {
                    return;
                };
                let path = req.url().to_string();
                let authorization = req
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("Authorization"))
                    .map(|h| h.value.as_str().to_string());
                let mut body = Vec::new();
                req.as_reader().read_to_end(&mut body).expect("read body");
                seen_thread.lock().expect("lock").push(SeenRequest {
                    method: req.method().as_str().to_string(),
                    path: path.clone(),
                    authorization,
                    body,
                });

                let response = match routes.get_mut(&path) {
                    Some(list) if list.len() > 1 => list.remove(0),
                    Some(list) if list.len() == 1 => list[0].clone(),
                    _ => (404, "{}".to_string()),
                };

                let resp = Response::from_string(response.1)
                    .with_status_code(StatusCode(response.0))
                    .with_header(
                        Header::from_bytes("Content-Type", "application/json").expect("header"),
                    );
                req.respond(resp).expect("respond");
            }
        });

        TestRegistryServer {
            base_url,
            seen,
            handle,
        }
    }

    const AUTH_PATH: &str = "/api/v1/authenticate?apiKey=K1";
    const UPLOAD_PATH: &str = "/api/v1/projects/test-project/upload";
    const PAGE_PATH: &str = "/api/v1/pages/edit/test-project";

    fn auth_route() -> (String, Vec<(u16, String)>) {
        (
            AUTH_PATH.to_string(),
            vec![(200, r#"{"token":"T","expiresIn":60000}"#.to_string())],
        )
    }

    fn target(endpoint: &str, platforms: Vec<Platform>, pages: Vec<Page>) -> ResolvedPublication {
        ResolvedPublication {
            publication: Publication {
                name: "release".to_string(),
                api_endpoint: endpoint.to_string(),
                owner: "PaperMC".to_string(),
                slug: "test-project".to_string(),
                version: "1.0.0".to_string(),
                channel: "Release".to_string(),
                changelog: Some("Removed Herobrine".to_string()),
                platforms,
                pages,
            },
            api_key: Some("K1".to_string()),
        }
    }

    fn paper(artifact: Artifact) -> Platform {
        Platform {
            name: "PAPER".to_string(),
            platform_versions: vec!["1.20".to_string()],
            artifact,
            dependencies: vec![],
        }
    }

    fn engine(jobs: usize) -> Engine {
        Engine::new(&RunOptions {
            jobs,
            timeout: Duration::from_secs(5),
            hangar_home: None,
        })
        .expect("engine")
    }

    fn pages() -> Vec<Page> {
        vec![
            Page::resource("# Main"),
            Page {
                name: "Install".to_string(),
                content: "install it".to_string(),
            },
            Page {
                name: "FAQ".to_string(),
                content: "questions".to_string(),
            },
        ]
    }

    #[test]
    fn publish_version_uploads_metadata_and_jar() {
        let td = tempdir().expect("tempdir");
        let jar = td.path().join("paper.jar");
        std::fs::write(&jar, b"PAPERJAR").expect("write jar");

        let server = spawn_registry_server(
            BTreeMap::from([
                auth_route(),
                (
                    UPLOAD_PATH.to_string(),
                    vec![(200, r#"{"url":"https://hangar.test/PaperMC/test-project/versions/1.0.0"}"#.to_string())],
                ),
            ]),
            2,
        );
        let target = target(&server.endpoint(), vec![paper(Artifact::Jar(jar))], vec![]);

        let report = engine(4).publish_version(&target);
        assert_eq!(report.kind, OperationKind::CreateVersion);
        assert_eq!(report.target, "1.0.0");
        assert_eq!(
            report.status,
            OperationStatus::Succeeded {
                detail: Some("https://hangar.test/PaperMC/test-project/versions/1.0.0".to_string())
            }
        );

        let seen = server.join();
        assert_eq!(seen[0].path, AUTH_PATH);
        assert_eq!(seen[1].method, "POST");
        assert_eq!(seen[1].path, UPLOAD_PATH);
        assert_eq!(seen[1].authorization.as_deref(), Some("T"));
        let body = String::from_utf8_lossy(&seen[1].body);
        assert!(body.contains(r#"name="versionUpload""#));
        assert!(body.contains(r#""version":"1.0.0""#));
        assert!(body.contains(r#""description":"Removed Herobrine""#));
        assert!(body.contains(r#"name="files""#));
        assert!(body.contains("PAPERJAR"));
    }

    #[test]
    fn publish_version_with_url_only_sends_no_file_part() {
        let server = spawn_registry_server(
            BTreeMap::from([
                auth_route(),
                (UPLOAD_PATH.to_string(), vec![(200, r#"{"url":"u"}"#.to_string())]),
            ]),
            2,
        );
        let target = target(
            &server.endpoint(),
            vec![paper(Artifact::Url("https://example.test/paper.jar".to_string()))],
            vec![],
        );

        let report = engine(1).publish_version(&target);
        assert!(report.status.is_success());

        let seen = server.join();
        let body = String::from_utf8_lossy(&seen[1].body);
        assert!(body.contains(r#""externalUrl":"https://example.test/paper.jar""#));
        assert!(!body.contains(r#"name="files""#));
    }

    #[test]
    fn publish_version_reports_server_error() {
        let td = tempdir().expect("tempdir");
        let jar = td.path().join("paper.jar");
        std::fs::write(&jar, b"jar").expect("write jar");

        let server = spawn_registry_server(
            BTreeMap::from([
                auth_route(),
                (
                    UPLOAD_PATH.to_string(),
                    vec![(409, r#"{"error":"duplicate version"}"#.to_string())],
                ),
            ]),
            2,
        );
        let target = target(&server.endpoint(), vec![paper(Artifact::Jar(jar))], vec![]);

        let engine = engine(1);
        let report = engine.publish_version(&target);
        assert_eq!(
            report.status,
            OperationStatus::Failed {
                class: FailureClass::Server,
                message: "HTTP 409: duplicate version".to_string()
            }
        );
        server.join();
    }

    #[test]
    fn missing_jar_fails_without_network() {
        let target = target(
            "http://127.0.0.1:9/api/v1/",
            vec![paper(Artifact::Jar(PathBuf::from("definitely/missing.jar")))],
            vec![],
        );

        let report = engine(1).publish_version(&target);
        match report.status {
            OperationStatus::Failed { class, message } => {
                assert_eq!(class, FailureClass::Invalid);
                assert!(message.contains("jar for platform PAPER not found"), "{message}");
            }
            other => panic!("unexpected status: {other:?}"),
        }
    }

    #[test]
    fn bad_api_key_is_auth_failure() {
        let td = tempdir().expect("tempdir");
        let jar = td.path().join("paper.jar");
        std::fs::write(&jar, b"jar").expect("write jar");

        let server = spawn_registry_server(
            BTreeMap::from([(AUTH_PATH.to_string(), vec![(400, "{}".to_string())])]),
            1,
        );
        let target = target(&server.endpoint(), vec![paper(Artifact::Jar(jar))], vec![]);

        let report = engine(1).publish_version(&target);
        match report.status {
            OperationStatus::Failed { class, message } => {
                assert_eq!(class, FailureClass::Auth);
                assert!(message.contains("bad api key"), "{message}");
            }
            other => panic!("unexpected status: {other:?}"),
        }
        assert_eq!(server.join().len(), 1);
    }

    #[test]
    #[serial]
    fn missing_api_key_is_auth_failure() {
        let home = tempdir().expect("tempdir");
        temp_env::with_vars(
            [
                ("HANGAR_API_KEY", None::<&str>),
                ("HANGAR_PUBLICATIONS_RELEASE_API_KEY", None::<&str>),
            ],
            || {
                let engine = Engine::new(&RunOptions {
                    jobs: 1,
                    timeout: Duration::from_secs(5),
                    hangar_home: Some(home.path().to_path_buf()),
                })
                .expect("engine");
                let mut target = target(
                    "http://127.0.0.1:9/api/v1/",
                    vec![paper(Artifact::Url("https://example.test".to_string()))],
                    pages(),
                );
                target.api_key = None;

                let report = engine.sync_page(&target, &target.publication.pages[0]);
                match report.status {
                    OperationStatus::Failed { class, message } => {
                        assert_eq!(class, FailureClass::Auth);
                        assert!(
                            message.contains("HANGAR_PUBLICATIONS_RELEASE_API_KEY"),
                            "{message}"
                        );
                    }
                    other => panic!("unexpected status: {other:?}"),
                }
            },
        );
    }

    #[test]
    #[serial]
    fn api_key_from_environment_is_used() {
        let home = tempdir().expect("tempdir");
        let server = spawn_registry_server(
            BTreeMap::from([
                auth_route(),
                (PAGE_PATH.to_string(), vec![(200, String::new())]),
            ]),
            2,
        );
        temp_env::with_vars(
            [
                ("HANGAR_API_KEY", None::<&str>),
                ("HANGAR_PUBLICATIONS_RELEASE_API_KEY", Some("K1")),
            ],
            || {
                let engine = Engine::new(&RunOptions {
                    jobs: 1,
                    timeout: Duration::from_secs(5),
                    hangar_home: Some(home.path().to_path_buf()),
                })
                .expect("engine");
                let mut target = target(&server.endpoint(), vec![], vec![Page::resource("x")]);
                target.api_key = None;

                let report = engine.sync_page(&target, &target.publication.pages[0]);
                assert!(report.status.is_success(), "{:?}", report.status);
            },
        );
        assert_eq!(server.join()[0].path, AUTH_PATH);
    }

    #[test]
    fn sync_pages_authenticates_once_and_sends_paths() {
        let server = spawn_registry_server(
            BTreeMap::from([
                auth_route(),
                (PAGE_PATH.to_string(), vec![(200, String::new())]),
            ]),
            4,
        );
        let target = target(&server.endpoint(), vec![], pages());

        let reports = engine(2).sync_pages(&target, None);
        let targets: Vec<_> = reports.iter().map(|r| r.target.as_str()).collect();
        assert_eq!(targets, vec![RESOURCE_PAGE_ID, "Install", "FAQ"]);
        assert!(reports.iter().all(|r| r.status.is_success()));

        let seen = server.join();
        assert_eq!(seen.iter().filter(|r| r.path == AUTH_PATH).count(), 1);

        let mut edits: Vec<serde_json::Value> = seen
            .iter()
            .filter(|r| r.path == PAGE_PATH)
            .map(|r| {
                assert_eq!(r.method, "PATCH");
                assert_eq!(r.authorization.as_deref(), Some("T"));
                serde_json::from_slice(&r.body).expect("json body")
            })
            .collect();
        edits.sort_by_key(|v| v["path"].as_str().unwrap_or_default().to_string());
        assert_eq!(
            edits,
            vec![
                serde_json::json!({"path": "", "content": "# Main"}),
                serde_json::json!({"path": "FAQ", "content": "questions"}),
                serde_json::json!({"path": "Install", "content": "install it"}),
            ]
        );
    }

    #[test]
    fn sync_pages_filters_by_name() {
        let server = spawn_registry_server(
            BTreeMap::from([
                auth_route(),
                (PAGE_PATH.to_string(), vec![(200, String::new())]),
            ]),
            2,
        );
        let target = target(&server.endpoint(), vec![], pages());

        let reports = engine(4).sync_pages(&target, Some("FAQ"));
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].target, "FAQ");
        server.join();
    }

    #[test]
    fn run_sync_rejects_unknown_page() {
        let target = target(DEFAULT_API_ENDPOINT, vec![], pages());
        let mut reporter = CollectingReporter::default();

        let err = engine(1)
            .run_sync(&[target], Some("Missing"), &mut reporter)
            .expect_err("unknown page");
        assert_eq!(err.to_string(), "no selected publication declares page 'Missing'");
    }

    #[test]
    fn run_sync_warns_about_publications_without_pages() {
        let target = target(DEFAULT_API_ENDPOINT, vec![], vec![]);
        let mut reporter = CollectingReporter::default();

        let report = engine(1)
            .run_sync(&[target], None, &mut reporter)
            .expect("run");
        assert!(report.operations.is_empty());
        assert_eq!(reporter.warns, vec!["publication 'release' has no pages to sync"]);
    }

    #[test]
    fn run_sync_continues_after_page_failure() {
        let server = spawn_registry_server(
            BTreeMap::from([
                auth_route(),
                (
                    PAGE_PATH.to_string(),
                    vec![
                        (403, r#"{"message":"missing permission edit_page"}"#.to_string()),
                        (200, String::new()),
                    ],
                ),
            ]),
            3,
        );
        let target = target(
            &server.endpoint(),
            vec![],
            vec![Page::resource("# Main"), Page {
                name: "Install".to_string(),
                content: "x".to_string(),
            }],
        );
        let mut reporter = CollectingReporter::default();

        let report = engine(1)
            .run_sync(&[target], None, &mut reporter)
            .expect("run");
        assert_eq!(report.operations.len(), 2);
        assert_eq!(report.failure_count(), 1);
        assert_eq!(report.success_count(), 1);
        assert_eq!(
            reporter.errors,
            vec!["release: sync-page MainResourcePage failed (server): HTTP 403: missing permission edit_page"]
        );
        assert!(reporter.infos.iter().any(|m| m == "release: synced page 'Install'"));
        server.join();
    }

    #[test]
    fn run_publish_reports_each_publication() {
        let td = tempdir().expect("tempdir");
        let jar = td.path().join("paper.jar");
        std::fs::write(&jar, b"jar").expect("write jar");

        let server = spawn_registry_server(
            BTreeMap::from([
                auth_route(),
                (UPLOAD_PATH.to_string(), vec![(200, r#"{"url":"https://hangar.test/v"}"#.to_string())]),
            ]),
            2,
        );
        let good = target(&server.endpoint(), vec![paper(Artifact::Jar(jar))], vec![]);
        let mut broken = target(
            &server.endpoint(),
            vec![paper(Artifact::Jar(td.path().join("missing.jar")))],
            vec![],
        );
        broken.publication.name = "broken".to_string();

        let mut reporter = CollectingReporter::default();
        let report = engine(1).run_publish(&[good, broken], &mut reporter);

        assert_eq!(report.operations.len(), 2);
        assert!(report.operations[0].status.is_success());
        assert!(!report.is_success());
        assert_eq!(
            reporter.infos,
            vec![
                "publishing PaperMC/test-project version 1.0.0 (release)",
                "release: published version 1.0.0: https://hangar.test/v",
                "publishing PaperMC/test-project version 1.0.0 (broken)",
            ]
        );
        assert_eq!(reporter.errors.len(), 1);
        assert!(reporter.errors[0].starts_with("broken: create-version 1.0.0 failed (invalid)"));
        assert_eq!(server.join().len(), 2);
    }

    #[test]
    fn run_options_default() {
        let opts = RunOptions::default();
        assert_eq!(opts.jobs, DEFAULT_JOBS);
        assert_eq!(opts.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(opts.hangar_home.is_none());
    }
}
