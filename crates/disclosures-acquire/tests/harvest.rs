use disclosures_acquire::age_gate::{self, GateOutcome};
use disclosures_acquire::{discover, download, links, Session, Strategy};
use disclosures_model::{DownloadStatus, HarvestConfig, PageListing};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const PDF_BYTES: &[u8] = b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\n%%EOF";

fn test_config(server: &MockServer, dir: &Path) -> HarvestConfig {
    HarvestConfig {
        datasets: vec![format!("{}/data-set-1-files", server.uri())],
        age_gate_wait_ms: 0,
        next_delay_ms: 0,
        timeout_retry_delay_ms: 0,
        navigation_timeout_ms: 5_000,
        age_gate_timeout_ms: 5_000,
        download_timeout_ms: 5_000,
        out_dir: dir.join("pdfs"),
        valid_urls_file: dir.join("valid_page_urls.txt"),
        ..HarvestConfig::default()
    }
}

fn listing_page(pdfs: &[&str], next: Option<&str>) -> String {
    let items: String = pdfs
        .iter()
        .map(|p| format!(r#"<li><a href="{p}">{p}</a></li>"#))
        .collect();
    let pager = next
        .map(|n| {
            format!(
                r#"<nav class="pager"><ul><li class="pager__item pager__item--next"><a href="{n}">Next</a></li></ul></nav>"#
            )
        })
        .unwrap_or_default();
    format!("<html><body><ul>{items}</ul>{pager}</body></html>")
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

async fn mount_root(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path("/data-set-1-files"))
        .and(query_param_is_missing("page"))
        .respond_with(html(body))
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, n: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/data-set-1-files"))
        .and(query_param("page", n))
        .respond_with(html(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn follow_walks_pager_until_repeat() {
    let server = MockServer::start().await;
    mount_root(&server, listing_page(&[], Some("?page=1"))).await;
    mount_page(&server, "1", listing_page(&[], Some("?page=2"))).await;
    // Last page points back at an already-visited page
    mount_page(&server, "2", listing_page(&[], Some("?page=1"))).await;

    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&server, dir.path());
    let session = Session::new(&cfg).unwrap();

    let listing = discover::discover(&session, &cfg, Strategy::Follow).await.unwrap();
    let root = format!("{}/data-set-1-files", server.uri());
    assert_eq!(
        listing.urls,
        vec![root.clone(), format!("{root}?page=1"), format!("{root}?page=2")]
    );
}

#[tokio::test]
async fn follow_stops_at_other_dataset_link() {
    let server = MockServer::start().await;
    mount_root(&server, listing_page(&[], Some("/data-set-2-files"))).await;

    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&server, dir.path());
    let session = Session::new(&cfg).unwrap();

    let listing = discover::discover(&session, &cfg, Strategy::Follow).await.unwrap();
    assert_eq!(listing.urls, vec![format!("{}/data-set-1-files", server.uri())]);
}

#[tokio::test]
async fn unavailable_dataset_is_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data-set-1-files"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&server, dir.path());
    let session = Session::new(&cfg).unwrap();

    let listing = discover::discover(&session, &cfg, Strategy::Follow).await.unwrap();
    assert!(listing.is_empty());
}

#[tokio::test]
async fn probe_stops_at_first_missing_page() {
    let server = MockServer::start().await;
    mount_root(&server, listing_page(&[], None)).await;
    mount_page(&server, "1", listing_page(&[], None)).await;
    mount_page(&server, "2", listing_page(&[], None)).await;
    // ?page=3 falls through to wiremock's default 404

    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&server, dir.path());
    let session = Session::new(&cfg).unwrap();

    let listing = discover::discover(&session, &cfg, Strategy::Probe).await.unwrap();
    let root = format!("{}/data-set-1-files", server.uri());
    assert_eq!(listing.urls, vec![format!("{root}?page=1"), format!("{root}?page=2")]);
}

#[tokio::test]
async fn age_gate_link_sets_session_cookie() {
    let server = MockServer::start().await;
    let gate = r#"<html><body>
        <p>Are you 18 years of age or older?</p>
        <a href="/age-verify">Yes</a> <a href="/">No</a>
        </body></html>"#;

    Mock::given(method("GET"))
        .and(path("/data-set-1-files"))
        .and(|req: &Request| !req.headers.contains_key("cookie"))
        .respond_with(html(gate.to_string()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data-set-1-files"))
        .and(header("cookie", "age_verified=1"))
        .respond_with(html(listing_page(&["/files/a.pdf"], None)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/age-verify"))
        .respond_with(ResponseTemplate::new(200).insert_header("set-cookie", "age_verified=1; Path=/"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&server, dir.path());
    let session = Session::new(&cfg).unwrap();

    let listing = discover::discover(&session, &cfg, Strategy::Follow).await.unwrap();
    let root = format!("{}/data-set-1-files", server.uri());
    assert_eq!(listing.urls, vec![root.clone()]);

    let page = session.goto(&root, cfg.navigation_timeout()).await.unwrap();
    assert!(page.html.contains("/files/a.pdf"));
}

#[tokio::test]
async fn script_gate_uses_configured_cookie() {
    let server = MockServer::start().await;
    let gate = r#"<html><body>
        <h2>Are you 18 years of age or older?</h2>
        <button id="age-button-yes">Yes</button>
        </body></html>"#;

    Mock::given(method("GET"))
        .and(path("/data-set-1-files"))
        .and(|req: &Request| !req.headers.contains_key("cookie"))
        .respond_with(html(gate.to_string()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data-set-1-files"))
        .and(header("cookie", "justiceGovAgeVerified=true"))
        .respond_with(html(listing_page(&[], Some("?page=1"))))
        .mount(&server)
        .await;
    mount_page(&server, "1", listing_page(&[], None)).await;

    let dir = tempfile::tempdir().unwrap();
    let cfg = HarvestConfig {
        age_cookie: Some("justiceGovAgeVerified=true".into()),
        ..test_config(&server, dir.path())
    };
    let session = Session::new(&cfg).unwrap();

    let listing = discover::discover(&session, &cfg, Strategy::Follow).await.unwrap();
    assert_eq!(listing.len(), 2);
}

#[tokio::test]
async fn download_all_records_each_outcome() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/a.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PDF_BYTES, "application/pdf"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/blocked.pdf"))
        .respond_with(html("<html><body>Access Denied</body></html>".to_string()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/b.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PDF_BYTES, "application/pdf"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&server, dir.path());
    std::fs::create_dir_all(&cfg.out_dir).unwrap();
    std::fs::write(cfg.out_dir.join("b.pdf"), b"%PDF-existing").unwrap();

    let urls: BTreeSet<String> = ["a.pdf", "b.pdf", "blocked.pdf", "gone.pdf"]
        .iter()
        .map(|f| format!("{}/files/{f}", server.uri()))
        .collect();
    let session = Session::new(&cfg).unwrap();
    let records = download::download_all(&session, &urls, &cfg.out_dir, &cfg).await.unwrap();

    let status_of = |name: &str| {
        records
            .iter()
            .find(|r| r.filename == name)
            .map(|r| r.status.clone())
            .unwrap()
    };
    assert_eq!(status_of("a.pdf"), DownloadStatus::Downloaded);
    assert_eq!(status_of("b.pdf"), DownloadStatus::Existed);
    assert_eq!(status_of("gone.pdf"), DownloadStatus::HttpError { code: 404 });
    assert!(matches!(status_of("blocked.pdf"), DownloadStatus::NotPdf { content_type } if content_type.starts_with("text/html")));

    assert_eq!(std::fs::read(cfg.out_dir.join("a.pdf")).unwrap(), PDF_BYTES);
    assert_eq!(std::fs::read(cfg.out_dir.join("b.pdf")).unwrap(), b"%PDF-existing");
    assert!(!cfg.out_dir.join("blocked.pdf").exists());
    assert!(!cfg.out_dir.join("a.pdf.part").exists());
}

#[tokio::test]
async fn run_discovers_collects_and_downloads() {
    let server = MockServer::start().await;
    mount_root(&server, listing_page(&["/files/a.pdf"], Some("?page=1"))).await;
    mount_page(
        &server,
        "1",
        listing_page(&["/files/a.pdf", "/files/c.ppdf"], None),
    )
    .await;
    for name in ["a.pdf", "c.pdf"] {
        Mock::given(method("GET"))
            .and(path(format!("/files/{name}")))
            .respond_with(ResponseTemplate::new(200).set_body_raw(PDF_BYTES, "application/pdf"))
            .expect(1)
            .mount(&server)
            .await;
    }

    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&server, dir.path());

    let report = disclosures_acquire::run(&cfg, Strategy::Follow, false)
        .await
        .unwrap()
        .expect("report");
    assert_eq!(report.total(), 2);
    assert_eq!(report.downloaded_count(), 2);
    assert_eq!(report.pages.len(), 2);

    assert!(cfg.out_dir.join("a.pdf").exists());
    assert!(cfg.out_dir.join("c.pdf").exists());
    assert!(cfg.out_dir.join("manifest.json").exists());

    let saved = PageListing::load(&cfg.valid_urls_file).unwrap();
    assert_eq!(saved.urls, report.pages);
}

#[tokio::test]
async fn run_reuses_saved_listing() {
    let server = MockServer::start().await;
    // Root is never requested when the listing file already names pages
    Mock::given(method("GET"))
        .and(path("/data-set-1-files"))
        .and(query_param_is_missing("page"))
        .respond_with(html(listing_page(&[], None)))
        .expect(0)
        .mount(&server)
        .await;
    mount_page(&server, "4", listing_page(&["/files/d.pdf"], None)).await;
    Mock::given(method("GET"))
        .and(path("/files/d.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PDF_BYTES, "application/pdf"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&server, dir.path());
    let page = format!("{}/data-set-1-files?page=4", server.uri());
    std::fs::write(&cfg.valid_urls_file, format!("{page}\n\n")).unwrap();

    let report = disclosures_acquire::run(&cfg, Strategy::Follow, false)
        .await
        .unwrap()
        .expect("report");
    assert_eq!(report.pages, vec![page]);
    assert_eq!(report.ok_count(), 1);
}

#[tokio::test]
async fn run_without_pdf_links_returns_none() {
    let server = MockServer::start().await;
    mount_root(&server, listing_page(&[], None)).await;

    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&server, dir.path());

    let report = disclosures_acquire::run(&cfg, Strategy::Follow, false).await.unwrap();
    assert!(report.is_none());
    assert!(!cfg.out_dir.join("manifest.json").exists());
}

const BUTTON_GATE: &str = r#"<html><body>
    <h2>Are you 18 years of age or older?</h2>
    <button id="age-button-yes">Yes</button>
    </body></html>"#;

async fn mount_button_gate(server: &MockServer, cookie: &str, verified: String) {
    Mock::given(method("GET"))
        .and(path("/data-set-1-files"))
        .and(|req: &Request| !req.headers.contains_key("cookie"))
        .respond_with(html(BUTTON_GATE.to_string()))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data-set-1-files"))
        .and(header("cookie", cookie))
        .respond_with(html(verified))
        .mount(server)
        .await;
}

#[tokio::test]
async fn follow_retries_a_timed_out_next_once() {
    let server = MockServer::start().await;
    mount_root(&server, listing_page(&[], Some("?page=1"))).await;
    // First request for ?page=1 outlives the navigation timeout
    Mock::given(method("GET"))
        .and(path("/data-set-1-files"))
        .and(query_param("page", "1"))
        .respond_with(html(listing_page(&[], None)).set_delay(Duration::from_millis(1_000)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, "1", listing_page(&[], None)).await;

    let dir = tempfile::tempdir().unwrap();
    let cfg = HarvestConfig {
        navigation_timeout_ms: 300,
        ..test_config(&server, dir.path())
    };
    let session = Session::new(&cfg).unwrap();

    let listing = discover::discover(&session, &cfg, Strategy::Follow).await.unwrap();
    let root = format!("{}/data-set-1-files", server.uri());
    assert_eq!(listing.urls, vec![root.clone(), format!("{root}?page=1")]);

    let page_one_hits = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.query() == Some("page=1"))
        .count();
    assert_eq!(page_one_hits, 2);
}

#[tokio::test]
async fn collect_passes_gate_on_saved_listing() {
    let server = MockServer::start().await;
    mount_button_gate(
        &server,
        "justiceGovAgeVerified=true",
        listing_page(&["/f/a.pdf"], None),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let cfg = HarvestConfig {
        age_cookie: Some("justiceGovAgeVerified=true".into()),
        ..test_config(&server, dir.path())
    };
    let session = Session::new(&cfg).unwrap();
    let pages = vec![format!("{}/data-set-1-files", server.uri())];

    let pdfs = links::collect_from_pages(&session, &pages, &cfg).await.unwrap();
    let expected: BTreeSet<String> = [format!("{}/f/a.pdf", server.uri())].into_iter().collect();
    assert_eq!(pdfs, expected);
}

#[tokio::test]
async fn script_gate_without_cookie_fails_and_keeps_page() {
    let server = MockServer::start().await;
    mount_button_gate(&server, "unused=1", listing_page(&["/f/a.pdf"], None)).await;

    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&server, dir.path());
    assert!(cfg.age_cookie.is_none());
    let session = Session::new(&cfg).unwrap();
    let root = format!("{}/data-set-1-files", server.uri());

    let page = session.goto(&root, cfg.navigation_timeout()).await.unwrap();
    let (outcome, page) = age_gate::pass_if_present(&session, page, &cfg).await.unwrap();
    assert_eq!(outcome, GateOutcome::Failed);
    assert_eq!(page.url, root);
    assert!(age_gate::is_present(&page.html));
    // No reload was attempted
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn download_timeout_is_recorded_as_failed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/slow.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(PDF_BYTES, "application/pdf")
                .set_delay(Duration::from_millis(1_000)),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cfg = HarvestConfig {
        download_timeout_ms: 200,
        ..test_config(&server, dir.path())
    };
    let session = Session::new(&cfg).unwrap();
    let url = format!("{}/files/slow.pdf", server.uri());

    let record = download::download_one(&session, &url, &cfg.out_dir, &cfg).await.unwrap();
    assert!(matches!(record.status, DownloadStatus::Failed { ref reason } if reason.contains("timed out")));
    assert!(record.bytes.is_none());
    assert!(!cfg.out_dir.join("slow.pdf").exists());
    assert!(!cfg.out_dir.join("slow.pdf.part").exists());
}

#[tokio::test]
async fn report_start_time_covers_discovery() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data-set-1-files"))
        .respond_with(html(listing_page(&["/files/a.pdf"], None)).set_delay(Duration::from_millis(300)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/a.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PDF_BYTES, "application/pdf"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&server, dir.path());

    let report = disclosures_acquire::run(&cfg, Strategy::Follow, false)
        .await
        .unwrap()
        .expect("report");
    let started = chrono::DateTime::parse_from_rfc3339(&report.started_at).unwrap();
    let finished = chrono::DateTime::parse_from_rfc3339(&report.finished_at).unwrap();
    // Discovery and collection each load the delayed root page
    assert!(finished - started >= chrono::Duration::milliseconds(600));
}
