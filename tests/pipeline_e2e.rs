//! End-to-end seed scenarios (§8) driven against a mocked HTTP server.

use std::sync::Arc;

use ca_code_pipeline::store::{SectionUpdate, Stage, Store};
use ca_code_pipeline::{PipelineResult, ShutdownToken, SqliteStore, StaticScraper};
use mockito::Server;

fn toc_html(text_page_url: &str) -> String {
    format!(r#"<html><body><a href="{text_page_url}">Chapter 3</a></body></html>"#)
}

fn text_page_html() -> String {
    r#"<html><body>
        <h2>CHAPTER 3. General Provisions</h2>
        <h3>100 Every person has the right to a fair hearing under this chapter.</h3>
        <h3>101 No person shall be denied due process under this chapter.</h3>
    </body></html>"#
        .to_string()
}

async fn run_discovery(
    scraper: &StaticScraper,
    store: &SqliteStore,
    code: &str,
    index_url: &str,
) -> PipelineResult<Vec<ca_code_pipeline::store::ManifestEntry>> {
    let result = ca_code_pipeline::discovery::discover(scraper, code, index_url, 1, 5)
        .await
        .map_err(ca_code_pipeline::PipelineError::Other)?;
    ca_code_pipeline::discovery::persist(store, code, "test-session", &result).await?;
    Ok(result.url_manifest)
}

#[tokio::test]
async fn small_clean_run_completes_with_content() {
    let mut server = Server::new_async().await;
    let text_url = format!("{}/text1?displayText=1", server.url());

    let _toc_mock = server
        .mock("GET", "/toc")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(toc_html(&text_url))
        .create_async()
        .await;
    let _text_mock = server
        .mock("GET", "/text1")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(text_page_html())
        .create_async()
        .await;

    let scraper = StaticScraper::new().expect("client builds");
    let store = SqliteStore::open_in_memory().await.expect("in-memory store opens");
    let code = "WIC";
    let index_url = format!("{}/toc?tocCode={code}", server.url());

    let leaves = run_discovery(&scraper, &store, code, &index_url).await.expect("stage1 succeeds");
    assert_eq!(leaves.len(), 2, "both headings should be recognized as section leaves");

    let shutdown = ShutdownToken::new();
    ca_code_pipeline::extractor::run(
        Arc::new(scraper),
        Arc::new(store.clone()),
        code,
        leaves,
        Stage::Stage2,
        2,
        2,
        5,
        10,
        1,
        &shutdown,
        &ca_code_pipeline::extractor::NoopProgressReporter,
    )
    .await
    .expect("stage2 succeeds");

    let sections = store.all_sections(code).await.expect("read back sections");
    assert_eq!(sections.len(), 2);
    for section in &sections {
        assert!(section.has_content(), "section {} should have content", section.section_id);
        assert!(!section.is_missing());
    }
}

#[tokio::test]
async fn sparse_merge_preserves_enrichment_across_rediscovery() {
    let mut server = Server::new_async().await;
    let text_url = format!("{}/text1?displayText=1", server.url());

    let _toc_mock = server
        .mock("GET", "/toc")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(toc_html(&text_url))
        .create_async()
        .await;
    let _text_mock = server
        .mock("GET", "/text1")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(text_page_html())
        .create_async()
        .await;

    let scraper = StaticScraper::new().expect("client builds");
    let store = SqliteStore::open_in_memory().await.expect("in-memory store opens");
    let code = "WIC";
    let index_url = format!("{}/toc?tocCode={code}", server.url());

    run_discovery(&scraper, &store, code, &index_url).await.expect("first stage1 pass");

    // Simulate prior Stage 2 enrichment of one section.
    store
        .upsert_section(
            code,
            "100",
            &text_url,
            SectionUpdate {
                content: Some("Every person has the right to a fair hearing.".to_string()),
                raw_content: Some("<p>...</p>".to_string()),
                legislative_history: Some("(Amended by Stats. 2020, Ch. 5, Sec. 1.)".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("enrichment upsert");

    // Re-run Stage 1 discovery: it only ever supplies `hierarchy`, never content.
    run_discovery(&scraper, &store, code, &index_url).await.expect("second stage1 pass");

    let section = store.get_section(code, "100").await.expect("lookup").expect("section exists");
    assert_eq!(section.content.as_deref(), Some("Every person has the right to a fair hearing."));
    assert!(section.legislative_history.is_some());
}

#[tokio::test]
async fn reconciliation_drains_missing_sections() {
    let mut server = Server::new_async().await;
    let url = format!("{}/text1?displayText=1", server.url());

    let _mock = server
        .mock("GET", "/text1")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(text_page_html())
        .expect_at_least(1)
        .create_async()
        .await;

    let scraper = StaticScraper::new().expect("client builds");
    let store = SqliteStore::open_in_memory().await.expect("in-memory store opens");
    let code = "WIC";

    for section_id in ["100", "101"] {
        store
            .upsert_section(code, section_id, &url, SectionUpdate::default())
            .await
            .expect("seed pending section");
    }

    let shutdown = ShutdownToken::new();
    let scraper: Arc<dyn ca_code_pipeline::scraper::Scraper> = Arc::new(scraper);
    let remaining = ca_code_pipeline::reconcile::run(
        Arc::clone(&scraper),
        Arc::clone(&scraper),
        Arc::new(store.clone()),
        code,
        4,
        10,
        5,
        10,
        1,
        2,
        5,
        &shutdown,
    )
    .await
    .expect("reconciliation completes");

    assert_eq!(remaining, 0, "both sections should be filled by the mocked fetch");

    let sections = store.all_sections(code).await.expect("read back");
    assert!(sections.iter().all(|s| !s.is_missing()));
}
