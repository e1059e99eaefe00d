//! End-to-end runs against mock career sites and a mock completion endpoint.

use std::sync::Arc;
use std::time::{Duration, Instant};

use job_scraper::{
    ConcurrencyLimiter, GenericScraper, HttpFetcher, LinkHash, MemorySink, Orchestrator,
    PipelineConfig, SourceState, NOT_AVAILABLE,
};
use mockito::{Matcher, Mock, Server, ServerGuard};
use openai_client::{CostLedger, OpenAIClient};
use serde_json::json;

fn completion(content: &str) -> String {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "gpt-3.5-turbo",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 1000, "completion_tokens": 200, "total_tokens": 1200}
    })
    .to_string()
}

async fn page(server: &mut ServerGuard, path: &str, body: &str, hits: usize) -> Mock {
    server
        .mock("GET", path)
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(body)
        .expect(hits)
        .create_async()
        .await
}

async fn completion_for(server: &mut ServerGuard, marker: &str, content: &str, hits: usize) -> Mock {
    server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::Regex(marker.to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion(content))
        .expect(hits)
        .create_async()
        .await
}

fn orchestrator(
    server: &ServerGuard,
    sink: Arc<MemorySink>,
    ledger: &CostLedger,
    config: &PipelineConfig,
) -> Orchestrator {
    let limiter = ConcurrencyLimiter::new(config.max_concurrency);
    let client = OpenAIClient::new("sk-test", ledger.clone())
        .unwrap()
        .with_base_url(server.url());
    let scraper = GenericScraper::new(
        Arc::new(limiter.gate(client)),
        Arc::new(HttpFetcher::new().unwrap()),
        sink.clone(),
        config,
    );
    Orchestrator::new(Arc::new(scraper), sink, limiter, ledger.clone())
}

const DETAIL_JSON: &str = r#"{"company": "Globex", "jobTitle": "Data Engineer", "location": "Springfield", "industry": "Energy", "responsibilities": ["Build pipelines"], "qualifications": ["SQL"]}"#;

#[tokio::test]
async fn failing_source_does_not_stop_the_others() {
    let mut server = Server::new_async().await;

    let broken = server
        .mock("GET", "/a/careers")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;
    let listing = page(
        &mut server,
        "/b/careers",
        r#"<a href="/b/jobs/1">Data Engineer</a><a href="/b/jobs/2">Analyst</a><a href="/b/about">About</a>"#,
        1,
    )
    .await;
    let job1 = page(&mut server, "/b/jobs/1", "<h1>Data Engineer</h1><p>Globex</p>", 1).await;
    let job2 = page(&mut server, "/b/jobs/2", "<h1>Analyst</h1><p>Globex</p>", 1).await;
    let links = completion_for(&mut server, "Of these links", r#"["/b/jobs/1", "/b/jobs/2"]"#, 1).await;
    let details = completion_for(&mut server, "Can you give me", &format!("```json\n{DETAIL_JSON}\n```"), 2).await;

    let ledger = CostLedger::new();
    let sink = Arc::new(MemorySink::new());
    let orchestrator = orchestrator(&server, sink.clone(), &ledger, &PipelineConfig::default());

    let source_a = format!("{}/a/careers", server.url());
    let source_b = format!("{}/b/careers", server.url());
    let run = orchestrator.run(vec![source_a, source_b]).await;

    assert_eq!(run.sources[0].state, SourceState::Failed);
    assert_eq!(run.sources[0].error_kind, Some("fetch"));
    assert_eq!(run.sources[1].state, SourceState::Persisted);
    assert_eq!(run.sources[1].records_written, 2);

    let records = sink.records();
    assert_eq!(records.len(), 2);
    for record in &records {
        assert_eq!(record.company, "Globex");
        assert_eq!(record.skills, vec![NOT_AVAILABLE]);
    }
    let job_url = format!("{}/b/jobs/1", server.url());
    assert!(records
        .iter()
        .any(|r| r.source_link_hash == LinkHash::of(&job_url)));

    // three billed calls at 1000 prompt + 200 completion tokens each
    assert_eq!(run.billed_calls, 3);
    assert_eq!(run.total_cost.nanos(), 3 * 800_000);
    assert_eq!(ledger.total(), run.total_cost);

    broken.assert_async().await;
    listing.assert_async().await;
    job1.assert_async().await;
    job2.assert_async().await;
    links.assert_async().await;
    details.assert_async().await;
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn rerun_against_stored_links_fetches_no_details() {
    use job_scraper::SqliteSink;

    let mut server = Server::new_async().await;

    let listing = page(
        &mut server,
        "/careers/",
        r#"<a href="../jobs/42">Data Engineer</a>"#,
        2,
    )
    .await;
    let job = page(&mut server, "/jobs/42", "<h1>Data Engineer</h1>", 1).await;
    let links = completion_for(&mut server, "Of these links", r#"["../jobs/42"]"#, 2).await;
    let details = completion_for(&mut server, "Can you give me", DETAIL_JSON, 1).await;

    let ledger = CostLedger::new();
    let sqlite = SqliteSink::in_memory().await.unwrap();
    let sink = Arc::new(sqlite);
    let limiter = ConcurrencyLimiter::new(8);
    let client = OpenAIClient::new("sk-test", ledger.clone())
        .unwrap()
        .with_base_url(server.url());
    let scraper = GenericScraper::new(
        Arc::new(limiter.gate(client)),
        Arc::new(HttpFetcher::new().unwrap()),
        sink.clone(),
        &PipelineConfig::default(),
    );
    let orchestrator = Orchestrator::new(Arc::new(scraper), sink.clone(), limiter, ledger);

    let source = format!("{}/careers/", server.url());
    let first = orchestrator.run(vec![source.clone()]).await;
    assert_eq!(first.records_written(), 1);

    let stored = sink
        .get(&LinkHash::of(&format!("{}/jobs/42", server.url())))
        .await
        .unwrap()
        .expect("record stored under the resolved URL hash");
    assert_eq!(stored.job_title, "Data Engineer");

    let second = orchestrator.run(vec![source]).await;
    assert_eq!(second.sources[0].state, SourceState::Persisted);
    assert_eq!(second.sources[0].links_resolved, 0);
    assert_eq!(second.sources[0].links_already_seen, 1);
    assert_eq!(sink.count().await.unwrap(), 1);

    listing.assert_async().await;
    job.assert_async().await;
    links.assert_async().await;
    details.assert_async().await;
}

#[tokio::test]
async fn link_cap_keeps_document_order() {
    let mut server = Server::new_async().await;

    let anchors: String = (1..=12)
        .map(|i| format!(r#"<a href="/jobs/{i}">Job {i}</a>"#))
        .collect();
    let listing = page(&mut server, "/careers", &anchors, 1).await;
    let chosen: Vec<String> = (1..=12).rev().map(|i| format!("/jobs/{i}")).collect();
    let links = completion_for(
        &mut server,
        "Of these links",
        &serde_json::to_string(&chosen).unwrap(),
        1,
    )
    .await;
    let mut jobs = Vec::new();
    for i in 1..=5 {
        jobs.push(page(&mut server, &format!("/jobs/{i}"), "<p>Job</p>", 1).await);
    }
    let details = completion_for(&mut server, "Can you give me", DETAIL_JSON, 5).await;

    let ledger = CostLedger::new();
    let config = PipelineConfig::default().with_max_links(5);
    let orchestrator = orchestrator(&server, Arc::new(MemorySink::new()), &ledger, &config);

    let run = orchestrator
        .run(vec![format!("{}/careers", server.url())])
        .await;

    let report = &run.sources[0];
    assert_eq!(report.links_resolved, 5);
    assert_eq!(report.links_truncated, 7);
    assert_eq!(report.records_written, 5);

    listing.assert_async().await;
    links.assert_async().await;
    for job in jobs {
        job.assert_async().await;
    }
    details.assert_async().await;
}

#[tokio::test]
async fn rate_limited_service_fails_source_after_four_attempts() {
    let mut server = Server::new_async().await;

    let listing = page(&mut server, "/careers", r#"<a href="/jobs/1">Job</a>"#, 1).await;
    let limited = server
        .mock("POST", "/chat/completions")
        .with_status(429)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "error": {
                    "message": "Rate limit reached for requests. Please try again in 1ms.",
                    "type": "requests",
                    "param": null,
                    "code": "rate_limit_exceeded"
                }
            })
            .to_string(),
        )
        .expect(4)
        .create_async()
        .await;

    let ledger = CostLedger::new();
    let orchestrator = orchestrator(
        &server,
        Arc::new(MemorySink::new()),
        &ledger,
        &PipelineConfig::default(),
    );

    let run = orchestrator
        .run(vec![format!("{}/careers", server.url())])
        .await;

    let report = &run.sources[0];
    assert_eq!(report.state, SourceState::Failed);
    assert_eq!(report.failed_stage, Some(SourceState::LinksFetched));
    assert_eq!(report.error_kind, Some("retry_exhausted"));
    assert_eq!(run.billed_calls, 0);

    listing.assert_async().await;
    limited.assert_async().await;
}

#[tokio::test]
async fn throttled_extraction_frees_its_slot_while_waiting() {
    let mut server = Server::new_async().await;

    let limited = server
        .mock("POST", "/chat/completions")
        .with_status(429)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "error": {
                    "message": "Rate limit reached for requests. Please try again in 300ms.",
                    "type": "requests",
                    "param": null,
                    "code": "rate_limit_exceeded"
                }
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let answered = completion_for(&mut server, "Of these links", "[]", 1).await;

    let limiter = ConcurrencyLimiter::new(1);
    let client = limiter.gate(
        OpenAIClient::new("sk-test", CostLedger::new())
            .unwrap()
            .with_base_url(server.url()),
    );
    let call = tokio::spawn(async move {
        client
            .complete(job_scraper::prompts::LINK_SELECTION, "/jobs/1")
            .await
    });

    while !limited.matched_async().await {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    // A page fetch gets the only slot while the extraction call backs off.
    let waiting = Instant::now();
    let permit = limiter.acquire().await.unwrap();
    assert!(
        waiting.elapsed() < Duration::from_millis(150),
        "slot held during backoff for {:?}",
        waiting.elapsed()
    );
    drop(permit);

    let response = call.await.unwrap().unwrap();
    assert_eq!(response.content, "[]");
    assert_eq!(limiter.available(), 1);

    limited.assert_async().await;
    answered.assert_async().await;
}
