//! Many callers billing one ledger through real HTTP round trips.

use futures::future::join_all;
use mockito::Server;
use openai_client::{CostLedger, OpenAIClient, TokenPricing, Usage};

const CALLERS: usize = 64;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_calls_sum_exactly() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"id":"c","object":"chat.completion","created":1,"model":"gpt-3.5-turbo",
                "choices":[{"index":0,"message":{"role":"assistant","content":"[]"},"finish_reason":"stop"}],
                "usage":{"prompt_tokens":321,"completion_tokens":17,"total_tokens":338}}"#,
        )
        .expect(CALLERS)
        .create_async()
        .await;

    let ledger = CostLedger::new();
    let client = OpenAIClient::new("sk-test", ledger.clone())
        .unwrap()
        .with_base_url(server.url());

    let calls = (0..CALLERS).map(|i| {
        let client = client.clone();
        tokio::spawn(async move { client.complete("Classify: ", &format!("/jobs/{i}")).await })
    });
    for result in join_all(calls).await {
        result.unwrap().unwrap();
    }

    mock.assert_async().await;

    let per_call = TokenPricing::default().cost(&Usage {
        prompt_tokens: 321,
        completion_tokens: 17,
        total_tokens: 338,
    });
    assert_eq!(ledger.total().nanos(), per_call.nanos() * CALLERS as u64);
    assert_eq!(ledger.billed_calls(), CALLERS as u64);
}

#[tokio::test]
async fn missing_usage_bills_nothing() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"{}"}}]}"#)
        .create_async()
        .await;

    let ledger = CostLedger::new();
    let client = OpenAIClient::new("sk-test", ledger.clone())
        .unwrap()
        .with_base_url(server.url());

    let response = client.complete("a", "b").await.unwrap();

    assert_eq!(response.content, "{}");
    assert_eq!(ledger.total().nanos(), 0);
    assert_eq!(ledger.billed_calls(), 1);
}
