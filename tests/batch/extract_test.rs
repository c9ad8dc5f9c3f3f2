//! Batch extraction over several model responses.

use cardsync::batch::{extract_batch, ModelResponse, TokenUsage};

fn response(source: &str, text: &str, total_tokens: u64) -> ModelResponse {
    ModelResponse {
        source: source.to_owned(),
        text: text.to_owned(),
        usage: TokenUsage {
            prompt_tokens: total_tokens.saturating_sub(10),
            completion_tokens: 10,
            total_tokens,
        },
    }
}

#[test]
fn records_are_tagged_with_their_source() {
    let batch = extract_batch(&[
        response(
            "front.jpg",
            r#"{"cards":[{"card_number":1,"confidence":0.9,"extracted_data":{"name":"Ada Lovelace"}},{"card_number":2,"confidence":0.8,"extracted_data":{"company":"Difference Ltd"}}]}"#,
            120,
        ),
        response("back.jpg", "Reach me at grace@navy.mil", 80),
    ]);

    let sources: Vec<&str> = batch.records.iter().map(|r| r.source.as_str()).collect();
    assert_eq!(sources, vec!["front.jpg", "front.jpg", "back.jpg"]);
    assert_eq!(batch.records[2].record.fields.email, "grace@navy.mil");
    assert!(batch.records[2].record.fallback);
    assert!(batch.failures.is_empty());
}

#[test]
fn unreadable_responses_are_reported_not_fatal() {
    let batch = extract_batch(&[
        response("blurry.jpg", "Sorry, I cannot read this card.", 50),
        response(
            "ok.jpg",
            r#"{"cards":[{"extracted_data":{"email":"ada@engines.io"}}]}"#,
            70,
        ),
    ]);

    assert_eq!(batch.records.len(), 1);
    assert_eq!(batch.failures.len(), 1);
    assert_eq!(batch.failures[0].source, "blurry.jpg");
    assert!(!batch.failures[0].error.is_empty());
    assert!(batch.failures[0].raw_response.starts_with("Sorry"));
}

#[test]
fn token_usage_is_summed() {
    let batch = extract_batch(&[
        response("a.jpg", "nothing here", 100),
        response("b.jpg", "nothing here either", 250),
    ]);
    assert_eq!(batch.usage.total_tokens, 350);
    assert_eq!(batch.usage.completion_tokens, 20);
    assert_eq!(batch.usage.prompt_tokens, 330);
}

#[test]
fn empty_batch_is_empty() {
    let batch = extract_batch(&[]);
    assert!(batch.records.is_empty());
    assert!(batch.failures.is_empty());
    assert_eq!(batch.usage, TokenUsage::default());
}

#[test]
fn extracted_records_serialize_flat_with_source() {
    let batch = extract_batch(&[response(
        "card.png",
        r#"{"cards":[{"extracted_data":{"name":"Ada"}}]}"#,
        10,
    )]);
    let json = serde_json::to_value(&batch.records[0]).expect("serializes");
    assert_eq!(json["source"], "card.png");
    assert_eq!(json["name"], "Ada");
}
