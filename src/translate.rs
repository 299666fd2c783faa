use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::ApiError;
use crate::config::Config;
use crate::feed::{ContentKey, ContentKind};

/// Batch translation request sent to the translation service.
#[derive(Debug, Serialize)]
struct TranslationRequest<'a> {
    dialect: &'a str,
    texts: &'a [TranslationItem],
}

/// One translatable leaf in a batch request.
#[derive(Debug, Clone, Serialize)]
pub struct TranslationItem {
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub id: i64,
    pub text: String,
}

impl TranslationItem {
    pub fn new(key: ContentKey, text: &str) -> Self {
        Self {
            kind: key.kind,
            id: key.id,
            text: text.to_string(),
        }
    }

    pub fn key(&self) -> ContentKey {
        ContentKey {
            kind: self.kind,
            id: self.id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TranslationResponse {
    results: Vec<TranslationResultItem>,
}

#[derive(Debug, Deserialize)]
struct TranslationResultItem {
    #[serde(rename = "type")]
    kind: ContentKind,
    id: i64,
    translated_text: String,
}

/// Translate a batch of leaves into `dialect`.
///
/// Results correspond to request items by `(kind, id)`, never by position.
/// An item missing from the response simply has no translation available and
/// is left out of the returned map; the renderer falls back to the original
/// text for it. Result keys that were never requested are dropped so the
/// overlay can only ever reference content that existed when the batch was
/// built.
pub async fn translate_batch(
    client: &reqwest::Client,
    config: &Config,
    dialect: &str,
    items: &[TranslationItem],
) -> Result<HashMap<ContentKey, String>, ApiError> {
    let url = format!("{}/translate/", config.api_base_url);
    let request = TranslationRequest { dialect, texts: items };

    let response = client.post(&url).json(&request).send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Status { status, body });
    }

    let parsed: TranslationResponse = response.json().await?;

    let requested: HashSet<ContentKey> = items.iter().map(TranslationItem::key).collect();
    let mut translated = HashMap::with_capacity(parsed.results.len());
    for result in parsed.results {
        let key = ContentKey {
            kind: result.kind,
            id: result.id,
        };
        if !requested.contains(&key) {
            warn!(%key, "translation service returned an unrequested key, ignoring");
            continue;
        }
        translated.insert(key, result.translated_text);
    }

    if translated.len() < requested.len() {
        debug!(
            missing = requested.len() - translated.len(),
            "translation response left some leaves untranslated"
        );
    }

    Ok(translated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> Config {
        Config {
            api_base_url: base_url.to_string(),
            dialects: vec!["standard".to_string(), "kansai".to_string()],
            refresh_interval_secs: 60,
            session_file: ".access_token".to_string(),
        }
    }

    fn items(specs: &[(ContentKey, &str)]) -> Vec<TranslationItem> {
        specs
            .iter()
            .map(|(key, text)| TranslationItem::new(*key, text))
            .collect()
    }

    // ==================== Request Shape Tests ====================

    #[test]
    fn test_request_serialization_uses_wire_names() {
        let batch = items(&[(ContentKey::post(1), "hello"), (ContentKey::reply(2), "hi")]);
        let request = TranslationRequest {
            dialect: "kansai",
            texts: &batch,
        };

        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["dialect"], "kansai");
        assert_eq!(json["texts"][0]["type"], "post");
        assert_eq!(json["texts"][0]["id"], 1);
        assert_eq!(json["texts"][0]["text"], "hello");
        assert_eq!(json["texts"][1]["type"], "reply");
    }

    #[test]
    fn test_item_key_roundtrip() {
        let item = TranslationItem::new(ContentKey::reply(9), "text");
        assert_eq!(item.key(), ContentKey::reply(9));
    }

    // ==================== translate_batch Tests ====================

    #[tokio::test]
    async fn test_translate_batch_keys_results_by_kind_and_id() {
        let mock_server = MockServer::start().await;

        // Results come back in reverse order; correspondence is by key
        Mock::given(method("POST"))
            .and(path("/translate/"))
            .and(body_string_contains("kansai"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    {"type": "reply", "id": 2, "translated_text": "maido"},
                    {"type": "post", "id": 1, "translated_text": "ookini"}
                ]
            })))
            .mount(&mock_server)
            .await;

        let config = test_config(&mock_server.uri());
        let client = reqwest::Client::new();

        let batch = items(&[(ContentKey::post(1), "thanks"), (ContentKey::reply(2), "hello")]);
        let translated = translate_batch(&client, &config, "kansai", &batch)
            .await
            .expect("translate");

        assert_eq!(translated.len(), 2);
        assert_eq!(translated[&ContentKey::post(1)], "ookini");
        assert_eq!(translated[&ContentKey::reply(2)], "maido");
    }

    #[tokio::test]
    async fn test_translate_batch_missing_id_is_not_an_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/translate/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    {"type": "post", "id": 1, "translated_text": "ookini"}
                ]
            })))
            .mount(&mock_server)
            .await;

        let config = test_config(&mock_server.uri());
        let client = reqwest::Client::new();

        let batch = items(&[(ContentKey::post(1), "thanks"), (ContentKey::post(2), "later")]);
        let translated = translate_batch(&client, &config, "kansai", &batch)
            .await
            .expect("partial response should succeed");

        assert_eq!(translated.len(), 1);
        assert!(translated.contains_key(&ContentKey::post(1)));
        assert!(!translated.contains_key(&ContentKey::post(2)));
    }

    #[tokio::test]
    async fn test_translate_batch_drops_unrequested_keys() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/translate/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    {"type": "post", "id": 1, "translated_text": "ookini"},
                    {"type": "post", "id": 999, "translated_text": "stray"}
                ]
            })))
            .mount(&mock_server)
            .await;

        let config = test_config(&mock_server.uri());
        let client = reqwest::Client::new();

        let batch = items(&[(ContentKey::post(1), "thanks")]);
        let translated = translate_batch(&client, &config, "kansai", &batch)
            .await
            .expect("translate");

        assert_eq!(translated.len(), 1);
        assert!(!translated.contains_key(&ContentKey::post(999)));
    }

    #[tokio::test]
    async fn test_translate_batch_same_id_post_and_reply_stay_distinct() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/translate/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    {"type": "post", "id": 1, "translated_text": "post-trans"},
                    {"type": "reply", "id": 1, "translated_text": "reply-trans"}
                ]
            })))
            .mount(&mock_server)
            .await;

        let config = test_config(&mock_server.uri());
        let client = reqwest::Client::new();

        let batch = items(&[(ContentKey::post(1), "a"), (ContentKey::reply(1), "b")]);
        let translated = translate_batch(&client, &config, "tohoku", &batch)
            .await
            .expect("translate");

        assert_eq!(translated[&ContentKey::post(1)], "post-trans");
        assert_eq!(translated[&ContentKey::reply(1)], "reply-trans");
    }

    #[tokio::test]
    async fn test_translate_batch_server_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/translate/"))
            .respond_with(ResponseTemplate::new(500).set_body_string("translator down"))
            .mount(&mock_server)
            .await;

        let config = test_config(&mock_server.uri());
        let client = reqwest::Client::new();

        let batch = items(&[(ContentKey::post(1), "thanks")]);
        let result = translate_batch(&client, &config, "kansai", &batch).await;

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_translate_batch_connection_refused_is_network() {
        let config = test_config("http://127.0.0.1:9");
        let client = reqwest::Client::new();

        let batch = items(&[(ContentKey::post(1), "thanks")]);
        let result = translate_batch(&client, &config, "kansai", &batch).await;

        assert!(matches!(result, Err(ApiError::Network(_))));
    }
}
