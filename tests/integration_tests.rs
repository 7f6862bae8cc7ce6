//! Integration tests for the linked content translation service
//!
//! A mocked Management API serves a small project: a `page` type with a SEO
//! snippet and a `related` linked items element, a `card` type, and three
//! items where A links to [B, C] and B links to [C].

use async_trait::async_trait;
use linked_content_translation::{
    cms::ManagementClient,
    config::Config,
    model::{Language, TextMap},
    run_translation,
    server::{router, AppState},
    translation::{StubMode, StubTranslator, TranslatedTexts, TranslationProvider},
    Error, TranslationJob,
};
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

const PROJECT: &str = "project-1";

// ==================== Test Helpers ====================

fn project_path(rest: &str) -> String {
    format!("/projects/{}/{}", PROJECT, rest)
}

fn client_for(server: &MockServer) -> ManagementClient {
    ManagementClient::new(reqwest::Client::new(), server.uri(), PROJECT, "test-key")
}

fn job(item_ids: &[&str], to: &[&str]) -> TranslationJob {
    TranslationJob {
        item_ids: item_ids.iter().map(|s| s.to_string()).collect(),
        from_language_id: "lang-en".to_string(),
        to_language_ids: to.iter().map(|s| s.to_string()).collect(),
    }
}

fn variant(item_id: &str, elements: Value) -> Value {
    json!({
        "item": { "id": item_id },
        "language": { "id": "lang-en" },
        "elements": elements,
        "last_modified": "2024-05-01T10:00:00Z"
    })
}

async fn mount_schema(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(project_path("types")))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "types": [
                {
                    "id": "type-page",
                    "codename": "page",
                    "name": "Page",
                    "elements": [
                        { "id": "el-title", "codename": "title", "type": "text" },
                        { "id": "el-body", "codename": "body", "type": "rich_text" },
                        { "id": "el-related", "codename": "related", "type": "modular_content" },
                        { "id": "el-seo", "type": "snippet", "snippet": { "id": "snip-seo" } }
                    ]
                },
                {
                    "id": "type-card",
                    "codename": "card",
                    "name": "Card",
                    "elements": [
                        { "id": "el-card-title", "codename": "card_title", "type": "text" },
                        { "id": "el-card-slug", "codename": "slug", "type": "url_slug" }
                    ]
                }
            ],
            "pagination": { "continuation_token": null }
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(project_path("snippets/snip-seo")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "snip-seo",
            "elements": [ { "id": "el-seo-title", "codename": "seo__title", "type": "text" } ]
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(project_path("languages")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "languages": [
                { "id": "lang-en", "name": "English", "codename": "en", "is_active": true },
                { "id": "lang-es", "name": "Spanish", "codename": "es", "is_active": true },
                { "id": "lang-de", "name": "German", "codename": "de", "is_active": true }
            ],
            "pagination": { "continuation_token": null }
        })))
        .mount(server)
        .await;
}

async fn mount_item(server: &MockServer, item_id: &str, type_id: &str, elements: Value) {
    Mock::given(method("GET"))
        .and(path(project_path(&format!("items/{}", item_id))))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": item_id,
            "name": item_id.to_uppercase(),
            "codename": item_id,
            "type": { "id": type_id }
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(project_path(&format!("items/{}/variants/lang-en", item_id))))
        .respond_with(ResponseTemplate::new(200).set_body_json(variant(item_id, elements)))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_linked_items(server: &MockServer) {
    mount_item(
        server,
        "a",
        "type-page",
        json!([
            { "element": { "id": "el-title" }, "value": "Home" },
            { "element": { "id": "el-body" }, "value": "<p>Welcome</p>" },
            { "element": { "id": "el-related" }, "value": [ { "id": "b" }, { "id": "c" } ] },
            { "element": { "id": "el-seo-title" }, "value": "Home page" }
        ]),
    )
    .await;

    mount_item(
        server,
        "b",
        "type-page",
        json!([
            { "element": { "id": "el-title" }, "value": "About" },
            { "element": { "id": "el-body" }, "value": "" },
            { "element": { "id": "el-related" }, "value": [ { "id": "c" } ] },
            { "element": { "id": "el-seo-title" }, "value": "" }
        ]),
    )
    .await;

    mount_item(
        server,
        "c",
        "type-card",
        json!([
            { "element": { "id": "el-card-title" }, "value": "Contact" },
            { "element": { "id": "el-card-slug" }, "value": "contact", "mode": "autogenerated" }
        ]),
    )
    .await;
}

async fn mount_upsert(server: &MockServer, item_id: &str, language_id: &str, status: u16) {
    let response = if status == 200 {
        ResponseTemplate::new(200).set_body_json(json!({
            "item": { "id": item_id },
            "language": { "id": language_id },
            "elements": []
        }))
    } else {
        ResponseTemplate::new(status).set_body_string("Upsert rejected")
    };

    Mock::given(method("PUT"))
        .and(path(project_path(&format!("items/{}/variants/{}", item_id, language_id))))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

/// Elements of the PUT body sent for one variant, keyed by element id.
async fn upserted_elements(server: &MockServer, item_id: &str, language_id: &str) -> Vec<Value> {
    let wanted = project_path(&format!("items/{}/variants/{}", item_id, language_id));
    let requests = server.received_requests().await.expect("Request recording is on");
    let request = requests
        .iter()
        .find(|r| r.method.as_str() == "PUT" && r.url.path() == wanted)
        .unwrap_or_else(|| panic!("No upsert for {}", wanted));

    let body: Value = request.body_json().expect("Upsert body should be JSON");
    body["elements"].as_array().expect("elements array").clone()
}

fn element_value<'a>(elements: &'a [Value], element_id: &str) -> &'a Value {
    &elements
        .iter()
        .find(|e| e["element"]["id"] == element_id)
        .unwrap_or_else(|| panic!("No element {}", element_id))["value"]
}

fn test_config(management_api_url: &str) -> Config {
    Config {
        port: 0,
        management_api_url: management_api_url.to_string(),
        translation_provider: "stub".to_string(),
        openai_api_key: None,
        openai_model: "gpt-4o-mini".to_string(),
        openai_api_url: "http://unused.test".to_string(),
    }
}

// ==================== Full Pipeline ====================

#[tokio::test]
async fn test_translates_whole_linked_closure() {
    let server = MockServer::start().await;
    mount_schema(&server).await;
    mount_linked_items(&server).await;
    for item in ["a", "b", "c"] {
        mount_upsert(&server, item, "lang-es", 200).await;
    }

    let translator = StubTranslator::new(StubMode::Suffix);
    let report = run_translation(&client_for(&server), &translator, &job(&["a"], &["lang-es"]))
        .await
        .expect("Run should succeed");

    assert!(report.is_complete());
    let mut written: Vec<_> = report.written.iter().map(|w| w.item_id.as_str()).collect();
    written.sort();
    assert_eq!(written, vec!["a", "b", "c"]);

    let a = upserted_elements(&server, "a", "lang-es").await;
    assert_eq!(element_value(&a, "el-title"), "Home (es)");
    assert_eq!(element_value(&a, "el-body"), "<p>Welcome</p> (es)");
    assert_eq!(element_value(&a, "el-seo-title"), "Home page (es)");
    assert_eq!(
        element_value(&a, "el-related"),
        &json!([ { "id": "b" }, { "id": "c" } ])
    );

    // Empty source texts are not sent, so they are not written either
    let b = upserted_elements(&server, "b", "lang-es").await;
    assert_eq!(element_value(&b, "el-title"), "About (es)");
    assert!(b.iter().all(|e| e["element"]["id"] != "el-body"));
    assert_eq!(element_value(&b, "el-related"), &json!([ { "id": "c" } ]));

    // Autogenerated slugs are left to the CMS
    let c = upserted_elements(&server, "c", "lang-es").await;
    assert_eq!(c.len(), 1);
    assert_eq!(element_value(&c, "el-card-title"), "Contact (es)");
}

#[tokio::test]
async fn test_unknown_and_duplicate_targets_are_ignored() {
    let server = MockServer::start().await;
    mount_schema(&server).await;
    mount_linked_items(&server).await;
    for item in ["a", "b", "c"] {
        mount_upsert(&server, item, "lang-de", 200).await;
    }

    let translator = StubTranslator::new(StubMode::Placeholder);
    let report = run_translation(
        &client_for(&server),
        &translator,
        &job(&["a"], &["lang-de", "lang-xx", "lang-de"]),
    )
    .await
    .expect("Run should succeed");

    assert_eq!(report.written.len(), 3);
    assert!(report.written.iter().all(|w| w.language_id == "lang-de"));
}

#[tokio::test]
async fn test_failed_upsert_is_reported_not_fatal() {
    let server = MockServer::start().await;
    mount_schema(&server).await;
    mount_linked_items(&server).await;
    mount_upsert(&server, "a", "lang-es", 200).await;
    mount_upsert(&server, "b", "lang-es", 200).await;
    mount_upsert(&server, "c", "lang-es", 500).await;

    let translator = StubTranslator::new(StubMode::Placeholder);
    let report = run_translation(&client_for(&server), &translator, &job(&["a"], &["lang-es"]))
        .await
        .expect("Write failures do not fail the run");

    assert!(!report.is_complete());
    assert_eq!(report.written.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].item_id, "c");
    assert!(report.failed[0].error.contains("500"), "{}", report.failed[0].error);
}

/// Translates like the placeholder stub but slips an extra key into the
/// answer for one item.
struct KeyInventingTranslator {
    item_id: &'static str,
    invented_key: &'static str,
}

#[async_trait]
impl TranslationProvider for KeyInventingTranslator {
    async fn translate(
        &self,
        texts: &TextMap,
        source_language: &Language,
        target_languages: &[Language],
    ) -> anyhow::Result<TranslatedTexts> {
        let mut translated = StubTranslator::new(StubMode::Placeholder)
            .translate(texts, source_language, target_languages)
            .await?;

        let prefix = format!("{};", self.item_id);
        if texts.keys().any(|key| key.starts_with(&prefix)) {
            for map in translated.values_mut() {
                map.insert(self.invented_key.to_string(), "Inventado".to_string());
            }
        }
        Ok(translated)
    }

    fn provider_name(&self) -> &str {
        "Key Inventing Translator"
    }
}

#[tokio::test]
async fn test_malformed_key_fails_only_its_variant() {
    let server = MockServer::start().await;
    mount_schema(&server).await;
    mount_linked_items(&server).await;
    mount_upsert(&server, "a", "lang-es", 200).await;
    mount_upsert(&server, "c", "lang-es", 200).await;

    Mock::given(method("PUT"))
        .and(path(project_path("items/b/variants/lang-es")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let translator = KeyInventingTranslator {
        item_id: "b",
        invented_key: "b;el-title",
    };
    let report = run_translation(&client_for(&server), &translator, &job(&["a"], &["lang-es"]))
        .await
        .expect("A bad key does not fail the run");

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].item_id, "b");
    assert_eq!(report.failed[0].language_id, "lang-es");
    assert!(report.failed[0].error.contains("b;el-title"), "{}", report.failed[0].error);

    let mut written: Vec<_> = report.written.iter().map(|w| w.item_id.as_str()).collect();
    written.sort();
    assert_eq!(written, vec!["a", "c"]);
}

#[tokio::test]
async fn test_out_of_range_list_index_fails_only_its_variant() {
    let server = MockServer::start().await;
    mount_schema(&server).await;
    mount_linked_items(&server).await;
    mount_upsert(&server, "a", "lang-es", 200).await;
    mount_upsert(&server, "b", "lang-es", 200).await;

    Mock::given(method("PUT"))
        .and(path(project_path("items/c/variants/lang-es")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let translator = KeyInventingTranslator {
        item_id: "c",
        invented_key: "c;el-card-title;text;18446744073709551615",
    };
    let report = run_translation(&client_for(&server), &translator, &job(&["a"], &["lang-es"]))
        .await
        .expect("A bad index does not fail the run");

    assert_eq!(report.written.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].item_id, "c");
    assert!(report.failed[0].error.contains("18446744073709551615"), "{}", report.failed[0].error);
}

// ==================== Failures Before Write-back ====================

#[tokio::test]
async fn test_unknown_source_language_fails_run() {
    let server = MockServer::start().await;
    mount_schema(&server).await;

    Mock::given(method("GET"))
        .and(path(project_path("items/a")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "a",
            "type": { "id": "type-card" }
        })))
        .mount(&server)
        .await;

    // Variants are read in the requested source language
    Mock::given(method("GET"))
        .and(path(project_path("items/a/variants/lang-fr")))
        .respond_with(ResponseTemplate::new(200).set_body_json(variant("a", json!([]))))
        .mount(&server)
        .await;

    let mut job = job(&["a"], &["lang-es"]);
    job.from_language_id = "lang-fr".to_string();

    let translator = StubTranslator::new(StubMode::Placeholder);
    let err = run_translation(&client_for(&server), &translator, &job)
        .await
        .unwrap_err();

    assert!(
        matches!(err, Error::UnknownLanguage { ref language_id } if language_id == "lang-fr"),
        "{:?}",
        err
    );
}

#[tokio::test]
async fn test_provider_failure_writes_nothing() {
    let server = MockServer::start().await;
    mount_schema(&server).await;
    mount_linked_items(&server).await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let translator = StubTranslator::new(StubMode::Error("quota exceeded".to_string()));
    let err = run_translation(&client_for(&server), &translator, &job(&["a"], &["lang-es"]))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Transport(_)));
    assert!(format!("{:#}", anyhow::Error::from(err)).contains("quota exceeded"));
}

#[tokio::test]
async fn test_missing_snippet_is_schema_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(project_path("types")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "types": [ {
                "id": "type-page",
                "elements": [ { "id": "el-seo", "type": "snippet", "snippet": { "id": "snip-gone" } } ]
            } ],
            "pagination": { "continuation_token": null }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(project_path("snippets/snip-gone")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let translator = StubTranslator::new(StubMode::Placeholder);
    let err = run_translation(&client_for(&server), &translator, &job(&["a"], &["lang-es"]))
        .await
        .unwrap_err();

    assert!(err.is_schema_inconsistency());
    assert!(
        matches!(err, Error::MissingSnippet { ref snippet_id, .. } if snippet_id == "snip-gone"),
        "{:?}",
        err
    );
}

#[tokio::test]
async fn test_item_of_unknown_type_is_schema_error() {
    let server = MockServer::start().await;
    mount_schema(&server).await;
    mount_item(
        &server,
        "orphan",
        "type-deleted",
        json!([ { "element": { "id": "el-title" }, "value": "Lost" } ]),
    )
    .await;

    let translator = StubTranslator::new(StubMode::Placeholder);
    let err = run_translation(&client_for(&server), &translator, &job(&["orphan"], &["lang-es"]))
        .await
        .unwrap_err();

    assert!(
        matches!(err, Error::MissingType { ref type_id, .. } if type_id == "type-deleted"),
        "{:?}",
        err
    );
}

// ==================== HTTP Server ====================

async fn spawn_app(management_api_url: &str) -> String {
    let state = AppState {
        config: Arc::new(test_config(management_api_url)),
        http: reqwest::Client::new(),
        translator: Arc::new(StubTranslator::new(StubMode::Placeholder)),
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Listener address");

    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.expect("Server error");
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn test_http_partial_failure_is_multi_status() {
    let server = MockServer::start().await;
    mount_schema(&server).await;
    mount_linked_items(&server).await;
    mount_upsert(&server, "a", "lang-es", 200).await;
    mount_upsert(&server, "b", "lang-es", 403).await;
    mount_upsert(&server, "c", "lang-es", 200).await;

    let app = spawn_app(&server.uri()).await;
    let response = reqwest::Client::new()
        .post(format!("{}/api/translations", app))
        .json(&json!({
            "projectId": PROJECT,
            "mapiKey": "test-key",
            "itemIds": ["a"],
            "fromLanguageId": "lang-en",
            "toLanguageIds": ["lang-es"]
        }))
        .send()
        .await
        .expect("Request should be sent");

    assert_eq!(response.status().as_u16(), 207);
    let body: Value = response.json().await.expect("JSON report");
    assert_eq!(body["written"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["failed"][0]["itemId"], "b");
    assert_eq!(body["failed"][0]["languageId"], "lang-es");
}

#[tokio::test]
async fn test_http_health() {
    let app = spawn_app("http://127.0.0.1:1").await;

    let response = reqwest::get(format!("{}/health", app))
        .await
        .expect("Request should be sent");

    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_http_rejects_malformed_body() {
    let app = spawn_app("http://127.0.0.1:1").await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/translations", app))
        .json(&json!({ "projectId": PROJECT }))
        .send()
        .await
        .expect("Request should be sent");

    assert!(response.status().is_client_error());
}
