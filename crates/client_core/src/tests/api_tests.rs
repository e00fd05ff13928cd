use super::*;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{
    net::TcpListener,
    sync::{oneshot, Mutex},
};

type Capture<T> = Arc<Mutex<Option<oneshot::Sender<T>>>>;

async fn spawn_server(app: Router) -> Result<Url> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(Url::parse(&format!("http://{addr}"))?)
}

fn capture<T>() -> (Capture<T>, oneshot::Receiver<T>) {
    let (tx, rx) = oneshot::channel();
    (Arc::new(Mutex::new(Some(tx))), rx)
}

fn sample_words() -> Value {
    json!({
        "words": [
            {
                "id": 1,
                "japanese": "犬",
                "reading": "いぬ",
                "translation": "Translation: con chó (inu)\nAdditional meanings/notes: thú cưng",
                "category": "Động vật",
                "jlpt": "N5"
            },
            {
                "id": "2",
                "japanese": "猫",
                "meaning": "con mèo",
                "category": "Động vật"
            },
            {
                "id": 3,
                "japanese": "地図",
                "translation": "bản đồ",
                "category": "Du lịch"
            }
        ],
        "categories": ["Động vật", "Du lịch"]
    })
}

async fn words_client() -> HttpDictionaryClient {
    let app = Router::new().route("/get_words", get(|| async { Json(sample_words()) }));
    HttpDictionaryClient::new(spawn_server(app).await.expect("spawn server"))
}

#[tokio::test]
async fn fetch_words_returns_structured_meanings() {
    let client = words_client().await;

    let words = client.fetch_words().await.expect("words");
    assert_eq!(words.len(), 3);
    assert_eq!(words[0].id, WordId::new("1"));
    assert_eq!(words[0].primary_meaning, "con chó (inu)");
    assert_eq!(words[0].additional_notes.as_deref(), Some("thú cưng"));
    assert_eq!(words[1].primary_meaning, "con mèo");
    assert_eq!(words[2].primary_meaning, "bản đồ");
}

#[tokio::test]
async fn fetch_by_category_filters_client_side() {
    let client = words_client().await;

    let animals = client
        .fetch_words_by_category("Động vật")
        .await
        .expect("words");
    assert_eq!(animals.len(), 2);
    assert!(animals.iter().all(|word| word.category == "Động vật"));

    let categories = client.fetch_categories().await.expect("categories");
    assert_eq!(categories, vec!["Động vật", "Du lịch"]);
}

#[tokio::test]
async fn missing_collections_are_empty() {
    let app = Router::new().route("/get_words", get(|| async { Json(json!({})) }));
    let client = HttpDictionaryClient::new(spawn_server(app).await.expect("spawn server"));

    assert!(client.fetch_words().await.expect("words").is_empty());
    assert!(client.fetch_categories().await.expect("categories").is_empty());
}

#[tokio::test]
async fn add_words_posts_raw_text_untouched() {
    let (tx, rx) = capture::<AddWordsRequest>();
    let app = Router::new()
        .route(
            "/add_words",
            post(
                |State(tx): State<Capture<AddWordsRequest>>,
                 Json(body): Json<AddWordsRequest>| async move {
                    if let Some(tx) = tx.lock().await.take() {
                        let _ = tx.send(body);
                    }
                    Json(json!({
                        "results": [
                            { "id": 10, "japanese": "犬", "translation": "Translation: con chó", "category": "Động vật" },
                            { "id": 11, "japanese": "猫", "translation": "Translation: con mèo", "category": "Động vật" }
                        ]
                    }))
                },
            ),
        )
        .with_state(tx);
    let client = HttpDictionaryClient::new(spawn_server(app).await.expect("spawn server"));

    let added = client
        .add_words("犬\n猫, 鳥", "Động vật")
        .await
        .expect("add words");
    assert_eq!(added.len(), 2);
    assert_eq!(added[1].primary_meaning, "con mèo");

    let body = rx.await.expect("request body");
    assert_eq!(body.words, "犬\n猫, 鳥");
    assert_eq!(body.category, "Động vật");
}

#[tokio::test]
async fn update_word_targets_id_and_joins_translation() {
    let (tx, rx) = capture::<(String, Value)>();
    let app = Router::new()
        .route(
            "/update_word/:id",
            put(
                |State(tx): State<Capture<(String, Value)>>,
                 Path(id): Path<String>,
                 Json(body): Json<Value>| async move {
                    if let Some(tx) = tx.lock().await.take() {
                        let _ = tx.send((id, body));
                    }
                    Json(json!({ "success": true }))
                },
            ),
        )
        .with_state(tx);
    let client = HttpDictionaryClient::new(spawn_server(app).await.expect("spawn server"));

    let patch = WordPatch {
        primary_meaning: Some("con chó".into()),
        jlpt: Some("N4".into()),
        ..WordPatch::default()
    };
    let ok = client
        .update_word(&WordId::new("105"), &patch)
        .await
        .expect("update");
    assert!(ok);

    let (id, body) = rx.await.expect("request");
    assert_eq!(id, "105");
    assert_eq!(
        body,
        json!({ "translation": "Translation: con chó", "jlpt": "N4" })
    );
}

#[tokio::test]
async fn rejected_delete_returns_false() {
    let app = Router::new().route(
        "/delete_word/:id",
        delete(|Path(_id): Path<String>| async {
            Json(json!({ "success": false, "error": "word not found" }))
        }),
    );
    let client = HttpDictionaryClient::new(spawn_server(app).await.expect("spawn server"));

    let ok = client
        .delete_word(&WordId::new("404"))
        .await
        .expect("delete call");
    assert!(!ok);
}

#[tokio::test]
async fn add_category_acknowledges_success() {
    let app = Router::new().route(
        "/add_category",
        post(|Json(body): Json<AddCategoryRequest>| async move {
            Json(json!({ "success": body.category == "Ẩm thực" }))
        }),
    );
    let client = HttpDictionaryClient::new(spawn_server(app).await.expect("spawn server"));

    assert!(client.add_category("Ẩm thực").await.expect("add"));
    assert!(!client.add_category("Khác").await.expect("add"));
}

#[tokio::test]
async fn error_status_maps_to_api_exception() {
    let app = Router::new().route(
        "/delete_word/:id",
        delete(|| async { (StatusCode::NOT_FOUND, "no such word") }),
    );
    let client = HttpDictionaryClient::new(spawn_server(app).await.expect("spawn server"));

    let err = client
        .delete_word(&WordId::new("7"))
        .await
        .expect_err("must fail");
    let api = err.downcast_ref::<ApiException>().expect("api exception");
    assert_eq!(api.code, ErrorCode::NotFound);
    assert!(api.message.contains("no such word"));
}

#[tokio::test]
async fn malformed_body_is_reported() {
    let app = Router::new().route("/get_words", get(|| async { "<html>oops</html>" }));
    let client = HttpDictionaryClient::new(spawn_server(app).await.expect("spawn server"));

    let err = client.fetch_words().await.expect_err("must fail");
    let api = err.downcast_ref::<ApiException>().expect("api exception");
    assert_eq!(api.code, ErrorCode::Malformed);
}

#[tokio::test]
async fn base_url_path_prefix_is_kept() {
    let inner = Router::new().route("/get_words", get(|| async { Json(sample_words()) }));
    let app = Router::new().nest("/api", inner);
    let root = spawn_server(app).await.expect("spawn server");
    let client = HttpDictionaryClient::new(root.join("/api/").expect("join"));

    assert_eq!(client.fetch_words().await.expect("words").len(), 3);
    assert_eq!(
        client.endpoint(&["delete_word", "a b"]).expect("url").path(),
        "/api/delete_word/a%20b"
    );
}

#[tokio::test]
async fn unreachable_backend_is_an_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let client =
        HttpDictionaryClient::new(Url::parse(&format!("http://{addr}")).expect("url"));
    let err = client.fetch_words().await.expect_err("must fail");
    assert!(err.to_string().contains("failed to reach dictionary backend"));
}

#[tokio::test]
async fn missing_api_always_fails() {
    let api = MissingDictionaryApi;
    assert!(api.fetch_words().await.is_err());
    assert!(api.delete_word(&WordId::new("1")).await.is_err());
}

#[test]
fn client_from_settings_uses_configured_url() {
    let settings = ClientSettings {
        api_url: "http://dictionary.local:8080/".into(),
        ..ClientSettings::default()
    };
    let client = HttpDictionaryClient::from_settings(&settings).expect("client");
    assert_eq!(client.base_url().as_str(), "http://dictionary.local:8080/");

    let bad = ClientSettings {
        api_url: "dictionary.local".into(),
        ..ClientSettings::default()
    };
    assert!(HttpDictionaryClient::from_settings(&bad).is_err());
}
