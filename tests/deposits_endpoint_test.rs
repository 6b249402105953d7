use axum::http::StatusCode;
use chrono::{DateTime, FixedOffset};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;
use vicebank::domain::{Decimal, Frequency, Task, UserId};
use vicebank::store::Stores;
use vicebank::{api, build_state, init_db, Repository, StorageBackend};

const USER: &str = "dana";

fn date(value: &Value) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(value.as_str().unwrap()).unwrap()
}

fn ts(raw: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(raw).unwrap()
}

struct TestApp {
    app: axum::Router,
    stores: Stores,
    _temp: TempDir,
}

async fn setup_test_app() -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let stores = Stores::from_backend(Arc::new(Repository::new(pool)));
    let app = api::create_router(build_state(stores.clone(), StorageBackend::Sqlite));

    TestApp {
        app,
        stores,
        _temp: temp_dir,
    }
}

impl TestApp {
    async fn task(&self, frequency: Frequency, rate: i64) -> Task {
        let task = Task::new(
            UserId::new(USER.to_string()),
            "Practice piano".to_string(),
            frequency,
            Decimal::from(rate),
        );
        self.stores.tasks.insert_task(&task).await.unwrap();
        task
    }

    async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = axum::http::Request::builder().method(method).uri(uri);
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(axum::body::Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(axum::body::Body::empty()).unwrap(),
        };

        let resp = self.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn add(&self, task: &Task, date: &str) -> Value {
        let (status, json) = self
            .request(
                "POST",
                "/v1/deposits",
                Some(json!({"userId": USER, "taskId": task.id.as_str(), "date": date})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", json);
        json
    }
}

#[tokio::test]
async fn test_add_deposit_response_shape() {
    let app = setup_test_app().await;
    let task = app.task(Frequency::Daily, 2).await;

    let json = app.add(&task, "2024-01-01T08:00:00Z").await;
    assert_eq!(json["tokensAdded"].as_f64(), Some(2.0));
    assert_eq!(json["balance"].as_f64(), Some(2.0));
    assert_eq!(json["taskDeposit"]["taskId"], task.id.as_str());
    assert_eq!(json["taskDeposit"]["taskName"], "Practice piano");
    assert_eq!(json["taskDeposit"]["frequency"], "daily");
    assert_eq!(json["taskDeposit"]["tokensEarned"].as_f64(), Some(2.0));
    assert!(json["taskDeposit"]["id"].is_string());
    assert_eq!(json["changedDeposits"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_second_deposit_same_window_earns_nothing() {
    let app = setup_test_app().await;
    let task = app.task(Frequency::Weekly, 3).await;

    app.add(&task, "2024-01-01T08:00:00Z").await;
    let json = app.add(&task, "2024-01-05T08:00:00Z").await;
    assert_eq!(json["tokensAdded"].as_f64(), Some(0.0));
    assert_eq!(json["balance"].as_f64(), Some(3.0));
    assert!(json["changedDeposits"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_update_moves_deposit_and_promotes() {
    let app = setup_test_app().await;
    let task = app.task(Frequency::Daily, 1).await;

    let d1 = app.add(&task, "2024-01-01T08:00:00Z").await;
    let d2 = app.add(&task, "2024-01-01T20:00:00Z").await;
    let d1_id = d1["taskDeposit"]["id"].as_str().unwrap();

    let (status, json) = app
        .request(
            "PUT",
            &format!("/v1/deposits/{}", d1_id),
            Some(json!({"userId": USER, "date": "2024-01-02T08:00:00Z"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", json);
    assert_eq!(json["tokensAdded"].as_f64(), Some(1.0));
    assert_eq!(json["balance"].as_f64(), Some(2.0));
    // Prior snapshot.
    assert_eq!(date(&json["taskDeposit"]["date"]), ts("2024-01-01T08:00:00Z"));
    let changed: Vec<&str> = json["changedDeposits"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["depositId"].as_str().unwrap())
        .collect();
    assert_eq!(changed, vec![d2["taskDeposit"]["id"].as_str().unwrap()]);
}

#[tokio::test]
async fn test_delete_reports_each_change() {
    let app = setup_test_app().await;
    let task = app.task(Frequency::Monthly, 4).await;

    let d1 = app.add(&task, "2024-02-01T08:00:00Z").await;
    app.add(&task, "2024-02-20T08:00:00Z").await;
    let d1_id = d1["taskDeposit"]["id"].as_str().unwrap();

    let (status, json) = app
        .request(
            "DELETE",
            &format!("/v1/deposits/{}?userId={}", d1_id, USER),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", json);
    assert_eq!(json["tokensAdded"].as_f64(), Some(0.0));
    assert_eq!(json["balance"].as_f64(), Some(4.0));

    let changes = json["changedDeposits"].as_array().unwrap();
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0]["depositId"], d1_id);
    assert_eq!(changes[0]["previous"].as_f64(), Some(4.0));
    assert_eq!(changes[0]["current"].as_f64(), Some(0.0));
    assert_eq!(changes[1]["current"].as_f64(), Some(4.0));
}

#[tokio::test]
async fn test_list_deposits_with_filters() {
    let app = setup_test_app().await;
    let task = app.task(Frequency::Daily, 1).await;
    app.add(&task, "2024-01-01T08:00:00Z").await;
    app.add(&task, "2024-01-01T09:00:00Z").await;
    app.add(&task, "2024-01-02T08:00:00Z").await;

    let (status, json) = app
        .request("GET", &format!("/v1/deposits?userId={}", USER), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["depositCount"], 3);
    assert_eq!(json["totalTokens"].as_f64(), Some(2.0));

    let (_, json) = app
        .request(
            "GET",
            &format!(
                "/v1/deposits?userId={}&taskId={}&from=2024-01-01T08:30:00Z&to=2024-01-01T23:00:00Z",
                USER,
                task.id.as_str()
            ),
            None,
        )
        .await;
    assert_eq!(json["depositCount"], 1);
    assert_eq!(date(&json["deposits"][0]["date"]), ts("2024-01-01T09:00:00Z"));
}

#[tokio::test]
async fn test_deposit_window_lookup() {
    let app = setup_test_app().await;
    let task = app.task(Frequency::Daily, 1).await;
    let first = app.add(&task, "2024-01-01T08:00:00Z").await;
    app.add(&task, "2024-01-03T08:00:00Z").await;
    app.add(&task, "2024-01-09T08:00:00Z").await;
    let id = first["taskDeposit"]["id"].as_str().unwrap();

    let (status, json) = app
        .request(
            "GET",
            &format!("/v1/deposits/{}/window?userId={}", id, USER),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", json);
    assert_eq!(json["deposits"].as_array().unwrap().len(), 1);
    assert_eq!(date(&json["start"]), ts("2024-01-01T00:00:00Z"));
    assert_eq!(date(&json["end"]), ts("2024-01-01T23:59:59.999Z"));

    let (_, json) = app
        .request(
            "GET",
            &format!("/v1/deposits/{}/window?userId={}&frequency=weekly", id, USER),
            None,
        )
        .await;
    assert_eq!(json["deposits"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unknown_task_is_404_and_persists_nothing() {
    let app = setup_test_app().await;
    let (status, json) = app
        .request(
            "POST",
            "/v1/deposits",
            Some(json!({"userId": USER, "taskId": "missing", "date": "2024-01-01T08:00:00Z"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].is_string());

    let (_, json) = app
        .request("GET", &format!("/v1/deposits?userId={}", USER), None)
        .await;
    assert_eq!(json["depositCount"], 0);
    let (_, json) = app
        .request("GET", &format!("/v1/balance?userId={}", USER), None)
        .await;
    assert_eq!(json["tokens"].as_f64(), Some(0.0));
}

#[tokio::test]
async fn test_invalid_input_is_400() {
    let app = setup_test_app().await;
    let task = app.task(Frequency::Daily, 1).await;

    let cases = [
        json!({"userId": USER, "taskId": task.id.as_str(), "date": "yesterday"}),
        json!({"userId": "  ", "taskId": task.id.as_str(), "date": "2024-01-01T08:00:00Z"}),
        json!({"userId": USER, "taskId": "", "date": "2024-01-01T08:00:00Z"}),
    ];
    for body in cases {
        let (status, json) = app.request("POST", "/v1/deposits", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", json);
        assert!(json["error"].is_string());
    }

    let (status, _) = app
        .request(
            "GET",
            &format!(
                "/v1/deposits?userId={}&from=2024-01-02T00:00:00Z&to=2024-01-01T00:00:00Z",
                USER
            ),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_other_users_deposit_is_404() {
    let app = setup_test_app().await;
    let task = app.task(Frequency::Daily, 1).await;
    let d = app.add(&task, "2024-01-01T08:00:00Z").await;
    let id = d["taskDeposit"]["id"].as_str().unwrap();

    let (status, _) = app
        .request("DELETE", &format!("/v1/deposits/{}?userId=eve", id), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .request(
            "PUT",
            &format!("/v1/deposits/{}", id),
            Some(json!({"userId": "eve", "date": "2024-01-03T08:00:00Z"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
