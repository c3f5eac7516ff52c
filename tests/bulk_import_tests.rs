mod common;

use apigee_cli::bulk::ItemOutcome;
use apigee_cli::client::ApiRequest;
use apigee_cli::entities::{appgroups, apps, developers};
use apigee_cli::error::{InvokeError, ItemError};
use bytes::Bytes;
use common::{context, json, status, ScriptedInvoker};
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, value: &serde_json::Value) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, value.to_string()).unwrap();
    path
}

fn developers_file(dir: &TempDir) -> PathBuf {
    write(
        dir,
        "developers.json",
        &json!({ "developer": [
            { "email": "alice@example.com", "developerId": "old-alice" },
            { "email": "bob@example.com", "developerId": "old-bob" }
        ]}),
    )
}

fn app(name: &str, developer: &str, products: &[&str]) -> serde_json::Value {
    let products: Vec<_> = products.iter().map(|p| json!({ "apiproduct": p })).collect();
    json!({
        "name": name,
        "developerId": developer,
        "appId": format!("src-{name}"),
        "credentials": [{
            "consumerKey": format!("key-{name}"),
            "consumerSecret": format!("secret-{name}"),
            "apiProducts": products,
            "scopes": []
        }]
    })
}

/// Destination control plane that accepts every app import step
fn destination(path: &str, req: &ApiRequest) -> Result<Bytes, InvokeError> {
    let method = req.method.as_str();
    let parts: Vec<&str> = path.split('/').collect();
    match (method, parts.as_slice()) {
        ("GET", ["developers", email]) => json(json!({ "developerId": format!("new-{email}") })),
        ("POST", ["developers", _, "apps"]) => {
            let body: serde_json::Value =
                serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
            let name = body["name"].as_str().unwrap();
            json(json!({
                "name": name,
                "credentials": [{ "consumerKey": format!("generated-{name}") }]
            }))
        }
        ("DELETE", ["developers", _, "apps", _, "keys", _]) => json(json!({})),
        ("POST", ["developers", _, "apps", _, "keys"]) => json(json!({})),
        ("POST", ["developers", _, "apps", _, "keys", _]) => json(json!({})),
        _ => status(req, 404),
    }
}

fn outcome<'a>(outcomes: &'a [ItemOutcome], label: &str) -> &'a ItemOutcome {
    outcomes.iter().find(|o| o.label == label).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn app_import_recreates_credentials() {
    let dir = TempDir::new().unwrap();
    let apps_path = write(&dir, "apps.json", &json!([app("orders", "old-alice", &["p1", "p2"])]));
    let devs_path = developers_file(&dir);

    let invoker = ScriptedInvoker::new(destination);
    let report = apps::import(&context(&invoker), 4, &apps_path, &devs_path)
        .await
        .unwrap();
    assert!(report.is_complete_success());

    let calls = invoker.calls();
    let steps: Vec<(String, String)> = calls
        .iter()
        .map(|c| (c.method.clone(), c.path.clone()))
        .collect();
    assert_eq!(
        steps,
        vec![
            ("GET".into(), "developers/alice@example.com".into()),
            ("POST".into(), "developers/new-alice@example.com/apps".into()),
            (
                "DELETE".into(),
                "developers/alice@example.com/apps/orders/keys/generated-orders".into()
            ),
            ("POST".into(), "developers/new-alice@example.com/apps/orders/keys".into()),
            (
                "POST".into(),
                "developers/new-alice@example.com/apps/orders/keys/key-orders".into()
            ),
        ]
    );

    // the create call carries neither credentials nor the source developer id
    let create: serde_json::Value =
        serde_json::from_str(calls[1].body.as_deref().unwrap()).unwrap();
    assert_eq!(create, json!({ "name": "orders" }));

    // keys are created without products, which are attached separately
    let key: serde_json::Value = serde_json::from_str(calls[3].body.as_deref().unwrap()).unwrap();
    assert_eq!(
        key,
        json!({ "consumerKey": "key-orders", "consumerSecret": "secret-orders" })
    );
    let update: serde_json::Value =
        serde_json::from_str(calls[4].body.as_deref().unwrap()).unwrap();
    assert_eq!(update["apiProducts"], json!(["p1", "p2"]));
}

#[tokio::test]
async fn credential_without_products_skips_update() {
    let dir = TempDir::new().unwrap();
    let apps_path = write(&dir, "apps.json", &json!([app("bare", "old-bob", &[])]));
    let devs_path = developers_file(&dir);

    let invoker = ScriptedInvoker::new(destination);
    let report = apps::import(&context(&invoker), 1, &apps_path, &devs_path)
        .await
        .unwrap();

    assert!(report.is_complete_success());
    let calls = invoker.calls();
    assert_eq!(calls.len(), 4);
    assert!(calls.iter().all(|c| !c.path.ends_with("keys/key-bare")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unresolved_developer_skips_only_that_app() {
    let dir = TempDir::new().unwrap();
    let apps_path = write(
        &dir,
        "apps.json",
        &json!([
            app("a0", "old-alice", &["p"]),
            app("a1", "old-bob", &["p"]),
            app("orphan", "old-nobody", &["p"]),
            app("a3", "old-alice", &["p"]),
            app("a4", "old-bob", &["p"]),
        ]),
    );
    let devs_path = developers_file(&dir);

    let invoker = ScriptedInvoker::new(destination);
    let report = apps::import(&context(&invoker), 2, &apps_path, &devs_path)
        .await
        .unwrap();

    assert_eq!(report.total(), 5);
    assert_eq!(report.failed(), 1);
    let orphan = outcome(&report.outcomes, "app orphan");
    assert!(matches!(
        orphan.result,
        Err(ItemError::UnresolvedDeveloper(ref id)) if id == "old-nobody"
    ));

    let calls = invoker.calls();
    assert!(calls.iter().all(|c| {
        !c.path.contains("orphan") && !c.body.as_deref().unwrap_or("").contains("orphan")
    }));
    for name in ["a0", "a1", "a3", "a4"] {
        let in_path = format!("/apps/{name}");
        let in_body = format!("\"{name}\"");
        let for_app = calls
            .iter()
            .filter(|c| {
                c.path.contains(&in_path) || c.body.as_deref().unwrap_or("").contains(&in_body)
            })
            .count();
        // create, delete generated key, create key, attach products
        assert_eq!(for_app, 4, "app {name}");
    }
}

#[tokio::test]
async fn failed_step_aborts_only_its_app() {
    let dir = TempDir::new().unwrap();
    let apps_path = write(
        &dir,
        "apps.json",
        &json!([app("good", "old-alice", &["p"]), app("taken", "old-bob", &["p"])]),
    );
    let devs_path = developers_file(&dir);

    let invoker = ScriptedInvoker::new(|path, req| {
        let is_taken = req
            .body
            .as_deref()
            .map(|b| b.contains("\"taken\""))
            .unwrap_or(false);
        if req.method.as_str() == "POST" && path.ends_with("/apps") && is_taken {
            return status(req, 409);
        }
        destination(path, req)
    });
    let report = apps::import(&context(&invoker), 2, &apps_path, &devs_path)
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 1);
    let taken = outcome(&report.outcomes, "app taken");
    assert!(matches!(
        taken.result,
        Err(ItemError::Invoke(ref e)) if e.status() == Some(409)
    ));
    assert!(invoker.calls().iter().all(|c| !c.path.contains("apps/taken")));
}

#[tokio::test]
async fn corrupt_apps_file_makes_no_calls() {
    let dir = TempDir::new().unwrap();
    let apps_path = dir.path().join("apps.json");
    fs::write(&apps_path, "[{\"name\": ").unwrap();
    let devs_path = developers_file(&dir);

    let invoker = ScriptedInvoker::new(destination);
    let err = apps::import(&context(&invoker), 4, &apps_path, &devs_path)
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("parsing"));
    assert!(invoker.calls().is_empty());
}

#[tokio::test]
async fn missing_developers_file_makes_no_calls() {
    let dir = TempDir::new().unwrap();
    let apps_path = write(&dir, "apps.json", &json!([app("a", "old-alice", &[])]));

    let invoker = ScriptedInvoker::new(destination);
    let result = apps::import(
        &context(&invoker),
        4,
        &apps_path,
        &dir.path().join("missing.json"),
    )
    .await;
    assert!(result.is_err());
    assert!(invoker.calls().is_empty());
}

#[tokio::test]
async fn developer_import_posts_without_source_ids() {
    let dir = TempDir::new().unwrap();
    let path = developers_file(&dir);

    let invoker = ScriptedInvoker::new(|path, req| match (req.method.as_str(), path) {
        ("POST", "developers") => json(json!({})),
        _ => status(req, 404),
    });
    let report = developers::import(&context(&invoker), 4, &path).await.unwrap();

    assert_eq!(report.succeeded(), 2);
    for call in invoker.calls() {
        let body: serde_json::Value = serde_json::from_str(call.body.as_deref().unwrap()).unwrap();
        assert!(body.get("developerId").is_none());
        assert!(body["email"].as_str().unwrap().ends_with("@example.com"));
    }
}

#[tokio::test]
async fn appgroup_import_updates_existing_and_creates_new() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "appgroups.json",
        &json!([
            { "name": "existing", "appGroupId": "src-1", "displayName": "Existing" },
            { "name": "fresh", "channelId": "c" }
        ]),
    );

    let invoker = ScriptedInvoker::new(|path, req| match (req.method.as_str(), path) {
        ("GET", "appgroups") => json(json!({ "appGroups": [{ "name": "existing" }] })),
        ("PUT", "appgroups/existing") | ("POST", "appgroups") => json(json!({})),
        _ => status(req, 404),
    });
    let report = appgroups::import(&context(&invoker), 4, &path).await.unwrap();
    assert!(report.is_complete_success());

    let calls = invoker.calls();
    let put = calls.iter().find(|c| c.method == "PUT").unwrap();
    assert_eq!(put.path, "appgroups/existing");
    assert!(!put.body.as_deref().unwrap().contains("appGroupId"));
    let post = calls.iter().find(|c| c.method == "POST").unwrap();
    assert_eq!(post.path, "appgroups");
    assert!(post.body.as_deref().unwrap().contains("\"fresh\""));
}

#[tokio::test]
async fn appgroup_import_stops_when_listing_fails() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "appgroups.json", &json!([{ "name": "g" }]));

    let invoker = ScriptedInvoker::new(|_, req| status(req, 401));
    assert!(appgroups::import(&context(&invoker), 4, &path).await.is_err());
    assert_eq!(invoker.calls().len(), 1);
}

#[tokio::test]
async fn exported_developers_file_feeds_both_imports() {
    let dir = TempDir::new().unwrap();
    let source = ScriptedInvoker::new(|path, _| match path {
        "developers" => json(json!({
            "developer": [{ "email": "alice@example.com" }, { "email": "bob@example.com" }]
        })),
        other => {
            let email = other.trim_start_matches("developers/");
            let user = email.split('@').next().unwrap_or_default();
            json(json!({ "email": email, "developerId": format!("old-{user}") }))
        }
    });
    let exported = developers::export(&context(&source), 2).await.unwrap();
    let devs_path = dir.path().join("developers.json");
    developers::write_export_file(&devs_path, &exported.payloads).unwrap();

    let invoker = ScriptedInvoker::new(|path, req| {
        if req.method.as_str() == "POST" && path == "developers" {
            return json(json!({}));
        }
        destination(path, req)
    });
    let ctx = context(&invoker);

    let report = developers::import(&ctx, 2, &devs_path).await.unwrap();
    assert_eq!(report.succeeded(), 2);

    let apps_path = write(&dir, "apps.json", &json!([app("orders", "old-bob", &["p"])]));
    let report = apps::import(&ctx, 2, &apps_path, &devs_path).await.unwrap();
    assert!(report.is_complete_success());
    assert!(invoker
        .calls()
        .iter()
        .any(|c| c.path == "developers/new-bob@example.com/apps"));
}

#[tokio::test]
async fn nameless_app_fails_only_itself() {
    let dir = TempDir::new().unwrap();
    let apps_path = write(
        &dir,
        "apps.json",
        &json!([
            app("good", "old-alice", &["p"]),
            { "developerId": "old-alice", "credentials": [] }
        ]),
    );
    let devs_path = developers_file(&dir);

    let invoker = ScriptedInvoker::new(destination);
    let report = apps::import(&context(&invoker), 2, &apps_path, &devs_path)
        .await
        .unwrap();

    assert_eq!(report.total(), 2);
    assert_eq!(report.succeeded(), 1);
    assert!(matches!(
        report.outcomes[1].result,
        Err(ItemError::MissingField("name"))
    ));
    // lookup, create, delete generated key, create key, attach products
    assert_eq!(invoker.calls().len(), 5);
}
