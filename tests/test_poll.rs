mod common;

use std::time::Duration;

use common::{ScriptedModule, conn, dispatcher, get, json_body, panel};
use serde_json::json;
use ucp_ajax::ajax::HandlerResult;
use ucp_ajax::ajax::poll::PollAggregator;
use ucp_ajax::ajax::DispatchError;
use ucp_ajax::http::request::{Method, RequestBuilder};
use ucp_ajax::http::response::StatusCode;
use ucp_ajax::modules::{ModuleRegistry, StaticRegistry};

fn three_pollers() -> (StaticRegistry, [ScriptedModule; 3]) {
    // Slowest first, so completion order differs from name order
    let a = ScriptedModule::default().polling(json!({ "unread": 1 })).poll_delay(Duration::from_millis(30));
    let b = ScriptedModule::default().polling(json!([])).poll_delay(Duration::from_millis(10));
    let c = ScriptedModule::default().polling(json!("idle"));
    let registry = StaticRegistry::new()
        .register("A", a.factory())
        .register("B", b.factory())
        .register("C", c.factory());
    (registry, [a, b, c])
}

#[tokio::test]
async fn test_poll_merges_one_entry_per_module() {
    let (registry, modules) = three_pollers();

    let result = PollAggregator::new(&registry).poll(json!({})).await.unwrap();

    assert_eq!(
        result,
        json!({
            "status": true,
            "modData": { "A": { "unread": 1 }, "B": [], "C": "idle" }
        })
    );
    for module in &modules {
        assert_eq!(module.calls.poll(), 1);
    }
}

#[tokio::test]
async fn test_non_polling_modules_are_left_out() {
    let quiet = ScriptedModule::answering(HandlerResult::text("x"));
    let chatty = ScriptedModule::default().polling(json!(3));
    let registry = StaticRegistry::new()
        .register("Quiet", quiet.factory())
        .register("Chatty", chatty.factory());

    assert_eq!(registry.poll_capable().into_iter().collect::<Vec<_>>(), vec!["Chatty"]);

    let result = PollAggregator::new(&registry).poll(json!({})).await.unwrap();
    assert_eq!(result, json!({ "status": true, "modData": { "Chatty": 3 } }));
    assert_eq!(quiet.calls.poll(), 0);
}

#[tokio::test]
async fn test_poll_with_no_modules_is_empty() {
    let registry = StaticRegistry::new();

    let result = PollAggregator::new(&registry).poll(json!({})).await.unwrap();

    assert_eq!(result, json!({ "status": true, "modData": {} }));
}

#[tokio::test]
async fn test_failing_poll_fails_everything() {
    let good = ScriptedModule::default().polling(json!(1));
    let bad = ScriptedModule::default().failing_poll();
    let registry = StaticRegistry::new()
        .register("Good", good.factory())
        .register("Bad", bad.factory());

    let err = PollAggregator::new(&registry).poll(json!({})).await.unwrap_err();

    assert!(matches!(err, DispatchError::GenericFailure));
}

#[tokio::test]
async fn test_poll_route_over_dispatcher() {
    let (registry, _modules) = three_pollers();
    let d = dispatcher(panel(registry));

    let response = d.handle(&get("/ajax.php?command=poll", "application/json"), &conn()).await;

    assert_eq!(response.status, StatusCode::Ok);
    let body = json_body(&response);
    assert_eq!(body["status"], json!(true));
    assert_eq!(body["modData"].as_object().unwrap().len(), 3);
}

#[tokio::test]
async fn test_poll_ignores_module_parameter() {
    let echo = ScriptedModule::default().polling(json!("echo"));
    let d = dispatcher(panel(StaticRegistry::new().register("Echo", echo.factory())));

    let response = d
        .handle(&get("/ajax.php?module=ghost&command=poll&data[since]=42", "application/json"), &conn())
        .await;

    assert_eq!(response.status, StatusCode::Ok);
    assert_eq!(
        json_body(&response),
        json!({ "status": true, "modData": { "Echo": { "since": "42" } } })
    );
}

#[tokio::test]
async fn test_poll_data_from_json_body() {
    let echo = ScriptedModule::default().polling(json!("echo"));
    let d = dispatcher(panel(StaticRegistry::new().register("Echo", echo.factory())));
    let request = RequestBuilder::new()
        .method(Method::POST)
        .path("/ajax.php?command=poll")
        .header("Content-Type", "application/json")
        .body(br#"{"data": {"chat": [1, 2]}}"#.to_vec())
        .build()
        .unwrap();

    let response = d.handle(&request, &conn()).await;

    assert_eq!(
        json_body(&response),
        json!({ "status": true, "modData": { "Echo": { "chat": [1, 2] } } })
    );
}

#[tokio::test]
async fn test_failed_poll_over_dispatcher_is_500() {
    let bad = ScriptedModule::default().failing_poll();
    let d = dispatcher(panel(StaticRegistry::new().register("Bad", bad.factory())));

    let response = d.handle(&get("/ajax.php?command=poll", "application/json"), &conn()).await;

    assert_eq!(response.status, StatusCode::InternalServerError);
    assert_eq!(json_body(&response), json!({ "error": "Unknown Error" }));
}
