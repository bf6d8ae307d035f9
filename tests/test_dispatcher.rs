mod common;

use std::sync::Arc;

use common::{ScriptedModule, conn, dispatcher, get, json_body, panel};
use serde_json::{Map, json};
use ucp_ajax::ajax::HandlerResult;
use ucp_ajax::http::request::{Method, RequestBuilder};
use ucp_ajax::http::response::StatusCode;
use ucp_ajax::modules::{StaticRegistry, UcpModule};

const JSON: &str = "application/json";

fn one_module(module: &ScriptedModule) -> StaticRegistry {
    StaticRegistry::new().register("Widget", module.factory())
}

#[tokio::test]
async fn test_successful_map_result_is_returned_with_200() {
    let mut body = Map::new();
    body.insert("status".to_string(), json!(true));
    body.insert("items".to_string(), json!([1, 2, 3]));
    let module = ScriptedModule::answering(HandlerResult::map(body));
    let d = dispatcher(panel(one_module(&module)));

    let response = d.handle(&get("/ajax.php?module=widget&command=list", JSON), &conn()).await;

    assert_eq!(response.status, StatusCode::Ok);
    assert_eq!(response.header("Content-Type"), Some("text/json"));
    assert_eq!(json_body(&response), json!({ "status": true, "items": [1, 2, 3] }));
    assert_eq!(module.calls.accept(), 1);
    assert_eq!(module.calls.custom(), 1);
    assert_eq!(module.calls.handle(), 1);
}

#[tokio::test]
async fn test_text_result_is_normalized() {
    let module = ScriptedModule::answering(HandlerResult::text("saved"));
    let d = dispatcher(panel(one_module(&module)));

    let response = d.handle(&get("/ajax.php?module=widget&command=save", JSON), &conn()).await;

    assert_eq!(response.status, StatusCode::Ok);
    assert_eq!(json_body(&response), json!({ "status": true, "message": "saved" }));
}

#[tokio::test]
async fn test_true_flag_is_normalized() {
    let module = ScriptedModule::answering(HandlerResult::flag(true));
    let d = dispatcher(panel(one_module(&module)));

    let response = d.handle(&get("/ajax.php?module=widget&command=x", JSON), &conn()).await;

    assert_eq!(json_body(&response), json!({ "status": true, "message": "unknown" }));
}

#[tokio::test]
async fn test_false_flag_is_generic_failure() {
    let module = ScriptedModule::answering(HandlerResult::flag(false));
    let d = dispatcher(panel(one_module(&module)));

    let response = d.handle(&get("/ajax.php?module=widget&command=x", JSON), &conn()).await;

    assert_eq!(response.status, StatusCode::InternalServerError);
    assert_eq!(json_body(&response), json!({ "error": "Unknown Error" }));
}

#[tokio::test]
async fn test_missing_admission_hook_is_501_before_anything_else() {
    let module = ScriptedModule::without_admission();
    let d = dispatcher(panel(one_module(&module)));

    let response = d.handle(&get("/ajax.php?module=widget&command=x", JSON), &conn()).await;

    assert_eq!(response.status, StatusCode::NotImplemented);
    assert_eq!(json_body(&response), json!({ "error": "ajaxRequest not found" }));
    assert_eq!(module.calls.custom(), 0);
    assert_eq!(module.calls.handle(), 0);
}

#[tokio::test]
async fn test_declined_admission_is_403_and_skips_handler() {
    let module = ScriptedModule::answering(HandlerResult::text("nope")).admission(false);
    let d = dispatcher(panel(one_module(&module)));

    let response = d.handle(&get("/ajax.php?module=widget&command=delete", JSON), &conn()).await;

    assert_eq!(response.status, StatusCode::Forbidden);
    assert_eq!(json_body(&response), json!({ "error": "ajaxRequest declined" }));
    assert_eq!(module.calls.accept(), 1);
    assert_eq!(module.calls.custom(), 0);
    assert_eq!(module.calls.handle(), 0);
}

#[tokio::test]
async fn test_custom_handler_bypasses_serialization() {
    let module = ScriptedModule::answering(HandlerResult::text("unused")).custom("RAW-BYTES");
    let d = dispatcher(panel(one_module(&module)));

    let response = d.handle(&get("/ajax.php?module=widget&command=download", "application/xml"), &conn()).await;

    assert_eq!(response.status, StatusCode::Accepted);
    assert_eq!(response.body, b"RAW-BYTES".to_vec());
    assert_eq!(response.header("Content-Type"), Some("application/octet-stream"));
    assert_eq!(response.header("Access-Control-Allow-Origin"), None);
    assert_eq!(module.calls.handle(), 0);
}

#[tokio::test]
async fn test_missing_main_handler_is_501() {
    let module = ScriptedModule::answering(HandlerResult::text("x")).without_handler();
    let d = dispatcher(panel(one_module(&module)));

    let response = d.handle(&get("/ajax.php?module=widget&command=x", JSON), &conn()).await;

    assert_eq!(response.status, StatusCode::NotImplemented);
    assert_eq!(json_body(&response), json!({ "error": "ajaxHandler not found" }));
    assert_eq!(module.calls.custom(), 1);
}

#[tokio::test]
async fn test_handler_error_does_not_leak_detail() {
    let module = ScriptedModule::answering(HandlerResult::text("x")).failing_handler();
    let d = dispatcher(panel(one_module(&module)));

    let response = d.handle(&get("/ajax.php?module=widget&command=x", JSON), &conn()).await;

    assert_eq!(response.status, StatusCode::InternalServerError);
    let body = String::from_utf8(response.body.clone()).unwrap();
    assert!(!body.contains("fire"));
    assert_eq!(json_body(&response), json!({ "error": "Unknown Error" }));
}

#[tokio::test]
async fn test_module_failure_keeps_its_status() {
    let module = ScriptedModule::answering(HandlerResult::failure(StatusCode::Conflict, "Already exists"));
    let d = dispatcher(panel(one_module(&module)));

    let response = d.handle(&get("/ajax.php?module=widget&command=add", JSON), &conn()).await;

    assert_eq!(response.status, StatusCode::Conflict);
    assert_eq!(json_body(&response), json!({ "error": "Already exists" }));
}

#[tokio::test]
async fn test_missing_module_or_command_is_fatal() {
    let module = ScriptedModule::answering(HandlerResult::text("x"));
    let d = dispatcher(panel(one_module(&module)));

    for target in ["/ajax.php?module=widget", "/ajax.php?command=list", "/ajax.php"] {
        let response = d.handle(&get(target, JSON), &conn()).await;
        assert_eq!(response.status, StatusCode::InternalServerError);
        assert_eq!(
            json_body(&response),
            json!({ "error": "Module or Command were null. Check your code." })
        );
    }
    assert_eq!(module.calls.accept(), 0);
}

#[tokio::test]
async fn test_unknown_module_is_not_found() {
    let d = dispatcher(panel(StaticRegistry::new()));

    let response = d.handle(&get("/ajax.php?module=ghost&command=x", JSON), &conn()).await;

    assert_eq!(response.status, StatusCode::InternalServerError);
    assert_eq!(json_body(&response), json!({ "error": "Module ghost not found" }));
}

#[tokio::test]
async fn test_aliasing_panel_identity_is_refused() {
    let module = ScriptedModule::answering(HandlerResult::text("x"));
    let registry = StaticRegistry::new().register("Ajax", module.factory());
    let d = dispatcher(panel(registry));

    let response = d.handle(&get("/ajax.php?module=ajax&command=x", JSON), &conn()).await;

    assert_eq!(response.status, StatusCode::InternalServerError);
    assert_eq!(
        json_body(&response),
        json!({ "error": "The class ajax already existed. Ajax MUST load it, for security reasons" })
    );
    assert_eq!(module.calls.accept(), 0);
}

#[tokio::test]
async fn test_reserved_user_without_definition_is_invalid() {
    let d = dispatcher(panel(StaticRegistry::new()));

    let response = d.handle(&get("/ajax.php?module=User&command=login", JSON), &conn()).await;

    assert_eq!(response.status, StatusCode::InternalServerError);
    assert_eq!(json_body(&response), json!({ "error": "Module requested invalid" }));
}

#[tokio::test]
async fn test_builtin_ucp_module_reports_version() {
    let d = dispatcher(panel(StaticRegistry::new()).with_core_module("UCP", || Arc::new(UcpModule)));

    let response = d.handle(&get("/ajax.php?module=UCP&command=version", JSON), &conn()).await;

    assert_eq!(response.status, StatusCode::Ok);
    let body = json_body(&response);
    assert_eq!(body["status"], json!(true));
    assert!(body["version"].as_str().unwrap().starts_with('v'));

    let declined = d.handle(&get("/ajax.php?module=UCP&command=settings", JSON), &conn()).await;
    assert_eq!(declined.status, StatusCode::Forbidden);
}

#[tokio::test]
async fn test_xml_requested_error_envelope() {
    let module = ScriptedModule::answering(HandlerResult::text("x")).admission(false);
    let d = dispatcher(panel(one_module(&module)));

    let response = d.handle(&get("/ajax.php?module=widget&command=x", "application/xml"), &conn()).await;

    assert_eq!(response.status, StatusCode::Forbidden);
    assert_eq!(response.header("Content-Type"), Some("text/xml"));
    let body = String::from_utf8(response.body.clone()).unwrap();
    assert!(body.contains("<response>\n  <error>ajaxRequest declined</error>\n</response>"));
}

#[tokio::test]
async fn test_unrenderable_xml_falls_back_to_json_500() {
    let mut body = Map::new();
    body.insert("42".to_string(), json!("numeric key"));
    let module = ScriptedModule::answering(HandlerResult::map(body));
    let d = dispatcher(panel(one_module(&module)));

    let response = d.handle(&get("/ajax.php?module=widget&command=x", "text/xml"), &conn()).await;

    assert_eq!(response.status, StatusCode::InternalServerError);
    assert_eq!(response.header("Content-Type"), Some("text/json"));
    assert_eq!(json_body(&response), json!({ "error": "Unknown Error" }));
}

#[tokio::test]
async fn test_control_characters_in_xml_fall_back_to_json_500() {
    let module = ScriptedModule::answering(HandlerResult::text("a\u{1}b\u{0}c"));
    let d = dispatcher(panel(one_module(&module)));

    let response = d.handle(&get("/ajax.php?module=widget&command=x", "text/xml"), &conn()).await;

    assert_eq!(response.status, StatusCode::InternalServerError);
    assert_eq!(response.header("Content-Type"), Some("text/json"));
    assert_eq!(json_body(&response), json!({ "error": "Unknown Error" }));
}

#[tokio::test]
async fn test_head_keeps_length_but_sends_no_body() {
    let module = ScriptedModule::answering(HandlerResult::text("saved"));
    let d = dispatcher(panel(one_module(&module)));
    let request = RequestBuilder::new()
        .method(Method::HEAD)
        .path("/ajax.php?module=widget&command=x")
        .header("Accept", JSON)
        .build()
        .unwrap();

    let response = d.handle(&request, &conn()).await;

    let full = serde_json::to_vec(&json!({ "status": true, "message": "saved" })).unwrap();
    assert_eq!(response.status, StatusCode::Ok);
    assert!(response.body.is_empty());
    assert_eq!(response.header("Content-Length"), Some(full.len().to_string().as_str()));
    assert_eq!(response.header("Allow"), Some("HEAD"));
}

#[tokio::test]
async fn test_cors_headers_on_every_dispatched_response() {
    let module = ScriptedModule::answering(HandlerResult::text("x")).admission(false);
    let d = dispatcher(panel(one_module(&module)));

    let response = d.handle(&get("/ajax.php?module=widget&command=x", JSON), &conn()).await;

    assert_eq!(response.header("Access-Control-Allow-Origin"), Some("*"));
    assert_eq!(response.header("Access-Control-Allow-Methods"), Some("GET"));
    assert_eq!(response.header("Access-Control-Max-Age"), Some("86400"));
    assert_eq!(response.header("Allow"), Some("GET"));
}
