use super::*;
use crate::codec::{encode, CustomMetrics};
use serde_json::json;

fn sample_report(kind: ClientKind) -> StatusReport {
    let mut custom = CustomMetrics::new();
    custom.insert("fish".to_string(), json!(12));
    custom.insert("banked".to_string(), json!({"lobster": 3, "tuna": 1}));
    StatusReport {
        token: "tok".to_string(),
        sid: 42,
        user: "alice".to_string(),
        status: "Fishing".to_string(),
        artifact: kind.artifact("Fisher"),
        client: kind.wire_tag().to_string(),
        experience: 1500,
        runtime: 60_000,
        login: String::new(),
        custom,
    }
}

fn keys(json: &str) -> Vec<String> {
    let value: serde_json::Value = serde_json::from_str(json).unwrap();
    value.as_object().unwrap().keys().cloned().collect()
}

#[test]
fn test_endpoint_url_joins_base() {
    assert_eq!(
        Endpoint::Session.url("https://occode.io/services"),
        "https://occode.io/services/session"
    );
    assert_eq!(
        Endpoint::Id.url("http://localhost:8080/"),
        "http://localhost:8080/id"
    );
}

#[test]
fn test_status_report_key_order_runemate() {
    let json = encode(&sample_report(ClientKind::RuneMate)).unwrap();
    assert_eq!(
        keys(&json),
        vec![
            "token",
            "sid",
            "user",
            "status",
            "bot",
            "client",
            "experience",
            "runtime",
            "login",
            "custom"
        ]
    );
}

#[test]
fn test_status_report_uses_script_key_for_rspeer() {
    let json = encode(&sample_report(ClientKind::RsPeer)).unwrap();
    assert_eq!(keys(&json)[4], "script");
    assert!(json.contains(r#""client":"RSPEER""#));
}

#[test]
fn test_status_report_round_trips() {
    let report = sample_report(ClientKind::RuneMate);
    let json = encode(&report).unwrap();
    let decoded: StatusReport = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, report);

    let custom_keys: Vec<&String> = decoded.custom.keys().collect();
    assert_eq!(custom_keys, vec!["fish", "banked"]);
}

#[test]
fn test_status_report_is_compact() {
    let json = encode(&sample_report(ClientKind::RuneMate)).unwrap();
    assert!(!json.contains('\n'));
    assert!(json.starts_with(r#"{"token":"tok","sid":42,"#));
    assert!(json.contains(r#""custom":{"fish":12,"banked":{"lobster":3,"tuna":1}}"#));
}

#[test]
fn test_id_request_includes_script_only_when_set() {
    let bare = IdRequest {
        token: "tok".to_string(),
        client: "RSPEER".to_string(),
        script: None,
    };
    assert_eq!(encode(&bare).unwrap(), r#"{"token":"tok","client":"RSPEER"}"#);

    let with_script = IdRequest {
        script: Some("Fisher".to_string()),
        ..bare
    };
    assert_eq!(
        encode(&with_script).unwrap(),
        r#"{"token":"tok","client":"RSPEER","script":"Fisher"}"#
    );
}

#[test]
fn test_notification_type_serializes_as_op_code() {
    let request = NotificationRequest {
        sid: -1,
        token: "tok".to_string(),
        title: "Done".to_string(),
        message: "Inventory full".to_string(),
        username: "alice".to_string(),
        artifact: ClientKind::RuneMate.artifact("Fisher"),
        client: "RUNEMATE".to_string(),
        kind: NotificationType::Warning,
    };
    assert_eq!(
        encode(&request).unwrap(),
        r#"{"sid":-1,"token":"tok","title":"Done","message":"Inventory full","username":"alice","bot":"Fisher","client":"RUNEMATE","type":2}"#
    );
}

#[test]
fn test_notification_type_op_codes() {
    let ops: Vec<u8> = [
        NotificationType::General,
        NotificationType::Error,
        NotificationType::Warning,
        NotificationType::Information,
        NotificationType::Success,
    ]
    .iter()
    .map(|t| t.op())
    .collect();
    assert_eq!(ops, vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_notification_type_from_str() {
    assert_eq!(
        "SUCCESS".parse::<NotificationType>().unwrap(),
        NotificationType::Success
    );
    assert_eq!(
        "info".parse::<NotificationType>().unwrap(),
        NotificationType::Information
    );
    assert!("loud".parse::<NotificationType>().is_err());
}

#[test]
fn test_action_request_shape() {
    let request = ActionRequest {
        token: "tok".to_string(),
        client: ClientKind::RsPeer.action_tag().to_string(),
        sid: 7,
    };
    assert_eq!(
        encode(&request).unwrap(),
        r#"{"token":"tok","client":"rspeer","sid":7}"#
    );
}

#[test]
fn test_client_kind_dialects() {
    assert_eq!(ClientKind::RuneMate.wire_tag(), "RUNEMATE");
    assert_eq!(ClientKind::RuneMate.action_tag(), "runemate");
    assert!(ClientKind::RuneMate.id_carries_artifact());
    assert!(!ClientKind::RsPeer.id_carries_artifact());
    assert_eq!(
        ClientKind::RuneMate.default_screenshot_bound(),
        Bound::new(600, 400)
    );
    assert_eq!(
        ClientKind::RsPeer.default_screenshot_bound(),
        Bound::new(800, 600)
    );
}
