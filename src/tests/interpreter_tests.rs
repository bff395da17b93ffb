use super::*;

fn substring() -> ResponseInterpreter {
    ResponseInterpreter::new(ScreenshotFlagPolicy::Substring)
}

fn strict() -> ResponseInterpreter {
    ResponseInterpreter::new(ScreenshotFlagPolicy::Strict)
}

#[test]
fn test_command_vocabulary() {
    assert_eq!(Command::parse("run"), Some(Command::Run));
    assert_eq!(Command::parse("pause"), Some(Command::Pause));
    assert_eq!(Command::parse("stop"), Some(Command::Stop));
    assert_eq!(Command::parse("Run"), None);
    assert_eq!(Command::parse("STOP"), None);
    assert_eq!(Command::parse(""), None);
}

#[test]
fn test_absent_response_is_inert() {
    assert_eq!(substring().interpret(None), Interpretation::none());
}

#[test]
fn test_plain_pause() {
    let result = substring().interpret(Some("pause"));
    assert_eq!(result.command, Some(Command::Pause));
    assert!(!result.screenshot_requested);
    assert_eq!(result.status_code, None);
}

#[test]
fn test_command_with_flag_segment() {
    let result = substring().interpret(Some("run:ok"));
    assert_eq!(result.command, Some(Command::Run));
    assert!(!result.screenshot_requested);
}

#[test]
fn test_lone_one_requests_screenshot_without_command() {
    let result = substring().interpret(Some("1"));
    assert!(result.screenshot_requested);
    assert_eq!(result.command, None);
    assert_eq!(result.status_code, Some(1));
}

#[test]
fn test_command_and_screenshot_together() {
    let result = substring().interpret(Some("stop:1"));
    assert_eq!(result.command, Some(Command::Stop));
    assert!(result.screenshot_requested);
}

#[test]
fn test_status_code_yields_no_command() {
    let result = substring().interpret(Some("200"));
    assert_eq!(result.status_code, Some(200));
    assert_eq!(result.command, None);
    assert!(!result.screenshot_requested);
}

#[test]
fn test_substring_policy_fires_on_status_codes_containing_one() {
    // Existing servers rely on this; 401 and 418 both look like screenshot requests.
    assert!(substring().interpret(Some("401")).screenshot_requested);
    assert!(substring().interpret(Some("paused since 10:00")).screenshot_requested);
}

#[test]
fn test_strict_policy_only_accepts_explicit_flag() {
    assert!(strict().interpret(Some("1")).screenshot_requested);
    assert!(strict().interpret(Some("run:1")).screenshot_requested);
    assert!(!strict().interpret(Some("401")).screenshot_requested);
    assert!(!strict().interpret(Some("run:10")).screenshot_requested);
    assert!(!strict().interpret(Some("pause")).screenshot_requested);
}

#[test]
fn test_unknown_tokens_are_ignored() {
    for line in ["", "hello", "Run", "resume", ":run", "running"] {
        let result = strict().interpret(Some(line));
        assert_eq!(result.command, None, "line {:?}", line);
    }
}

#[test]
fn test_only_first_segment_is_the_command() {
    assert_eq!(
        substring().interpret(Some("pause:stop")).command,
        Some(Command::Pause)
    );
    assert_eq!(substring().interpret(Some("ok:stop")).command, None);
}

#[test]
fn test_status_messages() {
    assert_eq!(
        status_message(200),
        Some("[OK] Everything works as expected.")
    );
    assert!(status_message(401).unwrap().contains("Unauthorized"));
    assert!(status_message(429).unwrap().contains("Too Many Requests"));
    assert!(status_message(503).unwrap().contains("Service Unavailable"));
    assert_eq!(status_message(418), None);
}

#[test]
fn test_default_policy_is_substring() {
    assert_eq!(
        ResponseInterpreter::default().policy(),
        ScreenshotFlagPolicy::Substring
    );
}
