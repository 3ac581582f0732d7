//! Action Validator (C5): rejects ill-formed or dangerous actions before
//! dispatch (spec §4.4 "Validate" phase and "Security validation").

use navigant_protocol::{Action, ActionKind};

use crate::error::ActionError;

const SCRIPT_DENY_PATTERNS: &[&str] = &[
    "eval(",
    "new function",
    "settimeout(",
    "setinterval(",
    "import(",
    "require(",
    "process.",
    "global.",
    "location =",
    "location.href",
    "xmlhttprequest",
    "fetch(",
    "__proto__",
    "constructor(",
];

const SCRIPT_ADVISORY_PATTERNS: &[&str] =
    &["localstorage", "xmlhttprequest", "websocket", "window.opener"];

const CSS_DENY_PATTERNS: &[&str] = &[
    "javascript:",
    "expression(",
    "behavior:",
    "-moz-binding",
];

const MAX_SCRIPT_BYTES: usize = 50_000;
const MAX_CSS_BYTES: usize = 100_000;

pub struct ValidationOutcome {
    /// Non-fatal advisories surfaced in `ActionResult::metadata`, never
    /// blocking dispatch (spec §4.4 "warnings, not errors").
    pub advisories: Vec<String>,
}

/// Validates one action, returning advisories on success or an
/// `ActionError::Validation` (never retried) on rejection.
pub fn validate(action: &Action) -> Result<ValidationOutcome, ActionError> {
    if action.page_id.trim().is_empty() {
        return Err(ActionError::validation("pageId must not be empty"));
    }

    let mut advisories = Vec::new();

    match &action.kind {
        ActionKind::Navigate { url, .. } => {
            validate_url(url)?;
        },
        ActionKind::Click { selector, .. } | ActionKind::Type { selector, .. } => {
            validate_selector(selector)?;
        },
        ActionKind::Select { selector, values } => {
            validate_selector(selector)?;
            if values.is_empty() {
                return Err(ActionError::validation("select requires at least one value"));
            }
        },
        ActionKind::Evaluate { script } | ActionKind::InjectScript { script } => {
            validate_script(script, &mut advisories)?;
        },
        ActionKind::InjectCss { css } => {
            validate_css(css)?;
        },
        ActionKind::Upload { selector, file_paths } => {
            validate_selector(selector)?;
            if file_paths.is_empty() {
                return Err(ActionError::validation("upload requires at least one file path"));
            }
        },
        ActionKind::Wait { condition } => {
            if let navigant_protocol::WaitCondition::Selector { selector } = condition {
                validate_selector(selector)?;
            }
            if let navigant_protocol::WaitCondition::Function { function } = condition {
                validate_script(function, &mut advisories)?;
            }
        },
        _ => {},
    }

    Ok(ValidationOutcome { advisories })
}

fn validate_url(url: &str) -> Result<(), ActionError> {
    if url.trim().is_empty() {
        return Err(ActionError::validation("navigate requires a non-empty url"));
    }
    url::Url::parse(url).map_err(|e| ActionError::validation(format!("invalid url: {e}")))?;
    Ok(())
}

fn validate_selector(selector: &str) -> Result<(), ActionError> {
    if selector.trim().is_empty() {
        return Err(ActionError::validation("selector must not be empty"));
    }
    let open = selector.matches('(').count();
    let close = selector.matches(')').count();
    if open != close {
        return Err(ActionError::validation("invalid selector: unbalanced parentheses"));
    }
    Ok(())
}

fn validate_script(script: &str, advisories: &mut Vec<String>) -> Result<(), ActionError> {
    if script.len() > MAX_SCRIPT_BYTES {
        return Err(ActionError::validation(format!(
            "script exceeds {MAX_SCRIPT_BYTES} byte limit"
        )));
    }
    let open = script.matches('{').count();
    let close = script.matches('}').count();
    if open != close {
        return Err(ActionError::validation("script has mismatched braces"));
    }

    let lower = script.to_lowercase();
    for pattern in SCRIPT_DENY_PATTERNS {
        if lower.contains(pattern) {
            return Err(ActionError::security(format!(
                "script matches denied pattern: {pattern}"
            )));
        }
    }
    for pattern in SCRIPT_ADVISORY_PATTERNS {
        if lower.contains(pattern) {
            advisories.push(format!("script uses advisory pattern: {pattern}"));
        }
    }
    Ok(())
}

fn validate_css(css: &str) -> Result<(), ActionError> {
    if css.len() > MAX_CSS_BYTES {
        return Err(ActionError::validation(format!(
            "css exceeds {MAX_CSS_BYTES} byte limit"
        )));
    }
    let lower = css.to_lowercase();
    for pattern in CSS_DENY_PATTERNS {
        if lower.contains(pattern) {
            return Err(ActionError::security(format!(
                "css matches denied pattern: {pattern}"
            )));
        }
    }
    if lower.contains("@import") && lower.contains("data:") && lower.contains("script") {
        return Err(ActionError::security("css @import references an inline script payload"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use navigant_protocol::ActionKind;

    use super::*;

    fn navigate(url: &str) -> Action {
        Action {
            kind: ActionKind::Navigate { url: url.to_string() },
            page_id: "pg_1".to_string(),
            timeout_ms: None,
        }
    }

    fn evaluate(script: &str) -> Action {
        Action {
            kind: ActionKind::Evaluate { script: script.to_string() },
            page_id: "pg_1".to_string(),
            timeout_ms: None,
        }
    }

    #[test]
    fn navigate_requires_a_parseable_url() {
        assert!(validate(&navigate("https://example.com")).is_ok());
        assert!(validate(&navigate("not a url")).is_err());
    }

    #[test]
    fn eval_pattern_is_rejected_before_dispatch() {
        let err = validate(&evaluate("eval('1+1')")).unwrap_err();
        assert!(matches!(err, ActionError::Security(_)));
    }

    #[test]
    fn oversized_script_is_rejected() {
        let huge = "x".repeat(60_000);
        let err = validate(&evaluate(&huge)).unwrap_err();
        assert!(matches!(err, ActionError::Validation(_)));
    }

    #[test]
    fn localstorage_usage_is_an_advisory_not_an_error() {
        let outcome = validate(&evaluate("localStorage.getItem('x')")).unwrap();
        assert_eq!(outcome.advisories.len(), 1);
    }

    #[test]
    fn missing_page_id_is_rejected() {
        let mut action = navigate("https://example.com");
        action.page_id = String::new();
        assert!(validate(&action).is_err());
    }
}
