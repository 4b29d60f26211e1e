//! The `fetch(url) -> text` seam spec.md §5/§13 describes: the only I/O
//! suspension point the core pipeline crosses. Subscription and ruleset
//! fetching are out of scope for the core itself (§1), but the collaborator
//! that implements the seam is a real module with a real dependency, named
//! here per SPEC_FULL.md §13.
//!
//! Grounded on the teacher's `utils::http_std::web_get_async`, collapsed to
//! a blocking call via `reqwest`'s `blocking` feature (already a teacher
//! dependency) so the core sees exactly the synchronous `fetch` contract
//! §5 requires, regardless of whether the underlying client is async.

use std::time::Duration;

use crate::error::FetchError;

const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Fetch `url` and return its body as text. The core calls this at most
/// once per unique URL per emission (enforced by `LazyRuleContent`, not by
/// this function); repeat calls here always re-fetch.
pub fn fetch(url: &str) -> Result<String, FetchError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .user_agent("subconverter-rs")
        .build()
        .map_err(|e| FetchError::Unavailable(e.to_string()))?;

    let response = client.get(url).send().map_err(|e| {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Unavailable(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(FetchError::Unavailable(format!("HTTP {}", response.status())));
    }

    response.text().map_err(|e| FetchError::Unavailable(e.to_string()))
}

/// Force every not-yet-resolved ruleset entry's lazy content via `fetch`,
/// recording a `Diagnostic` and leaving the entry unresolved (so Surge can
/// still fall back to `RULE-SET`, per §4.E.1) on failure.
pub fn resolve_rulesets(entries: &[crate::node::RulesetEntry], diagnostics: &mut Vec<crate::error::Diagnostic>) {
    for entry in entries {
        if entry.rule_content.get().is_some() || entry.rule_path.is_empty() || entry.rule_path.starts_with("[]") {
            continue;
        }
        let url = entry.rule_path.clone();
        let result = entry.rule_content.get_or_try_init(|| fetch(&url));
        if let Err(reason) = result {
            diagnostics.push(crate::error::Diagnostic::RulesetFetchFailed { url, reason });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_host_yields_fetch_error() {
        let result = fetch("http://127.0.0.1:1/unreachable-in-tests");
        assert!(result.is_err());
    }
}
