//! Component E.1: the ruleset splicer. Turns a resolved `RulesetEntry` list
//! into the rule lines a dialect emitter appends to its base template.
//!
//! Grounded on `original_source/src/subexport.cpp`'s `rulesetToClash` /
//! `rulesetToSurge` (the teacher's own `generator::config::ruleconvert` is an
//! unimplemented stub) since this is the only place in the pack that spells
//! out the exact line-splitting and comma-reordering rules.

use regex::Regex;

use crate::node::RulesetEntry;

/// Which family of line shape to produce. Clash drops a handful of rule
/// types Surge still understands; Surge can fall back to a bare `RULE-SET`
/// reference when the ruleset body was never fetched (offline use) and the
/// target supports remote rule-sets (v3+).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpliceTarget {
    Clash,
    Surge { version: u8 },
}

const CLASH_UNSUPPORTED_PREFIXES: &[&str] = &["USER-AGENT", "URL-REGEX", "PROCESS-NAME", "AND", "OR"];

/// Splice every entry's rule body into `group,type,payload,...,rule_group`
/// lines. `overwrite_original_rules` controls whether the caller should
/// discard whatever `Rule`/`[Rule]` section the base template already had;
/// that erase happens in the emitter, not here.
pub fn splice_rules(entries: &[RulesetEntry], target: SpliceTarget) -> Vec<String> {
    let comma_reorder = Regex::new(r"^(.*?,.*?)(,.*)(,.*)$").unwrap();
    let mut lines = Vec::new();

    for entry in entries {
        let rule_group = &entry.rule_group;
        let content = entry.rule_content.get();

        if let Some(inline) = content.as_deref().and_then(|c| c.strip_prefix("[]")) {
            let mut line = inline.to_string();
            match target {
                SpliceTarget::Clash if line.starts_with("FINAL") => line.replace_range(0..5, "MATCH"),
                SpliceTarget::Surge { .. } if line == "MATCH" => line = "FINAL".to_string(),
                _ => {}
            }
            line = format!("{},{}", line, rule_group);
            if line.matches(',').count() > 2 {
                line = comma_reorder.replace(&line, "$1$3$2").to_string();
            }
            lines.push(line);
            continue;
        }

        let body = match content {
            Some(b) => b,
            None => {
                if let SpliceTarget::Surge { version } = target {
                    if version > 2 {
                        lines.push(format!("RULE-SET,{},{}", entry.rule_path, rule_group));
                    }
                }
                continue;
            }
        };

        let delimiter = if body.matches('\n').count() < 1 { '\r' } else { '\n' };
        for raw_line in body.split(delimiter) {
            let line = raw_line.trim_end_matches('\r');
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if target == SpliceTarget::Clash && CLASH_UNSUPPORTED_PREFIXES.iter().any(|p| line.starts_with(p)) {
                continue;
            }
            let mut line = format!("{},{}", line, rule_group);
            if line.matches(',').count() > 2 {
                line = comma_reorder.replace(&line, "$1$3$2").to_string();
            }
            lines.push(line);
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{LazyRuleContent, RuleType};

    fn entry(group: &str, content: &str) -> RulesetEntry {
        RulesetEntry {
            rule_group: group.to_string(),
            rule_path: "remote.list".to_string(),
            rule_type: RuleType::Surge,
            rule_content: LazyRuleContent::resolved(content.to_string()),
            update_interval: 0,
        }
    }

    #[test]
    fn inline_final_becomes_match_for_clash() {
        let entries = vec![entry("Proxy", "[]FINAL")];
        let lines = splice_rules(&entries, SpliceTarget::Clash);
        assert_eq!(lines, vec!["MATCH,Proxy".to_string()]);
    }

    #[test]
    fn inline_match_becomes_final_for_surge() {
        let entries = vec![entry("Proxy", "[]MATCH")];
        let lines = splice_rules(&entries, SpliceTarget::Surge { version: 4 });
        assert_eq!(lines, vec!["FINAL,Proxy".to_string()]);
    }

    #[test]
    fn clash_drops_unsupported_rule_types() {
        let entries = vec![entry("Proxy", "USER-AGENT,*curl*\nDOMAIN-SUFFIX,example.com")];
        let lines = splice_rules(&entries, SpliceTarget::Clash);
        assert_eq!(lines, vec!["DOMAIN-SUFFIX,example.com,Proxy".to_string()]);
    }

    #[test]
    fn four_field_lines_move_group_to_the_end() {
        let entries = vec![entry("Proxy", "IP-CIDR,1.2.3.0/24,no-resolve")];
        let lines = splice_rules(&entries, SpliceTarget::Clash);
        assert_eq!(lines, vec!["IP-CIDR,1.2.3.0/24,Proxy,no-resolve".to_string()]);
    }

    #[test]
    fn comments_and_blank_lines_are_stripped() {
        let entries = vec![entry("Proxy", "# comment\n\nDOMAIN,example.com")];
        let lines = splice_rules(&entries, SpliceTarget::Clash);
        assert_eq!(lines, vec!["DOMAIN,example.com,Proxy".to_string()]);
    }
}
