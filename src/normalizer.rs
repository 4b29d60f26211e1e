//! Component C: the node normalizer. Applies rename, emoji, proxy-type
//! suffix, de-dup, sort and include/exclude filtering to a node list, in the
//! exact order below — re-sequenced from the teacher's looser ordering in
//! `parser::node_manip`/`utils::node_manip` (`remove_emoji` → rename → add
//! emoji → sort, with de-dup and filtering absent) to match the seven-step
//! order.

use regex::Regex;

use crate::node::NodeDescriptor;
use crate::utils::matcher::reg_find;

/// One rename rule: `pattern` deletes matches, `pattern@replacement`
/// replaces them.
#[derive(Debug, Clone)]
pub struct RenameRule {
    pub pattern: String,
    pub replacement: String,
}

impl RenameRule {
    pub fn parse(rule: &str) -> RenameRule {
        match rule.split_once('@') {
            Some((pattern, replacement)) => {
                RenameRule { pattern: pattern.to_string(), replacement: replacement.to_string() }
            }
            None => RenameRule { pattern: rule.to_string(), replacement: String::new() },
        }
    }
}

/// `regex,emoji` — the first matching rule wins.
#[derive(Debug, Clone)]
pub struct EmojiRule {
    pub pattern: String,
    pub emoji: String,
}

fn remove_leading_emoji(remark: &str) -> String {
    // The Unicode emoji ranges used by pictographs fall in the U+1F3xx-U+1F6xx
    // block, which UTF-8-encodes with the `F0 9F` lead-byte pair; strip a
    // leading code point there plus any immediately-following space.
    let mut chars = remark.chars();
    match chars.next() {
        Some(c) if ('\u{1F300}'..='\u{1F6FF}').contains(&c) => {
            chars.as_str().trim_start().to_string()
        }
        _ => remark.to_string(),
    }
}

pub struct NormalizeOptions<'a> {
    pub rename_rules: &'a [RenameRule],
    pub remove_emoji: bool,
    pub emoji_rules: &'a [EmojiRule],
    pub add_emoji: bool,
    pub append_proxy_type: bool,
    pub sort_flag: bool,
    pub include_remarks: &'a [String],
    pub exclude_remarks: &'a [String],
}

/// Apply the seven-step pipeline in place, preserving the subset of nodes
/// that survive the final filter step.
pub fn normalize(nodes: &mut Vec<NodeDescriptor>, opts: &NormalizeOptions) {
    // 1. Rename.
    for node in nodes.iter_mut() {
        for rule in opts.rename_rules {
            if rule.pattern.is_empty() {
                continue;
            }
            if let Ok(re) = Regex::new(&rule.pattern) {
                if re.is_match(&node.remarks) {
                    node.remarks = re.replace_all(&node.remarks, rule.replacement.as_str()).to_string();
                }
            }
        }
    }

    // 2. Remove old emoji.
    if opts.remove_emoji {
        for node in nodes.iter_mut() {
            node.remarks = remove_leading_emoji(&node.remarks);
        }
    }

    // 3. Add emoji.
    if opts.add_emoji {
        for node in nodes.iter_mut() {
            for rule in opts.emoji_rules {
                if reg_find(&node.remarks, &rule.pattern) {
                    node.remarks = format!("{} {}", rule.emoji, node.remarks);
                    break;
                }
            }
        }
    }

    // 4. Append proxy type.
    if opts.append_proxy_type {
        for node in nodes.iter_mut() {
            node.remarks = format!("[{}]{}", node.node_type().as_str(), node.remarks);
        }
    }

    // 5. De-duplicate remarks.
    let mut seen = std::collections::HashSet::new();
    for node in nodes.iter_mut() {
        while seen.contains(&node.remarks) {
            node.remarks.push('$');
        }
        seen.insert(node.remarks.clone());
    }

    // 6. Sort.
    if opts.sort_flag {
        nodes.sort_by(|a, b| a.remarks.cmp(&b.remarks));
    }

    // 7. Filter by include/exclude.
    nodes.retain(|node| {
        let included = opts.include_remarks.is_empty()
            || opts.include_remarks.iter().any(|p| reg_find(&node.remarks, p));
        let excluded = opts.exclude_remarks.iter().any(|p| reg_find(&node.remarks, p));
        included && !excluded
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodePayload, SsPayload, Tribool};

    fn node(remark: &str) -> NodeDescriptor {
        NodeDescriptor {
            group: "g".to_string(),
            group_id: 0,
            remarks: remark.to_string(),
            server: "1.2.3.4".to_string(),
            port: 443,
            udp: Tribool::Unset,
            tcp_fast_open: Tribool::Unset,
            skip_cert_verify: Tribool::Unset,
            tls13: Tribool::Unset,
            payload: NodePayload::Ss(SsPayload::default()),
        }
    }

    fn no_op_opts() -> NormalizeOptions<'static> {
        NormalizeOptions {
            rename_rules: &[],
            remove_emoji: false,
            emoji_rules: &[],
            add_emoji: false,
            append_proxy_type: false,
            sort_flag: false,
            include_remarks: &[],
            exclude_remarks: &[],
        }
    }

    #[test]
    fn duplicate_remarks_get_dollar_suffix() {
        let mut nodes = vec![node("A"), node("A")];
        normalize(&mut nodes, &no_op_opts());
        assert_eq!(nodes[0].remarks, "A");
        assert_eq!(nodes[1].remarks, "A$");
    }

    #[test]
    fn empty_includes_means_everything_passes() {
        let mut nodes = vec![node("US-1"), node("HK-1")];
        let mut opts = no_op_opts();
        opts.exclude_remarks = &["HK".to_string()];
        normalize(&mut nodes, &opts);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].remarks, "US-1");
    }

    #[test]
    fn idempotent_on_an_already_normalized_list() {
        let mut nodes = vec![node("A"), node("B")];
        let opts = no_op_opts();
        normalize(&mut nodes, &opts);
        let once = nodes.clone();
        normalize(&mut nodes, &opts);
        assert_eq!(nodes, once);
    }

    #[test]
    fn append_proxy_type_prefixes_with_bracketed_variant() {
        let mut nodes = vec![node("Home")];
        let mut opts = no_op_opts();
        opts.append_proxy_type = true;
        normalize(&mut nodes, &opts);
        assert_eq!(nodes[0].remarks, "[SS]Home");
    }
}
