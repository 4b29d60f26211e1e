//! Component D: the proxy-group expander. Resolves a `ProxyGroupConfig`'s
//! raw member-selection tokens against the (already-normalized) node list
//! into a concrete, order-preserving, de-duplicated member-name list.
//!
//! Grounded on `utils::matcher`, narrowed via `utils::matcher::parse_selector`.

use crate::node::NodeDescriptor;
use crate::utils::matcher::{node_matches, parse_selector, GroupSelector};

/// Expand one group's `rules` against `nodes`. Falls back to `["DIRECT"]`
/// when nothing matches.
pub fn expand_group(rules: &[String], nodes: &[NodeDescriptor]) -> Vec<String> {
    let mut members = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for token in rules {
        match parse_selector(token) {
            GroupSelector::Literal(name) => {
                if seen.insert(name.to_string()) {
                    members.push(name.to_string());
                }
            }
            selector => {
                for node in nodes {
                    if node_matches(&selector, node) && seen.insert(node.remarks.clone()) {
                        members.push(node.remarks.clone());
                    }
                }
            }
        }
    }

    if members.is_empty() {
        members.push("DIRECT".to_string());
    }
    members
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodePayload, SsPayload, Tribool};

    fn node(group: &str, remark: &str) -> NodeDescriptor {
        NodeDescriptor {
            group: group.to_string(),
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

    #[test]
    fn empty_result_falls_back_to_direct() {
        let nodes = vec![node("g", "A")];
        let members = expand_group(&["!!GROUP=NoMatch".to_string()], &nodes);
        assert_eq!(members, vec!["DIRECT".to_string()]);
    }

    #[test]
    fn dedups_while_preserving_insertion_order() {
        let nodes = vec![node("g", "A"), node("g", "B")];
        let members = expand_group(&["A".to_string(), "!!GROUP=g".to_string()], &nodes);
        assert_eq!(members, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn literal_token_is_appended_verbatim() {
        let nodes = vec![node("g", "A")];
        let members = expand_group(&["[]DIRECT".to_string(), "A".to_string()], &nodes);
        assert_eq!(members, vec!["DIRECT".to_string(), "A".to_string()]);
    }
}
