//! Quantumult (plain, not X) dialect emitter: a base64-wrapped aggregate of
//! single links, restricted to ss/ssr/vmess per spec.md §6.
//!
//! Grounded on `emit::raw::node_to_link` — Quantumult's container is the
//! same base64 link list as the raw bundle targets, just filtered to a
//! narrower variant set.

use crate::emit::raw::node_to_link;
use crate::error::Diagnostic;
use crate::node::{NodeDescriptor, NodePayload};
use crate::utils::base64::base64_encode;

fn is_supported(node: &NodeDescriptor) -> bool {
    matches!(node.payload, NodePayload::Ss(_) | NodePayload::Ssr(_) | NodePayload::Vmess(_))
}

pub fn emit(nodes: &[NodeDescriptor], diagnostics: &mut Vec<Diagnostic>) -> String {
    let mut links = Vec::new();
    for node in nodes {
        if !is_supported(node) {
            diagnostics.push(Diagnostic::CapabilityMismatch {
                remark: node.remarks.clone(),
                target: "Quantumult".to_string(),
                reason: format!("{:?} not supported by Quantumult", node.node_type()),
            });
            continue;
        }
        if let Some(link) = node_to_link(node) {
            links.push(link);
        }
    }
    base64_encode(&links.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{SsPayload, SsPlugin, Tribool, UserPassPayload};

    #[test]
    fn http_nodes_are_not_supported_by_quantumult() {
        let node = NodeDescriptor {
            group: "g".to_string(),
            group_id: 0,
            remarks: "Http".to_string(),
            server: "1.2.3.4".to_string(),
            port: 80,
            udp: Tribool::Unset,
            tcp_fast_open: Tribool::Unset,
            skip_cert_verify: Tribool::Unset,
            tls13: Tribool::Unset,
            payload: NodePayload::Http(UserPassPayload::default()),
        };
        let mut diags = Vec::new();
        emit(&[node], &mut diags);
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn ss_node_is_wrapped_into_a_base64_aggregate() {
        let node = NodeDescriptor {
            group: "g".to_string(),
            group_id: 0,
            remarks: "Home".to_string(),
            server: "1.2.3.4".to_string(),
            port: 8388,
            udp: Tribool::Unset,
            tcp_fast_open: Tribool::Unset,
            skip_cert_verify: Tribool::Unset,
            tls13: Tribool::Unset,
            payload: NodePayload::Ss(SsPayload {
                method: "aes-256-gcm".to_string(),
                password: "pass".to_string(),
                plugin: SsPlugin::None,
                plugin_opts: String::new(),
            }),
        };
        let mut diags = Vec::new();
        let out = emit(&[node], &mut diags);
        assert!(diags.is_empty());
        let decoded = crate::utils::base64::base64_decode(&out, true);
        assert!(decoded.starts_with("ss://"));
    }
}
