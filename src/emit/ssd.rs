//! SSD dialect emitter: a base64-wrapped JSON airport descriptor, restricted
//! to the SS family (plain SS, plus SS-compatible SSR per spec.md §6).
//!
//! Grounded on `generator::config::formats::ssd::proxy_to_ssd`.

use serde_json::json;

use crate::error::Diagnostic;
use crate::node::{NodeDescriptor, NodePayload};
use crate::utils::base64::base64_encode;

const SS_COMPATIBLE_CIPHERS: &[&str] = &[
    "aes-128-gcm",
    "aes-192-gcm",
    "aes-256-gcm",
    "chacha20-ietf-poly1305",
    "xchacha20-ietf-poly1305",
    "aes-128-cfb",
    "aes-192-cfb",
    "aes-256-cfb",
    "chacha20",
    "chacha20-ietf",
    "rc4-md5",
];

/// An SSR node is SS-compatible when its protocol/obfs add nothing over
/// plain SS and it carries no plugin (spec.md §6).
pub(crate) fn ssr_is_ss_compatible(p: &crate::node::SsrPayload) -> bool {
    p.protocol == "origin" && p.obfs == "plain" && SS_COMPATIBLE_CIPHERS.contains(&p.method.as_str())
}

pub fn emit(nodes: &[NodeDescriptor], airport_name: &str, diagnostics: &mut Vec<Diagnostic>) -> String {
    let mut servers = Vec::new();
    for node in nodes {
        let (method, password) = match &node.payload {
            NodePayload::Ss(p) => (p.method.clone(), p.password.clone()),
            NodePayload::Ssr(p) if ssr_is_ss_compatible(p) => (p.method.clone(), p.password.clone()),
            _ => {
                diagnostics.push(Diagnostic::CapabilityMismatch {
                    remark: node.remarks.clone(),
                    target: "SSD".to_string(),
                    reason: format!("{:?} is not SS-compatible", node.node_type()),
                });
                continue;
            }
        };
        let mut server = json!({
            "server": node.server,
            "port": node.port,
            "encryption": method,
            "password": password,
            "remarks": node.remarks,
        });
        if let Some(udp) = node.udp.as_option() {
            server["udp"] = json!(udp);
        }
        servers.push(server);
    }

    let doc = json!({
        "airport": airport_name,
        "port": 443,
        "encryption": "aes-128-gcm",
        "password": "password",
        "servers": servers,
    });
    format!("ssd://{}", base64_encode(&doc.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{SsPayload, SsPlugin, Tribool};

    #[test]
    fn non_ss_nodes_are_dropped_and_reported() {
        use crate::node::UserPassPayload;
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
        let out = emit(&[node], "Air", &mut diags);
        assert_eq!(diags.len(), 1);
        assert!(out.starts_with("ssd://"));
    }

    #[test]
    fn ss_node_round_trips_into_servers_array() {
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
        let out = emit(&[node], "Air", &mut diags);
        assert!(diags.is_empty());
        let decoded = crate::utils::base64::base64_decode(out.strip_prefix("ssd://").unwrap(), false);
        assert!(decoded.contains("Home"));
    }
}
