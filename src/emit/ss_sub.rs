//! SS-sub dialect emitter: a JSON array of SS server objects, restricted to
//! the SS family (plain SS, plus SS-compatible SSR per spec.md §6).
//!
//! The teacher's own `ss_sub.rs` actually emits a base64 link list identical
//! to its `ss://` bundle emitter, which does not match spec.md §6's stated
//! "JSON" container for this target; this emitter follows the documented
//! container shape instead, reusing `emit::ssd`'s SS-compatible-SSR test and
//! per-server field shape (kept inline here rather than factored out, since
//! SSD nests the airport wrapper and SS-sub does not).

use serde_json::json;

use crate::error::Diagnostic;
use crate::emit::ssd::ssr_is_ss_compatible;
use crate::node::{NodeDescriptor, NodePayload};

pub fn emit(nodes: &[NodeDescriptor], diagnostics: &mut Vec<Diagnostic>) -> String {
    let mut servers = Vec::new();
    for node in nodes {
        let (method, password) = match &node.payload {
            NodePayload::Ss(p) => (p.method.clone(), p.password.clone()),
            NodePayload::Ssr(p) if ssr_is_ss_compatible(p) => (p.method.clone(), p.password.clone()),
            _ => {
                diagnostics.push(Diagnostic::CapabilityMismatch {
                    remark: node.remarks.clone(),
                    target: "SS-sub".to_string(),
                    reason: format!("{:?} is not SS-compatible", node.node_type()),
                });
                continue;
            }
        };
        servers.push(json!({
            "remarks": node.remarks,
            "server": node.server,
            "server_port": node.port,
            "method": method,
            "password": password,
        }));
    }
    serde_json::to_string(&servers).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{SsPayload, SsPlugin, Tribool};

    #[test]
    fn emits_a_json_array_of_ss_servers() {
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
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[0]["server_port"], 8388);
    }
}
