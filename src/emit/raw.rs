//! Single-link reconstruction and the base64-wrapped bundle emitters (raw
//! ss/ssr/vmess bundles, Quantumult's link aggregate).
//!
//! Grounded on `generator::config::formats::single::proxy_to_uri`.

use serde_json::json;

use crate::emit::ssd::ssr_is_ss_compatible;
use crate::error::Diagnostic;
use crate::node::{NodeDescriptor, NodePayload, SsrPayload, SsPlugin, Transport};
use crate::utils::base64::base64_encode;
use crate::utils::url::url_encode;

/// Reconstruct the canonical link for one node, or `None` if its variant has
/// no single-link representation in this dialect (only ss/ssr/vmess/trojan
/// round-trip through a bare link; socks5/http do not appear in any bundle
/// target per the capability matrix).
pub fn node_to_link(node: &NodeDescriptor) -> Option<String> {
    let remark = url_encode(&node.remarks);
    match &node.payload {
        NodePayload::Ss(p) => {
            let user_info = base64_encode(&format!("{}:{}", p.method, p.password));
            let mut uri = format!("ss://{}@{}:{}", user_info, node.server, node.port);
            if p.plugin != SsPlugin::None && !p.plugin_opts.is_empty() {
                let plugin_name = match p.plugin {
                    SsPlugin::ObfsLocal => "obfs-local",
                    SsPlugin::V2rayPlugin => "v2ray-plugin",
                    SsPlugin::None => unreachable!(),
                };
                uri.push_str(&format!("/?plugin={}", url_encode(&format!("{};{}", plugin_name, p.plugin_opts))));
            }
            uri.push_str(&format!("#{}", remark));
            Some(uri)
        }
        NodePayload::Ssr(p) => {
            let mut plain = format!(
                "{}:{}:{}:{}:{}:{}",
                node.server,
                node.port,
                p.protocol,
                p.method,
                p.obfs,
                base64_encode(&p.password)
            );
            let mut params = vec![format!("remarks={}", base64_encode(&node.remarks))];
            if !p.protocol_param.is_empty() {
                params.push(format!("protoparam={}", base64_encode(&p.protocol_param)));
            }
            if !p.obfs_param.is_empty() {
                params.push(format!("obfsparam={}", base64_encode(&p.obfs_param)));
            }
            plain.push_str(&format!("/?{}", params.join("&")));
            Some(format!("ssr://{}", base64_encode(&plain)))
        }
        NodePayload::Vmess(p) => {
            let body = json!({
                "v": "2",
                "ps": node.remarks,
                "add": node.server,
                "port": node.port,
                "id": p.uuid,
                "aid": p.alter_id,
                "net": match p.transfer_protocol { Transport::Ws => "ws", Transport::Kcp => "kcp", Transport::H2 => "h2", Transport::Quic => "quic", Transport::Tcp => "tcp" },
                "type": if p.fake_type.is_empty() { "none" } else { &p.fake_type },
                "host": p.host,
                "path": p.path,
                "tls": if p.tls_secure { "tls" } else { "none" },
            });
            let mut body = body;
            if !p.cipher.is_empty() {
                body["cipher"] = json!(p.cipher);
            }
            Some(format!("vmess://{}", base64_encode(&body.to_string())))
        }
        NodePayload::Trojan(p) => {
            let mut uri = format!("trojan://{}@{}:{}", p.password, node.server, node.port);
            let mut params = Vec::new();
            if !p.sni.is_empty() {
                params.push(format!("sni={}", p.sni));
            }
            if p.transfer_protocol == Transport::Ws {
                params.push("type=ws".to_string());
                if !p.host.is_empty() {
                    params.push(format!("host={}", url_encode(&p.host)));
                }
                if !p.path.is_empty() {
                    params.push(format!("path={}", url_encode(&p.path)));
                }
            }
            if !params.is_empty() {
                uri.push('?');
                uri.push_str(&params.join("&"));
            }
            uri.push_str(&format!("#{}", remark));
            Some(uri)
        }
        _ => None,
    }
}

/// Reconstruct an `ss://` link for an SSR node that is SS-compatible
/// (spec.md §6): method and password carry over, protocol/obfs/plugin do
/// not since plain SS has no such fields.
fn ss_link_from_compatible_ssr(node: &NodeDescriptor, p: &SsrPayload) -> String {
    let user_info = base64_encode(&format!("{}:{}", p.method, p.password));
    format!("ss://{}@{}:{}#{}", user_info, node.server, node.port, url_encode(&node.remarks))
}

/// Which raw link-list bundle is being produced. Each is restricted to its
/// own variant per spec.md §6's capability matrix; the `ss:// bundle` row
/// additionally admits SS-compatible SSR nodes, downgraded to `ss://` links
/// (scenario 5 in spec.md §8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleKind {
    Ss,
    Ssr,
    Vmess,
}

impl BundleKind {
    fn label(self) -> &'static str {
        match self {
            BundleKind::Ss => "ss:// bundle",
            BundleKind::Ssr => "ssr:// bundle",
            BundleKind::Vmess => "vmess:// bundle",
        }
    }
}

/// Emit a base64-wrapped newline-joined link bundle, restricted to `kind`'s
/// variant; everything else is reported as a capability mismatch and
/// skipped.
pub fn emit_bundle(nodes: &[NodeDescriptor], kind: BundleKind, diagnostics: &mut Vec<Diagnostic>) -> String {
    let mut links = Vec::new();
    for node in nodes {
        let link = match (kind, &node.payload) {
            (BundleKind::Ss, NodePayload::Ss(_)) => node_to_link(node),
            (BundleKind::Ss, NodePayload::Ssr(p)) if ssr_is_ss_compatible(p) => {
                Some(ss_link_from_compatible_ssr(node, p))
            }
            (BundleKind::Ssr, NodePayload::Ssr(_)) => node_to_link(node),
            (BundleKind::Vmess, NodePayload::Vmess(_)) => node_to_link(node),
            _ => None,
        };
        match link {
            Some(link) => links.push(link),
            None => diagnostics.push(Diagnostic::CapabilityMismatch {
                remark: node.remarks.clone(),
                target: kind.label().to_string(),
                reason: format!("{:?} not representable in this bundle", node.node_type()),
            }),
        }
    }
    base64_encode(&links.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{SsPayload, Tribool};

    fn ss_node() -> NodeDescriptor {
        NodeDescriptor {
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
        }
    }

    #[test]
    fn ss_node_round_trips_through_a_link() {
        let link = node_to_link(&ss_node()).unwrap();
        assert!(link.starts_with("ss://"));
        let decoded = crate::parser::ss::parse(&link, 0).unwrap();
        assert_eq!(decoded.server, "1.2.3.4");
        assert_eq!(decoded.remarks, "Home");
    }

    #[test]
    fn socks5_has_no_bundle_representation() {
        use crate::node::UserPassPayload;
        let mut node = ss_node();
        node.payload = NodePayload::Socks5(UserPassPayload::default());
        let mut diags = Vec::new();
        let bundle = emit_bundle(&[node], BundleKind::Ss, &mut diags);
        assert_eq!(diags.len(), 1);
        assert!(crate::utils::base64::base64_decode(&bundle, false).is_empty());
    }

    #[test]
    fn ss_compatible_ssr_downgrades_to_an_ss_link_in_the_ss_bundle() {
        use crate::node::SsrPayload;
        let mut node = ss_node();
        node.payload = NodePayload::Ssr(SsrPayload {
            method: "aes-256-cfb".to_string(),
            password: "pass".to_string(),
            protocol: "origin".to_string(),
            protocol_param: String::new(),
            obfs: "plain".to_string(),
            obfs_param: String::new(),
        });
        let mut diags = Vec::new();
        let bundle = emit_bundle(&[node], BundleKind::Ss, &mut diags);
        assert!(diags.is_empty());
        let decoded = crate::utils::base64::base64_decode(&bundle, true);
        assert!(decoded.starts_with("ss://"));
    }

    #[test]
    fn non_ss_compatible_ssr_is_rejected_by_the_ss_bundle() {
        use crate::node::SsrPayload;
        let mut node = ss_node();
        node.payload = NodePayload::Ssr(SsrPayload {
            method: "aes-256-cfb".to_string(),
            password: "pass".to_string(),
            protocol: "auth_chain_a".to_string(),
            protocol_param: String::new(),
            obfs: "plain".to_string(),
            obfs_param: String::new(),
        });
        let mut diags = Vec::new();
        let bundle = emit_bundle(&[node], BundleKind::Ss, &mut diags);
        assert_eq!(diags.len(), 1);
        assert!(crate::utils::base64::base64_decode(&bundle, false).is_empty());
    }
}
