//! Quantumult X dialect emitter: plain-text `key=value, ...` proxy lines.
//!
//! Grounded on `generator::config::formats::quanx`.

use crate::error::Diagnostic;
use crate::node::{NodeDescriptor, NodePayload, SsPlugin, Transport};

fn node_to_line(node: &NodeDescriptor) -> Option<String> {
    let mut l = match &node.payload {
        NodePayload::Ss(p) => {
            let mut l = format!("shadowsocks={}, {}, {}, {}, ", node.server, node.port, p.method, p.password);
            l.push_str(&format!("tag={}", node.remarks));
            if p.plugin == SsPlugin::ObfsLocal {
                for kv in p.plugin_opts.split(';') {
                    if let Some((k, v)) = kv.split_once('=') {
                        match k {
                            "obfs" => l.push_str(&format!(", obfs={}", v)),
                            "obfs-host" => l.push_str(&format!(", obfs-host={}", v)),
                            _ => {}
                        }
                    }
                }
            }
            l
        }
        NodePayload::Ssr(p) => {
            let mut l = format!(
                "shadowsocksr={}, {}, {}, {}, ",
                node.server, node.port, p.method, p.password
            );
            l.push_str(&format!("tag={}", node.remarks));
            l.push_str(&format!(", ssr-protocol={}", p.protocol));
            if !p.protocol_param.is_empty() {
                l.push_str(&format!(", ssr-protocol-param={}", p.protocol_param));
            }
            l.push_str(&format!(", obfs={}", p.obfs));
            if !p.obfs_param.is_empty() {
                l.push_str(&format!(", obfs-host={}", p.obfs_param));
            }
            l
        }
        NodePayload::Vmess(p) => {
            let mut l = format!("vmess={}, {}, ", node.server, node.port);
            if !p.cipher.is_empty() {
                l.push_str(&format!("method={}, ", p.cipher));
            }
            l.push_str(&format!("password={}, ", p.uuid));
            l.push_str(&format!("tag={}", node.remarks));
            if p.alter_id > 0 {
                l.push_str(&format!(", alterId={}", p.alter_id));
            }
            match p.transfer_protocol {
                Transport::Ws => {
                    l.push_str(", obfs=ws");
                    if !p.path.is_empty() {
                        l.push_str(&format!(", obfs-uri={}", p.path));
                    }
                    if !p.host.is_empty() {
                        l.push_str(&format!(", obfs-host={}", p.host));
                    }
                }
                Transport::Tcp => {}
                _ => return None,
            }
            if p.tls_secure {
                l.push_str(", tls-host=1");
            } else {
                l.push_str(", tls=0");
            }
            l
        }
        NodePayload::Trojan(p) => {
            let mut l = format!("trojan={}, {}, {}, ", node.server, node.port, p.password);
            l.push_str(&format!("tag={}", node.remarks));
            if !p.sni.is_empty() {
                l.push_str(&format!(", tls-host={}", p.sni));
            }
            if p.transfer_protocol == Transport::Ws {
                l.push_str(", obfs=ws");
                if !p.path.is_empty() {
                    l.push_str(&format!(", obfs-uri={}", p.path));
                }
                if !p.host.is_empty() {
                    l.push_str(&format!(", obfs-host={}", p.host));
                }
            }
            l
        }
        NodePayload::Https(p) => {
            let mut l = format!("https={}, {}, ", node.server, node.port);
            if !p.username.is_empty() {
                l.push_str(&format!("username={}, ", p.username));
            }
            if !p.password.is_empty() {
                l.push_str(&format!("password={}, ", p.password));
            }
            l.push_str(&format!("tag={}", node.remarks));
            l
        }
        NodePayload::Http(_) | NodePayload::Socks5(_) | NodePayload::Snell(_) => return None,
    };

    if node.udp.is_true() {
        l.push_str(", fast-open=true");
    }
    Some(l)
}

pub fn emit(nodes: &[NodeDescriptor], diagnostics: &mut Vec<Diagnostic>) -> String {
    let mut out = String::new();
    for node in nodes {
        match node_to_line(node) {
            Some(line) => {
                out.push_str(&line);
                out.push('\n');
            }
            None => diagnostics.push(Diagnostic::CapabilityMismatch {
                remark: node.remarks.clone(),
                target: "Quantumult X".to_string(),
                reason: format!("{:?} not supported by Quantumult X", node.node_type()),
            }),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{SsPayload, SsPlugin, Tribool};

    #[test]
    fn plain_socks5_is_unsupported() {
        use crate::node::UserPassPayload;
        let node = NodeDescriptor {
            group: "g".to_string(),
            group_id: 0,
            remarks: "S5".to_string(),
            server: "1.2.3.4".to_string(),
            port: 1080,
            udp: Tribool::Unset,
            tcp_fast_open: Tribool::Unset,
            skip_cert_verify: Tribool::Unset,
            tls13: Tribool::Unset,
            payload: NodePayload::Socks5(UserPassPayload::default()),
        };
        let mut diags = Vec::new();
        emit(&[node], &mut diags);
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn ss_node_line_includes_tag() {
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
        assert!(out.contains("tag=Home"));
    }
}
