//! Surge v2/v3/v4 dialect emitter (INI-ish `[Proxy]` lines).
//!
//! Per-type line shapes grounded on `generator::config::formats::surge`; the
//! SSR `external` line and its monotonic `local_port` allocation (starting
//! at 1080, incrementing once per SSR node within one emission) are grounded
//! on `original_source/src/subexport.cpp` since the teacher's own emitter
//! has no SSR branch at all.

use configparser::ini::Ini;

use crate::error::Diagnostic;
use crate::group::expand_group;
use crate::node::{NodeDescriptor, NodePayload, ProxyGroupConfig, RulesetEntry, SsPlugin, Transport};
use crate::ruleset::{splice_rules, SpliceTarget};

pub struct SurgeOptions<'a> {
    pub version: u8,
    pub surge_ssr_path: Option<&'a str>,
    pub enable_rule_generator: bool,
    pub overwrite_original_rules: bool,
}

/// One node's `[Proxy]` line, or `None` if unsupported at this version
/// (capability-matrix silent skip).
fn node_to_line(node: &NodeDescriptor, opts: &SurgeOptions, next_local_port: &mut u16) -> Option<String> {
    let mut line = match &node.payload {
        NodePayload::Ss(p) => {
            let mut l = if opts.version >= 3 {
                format!("{} = ss, {}, {}, encrypt-method={}, password={}", node.remarks, node.server, node.port, p.method, p.password)
            } else {
                format!("{} = custom, {}, {}, {}, {}, http://", node.remarks, node.server, node.port, p.method, p.password)
            };
            match p.plugin {
                SsPlugin::ObfsLocal => {
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
                SsPlugin::V2rayPlugin => {
                    let opts_map: std::collections::HashMap<&str, &str> =
                        p.plugin_opts.split(';').filter_map(|kv| kv.split_once('=')).collect();
                    if opts_map.get("mode").copied() == Some("websocket") {
                        l.push_str(", obfs=ws");
                        if let Some(host) = opts_map.get("host") {
                            l.push_str(&format!(", obfs-host={}", host));
                        }
                        if let Some(path) = opts_map.get("path") {
                            l.push_str(&format!(", obfs-uri={}", path));
                        }
                        if opts_map.contains_key("tls") {
                            l.push_str(", tls=true");
                        }
                    }
                }
                SsPlugin::None => {}
            }
            l
        }
        NodePayload::Ssr(p) => {
            let path = opts.surge_ssr_path?;
            if opts.version < 2 {
                return None;
            }
            let local_port = *next_local_port;
            *next_local_port += 1;
            let mut args = vec![
                "-l".to_string(),
                local_port.to_string(),
                "-s".to_string(),
                node.server.clone(),
                "-p".to_string(),
                node.port.to_string(),
                "-m".to_string(),
                p.method.clone(),
                "-k".to_string(),
                p.password.clone(),
                "-o".to_string(),
                p.obfs.clone(),
                "-O".to_string(),
                p.protocol.clone(),
            ];
            if !p.obfs_param.is_empty() {
                args.push("-g".to_string());
                args.push(p.obfs_param.clone());
            }
            if !p.protocol_param.is_empty() {
                args.push("-G".to_string());
                args.push(p.protocol_param.clone());
            }
            format!(
                "{} = external, exec=\"{}\", args=\"{}\", local-port={}",
                node.remarks,
                path,
                args.join("\", args=\""),
                local_port
            )
        }
        NodePayload::Vmess(p) => {
            if opts.version < 4 {
                return None;
            }
            if matches!(p.transfer_protocol, Transport::Kcp | Transport::H2 | Transport::Quic) {
                return None;
            }
            let mut l = format!("{} = vmess, {}, {}, username={}", node.remarks, node.server, node.port, p.uuid);
            if p.alter_id > 0 {
                l.push_str(&format!(", alterId={}", p.alter_id));
            }
            if !p.cipher.is_empty() {
                l.push_str(&format!(", encrypt-method={}", p.cipher));
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
            if p.tls_secure {
                l.push_str(", tls=true");
            }
            l
        }
        NodePayload::Trojan(p) => {
            let mut l = format!("{} = trojan, {}, {}, password={}", node.remarks, node.server, node.port, p.password);
            if !p.sni.is_empty() {
                l.push_str(&format!(", sni={}", p.sni));
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
        NodePayload::Http(p) | NodePayload::Https(p) => {
            let kind = if node.node_type() == crate::node::NodeType::Https { "https" } else { "http" };
            let mut l = format!("{} = {}, {}, {}", node.remarks, kind, node.server, node.port);
            if !p.username.is_empty() {
                l.push_str(&format!(", username={}", p.username));
            }
            if !p.password.is_empty() {
                l.push_str(&format!(", password={}", p.password));
            }
            l
        }
        NodePayload::Socks5(p) => {
            let mut l = format!("{} = socks5, {}, {}", node.remarks, node.server, node.port);
            if !p.username.is_empty() {
                l.push_str(&format!(", username={}", p.username));
            }
            if !p.password.is_empty() {
                l.push_str(&format!(", password={}", p.password));
            }
            l
        }
        NodePayload::Snell(p) => {
            if opts.version < 3 {
                return None;
            }
            let mut l = format!("{} = snell, {}, {}, psk={}", node.remarks, node.server, node.port, p.password);
            if p.version > 0 {
                l.push_str(&format!(", version={}", p.version));
            }
            if !p.obfs.is_empty() {
                l.push_str(&format!(", obfs={}", p.obfs));
                if !p.host.is_empty() {
                    l.push_str(&format!(", obfs-host={}", p.host));
                }
            }
            l
        }
    };

    if node.udp.is_true() {
        line.push_str(", udp-relay=true");
    }
    if node.tcp_fast_open.is_true() {
        line.push_str(", tfo=true");
    }
    if node.skip_cert_verify.is_true() {
        line.push_str(", skip-cert-verify=1");
    }
    Some(line)
}

/// Remove a `[Section]` and everything up to (not including) the next
/// `[Section]` header, or end of string if there is none. Grounded on
/// `generator::config::formats::surge::proxy_to_surge`'s own
/// `overwrite_original_rules` handling, which this mirrors line for line.
fn strip_section(base: &mut String, section: &str) {
    if let Some(start) = base.find(section) {
        if let Some(next) = base[start + section.len()..].find('[') {
            let end = start + section.len() + next;
            base.replace_range(start..end, "");
        } else {
            base.truncate(start);
        }
    }
}

/// Merge freshly-built `[Proxy]`/`[Proxy Group]`/`[Rule]` text into a base
/// Surge `.conf` template. `base_template` is validated as INI before
/// splicing (an empty template is valid and simply means "no document to
/// merge into"); malformed input is the emitter's one fatal case.
pub fn emit(
    base_template: &str,
    nodes: &[NodeDescriptor],
    groups: &[ProxyGroupConfig],
    rulesets: &[RulesetEntry],
    opts: &SurgeOptions,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<String, crate::error::TemplateError> {
    let mut base = base_template.to_string();
    if !base.trim().is_empty() {
        Ini::new().read(base.clone()).map_err(crate::error::TemplateError::InvalidIni)?;
    }

    let mut out = String::new();
    out.push_str("[Proxy]\n");
    let mut next_local_port: u16 = 1080;
    for node in nodes {
        match node_to_line(node, opts, &mut next_local_port) {
            Some(line) => {
                out.push_str(&line);
                out.push('\n');
            }
            None => diagnostics.push(Diagnostic::CapabilityMismatch {
                remark: node.remarks.clone(),
                target: format!("Surge v{}", opts.version),
                reason: format!("{:?} not representable at this version", node.node_type()),
            }),
        }
    }

    if !groups.is_empty() {
        out.push_str("\n[Proxy Group]\n");
        for group in groups {
            let members = expand_group(&group.rules, nodes);
            let mut line = format!("{} = {}, {}", group.name, group.group_type.as_str(), members.join(", "));
            if let Some(url) = &group.url {
                line.push_str(&format!(", url={}", url));
            }
            if let Some(interval) = group.interval {
                line.push_str(&format!(", interval={}", interval));
            }
            out.push_str(&line);
            out.push('\n');
        }
    }

    let mut rule_config = String::new();
    if opts.enable_rule_generator {
        rule_config.push_str("\n[Rule]\n");
        let target = SpliceTarget::Surge { version: opts.version };
        for line in splice_rules(rulesets, target) {
            rule_config.push_str(&line);
            rule_config.push('\n');
        }
    }

    if opts.overwrite_original_rules {
        for section in ["[Proxy]", "[Proxy Group]", "[Rule]"] {
            strip_section(&mut base, section);
        }
    }

    let mut result = String::new();
    if !base.is_empty() {
        result.push_str(&base);
        if !base.ends_with('\n') {
            result.push('\n');
        }
    }
    result.push_str(&out);
    result.push_str(&rule_config);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{SsPayload, SsPlugin, Tribool};

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

    fn opts(version: u8) -> SurgeOptions<'static> {
        SurgeOptions { version, surge_ssr_path: None, enable_rule_generator: false, overwrite_original_rules: false }
    }

    #[test]
    fn ss_native_line_on_v3_plus() {
        let mut diags = Vec::new();
        let out = emit("", &[ss_node()], &[], &[], &opts(3), &mut diags).unwrap();
        assert!(out.contains("Home = ss, 1.2.3.4, 8388, encrypt-method=aes-256-gcm, password=pass"));
    }

    #[test]
    fn ssr_is_skipped_without_a_configured_external_binary() {
        use crate::node::SsrPayload;
        let mut node = ss_node();
        node.payload = NodePayload::Ssr(SsrPayload {
            method: "aes-128-cfb".to_string(),
            password: "p".to_string(),
            protocol: "origin".to_string(),
            protocol_param: String::new(),
            obfs: "plain".to_string(),
            obfs_param: String::new(),
        });
        let mut diags = Vec::new();
        let out = emit("", &[node], &[], &[], &opts(4), &mut diags).unwrap();
        assert_eq!(diags.len(), 1);
        assert!(!out.contains("external"));
    }

    #[test]
    fn malformed_ini_template_is_fatal() {
        let mut diags = Vec::new();
        let err = emit("this line is neither a section nor a key=value pair", &[ss_node()], &[], &[], &opts(3), &mut diags);
        assert!(err.is_err());
    }

    #[test]
    fn overwrite_original_rules_drops_existing_proxy_section() {
        let base = "[General]\nloglevel = notify\n\n[Proxy]\nOld = ss, 9.9.9.9, 1, encrypt-method=rc4, password=x\n\n[Rule]\nFINAL,DIRECT\n";
        let mut opts = opts(3);
        opts.overwrite_original_rules = true;
        let mut diags = Vec::new();
        let out = emit(base, &[ss_node()], &[], &[], &opts, &mut diags).unwrap();
        assert!(!out.contains("Old = ss"));
        assert!(out.contains("Home = ss"));
        assert!(out.contains("[General]"));
    }

    #[test]
    fn base_template_is_preserved_when_not_overwriting() {
        let base = "[General]\nloglevel = notify\n";
        let mut diags = Vec::new();
        let out = emit(base, &[ss_node()], &[], &[], &opts(3), &mut diags).unwrap();
        assert!(out.contains("[General]"));
        assert!(out.contains("Home = ss"));
    }

    #[test]
    fn ssr_allocates_monotonic_local_ports() {
        use crate::node::SsrPayload;
        let make = |name: &str| {
            let mut n = ss_node();
            n.remarks = name.to_string();
            n.payload = NodePayload::Ssr(SsrPayload {
                method: "aes-128-cfb".to_string(),
                password: "p".to_string(),
                protocol: "origin".to_string(),
                protocol_param: String::new(),
                obfs: "plain".to_string(),
                obfs_param: String::new(),
            });
            n
        };
        let nodes = vec![make("A"), make("B")];
        let mut opts = opts(4);
        opts.surge_ssr_path = Some("/usr/bin/ssr-local");
        let mut diags = Vec::new();
        let out = emit("", &nodes, &[], &[], &opts, &mut diags).unwrap();
        assert!(out.contains("local-port=1080"));
        assert!(out.contains("local-port=1081"));
    }
}
