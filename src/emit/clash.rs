//! Clash / ClashR dialect emitter (YAML).
//!
//! Grounded on `generator::config::formats::clash::proxy_to_clash_yaml`'s
//! per-type `handle_*` helpers, adapted from the teacher's flat `Proxy` onto
//! `NodeDescriptor` and narrowed to spec.md §6's exact ClashR allow-lists
//! (the teacher's own allow-lists are wider and are not followed here).

use std::collections::HashSet;

use lazy_static::lazy_static;
use serde_yaml::{Mapping, Value as YamlValue};

use crate::error::Diagnostic;
use crate::group::expand_group;
use crate::node::{GroupType, NodeDescriptor, NodePayload, NodeType, ProxyGroupConfig, RulesetEntry, Transport};
use crate::ruleset::{splice_rules, SpliceTarget};

lazy_static! {
    static ref CLASHR_PROTOCOLS: HashSet<&'static str> = ["auth_aes128_md5", "auth_aes128_sha1"].into_iter().collect();
    static ref CLASHR_OBFS: HashSet<&'static str> =
        ["plain", "http_simple", "http_post", "tls1.2_ticket_auth"].into_iter().collect();
}

pub struct ClashOptions {
    pub clash_r: bool,
    pub new_field_name: bool,
    pub filter_deprecated: bool,
    pub enable_rule_generator: bool,
    pub overwrite_original_rules: bool,
}

fn sv(s: &str) -> YamlValue {
    YamlValue::String(s.to_string())
}

fn set(map: &mut Mapping, key: &str, value: YamlValue) {
    map.insert(sv(key), value);
}

/// Build one `proxies[]` entry, or `None` if the node's variant/transport is
/// not representable in this target (capability-matrix silent skip).
fn node_to_yaml(node: &NodeDescriptor, opts: &ClashOptions) -> Option<YamlValue> {
    let mut m = Mapping::new();
    set(&mut m, "name", sv(&node.remarks));
    set(&mut m, "server", sv(&node.server));
    set(&mut m, "port", YamlValue::Number(node.port.into()));

    if let Some(udp) = node.udp.as_option() {
        set(&mut m, "udp", YamlValue::Bool(udp));
    }
    if let Some(scv) = node.skip_cert_verify.as_option() {
        set(&mut m, "skip-cert-verify", YamlValue::Bool(scv));
    }

    match &node.payload {
        NodePayload::Ss(p) => {
            if opts.filter_deprecated && p.method == "chacha20" {
                return None;
            }
            set(&mut m, "type", sv("ss"));
            set(&mut m, "cipher", sv(&p.method));
            set(&mut m, "password", sv(&p.password));
            use crate::node::SsPlugin;
            match p.plugin {
                SsPlugin::ObfsLocal => {
                    let mut popts = Mapping::new();
                    for kv in p.plugin_opts.split(';') {
                        if let Some((k, v)) = kv.split_once('=') {
                            match k {
                                "obfs" => set(&mut popts, "mode", sv(v)),
                                "obfs-host" => set(&mut popts, "host", sv(v)),
                                _ => {}
                            }
                        }
                    }
                    set(&mut m, "plugin", sv("obfs"));
                    if !popts.is_empty() {
                        set(&mut m, "plugin-opts", YamlValue::Mapping(popts));
                    }
                }
                SsPlugin::V2rayPlugin => {
                    let mut popts = Mapping::new();
                    for kv in p.plugin_opts.split(';') {
                        if let Some((k, v)) = kv.split_once('=') {
                            match k {
                                "mode" => set(&mut popts, "mode", sv(v)),
                                "host" => set(&mut popts, "host", sv(v)),
                                "path" => set(&mut popts, "path", sv(v)),
                                "tls" => set(&mut popts, "tls", YamlValue::Bool(true)),
                                "mux" => set(&mut popts, "mux", YamlValue::Bool(true)),
                                _ => {}
                            }
                        }
                    }
                    set(&mut m, "plugin", sv("v2ray-plugin"));
                    if !popts.is_empty() {
                        set(&mut m, "plugin-opts", YamlValue::Mapping(popts));
                    }
                }
                SsPlugin::None => {}
            }
        }
        NodePayload::Ssr(p) => {
            if !opts.clash_r {
                return None;
            }
            if !CLASHR_PROTOCOLS.contains(p.protocol.as_str()) || !CLASHR_OBFS.contains(p.obfs.as_str()) {
                return None;
            }
            set(&mut m, "type", sv("ssr"));
            set(&mut m, "cipher", sv(&p.method));
            set(&mut m, "password", sv(&p.password));
            set(&mut m, "protocol", sv(&p.protocol));
            set(&mut m, "obfs", sv(&p.obfs));
            if !p.protocol_param.is_empty() {
                set(&mut m, "protocol-param", sv(&p.protocol_param));
            }
            if !p.obfs_param.is_empty() {
                set(&mut m, "obfs-param", sv(&p.obfs_param));
            }
        }
        NodePayload::Vmess(p) => {
            if !matches!(p.transfer_protocol, Transport::Tcp | Transport::Ws) {
                return None;
            }
            set(&mut m, "type", sv("vmess"));
            set(&mut m, "uuid", sv(&p.uuid));
            set(&mut m, "alterId", YamlValue::Number(p.alter_id.into()));
            set(&mut m, "cipher", sv(if p.cipher.is_empty() { "auto" } else { &p.cipher }));
            if p.tls_secure {
                set(&mut m, "tls", YamlValue::Bool(true));
            }
            if p.transfer_protocol == Transport::Ws {
                set(&mut m, "network", sv("ws"));
                let path_key = if opts.new_field_name { "ws-opts" } else { "ws-path" };
                if opts.new_field_name {
                    let mut ws_opts = Mapping::new();
                    if !p.path.is_empty() {
                        set(&mut ws_opts, "path", sv(&p.path));
                    }
                    if !p.host.is_empty() {
                        let mut headers = Mapping::new();
                        set(&mut headers, "Host", sv(&p.host));
                        set(&mut ws_opts, "headers", YamlValue::Mapping(headers));
                    }
                    if !ws_opts.is_empty() {
                        set(&mut m, path_key, YamlValue::Mapping(ws_opts));
                    }
                } else {
                    if !p.path.is_empty() {
                        set(&mut m, "ws-path", sv(&p.path));
                    }
                    if !p.host.is_empty() {
                        let mut headers = Mapping::new();
                        set(&mut headers, "Host", sv(&p.host));
                        set(&mut m, "ws-headers", YamlValue::Mapping(headers));
                    }
                }
            }
        }
        NodePayload::Trojan(p) => {
            set(&mut m, "type", sv("trojan"));
            set(&mut m, "password", sv(&p.password));
            if !p.sni.is_empty() {
                set(&mut m, "sni", sv(&p.sni));
            }
            if p.transfer_protocol == Transport::Ws {
                set(&mut m, "network", sv("ws"));
            }
        }
        NodePayload::Snell(p) => {
            set(&mut m, "type", sv("snell"));
            set(&mut m, "psk", sv(&p.password));
            if !p.obfs.is_empty() {
                let mut obfs_opts = Mapping::new();
                set(&mut obfs_opts, "mode", sv(&p.obfs));
                if !p.host.is_empty() {
                    set(&mut obfs_opts, "host", sv(&p.host));
                }
                set(&mut m, "obfs-opts", YamlValue::Mapping(obfs_opts));
            }
        }
        NodePayload::Socks5(p) => {
            set(&mut m, "type", sv("socks5"));
            if !p.username.is_empty() {
                set(&mut m, "username", sv(&p.username));
            }
            if !p.password.is_empty() {
                set(&mut m, "password", sv(&p.password));
            }
        }
        NodePayload::Http(p) | NodePayload::Https(p) => {
            set(&mut m, "type", sv("http"));
            if !p.username.is_empty() {
                set(&mut m, "username", sv(&p.username));
            }
            if !p.password.is_empty() {
                set(&mut m, "password", sv(&p.password));
            }
            if node.node_type() == NodeType::Https {
                set(&mut m, "tls", YamlValue::Bool(true));
            }
        }
    }

    Some(YamlValue::Mapping(m))
}

fn group_to_yaml(group: &ProxyGroupConfig, nodes: &[NodeDescriptor]) -> YamlValue {
    let mut m = Mapping::new();
    set(&mut m, "name", sv(&group.name));
    set(&mut m, "type", sv(group.group_type.as_str()));
    let members = expand_group(&group.rules, nodes);
    set(
        &mut m,
        "proxies",
        YamlValue::Sequence(members.into_iter().map(|n| sv(&n)).collect()),
    );
    if group.group_type == GroupType::UrlTest || group.group_type == GroupType::Fallback {
        if let Some(url) = &group.url {
            set(&mut m, "url", sv(url));
        }
        if let Some(interval) = group.interval {
            set(&mut m, "interval", YamlValue::Number(interval.into()));
        }
    }
    YamlValue::Mapping(m)
}

/// Emit a full Clash/ClashR YAML document from a base template string.
pub fn emit(
    base_template: &str,
    nodes: &[NodeDescriptor],
    groups: &[ProxyGroupConfig],
    rulesets: &[RulesetEntry],
    opts: &ClashOptions,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<String, crate::error::TemplateError> {
    let mut doc: YamlValue =
        serde_yaml::from_str(base_template).map_err(|e| crate::error::TemplateError::InvalidYaml(e.to_string()))?;
    let map = doc.as_mapping_mut().get_or_insert_with(Mapping::new);

    let proxies_key = if opts.new_field_name { "proxies" } else { "Proxy" };
    let mut proxy_entries = Vec::new();
    for node in nodes {
        match node_to_yaml(node, opts) {
            Some(entry) => proxy_entries.push(entry),
            None => diagnostics.push(Diagnostic::CapabilityMismatch {
                remark: node.remarks.clone(),
                target: if opts.clash_r { "ClashR".to_string() } else { "Clash".to_string() },
                reason: format!("{:?} not representable in this target", node.node_type()),
            }),
        }
    }
    set(map, proxies_key, YamlValue::Sequence(proxy_entries));

    if !groups.is_empty() {
        let groups_key = if opts.new_field_name { "proxy-groups" } else { "Proxy Group" };
        let group_entries: Vec<YamlValue> = groups.iter().map(|g| group_to_yaml(g, nodes)).collect();
        set(map, groups_key, YamlValue::Sequence(group_entries));
    }

    if opts.enable_rule_generator {
        let lines = splice_rules(rulesets, SpliceTarget::Clash);
        if opts.overwrite_original_rules || !map.contains_key(&sv("Rule")) {
            set(map, "Rule", YamlValue::Sequence(lines.into_iter().map(|l| sv(&l)).collect()));
        } else if let Some(YamlValue::Sequence(existing)) = map.get_mut(&sv("Rule")) {
            existing.extend(lines.into_iter().map(|l| sv(&l)));
        }
    }

    serde_yaml::to_string(&doc).map_err(|e| crate::error::TemplateError::InvalidYaml(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{SsPayload, SsPlugin, Tribool};

    fn ss_node(remark: &str) -> NodeDescriptor {
        NodeDescriptor {
            group: "g".to_string(),
            group_id: 0,
            remarks: remark.to_string(),
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

    fn opts() -> ClashOptions {
        ClashOptions {
            clash_r: false,
            new_field_name: true,
            filter_deprecated: false,
            enable_rule_generator: true,
            overwrite_original_rules: false,
        }
    }

    #[test]
    fn emits_proxies_sequence_with_ss_node() {
        let mut diags = Vec::new();
        let out = emit("{}", &[ss_node("Home")], &[], &[], &opts(), &mut diags).unwrap();
        assert!(out.contains("proxies"));
        assert!(out.contains("Home"));
        assert!(diags.is_empty());
    }

    #[test]
    fn deprecated_chacha20_is_dropped_and_reported() {
        let mut node = ss_node("Legacy");
        if let NodePayload::Ss(ref mut p) = node.payload {
            p.method = "chacha20".to_string();
        }
        let mut opts = opts();
        opts.filter_deprecated = true;
        let mut diags = Vec::new();
        let out = emit("{}", &[node], &[], &[], &opts, &mut diags).unwrap();
        assert!(!out.contains("Legacy"));
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn plain_clash_drops_ssr_nodes() {
        use crate::node::SsrPayload;
        let mut node = ss_node("SsrHome");
        node.payload = NodePayload::Ssr(SsrPayload {
            method: "aes-128-cfb".to_string(),
            password: "p".to_string(),
            protocol: "auth_aes128_md5".to_string(),
            protocol_param: String::new(),
            obfs: "plain".to_string(),
            obfs_param: String::new(),
        });
        let mut diags = Vec::new();
        let out = emit("{}", &[node], &[], &[], &opts(), &mut diags).unwrap();
        assert!(!out.contains("SsrHome"));
        assert_eq!(diags.len(), 1);
    }
}
