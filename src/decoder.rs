//! Component B: the subscription decoder. Sniffs the container format and
//! yields an ordered node list, delegating each entry to the link parser.
//!
//! Grounded on the teacher's `parser::yaml::clash` (the Clash/ClashR YAML
//! branch) and `utils::ini`/`IniReader` (the Surge-family INI branch); the
//! `ssd://` branch is grounded on `original_source/src/subexport.cpp`, the
//! only place in the pack that documents the SSD JSON shape end-to-end.

use configparser::ini::Ini;
use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;

use crate::error::{Diagnostic, ParseError};
use crate::node::{
    NodeDescriptor, NodePayload, SnellPayload, SsPayload, SsPlugin, SsrPayload, Transport,
    TrojanPayload, Tribool, UserPassPayload, VmessPayload, NIL_UUID,
};
use crate::parser::{self, SS_DEFAULT_GROUP};
use crate::utils::base64::base64_decode;

/// Decode `source_text` into an ordered node list. Per-entry parse failures
/// are pushed onto `diagnostics` and the entry is skipped; the whole
/// subscription is only abandoned on an unrecognized container shape.
pub fn decode(source_text: &str, diagnostics: &mut Vec<Diagnostic>) -> Vec<NodeDescriptor> {
    let trimmed = source_text.trim();

    if let Some(list) = try_base64_link_list(trimmed) {
        return parse_link_list(&list, diagnostics);
    }
    if let Some(nodes) = try_clash_yaml(trimmed, diagnostics) {
        return nodes;
    }
    if let Some(prefixed) = trimmed.strip_prefix("ssd://") {
        return parse_ssd(prefixed, diagnostics);
    }
    if let Some(nodes) = try_surge_ini(trimmed, diagnostics) {
        return nodes;
    }
    parse_link_list(trimmed, diagnostics)
}

const KNOWN_SCHEMES: &[&str] =
    &["vmess://", "ss://", "ssr://", "trojan://", "snell://", "socks://", "socks5://", "http://", "https://"];

fn try_base64_link_list(text: &str) -> Option<String> {
    let compact: String = text.split_whitespace().collect();
    if compact.is_empty() || !compact.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=' | '-' | '_')) {
        return None;
    }
    let decoded = crate::utils::base64::base64_decode(&compact, true);
    if decoded.is_empty() {
        return None;
    }
    let first_line = decoded.lines().next().unwrap_or("");
    if KNOWN_SCHEMES.iter().any(|s| first_line.starts_with(s)) {
        Some(decoded)
    } else {
        None
    }
}

fn parse_link_list(text: &str, diagnostics: &mut Vec<Diagnostic>) -> Vec<NodeDescriptor> {
    let mut nodes = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parser::parse_link(line, i as i32) {
            Ok(node) => nodes.push(node),
            Err(reason) => diagnostics.push(Diagnostic::NodeParseFailed { source: line.to_string(), reason }),
        }
    }
    nodes
}

fn try_clash_yaml(text: &str, diagnostics: &mut Vec<Diagnostic>) -> Option<Vec<NodeDescriptor>> {
    let doc: YamlValue = serde_yaml::from_str(text).ok()?;
    let mapping = doc.as_mapping()?;
    let seq = mapping
        .get(&YamlValue::String("proxies".to_string()))
        .or_else(|| mapping.get(&YamlValue::String("Proxy".to_string())))?
        .as_sequence()?;

    let mut nodes = Vec::new();
    for (i, entry) in seq.iter().enumerate() {
        match clash_proxy_to_node(entry, i as i32) {
            Ok(Some(node)) => nodes.push(node),
            Ok(None) => {}
            Err(reason) => diagnostics.push(Diagnostic::NodeParseFailed {
                source: format!("proxies[{}]", i),
                reason,
            }),
        }
    }
    Some(nodes)
}

fn yaml_str(map: &serde_yaml::Mapping, key: &str) -> Option<String> {
    map.get(&YamlValue::String(key.to_string())).and_then(|v| match v {
        YamlValue::String(s) => Some(s.clone()),
        YamlValue::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn yaml_bool(map: &serde_yaml::Mapping, key: &str) -> Option<bool> {
    map.get(&YamlValue::String(key.to_string())).and_then(|v| v.as_bool())
}

fn yaml_u16(map: &serde_yaml::Mapping, key: &str) -> Option<u16> {
    map.get(&YamlValue::String(key.to_string())).and_then(|v| v.as_u64()).map(|n| n as u16)
}

fn yaml_u32(map: &serde_yaml::Mapping, key: &str) -> Option<u32> {
    map.get(&YamlValue::String(key.to_string())).and_then(|v| v.as_u64()).map(|n| n as u32)
}

fn yaml_ws_host(map: &serde_yaml::Mapping) -> Option<String> {
    map.get(&YamlValue::String("ws-headers".to_string()))
        .and_then(|v| v.as_mapping())
        .and_then(|headers| headers.get(&YamlValue::String("Host".to_string())))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// Translate one Clash `proxies[]` entry. Returns `Ok(None)` for a
/// recognized-but-unsupported type (the decoder's own capability gate is
/// narrower than the emitters'; unknown input types are simply not nodes).
fn clash_proxy_to_node(entry: &YamlValue, group_id: i32) -> Result<Option<NodeDescriptor>, ParseError> {
    let map = entry.as_mapping().ok_or(ParseError::InvalidJson("proxy entry is not a mapping".to_string()))?;
    let proxy_type = yaml_str(map, "type").ok_or(ParseError::MissingField("type"))?;
    let name = yaml_str(map, "name").unwrap_or_default();
    let server = yaml_str(map, "server").ok_or(ParseError::MissingField("server"))?;
    let port = yaml_u16(map, "port").ok_or(ParseError::MissingField("port"))?;
    if port == 0 {
        return Err(ParseError::InvalidPort("0".to_string()));
    }

    let udp = Tribool::from_option(yaml_bool(map, "udp"));
    let tfo = Tribool::from_option(yaml_bool(map, "tfo"));
    let scv = Tribool::from_option(yaml_bool(map, "skip-cert-verify"));

    let payload = match proxy_type.as_str() {
        "ss" => {
            let method = yaml_str(map, "cipher").unwrap_or_default();
            let password = yaml_str(map, "password").unwrap_or_default();
            let plugin_name = yaml_str(map, "plugin").unwrap_or_default();
            let plugin = match plugin_name.as_str() {
                "obfs" => SsPlugin::ObfsLocal,
                "v2ray-plugin" => SsPlugin::V2rayPlugin,
                _ => SsPlugin::None,
            };
            let plugin_opts = map
                .get(&YamlValue::String("plugin-opts".to_string()))
                .and_then(|v| v.as_mapping())
                .map(|opts| {
                    opts.iter()
                        .filter_map(|(k, v)| {
                            let k = k.as_str()?;
                            let v = match v {
                                YamlValue::String(s) => s.clone(),
                                YamlValue::Bool(b) => b.to_string(),
                                YamlValue::Number(n) => n.to_string(),
                                _ => return None,
                            };
                            Some(format!("{}={}", k, v))
                        })
                        .collect::<Vec<_>>()
                        .join(";")
                })
                .unwrap_or_default();
            NodePayload::Ss(SsPayload { method, password, plugin, plugin_opts })
        }
        "ssr" => {
            let method = yaml_str(map, "cipher").unwrap_or_default();
            let password = yaml_str(map, "password").unwrap_or_default();
            let protocol = yaml_str(map, "protocol").unwrap_or_default();
            let obfs = yaml_str(map, "obfs").unwrap_or_default();
            let protocol_param = yaml_str(map, "protocol-param").unwrap_or_default();
            let obfs_param = yaml_str(map, "obfs-param").unwrap_or_default();
            NodePayload::Ssr(SsrPayload { method, password, protocol, protocol_param, obfs, obfs_param })
        }
        "vmess" => {
            let mut uuid = yaml_str(map, "uuid").unwrap_or_default();
            if uuid.is_empty() {
                uuid = NIL_UUID.to_string();
            }
            let alter_id = yaml_u32(map, "alterId").unwrap_or(0);
            let cipher = yaml_str(map, "cipher").unwrap_or_else(|| "auto".to_string());
            let network = yaml_str(map, "network").unwrap_or_default();
            let transfer_protocol = if network.is_empty() { Transport::Tcp } else { Transport::parse(&network) };
            let mut path = yaml_str(map, "ws-path").unwrap_or_default();
            if path.is_empty() {
                path = "/".to_string();
            }
            let mut host = yaml_ws_host(map).unwrap_or_default();
            if host.is_empty() {
                host = server.clone();
            }
            let tls_secure = yaml_bool(map, "tls").unwrap_or(false);
            NodePayload::Vmess(VmessPayload {
                uuid,
                alter_id,
                transfer_protocol,
                fake_type: String::new(),
                host,
                path,
                tls_secure,
                quic_secure: String::new(),
                quic_secret: String::new(),
                cipher,
            })
        }
        "trojan" => {
            let password = yaml_str(map, "password").unwrap_or_default();
            let sni = yaml_str(map, "sni").unwrap_or_default();
            let network = yaml_str(map, "network").unwrap_or_default();
            let transfer_protocol = if network.is_empty() { Transport::Tcp } else { Transport::parse(&network) };
            let host = if sni.is_empty() { server.clone() } else { sni.clone() };
            NodePayload::Trojan(TrojanPayload { password, sni, tls_secure: true, transfer_protocol, host, path: String::new() })
        }
        "snell" => {
            let password = yaml_str(map, "psk").unwrap_or_default();
            let obfs = yaml_str(map, "obfs").unwrap_or_default();
            let version = yaml_u16(map, "version").unwrap_or(0);
            NodePayload::Snell(SnellPayload { password, obfs, host: server.clone(), version })
        }
        "socks5" => {
            let username = yaml_str(map, "username").unwrap_or_default();
            let password = yaml_str(map, "password").unwrap_or_default();
            NodePayload::Socks5(UserPassPayload { username, password, tls_secure: false })
        }
        "http" => {
            let username = yaml_str(map, "username").unwrap_or_default();
            let password = yaml_str(map, "password").unwrap_or_default();
            let tls_secure = yaml_bool(map, "tls").unwrap_or(false);
            if tls_secure {
                NodePayload::Https(UserPassPayload { username, password, tls_secure: true })
            } else {
                NodePayload::Http(UserPassPayload { username, password, tls_secure: false })
            }
        }
        other => {
            return Err(ParseError::UnknownScheme(other.to_string()));
        }
    };

    let group = match proxy_type.as_str() {
        "ssr" => parser::SSR_DEFAULT_GROUP,
        "vmess" => parser::VMESS_DEFAULT_GROUP,
        "trojan" => parser::TROJAN_DEFAULT_GROUP,
        "snell" => parser::SNELL_DEFAULT_GROUP,
        "socks5" => parser::SOCKS_DEFAULT_GROUP,
        "http" => parser::HTTP_DEFAULT_GROUP,
        _ => SS_DEFAULT_GROUP,
    };

    Ok(Some(NodeDescriptor {
        group: group.to_string(),
        group_id,
        remarks: if name.is_empty() { format!("{} ({})", server, port) } else { name },
        server,
        port,
        udp,
        tcp_fast_open: tfo,
        skip_cert_verify: scv,
        tls13: Tribool::Unset,
        payload,
    }))
}

/// `ssd://` container: base64 JSON with airport-level defaults inherited by
/// each server entry unless overridden.
fn parse_ssd(encoded: &str, diagnostics: &mut Vec<Diagnostic>) -> Vec<NodeDescriptor> {
    let text = base64_decode(encoded, false);
    let json: JsonValue = match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(_) => {
            diagnostics.push(Diagnostic::SourceRejected {
                source: "ssd://".to_string(),
                reason: crate::error::ConfigError::UnrecognizedShape,
            });
            return Vec::new();
        }
    };

    let airport_method = json.get("encryption").and_then(|v| v.as_str()).unwrap_or_default();
    let airport_password = json.get("password").and_then(|v| v.as_str()).unwrap_or_default();
    let airport_port = json.get("port").and_then(|v| v.as_u64()).map(|p| p as u16);

    let mut nodes = Vec::new();
    if let Some(servers) = json.get("servers").and_then(|v| v.as_array()) {
        for (i, server) in servers.iter().enumerate() {
            let host = match server.get("server").and_then(|v| v.as_str()) {
                Some(h) => h.to_string(),
                None => continue,
            };
            let port = server
                .get("port")
                .and_then(|v| v.as_u64())
                .map(|p| p as u16)
                .or(airport_port)
                .unwrap_or(0);
            if port == 0 {
                diagnostics.push(Diagnostic::NodeParseFailed {
                    source: format!("ssd servers[{}]", i),
                    reason: ParseError::InvalidPort("0".to_string()),
                });
                continue;
            }
            let method = server.get("encryption").and_then(|v| v.as_str()).unwrap_or(airport_method).to_string();
            let password = server.get("password").and_then(|v| v.as_str()).unwrap_or(airport_password).to_string();
            let remark = server
                .get("remarks")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("{} ({})", host, port));

            nodes.push(NodeDescriptor {
                group: "SSD".to_string(),
                group_id: i as i32,
                remarks: remark,
                server: host,
                port,
                udp: Tribool::Unset,
                tcp_fast_open: Tribool::Unset,
                skip_cert_verify: Tribool::Unset,
                tls13: Tribool::Unset,
                payload: NodePayload::Ss(SsPayload { method, password, plugin: SsPlugin::None, plugin_opts: String::new() }),
            });
        }
    }
    nodes
}

/// Surge-family `.conf`: an `[Proxy]` INI section, one `name = scheme, host,
/// port, k=v...` entry per line, translated into the equivalent link before
/// re-using the link parser. Only the shapes the link parser already
/// understands round-trip; anything else is reported and skipped.
fn try_surge_ini(text: &str, diagnostics: &mut Vec<Diagnostic>) -> Option<Vec<NodeDescriptor>> {
    let mut ini = Ini::new();
    let map = ini.read(text.to_string()).ok()?;
    let proxy_section = map.get("proxy")?;

    let mut nodes = Vec::new();
    for (i, (name, value)) in proxy_section.iter().enumerate() {
        let Some(line) = value else { continue };
        match surge_entry_to_link(name, line) {
            Some(link) => match parser::parse_link(&link, i as i32) {
                Ok(node) => nodes.push(node),
                Err(reason) => diagnostics.push(Diagnostic::NodeParseFailed { source: name.clone(), reason }),
            },
            None => diagnostics.push(Diagnostic::NodeParseFailed {
                source: name.clone(),
                reason: ParseError::UnknownScheme("surge-proxy".to_string()),
            }),
        }
    }
    Some(nodes)
}

fn surge_entry_to_link(name: &str, line: &str) -> Option<String> {
    let mut parts = line.split(',').map(|s| s.trim());
    let kind = parts.next()?;
    let host = parts.next()?;
    let port: u16 = parts.next()?.parse().ok()?;
    let rest: Vec<&str> = parts.collect();
    let kv = |key: &str| -> Option<String> {
        rest.iter().find_map(|p| p.split_once('=').filter(|(k, _)| k.trim() == key).map(|(_, v)| v.trim().to_string()))
    };

    match kind {
        "ss" => {
            let method = kv("encrypt-method")?;
            let password = kv("password")?;
            let userinfo = crate::utils::base64::url_safe_base64_encode(&format!("{}:{}", method, password));
            Some(format!("ss://{}@{}:{}#{}", userinfo, host, port, crate::utils::url::url_encode(name)))
        }
        "trojan" => {
            let password = kv("password")?;
            Some(format!("trojan://{}@{}:{}#{}", password, host, port, crate::utils::url::url_encode(name)))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_link_list_parses_one_node_per_line() {
        let mut diags = Vec::new();
        let nodes = decode("ss://YWVzLTI1Ni1nY206cGFzcw==@1.2.3.4:8388#A\nnot-a-link", &mut diags);
        assert_eq!(nodes.len(), 1);
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn base64_wrapped_link_list_is_sniffed() {
        let inner = "ss://YWVzLTI1Ni1nY206cGFzcw==@1.2.3.4:8388#A";
        let wrapped = crate::utils::base64::base64_encode(inner);
        let mut diags = Vec::new();
        let nodes = decode(&wrapped, &mut diags);
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn clash_yaml_with_one_ss_proxy() {
        let yaml = r#"
proxies:
  - name: Home
    type: ss
    server: 1.2.3.4
    port: 8388
    cipher: aes-256-gcm
    password: pass
"#;
        let mut diags = Vec::new();
        let nodes = decode(yaml, &mut diags);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].remarks, "Home");
    }

    #[test]
    fn clash_yaml_decodes_every_supported_proxy_type() {
        let yaml = r#"
proxies:
  - name: VmessNode
    type: vmess
    server: example.com
    port: 443
    uuid: ""
    alterId: 0
    cipher: auto
    network: ws
    ws-path: /v
    ws-headers:
      Host: example.com
    tls: true
  - name: SsrNode
    type: ssr
    server: 1.2.3.4
    port: 8080
    cipher: aes-256-cfb
    password: pass
    protocol: origin
    obfs: plain
  - name: TrojanNode
    type: trojan
    server: example.com
    port: 443
    password: pass
    sni: example.com
  - name: SnellNode
    type: snell
    server: 1.2.3.4
    port: 443
    psk: pass
    version: 3
  - name: Socks5Node
    type: socks5
    server: 1.2.3.4
    port: 1080
    username: u
    password: p
  - name: HttpNode
    type: http
    server: 1.2.3.4
    port: 8080
    tls: true
"#;
        let mut diags = Vec::new();
        let nodes = decode(yaml, &mut diags);
        assert!(diags.is_empty(), "{:?}", diags);
        assert_eq!(nodes.len(), 6);
        assert_eq!(nodes[0].payload.node_type(), crate::node::NodeType::Vmess);
        match &nodes[0].payload {
            NodePayload::Vmess(p) => {
                assert_eq!(p.uuid, NIL_UUID);
                assert_eq!(p.transfer_protocol, Transport::Ws);
                assert_eq!(p.path, "/v");
                assert_eq!(p.host, "example.com");
                assert!(p.tls_secure);
            }
            _ => panic!("expected vmess payload"),
        }
        assert_eq!(nodes[1].payload.node_type(), crate::node::NodeType::Ssr);
        assert_eq!(nodes[2].payload.node_type(), crate::node::NodeType::Trojan);
        assert_eq!(nodes[3].payload.node_type(), crate::node::NodeType::Snell);
        assert_eq!(nodes[4].payload.node_type(), crate::node::NodeType::Socks5);
        assert_eq!(nodes[5].payload.node_type(), crate::node::NodeType::Https);
    }

    #[test]
    fn ssd_servers_inherit_airport_defaults() {
        let json = serde_json::json!({
            "airport": "Example",
            "port": 8388,
            "encryption": "aes-256-gcm",
            "password": "pass",
            "servers": [{ "server": "1.2.3.4" }]
        });
        let encoded = crate::utils::base64::base64_encode(&json.to_string());
        let link = format!("ssd://{}", encoded);
        let mut diags = Vec::new();
        let nodes = decode(&link, &mut diags);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].port, 8388);
    }
}
