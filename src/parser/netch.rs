//! `Netch://` link parsing: base64-wrapped JSON keyed by `"Type"`.
//!
//! Grounded on `parser::proxy::explodes::netch::explode_netch`, which
//! dispatches the same JSON shape across Shadowsocks/ShadowsocksR/SOCKS5/
//! HTTP(S)/Trojan/VMess.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::Value;

use crate::error::ParseError;
use crate::node::{
    NodeDescriptor, NodePayload, SsPayload, SsPlugin, SsrPayload, Transport, Tribool,
    TrojanPayload, UserPassPayload, VmessPayload,
};

use super::{HTTP_DEFAULT_GROUP, SOCKS_DEFAULT_GROUP, SSR_DEFAULT_GROUP, SS_DEFAULT_GROUP, TROJAN_DEFAULT_GROUP, VMESS_DEFAULT_GROUP};

pub fn parse(raw: &str, group_id: i32) -> Result<NodeDescriptor, ParseError> {
    let rest = raw.strip_prefix("Netch://").ok_or_else(|| ParseError::UnknownScheme("Netch".to_string()))?;

    let decoded = STANDARD.decode(rest).map_err(|_| ParseError::InvalidBase64)?;
    let decoded = String::from_utf8(decoded).map_err(|_| ParseError::InvalidBase64)?;
    let json: Value = serde_json::from_str(&decoded).map_err(|e| ParseError::InvalidJson(e.to_string()))?;

    let type_str = json.get("Type").and_then(Value::as_str).ok_or(ParseError::MissingField("Type"))?;
    let remark = json.get("Remark").and_then(Value::as_str).unwrap_or_default().to_string();
    let server = json.get("Hostname").and_then(Value::as_str).ok_or(ParseError::MissingField("Hostname"))?.to_string();
    let port = json.get("Port").and_then(Value::as_u64).ok_or(ParseError::MissingField("Port"))? as u16;
    if port == 0 {
        return Err(ParseError::InvalidPort("0".to_string()));
    }

    let remark = if remark.is_empty() { format!("{} ({})", server, port) } else { remark };

    let (group, payload) = match type_str {
        "Shadowsocks" => {
            let method = str_field(&json, "Method");
            let password = str_field(&json, "Password");
            if method.is_empty() || password.is_empty() {
                return Err(ParseError::MissingField("Method/Password"));
            }
            let plugin_name = str_field(&json, "Plugin");
            let plugin = match plugin_name.as_str() {
                "obfs-local" | "simple-obfs" => SsPlugin::ObfsLocal,
                "v2ray-plugin" => SsPlugin::V2rayPlugin,
                _ => SsPlugin::None,
            };
            let plugin_opts = str_field(&json, "PluginOption");
            (
                SS_DEFAULT_GROUP,
                NodePayload::Ss(SsPayload { method, password, plugin, plugin_opts }),
            )
        }
        "ShadowsocksR" => {
            let method = str_field(&json, "Method");
            let password = str_field(&json, "Password");
            let protocol = str_field(&json, "Protocol");
            let obfs = str_field(&json, "OBFS");
            if method.is_empty() || password.is_empty() || protocol.is_empty() || obfs.is_empty() {
                return Err(ParseError::MissingField("Method/Password/Protocol/OBFS"));
            }
            let protocol_param = str_field(&json, "ProtocolParam");
            let obfs_param = str_field(&json, "OBFSParam");
            (
                SSR_DEFAULT_GROUP,
                NodePayload::Ssr(SsrPayload { method, password, protocol, protocol_param, obfs, obfs_param }),
            )
        }
        "SOCKS5" => {
            let username = str_field(&json, "Username");
            let password = str_field(&json, "Password");
            (SOCKS_DEFAULT_GROUP, NodePayload::Socks5(UserPassPayload { username, password, tls_secure: false }))
        }
        "HTTP" | "HTTPS" => {
            let username = str_field(&json, "Username");
            let password = str_field(&json, "Password");
            let tls_secure = type_str == "HTTPS";
            let payload = UserPassPayload { username, password, tls_secure };
            if tls_secure {
                (HTTP_DEFAULT_GROUP, NodePayload::Https(payload))
            } else {
                (HTTP_DEFAULT_GROUP, NodePayload::Http(payload))
            }
        }
        "Trojan" => {
            let password = str_field(&json, "Password");
            if password.is_empty() {
                return Err(ParseError::MissingField("Password"));
            }
            let sni = str_field(&json, "Host");
            (
                TROJAN_DEFAULT_GROUP,
                NodePayload::Trojan(TrojanPayload {
                    password,
                    sni,
                    tls_secure: true,
                    transfer_protocol: Transport::Tcp,
                    host: String::new(),
                    path: String::new(),
                }),
            )
        }
        "VMess" => {
            let uuid = str_field(&json, "UserID");
            if uuid.is_empty() {
                return Err(ParseError::MissingField("UserID"));
            }
            let alter_id = json.get("AlterID").and_then(Value::as_u64).unwrap_or(0) as u32;
            let net = str_field(&json, "TransferProtocol");
            let transfer_protocol = if net.is_empty() { Transport::Tcp } else { Transport::parse(&net) };
            let cipher = { let c = str_field(&json, "EncryptMethod"); if c.is_empty() { "auto".to_string() } else { c } };
            let tls_secure = json.get("TLSSecure").and_then(Value::as_bool).unwrap_or(false);
            let host = str_field(&json, "Host");
            let path = { let p = str_field(&json, "Path"); if p.is_empty() { "/".to_string() } else { p } };
            (
                VMESS_DEFAULT_GROUP,
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
                }),
            )
        }
        other => return Err(ParseError::UnknownScheme(other.to_string())),
    };

    Ok(NodeDescriptor {
        group: group.to_string(),
        group_id,
        remarks: remark,
        server,
        port,
        udp: Tribool::Unset,
        tcp_fast_open: Tribool::Unset,
        skip_cert_verify: Tribool::Unset,
        tls13: Tribool::Unset,
        payload,
    })
}

fn str_field(json: &Value, key: &str) -> String {
    json.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(body: &Value) -> String {
        STANDARD.encode(body.to_string())
    }

    #[test]
    fn parses_netch_shadowsocks() {
        let body = serde_json::json!({
            "Type": "Shadowsocks", "Remark": "node", "Hostname": "1.2.3.4", "Port": 8388,
            "Method": "aes-256-gcm", "Password": "pw"
        });
        let link = format!("Netch://{}", encode(&body));
        let node = parse(&link, 0).unwrap();
        match &node.payload {
            NodePayload::Ss(p) => {
                assert_eq!(p.method, "aes-256-gcm");
                assert_eq!(p.password, "pw");
            }
            _ => panic!("expected ss payload"),
        }
    }

    #[test]
    fn parses_netch_vmess() {
        let body = serde_json::json!({
            "Type": "VMess", "Remark": "node", "Hostname": "1.2.3.4", "Port": 443,
            "UserID": "b831381d-6324-4d53-ad4f-8cda48b30811", "AlterID": 0,
            "TransferProtocol": "ws", "Host": "x.com", "Path": "/v", "TLSSecure": true
        });
        let link = format!("Netch://{}", encode(&body));
        let node = parse(&link, 0).unwrap();
        match &node.payload {
            NodePayload::Vmess(p) => {
                assert_eq!(p.transfer_protocol, Transport::Ws);
                assert_eq!(p.host, "x.com");
                assert!(p.tls_secure);
            }
            _ => panic!("expected vmess payload"),
        }
    }

    #[test]
    fn rejects_unknown_type() {
        let body = serde_json::json!({"Type": "Wireguard", "Remark": "r", "Hostname": "h", "Port": 1});
        let link = format!("Netch://{}", encode(&body));
        assert!(parse(&link, 0).is_err());
    }
}
