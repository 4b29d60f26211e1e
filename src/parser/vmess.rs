//! Vmess link parsing: `vmess://`/`vmess1://` base64 payload.
//!
//! Tries four payload shapes in order, matching what real subscriptions
//! actually emit under this scheme: (1) the standard JSON body; (2) the
//! legacy single-line positional form `uuid-alterId@host:port/?k=v...`;
//! (3) the Shadowrocket form, a standard URI whose userinfo is
//! base64(method:id:alterId); (4) the Kitsunebi form, base64 of a
//! comma-separated `host,port,id,alterId,k=v...` line.
//!
//! Grounded on `parser::proxy::explodes::vmess::{explode_vmess,
//! explode_std_vmess, explode_shadowrocket, explode_kitsunebi}`.

use base64::{engine::general_purpose::STANDARD, Engine};
use regex::Regex;
use serde_json::Value;
use url::Url;

use crate::error::ParseError;
use crate::node::{NodeDescriptor, NodePayload, Transport, Tribool, VmessPayload, NIL_UUID};

use super::VMESS_DEFAULT_GROUP;

pub fn parse(raw: &str, group_id: i32) -> Result<NodeDescriptor, ParseError> {
    let rest = raw
        .strip_prefix("vmess://")
        .or_else(|| raw.strip_prefix("vmess1://"))
        .ok_or_else(|| ParseError::UnknownScheme("vmess".to_string()))?;

    if let Some(node) = parse_json(rest, group_id) {
        return node;
    }
    if let Some(node) = parse_legacy_positional(rest, group_id) {
        return Ok(node);
    }
    if let Some(node) = parse_shadowrocket(raw, group_id) {
        return Ok(node);
    }
    if let Some(node) = parse_kitsunebi(rest, group_id) {
        return Ok(node);
    }
    Err(ParseError::InvalidBase64)
}

/// The standard JSON shape. Returns `None` (not `Some(Err(..))`) when the
/// payload simply isn't base64/JSON, so callers fall through to the other
/// shapes; a `Some(Err(..))` means it was JSON but missing a required field.
fn parse_json(rest: &str, group_id: i32) -> Option<Result<NodeDescriptor, ParseError>> {
    let decoded = STANDARD.decode(rest).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let json: Value = serde_json::from_str(&decoded).ok()?;
    if !json.is_object() {
        return None;
    }

    Some((|| {
        let version = json.get("v").and_then(|v| v.as_str().and_then(|s| s.parse::<u32>().ok()).or(v.as_u64().map(|n| n as u32))).unwrap_or(1);

        let server = field_str(&json, "add");
        if server.is_empty() {
            return Err(ParseError::MissingField("add"));
        }
        let port: u16 = field_str(&json, "port")
            .parse()
            .map_err(|_| ParseError::InvalidPort(field_str(&json, "port")))?;
        if port == 0 {
            return Err(ParseError::InvalidPort("0".to_string()));
        }

        let mut uuid = field_str(&json, "id");
        if uuid.is_empty() {
            uuid = NIL_UUID.to_string();
        }
        let alter_id: u32 = field_str(&json, "aid").parse().unwrap_or(0);
        let net = field_str(&json, "net");
        let transfer_protocol = if net.is_empty() { Transport::Tcp } else { Transport::parse(&net) };
        let fake_type = field_str(&json, "type");
        let mut host = field_str(&json, "host");
        let mut path = field_str(&json, "path");
        let tls_secure = field_str(&json, "tls").eq_ignore_ascii_case("tls");

        if version == 2 && !host.is_empty() {
            if let Some((h, p)) = host.clone().split_once(';') {
                host = h.to_string();
                path = p.to_string();
            }
        }
        if path.is_empty() {
            path = "/".to_string();
        }
        if host.is_empty() {
            host = server.clone();
        }

        let mut remark = field_str(&json, "ps");
        if remark.is_empty() {
            remark = format!("{} ({})", server, port);
        }

        Ok(NodeDescriptor {
            group: VMESS_DEFAULT_GROUP.to_string(),
            group_id,
            remarks: remark,
            server,
            port,
            udp: Tribool::Unset,
            tcp_fast_open: Tribool::Unset,
            skip_cert_verify: Tribool::Unset,
            tls13: Tribool::Unset,
            payload: NodePayload::Vmess(VmessPayload {
                uuid,
                alter_id,
                transfer_protocol,
                fake_type,
                host,
                path,
                tls_secure,
                quic_secure: field_str(&json, "quicSecurity"),
                quic_secret: field_str(&json, "quicSecret"),
                cipher: "auto".to_string(),
            }),
        })
    })())
}

/// `uuid-alterId@host:port/?network=&host=&path=&tls=&sni=` (the legacy
/// single-line shape, not base64-wrapped).
fn parse_legacy_positional(rest: &str, group_id: i32) -> Option<NodeDescriptor> {
    let (body, remark) = match rest.find('#') {
        Some(pos) => (&rest[..pos], crate::utils::url::url_decode(&rest[pos + 1..])),
        None => (rest, String::new()),
    };

    let re = Regex::new(r"^([0-9a-fA-F-]{8,36})-(\d+)@([^:]+):(\d+)(.*)$").ok()?;
    let caps = re.captures(body)?;

    let uuid = caps.get(1).map(|m| m.as_str()).unwrap_or_default().to_string();
    let alter_id: u32 = caps.get(2).map(|m| m.as_str()).unwrap_or("0").parse().unwrap_or(0);
    let server = caps.get(3).map(|m| m.as_str()).unwrap_or_default().to_string();
    let port: u16 = caps.get(4).map(|m| m.as_str()).unwrap_or("0").parse().ok()?;
    if port == 0 || server.is_empty() {
        return None;
    }
    let query = caps.get(5).map(|m| m.as_str()).unwrap_or_default();

    let mut transfer_protocol = Transport::Tcp;
    let mut path = "/".to_string();
    let mut host = server.clone();
    let mut tls_secure = false;

    if let Some(q) = query.strip_prefix("/?") {
        for param in q.split('&') {
            if let Some((k, v)) = param.split_once('=') {
                match k {
                    "network" => transfer_protocol = Transport::parse(v),
                    "host" => host = v.to_string(),
                    "path" => path = v.to_string(),
                    "tls" => tls_secure = v == "1" || v.eq_ignore_ascii_case("tls"),
                    _ => {}
                }
            }
        }
    }

    let remark = if remark.is_empty() { format!("{} ({})", server, port) } else { remark };

    Some(NodeDescriptor {
        group: VMESS_DEFAULT_GROUP.to_string(),
        group_id,
        remarks: remark,
        server,
        port,
        udp: Tribool::Unset,
        tcp_fast_open: Tribool::Unset,
        skip_cert_verify: Tribool::Unset,
        tls13: Tribool::Unset,
        payload: NodePayload::Vmess(VmessPayload {
            uuid,
            alter_id,
            transfer_protocol,
            fake_type: String::new(),
            host,
            path,
            tls_secure,
            quic_secure: String::new(),
            quic_secret: String::new(),
            cipher: "auto".to_string(),
        }),
    })
}

/// Shadowrocket form: `vmess://base64(method:id:alterId)@host:port?obfs=&path=&obfsParam=&tls=&peer=#remark`.
fn parse_shadowrocket(raw: &str, group_id: i32) -> Option<NodeDescriptor> {
    let url = Url::parse(raw).ok()?;
    let host = url.host_str()?.to_string();
    let port = url.port()?;
    if port == 0 {
        return None;
    }
    let username = url.username();
    if username.is_empty() {
        return None;
    }
    let decoded = STANDARD.decode(username).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let parts: Vec<&str> = decoded.split(':').collect();
    if parts.len() < 3 {
        return None;
    }
    let cipher = parts[0].to_string();
    let uuid = parts[1].to_string();
    let alter_id: u32 = parts[2].parse().unwrap_or(0);

    let mut transfer_protocol = Transport::Tcp;
    let mut path = "/".to_string();
    let mut host_header = host.clone();
    let mut tls_secure = false;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "obfs" => transfer_protocol = Transport::parse(&value),
            "path" => path = value.to_string(),
            "obfsParam" => host_header = value.to_string(),
            "tls" => tls_secure = value == "1",
            _ => {}
        }
    }

    let remark = url.fragment().unwrap_or("").to_string();
    let remark = if remark.is_empty() { format!("{} ({})", host, port) } else { remark };

    Some(NodeDescriptor {
        group: VMESS_DEFAULT_GROUP.to_string(),
        group_id,
        remarks: remark,
        server: host,
        port,
        udp: Tribool::Unset,
        tcp_fast_open: Tribool::Unset,
        skip_cert_verify: Tribool::Unset,
        tls13: Tribool::Unset,
        payload: NodePayload::Vmess(VmessPayload {
            uuid,
            alter_id,
            transfer_protocol,
            fake_type: String::new(),
            host: host_header,
            path,
            tls_secure,
            quic_secure: String::new(),
            quic_secret: String::new(),
            cipher,
        }),
    })
}

/// Kitsunebi form: base64 of `host,port,id,alterId,k=v,...`.
fn parse_kitsunebi(rest: &str, group_id: i32) -> Option<NodeDescriptor> {
    let decoded = STANDARD.decode(rest).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let line = decoded.lines().next()?;
    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() < 4 {
        return None;
    }

    let server = parts[0].to_string();
    let port: u16 = parts[1].parse().ok()?;
    if port == 0 {
        return None;
    }
    let uuid = parts[2].to_string();
    let alter_id: u32 = parts[3].parse().unwrap_or(0);

    let mut transfer_protocol = Transport::Tcp;
    let mut path = "/".to_string();
    let mut host = server.clone();
    let mut tls_secure = false;
    let mut remark = format!("{} ({})", server, port);

    for field in &parts[4..] {
        if let Some((k, v)) = field.split_once('=') {
            match k {
                "net" => transfer_protocol = Transport::parse(v),
                "path" => path = v.to_string(),
                "host" => host = v.to_string(),
                "tls" => tls_secure = v == "1" || v.eq_ignore_ascii_case("tls"),
                "remarks" | "remark" => remark = v.to_string(),
                _ => {}
            }
        }
    }

    Some(NodeDescriptor {
        group: VMESS_DEFAULT_GROUP.to_string(),
        group_id,
        remarks: remark,
        server,
        port,
        udp: Tribool::Unset,
        tcp_fast_open: Tribool::Unset,
        skip_cert_verify: Tribool::Unset,
        tls13: Tribool::Unset,
        payload: NodePayload::Vmess(VmessPayload {
            uuid,
            alter_id,
            transfer_protocol,
            fake_type: String::new(),
            host,
            path,
            tls_secure,
            quic_secure: String::new(),
            quic_secret: String::new(),
            cipher: "auto".to_string(),
        }),
    })
}

fn field_str(json: &Value, key: &str) -> String {
    match json.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_uuid_normalizes_to_nil() {
        let body = serde_json::json!({
            "v": "2", "ps": "node", "add": "1.2.3.4", "port": "443",
            "id": "", "aid": "0", "net": "ws", "host": "x.com", "path": "/v", "tls": "tls"
        });
        let encoded = STANDARD.encode(body.to_string());
        let link = format!("vmess://{}", encoded);
        let node = parse(&link, 0).unwrap();
        match &node.payload {
            NodePayload::Vmess(p) => {
                assert_eq!(p.uuid, NIL_UUID);
                assert_eq!(p.transfer_protocol, Transport::Ws);
                assert_eq!(p.host, "x.com");
                assert_eq!(p.path, "/v");
                assert!(p.tls_secure);
            }
            _ => panic!("expected vmess payload"),
        }
    }

    #[test]
    fn vmess1_prefix_is_accepted_for_the_json_shape() {
        let body = serde_json::json!({
            "v": "2", "ps": "node", "add": "1.2.3.4", "port": "443",
            "id": "", "aid": "0", "net": "tcp",
        });
        let encoded = STANDARD.encode(body.to_string());
        let link = format!("vmess1://{}", encoded);
        let node = parse(&link, 0).unwrap();
        assert_eq!(node.server, "1.2.3.4");
    }

    #[test]
    fn legacy_positional_shape_parses_uuid_host_port() {
        let link = "vmess://b831381d-6324-4d53-ad4f-8cda48b30811-0@example.com:443/?network=ws&path=%2Fv&host=x.com&tls=1#Legacy";
        let node = parse(link, 0).unwrap();
        assert_eq!(node.server, "example.com");
        assert_eq!(node.port, 443);
        assert_eq!(node.remarks, "Legacy");
        match &node.payload {
            NodePayload::Vmess(p) => {
                assert_eq!(p.uuid, "b831381d-6324-4d53-ad4f-8cda48b30811");
                assert_eq!(p.transfer_protocol, Transport::Ws);
                assert!(p.tls_secure);
            }
            _ => panic!("expected vmess payload"),
        }
    }

    #[test]
    fn shadowrocket_shape_decodes_userinfo() {
        let userinfo = STANDARD.encode("aes-128-gcm:b831381d-6324-4d53-ad4f-8cda48b30811:0");
        let link = format!("vmess://{}@example.com:443?obfs=ws&path=%2Fv&tls=1#Rocket", userinfo);
        let node = parse(&link, 0).unwrap();
        assert_eq!(node.remarks, "Rocket");
        match &node.payload {
            NodePayload::Vmess(p) => {
                assert_eq!(p.cipher, "aes-128-gcm");
                assert_eq!(p.transfer_protocol, Transport::Ws);
                assert!(p.tls_secure);
            }
            _ => panic!("expected vmess payload"),
        }
    }

    #[test]
    fn kitsunebi_shape_parses_comma_separated_body() {
        let inner = "example.com,443,b831381d-6324-4d53-ad4f-8cda48b30811,0,net=ws,remarks=Kit";
        let encoded = STANDARD.encode(inner);
        let link = format!("vmess://{}", encoded);
        let node = parse(&link, 0).unwrap();
        assert_eq!(node.server, "example.com");
        assert_eq!(node.remarks, "Kit");
        match &node.payload {
            NodePayload::Vmess(p) => assert_eq!(p.transfer_protocol, Transport::Ws),
            _ => panic!("expected vmess payload"),
        }
    }
}
