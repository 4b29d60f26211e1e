//! Shadowsocks link parsing: `ss://method:pass@host:port` (SIP002) or the
//! legacy `ss://base64(method:pass@host:port)` shape.
//!
//! Grounded on `parser::explodes::ss::explode_ss`.

use crate::error::ParseError;
use crate::node::{NodeDescriptor, NodePayload, NodeType, SsPayload, SsPlugin, Tribool};
use crate::utils::base64::url_safe_base64_decode;
use crate::utils::url::url_decode;

use super::SS_DEFAULT_GROUP;

pub fn parse(raw: &str, group_id: i32) -> Result<NodeDescriptor, ParseError> {
    let mut content = raw
        .strip_prefix("ss://")
        .ok_or_else(|| ParseError::UnknownScheme("ss".to_string()))?
        .replace("/?", "?");

    let mut remark = String::new();
    if let Some(hash) = content.find('#') {
        remark = url_decode(&content[hash + 1..]);
        content = content[..hash].to_string();
    }

    let mut plugin = SsPlugin::None;
    let mut plugin_opts = String::new();
    let mut group = SS_DEFAULT_GROUP.to_string();

    if let Some(q) = content.find('?') {
        let query = content[q + 1..].to_string();
        content = content[..q].to_string();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "plugin" => {
                    let decoded = url_decode(&value);
                    let (name, opts) = match decoded.find(';') {
                        Some(pos) => (decoded[..pos].to_string(), decoded[pos + 1..].to_string()),
                        None => (decoded, String::new()),
                    };
                    plugin = match name.as_str() {
                        "obfs-local" | "simple-obfs" => SsPlugin::ObfsLocal,
                        "v2ray-plugin" => SsPlugin::V2rayPlugin,
                        _ => SsPlugin::None,
                    };
                    plugin_opts = opts;
                }
                "group" if !value.is_empty() => group = url_safe_base64_decode(&value),
                _ => {}
            }
        }
    }

    let (method, password, server, port) = if content.contains('@') {
        let (secret, server_port) = content
            .split_once('@')
            .ok_or(ParseError::TooFewFields { expected: 2, found: 1 })?;
        let decoded_secret = url_safe_base64_decode(secret);
        let (method, password) = decoded_secret
            .split_once(':')
            .ok_or(ParseError::MissingField("method:password"))?;
        let (server, port) = parse_server_port(server_port)?;
        (method.to_string(), password.to_string(), server, port)
    } else {
        let decoded = url_safe_base64_decode(&content);
        if decoded.is_empty() {
            return Err(ParseError::InvalidBase64);
        }
        let (method_pass, server_port) = decoded
            .split_once('@')
            .ok_or(ParseError::TooFewFields { expected: 2, found: 1 })?;
        let (method, password) = method_pass
            .split_once(':')
            .ok_or(ParseError::MissingField("method:password"))?;
        let (server, port) = parse_server_port(server_port)?;
        (method.to_string(), password.to_string(), server, port)
    };

    if remark.is_empty() {
        remark = format!("{} ({})", server, port);
    }

    Ok(NodeDescriptor {
        group,
        group_id,
        remarks: remark,
        server,
        port,
        udp: Tribool::Unset,
        tcp_fast_open: Tribool::Unset,
        skip_cert_verify: Tribool::Unset,
        tls13: Tribool::Unset,
        payload: NodePayload::Ss(SsPayload { method, password, plugin, plugin_opts }),
    })
}

fn parse_server_port(s: &str) -> Result<(String, u16), ParseError> {
    let (host, port) = s.rsplit_once(':').ok_or(ParseError::MissingField("port"))?;
    let port: u16 = port.parse().map_err(|_| ParseError::InvalidPort(port.to_string()))?;
    if port == 0 {
        return Err(ParseError::InvalidPort("0".to_string()));
    }
    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sip002_link_with_remark() {
        let node = parse("ss://YWVzLTI1Ni1nY206cGFzcw==@1.2.3.4:8388#My%20Node", 1).unwrap();
        assert_eq!(node.node_type(), NodeType::Ss);
        assert_eq!(node.server, "1.2.3.4");
        assert_eq!(node.port, 8388);
        assert_eq!(node.remarks, "My Node");
        match &node.payload {
            NodePayload::Ss(p) => {
                assert_eq!(p.method, "aes-256-gcm");
                assert_eq!(p.password, "pass");
            }
            _ => panic!("expected SS payload"),
        }
    }

    #[test]
    fn missing_port_is_a_parse_error() {
        assert!(parse("ss://YWVzLTI1Ni1nY206cGFzcw==@1.2.3.4", 1).is_err());
    }
}
