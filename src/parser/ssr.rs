//! ShadowsocksR link parsing:
//! `ssr://base64(host:port:protocol:method:obfs:base64(pass)/?params)`.
//!
//! Grounded on `parser::proxy::explodes::ssr::explode_ssr`.

use crate::error::ParseError;
use crate::node::{NodeDescriptor, NodePayload, SsrPayload, Tribool};
use crate::utils::base64::url_safe_base64_decode;

use super::SSR_DEFAULT_GROUP;

pub fn parse(raw: &str, group_id: i32) -> Result<NodeDescriptor, ParseError> {
    let encoded = raw
        .strip_prefix("ssr://")
        .ok_or_else(|| ParseError::UnknownScheme("ssr".to_string()))?;
    let decoded = url_safe_base64_decode(encoded);
    if decoded.is_empty() {
        return Err(ParseError::InvalidBase64);
    }

    let parts: Vec<&str> = decoded.splitn(6, ':').collect();
    if parts.len() < 6 {
        return Err(ParseError::TooFewFields { expected: 6, found: parts.len() });
    }
    let server = parts[0].to_string();
    let port: u16 = parts[1].parse().map_err(|_| ParseError::InvalidPort(parts[1].to_string()))?;
    if port == 0 {
        return Err(ParseError::InvalidPort("0".to_string()));
    }
    let protocol = parts[2].to_string();
    let method = parts[3].to_string();
    let obfs = parts[4].to_string();

    let (password_b64, query) = match parts[5].split_once('/') {
        Some((pass, rest)) => (pass, rest.strip_prefix('?').unwrap_or(rest)),
        None => (parts[5], ""),
    };
    let password = url_safe_base64_decode(password_b64);

    let mut obfs_param = String::new();
    let mut protocol_param = String::new();
    let mut remark = format!("{} ({})", server, port);
    let mut group = SSR_DEFAULT_GROUP.to_string();

    if !query.is_empty() {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let decoded_value = url_safe_base64_decode(&value);
            match key.as_ref() {
                "obfsparam" => obfs_param = decoded_value,
                "protoparam" => protocol_param = decoded_value,
                "remarks" if !decoded_value.is_empty() => remark = decoded_value,
                "group" if !decoded_value.is_empty() => group = decoded_value,
                _ => {}
            }
        }
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
        payload: NodePayload::Ssr(SsrPayload { method, password, protocol, protocol_param, obfs, obfs_param }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_ssr_link() {
        let body = "example.com:8080:origin:aes-256-cfb:plain:cGFzcw";
        let link = format!("ssr://{}", crate::utils::base64::url_safe_base64_encode(body));
        let node = parse(&link, 0).unwrap();
        assert_eq!(node.server, "example.com");
        assert_eq!(node.port, 8080);
        match &node.payload {
            NodePayload::Ssr(p) => {
                assert_eq!(p.protocol, "origin");
                assert_eq!(p.obfs, "plain");
                assert_eq!(p.password, "pass");
            }
            _ => panic!("expected SSR payload"),
        }
    }
}
