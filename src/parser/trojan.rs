//! Trojan link parsing: `trojan://password@host:port?sni=&type=ws#remark`.
//!
//! Grounded on `parser::explodes::trojan::explode_trojan`.

use url::Url;

use crate::error::ParseError;
use crate::node::{NodeDescriptor, NodePayload, Transport, Tribool, TrojanPayload};
use crate::utils::url::url_decode;

use super::TROJAN_DEFAULT_GROUP;

pub fn parse(raw: &str, group_id: i32) -> Result<NodeDescriptor, ParseError> {
    let url = Url::parse(raw).map_err(|_| ParseError::InvalidJson("malformed trojan uri".to_string()))?;

    let password = url.username();
    if password.is_empty() {
        return Err(ParseError::MissingField("password"));
    }
    let host = url.host_str().ok_or(ParseError::MissingField("host"))?.to_string();
    let port = url.port().unwrap_or(443);
    if port == 0 {
        return Err(ParseError::InvalidPort("0".to_string()));
    }

    let params: std::collections::HashMap<String, String> =
        url.query_pairs().map(|(k, v)| (k.to_string(), v.to_string())).collect();

    let sni = params.get("sni").or_else(|| params.get("peer")).cloned().unwrap_or_default();

    let mut transfer_protocol = Transport::Tcp;
    let mut path = String::new();
    if params.get("ws").map(|v| v == "1").unwrap_or(false) {
        transfer_protocol = Transport::Ws;
        path = params.get("wspath").cloned().unwrap_or_default();
    } else if params.get("type").map(|v| v == "ws").unwrap_or(false) {
        transfer_protocol = Transport::Ws;
        if let Some(p) = params.get("path") {
            path = if p.starts_with("%2F") { url_decode(p) } else { p.clone() };
        }
    }
    let host_header = params.get("host").cloned().unwrap_or_default();

    let group = params.get("group").map(|s| url_decode(s)).unwrap_or_else(|| TROJAN_DEFAULT_GROUP.to_string());

    let mut remark = url.fragment().unwrap_or("").to_string();
    if remark.is_empty() {
        remark = format!("{} ({})", host, port);
    }

    Ok(NodeDescriptor {
        group,
        group_id,
        remarks: remark,
        server: host,
        port,
        udp: Tribool::Unset,
        tcp_fast_open: Tribool::from_option(params.get("tfo").map(|s| s == "1" || s.eq_ignore_ascii_case("true"))),
        skip_cert_verify: Tribool::from_option(
            params.get("allowInsecure").map(|s| s == "1" || s.eq_ignore_ascii_case("true")),
        ),
        tls13: Tribool::Unset,
        payload: NodePayload::Trojan(TrojanPayload {
            password: password.to_string(),
            sni,
            tls_secure: true,
            transfer_protocol,
            host: host_header,
            path,
        }),
    })
}
