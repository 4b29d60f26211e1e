//! HTTP/HTTPS proxy link parsing: query-parameter shape
//! `http://?server=&port=&user=&pass=&remarks=` (no standard URI form exists
//! for this scheme, matching the teacher's source).
//!
//! Grounded on `parser::explodes::http::explode_http`.

use url::Url;

use crate::error::ParseError;
use crate::node::{NodeDescriptor, NodePayload, Tribool, UserPassPayload};

use super::HTTP_DEFAULT_GROUP;

pub fn parse(raw: &str, group_id: i32) -> Result<NodeDescriptor, ParseError> {
    let url = Url::parse(raw).map_err(|_| ParseError::InvalidJson("malformed http uri".to_string()))?;

    let params: std::collections::HashMap<String, String> =
        url.query_pairs().map(|(k, v)| (k.to_string(), v.to_string())).collect();

    let server = params.get("server").cloned().unwrap_or_default();
    let port_str = params.get("port").cloned().unwrap_or_default();
    if server.is_empty() || port_str == "0" {
        return Err(ParseError::MissingField("server"));
    }
    let port: u16 = port_str.parse().map_err(|_| ParseError::InvalidPort(port_str.clone()))?;
    if port == 0 {
        return Err(ParseError::InvalidPort("0".to_string()));
    }

    let username = params.get("user").cloned().unwrap_or_default();
    let password = params.get("pass").cloned().unwrap_or_default();
    let group = params.get("group").filter(|s| !s.is_empty()).cloned().unwrap_or_else(|| HTTP_DEFAULT_GROUP.to_string());
    let mut remark = params.get("remarks").cloned().unwrap_or_default();
    if remark.is_empty() {
        remark = format!("{}:{}", server, port);
    }

    let is_https = raw.contains("/https");

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
        payload: if is_https {
            NodePayload::Https(UserPassPayload { username, password, tls_secure: true })
        } else {
            NodePayload::Http(UserPassPayload { username, password, tls_secure: false })
        },
    })
}
