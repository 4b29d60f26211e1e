//! Snell link parsing: `snell://psk@host:port?version=&obfs=&obfs-host=#remark`.
//!
//! The teacher carries no link parser for this scheme (only the single-link
//! emitter, `generator::config::formats::single::proxy_to_uri`, builds this
//! URI). Grounded on that builder, read in reverse.

use url::Url;

use crate::error::ParseError;
use crate::node::{NodeDescriptor, NodePayload, SnellPayload, Tribool};

use super::SNELL_DEFAULT_GROUP;

pub fn parse(raw: &str, group_id: i32) -> Result<NodeDescriptor, ParseError> {
    let url = Url::parse(raw).map_err(|_| ParseError::InvalidJson("malformed snell uri".to_string()))?;

    let psk = url.username();
    if psk.is_empty() {
        return Err(ParseError::MissingField("psk"));
    }
    let server = url.host_str().ok_or(ParseError::MissingField("host"))?.to_string();
    let port = url.port().unwrap_or(0);
    if port == 0 {
        return Err(ParseError::InvalidPort("0".to_string()));
    }

    let params: std::collections::HashMap<String, String> =
        url.query_pairs().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    let obfs = params.get("obfs").cloned().unwrap_or_default();
    let obfs_host = params.get("obfs-host").cloned().unwrap_or_default();
    let version: u16 = params.get("version").and_then(|v| v.parse().ok()).unwrap_or(3);

    let mut remark = url.fragment().unwrap_or("").to_string();
    if remark.is_empty() {
        remark = format!("{} ({})", server, port);
    }

    Ok(NodeDescriptor {
        group: SNELL_DEFAULT_GROUP.to_string(),
        group_id,
        remarks: remark,
        server,
        port,
        udp: Tribool::Unset,
        tcp_fast_open: Tribool::Unset,
        skip_cert_verify: Tribool::Unset,
        tls13: Tribool::Unset,
        payload: NodePayload::Snell(SnellPayload { password: psk.to_string(), obfs, host: obfs_host, version }),
    })
}
