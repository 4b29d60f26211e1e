//! SOCKS5 link parsing: Telegram-style query shape
//! `socks://?server=&port=&user=&pass=&remarks=`, also reached via the
//! `tg://socks` and `https://t.me/socks` prefixes.
//!
//! Grounded on `parser::explodes::http::explode_http`, which spec.md §4.A
//! states this scheme shares its query-parameter shape with.

use url::Url;

use crate::error::ParseError;
use crate::node::{NodeDescriptor, NodePayload, Tribool, UserPassPayload};

use super::SOCKS_DEFAULT_GROUP;

pub fn parse(raw: &str, group_id: i32) -> Result<NodeDescriptor, ParseError> {
    let url = Url::parse(raw).map_err(|_| ParseError::InvalidJson("malformed socks uri".to_string()))?;

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
    let group = params.get("group").filter(|s| !s.is_empty()).cloned().unwrap_or_else(|| SOCKS_DEFAULT_GROUP.to_string());
    let mut remark = params.get("remarks").cloned().unwrap_or_default();
    if remark.is_empty() {
        remark = format!("{}:{}", server, port);
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
        payload: NodePayload::Socks5(UserPassPayload { username, password, tls_secure: false }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_socks_link_from_query_params() {
        let node = parse("socks://_dummy_host_/?server=1.2.3.4&port=1080&user=u&pass=p", 0).unwrap();
        assert_eq!(node.server, "1.2.3.4");
        assert_eq!(node.port, 1080);
        match &node.payload {
            NodePayload::Socks5(p) => {
                assert_eq!(p.username, "u");
                assert_eq!(p.password, "p");
            }
            _ => panic!("expected socks5 payload"),
        }
    }

    #[test]
    fn parses_telegram_socks_link() {
        let node = parse("tg://socks?server=1.2.3.4&port=1080&user=u&pass=p", 0).unwrap();
        assert_eq!(node.server, "1.2.3.4");
        assert_eq!(node.port, 1080);
    }

    #[test]
    fn parses_t_me_socks_link() {
        let node = parse("https://t.me/socks?server=1.2.3.4&port=1080&user=u&pass=p", 0).unwrap();
        assert_eq!(node.server, "1.2.3.4");
        assert_eq!(node.port, 1080);
    }

    #[test]
    fn defaults_remark_to_server_port() {
        let node = parse("socks://_dummy_host_/?server=1.2.3.4&port=1080", 0).unwrap();
        assert_eq!(node.remarks, "1.2.3.4:1080");
    }
}
