//! Component A: the multi-scheme link parser.
//!
//! `parse_link` dispatches on scheme prefix to a per-scheme module; each
//! returns a fully-populated `NodeDescriptor` or a `ParseError`. Grounded on
//! the teacher's `parser::explodes::*` / `parser::proxy::explodes::*`
//! functions, re-expressed against the sum-typed `NodeDescriptor` instead of
//! mutating a shared `&mut Proxy` out-parameter.

pub mod http;
pub mod netch;
pub mod snell;
pub mod socks5;
pub mod ss;
pub mod ssr;
pub mod trojan;
pub mod vmess;

use crate::error::ParseError;
use crate::node::NodeDescriptor;

pub const SS_DEFAULT_GROUP: &str = "SSProvider";
pub const SSR_DEFAULT_GROUP: &str = "SSRProvider";
pub const VMESS_DEFAULT_GROUP: &str = "VMessProvider";
pub const TROJAN_DEFAULT_GROUP: &str = "TrojanProvider";
pub const SNELL_DEFAULT_GROUP: &str = "SnellProvider";
pub const SOCKS_DEFAULT_GROUP: &str = "SOCKS5Provider";
pub const HTTP_DEFAULT_GROUP: &str = "HTTPProvider";

/// Parse one link of any supported scheme into a `NodeDescriptor`.
pub fn parse_link(raw: &str, group_id: i32) -> Result<NodeDescriptor, ParseError> {
    let raw = raw.trim();
    if raw.starts_with("vmess://") || raw.starts_with("vmess1://") {
        vmess::parse(raw, group_id)
    } else if raw.starts_with("ssr://") {
        ssr::parse(raw, group_id)
    } else if raw.starts_with("ss://") {
        ss::parse(raw, group_id)
    } else if raw.starts_with("trojan://") {
        trojan::parse(raw, group_id)
    } else if raw.starts_with("snell://") {
        snell::parse(raw, group_id)
    } else if raw.starts_with("Netch://") {
        netch::parse(raw, group_id)
    } else if raw.starts_with("socks://")
        || raw.starts_with("socks5://")
        || raw.starts_with("tg://socks")
        || raw.starts_with("https://t.me/socks")
    {
        // `https://t.me/socks` must be checked ahead of the generic
        // `https://` branch below, which would otherwise claim it first.
        socks5::parse(raw, group_id)
    } else if raw.starts_with("http://") || raw.starts_with("https://") {
        http::parse(raw, group_id)
    } else {
        let scheme = raw.split("://").next().unwrap_or(raw).to_string();
        Err(ParseError::UnknownScheme(scheme))
    }
}

#[cfg(test)]
mod tests {
    use base64::{engine::general_purpose::STANDARD, Engine};

    use super::*;

    #[test]
    fn vmess1_prefix_dispatches_to_vmess_parser() {
        let body = serde_json::json!({"v": "2", "ps": "n", "add": "1.2.3.4", "port": "443", "id": "", "aid": "0", "net": "tcp"});
        let encoded = STANDARD.encode(body.to_string());
        let link = format!("vmess1://{}", encoded);
        assert!(parse_link(&link, 0).is_ok());
    }

    #[test]
    fn tg_socks_and_t_me_socks_prefixes_dispatch_to_socks5_parser() {
        let a = parse_link("tg://socks?server=1.2.3.4&port=1080", 0).unwrap();
        let b = parse_link("https://t.me/socks?server=1.2.3.4&port=1080", 0).unwrap();
        assert_eq!(a.node_type(), crate::node::NodeType::Socks5);
        assert_eq!(b.node_type(), crate::node::NodeType::Socks5);
    }

    #[test]
    fn plain_https_link_still_dispatches_to_http_parser() {
        let node = parse_link("https://_dummy_host_/?server=1.2.3.4&port=443", 0).unwrap();
        assert_eq!(node.node_type(), crate::node::NodeType::Http);
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        assert!(parse_link("wireguard://abc", 0).is_err());
    }
}
