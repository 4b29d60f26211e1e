//! The pipeline's universal currency: `NodeDescriptor` and its satellites.
//!
//! Grounded on `models::proxy::Proxy` in the teacher, replaced per its own
//! Design Note ("variant node through one flat struct... should become a sum
//! type over the per-scheme payloads") with an enum over per-scheme payload
//! structs plus a shared header.

use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Wire protocol family. Exactly the eight variants named in the data model;
/// see DESIGN.md for why WireGuard/Hysteria/Hysteria2/Vless are excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeType {
    Vmess,
    Ss,
    Ssr,
    Trojan,
    Snell,
    Socks5,
    Http,
    Https,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Vmess => "VMess",
            NodeType::Ss => "SS",
            NodeType::Ssr => "SSR",
            NodeType::Trojan => "Trojan",
            NodeType::Snell => "Snell",
            NodeType::Socks5 => "SOCKS5",
            NodeType::Http => "HTTP",
            NodeType::Https => "HTTPS",
        }
    }
}

/// A three-valued flag distinguishing "not requested" from "explicitly
/// false". Unset must propagate as absence, never as a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tribool {
    #[default]
    Unset,
    True,
    False,
}

impl Tribool {
    pub fn from_option(o: Option<bool>) -> Self {
        match o {
            Some(true) => Tribool::True,
            Some(false) => Tribool::False,
            None => Tribool::Unset,
        }
    }

    pub fn as_option(&self) -> Option<bool> {
        match self {
            Tribool::True => Some(true),
            Tribool::False => Some(false),
            Tribool::Unset => None,
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Tribool::True)
    }

    /// Node-level value wins; otherwise fall back to a process/request
    /// default. Still unset if neither side is set.
    pub fn define(&self, default: Tribool) -> Tribool {
        match self {
            Tribool::Unset => default,
            v => *v,
        }
    }

    /// Insert into a JSON object only if set — implements the "unset must
    /// propagate as absence" invariant for emitters that build a JSON
    /// document before serializing it.
    pub fn apply_to_json(&self, map: &mut serde_json::Map<String, Value>, key: &str) {
        if let Some(v) = self.as_option() {
            map.insert(key.to_string(), json!(v));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SsPlugin {
    #[default]
    None,
    ObfsLocal,
    V2rayPlugin,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SsPayload {
    pub method: String,
    pub password: String,
    pub plugin: SsPlugin,
    /// URL-query-style string, e.g. `obfs=http;obfs-host=example.com`.
    pub plugin_opts: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SsrPayload {
    pub method: String,
    pub password: String,
    pub protocol: String,
    pub protocol_param: String,
    pub obfs: String,
    pub obfs_param: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    #[default]
    Tcp,
    Ws,
    Kcp,
    H2,
    Quic,
}

impl Transport {
    pub fn parse(s: &str) -> Transport {
        match s {
            "ws" => Transport::Ws,
            "kcp" => Transport::Kcp,
            "h2" => Transport::H2,
            "quic" => Transport::Quic,
            _ => Transport::Tcp,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Tcp => "tcp",
            Transport::Ws => "ws",
            Transport::Kcp => "kcp",
            Transport::H2 => "h2",
            Transport::Quic => "quic",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VmessPayload {
    pub uuid: String,
    pub alter_id: u32,
    pub transfer_protocol: Transport,
    /// "http" or "none".
    pub fake_type: String,
    pub host: String,
    pub path: String,
    pub tls_secure: bool,
    pub quic_secure: String,
    pub quic_secret: String,
    /// Cipher; "auto" unless the link specified one explicitly.
    pub cipher: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrojanPayload {
    pub password: String,
    pub sni: String,
    pub tls_secure: bool,
    pub transfer_protocol: Transport,
    pub host: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnellPayload {
    pub password: String,
    pub obfs: String,
    pub host: String,
    pub version: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPassPayload {
    pub username: String,
    pub password: String,
    pub tls_secure: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodePayload {
    Ss(SsPayload),
    Ssr(SsrPayload),
    Vmess(VmessPayload),
    Trojan(TrojanPayload),
    Snell(SnellPayload),
    Socks5(UserPassPayload),
    Http(UserPassPayload),
    Https(UserPassPayload),
}

impl NodePayload {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodePayload::Ss(_) => NodeType::Ss,
            NodePayload::Ssr(_) => NodeType::Ssr,
            NodePayload::Vmess(_) => NodeType::Vmess,
            NodePayload::Trojan(_) => NodeType::Trojan,
            NodePayload::Snell(_) => NodeType::Snell,
            NodePayload::Socks5(_) => NodeType::Socks5,
            NodePayload::Http(_) => NodeType::Http,
            NodePayload::Https(_) => NodeType::Https,
        }
    }
}

pub const NIL_UUID: &str = "00000000-0000-0000-0000-000000000000";

/// The pipeline's universal currency. Created by the subscription decoder
/// (via the link parser), mutated only by the normalizer (the `remarks`
/// field), consumed read-only by the group expander and dialect emitters.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDescriptor {
    pub group: String,
    pub group_id: i32,
    pub remarks: String,
    pub server: String,
    pub port: u16,
    pub udp: Tribool,
    pub tcp_fast_open: Tribool,
    pub skip_cert_verify: Tribool,
    pub tls13: Tribool,
    pub payload: NodePayload,
}

impl NodeDescriptor {
    pub fn node_type(&self) -> NodeType {
        self.payload.node_type()
    }

    /// `server` non-empty and `port` in range — see the data-model invariants.
    pub fn is_valid(&self) -> bool {
        !self.server.is_empty() && self.port != 0
    }

    /// Normalized JSON view of all fields, for emitters that prefer a
    /// uniform reader. Computed on demand rather than stored, so there is no
    /// stringly-typed round-trip between parser and emitter.
    pub fn raw_blob(&self) -> Value {
        let mut map: BTreeMap<&str, Value> = BTreeMap::new();
        map.insert("type", json!(self.node_type().as_str()));
        map.insert("group", json!(self.group));
        map.insert("group_id", json!(self.group_id));
        map.insert("remarks", json!(self.remarks));
        map.insert("server", json!(self.server));
        map.insert("port", json!(self.port));
        if let Some(v) = self.udp.as_option() {
            map.insert("udp", json!(v));
        }
        if let Some(v) = self.tcp_fast_open.as_option() {
            map.insert("tfo", json!(v));
        }
        if let Some(v) = self.skip_cert_verify.as_option() {
            map.insert("scv", json!(v));
        }
        let payload = serde_json::to_value(PayloadView(&self.payload)).unwrap_or(Value::Null);
        json!({ "header": map, "payload": payload })
    }
}

/// Serializable view over `NodePayload`; kept separate from `NodePayload`
/// itself so the payload enum need not derive `Serialize` for normal use.
struct PayloadView<'a>(&'a NodePayload);

impl<'a> serde::Serialize for PayloadView<'a> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut m = serializer.serialize_map(None)?;
        match self.0 {
            NodePayload::Ss(p) => {
                m.serialize_entry("method", &p.method)?;
                m.serialize_entry("password", &p.password)?;
                m.serialize_entry("plugin_opts", &p.plugin_opts)?;
            }
            NodePayload::Ssr(p) => {
                m.serialize_entry("method", &p.method)?;
                m.serialize_entry("password", &p.password)?;
                m.serialize_entry("protocol", &p.protocol)?;
                m.serialize_entry("obfs", &p.obfs)?;
            }
            NodePayload::Vmess(p) => {
                m.serialize_entry("uuid", &p.uuid)?;
                m.serialize_entry("alter_id", &p.alter_id)?;
                m.serialize_entry("network", p.transfer_protocol.as_str())?;
                m.serialize_entry("host", &p.host)?;
                m.serialize_entry("path", &p.path)?;
                m.serialize_entry("tls", &p.tls_secure)?;
            }
            NodePayload::Trojan(p) => {
                m.serialize_entry("password", &p.password)?;
                m.serialize_entry("sni", &p.sni)?;
            }
            NodePayload::Snell(p) => {
                m.serialize_entry("obfs", &p.obfs)?;
            }
            NodePayload::Socks5(p) | NodePayload::Http(p) | NodePayload::Https(p) => {
                m.serialize_entry("username", &p.username)?;
            }
        }
        m.end()
    }
}

/// One ruleset entry. `rule_content` is a lazily-fetched string supplied by
/// the external fetch collaborator; the core only interprets it once forced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleType {
    Surge,
    QuanX,
    ClashDomain,
    ClashIpCidr,
    ClashClassical,
}

impl RuleType {
    /// Recognize the `TYPE,` prefix a ruleset URL may be tagged with; see
    /// `spec.md` §3/§4.E.1 for the full prefix table.
    pub fn parse_prefix(s: &str) -> Option<RuleType> {
        match s {
            "surge" => Some(RuleType::Surge),
            "quanx" => Some(RuleType::QuanX),
            "domain" => Some(RuleType::ClashDomain),
            "ipcidr" | "ip-cidr" => Some(RuleType::ClashIpCidr),
            "clash-domain" => Some(RuleType::ClashDomain),
            "clash-classical" => Some(RuleType::ClashClassical),
            _ => None,
        }
    }
}

/// One row of the user's ruleset list before fetch: the group it is
/// appended to, the path/url it is sourced from, and its dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulesetConfig {
    pub url: String,
    pub group: String,
    pub interval: u32,
}

/// A lazily-fetched ruleset body, shared between every consumer that asks
/// for the same URL during one emission. The fetch collaborator (§13) is
/// the only thing that ever calls `OnceLock::set`; the core only reads.
#[derive(Debug, Clone)]
pub struct LazyRuleContent(std::sync::Arc<std::sync::OnceLock<String>>);

impl LazyRuleContent {
    pub fn new() -> Self {
        LazyRuleContent(std::sync::Arc::new(std::sync::OnceLock::new()))
    }

    pub fn resolved(content: String) -> Self {
        let cell = std::sync::OnceLock::new();
        let _ = cell.set(content);
        LazyRuleContent(std::sync::Arc::new(cell))
    }

    pub fn get(&self) -> Option<&str> {
        self.0.get().map(|s| s.as_str())
    }

    /// Force the cell with `f` if not already resolved; returns the content
    /// either way.
    pub fn get_or_try_init<E>(&self, f: impl FnOnce() -> Result<String, E>) -> Result<&str, E> {
        self.0.get_or_try_init(f).map(|s| s.as_str())
    }
}

impl Default for LazyRuleContent {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for LazyRuleContent {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

/// A ruleset entry after the fetch step: the inline `[]`-prefixed literal
/// rule, or a URL whose body is resolved lazily and shared by `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct RulesetEntry {
    pub rule_group: String,
    pub rule_path: String,
    pub rule_type: RuleType,
    pub rule_content: LazyRuleContent,
    pub update_interval: u32,
}

/// Recognized option set. See `spec.md` §3 for the authoritative list.
#[derive(Debug, Clone)]
pub struct ExtraSettings {
    pub enable_rule_generator: bool,
    pub overwrite_original_rules: bool,
    pub add_emoji: bool,
    pub remove_emoji: bool,
    pub append_proxy_type: bool,
    pub nodelist: bool,
    pub sort_flag: bool,
    pub filter_deprecated: bool,
    pub clash_new_field_name: bool,
    pub clash_script: bool,
    pub surge_ssr_path: String,
    pub managed_config_prefix: String,
    pub quanx_dev_id: String,
    pub udp: Tribool,
    pub tfo: Tribool,
    pub skip_cert_verify: Tribool,
    pub tls13: Tribool,
    pub clash_classical_ruleset: bool,
    pub clash_proxies_style: ClashProxiesStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClashProxiesStyle {
    Flow,
    Block,
}

impl Default for ExtraSettings {
    fn default() -> Self {
        ExtraSettings {
            enable_rule_generator: true,
            overwrite_original_rules: false,
            add_emoji: false,
            remove_emoji: false,
            append_proxy_type: false,
            nodelist: false,
            sort_flag: false,
            filter_deprecated: false,
            clash_new_field_name: true,
            clash_script: false,
            surge_ssr_path: String::new(),
            managed_config_prefix: String::new(),
            quanx_dev_id: String::new(),
            udp: Tribool::Unset,
            tfo: Tribool::Unset,
            skip_cert_verify: Tribool::Unset,
            tls13: Tribool::Unset,
            clash_classical_ruleset: false,
            clash_proxies_style: ClashProxiesStyle::Flow,
        }
    }
}

/// Proxy-group type, the second token of a `GroupExpr` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupType {
    Select,
    UrlTest,
    Fallback,
    LoadBalance,
    Ssid,
}

impl GroupType {
    pub fn parse(s: &str) -> Option<GroupType> {
        match s {
            "select" => Some(GroupType::Select),
            "url-test" => Some(GroupType::UrlTest),
            "fallback" => Some(GroupType::Fallback),
            "load-balance" => Some(GroupType::LoadBalance),
            "ssid" => Some(GroupType::Ssid),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupType::Select => "select",
            GroupType::UrlTest => "url-test",
            GroupType::Fallback => "fallback",
            GroupType::LoadBalance => "load-balance",
            GroupType::Ssid => "ssid",
        }
    }
}

/// Parsed form of a `GroupExpr` string (spec.md §3): backtick-delimited
/// tokens, name and type first, member-selection rules in the middle,
/// probe URL/interval trailing for test/fallback/load-balance groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyGroupConfig {
    pub name: String,
    pub group_type: GroupType,
    pub rules: Vec<String>,
    pub url: Option<String>,
    pub interval: Option<u32>,
}

impl ProxyGroupConfig {
    /// Parse a backtick-delimited `GroupExpr` string.
    pub fn parse(expr: &str) -> Option<ProxyGroupConfig> {
        let mut tokens = expr.split('`');
        let name = tokens.next()?.to_string();
        let group_type = GroupType::parse(tokens.next()?)?;
        let mut rest: Vec<&str> = tokens.collect();

        let (url, interval) = match group_type {
            GroupType::UrlTest | GroupType::Fallback | GroupType::LoadBalance if rest.len() >= 2 => {
                let interval = rest.pop().and_then(|s| s.parse::<u32>().ok());
                let url = rest.pop().map(|s| s.to_string());
                (url, interval)
            }
            _ => (None, None),
        };

        Some(ProxyGroupConfig {
            name,
            group_type,
            rules: rest.into_iter().map(|s| s.to_string()).collect(),
            url,
            interval,
        })
    }
}
