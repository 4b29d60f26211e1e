//! Process-wide configuration (§10) and per-request overrides.
//!
//! Grounded on the teacher's flat `Settings` struct (root `settings.rs`) and
//! `parser::parse_settings::ParseSettings`. The global instance is wrapped
//! in an `Arc` swapped behind a lock rather than mutated in place, so an
//! emission that reads `Settings::current()` once keeps a consistent
//! snapshot even if a concurrent reload swaps in a new configuration
//! mid-flight.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use configparser::ini::Ini;
use lazy_static::lazy_static;

use crate::node::Tribool;

#[derive(Debug, Clone)]
pub struct Settings {
    pub listen_address: String,
    pub listen_port: u16,
    pub api_access_token: String,
    pub base_path: String,
    pub default_urls: String,
    pub insert_urls: String,
    pub prepend_insert: bool,
    pub exclude_remarks: Vec<String>,
    pub include_remarks: Vec<String>,
    pub proxy_subscription: String,
    pub proxy_ruleset: String,
    pub proxy_config: String,
    pub managed_config_prefix: String,
    pub enable_rule_generator: bool,
    pub overwrite_original_rules: bool,
    pub add_emoji: bool,
    pub remove_emoji: bool,
    pub append_proxy_type: bool,
    pub sort_flag: bool,
    pub filter_deprecated: bool,
    pub clash_new_field_name: bool,
    pub udp: Tribool,
    pub tfo: Tribool,
    pub skip_cert_verify: Tribool,
    pub tls13: Tribool,
    pub surge_ssr_path: String,
    pub quanx_dev_id: String,
    pub clash_base: String,
    pub surge_base: String,
    pub mellow_base: String,
    pub quan_base: String,
    pub quanx_base: String,
    pub ssd_base: String,
    pub ssub_base: String,
    pub cache_subscription: u32,
    pub cache_config: u32,
    pub cache_ruleset: u32,
    pub max_concur_threads: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            listen_address: "127.0.0.1".to_string(),
            listen_port: 25500,
            api_access_token: String::new(),
            base_path: "base".to_string(),
            default_urls: String::new(),
            insert_urls: String::new(),
            prepend_insert: true,
            exclude_remarks: Vec::new(),
            include_remarks: Vec::new(),
            proxy_subscription: String::new(),
            proxy_ruleset: String::new(),
            proxy_config: String::new(),
            managed_config_prefix: String::new(),
            enable_rule_generator: true,
            overwrite_original_rules: false,
            add_emoji: false,
            remove_emoji: false,
            append_proxy_type: false,
            sort_flag: false,
            filter_deprecated: true,
            clash_new_field_name: true,
            udp: Tribool::Unset,
            tfo: Tribool::Unset,
            skip_cert_verify: Tribool::Unset,
            tls13: Tribool::Unset,
            surge_ssr_path: String::new(),
            quanx_dev_id: String::new(),
            clash_base: String::new(),
            surge_base: String::new(),
            mellow_base: String::new(),
            quan_base: String::new(),
            quanx_base: String::new(),
            ssd_base: String::new(),
            ssub_base: String::new(),
            cache_subscription: 60,
            cache_config: 300,
            cache_ruleset: 21600,
            max_concur_threads: 4,
        }
    }
}

fn parse_bool(v: &str, default: bool) -> bool {
    match v.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => true,
        "false" | "0" => false,
        _ => default,
    }
}

fn parse_tribool(v: Option<&str>) -> Tribool {
    match v.map(|s| s.trim().to_ascii_lowercase()) {
        Some(s) if s == "true" || s == "1" => Tribool::True,
        Some(s) if s == "false" || s == "0" => Tribool::False,
        _ => Tribool::Unset,
    }
}

impl Settings {
    /// Load from an INI file. Unrecognized keys are ignored; missing keys
    /// keep the default. Matches the teacher's "load if present, otherwise
    /// proceed with defaults" behavior (see `main.rs`).
    pub fn load_from_ini(path: &str) -> Result<Settings, String> {
        let mut ini = Ini::new();
        ini.load(path)?;
        let mut s = Settings::default();

        let get = |section: &str, key: &str| ini.get(section, key);

        if let Some(v) = get("common", "api_access_token") {
            s.api_access_token = v;
        }
        if let Some(v) = get("common", "base_path") {
            s.base_path = v;
        }
        if let Some(v) = get("common", "default_url") {
            s.default_urls = v;
        }
        if let Some(v) = get("common", "insert_url") {
            s.insert_urls = v;
        }
        if let Some(v) = get("common", "prepend_insert_url") {
            s.prepend_insert = parse_bool(&v, s.prepend_insert);
        }
        if let Some(v) = get("common", "exclude_remarks") {
            s.exclude_remarks = v.split('|').map(|s| s.to_string()).collect();
        }
        if let Some(v) = get("common", "include_remarks") {
            s.include_remarks = v.split('|').map(|s| s.to_string()).collect();
        }
        if let Some(v) = get("common", "managed_config_prefix") {
            s.managed_config_prefix = v;
        }
        if let Some(v) = get("server", "listen") {
            s.listen_address = v;
        }
        if let Some(v) = get("server", "port") {
            s.listen_port = v.parse().unwrap_or(s.listen_port);
        }
        if let Some(v) = get("server", "threads") {
            s.max_concur_threads = v.parse().unwrap_or(s.max_concur_threads);
        }
        if let Some(v) = get("node_pref", "add_emoji") {
            s.add_emoji = parse_bool(&v, s.add_emoji);
        }
        if let Some(v) = get("node_pref", "remove_emoji") {
            s.remove_emoji = parse_bool(&v, s.remove_emoji);
        }
        if let Some(v) = get("node_pref", "append_sub_userinfo") {
            s.append_proxy_type = parse_bool(&v, s.append_proxy_type);
        }
        if let Some(v) = get("node_pref", "sort_flag") {
            s.sort_flag = parse_bool(&v, s.sort_flag);
        }
        if let Some(v) = get("node_pref", "filter_deprecated") {
            s.filter_deprecated = parse_bool(&v, s.filter_deprecated);
        }
        if let Some(v) = get("node_pref", "clash_use_new_field_name") {
            s.clash_new_field_name = parse_bool(&v, s.clash_new_field_name);
        }
        s.udp = parse_tribool(get("node_pref", "udp_flag").as_deref()).define(s.udp);
        s.tfo = parse_tribool(get("node_pref", "tcp_fast_open_flag").as_deref()).define(s.tfo);
        s.skip_cert_verify =
            parse_tribool(get("node_pref", "skip_cert_verify_flag").as_deref()).define(s.skip_cert_verify);
        s.tls13 = parse_tribool(get("node_pref", "tls13_flag").as_deref()).define(s.tls13);
        if let Some(v) = get("surge_external_proxy", "surge_ssr_path") {
            s.surge_ssr_path = v;
        }
        if let Some(v) = get("common", "quanx_device_id") {
            s.quanx_dev_id = v;
        }
        if let Some(v) = get("common", "clash_rule_base") {
            s.clash_base = v;
        }
        if let Some(v) = get("common", "surge_rule_base") {
            s.surge_base = v;
        }
        if let Some(v) = get("common", "mellow_rule_base") {
            s.mellow_base = v;
        }
        if let Some(v) = get("common", "quan_rule_base") {
            s.quan_base = v;
        }
        if let Some(v) = get("common", "quanx_rule_base") {
            s.quanx_base = v;
        }
        if let Some(v) = get("common", "ssd_rule_base") {
            s.ssd_base = v;
        }
        if let Some(v) = get("common", "surfboard_rule_base") {
            s.ssub_base = v;
        }
        if let Some(v) = get("common", "overwrite_original_rules") {
            s.overwrite_original_rules = parse_bool(&v, s.overwrite_original_rules);
        }
        if let Some(v) = get("common", "enable_rule_generator") {
            s.enable_rule_generator = parse_bool(&v, s.enable_rule_generator);
        }
        if let Some(v) = get("cache", "subscription") {
            s.cache_subscription = v.parse().unwrap_or(s.cache_subscription);
        }
        if let Some(v) = get("cache", "config") {
            s.cache_config = v.parse().unwrap_or(s.cache_config);
        }
        if let Some(v) = get("cache", "ruleset") {
            s.cache_ruleset = v.parse().unwrap_or(s.cache_ruleset);
        }

        Ok(s)
    }

    /// The current process-wide snapshot. Cloning the `Arc` is O(1); the
    /// pointee is never mutated in place.
    pub fn current() -> Arc<Settings> {
        GLOBAL.read().unwrap().clone()
    }

    /// Atomically install a new snapshot; in-flight readers keep the `Arc`
    /// they already cloned.
    pub fn set_current(settings: Settings) {
        *GLOBAL.write().unwrap() = Arc::new(settings);
    }
}

lazy_static! {
    static ref GLOBAL: RwLock<Arc<Settings>> = RwLock::new(Arc::new(Settings::default()));
}

/// Load settings from `path` if it exists and install them as current;
/// otherwise leave the default snapshot in place. Matches `main.rs`'s
/// "load if present, proceed with defaults" convention.
pub fn init_settings(path: &str) -> Result<(), String> {
    if !std::path::Path::new(path).exists() {
        return Ok(());
    }
    let settings = Settings::load_from_ini(path)?;
    Settings::set_current(settings);
    Ok(())
}

/// Case-insensitive string, used as a `HashMap` key for HTTP-style headers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CaseInsensitiveString(String);

impl FromStr for CaseInsensitiveString {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(CaseInsensitiveString(s.to_ascii_lowercase()))
    }
}

impl std::fmt::Display for CaseInsensitiveString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-request overrides layered over the process-wide `Settings` snapshot.
/// Distinct from `Settings` itself: a request may authorize local-file
/// access or narrow the remark filter without touching global state.
#[derive(Debug, Clone)]
pub struct ParseSettings {
    pub proxy: Option<String>,
    pub exclude_remarks: Option<Vec<String>>,
    pub include_remarks: Option<Vec<String>>,
    pub sub_info: Option<String>,
    pub authorized: bool,
    pub request_header: Option<HashMap<CaseInsensitiveString, String>>,
}

impl Default for ParseSettings {
    fn default() -> Self {
        let settings = Settings::current();
        ParseSettings {
            proxy: if settings.proxy_subscription.is_empty() {
                None
            } else {
                Some(settings.proxy_subscription.clone())
            },
            exclude_remarks: if settings.exclude_remarks.is_empty() {
                None
            } else {
                Some(settings.exclude_remarks.clone())
            },
            include_remarks: if settings.include_remarks.is_empty() {
                None
            } else {
                Some(settings.include_remarks.clone())
            },
            sub_info: None,
            authorized: !settings.api_access_token.is_empty(),
            request_header: None,
        }
    }
}

pub fn create_parse_settings() -> ParseSettings {
    ParseSettings::default()
}

pub fn create_authorized_settings() -> ParseSettings {
    let mut settings = ParseSettings::default();
    settings.authorized = true;
    settings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_known_keys_and_ignores_unknown_ones() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[common]\napi_access_token = secret\nexclude_remarks = Expired|Traffic\nbogus_key = 1\n\n[server]\nlisten = 0.0.0.0\nport = 8080\n"
        )
        .unwrap();
        let settings = Settings::load_from_ini(file.path().to_str().unwrap()).unwrap();
        assert_eq!(settings.api_access_token, "secret");
        assert_eq!(settings.exclude_remarks, vec!["Expired", "Traffic"]);
        assert_eq!(settings.listen_address, "0.0.0.0");
        assert_eq!(settings.listen_port, 8080);
    }

    #[test]
    fn missing_file_leaves_defaults_in_place() {
        init_settings("/nonexistent/path/pref.ini").unwrap();
        assert_eq!(Settings::current().listen_port, 25500);
    }
}
