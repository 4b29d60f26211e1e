//! Mellow dialect emitter: an `[Endpoint]` INI-like proxy list.
//!
//! Grounded on `generator::config::formats::mellow`, narrowed to spec.md
//! §6's matrix (SS without a plugin, Vmess, Socks5, HTTP(S); no SSR, unlike
//! the teacher's own emitter which also handles SSR). Group emission is
//! deliberately left out: Mellow's proxy-group equivalent has no probe-URL
//! or fallback-interval fields in this crate, a gap preserved as specified
//! rather than guessed at (see DESIGN.md).

use configparser::ini::Ini;

use crate::error::Diagnostic;
use crate::node::{NodeDescriptor, NodePayload, RulesetEntry, SsPlugin};
use crate::ruleset::{splice_rules, SpliceTarget};

/// Remove a `[Section]` and everything up to (not including) the next
/// `[Section]` header, or end of string if there is none. Grounded on the
/// same splice the Surge emitter uses for its own base template merge.
fn strip_section(base: &mut String, section: &str) {
    if let Some(start) = base.find(section) {
        if let Some(next) = base[start + section.len()..].find('[') {
            let end = start + section.len() + next;
            base.replace_range(start..end, "");
        } else {
            base.truncate(start);
        }
    }
}

fn node_to_line(node: &NodeDescriptor) -> Option<String> {
    match &node.payload {
        NodePayload::Ss(p) => {
            if p.plugin != SsPlugin::None {
                return None;
            }
            Some(format!(
                "{} = ss, {}, {}, encrypt-method={}, password={}",
                node.remarks, node.server, node.port, p.method, p.password
            ))
        }
        NodePayload::Vmess(p) => Some(format!(
            "{} = vmess, {}, {}, uuid={}, security={}",
            node.remarks, node.server, node.port, p.uuid, if p.cipher.is_empty() { "auto" } else { &p.cipher }
        )),
        NodePayload::Socks5(p) => {
            let mut l = format!("{} = socks5, {}, {}", node.remarks, node.server, node.port);
            if !p.username.is_empty() {
                l.push_str(&format!(", username={}", p.username));
            }
            if !p.password.is_empty() {
                l.push_str(&format!(", password={}", p.password));
            }
            Some(l)
        }
        NodePayload::Http(p) | NodePayload::Https(p) => {
            let kind = if node.node_type() == crate::node::NodeType::Https { "https" } else { "http" };
            let mut l = format!("{} = {}, {}, {}", node.remarks, kind, node.server, node.port);
            if !p.username.is_empty() {
                l.push_str(&format!(", username={}", p.username));
            }
            if !p.password.is_empty() {
                l.push_str(&format!(", password={}", p.password));
            }
            Some(l)
        }
        NodePayload::Ssr(_) | NodePayload::Trojan(_) | NodePayload::Snell(_) => None,
    }
}

/// Merge freshly-built `[Endpoint]`/`[Rule]` text into a base Mellow
/// template, the same way the Surge emitter merges into its own base
/// template. `base_template` is validated as INI before splicing; an empty
/// template means there is nothing to merge into.
pub fn emit(
    base_template: &str,
    nodes: &[NodeDescriptor],
    rulesets: &[RulesetEntry],
    enable_rule_generator: bool,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<String, crate::error::TemplateError> {
    let mut base = base_template.to_string();
    if !base.trim().is_empty() {
        Ini::new().read(base.clone()).map_err(crate::error::TemplateError::InvalidIni)?;
    }

    let mut out = String::from("[Endpoint]\n");
    for node in nodes {
        match node_to_line(node) {
            Some(line) => {
                out.push_str(&line);
                out.push('\n');
            }
            None => diagnostics.push(Diagnostic::CapabilityMismatch {
                remark: node.remarks.clone(),
                target: "Mellow".to_string(),
                reason: format!("{:?} not supported by Mellow", node.node_type()),
            }),
        }
    }

    let mut rule_config = String::new();
    if enable_rule_generator {
        rule_config.push_str("\n[Rule]\n");
        for line in splice_rules(rulesets, SpliceTarget::Surge { version: 3 }) {
            rule_config.push_str(&line);
            rule_config.push('\n');
        }
    }

    strip_section(&mut base, "[Endpoint]");
    strip_section(&mut base, "[Rule]");

    let mut result = String::new();
    if !base.is_empty() {
        result.push_str(&base);
        if !base.ends_with('\n') {
            result.push('\n');
        }
    }
    result.push_str(&out);
    result.push_str(&rule_config);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{SsPayload, SsPlugin, Tribool};

    #[test]
    fn ss_with_plugin_is_unsupported() {
        let node = NodeDescriptor {
            group: "g".to_string(),
            group_id: 0,
            remarks: "Home".to_string(),
            server: "1.2.3.4".to_string(),
            port: 8388,
            udp: Tribool::Unset,
            tcp_fast_open: Tribool::Unset,
            skip_cert_verify: Tribool::Unset,
            tls13: Tribool::Unset,
            payload: NodePayload::Ss(SsPayload {
                method: "aes-256-gcm".to_string(),
                password: "pass".to_string(),
                plugin: SsPlugin::ObfsLocal,
                plugin_opts: "obfs=http".to_string(),
            }),
        };
        let mut diags = Vec::new();
        emit("", &[node], &[], false, &mut diags).unwrap();
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn ssr_is_never_supported_by_mellow() {
        use crate::node::SsrPayload;
        let node = NodeDescriptor {
            group: "g".to_string(),
            group_id: 0,
            remarks: "SsrHome".to_string(),
            server: "1.2.3.4".to_string(),
            port: 8388,
            udp: Tribool::Unset,
            tcp_fast_open: Tribool::Unset,
            skip_cert_verify: Tribool::Unset,
            tls13: Tribool::Unset,
            payload: NodePayload::Ssr(SsrPayload::default()),
        };
        let mut diags = Vec::new();
        let out = emit("", &[node], &[], false, &mut diags).unwrap();
        assert!(!out.contains("SsrHome"));
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn base_template_is_preserved_and_merged_into() {
        let base = "[General]\nloglevel = notify\n\n[Endpoint]\nOld = ss, 9.9.9.9, 1, encrypt-method=rc4, password=x\n";
        use crate::node::SsPayload;
        let node = NodeDescriptor {
            group: "g".to_string(),
            group_id: 0,
            remarks: "Home".to_string(),
            server: "1.2.3.4".to_string(),
            port: 8388,
            udp: Tribool::Unset,
            tcp_fast_open: Tribool::Unset,
            skip_cert_verify: Tribool::Unset,
            tls13: Tribool::Unset,
            payload: NodePayload::Ss(SsPayload {
                method: "aes-256-gcm".to_string(),
                password: "pass".to_string(),
                plugin: SsPlugin::None,
                plugin_opts: String::new(),
            }),
        };
        let mut diags = Vec::new();
        let out = emit(base, &[node], &[], false, &mut diags).unwrap();
        assert!(out.contains("[General]"));
        assert!(out.contains("Home = ss"));
        assert!(!out.contains("Old = ss"));
    }

    #[test]
    fn malformed_ini_template_is_fatal() {
        let mut diags = Vec::new();
        let err = emit("this line is neither a section nor a key=value pair", &[], &[], false, &mut diags);
        assert!(err.is_err());
    }
}
