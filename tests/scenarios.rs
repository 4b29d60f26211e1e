//! Integration tests for the six concrete scenarios in spec.md §8, run
//! through the public library API end to end.

use subconverter_rs::convert::{convert, ConvertRequest, Target};
use subconverter_rs::node::{ExtraSettings, NodeDescriptor, NodePayload, ProxyGroupConfig, SsrPayload, Tribool};
use subconverter_rs::parser::parse_link;

fn empty_extra() -> ExtraSettings {
    ExtraSettings::default()
}

/// Scenario 1: a single SS link decodes to the documented fields.
#[test]
fn scenario_1_ss_link_decodes_to_expected_fields() {
    let node = parse_link("ss://YWVzLTI1Ni1nY206cGFzcw==@1.2.3.4:8388#My%20Node", 0).unwrap();
    assert_eq!(node.node_type(), subconverter_rs::NodeType::Ss);
    assert_eq!(node.server, "1.2.3.4");
    assert_eq!(node.port, 8388);
    assert_eq!(node.remarks, "My Node");
    match node.payload {
        NodePayload::Ss(p) => {
            assert_eq!(p.method, "aes-256-gcm");
            assert_eq!(p.password, "pass");
        }
        _ => panic!("expected SS payload"),
    }
}

/// Scenario 2: a Vmess node with ws transport emits Clash's `ws-path`/
/// `ws-headers` fields into an empty base template.
#[test]
fn scenario_2_vmess_ws_node_emits_clash_ws_fields() {
    let base = "Proxy: []\n";
    let vmess_link_body = serde_json::json!({
        "v": "2",
        "ps": "WsNode",
        "add": "x.com",
        "port": "443",
        "id": "",
        "aid": "0",
        "net": "ws",
        "type": "none",
        "host": "x.com",
        "path": "/v",
        "tls": "none",
    });
    let link = format!("vmess://{}", subconverter_rs::utils::base64_encode(&vmess_link_body.to_string()));

    let mut extra = empty_extra();
    extra.clash_new_field_name = false;
    let source = link;
    let req = ConvertRequest {
        sources: std::slice::from_ref(&source),
        target: Target::Clash,
        base_template: base,
        groups: &[],
        rulesets: &[],
        extra: &extra,
        rename_rules: &[],
        emoji_rules: &[],
        include_remarks: &[],
        exclude_remarks: &[],
        airport_name: "",
    };
    let result = convert(&req).unwrap();
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    assert!(result.artifact.contains("type: vmess"));
    assert!(result.artifact.contains("network: ws"));
    assert!(result.artifact.contains("ws-path: /v"));
    assert!(result.artifact.contains("Host: x.com"));
}

/// Scenario 3: two nodes with an identical remark de-duplicate to `A`, `A$`.
#[test]
fn scenario_3_duplicate_remarks_deduplicate_with_dollar_suffix() {
    use subconverter_rs::node::{SsPayload, SsPlugin};
    use subconverter_rs::normalizer::{normalize, NormalizeOptions};

    fn ss_node(remark: &str) -> NodeDescriptor {
        NodeDescriptor {
            group: "g".to_string(),
            group_id: 0,
            remarks: remark.to_string(),
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
        }
    }

    let mut nodes = vec![ss_node("A"), ss_node("A")];
    let opts = NormalizeOptions {
        rename_rules: &[],
        remove_emoji: false,
        emoji_rules: &[],
        add_emoji: false,
        append_proxy_type: false,
        sort_flag: false,
        include_remarks: &[],
        exclude_remarks: &[],
    };
    normalize(&mut nodes, &opts);
    let remarks: Vec<&str> = nodes.iter().map(|n| n.remarks.as_str()).collect();
    assert_eq!(remarks, vec!["A", "A$"]);
}

/// Scenario 4: a Vmess link with an empty uuid normalizes to the nil UUID.
#[test]
fn scenario_4_empty_vmess_uuid_normalizes_to_nil_uuid() {
    let body = serde_json::json!({
        "v": "2", "ps": "NoId", "add": "1.2.3.4", "port": "443",
        "id": "", "aid": "0", "net": "tcp", "type": "none",
        "host": "", "path": "", "tls": "none",
    });
    let link = format!("vmess://{}", subconverter_rs::utils::base64_encode(&body.to_string()));
    let node = parse_link(&link, 0).unwrap();
    match node.payload {
        NodePayload::Vmess(p) => assert_eq!(p.uuid, "00000000-0000-0000-0000-000000000000"),
        _ => panic!("expected Vmess payload"),
    }
}

/// Scenario 5: an SS-compatible SSR node, fed into the ss:// bundle
/// emitter, produces a single `ss://` link.
#[test]
fn scenario_5_ss_compatible_ssr_emits_a_single_ss_link() {
    let extra = empty_extra();
    let source = "ssr://ZXhhbXBsZS5jb206ODA4MDpvcmlnaW46YWVzLTI1Ni1jZmI6cGxhaW46Y0dGemN3".to_string();
    let req = ConvertRequest {
        sources: std::slice::from_ref(&source),
        target: Target::RawSs,
        base_template: "",
        groups: &[],
        rulesets: &[],
        extra: &extra,
        rename_rules: &[],
        emoji_rules: &[],
        include_remarks: &[],
        exclude_remarks: &[],
        airport_name: "",
    };
    let result = convert(&req).unwrap();
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    let decoded = subconverter_rs::utils::base64_decode(&result.artifact, true);
    let links: Vec<&str> = decoded.lines().filter(|l| !l.is_empty()).collect();
    assert_eq!(links.len(), 1);
    assert!(links[0].starts_with("ss://"));
}

/// Scenario 6: a deprecated-protocol SSR node into Clash with
/// `filter_deprecated` produces no proxy entry.
#[test]
fn scenario_6_deprecated_ssr_protocol_is_dropped_from_clash() {
    let node = NodeDescriptor {
        group: "g".to_string(),
        group_id: 0,
        remarks: "Deprecated".to_string(),
        server: "1.2.3.4".to_string(),
        port: 8080,
        udp: Tribool::Unset,
        tcp_fast_open: Tribool::Unset,
        skip_cert_verify: Tribool::Unset,
        tls13: Tribool::Unset,
        payload: NodePayload::Ssr(SsrPayload {
            method: "aes-256-cfb".to_string(),
            password: "pass".to_string(),
            protocol: "auth_chain_a".to_string(),
            protocol_param: String::new(),
            obfs: "plain".to_string(),
            obfs_param: String::new(),
        }),
    };

    let base = "Proxy: []\n";
    let opts = subconverter_rs::emit::clash::ClashOptions {
        clash_r: true,
        new_field_name: false,
        filter_deprecated: true,
        enable_rule_generator: false,
        overwrite_original_rules: false,
    };
    let mut diagnostics = Vec::new();
    let artifact = subconverter_rs::emit::clash::emit(base, &[node], &[], &[], &opts, &mut diagnostics).unwrap();
    assert_eq!(diagnostics.len(), 1);

    let doc: serde_yaml::Value = serde_yaml::from_str(&artifact).unwrap();
    let proxies = doc.get("Proxy").and_then(|v| v.as_sequence()).unwrap();
    assert!(proxies.is_empty());
}

/// Invariant from §8: an empty node list still produces a non-empty
/// `select` group member list (`DIRECT` fallback).
#[test]
fn group_expansion_falls_back_to_direct_with_no_matching_nodes() {
    let groups = subconverter_rs::group::expand_group(&["!!GROUP=NoSuchGroup".to_string()], &[]);
    assert_eq!(groups, vec!["DIRECT".to_string()]);
    let _ = ProxyGroupConfig::parse("Proxy`select`!!GROUP=NoSuchGroup").unwrap();
}
