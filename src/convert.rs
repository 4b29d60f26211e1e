//! Top-level pipeline orchestrator tying B (decode) -> C (normalize) -> E
//! (dialect emit, which internally drives D and E.1) into the single
//! `convert` entry point every front-end (CLI, HTTP) calls.
//!
//! Grounded on the teacher's `generator::generate_config` as the one place
//! in the pack that sequences decode/normalize/emit end to end; rewritten
//! against the sum-typed pipeline instead of the teacher's shared mutable
//! `Vec<Proxy>` plus side-table approach.

use crate::decoder::decode;
use crate::emit::clash::{self, ClashOptions};
use crate::emit::surge::{self, SurgeOptions};
use crate::emit::raw::BundleKind;
use crate::emit::{mellow, quan, quanx, raw, ss_sub, ssd};
use crate::error::{Diagnostic, TemplateError};
use crate::node::{ExtraSettings, NodeDescriptor, ProxyGroupConfig, RulesetEntry};
use crate::normalizer::{normalize, EmojiRule, NormalizeOptions, RenameRule};

/// One target dialect, matching spec.md §6's capability-matrix table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Clash,
    ClashR,
    Surge(u8),
    Quan,
    QuanX,
    Mellow,
    Ssd,
    SsSub,
    RawSs,
    RawSsr,
    RawVmess,
}

impl Target {
    /// Parse a CLI/query-string target name. Returns `None` for anything
    /// unrecognized; the caller decides what to do (§4.F has no "unknown
    /// target" failure mode of its own, this lives in the ambient CLI/HTTP
    /// layer).
    pub fn parse(s: &str) -> Option<Target> {
        match s.to_lowercase().as_str() {
            "clash" => Some(Target::Clash),
            "clashr" => Some(Target::ClashR),
            "surge" => Some(Target::Surge(4)),
            "surge2" => Some(Target::Surge(2)),
            "surge3" => Some(Target::Surge(3)),
            "surge4" => Some(Target::Surge(4)),
            "quan" | "quantumult" => Some(Target::Quan),
            "quanx" | "quantumultx" => Some(Target::QuanX),
            "mellow" => Some(Target::Mellow),
            "ssd" => Some(Target::Ssd),
            "sssub" | "ss-sub" => Some(Target::SsSub),
            "ss" => Some(Target::RawSs),
            "ssr" => Some(Target::RawSsr),
            "vmess" => Some(Target::RawVmess),
            _ => None,
        }
    }
}

/// Everything one emission needs. `base_template` is required for Clash,
/// ClashR, Surge and Mellow (the dialects with a document to merge into)
/// and ignored otherwise; an absent/empty template for those four dialects
/// is supplied as a bare empty document by the caller, not defaulted here.
pub struct ConvertRequest<'a> {
    pub sources: &'a [String],
    pub target: Target,
    pub base_template: &'a str,
    pub groups: &'a [ProxyGroupConfig],
    pub rulesets: &'a [RulesetEntry],
    pub extra: &'a ExtraSettings,
    pub rename_rules: &'a [RenameRule],
    pub emoji_rules: &'a [EmojiRule],
    pub include_remarks: &'a [String],
    pub exclude_remarks: &'a [String],
    pub airport_name: &'a str,
}

pub struct ConvertResult {
    pub artifact: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Run the full pipeline: decode every source, normalize the merged node
/// list, then hand off to the target's dialect emitter. Per §4.F, only a
/// malformed base template is fatal; everything else degrades to a
/// diagnostic and a possibly-empty artifact.
pub fn convert(req: &ConvertRequest) -> Result<ConvertResult, TemplateError> {
    let mut diagnostics = Vec::new();
    let mut nodes: Vec<NodeDescriptor> = Vec::new();

    for (source_index, source_text) in req.sources.iter().enumerate() {
        let mut decoded = decode(source_text, &mut diagnostics);
        for node in &mut decoded {
            node.group_id = source_index as i32;
        }
        nodes.extend(decoded);
    }

    let norm_opts = NormalizeOptions {
        rename_rules: req.rename_rules,
        remove_emoji: req.extra.remove_emoji,
        emoji_rules: req.emoji_rules,
        add_emoji: req.extra.add_emoji,
        append_proxy_type: req.extra.append_proxy_type,
        sort_flag: req.extra.sort_flag,
        include_remarks: req.include_remarks,
        exclude_remarks: req.exclude_remarks,
    };
    normalize(&mut nodes, &norm_opts);

    let rulesets: &[RulesetEntry] = if req.extra.enable_rule_generator { req.rulesets } else { &[] };

    let artifact = match req.target {
        Target::Clash | Target::ClashR => {
            let opts = ClashOptions {
                clash_r: req.target == Target::ClashR,
                new_field_name: req.extra.clash_new_field_name,
                filter_deprecated: req.extra.filter_deprecated,
                enable_rule_generator: req.extra.enable_rule_generator,
                overwrite_original_rules: req.extra.overwrite_original_rules,
            };
            clash::emit(req.base_template, &nodes, req.groups, rulesets, &opts, &mut diagnostics)?
        }
        Target::Surge(version) => {
            let opts = SurgeOptions {
                version,
                surge_ssr_path: if req.extra.surge_ssr_path.is_empty() {
                    None
                } else {
                    Some(req.extra.surge_ssr_path.as_str())
                },
                enable_rule_generator: req.extra.enable_rule_generator,
                overwrite_original_rules: req.extra.overwrite_original_rules,
            };
            surge::emit(req.base_template, &nodes, req.groups, rulesets, &opts, &mut diagnostics)?
        }
        Target::Mellow => {
            mellow::emit(req.base_template, &nodes, rulesets, req.extra.enable_rule_generator, &mut diagnostics)?
        }
        Target::Quan => quan::emit(&nodes, &mut diagnostics),
        Target::QuanX => quanx::emit(&nodes, &mut diagnostics),
        Target::Ssd => ssd::emit(&nodes, req.airport_name, &mut diagnostics),
        Target::SsSub => ss_sub::emit(&nodes, &mut diagnostics),
        Target::RawSs => raw::emit_bundle(&nodes, BundleKind::Ss, &mut diagnostics),
        Target::RawSsr => raw::emit_bundle(&nodes, BundleKind::Ssr, &mut diagnostics),
        Target::RawVmess => raw::emit_bundle(&nodes, BundleKind::Vmess, &mut diagnostics),
    };

    Ok(ConvertResult { artifact, diagnostics })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ExtraSettings;

    #[test]
    fn unknown_target_name_does_not_parse() {
        assert!(Target::parse("notareal target").is_none());
    }

    #[test]
    fn known_target_names_parse_case_insensitively() {
        assert_eq!(Target::parse("CLASH"), Some(Target::Clash));
        assert_eq!(Target::parse("surge3"), Some(Target::Surge(3)));
    }

    #[test]
    fn malformed_clash_template_is_fatal() {
        let extra = ExtraSettings::default();
        let req = ConvertRequest {
            sources: &[],
            target: Target::Clash,
            base_template: "not: [valid yaml",
            groups: &[],
            rulesets: &[],
            extra: &extra,
            rename_rules: &[],
            emoji_rules: &[],
            include_remarks: &[],
            exclude_remarks: &[],
            airport_name: "",
        };
        assert!(convert(&req).is_err());
    }

    #[test]
    fn single_ss_link_round_trips_into_a_quan_bundle() {
        let extra = ExtraSettings::default();
        let source = "ss://YWVzLTI1Ni1nY206cGFzcw==@1.2.3.4:8388#My%20Node".to_string();
        let req = ConvertRequest {
            sources: std::slice::from_ref(&source),
            target: Target::Quan,
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
        assert!(result.diagnostics.is_empty());
        let decoded = crate::utils::base64::base64_decode(&result.artifact, true);
        assert!(decoded.starts_with("ss://"));
    }

    #[test]
    fn group_ids_are_assigned_per_source_not_per_line() {
        let extra = ExtraSettings::default();
        let sources = vec![
            "ss://YWVzLTI1Ni1nY206cGFzcw==@1.2.3.4:8388#A".to_string(),
            "ss://YWVzLTI1Ni1nY206cGFzcw==@5.6.7.8:8388#B".to_string(),
        ];
        let req = ConvertRequest {
            sources: &sources,
            target: Target::Quan,
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
        assert!(result.diagnostics.is_empty());
    }
}
