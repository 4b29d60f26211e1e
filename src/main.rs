use std::fs;

use clap::Parser;
use env_logger::Env;
use log::{info, warn};

use subconverter_rs::convert::{convert, ConvertRequest, Target};
use subconverter_rs::fetch::resolve_rulesets;
use subconverter_rs::node::{ExtraSettings, LazyRuleContent, ProxyGroupConfig, RuleType, RulesetEntry};
use subconverter_rs::normalizer::{EmojiRule, RenameRule};
use subconverter_rs::settings::init_settings;

/// Convert a proxy subscription between link/Clash/Surge/Quantumult(X)/
/// Mellow/SSD dialects.
#[derive(Parser, Debug)]
#[command(name = "subconverter", version, about)]
struct Cli {
    /// Path to a preference INI file; falls back to built-in defaults.
    #[arg(short, long, default_value = "pref.ini")]
    config: String,

    /// Path to a subscription file, or literal link/sub text, to convert.
    /// Repeatable: all sources are merged into one node list.
    source: Vec<String>,

    /// Target dialect: clash, clashr, surge2/3/4, quan, quanx, mellow,
    /// ssd, sssub, ss, ssr, vmess.
    #[arg(short, long)]
    target: String,

    /// Path to the base template document (Clash/Surge/Mellow only).
    #[arg(long)]
    base: Option<String>,

    /// A `name\`type\`rules...` proxy-group expression (repeatable).
    #[arg(short, long = "group")]
    groups: Vec<String>,

    /// A `group,url[,interval]` ruleset source (repeatable); an optional
    /// `TYPE,` prefix on the url selects a non-default rule dialect.
    #[arg(short, long = "ruleset")]
    rulesets: Vec<String>,

    /// Exclude remarks matching this regex (repeatable).
    #[arg(long)]
    exclude: Vec<String>,

    /// Include only remarks matching this regex (repeatable).
    #[arg(long)]
    include: Vec<String>,

    /// Display name for the SSD target's airport wrapper.
    #[arg(long, default_value = "")]
    airport_name: String,

    /// Append `[VMess]`-style proxy-type prefix to each remark.
    #[arg(long)]
    append_type: bool,

    /// Strip nodes' existing leading emoji before adding new ones.
    #[arg(long)]
    remove_emoji: bool,

    /// Prepend an emoji to remarks matching the configured emoji rules.
    #[arg(long)]
    add_emoji: bool,

    /// Sort remarks lexicographically.
    #[arg(long)]
    sort: bool,

    /// Splice rulesets into the base template (Clash/Surge/Mellow).
    #[arg(long)]
    no_rule_generator: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let cli = Cli::parse();
    if std::path::Path::new(&cli.config).exists() {
        init_settings(&cli.config).map_err(anyhow::Error::msg)?;
    }
    let settings = subconverter_rs::settings::Settings::current();

    let target = Target::parse(&cli.target)
        .ok_or_else(|| anyhow::anyhow!("unrecognized target: {}", cli.target))?;

    let sources: Vec<String> = cli
        .source
        .iter()
        .map(|s| fs::read_to_string(s).unwrap_or_else(|_| s.clone()))
        .collect();
    let base_template = match &cli.base {
        Some(path) => fs::read_to_string(path)?,
        None => String::new(),
    };

    let groups: Vec<ProxyGroupConfig> = cli.groups.iter().filter_map(|g| ProxyGroupConfig::parse(g)).collect();

    let mut rulesets: Vec<RulesetEntry> = Vec::new();
    for entry in &cli.rulesets {
        let parts: Vec<&str> = entry.split(',').collect();
        if parts.len() < 2 {
            continue;
        }
        let group = parts[0].to_string();
        let mut rest = &parts[1..];

        let mut rule_type = RuleType::ClashClassical;
        if let Some(parsed) = RuleType::parse_prefix(rest[0]) {
            rule_type = parsed;
            rest = &rest[1..];
        }
        if rest.is_empty() {
            continue;
        }
        let rule_path = rest[0].to_string();
        let update_interval: u32 = rest.get(1).and_then(|i| i.parse().ok()).unwrap_or(0);

        rulesets.push(RulesetEntry {
            rule_group: group,
            rule_path,
            rule_type,
            rule_content: LazyRuleContent::new(),
            update_interval,
        });
    }
    let mut fetch_diagnostics = Vec::new();
    resolve_rulesets(&rulesets, &mut fetch_diagnostics);
    for diag in &fetch_diagnostics {
        warn!("{:?}", diag);
    }

    let mut extra = ExtraSettings::default();
    extra.enable_rule_generator = !cli.no_rule_generator;
    extra.append_proxy_type = cli.append_type;
    extra.remove_emoji = cli.remove_emoji;
    extra.add_emoji = cli.add_emoji;
    extra.sort_flag = cli.sort;
    extra.udp = settings.udp;
    extra.tfo = settings.tfo;
    extra.skip_cert_verify = settings.skip_cert_verify;
    extra.tls13 = settings.tls13;

    let rename_rules: Vec<RenameRule> = Vec::new();
    let emoji_rules: Vec<EmojiRule> = Vec::new();

    let req = ConvertRequest {
        sources: &sources,
        target,
        base_template: &base_template,
        groups: &groups,
        rulesets: &rulesets,
        extra: &extra,
        rename_rules: &rename_rules,
        emoji_rules: &emoji_rules,
        include_remarks: &cli.include,
        exclude_remarks: &cli.exclude,
        airport_name: &cli.airport_name,
    };

    let result = convert(&req)?;
    info!("produced {} byte artifact, {} diagnostic(s)", result.artifact.len(), result.diagnostics.len());
    for diag in &result.diagnostics {
        warn!("{:?}", diag);
    }

    print!("{}", result.artifact);
    Ok(())
}
