//! HTTP front-end, gated behind the `web-api` feature (matching the
//! teacher's own `Cargo.toml` gating of its `actix-web` dependency).
//!
//! Grounded on `web_handlers::interfaces::SubconverterQuery` for the query
//! parameter shape, rewritten to call the new `convert` entry point instead
//! of the teacher's `SubconverterConfigBuilder`. Fetching subscription/
//! ruleset URLs happens here, through `crate::fetch`, before the core ever
//! runs — the core itself never touches `actix-web` or `reqwest`.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::convert::{convert, ConvertRequest, Target};
use crate::node::{ExtraSettings, ProxyGroupConfig, RulesetEntry};

fn default_ver() -> u8 {
    4
}

/// Query parameters accepted by `GET /sub`.
#[derive(Debug, Default, Deserialize)]
pub struct SubconverterQuery {
    pub target: Option<String>,
    #[serde(default = "default_ver")]
    pub ver: u8,
    pub url: Option<String>,
    pub config: Option<String>,
    pub groups: Option<String>,
    pub include: Option<String>,
    pub exclude: Option<String>,
    pub emoji: Option<bool>,
    pub add_emoji: Option<bool>,
    pub append_type: Option<bool>,
    pub sort: Option<bool>,
}

fn split_pipe(s: &Option<String>) -> Vec<String> {
    s.as_deref().map(|s| s.split('|').filter(|p| !p.is_empty()).map(String::from).collect()).unwrap_or_default()
}

/// `GET /sub?target=clash&url=...` — fetch every `|`-separated subscription
/// URL, run the core pipeline, return the artifact body.
pub async fn sub(req: HttpRequest, query: web::Query<SubconverterQuery>) -> HttpResponse {
    let _ = req;
    let target = match query.target.as_deref().and_then(Target::parse) {
        Some(t) => t,
        None => return HttpResponse::BadRequest().body("unrecognized or missing `target`"),
    };

    let urls = split_pipe(&query.url);
    if urls.is_empty() {
        return HttpResponse::BadRequest().body("missing `url`");
    }

    let mut sources = Vec::with_capacity(urls.len());
    for url in &urls {
        match crate::fetch::fetch(url) {
            Ok(text) => sources.push(text),
            Err(e) => return HttpResponse::BadGateway().body(format!("fetch failed for {}: {}", url, e)),
        }
    }

    let base_template = match &query.config {
        Some(path) => match crate::fetch::fetch(path) {
            Ok(text) => text,
            Err(e) => return HttpResponse::BadGateway().body(format!("base template fetch failed: {}", e)),
        },
        None => String::new(),
    };

    let groups: Vec<ProxyGroupConfig> =
        split_pipe(&query.groups).iter().filter_map(|g| ProxyGroupConfig::parse(g)).collect();
    let rulesets: Vec<RulesetEntry> = Vec::new();

    let mut extra = ExtraSettings::default();
    if let Some(v) = query.emoji {
        extra.remove_emoji = v;
    }
    if let Some(v) = query.add_emoji {
        extra.add_emoji = v;
    }
    if let Some(v) = query.append_type {
        extra.append_proxy_type = v;
    }
    if let Some(v) = query.sort {
        extra.sort_flag = v;
    }

    let include = split_pipe(&query.include);
    let exclude = split_pipe(&query.exclude);

    let convert_req = ConvertRequest {
        sources: &sources,
        target,
        base_template: &base_template,
        groups: &groups,
        rulesets: &rulesets,
        extra: &extra,
        rename_rules: &[],
        emoji_rules: &[],
        include_remarks: &include,
        exclude_remarks: &exclude,
        airport_name: "",
    };

    match convert(&convert_req) {
        Ok(result) => {
            for diag in &result.diagnostics {
                log::warn!("{:?}", diag);
            }
            HttpResponse::Ok().content_type("text/plain; charset=utf-8").body(result.artifact)
        }
        Err(e) => HttpResponse::UnprocessableEntity().body(format!("base template error: {}", e)),
    }
}

/// Register the `/sub` route on an `actix-web` app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/sub", web::get().to(sub));
}
