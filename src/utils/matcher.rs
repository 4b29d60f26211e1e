//! Regex-based node matching, shared by the group expander (§4.D) and the
//! include/exclude filter step of the normalizer (§4.C).
//!
//! Grounded on the teacher's `utils::matcher::apply_matcher`/`match_range`,
//! narrowed to exactly the forms spec.md §4.D's table names.

use crate::node::NodeDescriptor;
use regex::Regex;

/// Check if a string matches a regular expression pattern (substring,
/// case-insensitive).
pub fn reg_find(text: &str, pattern: &str) -> bool {
    if pattern.is_empty() {
        return true;
    }
    Regex::new(&format!("(?i){}", pattern))
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}

/// The result of evaluating one `GroupExpr` member-selection token against
/// the node list, per spec.md §4.D's table.
pub enum GroupSelector<'a> {
    /// `[]NAME` — a literal name, appended verbatim when `add_direct`.
    Literal(&'a str),
    /// `!!GROUP=X` or `!!GROUP=X!!RE` — match on `group`, optionally
    /// followed by a remark filter.
    ByGroup { pattern: &'a str, remark_filter: Option<&'a str> },
    /// `!!GROUPID=N` or `!!GROUPID=N!!RE`.
    ByGroupId { id: i32, remark_filter: Option<&'a str> },
    /// Anything else: regex over remark.
    Remark(&'a str),
}

lazy_static::lazy_static! {
    static ref GROUP_RE: Regex = Regex::new(r"^!!GROUP=(.+?)(?:!!(.*))?$").unwrap();
    static ref GROUPID_RE: Regex = Regex::new(r"^!!GROUPID=(-?\d+)(?:!!(.*))?$").unwrap();
}

pub fn parse_selector(token: &str) -> GroupSelector<'_> {
    if let Some(name) = token.strip_prefix("[]") {
        return GroupSelector::Literal(name);
    }
    if let Some(caps) = GROUP_RE.captures(token) {
        let pattern = caps.get(1).unwrap().as_str();
        let remark_filter = caps.get(2).map(|m| m.as_str()).filter(|s| !s.is_empty());
        return GroupSelector::ByGroup { pattern, remark_filter };
    }
    if let Some(caps) = GROUPID_RE.captures(token) {
        let id: i32 = caps.get(1).unwrap().as_str().parse().unwrap_or(0);
        let remark_filter = caps.get(2).map(|m| m.as_str()).filter(|s| !s.is_empty());
        return GroupSelector::ByGroupId { id, remark_filter };
    }
    GroupSelector::Remark(token)
}

/// Does `node` satisfy this selector?
pub fn node_matches(selector: &GroupSelector, node: &NodeDescriptor) -> bool {
    match selector {
        GroupSelector::Literal(_) => false, // literals never match nodes, they're appended verbatim
        GroupSelector::ByGroup { pattern, remark_filter } => {
            reg_find(&node.group, pattern)
                && remark_filter.map_or(true, |re| reg_find(&node.remarks, re))
        }
        GroupSelector::ByGroupId { id, remark_filter } => {
            node.group_id == *id && remark_filter.map_or(true, |re| reg_find(&node.remarks, re))
        }
        GroupSelector::Remark(pattern) => reg_find(&node.remarks, pattern),
    }
}
