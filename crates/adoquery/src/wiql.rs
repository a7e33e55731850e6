//! Pattern-based classification of WIQL query text.
//!
//! This is not a WIQL parser. Only three field shapes are read:
//! `<field> = <value>`, `<field> UNDER <value>` and `<field> IN (<values>)`,
//! where the field is optionally qualified with `Source.` or `Target.`.
//! Text that does not contain a recognised shape simply does not match.
//!
//! All extraction goes through [`extract_field_equality`],
//! [`extract_field_in_clause`] and [`references_field`]; the `matches_*`
//! predicates are built only on top of those.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Which side of a link query a field reference is qualified with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// `Source.[Field]`
    Source,
    /// `Target.[Field]`
    Target,
    /// `[Field]` with no qualifier, as used by flat queries.
    Flat,
}

impl Scope {
    const ALL: [Scope; 3] = [Scope::Source, Scope::Target, Scope::Flat];

    fn prefix_pattern(self) -> &'static str {
        match self {
            Scope::Source => r"Source\.",
            Scope::Target => r"Target\.",
            // an unqualified reference must not be the tail of `Source.[...]`
            Scope::Flat => r"(?:^|[^.])",
        }
    }
}

/// The work-item fields the classifier knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WiqlField {
    WorkItemType,
    AreaPath,
    Id,
}

impl WiqlField {
    const ALL: [WiqlField; 3] = [WiqlField::WorkItemType, WiqlField::AreaPath, WiqlField::Id];

    fn reference_name(self) -> &'static str {
        match self {
            WiqlField::WorkItemType => "System.WorkItemType",
            WiqlField::AreaPath => "System.AreaPath",
            WiqlField::Id => "System.Id",
        }
    }

    /// Area paths are matched regardless of how the field name is cased.
    fn case_insensitive(self) -> bool {
        matches!(self, WiqlField::AreaPath)
    }
}

/// A scoped field reference such as `Source.[System.WorkItemType]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub scope: Scope,
    pub field: WiqlField,
}

impl FieldRef {
    pub const fn new(scope: Scope, field: WiqlField) -> Self {
        Self { scope, field }
    }
}

struct FieldPatterns {
    presence: Regex,
    equality: Regex,
    in_clause: Regex,
    list_value: Regex,
}

impl FieldPatterns {
    fn new(field: FieldRef) -> Result<Self, regex::Error> {
        let reference = format!(
            r"{}\[{}\]",
            field.scope.prefix_pattern(),
            regex::escape(field.field.reference_name())
        );
        let reference = if field.field.case_insensitive() {
            // the scope qualifier follows the field's case rule too
            format!("(?i:{})", reference)
        } else {
            reference
        };

        Ok(Self {
            presence: Regex::new(&reference)?,
            equality: Regex::new(&format!(
                r"{}\s*(?:=|(?i:under)\b)\s*(?:'([^']*)'|(\d+))",
                reference
            ))?,
            in_clause: Regex::new(&format!(r"{}\s+(?i:in)\s*\(([^)]*)\)", reference))?,
            list_value: Regex::new(r"'([^']*)'|(\d+)")?,
        })
    }
}

static PATTERNS: LazyLock<HashMap<FieldRef, FieldPatterns>> = LazyLock::new(|| {
    let mut patterns = HashMap::new();
    for scope in Scope::ALL {
        for field in WiqlField::ALL {
            let field_ref = FieldRef::new(scope, field);
            if let Ok(compiled) = FieldPatterns::new(field_ref) {
                patterns.insert(field_ref, compiled);
            }
        }
    }
    patterns
});

fn captured_value(caps: &regex::Captures<'_>) -> Option<String> {
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().trim().to_string())
}

// ============================================================================
// Extraction
// ============================================================================

/// True when the field reference appears anywhere in the text.
pub fn references_field(wiql: &str, field: FieldRef) -> bool {
    PATTERNS
        .get(&field)
        .is_some_and(|p| p.presence.is_match(wiql))
}

/// Values compared with `=` (or `UNDER`) against the field, in text order.
pub fn extract_field_equality(wiql: &str, field: FieldRef) -> Vec<String> {
    let Some(patterns) = PATTERNS.get(&field) else {
        return Vec::new();
    };
    patterns
        .equality
        .captures_iter(wiql)
        .filter_map(|caps| captured_value(&caps))
        .collect()
}

/// Values listed in every `IN (...)` clause on the field, in text order.
pub fn extract_field_in_clause(wiql: &str, field: FieldRef) -> Vec<String> {
    let Some(patterns) = PATTERNS.get(&field) else {
        return Vec::new();
    };
    patterns
        .in_clause
        .captures_iter(wiql)
        .filter_map(|caps| caps.get(1))
        .flat_map(|list| {
            patterns
                .list_value
                .captures_iter(list.as_str())
                .filter_map(|caps| captured_value(&caps))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Every literal the field is constrained to, from both `=` and `IN`.
pub fn extract_field_values(wiql: &str, field: FieldRef) -> Vec<String> {
    let mut values = extract_field_equality(wiql, field);
    values.extend(extract_field_in_clause(wiql, field));
    values
}

/// Work-item types named for one side (or a flat query).
pub fn extract_work_item_types(wiql: &str, scope: Scope) -> Vec<String> {
    extract_field_values(wiql, FieldRef::new(scope, WiqlField::WorkItemType))
}

/// Area paths named for one side (or a flat query).
pub fn extract_area_paths(wiql: &str, scope: Scope) -> Vec<String> {
    extract_field_values(wiql, FieldRef::new(scope, WiqlField::AreaPath))
}

/// Item ids a flat query pins with `[System.Id] = n` or `[System.Id] IN (...)`.
pub fn extract_flat_ids(wiql: &str) -> Vec<String> {
    let mut ids = extract_field_values(wiql, FieldRef::new(Scope::Flat, WiqlField::Id));
    ids.retain(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()));
    ids.dedup();
    ids
}

/// Last segment of an area path (`Project\Team\System` → `System`).
pub fn area_leaf(path: &str) -> &str {
    path.rsplit(|c: char| c == '\\' || c == '/')
        .next()
        .unwrap_or(path)
}

// ============================================================================
// Predicates
// ============================================================================

fn contains_type<S: AsRef<str>>(allowed: &[S], candidate: &str) -> bool {
    allowed
        .iter()
        .any(|a| a.as_ref().eq_ignore_ascii_case(candidate))
}

/// Does the text constrain `scope`'s work-item type to members of `allowed`?
///
/// With an empty `allowed` list this only checks that the field is
/// referenced at all. Otherwise every extracted type must be allowed and at
/// least one must be present: a query mixing an allowed type with a
/// disallowed one is rejected.
pub fn matches_work_item_type_condition<S: AsRef<str>>(
    wiql: &str,
    scope: Scope,
    allowed: &[S],
) -> bool {
    if allowed.is_empty() {
        return references_field(wiql, FieldRef::new(scope, WiqlField::WorkItemType));
    }
    let types = extract_work_item_types(wiql, scope);
    !types.is_empty() && types.iter().all(|t| contains_type(allowed, t))
}

/// Source side limited to `sources` and target side limited to `targets`.
pub fn matches_source_target_condition<S: AsRef<str>>(
    wiql: &str,
    sources: &[S],
    targets: &[S],
) -> bool {
    matches_work_item_type_condition(wiql, Scope::Source, sources)
        && matches_work_item_type_condition(wiql, Scope::Target, targets)
}

fn area_matches(wiql: &str, scope: Scope, filter: &str) -> bool {
    if filter.is_empty() {
        return true;
    }
    let filter = filter.to_lowercase();
    extract_area_paths(wiql, scope)
        .iter()
        .any(|path| area_leaf(path).to_lowercase().contains(&filter))
}

/// Area-path filters for a link query.
///
/// Each non-empty filter must be contained (case-insensitively) in the leaf
/// segment of at least one area path named on its side. Empty filters
/// always pass.
pub fn matches_area_path_condition(
    wiql: &str,
    source_area_filter: &str,
    target_area_filter: &str,
) -> bool {
    area_matches(wiql, Scope::Source, source_area_filter)
        && area_matches(wiql, Scope::Target, target_area_filter)
}

/// Flat-query variant of [`matches_work_item_type_condition`].
pub fn matches_flat_work_item_type_condition<S: AsRef<str>>(wiql: &str, allowed: &[S]) -> bool {
    matches_work_item_type_condition(wiql, Scope::Flat, allowed)
}

/// Flat-query variant of [`matches_area_path_condition`].
pub fn matches_flat_area_condition(wiql: &str, area_filter: &str) -> bool {
    area_matches(wiql, Scope::Flat, area_filter)
}

/// True when the query filters on bugs.
pub fn matches_bug_condition(wiql: &str) -> bool {
    wiql.contains("[System.WorkItemType] = 'Bug'")
}
