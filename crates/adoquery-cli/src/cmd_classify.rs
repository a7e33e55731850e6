use adoquery::v1::wiql::{self, Scope};
use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::io::Read;

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// WIQL text (use - for stdin)
    #[arg(long)]
    wiql: String,

    /// Allowed source work-item types, comma separated
    #[arg(long, value_delimiter = ',')]
    sources: Vec<String>,

    /// Allowed target work-item types, comma separated
    #[arg(long, value_delimiter = ',')]
    targets: Vec<String>,

    /// Allowed types for flat queries, comma separated
    #[arg(long, value_delimiter = ',')]
    types: Vec<String>,

    /// Substring the source area path's last segment must contain
    #[arg(long, default_value = "")]
    source_area: String,

    /// Substring the target area path's last segment must contain
    #[arg(long, default_value = "")]
    target_area: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Classification {
    source_types: Vec<String>,
    target_types: Vec<String>,
    flat_types: Vec<String>,
    flat_ids: Vec<String>,
    /// Source → target types and areas
    forward: bool,
    /// Target → source types and areas
    reverse: bool,
    flat_type: bool,
    flat_source_area: bool,
    bug: bool,
}

fn classify(text: &str, args: &ClassifyArgs) -> Classification {
    let forward = wiql::matches_source_target_condition(text, &args.sources, &args.targets)
        && wiql::matches_area_path_condition(text, &args.source_area, &args.target_area);
    let reverse = wiql::matches_source_target_condition(text, &args.targets, &args.sources)
        && wiql::matches_area_path_condition(text, &args.target_area, &args.source_area);

    Classification {
        source_types: wiql::extract_work_item_types(text, Scope::Source),
        target_types: wiql::extract_work_item_types(text, Scope::Target),
        flat_types: wiql::extract_work_item_types(text, Scope::Flat),
        flat_ids: wiql::extract_flat_ids(text),
        forward,
        reverse,
        flat_type: wiql::matches_flat_work_item_type_condition(text, &args.types),
        flat_source_area: wiql::matches_flat_area_condition(text, &args.source_area),
        bug: wiql::matches_bug_condition(text),
    }
}

fn read_wiql(arg: &str) -> Result<String> {
    if arg != "-" {
        return Ok(arg.to_string());
    }
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read WIQL from stdin")?;
    Ok(text)
}

pub fn run(args: ClassifyArgs, pretty: bool) -> Result<()> {
    let text = read_wiql(&args.wiql)?;
    crate::print_json(&classify(&text, &args), pretty)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(sources: &[&str], targets: &[&str]) -> ClassifyArgs {
        ClassifyArgs {
            wiql: String::new(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
            targets: targets.iter().map(|s| s.to_string()).collect(),
            types: Vec::new(),
            source_area: String::new(),
            target_area: String::new(),
        }
    }

    #[test]
    fn test_classify_link_query() {
        let text = "SELECT [System.Id] FROM WorkItemLinks WHERE \
            Source.[System.WorkItemType] = 'Requirement' AND \
            Target.[System.WorkItemType] IN ('Test Case')";

        let result = classify(text, &args(&["Requirement"], &["Test Case"]));
        assert!(result.forward);
        assert!(!result.reverse);
        assert_eq!(result.source_types, vec!["Requirement"]);
        assert_eq!(result.target_types, vec!["Test Case"]);
        assert!(result.flat_types.is_empty());
        assert!(!result.bug);
    }

    #[test]
    fn test_classify_area_filters() {
        let text = "Source.[System.WorkItemType] = 'Epic' AND Source.[System.AreaPath] = 'P\\System' \
            AND Target.[System.WorkItemType] = 'Epic' AND Target.[System.AreaPath] = 'P\\Software'";
        let mut args = args(&["Epic"], &["Epic"]);
        args.source_area = "system".into();
        args.target_area = "software".into();

        let result = classify(text, &args);
        assert!(result.forward);
        assert!(!result.reverse);
    }

    #[test]
    fn test_classify_flat_bug_query() {
        let text = "SELECT [System.Id] FROM WorkItems WHERE [System.WorkItemType] = 'Bug'";
        let mut args = args(&[], &[]);
        args.types = vec!["Bug".into()];

        let result = classify(text, &args);
        assert!(result.bug);
        assert!(result.flat_type);
        assert_eq!(result.flat_types, vec!["Bug"]);
        assert!(result.source_types.is_empty());
        // no Source./Target. references at all
        assert!(!result.forward);
    }

    #[test]
    fn test_read_wiql_literal() {
        assert_eq!(read_wiql("SELECT 1").unwrap(), "SELECT 1");
    }
}
