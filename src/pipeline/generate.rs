// src/pipeline/generate.rs

//! Generation stage: turns harvested or imported posts into per-target results.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::context::RunContext;
use crate::gateway::CompletionGateway;
use crate::models::{PipelineResult, PostRecord};
use crate::services::{ContentPipeline, PipelineOutcome, WorkItem};
use crate::storage::InputPost;

/// Harvested posts are generated only for the target they were harvested for.
pub fn plan_from_harvest(posts: &BTreeMap<String, Vec<PostRecord>>) -> Vec<WorkItem<'_>> {
    posts
        .iter()
        .flat_map(|(target, records)| {
            records.iter().map(move |post| WorkItem {
                post,
                targets: vec![target.clone()],
            })
        })
        .collect()
}

/// Imported posts go to their pinned target, or to every known target.
///
/// Rows pinned to an unknown target are skipped.
pub fn plan_from_input<'a>(posts: &'a [InputPost], known_targets: &[String]) -> Vec<WorkItem<'a>> {
    let known: BTreeSet<&str> = known_targets.iter().map(String::as_str).collect();
    posts
        .iter()
        .filter_map(|input| match &input.target {
            Some(target) if known.contains(target.as_str()) => Some(WorkItem {
                post: &input.record,
                targets: vec![target.clone()],
            }),
            Some(target) => {
                log::warn!(
                    "Post by {} names unknown target '{}', skipping",
                    input.record.author_handle,
                    target
                );
                None
            }
            None => Some(WorkItem {
                post: &input.record,
                targets: known_targets.to_vec(),
            }),
        })
        .collect()
}

/// Group results by target. Arrival order within a target is kept.
pub fn group_by_target(results: Vec<PipelineResult>) -> BTreeMap<String, Vec<PipelineResult>> {
    let mut grouped: BTreeMap<String, Vec<PipelineResult>> = BTreeMap::new();
    for result in results {
        grouped
            .entry(result.target_name.clone())
            .or_default()
            .push(result);
    }
    grouped
}

/// Run the content pipeline over `work`.
pub async fn generate<G: CompletionGateway>(
    ctx: &RunContext,
    gateway: Arc<G>,
    work: &[WorkItem<'_>],
) -> PipelineOutcome {
    if work.is_empty() {
        log::warn!("Nothing to generate");
        return PipelineOutcome::default();
    }
    let outcome = ContentPipeline::new(gateway, ctx).run_assigned(work).await;
    log::info!(
        "Generation: {}/{} units succeeded",
        outcome.units_succeeded,
        outcome.units_attempted
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(author: &str) -> PostRecord {
        PostRecord::new(author, format!("{author} のテキスト"), 100, None, 50)
    }

    fn result(target: &str, author: &str) -> PipelineResult {
        PipelineResult {
            source_author: author.into(),
            target_name: target.into(),
            generated_text: "text".into(),
        }
    }

    #[test]
    fn test_harvest_plan_keeps_posts_on_their_target() {
        let mut posts = BTreeMap::new();
        posts.insert("careers".to_string(), vec![record("a"), record("b")]);
        posts.insert("parents".to_string(), vec![record("c")]);

        let plan = plan_from_harvest(&posts);

        assert_eq!(plan.len(), 3);
        assert!(plan.iter().all(|w| w.targets.len() == 1));
        assert_eq!(plan[2].targets, vec!["parents".to_string()]);
    }

    #[test]
    fn test_input_plan_routes_pinned_rows() {
        let inputs = vec![
            InputPost { record: record("a"), target: Some("careers".into()) },
            InputPost { record: record("b"), target: None },
            InputPost { record: record("c"), target: Some("unknown".into()) },
        ];
        let known = vec!["careers".to_string(), "parents".to_string()];

        let plan = plan_from_input(&inputs, &known);

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].targets, vec!["careers".to_string()]);
        assert_eq!(plan[1].targets, known);
    }

    #[test]
    fn test_group_by_target() {
        let grouped = group_by_target(vec![
            result("careers", "a"),
            result("parents", "a"),
            result("careers", "b"),
        ]);
        assert_eq!(grouped["careers"].len(), 2);
        assert_eq!(grouped["parents"].len(), 1);
        assert_eq!(grouped["careers"][1].source_author, "b");
    }
}
