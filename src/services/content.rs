// src/services/content.rs

//! Multi-stage content pipeline.
//!
//! Each post runs analyze, then build-template (or one combined call), then a
//! per-target generate fan-out. Posts are processed by a bounded pool of width
//! W; generate calls across all posts share a second bound G <= W. A failed
//! stage drops that post, or that post and target pair, and nothing else.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::context::RunContext;
use crate::gateway::{ChatRequest, CompletionGateway, ModelDispatch};
use crate::models::{PipelineResult, PipelineShape, PostRecord};
use crate::pipeline::prompts::{self, PromptTemplate};

/// Counts and results of one pipeline run.
#[derive(Debug, Default)]
pub struct PipelineOutcome {
    /// Successful results in completion order
    pub results: Vec<PipelineResult>,
    /// Post x target pairs submitted
    pub units_attempted: usize,
    /// Pairs that produced a result
    pub units_succeeded: usize,
}

/// One post and the targets it is generated for.
#[derive(Debug, Clone)]
pub struct WorkItem<'a> {
    pub post: &'a PostRecord,
    pub targets: Vec<String>,
}

/// Runs posts through the completion gateway.
pub struct ContentPipeline<G: CompletionGateway> {
    gateway: Arc<G>,
    model: String,
    dispatch: ModelDispatch,
    shape: PipelineShape,
    workers: usize,
    fanout: usize,
    call_timeout: Duration,
    cancel: CancellationToken,
}

impl<G: CompletionGateway> ContentPipeline<G> {
    pub fn new(gateway: Arc<G>, ctx: &RunContext) -> Self {
        let pipeline = &ctx.config.pipeline;
        let workers = pipeline.workers.max(1);
        Self {
            gateway,
            model: ctx.config.gateway.model.clone(),
            dispatch: ctx.dispatch,
            shape: pipeline.shape,
            workers,
            fanout: pipeline.fanout_workers.clamp(1, workers),
            call_timeout: ctx.config.gateway.timeout(),
            cancel: ctx.cancel.clone(),
        }
    }

    /// Process every post for every target.
    pub async fn run(&self, posts: &[PostRecord], targets: &[String]) -> PipelineOutcome {
        let work: Vec<WorkItem<'_>> = posts
            .iter()
            .map(|post| WorkItem {
                post,
                targets: targets.to_vec(),
            })
            .collect();
        self.run_assigned(&work).await
    }

    /// Process each post for its own target list.
    pub async fn run_assigned(&self, work: &[WorkItem<'_>]) -> PipelineOutcome {
        let semaphore = Arc::new(Semaphore::new(self.fanout));
        let units_attempted: usize = work.iter().map(|item| item.targets.len()).sum();
        log::info!(
            "Generating {} units from {} posts (workers={}, fan-out={})",
            units_attempted,
            work.len(),
            self.workers,
            self.fanout
        );

        let per_post: Vec<Vec<PipelineResult>> = stream::iter(work.iter().enumerate())
            .map(|(index, item)| {
                let semaphore = Arc::clone(&semaphore);
                async move {
                    self.process_post(index, item.post, &item.targets, &semaphore)
                        .await
                }
            })
            .buffer_unordered(self.workers)
            .collect()
            .await;

        let results: Vec<PipelineResult> = per_post.into_iter().flatten().collect();
        PipelineOutcome {
            units_attempted,
            units_succeeded: results.len(),
            results,
        }
    }

    /// Analysis of a post's text.
    pub async fn analyze(&self, text: &str) -> Option<String> {
        self.call(&prompts::ANALYZE, &[("post", text)]).await
    }

    /// Reusable template built from a post and its analysis.
    pub async fn build_template(&self, analysis: &str, text: &str) -> Option<String> {
        self.call(&prompts::TEMPLATE, &[("post", text), ("analysis", analysis)])
            .await
    }

    /// Analysis and template in one call.
    pub async fn analyze_and_template(&self, text: &str) -> Option<String> {
        self.call(&prompts::COMBINED, &[("post", text)]).await
    }

    /// Post text for one target.
    pub async fn generate(&self, template: &str, target: &str) -> Option<String> {
        self.call(&prompts::GENERATE, &[("target", target), ("template", template)])
            .await
    }

    async fn process_post(
        &self,
        index: usize,
        post: &PostRecord,
        targets: &[String],
        semaphore: &Semaphore,
    ) -> Vec<PipelineResult> {
        if self.cancel.is_cancelled() || targets.is_empty() {
            return Vec::new();
        }
        let template = match self.shape {
            PipelineShape::ThreeStage => {
                let Some(analysis) = self.analyze(&post.text).await else {
                    log::warn!("Post #{} by {}: analysis failed, skipping", index + 1, post.author_handle);
                    return Vec::new();
                };
                self.build_template(&analysis, &post.text).await
            }
            PipelineShape::Combined => self.analyze_and_template(&post.text).await,
        };
        let Some(template) = template else {
            log::warn!("Post #{} by {}: template failed, skipping", index + 1, post.author_handle);
            return Vec::new();
        };

        let generations = targets.iter().map(|target| {
            let template = template.as_str();
            async move {
                let _permit = semaphore.acquire().await.ok()?;
                match self.generate(template, target).await {
                    Some(text) => Some(PipelineResult {
                        source_author: post.author_handle.clone(),
                        target_name: target.clone(),
                        generated_text: text,
                    }),
                    None => {
                        log::warn!(
                            "Post #{} by {}: generation for '{}' failed",
                            index + 1,
                            post.author_handle,
                            target
                        );
                        None
                    }
                }
            }
        });
        let results: Vec<PipelineResult> = join_all(generations).await.into_iter().flatten().collect();
        log::info!(
            "Post #{} by {}: {}/{} targets generated",
            index + 1,
            post.author_handle,
            results.len(),
            targets.len()
        );
        results
    }

    /// One gateway call. Every failure becomes `None`.
    async fn call(&self, prompt: &PromptTemplate, vars: &[(&str, &str)]) -> Option<String> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let request = self.dispatch.apply(ChatRequest::new(
            self.model.clone(),
            prompt.system,
            prompt.render(vars),
        ));

        let outcome = tokio::select! {
            _ = self.cancel.cancelled() => {
                log::debug!("{} call cancelled", prompt.name);
                return None;
            }
            outcome = tokio::time::timeout(self.call_timeout, self.gateway.complete(request)) => outcome,
        };

        match outcome {
            Ok(Ok(text)) if !text.trim().is_empty() => Some(text),
            Ok(Ok(_)) => {
                log::warn!("{} ({}) returned empty content", prompt.name, prompt.version);
                None
            }
            Ok(Err(e)) => {
                log::warn!("{} ({}) failed: {}", prompt.name, prompt.version, e);
                None
            }
            Err(_) => {
                log::warn!(
                    "{} ({}) timed out after {:?}",
                    prompt.name,
                    prompt.version,
                    self.call_timeout
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::error::{AppError, Result};
    use crate::models::Config;

    #[derive(Default)]
    struct MockGateway {
        /// Analysis fails for posts containing this text
        fail_analysis_for: Option<&'static str>,
        /// Generation returns blank content for this target
        blank_target: Option<&'static str>,
        generate_delay: Option<Duration>,
        calls: Mutex<Vec<serde_json::Value>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl MockGateway {
        fn stage_calls(&self, prompt: &PromptTemplate) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c["messages"][0]["content"] == prompt.system)
                .count()
        }
    }

    #[async_trait]
    impl CompletionGateway for MockGateway {
        async fn complete(&self, request: ChatRequest) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push(serde_json::to_value(&request).unwrap());
            let system = request.system_prompt().unwrap_or_default();
            let user = request.user_prompt().unwrap_or_default().to_string();

            if system == prompts::ANALYZE.system {
                if self.fail_analysis_for.is_some_and(|marker| user.contains(marker)) {
                    return Err(AppError::gateway("status 500"));
                }
                return Ok("analysis".into());
            }
            if system == prompts::TEMPLATE.system || system == prompts::COMBINED.system {
                return Ok("template".into());
            }

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if let Some(delay) = self.generate_delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.blank_target.is_some_and(|t| user.contains(&format!("【ターゲット】\n{t}\n"))) {
                return Ok("   ".into());
            }
            Ok(format!("generated: {}", user.lines().nth(4).unwrap_or_default()))
        }
    }

    fn context(configure: impl FnOnce(&mut Config)) -> RunContext {
        let mut config = Config::default();
        configure(&mut config);
        RunContext::new(config).unwrap()
    }

    fn posts() -> Vec<PostRecord> {
        ["post-one", "post-two", "post-three"]
            .iter()
            .enumerate()
            .map(|(i, text)| PostRecord::new(format!("author_{}", i + 1), *text, 900, None, 50))
            .collect()
    }

    fn targets() -> Vec<String> {
        vec!["careers".to_string(), "parents".to_string()]
    }

    #[tokio::test]
    async fn test_all_stages_succeed() {
        let ctx = context(|_| {});
        let gateway = Arc::new(MockGateway::default());
        let pipeline = ContentPipeline::new(Arc::clone(&gateway), &ctx);

        let outcome = pipeline.run(&posts(), &targets()).await;

        assert_eq!(outcome.results.len(), 6);
        assert_eq!(outcome.units_attempted, 6);
        assert_eq!(outcome.units_succeeded, 6);
        let mut by_target: HashMap<&str, usize> = HashMap::new();
        for result in &outcome.results {
            *by_target.entry(result.target_name.as_str()).or_default() += 1;
        }
        assert_eq!(by_target.len(), 2);
        assert_eq!(by_target["careers"], 3);
        assert_eq!(by_target["parents"], 3);
    }

    #[tokio::test]
    async fn test_assigned_targets_limit_fan_out() {
        let ctx = context(|_| {});
        let gateway = Arc::new(MockGateway::default());
        let posts = posts();
        let work = vec![
            WorkItem { post: &posts[0], targets: vec!["careers".into()] },
            WorkItem { post: &posts[1], targets: targets() },
            WorkItem { post: &posts[2], targets: Vec::new() },
        ];

        let outcome = ContentPipeline::new(Arc::clone(&gateway), &ctx)
            .run_assigned(&work)
            .await;

        assert_eq!(outcome.units_attempted, 3);
        assert_eq!(outcome.results.len(), 3);
        assert_eq!(gateway.stage_calls(&prompts::ANALYZE), 2);
    }

    #[tokio::test]
    async fn test_failed_analysis_drops_only_that_post() {
        let ctx = context(|_| {});
        let gateway = Arc::new(MockGateway {
            fail_analysis_for: Some("post-two"),
            ..MockGateway::default()
        });
        let pipeline = ContentPipeline::new(Arc::clone(&gateway), &ctx);

        let outcome = pipeline.run(&posts(), &targets()).await;

        assert_eq!(outcome.results.len(), 4);
        assert_eq!(outcome.units_attempted, 6);
        assert!(outcome.results.iter().all(|r| r.source_author != "author_2"));
        assert_eq!(gateway.stage_calls(&prompts::TEMPLATE), 2);
    }

    #[tokio::test]
    async fn test_blank_generation_drops_only_that_pair() {
        let ctx = context(|_| {});
        let gateway = Arc::new(MockGateway {
            blank_target: Some("parents"),
            ..MockGateway::default()
        });
        let pipeline = ContentPipeline::new(Arc::clone(&gateway), &ctx);

        let outcome = pipeline.run(&posts(), &targets()).await;

        assert_eq!(outcome.results.len(), 3);
        assert!(outcome.results.iter().all(|r| r.target_name == "careers"));
    }

    #[tokio::test]
    async fn test_combined_shape_skips_separate_analysis() {
        let ctx = context(|c| c.pipeline.shape = PipelineShape::Combined);
        let gateway = Arc::new(MockGateway::default());
        let pipeline = ContentPipeline::new(Arc::clone(&gateway), &ctx);

        let outcome = pipeline.run(&posts(), &targets()).await;

        assert_eq!(outcome.results.len(), 6);
        assert_eq!(gateway.stage_calls(&prompts::ANALYZE), 0);
        assert_eq!(gateway.stage_calls(&prompts::COMBINED), 3);
    }

    #[tokio::test]
    async fn test_new_generation_model_requests_omit_temperature() {
        let ctx = context(|c| c.gateway.model = "gpt-4o-mini".into());
        let gateway = Arc::new(MockGateway::default());
        ContentPipeline::new(Arc::clone(&gateway), &ctx)
            .run(&posts(), &targets())
            .await;

        let calls = gateway.calls.lock().unwrap();
        assert_eq!(calls.len(), 3 * 2 + 3 * 2);
        assert!(calls.iter().all(|c| c.get("temperature").is_none()));
        assert!(calls.iter().all(|c| c.get("max_completion_tokens").is_some()));
    }

    #[tokio::test]
    async fn test_legacy_model_requests_carry_temperature() {
        let ctx = context(|c| c.gateway.model = "gpt-3.5-turbo".into());
        let gateway = Arc::new(MockGateway::default());
        ContentPipeline::new(Arc::clone(&gateway), &ctx)
            .run(&posts(), &targets())
            .await;

        let calls = gateway.calls.lock().unwrap();
        assert!(calls.iter().all(|c| c.get("temperature").is_some()));
        assert!(calls.iter().all(|c| c.get("max_tokens").is_some()));
    }

    #[tokio::test]
    async fn test_fanout_width_bounds_generate_calls() {
        let ctx = context(|c| {
            c.pipeline.workers = 3;
            c.pipeline.fanout_workers = 2;
        });
        let gateway = Arc::new(MockGateway {
            generate_delay: Some(Duration::from_millis(20)),
            ..MockGateway::default()
        });
        let targets: Vec<String> = (0..4).map(|i| format!("target_{i}")).collect();
        let outcome = ContentPipeline::new(Arc::clone(&gateway), &ctx)
            .run(&posts(), &targets)
            .await;

        assert_eq!(outcome.results.len(), 12);
        assert!(gateway.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_timed_out_calls_are_dropped() {
        let ctx = context(|c| c.gateway.timeout_secs = 1);
        let gateway = Arc::new(MockGateway {
            generate_delay: Some(Duration::from_secs(5)),
            ..MockGateway::default()
        });
        let started = std::time::Instant::now();
        let outcome = ContentPipeline::new(Arc::clone(&gateway), &ctx)
            .run(&posts()[..1], &targets())
            .await;

        assert!(outcome.results.is_empty());
        assert_eq!(outcome.units_attempted, 2);
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_cancelled_run_makes_no_calls() {
        let ctx = context(|_| {});
        ctx.cancel.cancel();
        let gateway = Arc::new(MockGateway::default());
        let outcome = ContentPipeline::new(Arc::clone(&gateway), &ctx)
            .run(&posts(), &targets())
            .await;

        assert!(outcome.results.is_empty());
        assert!(gateway.calls.lock().unwrap().is_empty());
    }
}
