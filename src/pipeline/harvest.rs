// src/pipeline/harvest.rs

//! Harvest stage: one Session per operator account, all accounts in parallel.
//!
//! Targets are dealt to accounts round-robin. Each account's Session logs in
//! once and harvests its targets in order on a blocking thread; a failure in
//! one account's Session never reaches another's.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;

use crate::browser::{ChromeDriver, Credentials, PageDriver, Session};
use crate::context::RunContext;
use crate::error::{AppError, Result};
use crate::models::{PostRecord, TargetDescriptor};
use crate::services::{ExtractionRules, FeedExtractor};

/// Posts per target plus the targets that failed.
#[derive(Debug, Default)]
pub struct HarvestOutcome {
    pub posts: BTreeMap<String, Vec<PostRecord>>,
    pub failures: Vec<(String, AppError)>,
}

impl HarvestOutcome {
    pub fn total_posts(&self) -> usize {
        self.posts.values().map(Vec::len).sum()
    }
}

/// Targets assigned to one operator account, or to the anonymous session.
#[derive(Debug, Clone)]
pub struct HarvestAssignment {
    pub credentials: Option<Credentials>,
    pub targets: Vec<TargetDescriptor>,
}

/// Deal `targets` to `credentials` round-robin. Without credentials every
/// target goes to one anonymous session.
pub fn assign_targets(
    targets: &[TargetDescriptor],
    credentials: &[Credentials],
) -> Vec<HarvestAssignment> {
    if credentials.is_empty() {
        return vec![HarvestAssignment {
            credentials: None,
            targets: targets.to_vec(),
        }];
    }
    let mut assignments: Vec<HarvestAssignment> = credentials
        .iter()
        .map(|c| HarvestAssignment {
            credentials: Some(c.clone()),
            targets: Vec::new(),
        })
        .collect();
    for (i, target) in targets.iter().enumerate() {
        assignments[i % credentials.len()].targets.push(target.clone());
    }
    assignments.retain(|a| !a.targets.is_empty());
    assignments
}

/// Harvest with headless Chrome sessions.
pub async fn harvest_targets(
    ctx: &RunContext,
    targets: &[TargetDescriptor],
    credentials: &[Credentials],
    headless: bool,
) -> HarvestOutcome {
    harvest_targets_with(ctx, targets, credentials, move |ctx: &RunContext| {
        Session::<ChromeDriver>::open(&ctx.config, headless, ctx.cancel.clone())
    })
    .await
}

/// Harvest with Sessions built by `open`.
pub async fn harvest_targets_with<D, F>(
    ctx: &RunContext,
    targets: &[TargetDescriptor],
    credentials: &[Credentials],
    open: F,
) -> HarvestOutcome
where
    D: PageDriver + 'static,
    F: Fn(&RunContext) -> Result<Session<D>> + Send + Sync + 'static,
{
    let open = Arc::new(open);
    let assignments = assign_targets(targets, credentials);
    log::info!(
        "Harvesting {} targets with {} session(s)",
        targets.len(),
        assignments.len()
    );

    let jobs = assignments.into_iter().map(|assignment| {
        let ctx = ctx.clone();
        let open = Arc::clone(&open);
        let names: Vec<String> = assignment.targets.iter().map(|t| t.name.clone()).collect();
        async move {
            let joined = tokio::task::spawn_blocking(move || {
                let mut session = match open(&ctx) {
                    Ok(session) => session,
                    Err(e) => {
                        let message = e.to_string();
                        return assignment
                            .targets
                            .iter()
                            .map(|t| (t.name.clone(), Err(AppError::browser(&message))))
                            .collect();
                    }
                };
                let results = harvest_assignment(&mut session, &ctx, &assignment);
                session.close();
                results
            })
            .await;
            joined.unwrap_or_else(|e| {
                names
                    .into_iter()
                    .map(|name| (name, Err(AppError::browser(format!("harvest task failed: {e}")))))
                    .collect()
            })
        }
    });

    let mut outcome = HarvestOutcome::default();
    for (name, result) in join_all(jobs).await.into_iter().flatten() {
        match result {
            Ok(posts) => {
                log::info!("[{}] harvested {} posts", name, posts.len());
                outcome.posts.insert(name, posts);
            }
            Err(e) => {
                log::warn!("[{}] harvest failed: {}", name, e);
                outcome.failures.push((name, e));
            }
        }
    }
    outcome
}

/// Log in once, then harvest each assigned target in order.
pub fn harvest_assignment<D: PageDriver>(
    session: &mut Session<D>,
    ctx: &RunContext,
    assignment: &HarvestAssignment,
) -> Vec<(String, Result<Vec<PostRecord>>)> {
    let names = || assignment.targets.iter().map(|t| t.name.clone());

    if let Err(e) = authenticate(session, assignment.credentials.as_ref(), ctx.config.session.login_required) {
        let message = e.to_string();
        let account = assignment
            .credentials
            .as_ref()
            .map(|c| c.username.clone())
            .unwrap_or_default();
        return names()
            .map(|name| (name, Err(AppError::authentication(&account, &message))))
            .collect();
    }

    let mut results = Vec::with_capacity(assignment.targets.len());
    for target in &assignment.targets {
        if ctx.is_cancelled() {
            results.push((
                target.name.clone(),
                Err(AppError::cancelled(format!("harvest of {}", target.name))),
            ));
            continue;
        }
        let harvested = harvest_target(session, &ctx.rules, target, ctx.config.extraction.exclude_media);
        results.push((target.name.clone(), harvested));
    }
    results
}

fn authenticate<D: PageDriver>(
    session: &mut Session<D>,
    credentials: Option<&Credentials>,
    login_required: bool,
) -> Result<()> {
    match credentials {
        Some(credentials) => {
            if session.login(credentials) {
                return Ok(());
            }
            if login_required {
                return Err(AppError::authentication(&credentials.username, "login rejected"));
            }
            log::warn!(
                "Login failed for {}, continuing without an account",
                credentials.username
            );
            Ok(())
        }
        None if login_required => Err(AppError::authentication(
            "",
            "no operator credentials configured",
        )),
        None => Ok(()),
    }
}

/// Harvest one target with an already prepared Session.
pub fn harvest_target<D: PageDriver>(
    session: &mut Session<D>,
    rules: &ExtractionRules,
    target: &TargetDescriptor,
    exclude_media: bool,
) -> Result<Vec<PostRecord>> {
    log::info!(
        "[{}] harvesting ({} keywords, min {} likes)",
        target.name,
        target.keywords.len(),
        target.min_likes
    );
    FeedExtractor::new(session, rules).harvest(target, exclude_media)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    use crate::browser::Pacer;
    use crate::browser::testing::ScriptedDriver;
    use crate::models::{Config, DelayConfig};

    fn post(author: &str, text: &str, likes: &str) -> String {
        format!(
            r#"<div data-pressable-container="true">
                <a href="/@{author}"><span translate="no">{author}</span></a>
                <span dir="auto">{text}</span>
                <div role="button"><span><span dir="auto">{likes}</span></span></div>
            </div>"#
        )
    }

    fn feed() -> Vec<String> {
        let posts = [
            post("alice", "朝五時に起きる習慣を三年続けた結果", "1,204"),
            post("bob_k", "転職して一番よかったのは通勤がなくなったこと", "842"),
        ];
        vec![format!(
            "<html><body>{}<p>これ以上の投稿はありません</p></body></html>",
            posts.join("\n")
        )]
    }

    fn context(tmp: &TempDir, login_required: bool) -> RunContext {
        let mut config = Config::default();
        config.delays = DelayConfig::none();
        config.extraction.max_attempts = 2;
        config.session.cookie_dir = tmp.path().join("cookies");
        config.session.login_required = login_required;
        let mut careers = TargetDescriptor::named("careers");
        careers.max_posts_total = 10;
        config.targets = vec![careers, TargetDescriptor::named("parents")];
        RunContext::new(config).unwrap()
    }

    fn opener(accept_login: Option<bool>) -> impl Fn(&RunContext) -> Result<Session<ScriptedDriver>> + Send + Sync + 'static {
        move |ctx: &RunContext| {
            let mut driver = ScriptedDriver::new(feed());
            if let Some(accept) = accept_login {
                driver = driver.with_login_flow(accept);
            }
            Ok(Session::with_driver(
                driver,
                &ctx.config,
                Pacer::seeded(DelayConfig::none(), 1),
                ctx.cancel.clone(),
            ))
        }
    }

    #[test]
    fn test_targets_dealt_round_robin() {
        let targets: Vec<TargetDescriptor> =
            ["a", "b", "c"].into_iter().map(TargetDescriptor::named).collect();
        let creds = vec![Credentials::new("op1", "pw"), Credentials::new("op2", "pw")];

        let assignments = assign_targets(&targets, &creds);

        assert_eq!(assignments.len(), 2);
        let first: Vec<&str> = assignments[0].targets.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(first, vec!["a", "c"]);
        assert_eq!(assignments[1].targets[0].name, "b");

        let anonymous = assign_targets(&targets, &[]);
        assert_eq!(anonymous.len(), 1);
        assert!(anonymous[0].credentials.is_none());
        assert_eq!(anonymous[0].targets.len(), 3);
    }

    #[tokio::test]
    async fn test_anonymous_harvest_collects_every_target() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(&tmp, false);

        let outcome = harvest_targets_with(&ctx, &ctx.config.targets, &[], opener(None)).await;

        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.posts["careers"].len(), 2);
        assert_eq!(outcome.posts["parents"].len(), 2);
        assert_eq!(outcome.total_posts(), 4);
    }

    #[tokio::test]
    async fn test_rejected_login_fails_only_its_session() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(&tmp, true);
        let creds = vec![Credentials::new("op1", "pw")];

        let outcome = harvest_targets_with(&ctx, &ctx.config.targets, &creds, opener(Some(false))).await;

        assert!(outcome.posts.is_empty());
        assert_eq!(outcome.failures.len(), 2);
        assert!(outcome
            .failures
            .iter()
            .all(|(_, e)| matches!(e, AppError::AuthenticationFailure { .. })));
    }

    #[tokio::test]
    async fn test_login_required_without_credentials() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(&tmp, true);

        let outcome = harvest_targets_with(&ctx, &ctx.config.targets, &[], opener(None)).await;

        assert_eq!(outcome.failures.len(), 2);
    }

    #[tokio::test]
    async fn test_accepted_login_harvests() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(&tmp, true);
        let creds = vec![Credentials::new("op1", "pw")];

        let outcome = harvest_targets_with(&ctx, &ctx.config.targets, &creds, opener(Some(true))).await;

        assert!(outcome.failures.is_empty(), "{:?}", outcome.failures);
        assert_eq!(outcome.total_posts(), 4);
        assert!(tmp.path().join("cookies").join("cookies_op1.json").exists());
    }

    #[tokio::test]
    async fn test_failed_open_is_reported_per_target() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(&tmp, false);

        let outcome = harvest_targets_with(&ctx, &ctx.config.targets, &[], |_: &RunContext| {
            Err::<Session<ScriptedDriver>, _>(AppError::browser("no chrome"))
        })
        .await;

        assert_eq!(outcome.failures.len(), 2);
        assert!(outcome.posts.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_run_harvests_nothing() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(&tmp, false);
        ctx.cancel.cancel();

        let outcome = harvest_targets_with(&ctx, &ctx.config.targets, &[], opener(None)).await;

        assert!(outcome.posts.is_empty());
        assert_eq!(outcome.failures.len(), 2);
    }
}
