//! Compare-mode reconciliation tests

use mig_core::{payload, Creation, KeyLocks, NameFilter, Outcome, ReceiptHeader, Reconciler, RunContext};
use mig_key::NaturalKeyIndex;
use mig_model::{Entity, EntityId, EntityKind};
use mig_test_utils::{fixtures, FakePlatform};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::Arc;

const ORG: EntityId = EntityId(2);

fn context(limit: Option<usize>) -> RunContext {
    RunContext::new(ReceiptHeader::new("awx", "prod"), limit)
}

fn reference() -> NaturalKeyIndex {
    let prod = FakePlatform::new();
    prod.seed(fixtures::project("infra", 1, "https://git.example.com/org/infra", "main"));
    prod.seed(fixtures::project("web", 1, "https://git.example.com/org/web", ""));
    NaturalKeyIndex::build(prod.entities(EntityKind::Project))
}

fn source() -> Vec<Entity> {
    let awx = FakePlatform::new();
    awx.seed(fixtures::project(
        "infra-dev",
        3,
        "https://GIT.example.com:443/org/infra.git/",
        " main ",
    ));
    awx.seed(fixtures::project("web", 3, "https://git.example.com/org/web.git", ""));
    awx.seed(fixtures::project("api", 3, "https://git.example.com/org/api", "main"));
    awx.entities(EntityKind::Project)
}

fn reconciler<'a>(
    target: &Arc<FakePlatform>,
    locks: &'a KeyLocks,
    filter: &'a NameFilter,
) -> Reconciler<'a> {
    Reconciler::new(target.clone(), locks, filter, ORG)
        .with_prefix("PROD_")
        .with_payload(payload::project)
}

#[tokio::test]
async fn equivalent_urls_match_without_creating() {
    let target = Arc::new(FakePlatform::new());
    let (locks, filter) = (KeyLocks::new(), NameFilter::default());
    let mut ctx = context(None);

    reconciler(&target, &locks, &filter)
        .reconcile(EntityKind::Project, &reference(), source(), &mut ctx)
        .await;

    let records = ctx.receipt().records();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].outcome.tag(), "MATCH");
    assert_eq!(records[0].reason, "matched reference 'infra'");
    assert_eq!(records[1].outcome.tag(), "MATCH");
    assert_eq!(records[2].outcome.tag(), "CREATED");
    assert_eq!(records[2].name, "PROD_api");

    let created = target.created(EntityKind::Project);
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].name, "PROD_api");
    assert_eq!(created[0].organization, Some(ORG));
    assert_eq!(
        created[0].str_field("scm_url"),
        Some("https://git.example.com/org/api")
    );
}

#[tokio::test]
async fn rerun_matches_what_the_first_run_created() {
    let target = Arc::new(FakePlatform::new());
    let (locks, filter) = (KeyLocks::new(), NameFilter::default());

    let mut first = context(None);
    reconciler(&target, &locks, &filter)
        .reconcile(EntityKind::Project, &reference(), source(), &mut first)
        .await;

    let mut second = context(None);
    reconciler(&target, &locks, &filter)
        .reconcile(EntityKind::Project, &reference(), source(), &mut second)
        .await;

    assert_eq!(target.create_count(), 1);
    let last = &second.receipt().records()[2];
    assert_eq!(last.reason, "already in target");
    assert!(matches!(last.outcome, Outcome::Matched { .. }));
}

#[tokio::test]
async fn filter_skips_and_limit_stops() {
    let target = Arc::new(FakePlatform::new());
    let locks = KeyLocks::new();
    let filter = NameFilter::new(None, Some("^web$")).unwrap();
    let mut ctx = context(Some(1));

    let mut candidates = source();
    candidates.swap(0, 1);
    reconciler(&target, &locks, &filter)
        .reconcile(EntityKind::Project, &reference(), candidates, &mut ctx)
        .await;

    let tags: Vec<_> = ctx
        .receipt()
        .records()
        .iter()
        .map(|r| r.outcome.tag())
        .collect();
    assert_eq!(tags, vec!["SKIP", "MATCH"]);
    assert_eq!(ctx.receipt().summary().processed, 1);
    assert_eq!(ctx.receipt().summary().filtered, 1);
}

#[tokio::test]
async fn dry_run_mutates_nothing() {
    let target = Arc::new(FakePlatform::new());
    let (locks, filter) = (KeyLocks::new(), NameFilter::default());
    let mut ctx = context(None);

    reconciler(&target, &locks, &filter)
        .with_dry_run(true)
        .reconcile(EntityKind::Project, &reference(), source(), &mut ctx)
        .await;

    assert_eq!(target.create_count(), 0);
    assert_eq!(
        ctx.receipt().records()[2].outcome,
        Outcome::Created(Creation::DryRun)
    );
    assert_eq!(ctx.receipt().summary().would_create, 1);
}

#[tokio::test]
async fn lookup_failure_is_contained_to_the_candidate() {
    let target = Arc::new(FakePlatform::new());
    target.fail_lookups("connection reset");
    let (locks, filter) = (KeyLocks::new(), NameFilter::default());
    let mut ctx = context(None);

    reconciler(&target, &locks, &filter)
        .reconcile(EntityKind::Project, &reference(), source(), &mut ctx)
        .await;

    let summary = ctx.receipt().summary();
    assert_eq!(summary.matched, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(ctx.receipt().status().exit_code(), 2);
}

fn project_strategy() -> impl Strategy<Value = (String, String, String)> {
    (
        "[a-z]{1,8}",
        prop::sample::select(vec!["infra", "web", "api", "db"]),
        prop::sample::select(vec!["", "main", "dev"]),
    )
        .prop_map(|(name, repo, branch)| {
            (
                name,
                format!("https://git.example.com/org/{repo}"),
                branch.to_string(),
            )
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Every candidate yields exactly one record and the counts add up
    #[test]
    fn one_record_per_candidate(projects in prop::collection::vec(project_strategy(), 0..12)) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let awx = FakePlatform::new();
        for (name, url, branch) in &projects {
            awx.seed(fixtures::project(name, 3, url, branch));
        }
        let candidates = awx.entities(EntityKind::Project);

        let target = Arc::new(FakePlatform::new());
        let (locks, filter) = (KeyLocks::new(), NameFilter::default());
        let mut ctx = context(None);
        runtime.block_on(
            reconciler(&target, &locks, &filter)
                .reconcile(EntityKind::Project, &reference(), candidates, &mut ctx),
        );

        let summary = ctx.receipt().summary();
        prop_assert_eq!(ctx.receipt().records().len(), projects.len());
        prop_assert_eq!(summary.matched + summary.created + summary.failed, projects.len());
        prop_assert!(target.create_count() <= summary.created);
    }
}
