use mig_model::{ClientError, Entity, EntityId, EntityKind, Relation, Scope, TargetClient};
use mig_schedule::{
    AttemptOutcome, FieldSet, OwnerRef, Repair, ScheduleCandidate, SubmissionVariant, SubmitError,
    VariantRegistry, VariantSubmitter, OWNER_FIELD,
};
use mockall::mock;
use mockall::Sequence;
use serde_json::{json, Value};
use std::sync::Arc;

mock! {
    pub Target {}

    #[async_trait::async_trait]
    impl TargetClient for Target {
        async fn ping(&self) -> Result<(), ClientError>;
        async fn get(&self, kind: EntityKind, id: EntityId) -> Result<Entity, ClientError>;
        async fn find_by_name(
            &self,
            kind: EntityKind,
            name: &str,
            scope: Scope,
        ) -> Result<Vec<Entity>, ClientError>;
        async fn find(
            &self,
            kind: EntityKind,
            filters: &[(String, String)],
        ) -> Result<Vec<Entity>, ClientError>;
        async fn create(&self, kind: EntityKind, payload: Value) -> Result<Entity, ClientError>;
        async fn patch(
            &self,
            kind: EntityKind,
            id: EntityId,
            partial: Value,
        ) -> Result<Entity, ClientError>;
        async fn attach(
            &self,
            parent_kind: EntityKind,
            parent_id: EntityId,
            relation: Relation,
            child_id: EntityId,
        ) -> Result<(), ClientError>;
        fn resource_url(&self, kind: EntityKind, id: EntityId) -> String;
    }
}

fn candidate() -> ScheduleCandidate {
    let schedule = Entity::new(EntityKind::Schedule, EntityId(11), "nightly")
        .with_field("rrule", "RRULE:FREQ=DAILY")
        .with_field("next_run", "2025-10-16T14:00:00Z");
    ScheduleCandidate::new(schedule, EntityId(40)).with_inventory(Some(EntityId(3)))
}

fn target_url(mock: &mut MockTarget) {
    mock.expect_resource_url()
        .returning(|kind, id| format!("/api/controller/v2/{}/{id}/", kind.endpoint()));
}

#[tokio::test]
async fn falls_through_to_fourth_variant() {
    let mut mock = MockTarget::new();
    target_url(&mut mock);
    let mut seq = Sequence::new();

    for _ in 0..3 {
        mock.expect_create()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(ClientError::validation(400, "{\"unified_job_template\": [\"bad\"]}")));
    }
    mock.expect_create()
        .times(1)
        .in_sequence(&mut seq)
        .withf(|kind, payload| {
            *kind == EntityKind::Schedule
                && payload[OWNER_FIELD] == json!("/api/controller/v2/job_templates/40/")
                && payload.get("inventory").is_none()
        })
        .returning(|_, _| Ok(Entity::new(EntityKind::Schedule, EntityId(900), "nightly")));

    let submitter = VariantSubmitter::new(Arc::new(mock));
    let submission = submitter.submit(&candidate()).await.unwrap();

    assert_eq!(submission.created.id, EntityId(900));
    assert_eq!(submission.repair, Repair::Anchored);
    let labels: Vec<_> = submission.attempts.iter().map(|a| a.label.as_str()).collect();
    assert_eq!(
        labels,
        vec![
            "full/owner-id",
            "full/owner-url",
            "minimal/owner-id",
            "minimal/owner-url"
        ]
    );
    assert_eq!(
        submission.attempts[3].outcome,
        AttemptOutcome::Accepted { id: EntityId(900) }
    );
    assert!(matches!(
        submission.attempts[0].outcome,
        AttemptOutcome::Rejected { .. }
    ));
}

#[tokio::test]
async fn first_acceptance_stops_the_sequence() {
    let mut mock = MockTarget::new();
    target_url(&mut mock);
    mock.expect_create()
        .times(1)
        .withf(|_, payload| {
            payload[OWNER_FIELD] == json!(40)
                && payload["rrule"] == json!("DTSTART:20251016T140000Z RRULE:FREQ=DAILY")
        })
        .returning(|_, _| Ok(Entity::new(EntityKind::Schedule, EntityId(5), "nightly")));

    let submitter = VariantSubmitter::new(Arc::new(mock));
    let submission = submitter.submit(&candidate()).await.unwrap();
    assert_eq!(submission.attempts.len(), 1);
}

#[tokio::test]
async fn exhausted_reports_every_attempt() {
    let mut mock = MockTarget::new();
    target_url(&mut mock);
    mock.expect_create()
        .times(4)
        .returning(|_, _| Err(ClientError::validation(400, "rrule invalid")));

    let submitter = VariantSubmitter::new(Arc::new(mock));
    let err = submitter.submit(&candidate()).await.unwrap_err();

    assert!(matches!(err, SubmitError::Exhausted { .. }));
    assert_eq!(err.attempts().len(), 4);
    let diagnostics = err.diagnostics();
    assert!(diagnostics.starts_with("#1 full/owner-id"));
    assert!(diagnostics.contains("#4 minimal/owner-url"));
    assert!(diagnostics.contains("rrule invalid"));
}

#[tokio::test]
async fn transport_error_stops_the_sequence() {
    let mut mock = MockTarget::new();
    target_url(&mut mock);
    let mut seq = Sequence::new();
    mock.expect_create()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Err(ClientError::validation(400, "no")));
    mock.expect_create()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Err(ClientError::transport(Some(502), "bad gateway")));

    let submitter = VariantSubmitter::new(Arc::new(mock));
    let err = submitter.submit(&candidate()).await.unwrap_err();

    match err {
        SubmitError::Aborted { attempts, error } => {
            assert_eq!(attempts.len(), 2);
            assert!(!error.is_validation());
        }
        other => panic!("expected abort, got {other:?}"),
    }
}

#[tokio::test]
async fn appended_variants_are_tried_last() {
    let mut mock = MockTarget::new();
    target_url(&mut mock);
    let mut seq = Sequence::new();
    mock.expect_create()
        .times(4)
        .in_sequence(&mut seq)
        .returning(|_, _| Err(ClientError::validation(400, "no")));
    mock.expect_create()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(Entity::new(EntityKind::Schedule, EntityId(1), "nightly")));

    let mut variants = VariantRegistry::default();
    variants.push(SubmissionVariant::new(
        "minimal/owner-id-again",
        FieldSet::Minimal,
        OwnerRef::Id,
    ));

    let submitter = VariantSubmitter::new(Arc::new(mock)).with_variants(variants);
    let submission = submitter.submit(&candidate()).await.unwrap();
    assert_eq!(submission.attempts.len(), 5);
    assert_eq!(submission.attempts[4].label, "minimal/owner-id-again");
}
