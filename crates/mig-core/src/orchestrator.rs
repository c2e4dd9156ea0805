//! Migration orchestrator
//!
//! Drives one run: preflight checks, per-kind listing, filtering and limits,
//! reference resolution, guarded creation, child attachment and schedule
//! submission. Every entity gets exactly one receipt record; failures are
//! contained to the entity (or child) they belong to. Only preflight errors
//! stop a run.
//!
//! # Order
//!
//! [`MigrationPlan::All`] runs projects, credentials, notification templates
//! and job templates in that order so that job template references resolve
//! against entities created earlier in the same run.

use crate::config::RunConfig;
use crate::context::RunContext;
use crate::error::{MigrationError, ReferenceKind};
use crate::filter::NameFilter;
use crate::guard::IdempotencyGuard;
use crate::keylock::KeyLocks;
use crate::payload::{self, JobTemplateRefs};
use crate::receipt::{Creation, Outcome, Receipt, ReceiptHeader};
use crate::reconciler::Reconciler;
use crate::resolver::ReferenceResolver;
use crate::secrets::{self, SecretStore};
use mig_key::{NaturalKey, NaturalKeyIndex};
use mig_model::{Entity, EntityId, EntityKind, Relation, Scope, SourceReader, TargetClient};
use mig_schedule::{ScheduleCandidate, VariantRegistry, VariantSubmitter};
use serde_json::{Map, Value};
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// What a run migrates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationPlan {
    /// Projects; one by source id, or all
    Projects { id: Option<EntityId> },
    /// Projects classified against a reference platform
    CompareProjects,
    /// Credentials with locally supplied secrets
    Credentials,
    /// Notification templates with locally supplied secrets
    NotificationTemplates,
    /// Job templates with credentials, notifications and schedules
    JobTemplates { id: Option<EntityId> },
    /// Everything above except compare, in dependency order
    All,
}

impl MigrationPlan {
    /// Whether the plan creates job templates
    #[inline]
    #[must_use]
    pub fn includes_job_templates(self) -> bool {
        matches!(self, Self::JobTemplates { .. } | Self::All)
    }

    /// Whether the plan needs a reference platform
    #[inline]
    #[must_use]
    pub fn needs_reference(self) -> bool {
        self == Self::CompareProjects
    }
}

impl Display for MigrationPlan {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Projects { id: Some(id) } => write!(f, "project {id}"),
            Self::Projects { id: None } => f.write_str("projects"),
            Self::CompareProjects => f.write_str("projects (compare)"),
            Self::Credentials => f.write_str("credentials"),
            Self::NotificationTemplates => f.write_str("notification templates"),
            Self::JobTemplates { id: Some(id) } => write!(f, "job template {id}"),
            Self::JobTemplates { id: None } => f.write_str("job templates"),
            Self::All => f.write_str("all"),
        }
    }
}

/// Result of a guarded create
enum Ensured {
    Existing(EntityId),
    Created(Entity),
    WouldCreate,
}

impl Ensured {
    fn outcome(&self) -> (Outcome, &'static str) {
        match self {
            Self::Existing(existing) => (
                Outcome::Matched {
                    existing: *existing,
                },
                "already in target",
            ),
            Self::Created(created) => (Outcome::Created(Creation::Applied(created.id)), "created"),
            Self::WouldCreate => (Outcome::Created(Creation::DryRun), "would create"),
        }
    }

    /// Target id to hang children on; none in dry-run
    fn target_id(&self) -> Option<EntityId> {
        match self {
            Self::Existing(id) => Some(*id),
            Self::Created(created) => Some(created.id),
            Self::WouldCreate => None,
        }
    }
}

/// Runs migrations from a source platform into a target organization
pub struct MigrationOrchestrator {
    source: Arc<dyn SourceReader>,
    reference: Option<Arc<dyn SourceReader>>,
    target: Arc<dyn TargetClient>,
    config: RunConfig,
    organization: EntityId,
    filter: NameFilter,
    secrets: SecretStore,
    resolver: ReferenceResolver,
    guard: IdempotencyGuard,
    locks: KeyLocks,
    submitter: VariantSubmitter,
}

impl MigrationOrchestrator {
    /// Create orchestrator, validating the configuration
    ///
    /// # Errors
    /// [`MigrationError::Configuration`] for a missing organization, a zero
    /// limit or an invalid filter pattern.
    pub fn new(
        source: Arc<dyn SourceReader>,
        target: Arc<dyn TargetClient>,
        config: RunConfig,
    ) -> Result<Self, MigrationError> {
        let (organization, filter) = config.validate()?;
        Ok(Self {
            source,
            reference: None,
            resolver: ReferenceResolver::new(Arc::clone(&target)).with_policy(config.ambiguity),
            guard: IdempotencyGuard::new(Arc::clone(&target)),
            submitter: VariantSubmitter::new(Arc::clone(&target)),
            target,
            config,
            organization,
            filter,
            secrets: SecretStore::default(),
            locks: KeyLocks::new(),
        })
    }

    /// With reference platform for compare mode
    #[inline]
    #[must_use]
    pub fn with_reference(mut self, reference: Arc<dyn SourceReader>) -> Self {
        self.reference = Some(reference);
        self
    }

    /// With locally supplied secret values
    #[inline]
    #[must_use]
    pub fn with_secrets(mut self, secrets: SecretStore) -> Self {
        self.secrets = secrets;
        self
    }

    /// With schedule submission variants
    #[inline]
    #[must_use]
    pub fn with_variants(mut self, variants: VariantRegistry) -> Self {
        self.submitter = self.submitter.with_variants(variants);
        self
    }

    /// Run configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Target organization
    #[inline]
    #[must_use]
    pub fn organization(&self) -> EntityId {
        self.organization
    }

    fn org_scope(&self) -> Scope {
        Scope::Organization(self.organization)
    }

    /// Checks that must pass before anything is read or written
    ///
    /// # Errors
    /// [`MigrationError::Configuration`] when the plan cannot run with this
    /// configuration, the target rejects the token, the organization does
    /// not exist or the forced execution environment is unusable.
    /// [`MigrationError::Transport`] when the target is unreachable.
    pub async fn preflight(&self, plan: MigrationPlan) -> Result<(), MigrationError> {
        if plan.needs_reference() && self.reference.is_none() {
            return Err(MigrationError::config(
                "compare mode needs a reference platform",
            ));
        }
        if plan.includes_job_templates() && self.config.force_execution_environment.is_none() {
            return Err(MigrationError::config(
                "job template migration needs an execution environment id",
            ));
        }

        match self.target.ping().await {
            Ok(()) => {}
            Err(e) if e.is_unauthorized() => {
                return Err(MigrationError::config(format!(
                    "target rejected the token ({e}); check that it is valid and not expired"
                )))
            }
            Err(e) => return Err(MigrationError::Transport(e)),
        }

        match self
            .target
            .get(EntityKind::Organization, self.organization)
            .await
        {
            Ok(org) => tracing::info!("Target organization: {} ({})", org.name, org.id),
            Err(e) if e.is_not_found() => {
                return Err(MigrationError::config(format!(
                    "organization id {} not found on target",
                    self.organization
                )))
            }
            Err(e) => return Err(MigrationError::Transport(e)),
        }

        if plan.includes_job_templates() {
            if let Some(ee) = self.config.force_execution_environment {
                self.resolver
                    .verify_execution_environment(ee, self.organization)
                    .await?;
                tracing::info!("Forcing execution environment {}", ee);
            }
        }
        Ok(())
    }

    /// Preflight, run the plan and persist the receipt
    ///
    /// Mode, organization, dry-run and prefix in `header` are set from the
    /// plan and configuration.
    ///
    /// # Errors
    /// Preflight failures and failures to list the source platform; entity
    /// level failures end up in the receipt instead.
    pub async fn execute(
        &self,
        plan: MigrationPlan,
        mut header: ReceiptHeader,
    ) -> Result<Receipt, MigrationError> {
        header.mode = plan.to_string();
        header.organization = self.organization;
        header.dry_run = self.config.dry_run;
        header.prefix = plan
            .needs_reference()
            .then(|| self.config.prefix.clone());

        self.preflight(plan).await?;

        let mut ctx = RunContext::new(header, self.config.limit);
        tracing::info!("Starting run {} ({})", ctx.run_id(), plan);
        self.run(plan, &mut ctx).await?;

        let receipt = ctx.into_receipt();
        if let Some(path) = &self.config.receipt_path {
            receipt.persist(path);
        }
        Ok(receipt)
    }

    /// Run the plan into an existing context, without preflight
    ///
    /// # Errors
    /// Failures to list the source or reference platform.
    pub async fn run(&self, plan: MigrationPlan, ctx: &mut RunContext) -> Result<(), MigrationError> {
        match plan {
            MigrationPlan::Projects { id } => self.migrate_projects(id, ctx).await,
            MigrationPlan::CompareProjects => self.compare_projects(ctx).await,
            MigrationPlan::Credentials => self.migrate_credentials(ctx).await,
            MigrationPlan::NotificationTemplates => self.migrate_notification_templates(ctx).await,
            MigrationPlan::JobTemplates { id } => self.migrate_job_templates(id, ctx).await,
            MigrationPlan::All => {
                self.migrate_projects(None, ctx).await?;
                self.migrate_credentials(ctx).await?;
                self.migrate_notification_templates(ctx).await?;
                self.migrate_job_templates(None, ctx).await
            }
        }
    }

    /// Source entities for a kind, with whether the filter applies
    async fn candidates(
        &self,
        kind: EntityKind,
        id: Option<EntityId>,
    ) -> Result<(Vec<Entity>, bool), MigrationError> {
        match id {
            Some(id) => Ok((vec![self.source.get(kind, id).await?], false)),
            None => {
                let entities = self.source.list(kind).await?;
                tracing::info!("Found {} source {}(s)", entities.len(), kind);
                Ok((entities, true))
            }
        }
    }

    /// Filter and count one candidate; false when it is skipped
    fn admit(&self, kind: EntityKind, entity: &Entity, filtered: bool, ctx: &mut RunContext) -> bool {
        if filtered && !self.filter.allows(&entity.name) {
            ctx.record(
                kind,
                &entity.name,
                Some(entity.id),
                None,
                Outcome::Skipped {
                    reason: "filtered".into(),
                },
                "filtered",
            );
            return false;
        }
        ctx.count_candidate();
        true
    }

    fn stop_at_limit(&self, ctx: &RunContext) -> bool {
        let reached = ctx.limit_reached();
        if reached {
            tracing::info!("Limit of {} reached, stopping.", self.config.limit.unwrap_or_default());
        }
        reached
    }

    /// Guarded create of a top-level entity
    async fn ensure(
        &self,
        kind: EntityKind,
        name: &str,
        payload: Map<String, Value>,
    ) -> Result<Ensured, MigrationError> {
        if let Some(existing) = self.guard.ensure_unique(kind, name, self.org_scope()).await? {
            return Ok(Ensured::Existing(existing));
        }
        if self.config.dry_run {
            return Ok(Ensured::WouldCreate);
        }
        let created = self.target.create(kind, Value::Object(payload)).await?;
        Ok(Ensured::Created(created))
    }

    /// Key the guard matches top-level entities on: name within the target org
    fn guard_key(&self, name: &str) -> NaturalKey {
        NaturalKey::named(name, &self.organization.to_string())
    }

    fn record_ensured(
        &self,
        ctx: &mut RunContext,
        entity: &Entity,
        result: &Result<Ensured, MigrationError>,
    ) {
        let key = self.guard_key(&entity.name);
        let (outcome, reason) = match result {
            Ok(ensured) => ensured.outcome(),
            Err(e) => (Outcome::failed(e), "not migrated"),
        };
        ctx.record(entity.kind, &entity.name, Some(entity.id), Some(&key), outcome, reason);
    }

    async fn migrate_projects(
        &self,
        id: Option<EntityId>,
        ctx: &mut RunContext,
    ) -> Result<(), MigrationError> {
        let (projects, filtered) = self.candidates(EntityKind::Project, id).await?;
        for project in &projects {
            if self.stop_at_limit(ctx) {
                break;
            }
            if !self.admit(EntityKind::Project, project, filtered, ctx) {
                continue;
            }

            let name = project.name.trim();
            let _lock = self
                .locks
                .lock(EntityKind::Project, name, self.org_scope())
                .await;
            let result = self
                .ensure(
                    EntityKind::Project,
                    name,
                    payload::project(project, self.organization),
                )
                .await;
            self.record_ensured(ctx, project, &result);
        }
        Ok(())
    }

    async fn compare_projects(&self, ctx: &mut RunContext) -> Result<(), MigrationError> {
        let reference = self
            .reference
            .as_ref()
            .ok_or_else(|| MigrationError::config("compare mode needs a reference platform"))?;

        let index = NaturalKeyIndex::build(reference.list(EntityKind::Project).await?);
        if index.superseded() > 0 {
            tracing::info!(
                "{} reference project(s) share a key with an earlier one and were ignored",
                index.superseded()
            );
        }
        let candidates = self.source.list(EntityKind::Project).await?;

        Reconciler::new(
            Arc::clone(&self.target),
            &self.locks,
            &self.filter,
            self.organization,
        )
        .with_prefix(self.config.prefix.clone())
        .with_dry_run(self.config.dry_run)
        .with_payload(payload::project)
        .reconcile(EntityKind::Project, &index, candidates, ctx)
        .await;
        Ok(())
    }

    async fn migrate_credentials(&self, ctx: &mut RunContext) -> Result<(), MigrationError> {
        let (credentials, filtered) = self.candidates(EntityKind::Credential, None).await?;
        for credential in &credentials {
            if self.stop_at_limit(ctx) {
                break;
            }
            if !self.admit(EntityKind::Credential, credential, filtered, ctx) {
                continue;
            }
            let result = self.migrate_credential(credential).await;
            self.record_ensured(ctx, credential, &result);
        }
        Ok(())
    }

    async fn migrate_credential(&self, credential: &Entity) -> Result<Ensured, MigrationError> {
        let name = credential.name.trim();
        let type_name = credential.related_name("credential_type").ok_or_else(|| {
            MigrationError::Validation(format!("credential '{name}' has no credential type"))
        })?;
        let credential_type = self
            .resolver
            .resolve(ReferenceKind::CredentialType, type_name, Scope::Global)
            .await?;

        let _lock = self
            .locks
            .lock(EntityKind::Credential, name, self.org_scope())
            .await;

        let inputs = Self::merged(credential, "inputs", self.secrets.credential(name));
        let payload = payload::credential(credential, self.organization, credential_type, inputs);
        self.ensure(EntityKind::Credential, name, payload).await
    }

    async fn migrate_notification_templates(
        &self,
        ctx: &mut RunContext,
    ) -> Result<(), MigrationError> {
        let (templates, filtered) = self
            .candidates(EntityKind::NotificationTemplate, None)
            .await?;
        for template in &templates {
            if self.stop_at_limit(ctx) {
                break;
            }
            if !self.admit(EntityKind::NotificationTemplate, template, filtered, ctx) {
                continue;
            }

            let name = template.name.trim();
            let _lock = self
                .locks
                .lock(EntityKind::NotificationTemplate, name, self.org_scope())
                .await;
            let configuration = Self::merged(
                template,
                "notification_configuration",
                self.secrets.notification_template(name),
            );
            let payload = payload::notification_template(template, self.organization, configuration);
            let result = self
                .ensure(EntityKind::NotificationTemplate, name, payload)
                .await;
            self.record_ensured(ctx, template, &result);
        }
        Ok(())
    }

    /// Source secret map with local values merged over redacted ones
    fn merged(
        entity: &Entity,
        field: &str,
        local: Option<&Map<String, Value>>,
    ) -> Map<String, Value> {
        let source = entity
            .field(field)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let merged = match local {
            Some(local) => secrets::merge(&source, local),
            None => source,
        };

        let masked = secrets::unresolved(&merged);
        if !masked.is_empty() {
            tracing::warn!(
                "{} '{}' still has redacted field(s): {}",
                entity.kind,
                entity.name.trim(),
                masked.join(", ")
            );
        }
        merged
    }

    async fn migrate_job_templates(
        &self,
        id: Option<EntityId>,
        ctx: &mut RunContext,
    ) -> Result<(), MigrationError> {
        let (templates, filtered) = self.candidates(EntityKind::JobTemplate, id).await?;
        for template in &templates {
            if self.stop_at_limit(ctx) {
                break;
            }
            if !self.admit(EntityKind::JobTemplate, template, filtered, ctx) {
                continue;
            }
            self.migrate_job_template(template, ctx).await;
        }
        Ok(())
    }

    async fn migrate_job_template(&self, template: &Entity, ctx: &mut RunContext) {
        let name = template.name.trim();
        let _lock = self
            .locks
            .lock(EntityKind::JobTemplate, name, self.org_scope())
            .await;

        let refs = match self.job_template_refs(template).await {
            Ok(refs) => refs,
            Err(e) => {
                self.record_ensured(ctx, template, &Err(e));
                return;
            }
        };

        let payload = payload::job_template(template, self.organization, refs);
        let result = self.ensure(EntityKind::JobTemplate, name, payload).await;
        self.record_ensured(ctx, template, &result);
        let Ok(ensured) = result else {
            return;
        };

        if let Ensured::Created(created) = &ensured {
            self.align_execution_environment(created, refs.execution_environment)
                .await;
        }
        // Children of a matched template were attached by the run that created it
        if !matches!(ensured, Ensured::Existing(_)) {
            let parent = ensured.target_id();
            self.attach_related(template, parent, Relation::Credentials, ctx)
                .await;
            for relation in Relation::NOTIFICATIONS {
                self.attach_related(template, parent, relation, ctx).await;
            }
        }
        self.migrate_schedules(template, ensured.target_id(), refs.inventory, ctx)
            .await;
    }

    async fn job_template_refs(&self, template: &Entity) -> Result<JobTemplateRefs, MigrationError> {
        let scope = self.org_scope();
        let project = match template.related_name("project") {
            Some(name) => Some(self.resolver.resolve(ReferenceKind::Project, name, scope).await?),
            None => None,
        };
        let inventory = match template.related_name("inventory") {
            Some(name) => Some(
                self.resolver
                    .resolve(ReferenceKind::Inventory, name, scope)
                    .await?,
            ),
            None => None,
        };
        let execution_environment = self.config.force_execution_environment.ok_or_else(|| {
            MigrationError::config("job template migration needs an execution environment id")
        })?;

        Ok(JobTemplateRefs {
            project,
            inventory,
            execution_environment: Some(execution_environment),
        })
    }

    /// Re-apply the forced environment when the target ignored it on create
    async fn align_execution_environment(&self, created: &Entity, wanted: Option<EntityId>) {
        let Some(wanted) = wanted else {
            return;
        };
        let actual = created
            .field("execution_environment")
            .and_then(EntityId::from_value);
        if actual == Some(wanted) {
            return;
        }

        let mut partial = Map::new();
        partial.insert("execution_environment".into(), Value::from(wanted.0));
        match self
            .target
            .patch(EntityKind::JobTemplate, created.id, Value::Object(partial))
            .await
        {
            Ok(_) => tracing::info!(
                "Set execution environment {} on job template {}",
                wanted,
                created.id
            ),
            Err(e) => tracing::warn!(
                "Failed to set execution environment on job template {}: {}",
                created.id,
                e
            ),
        }
    }

    /// Resolve and attach one relation's children; `parent` is none in dry-run
    async fn attach_related(
        &self,
        template: &Entity,
        parent: Option<EntityId>,
        relation: Relation,
        ctx: &mut RunContext,
    ) {
        let child_kind = relation.child_kind();
        let children = match self
            .source
            .related(EntityKind::JobTemplate, template.id, relation)
            .await
        {
            Ok(children) => children,
            Err(e) => {
                ctx.record(
                    child_kind,
                    &template.name,
                    Some(template.id),
                    None,
                    Outcome::failed(&MigrationError::from(e)),
                    format!("listing {} of source job template", relation.path()),
                );
                return;
            }
        };

        let mut attached = 0;
        for child in &children {
            match self.attach_one(child, parent, relation).await {
                Ok(()) => attached += 1,
                Err(e) => ctx.record(
                    child_kind,
                    &child.name,
                    Some(child.id),
                    None,
                    Outcome::failed(&e),
                    format!("{} of job template '{}'", relation.path(), template.name.trim()),
                ),
            }
        }

        if attached > 0 {
            tracing::info!(
                "{} {} {}(s) to job template '{}'",
                if parent.is_some() { "Attached" } else { "Would attach" },
                attached,
                child_kind,
                template.name.trim()
            );
        }
    }

    async fn attach_one(
        &self,
        child: &Entity,
        parent: Option<EntityId>,
        relation: Relation,
    ) -> Result<(), MigrationError> {
        let scope = self.org_scope();
        let id = if relation == Relation::Credentials {
            self.resolver
                .resolve_credential(&child.name, child.related_name("credential_type"), scope)
                .await?
        } else {
            self.resolver
                .resolve(ReferenceKind::NotificationTemplate, &child.name, scope)
                .await?
        };

        if let Some(parent) = parent {
            self.target
                .attach(EntityKind::JobTemplate, parent, relation, id)
                .await?;
        }
        Ok(())
    }

    async fn migrate_schedules(
        &self,
        template: &Entity,
        owner: Option<EntityId>,
        inventory: Option<EntityId>,
        ctx: &mut RunContext,
    ) {
        if !self.config.migrate_schedules {
            return;
        }

        let schedules = match self
            .source
            .related(EntityKind::JobTemplate, template.id, Relation::Schedules)
            .await
        {
            Ok(schedules) => schedules,
            Err(e) => {
                ctx.record(
                    EntityKind::Schedule,
                    &template.name,
                    Some(template.id),
                    None,
                    Outcome::failed(&MigrationError::from(e)),
                    "listing schedules of source job template",
                );
                return;
            }
        };

        for schedule in schedules {
            let name = schedule.name.trim().to_string();
            let source_id = schedule.id;
            let key = NaturalKey::named(&name, template.name.trim());

            let (outcome, reason) = match owner {
                Some(owner) => self
                    .submit_schedule(schedule, owner, inventory)
                    .await
                    .unwrap_or_else(|e| {
                        let reason = e.detail();
                        (Outcome::failed(&e), reason)
                    }),
                None => (
                    Outcome::Created(Creation::DryRun),
                    format!("would submit under job template '{}'", template.name.trim()),
                ),
            };
            ctx.record(EntityKind::Schedule, &name, Some(source_id), Some(&key), outcome, reason);
        }
    }

    async fn submit_schedule(
        &self,
        schedule: Entity,
        owner: EntityId,
        inventory: Option<EntityId>,
    ) -> Result<(Outcome, String), MigrationError> {
        let scope = Scope::Owner(owner);
        let name = schedule.name.trim().to_string();
        let _lock = self.locks.lock(EntityKind::Schedule, &name, scope).await;

        if let Some(existing) = self
            .guard
            .ensure_unique(EntityKind::Schedule, &name, scope)
            .await?
        {
            return Ok((Outcome::Matched { existing }, "already in target".into()));
        }

        let candidate = ScheduleCandidate::new(schedule, owner)
            .with_inventory(inventory)
            .with_overrides(self.config.schedule_overrides.clone());

        if self.config.dry_run {
            let rule = VariantSubmitter::rule_for(&candidate);
            return Ok((
                Outcome::Created(Creation::DryRun),
                format!("would submit ({:?} rule)", rule.repair).to_lowercase(),
            ));
        }

        let submission = self.submitter.submit(&candidate).await?;
        let accepted = submission
            .attempts
            .last()
            .map(|a| a.label.clone())
            .unwrap_or_default();
        Ok((
            Outcome::Created(Creation::Applied(submission.created.id)),
            format!(
                "accepted as {} after {} attempt(s)",
                accepted,
                submission.attempts.len()
            ),
        ))
    }
}

impl fmt::Debug for MigrationOrchestrator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationOrchestrator")
            .field("organization", &self.organization)
            .field("dry_run", &self.config.dry_run)
            .field("compare", &self.reference.is_some())
            .finish_non_exhaustive()
    }
}
