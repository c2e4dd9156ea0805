//! Command execution

use crate::cli::{Command, ExportArgs};
use crate::settings::Settings;
use anyhow::Context;
use mig_core::{
    transform_export_file, MigrationOrchestrator, MigrationPlan, ReceiptHeader, SecretStore,
};
use mig_http::{AwxSource, ControllerTarget, Endpoint};
use mig_model::EntityId;
use std::sync::Arc;

/// Run one command, returning the process exit code
pub(crate) async fn run(command: Command) -> anyhow::Result<i32> {
    match command {
        Command::TransformExport(args) => transform(&args),
        Command::Projects(args) => {
            let mut settings = Settings::load(&args.run)?;
            if let Some(prefix) = args.prefix {
                settings.config.prefix = prefix;
            }
            let reference =
                settings.reference(args.compare_with.as_deref(), args.compare_token.as_deref())?;
            let plan = if reference.is_some() {
                MigrationPlan::CompareProjects
            } else {
                MigrationPlan::Projects {
                    id: args.id.map(EntityId),
                }
            };
            migrate(settings, reference, plan).await
        }
        Command::Credentials(args) => {
            migrate(Settings::load(&args)?, None, MigrationPlan::Credentials).await
        }
        Command::NotificationTemplates(args) => {
            migrate(Settings::load(&args)?, None, MigrationPlan::NotificationTemplates).await
        }
        Command::JobTemplates(args) => {
            let mut settings = Settings::load(&args.run)?;
            settings.apply_templates(&args.templates);
            let plan = MigrationPlan::JobTemplates {
                id: args.id.map(EntityId),
            };
            migrate(settings, None, plan).await
        }
        Command::All(args) => {
            let mut settings = Settings::load(&args.run)?;
            settings.apply_templates(&args.templates);
            migrate(settings, None, MigrationPlan::All).await
        }
    }
}

async fn migrate(
    settings: Settings,
    reference: Option<Endpoint>,
    plan: MigrationPlan,
) -> anyhow::Result<i32> {
    let source = AwxSource::new(&settings.source).context("failed to set up the source client")?;
    let target =
        ControllerTarget::new(&settings.target).context("failed to set up the target client")?;
    let mut header = ReceiptHeader::new(&settings.source.host, &settings.target.host);

    let mut orchestrator =
        MigrationOrchestrator::new(Arc::new(source), Arc::new(target), settings.config)?;
    if let Some(reference) = &reference {
        let client =
            AwxSource::new(reference).context("failed to set up the reference client")?;
        orchestrator = orchestrator.with_reference(Arc::new(client));
        header = header.with_reference(&reference.host);
    }
    if let Some(path) = &settings.secrets {
        let secrets = SecretStore::load(path)
            .with_context(|| format!("failed to load secret store {}", path.display()))?;
        orchestrator = orchestrator.with_secrets(secrets);
    }

    tracing::info!(
        "Migrating {} from {} to {}",
        plan,
        settings.source.host,
        settings.target.host
    );
    let receipt = orchestrator.execute(plan, header).await?;
    println!("{}", receipt.render_text());

    Ok(receipt.status().exit_code())
}

fn transform(args: &ExportArgs) -> anyhow::Result<i32> {
    let report = transform_export_file(&args.input, &args.output, &args.mapping, args.strip_local_users)
        .with_context(|| format!("failed to transform {}", args.input.display()))?;

    println!("Rewrote {} username(s)", report.rewritten);
    if report.stripped_users {
        println!("Local users removed");
    }
    if !report.unmapped.is_empty() {
        println!("Unmapped users left unchanged: {}", report.unmapped.join(", "));
    }
    Ok(0)
}
