//! Run file loading and flag merging
//!
//! A run file holds the same settings as the flags:
//!
//! ```toml
//! secrets = "secrets.yaml"
//!
//! [source]
//! host = "https://awx.example.com"
//! token = "..."
//!
//! [target]
//! host = "https://aap.example.com"
//! token = "..."
//! verify_tls = true
//!
//! [run]
//! organization = 4
//! force_execution_environment = 3
//! exclude = "^tmp-"
//! ```
//!
//! Flags win over the file. Boolean flags can only switch a setting on.

use crate::cli::{RunArgs, TemplateArgs};
use anyhow::{bail, Context};
use mig_core::RunConfig;
use mig_http::Endpoint;
use mig_model::EntityId;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Settings as read from `--config`
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RunFile {
    pub(crate) source: Option<Endpoint>,
    pub(crate) target: Option<Endpoint>,
    pub(crate) reference: Option<Endpoint>,
    pub(crate) secrets: Option<PathBuf>,
    pub(crate) run: RunConfig,
}

impl RunFile {
    /// Read a run file; YAML for `.yml`/`.yaml`, TOML otherwise
    pub(crate) fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read run file {}", path.display()))?;
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"));

        let file = if is_yaml {
            serde_yaml::from_str(&text).with_context(|| format!("invalid run file {}", path.display()))?
        } else {
            toml::from_str(&text).with_context(|| format!("invalid run file {}", path.display()))?
        };
        Ok(file)
    }
}

/// Everything a migration command needs, flags and file merged
#[derive(Debug)]
pub(crate) struct Settings {
    pub(crate) source: Endpoint,
    pub(crate) target: Endpoint,
    pub(crate) secrets: Option<PathBuf>,
    pub(crate) config: RunConfig,
    reference: Option<Endpoint>,
    verify_tls: bool,
}

impl Settings {
    /// Load the run file named by `--config`, if any, and merge the flags over it
    pub(crate) fn load(args: &RunArgs) -> anyhow::Result<Self> {
        let file = match &args.config {
            Some(path) => RunFile::load(path)?,
            None => RunFile::default(),
        };
        Self::resolve(args, file)
    }

    /// Merge flags over a run file
    pub(crate) fn resolve(args: &RunArgs, file: RunFile) -> anyhow::Result<Self> {
        let source = endpoint(
            "source",
            args.source_host.as_deref(),
            args.source_token.as_deref(),
            file.source.as_ref(),
            args.verify_tls,
        )?;
        let target = endpoint(
            "target",
            args.target_host.as_deref(),
            args.target_token.as_deref(),
            file.target.as_ref(),
            args.verify_tls,
        )?;

        let mut config = file.run;
        if let Some(id) = args.org_id {
            config.organization = Some(EntityId(id));
        }
        if args.include.is_some() {
            config.include.clone_from(&args.include);
        }
        if args.exclude.is_some() {
            config.exclude.clone_from(&args.exclude);
        }
        if args.limit.is_some() {
            config.limit = args.limit;
        }
        config.dry_run |= args.dry_run;
        if let Some(path) = &args.receipt_out {
            config.receipt_path = Some(path.clone());
        }
        if let Some(policy) = args.ambiguity {
            config.ambiguity = policy.into();
        }

        Ok(Self {
            source,
            target,
            secrets: args.secrets.clone().or(file.secrets),
            config,
            reference: file.reference,
            verify_tls: args.verify_tls,
        })
    }

    /// Reference platform for compare mode, from flags or the run file
    pub(crate) fn reference(
        &self,
        host: Option<&str>,
        token: Option<&str>,
    ) -> anyhow::Result<Option<Endpoint>> {
        if host.is_none() && self.reference.is_none() {
            return Ok(None);
        }
        endpoint("reference", host, token, self.reference.as_ref(), self.verify_tls).map(Some)
    }

    /// Apply job template and schedule flags
    pub(crate) fn apply_templates(&mut self, args: &TemplateArgs) {
        let config = &mut self.config;
        if let Some(id) = args.ee_id {
            config.force_execution_environment = Some(EntityId(id));
        }
        if args.no_schedules {
            config.migrate_schedules = false;
        }

        let overrides = &mut config.schedule_overrides;
        if args.schedule_job_tags.is_some() {
            overrides.job_tags.clone_from(&args.schedule_job_tags);
        }
        if args.schedule_skip_tags.is_some() {
            overrides.skip_tags.clone_from(&args.schedule_skip_tags);
        }
        if args.schedule_limit.is_some() {
            overrides.limit.clone_from(&args.schedule_limit);
        }
        if args.schedule_verbosity.is_some() {
            overrides.verbosity = args.schedule_verbosity;
        }
        if args.schedule_timeout.is_some() {
            overrides.timeout = args.schedule_timeout;
        }
        if let Some(id) = args.schedule_ee_id {
            overrides.execution_environment = Some(EntityId(id));
        }
    }
}

fn endpoint(
    role: &str,
    host: Option<&str>,
    token: Option<&str>,
    file: Option<&Endpoint>,
    verify_tls: bool,
) -> anyhow::Result<Endpoint> {
    let Some(host) = host.or_else(|| file.map(|f| f.host.as_str())) else {
        bail!("no {role} host given (--{role}-host or the run file)");
    };
    let Some(token) = token
        .or_else(|| file.map(|f| f.token.as_str()))
        .filter(|t| !t.trim().is_empty())
    else {
        bail!(
            "no {role} token given (--{role}-token, MIG_{}_TOKEN or the run file)",
            role.to_ascii_uppercase()
        );
    };

    let mut endpoint =
        Endpoint::new(host, token).with_verify_tls(verify_tls || file.is_some_and(|f| f.verify_tls));
    if let Some(file) = file {
        endpoint = endpoint
            .with_timeout(file.timeout())
            .with_page_size(file.page_size);
    }
    Ok(endpoint)
}
