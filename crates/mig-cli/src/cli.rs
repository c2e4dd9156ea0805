//! Command tree

use clap::{Args, Parser, Subcommand, ValueEnum};
use mig_core::AmbiguityPolicy;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "mig")]
#[command(author, version, about = "Migrate automation-controller configuration from AWX to AAP", long_about = None)]
#[command(propagate_version = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,

    /// Log filter, e.g. `debug` or `mig_core=debug` (RUST_LOG when unset)
    #[arg(long, global = true)]
    pub(crate) log_level: Option<String>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub(crate) log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// What to do when a name matches several target entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum Ambiguity {
    /// Take the first match and warn
    FirstMatch,
    /// Fail the entity
    Reject,
}

impl From<Ambiguity> for AmbiguityPolicy {
    fn from(value: Ambiguity) -> Self {
        match value {
            Ambiguity::FirstMatch => Self::FirstMatch,
            Ambiguity::Reject => Self::Reject,
        }
    }
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Migrate projects, or classify them against a reference platform
    Projects(ProjectsArgs),
    /// Migrate credentials
    Credentials(RunArgs),
    /// Migrate notification templates
    NotificationTemplates(RunArgs),
    /// Migrate job templates with their credentials, notifications and schedules
    JobTemplates(JobTemplateArgs),
    /// Projects, credentials, notification templates, then job templates
    All(AllArgs),
    /// Rewrite usernames in an exported asset bundle
    TransformExport(ExportArgs),
}

/// Connection and run options shared by every migration command
#[derive(Debug, Args)]
pub(crate) struct RunArgs {
    /// Source AWX host
    #[arg(long, env = "MIG_SOURCE_HOST")]
    pub(crate) source_host: Option<String>,

    /// Source AWX token
    #[arg(long, env = "MIG_SOURCE_TOKEN", hide_env_values = true)]
    pub(crate) source_token: Option<String>,

    /// Target AAP host
    #[arg(long, env = "MIG_TARGET_HOST")]
    pub(crate) target_host: Option<String>,

    /// Target AAP token
    #[arg(long, env = "MIG_TARGET_TOKEN", hide_env_values = true)]
    pub(crate) target_token: Option<String>,

    /// Verify TLS certificates (off unless set here or in the run file)
    #[arg(long)]
    pub(crate) verify_tls: bool,

    /// Run file (TOML, or YAML for .yml/.yaml)
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,

    /// Target organization id
    #[arg(long)]
    pub(crate) org_id: Option<u64>,

    /// Only names matching this regex are considered
    #[arg(long)]
    pub(crate) include: Option<String>,

    /// Names matching this regex are skipped
    #[arg(long)]
    pub(crate) exclude: Option<String>,

    /// Stop after this many processed entities
    #[arg(long)]
    pub(crate) limit: Option<usize>,

    /// Resolve everything, change nothing
    #[arg(long)]
    pub(crate) dry_run: bool,

    /// Local secret values (YAML or JSON)
    #[arg(long)]
    pub(crate) secrets: Option<PathBuf>,

    /// Write the receipt as JSON to this path
    #[arg(long)]
    pub(crate) receipt_out: Option<PathBuf>,

    /// Multi-match resolution policy
    #[arg(long, value_enum)]
    pub(crate) ambiguity: Option<Ambiguity>,
}

#[derive(Debug, Args)]
pub(crate) struct ProjectsArgs {
    #[command(flatten)]
    pub(crate) run: RunArgs,

    /// Migrate one source project by id
    #[arg(long, conflicts_with = "compare_with")]
    pub(crate) id: Option<u64>,

    /// Reference platform host; projects whose repository it already has are matched, not created
    #[arg(long)]
    pub(crate) compare_with: Option<String>,

    /// Reference platform token
    #[arg(long, env = "MIG_REFERENCE_TOKEN", hide_env_values = true)]
    pub(crate) compare_token: Option<String>,

    /// Name prefix for projects created in compare mode
    #[arg(long)]
    pub(crate) prefix: Option<String>,
}

/// Job template options shared by `job-templates` and `all`
#[derive(Debug, Args)]
pub(crate) struct TemplateArgs {
    /// Execution environment id forced onto migrated job templates
    #[arg(long, env = "FORCE_EE_ID")]
    pub(crate) ee_id: Option<u64>,

    /// Leave schedules behind
    #[arg(long)]
    pub(crate) no_schedules: bool,

    /// Job tags forced onto migrated schedules
    #[arg(long)]
    pub(crate) schedule_job_tags: Option<String>,

    /// Skip tags forced onto migrated schedules
    #[arg(long)]
    pub(crate) schedule_skip_tags: Option<String>,

    /// Host limit forced onto migrated schedules
    #[arg(long)]
    pub(crate) schedule_limit: Option<String>,

    /// Verbosity forced onto migrated schedules
    #[arg(long)]
    pub(crate) schedule_verbosity: Option<u8>,

    /// Timeout forced onto migrated schedules
    #[arg(long)]
    pub(crate) schedule_timeout: Option<u32>,

    /// Execution environment id forced onto migrated schedules
    #[arg(long)]
    pub(crate) schedule_ee_id: Option<u64>,
}

#[derive(Debug, Args)]
pub(crate) struct JobTemplateArgs {
    #[command(flatten)]
    pub(crate) run: RunArgs,

    /// Migrate one source job template by id
    #[arg(long, env = "TEMPLATE_ID")]
    pub(crate) id: Option<u64>,

    #[command(flatten)]
    pub(crate) templates: TemplateArgs,
}

#[derive(Debug, Args)]
pub(crate) struct AllArgs {
    #[command(flatten)]
    pub(crate) run: RunArgs,

    #[command(flatten)]
    pub(crate) templates: TemplateArgs,
}

#[derive(Debug, Args)]
pub(crate) struct ExportArgs {
    /// Exported asset bundle (JSON)
    #[arg(long)]
    pub(crate) input: PathBuf,

    /// Where the rewritten bundle is written
    #[arg(long)]
    pub(crate) output: PathBuf,

    /// Username mapping (JSON object, source name to target name)
    #[arg(long)]
    pub(crate) mapping: PathBuf,

    /// Empty the bundle's local user list
    #[arg(long)]
    pub(crate) strip_local_users: bool,
}
