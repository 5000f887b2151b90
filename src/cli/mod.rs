//! Command-line interface definitions for the `ovh-provider` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use camino::Utf8PathBuf;
use clap::{Args, Parser};

/// Exit codes shared by every subcommand.
pub(crate) const EXIT_STATUS_HELP: &str = "Exit status:\n  \
    0  success\n  \
    1  configuration, attribute, or API error (one line on stderr)\n  \
    3  `read` found that the object no longer exists\n\n\
    Credentials come from OVH_ENDPOINT, OVH_APPLICATION_KEY, \
    OVH_APPLICATION_SECRET and OVH_CONSUMER_KEY.";

/// Top-level CLI for the `ovh-provider` binary.
#[derive(Debug, Parser)]
#[command(
    name = "ovh-provider",
    about = "Drive OVHcloud resources through the provider's resource handlers",
    after_long_help = EXIT_STATUS_HELP,
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// List the registered resource and data-source types.
    #[command(name = "resources", about = "List registered resource and data-source types")]
    Resources,
    /// Create a resource and print its state.
    #[command(name = "apply", about = "Create a resource and print its state")]
    Apply(ApplyCommand),
    /// Update an existing resource in place.
    #[command(name = "update", about = "Update an existing resource in place")]
    Update(UpdateCommand),
    /// Import and print the current state of a resource.
    #[command(name = "read", about = "Import and print the current state of a resource")]
    Read(TargetArgs),
    /// Delete a resource and wait until it is gone.
    #[command(name = "destroy", about = "Delete a resource and wait until it is gone")]
    Destroy(DestroyCommand),
    /// Run a data-source lookup.
    #[command(name = "lookup", about = "Run a data-source lookup")]
    Lookup(LookupCommand),
}

/// Resource type and import id addressing an existing object.
#[derive(Debug, Args)]
pub(crate) struct TargetArgs {
    /// Terraform type name, for example `ovh_cloud_project_database`.
    #[arg(value_name = "TYPE")]
    pub(crate) resource_type: String,
    /// Composite import id, for example `service_name/engine/id`.
    #[arg(value_name = "IMPORT_ID")]
    pub(crate) import_id: String,
}

/// Arguments for `ovh-provider apply`.
#[derive(Debug, Args)]
pub(crate) struct ApplyCommand {
    /// Terraform type name of the resource to create.
    #[arg(value_name = "TYPE")]
    pub(crate) resource_type: String,
    /// JSON file holding the resource arguments.
    #[arg(long, value_name = "FILE")]
    pub(crate) attributes: Utf8PathBuf,
    /// Wait budget in seconds; defaults to the resource's create timeout.
    #[arg(long, value_name = "SECS")]
    pub(crate) timeout: Option<u64>,
}

/// Arguments for `ovh-provider update`.
#[derive(Debug, Args)]
pub(crate) struct UpdateCommand {
    /// Object to update.
    #[command(flatten)]
    pub(crate) target: TargetArgs,
    /// JSON file holding the new resource arguments.
    #[arg(long, value_name = "FILE")]
    pub(crate) attributes: Utf8PathBuf,
    /// Wait budget in seconds; defaults to the resource's update timeout.
    #[arg(long, value_name = "SECS")]
    pub(crate) timeout: Option<u64>,
}

/// Arguments for `ovh-provider destroy`.
#[derive(Debug, Args)]
pub(crate) struct DestroyCommand {
    /// Object to delete.
    #[command(flatten)]
    pub(crate) target: TargetArgs,
    /// Wait budget in seconds; defaults to the resource's delete timeout.
    #[arg(long, value_name = "SECS")]
    pub(crate) timeout: Option<u64>,
}

/// Arguments for `ovh-provider lookup`.
#[derive(Debug, Args)]
pub(crate) struct LookupCommand {
    /// Terraform type name of the data source.
    #[arg(value_name = "DATA_SOURCE")]
    pub(crate) data_source: String,
    /// JSON file holding the lookup arguments; an empty query is used when
    /// omitted.
    #[arg(long, value_name = "FILE")]
    pub(crate) attributes: Option<Utf8PathBuf>,
}
