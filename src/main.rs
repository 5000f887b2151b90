//! Binary entry point for the `ovh-provider` operator CLI.

use std::io::{self, Write};
use std::process;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use clap::Parser;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use ovh_provider::{
    ConfigError, DATA_SOURCE_TYPES, OvhConfig, Provider, ProviderError, RESOURCE_TYPES,
    ResourceState,
};

mod cli;

use cli::{ApplyCommand, Cli, DestroyCommand, LookupCommand, TargetArgs, UpdateCommand};

/// Exit status reported by `read` when the object no longer exists.
const EXIT_GONE: i32 = 3;
const LOG_ENV: &str = "OVH_PROVIDER_LOG";

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("failed to read attributes from {path}: {message}")]
    Attributes { path: Utf8PathBuf, message: String },
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
    #[error("failed to render output: {0}")]
    Render(#[from] serde_json::Error),
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<i32, CliError> {
    match cli {
        Cli::Resources => list_types(io::stdout()),
        Cli::Apply(command) => apply(command).await,
        Cli::Update(command) => update(command).await,
        Cli::Read(target) => read(target).await,
        Cli::Destroy(command) => destroy(command).await,
        Cli::Lookup(command) => lookup(command).await,
    }
}

fn provider() -> Result<Provider, CliError> {
    let config = OvhConfig::load_without_cli_args()?;
    config.validate()?;
    Ok(Provider::new(&config)?)
}

fn list_types(mut out: impl Write) -> Result<i32, CliError> {
    writeln!(out, "resources:")?;
    for name in RESOURCE_TYPES {
        writeln!(out, "  {name}")?;
    }
    writeln!(out, "data sources:")?;
    for name in DATA_SOURCE_TYPES {
        writeln!(out, "  {name}")?;
    }
    Ok(0)
}

async fn apply(command: ApplyCommand) -> Result<i32, CliError> {
    let provider = provider()?;
    let attributes = read_attributes(&command.attributes)?;
    let state = provider
        .create(
            &command.resource_type,
            attributes,
            command.timeout.map(Duration::from_secs),
        )
        .await?;
    print_state(io::stdout(), &state)
}

async fn update(command: UpdateCommand) -> Result<i32, CliError> {
    let provider = provider()?;
    let attributes = read_attributes(&command.attributes)?;
    let TargetArgs {
        resource_type,
        import_id,
    } = command.target;
    let timeout = command.timeout.map(Duration::from_secs);
    let current = provider.import(&resource_type, &import_id).await?;
    let state = provider
        .update(&resource_type, &current, attributes, timeout)
        .await?;
    print_state(io::stdout(), &state)
}

async fn read(target: TargetArgs) -> Result<i32, CliError> {
    let provider = provider()?;
    let imported = match provider
        .import(&target.resource_type, &target.import_id)
        .await
    {
        Ok(state) => state,
        Err(ProviderError::NotFound { .. }) => return Ok(EXIT_GONE),
        Err(err) => return Err(err.into()),
    };
    match provider.read(&target.resource_type, &imported).await? {
        Some(state) => print_state(io::stdout(), &state),
        None => Ok(EXIT_GONE),
    }
}

async fn destroy(command: DestroyCommand) -> Result<i32, CliError> {
    let provider = provider()?;
    let TargetArgs {
        resource_type,
        import_id,
    } = command.target;
    let timeout = command.timeout.map(Duration::from_secs);
    let current = match provider.import(&resource_type, &import_id).await {
        Ok(state) => state,
        Err(ProviderError::NotFound { .. }) => return Ok(0),
        Err(err) => return Err(err.into()),
    };
    provider.delete(&resource_type, &current, timeout).await?;
    Ok(0)
}

async fn lookup(command: LookupCommand) -> Result<i32, CliError> {
    let provider = provider()?;
    let query = match &command.attributes {
        Some(path) => read_attributes(path)?,
        None => Value::Object(Map::new()),
    };
    let result = provider.lookup(&command.data_source, query).await?;
    write_json(io::stdout(), &result)?;
    Ok(0)
}

fn read_attributes(path: &Utf8Path) -> Result<Value, CliError> {
    let fail = |message: String| CliError::Attributes {
        path: path.to_owned(),
        message,
    };
    let (dir_path, file_name) = match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if !parent.as_str().is_empty() => (parent, name),
        (_, Some(name)) => (Utf8Path::new("."), name),
        (_, None) => return Err(fail(String::from("path has no file name"))),
    };
    let dir = Dir::open_ambient_dir(dir_path, ambient_authority())
        .map_err(|err| fail(err.to_string()))?;
    let raw = dir
        .read_to_string(file_name)
        .map_err(|err| fail(err.to_string()))?;
    let value: Value = serde_json::from_str(&raw).map_err(|err| fail(err.to_string()))?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(fail(String::from("expected a JSON object")))
    }
}

fn print_state(out: impl Write, state: &ResourceState) -> Result<i32, CliError> {
    write_json(out, state)?;
    Ok(0)
}

fn write_json<T: serde::Serialize>(mut out: impl Write, value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    writeln!(out, "{rendered}")?;
    Ok(())
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
