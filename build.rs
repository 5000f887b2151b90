//! Build script for the `ovh-provider` man pages.
//!
//! Renders `ovh-provider.1` for the top-level command and one
//! `ovh-provider-<subcommand>.1` page per subcommand into the build output
//! directory, so packaging can install the provider's full command reference.

use std::env;
use std::fs::File;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Command, CommandFactory};
use clap_mangen::Man;

#[path = "src/cli/mod.rs"]
#[expect(dead_code, reason = "the build script only renders the parser")]
mod cli;

use cli::Cli;

const BIN_NAME: &str = "ovh-provider";

fn render(
    command: Command,
    title: &str,
    out_dir: &Utf8Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let page = out_dir.join(format!("{title}.1"));
    let mut buffer = Vec::new();
    Man::new(command).title(title).render(&mut buffer)?;
    File::create(page)?.write_all(&buffer)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = std::io::stdout();
    writeln!(stdout, "cargo:rerun-if-changed=build.rs")?;
    writeln!(stdout, "cargo:rerun-if-changed=src/cli/mod.rs")?;

    let out_dir = env::var("OUT_DIR").map(Utf8PathBuf::from).map_err(|err| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("OUT_DIR is not usable: {err}"),
        )
    })?;

    let command = Cli::command();
    for subcommand in command.get_subcommands() {
        let title = format!("{BIN_NAME}-{}", subcommand.get_name());
        render(subcommand.clone(), &title, &out_dir)?;
    }
    render(command, BIN_NAME, &out_dir)?;

    Ok(())
}
