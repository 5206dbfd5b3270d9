//! Renders the `buildbox` manual pages into `OUT_DIR`.
//!
//! `buildbox.1` covers the whole tool. Each workflow also gets its own page
//! (`buildbox-provision.1`, `buildbox-teardown.1`) so `man buildbox-teardown`
//! works once the pages are installed.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Command, CommandFactory};
use clap_mangen::Man;

#[path = "src/cli/mod.rs"]
mod cli;

use cli::Cli;

const MANUAL: &str = "buildbox manual";
const WATCHED: [&str; 3] = ["build.rs", "src/cli/mod.rs", "Cargo.toml"];

fn out_dir() -> io::Result<PathBuf> {
    env::var_os("OUT_DIR")
        .map(PathBuf::from)
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "OUT_DIR was not set"))
}

fn render_page(command: Command, title: &str, dir: &Path) -> io::Result<()> {
    let source = format!("buildbox {}", env!("CARGO_PKG_VERSION"));
    let page = Man::new(command)
        .title(title.to_ascii_uppercase())
        .manual(MANUAL)
        .source(source);

    let mut rendered = Vec::new();
    page.render(&mut rendered)?;
    fs::write(dir.join(format!("{title}.1")), rendered)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = io::stdout();
    for path in WATCHED {
        writeln!(stdout, "cargo:rerun-if-changed={path}")?;
    }

    let dir = out_dir()?;
    let command = Cli::command();
    for workflow in command.get_subcommands() {
        let title = format!("buildbox-{}", workflow.get_name());
        render_page(workflow.clone(), &title, &dir)?;
    }
    render_page(command, "buildbox", &dir)?;

    Ok(())
}
