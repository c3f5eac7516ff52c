use crate::Cli;
use anyhow::{bail, Result};
use clap::CommandFactory;
use clap_complete::{
    generate,
    shells::{Bash, Fish, Zsh},
};
use std::io;

pub fn run(shell: String) -> Result<()> {
    let mut cmd = Cli::command();
    match shell.as_str() {
        "bash" => generate(Bash, &mut cmd, "apigee", &mut io::stdout()),
        "zsh" => generate(Zsh, &mut cmd, "apigee", &mut io::stdout()),
        "fish" => generate(Fish, &mut cmd, "apigee", &mut io::stdout()),
        other => bail!("unsupported shell '{other}', choose: bash, zsh, fish"),
    }
    Ok(())
}
