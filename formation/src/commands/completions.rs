use clap::{Arg, ArgAction, ArgMatches, ValueEnum};

use crate::command::Command;
use crate::commands::{APP_NAME, APP_VERSION, COMPLETIONS, SHELL, SUCCESS_STATUS_CODE};
use crate::dsl::errors::Error;
use crate::dsl::Result;
use crate::utils::reader::Reader;
use crate::utils::writer::Writer;

#[derive(Copy, Clone, ValueEnum, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[derive(Clone, Copy, Eq, PartialEq)]
pub struct Completions {}

#[allow(clippy::new_without_default)]
impl Completions {
    pub fn new() -> Self {
        Completions {}
    }
}

impl Command for Completions {
    fn name(&self) -> &'static str {
        COMPLETIONS
    }

    fn command(&self) -> clap::Command {
        clap::Command::new(COMPLETIONS)
            .about("Generate auto-completions for the formation command line")
            .arg(
                Arg::new(SHELL.0)
                    .long(SHELL.0)
                    .short(SHELL.1)
                    .value_name("shell")
                    .help("the shell you are currently running")
                    .value_parser(clap::value_parser!(Shell))
                    .action(ArgAction::Set)
                    .required(true),
            )
    }

    fn execute(&self, app: &ArgMatches, writer: &mut Writer, _: &mut Reader) -> Result<i32> {
        let shell = match app.get_one::<Shell>(SHELL.0) {
            Some(shell) => *shell,
            None => {
                return Err(Error::IllegalArguments(format!(
                    "--{} is required",
                    SHELL.0
                )))
            }
        };

        let mut formation = clap::Command::new(APP_NAME).version(APP_VERSION);
        for each in crate::utils::get_formation_commands() {
            formation = formation.subcommand(each.command());
        }

        match shell {
            Shell::Bash => clap_complete::generate(
                clap_complete::shells::Bash,
                &mut formation,
                APP_NAME,
                writer,
            ),
            Shell::Zsh => clap_complete::generate(
                clap_complete::shells::Zsh,
                &mut formation,
                APP_NAME,
                writer,
            ),
            Shell::Fish => clap_complete::generate(
                clap_complete::shells::Fish,
                &mut formation,
                APP_NAME,
                writer,
            ),
            Shell::PowerShell => clap_complete::generate(
                clap_complete::shells::PowerShell,
                &mut formation,
                APP_NAME,
                writer,
            ),
        }

        Ok(SUCCESS_STATUS_CODE)
    }
}
