use std::fmt::Formatter;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Arg, ArgAction, ArgMatches};
use colored::*;
use log::{debug, info};

use crate::command::Command;
use crate::commands::files::{
    alphabetical, get_files_with_filter, has_formation_extension, read_file_content,
};
use crate::commands::{FAILURE_STATUS_CODE, RULES, SUCCESS_STATUS_CODE, VALIDATE};
use crate::dsl::Result;
use crate::utils::reader::Reader;
use crate::utils::writer::Writer;

#[derive(Debug, Clone, PartialEq, Copy)]
pub(crate) enum Status {
    PASS,
    FAIL,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::PASS => f.write_str(&"PASS".green())?,
            Status::FAIL => f.write_str(&"FAIL".red())?,
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Eq, PartialEq)]
pub struct Validate {}

#[allow(clippy::new_without_default)]
impl Validate {
    pub fn new() -> Self {
        Validate {}
    }
}

fn formation_files(location: &str) -> Result<Vec<PathBuf>> {
    let path = Path::new(location);
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    get_files_with_filter(location, alphabetical, has_formation_extension)
}

impl Command for Validate {
    fn name(&self) -> &'static str {
        VALIDATE
    }

    fn command(&self) -> clap::Command {
        clap::Command::new(VALIDATE)
            .about(
                "Compiles cloud formation files, resolving includes and checking the result.\n\
                 Directories are searched for .formation and .fdsl files.",
            )
            .arg(
                Arg::new(RULES.0)
                    .long(RULES.0)
                    .short(RULES.1)
                    .help("Provide a cloud formation file or a directory of them")
                    .action(ArgAction::Set)
                    .required(true),
            )
            .arg_required_else_help(true)
    }

    fn execute(&self, app: &ArgMatches, writer: &mut Writer, _: &mut Reader) -> Result<i32> {
        let location = match app.get_one::<String>(RULES.0) {
            Some(location) => location,
            None => {
                return Err(crate::dsl::errors::Error::IllegalArguments(format!(
                    "--{} is required",
                    RULES.0
                )))
            }
        };

        let files = formation_files(location)?;
        info!("Validating {} cloud formation files under {}", files.len(), location);

        let mut exit_code = SUCCESS_STATUS_CODE;
        for each in files {
            let name = each.display().to_string();
            let content = read_file_content(File::open(&each)?)?;
            match crate::dsl::compile_named(&content, &name) {
                Ok(formation) => {
                    debug!(
                        "{} has {} pools and {} boxes",
                        name,
                        formation.pools.len(),
                        formation.boxes.len()
                    );
                    writeln!(writer, "{} Status = {}", name, Status::PASS)?;
                }
                Err(e) => {
                    exit_code = FAILURE_STATUS_CODE;
                    writeln!(writer, "{} Status = {}", name, Status::FAIL)?;
                    writer.write_err(format!("{}: {}", name, e))?;
                }
            }
        }

        Ok(exit_code)
    }
}
