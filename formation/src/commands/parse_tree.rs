use std::fs::File;
use std::io::{Read, Write};

use clap::{Arg, ArgAction, ArgGroup, ArgMatches};
use log::debug;

use crate::command::Command;
use crate::commands::{
    APPLY_DEFAULTS, CANONICAL, ERROR_STATUS_CODE, OUTPUT, PARSE_TREE, PRINT_JSON, PRINT_YAML,
    RULES, SUCCESS_STATUS_CODE, UNRESOLVED,
};
use crate::dsl::ast::RawCloudFormation;
use crate::dsl::errors::Error;
use crate::dsl::Result;
use crate::utils::reader::Reader;
use crate::utils::writer::Writer;

const OUTPUT_FORMAT_GROUP: &str = "output-format";

#[derive(Clone, Copy, Eq, PartialEq)]
pub struct ParseTree {}

#[allow(clippy::new_without_default)]
impl ParseTree {
    pub fn new() -> Self {
        ParseTree {}
    }
}

impl ParseTree {
    fn compile(&self, app: &ArgMatches, content: &str, source_name: &str) -> Result<RawCloudFormation> {
        let mut formation = crate::dsl::parse_named(content, source_name)?;
        if !app.get_flag(UNRESOLVED.0) {
            formation.resolve_bootstrap_sequence_includes()?;
            formation.validate()?;
        }
        if app.get_flag(APPLY_DEFAULTS.0) {
            formation.apply_defaults();
        }
        Ok(formation)
    }
}

impl Command for ParseTree {
    fn name(&self) -> &'static str {
        PARSE_TREE
    }

    fn command(&self) -> clap::Command {
        clap::Command::new(PARSE_TREE)
            .about("Prints out the parse tree for the cloud formation defined in the file.")
            .arg(
                Arg::new(RULES.0)
                    .long(RULES.0)
                    .short(RULES.1)
                    .help("Provide a cloud formation file, reads from stdin when absent")
                    .action(ArgAction::Set)
                    .required(false),
            )
            .arg(
                Arg::new(OUTPUT.0)
                    .long(OUTPUT.0)
                    .short(OUTPUT.1)
                    .help("Write to output file")
                    .action(ArgAction::Set)
                    .required(false),
            )
            .arg(
                Arg::new(PRINT_JSON.0)
                    .long(PRINT_JSON.0)
                    .short(PRINT_JSON.1)
                    .action(ArgAction::SetTrue)
                    .help("Print output in JSON format"),
            )
            .arg(
                Arg::new(PRINT_YAML.0)
                    .long(PRINT_YAML.0)
                    .short(PRINT_YAML.1)
                    .action(ArgAction::SetTrue)
                    .required(false)
                    .help("Print output in YAML format (default)"),
            )
            .arg(
                Arg::new(CANONICAL.0)
                    .long(CANONICAL.0)
                    .short(CANONICAL.1)
                    .action(ArgAction::SetTrue)
                    .help("Print output as canonical cloud formation text"),
            )
            .group(
                ArgGroup::new(OUTPUT_FORMAT_GROUP)
                    .args([PRINT_JSON.0, PRINT_YAML.0, CANONICAL.0])
                    .required(false)
                    .multiple(false),
            )
            .arg(
                Arg::new(UNRESOLVED.0)
                    .long(UNRESOLVED.0)
                    .short(UNRESOLVED.1)
                    .action(ArgAction::SetTrue)
                    .help("Skip include resolution and validation, print the tree as parsed"),
            )
            .arg(
                Arg::new(APPLY_DEFAULTS.0)
                    .long(APPLY_DEFAULTS.0)
                    .short(APPLY_DEFAULTS.1)
                    .action(ArgAction::SetTrue)
                    .help("Merge the defaults section into every bootstrap sequence"),
            )
    }

    fn execute(&self, app: &ArgMatches, writer: &mut Writer, reader: &mut Reader) -> Result<i32> {
        let source_name = app
            .get_one::<String>(RULES.0)
            .map_or(String::new(), String::from);
        let mut file: Box<dyn Read + '_> = match app.get_one::<String>(RULES.0) {
            Some(file) => Box::new(std::io::BufReader::new(File::open(file)?)),
            None => Box::new(reader),
        };

        let mut content = String::new();
        file.read_to_string(&mut content)?;
        debug!("Read {} bytes of cloud formation text", content.len());

        let formation = match self.compile(app, &content, &source_name) {
            Err(e) if e.is_semantic() || matches!(e, Error::ParseError(_)) => {
                writer.write_err(format!("Parsing error handling cloud formation, Error = {e}"))?;
                return Ok(ERROR_STATUS_CODE);
            }
            Err(e) => return Err(e),
            Ok(formation) => formation,
        };

        if app.get_flag(PRINT_JSON.0) {
            serde_json::to_writer_pretty(&mut *writer, &formation)?;
            writeln!(writer)?;
        } else if app.get_flag(CANONICAL.0) {
            write!(writer, "{}", formation)?;
        } else {
            serde_yaml::to_writer(&mut *writer, &formation)?;
        }

        Ok(SUCCESS_STATUS_CODE)
    }
}
