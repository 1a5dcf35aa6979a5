pub mod ast;
pub mod errors;

pub(crate) mod engine;
pub(crate) mod grammar;

mod display;
mod resolve;

use errors::Error;
use log::debug;

use crate::dsl::ast::RawCloudFormation;

pub type Result<R> = std::result::Result<R, Error>;

/// Parses `source` into its unresolved AST.
pub fn parse(source: &str) -> Result<RawCloudFormation> {
    parse_named(source, "")
}

/// Same as [`parse`]; `source_name` is reported in syntax errors.
pub fn parse_named(source: &str, source_name: &str) -> Result<RawCloudFormation> {
    grammar::parse_formation(source, source_name)
}

pub fn compile(source: &str) -> Result<RawCloudFormation> {
    compile_named(source, "")
}

///
/// Parse, resolve every `include`, then validate. This is what a provisioning
/// backend consumes.
///
pub fn compile_named(source: &str, source_name: &str) -> Result<RawCloudFormation> {
    let mut formation = parse_named(source, source_name)?;
    formation.resolve_bootstrap_sequence_includes()?;
    formation.validate()?;
    debug!("Compiled {:?}", source_name);
    Ok(formation)
}
