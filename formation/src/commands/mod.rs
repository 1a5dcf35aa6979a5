pub(crate) mod files;
pub mod completions;
pub mod parse_tree;
pub mod validate;

//
// Constants
//
// Application metadata
pub const APP_NAME: &str = "formation";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
// Commands
pub const PARSE_TREE: &str = "parse-tree";
pub const VALIDATE: &str = "validate";
pub const COMPLETIONS: &str = "completions";
// Arguments for validate, parse tree
pub const RULES: (&str, char) = ("rules", 'r');
// Arguments for parse-tree
pub const OUTPUT: (&str, char) = ("output", 'o');
pub const PRINT_JSON: (&str, char) = ("print-json", 'p');
pub const PRINT_YAML: (&str, char) = ("print-yaml", 'y');
pub const CANONICAL: (&str, char) = ("canonical", 'c');
pub const UNRESOLVED: (&str, char) = ("unresolved", 'u');
pub const APPLY_DEFAULTS: (&str, char) = ("apply-defaults", 'a');
// Arguments for completions
pub const SHELL: (&str, char) = ("shell", 's');
// Global
pub const VERBOSE: (&str, char) = ("verbose", 'v');

pub(crate) const FORMATION_FILE_SUPPORTED_EXTENSIONS: [&str; 2] = [".formation", ".fdsl"];

pub const FAILURE_STATUS_CODE: i32 = 19;
pub const SUCCESS_STATUS_CODE: i32 = 0;
pub const ERROR_STATUS_CODE: i32 = 5;
