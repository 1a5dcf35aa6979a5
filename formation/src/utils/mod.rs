use crate::{command::Command, commands};

pub mod reader;
pub mod writer;

pub fn get_formation_commands() -> Vec<Box<dyn Command>> {
    vec![
        Box::new(commands::parse_tree::ParseTree::new()),
        Box::new(commands::validate::Validate::new()),
        Box::new(commands::completions::Completions::new()),
    ]
}
