// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

pub mod command;
pub mod commands;
pub mod dsl;
pub mod utils;

pub use crate::dsl::ast::RawCloudFormation;
pub use crate::dsl::errors::Error;
pub use crate::dsl::{compile, compile_named, parse, parse_named, Result};
