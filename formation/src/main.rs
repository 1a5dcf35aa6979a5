use std::collections::HashMap;
use std::fs::File;
use std::process::exit;

use clap::{Arg, ArgAction};
use log::{debug, Level};

use formation_dsl::commands::{APP_NAME, APP_VERSION, ERROR_STATUS_CODE, OUTPUT, PARSE_TREE, VERBOSE};
use formation_dsl::utils::get_formation_commands;
use formation_dsl::utils::reader::{ReadBuffer, Reader};
use formation_dsl::utils::writer::{WriteBuffer::File as WBFile, WriteBuffer::Stderr, WriteBuffer::Stdout, Writer};
use formation_dsl::Error;

fn main() -> Result<(), Error> {
    let mut app = clap::Command::new(APP_NAME)
        .version(APP_VERSION)
        .about(
            r#"
  Compiles cloud formation documents: defaults, named bootstrap sequences, a load
  balancer with its HTTP/TCP pools, and standalone boxes. Documents are parsed,
  their bootstrap sequence includes are resolved, and the result is validated
  before a provisioning backend consumes it."#,
        )
        .arg(
            Arg::new(VERBOSE.0)
                .long(VERBOSE.0)
                .short(VERBOSE.1)
                .action(ArgAction::Count)
                .global(true)
                .help("Increase logging, repeat for more detail"),
        )
        .arg_required_else_help(true);

    let commands = get_formation_commands();
    let mappings = commands.iter().map(|s| (s.name(), s)).fold(
        HashMap::with_capacity(commands.len()),
        |mut map, entry| {
            map.insert(entry.0, entry.1.as_ref());
            map
        },
    );

    for each in &commands {
        app = app.subcommand(each.command());
    }

    let help = app.render_usage();
    let app = app.get_matches();

    let log_level = match app.get_count(VERBOSE.0) {
        0 => Level::Error,
        1 => Level::Info,
        2 => Level::Debug,
        _ => Level::Trace,
    };
    if let Err(e) = simple_logger::init_with_level(log_level) {
        eprintln!("Unable to initialize logging {e}");
    }

    match app.subcommand() {
        Some((name, value)) => {
            if let Some(command) = mappings.get(name) {
                debug!("Running {} with {:?}", name, value);
                let mut output_writer: Writer = if command.name() == PARSE_TREE {
                    match value.get_one::<String>(OUTPUT.0) {
                        Some(file) => {
                            Writer::new(WBFile(File::create(file)?), Stderr(std::io::stderr()))
                        }
                        None => Writer::new(Stdout(std::io::stdout()), Stderr(std::io::stderr())),
                    }
                } else {
                    Writer::new(Stdout(std::io::stdout()), Stderr(std::io::stderr()))
                };

                match (*command).execute(
                    value,
                    &mut output_writer,
                    &mut Reader::new(ReadBuffer::Stdin(std::io::stdin())),
                ) {
                    Err(e) => {
                        if output_writer.write_err(format!("Error occurred {e}")).is_err() {
                            eprintln!("Error occurred {e}");
                        }
                        exit(ERROR_STATUS_CODE);
                    }
                    Ok(code) => exit(code),
                }
            } else {
                println!("{}", help);
            }
        }
        None => {
            println!("{}", help);
        }
    }

    Ok(())
}
