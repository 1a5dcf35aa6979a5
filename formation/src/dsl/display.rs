use std::fmt::{Display, Formatter};

use crate::dsl::ast::*;

//
// Every node renders as the DSL text that parses back into it. Block bodies are
// indented by two spaces per level, blocks and sections are separated by a
// blank line.
//

const INDENT: &str = "  ";

fn write_pairs(f: &mut Formatter<'_>, pairs: &PairList, depth: usize) -> std::fmt::Result {
    for pair in pairs.iter() {
        writeln!(f, "{}{}", INDENT.repeat(depth), pair)?;
    }
    Ok(())
}

fn write_block_tail(
    f: &mut Formatter<'_>,
    flavor: &str,
    bootstrap_sequence: &PairList,
) -> std::fmt::Result {
    writeln!(f, "{}vm-flavor: {}", INDENT, Quoted(flavor))?;
    writeln!(f, "{}bootstrap-sequence:", INDENT)?;
    write_pairs(f, bootstrap_sequence, 2)
}

// Quoted values carry no escapes, so text holding both `'` and `"` has no DSL
// form. The grammar never produces one, a hand built value like that renders
// double quoted and does not parse back.
struct Quoted<'a>(&'a str);

impl<'a> Display for Quoted<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.0.contains('\'') {
            write!(f, "\"{}\"", self.0)
        } else {
            write!(f, "'{}'", self.0)
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Quoted(text) => Quoted(text).fmt(f),
            Value::Integer(number) => write!(f, "{}", number),
        }
    }
}

impl Display for ValueList {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self.iter().map(Value::to_string).collect();
        f.write_str(&rendered.join(", "))
    }
}

impl Display for PairNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.key, self.value)
    }
}

impl Display for PairList {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write_pairs(f, self, 0)
    }
}

impl Display for VmSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}, {} {} with {}",
            Quoted(&self.name),
            self.count,
            if self.count == 1 { "instance" } else { "instances" },
            Quoted(&self.image_name)
        )
    }
}

impl Display for NamedBootstrapSequence {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "bootstrap-sequence: {}", Quoted(&self.name))?;
        write_pairs(f, &self.sequence, 1)
    }
}

impl Display for ServicePortDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}service:", INDENT)?;
        writeln!(f, "{}port: {}", INDENT.repeat(2), self.port)?;
        writeln!(
            f,
            "{}healthcheck-endpoint: {}",
            INDENT.repeat(2),
            Quoted(&self.healthcheck_endpoint)
        )?;
        writeln!(f, "{}healthcheck-port: {}", INDENT.repeat(2), self.healthcheck_port)
    }
}

impl Display for LoadBalancerDefinitionBlock {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "load-balancer: {}", self.vm_spec)?;
        write_block_tail(f, &self.flavor, &self.bootstrap_sequence)
    }
}

impl Display for PoolDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}-pool: {}", self.tag(), self.vm_spec())?;
        writeln!(f, "{}vm-flavor: {}", INDENT, Quoted(self.flavor()))?;
        match self {
            PoolDefinition::Http(http) => {
                for service in &http.services {
                    write!(f, "{}", service)?;
                }
            }
            PoolDefinition::Tcp(tcp) => {
                let ports: Vec<String> = tcp.ports.iter().map(u64::to_string).collect();
                writeln!(f, "{}ports: {}", INDENT, ports.join(", "))?;
            }
        }
        writeln!(f, "{}bootstrap-sequence:", INDENT)?;
        write_pairs(f, self.bootstrap_sequence(), 2)
    }
}

impl Display for BoxDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "box: {}", self.vm_spec)?;
        write_block_tail(f, &self.flavor, &self.bootstrap_sequence)
    }
}

impl Display for RawCloudFormation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut blocks: Vec<String> = Vec::new();
        if !self.defaults.is_empty() {
            let mut defaults = String::from("defaults:\n");
            for pair in self.defaults.iter() {
                defaults.push_str(&format!("{}{}\n", INDENT, pair));
            }
            blocks.push(defaults);
        }
        blocks.extend(self.bootstrap_sequences.iter().map(|each| each.to_string()));
        if let Some(lb) = &self.load_balancer {
            blocks.push(lb.to_string());
        }
        blocks.extend(self.pools.iter().map(|each| each.to_string()));
        blocks.extend(self.boxes.iter().map(|each| each.to_string()));
        f.write_str(&blocks.join("\n"))
    }
}

#[cfg(test)]
#[path = "display_tests.rs"]
mod display_tests;
