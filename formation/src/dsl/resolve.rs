use indexmap::IndexMap;
use log::{debug, trace};

use crate::dsl::ast::*;
use crate::dsl::errors::Error;
use crate::dsl::Result;

type Declared<'d> = IndexMap<&'d str, &'d PairList>;

impl RawCloudFormation {
    ///
    /// Replaces every `include` pair in the load balancer, pool and box bootstrap
    /// sequences with the pairs of the named sequences it references, in request
    /// order. Named sequences that include others are expanded first, so no
    /// `include` is left behind. Either every block is rewritten or, on error,
    /// none is. Running it again on a resolved formation changes nothing.
    ///
    pub fn resolve_bootstrap_sequence_includes(&mut self) -> Result<()> {
        let table = self.named_sequence_table()?;

        let mut resolved = Vec::with_capacity(self.pools.len() + self.boxes.len() + 1);
        for (owner, sequence) in self.block_sequences() {
            debug!("Resolving bootstrap sequence for {}", owner);
            resolved.push(expand(&owner, sequence, &table)?);
        }

        for (target, sequence) in self.block_sequences_mut().into_iter().zip(resolved) {
            *target = sequence;
        }
        Ok(())
    }

    pub fn is_resolved(&self) -> bool {
        self.block_sequences()
            .iter()
            .all(|(_, sequence)| !sequence.has_includes())
    }

    ///
    /// Structural checks the grammar can not express: the root invariant, unique
    /// named sequence declarations, non-empty lists, and no `include` left in a
    /// block. Call it after resolution.
    ///
    pub fn validate(&self) -> Result<()> {
        let has_pools = self.load_balancer.is_some() && !self.pools.is_empty();
        if !has_pools && self.boxes.is_empty() {
            return Err(Error::EmptyFormation);
        }
        declared_sequences(&self.bootstrap_sequences)?;

        for pool in &self.pools {
            match pool {
                PoolDefinition::Http(http) if http.services.is_empty() => {
                    return Err(Error::InvalidValue(format!(
                        "http-pool '{}' has no service blocks",
                        http.vm_spec.name
                    )))
                }
                PoolDefinition::Tcp(tcp) if tcp.ports.is_empty() => {
                    return Err(Error::InvalidValue(format!(
                        "tcp-pool '{}' has no ports",
                        tcp.vm_spec.name
                    )))
                }
                _ => {}
            }
        }

        for (owner, sequence) in self.block_sequences() {
            if sequence.is_empty() {
                return Err(Error::InvalidValue(format!(
                    "bootstrap sequence for {} is empty",
                    owner
                )));
            }
            if let Some(pair) = sequence.iter().find(|pair| pair.value.is_empty()) {
                return Err(Error::InvalidValue(format!(
                    "pair `{}` for {} has no values",
                    pair.key, owner
                )));
            }
            if sequence.has_includes() {
                return Err(Error::UnresolvedInclude(owner));
            }
        }
        Ok(())
    }

    fn named_sequence_table(&self) -> Result<IndexMap<String, PairList>> {
        let declared = declared_sequences(&self.bootstrap_sequences)?;
        let mut table = IndexMap::with_capacity(declared.len());
        for name in declared.keys() {
            let mut chain = vec![];
            resolve_named(*name, &declared, &mut table, &mut chain)?;
        }
        Ok(table)
    }
}

fn declared_sequences(sequences: &[NamedBootstrapSequence]) -> Result<Declared<'_>> {
    let mut declared = IndexMap::with_capacity(sequences.len());
    for each in sequences {
        if declared
            .insert(each.name.as_str(), &each.sequence)
            .is_some()
        {
            return Err(Error::DuplicateNamedSequence(each.name.clone()));
        }
    }
    Ok(declared)
}

//
// Depth first over include targets. `chain` holds the names currently being
// expanded; meeting one of them again is a cycle. Unknown targets are left for
// `expand` to report against the sequence that names them.
//
fn resolve_named<'d>(
    name: &'d str,
    declared: &Declared<'d>,
    table: &mut IndexMap<String, PairList>,
    chain: &mut Vec<&'d str>,
) -> Result<()> {
    if table.contains_key(name) {
        return Ok(());
    }
    if let Some(position) = chain.iter().position(|each| *each == name) {
        let mut cycle: Vec<String> = chain[position..].iter().map(|each| each.to_string()).collect();
        cycle.push(name.to_string());
        return Err(Error::CyclicInclude { chain: cycle });
    }
    let sequence: &'d PairList = match declared.get(name) {
        Some(sequence) => *sequence,
        None => return Ok(()),
    };

    chain.push(name);
    for pair in sequence.iter().filter(|pair| pair.is_include()) {
        for target in pair.value.iter().filter_map(Value::as_quoted) {
            resolve_named(target, declared, table, chain)?;
        }
    }
    chain.pop();

    let expanded = expand(&format!("bootstrap-sequence '{}'", name), sequence, table)?;
    table.insert(name.to_string(), expanded);
    Ok(())
}

fn include_name(value: &Value) -> String {
    match value {
        Value::Quoted(text) => text.clone(),
        Value::Integer(number) => number.to_string(),
    }
}

fn expand(owner: &str, sequence: &PairList, table: &IndexMap<String, PairList>) -> Result<PairList> {
    if !sequence.has_includes() {
        return Ok(sequence.clone());
    }

    let mut flattened = Vec::with_capacity(sequence.len());
    for pair in sequence.iter() {
        if !pair.is_include() {
            flattened.push(pair.clone());
            continue;
        }

        // each requested name has to match its own named sequence, a repeated
        // name matches nothing new and is reported with the missing ones
        let mut found: IndexMap<&str, &PairList> = IndexMap::with_capacity(pair.value.len());
        let mut missing = vec![];
        for value in pair.value.iter() {
            let matched = value
                .as_quoted()
                .filter(|name| !found.contains_key(name))
                .and_then(|name| table.get(name).map(|sequence| (name, sequence)));
            match matched {
                Some((name, sequence)) => {
                    found.insert(name, sequence);
                }
                None => missing.push(include_name(value)),
            }
        }
        if found.len() != pair.value.len() {
            return Err(Error::MissingNamedSequence {
                sequence: owner.to_string(),
                names: pair.value.iter().map(include_name).collect(),
                missing,
            });
        }

        trace!(
            "Expanding include of {} named sequences for {}",
            found.len(),
            owner
        );
        for each in found.values() {
            flattened.extend(each.iter().cloned());
        }
    }
    Ok(PairList(flattened))
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod resolve_tests;
