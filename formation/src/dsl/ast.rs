use serde::{Deserialize, Serialize};

pub(crate) const INCLUDE_KEY: &str = "include";

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Hash)]
pub enum Value {
    Quoted(String),
    Integer(u64),
}

impl Value {
    pub fn as_quoted(&self) -> Option<&str> {
        match self {
            Value::Quoted(text) => Some(text),
            Value::Integer(_) => None,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Hash)]
#[serde(transparent)]
pub struct ValueList(pub Vec<Value>);

impl ValueList {
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

///
/// Kind of provisioning step a bootstrap pair stands for. The compiler only
/// classifies steps; running them is up to the provisioning backend.
///
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum BootstrapStep<'a> {
    Git(&'a ValueList),
    File(&'a ValueList),
    Directory(&'a ValueList),
    InlineBash(&'a ValueList),
    Generic { key: &'a str, value: &'a ValueList },
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Hash)]
pub struct PairNode {
    pub key: String,
    pub value: ValueList,
}

impl PairNode {
    pub fn is_include(&self) -> bool {
        self.key == INCLUDE_KEY
    }

    pub fn step(&self) -> BootstrapStep<'_> {
        match self.key.as_str() {
            "git" => BootstrapStep::Git(&self.value),
            "file" => BootstrapStep::File(&self.value),
            "directory" => BootstrapStep::Directory(&self.value),
            "inline bash" => BootstrapStep::InlineBash(&self.value),
            key => BootstrapStep::Generic {
                key,
                value: &self.value,
            },
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize, Hash)]
#[serde(transparent)]
pub struct PairList(pub Vec<PairNode>);

impl PairList {
    pub fn iter(&self) -> std::slice::Iter<'_, PairNode> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has_includes(&self) -> bool {
        self.0.iter().any(PairNode::is_include)
    }

    ///
    /// Block-local pairs shadow default pairs with the same key. Defaults that are
    /// not shadowed come first, in their declared order, followed by the local
    /// pairs in theirs.
    ///
    pub fn with_defaults(&self, defaults: &PairList) -> PairList {
        let inherited = defaults
            .iter()
            .filter(|default| !self.0.iter().any(|local| local.key == default.key));
        PairList(inherited.chain(self.0.iter()).cloned().collect())
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Hash)]
pub struct VmSpec {
    pub name: String,
    pub count: u64,
    pub image_name: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Hash)]
pub struct NamedBootstrapSequence {
    pub name: String,
    pub sequence: PairList,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Hash)]
pub struct ServicePortDefinition {
    pub port: u64,
    pub healthcheck_endpoint: String,
    pub healthcheck_port: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Hash)]
pub struct LoadBalancerDefinitionBlock {
    pub vm_spec: VmSpec,
    pub flavor: String,
    pub bootstrap_sequence: PairList,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Hash)]
pub struct HttpPoolDefinition {
    pub vm_spec: VmSpec,
    pub flavor: String,
    pub services: Vec<ServicePortDefinition>,
    pub bootstrap_sequence: PairList,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Hash)]
pub struct TcpPoolDefinition {
    pub vm_spec: VmSpec,
    pub flavor: String,
    pub ports: Vec<u64>,
    pub bootstrap_sequence: PairList,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Hash)]
pub enum PoolDefinition {
    Http(HttpPoolDefinition),
    Tcp(TcpPoolDefinition),
}

impl PoolDefinition {
    pub fn vm_spec(&self) -> &VmSpec {
        match self {
            PoolDefinition::Http(pool) => &pool.vm_spec,
            PoolDefinition::Tcp(pool) => &pool.vm_spec,
        }
    }

    pub fn flavor(&self) -> &str {
        match self {
            PoolDefinition::Http(pool) => &pool.flavor,
            PoolDefinition::Tcp(pool) => &pool.flavor,
        }
    }

    pub fn bootstrap_sequence(&self) -> &PairList {
        match self {
            PoolDefinition::Http(pool) => &pool.bootstrap_sequence,
            PoolDefinition::Tcp(pool) => &pool.bootstrap_sequence,
        }
    }

    pub(crate) fn bootstrap_sequence_mut(&mut self) -> &mut PairList {
        match self {
            PoolDefinition::Http(pool) => &mut pool.bootstrap_sequence,
            PoolDefinition::Tcp(pool) => &mut pool.bootstrap_sequence,
        }
    }

    pub(crate) fn tag(&self) -> &'static str {
        match self {
            PoolDefinition::Http(_) => "http",
            PoolDefinition::Tcp(_) => "tcp",
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Hash)]
pub struct BoxDefinition {
    pub vm_spec: VmSpec,
    pub flavor: String,
    pub bootstrap_sequence: PairList,
}

///
/// Root of a parsed document. Sections missing from the text are empty here;
/// only the load balancer stays optional.
///
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize, Hash)]
pub struct RawCloudFormation {
    pub defaults: PairList,
    pub bootstrap_sequences: Vec<NamedBootstrapSequence>,
    pub load_balancer: Option<LoadBalancerDefinitionBlock>,
    pub pools: Vec<PoolDefinition>,
    pub boxes: Vec<BoxDefinition>,
}

impl RawCloudFormation {
    ///
    /// Every bootstrap sequence owned by a block, labelled for diagnostics, in
    /// document order: load balancer, pools, boxes.
    ///
    pub fn block_sequences(&self) -> Vec<(String, &PairList)> {
        let mut sequences = Vec::with_capacity(self.pools.len() + self.boxes.len() + 1);
        if let Some(lb) = &self.load_balancer {
            sequences.push((
                format!("load-balancer '{}'", lb.vm_spec.name),
                &lb.bootstrap_sequence,
            ));
        }
        for pool in &self.pools {
            sequences.push((
                format!("{}-pool '{}'", pool.tag(), pool.vm_spec().name),
                pool.bootstrap_sequence(),
            ));
        }
        for each in &self.boxes {
            sequences.push((format!("box '{}'", each.vm_spec.name), &each.bootstrap_sequence));
        }
        sequences
    }

    pub(crate) fn block_sequences_mut(&mut self) -> Vec<&mut PairList> {
        let mut sequences = Vec::with_capacity(self.pools.len() + self.boxes.len() + 1);
        if let Some(lb) = &mut self.load_balancer {
            sequences.push(&mut lb.bootstrap_sequence);
        }
        for pool in &mut self.pools {
            sequences.push(pool.bootstrap_sequence_mut());
        }
        for each in &mut self.boxes {
            sequences.push(&mut each.bootstrap_sequence);
        }
        sequences
    }

    /// Merges the `defaults` section into every block's bootstrap sequence.
    pub fn apply_defaults(&mut self) {
        let defaults = self.defaults.clone();
        for sequence in self.block_sequences_mut() {
            *sequence = sequence.with_defaults(&defaults);
        }
    }
}

#[cfg(test)]
#[path = "ast_tests.rs"]
mod ast_tests;
