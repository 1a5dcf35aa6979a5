use lazy_static::lazy_static;
use log::debug;

use crate::dsl::ast::*;
use crate::dsl::engine::evaluate::Matcher;
use crate::dsl::engine::{
    capture, choice, commit, literal, many, many_or_none, not, one_of, optional, sequence, wildcard,
    Captures, CharClass, Expr, Grammar, GrammarBuilder, Span,
};
use crate::dsl::errors::Error;
use crate::dsl::Result;

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                                                                                //
//                          Character classes                                                     //
//                                                                                                //
////////////////////////////////////////////////////////////////////////////////////////////////////

const WS: CharClass = CharClass {
    label: "space or tab",
    chars: " \t",
    ranges: &[],
};

const DIGIT: CharClass = CharClass {
    label: "digit",
    chars: "",
    ranges: &['0'..='9'],
};

const NON_ZERO_DIGIT: CharClass = CharClass {
    label: "digit 1-9",
    chars: "",
    ranges: &['1'..='9'],
};

const LETTER: CharClass = CharClass {
    label: "letter",
    chars: "",
    ranges: &['a'..='z', 'A'..='Z'],
};

const KEY_JOINER: CharClass = CharClass {
    label: "'-' or space",
    chars: "- ",
    ranges: &[],
};

const KEY_CHAR: CharClass = CharClass {
    label: "letter, digit, '_' or '.'",
    chars: "_.",
    ranges: &['a'..='z', 'A'..='Z', '0'..='9'],
};

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                                                                                //
//                          Nodes produced by semantic actions                                    //
//                                                                                                //
////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Node {
    Integer(u64),
    Integers(Vec<u64>),
    Quoted(String),
    Key(String),
    Values(ValueList),
    Pair(PairNode),
    Pairs(PairList),
    VmSpec(VmSpec),
    Named(NamedBootstrapSequence),
    NamedList(Vec<NamedBootstrapSequence>),
    Service(ServicePortDefinition),
    Services(Vec<ServicePortDefinition>),
    LoadBalancer(LoadBalancerDefinitionBlock),
    Pool(PoolDefinition),
    Pools(Vec<PoolDefinition>),
    Box(BoxDefinition),
    Boxes(Vec<BoxDefinition>),
    Defaults(PairList),
    Formation(RawCloudFormation),
}

fn incompatible(expected: &str, found: Option<&Node>) -> Error {
    Error::IncompatibleError(format!("expected {}, found {:?}", expected, found))
}

fn quoted(captures: &Captures<Node>, name: &str) -> Result<String> {
    match captures.node(name) {
        Some(Node::Quoted(text)) => Ok(text.clone()),
        other => Err(incompatible(name, other)),
    }
}

fn integer(captures: &Captures<Node>, name: &str) -> Result<u64> {
    match captures.node(name) {
        Some(Node::Integer(value)) => Ok(*value),
        other => Err(incompatible(name, other)),
    }
}

fn pairs(captures: &Captures<Node>, name: &str) -> Result<PairList> {
    match captures.node(name) {
        Some(Node::Pairs(pairs)) => Ok(pairs.clone()),
        other => Err(incompatible(name, other)),
    }
}

fn vm_spec(captures: &Captures<Node>, name: &str) -> Result<VmSpec> {
    match captures.node(name) {
        Some(Node::VmSpec(spec)) => Ok(spec.clone()),
        other => Err(incompatible(name, other)),
    }
}

//
// Constructors handed to `listify`, one per list node.
//

fn to_integers(items: Vec<Node>) -> Result<Node> {
    let mut ports = Vec::with_capacity(items.len());
    for each in items {
        match each {
            Node::Integer(value) => ports.push(value),
            other => return Err(incompatible("integer", Some(&other))),
        }
    }
    Ok(Node::Integers(ports))
}

fn to_values(items: Vec<Node>) -> Result<Node> {
    let mut values = Vec::with_capacity(items.len());
    for each in items {
        match each {
            Node::Quoted(text) => values.push(Value::Quoted(text)),
            Node::Integer(value) => values.push(Value::Integer(value)),
            other => return Err(incompatible("quoted value or integer", Some(&other))),
        }
    }
    Ok(Node::Values(ValueList(values)))
}

fn to_pairs(items: Vec<Node>) -> Result<Node> {
    let mut pairs = Vec::with_capacity(items.len());
    for each in items {
        match each {
            Node::Pair(pair) => pairs.push(pair),
            other => return Err(incompatible("pair", Some(&other))),
        }
    }
    Ok(Node::Pairs(PairList(pairs)))
}

fn to_named_list(items: Vec<Node>) -> Result<Node> {
    let mut sequences = Vec::with_capacity(items.len());
    for each in items {
        match each {
            Node::Named(sequence) => sequences.push(sequence),
            other => return Err(incompatible("named bootstrap sequence", Some(&other))),
        }
    }
    Ok(Node::NamedList(sequences))
}

fn to_services(items: Vec<Node>) -> Result<Node> {
    let mut services = Vec::with_capacity(items.len());
    for each in items {
        match each {
            Node::Service(service) => services.push(service),
            other => return Err(incompatible("service", Some(&other))),
        }
    }
    Ok(Node::Services(services))
}

fn to_pools(items: Vec<Node>) -> Result<Node> {
    let mut pools = Vec::with_capacity(items.len());
    for each in items {
        match each {
            Node::Pool(pool) => pools.push(pool),
            other => return Err(incompatible("pool definition", Some(&other))),
        }
    }
    Ok(Node::Pools(pools))
}

fn to_boxes(items: Vec<Node>) -> Result<Node> {
    let mut boxes = Vec::with_capacity(items.len());
    for each in items {
        match each {
            Node::Box(definition) => boxes.push(definition),
            other => return Err(incompatible("box definition", Some(&other))),
        }
    }
    Ok(Node::Boxes(boxes))
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                                                                                //
//                          Semantic actions                                                      //
//                                                                                                //
////////////////////////////////////////////////////////////////////////////////////////////////////

fn integer_action(captures: &Captures<Node>) -> Result<Vec<Node>> {
    let digits = captures.text("digits");
    match digits.parse::<u64>() {
        Ok(value) => Ok(vec![Node::Integer(value)]),
        Err(_) => Err(Error::InvalidValue(format!(
            "{} is too large for an integer",
            digits
        ))),
    }
}

fn pair_action(captures: &Captures<Node>) -> Result<Vec<Node>> {
    let key = match captures.node("key") {
        Some(Node::Key(key)) => key.clone(),
        other => return Err(incompatible("key", other)),
    };
    let value = match captures.node("value") {
        Some(Node::Values(values)) => values.clone(),
        other => return Err(incompatible("value list", other)),
    };
    Ok(vec![Node::Pair(PairNode { key, value })])
}

fn vm_spec_action(captures: &Captures<Node>) -> Result<Vec<Node>> {
    Ok(vec![Node::VmSpec(VmSpec {
        name: quoted(captures, "name")?,
        count: integer(captures, "count")?,
        image_name: quoted(captures, "image_name")?,
    })])
}

fn named_sequence_action(captures: &Captures<Node>) -> Result<Vec<Node>> {
    Ok(vec![Node::Named(NamedBootstrapSequence {
        name: quoted(captures, "name")?,
        sequence: pairs(captures, "sequence")?,
    })])
}

fn load_balancer_action(captures: &Captures<Node>) -> Result<Vec<Node>> {
    Ok(vec![Node::LoadBalancer(LoadBalancerDefinitionBlock {
        vm_spec: vm_spec(captures, "vm_spec")?,
        flavor: quoted(captures, "flavor")?,
        bootstrap_sequence: pairs(captures, "bootstrap_sequence")?,
    })])
}

fn service_action(captures: &Captures<Node>) -> Result<Vec<Node>> {
    Ok(vec![Node::Service(ServicePortDefinition {
        port: integer(captures, "port")?,
        healthcheck_endpoint: quoted(captures, "endpoint")?,
        healthcheck_port: integer(captures, "healthcheck_port")?,
    })])
}

//
// The pool tag picks the variant. An http pool listens through service blocks
// and a tcp pool through a bare ports line; anything else is rejected here.
//
fn pool_action(captures: &Captures<Node>) -> Result<Vec<Node>> {
    let pool_type = captures.text("pool_type");
    let vm_spec = vm_spec(captures, "vm_spec")?;
    let flavor = quoted(captures, "flavor")?;
    let bootstrap_sequence = pairs(captures, "bootstrap_sequence")?;
    let pool = match (pool_type.as_str(), captures.node("listeners")) {
        ("http", Some(Node::Services(services))) => PoolDefinition::Http(HttpPoolDefinition {
            vm_spec,
            flavor,
            services: services.clone(),
            bootstrap_sequence,
        }),
        ("tcp", Some(Node::Integers(ports))) => PoolDefinition::Tcp(TcpPoolDefinition {
            vm_spec,
            flavor,
            ports: ports.clone(),
            bootstrap_sequence,
        }),
        ("http", _) => {
            return Err(Error::InvalidValue(format!(
                "http-pool '{}' must declare service blocks instead of ports",
                vm_spec.name
            )))
        }
        ("tcp", _) => {
            return Err(Error::InvalidValue(format!(
                "tcp-pool '{}' must declare a ports line instead of service blocks",
                vm_spec.name
            )))
        }
        (other, _) => {
            return Err(Error::InvalidValue(format!(
                "{}-pool is not a known pool type",
                other
            )))
        }
    };
    Ok(vec![Node::Pool(pool)])
}

fn box_action(captures: &Captures<Node>) -> Result<Vec<Node>> {
    Ok(vec![Node::Box(BoxDefinition {
        vm_spec: vm_spec(captures, "vm_spec")?,
        flavor: quoted(captures, "flavor")?,
        bootstrap_sequence: pairs(captures, "bootstrap_sequence")?,
    })])
}

fn start_action(captures: &Captures<Node>) -> Result<Vec<Node>> {
    let defaults = match captures.node("defaults") {
        Some(Node::Defaults(defaults)) => defaults.clone(),
        None => PairList::default(),
        other => return Err(incompatible("defaults", other)),
    };
    let bootstrap_sequences = match captures.node("named") {
        Some(Node::NamedList(sequences)) => sequences.clone(),
        None => vec![],
        other => return Err(incompatible("named bootstrap sequences", other)),
    };
    let load_balancer = match captures.node("load_balancer") {
        Some(Node::LoadBalancer(lb)) => Some(lb.clone()),
        None => None,
        other => return Err(incompatible("load balancer", other)),
    };
    let pools = match captures.node("pools") {
        Some(Node::Pools(pools)) => pools.clone(),
        None => vec![],
        other => return Err(incompatible("pool definitions", other)),
    };
    let boxes = match captures.node("boxes") {
        Some(Node::Boxes(boxes)) => boxes.clone(),
        None => vec![],
        other => return Err(incompatible("box definitions", other)),
    };

    if load_balancer.is_none() && boxes.is_empty() {
        return Err(Error::EmptyFormation);
    }

    Ok(vec![Node::Formation(RawCloudFormation {
        defaults,
        bootstrap_sequences,
        load_balancer,
        pools,
        boxes,
    })])
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                                                                                //
//                          Rules                                                                 //
//                                                                                                //
////////////////////////////////////////////////////////////////////////////////////////////////////

fn ws() -> Expr {
    many_or_none(one_of(WS))
}

pub(crate) fn cloud_formation_grammar() -> Grammar<Node> {
    let mut g: GrammarBuilder<Node> = GrammarBuilder::new();

    // lexical layer
    let newline = g.rule(
        "newline",
        choice(vec![literal("\r\n"), literal("\n"), literal("\r")]),
    );
    let integer = g.rule_with(
        "integer",
        capture(
            "digits",
            sequence(vec![one_of(NON_ZERO_DIGIT), many_or_none(one_of(DIGIT))]),
        ),
        integer_action,
    );
    let integer_list = g.listify("integer_list", integer, literal(", "), to_integers);
    let key = g.rule_with(
        "key",
        capture(
            "key",
            sequence(vec![
                many(one_of(LETTER)),
                many_or_none(sequence(vec![one_of(KEY_JOINER), many(one_of(KEY_CHAR))])),
            ]),
        ),
        |captures| Ok(vec![Node::Key(captures.text("key"))]),
    );
    let single_quoted_value = g.rule_with(
        "single_quoted_value",
        sequence(vec![
            literal("'"),
            commit(),
            capture(
                "text",
                many_or_none(sequence(vec![
                    not(choice(vec![literal("'"), newline.into()])),
                    wildcard(),
                ])),
            ),
            literal("'"),
        ]),
        |captures| Ok(vec![Node::Quoted(captures.text("text"))]),
    );
    let double_quoted_value = g.rule_with(
        "double_quoted_value",
        sequence(vec![
            literal("\""),
            commit(),
            capture(
                "text",
                many_or_none(sequence(vec![
                    not(choice(vec![literal("\""), newline.into()])),
                    wildcard(),
                ])),
            ),
            literal("\""),
        ]),
        |captures| Ok(vec![Node::Quoted(captures.text("text"))]),
    );
    let quoted_value = g.rule(
        "quoted_value",
        choice(vec![single_quoted_value.into(), double_quoted_value.into()]),
    );
    let value = g.rule("value", choice(vec![quoted_value.into(), integer.into()]));
    let value_list = g.listify("value_list", value, literal(", "), to_values);

    // key: value lines
    let generic_pair = g.rule_with(
        "generic_pair",
        sequence(vec![
            ws(),
            capture("key", key),
            literal(": "),
            commit(),
            capture("value", value_list),
        ]),
        pair_action,
    );
    let generic_pair_list = g.listify("generic_pair_list", generic_pair, newline.into(), to_pairs);

    // 'name', 3 instances with 'image'
    let vm_spec = g.rule_with(
        "vm_spec",
        sequence(vec![
            capture("name", quoted_value),
            literal(", "),
            commit(),
            capture("count", integer),
            choice(vec![literal(" instances "), literal(" instance ")]),
            commit(),
            literal("with "),
            capture("image_name", quoted_value),
        ]),
        vm_spec_action,
    );

    let named_bootstrap_sequence = g.rule_with(
        "named_bootstrap_sequence",
        sequence(vec![
            literal("bootstrap-sequence: "),
            commit(),
            capture("name", quoted_value),
            newline.into(),
            capture("sequence", generic_pair_list),
        ]),
        named_sequence_action,
    );
    let named_bootstrap_sequence_list = g.listify(
        "named_bootstrap_sequence_list",
        named_bootstrap_sequence,
        many(newline),
        to_named_list,
    );

    // fragments shared by every block
    let vm_flavor = g.rule(
        "vm_flavor",
        sequence(vec![ws(), literal("vm-flavor: "), commit(), quoted_value.into()]),
    );
    let bootstrap_sequence = g.rule(
        "bootstrap_sequence",
        sequence(vec![
            ws(),
            literal("bootstrap-sequence:"),
            commit(),
            newline.into(),
            generic_pair_list.into(),
        ]),
    );

    let load_balancer_block = g.rule_with(
        "load_balancer_block",
        sequence(vec![
            literal("load-balancer: "),
            commit(),
            capture("vm_spec", vm_spec),
            newline.into(),
            capture("flavor", vm_flavor),
            newline.into(),
            capture("bootstrap_sequence", bootstrap_sequence),
        ]),
        load_balancer_action,
    );

    let service_def = g.rule_with(
        "service_def",
        sequence(vec![
            ws(),
            literal("service:"),
            commit(),
            newline.into(),
            ws(),
            literal("port: "),
            capture("port", integer),
            newline.into(),
            ws(),
            literal("healthcheck-endpoint: "),
            capture("endpoint", quoted_value),
            newline.into(),
            ws(),
            literal("healthcheck-port: "),
            capture("healthcheck_port", integer),
        ]),
        service_action,
    );
    let service_defs = g.listify("service_defs", service_def, newline.into(), to_services);
    let ports = g.rule(
        "ports",
        sequence(vec![ws(), literal("ports: "), commit(), integer_list.into()]),
    );

    let pool_def_block = g.rule_with(
        "pool_def_block",
        sequence(vec![
            capture("pool_type", choice(vec![literal("http"), literal("tcp")])),
            literal("-pool: "),
            commit(),
            capture("vm_spec", vm_spec),
            newline.into(),
            capture("flavor", vm_flavor),
            newline.into(),
            capture("listeners", choice(vec![service_defs.into(), ports.into()])),
            newline.into(),
            capture("bootstrap_sequence", bootstrap_sequence),
        ]),
        pool_action,
    );
    let pool_def_block_list =
        g.listify("pool_def_block_list", pool_def_block, many(newline), to_pools);

    let box_def_block = g.rule_with(
        "box_def_block",
        sequence(vec![
            literal("box: "),
            commit(),
            capture("vm_spec", vm_spec),
            newline.into(),
            capture("flavor", vm_flavor),
            newline.into(),
            capture("bootstrap_sequence", bootstrap_sequence),
        ]),
        box_action,
    );
    let box_def_block_list = g.listify("box_def_block_list", box_def_block, many(newline), to_boxes);

    let defaults = g.rule_with(
        "defaults",
        sequence(vec![
            literal("defaults:"),
            commit(),
            newline.into(),
            capture("defaults", generic_pair_list),
        ]),
        |captures| Ok(vec![Node::Defaults(pairs(captures, "defaults")?)]),
    );

    let end_of_input = g.rule(
        "end_of_input",
        sequence(vec![
            many_or_none(choice(vec![one_of(WS), newline.into()])),
            not(wildcard()),
        ]),
    );
    let section_break = g.rule("section_break", choice(vec![many(newline), end_of_input.into()]));

    //
    // defaults, then named bootstrap sequences, then a load balancer with its pools,
    // then boxes. Every section is optional in the text, the start action decides
    // whether enough of them are present.
    //
    let start = g.rule_with(
        "start",
        sequence(vec![
            many_or_none(newline),
            optional(sequence(vec![capture("defaults", defaults), section_break.into()])),
            optional(sequence(vec![
                capture("named", named_bootstrap_sequence_list),
                section_break.into(),
            ])),
            optional(sequence(vec![
                capture("load_balancer", load_balancer_block),
                many(newline),
                capture("pools", pool_def_block_list),
                section_break.into(),
            ])),
            optional(capture("boxes", box_def_block_list)),
            end_of_input.into(),
        ]),
        start_action,
    );

    g.build(start)
}

lazy_static! {
    static ref GRAMMAR: Grammar<Node> = cloud_formation_grammar();
}

///
/// Parses a whole document into its unresolved AST. `source_name` only shows up
/// in diagnostics.
///
pub(crate) fn parse_formation(source: &str, source_name: &str) -> Result<RawCloudFormation> {
    debug!("Parsing cloud formation from {:?}", source_name);
    let span = Span::new_extra(source, source_name);
    let mut nodes = Matcher::new(&*GRAMMAR).parse(span)?.into_iter();
    match nodes.next() {
        Some(Node::Formation(formation)) => {
            debug!(
                "Parsed {} named sequences, {} pools and {} boxes from {:?}",
                formation.bootstrap_sequences.len(),
                formation.pools.len(),
                formation.boxes.len(),
                source_name
            );
            Ok(formation)
        }
        other => Err(incompatible("cloud formation", other.as_ref())),
    }
}

#[cfg(test)]
pub(crate) fn parse_rule(name: &str, text: &str) -> Result<Vec<Node>> {
    let id = GRAMMAR
        .lookup(name)
        .ok_or_else(|| Error::IllegalArguments(format!("no rule named {}", name)))?;
    Matcher::new(&*GRAMMAR).parse_rule(id, crate::dsl::engine::from_str2(text))
}

#[cfg(test)]
#[path = "grammar_tests.rs"]
mod grammar_tests;
