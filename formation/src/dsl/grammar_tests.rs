use indoc::indoc;
use pretty_assertions::assert_eq;
use rstest::rstest;

use super::*;
use crate::dsl::errors::SyntaxError;

fn formation(text: &str) -> RawCloudFormation {
    match parse_formation(text, "test.formation") {
        Ok(formation) => formation,
        Err(e) => panic!("failed to parse {:?}: {}", text, e),
    }
}

fn syntax_error<T: std::fmt::Debug>(result: Result<T>) -> SyntaxError {
    match result {
        Err(Error::ParseError(err)) => err,
        other => panic!("expected a syntax error, got {:?}", other),
    }
}

fn quoted_values(values: &[&str]) -> ValueList {
    ValueList(values.iter().map(|each| Value::Quoted(each.to_string())).collect())
}

fn pair(key: &str, values: &[&str]) -> PairNode {
    PairNode {
        key: key.to_string(),
        value: quoted_values(values),
    }
}

const FULL_FORMATION: &str = indoc! {"
    defaults:
      region: 'us-east-1'
      owner: 'platform'

    bootstrap-sequence: 'base'
      git: 'https://example.com/base.git', 'main'
      inline bash: 'apt-get update'

    bootstrap-sequence: 'web'
      file: '/etc/nginx/nginx.conf'

    load-balancer: 'lb', 1 instance with 'haproxy'
      vm-flavor: 'small'
      bootstrap-sequence:
        include: 'base'

    http-pool: 'web', 2 instances with 'ubuntu'
      vm-flavor: 'medium'
      service:
        port: 80
        healthcheck-endpoint: '/health'
        healthcheck-port: 8080
      service:
        port: 443
        healthcheck-endpoint: '/health'
        healthcheck-port: 8443
      bootstrap-sequence:
        include: 'base', 'web'

    tcp-pool: 'db', 1 instance with 'postgres'
      vm-flavor: 'large'
      ports: 5432, 5433
      bootstrap-sequence:
        directory: '/var/lib/postgresql'

    box: 'bastion', 1 instance with 'alpine'
      vm-flavor: 'tiny'
      bootstrap-sequence:
        include: 'base'
        other: 'v2'
"};

#[rstest]
#[case("7", 7)]
#[case("42", 42)]
#[case("18446744073709551615", u64::MAX)]
fn integers(#[case] text: &str, #[case] expected: u64) {
    assert_eq!(parse_rule("integer", text).unwrap(), vec![Node::Integer(expected)]);
}

#[rstest]
#[case("0")]
#[case("042")]
#[case("-1")]
#[case("")]
#[case("1a")]
fn not_integers(#[case] text: &str) {
    syntax_error(parse_rule("integer", text));
}

#[test]
fn integer_overflow_is_a_value_error() {
    match parse_rule("integer", "18446744073709551616") {
        Err(Error::InvalidValue(message)) => assert!(message.contains("18446744073709551616")),
        other => panic!("expected an invalid value, got {:?}", other),
    }
}

#[rstest]
#[case("git")]
#[case("inline bash")]
#[case("vm-flavor")]
#[case("key-one_two")]
#[case("name 2.0")]
fn keys(#[case] text: &str) {
    assert_eq!(parse_rule("key", text).unwrap(), vec![Node::Key(text.to_string())]);
}

#[rstest]
#[case("_key")]
#[case("2key")]
#[case("key-")]
#[case("key:")]
fn not_keys(#[case] text: &str) {
    syntax_error(parse_rule("key", text));
}

#[rstest]
#[case("'abc'", "abc")]
#[case("\"it's\"", "it's")]
#[case("''", "")]
#[case("'with spaces, and commas'", "with spaces, and commas")]
#[case("'https://example.com/a.git'", "https://example.com/a.git")]
fn quoted_value(#[case] text: &str, #[case] expected: &str) {
    assert_eq!(
        parse_rule("quoted_value", text).unwrap(),
        vec![Node::Quoted(expected.to_string())]
    );
}

#[test]
fn unterminated_quote_fails_inside_the_value() {
    let err = syntax_error(parse_rule("quoted_value", "'abc\ndef'"));
    assert_eq!(err.line, 1);
    assert_eq!(err.column, 5);
    assert_eq!(err.found, "end of line");
    let anchor = err.committed.expect("committed after the opening quote");
    assert_eq!(anchor.rule, "single_quoted_value");
    assert_eq!((anchor.line, anchor.column), (1, 1));
}

#[rstest]
#[case("'a'")]
#[case("'a', 'b'")]
#[case("'https://example.com/x.git', 'main', 3")]
#[case("80, 443, 'tls'")]
fn value_list_rejoins_to_source(#[case] text: &str) {
    match parse_rule("value_list", text).unwrap().as_slice() {
        [Node::Values(values)] => assert_eq!(values.to_string(), text),
        other => panic!("expected a value list, got {:?}", other),
    }
}

#[test]
fn value_list_keeps_quoted_and_integer_values_in_order() {
    assert_eq!(
        parse_rule("value_list", "'a', 2, \"c\"").unwrap(),
        vec![Node::Values(ValueList(vec![
            Value::Quoted("a".to_string()),
            Value::Integer(2),
            Value::Quoted("c".to_string()),
        ]))]
    );
}

#[test]
fn generic_pair_allows_indentation_and_spaced_keys() {
    assert_eq!(
        parse_rule("generic_pair", "    inline bash: 'echo hi'").unwrap(),
        vec![Node::Pair(pair("inline bash", &["echo hi"]))]
    );
    assert_eq!(
        parse_rule("generic_pair", "git: 'https://example.com/x.git', 'main'").unwrap(),
        vec![Node::Pair(pair("git", &["https://example.com/x.git", "main"]))]
    );
}

#[test]
fn generic_pair_commits_after_the_separator() {
    let err = syntax_error(parse_rule("generic_pair", "  git: oops"));
    assert_eq!(err.column, 8);
    assert_eq!(err.found, "`oops`");
    assert_eq!(err.committed.map(|anchor| anchor.rule), Some("generic_pair".to_string()));
}

#[test]
fn generic_pair_list_is_newline_separated() {
    assert_eq!(
        parse_rule("generic_pair_list", "git: 'a'\r\n  file: 'b'\rdirectory: 'c'").unwrap(),
        vec![Node::Pairs(PairList(vec![
            pair("git", &["a"]),
            pair("file", &["b"]),
            pair("directory", &["c"]),
        ]))]
    );
}

#[rstest]
#[case("'web', 3 instances with 'ubuntu'", "web", 3, "ubuntu")]
#[case("'lb', 1 instance with \"haproxy\"", "lb", 1, "haproxy")]
fn vm_specs(#[case] text: &str, #[case] name: &str, #[case] count: u64, #[case] image: &str) {
    assert_eq!(
        parse_rule("vm_spec", text).unwrap(),
        vec![Node::VmSpec(VmSpec {
            name: name.to_string(),
            count,
            image_name: image.to_string(),
        })]
    );
}

#[test]
fn vm_spec_commits_after_the_name() {
    let err = syntax_error(parse_rule("vm_spec", "'web', 3 servers with 'ubuntu'"));
    assert_eq!(err.column, 9);
    assert_eq!(err.committed.map(|anchor| anchor.rule), Some("vm_spec".to_string()));
}

#[test]
fn service_definition() {
    let text = indoc! {"
        service:
          port: 80
          healthcheck-endpoint: '/health'
          healthcheck-port: 8080"};
    assert_eq!(
        parse_rule("service_def", text).unwrap(),
        vec![Node::Service(ServicePortDefinition {
            port: 80,
            healthcheck_endpoint: "/health".to_string(),
            healthcheck_port: 8080,
        })]
    );
}

#[test]
fn http_tag_builds_an_http_pool() {
    let text = indoc! {"
        http-pool: 'x', 1 instance with 'img'
        vm-flavor: 'small'
        service:
        port: 80
        healthcheck-endpoint: '/'
        healthcheck-port: 80
        bootstrap-sequence:
        git: 'repo'"};
    match parse_rule("pool_def_block", text).unwrap().as_slice() {
        [Node::Pool(PoolDefinition::Http(pool))] => {
            assert_eq!(pool.vm_spec.name, "x");
            assert_eq!(pool.flavor, "small");
            assert_eq!(pool.services.len(), 1);
            assert_eq!(pool.bootstrap_sequence, PairList(vec![pair("git", &["repo"])]));
        }
        other => panic!("expected an http pool, got {:?}", other),
    }
}

#[test]
fn tcp_tag_builds_a_tcp_pool() {
    let text = indoc! {"
        tcp-pool: 'x', 1 instance with 'img'
        vm-flavor: 'small'
        ports: 5432, 6432
        bootstrap-sequence:
        git: 'repo'"};
    match parse_rule("pool_def_block", text).unwrap().as_slice() {
        [Node::Pool(PoolDefinition::Tcp(pool))] => {
            assert_eq!(pool.vm_spec.name, "x");
            assert_eq!(pool.ports, vec![5432, 6432]);
        }
        other => panic!("expected a tcp pool, got {:?}", other),
    }
}

#[rstest]
#[case(
    "tcp-pool: 'x', 1 instance with 'img'\nvm-flavor: 's'\nservice:\nport: 80\nhealthcheck-endpoint: '/'\nhealthcheck-port: 80\nbootstrap-sequence:\ngit: 'r'",
    "tcp-pool 'x'"
)]
#[case(
    "http-pool: 'x', 1 instance with 'img'\nvm-flavor: 's'\nports: 80\nbootstrap-sequence:\ngit: 'r'",
    "http-pool 'x'"
)]
fn pool_tag_and_listeners_must_agree(#[case] text: &str, #[case] pool: &str) {
    match parse_rule("pool_def_block", text) {
        Err(Error::InvalidValue(message)) => assert!(message.starts_with(pool), "{}", message),
        other => panic!("expected an invalid value, got {:?}", other),
    }
}

#[test]
fn end_to_end_example_parses_one_box() {
    let parsed = formation(indoc! {"
        bootstrap-sequence: 'base'
        key: 'v1'

        box: 'b1', 2 instances with 'ubuntu'
        vm-flavor: 'small'
        bootstrap-sequence:
        include: 'base'
        other: 'v2'
    "});

    assert_eq!(parsed.defaults, PairList::default());
    assert_eq!(
        parsed.bootstrap_sequences,
        vec![NamedBootstrapSequence {
            name: "base".to_string(),
            sequence: PairList(vec![pair("key", &["v1"])]),
        }]
    );
    assert_eq!(parsed.load_balancer, None);
    assert!(parsed.pools.is_empty());
    assert_eq!(
        parsed.boxes,
        vec![BoxDefinition {
            vm_spec: VmSpec {
                name: "b1".to_string(),
                count: 2,
                image_name: "ubuntu".to_string(),
            },
            flavor: "small".to_string(),
            bootstrap_sequence: PairList(vec![pair("include", &["base"]), pair("other", &["v2"])]),
        }]
    );
}

#[test]
fn full_formation_parses_every_section() {
    let parsed = formation(FULL_FORMATION);

    assert_eq!(
        parsed.defaults,
        PairList(vec![pair("region", &["us-east-1"]), pair("owner", &["platform"])])
    );
    assert_eq!(
        parsed
            .bootstrap_sequences
            .iter()
            .map(|each| each.name.as_str())
            .collect::<Vec<&str>>(),
        vec!["base", "web"]
    );
    let lb = parsed.load_balancer.as_ref().expect("load balancer");
    assert_eq!(lb.vm_spec.count, 1);
    assert_eq!(lb.bootstrap_sequence, PairList(vec![pair("include", &["base"])]));

    assert_eq!(parsed.pools.len(), 2);
    match &parsed.pools[0] {
        PoolDefinition::Http(web) => {
            assert_eq!(web.services.len(), 2);
            assert_eq!(web.services[1].port, 443);
            assert_eq!(
                web.bootstrap_sequence,
                PairList(vec![pair("include", &["base", "web"])])
            );
        }
        other => panic!("expected an http pool, got {:?}", other),
    }
    match &parsed.pools[1] {
        PoolDefinition::Tcp(db) => assert_eq!(db.ports, vec![5432, 5433]),
        other => panic!("expected a tcp pool, got {:?}", other),
    }
    assert_eq!(parsed.boxes.len(), 1);
    assert_eq!(parsed.boxes[0].flavor, "tiny");
}

#[test]
fn only_defaults_and_named_sequences_is_a_semantic_error() {
    let result = parse_formation(
        indoc! {"
            defaults:
              region: 'us-east-1'

            bootstrap-sequence: 'base'
              git: 'repo'
        "},
        "",
    );
    assert!(matches!(result, Err(Error::EmptyFormation)), "{:?}", result);
}

#[test]
fn empty_document_is_a_semantic_error() {
    assert!(matches!(parse_formation("\n\n", ""), Err(Error::EmptyFormation)));
}

#[test]
fn load_balancer_needs_pools() {
    let err = syntax_error(parse_formation(
        indoc! {"
            load-balancer: 'lb', 1 instance with 'haproxy'
            vm-flavor: 'small'
            bootstrap-sequence:
            git: 'x'
        "},
        "lb.formation",
    ));
    assert_eq!(err.source, "lb.formation");
    assert_eq!(err.found, "end of input");
    assert!(err.expected.contains(&"\"http\"".to_string()), "{:?}", err.expected);
    assert!(err.expected.contains(&"\"tcp\"".to_string()), "{:?}", err.expected);
}

#[rstest]
#[case("\r\n")]
#[case("\r")]
fn newline_styles_parse_identically(#[case] newline: &str) {
    let expected = formation(FULL_FORMATION);
    assert_eq!(formation(&FULL_FORMATION.replace('\n', newline)), expected);
}

#[test]
fn trailing_newline_and_surrounding_blank_lines_are_optional() {
    let text = "box: 'b', 1 instance with 'i'\nvm-flavor: 'f'\nbootstrap-sequence:\ngit: 'r'";
    let expected = formation(text);
    assert_eq!(formation(&format!("\n\n{}\n\n  \n", text)), expected);
}

#[test]
fn blocks_may_be_separated_by_several_blank_lines() {
    let parsed = formation(indoc! {"
        box: 'a', 1 instance with 'i'
        vm-flavor: 'f'
        bootstrap-sequence:
        git: 'r'



        box: 'b', 1 instance with 'i'
        vm-flavor: 'f'
        bootstrap-sequence:
        git: 'r'
    "});
    assert_eq!(
        parsed
            .boxes
            .iter()
            .map(|each| each.vm_spec.name.as_str())
            .collect::<Vec<&str>>(),
        vec!["a", "b"]
    );
}

#[rstest]
#[case("\n  \nbox: 'a', 1 instance with 'i'\nvm-flavor: 'f'\nbootstrap-sequence:\ngit: 'r'\n")]
#[case("box: 'a', 1 instance with 'i'\nvm-flavor: 'f'\nbootstrap-sequence:\ngit: 'r'\n\t\nbox: 'b', 1 instance with 'i'\nvm-flavor: 'f'\nbootstrap-sequence:\ngit: 'r'\n")]
#[case("box: 'a', 1 instance with 'i'\nvm-flavor: 'f'  \nbootstrap-sequence:\ngit: 'r'\n")]
fn whitespace_only_lines_and_trailing_spaces_are_syntax_errors(#[case] text: &str) {
    syntax_error(parse_formation(text, "test.formation"));
}

#[test]
fn failure_inside_a_block_reports_the_committed_rule() {
    let err = syntax_error(parse_formation(
        indoc! {"
            box: 'b1', 2 instances with 'ubuntu'
            vm-flavor: small
            bootstrap-sequence:
            git: 'x'
        "},
        "box.formation",
    ));
    assert_eq!((err.line, err.column), (2, 12));
    assert_eq!(err.found, "`small`");
    let anchor = err.committed.clone().expect("committed inside vm-flavor");
    assert_eq!(anchor.rule, "vm_flavor");
    assert_eq!(anchor.line, 2);
    assert!(err.to_string().starts_with("box.formation at line 2 at column 12"));
    assert!(err.to_string().ends_with("(inside vm_flavor starting at line 2 column 1)"));
}

#[test]
fn unknown_section_is_reported_where_parsing_stopped() {
    let err = syntax_error(parse_formation(
        indoc! {"
            box: 'b1', 2 instances with 'ubuntu'
            vm-flavor: 'small'
            bootstrap-sequence:
            git: 'x'

            cluster: 'c'
        "},
        "",
    ));
    assert_eq!(err.line, 6);
    assert_eq!(err.column, 1);
}

#[test]
fn grammar_is_shared_across_threads() {
    let handles: Vec<_> = (0..4)
        .map(|n| {
            std::thread::spawn(move || {
                let text = format!(
                    "box: 'b{}', {} instances with 'i'\nvm-flavor: 'f'\nbootstrap-sequence:\ngit: 'r'\n",
                    n,
                    n + 2
                );
                parse_formation(&text, "").map(|parsed| parsed.boxes[0].vm_spec.count)
            })
        })
        .collect();
    for (n, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap().unwrap(), n as u64 + 2);
    }
}
