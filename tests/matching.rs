//! Matching through the public API: holes, delimiters, languages and query
//! composition.

use holepunch::{find_matches, LanguageProfile, Match, Pattern, Query, Rule};

fn profile(ext: &str) -> &'static LanguageProfile {
    LanguageProfile::from_extension(ext).unwrap()
}

fn run(source: &str, ext: &str, query: &Query) -> Vec<Match> {
    find_matches(source, profile(ext), query).collect()
}

fn query(pattern: &str, ext: &str) -> Query {
    Query::new(Pattern::compile(pattern, profile(ext)).unwrap())
}

#[test]
fn holes_capture_nested_balanced_groups() {
    let found = run("foo(a, (b, c)); foo([x], {y: z})", "js", &query("foo(:[x])", "js"));
    let values: Vec<_> = found.iter().map(|m| m.environment.value("x").unwrap()).collect();
    assert_eq!(values, ["a, (b, c)", "[x], {y: z}"]);
}

#[test]
fn delimiters_inside_strings_and_comments_are_ignored() {
    let found = run("foo(\")\"); foo(a /* ) */)", "c", &query("foo(:[x])", "c"));
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].environment.value("x"), Some("\")\""));
    assert_eq!(found[1].matched, "foo(a /* ) */)");
}

#[test]
fn ranges_slice_back_to_matched_text() {
    let source = "let a = f(1);\nlet bé = f(g(2, 3));\n";
    for m in run(source, "rs", &query("f(:[x])", "rs")) {
        assert_eq!(&source[m.range.byte_range()], m.matched);
        for binding in &m.environment {
            assert_eq!(&source[binding.range.byte_range()], binding.value);
        }
    }
}

#[test]
fn line_and_column_are_one_based() {
    let found = run("x\n  call(1)\n", "generic", &query("call(:[a])", "generic"));
    let start = found[0].range.start;
    assert_eq!((start.offset, start.line, start.column), (4, 2, 3));
    let end = found[0].range.end;
    assert_eq!((end.line, end.column), (2, 10));
}

#[test]
fn matches_are_ascending_and_disjoint() {
    let source = "f(f(1)) f(2) f(3)";
    let found = run(source, "generic", &query("f(:[x])", "generic"));
    assert_eq!(found.len(), 3);
    for pair in found.windows(2) {
        assert!(pair[0].byte_end() <= pair[1].byte_start());
    }
}

#[test]
fn python_comments_do_not_match() {
    let source = "# call(a)\ncall(b)\n";
    let found = run(source, "py", &query("call(:[x])", "py"));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].environment.value("x"), Some("b"));
}

#[test]
fn go_raw_strings_are_one_token() {
    let found = run("re(`(`)", "go", &query("re(:[x])", "go"));
    assert_eq!(found[0].environment.value("x"), Some("`(`"));
}

#[test]
fn where_rule_with_match_arms() {
    let q = query("log(:[level], :[msg])", "generic").rule(
        Rule::parse(r#"where match :[level] { | "warn" -> true | "error" -> true | _ -> false }"#)
            .unwrap(),
    );
    let found = run(
        "log(\"debug\", a) log(warn, b) log(error, c)",
        "generic",
        &q,
    );
    let msgs: Vec<_> = found.iter().map(|m| m.environment.value("msg").unwrap()).collect();
    assert_eq!(msgs, ["b", "c"]);
}

#[test]
fn composed_query_filters_by_context() {
    let source = "fn main() { x.unwrap(); }\nfn helper() { y.unwrap(); z.unwrap(); }\n";
    let q = query(":[[v]].unwrap()", "rs")
        .inside(Pattern::compile("fn helper() {...}", profile("rs")).unwrap())
        .not(Pattern::compile("z.unwrap()", profile("rs")).unwrap());
    let found = run(source, "rs", &q);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].environment.value("v"), Some("y"));
}

#[test]
fn iteration_is_lazy() {
    let source = "a(1) ".repeat(10_000);
    let q = query("a(:[n])", "generic");
    let first_two: Vec<_> = find_matches(&source, profile("generic"), &q).take(2).collect();
    assert_eq!(first_two[1].byte_start(), 5);
}
