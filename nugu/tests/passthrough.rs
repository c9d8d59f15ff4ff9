use nugu::passthrough::{parse_options, split_sources};
use nugu_core::options::OptionValue;

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn sources_come_before_the_first_flag() {
    let argv = args(&["remote:a", "/local/b", "--host", "news.example.com"]);
    let (sources, flags) = split_sources(&argv);
    assert_eq!(sources, vec!["remote:a", "/local/b"]);
    assert_eq!(flags, &argv[2..]);
}

#[test]
fn flags_follow_minimist_conventions() {
    let parsed = parse_options(&args(&[
        "--host",
        "news.example.com",
        "--port=563",
        "--overwrite",
        "--no-check-reposts",
        "--out",
        "-",
        "--article-size",
        "700K",
        "--dump-failed-posts",
    ]))
    .expect("valid flags");

    let pairs: Vec<(&str, &OptionValue)> = parsed.iter().collect();
    assert_eq!(
        pairs,
        vec![
            ("host", &OptionValue::from("news.example.com")),
            ("port", &OptionValue::Int(563)),
            ("overwrite", &OptionValue::Bool(true)),
            ("no-check-reposts", &OptionValue::Bool(true)),
            ("out", &OptionValue::from("-")),
            ("article-size", &OptionValue::from("700K")),
            ("dump-failed-posts", &OptionValue::Bool(true)),
        ]
    );
}

#[test]
fn repeated_flags_keep_the_last_value() {
    let parsed = parse_options(&args(&["--connections", "2", "--connections", "8"])).unwrap();
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed.get("connections"), Some(&OptionValue::Int(8)));
}

#[test]
fn stray_positionals_after_flags_are_rejected() {
    let err = parse_options(&args(&["--overwrite", "true", "extra"])).unwrap_err();
    assert!(err.to_string().contains("extra"), "{err}");
}

#[test]
fn negated_flags_reach_the_engine_unchanged() {
    let parsed = parse_options(&args(&["--no-check", "--host", "news.example.com"])).unwrap();

    assert_eq!(
        nugu_core::encoder::encode_args(&parsed),
        vec!["--no-check", "--host", "news.example.com"]
    );
}
