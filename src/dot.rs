//! Reading and writing machines as graphviz dot text.
#![allow(missing_docs)]

use std::fmt::Display;
use std::path::Path;

use crate::machine::{Dfa, Machine, Mealy};
use crate::sul::Sul;
use crate::word::{Output, Symbol};
use crate::Error;

fn sanitize_ident(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

/// Renders a transducer in the hypothesis format: bare node lines, edges labeled
/// `input/output` and a `__start0` marker pointing at the initial state.
pub fn mealy_to_dot<S: Symbol, O: Output + Display>(machine: &Mealy<S, O>) -> String {
    let mut lines = vec![
        "digraph G {".to_string(),
        "rankdir=LR".to_string(),
        "__start0 [label=\"\" shape=\"none\"]".to_string(),
    ];
    let states = machine.state_ids();
    let alphabet = machine.alphabet();
    for &q in &states {
        lines.push(sanitize_ident(machine.state_name(q)));
    }
    for &q in &states {
        for input in &alphabet {
            if let Some((target, output)) = machine.edge(q, input) {
                lines.push(format!(
                    "{} -> {} [label=\"{}/{}\"]",
                    sanitize_ident(machine.state_name(q)),
                    sanitize_ident(machine.state_name(target)),
                    input,
                    output
                ));
            }
        }
    }
    lines.push(format!(
        "__start0 -> {}",
        sanitize_ident(machine.state_name(machine.initial()))
    ));
    lines.push("}".to_string());
    lines.join("\n")
}

/// Renders an acceptor: accepting states are drawn as double circles, edges carry the
/// bare input symbol.
pub fn dfa_to_dot<S: Symbol>(machine: &Dfa<S>) -> String {
    let mut lines = vec![
        "digraph G {".to_string(),
        "rankdir=LR".to_string(),
        "__start0 [label=\"\" shape=\"none\"]".to_string(),
    ];
    let states = machine.state_ids();
    let alphabet = machine.alphabet();
    for &q in &states {
        if machine.accepting(q) {
            lines.push(format!(
                "{} [shape=\"doublecircle\"]",
                sanitize_ident(machine.state_name(q))
            ));
        } else {
            lines.push(sanitize_ident(machine.state_name(q)));
        }
    }
    for &q in &states {
        for input in &alphabet {
            if let Some((target, ())) = machine.edge(q, input) {
                lines.push(format!(
                    "{} -> {} [label=\"{}\"]",
                    sanitize_ident(machine.state_name(q)),
                    sanitize_ident(machine.state_name(target)),
                    input
                ));
            }
        }
    }
    lines.push(format!(
        "__start0 -> {}",
        sanitize_ident(machine.state_name(machine.initial()))
    ));
    lines.push("}".to_string());
    lines.join("\n")
}

/// Writes the dot rendering of a transducer to a file.
pub fn write_mealy_dot<S: Symbol, O: Output + Display>(
    machine: &Mealy<S, O>,
    path: &Path,
) -> Result<(), Error> {
    std::fs::write(path, mealy_to_dot(machine))?;
    Ok(())
}

/// The edge-label dialects produced by external tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DotDialect {
    /// Node lines carry bracketed attributes, the initial state is the target of the
    /// attribute-less edge line.
    #[default]
    Industrial,
    /// Bare alphanumeric node lines, the initial state hangs off the `__start0` marker.
    Hypothesis,
    /// Bare node lines and no start marker at all.
    Go,
}

fn attr_value(attrs: &str, key: &str) -> Option<String> {
    for token in attrs.split_whitespace() {
        if let Some(value) = token.strip_prefix(key) {
            if let Some(value) = value.strip_prefix('=') {
                return Some(value.trim_matches('"').to_string());
            }
        }
    }
    None
}

/// Parses a transducer from dot text. Unrecognized lines are skipped, like headers and
/// layout attributes; states are created for every name an edge mentions. Without a start
/// marker the node named `0` is the initial state.
pub fn parse_mealy_dot(text: &str, dialect: DotDialect) -> Result<Mealy<String, String>, Error> {
    let mut edges: Vec<(String, String, String, String)> = Vec::new();
    let mut start: Option<String> = None;

    for (index, raw) in text.lines().enumerate() {
        let number = index + 1;
        let line = raw.trim().trim_end_matches(';').trim();
        if line.is_empty()
            || line.ends_with('{')
            || line == "}"
            || line.starts_with("rankdir")
        {
            continue;
        }
        if let Some(arrow) = line.find("->") {
            let left = line[..arrow].trim().trim_matches('"');
            let rest = line[arrow + 2..].trim();
            if let Some(bracket) = rest.find('[') {
                let to = rest[..bracket].trim().trim_matches('"');
                let attrs = rest[bracket + 1..].trim_end_matches(']');
                let label = attr_value(attrs, "label").ok_or_else(|| Error::DotParse {
                    line: number,
                    reason: "edge carries no label".to_string(),
                })?;
                let (input, output) = label.split_once('/').ok_or_else(|| Error::DotParse {
                    line: number,
                    reason: format!("label {label} is not of the form input/output"),
                })?;
                edges.push((
                    left.to_string(),
                    input.to_string(),
                    output.to_string(),
                    to.to_string(),
                ));
            } else {
                // an attribute-less edge marks the initial state
                match dialect {
                    DotDialect::Industrial => start = Some(rest.trim_matches('"').to_string()),
                    DotDialect::Hypothesis if left == "__start0" => {
                        start = Some(rest.trim_matches('"').to_string())
                    }
                    _ => {}
                }
            }
        }
    }

    let initial = start.unwrap_or_else(|| "0".to_string());
    let mut builder = Mealy::builder().with_initial(initial);
    for (from, input, output, to) in edges {
        builder = builder.with_edge(from, input, output, to);
    }
    builder.build()
}

/// Reads a transducer from a dot file.
pub fn load_mealy_dot(path: &Path, dialect: DotDialect) -> Result<Mealy<String, String>, Error> {
    let text = std::fs::read_to_string(path)?;
    parse_mealy_dot(&text, dialect)
}

/// Pipes dot text through the `dot` binary and returns the rendered PNG bytes.
#[cfg(feature = "graphviz")]
pub fn render_png(dot: &str) -> Result<Vec<u8>, std::io::Error> {
    use std::io::{Read, Write};

    let mut child = std::process::Command::new("dot")
        .arg("-Tpng")
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .spawn()?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(dot.as_bytes())?;
    }
    let mut output = Vec::new();
    if let Some(mut stdout) = child.stdout.take() {
        stdout.read_to_end(&mut output)?;
    }
    let status = child.wait()?;
    if !status.success() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("dot exited with {status}"),
        ));
    }
    Ok(output)
}

/// Renders dot text to a PNG in a temporary file and returns its path.
#[cfg(feature = "graphviz")]
pub fn render_to_tempfile(dot: &str) -> Result<std::path::PathBuf, std::io::Error> {
    use std::io::Write;

    let png = render_png(dot)?;
    let mut file = tempfile::Builder::new().suffix(".png").tempfile()?;
    file.write_all(&png)?;
    let (_, path) = file.keep().map_err(|e| e.error)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{EquivalenceChecker, WmethodChecker};
    use crate::sul::Sul;
    use crate::teacher::QueryStats;

    fn fixture() -> Mealy<String, String> {
        Mealy::builder()
            .with_edge("s0", "a".to_string(), "nice".to_string(), "s1")
            .with_edge("s0", "b".to_string(), "B".to_string(), "s0")
            .with_edge("s1", "a".to_string(), "nice".to_string(), "s2")
            .with_edge("s1", "b".to_string(), "back".to_string(), "s0")
            .with_edge("s2", "a".to_string(), "A".to_string(), "s2")
            .with_edge("s2", "b".to_string(), "back".to_string(), "s0")
            .build()
            .unwrap()
    }

    fn assert_equivalent(original: &mut Mealy<String, String>, loaded: &mut Mealy<String, String>) {
        let mut checker = WmethodChecker::new(original.size());
        let mut stats = QueryStats::default();
        assert!(checker
            .test_equivalence(original, loaded, &mut stats)
            .is_ok());
    }

    #[test]
    fn round_trip_preserves_the_machine() {
        let mut original = fixture();
        let text = mealy_to_dot(&original);
        let mut loaded = parse_mealy_dot(&text, DotDialect::Hypothesis).unwrap();
        assert_eq!(original.size(), loaded.size());
        assert_equivalent(&mut original, &mut loaded);
    }

    #[test]
    fn double_round_trip_preserves_the_machine() {
        let original = fixture();
        let once =
            parse_mealy_dot(&mealy_to_dot(&original), DotDialect::Hypothesis).unwrap();
        let mut twice = parse_mealy_dot(&mealy_to_dot(&once), DotDialect::Hypothesis).unwrap();
        assert_eq!(original.size(), twice.size());
        assert_equivalent(&mut fixture(), &mut twice);
    }

    #[test]
    fn industrial_dialect_parses() {
        let text = r#"digraph G {
    "0" [shape=circle];
    "1" [shape=circle];
    "0" -> "1" [label="up/ok"];
    "1" -> "0" [label="down/ok"];
    "1" -> "1" [label="up/err"];
    "0" -> "0" [label="down/err"];
    __start0 -> "0";
}"#;
        let mut mm = parse_mealy_dot(text, DotDialect::Industrial).unwrap();
        assert_eq!(mm.size(), 2);
        mm.reset();
        assert_eq!(
            mm.process(&["up".to_string(), "up".to_string()]),
            Some("err".to_string())
        );
    }

    #[test]
    fn go_dialect_defaults_to_node_zero() {
        let text = "digraph G {\n0\n1\n0 -> 1 [label=\"a/x\"]\n1 -> 0 [label=\"a/y\"]\n}";
        let mut mm = parse_mealy_dot(text, DotDialect::Go).unwrap();
        assert_eq!(mm.size(), 2);
        mm.reset();
        assert_eq!(mm.process(&["a".to_string()]), Some("x".to_string()));
    }

    #[test]
    fn unlabeled_edges_are_rejected() {
        let text = "digraph G {\na -> b [color=red]\n}";
        assert!(matches!(
            parse_mealy_dot(text, DotDialect::Go),
            Err(Error::DotParse { .. })
        ));
    }

    #[test]
    fn loading_from_disk_round_trips() {
        let original = fixture();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hypothesis.dot");
        write_mealy_dot(&original, &path).unwrap();
        let mut loaded = load_mealy_dot(&path, DotDialect::Hypothesis).unwrap();
        assert_eq!(original.size(), loaded.size());
        assert_equivalent(&mut fixture(), &mut loaded);
    }
}
