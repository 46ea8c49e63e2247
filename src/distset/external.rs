//! Adapter around an external minimal-separating-sequence tool.
//!
//! The tool is handed a machine rendered to a dot file and prints id mappings followed by
//! one suffix per line on stdout:
//!
//! ```text
//! State s0 0
//! Output nice 0
//! Input a 0
//! Input b 1
//! Suffix 0
//! Suffix 1 0
//! ```
//!
//! `State`, `Output` and `Input` records map originals to numeric ids, `Suffix` records
//! list input ids which are resolved back through the `Input` mapping.

use std::path::Path;
use std::process::Command;

use crate::math::Map;
use crate::word::Word;
use crate::Error;

/// The parsed stdout of the separating-sequence tool: the resolved suffixes together with
/// the raw id mappings, for callers that need to relate them back to the rendered machine.
#[derive(Debug, Default)]
pub struct SeparatingRecords {
    /// Distinguishing suffixes with input ids resolved to the original symbols. The empty
    /// suffix is dropped, it cannot distinguish anything.
    pub suffixes: Vec<Word<String>>,
    /// State id to original state name.
    pub states: Map<String, String>,
    /// Output id to original output token.
    pub outputs: Map<String, String>,
    /// Input id to original input symbol.
    pub inputs: Map<String, String>,
}

/// Invokes `tool` on a dot rendering of a machine and returns the separating suffixes it
/// reports.
pub fn external_distinguishing_set(
    tool: &Path,
    dot_file: &Path,
    strategy: u32,
) -> Result<Vec<Word<String>>, Error> {
    let output = Command::new(tool)
        .arg("-path")
        .arg(dot_file)
        .arg("-strategy")
        .arg(strategy.to_string())
        .output()?;
    let records = parse_separating_records(&String::from_utf8_lossy(&output.stdout))?;
    Ok(records.suffixes)
}

/// Parses the stdout record stream of the separating-sequence tool. Lines that are not
/// records are ignored, malformed records are an error.
pub fn parse_separating_records(stdout: &str) -> Result<SeparatingRecords, Error> {
    let mut records = SeparatingRecords::default();

    for line in stdout.lines() {
        let mut fields = line.split_whitespace();
        match fields.next() {
            Some(kind @ ("State" | "Output" | "Input")) => {
                let original = fields
                    .next()
                    .ok_or_else(|| Error::SeparatingTool(line.to_string()))?;
                let id = fields
                    .next()
                    .ok_or_else(|| Error::SeparatingTool(line.to_string()))?;
                let table = match kind {
                    "State" => &mut records.states,
                    "Output" => &mut records.outputs,
                    _ => &mut records.inputs,
                };
                table.insert(id.to_string(), original.to_string());
            }
            Some("Suffix") => {
                let mut suffix = Vec::new();
                for id in fields {
                    let symbol = records
                        .inputs
                        .get(id)
                        .ok_or_else(|| Error::SeparatingTool(format!("unknown input id {id}")))?;
                    suffix.push(symbol.clone());
                }
                if !suffix.is_empty() {
                    records.suffixes.push(suffix);
                }
            }
            _ => {}
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_resolve_through_the_input_mapping() {
        let stdout = "\
State s0 0
State s1 1
Output nice 0
Input a 0
Input b 1
Suffix 0
Suffix 1 0
Suffix
";
        let records = parse_separating_records(stdout).unwrap();
        assert_eq!(
            records.suffixes,
            vec![vec!["a".to_string()], vec!["b".to_string(), "a".to_string()]]
        );
        assert_eq!(records.states.get("1").map(String::as_str), Some("s1"));
        assert_eq!(records.outputs.get("0").map(String::as_str), Some("nice"));
    }

    #[test]
    fn unknown_input_ids_are_rejected() {
        assert!(matches!(
            parse_separating_records("Suffix 7\n"),
            Err(Error::SeparatingTool(_))
        ));
    }

    #[test]
    fn chatter_between_records_is_ignored() {
        let stdout = "starting up\nInput a 0\nSuffix 0\ndone\n";
        let records = parse_separating_records(stdout).unwrap();
        assert_eq!(records.suffixes, vec![vec!["a".to_string()]]);
    }
}
