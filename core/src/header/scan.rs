use std::collections::{BTreeMap, HashMap};

/// Assignments pulled out of loosely structured script or `key=value` text.
///
/// Statements are split on `;` and newlines. `name = value` lands in the
/// scalar table, `name[3] = value` in the indexed table under slot 3. A
/// leading `var`/`let`/`const` is ignored, surrounding quotes are stripped,
/// and anything that is not an assignment (comparisons, calls, markup) is
/// skipped.
#[derive(Debug, Default, Clone)]
pub struct Assignments {
    scalars: HashMap<String, String>,
    indexed: BTreeMap<usize, HashMap<String, String>>,
}

impl Assignments {
    pub fn scan(text: &str) -> Self {
        let mut assignments = Self::default();
        for statement in text.split(|c: char| c == ';' || c == '\n') {
            if let Some((target, value)) = split_assignment(statement) {
                match target {
                    Target::Scalar(name) => {
                        assignments.scalars.insert(name, value);
                    }
                    Target::Indexed(name, index) => {
                        assignments
                            .indexed
                            .entry(index)
                            .or_default()
                            .insert(name, value);
                    }
                }
            }
        }
        assignments
    }

    pub fn scalar(&self, name: &str) -> Option<&str> {
        self.scalars.get(name).map(String::as_str)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.scalar(name).and_then(|v| v.parse().ok())
    }

    /// Slots in ascending index order.
    pub fn slots(&self) -> impl Iterator<Item = (usize, &HashMap<String, String>)> {
        self.indexed.iter().map(|(index, fields)| (*index, fields))
    }
}

enum Target {
    Scalar(String),
    Indexed(String, usize),
}

fn split_assignment(statement: &str) -> Option<(Target, String)> {
    let statement = statement.trim();
    let statement = ["var ", "let ", "const "]
        .iter()
        .find_map(|keyword| statement.strip_prefix(*keyword))
        .unwrap_or(statement);
    let (lhs, rhs) = statement.split_once('=')?;
    if rhs.starts_with('=') || lhs.ends_with(&['!', '<', '>'][..]) {
        return None;
    }

    let target = parse_target(lhs.trim())?;
    let value = unquote(rhs.trim());
    Some((target, value.to_string()))
}

fn parse_target(lhs: &str) -> Option<Target> {
    match lhs.split_once('[') {
        Some((name, rest)) => {
            let index = rest.strip_suffix(']')?.trim().parse().ok()?;
            is_identifier(name).then(|| Target::Indexed(name.to_string(), index))
        }
        None => is_identifier(lhs).then(|| Target::Scalar(lhs.to_string())),
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_scalar_and_indexed_assignments() {
        let text = "var wfwidth=1024;\nbandname[1]='40m'; bandlow[1] = 7000.0;\n\
                    bandname[0]=\"80m\"; if (x==1) go();";
        let assignments = Assignments::scan(text);
        assert_eq!(assignments.number("wfwidth"), Some(1024.0));
        let slots: Vec<_> = assignments.slots().map(|(i, _)| i).collect();
        assert_eq!(slots, vec![0, 1]);
        let (_, first) = assignments.slots().next().unwrap();
        assert_eq!(first.get("bandname").map(String::as_str), Some("80m"));
        assert!(assignments.scalar("if (x").is_none());
    }

    #[test]
    fn key_value_lines_are_scalars() {
        let assignments = Assignments::scan("status=active\nbands=0-30000000\n");
        assert_eq!(assignments.scalar("bands"), Some("0-30000000"));
        assert_eq!(assignments.scalar("status"), Some("active"));
    }

    #[test]
    fn comparisons_are_not_assignments() {
        let assignments = Assignments::scan("a <= 3; b != 4; c == 5");
        assert!(assignments.scalar("a").is_none());
        assert!(assignments.scalar("b").is_none());
        assert!(assignments.scalar("c").is_none());
    }
}
