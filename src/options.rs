use fancy_regex::Regex;

use crate::dom::{Dom, NodeId};
use crate::{Error, Result};

/// How the caller names the option to pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionSpec {
    /// Matches an option whose text equals this string exactly.
    Exact(String),
    /// Case-insensitive regular-expression test against option text; the
    /// first matching option in document order wins.
    Pattern(String),
}

impl OptionSpec {
    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self::Pattern(pattern.into())
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Exact(text) => format!("'{text}'"),
            Self::Pattern(pattern) => format!("/{pattern}/i"),
        }
    }
}

impl From<&str> for OptionSpec {
    fn from(text: &str) -> Self {
        Self::Exact(text.to_string())
    }
}

impl From<String> for OptionSpec {
    fn from(text: String) -> Self {
        Self::Exact(text)
    }
}

/// Finds the option matching `spec` within `select` and derives the value a
/// browser would submit for it: the `value` attribute when present, the
/// option's own text otherwise. `control` names the select in diagnostics.
pub(crate) fn find_option_value(
    dom: &Dom,
    select: NodeId,
    spec: &OptionSpec,
    control: &str,
) -> Result<String> {
    let matcher = compile(spec)?;

    for option in dom.descendants_by_tag(select, "option") {
        let text = dom.normalized_text(option);
        let matched = match &matcher {
            Matcher::Exact(expected) => &text == expected,
            Matcher::Pattern(regex) => regex
                .is_match(&text)
                .map_err(|err| Error::InvalidPattern(err.to_string()))?,
        };
        if matched {
            return Ok(option_value(dom, option, &text));
        }
    }

    Err(Error::OptionNotFound {
        spec: spec.describe(),
        control: control.to_string(),
    })
}

enum Matcher {
    Exact(String),
    Pattern(Regex),
}

fn compile(spec: &OptionSpec) -> Result<Matcher> {
    match spec {
        OptionSpec::Exact(text) => Ok(Matcher::Exact(text.clone())),
        OptionSpec::Pattern(pattern) => {
            let regex = Regex::new(&format!("(?i:{pattern})"))
                .map_err(|err| Error::InvalidPattern(err.to_string()))?;
            Ok(Matcher::Pattern(regex))
        }
    }
}

fn option_value(dom: &Dom, option: NodeId, text: &str) -> String {
    match dom.attr(option, "value") {
        Some(value) => value,
        None => text.to_string(),
    }
}

/// Browser default-selection semantics: an untouched select submits the value
/// of its first option, or the empty string when it has none.
pub(crate) fn default_select_value(dom: &Dom, select: NodeId) -> String {
    match dom.descendants_by_tag(select, "option").first() {
        Some(option) => option_value(dom, *option, &dom.normalized_text(*option)),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::{default_select_value, find_option_value, OptionSpec};
    use crate::html::parse_html;
    use crate::{Error, Result};

    #[test]
    fn exact_match_uses_value_attribute() -> Result<()> {
        let dom = parse_html("<select name='m'><option value='1'>January</option></select>")?;
        let select = dom.all_element_nodes()[0];
        let value = find_option_value(&dom, select, &"January".into(), "m")?;
        assert_eq!(value, "1");
        Ok(())
    }

    #[test]
    fn exact_match_falls_back_to_text_without_value_attribute() -> Result<()> {
        let dom = parse_html("<select name='m'><option>January</option></select>")?;
        let select = dom.all_element_nodes()[0];
        let value = find_option_value(&dom, select, &"January".into(), "m")?;
        assert_eq!(value, "January");
        Ok(())
    }

    #[test]
    fn pattern_matches_case_insensitively() -> Result<()> {
        let dom = parse_html("<select name='m'><option>January</option></select>")?;
        let select = dom.all_element_nodes()[0];
        let value = find_option_value(&dom, select, &OptionSpec::pattern("jan"), "m")?;
        assert_eq!(value, "January");
        Ok(())
    }

    #[test]
    fn pattern_picks_the_first_match_in_document_order() -> Result<()> {
        let dom = parse_html(
            "<select name='m'>\
               <option value='1'>January</option>\
               <option value='6'>June</option>\
               <option value='7'>July</option>\
             </select>",
        )?;
        let select = dom.all_element_nodes()[0];
        let value = find_option_value(&dom, select, &OptionSpec::pattern("^ju"), "m")?;
        assert_eq!(value, "6");
        Ok(())
    }

    #[test]
    fn no_match_reports_spec_and_control() -> Result<()> {
        let dom = parse_html("<select name='m'><option>January</option></select>")?;
        let select = dom.all_element_nodes()[0];
        match find_option_value(&dom, select, &"February".into(), "month") {
            Err(Error::OptionNotFound { spec, control }) => {
                assert_eq!(spec, "'February'");
                assert_eq!(control, "month");
            }
            other => panic!("expected OptionNotFound, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn malformed_pattern_is_rejected() -> Result<()> {
        let dom = parse_html("<select name='m'><option>January</option></select>")?;
        let select = dom.all_element_nodes()[0];
        assert!(matches!(
            find_option_value(&dom, select, &OptionSpec::pattern("(unclosed"), "m"),
            Err(Error::InvalidPattern(_))
        ));
        Ok(())
    }

    #[test]
    fn default_value_is_first_option_or_empty() -> Result<()> {
        let dom = parse_html(
            "<select id='a' name='a'><option value='x'>X</option><option value='y'>Y</option></select>\
             <select id='b' name='b'></select>",
        )?;
        let first = dom.by_id("a").expect("select a");
        let empty = dom.by_id("b").expect("select b");
        assert_eq!(default_select_value(&dom, first), "x");
        assert_eq!(default_select_value(&dom, empty), "");
        Ok(())
    }
}
