//! SCIM 2.0 Filter Parser
//!
//! Parses the restricted filter subset this service supports:
//!
//! ```text
//! <attr> eq "<value>"          collection filtering (?filter=...)
//! members[value eq "<id>"]     PATCH remove path selecting one member
//! ```
//!
//! The parser locates the attribute token immediately preceding the `eq`
//! keyword, then takes the literal between the first pair of double quotes
//! after it. There is no escaping and there are no `and`/`or`/`not`
//! combinators.
//!
//! Anything else parses to `None`. Callers treat `None` as "match all" for
//! collection filters and "no target" for patch paths. Identity providers
//! routinely send filters on attributes this service does not model, and
//! answering with the full collection keeps them working.

use std::fmt;

/// Comparison operator. Only equality is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "eq"),
        }
    }
}

/// A parsed `attr eq "value"` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    /// Attribute name as written (case preserved)
    pub attribute: String,
    pub op: CompareOp,
    /// Literal between the quotes, unescaped
    pub value: String,
}

impl Filter {
    /// Case-insensitive attribute comparison, as SCIM attribute names are
    /// case-insensitive.
    pub fn is_attribute(&self, name: &str) -> bool {
        self.attribute.eq_ignore_ascii_case(name)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} \"{}\"", self.attribute, self.op, self.value)
    }
}

/// Parse a filter expression. Returns `None` for anything outside the
/// supported `attr eq "value"` form.
pub fn parse_filter(input: &str) -> Option<Filter> {
    let eq_pos = find_eq_keyword(input)?;

    let attribute = input[..eq_pos].split_whitespace().last()?;

    let rest = &input[eq_pos + 2..];
    let open = rest.find('"')?;
    let after_open = &rest[open + 1..];
    let close = after_open.find('"')?;

    Some(Filter {
        attribute: attribute.to_string(),
        op: CompareOp::Eq,
        value: after_open[..close].to_string(),
    })
}

/// Extract the user id from a `members[value eq "<id>"]` patch path.
pub fn parse_member_path(path: &str) -> Option<String> {
    let path = path.trim();
    let prefix = path.get(..8)?;
    if !prefix.eq_ignore_ascii_case("members[") {
        return None;
    }
    let inner = path[8..].strip_suffix(']')?;

    let filter = parse_filter(inner)?;
    filter.is_attribute("value").then_some(filter.value)
}

/// Byte offset of the first standalone `eq` keyword (any case).
///
/// "Standalone" means preceded by whitespace and followed by whitespace or
/// the opening quote, so attribute names containing "eq" are skipped.
fn find_eq_keyword(input: &str) -> Option<usize> {
    let bytes = input.as_bytes();
    (1..bytes.len().saturating_sub(1)).find(|&i| {
        bytes[i].eq_ignore_ascii_case(&b'e')
            && bytes[i + 1].eq_ignore_ascii_case(&b'q')
            && bytes[i - 1].is_ascii_whitespace()
            && bytes
                .get(i + 2)
                .is_some_and(|b| b.is_ascii_whitespace() || *b == b'"')
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_simple_equality() {
        let filter = parse_filter(r#"userName eq "john@example.com""#).unwrap();
        assert_eq!(filter.attribute, "userName");
        assert_eq!(filter.op, CompareOp::Eq);
        assert_eq!(filter.value, "john@example.com");
    }

    #[rstest]
    #[case(r#"externalId eq "00u1abcd""#, "externalId", "00u1abcd")]
    #[case(r#"displayName EQ "Engineering""#, "displayName", "Engineering")]
    #[case(r#"  userName   eq   "spaced@example.com"  "#, "userName", "spaced@example.com")]
    #[case(r#"userName eq"tight@example.com""#, "userName", "tight@example.com")]
    #[case(r#"displayName eq "Sales eq Marketing""#, "displayName", "Sales eq Marketing")]
    #[case(r#"userName eq """#, "userName", "")]
    fn test_supported_forms(#[case] input: &str, #[case] attr: &str, #[case] value: &str) {
        let filter = parse_filter(input).unwrap();
        assert_eq!(filter.attribute, attr);
        assert_eq!(filter.value, value);
    }

    #[rstest]
    #[case("")]
    #[case("userName")]
    #[case(r#"userName co "john""#)]
    #[case(r#"userName sw "j""#)]
    #[case("userName eq john")]
    #[case(r#"userName eq "unterminated"#)]
    #[case(r#"eq "orphan""#)]
    #[case("active pr")]
    fn test_unsupported_forms_yield_none(#[case] input: &str) {
        assert_eq!(parse_filter(input), None);
    }

    #[test]
    fn test_attribute_containing_eq_is_not_keyword() {
        let filter = parse_filter(r#"requestId eq "r-1""#).unwrap();
        assert_eq!(filter.attribute, "requestId");
        assert_eq!(filter.value, "r-1");
    }

    #[test]
    fn test_compound_filter_takes_first_clause() {
        // Combinators are not understood; the first clause wins.
        let filter = parse_filter(r#"userName eq "a@b.com" and active eq true"#).unwrap();
        assert!(filter.is_attribute("username"));
        assert_eq!(filter.value, "a@b.com");
    }

    #[test]
    fn test_display_round_trips() {
        let filter = parse_filter(r#"externalId eq "abc""#).unwrap();
        assert_eq!(filter.to_string(), r#"externalId eq "abc""#);
    }

    #[rstest]
    #[case(r#"members[value eq "2"]"#, Some("2"))]
    #[case(r#"Members[Value EQ "42"]"#, Some("42"))]
    #[case(r#"members[value eq "2c4f-uuid"]"#, Some("2c4f-uuid"))]
    #[case("members", None)]
    #[case(r#"members[display eq "Alice"]"#, None)]
    #[case(r#"members[value eq "2""#, None)]
    #[case(r#"emails[value eq "a@b.com"]"#, None)]
    fn test_member_path(#[case] path: &str, #[case] expected: Option<&str>) {
        assert_eq!(parse_member_path(path).as_deref(), expected);
    }
}
