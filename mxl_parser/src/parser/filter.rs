//! `?[...]` item filter resolver: a boolean expression over
//! `tag`/`group` equality pairs, used by calculated-item queries.

use serde::{Deserialize, Serialize};

use crate::config::options::FilterOptions;
use crate::parser::macros::{LldMacroFunctionParser, LldMacroParser, UserMacroParser};
use crate::parser::{Matched, Outcome, SyntaxError};
use crate::scan::{quoted, EscapeSet, KeywordSet};
use crate::utils::{byte_at, skip_spaces};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterAttribute {
    Tag,
    Group,
}

/// One `attribute = value` pair inside the filter. The value span covers
/// the raw value text, quotes included for string values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPair {
    pub attribute: FilterAttribute,
    pub offset: usize,
    pub len: usize,
}

impl Matched for FilterPair {
    fn offset(&self) -> usize {
        self.offset
    }
    fn len(&self) -> usize {
        self.len
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterMatch {
    pub offset: usize,
    pub len: usize,
    pub pairs: Vec<FilterPair>,
}

impl Matched for FilterMatch {
    fn offset(&self) -> usize {
        self.offset
    }
    fn len(&self) -> usize {
        self.len
    }
}

#[derive(Debug, Clone)]
pub struct FilterParser {
    options: FilterOptions,
    attributes: KeywordSet,
    logical: KeywordSet,
    user_macro: UserMacroParser,
    lld_macro: LldMacroParser,
    lld_function: LldMacroFunctionParser,
}

impl FilterParser {
    pub fn new(options: FilterOptions) -> Self {
        Self {
            options,
            attributes: KeywordSet::new(&["tag", "group"]),
            logical: KeywordSet::new(&["and", "or"]),
            user_macro: UserMacroParser::new(),
            lld_macro: LldMacroParser::new(),
            lld_function: LldMacroFunctionParser::new(),
        }
    }

    pub fn parse(&self, source: &str, pos: usize) -> Outcome<FilterMatch> {
        if byte_at(source, pos) != Some(b'?') || byte_at(source, pos + 1) != Some(b'[') {
            return Outcome::Fail(SyntaxError::incorrect(pos));
        }
        let mut pairs = Vec::new();
        let end = match self.parse_expr(source, pos + 2, 0, &mut pairs) {
            Ok(end) => end,
            Err(err) => return Outcome::Fail(err),
        };
        let end = skip_spaces(source, end);
        if byte_at(source, end) != Some(b']') {
            return Outcome::Fail(SyntaxError::incorrect(end));
        }
        Outcome::Complete(FilterMatch {
            offset: pos,
            len: end + 1 - pos,
            pairs,
        })
    }

    /// `term (and|or term)*`. Returns the offset after the expression.
    fn parse_expr(
        &self,
        source: &str,
        pos: usize,
        depth: usize,
        pairs: &mut Vec<FilterPair>,
    ) -> Result<usize, SyntaxError> {
        let mut end = self.parse_term(source, pos, depth, pairs)?;
        loop {
            let after = skip_spaces(source, end);
            let Some(keyword) = self.logical.scan(source, after) else {
                return Ok(end);
            };
            let next = after + keyword.len();
            if !matches!(byte_at(source, next), Some(b' ') | Some(b'(')) {
                return Ok(end);
            }
            end = self.parse_term(source, skip_spaces(source, next), depth, pairs)?;
        }
    }

    /// `not term`, a parenthesized expression, or a pair.
    fn parse_term(
        &self,
        source: &str,
        pos: usize,
        depth: usize,
        pairs: &mut Vec<FilterPair>,
    ) -> Result<usize, SyntaxError> {
        if source[pos..].starts_with("not")
            && matches!(byte_at(source, pos + 3), Some(b' ') | Some(b'('))
        {
            return self.parse_term(source, skip_spaces(source, pos + 3), depth, pairs);
        }
        if byte_at(source, pos) == Some(b'(') {
            if depth + 1 >= self.options.max_depth {
                return Err(SyntaxError::incorrect(pos));
            }
            let end = self.parse_expr(source, skip_spaces(source, pos + 1), depth + 1, pairs)?;
            let end = skip_spaces(source, end);
            if byte_at(source, end) != Some(b')') {
                return Err(SyntaxError::incorrect(end));
            }
            return Ok(end + 1);
        }
        self.parse_pair(source, pos, pairs)
    }

    /// `tag = value` or `group = value`.
    fn parse_pair(
        &self,
        source: &str,
        pos: usize,
        pairs: &mut Vec<FilterPair>,
    ) -> Result<usize, SyntaxError> {
        let Some(keyword) = self.attributes.scan(source, pos) else {
            return Err(SyntaxError::incorrect(pos));
        };
        let attribute = if keyword == "tag" {
            FilterAttribute::Tag
        } else {
            FilterAttribute::Group
        };
        let mut end = skip_spaces(source, pos + keyword.len());
        if byte_at(source, end) != Some(b'=') {
            return Err(SyntaxError::incorrect(end));
        }
        end = skip_spaces(source, end + 1);

        let value_len = self
            .scan_value(source, end)
            .ok_or(SyntaxError::incorrect(end))?;
        pairs.push(FilterPair {
            attribute,
            offset: end,
            len: value_len,
        });
        Ok(end + value_len)
    }

    fn scan_value(&self, source: &str, pos: usize) -> Option<usize> {
        if let Some(len) = quoted::scan(source, pos, EscapeSet::Basic) {
            return Some(len);
        }
        if self.options.user_macros {
            if let Outcome::Complete(m) = self.user_macro.parse(source, pos) {
                return Some(m.len);
            }
        }
        if self.options.lld_macros {
            if let Outcome::Complete(m) = self.lld_macro.parse(source, pos) {
                return Some(m.len);
            }
            if let Outcome::Complete(m) = self.lld_function.parse(source, pos) {
                return Some(m.len);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> FilterOptions {
        FilterOptions {
            user_macros: false,
            lld_macros: false,
            max_depth: 32,
        }
    }

    fn parse(source: &str) -> Outcome<FilterMatch> {
        FilterParser::new(options()).parse(source, 0)
    }

    #[test]
    fn test_single_pair() {
        let source = "?[tag=\"a\"]";
        let m = parse(source).into_value().unwrap();
        assert_eq!(m.len, source.len());
        assert_eq!(m.pairs.len(), 1);
        assert_eq!(m.pairs[0].attribute, FilterAttribute::Tag);
        assert_eq!(m.pairs[0].text(source), "\"a\"");
    }

    #[test]
    fn test_combined_pairs_with_parens() {
        let source = "?[group = \"Zabbix servers\" and (tag = \"tag1\" or tag = \"tag2\")]";
        let m = parse(source).into_value().unwrap();
        assert_eq!(m.len, source.len());
        assert_eq!(m.pairs.len(), 3);
        assert_eq!(m.pairs[0].attribute, FilterAttribute::Group);
    }

    #[test]
    fn test_not_term() {
        let source = "?[not tag=\"a\" and not (group=\"b\")]";
        assert!(parse(source).is_complete());
    }

    #[test]
    fn test_macro_values_gated() {
        let source = "?[tag={$M}]";
        assert!(parse(source).is_fail());

        let with_user = FilterParser::new(FilterOptions {
            user_macros: true,
            lld_macros: false,
            max_depth: 32,
        });
        assert!(with_user.parse(source, 0).is_complete());

        let lld_source = "?[tag={{#M}.func()}]";
        assert!(with_user.parse(lld_source, 0).is_fail());
        let with_lld = FilterParser::new(FilterOptions {
            user_macros: false,
            lld_macros: true,
            max_depth: 32,
        });
        assert!(with_lld.parse(lld_source, 0).is_complete());
    }

    #[test]
    fn test_unquoted_value_rejected() {
        assert!(parse("?[tag=abc]").is_fail());
        assert!(parse("?[host=\"a\"]").is_fail());
        assert!(parse("?[tag=\"a\"").is_fail());
    }

    #[test]
    fn test_nesting_cap() {
        let shallow = FilterParser::new(FilterOptions {
            user_macros: false,
            lld_macros: false,
            max_depth: 2,
        });
        assert!(shallow.parse("?[(tag=\"a\")]", 0).is_complete());
        assert!(shallow.parse("?[((tag=\"a\"))]", 0).is_fail());
    }
}
