//! Query resolver: the `/host/item` data reference, with an optional
//! `?[...]` filter in calculated mode.

use serde::{Deserialize, Serialize};

use crate::config::options::QueryOptions;
use crate::parser::filter::{FilterMatch, FilterParser};
use crate::parser::key::{KeyMatch, KeyParser};
use crate::parser::macros::{LldMacroParser, MacroParser, ReferenceMode};
use crate::parser::{Matched, Outcome, SyntaxError};
use crate::utils::byte_at;

/// How the host part of the query was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryHost {
    /// Literal host name, possibly containing LLD macros.
    Name(String),
    /// `{HOST.HOST}` reference, with its optional 1-9 index.
    Macro(Option<u8>),
    Wildcard,
    Empty,
}

/// How the item part was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryItem {
    Key(KeyMatch),
    Wildcard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMatch {
    pub offset: usize,
    pub len: usize,
    pub host: QueryHost,
    pub item: QueryItem,
    pub filter: Option<FilterMatch>,
}

impl Matched for QueryMatch {
    fn offset(&self) -> usize {
        self.offset
    }
    fn len(&self) -> usize {
        self.len
    }
}

impl QueryMatch {
    /// Raw host text between the first two slashes.
    pub fn host_text<'a>(&self, source: &'a str) -> &'a str {
        match &self.item {
            QueryItem::Key(key) => &source[self.offset + 1..key.offset - 1],
            QueryItem::Wildcard => {
                let item_start = self.offset + self.len
                    - self.filter.as_ref().map_or(0, |f| f.len)
                    - 1;
                &source[self.offset + 1..item_start - 1]
            }
        }
    }
}

fn is_host_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b' ' || b == b'.' || b == b'_' || b == b'-'
}

#[derive(Debug, Clone)]
pub struct QueryParser {
    options: QueryOptions,
    host_macro: Option<MacroParser>,
    lld_macro: LldMacroParser,
    key: KeyParser,
    filter: Option<FilterParser>,
}

impl QueryParser {
    pub fn new(options: QueryOptions) -> Self {
        let host_macro = if options.host_macro_n {
            Some(MacroParser::new(&["HOST.HOST"], ReferenceMode::Numbered))
        } else if options.host_macro {
            Some(MacroParser::new(&["HOST.HOST"], ReferenceMode::None))
        } else {
            None
        };
        let filter = options.filter.clone().map(FilterParser::new);
        Self {
            options,
            host_macro,
            lld_macro: LldMacroParser::new(),
            key: KeyParser::new(),
            filter,
        }
    }

    pub fn parse(&self, source: &str, pos: usize) -> Outcome<QueryMatch> {
        if byte_at(source, pos) != Some(b'/') {
            return Outcome::Fail(SyntaxError::incorrect(pos));
        }
        let (host, host_len) = match self.parse_host(source, pos + 1) {
            Some(host) => host,
            None => return Outcome::Fail(SyntaxError::incorrect(pos + 1)),
        };
        let item_slash = pos + 1 + host_len;
        if byte_at(source, item_slash) != Some(b'/') {
            return Outcome::Fail(SyntaxError::incorrect(item_slash));
        }
        let item_start = item_slash + 1;

        let (item, item_len) = if self.options.wildcard_item
            && byte_at(source, item_start) == Some(b'*')
        {
            (QueryItem::Wildcard, 1)
        } else {
            match self.key.parse(source, item_start) {
                Outcome::Complete(key) => {
                    let len = key.len;
                    (QueryItem::Key(key), len)
                }
                Outcome::Fail(err) | Outcome::Partial(_, err) => return Outcome::Fail(err),
            }
        };
        let mut end = item_start + item_len;

        let mut filter = None;
        if byte_at(source, end) == Some(b'?') {
            let Some(parser) = &self.filter else {
                return Outcome::Fail(SyntaxError::incorrect(end));
            };
            match parser.parse(source, end) {
                Outcome::Complete(m) => {
                    end = m.end();
                    filter = Some(m);
                }
                Outcome::Fail(err) | Outcome::Partial(_, err) => return Outcome::Fail(err),
            }
        }

        Outcome::Complete(QueryMatch {
            offset: pos,
            len: end - pos,
            host,
            item,
            filter,
        })
    }

    /// Host alternatives in priority order: host macro, wildcard, name
    /// run with embedded LLD macros, empty.
    fn parse_host(&self, source: &str, pos: usize) -> Option<(QueryHost, usize)> {
        if let Some(parser) = &self.host_macro {
            if let Outcome::Complete(m) = parser.parse(source, pos) {
                let index = match m.reference {
                    Some(crate::parser::macros::MacroReference::Numbered(n)) => Some(n),
                    _ => None,
                };
                return Some((QueryHost::Macro(index), m.len));
            }
        }
        if self.options.wildcard_host && byte_at(source, pos) == Some(b'*') {
            return Some((QueryHost::Wildcard, 1));
        }

        let mut end = pos;
        loop {
            if byte_at(source, end).is_some_and(is_host_name_byte) {
                end += 1;
                continue;
            }
            if self.options.lld_macros {
                if let Outcome::Complete(m) = self.lld_macro.parse(source, end) {
                    end = m.end();
                    continue;
                }
            }
            break;
        }
        if end > pos {
            return Some((QueryHost::Name(source[pos..end].to_string()), end - pos));
        }
        if self.options.empty_host {
            return Some((QueryHost::Empty, 0));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::options::FilterOptions;

    fn options() -> QueryOptions {
        QueryOptions {
            host_macro: false,
            host_macro_n: false,
            empty_host: false,
            wildcard_host: false,
            wildcard_item: false,
            lld_macros: false,
            filter: None,
        }
    }

    fn calculated() -> QueryOptions {
        QueryOptions {
            wildcard_host: true,
            wildcard_item: true,
            filter: Some(FilterOptions {
                user_macros: false,
                lld_macros: false,
                max_depth: 32,
            }),
            ..options()
        }
    }

    fn parse(source: &str) -> Outcome<QueryMatch> {
        QueryParser::new(options()).parse(source, 0)
    }

    #[test]
    fn test_plain_query() {
        let source = "/Zabbix server/agent.ping";
        let m = parse(source).into_value().unwrap();
        assert_eq!(m.len, source.len());
        assert_eq!(m.host, QueryHost::Name("Zabbix server".to_string()));
        assert_eq!(m.host_text(source), "Zabbix server");
        match &m.item {
            QueryItem::Key(key) => assert_eq!(key.name(source), "agent.ping"),
            other => panic!("expected key item, got {:?}", other),
        }
    }

    #[test]
    fn test_query_with_key_params() {
        let source = "/host/vfs.fs.size[/,free]";
        let m = parse(source).into_value().unwrap();
        assert_eq!(m.len, source.len());
    }

    #[test]
    fn test_missing_parts() {
        assert!(parse("/host").is_fail());
        assert!(parse("//key").is_fail());
        assert!(parse("host/key").is_fail());
        assert!(parse("/host/").is_fail());
    }

    #[test]
    fn test_empty_host_gated() {
        let empty = QueryParser::new(QueryOptions {
            empty_host: true,
            ..options()
        });
        let m = empty.parse("//key", 0).into_value().unwrap();
        assert_eq!(m.host, QueryHost::Empty);
        assert_eq!(m.len, 5);
    }

    #[test]
    fn test_wildcards_gated_by_calculated() {
        assert!(parse("/*/*").is_fail());
        let m = QueryParser::new(calculated())
            .parse("/*/*", 0)
            .into_value()
            .unwrap();
        assert_eq!(m.host, QueryHost::Wildcard);
        assert_eq!(m.item, QueryItem::Wildcard);
    }

    #[test]
    fn test_host_macro_modes() {
        let plain = QueryParser::new(QueryOptions {
            host_macro: true,
            ..options()
        });
        let m = plain.parse("/{HOST.HOST}/key", 0).into_value().unwrap();
        assert_eq!(m.host, QueryHost::Macro(None));
        assert!(plain.parse("/{HOST.HOST2}/key", 0).is_fail());

        let numbered = QueryParser::new(QueryOptions {
            host_macro_n: true,
            ..options()
        });
        let m = numbered.parse("/{HOST.HOST2}/key", 0).into_value().unwrap();
        assert_eq!(m.host, QueryHost::Macro(Some(2)));
    }

    #[test]
    fn test_lld_macro_in_host() {
        let lld = QueryParser::new(QueryOptions {
            lld_macros: true,
            ..options()
        });
        let source = "/web{#NODE}x/key";
        let m = lld.parse(source, 0).into_value().unwrap();
        assert_eq!(m.host, QueryHost::Name("web{#NODE}x".to_string()));

        assert!(parse(source).into_value().is_none());
    }

    #[test]
    fn test_filter_requires_calculated() {
        let source = "/host/key?[tag=\"a\"]";
        assert!(parse(source).is_fail());
        let m = QueryParser::new(calculated())
            .parse(source, 0)
            .into_value()
            .unwrap();
        assert_eq!(m.len, source.len());
        assert_eq!(m.filter.as_ref().map(|f| f.pairs.len()), Some(1));
    }

    #[test]
    fn test_wildcard_item_filter() {
        let source = "/host2/*?[group = \"Zabbix servers\" and (tag = \"tag1\" or tag = \"tag2\")]";
        let m = QueryParser::new(calculated())
            .parse(source, 0)
            .into_value()
            .unwrap();
        assert_eq!(m.len, source.len());
        assert_eq!(m.host_text(source), "host2");
    }
}
