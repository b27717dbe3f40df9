//! Grammar-variant configuration.
//!
//! One immutable options struct per grammar, built once and shared by every
//! parse call. Child resolvers never see the full expression options; the
//! narrowing methods hand each one the reduced struct it needs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::constants::compile_time;

/// Construction-time configuration conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OptionsError {
    #[error("collapsed mode cannot be combined with host macro support")]
    CollapsedWithHostMacro,

    #[error("collapsed mode cannot be combined with host-less function calls")]
    CollapsedWithFunctionOnly,

    #[error("recursion depth limit must be at least 1")]
    ZeroDepth,
}

/// Options for the top-level expression grammar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressionOptions {
    /// Accept `{$NAME}` user macros as constants and parameters.
    pub user_macros: bool,
    /// Accept `{#NAME}` discovery macros and `{{#NAME}.func()}` composites.
    pub lld_macros: bool,
    /// Calculated-item formula mode: wildcard hosts/items, `?[...]` filters,
    /// no `{TRIGGER.VALUE}` constant.
    pub calculated: bool,
    /// Function calls collapsed to `{<id>}` references.
    pub collapsed: bool,
    /// Accept `{HOST.HOST}` as the host part of a query.
    pub host_macro: bool,
    /// Accept `{HOST.HOST}` with an optional `1`-`9` suffix.
    pub host_macro_n: bool,
    /// Accept queries with an empty host (`//key`).
    pub empty_host: bool,
    /// Legacy grammar only: allow `{func(...)}` without `host:key`.
    pub allow_function_only: bool,
    /// Accept the legacy `{host:key.func()}` form instead of query calls.
    pub legacy: bool,
    /// Accept `*` as an item key outside calculated mode.
    pub wildcard_item_keys: bool,
    /// Exclude trailing whitespace from a complete match.
    pub trim_trailing_whitespace: bool,
    /// Nesting cap inside `?[...]` filters.
    pub max_filter_depth: usize,
    /// Recursion cap for nested math-function arguments.
    pub max_depth: usize,
}

impl Default for ExpressionOptions {
    fn default() -> Self {
        Self {
            user_macros: false,
            lld_macros: false,
            calculated: false,
            collapsed: false,
            host_macro: false,
            host_macro_n: false,
            empty_host: false,
            allow_function_only: false,
            legacy: false,
            wildcard_item_keys: false,
            trim_trailing_whitespace: false,
            max_filter_depth: compile_time::query::DEFAULT_FILTER_DEPTH,
            max_depth: compile_time::expression::MAX_DEPTH,
        }
    }
}

impl ExpressionOptions {
    pub fn builder() -> ExpressionOptionsBuilder {
        ExpressionOptionsBuilder::default()
    }

    /// Trigger-expression defaults: trailing whitespace belongs to the match.
    pub fn trigger() -> ExpressionOptionsBuilder {
        Self::builder()
    }

    /// Calculated-formula defaults: wildcards and filters on, trailing
    /// whitespace trimmed from the match.
    pub fn calculated_formula() -> ExpressionOptionsBuilder {
        let mut builder = Self::builder();
        builder.options.calculated = true;
        builder.options.trim_trailing_whitespace = true;
        builder
    }

    pub(crate) fn validate(&self) -> Result<(), OptionsError> {
        if self.collapsed && (self.host_macro || self.host_macro_n) {
            return Err(OptionsError::CollapsedWithHostMacro);
        }
        if self.collapsed && self.allow_function_only {
            return Err(OptionsError::CollapsedWithFunctionOnly);
        }
        if self.max_depth == 0 {
            return Err(OptionsError::ZeroDepth);
        }
        Ok(())
    }

    /// Reduced options for the query resolver.
    pub(crate) fn query(&self) -> QueryOptions {
        QueryOptions {
            host_macro: self.host_macro,
            host_macro_n: self.host_macro_n,
            empty_host: self.empty_host,
            wildcard_host: self.calculated,
            wildcard_item: self.calculated || self.wildcard_item_keys,
            lld_macros: self.lld_macros,
            filter: if self.calculated {
                Some(self.filter())
            } else {
                None
            },
        }
    }

    /// Reduced options for the historical-function resolver.
    pub(crate) fn hist_function(&self) -> HistFunctionOptions {
        HistFunctionOptions {
            query: self.query(),
            user_macros: self.user_macros,
            lld_macros: self.lld_macros,
        }
    }

    /// Reduced options for the `?[...]` filter resolver.
    pub(crate) fn filter(&self) -> FilterOptions {
        FilterOptions {
            user_macros: self.user_macros,
            lld_macros: self.lld_macros,
            max_depth: self.max_filter_depth,
        }
    }

}

/// Builder so call sites read as a flag list, with conflicts rejected at
/// `build()` rather than at parse time.
#[derive(Debug, Clone, Default)]
pub struct ExpressionOptionsBuilder {
    options: ExpressionOptions,
}

impl ExpressionOptionsBuilder {
    pub fn user_macros(mut self, on: bool) -> Self {
        self.options.user_macros = on;
        self
    }

    pub fn lld_macros(mut self, on: bool) -> Self {
        self.options.lld_macros = on;
        self
    }

    pub fn collapsed(mut self, on: bool) -> Self {
        self.options.collapsed = on;
        self
    }

    pub fn host_macro(mut self, on: bool) -> Self {
        self.options.host_macro = on;
        self
    }

    pub fn host_macro_n(mut self, on: bool) -> Self {
        self.options.host_macro_n = on;
        self
    }

    pub fn empty_host(mut self, on: bool) -> Self {
        self.options.empty_host = on;
        self
    }

    pub fn allow_function_only(mut self, on: bool) -> Self {
        self.options.allow_function_only = on;
        self
    }

    pub fn legacy(mut self, on: bool) -> Self {
        self.options.legacy = on;
        self
    }

    pub fn wildcard_item_keys(mut self, on: bool) -> Self {
        self.options.wildcard_item_keys = on;
        self
    }

    pub fn max_filter_depth(mut self, depth: usize) -> Self {
        self.options.max_filter_depth = depth;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.options.max_depth = depth;
        self
    }

    pub fn build(self) -> Result<ExpressionOptions, OptionsError> {
        self.options.validate()?;
        Ok(self.options)
    }
}

/// Options the query resolver sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    pub host_macro: bool,
    pub host_macro_n: bool,
    pub empty_host: bool,
    pub wildcard_host: bool,
    pub wildcard_item: bool,
    pub lld_macros: bool,
    pub filter: Option<FilterOptions>,
}

/// Options the historical-function resolver sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistFunctionOptions {
    pub query: QueryOptions,
    pub user_macros: bool,
    pub lld_macros: bool,
}

/// Options the filter resolver sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOptions {
    pub user_macros: bool,
    pub lld_macros: bool,
    pub max_depth: usize,
}

/// Options the generic function-call resolver sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionOptions {
    pub collapsed: bool,
    pub max_depth: usize,
}

impl Default for FunctionOptions {
    fn default() -> Self {
        Self {
            collapsed: false,
            max_depth: compile_time::function::MAX_CALL_DEPTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_depth() {
        let options = ExpressionOptions::builder().build().unwrap();
        assert_eq!(options.max_depth, 32);
        assert!(!options.calculated);
    }

    #[test]
    fn test_collapsed_conflicts() {
        let err = ExpressionOptions::builder()
            .collapsed(true)
            .host_macro(true)
            .build()
            .unwrap_err();
        assert_eq!(err, OptionsError::CollapsedWithHostMacro);

        let err = ExpressionOptions::builder()
            .collapsed(true)
            .allow_function_only(true)
            .build()
            .unwrap_err();
        assert_eq!(err, OptionsError::CollapsedWithFunctionOnly);
    }

    #[test]
    fn test_zero_depth_rejected() {
        let err = ExpressionOptions::builder().max_depth(0).build().unwrap_err();
        assert_eq!(err, OptionsError::ZeroDepth);
    }

    #[test]
    fn test_calculated_narrowing() {
        let options = ExpressionOptions::calculated_formula()
            .lld_macros(true)
            .build()
            .unwrap();
        let query = options.query();
        assert!(query.wildcard_host);
        assert!(query.wildcard_item);
        assert!(query.filter.is_some());
        assert!(query.lld_macros);

        let trigger = ExpressionOptions::trigger().build().unwrap();
        assert!(trigger.query().filter.is_none());
        assert!(!trigger.query().wildcard_host);
    }
}
