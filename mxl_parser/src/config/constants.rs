pub mod compile_time {
    pub mod expression {
        /// Maximum recursion depth for nested math-function arguments.
        pub const MAX_DEPTH: usize = 32;

        /// Maximum characters shown in an error excerpt.
        pub const ERROR_EXCERPT_CHARS: usize = 50;
    }

    pub mod query {
        /// Maximum bracket nesting inside an item key (one array level).
        pub const MAX_KEY_BRACKET_DEPTH: usize = 2;

        /// Default maximum nesting level inside a `?[...]` filter.
        pub const DEFAULT_FILTER_DEPTH: usize = 32;
    }

    pub mod function {
        /// Largest accepted function-id reference in collapsed mode.
        pub const MAX_FUNCTION_ID: u64 = i64::MAX as u64;

        /// Maximum recursion depth for nested function-call parameters.
        pub const MAX_CALL_DEPTH: usize = 32;
    }

    pub mod number {
        pub const KIBI: f64 = 1024.0;
        pub const MEBI: f64 = 1024.0 * 1024.0;
        pub const GIBI: f64 = 1024.0 * 1024.0 * 1024.0;
        pub const TEBI: f64 = 1024.0 * 1024.0 * 1024.0 * 1024.0;

        pub const SEC_PER_MIN: f64 = 60.0;
        pub const SEC_PER_HOUR: f64 = 3600.0;
        pub const SEC_PER_DAY: f64 = 86400.0;
        pub const SEC_PER_WEEK: f64 = 604800.0;
    }
}
