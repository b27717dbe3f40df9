//! Error and success codes with their metadata.
//!
//! Single source of truth for every code the engine logs.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Universal code wrapper for both error and success codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Code(&'static str);

impl Code {
    pub const fn new(code: &'static str) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration error codes
pub mod config {
    use super::Code;

    pub const CONFLICTING_OPTIONS: Code = Code::new("E001");
    pub const INITIALIZATION_FAILURE: Code = Code::new("E002");
}

/// Scanning primitive error codes
pub mod scan {
    use super::Code;

    pub const INVALID_NUMBER: Code = Code::new("E010");
    pub const NUMBER_OVERFLOW: Code = Code::new("E011");
    pub const UNTERMINATED_STRING: Code = Code::new("E012");
    pub const INVALID_ESCAPE: Code = Code::new("E013");
}

/// Macro resolver error codes
pub mod macros {
    use super::Code;

    pub const INVALID_MACRO: Code = Code::new("E020");
    pub const INVALID_CONTEXT: Code = Code::new("E021");
}

/// Query resolver error codes
pub mod query {
    use super::Code;

    pub const INVALID_HOST: Code = Code::new("E030");
    pub const INVALID_ITEM_KEY: Code = Code::new("E031");
    pub const INVALID_FILTER: Code = Code::new("E032");
}

/// Function resolver error codes
pub mod function {
    use super::Code;

    pub const INVALID_CALL: Code = Code::new("E040");
    pub const INVALID_PARAMETER: Code = Code::new("E041");
    pub const INVALID_PERIOD: Code = Code::new("E042");
    pub const DEPTH_EXCEEDED: Code = Code::new("E043");
}

/// Expression engine error codes
pub mod expression {
    use super::Code;

    pub const UNBALANCED_PARENS: Code = Code::new("E050");
    pub const UNEXPECTED_ENDING: Code = Code::new("E051");
    pub const UNPARSED_CONTENT: Code = Code::new("E052");
    pub const INCORRECT_SYNTAX: Code = Code::new("E053");
}

/// Semantic validation error codes
pub mod validation {
    use super::Code;

    pub const UNKNOWN_FUNCTION: Code = Code::new("E060");
    pub const BAD_PARAMETER_COUNT: Code = Code::new("E061");
    pub const STRING_COMPARISON: Code = Code::new("E062");
}

/// Success codes
pub mod success {
    use super::Code;

    pub const SYSTEM_INITIALIZATION_COMPLETED: Code = Code::new("I001");
    pub const PARSE_COMPLETE: Code = Code::new("I010");
    pub const VALIDATION_COMPLETE: Code = Code::new("I011");
}

static METADATA: OnceLock<HashMap<&'static str, (&'static str, &'static str)>> = OnceLock::new();

fn metadata() -> &'static HashMap<&'static str, (&'static str, &'static str)> {
    METADATA.get_or_init(|| {
        let mut map = HashMap::new();
        map.insert("E001", ("Config", "Conflicting parser options"));
        map.insert("E002", ("Config", "Logging initialization failed"));
        map.insert("E010", ("Scan", "Malformed numeric literal"));
        map.insert("E011", ("Scan", "Numeric literal overflows after suffix scaling"));
        map.insert("E012", ("Scan", "Unterminated quoted string"));
        map.insert("E013", ("Scan", "Unsupported escape sequence"));
        map.insert("E020", ("Macro", "Malformed macro"));
        map.insert("E021", ("Macro", "Malformed macro context"));
        map.insert("E030", ("Query", "Malformed host name"));
        map.insert("E031", ("Query", "Malformed item key"));
        map.insert("E032", ("Query", "Malformed query filter"));
        map.insert("E040", ("Function", "Malformed function call"));
        map.insert("E041", ("Function", "Malformed function parameter"));
        map.insert("E042", ("Function", "Malformed period parameter"));
        map.insert("E043", ("Function", "Nesting depth limit exceeded"));
        map.insert("E050", ("Expression", "Unbalanced parentheses"));
        map.insert("E051", ("Expression", "Unexpected end of expression"));
        map.insert("E052", ("Expression", "Unparsed trailing content"));
        map.insert("E053", ("Expression", "Incorrect syntax"));
        map.insert("E060", ("Validation", "Unknown function name"));
        map.insert("E061", ("Validation", "Wrong number of function parameters"));
        map.insert("E062", ("Validation", "String operand outside =/<> comparison"));
        map.insert("I001", ("Success", "Logging system initialized"));
        map.insert("I010", ("Success", "Expression parsed"));
        map.insert("I011", ("Success", "Token stream validated"));
        map
    })
}

/// Category for a code, `"Unknown"` when unregistered.
pub fn get_category(code: &str) -> &'static str {
    metadata().get(code).map(|(cat, _)| *cat).unwrap_or("Unknown")
}

/// Human description for a code, `"Unknown code"` when unregistered.
pub fn get_description(code: &str) -> &'static str {
    metadata()
        .get(code)
        .map(|(_, desc)| *desc)
        .unwrap_or("Unknown code")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_codes_have_metadata() {
        let codes = [
            config::CONFLICTING_OPTIONS,
            scan::INVALID_NUMBER,
            scan::NUMBER_OVERFLOW,
            macros::INVALID_MACRO,
            query::INVALID_ITEM_KEY,
            function::DEPTH_EXCEEDED,
            expression::UNBALANCED_PARENS,
            validation::STRING_COMPARISON,
            success::PARSE_COMPLETE,
        ];
        for code in codes {
            assert_ne!(get_description(code.as_str()), "Unknown code", "{}", code);
        }
    }

    #[test]
    fn test_category_lookup() {
        assert_eq!(get_category("E050"), "Expression");
        assert_eq!(get_category("ZZZ"), "Unknown");
    }
}
