//! Error codes for alisp diagnostics.

/// Error codes for categorizing diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Lexer errors (E0001 - E0099)
    UnexpectedCharacter,
    UnterminatedString,
    InvalidEscape,
    InvalidNumber,

    // Parser errors (E0100 - E0199)
    ExpectedExpression,
    UnclosedDelimiter,
    UnmatchedDelimiter,

    // Environment errors (E0200 - E0299)
    UnboundSymbol,
    ConstantBinding,

    // Eval errors (E0300 - E0399)
    NotCallable,
    DepthExceeded,
    DivisionByZero,
    InvalidForm,
    UncaughtSignal,
    StrayControlFlow,

    // Argument errors (E0400 - E0499)
    WrongArity,
    ArgumentTypeMismatch,
    MalformedParameterList,

    // Module errors (E0500 - E0599)
    ModuleNotFound,
    ModuleReference,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            // Lexer
            ErrorCode::UnexpectedCharacter => "E0001",
            ErrorCode::UnterminatedString => "E0002",
            ErrorCode::InvalidEscape => "E0003",
            ErrorCode::InvalidNumber => "E0004",

            // Parser
            ErrorCode::ExpectedExpression => "E0100",
            ErrorCode::UnclosedDelimiter => "E0101",
            ErrorCode::UnmatchedDelimiter => "E0102",

            // Environment
            ErrorCode::UnboundSymbol => "E0200",
            ErrorCode::ConstantBinding => "E0201",

            // Eval
            ErrorCode::NotCallable => "E0300",
            ErrorCode::DepthExceeded => "E0301",
            ErrorCode::DivisionByZero => "E0302",
            ErrorCode::InvalidForm => "E0303",
            ErrorCode::UncaughtSignal => "E0304",
            ErrorCode::StrayControlFlow => "E0305",

            // Argument
            ErrorCode::WrongArity => "E0400",
            ErrorCode::ArgumentTypeMismatch => "E0401",
            ErrorCode::MalformedParameterList => "E0402",

            // Module
            ErrorCode::ModuleNotFound => "E0500",
            ErrorCode::ModuleReference => "E0501",
        }
    }

    /// Get a human-readable description of the error.
    pub fn description(&self) -> &'static str {
        match self {
            // Lexer
            ErrorCode::UnexpectedCharacter => "unexpected character in input",
            ErrorCode::UnterminatedString => "string literal is not terminated",
            ErrorCode::InvalidEscape => "invalid escape sequence in string",
            ErrorCode::InvalidNumber => "invalid number literal",

            // Parser
            ErrorCode::ExpectedExpression => "expected an expression",
            ErrorCode::UnclosedDelimiter => "unclosed delimiter",
            ErrorCode::UnmatchedDelimiter => "closing delimiter without an opening one",

            // Environment
            ErrorCode::UnboundSymbol => "symbol is not bound",
            ErrorCode::ConstantBinding => "cannot change a constant binding",

            // Eval
            ErrorCode::NotCallable => "expected a callable, found a different value",
            ErrorCode::DepthExceeded => "evaluation nested too deeply",
            ErrorCode::DivisionByZero => "division by zero",
            ErrorCode::InvalidForm => "malformed form",
            ErrorCode::UncaughtSignal => "signal was not handled",
            ErrorCode::StrayControlFlow => "control flow escaped its construct",

            // Argument
            ErrorCode::WrongArity => "wrong number of arguments",
            ErrorCode::ArgumentTypeMismatch => "argument has the wrong type",
            ErrorCode::MalformedParameterList => "malformed parameter list",

            // Module
            ErrorCode::ModuleNotFound => "module could not be found",
            ErrorCode::ModuleReference => "module reference cannot be resolved",
        }
    }

    /// Get a suggested fix for the error, if available.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            ErrorCode::UnterminatedString => Some("add a closing quote `\"` to terminate the string"),
            ErrorCode::UnclosedDelimiter => Some("add the matching `)`"),
            ErrorCode::UnmatchedDelimiter => Some("remove the extra `)`"),
            ErrorCode::UnboundSymbol => Some("check the spelling or define the symbol first"),
            ErrorCode::ConstantBinding => Some("bind it with `defvar` if it needs to change"),
            ErrorCode::DepthExceeded => Some("check for unbounded recursion or raise the depth limit"),
            ErrorCode::MalformedParameterList => {
                Some("`&optional` and `&rest` must each be followed by a parameter, `&rest` by exactly one")
            }
            ErrorCode::ModuleNotFound => Some("add the module's directory with `-I` or ALISP_PATH"),
            ErrorCode::UncaughtSignal => Some("wrap the call in `condition-case`"),
            _ => None,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
