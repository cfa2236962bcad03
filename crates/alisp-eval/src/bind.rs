//! Parameter lists and argument binding.
//!
//! A parameter list is parsed once, when the function or macro is defined,
//! so malformed lists are reported at the definition site.

use std::fmt;
use std::rc::Rc;

use alisp_diagnostic::ErrorCode;

use crate::env::Environment;
use crate::signal::Condition;
use crate::value::Value;

pub const OPTIONAL_MARKER: &str = "&optional";
pub const REST_MARKER: &str = "&rest";

/// Parsed `(required... &optional opt... &rest rest)` list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamSpec {
    pub required: Vec<Rc<str>>,
    pub optional: Vec<Rc<str>>,
    pub rest: Option<Rc<str>>,
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Required,
    Optional,
    Rest,
}

impl ParamSpec {
    /// Parse a parameter list value. `nil` is the empty list.
    pub fn parse(params: &Value) -> Result<Self, Condition> {
        let items = params.to_vec().ok_or_else(|| {
            malformed(format!("parameter list must be a list, got `{}`", params))
        })?;

        let mut spec = ParamSpec::default();
        let mut section = Section::Required;
        // A marker must be followed by at least one parameter before the
        // next marker or the end of the list.
        let mut pending_marker: Option<&'static str> = None;

        for item in &items {
            let Some(name) = item.symbol_name() else {
                return Err(malformed(format!(
                    "parameter must be a symbol, got `{}`",
                    item
                )));
            };

            match name {
                OPTIONAL_MARKER => {
                    match section {
                        Section::Optional => {
                            return Err(malformed("`&optional` appears more than once"));
                        }
                        Section::Rest => {
                            return Err(malformed("`&optional` cannot follow `&rest`"));
                        }
                        Section::Required => {}
                    }
                    section = Section::Optional;
                    pending_marker = Some(OPTIONAL_MARKER);
                }
                REST_MARKER => {
                    if section == Section::Rest {
                        return Err(malformed("`&rest` appears more than once"));
                    }
                    if let Some(marker) = pending_marker {
                        return Err(malformed(format!(
                            "`{}` is followed directly by `&rest`",
                            marker
                        )));
                    }
                    section = Section::Rest;
                    pending_marker = Some(REST_MARKER);
                }
                _ => {
                    pending_marker = None;
                    let name: Rc<str> = Rc::from(name);
                    match section {
                        Section::Required => spec.required.push(name),
                        Section::Optional => spec.optional.push(name),
                        Section::Rest => {
                            if spec.rest.is_some() {
                                return Err(malformed(
                                    "`&rest` must be followed by exactly one parameter",
                                ));
                            }
                            spec.rest = Some(name);
                        }
                    }
                }
            }
        }

        if let Some(marker) = pending_marker {
            return Err(malformed(format!(
                "parameter list ends with `{}`",
                marker
            )));
        }

        Ok(spec)
    }

    /// Minimum and (if bounded) maximum argument count.
    pub fn arity(&self) -> (usize, Option<usize>) {
        let min = self.required.len();
        let max = match self.rest {
            Some(_) => None,
            None => Some(min + self.optional.len()),
        };
        (min, max)
    }

    /// Bind `args` into the innermost scope of the current frame.
    pub fn bind(&self, env: &mut Environment, name: &str, args: &[Value]) -> Result<(), Condition> {
        let (min, max) = self.arity();
        if args.len() < min || max.is_some_and(|max| args.len() > max) {
            return Err(Condition::argument(format!(
                "{}: wrong number of arguments, expected {}, got {}",
                name,
                self.describe_arity(),
                args.len()
            ))
            .with_code(ErrorCode::WrongArity));
        }

        let mut args = args.iter();
        for param in &self.required {
            // Count checked above.
            let value = args.next().cloned().unwrap_or_else(Value::nil);
            env.put(param.clone(), value);
        }
        for param in &self.optional {
            let value = args.next().cloned().unwrap_or_else(Value::nil);
            env.put(param.clone(), value);
        }
        if let Some(rest) = &self.rest {
            env.put(rest.clone(), Value::list(args.cloned().collect()));
        }
        Ok(())
    }

    fn describe_arity(&self) -> String {
        match self.arity() {
            (min, None) => format!("at least {}", min),
            (min, Some(max)) if min == max => min.to_string(),
            (min, Some(max)) => format!("{} to {}", min, max),
        }
    }
}

impl fmt::Display for ParamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<&str> = self.required.iter().map(|p| &**p).collect();
        if !self.optional.is_empty() {
            parts.push(OPTIONAL_MARKER);
            parts.extend(self.optional.iter().map(|p| &**p));
        }
        if let Some(rest) = &self.rest {
            parts.push(REST_MARKER);
            parts.push(rest);
        }
        write!(f, "({})", parts.join(" "))
    }
}

fn malformed(message: impl Into<String>) -> Condition {
    Condition::argument(format!("malformed parameter list: {}", message.into()))
        .with_code(ErrorCode::MalformedParameterList)
}
