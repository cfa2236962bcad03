//! Lowering parsed trees into values, and evaluation of source text.

use alisp_common::{LineIndex, Span};
use alisp_diagnostic::Diagnostic;
use alisp_syntax::{Sexp, SexpKind};

use crate::eval::Evaluator;
use crate::signal::{Condition, EvalResult};
use crate::value::{props, Value};

impl Evaluator {
    /// Convert an expression tree into a value. Lists remember their line.
    pub fn read(&mut self, sexp: &Sexp, lines: &LineIndex) -> Value {
        match &sexp.kind {
            SexpKind::Int(n) => Value::int(*n),
            SexpKind::Real(r) => Value::real(*r),
            SexpKind::String(s) => Value::string(s.clone()),
            SexpKind::Symbol(name) => match name.as_str() {
                "nil" => Value::nil(),
                "t" => Value::t(),
                _ => self.intern(name),
            },
            SexpKind::List(items) => {
                let items = items.iter().map(|item| self.read(item, lines)).collect();
                let list = Value::list(items);
                let line = lines.location(sexp.span.start).line;
                list.set_prop(props::LINE, Value::int(line as i64));
                list
            }
        }
    }

    /// Parse and lower `source`; the first parse error becomes a `parser-signal`.
    pub fn read_source(&mut self, source: &str, name: &str) -> Result<Vec<(Value, Span)>, Condition> {
        let (file, diagnostics) = alisp_parser::parse(source);
        let lines = LineIndex::new(source);
        if let Some(diagnostic) = diagnostics.iter().find(|d| d.is_error()) {
            return Err(parse_condition(diagnostic, &lines, name));
        }
        Ok(file
            .forms
            .iter()
            .map(|form| (self.read(form, &lines), form.span))
            .collect())
    }

    /// Evaluate every form of `source` as one unit under the evaluation lock.
    pub fn eval_source(&mut self, source: &str, name: &str) -> EvalResult {
        let forms = self.read_source(source, name)?;
        let mut locked = self.lock();
        let outermost = locked.lock_depth == 1;
        let mut result = Value::nil();
        for (form, span) in &forms {
            if outermost {
                locked.unit_span = *span;
            }
            result = locked.eval(form)?;
        }
        Ok(result)
    }
}

fn parse_condition(diagnostic: &Diagnostic, lines: &LineIndex, name: &str) -> Condition {
    let location = lines.location(diagnostic.span.start);
    Condition::Parse {
        file: name.to_string(),
        line: location.line,
        column: location.column,
        message: diagnostic.message.clone(),
        snippet: lines.line_text(location.line).unwrap_or_default().to_string(),
        span: diagnostic.span,
        code: diagnostic.code,
    }
}
