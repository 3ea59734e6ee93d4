//! Template rendering and sandboxed condition evaluation (component A).
//!
//! Rendering is delegated to `handlebars` the way the teacher's template
//! engine does. Condition evaluation is deliberately NOT a general-purpose
//! evaluator: it is a small boolean-expression grammar over literals,
//! identifiers and comparison/boolean operators, so a workflow author's
//! condition string can never run arbitrary code.

use crate::error::WorkflowError;
use handlebars::Handlebars;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::warn;

static VAR_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.]*)\s*\}\}").unwrap());

pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_escape_fn(handlebars::no_escape);
        Self { handlebars }
    }
}

impl TemplateEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The set of free variable names a template references, without
    /// rendering it.
    pub fn free_variables(template: &str) -> HashSet<String> {
        VAR_PATTERN
            .captures_iter(template)
            .map(|cap| cap[1].to_string())
            .collect()
    }

    /// Render `template` against `values`. Missing variables are reported as
    /// `InputMissingVars` rather than silently substituting an empty string.
    pub fn render(&self, template: &str, values: &Map<String, Value>) -> Result<String, WorkflowError> {
        let missing: Vec<String> = Self::free_variables(template)
            .into_iter()
            .filter(|name| !values.contains_key(name.split('.').next().unwrap_or(name)))
            .collect();
        if !missing.is_empty() {
            warn!(template, ?missing, "template references undeclared variables");
            return Err(WorkflowError::InputMissingVars {
                template: template.to_string(),
                missing,
            });
        }

        self.handlebars.render_template(template, values).map_err(|e| {
            warn!(template, error = %e, "template render failed");
            WorkflowError::ConditionEvalFailed {
                step_id: String::new(),
                message: e.to_string(),
            }
        })
    }

    /// Render `condition` then evaluate the rendered text as a boolean
    /// expression. Any failure to parse or evaluate maps to
    /// `condition-eval-failed`.
    pub fn evaluate_condition(
        &self,
        step_id: &str,
        condition: &str,
        values: &Map<String, Value>,
    ) -> Result<bool, WorkflowError> {
        let rendered = self.render(condition, values).map_err(|e| match e {
            WorkflowError::ConditionEvalFailed { message, .. } => WorkflowError::ConditionEvalFailed {
                step_id: step_id.to_string(),
                message,
            },
            other => other,
        })?;
        BoolExpr::parse(&rendered).and_then(|expr| expr.eval()).map_err(|message| {
            warn!(step_id, condition, error = %message, "condition evaluation failed");
            WorkflowError::ConditionEvalFailed {
                step_id: step_id.to_string(),
                message,
            }
        })
    }
}

/// A tiny boolean-expression grammar: `<value> <op> <value>` or a bare
/// truthy literal, joined by `&&` / `||`, with `'...'`/`"..."` string
/// literals, bareword/number/bool literals, and `==`/`!=` comparisons.
enum BoolExpr {
    And(Box<BoolExpr>, Box<BoolExpr>),
    Or(Box<BoolExpr>, Box<BoolExpr>),
    Cmp(Literal, CmpOp, Literal),
    Literal(bool),
}

enum CmpOp {
    Eq,
    Ne,
}

#[derive(Clone, Debug)]
enum Literal {
    Str(String),
    Num(f64),
    Bool(bool),
}

impl BoolExpr {
    fn parse(input: &str) -> Result<Self, String> {
        let input = input.trim();
        if let Some((lhs, rhs)) = split_top_level(input, "&&") {
            return Ok(BoolExpr::And(
                Box::new(BoolExpr::parse(lhs)?),
                Box::new(BoolExpr::parse(rhs)?),
            ));
        }
        if let Some((lhs, rhs)) = split_top_level(input, "||") {
            return Ok(BoolExpr::Or(
                Box::new(BoolExpr::parse(lhs)?),
                Box::new(BoolExpr::parse(rhs)?),
            ));
        }
        if let Some((lhs, rhs)) = split_top_level(input, "==") {
            return Ok(BoolExpr::Cmp(parse_literal(lhs)?, CmpOp::Eq, parse_literal(rhs)?));
        }
        if let Some((lhs, rhs)) = split_top_level(input, "!=") {
            return Ok(BoolExpr::Cmp(parse_literal(lhs)?, CmpOp::Ne, parse_literal(rhs)?));
        }
        match parse_literal(input)? {
            Literal::Bool(b) => Ok(BoolExpr::Literal(b)),
            Literal::Str(s) if s.eq_ignore_ascii_case("true") => Ok(BoolExpr::Literal(true)),
            Literal::Str(s) if s.eq_ignore_ascii_case("false") => Ok(BoolExpr::Literal(false)),
            other => Err(format!("expression does not evaluate to a boolean: {other:?}")),
        }
    }

    fn eval(&self) -> Result<bool, String> {
        match self {
            BoolExpr::And(a, b) => Ok(a.eval()? && b.eval()?),
            BoolExpr::Or(a, b) => Ok(a.eval()? || b.eval()?),
            BoolExpr::Cmp(a, op, b) => {
                let equal = a == b;
                Ok(match op {
                    CmpOp::Eq => equal,
                    CmpOp::Ne => !equal,
                })
            }
            BoolExpr::Literal(b) => Ok(*b),
        }
    }
}

/// Split `input` on the first top-level occurrence of `op`, ignoring
/// occurrences inside quoted string literals.
fn split_top_level<'a>(input: &'a str, op: &str) -> Option<(&'a str, &'a str)> {
    let bytes = input.as_bytes();
    let mut in_quote: Option<u8> = None;
    let mut i = 0;
    while i + op.len() <= bytes.len() {
        let c = bytes[i];
        match in_quote {
            Some(q) if c == q => in_quote = None,
            Some(_) => {}
            None if c == b'\'' || c == b'"' => in_quote = Some(c),
            None if input[i..].starts_with(op) => {
                return Some((&input[..i], &input[i + op.len()..]));
            }
            None => {}
        }
        i += 1;
    }
    None
}

fn parse_literal(raw: &str) -> Result<Literal, String> {
    let raw = raw.trim();
    if raw.len() >= 2
        && ((raw.starts_with('\'') && raw.ends_with('\'')) || (raw.starts_with('"') && raw.ends_with('"')))
    {
        return Ok(Literal::Str(raw[1..raw.len() - 1].to_string()));
    }
    if raw == "true" {
        return Ok(Literal::Bool(true));
    }
    if raw == "false" {
        return Ok(Literal::Bool(false));
    }
    if let Ok(n) = raw.parse::<f64>() {
        return Ok(Literal::Num(n));
    }
    if raw.is_empty() {
        return Err("empty expression".to_string());
    }
    // A bareword that isn't a recognised literal is treated as a string,
    // matching a rendered-template identifier's value.
    Ok(Literal::Str(raw.to_string()))
}

impl std::cmp::PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Literal::Str(a), Literal::Str(b)) => a == b,
            (Literal::Num(a), Literal::Num(b)) => a == b,
            (Literal::Bool(a), Literal::Bool(b)) => a == b,
            (Literal::Num(a), Literal::Str(b)) | (Literal::Str(b), Literal::Num(a)) => {
                b.parse::<f64>().map(|n| &n == a).unwrap_or(false)
            }
            _ => false,
        }
    }
}
