// src/render/mod.rs

//! Template rendering for task parameters.
//!
//! Strings may contain `{{ dotted.path }}` expressions which are looked up
//! in a JSON context:
//!
//! - `inputs.<name>`: values passed with `--input name=value`
//! - `env.<NAME>`: the process environment of the caller
//!
//! Rendering happens before the command sequence is built; any failure is a
//! [`TaskError::RenderError`] and aborts the run.

use std::collections::BTreeMap;

use regex::Regex;
use serde_json::{Map, Value};

use crate::errors::{Result, TaskError};

/// Renders a single template string.
pub trait Renderer: Send + Sync {
    fn render(&self, template: &str) -> Result<String>;

    fn render_all(&self, templates: &[String]) -> Result<Vec<String>> {
        templates.iter().map(|t| self.render(t)).collect()
    }
}

/// Builder for the variable context seen by templates.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    inputs: BTreeMap<String, String>,
    env: BTreeMap<String, String>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inputs<I, K, V>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.inputs
            .extend(inputs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_env<I, K, V>(mut self, env: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(env.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn into_value(self) -> Value {
        let mut root = Map::new();
        root.insert("inputs".to_string(), string_map(self.inputs));
        root.insert("env".to_string(), string_map(self.env));
        Value::Object(root)
    }
}

fn string_map(map: BTreeMap<String, String>) -> Value {
    Value::Object(map.into_iter().map(|(k, v)| (k, Value::String(v))).collect())
}

/// `{{ path }}` renderer over a JSON context.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    context: Value,
    expression: Regex,
    path: Regex,
}

impl TemplateRenderer {
    pub fn new(context: RenderContext) -> Result<Self> {
        Self::from_value(context.into_value())
    }

    pub fn from_value(context: Value) -> Result<Self> {
        let expression = Regex::new(r"\{\{(.*?)\}\}")
            .map_err(|e| TaskError::Other(anyhow::anyhow!("compiling template regex: {e}")))?;
        let path = Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*(\.[A-Za-z0-9_-]+)*$")
            .map_err(|e| TaskError::Other(anyhow::anyhow!("compiling path regex: {e}")))?;
        Ok(Self {
            context,
            expression,
            path,
        })
    }

    fn lookup(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.context, |value, segment| value.get(segment))
    }
}

impl Renderer for TemplateRenderer {
    fn render(&self, template: &str) -> Result<String> {
        let mut out = String::with_capacity(template.len());
        let mut last = 0;

        for caps in self.expression.captures_iter(template) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let literal = &template[last..whole.start()];
            ensure_no_open_expression(literal, template)?;
            out.push_str(literal);

            let expr = inner.as_str().trim();
            if !self.path.is_match(expr) {
                return Err(TaskError::RenderError(format!(
                    "malformed expression '{{{{ {} }}}}' in '{}'",
                    expr, template
                )));
            }
            let value = self.lookup(expr).ok_or_else(|| {
                TaskError::RenderError(format!(
                    "unresolved variable '{}' in '{}'",
                    expr, template
                ))
            })?;
            out.push_str(&value_to_string(value));
            last = whole.end();
        }

        let rest = &template[last..];
        ensure_no_open_expression(rest, template)?;
        out.push_str(rest);
        Ok(out)
    }
}

fn ensure_no_open_expression(literal: &str, template: &str) -> Result<()> {
    if literal.contains("{{") {
        return Err(TaskError::RenderError(format!(
            "unclosed expression in '{}'",
            template
        )));
    }
    Ok(())
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
