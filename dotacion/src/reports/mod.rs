//! Predefined downloadable reports.
//!
//! Each [`ReportTemplate`] is a named, parameterized query over the roster
//! table. Templates are declared once at process start and never change.
//! Their SQL is produced through the same AST and renderer as ad-hoc
//! queries, and every column they touch is resolved through the catalog
//! validator, so a report cannot reach anything the whitelist does not allow.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;

use crate::catalog::{TableCatalog, DOTACION_TABLE};
use crate::dialect::Dialect;
use crate::error::ValidationError;
use crate::sql_ast::{SelectQuery, SqlExpr, SqlRenderer};
use crate::validation::Validator;

mod templates;

/// Grouping shown to users when browsing reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReportBlock {
    #[serde(rename = "ministerios")]
    Ministerios,
    #[serde(rename = "ministerios-mails")]
    MinisteriosMails,
    #[serde(rename = "global")]
    Global,
}

impl ReportBlock {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportBlock::Ministerios => "ministerios",
            ReportBlock::MinisteriosMails => "ministerios-mails",
            ReportBlock::Global => "global",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReportBlock::Ministerios => "Ministerios",
            ReportBlock::MinisteriosMails => "Ministerios y mails",
            ReportBlock::Global => "Listas globales",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Number,
    /// Free text chosen from a list served by `options_endpoint`.
    Select,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Text(String),
    Number(i64),
}

impl ParamValue {
    fn to_literal(&self) -> Value {
        match self {
            ParamValue::Text(s) => Value::String(s.clone()),
            ParamValue::Number(n) => Value::from(*n),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamSpec {
    pub name: &'static str,
    pub label: &'static str,
    #[serde(rename = "type")]
    pub kind: ParamKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options_endpoint: Option<&'static str>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<ParamValue>,
}

impl ParamSpec {
    fn parse(&self, raw: &str) -> Result<ParamValue, ValidationError> {
        match self.kind {
            ParamKind::Number => raw.trim().parse::<i64>().map(ParamValue::Number).map_err(|_| {
                ValidationError::InvalidParameter {
                    name: self.name.to_string(),
                    value: raw.to_string(),
                }
            }),
            ParamKind::String | ParamKind::Select => Ok(ParamValue::Text(raw.to_string())),
        }
    }
}

/// Typed parameter values after defaults have been applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportParams(HashMap<String, ParamValue>);

impl ReportParams {
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        self.0.insert(name.into(), value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Everything a template needs to produce its query.
pub struct ReportContext<'a> {
    pub params: &'a ReportParams,
    pub distinct: bool,
    validator: Validator<'a>,
}

impl<'a> ReportContext<'a> {
    /// Roster column, checked against the whitelist.
    pub fn column(&self, name: &str) -> Result<SqlExpr, ValidationError> {
        self.validator.validate_column(DOTACION_TABLE, name)?;
        Ok(SqlExpr::column(None, name))
    }

    /// Parameter value as an inlined literal.
    pub fn literal(&self, name: &str) -> Result<SqlExpr, ValidationError> {
        self.params
            .get(name)
            .map(|value| SqlExpr::Literal(value.to_literal()))
            .ok_or_else(|| ValidationError::MissingParameter(name.to_string()))
    }
}

pub type QueryTemplate = fn(&ReportContext<'_>) -> Result<SelectQuery, ValidationError>;

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportTemplate {
    pub slug: &'static str,
    pub block: ReportBlock,
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<ParamSpec>,
    pub allow_distinct: bool,
    pub default_distinct: bool,
    pub distinct_columns: &'static [&'static str],
    #[serde(skip)]
    pub query: QueryTemplate,
}

impl std::fmt::Debug for ReportTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportTemplate")
            .field("slug", &self.slug)
            .field("block", &self.block)
            .field("params", &self.params)
            .field("allow_distinct", &self.allow_distinct)
            .field("default_distinct", &self.default_distinct)
            .finish_non_exhaustive()
    }
}

impl ReportTemplate {
    /// Apply defaults and type conversion to raw query-string values.
    ///
    /// Blank values count as absent. A declared default always fills an
    /// absent value; a required parameter with neither is an error.
    pub fn resolve_params(
        &self,
        raw: &HashMap<String, String>,
    ) -> Result<ReportParams, ValidationError> {
        let mut resolved = ReportParams::default();
        for spec in &self.params {
            let supplied = raw.get(spec.name).filter(|value| !value.trim().is_empty());
            let value = match supplied {
                Some(text) => Some(spec.parse(text)?),
                None => spec.default_value.clone(),
            };
            match value {
                Some(value) => resolved.insert(spec.name, value),
                None if spec.required => {
                    return Err(ValidationError::MissingParameter(spec.label.to_string()))
                }
                None => {}
            }
        }
        Ok(resolved)
    }

    /// Templates that disallow toggling always use their default.
    pub fn resolve_distinct(&self, requested: Option<bool>) -> bool {
        if !self.allow_distinct {
            return self.default_distinct;
        }
        requested.unwrap_or(self.default_distinct)
    }

    /// The template's query with parameters inlined as literals.
    pub fn build_query(
        &self,
        catalog: &TableCatalog,
        params: &ReportParams,
        requested_distinct: Option<bool>,
    ) -> Result<SelectQuery, ValidationError> {
        let ctx = ReportContext {
            params,
            distinct: self.resolve_distinct(requested_distinct),
            validator: Validator::new(catalog),
        };
        (self.query)(&ctx)
    }

    pub fn render_sql(
        &self,
        catalog: &TableCatalog,
        params: &ReportParams,
        requested_distinct: Option<bool>,
        dialect: &dyn Dialect,
    ) -> Result<String, ValidationError> {
        let query = self.build_query(catalog, params, requested_distinct)?;
        Ok(SqlRenderer::new(dialect).render_select(&query))
    }
}

#[derive(Debug, Clone)]
pub struct ReportRegistry {
    templates: Vec<ReportTemplate>,
}

static ROSTER_REPORTS: Lazy<ReportRegistry> =
    Lazy::new(|| ReportRegistry::new(templates::roster_templates()));

impl ReportRegistry {
    pub fn new(templates: Vec<ReportTemplate>) -> Self {
        Self { templates }
    }

    /// Built-in roster reports.
    pub fn roster() -> &'static ReportRegistry {
        &ROSTER_REPORTS
    }

    pub fn lookup(&self, slug: &str) -> Option<&ReportTemplate> {
        self.templates.iter().find(|t| t.slug == slug)
    }

    pub fn templates(&self) -> &[ReportTemplate] {
        &self.templates
    }

    pub fn by_block(&self, block: ReportBlock) -> Vec<&ReportTemplate> {
        self.templates.iter().filter(|t| t.block == block).collect()
    }

    /// Distinct blocks in declaration order.
    pub fn blocks(&self) -> Vec<ReportBlock> {
        let mut blocks = Vec::new();
        for template in &self.templates {
            if !blocks.contains(&template.block) {
                blocks.push(template.block);
            }
        }
        blocks
    }
}
