use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dialect::Dialect;

/// Scalar functions a dialect knows how to spell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// Whole years elapsed between the argument and today.
    YearsSince,
    CurrentDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlExpr {
    Column {
        table: Option<String>,
        name: String,
    },
    /// Bare `*`.
    Wildcard,
    Literal(Value),
    /// Positional reference into the bound parameter list.
    Param(usize),
    Function {
        func: Function,
        args: Vec<SqlExpr>,
    },
    BinaryOp {
        op: SqlBinaryOperator,
        left: Box<SqlExpr>,
        right: Box<SqlExpr>,
    },
    Between {
        expr: Box<SqlExpr>,
        low: Box<SqlExpr>,
        high: Box<SqlExpr>,
    },
    InList {
        expr: Box<SqlExpr>,
        list: Vec<SqlExpr>,
    },
    IsNotNull(Box<SqlExpr>),
}

impl SqlExpr {
    pub fn column(table: Option<&str>, name: &str) -> Self {
        SqlExpr::Column {
            table: table.map(str::to_string),
            name: name.to_string(),
        }
    }

    pub fn binary(op: SqlBinaryOperator, left: SqlExpr, right: SqlExpr) -> Self {
        SqlExpr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlBinaryOperator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
}

impl SqlBinaryOperator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SqlBinaryOperator::Eq => "=",
            SqlBinaryOperator::Neq => "!=",
            SqlBinaryOperator::Gt => ">",
            SqlBinaryOperator::Gte => ">=",
            SqlBinaryOperator::Lt => "<",
            SqlBinaryOperator::Lte => "<=",
            SqlBinaryOperator::Like => "LIKE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: SqlExpr,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub expr: SqlExpr,
    pub direction: SortDirection,
}

/// Single-table SELECT. Filters are ANDed together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    pub distinct: bool,
    pub select: Vec<SelectItem>,
    pub from: TableRef,
    pub filters: Vec<SqlExpr>,
    pub group_by: Vec<SqlExpr>,
    pub order_by: Vec<OrderItem>,
    pub limit: Option<u64>,
}

pub struct SqlRenderer<'d> {
    dialect: &'d dyn Dialect,
    inline_params: Option<&'d [Value]>,
}

impl<'d> SqlRenderer<'d> {
    /// Renders parameters as dialect placeholders.
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self {
            dialect,
            inline_params: None,
        }
    }

    /// Renders parameters as escaped literals. Output is for display only.
    pub fn with_inline_params(dialect: &'d dyn Dialect, params: &'d [Value]) -> Self {
        Self {
            dialect,
            inline_params: Some(params),
        }
    }

    pub fn render_select(&self, query: &SelectQuery) -> String {
        let select_items: Vec<String> = query
            .select
            .iter()
            .map(|item| {
                let expr_sql = self.render_expr(&item.expr);
                match &item.alias {
                    Some(alias) => format!("{expr_sql} AS {}", self.dialect.quote_ident(alias)),
                    None => expr_sql,
                }
            })
            .collect();

        let mut sql = String::from("SELECT ");
        if query.distinct {
            sql.push_str("DISTINCT ");
        }
        sql.push_str(&format!(
            "{} FROM {}",
            select_items.join(", "),
            self.render_table_ref(&query.from)
        ));

        if !query.filters.is_empty() {
            let filters: Vec<String> = query.filters.iter().map(|f| self.render_expr(f)).collect();
            sql.push_str(&format!(" WHERE {}", filters.join(" AND ")));
        }

        if !query.group_by.is_empty() {
            let groups: Vec<String> = query.group_by.iter().map(|g| self.render_expr(g)).collect();
            sql.push_str(&format!(" GROUP BY {}", groups.join(", ")));
        }

        if !query.order_by.is_empty() {
            let orders: Vec<String> = query
                .order_by
                .iter()
                .map(|o| format!("{} {}", self.render_expr(&o.expr), o.direction.as_sql()))
                .collect();
            sql.push_str(&format!(" ORDER BY {}", orders.join(", ")));
        }

        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        sql
    }

    fn render_table_ref(&self, table: &TableRef) -> String {
        match &table.alias {
            Some(alias) => format!(
                "{} AS {}",
                self.dialect.quote_ident(&table.name),
                self.dialect.quote_ident(alias)
            ),
            None => self.dialect.quote_ident(&table.name),
        }
    }

    fn render_expr(&self, expr: &SqlExpr) -> String {
        match expr {
            SqlExpr::Column { table, name } => match table {
                Some(t) => format!(
                    "{}.{}",
                    self.dialect.quote_ident(t),
                    self.dialect.quote_ident(name)
                ),
                None => self.dialect.quote_ident(name),
            },
            SqlExpr::Wildcard => "*".to_string(),
            SqlExpr::Literal(v) => self.dialect.render_literal(v),
            SqlExpr::Param(idx) => match self.inline_params {
                Some(params) => params
                    .get(*idx)
                    .map(|v| self.dialect.render_literal(v))
                    .unwrap_or_else(|| "NULL".to_string()),
                None => self.dialect.placeholder(*idx),
            },
            SqlExpr::Function { func, args } => {
                let rendered_args: Vec<String> = args.iter().map(|a| self.render_expr(a)).collect();
                self.dialect.render_function(func, rendered_args)
            }
            // Predicates are flat conjunctions, so no parentheses are needed.
            SqlExpr::BinaryOp { op, left, right } => format!(
                "{} {} {}",
                self.render_expr(left),
                op.as_sql(),
                self.render_expr(right)
            ),
            SqlExpr::Between { expr, low, high } => format!(
                "{} BETWEEN {} AND {}",
                self.render_expr(expr),
                self.render_expr(low),
                self.render_expr(high)
            ),
            SqlExpr::InList { expr, list } => {
                let rendered_values: Vec<String> =
                    list.iter().map(|v| self.render_expr(v)).collect();
                format!(
                    "{} IN ({})",
                    self.render_expr(expr),
                    rendered_values.join(", ")
                )
            }
            SqlExpr::IsNotNull(inner) => format!("{} IS NOT NULL", self.render_expr(inner)),
        }
    }
}
