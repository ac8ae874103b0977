use crate::catalog::DOTACION_TABLE;
use crate::error::ValidationError;
use crate::sql_ast::{Function, SelectItem, SelectQuery, SqlBinaryOperator, SqlExpr, TableRef};

use super::{ParamKind, ParamSpec, ParamValue, ReportBlock, ReportContext, ReportTemplate};

const MINISTERIO_ENDPOINT: &str = "/api/meta/ministerios";

fn ministerio_param() -> ParamSpec {
    ParamSpec {
        name: "ministerio",
        label: "Ministerio",
        kind: ParamKind::Select,
        options_endpoint: Some(MINISTERIO_ENDPOINT),
        required: true,
        default_value: None,
    }
}

fn age_param(name: &'static str, label: &'static str, default: i64) -> ParamSpec {
    ParamSpec {
        name,
        label,
        kind: ParamKind::Number,
        options_endpoint: None,
        required: true,
        default_value: Some(ParamValue::Number(default)),
    }
}

fn roster_select(
    ctx: &ReportContext<'_>,
    columns: &[&str],
    filters: Vec<SqlExpr>,
) -> Result<SelectQuery, ValidationError> {
    let select = if columns.is_empty() {
        vec![SelectItem {
            expr: SqlExpr::Wildcard,
            alias: None,
        }]
    } else {
        columns
            .iter()
            .map(|name| {
                Ok(SelectItem {
                    expr: ctx.column(name)?,
                    alias: None,
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?
    };
    Ok(SelectQuery {
        distinct: ctx.distinct,
        select,
        from: TableRef {
            name: DOTACION_TABLE.to_string(),
            alias: None,
        },
        filters,
        ..SelectQuery::default()
    })
}

/// `col IS NOT NULL` and `col != ''`.
fn not_blank(ctx: &ReportContext<'_>, name: &str) -> Result<Vec<SqlExpr>, ValidationError> {
    let column = ctx.column(name)?;
    Ok(vec![
        SqlExpr::IsNotNull(Box::new(column.clone())),
        SqlExpr::binary(
            SqlBinaryOperator::Neq,
            column,
            SqlExpr::Literal(serde_json::Value::String(String::new())),
        ),
    ])
}

fn ministerio_equals(ctx: &ReportContext<'_>) -> Result<SqlExpr, ValidationError> {
    Ok(SqlExpr::binary(
        SqlBinaryOperator::Eq,
        ctx.column("MINISTERIO")?,
        ctx.literal("ministerio")?,
    ))
}

fn integrantes_por_ministerio(ctx: &ReportContext<'_>) -> Result<SelectQuery, ValidationError> {
    roster_select(ctx, &[], vec![ministerio_equals(ctx)?])
}

fn integrantes_todos(ctx: &ReportContext<'_>) -> Result<SelectQuery, ValidationError> {
    roster_select(ctx, &[], not_blank(ctx, "MINISTERIO")?)
}

fn mails_por_ministerio(
    ctx: &ReportContext<'_>,
    mail_column: &str,
) -> Result<SelectQuery, ValidationError> {
    let mut filters = vec![ministerio_equals(ctx)?];
    filters.extend(not_blank(ctx, mail_column)?);
    roster_select(ctx, &["MINISTERIO", "AYN", mail_column], filters)
}

fn mails_todos(ctx: &ReportContext<'_>, mail_column: &str) -> Result<SelectQuery, ValidationError> {
    roster_select(
        ctx,
        &["MINISTERIO", "AYN", mail_column],
        not_blank(ctx, mail_column)?,
    )
}

fn personas_unicas(ctx: &ReportContext<'_>) -> Result<SelectQuery, ValidationError> {
    roster_select(
        ctx,
        &[
            "CUIL_SIN_GUIONES",
            "CUIL",
            "AYN",
            "MINISTERIO",
            "MAIL_LABORAL",
            "MAIL_PERSONAL",
        ],
        not_blank(ctx, "CUIL_SIN_GUIONES")?,
    )
}

fn integrantes_por_edad(ctx: &ReportContext<'_>) -> Result<SelectQuery, ValidationError> {
    let age = SqlExpr::Function {
        func: Function::YearsSince,
        args: vec![ctx.column("FEC_NACIM")?],
    };
    let filter = SqlExpr::Between {
        expr: Box::new(age),
        low: Box::new(ctx.literal("edad_min")?),
        high: Box::new(ctx.literal("edad_max")?),
    };
    roster_select(ctx, &[], vec![filter])
}

const MINISTRY_KEYS: &[&str] = &["CUIL_SIN_GUIONES", "AYN", "MINISTERIO"];

pub(super) fn roster_templates() -> Vec<ReportTemplate> {
    vec![
        ReportTemplate {
            slug: "integrantes-por-ministerio",
            block: ReportBlock::Ministerios,
            name: "Integrantes por Ministerio",
            description: "Descarga todos los integrantes de un ministerio específico",
            params: vec![ministerio_param()],
            allow_distinct: true,
            default_distinct: true,
            distinct_columns: MINISTRY_KEYS,
            query: integrantes_por_ministerio,
        },
        ReportTemplate {
            slug: "integrantes-todos-los-ministerios",
            block: ReportBlock::Ministerios,
            name: "Todos los Integrantes de Todos los Ministerios",
            description: "Descarga todos los integrantes de todos los ministerios",
            params: vec![],
            allow_distinct: true,
            default_distinct: true,
            distinct_columns: MINISTRY_KEYS,
            query: integrantes_todos,
        },
        ReportTemplate {
            slug: "mails-laborales-por-ministerio",
            block: ReportBlock::MinisteriosMails,
            name: "Mails Laborales por Ministerio",
            description: "Listado de mails laborales de un ministerio específico",
            params: vec![ministerio_param()],
            allow_distinct: true,
            default_distinct: true,
            distinct_columns: &["MAIL_LABORAL"],
            query: |ctx| mails_por_ministerio(ctx, "MAIL_LABORAL"),
        },
        ReportTemplate {
            slug: "mails-personales-por-ministerio",
            block: ReportBlock::MinisteriosMails,
            name: "Mails Personales por Ministerio",
            description: "Listado de mails personales de un ministerio específico",
            params: vec![ministerio_param()],
            allow_distinct: true,
            default_distinct: true,
            distinct_columns: &["MAIL_PERSONAL"],
            query: |ctx| mails_por_ministerio(ctx, "MAIL_PERSONAL"),
        },
        ReportTemplate {
            slug: "mails-laborales-todos",
            block: ReportBlock::MinisteriosMails,
            name: "Todos los Mails Laborales",
            description: "Listado global de todos los mails laborales",
            params: vec![],
            allow_distinct: true,
            default_distinct: true,
            distinct_columns: &["MAIL_LABORAL"],
            query: |ctx| mails_todos(ctx, "MAIL_LABORAL"),
        },
        ReportTemplate {
            slug: "mails-personales-todos",
            block: ReportBlock::MinisteriosMails,
            name: "Todos los Mails Personales",
            description: "Listado global de todos los mails personales",
            params: vec![],
            allow_distinct: true,
            default_distinct: true,
            distinct_columns: &["MAIL_PERSONAL"],
            query: |ctx| mails_todos(ctx, "MAIL_PERSONAL"),
        },
        ReportTemplate {
            slug: "personas-unicas-por-cuil",
            block: ReportBlock::Global,
            name: "Personas Únicas por CUIL",
            description: "Listado maestro de personas únicas identificadas por CUIL",
            params: vec![],
            allow_distinct: false,
            default_distinct: true,
            distinct_columns: &["CUIL_SIN_GUIONES"],
            query: personas_unicas,
        },
        ReportTemplate {
            slug: "integrantes-por-edad-global",
            block: ReportBlock::Global,
            name: "Integrantes por Rango de Edad",
            description: "Personas dentro de un rango de edad específico",
            params: vec![
                age_param("edad_min", "Edad Mínima", 10),
                age_param("edad_max", "Edad Máxima", 24),
            ],
            allow_distinct: true,
            default_distinct: true,
            distinct_columns: &["CUIL_SIN_GUIONES"],
            query: integrantes_por_edad,
        },
    ]
}
