//! Query dispatch: intent key to named data operation.
//!
//! Each query key maps to one [`QuerySpec`] row in a static table. A spec
//! names the data operation, fixed filters, the field the user's parameter
//! filters on (if the query needs one), an optional date window, client-side
//! conditions and the output [`Shape`].
//!
//! `dispatch` never fails. Data-layer errors are logged and become an empty
//! result so the formatter always has something to render.

pub mod aggregate;

pub use aggregate::{Condition, Measure, Shape};

use crate::data::{value_as_f64, DataAccess, Params, Row, FROM_SUFFIX, TO_SUFFIX};
use chrono::{Datelike, Duration, Local, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// A fixed filter value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterValue {
    Text(&'static str),
    Bool(bool),
    Number(i64),
}

impl FilterValue {
    fn to_json(self) -> Value {
        match self {
            Self::Text(s) => Value::from(s),
            Self::Bool(b) => Value::from(b),
            Self::Number(n) => Value::from(n),
        }
    }
}

/// A date window relative to the reference day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Today,
    /// Monday to Sunday.
    CurrentWeek,
    CurrentMonth,
    CurrentYear,
    /// From today through today + n days.
    NextDays(i64),
    /// Strictly before today.
    Overdue,
}

impl Period {
    /// Inclusive `(from, to)` bounds; `None` means unbounded.
    pub fn bounds(self, today: NaiveDate) -> (Option<NaiveDate>, Option<NaiveDate>) {
        match self {
            Self::Today => (Some(today), Some(today)),
            Self::CurrentWeek => {
                let monday = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
                (Some(monday), Some(monday + Duration::days(6)))
            }
            Self::CurrentMonth => {
                let first = today.with_day(1).unwrap_or(today);
                let last = first
                    .checked_add_months(Months::new(1))
                    .and_then(|d| d.pred_opt())
                    .unwrap_or(today);
                (Some(first), Some(last))
            }
            Self::CurrentYear => (
                NaiveDate::from_ymd_opt(today.year(), 1, 1),
                NaiveDate::from_ymd_opt(today.year(), 12, 31),
            ),
            Self::NextDays(n) => (Some(today), Some(today + Duration::days(n))),
            Self::Overdue => (None, today.pred_opt()),
        }
    }
}

/// One entry of the dispatch table.
#[derive(Debug, Clone, Copy)]
pub struct QuerySpec {
    /// Query key, matching the intent's query template.
    pub key: &'static str,
    /// Data operation name.
    pub operation: &'static str,
    /// Filters always sent to the operation.
    pub filters: &'static [(&'static str, FilterValue)],
    /// Field the user's parameter filters on. The query is skipped when the
    /// parameter is blank.
    pub parameter: Option<&'static str>,
    /// Date window applied to a field.
    pub period: Option<(Period, &'static str)>,
    /// Predicates evaluated client-side on returned rows.
    pub conditions: &'static [Condition],
    /// Output shape.
    pub shape: Shape,
}

impl QuerySpec {
    const fn rows(key: &'static str, operation: &'static str) -> Self {
        Self {
            key,
            operation,
            filters: &[],
            parameter: None,
            period: None,
            conditions: &[],
            shape: Shape::Rows,
        }
    }

    const fn filter(mut self, filters: &'static [(&'static str, FilterValue)]) -> Self {
        self.filters = filters;
        self
    }

    const fn param(mut self, field: &'static str) -> Self {
        self.parameter = Some(field);
        self
    }

    const fn during(mut self, period: Period, field: &'static str) -> Self {
        self.period = Some((period, field));
        self
    }

    const fn when(mut self, conditions: &'static [Condition]) -> Self {
        self.conditions = conditions;
        self
    }

    const fn shape(mut self, shape: Shape) -> Self {
        self.shape = shape;
        self
    }
}

use FilterValue::{Bool, Number, Text};

const OPEN: &[(&str, FilterValue)] = &[("status", Text("aberta"))];
const ACTIVE: &[(&str, FilterValue)] = &[("ativo", Bool(true))];
const PENDING: &[(&str, FilterValue)] = &[("status", Text("pendente"))];
const DONE: &[(&str, FilterValue)] = &[("status", Text("concluida"))];
const ACTIVE_CONTRACT: &[(&str, FilterValue)] = &[("status", Text("ativo"))];
const INCOME: &[(&str, FilterValue)] = &[("tipo", Text("receita"))];
const EXPENSE: &[(&str, FilterValue)] = &[("tipo", Text("despesa"))];

/// Queries combined by `resumo_geral`, with the output field each one feeds.
const OVERVIEW: &[(&str, &str)] = &[
    ("os_abertas", "os_abertas"),
    ("total_clientes", "total_clientes"),
    ("estoque_baixo", "estoque_baixo"),
    ("contas_vencidas", "contas_vencidas"),
    ("faturamento_mes", "faturamento_mes"),
];

/// Key of the composite overview query.
pub const OVERVIEW_KEY: &str = "resumo_geral";

/// The dispatch table.
pub static QUERIES: &[QuerySpec] = &[
    // Customers
    QuerySpec::rows("buscar_cliente", "clientes").param("nome"),
    QuerySpec::rows("listar_clientes", "clientes"),
    QuerySpec::rows("total_clientes", "clientes").shape(Shape::Count),
    QuerySpec::rows("clientes_novos_mes", "clientes").during(Period::CurrentMonth, "criado_em"),
    QuerySpec::rows("top_clientes", "clientes").shape(Shape::TopN { by: "total_compras", n: 5 }),
    QuerySpec::rows("clientes_inativos", "clientes").filter(&[("ativo", Bool(false))]),
    // Service orders
    QuerySpec::rows("os_abertas", "ordens_servico").filter(OPEN),
    QuerySpec::rows("os_em_andamento", "ordens_servico").filter(&[("status", Text("em_andamento"))]),
    QuerySpec::rows("os_concluidas_mes", "ordens_servico")
        .filter(DONE)
        .during(Period::CurrentMonth, "conclusao"),
    QuerySpec::rows("os_atrasadas", "ordens_servico")
        .during(Period::Overdue, "prazo")
        .when(&[Condition::NotEqual("status", "concluida"), Condition::NotEqual("status", "cancelada")]),
    QuerySpec::rows("os_hoje", "ordens_servico").during(Period::Today, "prazo"),
    QuerySpec::rows("total_os", "ordens_servico").shape(Shape::Count),
    QuerySpec::rows("buscar_os", "ordens_servico").param("numero"),
    QuerySpec::rows("os_por_cliente", "ordens_servico").param("cliente"),
    QuerySpec::rows("os_por_tecnico", "ordens_servico").param("tecnico"),
    QuerySpec::rows("os_por_status", "ordens_servico")
        .shape(Shape::GroupCount { by: "status", limit: None }),
    QuerySpec::rows("faturamento_os_mes", "ordens_servico")
        .filter(DONE)
        .during(Period::CurrentMonth, "conclusao")
        .shape(Shape::Sum(Measure::Field("valor"))),
    // Stock
    QuerySpec::rows("estoque_baixo", "produtos")
        .when(&[Condition::AtMostField("quantidade", "estoque_minimo")]),
    QuerySpec::rows("produtos_sem_estoque", "produtos").filter(&[("quantidade", Number(0))]),
    QuerySpec::rows("buscar_produto", "produtos").param("nome"),
    QuerySpec::rows("listar_produtos", "produtos"),
    QuerySpec::rows("valor_estoque", "produtos")
        .shape(Shape::Sum(Measure::Product("quantidade", "preco"))),
    QuerySpec::rows("movimentacoes_estoque", "movimentacoes_estoque")
        .during(Period::CurrentMonth, "data"),
    QuerySpec::rows("produtos_mais_usados", "movimentacoes_estoque")
        .filter(&[("tipo", Text("saida"))])
        .shape(Shape::GroupSum { by: "produto", measure: Measure::Field("quantidade"), limit: Some(5) }),
    // Finance
    QuerySpec::rows("faturamento_mes", "lancamentos")
        .filter(INCOME)
        .during(Period::CurrentMonth, "data")
        .shape(Shape::Sum(Measure::Field("valor"))),
    QuerySpec::rows("faturamento_ano", "lancamentos")
        .filter(INCOME)
        .during(Period::CurrentYear, "data")
        .shape(Shape::Sum(Measure::Field("valor"))),
    QuerySpec::rows("contas_receber", "contas_receber").filter(PENDING),
    QuerySpec::rows("contas_pagar", "contas_pagar").filter(PENDING),
    QuerySpec::rows("contas_vencidas", "contas_receber")
        .filter(PENDING)
        .during(Period::Overdue, "vencimento"),
    QuerySpec::rows("lucro_mes", "lancamentos")
        .during(Period::CurrentMonth, "data")
        .shape(Shape::NetByKind { kind: "tipo", amount: "valor", income: "receita", expense: "despesa" }),
    QuerySpec::rows("fluxo_caixa", "lancamentos").during(Period::CurrentMonth, "data"),
    QuerySpec::rows("despesas_por_categoria", "lancamentos")
        .filter(EXPENSE)
        .during(Period::CurrentMonth, "data")
        .shape(Shape::GroupSum { by: "categoria", measure: Measure::Field("valor"), limit: None }),
    QuerySpec::rows("despesas_mes", "lancamentos")
        .filter(EXPENSE)
        .during(Period::CurrentMonth, "data")
        .shape(Shape::Sum(Measure::Field("valor"))),
    QuerySpec::rows("ticket_medio", "notas_fiscais")
        .during(Period::CurrentMonth, "emissao")
        .shape(Shape::Average(Measure::Field("valor"))),
    QuerySpec::rows("notas_fiscais_mes", "notas_fiscais").during(Period::CurrentMonth, "emissao"),
    // People and payroll
    QuerySpec::rows("total_folha", "folha_pagamento")
        .during(Period::CurrentMonth, "competencia")
        .shape(Shape::Sum(Measure::Field("salario_bruto"))),
    QuerySpec::rows("folha_pagamento", "folha_pagamento").during(Period::CurrentMonth, "competencia"),
    QuerySpec::rows("buscar_funcionario", "funcionarios").param("nome"),
    QuerySpec::rows("total_funcionarios", "funcionarios").filter(ACTIVE).shape(Shape::Count),
    QuerySpec::rows("listar_funcionarios", "funcionarios").filter(ACTIVE),
    QuerySpec::rows("ferias", "ferias").when(&[Condition::Ongoing { start: "inicio", end: "fim" }]),
    QuerySpec::rows("aniversariantes_mes", "funcionarios")
        .filter(ACTIVE)
        .when(&[Condition::SameMonth("nascimento")]),
    // Technicians and schedule
    QuerySpec::rows("tecnicos_disponiveis", "tecnicos").filter(&[("disponivel", Bool(true))]),
    QuerySpec::rows("agenda_hoje", "agenda").during(Period::Today, "data"),
    QuerySpec::rows("agenda_semana", "agenda").during(Period::CurrentWeek, "data"),
    QuerySpec::rows("ranking_tecnicos", "ordens_servico")
        .filter(DONE)
        .during(Period::CurrentMonth, "conclusao")
        .shape(Shape::GroupCount { by: "tecnico", limit: Some(5) }),
    QuerySpec::rows("visitas_tecnico", "agenda").param("tecnico"),
    // Contracts
    QuerySpec::rows("contratos_vencendo", "contratos")
        .filter(ACTIVE_CONTRACT)
        .during(Period::NextDays(30), "fim"),
    QuerySpec::rows("contratos_ativos", "contratos").filter(ACTIVE_CONTRACT),
    QuerySpec::rows("buscar_contrato", "contratos").param("cliente"),
    QuerySpec::rows("receita_contratos", "contratos")
        .filter(ACTIVE_CONTRACT)
        .shape(Shape::Sum(Measure::Field("valor_mensal"))),
    QuerySpec::rows("total_contratos", "contratos").filter(ACTIVE_CONTRACT).shape(Shape::Count),
    // Proposals
    QuerySpec::rows("propostas_abertas", "propostas").filter(OPEN),
    QuerySpec::rows("propostas_aprovadas_mes", "propostas")
        .filter(&[("status", Text("aprovada"))])
        .during(Period::CurrentMonth, "data"),
    QuerySpec::rows("buscar_proposta", "propostas").param("cliente"),
    QuerySpec::rows("taxa_conversao", "propostas")
        .during(Period::CurrentYear, "data")
        .shape(Shape::ConversionRate { status: "status", approved: "aprovada" }),
    QuerySpec::rows("valor_propostas", "propostas")
        .filter(OPEN)
        .shape(Shape::Sum(Measure::Field("valor"))),
    // Fleet and suppliers
    QuerySpec::rows("manutencoes_veiculos", "manutencoes_veiculos").during(Period::CurrentYear, "data"),
    QuerySpec::rows("veiculos", "veiculos"),
    QuerySpec::rows("buscar_fornecedor", "fornecedores").param("nome"),
    QuerySpec::rows("fornecedores", "fornecedores"),
];

/// Look up a query by key.
pub fn query_spec(key: &str) -> Option<&'static QuerySpec> {
    QUERIES.iter().find(|q| q.key == key)
}

/// Counts supplied to the AI completion stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessSnapshot {
    pub open_orders: u64,
    pub customers: u64,
}

/// Runs named queries against a [`DataAccess`] implementation.
#[derive(Clone)]
pub struct QueryDispatcher {
    data: Arc<dyn DataAccess>,
    today: Option<NaiveDate>,
}

impl std::fmt::Debug for QueryDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryDispatcher")
            .field("today", &self.today)
            .finish_non_exhaustive()
    }
}

impl QueryDispatcher {
    /// Create a dispatcher over a data source. Periods use the local date.
    pub fn new(data: Arc<dyn DataAccess>) -> Self {
        Self { data, today: None }
    }

    /// Pin the reference day for periods and conditions.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// The reference day.
    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// True if `key` names a dispatchable query.
    pub fn knows(&self, key: &str) -> bool {
        key == OVERVIEW_KEY || query_spec(key).is_some()
    }

    /// Run the query for `key` with the extracted `parameter`.
    ///
    /// Unknown keys, blank required parameters and data-layer errors all
    /// yield an empty vector.
    pub async fn dispatch(&self, key: &str, parameter: &str) -> Vec<Row> {
        if key == OVERVIEW_KEY {
            return self.overview().await;
        }

        let Some(spec) = query_spec(key) else {
            warn!(query = key, "no query registered for key");
            return Vec::new();
        };

        self.run(spec, parameter).await
    }

    /// Counts of open orders and customers. Failures count as zero.
    pub async fn business_snapshot(&self) -> BusinessSnapshot {
        let open_orders = self.count_of("os_abertas").await;
        let customers = self.count_of("listar_clientes").await;
        BusinessSnapshot {
            open_orders,
            customers,
        }
    }

    async fn run(&self, spec: &QuerySpec, parameter: &str) -> Vec<Row> {
        let parameter = parameter.trim();
        let mut params = Params::new();

        for (field, value) in spec.filters {
            params.insert((*field).to_string(), value.to_json());
        }

        if let Some(field) = spec.parameter {
            if parameter.is_empty() {
                debug!(query = spec.key, "required parameter missing, skipping data call");
                return Vec::new();
            }
            params.insert(field.to_string(), Value::from(parameter));
        }

        let today = self.today();
        if let Some((period, field)) = spec.period {
            let (from, to) = period.bounds(today);
            if let Some(from) = from {
                params.insert(format!("{field}{FROM_SUFFIX}"), Value::from(from.to_string()));
            }
            if let Some(to) = to {
                params.insert(format!("{field}{TO_SUFFIX}"), Value::from(to.to_string()));
            }
        }

        match self.data.execute(spec.operation, &params).await {
            Ok(rows) => {
                let fetched = rows.len();
                let rows = aggregate::aggregate(spec.shape, aggregate::retain(rows, spec.conditions, today));
                debug!(query = spec.key, operation = spec.operation, fetched, returned = rows.len(), "query dispatched");
                rows
            }
            Err(err) => {
                warn!(query = spec.key, operation = spec.operation, error = %err, "data operation failed");
                Vec::new()
            }
        }
    }

    async fn count_of(&self, key: &str) -> u64 {
        match query_spec(key) {
            Some(spec) => self.run(spec, "").await.len() as u64,
            None => 0,
        }
    }

    /// One row combining several headline figures.
    async fn overview(&self) -> Vec<Row> {
        let mut summary = Row::new();
        let mut answered = false;

        for (key, field) in OVERVIEW {
            let Some(spec) = query_spec(key) else { continue };
            let rows = self.run(spec, "").await;
            let value = match spec.shape {
                Shape::Sum(_) => rows
                    .first()
                    .and_then(|r| r.get("total"))
                    .and_then(value_as_f64)
                    .map_or(Value::from(0.0), Value::from),
                Shape::Count => rows
                    .first()
                    .and_then(|r| r.get("total"))
                    .cloned()
                    .unwrap_or_else(|| Value::from(0)),
                _ => Value::from(rows.len()),
            };
            answered |= !rows.is_empty();
            summary.insert((*field).to_string(), value);
        }

        if answered {
            vec![summary]
        } else {
            Vec::new()
        }
    }
}
