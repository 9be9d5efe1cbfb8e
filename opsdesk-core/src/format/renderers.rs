//! Renderer strategies and the built-in reply templates.

use super::template::{fill, Scope};
use super::{Locale, Renderer};
use crate::data::{value_as_f64, value_as_text, Row};

/// Items shown before the list is cut short.
pub const DEFAULT_LIST_LIMIT: usize = 10;

/// Header line followed by one line per row.
#[derive(Debug, Clone)]
pub struct ListRenderer {
    header: &'static str,
    item: &'static str,
    prefix: &'static str,
    empty: &'static str,
    limit: usize,
}

impl ListRenderer {
    pub fn new(header: &'static str, item: &'static str, empty: &'static str) -> Self {
        Self {
            header,
            item,
            prefix: "•",
            empty,
            limit: DEFAULT_LIST_LIMIT,
        }
    }

    /// Marker printed before each item.
    pub fn with_prefix(mut self, prefix: &'static str) -> Self {
        self.prefix = prefix;
        self
    }

    /// Maximum number of items printed.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }
}

impl Renderer for ListRenderer {
    fn render(&self, rows: &[Row], locale: &Locale) -> String {
        let mut lines = vec![fill(self.header, Scope::header(rows), locale)];
        for index in 0..rows.len().min(self.limit) {
            let item = fill(self.item, Scope::item(rows, index), locale);
            lines.push(format!("{} {}", self.prefix, item));
        }
        if rows.len() > self.limit {
            lines.push(format!("… e mais {}.", rows.len() - self.limit));
        }
        lines.join("\n")
    }

    fn empty_message(&self) -> &str {
        self.empty
    }
}

/// A single aggregate row rendered through one template.
///
/// Covers counts, totals, averages, balances, rates and summaries. The
/// template names whichever fields the aggregate shape produced.
#[derive(Debug, Clone)]
pub struct FigureRenderer {
    template: &'static str,
    empty: &'static str,
}

impl FigureRenderer {
    pub fn new(template: &'static str, empty: &'static str) -> Self {
        Self { template, empty }
    }
}

impl Renderer for FigureRenderer {
    fn render(&self, rows: &[Row], locale: &Locale) -> String {
        fill(self.template, Scope::figure(rows), locale)
    }

    fn empty_message(&self) -> &str {
        self.empty
    }
}

/// How a ranked or grouped value is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Money,
    Integer,
}

impl ValueKind {
    fn show(self, value: f64, locale: &Locale) -> String {
        match self {
            Self::Money => locale.money(value),
            Self::Integer => locale.integer(value),
        }
    }
}

/// Numbered positions with medals for the podium.
#[derive(Debug, Clone)]
pub struct RankingRenderer {
    header: &'static str,
    label: &'static str,
    value: &'static str,
    kind: ValueKind,
    empty: &'static str,
}

impl RankingRenderer {
    pub fn new(
        header: &'static str,
        label: &'static str,
        value: &'static str,
        kind: ValueKind,
        empty: &'static str,
    ) -> Self {
        Self {
            header,
            label,
            value,
            kind,
            empty,
        }
    }
}

impl Renderer for RankingRenderer {
    fn render(&self, rows: &[Row], locale: &Locale) -> String {
        let mut lines = vec![fill(self.header, Scope::header(rows), locale)];
        for (index, row) in rows.iter().enumerate() {
            let medal = match index {
                0 => "🥇".to_string(),
                1 => "🥈".to_string(),
                2 => "🥉".to_string(),
                n => format!("{}.", n + 1),
            };
            let label = row.get(self.label).map(value_as_text).unwrap_or_default();
            let value = row.get(self.value).and_then(value_as_f64).unwrap_or(0.0);
            lines.push(format!("{medal} {label}: {}", self.kind.show(value, locale)));
        }
        lines.join("\n")
    }

    fn empty_message(&self) -> &str {
        self.empty
    }
}

/// Grouped values with each group's share of the whole.
#[derive(Debug, Clone)]
pub struct BreakdownRenderer {
    header: &'static str,
    value: &'static str,
    kind: ValueKind,
    empty: &'static str,
}

impl BreakdownRenderer {
    pub fn new(header: &'static str, value: &'static str, kind: ValueKind, empty: &'static str) -> Self {
        Self {
            header,
            value,
            kind,
            empty,
        }
    }
}

impl Renderer for BreakdownRenderer {
    fn render(&self, rows: &[Row], locale: &Locale) -> String {
        let values: Vec<f64> = rows
            .iter()
            .map(|r| r.get(self.value).and_then(value_as_f64).unwrap_or(0.0))
            .collect();
        let whole: f64 = values.iter().sum();

        let mut lines = vec![fill(self.header, Scope::header(rows), locale)];
        for (row, value) in rows.iter().zip(&values) {
            let label = row.get("grupo").map(value_as_text).unwrap_or_default();
            let share = if whole > 0.0 { value * 100.0 / whole } else { 0.0 };
            lines.push(format!(
                "• {label}: {} ({})",
                self.kind.show(*value, locale),
                locale.percent(share)
            ));
        }
        lines.push(format!("Total: {}", self.kind.show(whole, locale)));
        lines.join("\n")
    }

    fn empty_message(&self) -> &str {
        self.empty
    }
}

/// Used for keys without a registered renderer.
#[derive(Debug, Clone, Default)]
pub struct GenericRenderer;

impl Renderer for GenericRenderer {
    fn render(&self, rows: &[Row], _locale: &Locale) -> String {
        let mut lines = vec![format!("📋 Encontrei {} resultado(s):", rows.len())];
        for row in rows.iter().take(DEFAULT_LIST_LIMIT) {
            let fields: Vec<String> = row
                .iter()
                .filter(|(_, v)| !v.is_null())
                .take(4)
                .map(|(k, v)| format!("{k}: {}", value_as_text(v)))
                .collect();
            lines.push(format!("• {}", fields.join(" | ")));
        }
        if rows.len() > DEFAULT_LIST_LIMIT {
            lines.push(format!("… e mais {}.", rows.len() - DEFAULT_LIST_LIMIT));
        }
        lines.join("\n")
    }

    fn empty_message(&self) -> &str {
        "Não encontrei resultados para essa consulta."
    }
}

const CLIENTE: &str = "{nome} | {cidade} | {telefone}";
const ORDEM: &str = "OS {numero} | {cliente} | {status} | prazo {prazo:date}";
const PRODUTO: &str = "{nome}: {quantidade:int} un. | {preco:money}";
const LANCAMENTO: &str = "{data:date} | {descricao} | {tipo} | {valor:money}";
const FUNCIONARIO: &str = "{nome} | {cargo}";
const VISITA: &str = "{data:date} {data:time} | {tecnico} | {cliente} | {endereco}";
const CONTRATO: &str = "Contrato {numero} | {cliente} | {valor_mensal:money}/mês | até {fim:date}";
const PROPOSTA: &str = "Proposta {numero} | {cliente} | {valor:money} | {status}";
const FORNECEDOR: &str = "{nome} | {categoria} | {telefone}";

/// Every built-in renderer, keyed by response template.
pub fn builtin() -> Vec<(&'static str, Box<dyn Renderer>)> {
    use ValueKind::{Integer, Money};

    fn list(header: &'static str, item: &'static str, empty: &'static str) -> Box<dyn Renderer> {
        Box::new(ListRenderer::new(header, item, empty))
    }

    vec![
        // Customers
        ("buscar_cliente", list("🔎 Encontrei {count} cliente(s):", "{nome} | {email} | {telefone} | {cidade}", "🔎 Cliente não encontrado. Confira o nome e tente novamente.")),
        ("listar_clientes", list("👥 Vocês têm {count} cliente(s):", CLIENTE, "👥 Nenhum cliente cadastrado ainda.")),
        ("total_clientes", Box::new(FigureRenderer::new("👥 Total de clientes cadastrados: {total:int}.", "👥 Não há clientes cadastrados."))),
        ("clientes_novos_mes", list("🆕 {count} cliente(s) novo(s) este mês:", "{nome} | cadastrado em {criado_em:date}", "🆕 Nenhum cliente novo cadastrado este mês.")),
        ("top_clientes", Box::new(RankingRenderer::new("🏆 Maiores clientes por volume de compras:", "nome", "total_compras", Money, "🏆 Ainda não há compras registradas para montar o ranking de clientes."))),
        ("clientes_inativos", list("💤 {count} cliente(s) inativo(s):", "{nome} | última compra {ultima_compra:date}", "💤 Nenhum cliente inativo. Ótimo sinal!")),
        // Service orders
        ("os_abertas", list("📋 Vocês têm {count} ordem(ns) de serviço aberta(s):", ORDEM, "✅ Nenhuma ordem de serviço aberta no momento.")),
        ("os_em_andamento", list("🔧 {count} ordem(ns) de serviço em andamento:", "OS {numero} | {cliente} | técnico {tecnico}", "🔧 Nenhuma ordem de serviço em andamento.")),
        ("os_concluidas_mes", list("✅ {count} ordem(ns) concluída(s) este mês:", "OS {numero} | {cliente} | {conclusao:date} | {valor:money}", "Nenhuma ordem de serviço concluída este mês ainda.")),
        ("os_atrasadas", Box::new(ListRenderer::new("⏰ Atenção: {count} ordem(ns) de serviço atrasada(s):", ORDEM, "👍 Nenhuma ordem de serviço atrasada.").with_prefix("⚠️"))),
        ("os_hoje", list("📅 {count} ordem(ns) de serviço com prazo para hoje:", ORDEM, "📅 Nenhuma ordem de serviço com prazo para hoje.")),
        ("total_os", Box::new(FigureRenderer::new("📋 Total de ordens de serviço registradas: {total:int}.", "📋 Nenhuma ordem de serviço registrada."))),
        ("buscar_os", list("🔎 Encontrei {count} ordem(ns) de serviço:", "OS {numero} | {cliente} | {status} | {descricao} | {valor:money}", "🔎 Ordem de serviço não encontrada. Confira o número informado.")),
        ("os_por_cliente", list("📋 {count} ordem(ns) de serviço deste cliente:", ORDEM, "📋 Nenhuma ordem de serviço encontrada para esse cliente.")),
        ("os_por_tecnico", list("🧰 {count} ordem(ns) de serviço deste técnico:", ORDEM, "🧰 Nenhuma ordem de serviço encontrada para esse técnico.")),
        ("os_por_status", Box::new(BreakdownRenderer::new("📊 Ordens de serviço por status:", "quantidade", Integer, "📊 Sem ordens de serviço para agrupar por status."))),
        ("faturamento_os_mes", Box::new(FigureRenderer::new("💵 Valor das ordens concluídas este mês: {total:money} em {quantidade:int} OS.", "💵 Nenhuma ordem de serviço faturada este mês."))),
        // Stock
        ("estoque_baixo", Box::new(ListRenderer::new("📦 Encontrei {count} produto(s) com estoque baixo:", "{nome}: {quantidade:int} un. (mínimo {estoque_minimo:int})", "✅ Nenhum produto com estoque baixo. Estoque em dia!").with_prefix("⚠️"))),
        ("produtos_sem_estoque", Box::new(ListRenderer::new("🚫 {count} produto(s) sem estoque:", "{nome} | código {codigo}", "✅ Nenhum produto zerado no estoque.").with_prefix("❗"))),
        ("buscar_produto", list("🔎 Encontrei {count} produto(s):", PRODUTO, "🔎 Produto não encontrado no cadastro.")),
        ("listar_produtos", list("📦 {count} produto(s) cadastrado(s):", PRODUTO, "📦 Nenhum produto cadastrado.")),
        ("valor_estoque", Box::new(FigureRenderer::new("💰 Valor total em estoque: {total:money} ({quantidade:int} produtos).", "💰 Não há produtos em estoque para valorizar."))),
        ("movimentacoes_estoque", list("🔄 {count} movimentação(ões) de estoque este mês:", "{data:date} | {produto} | {tipo} | {quantidade:int} un.", "🔄 Nenhuma movimentação de estoque este mês.")),
        ("produtos_mais_usados", Box::new(RankingRenderer::new("🔩 Produtos mais usados:", "grupo", "total", Integer, "🔩 Ainda não há saídas de estoque registradas."))),
        // Finance
        ("faturamento_mes", Box::new(FigureRenderer::new("💰 Faturamento do mês: {total:money} em {quantidade:int} lançamento(s).", "💰 Nenhuma receita lançada este mês."))),
        ("faturamento_ano", Box::new(FigureRenderer::new("📈 Faturamento do ano: {total:money} em {quantidade:int} lançamento(s).", "📈 Nenhuma receita lançada este ano."))),
        ("contas_receber", list("💵 {count} conta(s) a receber, total {sum:valor}:", "{cliente} | {valor:money} | vence {vencimento:date}", "💵 Nenhuma conta a receber pendente.")),
        ("contas_pagar", list("🧾 {count} conta(s) a pagar, total {sum:valor}:", "{fornecedor} | {valor:money} | vence {vencimento:date}", "🧾 Nenhuma conta a pagar pendente.")),
        ("contas_vencidas", Box::new(ListRenderer::new("🚨 {count} conta(s) vencida(s), total {sum:valor}:", "{cliente} | {valor:money} | venceu {vencimento:date}", "✅ Nenhuma conta vencida. Recebimentos em dia!").with_prefix("⚠️"))),
        ("lucro_mes", Box::new(FigureRenderer::new("📊 Resultado do mês:\n• Receitas: {receitas:money}\n• Despesas: {despesas:money}\n• Lucro: {saldo:money}", "📊 Sem lançamentos este mês para calcular o lucro."))),
        ("fluxo_caixa", list("💸 Fluxo de caixa do mês ({count} lançamento(s)):", LANCAMENTO, "💸 Nenhum lançamento no caixa este mês.")),
        ("despesas_por_categoria", Box::new(BreakdownRenderer::new("🗂️ Despesas do mês por categoria:", "total", Money, "🗂️ Nenhuma despesa lançada este mês."))),
        ("despesas_mes", Box::new(FigureRenderer::new("💳 Despesas do mês: {total:money} em {quantidade:int} lançamento(s).", "💳 Nenhuma despesa lançada este mês."))),
        ("ticket_medio", Box::new(FigureRenderer::new("🎯 Ticket médio do mês: {media:money} ({quantidade:int} notas, total {total:money}).", "🎯 Sem notas emitidas este mês para calcular o ticket médio."))),
        ("notas_fiscais_mes", list("🧾 {count} nota(s) fiscal(is) emitida(s) este mês, total {sum:valor}:", "NF {numero} | {cliente} | {emissao:date} | {valor:money}", "🧾 Nenhuma nota fiscal emitida este mês.")),
        // People and payroll
        ("total_folha", Box::new(FigureRenderer::new("👔 Total da folha do mês: {total:money} para {quantidade:int} funcionário(s).", "👔 A folha deste mês ainda não foi gerada."))),
        ("folha_pagamento", list("👔 Folha de pagamento do mês ({count} holerite(s)):", "{funcionario} | bruto {salario_bruto:money} | líquido {salario_liquido:money}", "👔 Nenhum holerite gerado para este mês.")),
        ("buscar_funcionario", list("🔎 Encontrei {count} funcionário(s):", "{nome} | {cargo} | {email} | admitido em {admissao:date}", "🔎 Funcionário não encontrado.")),
        ("total_funcionarios", Box::new(FigureRenderer::new("👷 A equipe tem {total:int} funcionário(s) ativo(s).", "👷 Não há funcionários ativos na equipe."))),
        ("listar_funcionarios", list("👷 {count} funcionário(s) ativo(s):", FUNCIONARIO, "👷 Nenhum funcionário ativo cadastrado.")),
        ("ferias", list("🏖️ {count} pessoa(s) de férias agora:", "{funcionario} | de {inicio:date} a {fim:date}", "🏖️ Ninguém está de férias no momento.")),
        ("aniversariantes_mes", Box::new(ListRenderer::new("🎂 {count} aniversariante(s) este mês:", "{nome} | {nascimento:date}", "🎂 Nenhum aniversariante este mês.").with_prefix("🎉"))),
        // Technicians and schedule
        ("tecnicos_disponiveis", list("🧑‍🔧 {count} técnico(s) disponível(is):", "{nome} | {especialidade} | {telefone}", "🧑‍🔧 Nenhum técnico disponível agora.")),
        ("agenda_hoje", list("📅 {count} visita(s) agendada(s) para hoje:", "{data:time} | {tecnico} | {cliente} | {endereco}", "📅 Agenda livre hoje, nenhuma visita marcada.")),
        ("agenda_semana", list("🗓️ {count} visita(s) agendada(s) nesta semana:", VISITA, "🗓️ Nenhuma visita agendada nesta semana.")),
        ("ranking_tecnicos", Box::new(RankingRenderer::new("🏅 Técnicos com mais OS concluídas no mês:", "grupo", "quantidade", Integer, "🏅 Nenhuma OS concluída este mês para montar o ranking."))),
        ("visitas_tecnico", list("🗓️ {count} visita(s) deste técnico:", VISITA, "🗓️ Nenhuma visita encontrada para esse técnico.")),
        // Contracts
        ("contratos_vencendo", Box::new(ListRenderer::new("📑 {count} contrato(s) vencendo nos próximos 30 dias:", CONTRATO, "📑 Nenhum contrato vence nos próximos 30 dias.").with_prefix("⚠️"))),
        ("contratos_ativos", list("📑 {count} contrato(s) ativo(s):", CONTRATO, "📑 Nenhum contrato ativo.")),
        ("buscar_contrato", list("🔎 Encontrei {count} contrato(s):", CONTRATO, "🔎 Nenhum contrato encontrado para esse cliente.")),
        ("receita_contratos", Box::new(FigureRenderer::new("🔁 Receita recorrente de contratos: {total:money}/mês ({quantidade:int} contrato(s)).", "🔁 Sem contratos ativos gerando receita recorrente."))),
        ("total_contratos", Box::new(FigureRenderer::new("📑 Total de contratos ativos: {total:int}.", "📑 Nenhum contrato ativo no momento."))),
        // Proposals
        ("propostas_abertas", list("📝 {count} proposta(s) em aberto, total {sum:valor}:", PROPOSTA, "📝 Nenhuma proposta aguardando resposta.")),
        ("propostas_aprovadas_mes", list("🤝 {count} proposta(s) aprovada(s) este mês:", PROPOSTA, "🤝 Nenhuma proposta aprovada este mês ainda.")),
        ("buscar_proposta", list("🔎 Encontrei {count} proposta(s):", PROPOSTA, "🔎 Nenhuma proposta encontrada para esse cliente.")),
        ("taxa_conversao", Box::new(FigureRenderer::new("🎯 Taxa de conversão no ano: {taxa:percent} ({aprovadas:int} de {total:int} propostas aprovadas).", "🎯 Sem propostas este ano para calcular a conversão."))),
        ("valor_propostas", Box::new(FigureRenderer::new("📝 Valor em propostas abertas: {total:money} ({quantidade:int} proposta(s)).", "📝 Nenhuma proposta em aberto no pipeline."))),
        // Fleet and suppliers
        ("manutencoes_veiculos", list("🛠️ {count} manutenção(ões) de veículos este ano:", "{data:date} | {placa} | {servico} | {valor:money}", "🛠️ Nenhuma manutenção de veículo registrada este ano.")),
        ("veiculos", list("🚐 {count} veículo(s) na frota:", "{placa} | {modelo} | {km:int} km | {responsavel}", "🚐 Nenhum veículo cadastrado na frota.")),
        ("buscar_fornecedor", list("🔎 Encontrei {count} fornecedor(es):", FORNECEDOR, "🔎 Fornecedor não encontrado.")),
        ("fornecedores", list("🏭 {count} fornecedor(es) cadastrado(s):", FORNECEDOR, "🏭 Nenhum fornecedor cadastrado.")),
        // Overview
        ("resumo_geral", Box::new(FigureRenderer::new(
            "📊 Resumo geral:\n• OS abertas: {os_abertas:int}\n• Clientes: {total_clientes:int}\n• Produtos com estoque baixo: {estoque_baixo:int}\n• Contas vencidas: {contas_vencidas:int}\n• Faturamento do mês: {faturamento_mes:money}",
            "📊 Ainda não há dados suficientes para o resumo geral.",
        ))),
    ]
}
