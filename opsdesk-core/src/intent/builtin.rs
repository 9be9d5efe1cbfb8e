// Built-in intent catalog.
//
// Order matters: containment is checked intent by intent, so an intent whose
// keyword is contained in another intent's keyword must come after it
// (e.g. `manutencoes_veiculos` before `veiculos`).

pub(super) const BUILTIN_INTENTS: &[(&str, &[&str])] = &[
    // Customers
    (
        "buscar_cliente",
        &["buscar cliente", "procurar cliente", "encontrar cliente", "dados do cliente", "find customer"],
    ),
    ("listar_clientes", &["listar clientes", "lista de clientes", "todos os clientes", "meus clientes"]),
    ("total_clientes", &["quantos clientes", "total de clientes", "numero de clientes"]),
    ("clientes_novos_mes", &["clientes novos", "novos clientes", "clientes cadastrados este mes"]),
    ("top_clientes", &["melhores clientes", "top clientes", "maiores clientes", "ranking de clientes"]),
    ("clientes_inativos", &["clientes inativos", "clientes sem compra", "clientes parados"]),
    // Service orders
    (
        "os_abertas",
        &["os abertas", "ordens abertas", "ordens de servico abertas", "os em aberto", "ordens em aberto", "open orders"],
    ),
    ("os_em_andamento", &["os em andamento", "ordens em andamento", "servicos em andamento"]),
    ("os_concluidas_mes", &["os concluidas", "ordens concluidas", "servicos concluidos"]),
    ("os_atrasadas", &["os atrasadas", "ordens atrasadas", "servicos atrasados"]),
    ("os_hoje", &["os de hoje", "ordens de hoje", "servicos de hoje"]),
    ("total_os", &["quantas os", "total de os", "quantas ordens", "total de ordens"]),
    ("buscar_os", &["buscar os", "buscar ordem", "procurar os", "detalhes da os", "ordem numero"]),
    ("os_por_cliente", &["os do cliente", "ordens do cliente", "servicos do cliente"]),
    ("os_por_tecnico", &["os do tecnico", "ordens do tecnico", "servicos do tecnico"]),
    ("os_por_status", &["os por status", "ordens por status", "resumo das os"]),
    ("faturamento_os_mes", &["valor das os", "faturamento das os", "valor das ordens"]),
    // Stock
    (
        "estoque_baixo",
        &["estoque baixo", "produtos acabando", "estoque critico", "repor estoque", "low stock"],
    ),
    ("produtos_sem_estoque", &["sem estoque", "produtos esgotados", "estoque zerado"]),
    ("buscar_produto", &["buscar produto", "procurar produto", "consultar produto", "preco do produto"]),
    ("listar_produtos", &["listar produtos", "lista de produtos", "todos os produtos", "catalogo de produtos"]),
    ("valor_estoque", &["valor do estoque", "valor em estoque", "estoque total"]),
    (
        "movimentacoes_estoque",
        &["movimentacoes de estoque", "movimentacao do estoque", "entradas e saidas de estoque"],
    ),
    ("produtos_mais_usados", &["produtos mais usados", "pecas mais usadas", "materiais mais usados"]),
    // Finance
    (
        "faturamento_mes",
        &["faturamento do mes", "faturamento mensal", "receita do mes", "vendas do mes", "quanto faturamos"],
    ),
    ("faturamento_ano", &["faturamento do ano", "faturamento anual", "receita do ano"]),
    ("contas_receber", &["contas a receber", "recebiveis", "valores a receber"]),
    ("contas_pagar", &["contas a pagar", "pagamentos pendentes", "valores a pagar"]),
    ("contas_vencidas", &["contas vencidas", "inadimplentes", "clientes devendo", "boletos vencidos"]),
    ("lucro_mes", &["lucro do mes", "lucro mensal", "resultado do mes", "monthly profit"]),
    ("fluxo_caixa", &["fluxo de caixa", "entradas e saidas do caixa", "caixa do mes"]),
    ("despesas_por_categoria", &["despesas por categoria", "gastos por categoria"]),
    ("despesas_mes", &["despesas do mes", "gastos do mes", "quanto gastamos"]),
    ("ticket_medio", &["ticket medio", "valor medio das vendas"]),
    ("notas_fiscais_mes", &["notas fiscais", "notas emitidas", "nfe do mes"]),
    // People and payroll
    ("total_folha", &["total da folha", "custo da folha", "valor da folha"]),
    ("folha_pagamento", &["folha de pagamento", "holerites", "salarios do mes"]),
    ("buscar_funcionario", &["buscar funcionario", "procurar funcionario", "dados do funcionario"]),
    ("total_funcionarios", &["quantos funcionarios", "total de funcionarios"]),
    (
        "listar_funcionarios",
        &["listar funcionarios", "lista de funcionarios", "todos os funcionarios", "nossa equipe", "colaboradores"],
    ),
    ("ferias", &["quem esta de ferias", "ferias programadas", "ferias"]),
    ("aniversariantes_mes", &["aniversariantes", "aniversarios do mes"]),
    // Technicians and schedule
    ("tecnicos_disponiveis", &["tecnicos disponiveis", "tecnicos livres", "quem esta disponivel"]),
    ("agenda_hoje", &["agenda de hoje", "agenda do dia", "visitas de hoje", "compromissos de hoje"]),
    ("agenda_semana", &["agenda da semana", "visitas da semana", "programacao da semana"]),
    ("ranking_tecnicos", &["ranking de tecnicos", "melhores tecnicos", "produtividade dos tecnicos"]),
    ("visitas_tecnico", &["visitas do tecnico", "agenda do tecnico"]),
    // Contracts
    ("contratos_vencendo", &["contratos vencendo", "contratos a vencer", "renovacoes de contrato"]),
    ("contratos_ativos", &["contratos ativos", "contratos vigentes", "listar contratos"]),
    ("buscar_contrato", &["buscar contrato", "contrato do cliente", "procurar contrato"]),
    ("receita_contratos", &["receita dos contratos", "receita recorrente", "valor dos contratos"]),
    ("total_contratos", &["quantos contratos", "total de contratos"]),
    // Proposals
    (
        "propostas_abertas",
        &["propostas abertas", "propostas pendentes", "orcamentos pendentes", "orcamentos em aberto"],
    ),
    ("propostas_aprovadas_mes", &["propostas aprovadas", "orcamentos aprovados"]),
    ("buscar_proposta", &["buscar proposta", "proposta do cliente", "buscar orcamento"]),
    ("taxa_conversao", &["taxa de conversao", "conversao de propostas", "aprovacao de propostas"]),
    ("valor_propostas", &["valor das propostas", "valor em propostas", "pipeline de vendas"]),
    // Fleet and suppliers
    (
        "manutencoes_veiculos",
        &["manutencao dos veiculos", "manutencoes da frota", "revisao dos veiculos"],
    ),
    ("veiculos", &["veiculos", "frota", "carros da empresa"]),
    ("buscar_fornecedor", &["buscar fornecedor", "procurar fornecedor"]),
    ("fornecedores", &["fornecedores", "lista de fornecedores"]),
    // Overview
    ("resumo_geral", &["resumo geral", "visao geral", "dashboard", "como estamos", "resumo do dia"]),
];
