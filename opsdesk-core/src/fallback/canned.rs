// Fixed texts: greetings, help, suggestions, apology and web triggers.

use crate::text::contains_phrase;
use rand::seq::SliceRandom;

/// Greetings only count on utterances up to this many words.
pub const GREETING_MAX_WORDS: usize = 4;

const GREETING_PHRASES: &[&str] = &[
    "oi", "ola", "opa", "bom dia", "boa tarde", "boa noite", "e ai", "salve", "hello", "hi", "hey",
];

pub const GREETING_TEMPLATES: &[&str] = &[
    "Olá! 👋 Sou o assistente da OpsDesk. Posso consultar ordens de serviço, estoque, financeiro, contratos e equipe. Como posso ajudar?",
    "Oi! 😊 Pergunte, por exemplo, \"os abertas\" ou \"estoque baixo\". Em que posso ajudar hoje?",
    "Olá, tudo bem? Estou pronto para consultar os dados da empresa. Digite \"ajuda\" para ver o que sei fazer.",
];

const HELP_PHRASES: &[&str] = &[
    "ajuda",
    "help",
    "comandos",
    "menu",
    "o que voce faz",
    "o que voce sabe fazer",
    "o que voce pode fazer",
    "como usar",
];

pub const HELP_TEXT: &str = "🤖 Posso responder perguntas como:

📋 Ordens de serviço
• os abertas, os em andamento, os atrasadas, os de hoje
• buscar os <número>, os do cliente <nome>, os do técnico <nome>

👥 Clientes
• buscar cliente <nome>, listar clientes, quantos clientes, melhores clientes

📦 Estoque
• estoque baixo, sem estoque, buscar produto <nome>, valor do estoque

💰 Financeiro
• faturamento do mês, lucro do mês, contas a receber, contas a pagar, contas vencidas

👷 Equipe
• folha de pagamento, buscar funcionário <nome>, técnicos disponíveis, agenda de hoje

📑 Contratos e propostas
• contratos vencendo, contratos ativos, propostas abertas, taxa de conversão

📊 Visão geral
• resumo geral

Para outras perguntas eu consulto a base de conhecimento e, se preciso, a web.";

pub const SUGGESTIONS_TEXT: &str = "🤔 Não encontrei uma resposta para isso. Tente, por exemplo:
• os abertas
• estoque baixo
• faturamento do mês
• buscar cliente <nome>
• resumo geral
Ou digite \"ajuda\" para ver tudo o que sei fazer.";

pub const APOLOGY_TEXT: &str = "😕 Tive um problema ao buscar essa informação agora. Pode reformular a pergunta ou tentar novamente em instantes?";

/// Phrases that make a web search worthwhile, with the topic each implies.
const WEB_TRIGGERS: &[(&str, &str)] = &[
    ("noticias", "noticias"),
    ("noticia", "noticias"),
    ("cotacao", "cotacao"),
    ("preco", "preco"),
    ("clima", "clima"),
    ("tempo", "clima"),
    ("o que e", "definicao"),
    ("como funciona", "definicao"),
    ("quando", "data"),
    ("onde", "local"),
    ("quem", "pessoa"),
    ("hoje", "atualidades"),
    ("news", "noticias"),
    ("price", "preco"),
    ("weather", "clima"),
    ("what is", "definicao"),
    ("how does", "definicao"),
    ("when", "data"),
    ("where", "local"),
    ("who", "pessoa"),
    ("today", "atualidades"),
];

/// True if a normalized utterance is a short greeting.
pub fn is_greeting(normalized: &str) -> bool {
    let words = normalized.split_whitespace().count();
    words > 0
        && words <= GREETING_MAX_WORDS
        && GREETING_PHRASES.iter().any(|p| contains_phrase(normalized, p))
}

/// True if a normalized utterance asks for help.
pub fn is_help(normalized: &str) -> bool {
    HELP_PHRASES.iter().any(|p| contains_phrase(normalized, p))
}

/// Topic of the first web trigger found in a normalized utterance.
pub fn web_topic(normalized: &str) -> Option<&'static str> {
    WEB_TRIGGERS
        .iter()
        .find(|(phrase, _)| contains_phrase(normalized, phrase))
        .map(|(_, topic)| *topic)
}

/// One of the greeting templates.
pub fn pick_greeting() -> &'static str {
    GREETING_TEMPLATES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(GREETING_TEMPLATES[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::normalize;

    #[test]
    fn test_greetings() {
        assert!(is_greeting("oi"));
        assert!(is_greeting(&normalize("Bom dia, equipe!")));
        assert!(is_greeting(&normalize("Olá")));
        // too long to be just a greeting
        assert!(!is_greeting(&normalize("oi quais os abertas hoje no sistema")));
        // boundary: "oi" inside another word
        assert!(!is_greeting(&normalize("oito os")));
        assert!(!is_greeting(""));
    }

    #[test]
    fn test_help() {
        assert!(is_help("ajuda"));
        assert!(is_help(&normalize("O que você pode fazer?")));
        assert!(!is_help(&normalize("ajudante novo")));
    }

    #[test]
    fn test_web_topic() {
        assert_eq!(web_topic(&normalize("qual o clima hoje")), Some("clima"));
        assert_eq!(web_topic(&normalize("Cotação do dólar")), Some("cotacao"));
        assert_eq!(web_topic(&normalize("what is ISO 9001")), Some("definicao"));
        assert_eq!(web_topic(&normalize("politica de garantia")), None);
    }

    #[test]
    fn test_pick_greeting() {
        assert!(GREETING_TEMPLATES.contains(&pick_greeting()));
    }
}
