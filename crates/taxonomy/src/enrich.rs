use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Pure text expansion applied ahead of embedding generation.
///
/// Enrichment is pluggable: the embedding cache never depends on it,
/// the candidate index simply runs labels through whichever enricher
/// was injected.
pub trait TextEnricher: Send + Sync {
    fn enrich(&self, text: &str) -> String;
}

/// Passthrough enricher.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEnrichment;

impl TextEnricher for NoEnrichment {
    fn enrich(&self, text: &str) -> String {
        text.to_string()
    }
}

static SYNONYMS: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
    map.insert("serviço", &["atendimento", "service", "staff", "equipe"]);
    map.insert("limpeza", &["higiene", "arrumação", "cleaning", "housekeeping"]);
    map.insert("café da manhã", &["breakfast", "café", "manhã", "desjejum"]);
    map.insert("jantar", &["dinner", "janta", "refeição noturna"]);
    map.insert("almoço", &["lunch", "refeição", "meio-dia"]);
    map.insert("quarto", &["acomodação", "suite", "apartamento", "room"]);
    map.insert("banheiro", &["sanitário", "toalete", "lavabo", "bathroom"]);
    map.insert("wi-fi", &["wifi", "internet", "conexão", "wireless", "rede"]);
    map.insert("tv", &["televisão", "televisor", "smart tv"]);
    map.insert("piscina", &["pool", "natação", "área aquática"]);
    map.insert("academia", &["gym", "fitness", "musculação"]);
    map.insert("transfer", &["transporte", "traslado", "shuttle"]);
    map.insert("localização", &["location", "lugar", "posição", "situado"]);
    map.insert("vista", &["view", "panorama", "paisagem", "visual"]);
    map.insert("experiência", &["estadia", "hospedagem", "stay", "vivência"]);
    map.insert("check-in", &["entrada", "chegada", "registro"]);
    map.insert("check-out", &["saída", "partida", "checkout"]);
    map.insert("estacionamento", &["garagem", "parking", "vaga"]);
    map.insert("ar-condicionado", &["ar", "climatização", "ac", "refrigeração"]);
    map.insert("gastronomia", &["culinária", "comida", "cozinha", "food"]);
    map.insert("atendimento", &["service", "staff", "equipe", "funcionários"]);
    map.insert("variedade", &["diversidade", "opções", "escolhas"]);
    map.insert("estrutura", &["instalações", "infraestrutura", "facilities"]);
    map
});

static DEPARTMENT_TERMS: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
    map.insert(
        "a&b",
        &["comida", "bebida", "restaurante", "garçom", "refeição", "prato", "menu"],
    );
    map.insert(
        "governança",
        &["limpeza", "camareira", "arrumação", "quarto", "roupa de cama"],
    );
    map.insert(
        "recepção",
        &["check-in", "check-out", "recepcionista", "chegada", "saída"],
    );
    map.insert("manutenção", &["equipamento", "conserto", "quebrado", "reparo"]);
    map.insert("lazer", &["piscina", "academia", "spa", "atividades"]);
    map.insert("tecnologia", &["wi-fi", "internet", "tv", "sistema"]);
    map.insert("produto", &["hotel", "estadia", "experiência", "localização"]);
    map
});

/// Expands a `Departamento - Aspecto` label with synonyms, department
/// vocabulary and an accent-stripped variant, `|`-joined, so the
/// embedding carries semantic neighborhood rather than the bare label.
#[derive(Debug, Default, Clone, Copy)]
pub struct SynonymEnricher;

impl SynonymEnricher {
    fn synonyms_for(term: &str) -> Vec<&'static str> {
        let lower = term.to_lowercase();
        let mut found = Vec::new();
        for (key, synonyms) in SYNONYMS.iter() {
            if lower.contains(key) {
                found.extend_from_slice(synonyms);
            }
        }
        found.sort_unstable();
        found.dedup();
        found.truncate(5);
        found
    }

    fn strip_accents(term: &str) -> String {
        term.chars()
            .map(|c| match c {
                'á' | 'à' | 'â' | 'ã' => 'a',
                'é' | 'ê' => 'e',
                'í' => 'i',
                'ó' | 'ô' | 'õ' => 'o',
                'ú' => 'u',
                'ç' => 'c',
                other => other,
            })
            .collect()
    }
}

impl TextEnricher for SynonymEnricher {
    fn enrich(&self, text: &str) -> String {
        let (department, aspect) = match text.split_once(" - ") {
            Some((dept, aspect)) => (Some(dept.trim()), aspect.trim()),
            None => (None, text.trim()),
        };

        let mut parts: Vec<String> = vec![text.trim().to_string()];
        if let Some(dept) = department {
            parts.push(dept.to_string());
            if let Some(terms) = DEPARTMENT_TERMS.get(dept.to_lowercase().as_str()) {
                parts.extend(terms.iter().map(|t| (*t).to_string()));
            }
        }
        parts.push(aspect.to_string());
        parts.extend(Self::synonyms_for(aspect).into_iter().map(String::from));

        let plain = Self::strip_accents(&aspect.to_lowercase());
        if plain != aspect.to_lowercase() {
            parts.push(plain);
        }

        let mut seen = std::collections::HashSet::new();
        parts.retain(|p| !p.is_empty() && seen.insert(p.to_lowercase()));
        parts.join(" | ")
    }
}
