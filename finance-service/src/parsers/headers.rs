//! Maps free-form (often Portuguese) CSV column names to transaction fields.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionField {
    Name,
    Amount,
    Date,
    Category,
    Type,
    PaymentMethod,
}

struct Rule {
    fragments: &'static [&'static str],
    field: TransactionField,
}

/// Ordered matching rules; the first rule with a matching fragment wins.
const RULES: &[Rule] = &[
    Rule {
        fragments: &["descricao", "description", "nome", "name", "titulo", "title"],
        field: TransactionField::Name,
    },
    Rule {
        fragments: &["valor", "amount"],
        field: TransactionField::Amount,
    },
    Rule {
        fragments: &["data", "date"],
        field: TransactionField::Date,
    },
    Rule {
        fragments: &["categoria", "category"],
        field: TransactionField::Category,
    },
    Rule {
        fragments: &["tipo", "type"],
        field: TransactionField::Type,
    },
    Rule {
        fragments: &["pagamento", "payment", "metodo"],
        field: TransactionField::PaymentMethod,
    },
];

/// Lowercase, fold Latin accents and keep only `a-z`.
pub fn normalize_header(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .map(fold_accent)
        .filter(|c| c.is_ascii_lowercase())
        .collect()
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

pub fn map_header(raw: &str) -> Option<TransactionField> {
    let key = normalize_header(raw);
    RULES
        .iter()
        .find(|rule| rule.fragments.iter().any(|f| key.contains(f)))
        .map(|rule| rule.field)
}

/// Field for each column position; `None` for columns that are ignored.
pub fn map_headers<'a, I>(headers: I) -> Vec<Option<TransactionField>>
where
    I: IntoIterator<Item = &'a str>,
{
    headers.into_iter().map(map_header).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_portuguese_headers() {
        let mapped = map_headers([
            "Descrição",
            "Valor",
            "Data",
            "Categoria",
            "Tipo",
            "Metodo de Pagamento",
            "Other",
        ]);

        assert_eq!(
            mapped,
            vec![
                Some(TransactionField::Name),
                Some(TransactionField::Amount),
                Some(TransactionField::Date),
                Some(TransactionField::Category),
                Some(TransactionField::Type),
                Some(TransactionField::PaymentMethod),
                None,
            ]
        );
    }

    #[test]
    fn maps_english_headers() {
        assert_eq!(map_header("Description"), Some(TransactionField::Name));
        assert_eq!(map_header("Amount (BRL)"), Some(TransactionField::Amount));
        assert_eq!(map_header("Posted Date"), Some(TransactionField::Date));
        assert_eq!(map_header("Payment"), Some(TransactionField::PaymentMethod));
    }

    #[test]
    fn normalization_strips_accents_and_symbols() {
        assert_eq!(normalize_header(" Título_da-Transação 1 "), "titulodatransacao");
        // Earlier rules win: "titulo" is checked before "data".
        assert_eq!(map_header("Título da Transação"), Some(TransactionField::Name));
    }
}
