//! Label comparison keys.

/// Case- and accent-insensitive comparison key with whitespace collapsed.
///
/// Mirrors the `NFKD` folding the in-page scripts apply, for the Latin
/// letters the form uses.
pub fn normalize_label(text: &str) -> String {
    let folded: String = text.chars().flat_map(fold_char).collect();
    folded
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn fold_char(ch: char) -> Vec<char> {
    let base = match ch {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'Á' | 'À' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'A',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'ç' => 'c',
        'Ç' => 'C',
        'ñ' => 'n',
        'Ñ' => 'N',
        'ý' | 'ÿ' => 'y',
        'Ý' => 'Y',
        '\u{0300}'..='\u{036f}' => return Vec::new(),
        '\u{00a0}' => ' ',
        other => other,
    };
    vec![base]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_accents_case_and_spacing() {
        assert_eq!(normalize_label("  Petição   Inicial "), "peticao inicial");
        assert_eq!(normalize_label("RÉU"), normalize_label("reu"));
    }

    #[test]
    fn strips_combining_marks() {
        assert_eq!(normalize_label("Jose\u{0301}"), "jose");
    }
}
