//! Message normalisation shared by the classifier and the state tracker

/// Trim, collapse internal whitespace and lower-case.
pub fn normalize(message: &str) -> String {
    message
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Normalised form used to compare a message against short-reply tokens.
///
/// Leading and trailing punctuation, symbols and emoji are dropped, so
/// "Sim!", "  sim 👍" and "sim." all compare equal to "sim".
pub fn short_reply_form(message: &str) -> String {
    let normalized = normalize(message);
    let trimmed = normalized.trim_matches(|c: char| !c.is_alphanumeric());
    normalize(trimmed)
}

/// Brazilian currency rendering: `R$ 1500`, `R$ 23,90`.
pub fn format_brl(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("R$ {:.0}", value)
    } else {
        format!("R$ {:.2}", value).replace('.', ",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace_and_case() {
        assert_eq!(normalize("   COMO   estou   ?   "), "como estou ?");
        assert_eq!(normalize("\tGastei\n100\u{a0}no mercado"), "gastei 100 no mercado");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_short_reply_form_strips_symbols() {
        assert_eq!(short_reply_form("Sim!"), "sim");
        assert_eq!(short_reply_form("  sim 👍 "), "sim");
        assert_eq!(short_reply_form("O que você indica?"), "o que você indica");
        assert_eq!(short_reply_form("Não."), "não");
        assert_eq!(short_reply_form("?!"), "");
    }

    #[test]
    fn test_format_brl() {
        assert_eq!(format_brl(1500.0), "R$ 1500");
        assert_eq!(format_brl(23.9), "R$ 23,90");
    }
}
