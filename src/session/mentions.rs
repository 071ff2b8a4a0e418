//! Entities mentioned in an agent reply
//!
//! Agents attach a `MentionContext` to their pending-action signal so the
//! next turn knows which amount, categories and period were under discussion.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

const KNOWN_CATEGORIES: &[&str] = &[
    "mercado", "restaurante", "casa", "carro", "saúde", "lazer",
    "educação", "vestuário", "transporte", "alimentação", "moradia",
    "entretenimento", "viagem", "investimento", "salário", "cartão",
    "financiamento", "farmácia", "uber", "ifood",
];

const MONTHS: &[&str] = &[
    "janeiro", "fevereiro", "março", "abril", "maio", "junho",
    "julho", "agosto", "setembro", "outubro", "novembro", "dezembro",
];

lazy_static! {
    // Evaluated in order; the first pattern with any match wins and the last
    // match of that pattern is used.
    static ref VALUE_PATTERNS: Vec<(Regex, bool)> = vec![
        (Regex::new(r"r\$\s*(\d+(?:\.\d{3})*(?:,\d{1,2})?)").unwrap(), false),
        (Regex::new(r"(\d+(?:\.\d{3})*(?:,\d{2})?)\s*reais\b").unwrap(), false),
        (Regex::new(r"(\d+)\s*(?:mil|k)\b").unwrap(), true),
    ];
    static ref MONTH: Regex = Regex::new(
        r"\b(janeiro|fevereiro|março|abril|maio|junho|julho|agosto|setembro|outubro|novembro|dezembro)\b"
    ).unwrap();
    static ref YEAR: Regex = Regex::new(r"\b(20[2-3]\d)\b").unwrap();
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MentionContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_mentioned_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub last_mentioned_categories: Vec<String>,
    /// 1-based month number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_mentioned_month: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_mentioned_year: Option<i32>,
}

impl MentionContext {
    /// Collect the money value, categories, month and year mentioned in `text`.
    pub fn scan(text: &str) -> Self {
        let lower = text.to_lowercase();

        let last_mentioned_categories = KNOWN_CATEGORIES
            .iter()
            .filter(|category| lower.contains(**category))
            .map(|category| category.to_string())
            .collect();

        let last_mentioned_month = MONTH
            .captures(&lower)
            .and_then(|c| c.get(1))
            .and_then(|m| MONTHS.iter().position(|name| *name == m.as_str()))
            .map(|index| index as u32 + 1);

        let last_mentioned_year = YEAR
            .captures(&lower)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok());

        Self {
            last_mentioned_value: scan_value(&lower),
            last_mentioned_categories,
            last_mentioned_month,
            last_mentioned_year,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.last_mentioned_value.is_none()
            && self.last_mentioned_categories.is_empty()
            && self.last_mentioned_month.is_none()
            && self.last_mentioned_year.is_none()
    }
}

fn scan_value(lower: &str) -> Option<f64> {
    for (pattern, thousands) in VALUE_PATTERNS.iter() {
        let Some(last) = pattern.captures_iter(lower).last() else {
            continue;
        };
        let raw = last.get(1)?.as_str();

        let value = if *thousands {
            raw.parse::<f64>().ok().map(|v| v * 1000.0)
        } else {
            // 1.234,56 → 1234.56
            raw.replace('.', "").replace(',', ".").parse::<f64>().ok()
        };

        if value.is_some() {
            return value;
        }
    }
    None
}
