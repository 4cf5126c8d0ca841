use crate::adapter::LanguageOption;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct LanguageRow {
    #[tabled(rename = "Language")]
    pub language: String,
    #[tabled(rename = "Parser")]
    pub parser: String,
    #[tabled(rename = "Label")]
    pub label: String,
    #[tabled(rename = "Extensions")]
    pub extensions: String,
}

impl LanguageRow {
    /// One row per parser; the language cell is only filled on its first row
    pub fn from_language(language: &LanguageOption) -> Vec<Self> {
        language
            .parsers
            .iter()
            .enumerate()
            .map(|(index, parser)| Self {
                language: if index == 0 { language.label.clone() } else { String::new() },
                parser: parser.id().to_string(),
                label: parser.label().to_string(),
                extensions: if index == 0 { language.extensions.join(", ") } else { String::new() },
            })
            .collect()
    }
}

pub fn languages_table(languages: &[LanguageOption]) -> String {
    let rows: Vec<LanguageRow> = languages.iter().flat_map(LanguageRow::from_language).collect();
    if rows.is_empty() {
        return String::new();
    }
    Table::new(&rows).with(Style::rounded()).to_string()
}
