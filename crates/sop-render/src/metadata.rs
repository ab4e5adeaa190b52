//! Render metadata and localized labels.

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Language of the fixed labels (captions, front matter, footer).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ru,
}

/// Fixed strings written around the generated content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    pub default_title: &'static str,
    pub subtitle: &'static str,
    pub date: &'static str,
    pub approval_sheet: &'static str,
    pub role: &'static str,
    pub name: &'static str,
    pub signature_date: &'static str,
    pub prepared_by: &'static str,
    pub reviewed_by: &'static str,
    pub approved_by: &'static str,
    pub change_log: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub author: &'static str,
    pub initial_version: &'static str,
    pub default_author: &'static str,
    pub acknowledgement: &'static str,
    pub default_acknowledgement: &'static str,
    pub table: &'static str,
    pub figure: &'static str,
    pub page: &'static str,
    pub of: &'static str,
}

impl Labels {
    pub const EN: Labels = Labels {
        default_title: "Standard Operating Procedure",
        subtitle: "Standard Operating Procedure (SOP)",
        date: "Date",
        approval_sheet: "Approval Sheet",
        role: "Role",
        name: "Name",
        signature_date: "Signature/Date",
        prepared_by: "Prepared by",
        reviewed_by: "Reviewed by",
        approved_by: "Approved by",
        change_log: "Change Log",
        version: "Version",
        description: "Description",
        author: "Author",
        initial_version: "initial version",
        default_author: "Author",
        acknowledgement: "Acknowledgements",
        default_acknowledgement: "We thank all contributors for their input to this SOP.",
        table: "Table",
        figure: "Figure",
        page: "Page",
        of: "of",
    };

    pub const RU: Labels = Labels {
        default_title: "Стандартная операционная процедура",
        subtitle: "Стандартная операционная процедура (СОП)",
        date: "Дата",
        approval_sheet: "Лист согласования",
        role: "Роль",
        name: "ФИО",
        signature_date: "Подпись/Дата",
        prepared_by: "Разработал",
        reviewed_by: "Проверил",
        approved_by: "Утвердил",
        change_log: "Журнал изменений",
        version: "Версия",
        description: "Описание",
        author: "Автор",
        initial_version: "Первоначальная версия",
        default_author: "Автор",
        acknowledgement: "Благодарности",
        default_acknowledgement: "Мы благодарим всех участников за вклад в разработку данной СОП.",
        table: "Таблица",
        figure: "Рисунок",
        page: "Страница",
        of: "из",
    };

    #[must_use]
    pub fn for_language(language: Language) -> &'static Labels {
        match language {
            Language::En => &Self::EN,
            Language::Ru => &Self::RU,
        }
    }
}

/// One row of the change log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub version: String,
    pub date: String,
    pub description: String,
    pub author: String,
}

/// Document metadata for the front matter.
///
/// Every field is optional; blanks fall back to the label defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderMetadata {
    pub title: String,
    /// Date stamped on the title page and change log; today when `None`
    pub date: Option<NaiveDate>,
    pub prepared_by: String,
    pub reviewed_by: String,
    pub approved_by: String,
    pub version: Option<u32>,
    pub author: Option<String>,
    pub changes: Vec<ChangeEntry>,
    pub acknowledgement: Option<String>,
    pub language: Language,
    /// Base directory for relative image paths; the working directory when `None`
    pub asset_dir: Option<PathBuf>,
}

impl RenderMetadata {
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    #[must_use]
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    #[must_use]
    pub fn labels(&self) -> &'static Labels {
        Labels::for_language(self.language)
    }

    /// Configured date, or today's local date.
    #[must_use]
    pub fn resolved_date(&self) -> NaiveDate {
        self.date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// Title, or the label default when blank.
    #[must_use]
    pub fn display_title(&self) -> &str {
        match self.title.trim() {
            "" => self.labels().default_title,
            t => t,
        }
    }

    /// Change log rows; a single initial-version row when none are configured.
    #[must_use]
    pub fn change_rows(&self, date: NaiveDate) -> Vec<ChangeEntry> {
        if !self.changes.is_empty() {
            return self.changes.clone();
        }
        let labels = self.labels();
        vec![ChangeEntry {
            version: self.version.unwrap_or(1).to_string(),
            date: date.format("%Y-%m-%d").to_string(),
            description: labels.initial_version.to_string(),
            author: self
                .author
                .as_deref()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .unwrap_or(labels.default_author)
                .to_string(),
        }]
    }

    #[must_use]
    pub fn acknowledgement_text(&self) -> &str {
        self.acknowledgement
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(self.labels().default_acknowledgement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn test_synthesized_change_row() {
        let meta = RenderMetadata {
            author: Some("Writer Agent".into()),
            ..RenderMetadata::titled("SOP")
        };
        let rows = meta.change_rows(date());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].version, "1");
        assert_eq!(rows[0].date, "2024-03-01");
        assert_eq!(rows[0].description, "initial version");
        assert_eq!(rows[0].author, "Writer Agent");
    }

    #[test]
    fn test_explicit_changes_are_kept() {
        let entry = ChangeEntry {
            version: "3".into(),
            date: "2024-01-01".into(),
            description: "revised".into(),
            author: "QA".into(),
        };
        let meta = RenderMetadata {
            changes: vec![entry.clone()],
            ..Default::default()
        };
        assert_eq!(meta.change_rows(date()), vec![entry]);
    }

    #[test]
    fn test_defaults_follow_language() {
        let meta = RenderMetadata::default().with_language(Language::Ru);
        assert_eq!(meta.display_title(), "Стандартная операционная процедура");
        assert_eq!(meta.change_rows(date())[0].author, "Автор");
        assert!(meta.acknowledgement_text().starts_with("Мы благодарим"));
    }

    #[test]
    fn test_configured_date_wins() {
        let meta = RenderMetadata::default().with_date(date());
        assert_eq!(meta.resolved_date(), date());
    }

    #[test]
    fn test_metadata_json_uses_defaults() {
        let meta: RenderMetadata =
            serde_json::from_str(r#"{"title": "X", "date": "2024-03-01", "language": "ru"}"#).unwrap();
        assert_eq!(meta.title, "X");
        assert_eq!(meta.date, Some(date()));
        assert_eq!(meta.language, Language::Ru);
        assert!(meta.changes.is_empty());
    }
}
