//! Template fallback generator.
//!
//! Builds a minimally compliant SOP from the input fields alone. Used when
//! the remote service is unreachable, so it must be total: any input,
//! including an empty one, yields a complete document.

use crate::request::Fields;

/// Title used when the caller gave none.
pub const DEFAULT_TITLE: &str = "Стандартная операционная процедура";

/// Footnote appended to every template document.
pub const REVIEW_FOOTNOTE: &str =
    "[^1]: Данный документ сформирован автоматически и требует проверки ответственным лицом.";

/// One skeleton section: heading, source field keys in priority order, and
/// the sentence used when every key is blank.
struct Section {
    title: &'static str,
    keys: &'static [&'static str],
    default: &'static str,
}

const SECTIONS: &[Section] = &[
    Section {
        title: "Область применения",
        keys: &["scope", "sections"],
        default: "Описание области применения и ограничений.",
    },
    Section {
        title: "Ответственность",
        keys: &["responsibilities"],
        default: "Ответственные лица определяются руководителем подразделения.",
    },
    Section {
        title: "Определения",
        keys: &["definitions"],
        default: "Термины и определения приводятся при необходимости.",
    },
    Section {
        title: "Оборудование и материалы",
        keys: &["equipment", "equipment_type"],
        default: "См. перечень оборудования в приложении A.",
    },
    Section {
        title: "Порядок выполнения работ",
        keys: &["procedure"],
        default: "Пошаговое описание процедуры согласно внутренним регламентам.",
    },
    Section {
        title: "Периодичность",
        keys: &["periodicities"],
        default: "Периодичность выполняемых операций согласно графику.",
    },
    Section {
        title: "Калибровка и поверка",
        keys: &["calibration"],
        default: "Калибровка проводится согласно паспорту оборудования и внутренним инструкциям.",
    },
    Section {
        title: "Требования безопасности",
        keys: &["safety"],
        default: "Соблюдать технику безопасности и охрану труда.",
    },
    Section {
        title: "Ссылки",
        keys: &["references"],
        default: "Внутренние регламенты, стандарты, НПА.",
    },
    Section {
        title: "Приложения",
        keys: &[],
        default: "Приложение A — Формы записей и журналы.",
    },
];

const EQUIPMENT_SECTION: &str = "Оборудование и материалы";

/// Generate a template SOP from `fields`.
///
/// The title is a plain first line so that the renderer numbers the
/// sections 1 to 10 as written.
#[must_use]
pub fn generate(fields: &Fields) -> String {
    let title = match fields.get("title") {
        "" => DEFAULT_TITLE,
        t => t,
    };

    let mut lines: Vec<String> = vec![title.to_string(), String::new()];

    for (index, section) in SECTIONS.iter().enumerate() {
        lines.push(format!("# {}. {}", index + 1, section.title));

        let value = fields.first_of(section.keys);
        if section.title == EQUIPMENT_SECTION && !value.is_empty() {
            lines.push("| Наименование | Модель/Тип | Калибровка | Примечание |".to_string());
            lines.push("| --- | --- | --- | --- |".to_string());
            lines.push(format!("| {} | — | По графику | — |", value));
        } else if value.is_empty() {
            lines.push(section.default.to_string());
        } else {
            lines.push(value.to_string());
        }
        lines.push(String::new());
    }

    lines.push(REVIEW_FOOTNOTE.to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_produces_full_skeleton() {
        let text = generate(&Fields::new());
        assert!(text.starts_with(DEFAULT_TITLE));
        for (i, section) in SECTIONS.iter().enumerate() {
            assert!(text.contains(&format!("# {}. {}", i + 1, section.title)));
            assert!(text.contains(section.default));
        }
        assert!(text.ends_with(REVIEW_FOOTNOTE));
    }

    #[test]
    fn test_fields_populate_sections() {
        let fields: Fields = [
            ("title", "Calibration of Scale X"),
            ("procedure", "Step A; Step B"),
        ]
        .into_iter()
        .collect();
        let text = generate(&fields);

        assert!(text.starts_with("Calibration of Scale X\n"));
        assert!(text.contains("# 5. Порядок выполнения работ\nStep A; Step B\n"));
        assert!(!text.contains("Пошаговое описание процедуры"));
    }

    #[test]
    fn test_scope_falls_back_to_sections_field() {
        let fields: Fields = [("sections", "Weighing room only")].into_iter().collect();
        let text = generate(&fields);
        assert!(text.contains("# 1. Область применения\nWeighing room only"));
    }

    #[test]
    fn test_equipment_becomes_table() {
        let fields: Fields = [("equipment_type", "Balance")].into_iter().collect();
        let text = generate(&fields);
        assert!(text.contains("| Balance | — | По графику | — |"));
        assert!(!text.contains("приложении A."));
    }

    #[test]
    fn test_is_deterministic() {
        let fields: Fields = [("title", "T"), ("safety", "Gloves")].into_iter().collect();
        assert_eq!(generate(&fields), generate(&fields));
    }
}
