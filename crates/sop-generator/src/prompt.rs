//! Prompt construction for the writer and critic roles.
//!
//! Every prompt is a pure function of its inputs, so a run's conversation
//! can be reproduced from the request alone.

use sop_core::{ContentMode, GenerationRequest, SENTINEL};

/// Source previews are cut to this many characters in the prompt.
pub const PREVIEW_PROMPT_MAX: usize = 2000;
/// Extracted structure text is cut to this many characters in the prompt.
pub const STRUCTURE_PROMPT_MAX: usize = 4000;

/// Optional fields appended to the prompt when present, in this order.
const DETAIL_FIELDS: [&str; 10] = [
    "scope",
    "responsibilities",
    "definitions",
    "equipment",
    "procedure",
    "periodicities",
    "calibration",
    "safety",
    "references",
    "notes",
];

const WRITER_SYSTEM: &str = "\
You are the Writer for SOP generation. Produce a rigorous, fully formatted SOP draft in Markdown.
CRITICAL: write in Russian (русский язык) unless the user explicitly asks for another language.
Formatting rules (follow strictly):
- Page: A4; margins: 1 inch (25.4 mm).
- Font: Times New Roman or Arial, 11-14 pt, single line spacing.
- Structure: numbered sections and subsections (1, 1.1, 1.1.1).
- Include: title page, approval sheet, change log, acknowledgement sheet.
- Include: Scope, Responsibilities, Definitions, Procedure/Steps, Equipment/Materials, Periodicities, Calibration, Safety, References.
- Tables and figures carry captions (Table X: Title, Figure X: Title).
- Appendices are lettered (Appendix A, B, ...).
- Footnotes use the form [^n]: text.
Output only the SOP draft in Markdown, with no commentary.
";

const CRITIC_SYSTEM: &str = "\
You are the Critic for SOP quality assurance. Review the SOP and report every issue strictly as:
ISSUE: <short title>
WHY: <why this breaks the rules>
FIX: <clear actionable fix>
BLOCKER: <yes|no>

- If no blockers remain, return exactly `STATUS: OK` and nothing else.
- Be precise: point at missing structure, numbering, captions, formatting or non-compliant text.
";

/// Builds every prompt the orchestrator sends.
pub struct PromptBuilder;

impl PromptBuilder {
    /// System prompt for drafting and revision calls.
    pub fn writer_system() -> &'static str {
        WRITER_SYSTEM
    }

    /// System prompt for critique calls.
    pub fn critic_system() -> &'static str {
        CRITIC_SYSTEM
    }

    /// Render the request into the single generation prompt.
    pub fn generation_prompt(request: &GenerationRequest) -> String {
        let content_type = request.field("content_type");
        let mode = ContentMode::parse(content_type);
        let mut prompt = String::from(
            "Сгенерируй полный проект стандартной операционной процедуры (SOP) на русском языке, \
             строго соблюдая правила форматирования.\n",
        );

        prompt.push_str("[МЕТАДАННЫЕ]\n");
        prompt.push_str(&format!("Название: {}\n", request.field("title")));
        prompt.push_str(&format!("Номер: {}\n", request.field("sop_number")));
        prompt.push_str(&format!("Тип оборудования: {}\n", request.field("equipment_type")));
        prompt.push_str(&format!(
            "Тип содержимого: {}\n",
            mode.map_or(content_type.trim(), |m| m.label())
        ));
        prompt.push_str("[/МЕТАДАННЫЕ]\n\n");

        prompt.push_str("[ТЕКСТ ВВОДА]\n");
        prompt.push_str(&format!("Разделы/описание: {}\n", request.field("sections")));
        prompt.push_str(&format!(
            "Описание структуры: {}\n",
            request.field("structure_description")
        ));
        prompt.push_str("[/ТЕКСТ ВВОДА]\n\n");

        if !request.sources().is_empty() {
            prompt.push_str("[ИСТОЧНИКИ]\n");
            let lines: Vec<String> = request
                .sources()
                .iter()
                .enumerate()
                .map(|(i, source)| {
                    let name = match source.name.trim() {
                        "" => format!("Источник {}", i + 1),
                        name => name.to_string(),
                    };
                    format!("- {}: {}", name, truncate(source.preview.trim(), PREVIEW_PROMPT_MAX))
                })
                .collect();
            prompt.push_str(&lines.join("\n"));
            prompt.push_str("\n[/ИСТОЧНИКИ]\n\n");
        }

        let structure = request.field("structure_text");
        if !structure.is_empty() {
            prompt.push_str("[ИЗВЛЕЧЕННАЯ СТРУКТУРА ДОКУМЕНТА]\n");
            prompt.push_str(truncate(structure, STRUCTURE_PROMPT_MAX));
            prompt.push_str("\n[/ИЗВЛЕЧЕННАЯ СТРУКТУРА ДОКУМЕНТА]\n\n");
        }

        for key in DETAIL_FIELDS {
            let value = request.field(key);
            if !value.is_empty() {
                prompt.push_str(&format!("{}: {}\n", capitalize(key), value));
            }
        }

        prompt.push_str(
            "Требования к оформлению: формат страницы A4; поля 1 дюйм; шрифт Times New Roman или Arial 11–14; \
             одинарный интервал; нумерация разделов и подразделов (1, 1.1, 1.1.1); подписи к таблицам и рисункам; \
             нумерация приложений; при необходимости сноски формата [^n]: текст.\n",
        );

        // Guidance only for a mode the user actually chose.
        match mode {
            Some(ContentMode::SourcesOnly) => prompt.push_str(
                "Используй исключительно информацию из блока [ИСТОЧНИКИ], без выдумывания фактов.\n",
            ),
            Some(ContentMode::AiWithSources) => prompt.push_str(
                "Опирайся на [ИСТОЧНИКИ], дополняя нейросетевыми формулировками, но не противоречь источнику.\n",
            ),
            Some(ContentMode::AiOnly) | None => {}
        }

        prompt
    }

    /// Ask for numbered headings only.
    pub fn outline_prompt(generation_prompt: &str) -> String {
        format!(
            "{generation_prompt}\n\nСформируй только оглавление SOP \
             (только нумерованные заголовки 1-го и 2-го уровня). Без текста разделов."
        )
    }

    /// Ask for one section in isolation.
    pub fn section_prompt(heading: &str) -> String {
        format!(
            "Сгенерируй только раздел '{heading}' в формате Markdown, строго соблюдая правила \
             (A4, шрифты, нумерация). Не повторяй другие разделы."
        )
    }

    /// Review instruction followed by the draft under review.
    pub fn critique_prompt(draft: &str) -> String {
        format!(
            "Проверь соответствие SOP правилам (структура, нумерация, обязательные разделы, \
             подписи к таблицам/рисункам, приложения). Верни список замечаний в формате: \
             ISSUE/WHY/FIX/BLOCKER. Если блокирующих нет, верни ровно '{SENTINEL}'.\n\n{draft}"
        )
    }

    /// Restate the generation prompt with the critique verbatim.
    pub fn revision_prompt(generation_prompt: &str, critique: &str) -> String {
        format!(
            "{generation_prompt}\n\nУчитывая следующие замечания Критика, сгенерируй ПОЛНУЮ \
             обновлённую версию SOP в Markdown: \n\n{critique}"
        )
    }

    /// Short second review of the revision.
    pub fn final_critique_prompt(revision: &str) -> String {
        format!("Проверь итоговую версию. Если нет блокеров, верни '{SENTINEL}'.\n\n{revision}")
    }
}

/// First `max` characters of `text`.
fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

fn capitalize(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
