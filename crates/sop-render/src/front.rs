//! Front matter: title page, approval sheet, change log, acknowledgement.

use chrono::NaiveDate;

use crate::layout::Block;
use crate::metadata::RenderMetadata;

const SIGNATURE_SLOT: &str = "________________ / __________";

/// Front matter blocks, ending with the page break before main content.
pub fn front_matter(meta: &RenderMetadata, date: NaiveDate) -> Vec<Block> {
    let labels = meta.labels();
    let date_text = date.format("%Y-%m-%d").to_string();

    let mut blocks = vec![
        Block::Centered {
            text: meta.display_title().to_string(),
            size_pt: 20,
            bold: true,
        },
        Block::Paragraph(String::new()),
        Block::Centered {
            text: labels.subtitle.to_string(),
            size_pt: 14,
            bold: false,
        },
        Block::Paragraph(String::new()),
        Block::Centered {
            text: format!("{}: {}", labels.date, date_text),
            size_pt: 10,
            bold: false,
        },
        Block::PageBreak,
    ];

    blocks.push(Block::SectionTitle(labels.approval_sheet.to_string()));
    let signers = [
        (labels.prepared_by, &meta.prepared_by),
        (labels.reviewed_by, &meta.reviewed_by),
        (labels.approved_by, &meta.approved_by),
    ];
    let mut approval = vec![vec![
        labels.role.to_string(),
        labels.name.to_string(),
        labels.signature_date.to_string(),
    ]];
    approval.extend(signers.iter().map(|(role, name)| {
        vec![role.to_string(), name.trim().to_string(), SIGNATURE_SLOT.to_string()]
    }));
    blocks.push(Block::Table(approval));
    blocks.push(Block::Paragraph(String::new()));

    blocks.push(Block::SectionTitle(labels.change_log.to_string()));
    let mut changes = vec![vec![
        labels.version.to_string(),
        labels.date.to_string(),
        labels.description.to_string(),
        labels.author.to_string(),
    ]];
    changes.extend(
        meta.change_rows(date)
            .into_iter()
            .map(|c| vec![c.version, c.date, c.description, c.author]),
    );
    blocks.push(Block::Table(changes));
    blocks.push(Block::Paragraph(String::new()));

    blocks.push(Block::SectionTitle(labels.acknowledgement.to_string()));
    blocks.push(Block::Paragraph(meta.acknowledgement_text().to_string()));
    blocks.push(Block::PageBreak);

    blocks
}
