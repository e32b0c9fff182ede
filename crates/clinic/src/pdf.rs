//! Single-page PDF layout on top of `lopdf`.
//!
//! Text is set in the standard Helvetica face with `WinAnsiEncoding`, so
//! strings are written as Windows-1252 bytes. Characters that encoding cannot
//! represent render as `?`.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

const PAGE_WIDTH_PT: f32 = 595.28;
const PAGE_HEIGHT_PT: f32 = 841.89;
const PT_PER_MM: f32 = 72.0 / 25.4;
const FONT: &str = "F1";

#[derive(Debug, Clone)]
struct TextLine {
    x_mm: f32,
    y_mm: f32,
    size: f32,
    text: String,
}

/// Text positioned in millimetres from the top-left corner of an A4 page.
#[derive(Debug, Clone, Default)]
pub struct TextPage {
    lines: Vec<TextLine>,
}

impl TextPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&mut self, size: f32, x_mm: f32, y_mm: f32, text: impl Into<String>) -> &mut Self {
        self.lines.push(TextLine {
            x_mm,
            y_mm,
            size,
            text: text.into(),
        });
        self
    }

    pub fn render(&self) -> Result<Vec<u8>, lopdf::Error> {
        let mut doc = Document::with_version("1.4");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { FONT => font_id },
        });
        let content_id = doc.add_object(Stream::new(dictionary! {}, self.content().encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH_PT.into(), PAGE_HEIGHT_PT.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out)?;
        Ok(out)
    }

    fn content(&self) -> Content {
        let mut operations = Vec::with_capacity(self.lines.len() * 5);
        for line in &self.lines {
            let x = line.x_mm * PT_PER_MM;
            let y = PAGE_HEIGHT_PT - line.y_mm * PT_PER_MM;
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec![FONT.into(), line.size.into()]));
            operations.push(Operation::new("Td", vec![x.into(), y.into()]));
            operations.push(Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(&line.text), StringFormat::Literal)],
            ));
            operations.push(Operation::new("ET", vec![]));
        }
        Content { operations }
    }
}

/// Encode text as Windows-1252, the byte encoding behind `WinAnsiEncoding`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(|ch| win_ansi_byte(ch).unwrap_or(b'?')).collect()
}

fn win_ansi_byte(ch: char) -> Option<u8> {
    let byte = match ch {
        '\t' => b' ',
        ' '..='~' | '\u{a0}'..='\u{ff}' => ch as u32 as u8,
        '\u{20ac}' => 0x80,
        '\u{201a}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201e}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02c6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8a,
        '\u{2039}' => 0x8b,
        '\u{0152}' => 0x8c,
        '\u{017d}' => 0x8e,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201c}' => 0x93,
        '\u{201d}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02dc}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9a,
        '\u{203a}' => 0x9b,
        '\u{0153}' => 0x9c,
        '\u{017e}' => 0x9e,
        '\u{0178}' => 0x9f,
        _ => return None,
    };
    Some(byte)
}
