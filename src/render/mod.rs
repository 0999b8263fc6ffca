use std::{fs, path::Path};

use anyhow::{Context, Result};
use log::info;

use crate::accent::{Annotated, Glyph, AMBIGUOUS_MARKER};

/// Morae whose vowel devoices when followed by a character from the second
/// set, optionally across a geminate marker.
const FIRST_DEVOICED: [char; 10] = ['き', 'し', 'ち', 'ひ', 'ぴ', 'く', 'す', 'つ', 'ふ', 'ぷ'];

const SECOND_DEVOICED: [char; 25] = [
    'か', 'き', 'く', 'け', 'こ', 'さ', 'し', 'す', 'せ', 'そ', 'た', 'ち', 'つ', 'て', 'と',
    'は', 'ひ', 'ふ', 'へ', 'ほ', 'ぱ', 'ぴ', 'ぷ', 'ぺ', 'ぽ',
];

const GEMINATE: char = 'っ';

/// Single left-to-right pass flagging devoiced morae. A geminate window
/// (first, っ, second) flags the first character and consumes two positions;
/// a plain (first, second) pair flags the first and consumes one. Consumed
/// windows never overlap.
pub fn devoiced_positions(chars: &[char]) -> Vec<bool> {
    let mut flags = vec![false; chars.len()];
    let mut i = 0;
    while i + 1 < chars.len() {
        if chars[i + 1] == GEMINATE {
            if FIRST_DEVOICED.contains(&chars[i])
                && chars.get(i + 2).map_or(false, |c| SECOND_DEVOICED.contains(c))
            {
                flags[i] = true;
            }
            i += 2;
        } else if FIRST_DEVOICED.contains(&chars[i]) && SECOND_DEVOICED.contains(&chars[i + 1]) {
            flags[i] = true;
            i += 1;
        } else {
            i += 1;
        }
    }
    flags
}

/// Renders the annotated stream and note lists into a standalone HTML
/// document: heading, body paragraphs with superscript accent numbers and
/// highlighted devoiced morae, then the three note sections.
pub fn render(annotated: &Annotated, title: &str) -> String {
    // Devoicing is computed over the literal characters only; accent and
    // boundary glyphs do not take part in the scan windows.
    let literals: Vec<char> = annotated
        .glyphs
        .iter()
        .filter_map(|g| match g {
            Glyph::Literal(c) => Some(*c),
            _ => None,
        })
        .collect();
    let devoiced = devoiced_positions(&literals);

    let mut body = String::from("<p>");
    let mut literal_idx = 0;
    for glyph in &annotated.glyphs {
        match glyph {
            Glyph::Literal(c) => {
                if devoiced[literal_idx] {
                    body.push_str(&format!("<span class=\"devoiced\">{}</span>", escape(*c)));
                } else {
                    body.push_str(&escape(*c));
                }
                literal_idx += 1;
            }
            // Superscripts always carry the numeric class, in or out of the
            // symbol alphabet.
            Glyph::Accent(class) => body.push_str(&format!("<sup>{}</sup>", class)),
            Glyph::Boundary => body.push_str("</p>\n<p>"),
        }
    }
    body.push_str("</p>");

    let mut document = String::new();
    document.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    document.push_str(&format!("<title>{}</title>\n", escape_str(title)));
    document.push_str(
        "<style>\n\
         .devoiced { background: #d9d9d9; }\n\
         .ambiguous { font-weight: bold; }\n\
         section { page-break-before: always; }\n\
         </style>\n</head>\n<body>\n",
    );
    document.push_str(&format!("<h1>{}</h1>\n", escape_str(title)));
    document.push_str(&body);
    document.push('\n');

    push_note_section(&mut document, "Dictionary Note", &annotated.debug_notes, true);
    push_note_section(&mut document, "Accent Note", &annotated.derived_notes, false);
    push_note_section(&mut document, "No Result Note", &annotated.no_result_notes, false);

    document.push_str("</body>\n</html>\n");
    document
}

pub fn write_document(annotated: &Annotated, title: &str, path: &Path) -> Result<()> {
    let html = render(annotated, title);
    fs::write(path, html).with_context(|| format!("writing document to {:?}", path))?;
    info!("wrote annotated document to {:?}", path);
    Ok(())
}

fn push_note_section(document: &mut String, heading: &str, notes: &[String], flag_ambiguous: bool) {
    document.push_str(&format!("<section>\n<h1>{}</h1>\n", heading));
    for note in notes {
        if flag_ambiguous && note.contains(AMBIGUOUS_MARKER) {
            document.push_str(&format!("<p class=\"ambiguous\">{}</p>\n", escape_str(note)));
        } else {
            document.push_str(&format!("<p>{}</p>\n", escape_str(note)));
        }
    }
    document.push_str("</section>\n");
}

fn escape(c: char) -> String {
    match c {
        '&' => "&amp;".to_owned(),
        '<' => "&lt;".to_owned(),
        '>' => "&gt;".to_owned(),
        _ => c.to_string(),
    }
}

fn escape_str(s: &str) -> String {
    s.chars().map(escape).collect()
}
