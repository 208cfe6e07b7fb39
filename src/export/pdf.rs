//! US Letter PDF rendering with `lopdf`. The whole document is laid out and
//! serialized in memory; nothing is written to the response until it is done.

use chrono::{DateTime, Utc};
use lopdf::{
    Document, Object, ObjectId, Stream,
    content::{Content, Operation},
    dictionary,
};

use super::generator::{EXPORT_TITLE, NOTHING_TO_EXPORT, display_description, locale_date, locale_date_time};
use crate::error::ExportError;
use crate::model::Bookmark;

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 50.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const LINE_SPACING: f32 = 1.4;

type Rgb = (f32, f32, f32);

const BLACK: Rgb = (0.0, 0.0, 0.0);
const GRAY: Rgb = (0.4, 0.4, 0.4);
const BLUE: Rgb = (0.0, 0.0, 0.8);

#[derive(Debug, Clone, Copy)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(&self) -> &'static [u8] {
        match self {
            Font::Regular => b"F1",
            Font::Bold => b"F2",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Style {
    font: Font,
    size: f32,
    color: Rgb,
}

impl Style {
    fn line_height(&self) -> f32 {
        self.size * LINE_SPACING
    }
}

const TITLE: Style = Style { font: Font::Bold, size: 20.0, color: BLACK };
const SUBTITLE: Style = Style { font: Font::Regular, size: 12.0, color: GRAY };
const HEADING: Style = Style { font: Font::Bold, size: 14.0, color: BLACK };
const LINK: Style = Style { font: Font::Regular, size: 10.0, color: BLUE };
const DETAIL: Style = Style { font: Font::Regular, size: 9.0, color: GRAY };
const MARKER: Style = Style { font: Font::Regular, size: 9.0, color: BLUE };
const FOOTNOTE: Style = Style { font: Font::Regular, size: 8.0, color: GRAY };
const NOTICE: Style = Style { font: Font::Regular, size: 12.0, color: BLACK };

#[derive(Debug, Clone, Copy, PartialEq)]
enum Align {
    Left,
    Center,
}

struct Link {
    rect: [f32; 4],
    uri: String,
}

#[derive(Default)]
struct Page {
    operations: Vec<Operation>,
    links: Vec<Link>,
}

/// Top-down cursor over a sequence of pages.
struct Layout {
    finished: Vec<Page>,
    current: Page,
    cursor: f32,
}

impl Layout {
    fn new() -> Self {
        Layout {
            finished: Vec::new(),
            current: Page::default(),
            cursor: PAGE_HEIGHT - MARGIN,
        }
    }

    /// Starts a new page unless `height` still fits above the bottom margin.
    fn reserve(&mut self, height: f32) {
        if self.cursor - height < MARGIN {
            let full = std::mem::take(&mut self.current);
            self.finished.push(full);
            self.cursor = PAGE_HEIGHT - MARGIN;
        }
    }

    fn gap(&mut self, height: f32) {
        self.cursor -= height;
    }

    fn paragraph(&mut self, text: &str, style: Style, align: Align, link: Option<&str>) {
        for line in wrap(text, style, CONTENT_WIDTH) {
            self.reserve(style.line_height());

            let width = text_width(&line, style);
            let x = match align {
                Align::Left => MARGIN,
                Align::Center => (PAGE_WIDTH - width) / 2.0,
            };
            let baseline = self.cursor - style.size;

            self.current.operations.extend(text_operations(&line, style, x, baseline));

            if let Some(uri) = link {
                self.current.operations.extend(underline(style, x, baseline, width));
                self.current.links.push(Link {
                    rect: [x, baseline - 2.0, x + width, baseline + style.size],
                    uri: uri.to_string(),
                });
            }

            self.cursor -= style.line_height();
        }
    }

    fn finish(mut self) -> Vec<Page> {
        self.finished.push(self.current);
        self.finished
    }
}

pub fn render(bookmarks: &[Bookmark], now: DateTime<Utc>) -> Result<Vec<u8>, ExportError> {
    let mut layout = Layout::new();

    layout.paragraph(EXPORT_TITLE, TITLE, Align::Center, None);
    layout.gap(4.0);
    layout.paragraph(
        &format!("Exported: {}", locale_date_time(now)),
        SUBTITLE,
        Align::Center,
        None,
    );
    layout.gap(20.0);

    if bookmarks.is_empty() {
        layout.paragraph(NOTHING_TO_EXPORT, NOTICE, Align::Center, None);
    }

    for bookmark in bookmarks {
        // keep the heading together with its URL line
        layout.reserve(HEADING.line_height() + LINK.line_height());

        layout.paragraph(display_description(bookmark), HEADING, Align::Left, None);
        layout.paragraph(&bookmark.url, LINK, Align::Left, Some(&bookmark.url));

        if !bookmark.categories.is_empty() {
            layout.paragraph(
                &format!("Categories: {}", bookmark.category_names().join(", ")),
                DETAIL,
                Align::Left,
                None,
            );
        }
        if bookmark.pinned {
            layout.paragraph("Pinned", MARKER, Align::Left, None);
        }
        layout.paragraph(
            &format!("Created: {}", locale_date(&bookmark.created_at)),
            FOOTNOTE,
            Align::Left,
            None,
        );
        layout.gap(14.0);
    }

    assemble(layout.finish())
}

fn assemble(pages: Vec<Page>) -> Result<Vec<u8>, ExportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = doc.add_object(font("Helvetica"));
    let bold = doc.add_object(font("Helvetica-Bold"));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in pages {
        let content = Content {
            operations: page.operations,
        };
        let encoded = content.encode().map_err(render_error)?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

        let mut annotations: Vec<Object> = Vec::with_capacity(page.links.len());
        for link in page.links {
            annotations.push(add_link(&mut doc, link).into());
        }

        let mut page_dict = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        };
        if !annotations.is_empty() {
            page_dict.set("Annots", annotations);
        }
        kids.push(doc.add_object(page_dict).into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), Object::Real(PAGE_WIDTH), Object::Real(PAGE_HEIGHT)],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(EXPORT_TITLE),
        "Producer" => Object::string_literal("weblauncher"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).map_err(render_error)?;
    Ok(buffer)
}

fn font(base: &str) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    }
}

fn add_link(doc: &mut Document, link: Link) -> ObjectId {
    let [x1, y1, x2, y2] = link.rect;
    doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Link",
        "Rect" => vec![Object::Real(x1), Object::Real(y1), Object::Real(x2), Object::Real(y2)],
        "Border" => vec![0.into(), 0.into(), 0.into()],
        "A" => dictionary! {
            "S" => "URI",
            "URI" => Object::string_literal(link.uri),
        },
    })
}

// `save_to` fails with io errors, content encoding with lopdf errors.
fn render_error(err: impl std::fmt::Display) -> ExportError {
    ExportError::Render {
        format: "pdf",
        message: err.to_string(),
    }
}

fn text_operations(line: &str, style: Style, x: f32, baseline: f32) -> Vec<Operation> {
    let (r, g, b) = style.color;
    vec![
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![Object::Name(style.font.resource().to_vec()), Object::Real(style.size)],
        ),
        Operation::new("rg", vec![Object::Real(r), Object::Real(g), Object::Real(b)]),
        Operation::new("Td", vec![Object::Real(x), Object::Real(baseline)]),
        Operation::new("Tj", vec![Object::string_literal(win_ansi(line))]),
        Operation::new("ET", vec![]),
    ]
}

fn underline(style: Style, x: f32, baseline: f32, width: f32) -> Vec<Operation> {
    let (r, g, b) = style.color;
    let y = baseline - 1.5;
    vec![
        Operation::new("RG", vec![Object::Real(r), Object::Real(g), Object::Real(b)]),
        Operation::new("w", vec![Object::Real(0.5)]),
        Operation::new("m", vec![Object::Real(x), Object::Real(y)]),
        Operation::new("l", vec![Object::Real(x + width), Object::Real(y)]),
        Operation::new("S", vec![]),
    ]
}

/// Maps text onto the single-byte font encoding; anything outside Latin-1
/// becomes `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match u32::from(c) {
            0x20..=0x7e | 0xa0..=0xff => u32::from(c) as u8,
            0x09 | 0x0a | 0x0d => b' ',
            _ => b'?',
        })
        .collect()
}

/// Greedy word wrap. Words wider than a full line (long URLs) are broken
/// between characters.
fn wrap(text: &str, style: Style, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        let candidate = if line.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", line, word)
        };
        if text_width(&candidate, style) <= max_width {
            line = candidate;
            continue;
        }

        if !line.is_empty() {
            lines.push(std::mem::take(&mut line));
        }
        for c in word.chars() {
            line.push(c);
            if text_width(&line, style) > max_width && line.chars().count() > 1 {
                line.pop();
                lines.push(std::mem::take(&mut line));
                line.push(c);
            }
        }
    }

    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}

fn text_width(text: &str, style: Style) -> f32 {
    let units: u32 = text.chars().map(glyph_width).sum();
    let scale = match style.font {
        Font::Regular => 1.0,
        Font::Bold => 1.1,
    };
    units as f32 * style.size * scale / 1000.0
}

/// Helvetica advance widths in 1/1000 em for printable ASCII.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' ' to '/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // digits
    278, 278, 584, 584, 584, 556, 1015, // ':' to '@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778, 722, 667, 611, 722,
    667, 944, 667, 667, 611, // 'A' to 'Z'
    278, 278, 278, 469, 556, 333, // '[' to '`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333, 500, 278, 556,
    500, 722, 500, 500, 500, // 'a' to 'z'
    334, 260, 334, 584, // '{' to '~'
];

fn glyph_width(c: char) -> u32 {
    match u32::from(c) {
        code @ 0x20..=0x7e => u32::from(HELVETICA_WIDTHS[(code - 0x20) as usize]),
        _ => 556,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::fixtures::{bookmark, now};

    fn raw(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }

    #[test]
    fn renders_a_loadable_document_with_links() {
        let bytes = render(
            &[
                bookmark("GitHub", "https://github.com", &[], true),
                bookmark("Docs", "https://go.dev", &["Dev", "Go"], false),
            ],
            now(),
        )
        .unwrap();

        assert!(bytes.starts_with(b"%PDF-1.5"));
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);

        let text = raw(&bytes);
        assert!(text.contains("(WebLauncher Export) Tj"));
        assert!(text.contains("(Exported: 5/1/2024, 9:30:15 AM) Tj"));
        assert!(text.contains("(GitHub) Tj"));
        assert!(text.contains("(Categories: Dev, Go) Tj"));
        assert!(text.contains("(Pinned) Tj"));
        assert!(text.contains("(Created: 3/4/2024) Tj"));
        assert_eq!(text.matches("/Link").count(), 2);
        assert!(text.contains("(https://go.dev)"));
    }

    #[test]
    fn delimiters_in_text_and_links_survive() {
        let bytes = render(&[bookmark("a (b) \\ c)", "https://x.io/(y)", &[], false)], now()).unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        let text = doc.extract_text(&[1]).unwrap();
        assert!(text.contains("a (b) \\ c)"), "{text}");
        assert!(text.contains("https://x.io/(y)"), "{text}");

        let uris: Vec<Vec<u8>> = doc
            .objects
            .values()
            .filter_map(|object| object.as_dict().ok())
            .filter_map(|dict| dict.get(b"A").ok())
            .filter_map(|action| action.as_dict().ok())
            .filter_map(|action| action.get(b"URI").ok())
            .filter_map(|uri| uri.as_str().ok().map(|s| s.to_vec()))
            .collect();
        assert_eq!(uris, vec![b"https://x.io/(y)".to_vec()]);
    }

    #[test]
    fn io_failures_become_render_errors() {
        let err = render_error(std::io::Error::other("disk full"));
        assert!(matches!(
            err,
            ExportError::Render { format: "pdf", ref message } if message == "disk full"
        ));
    }

    #[test]
    fn empty_export_has_a_notice() {
        let bytes = render(&[], now()).unwrap();
        assert!(raw(&bytes).contains("(No URLs to export.) Tj"));
        assert_eq!(Document::load_mem(&bytes).unwrap().get_pages().len(), 1);
    }

    #[test]
    fn long_exports_paginate() {
        let bookmarks: Vec<Bookmark> = (0..60)
            .map(|i| bookmark(&format!("Site {}", i), &format!("https://site{}.io", i), &["Misc"], false))
            .collect();
        let bytes = render(&bookmarks, now()).unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        assert!(doc.get_pages().len() > 1);
        assert!(raw(&bytes).contains("(Site 59) Tj"));
    }

    #[test]
    fn non_latin_text_is_replaced() {
        assert_eq!(win_ansi("café ✓"), b"caf\xe9 ?".to_vec());
    }

    #[test]
    fn wrap_breaks_words_and_long_tokens() {
        let long_url = format!("https://example.com/{}", "a".repeat(200));
        let lines = wrap(&long_url, LINK, CONTENT_WIDTH);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), long_url);
        assert!(lines.iter().all(|l| text_width(l, LINK) <= CONTENT_WIDTH));

        assert_eq!(wrap("", HEADING, CONTENT_WIDTH), vec![String::new()]);
        assert_eq!(wrap("two words", HEADING, CONTENT_WIDTH), vec!["two words".to_string()]);
    }
}
