//! Plain text from DOCX and PPTX packages.

use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::Event;
use zip::ZipArchive;

use super::DocumentError;

fn open<'a>(
    bytes: &'a [u8],
    format: &'static str,
) -> Result<ZipArchive<Cursor<&'a [u8]>>, DocumentError> {
    ZipArchive::new(Cursor::new(bytes)).map_err(|e| DocumentError::parse(format, e))
}

fn read_entry(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
    format: &'static str,
) -> Result<String, DocumentError> {
    let mut entry = archive
        .by_name(name)
        .map_err(|e| DocumentError::parse(format, e))?;
    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    Ok(xml)
}

/// Body text of a Word document, one line per paragraph.
pub(crate) fn docx_text(bytes: &[u8]) -> Result<String, DocumentError> {
    const FORMAT: &str = "docx";
    let mut archive = open(bytes, FORMAT)?;
    let xml = read_entry(&mut archive, "word/document.xml", FORMAT)?;

    let mut reader = Reader::from_str(&xml);
    let mut out = String::new();
    let mut in_text = false;
    loop {
        match reader.read_event().map_err(|e| DocumentError::parse(FORMAT, e))? {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_text = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => out.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => out.push('\t'),
                b"w:br" | b"w:cr" => out.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => {
                out.push_str(&t.unescape().map_err(|e| DocumentError::parse(FORMAT, e))?);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}

fn slide_number(name: &str) -> Option<u32> {
    name.strip_prefix("ppt/slides/slide")?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

/// Text of every slide in order: runs end with a space, text frames with a newline.
pub(crate) fn pptx_text(bytes: &[u8]) -> Result<String, DocumentError> {
    const FORMAT: &str = "pptx";
    let mut archive = open(bytes, FORMAT)?;

    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| slide_number(name).map(|n| (n, name.to_owned())))
        .collect();
    slides.sort_unstable();

    let mut out = String::new();
    for (_, name) in slides {
        let xml = read_entry(&mut archive, &name, FORMAT)?;
        slide_text(&xml, &mut out).map_err(|e| DocumentError::parse(FORMAT, e))?;
    }
    Ok(out)
}

fn slide_text(xml: &str, out: &mut String) -> Result<(), quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut run = String::new();
    let mut in_run = false;
    let mut in_text = false;
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"a:r" => {
                    in_run = true;
                    run.clear();
                }
                b"a:t" if in_run => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"a:t" => in_text = false,
                b"a:r" => {
                    in_run = false;
                    out.push_str(&run);
                    out.push(' ');
                }
                b"p:txBody" => out.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => run.push_str(&t.unescape()?),
            Event::Eof => return Ok(()),
            _ => {}
        }
    }
}
