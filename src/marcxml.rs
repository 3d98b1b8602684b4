//! MARCXML record source.
//!
//! [`MarcxmlSource`] streams `<record>` elements out of a MARCXML document
//! (a single record or a `<collection>`), one record at a time, from any
//! buffered reader. Both default-namespace (`<record xmlns="...">`) and
//! prefix-namespace (`<marc:record xmlns:marc="...">`) documents are
//! accepted.
//!
//! Each record element is captured with the streaming reader, then
//! deserialized through serde. The record identifier is taken from control
//! field `001`; blank indicators become [`UNSET_INDICATOR`](crate::record::UNSET_INDICATOR).
//!
//! # Examples
//!
//! ```
//! use marcmap::marcxml::MarcxmlSource;
//! use marcmap::source::RecordSource;
//!
//! let xml = r#"<collection xmlns="http://www.loc.gov/MARC21/slim">
//!   <record>
//!     <leader>00000nam a2200000 a 4500</leader>
//!     <controlfield tag="001">rec-1</controlfield>
//!     <datafield tag="245" ind1="1" ind2=" ">
//!       <subfield code="a">Title</subfield>
//!     </datafield>
//!   </record>
//! </collection>"#;
//!
//! let mut source = MarcxmlSource::new(xml.as_bytes());
//! let record = source.next_record()?.unwrap();
//! assert_eq!(record.id, "rec-1");
//! assert_eq!(record.data_fields[0].indicator2, '*');
//! assert!(source.next_record()?.is_none());
//! # Ok::<(), marcmap::MarcmapError>(())
//! ```

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use lazy_static::lazy_static;
use quick_xml::de::from_str as xml_from_str;
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use regex::{Captures, Regex};
use serde::Deserialize;

use crate::error::{MarcmapError, Result};
use crate::record::{normalize_indicator, Controlfield, Datafield, RawRecord};
use crate::source::RecordSource;

/// Control field holding the record identifier.
pub const ID_TAG: &str = "001";

const RECORD_ELEMENT: &[u8] = b"record";

lazy_static! {
    static ref MARKUP: Regex =
        Regex::new(r#"<(?:[^>"']|"[^"]*"|'[^']*')*>"#).expect("markup pattern");
    static ref XMLNS_DECLARATION: Regex =
        Regex::new(r#"\s+xmlns(?::\w+)?="[^"]*""#).expect("namespace declaration pattern");
    static ref ELEMENT_PREFIX: Regex = Regex::new(r"<(/?)(\w+):").expect("element prefix pattern");
}

#[derive(Debug, Deserialize)]
struct MarcxmlRecord {
    #[serde(default)]
    leader: String,
    #[serde(default)]
    controlfield: Vec<MarcxmlControlField>,
    #[serde(default)]
    datafield: Vec<MarcxmlDataField>,
}

#[derive(Debug, Deserialize)]
struct MarcxmlControlField {
    #[serde(rename = "@tag")]
    tag: String,
    #[serde(rename = "$value", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct MarcxmlDataField {
    #[serde(rename = "@tag")]
    tag: String,
    #[serde(rename = "@ind1", default)]
    ind1: String,
    #[serde(rename = "@ind2", default)]
    ind2: String,
    #[serde(default)]
    subfield: Vec<MarcxmlSubfield>,
}

#[derive(Debug, Deserialize)]
struct MarcxmlSubfield {
    #[serde(rename = "@code")]
    code: String,
    #[serde(rename = "$value", default)]
    value: String,
}

/// Strip namespace declarations and element prefixes, so `marc:record` and
/// `record` deserialize alike. Only markup is rewritten; character data is
/// left untouched.
fn strip_marcxml_ns(xml: &str) -> String {
    MARKUP
        .replace_all(xml, |caps: &Captures<'_>| {
            let stripped = XMLNS_DECLARATION.replace_all(&caps[0], "");
            ELEMENT_PREFIX.replace_all(&stripped, "<$1").into_owned()
        })
        .into_owned()
}

/// Parse a single `<record>` element.
///
/// # Errors
///
/// Returns [`MarcmapError::ParseError`] for malformed XML and
/// [`MarcmapError::InvalidRecord`] for a subfield without a code.
pub fn parse_record(xml: &str) -> Result<RawRecord> {
    let cleaned = strip_marcxml_ns(xml);
    let xml_record: MarcxmlRecord = xml_from_str(&cleaned)
        .map_err(|e| MarcmapError::ParseError(format!("Failed to parse MARCXML record: {e}")))?;
    convert(xml_record)
}

/// Parse every record of a MARCXML document held in memory.
///
/// # Errors
///
/// Returns the first parse error.
pub fn parse_collection(xml: &str) -> Result<Vec<RawRecord>> {
    MarcxmlSource::new(xml.as_bytes()).read_all()
}

fn convert(xml_record: MarcxmlRecord) -> Result<RawRecord> {
    let id = xml_record
        .controlfield
        .iter()
        .find(|cf| cf.tag == ID_TAG)
        .map(|cf| cf.value.trim().to_string())
        .unwrap_or_default();
    if id.is_empty() {
        log::warn!("MARCXML record without {ID_TAG} control field");
    }

    let mut record = RawRecord::new(id);
    record.leader = xml_record.leader;
    record.control_fields = xml_record
        .controlfield
        .into_iter()
        .map(|cf| Controlfield::new(cf.tag, cf.value))
        .collect();

    for df in xml_record.datafield {
        let mut field = Datafield::new(
            df.tag,
            normalize_indicator(df.ind1.chars().next()),
            normalize_indicator(df.ind2.chars().next()),
        );
        for sf in df.subfield {
            let code = sf.code.chars().next().ok_or_else(|| {
                MarcmapError::InvalidRecord(format!(
                    "Missing subfield code in field {} of record '{}'",
                    field.tag, record.id
                ))
            })?;
            field.add_subfield(code, sf.value);
        }
        record.data_fields.push(field);
    }

    Ok(record)
}

/// Streaming MARCXML reader.
pub struct MarcxmlSource<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    records_read: usize,
}

impl<R: BufRead> fmt::Debug for MarcxmlSource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarcxmlSource")
            .field("position", &self.reader.buffer_position())
            .field("records_read", &self.records_read)
            .finish_non_exhaustive()
    }
}

impl MarcxmlSource<BufReader<File>> {
    /// Open a MARCXML file.
    ///
    /// # Errors
    ///
    /// Returns [`MarcmapError::IoError`] if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

enum Next {
    Record(BytesStart<'static>),
    EmptyRecord,
    Eof,
}

impl<R: BufRead> MarcxmlSource<R> {
    /// Create a source reading from `reader`
    pub fn new(reader: R) -> Self {
        MarcxmlSource {
            reader: Reader::from_reader(reader),
            buf: Vec::new(),
            records_read: 0,
        }
    }

    fn parse_error(&self, message: impl fmt::Display) -> MarcmapError {
        MarcmapError::ParseError(format!(
            "MARCXML error at byte {}: {message}",
            self.reader.buffer_position()
        ))
    }

    fn next_record_start(&mut self) -> Result<Next> {
        loop {
            self.buf.clear();
            let next = match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(e)) if e.local_name().as_ref() == RECORD_ELEMENT => {
                    Next::Record(e.into_owned())
                },
                Ok(Event::Empty(e)) if e.local_name().as_ref() == RECORD_ELEMENT => {
                    Next::EmptyRecord
                },
                Ok(Event::Eof) => Next::Eof,
                Ok(_) => continue,
                Err(e) => return Err(self.parse_error(e)),
            };
            return Ok(next);
        }
    }

    /// Re-serialize the events of one record element into a string.
    fn capture_record(&mut self, start: BytesStart<'static>) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        writer
            .write_event(Event::Start(start))
            .map_err(|e| self.parse_error(e))?;

        let mut depth = 1usize;
        let mut buf = Vec::new();
        while depth > 0 {
            buf.clear();
            let event = match self.reader.read_event_into(&mut buf) {
                Ok(Event::Eof) => return Err(self.parse_error("unexpected end of input in <record>")),
                Ok(event) => event,
                Err(e) => return Err(self.parse_error(e)),
            };
            match &event {
                Event::Start(_) => depth += 1,
                Event::End(_) => depth -= 1,
                _ => {},
            }
            writer.write_event(event).map_err(|e| self.parse_error(e))?;
        }

        String::from_utf8(writer.into_inner())
            .map_err(|e| MarcmapError::ParseError(format!("MARCXML record is not UTF-8: {e}")))
    }
}

impl<R: BufRead> RecordSource for MarcxmlSource<R> {
    fn next_record(&mut self) -> Result<Option<RawRecord>> {
        let record = match self.next_record_start()? {
            Next::Record(start) => {
                let xml = self.capture_record(start)?;
                parse_record(&xml)?
            },
            Next::EmptyRecord => {
                log::warn!("empty MARCXML <record/> element");
                RawRecord::new("")
            },
            Next::Eof => return Ok(None),
        };
        self.records_read += 1;
        Ok(Some(record))
    }

    fn records_read(&self) -> Option<usize> {
        Some(self.records_read)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_standard_marcxml_no_namespace() {
        let xml = r#"<record>
            <leader>01234nam a2200289 a 4500</leader>
            <controlfield tag="001">12345</controlfield>
            <datafield tag="245" ind1="1" ind2="0">
                <subfield code="a">Test title</subfield>
            </datafield>
        </record>"#;

        let record = parse_record(xml).unwrap();
        assert_eq!(record.id, "12345");
        assert_eq!(record.leader, "01234nam a2200289 a 4500");
        assert_eq!(record.data_fields[0].first_content('a'), Some("Test title"));
    }

    #[test]
    fn test_namespace_text_in_subfields_is_kept() {
        let xml = r#"<marc:record xmlns:marc="http://www.loc.gov/MARC21/slim">
            <marc:controlfield tag="001">ns-1</marc:controlfield>
            <marc:datafield tag="500" ind1=" " ind2=" ">
                <marc:subfield code="a">Declared as xmlns="urn:x" in marc:record</marc:subfield>
            </marc:datafield>
        </marc:record>"#;

        let record = parse_record(xml).unwrap();
        assert_eq!(
            record.data_fields[0].first_content('a'),
            Some(r#"Declared as xmlns="urn:x" in marc:record"#)
        );

        let mut source = MarcxmlSource::new(xml.as_bytes());
        let streamed = source.next_record().unwrap().unwrap();
        assert_eq!(streamed, record);
        assert!(format!("{source:?}").contains("records_read: 1"));
    }

    #[test]
    fn test_parse_marcxml_with_prefix_namespace() {
        let xml = r#"<marc:collection xmlns:marc="http://www.loc.gov/MARC21/slim">
          <marc:record>
            <marc:controlfield tag="001">88888</marc:controlfield>
            <marc:datafield tag="650" ind1=" " ind2="0">
                <marc:subfield code="a">Cats</marc:subfield>
                <marc:subfield code="x">Behavior</marc:subfield>
            </marc:datafield>
          </marc:record>
        </marc:collection>"#;

        let records = parse_collection(xml).unwrap();
        assert_eq!(records.len(), 1);
        let field = &records[0].data_fields[0];
        assert_eq!(field.indicator1, '*');
        assert_eq!(field.indicator2, '0');
        assert_eq!(field.subfields.len(), 2);
    }

    #[test]
    fn test_source_streams_records_in_order() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <collection xmlns="http://www.loc.gov/MARC21/slim">
          <record><controlfield tag="001">a</controlfield></record>
          <record>
            <controlfield tag="001">b</controlfield>
            <datafield tag="100" ind1="1" ind2=" ">
              <subfield code="a">Smith &amp; Jones</subfield>
              <subfield code="d"></subfield>
            </datafield>
          </record>
        </collection>"#;

        let mut source = MarcxmlSource::new(xml.as_bytes());
        assert_eq!(source.next_record().unwrap().unwrap().id, "a");
        let second = source.next_record().unwrap().unwrap();
        assert_eq!(second.id, "b");
        assert_eq!(second.data_fields[0].first_content('a'), Some("Smith & Jones"));
        assert_eq!(second.data_fields[0].first_content('d'), Some(""));
        assert!(source.next_record().unwrap().is_none());
        assert_eq!(source.records_read(), Some(2));
    }

    #[test]
    fn test_truncated_input_is_an_error() {
        let xml = r#"<collection><record><controlfield tag="001">a</controlfield>"#;
        let mut source = MarcxmlSource::new(xml.as_bytes());
        assert!(matches!(
            source.next_record(),
            Err(MarcmapError::ParseError(_))
        ));
    }

    #[test]
    fn test_missing_subfield_code() {
        let xml = r#"<record><datafield tag="245" ind1="1" ind2="0"><subfield code="">x</subfield></datafield></record>"#;
        assert!(matches!(parse_record(xml), Err(MarcmapError::InvalidRecord(_))));
    }

    #[test]
    fn test_open_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"<collection><record><controlfield tag="001">f1</controlfield></record></collection>"#
        )
        .unwrap();
        let mut source = MarcxmlSource::open(file.path()).unwrap();
        assert_eq!(source.read_all().unwrap()[0].id, "f1");
    }
}
