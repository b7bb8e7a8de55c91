use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::ParseError;

/// A completed HTTP response as handed back by a capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub raw_body: String,
}

/// What the server reports after applying an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmilesPayload {
    /// Text of the first `<smiles>` element.
    pub smiles: String,
    /// How many `<smiles>` elements the document contained.
    pub occurrences: usize,
}

impl Response {
    pub fn new(status: u16, raw_body: impl Into<String>) -> Self {
        Self {
            status,
            raw_body: raw_body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn parse(&self) -> Result<SmilesPayload, ParseError> {
        parse_smiles(&self.raw_body)
    }
}

fn parse_smiles(xml: &str) -> Result<SmilesPayload, ParseError> {
    // No trimming: the text inside <smiles> is shown exactly as sent.
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut first: Option<String> = None;
    let mut occurrences = 0;
    // Depth inside the first <smiles>, so nested markup does not end it early.
    let mut depth = 0usize;
    let mut capturing = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let is_smiles = e.local_name().as_ref() == b"smiles";
                if is_smiles {
                    occurrences += 1;
                }
                if capturing {
                    depth += 1;
                } else if is_smiles && first.is_none() {
                    first = Some(String::new());
                    capturing = true;
                    depth = 0;
                }
            }
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"smiles" {
                    occurrences += 1;
                    first.get_or_insert_with(String::new);
                }
            }
            Ok(Event::Text(e)) => {
                if capturing {
                    let text = e.unescape().map_err(|e| ParseError::Xml(e.to_string()))?;
                    if let Some(acc) = first.as_mut() {
                        acc.push_str(&text);
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if capturing {
                    let text = String::from_utf8_lossy(&e);
                    if let Some(acc) = first.as_mut() {
                        acc.push_str(&text);
                    }
                }
            }
            Ok(Event::End(_)) => {
                if capturing {
                    if depth == 0 {
                        capturing = false;
                    } else {
                        depth -= 1;
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ParseError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    let smiles = first.ok_or(ParseError::MissingSmiles)?;
    Ok(SmilesPayload {
        smiles,
        occurrences,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_single_smiles() {
        let payload = Response::new(200, "<smiles>C1CCCCC1</smiles>").parse().unwrap();
        assert_eq!(payload.smiles, "C1CCCCC1");
        assert_eq!(payload.occurrences, 1);
    }

    #[test]
    fn takes_first_of_several() {
        let xml = r#"<?xml version="1.0"?>
<reply>
  <smiles>CCO</smiles>
  <smiles>c1ccccc1</smiles>
</reply>"#;
        let payload = Response::new(200, xml).parse().unwrap();
        assert_eq!(payload.smiles, "CCO");
        assert_eq!(payload.occurrences, 2);
    }

    #[test]
    fn unescapes_entities() {
        let payload = Response::new(200, "<smiles>C&amp;O, [NH4+]</smiles>")
            .parse()
            .unwrap();
        assert_eq!(payload.smiles, "C&O, [NH4+]");
    }

    #[test]
    fn empty_element_yields_empty_text() {
        assert_eq!(Response::new(200, "<smiles></smiles>").parse().unwrap().smiles, "");
        assert_eq!(Response::new(200, "<smiles/>").parse().unwrap().smiles, "");
    }

    #[test]
    fn keeps_surrounding_whitespace_of_the_text() {
        let xml = "<reply>\n  <smiles> CCO </smiles>\n</reply>";
        assert_eq!(Response::new(200, xml).parse().unwrap().smiles, " CCO ");
    }

    #[test]
    fn nested_smiles_are_counted() {
        let xml = "<smiles>C<smiles>N</smiles>O</smiles><smiles/>";
        let payload = Response::new(200, xml).parse().unwrap();
        assert_eq!(payload.smiles, "CNO");
        assert_eq!(payload.occurrences, 3);
    }

    #[test]
    fn reads_cdata() {
        let payload = Response::new(200, "<smiles><![CDATA[C<C]]></smiles>")
            .parse()
            .unwrap();
        assert_eq!(payload.smiles, "C<C");
    }

    #[test]
    fn missing_element_is_an_error() {
        let err = Response::new(200, "<reply><inchi>X</inchi></reply>")
            .parse()
            .unwrap_err();
        assert_eq!(err, ParseError::MissingSmiles);
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let err = Response::new(200, "<smiles>CC</smile>").parse().unwrap_err();
        assert!(matches!(err, ParseError::Xml(_)));
    }

    #[test]
    fn success_range() {
        assert!(Response::new(200, "").is_success());
        assert!(Response::new(204, "").is_success());
        assert!(!Response::new(400, "").is_success());
        assert!(!Response::new(0, "").is_success());
    }
}
