//! Receiver status document
//!
//! The receiver answers most commands with a flat XML document of
//! `<Tag><value>...</value></Tag>` items. Only a handful of tags matter here;
//! any field the document does not carry stays unknown.

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::warn;

/// Master volume as reported by the receiver
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Volume {
    /// Absolute level in dB
    Db(f64),
    /// `--`: the receiver is at its floor (or powered down)
    Floor,
}

/// Receiver state as read from one status document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AvStatus {
    pub power: Option<bool>,
    pub input: Option<String>,
    pub volume: Option<Volume>,
    pub mute: Option<bool>,
}

impl AvStatus {
    pub fn parse(document: &[u8]) -> Result<Self, quick_xml::Error> {
        let mut reader = Reader::from_reader(document);
        reader.config_mut().trim_text(true);

        let mut status = AvStatus::default();
        let mut path: Vec<String> = Vec::new();
        let mut buf = Vec::new();
        // whether the open `<value>` element has produced any text yet
        let mut value_seen = false;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    path.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                    value_seen = false;
                }
                Event::End(_) => {
                    // `<value></value>` carries an empty value, like `<value/>`
                    if in_value(&path) && !value_seen {
                        if let Some(tag) = item_tag(&path[..path.len() - 1]) {
                            status.apply(tag, "");
                        }
                    }
                    path.pop();
                }
                Event::Empty(e) => {
                    if e.name().as_ref() == b"value" {
                        if let Some(tag) = item_tag(&path) {
                            status.apply(tag, "");
                        }
                    }
                }
                Event::Text(text) => {
                    if in_value(&path) {
                        value_seen = true;
                        let value = text.unescape()?;
                        if let Some(tag) = item_tag(&path[..path.len() - 1]) {
                            status.apply(tag, &value);
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(status)
    }

    fn apply(&mut self, tag: &str, value: &str) {
        match tag {
            "Power" => self.power = Some(value == "ON"),
            "InputFuncSelect" => self.input = Some(value.to_string()),
            "MasterVolume" => {
                self.volume = if value == "--" {
                    Some(Volume::Floor)
                } else {
                    match value.parse::<f64>() {
                        Ok(db) => Some(Volume::Db(db)),
                        Err(_) => {
                            warn!("Ignoring unreadable master volume {:?}", value);
                            None
                        }
                    }
                }
            }
            "Mute" => self.mute = Some(value == "on"),
            _ => {}
        }
    }
}

fn item_tag(path: &[String]) -> Option<&str> {
    path.last().map(String::as_str)
}

fn in_value(path: &[String]) -> bool {
    path.last().map(String::as_str) == Some("value")
}
