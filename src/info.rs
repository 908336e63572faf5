use crate::refs::{ObjectReferences, RefType};
use pdf_writer::{Date as PDate, Name, Pdf, TextStr};

/// General document metadata such as title, author, etc
#[derive(Default, Debug, Clone)]
pub struct Info {
    /// The title of the document.
    pub title: Option<String>,
    /// The author(s) of the document. No prescribed format.
    pub author: Option<String>,
    /// The subject of the document.
    pub subject: Option<String>,
    /// Keywords for the document. No prescribed format, though Adobe Acrobat suggests
    /// using a comma separated list of keywords
    pub keywords: Option<String>,
    /// The application that created the original content. Defaults to this crate.
    pub creator: Option<String>,
    pub producer: Option<String>,
    /// Any other key/value pairs, written as they are
    pub custom: Vec<(String, String)>,
}

impl Info {
    /// Create a new info block, with all metadata set to [None]
    pub fn new() -> Info {
        Info::default()
    }

    /// Set an entry by its PDF key (`Title`, `Author`, ...). Keys the info dictionary
    /// doesn't define are kept as custom entries; setting one twice replaces it.
    pub fn set(&mut self, key: &str, value: &str) -> &mut Self {
        let value = Some(value.to_string());
        match key {
            "Title" => self.title = value,
            "Author" => self.author = value,
            "Subject" => self.subject = value,
            "Keywords" => self.keywords = value,
            "Creator" => self.creator = value,
            "Producer" => self.producer = value,
            _ => {
                let value = value.unwrap_or_default();
                match self.custom.iter_mut().find(|(k, _)| k == key) {
                    Some(entry) => entry.1 = value,
                    None => self.custom.push((key.to_string(), value)),
                }
            }
        }
        self
    }

    pub(crate) fn write(&self, refs: &mut ObjectReferences, writer: &mut Pdf) {
        let id = refs.gen(RefType::Info);
        let mut info = writer.document_info(id);

        if let Some(title) = &self.title {
            info.title(TextStr(title.as_str()));
        }
        if let Some(author) = &self.author {
            info.author(TextStr(author.as_str()));
        }
        if let Some(subject) = &self.subject {
            info.subject(TextStr(subject.as_str()));
        }
        if let Some(keywords) = &self.keywords {
            info.keywords(TextStr(keywords.as_str()));
        }
        match &self.creator {
            Some(creator) => info.creator(TextStr(creator.as_str())),
            None => info.creator(TextStr(concat!(
                env!("CARGO_PKG_NAME"),
                " v",
                env!("CARGO_PKG_VERSION")
            ))),
        };
        if let Some(producer) = &self.producer {
            info.producer(TextStr(producer.as_str()));
        }
        for (key, value) in self.custom.iter() {
            info.pair(Name(key.as_bytes()), TextStr(value.as_str()));
        }

        use chrono::prelude::*;
        let now = Local::now();
        let offset = now.offset().fix();
        let offset_hours = offset.local_minus_utc() / (60 * 60);
        let offset_minutes = ((offset.local_minus_utc() - (offset_hours * (60 * 60))) / 60).abs();
        let date = PDate::new(now.year() as u16)
            .month(now.month() as u8)
            .day(now.day() as u8)
            .hour(now.hour() as u8)
            .minute(now.minute() as u8)
            .second(now.second() as u8)
            .utc_offset_hour(offset_hours as i8)
            .utc_offset_minute(offset_minutes as u8);
        info.creation_date(date);
    }
}
