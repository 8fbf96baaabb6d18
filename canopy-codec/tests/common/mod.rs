//! Shared document types for codec tests.

#![allow(dead_code)]

use canopy_codec::{
    Bytes, Document, Field, Identifiable, IndexedMap, PresenceMap, field, named_enum,
};
use chrono::{DateTime, Utc};
use url::Url;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Mood {
    #[default]
    Calm,
    Excited,
}

named_enum!(Mood { Calm, Excited });

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub size: i64,
}

impl Identifiable for Attachment {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl Document for Attachment {
    const FIELDS: &'static [Field<Self>] = &[
        field!(Attachment, id),
        field!(Attachment, name),
        field!(Attachment, size),
    ];
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Author {
    pub id: String,
    pub handle: String,
}

impl Identifiable for Author {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl Document for Author {
    const FIELDS: &'static [Field<Self>] = &[field!(Author, id), field!(Author, handle)];
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub views: i32,
    pub likes: i64,
    pub rating: f64,
    pub ratio: f32,
    pub published: bool,
    pub date: DateTime<Utc>,
    pub link: Option<Url>,
    pub token: Uuid,
    pub mood: Mood,
    pub tags: Vec<String>,
    pub attachments: IndexedMap<Attachment>,
    pub readers: Option<PresenceMap>,
    pub author: Option<Box<Author>>,
}

impl Identifiable for Post {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl Document for Post {
    const FIELDS: &'static [Field<Self>] = &[
        field!(Post, id),
        field!(Post, title),
        field!(Post, subtitle),
        field!(Post, views),
        field!(Post, likes),
        field!(Post, rating),
        field!(Post, ratio),
        field!(Post, published => "isPublished"),
        field!(Post, date),
        field!(Post, link),
        field!(Post, token),
        field!(Post, mood),
        field!(Post, tags),
        field!(Post, attachments),
        field!(Post, readers),
        field!(Post, author),
    ];
}

/// A document carrying a field the store cannot hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Upload {
    pub id: String,
    pub name: String,
    pub payload: Bytes,
}

impl Identifiable for Upload {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl Document for Upload {
    const FIELDS: &'static [Field<Self>] = &[
        field!(Upload, id),
        field!(Upload, name),
        field!(Upload, payload),
    ];
}
