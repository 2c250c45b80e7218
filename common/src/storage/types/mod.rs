use std::fmt;

use serde::{Deserialize, Serialize};

pub mod book;
pub mod fields;
pub mod video;

use book::Book;
use video::Video;

pub trait StoredObject: Serialize + for<'de> Deserialize<'de> {
    fn table_name() -> &'static str;
    fn get_id(&self) -> &str;
}

/// A stored record that carries a human title used for deduplication.
pub trait TitledRecord: StoredObject + Clone + Send + Sync + 'static {
    const KIND: ContentKind;

    fn title(&self) -> &str;

    fn key(&self) -> String {
        Self::KIND.key(self.get_id())
    }
}

/// The two document families kept in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Book,
    Video,
}

impl ContentKind {
    pub fn table(self) -> &'static str {
        match self {
            Self::Book => "book",
            Self::Video => "video",
        }
    }

    pub fn title_field(self) -> &'static str {
        match self {
            Self::Book => "book_title",
            Self::Video => "youtube_title",
        }
    }

    /// Name of the full-text index over the title field.
    pub fn title_index_name(self) -> &'static str {
        match self {
            Self::Book => "idx_book_title",
            Self::Video => "idx_video_title",
        }
    }

    pub fn key_prefix(self) -> &'static str {
        match self {
            Self::Book => "book:",
            Self::Video => "video:",
        }
    }

    pub fn key(self, id: &str) -> String {
        format!("{}{id}", self.key_prefix())
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Book => "book",
            Self::Video => "video",
        }
    }

    /// Splits `book:<id>` / `video:<id>` into its kind and id.
    pub fn parse_key(key: &str) -> Option<(Self, &str)> {
        [Self::Book, Self::Video].into_iter().find_map(|kind| {
            key.strip_prefix(kind.key_prefix())
                .filter(|id| !id.is_empty())
                .map(|id| (kind, id))
        })
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Either record family, as returned by a key lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Document {
    Book(Book),
    Video(Video),
}

impl Document {
    pub fn key(&self) -> String {
        match self {
            Self::Book(book) => book.key(),
            Self::Video(video) => video.key(),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Book(book) => book.title(),
            Self::Video(video) => video.title(),
        }
    }
}

impl From<Book> for Document {
    fn from(book: Book) -> Self {
        Self::Book(book)
    }
}

impl From<Video> for Document {
    fn from(video: Video) -> Self {
        Self::Video(video)
    }
}

#[macro_export]
macro_rules! stored_object {
    ($name:ident, $table:expr, {$($(#[$attr:meta])* $field:ident: $ty:ty),*}) => {
        use serde::{Deserialize, Deserializer, Serialize};
        use surrealdb::sql::Thing;
        use $crate::storage::types::StoredObject;
        use serde::de::{self, Visitor};
        use std::fmt;
        use chrono::{DateTime, Utc};

        struct FlexibleIdVisitor;

        impl<'de> Visitor<'de> for FlexibleIdVisitor {
            type Value = String;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a plain id or a record id")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(value.to_string())
            }

            fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(value)
            }

            fn visit_map<A>(self, map: A) -> Result<Self::Value, A::Error>
            where
                A: de::MapAccess<'de>,
            {
                let thing = Thing::deserialize(de::value::MapAccessDeserializer::new(map))?;
                Ok(thing.id.to_raw())
            }
        }

        pub fn deserialize_flexible_id<'de, D>(deserializer: D) -> Result<String, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_any(FlexibleIdVisitor)
        }

        fn serialize_datetime<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: serde::Serializer,
        {
            Into::<surrealdb::sql::Datetime>::into(*date).serialize(serializer)
        }

        fn deserialize_datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            let dt = surrealdb::sql::Datetime::deserialize(deserializer)?;
            Ok(DateTime::<Utc>::from(dt))
        }

        #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
        pub struct $name {
            #[serde(deserialize_with = "deserialize_flexible_id")]
            pub id: String,
            #[serde(serialize_with = "serialize_datetime", deserialize_with = "deserialize_datetime", default)]
            pub created_at: DateTime<Utc>,
            #[serde(serialize_with = "serialize_datetime", deserialize_with = "deserialize_datetime", default)]
            pub updated_at: DateTime<Utc>,
            $( $(#[$attr])* pub $field: $ty),*
        }

        impl StoredObject for $name {
            fn table_name() -> &'static str {
                $table
            }

            fn get_id(&self) -> &str {
                &self.id
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip_through_parse() {
        assert_eq!(ContentKind::Book.key("abc_1"), "book:abc_1");
        assert_eq!(
            ContentKind::parse_key("video:dQw4w9WgXcQ"),
            Some((ContentKind::Video, "dQw4w9WgXcQ"))
        );
        assert_eq!(
            ContentKind::parse_key("book:thefou_123"),
            Some((ContentKind::Book, "thefou_123"))
        );
    }

    #[test]
    fn unknown_or_empty_keys_do_not_parse() {
        assert_eq!(ContentKind::parse_key("podcast:1"), None);
        assert_eq!(ContentKind::parse_key("book:"), None);
        assert_eq!(ContentKind::parse_key("dQw4w9WgXcQ"), None);
    }
}
