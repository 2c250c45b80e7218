use uuid::Uuid;

use crate::{
    storage::types::{fields::FieldMap, ContentKind, TitledRecord},
    stored_object,
    utils::normalize::normalize_title,
};

/// Characters of the title kept in front of the generated id.
const SLUG_LEN: usize = 6;

stored_object!(Book, "book", {
    uuid: String,
    book_title: String,
    book_title_normalized: String,
    fields: FieldMap,
    searchable_text: String,
    embedding: Vec<f32>
});

impl Book {
    /// Builds a persisted book row. `fields` must already use snake_case keys.
    pub fn new(fields: FieldMap, searchable_text: String, embedding: Vec<f32>) -> Self {
        let now = Utc::now();
        let book_title = fields.text("book_title");
        let uuid = Self::generate_id(&book_title);
        Self {
            id: uuid.clone(),
            created_at: now,
            updated_at: now,
            uuid,
            book_title_normalized: normalize_title(&book_title),
            book_title,
            fields,
            searchable_text,
            embedding,
        }
    }

    /// `<slug>_<uuid4>` where the slug is the first six ASCII letters or
    /// digits of the lowercased title, or `book` when there are none.
    pub fn generate_id(title: &str) -> String {
        let slug: String = title
            .to_lowercase()
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .take(SLUG_LEN)
            .collect();
        let slug = if slug.is_empty() { "book".to_string() } else { slug };
        format!("{slug}_{}", Uuid::new_v4())
    }

    /// Flat column view used for the archived CSV and JSON copies, in the
    /// order: uuid, upload fields, derived fields, embedding.
    pub fn archive_columns(&self) -> Vec<(String, String)> {
        let mut columns = Vec::with_capacity(self.fields.len() + 4);
        columns.push(("uuid".to_string(), self.uuid.clone()));
        columns.extend(
            self.fields
                .iter()
                .map(|(key, value)| (key.to_string(), value.stringify())),
        );
        columns.push((
            "book_title_normalized".to_string(),
            self.book_title_normalized.clone(),
        ));
        columns.push(("searchable_text".to_string(), self.searchable_text.clone()));
        columns.push((
            "embedding".to_string(),
            serde_json::to_string(&self.embedding).unwrap_or_default(),
        ));
        columns
    }

    pub fn archive_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&ArchivedBook {
            uuid: &self.uuid,
            fields: &self.fields,
            book_title_normalized: &self.book_title_normalized,
            searchable_text: &self.searchable_text,
            embedding: &self.embedding,
        })
    }
}

#[derive(Serialize)]
struct ArchivedBook<'a> {
    uuid: &'a str,
    #[serde(flatten)]
    fields: &'a FieldMap,
    book_title_normalized: &'a str,
    searchable_text: &'a str,
    embedding: &'a [f32],
}

impl TitledRecord for Book {
    const KIND: ContentKind = ContentKind::Book;

    fn title(&self) -> &str {
        &self.book_title
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fields() -> FieldMap {
        [
            ("book_title", "The Four Agreements"),
            ("dimension", "Spiritual"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn generated_ids_carry_title_slug() {
        let id = Book::generate_id("The Four Agreements");
        assert!(id.starts_with("thefou_"));
        assert_eq!(id.len(), "thefou_".len() + 36);

        assert!(Book::generate_id("!!!").starts_with("book_"));
        assert!(Book::generate_id("Ôm 42").starts_with("m42_"));
    }

    #[test]
    fn new_book_derives_title_fields() {
        let book = Book::new(sample_fields(), "The Four Agreements Spiritual".into(), vec![0.5, 0.5]);

        assert_eq!(book.book_title, "The Four Agreements");
        assert_eq!(book.book_title_normalized, "thefouragreements");
        assert_eq!(book.id, book.uuid);
        assert_eq!(book.key(), format!("book:{}", book.uuid));
    }

    #[test]
    fn archive_columns_keep_upload_order() {
        let book = Book::new(sample_fields(), "text".into(), vec![1.0]);
        let names: Vec<String> = book.archive_columns().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            names,
            vec![
                "uuid",
                "book_title",
                "dimension",
                "book_title_normalized",
                "searchable_text",
                "embedding"
            ]
        );

        let json: serde_json::Value =
            serde_json::from_str(&book.archive_json().expect("json")).expect("parse");
        assert_eq!(json["dimension"], "Spiritual");
        assert_eq!(json["embedding"][0], 1.0);
    }
}
