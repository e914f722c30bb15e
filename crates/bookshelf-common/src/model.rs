use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::UploadError;

const UNKNOWN_TITLE: &str = "Unknown Title";
const UNKNOWN_AUTHOR: &str = "Unknown Author(s)";

/// Response envelope returned by `POST /process-image/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    pub success: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    /// Only meaningful when `success` is true.
    #[serde(default, deserialize_with = "null_as_default")]
    pub books: Vec<Book>,
}

/// A recommended book as identified by the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Opaque score; no range is enforced.
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub series_position: Option<String>,
    /// Older deployments of the service send `similar_books`.
    #[serde(default, alias = "similar_books", deserialize_with = "null_as_default")]
    pub similar_books: Vec<SimilarBook>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimilarBook {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

impl UploadResult {
    /// Yield the recommended books, or the server's reason when `success` is false.
    pub fn into_recommendations(self) -> Result<Vec<Book>, UploadError> {
        if self.success {
            Ok(self.books)
        } else {
            Err(UploadError::Application {
                message: self.message,
            })
        }
    }
}

impl Book {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(UNKNOWN_TITLE)
    }

    pub fn display_author(&self) -> &str {
        self.author.as_deref().unwrap_or(UNKNOWN_AUTHOR)
    }
}

impl fmt::Display for SimilarBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} by {}",
            self.title.as_deref().unwrap_or(UNKNOWN_TITLE),
            self.author.as_deref().unwrap_or(UNKNOWN_AUTHOR)
        )
    }
}

// `null` and absent decode the same way for collections and strings.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUNE: &str = r#"{
        "success": true,
        "message": "ok",
        "books": [{
            "title": "Dune",
            "author": "Frank Herbert",
            "description": null,
            "rating": 4.8,
            "keywords": ["scifi"],
            "seriesPosition": "1",
            "similarBooks": []
        }]
    }"#;

    #[test]
    fn decodes_full_book() {
        let result: UploadResult = serde_json::from_str(DUNE).unwrap();
        assert!(result.success);
        assert_eq!(result.message, "ok");
        assert_eq!(result.books.len(), 1);

        let book = &result.books[0];
        assert_eq!(book.title.as_deref(), Some("Dune"));
        assert_eq!(book.author.as_deref(), Some("Frank Herbert"));
        assert_eq!(book.description, None);
        assert_eq!(book.rating, Some(4.8));
        assert_eq!(book.keywords, vec!["scifi".to_string()]);
        assert_eq!(book.series_position.as_deref(), Some("1"));
        assert!(book.similar_books.is_empty());
    }

    #[test]
    fn missing_and_null_fields_fall_back_to_defaults() {
        let json = r#"{
            "success": true,
            "books": [
                {"title": "Emma", "author": null, "keywords": null},
                {}
            ]
        }"#;
        let result: UploadResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.message, "");
        assert_eq!(result.books[0].title.as_deref(), Some("Emma"));
        assert_eq!(result.books[0].author, None);
        assert_eq!(result.books[0].rating, None);
        assert!(result.books[0].keywords.is_empty());
        assert_eq!(result.books[1], Book::default());
    }

    #[test]
    fn preserves_order_and_ignores_unknown_fields() {
        let json = r#"{
            "success": true,
            "message": "ok",
            "model_version": "2024-06",
            "books": [
                {"title": "A", "coverUrl": "https://img.example/a.jpg",
                 "similarBooks": [{"title": "A2", "author": "X"}, {"title": "A3"}]},
                {"title": "B"},
                {"title": "C"}
            ]
        }"#;
        let result: UploadResult = serde_json::from_str(json).unwrap();
        let titles: Vec<&str> = result.books.iter().map(Book::display_title).collect();
        assert_eq!(titles, ["A", "B", "C"]);
        assert_eq!(result.books[0].similar_books[0].to_string(), "A2 by X");
        assert_eq!(result.books[0].similar_books[1].to_string(), "A3 by Unknown Author(s)");
    }

    #[test]
    fn accepts_legacy_similar_books_key() {
        let json = r#"{"title": "Dune", "similar_books": [{"title": "Hyperion", "author": "Dan Simmons"}]}"#;
        let book: Book = serde_json::from_str(json).unwrap();
        assert_eq!(book.similar_books.len(), 1);
        assert_eq!(book.similar_books[0].title.as_deref(), Some("Hyperion"));
    }

    #[test]
    fn encodes_wire_names() {
        let result: UploadResult = serde_json::from_str(DUNE).unwrap();
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["books"][0]["seriesPosition"], "1");
        assert!(value["books"][0]["similarBooks"].is_array());
        let again: UploadResult = serde_json::from_value(value).unwrap();
        assert_eq!(again, result);
    }

    #[test]
    fn missing_success_flag_is_rejected() {
        assert!(serde_json::from_str::<UploadResult>(r#"{"message": "ok", "books": []}"#).is_err());
        assert!(serde_json::from_str::<UploadResult>(r#"{"success": true, "books": {}}"#).is_err());
    }

    #[test]
    fn failed_result_becomes_application_error() {
        let result = UploadResult {
            success: false,
            message: "no spines detected".to_string(),
            books: vec![Book::default()],
        };
        match result.into_recommendations() {
            Err(UploadError::Application { message }) => assert_eq!(message, "no spines detected"),
            other => panic!("expected application failure, got {other:?}"),
        }
    }

    #[test]
    fn display_fallbacks() {
        let book = Book::default();
        assert_eq!(book.display_title(), "Unknown Title");
        assert_eq!(book.display_author(), "Unknown Author(s)");
    }
}
