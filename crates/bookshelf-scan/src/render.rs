use std::fmt::Write;

use bookshelf_common::{Book, ViewState};

const EMPTY: &str = "No recommendations yet.";

/// One status line for a state change, or `None` when there is nothing new to say.
pub fn status_line(state: &ViewState) -> Option<String> {
    let token = state.token?;
    if state.loading {
        return Some(format!("[{token}] uploading photo..."));
    }
    if let Some(error) = &state.error {
        return Some(format!("[{token}] {error}"));
    }
    state
        .result
        .as_ref()
        .map(|_| format!("[{token}] {} recommendation(s) received", state.books().len()))
}

pub fn render_books(books: &[Book]) -> String {
    if books.is_empty() {
        return format!("{EMPTY}\n");
    }

    let mut out = String::new();
    for (i, book) in books.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, book.display_title());
        let _ = writeln!(out, "   {}", book.display_author());
        if let Some(series) = &book.series_position {
            let _ = writeln!(out, "   Series: {series}");
        }
        match book.rating {
            Some(rating) => {
                let _ = writeln!(out, "   Rating: {rating}");
            }
            None => {
                let _ = writeln!(out, "   No rating");
            }
        }
        if !book.keywords.is_empty() {
            let _ = writeln!(out, "   Keywords: {}", book.keywords.join(", "));
        }
        if !book.similar_books.is_empty() {
            let similar: Vec<String> = book.similar_books.iter().map(|s| s.to_string()).collect();
            let _ = writeln!(out, "   Similar Books: {}", similar.join(", "));
        }
        let _ = writeln!(
            out,
            "   {}",
            book.description.as_deref().unwrap_or("No description")
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use bookshelf_common::{SimilarBook, UploadResult};

    use super::*;

    fn dune() -> Book {
        Book {
            title: Some("Dune".to_string()),
            author: Some("Frank Herbert".to_string()),
            description: None,
            rating: Some(4.8),
            keywords: vec!["scifi".to_string(), "desert".to_string()],
            series_position: Some("1".to_string()),
            similar_books: vec![SimilarBook {
                title: Some("Hyperion".to_string()),
                author: Some("Dan Simmons".to_string()),
            }],
        }
    }

    #[test]
    fn renders_book_lines() {
        let text = render_books(&[dune(), Book::default()]);
        let expected = "\
1. Dune
   Frank Herbert
   Series: 1
   Rating: 4.8
   Keywords: scifi, desert
   Similar Books: Hyperion by Dan Simmons
   No description
2. Unknown Title
   Unknown Author(s)
   No rating
   No description
";
        assert_eq!(text, expected);
    }

    #[test]
    fn renders_empty_list() {
        assert_eq!(render_books(&[]), "No recommendations yet.\n");
    }

    #[test]
    fn status_lines_follow_state() {
        assert_eq!(status_line(&ViewState::default()), None);

        let session = bookshelf_common::RecommendationSession::new(NoService);
        let token = session.begin();
        assert_eq!(
            status_line(&session.snapshot()).as_deref(),
            Some("[#1] uploading photo...")
        );

        session.complete(
            token,
            Ok(UploadResult {
                success: true,
                message: "ok".to_string(),
                books: vec![dune()],
            }),
        );
        assert_eq!(
            status_line(&session.snapshot()).as_deref(),
            Some("[#1] 1 recommendation(s) received")
        );
    }

    struct NoService;

    #[async_trait::async_trait]
    impl bookshelf_common::RecommendationService for NoService {
        async fn upload(
            &self,
            image: &std::path::Path,
        ) -> Result<UploadResult, bookshelf_common::UploadError> {
            unreachable!("no uploads expected for {}", image.display())
        }
    }
}
