pub mod client;
pub mod config;
pub mod error;
pub mod image_source;
pub mod model;
pub mod session;

pub use client::{RecommendationClient, RecommendationService};
pub use config::ClientConfig;
pub use error::{ConfigError, ErrorKind, ProtocolError, UploadError};
pub use image_source::{FileImageSource, ImageSource, StagedImageSource};
pub use model::{Book, SimilarBook, UploadResult};
pub use session::{RecommendationSession, RequestToken, UploadFailure, ViewState};
