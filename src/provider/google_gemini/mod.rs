//! Google Gemini GenerateContent provider.

mod error;
mod provider;
mod request;
mod response;
mod stream;
mod types;

pub use provider::{DEFAULT_BASE_URL, GoogleGeminiProvider};

pub(crate) const PROVIDER_ID: &str = "google_gemini";
