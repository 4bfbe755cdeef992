pub mod error;
pub mod fetcher;
pub mod resolver;
pub mod result;
pub mod target;

pub use error::FetchError;
pub use fetcher::Fetcher;
pub use resolver::{LinkResolver, TargetProfile};
pub use result::{CandidateLink, DownloadedResource, MatchRule, PageSnapshot, SavedFile};
pub use target::ResolvedTarget;
