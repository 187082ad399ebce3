pub mod change_detector;
pub mod fetch_service;
pub mod palette_filter;
pub mod publisher;

pub use change_detector::{
    should_publish, ChangeDetector, CommitDecision, CommittedStore, GitCommittedStore,
    MemoryCommittedStore,
};
pub use fetch_service::{FetchedBody, HttpFetchService, ImageFetcher};
pub use palette_filter::{ImageFilter, PaletteFilter, PaletteReport};
pub use publisher::{GitPublisher, PublishReceipt, Publisher};
