pub mod discovery;
pub mod engagement;
pub mod feedback;
pub mod store;

pub use discovery::{AdaptedRanking, DiscoveryService};
pub use engagement::EngagementService;
pub use feedback::FeedbackService;
pub use store::{DiscoveryStore, InMemoryStore, PgStore};
