pub mod email;
pub mod notion;

use crate::error::SinkError;
use crate::listing::Listing;

pub use email::{EmailConfig, EmailSink};
pub use notion::{NotionConfig, NotionSink};

/// A delivery target for new-listing notifications.
///
/// `deliver` returns `Ok` only once the target has accepted the listing;
/// the dispatcher marks a listing seen after every sink returned `Ok`.
#[async_trait::async_trait]
pub trait Sink: Send + Sync {
    fn name(&self) -> &'static str;
    async fn deliver(&self, listing: &Listing) -> Result<(), SinkError>;
}
