//! Browser seams
//!
//! The verifier only needs to read the page (snapshot, screenshot) and, for
//! the action executor, drive it with a handful of primitive steps.

use crate::models::PageSnapshot;
use crate::Result;
use async_trait::async_trait;

pub mod webdriver;
pub use webdriver::{Viewport, WebDriverSession};

/// Read access to the current page
#[async_trait]
pub trait PageSnapshotter: Send + Sync {
    async fn snapshot(&self) -> Result<PageSnapshot>;

    /// PNG bytes of the visible viewport
    async fn screenshot(&self) -> Result<Vec<u8>>;
}

/// Primitive interactions used by the action executor
#[async_trait]
pub trait PageDriver: PageSnapshotter {
    async fn navigate(&self, url: &str) -> Result<()>;
    async fn click(&self, selector: &str) -> Result<()>;
    async fn fill(&self, selector: &str, text: &str) -> Result<()>;
    async fn press(&self, key: &str) -> Result<()>;
}
