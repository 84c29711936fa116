use anyhow::Result;
use async_trait::async_trait;

use crate::context::Context;
use crate::fs::types::Listing;

/// A directory in some backing store.
///
/// Implementations should honor `ctx` where the store supports it; the sizer
/// also races every call against cancellation, so a store that ignores the
/// context only delays its own call, never the caller.
#[async_trait]
pub trait Dir: Send + Sync {
    /// List immediate subdirectories and files.
    async fn list(&self, ctx: &Context) -> Result<Listing>;

    /// Display path, used in logs and error messages.
    fn path(&self) -> String;
}

/// A file in some backing store.
#[async_trait]
pub trait File: Send + Sync {
    /// Size in bytes.
    async fn size(&self, ctx: &Context) -> Result<u64>;

    /// Display path, used in logs and error messages.
    fn path(&self) -> String;
}
