//! Fixups shipped with mediafixup.

mod common;
pub mod preserve_collections;
pub mod sync_sort_title;
pub mod sync_title;
pub mod video_genre_cleanup;

pub use common::{OneOrMany, SectionSelection};
pub use preserve_collections::PreserveCollections;
pub use sync_sort_title::SyncSortTitle;
pub use sync_title::SyncTitle;
pub use video_genre_cleanup::{GenreRules, VideoGenreCleanup};

use crate::fixup::Fixup;
use crate::registry::FixupRegistry;
use std::sync::Arc;

/// Register every builtin fixup under its name.
pub fn register_builtin(registry: &mut FixupRegistry) {
    registry.register(sync_sort_title::NAME, || {
        Arc::new(SyncSortTitle) as Arc<dyn Fixup>
    });
    registry.register(sync_title::NAME, || {
        Arc::new(SyncTitle::new()) as Arc<dyn Fixup>
    });
    registry.register(video_genre_cleanup::NAME, || {
        Arc::new(VideoGenreCleanup) as Arc<dyn Fixup>
    });
    registry.register(preserve_collections::NAME, || {
        Arc::new(PreserveCollections) as Arc<dyn Fixup>
    });
}
