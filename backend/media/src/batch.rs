//! Media group assembly.
//!
//! Items are windowed by position, so a missing page shrinks its own group
//! without pulling later pages forward into it.

use wird_core::{ContentBlob, MediaItem};

/// Lazy iterator over media groups. See [`batch`].
pub struct MediaBatches<I> {
    items: I,
    max_batch_size: usize,
    caption: Option<String>,
}

/// Split `items` into consecutive windows of `max_batch_size`, dropping
/// unresolved entries. Empty groups are never yielded and `caption` goes on the
/// first item actually yielded.
pub fn batch<I>(items: I, max_batch_size: usize, caption: Option<String>) -> MediaBatches<I::IntoIter>
where
    I: IntoIterator<Item = Option<ContentBlob>>,
{
    MediaBatches {
        items: items.into_iter(),
        max_batch_size: max_batch_size.max(1),
        caption,
    }
}

impl<I> Iterator for MediaBatches<I>
where
    I: Iterator<Item = Option<ContentBlob>>,
{
    type Item = Vec<MediaItem>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut window_len = 0;
            let mut group = Vec::new();
            for slot in self.items.by_ref().take(self.max_batch_size) {
                window_len += 1;
                if let Some(blob) = slot {
                    group.push(MediaItem {
                        blob,
                        caption: None,
                    });
                }
            }

            if window_len == 0 {
                return None;
            }
            if group.is_empty() {
                continue;
            }
            if let Some(caption) = self.caption.take() {
                group[0].caption = Some(caption);
            }
            return Some(group);
        }
    }
}
