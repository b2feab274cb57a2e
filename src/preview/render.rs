//! Render planning and page-list splicing.
//!
//! Both paths follow the same get-or-decode discipline against the render
//! cache and only touch the page list once every fetched page decoded.

use crate::core::{Page, PreviewPosition};
use crate::error::{PreviewError, Result};

use super::state::{DisplayedPage, State};

/// Which pages a render cycle fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPlan {
    /// Every page; the list is replaced wholesale.
    Full,
    /// Only the page under the cursor.
    Single(usize),
}

impl RenderPlan {
    /// A changed page count forces a full render, as does a cursor that
    /// could not be mapped onto an existing page.
    pub fn choose(displayed: usize, count: usize, cursor: Option<PreviewPosition>) -> Self {
        if displayed != count {
            return Self::Full;
        }
        match cursor {
            Some(pos) if pos.page < count => Self::Single(pos.page),
            _ => Self::Full,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Single(_) => "single",
        }
    }
}

/// What a splice changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Spliced {
    /// Slots that now hold a different image
    pub changed: Vec<usize>,
    pub hits: usize,
    pub misses: usize,
}

/// Replace the whole list with `pages`, which must arrive in index order.
///
/// On any failure the displayed list is left as it was.
pub(super) fn splice_all(state: &mut State, pages: &[Page]) -> Result<Spliced> {
    if let Some((i, page)) = pages.iter().enumerate().find(|(i, p)| p.index != *i) {
        return Err(PreviewError::transport(
            "render_all_pages",
            format!("page {} returned at position {}", page.index, i),
        ));
    }

    state.cache.ensure_capacity(pages.len());
    let before = state.cache.stats();

    let mut fresh = Vec::with_capacity(pages.len());
    for page in pages {
        let (key, image) = state.cache.get_or_decode(page)?;
        fresh.push(DisplayedPage { key, image });
    }

    let after = state.cache.stats();
    state.pages = fresh;
    Ok(Spliced {
        changed: (0..pages.len()).collect(),
        hits: after.hits - before.hits,
        misses: after.misses - before.misses,
    })
}

/// Swap the slot at `page.index`. An unchanged key keeps the old entry.
pub(super) fn splice_one(state: &mut State, page: &Page) -> Result<Spliced> {
    let index = page.index;
    if index >= state.pages.len() {
        return Err(PreviewError::transport(
            "render_page",
            format!("page {index} outside the displayed {} pages", state.pages.len()),
        ));
    }

    let before = state.cache.stats();
    let (key, image) = state.cache.get_or_decode(page)?;
    let after = state.cache.stats();

    let mut changed = Vec::new();
    if state.pages[index].key != key {
        state.pages[index] = DisplayedPage { key, image };
        changed.push(index);
    }

    Ok(Spliced {
        changed,
        hits: after.hits - before.hits,
        misses: after.misses - before.misses,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::encode_test_png;
    use std::sync::Arc;

    fn page(index: usize, shade: u8) -> Page {
        Page::new(index, 2, 2, encode_test_png(2, 2, shade))
    }

    #[test]
    fn test_choose_plan() {
        let at = |page| Some(PreviewPosition::new(page, 0.0, 0.0));
        assert_eq!(RenderPlan::choose(3, 3, at(1)), RenderPlan::Single(1));
        assert_eq!(RenderPlan::choose(2, 3, at(1)), RenderPlan::Full);
        assert_eq!(RenderPlan::choose(3, 3, None), RenderPlan::Full);
        assert_eq!(RenderPlan::choose(3, 3, at(3)), RenderPlan::Full);
        assert_eq!(RenderPlan::choose(0, 0, at(0)), RenderPlan::Full);
    }

    #[test]
    fn test_splice_one_keeps_identical_entry() {
        let mut state = State::new(16);
        splice_all(&mut state, &[page(0, 1), page(1, 2)]).unwrap();
        let before = Arc::clone(&state.pages[1].image);

        let same = splice_one(&mut state, &page(1, 2)).unwrap();
        assert!(same.changed.is_empty());
        assert_eq!(same.hits, 1);
        assert!(Arc::ptr_eq(&state.pages[1].image, &before));

        let other = splice_one(&mut state, &page(1, 3)).unwrap();
        assert_eq!(other.changed, vec![1]);
        assert_eq!(other.misses, 1);
    }

    #[test]
    fn test_splice_all_rejects_out_of_order() {
        let mut state = State::new(16);
        let err = splice_all(&mut state, &[page(1, 1), page(0, 1)]).unwrap_err();
        assert!(err.is_transport());
        assert!(state.pages.is_empty());
    }

    #[test]
    fn test_bad_payload_keeps_previous_list() {
        let mut state = State::new(16);
        splice_all(&mut state, &[page(0, 1)]).unwrap();

        let broken = [page(0, 5), Page::new(1, 2, 2, b"junk".to_vec())];
        assert!(splice_all(&mut state, &broken).is_err());
        assert_eq!(state.pages.len(), 1);

        assert!(splice_one(&mut state, &Page::new(0, 2, 2, b"junk".to_vec())).is_err());
        assert!(splice_one(&mut state, &page(4, 1)).is_err());
    }
}
