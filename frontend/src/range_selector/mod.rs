//! Dual-handle revision range selector.
//!
//! `RangeSelectorSlot` is the mount point the app shell owns. Mounting builds
//! a `RangeSelector` over one article's history; the selector snaps both
//! handles to real revisions, debounces comparison requests and renders the
//! backend's HTML into its output area.

mod animation;
mod driver;
mod view;

pub use driver::RangeSelector;

use crate::api::ApiClient;
use revision_range::{HistoryError, TimestampIndex};
use shared::{ArticleId, RangeSelectorSection, RevisionEntry};
use std::rc::Rc;
use std::sync::Arc;
use zoon::*;

#[derive(Clone)]
pub struct RangeSelectorSlot {
    api: ApiClient,
    settings: RangeSelectorSection,
    mounted: Mutable<Option<Rc<RangeSelector>>>,
}

impl RangeSelectorSlot {
    pub fn new(api: ApiClient, settings: RangeSelectorSection) -> Self {
        Self {
            api,
            settings,
            mounted: Mutable::new(None),
        }
    }

    /// Replace whatever is mounted with a selector over `history`.
    ///
    /// The previous selector is torn down first, so its pending timer and
    /// in-flight request cannot touch the new one. On error the slot stays
    /// empty.
    pub fn mount(&self, history: Vec<RevisionEntry>, article_id: ArticleId) -> Result<(), HistoryError> {
        self.unmount();

        let index = Arc::new(TimestampIndex::build(history)?);
        let selector = RangeSelector::new(index.clone(), article_id.clone(), self.api.clone(), self.settings.clone())?;
        selector.start();

        let (earliest, latest) = (index.earliest(), index.latest());
        zoon::println!(
            "Range selector mounted for article {}: {} revisions, {} .. {}",
            article_id,
            index.len(),
            earliest.timestamp.date_label(),
            latest.timestamp.date_label()
        );
        self.mounted.set(Some(selector));
        Ok(())
    }

    pub fn unmount(&self) {
        if let Some(selector) = self.mounted.replace(None) {
            selector.teardown();
        }
    }

    pub fn view(&self) -> impl Element + use<> {
        El::new().s(Width::fill()).child_signal(
            self.mounted
                .signal_cloned()
                .map(|selector| selector.map(view::range_selector_view)),
        )
    }
}
