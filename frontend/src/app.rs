//! RevisionExplorerApp - topic clusters for a day, their summaries and the
//! article whose revision history feeds the range selector.

use crate::api::ApiClient;
use crate::config::load_client_config;
use crate::dataflow::{Actor, Relay, relay};
use crate::error_display::{InlineError, inline_error_view};
use crate::range_selector::RangeSelectorSlot;
use chrono::{Days, NaiveDate};
use futures::{StreamExt, select};
use shared::Cluster;
use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use zoon::*;

const MUTED_TEXT: &str = "rgb(100, 116, 139)";
const LINK_COLOR: &str = "rgb(37, 99, 235)";

#[derive(Debug, Clone, PartialEq)]
pub enum ClustersStatus {
    Loading,
    Loaded(Vec<Cluster>),
    Failed(InlineError),
}

/// Topic clusters of the selected day.
#[derive(Debug, Clone, PartialEq)]
pub struct ClustersState {
    pub date: NaiveDate,
    pub status: ClustersStatus,
}

/// A cluster is addressed by its position in the day's list.
type SummaryKey = (usize, NaiveDate);

#[derive(Debug, Clone, PartialEq)]
pub enum SummaryState {
    Idle,
    Loading { cluster_index: usize },
    Ready { cluster_index: usize, summary: Option<String> },
    Failed { cluster_index: usize, error: InlineError },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArticleStatus {
    Idle,
    Loading(String),
    Ready(String),
    Failed(InlineError),
}

#[derive(Clone)]
pub struct RevisionExplorerApp {
    api: ApiClient,

    // === DOMAIN ACTORS ===
    pub clusters: Actor<ClustersState>,
    pub summary: Actor<SummaryState>,
    pub article: Actor<ArticleStatus>,
    range_selector: RangeSelectorSlot,

    // === EVENT-SOURCE RELAYS ===
    /// User picked another day
    date_changed_relay: Relay<NaiveDate>,
    /// User clicked a cluster header
    cluster_selected_relay: Relay<SummaryKey>,
    /// Article history request started or finished
    article_status_relay: Relay<ArticleStatus>,

    /// Bumped per article click; older history responses are dropped.
    article_generation: Rc<Cell<u64>>,
}

impl RevisionExplorerApp {
    pub async fn new() -> Self {
        let config = load_client_config();
        let api = ApiClient::new(config.api.base_url.clone());
        let initial_date = default_date();

        let (date_changed_relay, date_changed_stream) = relay();
        let (clusters_requested_relay, clusters_requested_stream) = relay::<NaiveDate>();
        let (clusters_loaded_relay, clusters_loaded_stream) = relay::<(NaiveDate, ClustersStatus)>();
        let (cluster_selected_relay, cluster_selected_stream) = relay();
        let (summary_requested_relay, summary_requested_stream) = relay::<SummaryKey>();
        let (summary_loaded_relay, summary_loaded_stream) =
            relay::<(SummaryKey, Result<Option<String>, InlineError>)>();
        let (article_status_relay, article_status_stream) = relay();

        let clusters = Actor::new(
            ClustersState {
                date: initial_date,
                status: ClustersStatus::Loading,
            },
            move |state| async move {
                let mut date_changed_stream = date_changed_stream.fuse();
                let mut clusters_loaded_stream = clusters_loaded_stream.fuse();

                loop {
                    select! {
                        date_opt = date_changed_stream.next() => {
                            match date_opt {
                                Some(date) => {
                                    state.set(ClustersState { date, status: ClustersStatus::Loading });
                                    clusters_requested_relay.send(date);
                                }
                                None => break,
                            }
                        },
                        loaded_opt = clusters_loaded_stream.next() => {
                            match loaded_opt {
                                Some((date, status)) => {
                                    if state.lock_ref().date == date {
                                        state.lock_mut().status = status;
                                    } else {
                                        zoon::println!("Dropping clusters of {}: another date is selected", date);
                                    }
                                }
                                None => break,
                            }
                        },
                    }
                }
            },
        );

        let summary = Actor::new(SummaryState::Idle, move |state| async move {
            let mut cluster_selected_stream = cluster_selected_stream.fuse();
            let mut summary_loaded_stream = summary_loaded_stream.fuse();
            let mut cache: HashMap<SummaryKey, Option<String>> = HashMap::new();
            let mut pending: HashSet<SummaryKey> = HashSet::new();
            let mut current: Option<SummaryKey> = None;

            loop {
                select! {
                    selected_opt = cluster_selected_stream.next() => {
                        let Some(key) = selected_opt else { break };
                        current = Some(key);
                        let (cluster_index, _) = key;
                        match cache.get(&key) {
                            Some(summary) => state.set(SummaryState::Ready {
                                cluster_index,
                                summary: summary.clone(),
                            }),
                            None => {
                                state.set(SummaryState::Loading { cluster_index });
                                if pending.insert(key) {
                                    summary_requested_relay.send(key);
                                }
                            }
                        }
                    },
                    loaded_opt = summary_loaded_stream.next() => {
                        let Some((key, result)) = loaded_opt else { break };
                        pending.remove(&key);
                        let (cluster_index, _) = key;
                        let next = match result {
                            Ok(summary) => {
                                cache.insert(key, summary.clone());
                                SummaryState::Ready { cluster_index, summary }
                            }
                            Err(error) => SummaryState::Failed { cluster_index, error },
                        };
                        if current == Some(key) {
                            state.set(next);
                        }
                    },
                }
            }
        });

        let article = Actor::new(ArticleStatus::Idle, move |state| async move {
            let mut article_status_stream = article_status_stream;
            while let Some(status) = article_status_stream.next().await {
                state.set(status);
            }
        });

        Self::start_clusters_worker(api.clone(), clusters_requested_stream, clusters_loaded_relay);
        Self::start_summary_worker(api.clone(), summary_requested_stream, summary_loaded_relay);

        let app = RevisionExplorerApp {
            range_selector: RangeSelectorSlot::new(api.clone(), config.range_selector),
            api,
            clusters,
            summary,
            article,
            date_changed_relay,
            cluster_selected_relay,
            article_status_relay,
            article_generation: Rc::new(Cell::new(0)),
        };
        app.select_date(initial_date);
        app
    }

    /// Runs `fetch_clusters` for every date the clusters actor asks for.
    fn start_clusters_worker(
        api: ApiClient,
        mut clusters_requested_stream: futures::channel::mpsc::UnboundedReceiver<NaiveDate>,
        clusters_loaded_relay: Relay<(NaiveDate, ClustersStatus)>,
    ) {
        Task::start(async move {
            while let Some(date) = clusters_requested_stream.next().await {
                let api = api.clone();
                let clusters_loaded_relay = clusters_loaded_relay.clone();
                Task::start(async move {
                    let status = match api.fetch_clusters(date).await {
                        Ok(clusters) => {
                            zoon::println!("Loaded {} clusters for {}", clusters.len(), date);
                            ClustersStatus::Loaded(clusters)
                        }
                        Err(error) => {
                            let error = InlineError::new_clusters_error(&date.to_string(), &error);
                            error.log();
                            ClustersStatus::Failed(error)
                        }
                    };
                    clusters_loaded_relay.send((date, status));
                });
            }
        });
    }

    fn start_summary_worker(
        api: ApiClient,
        mut summary_requested_stream: futures::channel::mpsc::UnboundedReceiver<SummaryKey>,
        summary_loaded_relay: Relay<(SummaryKey, Result<Option<String>, InlineError>)>,
    ) {
        Task::start(async move {
            while let Some((cluster_index, date)) = summary_requested_stream.next().await {
                let api = api.clone();
                let summary_loaded_relay = summary_loaded_relay.clone();
                Task::start(async move {
                    let result = api
                        .fetch_cluster_summary(cluster_index, date)
                        .await
                        .map_err(|error| {
                            let error = InlineError::new_summary_error(cluster_index, &error);
                            error.log();
                            error
                        });
                    summary_loaded_relay.send(((cluster_index, date), result));
                });
            }
        });
    }

    // ===== USER ACTIONS =====

    pub fn select_date(&self, date: NaiveDate) {
        self.date_changed_relay.send(date);
    }

    pub fn select_cluster(&self, cluster_index: usize, date: NaiveDate) {
        self.cluster_selected_relay.send((cluster_index, date));
    }

    /// Fetch the article's history and mount a fresh range selector over it.
    pub fn open_article(&self, title: String) {
        let generation = self.article_generation.get() + 1;
        self.article_generation.set(generation);
        self.range_selector.unmount();
        self.report_article(ArticleStatus::Loading(title.clone()));

        let app = self.clone();
        Task::start(async move {
            let result = app.api.fetch_article_history(&title).await;
            if app.article_generation.get() != generation {
                zoon::println!("Dropping history of '{}': another article was opened", title);
                return;
            }
            let status = match result {
                Ok(history) => match app.range_selector.mount(history.entries, history.article_id) {
                    Ok(()) => ArticleStatus::Ready(title),
                    Err(error) => {
                        let error = InlineError::new_insufficient_history(&title, &error);
                        error.log();
                        ArticleStatus::Failed(error)
                    }
                },
                Err(error) => {
                    let error = InlineError::new_history_error(&title, &error);
                    error.log();
                    ArticleStatus::Failed(error)
                }
            };
            app.report_article(status);
        });
    }

    fn report_article(&self, status: ArticleStatus) {
        self.article_status_relay.send(status);
    }

    // ===== VIEW =====

    pub fn root(&self) -> impl Element + use<> {
        Column::new()
            .s(Width::fill())
            .s(Padding::all(24))
            .s(Gap::new().y(20))
            .s(Font::new()
                .family([FontFamily::new("Inter"), FontFamily::SansSerif])
                .color("rgb(15, 23, 42)"))
            .item(self.header())
            .item(
                Row::new()
                    .s(Width::fill())
                    .s(Gap::new().x(24))
                    .s(Align::new().top())
                    .item(self.clusters_panel())
                    .item(self.summary_panel()),
            )
            .item(self.article_panel())
            .item(self.range_selector.view())
    }

    fn header(&self) -> impl Element + use<> {
        Row::new()
            .s(Gap::new().x(16))
            .s(Align::new().center_y())
            .item(
                El::new()
                    .s(Font::new().size(22).weight(FontWeight::Bold))
                    .child(Text::new("Wiki Revision Explorer")),
            )
            .item(date_input(self.clone(), default_date()))
    }

    fn clusters_panel(&self) -> impl Element + use<> {
        let app = self.clone();
        Column::new()
            .s(Width::fill())
            .s(Gap::new().y(10))
            .item(section_title("Topics"))
            .item(El::new().child_signal(self.clusters.signal().map(move |state| {
                let date = state.date;
                match state.status {
                    ClustersStatus::Loading => muted_text("Loading topics…").unify(),
                    ClustersStatus::Loaded(clusters) if clusters.is_empty() => {
                        muted_text(&format!("No topics for {}.", date)).unify()
                    }
                    ClustersStatus::Loaded(clusters) => Column::new()
                        .s(Gap::new().y(8))
                        .items(
                            clusters
                                .into_iter()
                                .enumerate()
                                .map(|(position, cluster)| cluster_card(&app, date, position, cluster)),
                        )
                        .unify(),
                    ClustersStatus::Failed(error) => inline_error_view(error).unify(),
                }
            })))
    }

    fn summary_panel(&self) -> impl Element + use<> {
        Column::new()
            .s(Width::exact(360))
            .s(Gap::new().y(10))
            .item(section_title("Summary"))
            .item(El::new().child_signal(self.summary.signal().map(|state| match state {
                SummaryState::Idle => muted_text("Select a topic to read its summary.").unify(),
                SummaryState::Loading { cluster_index } => {
                    muted_text(&format!("Loading summary of {}…", topic_label(cluster_index))).unify()
                }
                SummaryState::Ready { summary: Some(summary), .. } => Paragraph::new()
                    .s(Font::new().size(14).line_height(22))
                    .content(Text::new(summary))
                    .unify(),
                SummaryState::Ready { summary: None, .. } => {
                    muted_text("No summary available for this topic.").unify()
                }
                SummaryState::Failed { error, .. } => inline_error_view(error).unify(),
            })))
    }

    fn article_panel(&self) -> impl Element + use<> {
        El::new().child_signal(self.article.signal().map(|status| match status {
            ArticleStatus::Idle => None,
            ArticleStatus::Loading(title) => {
                Some(muted_text(&format!("Loading revision history of '{}'…", title)).unify())
            }
            ArticleStatus::Ready(title) => Some(
                El::new()
                    .s(Font::new().size(18).weight(FontWeight::SemiBold))
                    .child(Text::new(title))
                    .unify(),
            ),
            ArticleStatus::Failed(error) => Some(inline_error_view(error).unify()),
        }))
    }
}

fn cluster_card(app: &RevisionExplorerApp, date: NaiveDate, position: usize, cluster: Cluster) -> impl Element + use<> {
    let cluster_id = cluster.cluster_id;
    let header = El::new()
        .s(Font::new().size(15).weight(FontWeight::SemiBold))
        .s(Cursor::new(CursorIcon::Pointer))
        .update_raw_el(move |raw_el| match &cluster_id {
            Some(cluster_id) => raw_el.attr("title", &format!("Cluster {}", cluster_id)),
            None => raw_el,
        })
        .child(Text::new(topic_label(position)))
        .on_click({
            let app = app.clone();
            move || app.select_cluster(position, date)
        });

    Column::new()
        .s(Gap::new().y(4))
        .s(Padding::all(10))
        .s(RoundedCorners::all(6))
        .s(Borders::all(Border::new().width(1).color("rgb(226, 232, 240)")))
        .item(header)
        .item(
            Row::new()
                .s(Gap::new().x(10).y(4))
                .multiline()
                .items(cluster.wikipedia_articles.into_iter().map(|title| {
                    let app = app.clone();
                    El::new()
                        .s(Font::new().size(13).color(LINK_COLOR))
                        .s(Cursor::new(CursorIcon::Pointer))
                        .child(Text::new(title.clone()))
                        .on_click(move || app.open_article(title.clone()))
                })),
        )
}

fn topic_label(position: usize) -> String {
    format!("Topic #{}", position + 1)
}

fn section_title(text: &str) -> impl Element + use<> {
    El::new()
        .s(Font::new().size(13).weight(FontWeight::SemiBold).color(MUTED_TEXT))
        .child(Text::new(text.to_uppercase()))
}

fn muted_text(text: &str) -> impl Element + use<> {
    El::new()
        .s(Font::new().size(13).color(MUTED_TEXT))
        .child(Text::new(text.to_string()))
}

/// Native `<input type="date">`. Its change listener lives as long as the page.
fn date_input(app: RevisionExplorerApp, initial: NaiveDate) -> impl Element {
    let input = RawHtmlEl::new("input")
        .attr("type", "date")
        .attr("value", &initial.format("%Y-%m-%d").to_string())
        .style("padding", "4px 8px")
        .style("font-size", "14px");

    let element: web_sys::HtmlInputElement = input.dom_element().unchecked_into();
    let listener_element = element.clone();
    let on_change = Closure::wrap(Box::new(move |_event: web_sys::Event| {
        let value = listener_element.value();
        match parse_date_input(&value) {
            Some(date) => app.select_date(date),
            None => zoon::println!("Ignoring date input value '{}'", value),
        }
    }) as Box<dyn FnMut(web_sys::Event)>);
    match element.add_event_listener_with_callback("change", on_change.as_ref().unchecked_ref()) {
        Ok(()) => on_change.forget(),
        Err(error) => zoon::eprintln!("Failed to listen for date changes: {:?}", error),
    }

    input
}

/// `<input type="date">` reports `YYYY-MM-DD`, or an empty string when cleared.
fn parse_date_input(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Today's UTC date in the browser, minus two days.
fn default_date() -> NaiveDate {
    let now = js_sys::Date::new_0();
    let today = NaiveDate::from_ymd_opt(
        now.get_utc_full_year() as i32,
        now.get_utc_month() + 1,
        now.get_utc_date(),
    )
    .unwrap_or_default();
    two_days_before(today)
}

fn two_days_before(today: NaiveDate) -> NaiveDate {
    today.checked_sub_days(Days::new(2)).unwrap_or(today)
}
