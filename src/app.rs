use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

use crate::chain::api::DashboardApi;
use crate::chain::governor::GovernorClient;
use crate::config::AppConfig;
use crate::dashboard::cache::{CacheKey, RevalidationCache, Ticket};
use crate::dashboard::loader::{DaoSource, DashboardLoader, ProposalStateSource};
use crate::dashboard::view::{self, ProposalSection, ViewState};
use crate::dashboard::{unix_now, Address, LiveDao};
use crate::error::DashboardError;
use crate::theme::Theme;

/// Status messages clear after this many seconds
const STATUS_MESSAGE_SECONDS: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Auctions,
    Proposals,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    None,
    Connect, // Address prompt
    Help,
}

/// Result of one background `assemble`, delivered back to the UI loop
#[derive(Debug)]
pub struct LoadEvent {
    pub ticket: Ticket,
    pub result: Result<Vec<LiveDao>, DashboardError>,
}

pub struct App<D = DashboardApi, P = GovernorClient> {
    pub section: Section,
    pub popup: Popup,

    // Connected account; None means nothing to load
    pub address: Option<Address>,

    // Loaded data lives here, keyed by (namespace, address)
    pub cache: RevalidationCache<Vec<LiveDao>>,

    // Explicit refresh in flight, if any
    mutation: Option<Ticket>,

    // Selection state
    pub selected_card: usize,
    pub proposal_scroll: usize,

    // Address prompt buffer
    pub input_buffer: String,

    // Status message (shown in info line, auto-clears after timeout)
    pub status_message: Option<String>,
    pub status_message_time: Option<Instant>,

    pub config: AppConfig,
    pub theme: Theme,

    loader: Arc<DashboardLoader<D, P>>,
    events_tx: mpsc::UnboundedSender<LoadEvent>,
    events_rx: mpsc::UnboundedReceiver<LoadEvent>,

    // Periodic revalidation bookkeeping
    last_revalidation: Instant,

    // Auctions ending after this unix time trigger a refresh
    auction_watermark: u64,

    // Whether account changes are written back to the config file
    persist_config: bool,
}

impl<D, P> App<D, P> {
    pub fn cache_key(&self) -> Option<CacheKey> {
        self.address.clone().map(CacheKey::dashboard)
    }

    pub fn view_state(&self) -> ViewState<'_> {
        let entry = self
            .address
            .as_ref()
            .and_then(|address| self.cache.entry(&CacheKey::dashboard(address.clone())));
        ViewState::resolve(self.address.as_ref(), entry, self.is_mutating())
    }

    pub fn is_mutating(&self) -> bool {
        self.mutation.is_some()
    }

    pub fn selected_card_key(&self) -> Option<String> {
        match self.view_state() {
            ViewState::Loaded(daos) => daos.get(self.selected_card).map(|dao| dao.card_key()),
            _ => None,
        }
    }

    fn card_count(&self) -> usize {
        match self.view_state() {
            ViewState::Loaded(daos) => daos.len(),
            _ => 0,
        }
    }

    /// Number of rows in the proposals pane
    pub fn proposal_rows(&self) -> usize {
        match self.view_state() {
            ViewState::Loaded(daos) => match view::sections(daos).proposals {
                ProposalSection::Live(blocks) => {
                    blocks.iter().map(|dao| dao.proposals.len() + 1).sum()
                }
                ProposalSection::Empty => 0,
            },
            _ => 0,
        }
    }

    /// Text for the info line describing background activity
    pub fn activity(&self) -> Option<&'static str> {
        if self.is_mutating() {
            Some("Refreshing…")
        } else {
            None
        }
    }
}

impl<D, P> App<D, P>
where
    D: DaoSource + Send + Sync + 'static,
    P: ProposalStateSource + Send + Sync + 'static,
{
    pub fn new(config: AppConfig, loader: DashboardLoader<D, P>, address: Option<Address>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let theme = Theme::from_config(&config.theme);

        let mut app = Self {
            section: Section::Auctions,
            popup: Popup::None,

            address: None,
            cache: RevalidationCache::new(),
            mutation: None,

            selected_card: 0,
            proposal_scroll: 0,

            input_buffer: String::new(),

            status_message: None,
            status_message_time: None,

            config,
            theme,

            loader: Arc::new(loader),
            events_tx,
            events_rx,

            last_revalidation: Instant::now(),
            auction_watermark: unix_now(),
            persist_config: true,
        };

        if let Some(address) = address {
            app.set_address(address);
        }

        app
    }

    /// Keep account changes out of the config file
    pub fn without_persistence(mut self) -> Self {
        self.persist_config = false;
        self
    }

    /// Set a status message (auto-clears after 3 seconds)
    fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_message_time = Some(Instant::now());
    }

    /// Switch to `address` and load it
    pub fn connect(&mut self, address: Address) {
        tracing::info!(address = %address, "Connected account");
        self.set_address(address.clone());
        self.set_status(format!("Connected {}", address.short()));

        if self.persist_config {
            self.config.address = Some(address);
            if let Err(e) = self.config.save() {
                tracing::warn!("Failed to save config: {}", e);
            }
        }
    }

    pub fn disconnect(&mut self) {
        let Some(address) = self.address.take() else { return };
        tracing::info!("Disconnected account");
        self.cache.clear(&CacheKey::dashboard(address));
        self.mutation = None;
        self.selected_card = 0;
        self.proposal_scroll = 0;
        self.set_status("Disconnected");

        if self.persist_config {
            self.config.address = None;
            if let Err(e) = self.config.save() {
                tracing::warn!("Failed to save config: {}", e);
            }
        }
    }

    fn set_address(&mut self, address: Address) {
        // A refresh of the previous account no longer blocks this one
        if self.address.as_ref() != Some(&address) {
            self.mutation = None;
        }
        self.address = Some(address);
        self.selected_card = 0;
        self.proposal_scroll = 0;
        self.revalidate();
    }

    /// Ordinary refetch of the current key; skipped if one is in flight
    pub fn revalidate(&mut self) {
        let Some(key) = self.cache_key() else { return };
        self.last_revalidation = Instant::now();
        if let Some(ticket) = self.cache.begin_revalidation(&key) {
            tracing::debug!(key = %key, "Revalidating");
            self.spawn_load(ticket);
        }
    }

    /// Explicit invalidate-and-refetch. The loaded screen stays up while it
    /// runs instead of switching to the loading state.
    pub fn refresh(&mut self) {
        let Some(key) = self.cache_key() else { return };
        if self.is_mutating() {
            self.set_status("Refresh already in progress");
            return;
        }
        tracing::info!(key = %key, "Refreshing dashboard");
        self.last_revalidation = Instant::now();
        let ticket = self.cache.begin_mutation(&key);
        self.mutation = Some(ticket.clone());
        self.spawn_load(ticket);
    }

    fn spawn_load(&self, ticket: Ticket) {
        let loader = Arc::clone(&self.loader);
        let tx = self.events_tx.clone();
        let address = ticket.key.address.clone();

        tokio::spawn(async move {
            let result = loader.assemble(&address).await;
            // Receiver only goes away on shutdown
            let _ = tx.send(LoadEvent { ticket, result });
        });
    }

    /// Fold a finished load into the cache
    pub fn apply_load(&mut self, event: LoadEvent) {
        let LoadEvent { ticket, result } = event;
        let key = ticket.key.clone();
        let ends_mutation = self.mutation.as_ref() == Some(&ticket);

        let outcome = match result {
            Ok(daos) => {
                tracing::info!(key = %key, kind = ?ticket.kind, daos = daos.len(), "Dashboard loaded");
                Ok(daos)
            }
            Err(e) => {
                tracing::error!(key = %key, kind = ?ticket.kind, error = %e, "Dashboard load failed");
                Err(e.to_string())
            }
        };
        let succeeded = outcome.is_ok();
        let selected = self.selected_card_key();

        let applied = self.cache.settle(ticket, outcome);

        if ends_mutation {
            self.mutation = None;
            if succeeded {
                self.set_status("Dashboard refreshed");
            }
        }

        if applied && succeeded && self.cache_key().as_ref() == Some(&key) {
            self.auction_watermark = self.auction_watermark.max(unix_now());
            self.restore_selection(selected);
        }
    }

    /// Wait for the next background load and apply it
    #[cfg(test)]
    pub async fn next_load(&mut self) {
        if let Some(event) = self.events_rx.recv().await {
            self.apply_load(event);
        }
    }

    /// Follow the previously selected auction card to its new position
    fn restore_selection(&mut self, selected: Option<String>) {
        let position = match (selected, self.view_state()) {
            (Some(key), ViewState::Loaded(daos)) => daos.iter().position(|dao| dao.card_key() == key),
            _ => None,
        };
        if let Some(index) = position {
            self.selected_card = index;
        }
        self.clamp_selection();
    }

    fn clamp_selection(&mut self) {
        let cards = self.card_count();
        if self.selected_card >= cards {
            self.selected_card = cards.saturating_sub(1);
        }
        let rows = self.proposal_rows();
        if self.proposal_scroll >= rows {
            self.proposal_scroll = rows.saturating_sub(1);
        }
    }

    pub async fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        // Handle popups first
        if self.popup != Popup::None {
            return self.handle_popup_key(key);
        }

        self.handle_normal_key(key)
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Tab | KeyCode::BackTab => {
                self.section = match self.section {
                    Section::Auctions => Section::Proposals,
                    Section::Proposals => Section::Auctions,
                };
            }

            KeyCode::Char('j') | KeyCode::Down => self.move_down(),
            KeyCode::Char('k') | KeyCode::Up => self.move_up(),

            KeyCode::Char('R') | KeyCode::Char('r') => self.refresh_from_key(),

            KeyCode::Char('c') => {
                self.input_buffer = self
                    .address
                    .as_ref()
                    .map(|a| a.to_string())
                    .unwrap_or_default();
                self.popup = Popup::Connect;
            }

            KeyCode::Char('x') => self.disconnect(),

            KeyCode::Char('?') | KeyCode::Char('h') => self.popup = Popup::Help,

            _ => {}
        }
        Ok(())
    }

    fn handle_popup_key(&mut self, key: KeyEvent) -> Result<()> {
        match self.popup {
            Popup::Connect => match key.code {
                KeyCode::Esc => {
                    self.input_buffer.clear();
                    self.popup = Popup::None;
                }
                KeyCode::Enter => match Address::parse(&self.input_buffer) {
                    Ok(address) => {
                        self.input_buffer.clear();
                        self.popup = Popup::None;
                        if self.address.as_ref() != Some(&address) {
                            self.connect(address);
                        }
                    }
                    Err(e) => self.set_status(e.to_string()),
                },
                KeyCode::Backspace => {
                    self.input_buffer.pop();
                }
                KeyCode::Char(c) => {
                    if c.is_ascii_hexdigit() || c == 'x' || c == 'X' {
                        self.input_buffer.push(c);
                    }
                }
                _ => {}
            },
            Popup::Help => {
                if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('h') | KeyCode::Enter | KeyCode::Char('q')) {
                    self.popup = Popup::None;
                }
            }
            Popup::None => {}
        }
        Ok(())
    }

    fn refresh_from_key(&mut self) {
        match self.view_state() {
            ViewState::Loaded(_) => self.refresh(),
            ViewState::Error => self.revalidate(),
            ViewState::Loading => self.set_status("Already loading"),
            ViewState::Unconnected => self.set_status("Connect an address first (c)"),
        }
    }

    fn move_down(&mut self) {
        match self.section {
            Section::Auctions => {
                let cards = self.card_count();
                if cards > 0 {
                    self.selected_card = (self.selected_card + 1) % cards;
                }
            }
            Section::Proposals => {
                let rows = self.proposal_rows();
                if self.proposal_scroll + 1 < rows {
                    self.proposal_scroll += 1;
                }
            }
        }
    }

    fn move_up(&mut self) {
        match self.section {
            Section::Auctions => {
                let cards = self.card_count();
                if cards > 0 {
                    self.selected_card = self.selected_card.checked_sub(1).unwrap_or(cards - 1);
                }
            }
            Section::Proposals => {
                self.proposal_scroll = self.proposal_scroll.saturating_sub(1);
            }
        }
    }

    pub async fn tick(&mut self) -> Result<()> {
        // Apply finished loads
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply_load(event);
        }

        // Clear status message after 3 seconds
        if let Some(time) = self.status_message_time {
            if time.elapsed().as_secs() >= STATUS_MESSAGE_SECONDS {
                self.status_message = None;
                self.status_message_time = None;
            }
        }

        // Periodic revalidation
        if let Some(interval) = self.config.refresh_interval() {
            if self.last_revalidation.elapsed() >= interval {
                self.revalidate();
            }
        }

        if self.config.refresh_on_auction_end {
            self.refresh_if_auction_ended(unix_now());
        }

        Ok(())
    }

    /// Refresh once when a shown auction ends after the last load
    fn refresh_if_auction_ended(&mut self, now: u64) {
        let ViewState::Loaded(daos) = self.view_state() else { return };

        let ended = daos.iter().any(|dao| {
            let end = dao.current_auction.end_time;
            end > self.auction_watermark && end <= now
        });

        if ended {
            tracing::info!("Auction ended, refreshing dashboard");
            self.auction_watermark = now;
            self.refresh();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::fixtures::{address, dao, proposal};
    use crate::dashboard::loader::mock::{MockDaos, MockStates};
    use crate::dashboard::ProposalState;
    use crossterm::event::KeyModifiers;
    use tokio::sync::Notify;

    fn id(number: u64) -> String {
        proposal(number).proposal_id
    }

    fn app(daos: MockDaos, states: MockStates, address: Option<Address>) -> App<MockDaos, MockStates> {
        App::new(AppConfig::default(), DashboardLoader::new(daos, states), address)
            .without_persistence()
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[tokio::test]
    async fn test_no_address_is_unconnected_and_fetches_nothing() {
        let daos = MockDaos::new(vec![vec![dao("Unused", vec![])]]);
        let mut app = app(daos.clone(), MockStates::default(), None);

        assert_eq!(app.view_state(), ViewState::Unconnected);
        app.tick().await.unwrap();
        assert_eq!(app.view_state(), ViewState::Unconnected);
        assert_eq!(daos.call_count(), 0);
    }

    #[tokio::test]
    async fn test_connect_loads_the_dashboard() {
        let daos = MockDaos::new(vec![vec![dao("Purple", vec![proposal(1), proposal(2)])]]);
        let states = MockStates::new([
            (id(1), ProposalState::Active),
            (id(2), ProposalState::Executed),
        ]);
        let mut app = app(daos, states, None);

        app.connect(address());
        assert_eq!(app.view_state(), ViewState::Loading);

        app.next_load().await;
        match app.view_state() {
            ViewState::Loaded(daos) => {
                assert_eq!(daos.len(), 1);
                assert_eq!(daos[0].proposals.len(), 1);
                assert_eq!(daos[0].proposals[0].proposal_state, ProposalState::Active);
                assert!(view::has_live_proposals(daos));
            }
            other => panic!("expected loaded, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_lookup_shows_error_not_partial_data() {
        let daos = MockDaos::new(vec![vec![
            dao("Good", vec![proposal(1)]),
            dao("Bad", vec![proposal(2)]),
        ]]);
        // proposal 2 is unknown to the mock governor
        let states = MockStates::new([(id(1), ProposalState::Active)]);
        let mut app = app(daos, states, Some(address()));

        app.next_load().await;
        assert_eq!(app.view_state(), ViewState::Error);
    }

    #[tokio::test]
    async fn test_no_live_proposals_still_shows_cards() {
        let daos = MockDaos::new(vec![vec![
            dao("One", vec![proposal(1)]),
            dao("Two", vec![proposal(2)]),
        ]]);
        let states = MockStates::new([
            (id(1), ProposalState::Defeated),
            (id(2), ProposalState::Executed),
        ]);
        let mut app = app(daos, states, Some(address()));

        app.next_load().await;
        let ViewState::Loaded(daos) = app.view_state() else {
            panic!("expected loaded");
        };
        let sections = view::sections(daos);
        assert_eq!(sections.auction_cards.len(), 2);
        assert_eq!(sections.proposals, ProposalSection::Empty);
        assert_eq!(app.proposal_rows(), 0);
    }

    #[tokio::test]
    async fn test_refresh_suppresses_loading_then_shows_new_data() {
        let daos = MockDaos::new(vec![
            vec![dao("Before", vec![])],
            vec![dao("After", vec![proposal(1)])],
        ]);
        let gate = Arc::new(Notify::new());
        let states = MockStates::new([(id(1), ProposalState::Queued)]).gated(gate.clone());
        let mut app = app(daos, states, Some(address()));

        // First load has no proposals, so the gate is never hit
        app.next_load().await;
        assert!(matches!(app.view_state(), ViewState::Loaded(d) if d[0].name == "Before"));

        app.handle_key(key(KeyCode::Char('R'))).await.unwrap();
        assert!(app.is_mutating());
        assert_eq!(app.activity(), Some("Refreshing…"));

        // Let the spawned load reach the parked lookup
        tokio::task::yield_now().await;
        app.tick().await.unwrap();
        assert!(matches!(app.view_state(), ViewState::Loaded(d) if d[0].name == "Before"));

        gate.notify_one();
        app.next_load().await;

        assert!(!app.is_mutating());
        match app.view_state() {
            ViewState::Loaded(daos) => {
                assert_eq!(daos[0].name, "After");
                assert_eq!(daos[0].proposals[0].proposal_state, ProposalState::Queued);
            }
            other => panic!("expected loaded, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_revalidation_without_refresh_shows_loading() {
        let daos = MockDaos::new(vec![vec![dao("Only", vec![])]]);
        let mut app = app(daos.clone(), MockStates::default(), Some(address()));
        app.next_load().await;
        assert!(matches!(app.view_state(), ViewState::Loaded(_)));

        app.revalidate();
        assert_eq!(app.view_state(), ViewState::Loading);
        app.next_load().await;
        assert!(matches!(app.view_state(), ViewState::Loaded(_)));
        assert_eq!(daos.call_count(), 2);
    }

    #[tokio::test]
    async fn test_error_then_retry_recovers() {
        let daos = MockDaos::new(vec![vec![dao("Flaky", vec![proposal(1)])]]);
        let states = MockStates::default();
        let mut app = app(daos, states, Some(address()));
        app.next_load().await;
        assert_eq!(app.view_state(), ViewState::Error);

        // Swap in a governor that knows the proposal
        let daos = MockDaos::new(vec![vec![dao("Flaky", vec![proposal(1)])]]);
        let states = MockStates::new([(id(1), ProposalState::Pending)]);
        app.loader = Arc::new(DashboardLoader::new(daos, states));

        app.handle_key(key(KeyCode::Char('R'))).await.unwrap();
        app.next_load().await;
        assert!(matches!(app.view_state(), ViewState::Loaded(d) if d[0].proposals.len() == 1));
    }

    #[tokio::test]
    async fn test_disconnect_returns_to_unconnected() {
        let daos = MockDaos::new(vec![vec![dao("Any", vec![])]]);
        let mut app = app(daos, MockStates::default(), Some(address()));
        app.next_load().await;

        app.handle_key(key(KeyCode::Char('x'))).await.unwrap();
        assert_eq!(app.view_state(), ViewState::Unconnected);
        assert!(app.address.is_none());
    }

    #[tokio::test]
    async fn test_connect_prompt() {
        let daos = MockDaos::new(vec![vec![dao("Prompted", vec![])]]);
        let mut app = app(daos, MockStates::default(), None);

        app.handle_key(key(KeyCode::Char('c'))).await.unwrap();
        assert_eq!(app.popup, Popup::Connect);

        for c in "0x12".chars() {
            app.handle_key(key(KeyCode::Char(c))).await.unwrap();
        }
        app.handle_key(key(KeyCode::Enter)).await.unwrap();
        // Too short: prompt stays open with an error
        assert_eq!(app.popup, Popup::Connect);
        assert!(app.status_message.is_some());
        assert!(app.address.is_none());

        for c in "34567890123456789012345678901234567890".chars() {
            app.handle_key(key(KeyCode::Char(c))).await.unwrap();
        }
        app.handle_key(key(KeyCode::Enter)).await.unwrap();
        assert_eq!(app.popup, Popup::None);
        assert_eq!(
            app.address.as_ref().map(Address::as_str),
            Some("0x1234567890123456789012345678901234567890")
        );

        app.next_load().await;
        assert!(matches!(app.view_state(), ViewState::Loaded(_)));
    }

    #[tokio::test]
    async fn test_auction_end_triggers_one_refresh() {
        let mut ending = dao("Ending", vec![]);
        ending.current_auction.end_time = unix_now() + 60;
        let daos = MockDaos::new(vec![vec![ending]]);
        let mut app = app(daos.clone(), MockStates::default(), Some(address()));
        app.next_load().await;

        // Not ended yet
        app.refresh_if_auction_ended(unix_now());
        assert!(!app.is_mutating());

        app.refresh_if_auction_ended(unix_now() + 120);
        assert!(app.is_mutating());
        app.next_load().await;
        assert_eq!(daos.call_count(), 2);

        // Same auction again: already handled
        app.refresh_if_auction_ended(unix_now() + 180);
        assert!(!app.is_mutating());
    }

    #[tokio::test]
    async fn test_selection_wraps() {
        let daos = MockDaos::new(vec![vec![dao("A", vec![]), dao("B", vec![])]]);
        let mut app = app(daos, MockStates::default(), Some(address()));
        app.next_load().await;

        app.handle_key(key(KeyCode::Down)).await.unwrap();
        assert_eq!(app.selected_card, 1);
        app.handle_key(key(KeyCode::Down)).await.unwrap();
        assert_eq!(app.selected_card, 0);
        app.handle_key(key(KeyCode::Up)).await.unwrap();
        assert_eq!(app.selected_card, 1);
    }

    #[tokio::test]
    async fn test_selection_follows_card_across_reload() {
        let daos = MockDaos::new(vec![
            vec![dao("A", vec![]), dao("BB", vec![])],
            vec![dao("CCC", vec![]), dao("BB", vec![]), dao("A", vec![])],
        ]);
        let mut app = app(daos, MockStates::default(), Some(address()));
        app.next_load().await;

        app.handle_key(key(KeyCode::Down)).await.unwrap();
        let selected = app.selected_card_key();

        app.refresh();
        app.next_load().await;
        assert_eq!(app.selected_card, 1);
        assert_eq!(app.selected_card_key(), selected);
    }

    #[tokio::test]
    async fn test_disconnect_drops_cached_dashboard() {
        let daos = MockDaos::new(vec![vec![dao("Cached", vec![])]]);
        let mut app = app(daos, MockStates::default(), Some(address()));
        app.next_load().await;
        let key = app.cache_key().unwrap();

        app.disconnect();
        assert!(app.cache.entry(&key).is_none());

        // Reconnecting starts from a fresh load
        app.connect(address());
        assert_eq!(app.view_state(), ViewState::Loading);
        app.next_load().await;
        assert!(matches!(app.view_state(), ViewState::Loaded(_)));
    }

    #[tokio::test]
    async fn test_switching_account_mid_refresh() {
        let other = Address::parse("0x1111111111111111111111111111111111111111").unwrap();
        let daos = MockDaos::new(vec![
            vec![dao("First", vec![])],
            vec![dao("First", vec![proposal(1)])],
            vec![dao("Second", vec![])],
            vec![dao("Second", vec![proposal(1)])],
        ]);
        let gate = Arc::new(Notify::new());
        let states = MockStates::new([(id(1), ProposalState::Active)]).gated(gate.clone());
        let mut app = app(daos, states, Some(address()));
        app.next_load().await;

        // Refresh of the first account parks in its governor lookup
        app.refresh();
        assert!(app.is_mutating());
        tokio::task::yield_now().await;

        app.disconnect();
        assert!(!app.is_mutating());
        app.connect(other);
        app.next_load().await;
        assert!(matches!(app.view_state(), ViewState::Loaded(d) if d[0].name == "Second"));

        app.handle_key(key(KeyCode::Char('R'))).await.unwrap();
        assert!(app.is_mutating());
        assert_ne!(app.status_message.as_deref(), Some("Refresh already in progress"));
        tokio::task::yield_now().await;

        // The stale refresh settles first and must not end the current one
        gate.notify_one();
        app.next_load().await;
        assert!(app.is_mutating());
        assert!(matches!(app.view_state(), ViewState::Loaded(d) if d[0].name == "Second"));

        gate.notify_one();
        app.next_load().await;
        assert!(!app.is_mutating());
        match app.view_state() {
            ViewState::Loaded(daos) => {
                assert_eq!(daos[0].name, "Second");
                assert_eq!(daos[0].proposals.len(), 1);
            }
            other => panic!("expected loaded, got {:?}", other),
        }
    }
}
