//! Versioned, observable canvas state.
//!
//! All writes go through [`CanvasStore`] actions, each of which:
//! 1. skips deep-equal payloads,
//! 2. asks the [`MutationGateway`] for admission,
//! 3. applies the change and, unless silent, bumps the version and records
//!    undo history,
//! 4. notifies subscribers.

use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::gateway::{LimiterSnapshot, MutationGateway, MutationMode, MutationOutcome};
use crate::history::{HistorySnapshot, TemporalHistory};
use crate::model::{Component, Connection, EntityId, InfoCard, PersistedPreferences, Stroke, ViewPreferences};
use crate::storage::{self, KeyValueStore, StorageResult};
use crate::surface::DrawingHost;
use kurbo::Rect;
use serde::Serialize;
use std::fmt;

/// Full canvas state at one version.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasState {
    pub components: Vec<Component>,
    pub connections: Vec<Connection>,
    pub info_cards: Vec<InfoCard>,
    pub strokes: Vec<Stroke>,
    pub selected_component: Option<EntityId>,
    /// Component a connection drag started from.
    pub connection_start: Option<EntityId>,
    pub view: ViewPreferences,
    pub version: u64,
    /// Clock reading of the last tracked mutation.
    pub last_updated: Option<f64>,
    pub last_action: Option<String>,
}

impl CanvasState {
    fn history_snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            components: self.components.clone(),
            connections: self.connections.clone(),
            info_cards: self.info_cards.clone(),
            strokes: self.strokes.clone(),
        }
    }

    fn restore(&mut self, snapshot: HistorySnapshot) {
        self.components = snapshot.components;
        self.connections = snapshot.connections;
        self.info_cards = snapshot.info_cards;
        self.strokes = snapshot.strokes;
    }

    fn is_blank(&self) -> bool {
        self.components.is_empty()
            && self.connections.is_empty()
            && self.info_cards.is_empty()
            && self.strokes.is_empty()
            && self.selected_component.is_none()
            && self.connection_start.is_none()
    }
}

/// Passed to subscribers after every applied mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationEvent {
    pub action: &'static str,
    pub mode: MutationMode,
    pub version: u64,
}

pub type SubscriptionId = u64;

type Listener = Box<dyn FnMut(&CanvasState, &MutationEvent)>;

/// Compare-and-swap style guards for scalar fields.
///
/// The outer `Option` says whether the guard is set; the inner one is the
/// value compared against, so `Some(None)` means "currently nothing".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScalarOptions {
    pub only_if_current_is: Option<Option<EntityId>>,
    pub prevent_when_current_is: Option<Option<EntityId>>,
    pub mode: MutationMode,
}

impl ScalarOptions {
    pub fn only_if(mut self, current: Option<&str>) -> Self {
        self.only_if_current_is = Some(current.map(str::to_string));
        self
    }

    pub fn unless(mut self, current: Option<&str>) -> Self {
        self.prevent_when_current_is = Some(current.map(str::to_string));
        self
    }

    pub fn silent(mut self) -> Self {
        self.mode = MutationMode::Silent;
        self
    }

    fn permits(&self, current: Option<&str>) -> bool {
        if let Some(expected) = &self.only_if_current_is {
            if expected.as_deref() != current {
                return false;
            }
        }
        if let Some(forbidden) = &self.prevent_when_current_is {
            if forbidden.as_deref() == current {
                return false;
            }
        }
        true
    }
}

/// Counters for a debug overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    pub version: u64,
    pub components: usize,
    pub connections: usize,
    pub info_cards: usize,
    pub strokes: usize,
    pub last_updated: Option<f64>,
    pub last_action: Option<String>,
    pub undo_depth: usize,
    pub redo_depth: usize,
    pub limiter: LimiterSnapshot,
}

/// The canvas state container.
pub struct CanvasStore {
    state: CanvasState,
    initial: CanvasState,
    gateway: MutationGateway,
    history: TemporalHistory,
    clock: Box<dyn Clock>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: SubscriptionId,
}

impl fmt::Debug for CanvasStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanvasStore")
            .field("version", &self.state.version)
            .field("gateway", &self.gateway)
            .field("history", &self.history)
            .field("clock", &self.clock)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for CanvasStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasStore {
    pub fn new() -> Self {
        Self::with_state(CanvasState::default())
    }

    /// Start from a given state, e.g. a loaded diagram or a test fixture.
    pub fn with_state(state: CanvasState) -> Self {
        let mut store = Self::with_config(StoreConfig::default(), Box::new(SystemClock::new()));
        store.initial = state.clone();
        store.state = state;
        store
    }

    pub fn with_config(config: StoreConfig, clock: Box<dyn Clock>) -> Self {
        Self {
            state: CanvasState::default(),
            initial: CanvasState::default(),
            gateway: MutationGateway::new(config.gateway),
            history: TemporalHistory::new(config.history.max_depth),
            clock,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Replace the initial state that [`CanvasStore::reset_all`] returns to.
    pub fn with_initial_state(mut self, state: CanvasState) -> Self {
        self.initial = state.clone();
        self.state = state;
        self
    }

    /// Back to the constructor state: content, limiter, history and
    /// subscriptions.
    pub fn reset_all(&mut self) {
        self.state = self.initial.clone();
        self.gateway.reset();
        self.history.clear();
        self.listeners.clear();
    }

    // Collections

    pub fn set_components(&mut self, components: Vec<Component>, mode: MutationMode) -> MutationOutcome {
        self.replace("setComponents", components, mode, |s| &mut s.components)
    }

    pub fn update_components(
        &mut self,
        updater: impl FnOnce(&[Component]) -> Vec<Component>,
        mode: MutationMode,
    ) -> MutationOutcome {
        let next = updater(&self.state.components);
        self.replace("updateComponents", next, mode, |s| &mut s.components)
    }

    pub fn set_connections(&mut self, connections: Vec<Connection>, mode: MutationMode) -> MutationOutcome {
        self.replace("setConnections", connections, mode, |s| &mut s.connections)
    }

    pub fn update_connections(
        &mut self,
        updater: impl FnOnce(&[Connection]) -> Vec<Connection>,
        mode: MutationMode,
    ) -> MutationOutcome {
        let next = updater(&self.state.connections);
        self.replace("updateConnections", next, mode, |s| &mut s.connections)
    }

    pub fn set_info_cards(&mut self, info_cards: Vec<InfoCard>, mode: MutationMode) -> MutationOutcome {
        self.replace("setInfoCards", info_cards, mode, |s| &mut s.info_cards)
    }

    pub fn update_info_cards(
        &mut self,
        updater: impl FnOnce(&[InfoCard]) -> Vec<InfoCard>,
        mode: MutationMode,
    ) -> MutationOutcome {
        let next = updater(&self.state.info_cards);
        self.replace("updateInfoCards", next, mode, |s| &mut s.info_cards)
    }

    pub fn set_strokes(&mut self, strokes: Vec<Stroke>, mode: MutationMode) -> MutationOutcome {
        self.replace("setStrokes", strokes, mode, |s| &mut s.strokes)
    }

    pub fn update_strokes(
        &mut self,
        updater: impl FnOnce(&[Stroke]) -> Vec<Stroke>,
        mode: MutationMode,
    ) -> MutationOutcome {
        let next = updater(&self.state.strokes);
        self.replace("updateStrokes", next, mode, |s| &mut s.strokes)
    }

    /// Append a stroke, replacing any stroke with the same id in place.
    pub fn add_stroke(&mut self, stroke: Stroke, mode: MutationMode) -> MutationOutcome {
        let mut next = self.state.strokes.clone();
        match next.iter_mut().find(|s| s.id == stroke.id) {
            Some(existing) => *existing = stroke,
            None => next.push(stroke),
        }
        self.replace("addStroke", next, mode, |s| &mut s.strokes)
    }

    pub fn delete_stroke(&mut self, stroke_id: &str, mode: MutationMode) -> MutationOutcome {
        let next: Vec<Stroke> = self
            .state
            .strokes
            .iter()
            .filter(|s| s.id != stroke_id)
            .cloned()
            .collect();
        self.replace("deleteStroke", next, mode, |s| &mut s.strokes)
    }

    // Scalars

    pub fn set_selected_component(&mut self, id: Option<EntityId>, options: ScalarOptions) -> MutationOutcome {
        self.set_scalar("setSelectedComponent", id, options, |s| &mut s.selected_component)
    }

    pub fn set_connection_start(&mut self, id: Option<EntityId>, options: ScalarOptions) -> MutationOutcome {
        self.set_scalar("setConnectionStart", id, options, |s| &mut s.connection_start)
    }

    pub fn set_view_preferences(&mut self, view: ViewPreferences, mode: MutationMode) -> MutationOutcome {
        if self.state.view == view {
            return MutationOutcome::Unchanged;
        }
        self.commit("setViewPreferences", mode, false, move |s| s.view = view)
    }

    /// Clear every collection and both scalars in a single mutation.
    pub fn reset_canvas(&mut self, mode: MutationMode) -> MutationOutcome {
        if self.state.is_blank() {
            return MutationOutcome::Unchanged;
        }
        let outcome = self.commit("resetCanvas", mode, true, |s| {
            s.components.clear();
            s.connections.clear();
            s.info_cards.clear();
            s.strokes.clear();
            s.selected_component = None;
            s.connection_start = None;
        });
        if outcome.is_applied() {
            log::info!("Canvas reset at version {}", self.state.version);
        }
        outcome
    }

    // History

    pub fn undo(&mut self) -> MutationOutcome {
        self.step_history("undo", TemporalHistory::can_undo, TemporalHistory::undo)
    }

    pub fn redo(&mut self) -> MutationOutcome {
        self.step_history("redo", TemporalHistory::can_redo, TemporalHistory::redo)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    // Selectors

    pub fn state(&self) -> &CanvasState {
        &self.state
    }

    pub fn version(&self) -> u64 {
        self.state.version
    }

    pub fn components(&self) -> &[Component] {
        &self.state.components
    }

    pub fn connections(&self) -> &[Connection] {
        &self.state.connections
    }

    pub fn info_cards(&self) -> &[InfoCard] {
        &self.state.info_cards
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.state.strokes
    }

    pub fn view(&self) -> &ViewPreferences {
        &self.state.view
    }

    pub fn selected_component(&self) -> Option<&str> {
        self.state.selected_component.as_deref()
    }

    pub fn connection_start(&self) -> Option<&str> {
        self.state.connection_start.as_deref()
    }

    pub fn component(&self, id: &str) -> Option<&Component> {
        self.state.components.iter().find(|c| c.id == id)
    }

    pub fn stroke(&self, id: &str) -> Option<&Stroke> {
        self.state.strokes.iter().find(|s| s.id == id)
    }

    /// Connections attached to a component at either end.
    pub fn connections_for(&self, component_id: &str) -> Vec<&Connection> {
        self.state
            .connections
            .iter()
            .filter(|c| c.touches(component_id))
            .collect()
    }

    /// Components whose bounds overlap `rect` (edges touching count).
    pub fn components_in_rect(&self, rect: Rect) -> Vec<&Component> {
        let rect = rect.abs();
        self.state
            .components
            .iter()
            .filter(|c| {
                let b = c.bounds();
                b.x0 <= rect.x1 && b.x1 >= rect.x0 && b.y0 <= rect.y1 && b.y1 >= rect.y0
            })
            .collect()
    }

    /// Bounding box of all content, for zoom-to-fit.
    pub fn bounds(&self) -> Option<Rect> {
        let components = self.state.components.iter().map(Component::bounds);
        let cards = self.state.info_cards.iter().map(InfoCard::bounds);
        let strokes = self
            .state
            .strokes
            .iter()
            .filter(|s| s.visible && !s.is_empty())
            .map(|s| s.bounds().inflate(s.width / 2.0, s.width / 2.0));
        components.chain(cards).chain(strokes).reduce(|a, b| a.union(b))
    }

    pub fn limiter_snapshot(&self) -> LimiterSnapshot {
        self.gateway.snapshot(self.clock.now_ms())
    }

    pub fn debug_info(&self) -> DebugInfo {
        DebugInfo {
            version: self.state.version,
            components: self.state.components.len(),
            connections: self.state.connections.len(),
            info_cards: self.state.info_cards.len(),
            strokes: self.state.strokes.len(),
            last_updated: self.state.last_updated,
            last_action: self.state.last_action.clone(),
            undo_depth: self.history.undo_depth(),
            redo_depth: self.history.redo_depth(),
            limiter: self.limiter_snapshot(),
        }
    }

    /// Direct access for wiring an external anomaly detector or tripping
    /// the breaker from the host.
    pub fn gateway_mut(&mut self) -> &mut MutationGateway {
        &mut self.gateway
    }

    // Observers

    /// Register a callback run after every applied mutation, in
    /// subscription order.
    pub fn subscribe(&mut self, listener: impl FnMut(&CanvasState, &MutationEvent) + 'static) -> SubscriptionId {
        self.next_subscription += 1;
        let id = self.next_subscription;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    // Preferences

    pub fn save_preferences(&self, store: &dyn KeyValueStore) -> StorageResult<()> {
        storage::save_preferences(store, &PersistedPreferences::from(&self.state.view))?;
        log::info!("Saved view preferences");
        Ok(())
    }

    /// Overlay persisted preferences onto the current view.
    pub fn load_preferences(&mut self, store: &dyn KeyValueStore) -> StorageResult<MutationOutcome> {
        let Some(persisted) = storage::load_preferences(store)? else {
            return Ok(MutationOutcome::Unchanged);
        };
        let mut view = self.state.view.clone();
        view.apply(&persisted);
        log::info!("Loaded view preferences");
        Ok(self.set_view_preferences(view, MutationMode::Tracked))
    }

    // Internals

    fn replace<T: PartialEq>(
        &mut self,
        action: &'static str,
        next: Vec<T>,
        mode: MutationMode,
        field: fn(&mut CanvasState) -> &mut Vec<T>,
    ) -> MutationOutcome {
        if *field(&mut self.state) == next {
            return MutationOutcome::Unchanged;
        }
        self.commit(action, mode, true, move |s| *field(s) = next)
    }

    fn set_scalar(
        &mut self,
        action: &'static str,
        value: Option<EntityId>,
        options: ScalarOptions,
        field: fn(&mut CanvasState) -> &mut Option<EntityId>,
    ) -> MutationOutcome {
        let current = field(&mut self.state);
        if !options.permits(current.as_deref()) {
            return MutationOutcome::Rejected;
        }
        if *current == value {
            return MutationOutcome::Unchanged;
        }
        self.commit(action, options.mode, false, move |s| *field(s) = value)
    }

    fn step_history(
        &mut self,
        action: &'static str,
        available: fn(&TemporalHistory) -> bool,
        step: fn(&mut TemporalHistory, HistorySnapshot) -> Option<HistorySnapshot>,
    ) -> MutationOutcome {
        if !available(&self.history) {
            return MutationOutcome::Unchanged;
        }
        let now = self.clock.now_ms();
        if !self.gateway.admit(action, MutationMode::Tracked, now) {
            return MutationOutcome::Dropped;
        }
        let current = self.state.history_snapshot();
        let Some(target) = step(&mut self.history, current) else {
            return MutationOutcome::Unchanged;
        };
        self.state.restore(target);
        self.finish(action, MutationMode::Tracked, now);
        MutationOutcome::Applied
    }

    fn commit(
        &mut self,
        action: &'static str,
        mode: MutationMode,
        undoable: bool,
        apply: impl FnOnce(&mut CanvasState),
    ) -> MutationOutcome {
        let now = self.clock.now_ms();
        if !self.gateway.admit(action, mode, now) {
            return MutationOutcome::Dropped;
        }

        let previous = (undoable && mode == MutationMode::Tracked).then(|| self.state.history_snapshot());
        apply(&mut self.state);
        if let Some(previous) = previous {
            let current = self.state.history_snapshot();
            self.history.record(previous, &current);
        }
        self.finish(action, mode, now);
        MutationOutcome::Applied
    }

    fn finish(&mut self, action: &'static str, mode: MutationMode, now: f64) {
        if mode == MutationMode::Tracked {
            self.state.version += 1;
            self.state.last_updated = Some(now);
            self.state.last_action = Some(action.to_string());
        }
        let event = MutationEvent {
            action,
            mode,
            version: self.state.version,
        };
        for (_, listener) in self.listeners.iter_mut() {
            listener(&self.state, &event);
        }
    }
}

impl DrawingHost for CanvasStore {
    fn on_stroke_complete(&mut self, stroke: Stroke) {
        let id = stroke.id.clone();
        if !self.add_stroke(stroke, MutationMode::Tracked).is_applied() {
            log::debug!("Stroke {} was not stored", id);
        }
    }

    fn on_stroke_delete(&mut self, stroke_id: &str) {
        if !self.delete_stroke(stroke_id, MutationMode::Tracked).is_applied() {
            log::debug!("Stroke {} was not deleted", stroke_id);
        }
    }
}
