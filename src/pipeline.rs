//! Viewport-driven map data pipeline
//!
//! Wires map-library viewport events through the debounce layer into the
//! query observer and hands every resolved result to the mounted rendering
//! surface:
//!
//! ```text
//! viewport events -> debounce (fixed | adaptive) -> MapDataQuery -> RenderSurface
//! ```
//!
//! Filter and enable changes take effect on the next tick without waiting
//! for the debounce window; only bounds changes are debounced.

use crate::core::config::{DebounceStrategy, PipelineOptions, PipelineProfile};
use crate::core::viewport::MapViewport;
use crate::debounce::adaptive::AdaptiveDebounce;
use crate::debounce::fixed::FixedDebounce;
use crate::model::filters::MapFilters;
use crate::query::fetcher::MapDataFetcher;
use crate::query::key::MapDataRequest;
use crate::query::observer::{MapDataQuery, QueryState, QueryStatus};
use crate::render::surface::{RenderSurface, SurfaceEvent, SurfaceFrame, SurfaceKind};
use crate::rpc::client::MarketplaceClient;
use crate::session::AppContext;
use crate::{MapError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Input accepted by [`MapDataPipeline::run`]
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Viewport(MapViewport),
    /// A frame was rendered; feeds the adaptive sampler
    Frame,
    Filters(MapFilters),
    Enabled(bool),
    /// Marks cached map data stale and refetches the current view
    Invalidate,
}

enum ViewportGate {
    Fixed(FixedDebounce<MapViewport>),
    Adaptive(AdaptiveDebounce<MapViewport>),
}

impl ViewportGate {
    fn from_options(options: &PipelineOptions) -> Self {
        match options.debounce.strategy {
            DebounceStrategy::Fixed => {
                Self::Fixed(FixedDebounce::new(options.debounce.bounds_delay()))
            }
            DebounceStrategy::Adaptive => {
                Self::Adaptive(AdaptiveDebounce::new(options.adaptive.clone()))
            }
        }
    }

    fn push(&mut self, viewport: MapViewport, now: Instant) {
        match self {
            Self::Fixed(d) => d.push(viewport, now),
            Self::Adaptive(d) => d.push(viewport, now),
        }
    }

    fn on_frame(&mut self, now: Instant) {
        if let Self::Adaptive(d) = self {
            d.on_frame(now);
        }
    }

    fn poll(&mut self, now: Instant) -> Option<MapViewport> {
        match self {
            Self::Fixed(d) => d.poll(now),
            Self::Adaptive(d) => d.poll(now),
        }
    }

    fn deadline(&self) -> Option<Instant> {
        match self {
            Self::Fixed(d) => d.deadline(),
            Self::Adaptive(d) => d.deadline(),
        }
    }

    fn delay(&self) -> Duration {
        match self {
            Self::Fixed(d) => d.delay(),
            Self::Adaptive(d) => d.current_delay(),
        }
    }

    fn cancel(&mut self) {
        match self {
            Self::Fixed(d) => d.cancel(),
            Self::Adaptive(d) => d.cancel(),
        }
    }
}

pub struct MapDataPipeline {
    gate: ViewportGate,
    filters: MapFilters,
    enabled: bool,
    committed: Option<MapViewport>,
    dirty: bool,
    query: Arc<MapDataQuery>,
    surface: Box<dyn RenderSurface>,
    context: AppContext,
}

impl MapDataPipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn query(&self) -> &Arc<MapDataQuery> {
        &self.query
    }

    pub fn state(&self) -> QueryState {
        self.query.state()
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub fn surface(&self) -> &dyn RenderSurface {
        &*self.surface
    }

    pub fn surface_mut(&mut self) -> &mut dyn RenderSurface {
        &mut *self.surface
    }

    pub fn filters(&self) -> &MapFilters {
        &self.filters
    }

    /// Last viewport that made it through the debounce window
    pub fn committed_viewport(&self) -> Option<&MapViewport> {
        self.committed.as_ref()
    }

    /// Quiet period currently applied to viewport changes
    pub fn debounce_delay(&self) -> Duration {
        self.gate.delay()
    }

    /// Request for the committed viewport and current filters
    pub fn request(&self) -> MapDataRequest {
        MapDataRequest::new(
            self.committed.map(|v| v.bounds),
            self.committed.map(|v| v.zoom).unwrap_or_default(),
            self.filters.clone(),
            self.enabled,
        )
    }

    /// Raw viewport change from the map library; restarts the debounce window
    pub fn on_viewport_changed(&mut self, viewport: MapViewport, now: Instant) {
        if !viewport.bounds.is_valid() {
            log::warn!("ignoring viewport with invalid bounds {:?}", viewport.bounds);
            return;
        }
        self.gate.push(viewport, now);
    }

    pub fn on_frame(&mut self, now: Instant) {
        self.gate.on_frame(now);
    }

    pub fn set_filters(&mut self, filters: MapFilters) {
        let filters = filters.normalized();
        if filters != self.filters {
            self.filters = filters;
            self.dirty = true;
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled != self.enabled {
            self.enabled = enabled;
            self.dirty = true;
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.gate.deadline()
    }

    /// Commits a debounced viewport if its window elapsed and resolves the
    /// query when anything changed. Returns the new state when a refresh ran.
    pub async fn tick(&mut self, now: Instant) -> Option<QueryState> {
        if let Some(viewport) = self.gate.poll(now) {
            if self.committed != Some(viewport) {
                log::debug!(
                    "viewport committed: {} z{}",
                    viewport.bounds.normalize_key(),
                    viewport.zoom_level()
                );
                self.committed = Some(viewport);
                self.dirty = true;
            }
        }
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(self.refresh().await)
    }

    /// Resolves the current request and pushes the result to the surface
    pub async fn refresh(&mut self) -> QueryState {
        let request = self.request();
        let needs_network = request.is_active()
            && self
                .query
                .fetcher()
                .peek(&request)
                .map(|cached| cached.is_stale)
                .unwrap_or(true);
        if needs_network {
            self.surface.set_loading(true);
        }

        let state = self.query.update(&request).await;

        let frame = SurfaceFrame {
            data: state.data.clone(),
            is_loading: state.is_fetching,
        };
        if let Err(e) = self.surface.render(&frame) {
            log::error!("{} surface failed to render: {}", self.surface.name(), e);
            self.surface.map_error(&e.to_string());
        }
        if state.status == QueryStatus::Error {
            let message = state
                .error
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "map data unavailable".to_string());
            self.surface.map_error(&message);
        }
        state
    }

    /// Drains surface events, feeding bounds changes back into the debounce
    /// layer. Every event is returned for the caller to act on.
    pub fn handle_surface_events(&mut self, now: Instant) -> Vec<SurfaceEvent> {
        let events = self.surface.drain_events();
        for event in &events {
            if let SurfaceEvent::BoundsChanged(viewport) = event {
                self.on_viewport_changed(*viewport, now);
            }
        }
        events
    }

    async fn apply(&mut self, event: PipelineEvent, now: Instant) {
        match event {
            PipelineEvent::Viewport(viewport) => self.on_viewport_changed(viewport, now),
            PipelineEvent::Frame => self.on_frame(now),
            PipelineEvent::Filters(filters) => self.set_filters(filters),
            PipelineEvent::Enabled(enabled) => self.set_enabled(enabled),
            PipelineEvent::Invalidate => {
                let marked = self.query.fetcher().invalidate_all();
                log::debug!("invalidated {} map data results", marked);
                self.dirty = true;
            }
        }
        self.tick(now).await;
    }

    /// Drives the pipeline from an event channel until it closes, then
    /// unmounts and hands the pipeline back.
    pub async fn run(mut self, mut events: mpsc::Receiver<PipelineEvent>) -> Self {
        loop {
            let deadline = self.next_deadline();
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.apply(event, Instant::now()).await,
                    None => break,
                },
                _ = wait_until(deadline) => {
                    self.tick(Instant::now()).await;
                }
            }
        }
        self.unmount();
        self
    }

    /// Cancels pending timers and stops applying results
    pub fn unmount(&mut self) {
        self.gate.cancel();
        self.query.unmount();
        self.dirty = false;
        log::debug!("{} pipeline unmounted", self.surface.name());
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

/// Builder for [`MapDataPipeline`]
pub struct PipelineBuilder {
    profile: PipelineProfile,
    surface: Option<Box<dyn RenderSurface>>,
    surface_kind: SurfaceKind,
    context: Option<AppContext>,
    client: Option<MarketplaceClient>,
    filters: MapFilters,
    enabled: bool,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            profile: PipelineProfile::default(),
            surface: None,
            surface_kind: SurfaceKind::Markers,
            context: None,
            client: None,
            filters: MapFilters::default(),
            enabled: true,
        }
    }

    pub fn with_profile(mut self, profile: PipelineProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.profile = PipelineProfile::Custom(options);
        self
    }

    /// Mount a specific surface instance
    pub fn with_surface(mut self, surface: Box<dyn RenderSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn with_surface_kind(mut self, kind: SurfaceKind) -> Self {
        self.surface_kind = kind;
        self
    }

    /// Share the cache and role view of an existing application context
    pub fn with_context(mut self, context: AppContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_client(mut self, client: MarketplaceClient) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_filters(mut self, filters: MapFilters) -> Self {
        self.filters = filters.normalized();
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn build(self) -> Result<MapDataPipeline> {
        let client = self.client.ok_or_else(|| {
            MapError::Config("a marketplace client is required to build a pipeline".to_string())
        })?;
        let options = self.profile.resolve();
        let context = self
            .context
            .unwrap_or_else(|| AppContext::new(&options));

        let fetcher = MapDataFetcher::new(client, context.map_cache().clone(), options.fetch.clone());
        let surface = self
            .surface
            .unwrap_or_else(|| self.surface_kind.create());

        log::debug!(
            "building map pipeline with {} surface and {:?} debounce",
            surface.name(),
            options.debounce.strategy
        );

        Ok(MapDataPipeline {
            gate: ViewportGate::from_options(&options),
            filters: self.filters,
            enabled: self.enabled,
            committed: None,
            dirty: false,
            query: Arc::new(MapDataQuery::new(Arc::new(fetcher))),
            surface,
            context,
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bounds::MapBounds;
    use crate::core::config::{DebounceConfig, FetchConfig};
    use crate::model::filters::ListingType;
    use crate::render::placeholder::PlaceholderSurface;
    use crate::rpc::scripted::ScriptedTransport;
    use serde_json::json;
    use std::sync::Mutex;

    /// Surface that records what it was asked to draw
    #[derive(Default, Clone)]
    struct RecordingSurface {
        frames: Arc<Mutex<Vec<SurfaceFrame>>>,
        errors: Arc<Mutex<Vec<String>>>,
        inner: Arc<Mutex<PlaceholderSurface>>,
    }

    impl RenderSurface for RecordingSurface {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn render(&mut self, frame: &SurfaceFrame) -> Result<()> {
            self.frames.lock().unwrap().push(frame.clone());
            Ok(())
        }

        fn set_loading(&mut self, loading: bool) {
            self.inner.lock().unwrap().set_loading(loading);
        }

        fn map_error(&mut self, message: &str) {
            self.errors.lock().unwrap().push(message.to_string());
        }

        fn bounds_changed(&mut self, viewport: MapViewport) {
            self.inner.lock().unwrap().bounds_changed(viewport);
        }

        fn marker_click(&mut self, id: &str) {
            self.inner.lock().unwrap().marker_click(id);
        }

        fn hover(&mut self, id: Option<&str>) {
            self.inner.lock().unwrap().hover(id);
        }

        fn drain_events(&mut self) -> Vec<SurfaceEvent> {
            self.inner.lock().unwrap().drain_events()
        }
    }

    fn viewport(north: f64) -> MapViewport {
        MapViewport::new(MapBounds::new(north, north - 0.2, -99.1, -99.2).unwrap(), 11.4)
    }

    fn transport() -> Arc<ScriptedTransport> {
        Arc::new(ScriptedTransport::returning(json!({
            "properties": [{"id": "p1", "lat": 19.4, "lng": -99.15, "price": 1_500_000}],
            "clusters": [],
            "total_count": 1,
            "is_clustered": false
        })))
    }

    fn pipeline(transport: Arc<ScriptedTransport>, surface: RecordingSurface) -> MapDataPipeline {
        MapDataPipeline::builder()
            .with_client(MarketplaceClient::new(transport))
            .with_surface(Box::new(surface))
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_requires_client() {
        assert!(matches!(
            PipelineBuilder::new().build(),
            Err(MapError::Config(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_viewports_fetches_once() {
        let transport = transport();
        let surface = RecordingSurface::default();
        let mut pipeline = pipeline(transport.clone(), surface.clone());

        let start = Instant::now();
        for (i, north) in [19.5, 19.51, 19.52, 19.53, 19.54].into_iter().enumerate() {
            let now = start + Duration::from_millis(i as u64 * 50);
            pipeline.on_viewport_changed(viewport(north), now);
            assert!(pipeline.tick(now).await.is_none());
        }
        let last = start + Duration::from_millis(200);
        assert_eq!(pipeline.next_deadline(), Some(last + Duration::from_millis(300)));

        let state = pipeline.tick(last + Duration::from_millis(300)).await.unwrap();
        assert_eq!(state.status, QueryStatus::Success);
        assert_eq!(transport.calls_to("get_map_data"), 1);
        assert_eq!(transport.calls()[0].params["p_north"], json!(19.54));
        assert_eq!(surface.frames.lock().unwrap().last().unwrap().data.properties.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_change_skips_debounce() {
        let transport = transport();
        let mut pipeline = pipeline(transport.clone(), RecordingSurface::default());
        let now = Instant::now();

        pipeline.on_viewport_changed(viewport(19.5), now);
        pipeline.tick(now + Duration::from_millis(300)).await.unwrap();

        pipeline.set_filters(MapFilters::new().listing_type(ListingType::Rent));
        let state = pipeline.tick(now + Duration::from_millis(310)).await.unwrap();
        assert_eq!(state.status, QueryStatus::Success);
        assert_eq!(transport.calls_to("get_map_data"), 2);
        assert_eq!(transport.calls()[1].params["p_listing_type"], json!("rent"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_pipeline_stays_idle() {
        let transport = transport();
        let surface = RecordingSurface::default();
        let mut pipeline = pipeline(transport.clone(), surface.clone());
        pipeline.set_enabled(false);
        let now = Instant::now();

        pipeline.on_viewport_changed(viewport(19.5), now);
        let state = pipeline.tick(now + Duration::from_millis(300)).await.unwrap();
        assert_eq!(state.status, QueryStatus::Idle);
        assert_eq!(transport.call_count(), 0);
        assert!(surface.frames.lock().unwrap()[0].data.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_failure_reaches_surface() {
        let transport = Arc::new(ScriptedTransport::new(|_| {
            Err(MapError::Remote {
                function: "get_map_data".into(),
                status: 400,
                message: "bad filter".into(),
            })
        }));
        let surface = RecordingSurface::default();
        let mut pipeline = pipeline(transport, surface.clone());
        let now = Instant::now();

        pipeline.on_viewport_changed(viewport(19.5), now);
        let state = pipeline.tick(now + Duration::from_millis(300)).await.unwrap();
        assert_eq!(state.status, QueryStatus::Error);
        let errors = surface.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("bad filter"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_surface_bounds_events_feed_debounce() {
        let transport = transport();
        let mut pipeline = pipeline(transport.clone(), RecordingSurface::default());
        let now = Instant::now();

        pipeline.surface_mut().bounds_changed(viewport(19.5));
        pipeline.surface_mut().marker_click("p1");
        let events = pipeline.handle_surface_events(now);
        assert_eq!(events.len(), 2);
        assert_eq!(pipeline.next_deadline(), Some(now + Duration::from_millis(300)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_adaptive_profile_uses_frame_rate() {
        let options = PipelineOptions {
            debounce: DebounceConfig {
                strategy: DebounceStrategy::Adaptive,
                ..DebounceConfig::default()
            },
            fetch: FetchConfig::default(),
            ..PipelineOptions::default()
        };
        let mut pipeline = MapDataPipeline::builder()
            .with_options(options)
            .with_client(MarketplaceClient::new(transport()))
            .with_surface_kind(SurfaceKind::Placeholder)
            .build()
            .unwrap();
        assert_eq!(pipeline.debounce_delay(), Duration::from_millis(400));

        let start = Instant::now();
        for i in 0..11u64 {
            pipeline.on_frame(start + Duration::from_millis(i * 16));
        }
        assert_eq!(pipeline.debounce_delay(), Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_loop_commits_after_quiet_period() {
        let transport = transport();
        let surface = RecordingSurface::default();
        let pipeline = pipeline(transport.clone(), surface.clone());
        let (tx, rx) = mpsc::channel(16);
        let handle = tokio::spawn(pipeline.run(rx));

        tx.send(PipelineEvent::Viewport(viewport(19.5))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(PipelineEvent::Viewport(viewport(19.6))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(transport.calls_to("get_map_data"), 1);

        tx.send(PipelineEvent::Invalidate).await.unwrap();
        drop(tx);
        let pipeline = handle.await.unwrap();
        assert_eq!(transport.calls_to("get_map_data"), 2);
        assert!(!pipeline.query().is_mounted());
        assert_eq!(
            pipeline.committed_viewport().map(|v| v.bounds.north),
            Some(19.6)
        );
    }
}
