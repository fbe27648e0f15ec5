use crate::core::geo::LatLng;
use crate::core::viewport::MapViewport;
use crate::model::response::MapDataResponse;
use crate::render::markers::MarkerSurface;
use crate::render::placeholder::PlaceholderSurface;
use crate::Result;
use std::sync::Arc;

/// What a surface is asked to draw
#[derive(Debug, Clone)]
pub struct SurfaceFrame {
    pub data: Arc<MapDataResponse>,
    pub is_loading: bool,
}

/// Events a surface emits back to its owner
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    BoundsChanged(MapViewport),
    MarkerClick {
        property_id: String,
    },
    ClusterClick {
        cluster_id: String,
        center: LatLng,
        expansion_zoom: Option<i32>,
    },
    PropertyHover(Option<String>),
    MapError(String),
}

/// Common capability set of every map rendering surface.
///
/// Callers only talk to this trait, so the live marker map and the
/// non-interactive placeholder can be swapped without touching the fetch
/// pipeline.
pub trait RenderSurface: Send {
    fn name(&self) -> &'static str;

    fn render(&mut self, frame: &SurfaceFrame) -> Result<()>;

    fn set_loading(&mut self, loading: bool);

    /// Terminal fetch failure, surfaced as `onMapError`
    fn map_error(&mut self, message: &str);

    /// Input from the map library: the visible region moved
    fn bounds_changed(&mut self, viewport: MapViewport);

    /// Input from the map library: a marker or cluster was clicked
    fn marker_click(&mut self, id: &str);

    /// Input from the map library: the pointer entered or left a marker
    fn hover(&mut self, id: Option<&str>);

    fn drain_events(&mut self) -> Vec<SurfaceEvent>;
}

/// Chooses the surface implementation at composition time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    Placeholder,
    Markers,
}

impl SurfaceKind {
    pub fn create(self) -> Box<dyn RenderSurface> {
        match self {
            SurfaceKind::Placeholder => Box::new(PlaceholderSurface::new()),
            SurfaceKind::Markers => Box::new(MarkerSurface::new()),
        }
    }
}

/// FIFO of events waiting to be drained by the owner
#[derive(Debug, Default, Clone)]
pub(crate) struct EventQueue {
    events: Vec<SurfaceEvent>,
}

impl EventQueue {
    pub(crate) fn push(&mut self, event: SurfaceEvent) {
        self.events.push(event);
    }

    pub(crate) fn drain(&mut self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut self.events)
    }
}
