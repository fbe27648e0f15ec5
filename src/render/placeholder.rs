use crate::core::viewport::MapViewport;
use crate::render::surface::{EventQueue, RenderSurface, SurfaceEvent, SurfaceFrame};
use crate::Result;

/// Non-interactive stand-in that only reports aggregate counts
#[derive(Debug, Default)]
pub struct PlaceholderSurface {
    property_count: usize,
    cluster_count: usize,
    total_count: u64,
    is_clustered: bool,
    loading: bool,
    error: Option<String>,
    events: EventQueue,
}

impl PlaceholderSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Text shown in place of the map
    pub fn summary(&self) -> String {
        if let Some(error) = &self.error {
            return format!("Map unavailable: {}", error);
        }
        if self.loading && self.total_count == 0 {
            return "Loading properties…".to_string();
        }
        let noun = if self.total_count == 1 {
            "property"
        } else {
            "properties"
        };
        if self.is_clustered {
            format!(
                "{} {} in {} areas",
                self.total_count, noun, self.cluster_count
            )
        } else {
            format!(
                "{} {} ({} shown)",
                self.total_count, noun, self.property_count
            )
        }
    }
}

impl RenderSurface for PlaceholderSurface {
    fn name(&self) -> &'static str {
        "placeholder"
    }

    fn render(&mut self, frame: &SurfaceFrame) -> Result<()> {
        self.property_count = frame.data.properties.len();
        self.cluster_count = frame.data.clusters.len();
        self.total_count = frame.data.total_count;
        self.is_clustered = frame.data.is_clustered;
        self.loading = frame.is_loading;
        self.error = None;
        Ok(())
    }

    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    fn map_error(&mut self, message: &str) {
        self.error = Some(message.to_string());
        self.events.push(SurfaceEvent::MapError(message.to_string()));
    }

    fn bounds_changed(&mut self, viewport: MapViewport) {
        self.events.push(SurfaceEvent::BoundsChanged(viewport));
    }

    fn marker_click(&mut self, id: &str) {
        self.events.push(SurfaceEvent::MarkerClick {
            property_id: id.to_string(),
        });
    }

    fn hover(&mut self, id: Option<&str>) {
        self.events
            .push(SurfaceEvent::PropertyHover(id.map(str::to_string)));
    }

    fn drain_events(&mut self) -> Vec<SurfaceEvent> {
        self.events.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::response::MapDataResponse;
    use std::sync::Arc;

    #[test]
    fn test_summary_states() {
        let mut surface = PlaceholderSurface::new();
        surface.set_loading(true);
        assert_eq!(surface.summary(), "Loading properties…");

        surface
            .render(&SurfaceFrame {
                data: Arc::new(MapDataResponse {
                    properties: Vec::new(),
                    clusters: Vec::new(),
                    total_count: 120,
                    is_clustered: true,
                }),
                is_loading: false,
            })
            .unwrap();
        assert_eq!(surface.summary(), "120 properties in 0 areas");

        surface.map_error("timeout");
        assert_eq!(surface.summary(), "Map unavailable: timeout");
    }
}
