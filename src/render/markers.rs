use crate::core::geo::LatLng;
use crate::core::viewport::MapViewport;
use crate::model::property::{PropertyCluster, PropertyMarker};
use crate::render::surface::{EventQueue, RenderSurface, SurfaceEvent, SurfaceFrame};
use crate::{MapError, Result};
use fxhash::FxHashMap;

/// A drawn property pin
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerView {
    pub id: String,
    pub position: LatLng,
    pub label: String,
    pub cover_image: Option<String>,
    pub is_featured: bool,
    pub hovered: bool,
}

impl MarkerView {
    fn from_marker(marker: &PropertyMarker) -> Self {
        Self {
            id: marker.id.clone(),
            position: marker.position(),
            label: marker
                .price
                .map(short_price)
                .unwrap_or_else(|| "-".to_string()),
            cover_image: marker.cover_image().map(str::to_string),
            is_featured: marker.is_featured,
            hovered: false,
        }
    }
}

/// A drawn cluster bubble
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterView {
    pub id: String,
    pub position: LatLng,
    pub count: u64,
    pub expansion_zoom: Option<i32>,
}

impl From<&PropertyCluster> for ClusterView {
    fn from(cluster: &PropertyCluster) -> Self {
        Self {
            id: cluster.id.clone(),
            position: cluster.position(),
            count: cluster.count,
            expansion_zoom: cluster.expansion_zoom,
        }
    }
}

/// Compact price label for a pin: `$850K`, `$1.2M`
pub fn short_price(price: f64) -> String {
    if !price.is_finite() || price < 0.0 {
        return "-".to_string();
    }
    if price >= 1_000_000.0 {
        let millions = price / 1_000_000.0;
        if millions >= 10.0 {
            format!("${:.0}M", millions)
        } else {
            format!("${:.1}M", millions).replace(".0M", "M")
        }
    } else if price >= 1_000.0 {
        format!("${:.0}K", price / 1_000.0)
    } else {
        format!("${:.0}", price)
    }
}

/// Interactive surface keeping one view per marker and cluster.
///
/// Each render replaces the drawn set wholesale with the latest response;
/// hover state survives when the hovered property is still present.
#[derive(Debug, Default)]
pub struct MarkerSurface {
    markers: FxHashMap<String, MarkerView>,
    clusters: FxHashMap<String, ClusterView>,
    hovered: Option<String>,
    loading: bool,
    last_error: Option<String>,
    viewport: Option<MapViewport>,
    events: EventQueue,
}

impl MarkerSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn marker(&self, id: &str) -> Option<&MarkerView> {
        self.markers.get(id)
    }

    pub fn cluster(&self, id: &str) -> Option<&ClusterView> {
        self.clusters.get(id)
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn viewport(&self) -> Option<&MapViewport> {
        self.viewport.as_ref()
    }
}

impl RenderSurface for MarkerSurface {
    fn name(&self) -> &'static str {
        "markers"
    }

    fn render(&mut self, frame: &SurfaceFrame) -> Result<()> {
        let mut markers = FxHashMap::default();
        for marker in &frame.data.properties {
            if !marker.position().is_valid() {
                return Err(MapError::Render(format!(
                    "marker {} has unplottable coordinates",
                    marker.id
                )));
            }
            let mut view = MarkerView::from_marker(marker);
            view.hovered = self.hovered.as_deref() == Some(marker.id.as_str());
            markers.insert(view.id.clone(), view);
        }

        let clusters = frame
            .data
            .clusters
            .iter()
            .map(|c| (c.id.clone(), ClusterView::from(c)))
            .collect();

        if self
            .hovered
            .as_ref()
            .map(|id| !markers.contains_key(id))
            .unwrap_or(false)
        {
            self.hovered = None;
        }

        self.markers = markers;
        self.clusters = clusters;
        self.loading = frame.is_loading;
        self.last_error = None;
        log::trace!(
            "drew {} markers and {} clusters",
            self.markers.len(),
            self.clusters.len()
        );
        Ok(())
    }

    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    fn map_error(&mut self, message: &str) {
        self.last_error = Some(message.to_string());
        self.events.push(SurfaceEvent::MapError(message.to_string()));
    }

    fn bounds_changed(&mut self, viewport: MapViewport) {
        self.viewport = Some(viewport);
        self.events.push(SurfaceEvent::BoundsChanged(viewport));
    }

    fn marker_click(&mut self, id: &str) {
        if let Some(cluster) = self.clusters.get(id) {
            self.events.push(SurfaceEvent::ClusterClick {
                cluster_id: cluster.id.clone(),
                center: cluster.position,
                expansion_zoom: cluster.expansion_zoom,
            });
        } else if self.markers.contains_key(id) {
            self.events.push(SurfaceEvent::MarkerClick {
                property_id: id.to_string(),
            });
        } else {
            log::debug!("click on unknown marker {}", id);
        }
    }

    fn hover(&mut self, id: Option<&str>) {
        let id = id.filter(|id| self.markers.contains_key(*id));
        if self.hovered.as_deref() == id {
            return;
        }
        if let Some(prev) = self.hovered.take() {
            if let Some(view) = self.markers.get_mut(&prev) {
                view.hovered = false;
            }
        }
        if let Some(id) = id {
            if let Some(view) = self.markers.get_mut(id) {
                view.hovered = true;
            }
            self.hovered = Some(id.to_string());
        }
        self.events
            .push(SurfaceEvent::PropertyHover(self.hovered.clone()));
    }

    fn drain_events(&mut self) -> Vec<SurfaceEvent> {
        self.events.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::response::{decode_map_data, MapDataResponse};
    use serde_json::json;
    use std::sync::Arc;

    fn frame() -> SurfaceFrame {
        let decoded = decode_map_data(json!({
            "properties": [
                {"id": "p1", "lat": 19.41, "lng": -99.16, "price": 8_500_000.0},
                {"id": "p2", "lat": 19.42, "lng": -99.17, "price": 850_000.0, "is_featured": true}
            ],
            "clusters": [
                {"cluster_id": "c1", "lat": 19.4, "lng": -99.1, "point_count": 42, "expansion_zoom": 14}
            ],
            "total_count": 44,
            "is_clustered": false
        }))
        .unwrap();
        SurfaceFrame {
            data: Arc::new(decoded.response),
            is_loading: false,
        }
    }

    #[test]
    fn test_short_price() {
        assert_eq!(short_price(850_000.0), "$850K");
        assert_eq!(short_price(1_240_000.0), "$1.2M");
        assert_eq!(short_price(2_000_000.0), "$2M");
        assert_eq!(short_price(15_400_000.0), "$15M");
        assert_eq!(short_price(900.0), "$900");
        assert_eq!(short_price(f64::NAN), "-");
    }

    #[test]
    fn test_render_replaces_views() {
        let mut surface = MarkerSurface::new();
        surface.render(&frame()).unwrap();
        assert_eq!(surface.marker_count(), 2);
        assert_eq!(surface.cluster_count(), 1);
        assert_eq!(surface.marker("p1").unwrap().label, "$8.5M");
        assert!(surface.marker("p2").unwrap().is_featured);

        surface
            .render(&SurfaceFrame {
                data: Arc::new(MapDataResponse::empty()),
                is_loading: true,
            })
            .unwrap();
        assert_eq!(surface.marker_count(), 0);
        assert!(surface.is_loading());
    }

    #[test]
    fn test_clicks_distinguish_clusters() {
        let mut surface = MarkerSurface::new();
        surface.render(&frame()).unwrap();
        surface.marker_click("p1");
        surface.marker_click("c1");
        surface.marker_click("nope");

        let events = surface.drain_events();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            SurfaceEvent::MarkerClick {
                property_id: "p1".to_string()
            }
        );
        assert!(matches!(
            &events[1],
            SurfaceEvent::ClusterClick { cluster_id, expansion_zoom: Some(14), .. } if cluster_id == "c1"
        ));
    }

    #[test]
    fn test_hover_tracks_single_marker() {
        let mut surface = MarkerSurface::new();
        surface.render(&frame()).unwrap();

        surface.hover(Some("p1"));
        surface.hover(Some("p2"));
        assert!(!surface.marker("p1").unwrap().hovered);
        assert!(surface.marker("p2").unwrap().hovered);

        // Hover survives a re-render that still contains the property
        surface.render(&frame()).unwrap();
        assert_eq!(surface.hovered(), Some("p2"));
        assert!(surface.marker("p2").unwrap().hovered);

        surface.hover(None);
        assert_eq!(surface.hovered(), None);
        assert_eq!(
            surface.drain_events(),
            vec![
                SurfaceEvent::PropertyHover(Some("p1".to_string())),
                SurfaceEvent::PropertyHover(Some("p2".to_string())),
                SurfaceEvent::PropertyHover(None),
            ]
        );
    }
}
