pub mod markers;
pub mod placeholder;
pub mod surface;

pub use markers::MarkerSurface;
pub use placeholder::PlaceholderSurface;
pub use surface::{RenderSurface, SurfaceEvent, SurfaceFrame, SurfaceKind};
