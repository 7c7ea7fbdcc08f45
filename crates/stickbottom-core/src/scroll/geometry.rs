//! L4 Atomic Layer: Geometry of the scrolled surface
//!
//! Hosts hand the engine a scroll surface (something with an offset and a
//! scrollable height) and a content surface (whatever grows as messages
//! stream in). The accessors here hide whether scrolling happens inside an
//! element or on the whole document.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// A surface whose vertical offset can be read and written
///
/// Writes go through `&self` because surfaces are platform handles shared
/// with the binding layer; implementors use interior mutability.
pub trait ScrollSurface {
    /// Current vertical offset
    fn scroll_top(&self) -> f64;
    /// Request a new offset; the surface may clamp or round it
    fn set_scroll_top(&self, value: f64);
    /// Total height of the scrollable content
    fn scroll_height(&self) -> f64;
    /// Height of the visible viewport
    fn client_height(&self) -> f64;
}

/// The surface holding the streamed content
pub trait ContentSurface {
    /// Height of the content box
    fn height(&self) -> f64;

    /// Whether the surface is still part of the rendered tree
    fn is_connected(&self) -> bool {
        true
    }
}

/// Which surface is scrolled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollMode {
    /// A dedicated scroll container
    #[default]
    Element,
    /// The whole document viewport
    Document,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Dimensions {
    pub scrollable_height: f64,
    pub viewport_height: f64,
}

impl Dimensions {
    pub fn is_overflowing(&self) -> bool {
        self.scrollable_height > self.viewport_height
    }
}

/// Surfaces passed to a custom target resolver
pub struct TargetContext<'a> {
    pub scroll_surface: &'a dyn ScrollSurface,
    pub content_surface: &'a dyn ContentSurface,
}

/// Read/write access to the scroll offset and dimensions
///
/// Detached surfaces report a zero offset and zero dimensions.
pub trait GeometryAccessor {
    fn mode(&self) -> ScrollMode;

    /// The surface currently bound, if any
    fn surface(&self) -> Option<&Rc<dyn ScrollSurface>>;

    /// Bind or unbind the scroll surface
    fn attach(&mut self, surface: Option<Rc<dyn ScrollSurface>>);

    /// Whether a wheel event belongs to the bound surface
    fn accepts_wheel(&self, over_scroll_surface: bool) -> bool;

    fn offset(&self) -> f64 {
        self.surface().map(|s| s.scroll_top()).unwrap_or(0.0)
    }

    /// Write an offset and return where the surface actually landed, or
    /// `None` when nothing is bound.
    fn set_offset(&self, value: f64) -> Option<f64> {
        self.surface().map(|s| {
            s.set_scroll_top(value);
            s.scroll_top()
        })
    }

    fn dimensions(&self) -> Dimensions {
        self.surface()
            .map(|s| Dimensions {
                scrollable_height: s.scroll_height(),
                viewport_height: s.client_height(),
            })
            .unwrap_or_default()
    }
}

/// Scrolling inside one element
#[derive(Default)]
pub struct ElementGeometry {
    surface: Option<Rc<dyn ScrollSurface>>,
}

impl ElementGeometry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GeometryAccessor for ElementGeometry {
    fn mode(&self) -> ScrollMode {
        ScrollMode::Element
    }

    fn surface(&self) -> Option<&Rc<dyn ScrollSurface>> {
        self.surface.as_ref()
    }

    fn attach(&mut self, surface: Option<Rc<dyn ScrollSurface>>) {
        self.surface = surface;
    }

    fn accepts_wheel(&self, over_scroll_surface: bool) -> bool {
        self.surface.is_some() && over_scroll_surface
    }
}

/// Scrolling the whole document
///
/// The viewport is fixed when the engine is built; attaching an element
/// surface afterwards has no effect.
#[derive(Default)]
pub struct DocumentGeometry {
    viewport: Option<Rc<dyn ScrollSurface>>,
}

impl DocumentGeometry {
    pub fn new(viewport: Option<Rc<dyn ScrollSurface>>) -> Self {
        Self { viewport }
    }
}

impl GeometryAccessor for DocumentGeometry {
    fn mode(&self) -> ScrollMode {
        ScrollMode::Document
    }

    fn surface(&self) -> Option<&Rc<dyn ScrollSurface>> {
        self.viewport.as_ref()
    }

    fn attach(&mut self, surface: Option<Rc<dyn ScrollSurface>>) {
        if surface.is_some() {
            tracing::debug!("Ignoring scroll surface attach in document mode");
        }
    }

    fn accepts_wheel(&self, _over_scroll_surface: bool) -> bool {
        self.viewport.is_some()
    }
}

/// Build the accessor for `mode`
pub fn accessor_for(
    mode: ScrollMode,
    viewport: Option<Rc<dyn ScrollSurface>>,
) -> Box<dyn GeometryAccessor> {
    match mode {
        ScrollMode::Element => Box::new(ElementGeometry::new()),
        ScrollMode::Document => Box::new(DocumentGeometry::new(viewport)),
    }
}
