use std::sync::Arc;

use parking_lot::Mutex;

use crate::{Coordinate, HandlerError, Light, LightEffect, PaletteColor, TapKind};

/// Something that reacts to a classified tap on a cell, similar to an HTTP handler.
///
/// Closures of the form `Fn(&mut Cell) -> Result<(), HandlerError>` implement this trait, so
/// most of the time you'll just pass a closure to [`Cell::on_single_tap`] or
/// [`Cell::on_double_tap`]. Implement it yourself to build reusable middleware that wraps
/// another handler:
///
/// ```rust
/// # use std::sync::Arc;
/// # use launchgrid::{Cell, HandlerError, TapHandler};
/// struct Logged(Arc<dyn TapHandler>);
///
/// impl TapHandler for Logged {
///     fn apply(&self, cell: &mut Cell) -> Result<(), HandlerError> {
///         log::info!("tap at {}", cell.coordinate());
///         self.0.apply(cell)
///     }
/// }
/// ```
pub trait TapHandler: Send + Sync {
    fn apply(&self, cell: &mut Cell) -> Result<(), HandlerError>;
}

impl<F> TapHandler for F
where
    F: Fn(&mut Cell) -> Result<(), HandlerError> + Send + Sync,
{
    fn apply(&self, cell: &mut Cell) -> Result<(), HandlerError> {
        (self)(cell)
    }
}

fn noop(_: &mut Cell) -> Result<(), HandlerError> {
    Ok(())
}

struct Handlers {
    single: Arc<dyn TapHandler>,
    double: Arc<dyn TapHandler>,
}

/// Per-position state owned by the grid. Lives exactly as long as the grid does.
pub(crate) struct CellSlot {
    coordinate: Coordinate,
    /// Written by handlers and the grid, read by the render loop. Only ever held briefly
    light: Mutex<Light>,
    handlers: Mutex<Handlers>,
    /// Held for the whole duration of a handler invocation
    pub(crate) exec: Mutex<()>,
    pub(crate) queue: Mutex<crate::dispatch::TapQueue>,
}

impl CellSlot {
    pub(crate) fn new(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            light: Mutex::new(Light::default()),
            handlers: Mutex::new(Handlers {
                single: Arc::new(noop),
                double: Arc::new(noop),
            }),
            exec: Mutex::new(()),
            queue: Mutex::new(Default::default()),
        }
    }

    pub(crate) fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    pub(crate) fn light(&self) -> Light {
        *self.light.lock()
    }

    pub(crate) fn handler(&self, kind: TapKind) -> Arc<dyn TapHandler> {
        let handlers = self.handlers.lock();
        match kind {
            TapKind::Single => Arc::clone(&handlers.single),
            TapKind::Double => Arc::clone(&handlers.double),
        }
    }
}

/// A handle to one cell of a [`Grid`](crate::Grid).
///
/// Obtained from [`Grid::cell`](crate::Grid::cell), or handed to a [`TapHandler`] for the
/// duration of its invocation. Mutations are visible to the render loop from its next cycle on.
pub struct Cell {
    slot: Arc<CellSlot>,
}

impl Cell {
    pub(crate) fn new(slot: Arc<CellSlot>) -> Self {
        Self { slot }
    }

    pub fn coordinate(&self) -> Coordinate {
        self.slot.coordinate
    }

    pub fn xy(&self) -> (u8, u8) {
        self.slot.coordinate.xy()
    }

    /// A copy of the current desired light
    pub fn light(&self) -> Light {
        self.slot.light()
    }

    pub fn set_light(&mut self, light: Light) {
        *self.slot.light.lock() = light;
    }

    /// Mutate the light in place. The closure runs while the light is locked, so keep it short:
    /// the render loop waits for it.
    pub fn update_light<R>(&mut self, f: impl FnOnce(&mut Light) -> R) -> R {
        let mut light = self.slot.light.lock();
        f(&mut *light)
    }

    /// Set the RGB value. Negative components are stored as their magnitude.
    pub fn set_rgb(&mut self, r: i8, g: i8, b: i8) {
        self.update_light(|light| light.set_rgb(r, g, b));
    }

    pub fn set_effect(&mut self, effect: LightEffect) {
        self.update_light(|light| light.effect = effect);
    }

    pub fn set_color(&mut self, color: impl Into<PaletteColor>) {
        let color = color.into();
        self.update_light(|light| light.color = Some(color));
    }

    pub fn toggle_display_lock(&mut self) {
        self.update_light(Light::toggle_display_lock);
    }

    pub fn is_display_locked(&self) -> bool {
        self.slot.light.lock().display_locked
    }

    /// Back to a static, black, unlocked light
    pub fn reset_light(&mut self) {
        self.set_light(Light::default());
    }

    pub fn on_single_tap<F>(&mut self, handler: F)
    where
        F: Fn(&mut Cell) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.set_single_tap_handler(Arc::new(handler));
    }

    pub fn on_double_tap<F>(&mut self, handler: F)
    where
        F: Fn(&mut Cell) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.set_double_tap_handler(Arc::new(handler));
    }

    pub fn set_single_tap_handler(&mut self, handler: Arc<dyn TapHandler>) {
        self.slot.handlers.lock().single = handler;
    }

    pub fn set_double_tap_handler(&mut self, handler: Arc<dyn TapHandler>) {
        self.slot.handlers.lock().double = handler;
    }

    /// The current single-tap handler, e.g. to wrap it in middleware
    pub fn single_tap_handler(&self) -> Arc<dyn TapHandler> {
        self.slot.handler(TapKind::Single)
    }

    pub fn double_tap_handler(&self) -> Arc<dyn TapHandler> {
        self.slot.handler(TapKind::Double)
    }
}

impl std::fmt::Debug for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cell")
            .field("coordinate", &self.coordinate())
            .field("light", &self.light())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell() -> Cell {
        Cell::new(Arc::new(CellSlot::new(Coordinate::new(2, 3).unwrap())))
    }

    #[test]
    fn defaults_to_static_black_unlocked() {
        let cell = cell();
        assert_eq!(cell.xy(), (2, 3));
        assert_eq!(cell.light(), Light::default());
        assert_eq!(cell.light().effect, LightEffect::Static);
        assert!(!cell.is_display_locked());
    }

    #[test]
    fn default_handlers_do_nothing() {
        let mut cell = cell();
        let before = cell.light();
        cell.single_tap_handler().apply(&mut cell).unwrap();
        cell.double_tap_handler().apply(&mut cell).unwrap();
        assert_eq!(cell.light(), before);
    }

    #[test]
    fn handlers_can_be_wrapped() {
        let mut cell = cell();
        cell.on_single_tap(|cell| {
            cell.set_rgb(10, 20, 30);
            Ok(())
        });

        let inner = cell.single_tap_handler();
        cell.on_single_tap(move |cell| {
            cell.set_effect(LightEffect::Pulse);
            inner.apply(cell)
        });

        cell.single_tap_handler().apply(&mut cell).unwrap();
        let light = cell.light();
        assert_eq!(light.effect, LightEffect::Pulse);
        assert_eq!(light.rgb(), crate::RgbColor::new(10, 20, 30));
    }

    #[test]
    fn mutations_go_through_the_shared_slot() {
        let slot = Arc::new(CellSlot::new(Coordinate::new(1, 1).unwrap()));
        let mut a = Cell::new(Arc::clone(&slot));
        let b = Cell::new(slot);
        a.set_color(PaletteColor::GREEN);
        a.toggle_display_lock();
        assert_eq!(b.light().color, Some(PaletteColor::GREEN));
        assert!(b.is_display_locked());
        a.reset_light();
        assert_eq!(b.light(), Light::default());
    }
}
