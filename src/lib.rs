/*!
A grid engine for lit button surfaces like the Novation Launchpad X.

The [`Grid`] keeps the desired light of every cell, pushes all of it to the device at a fixed
cadence, and turns raw button presses into [single and double taps](TapKind) that run the
handlers you attached to each cell.

```no_run
# #[cfg(feature = "midi")]
# fn main() -> Result<(), launchgrid::Error> {
use launchgrid::{Grid, GridConfig, LightEffect};
use launchgrid::launchpad_x::LaunchpadX;

let grid = Grid::open(GridConfig::default(), LaunchpadX::guess()?)?;

for mut cell in grid.cells() {
    cell.set_rgb(0, 20, 60);
    cell.on_single_tap(|cell| {
        cell.update_light(|light| light.invert());
        Ok(())
    });
    cell.on_double_tap(|cell| {
        cell.update_light(|light| light.toggle_pulse());
        Ok(())
    });
}

std::thread::sleep(std::time::Duration::from_secs(60));
grid.close()?;
# Ok(())
# }
# #[cfg(not(feature = "midi"))]
# fn main() {}
```

# Watching taps directly

Instead of (or next to) handlers, any number of consumers can subscribe to the stream of taps.
Every subscriber sees every tap:

```no_run
# let grid: launchgrid::Grid = unimplemented!();
for tap in grid.taps().iter() {
    println!("{:?} tap at {} after {:?}", tap.kind, tap.coordinate, tap.latency());
}
```

# Without hardware

Everything except the Launchpad X connection works without the `midi` feature. The
[`MockTransport`] stands in for a device: it records every batch of lights the grid writes and
lets you inject button events.

```rust
use std::time::Duration;
use launchgrid::{Coordinate, Grid, GridConfig, MockTransport, TapKind};

let device = MockTransport::new();
let grid = Grid::open(GridConfig::default(), device.clone())?;
let taps = grid.taps();

let coordinate = Coordinate::new(4, 4).unwrap();
device.tap(coordinate, Duration::from_millis(30));

let tap = taps.recv_timeout(Duration::from_secs(2)).unwrap();
assert_eq!((tap.coordinate, tap.kind), (coordinate, TapKind::Single));
grid.close()?;
# Ok::<(), launchgrid::Error>(())
```
*/

mod errors;
pub use errors::*;

mod coordinate;
pub use coordinate::*;

mod light;
pub use light::*;

mod tap;
pub use tap::*;

mod cell;
pub use cell::{Cell, TapHandler};

mod classifier;
pub use classifier::{TapClassifier, DECISION_WINDOW};

mod broadcast;
mod dispatch;

mod render;
pub use render::{DEFAULT_RENDER_DELAY, MIN_RENDER_DELAY};

mod diagnostics;
pub use diagnostics::*;

mod grid;
pub use grid::{Grid, GridConfig, GridState};

mod transport;
pub use transport::*;

pub mod launchpad_x;
pub use launchpad_x as lpx;

#[cfg(feature = "midi")]
mod midi_io;
#[cfg(feature = "midi")]
pub use midi_io::*;

pub mod prelude {
    pub use crate::cell::{Cell, TapHandler};
    pub use crate::coordinate::Coordinate;
    pub use crate::grid::{Grid, GridConfig};
    pub use crate::light::{Light, LightEffect, PaletteColor, RgbColor};
    pub use crate::tap::{Tap, TapKind};
    pub use crate::transport::Transport;
}

/// Identifier used for e.g. the midi port names etc.
#[cfg(feature = "midi")]
const APPLICATION_NAME: &str = "Launchgrid";
