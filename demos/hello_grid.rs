//! Lights the 8x8 pads in random colors. A single tap flashes the inverted color for a moment,
//! a double tap toggles pulsing. Double tap the top right button to quit.

use std::sync::Arc;
use std::time::Duration;

use launchgrid::launchpad_x::LaunchpadX;
use launchgrid::{Cell, Grid, GridConfig, HandlerError, TapHandler};
use nanorand::Rng as _;

/// Show the inverted color for `duration`, then restore the light and run `next`
struct FeedbackInverted {
    next: Arc<dyn TapHandler>,
    duration: Duration,
}

impl TapHandler for FeedbackInverted {
    fn apply(&self, cell: &mut Cell) -> Result<(), HandlerError> {
        let original = cell.light();
        cell.update_light(|light| light.invert());
        std::thread::sleep(self.duration);
        cell.set_light(original);
        self.next.apply(cell)
    }
}

struct PulseToggle {
    next: Arc<dyn TapHandler>,
}

impl TapHandler for PulseToggle {
    fn apply(&self, cell: &mut Cell) -> Result<(), HandlerError> {
        cell.update_light(|light| light.toggle_pulse());
        self.next.apply(cell)
    }
}

struct LogTap {
    next: Arc<dyn TapHandler>,
}

impl TapHandler for LogTap {
    fn apply(&self, cell: &mut Cell) -> Result<(), HandlerError> {
        let (x, y) = cell.xy();
        log::info!("tap! x={} y={}", x, y);
        self.next.apply(cell)
    }
}

fn main() -> Result<(), launchgrid::Error> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let grid = Grid::open(GridConfig::default(), LaunchpadX::guess()?)?;
    let mut rng = nanorand::WyRand::new();

    for mut cell in grid.cells() {
        let (x, y) = cell.xy();
        if x > 8 || y > 8 {
            continue;
        }

        cell.set_rgb(
            rng.generate_range(0_u8..=127) as i8,
            rng.generate_range(0_u8..=127) as i8,
            rng.generate_range(0_u8..=127) as i8,
        );

        cell.set_single_tap_handler(Arc::new(LogTap {
            next: Arc::new(FeedbackInverted {
                next: cell.single_tap_handler(),
                duration: Duration::from_secs(3),
            }),
        }));
        cell.set_double_tap_handler(Arc::new(PulseToggle {
            next: cell.double_tap_handler(),
        }));
    }

    // no pulsing for this corner
    if let Some(mut corner) = grid.cell(1, 1) {
        corner.on_double_tap(|_| {
            log::info!("overridden double tap on the corner pad");
            Ok(())
        });
    }

    let (quit, quit_requested) = crossbeam_channel::bounded(1);
    if let Some(mut logo) = grid.cell(9, 9) {
        logo.set_rgb(0, 0, 127);
        logo.on_double_tap(move |_| {
            let _ = quit.try_send(());
            Ok(())
        });
    }

    let taps = grid.taps();
    std::thread::spawn(move || {
        for tap in taps.iter() {
            log::debug!("{:?} decided after {:?}", tap, tap.latency());
        }
    });

    let _ = quit_requested.recv();
    grid.close()
}
