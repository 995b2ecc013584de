/// The position of a single cell on the grid.
///
/// Coordinates are stored the way the Launchpad X numbers its pads: as one integer
/// `y * 10 + x`, with `(1, 1)` in the bottom left corner. The main 8x8 area spans `1..=8` on both
/// axes, the top row of control buttons lives at `y = 9` and the right-hand column at `x = 9`.
///
/// ```rust
/// # use launchgrid::Coordinate;
/// let coord = Coordinate::new(3, 6).unwrap();
/// assert_eq!(coord.index(), 63);
/// assert_eq!(coord.xy(), (3, 6));
/// assert_eq!(Coordinate::from_index(63), Some(coord));
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Coordinate(u8);

impl Coordinate {
    /// Exclusive upper bound of each axis
    pub const AXIS_LIMIT: u8 = 10;

    /// Returns `None` if either axis is outside `0..10`.
    pub fn new(x: u8, y: u8) -> Option<Self> {
        if x < Self::AXIS_LIMIT && y < Self::AXIS_LIMIT {
            Some(Self(y * Self::AXIS_LIMIT + x))
        } else {
            None
        }
    }

    /// Decode a coordinate from its integer key, e.g. a MIDI note number.
    pub fn from_index(index: u8) -> Option<Self> {
        if index < Self::AXIS_LIMIT * Self::AXIS_LIMIT {
            Some(Self(index))
        } else {
            None
        }
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn x(self) -> u8 {
        self.0 % Self::AXIS_LIMIT
    }

    pub fn y(self) -> u8 {
        self.0 / Self::AXIS_LIMIT
    }

    pub fn xy(self) -> (u8, u8) {
        (self.x(), self.y())
    }

    /// Move this coordinate by the given offset. Returns `None` when the result leaves the
    /// addressable range.
    pub fn offset(self, dx: i8, dy: i8) -> Option<Self> {
        let x = self.x() as i16 + dx as i16;
        let y = self.y() as i16 + dy as i16;
        if x < 0 || y < 0 {
            return None;
        }
        Self::new(u8::try_from(x).ok()?, u8::try_from(y).ok()?)
    }

    /// The coordinate one step towards the top row
    pub fn up(self) -> Option<Self> {
        self.offset(0, 1)
    }

    pub fn down(self) -> Option<Self> {
        self.offset(0, -1)
    }

    pub fn left(self) -> Option<Self> {
        self.offset(-1, 0)
    }

    pub fn right(self) -> Option<Self> {
        self.offset(1, 0)
    }

    /// The four direct neighbours that are still addressable
    pub fn neighbors_4(self) -> impl Iterator<Item = Self> {
        [self.up(), self.right(), self.down(), self.left()]
            .into_iter()
            .flatten()
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x(), self.y())
    }
}

impl From<Coordinate> for u8 {
    fn from(coordinate: Coordinate) -> Self {
        coordinate.index()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_like_launchpad_note_numbers() {
        assert_eq!(Coordinate::new(1, 1).unwrap().index(), 11);
        assert_eq!(Coordinate::new(8, 8).unwrap().index(), 88);
        assert_eq!(Coordinate::new(9, 1).unwrap().index(), 19);
        assert_eq!(Coordinate::new(1, 9).unwrap().index(), 91);
    }

    #[test]
    fn decode_is_total_over_valid_range() {
        for index in 0..100 {
            let coord = Coordinate::from_index(index).unwrap();
            let (x, y) = coord.xy();
            assert_eq!(Coordinate::new(x, y), Some(coord));
        }
        assert_eq!(Coordinate::from_index(100), None);
        assert_eq!(Coordinate::new(10, 0), None);
        assert_eq!(Coordinate::new(0, 10), None);
    }

    #[test]
    fn neighbours_stay_in_range() {
        let corner = Coordinate::new(0, 0).unwrap();
        assert_eq!(corner.down(), None);
        assert_eq!(corner.left(), None);
        assert_eq!(corner.neighbors_4().count(), 2);

        let center = Coordinate::new(4, 4).unwrap();
        assert_eq!(center.up(), Coordinate::new(4, 5));
        assert_eq!(center.offset(-2, 3), Coordinate::new(2, 7));
        assert_eq!(center.neighbors_4().count(), 4);
    }
}
