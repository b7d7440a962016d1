use crate::BoundingBoxParseError;
use std::fmt;
use std::str::FromStr;

/// An axis-aligned rectangle given by its `west`, `south`, `east` and `north` bounds.
///
/// The box itself does not know its coordinate reference system. Boxes that are used as a
/// filter for a whole conversion run are always in WGS84, boxes handed to a source store are in
/// the CRS of the queried table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Parses a bounding box literal.
    ///
    /// Two notations are accepted:
    /// - comma-separated `west,south,east,north`, or six values where the third and sixth value
    ///   are Z/M placeholders and ignored,
    /// - the deprecated space-separated `west east south north`.
    pub fn parse(literal: &str) -> Result<Self, BoundingBoxParseError> {
        let literal = literal.trim();
        if literal.contains(',') {
            let values = parse_coordinates(literal, literal.split(','))?;
            match values.as_slice() {
                [west, south, east, north] | [west, south, _, east, north, _] => {
                    Ok(Self::new(*west, *south, *east, *north))
                }
                _ => Err(BoundingBoxParseError::WrongTokenCount {
                    literal: literal.to_owned(),
                    found: values.len(),
                }),
            }
        } else {
            let values = parse_coordinates(literal, literal.split_whitespace())?;
            match values.as_slice() {
                [west, east, south, north] => Ok(Self::new(*west, *south, *east, *north)),
                _ => Err(BoundingBoxParseError::WrongTokenCount {
                    literal: literal.to_owned(),
                    found: values.len(),
                }),
            }
        }
    }

    /// Returns whether the two boxes share at least one point. Touching edges count.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.west <= other.east
            && other.west <= self.east
            && self.south <= other.north
            && other.south <= self.north
    }

    /// Returns the smallest box that covers both boxes.
    #[must_use]
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::new(
            self.west.min(other.west),
            self.south.min(other.south),
            self.east.max(other.east),
            self.north.max(other.north),
        )
    }

    /// Returns the smallest box that covers all given points. [None] if there are no points.
    pub fn covering(points: impl IntoIterator<Item = (f64, f64)>) -> Option<BoundingBox> {
        points.into_iter().fold(None, |acc, (x, y)| {
            let point = BoundingBox::new(x, y, x, y);
            Some(acc.map_or(point, |acc: BoundingBox| acc.union(&point)))
        })
    }

    /// Returns points along the edges of the box, `steps` segments per edge.
    ///
    /// Reprojecting only the corners of a box is not enough for most projections, as straight
    /// edges become curves. These points are used to compute the reprojected box instead.
    pub fn edge_points(&self, steps: u32) -> Vec<(f64, f64)> {
        let steps = steps.max(1);
        let mut points = Vec::new();
        for step in 0..=steps {
            let t = f64::from(step) / f64::from(steps);
            let x = self.west + (self.east - self.west) * t;
            let y = self.south + (self.north - self.south) * t;
            points.push((x, self.south));
            points.push((x, self.north));
            points.push((self.west, y));
            points.push((self.east, y));
        }
        points
    }
}

impl FromStr for BoundingBox {
    type Err = BoundingBoxParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.west, self.south, self.east, self.north)
    }
}

fn parse_coordinates<'a>(
    literal: &str,
    tokens: impl Iterator<Item = &'a str>,
) -> Result<Vec<f64>, BoundingBoxParseError> {
    tokens
        .map(|token| {
            let token = token.trim();
            token
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| BoundingBoxParseError::InvalidCoordinate {
                    literal: literal.to_owned(),
                    token: token.to_owned(),
                })
        })
        .collect()
}
