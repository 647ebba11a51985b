use crate::grid::error::GridError;
use crate::grid::grid_point::{haversine_angle, Grid, IndexedPoint, RadianPoint};
use crate::types::location::LatLon;
use haversine::{distance, Location as HaversineLocation, Units};
use ordered_float::OrderedFloat;
use rstar::RTree;

// Number of candidates pulled from the tree before picking the closest by haversine.
const CANDIDATES: usize = 2;

/// The grid point closest to a query coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMatch {
    /// Position of the point in the original grid ordering.
    pub position: usize,
    pub latitude: f64,
    pub longitude: f64,
    /// Great-circle distance from the query, in kilometres.
    pub distance_km: f64,
}

/// Nearest-neighbour index over the grid points under great-circle distance.
///
/// Points are converted to radians and then to unit-sphere vectors before they go into an
/// R-tree, which makes lookups logarithmic in the number of grid points. Lookups always
/// report the position of the point in the sequence the index was built from, never a
/// position internal to the tree.
///
/// When two points are exactly equidistant from the query, the one the tree yields first
/// wins. This is deterministic for a given point set but otherwise unspecified.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    rtree: RTree<IndexedPoint>,
}

impl SpatialIndex {
    /// Builds an index over `(latitude, longitude)` pairs in degrees. The n-th pair gets
    /// position n.
    pub fn build<I>(points: I) -> Result<Self, GridError>
    where
        I: IntoIterator<Item = LatLon>,
    {
        let indexed = points
            .into_iter()
            .enumerate()
            .map(|(position, LatLon(latitude, longitude))| {
                if !latitude.is_finite() || !longitude.is_finite() {
                    return Err(GridError::InvalidCoordinate {
                        position,
                        latitude,
                        longitude,
                    });
                }
                Ok(IndexedPoint::new(
                    position,
                    RadianPoint::from_degrees(latitude, longitude),
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if indexed.is_empty() {
            return Err(GridError::EmptyIndex);
        }

        Ok(Self {
            rtree: RTree::bulk_load(indexed),
        })
    }

    /// Builds an index over a grid's sites; positions match the grid's.
    pub fn from_grid(grid: &Grid) -> Result<Self, GridError> {
        Self::build(
            grid.points()
                .iter()
                .map(|p| LatLon(p.latitude, p.longitude)),
        )
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.rtree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.rtree.size() == 0
    }

    /// Position of the grid point nearest to (`latitude`, `longitude`), given in degrees.
    pub fn nearest(&self, latitude: f64, longitude: f64) -> Result<usize, GridError> {
        self.nearest_match(latitude, longitude)
            .map(|found| found.position)
    }

    /// Like [`SpatialIndex::nearest`], but also reports the matched coordinate and its
    /// distance from the query.
    pub fn nearest_match(&self, latitude: f64, longitude: f64) -> Result<GridMatch, GridError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(GridError::InvalidQuery {
                latitude,
                longitude,
            });
        }
        let query = RadianPoint::from_degrees(latitude, longitude);

        let closest = self
            .rtree
            .nearest_neighbor_iter(&query.to_unit_vector())
            .take(CANDIDATES)
            .min_by_key(|candidate| OrderedFloat(haversine_angle(candidate.radians, query)))
            .ok_or(GridError::EmptyIndex)?;

        let matched = closest.radians.to_degrees();
        let distance_km = distance(
            HaversineLocation {
                latitude,
                longitude,
            },
            HaversineLocation {
                latitude: matched.0,
                longitude: matched.1,
            },
            Units::Kilometers,
        );

        Ok(GridMatch {
            position: closest.position,
            latitude: matched.0,
            longitude: matched.1,
            distance_km,
        })
    }
}
