//! Defines the grid of NSRDB sites: the individual points with their position in
//! the dataset ordering, their radian and unit-sphere forms, and the `rstar`
//! implementations needed to index them.

use crate::grid::error::GridError;
use crate::types::location::LatLon;
use polars::prelude::{Column, DataFrame, DataType};
use rstar::{PointDistance, RTreeObject, AABB};

pub const LATITUDE_COLUMN: &str = "latitude";
pub const LONGITUDE_COLUMN: &str = "longitude";

/// A single site of the dataset grid.
///
/// `position` is the index of the site within the dataset's `meta` table, which is also
/// the column index of the site in every variable array.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    pub position: usize,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

impl GridPoint {
    /// The same point in radians.
    pub fn to_radians(self) -> RadianPoint {
        RadianPoint::from_degrees(self.latitude, self.longitude)
    }
}

/// A latitude/longitude pair expressed in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadianPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl RadianPoint {
    /// Converts decimal degrees to radians.
    pub fn from_degrees(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: latitude.to_radians(),
            longitude: longitude.to_radians(),
        }
    }

    /// Converts back to decimal degrees.
    pub fn to_degrees(self) -> LatLon {
        LatLon(self.latitude.to_degrees(), self.longitude.to_degrees())
    }

    /// Cartesian coordinates of the point on the unit sphere.
    ///
    /// The straight-line (chord) distance between two such vectors grows strictly with the
    /// great-circle distance, so a nearest-neighbour search in this space returns the same
    /// ordering as a haversine search, across the poles and the antimeridian included.
    pub fn to_unit_vector(self) -> [f64; 3] {
        let (sin_lat, cos_lat) = self.latitude.sin_cos();
        let (sin_lon, cos_lon) = self.longitude.sin_cos();
        [cos_lat * cos_lon, cos_lat * sin_lon, sin_lat]
    }
}

/// Great-circle distance between two points on the unit sphere, in radians.
pub fn haversine_angle(a: RadianPoint, b: RadianPoint) -> f64 {
    let half_dlat = (b.latitude - a.latitude) / 2.0;
    let half_dlon = (b.longitude - a.longitude) / 2.0;
    let h = half_dlat.sin().powi(2)
        + a.latitude.cos() * b.latitude.cos() * half_dlon.sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin()
}

/// The full set of sites of one dataset year, together with the metadata table they came from.
#[derive(Debug, Clone)]
pub struct Grid {
    meta: DataFrame,
    points: Vec<GridPoint>,
}

impl Grid {
    /// Reads the `latitude` and `longitude` columns of a dataset `meta` table.
    ///
    /// Any numeric column type is accepted. Null or non-finite coordinates are rejected,
    /// since they cannot be placed in the spatial index.
    pub fn from_meta(meta: DataFrame) -> Result<Self, GridError> {
        let latitudes = coordinate_column(&meta, LATITUDE_COLUMN)?;
        let longitudes = coordinate_column(&meta, LONGITUDE_COLUMN)?;

        let points = latitudes
            .into_iter()
            .zip(longitudes)
            .enumerate()
            .map(|(position, (latitude, longitude))| {
                let latitude = latitude.ok_or_else(|| GridError::MissingCoordinate {
                    position,
                    field: LATITUDE_COLUMN.to_string(),
                })?;
                let longitude = longitude.ok_or_else(|| GridError::MissingCoordinate {
                    position,
                    field: LONGITUDE_COLUMN.to_string(),
                })?;
                if !latitude.is_finite() || !longitude.is_finite() {
                    return Err(GridError::InvalidCoordinate {
                        position,
                        latitude,
                        longitude,
                    });
                }
                Ok(GridPoint {
                    position,
                    latitude,
                    longitude,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { meta, points })
    }

    /// Builds a grid (and a minimal two-column meta table) from bare coordinates in degrees.
    pub fn from_coordinates(coordinates: &[LatLon]) -> Result<Self, GridError> {
        let latitudes: Vec<f64> = coordinates.iter().map(|c| c.0).collect();
        let longitudes: Vec<f64> = coordinates.iter().map(|c| c.1).collect();
        let meta = DataFrame::new(vec![
            Column::new(LATITUDE_COLUMN.into(), latitudes),
            Column::new(LONGITUDE_COLUMN.into(), longitudes),
        ])?;
        Self::from_meta(meta)
    }

    /// The metadata table the grid was read from, all columns included.
    pub fn meta(&self) -> &DataFrame {
        &self.meta
    }

    /// Consumes the grid, returning its metadata table.
    pub fn into_meta(self) -> DataFrame {
        self.meta
    }

    /// All sites, in position order.
    pub fn points(&self) -> &[GridPoint] {
        &self.points
    }

    /// The site at `position`, if the grid has one.
    pub fn get(&self, position: usize) -> Option<&GridPoint> {
        self.points.get(position)
    }

    /// Number of sites.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// True when both grids list exactly the same coordinates in the same order.
    pub fn same_coordinates(&self, other: &Grid) -> bool {
        self.points == other.points
    }
}

fn coordinate_column(meta: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, GridError> {
    let to_grid_error = |source| GridError::MetaColumn {
        column: name.to_string(),
        source,
    };
    let column = meta
        .column(name)
        .and_then(|c| c.cast(&DataType::Float64))
        .map_err(to_grid_error)?;
    let values = column.f64().map_err(to_grid_error)?;
    Ok(values.into_iter().collect())
}

/// A grid point as stored in the R-tree: its original position plus its unit-sphere vector.
#[derive(Debug, Clone, Copy)]
pub(crate) struct IndexedPoint {
    pub position: usize,
    pub radians: RadianPoint,
    xyz: [f64; 3],
}

impl IndexedPoint {
    pub fn new(position: usize, radians: RadianPoint) -> Self {
        Self {
            position,
            radians,
            xyz: radians.to_unit_vector(),
        }
    }
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.xyz)
    }
}

impl PointDistance for IndexedPoint {
    /// Squared chord distance between this point and `point` on the unit sphere.
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        let dx = self.xyz[0] - point[0];
        let dy = self.xyz[1] - point[1];
        let dz = self.xyz[2] - point[2];
        dx * dx + dy * dy + dz * dz
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_radians_round_trip() {
        let samples = [
            (0.0, 0.0),
            (40.5, -150.0),
            (-89.99, 179.99),
            (90.0, -180.0),
            (12.3456, 98.7654),
        ];
        for (lat, lon) in samples {
            let back = RadianPoint::from_degrees(lat, lon).to_degrees();
            assert!((back.0 - lat).abs() < 1e-9, "latitude {} -> {}", lat, back.0);
            assert!((back.1 - lon).abs() < 1e-9, "longitude {} -> {}", lon, back.1);
        }
    }

    #[test]
    fn test_haversine_known_distances() {
        let origin = RadianPoint::from_degrees(0.0, 0.0);
        let pole = RadianPoint::from_degrees(90.0, 0.0);
        let antipode = RadianPoint::from_degrees(0.0, 180.0);
        assert!((haversine_angle(origin, pole) - FRAC_PI_2).abs() < 1e-12);
        assert!((haversine_angle(origin, antipode) - PI).abs() < 1e-12);
        assert_eq!(haversine_angle(origin, origin), 0.0);

        // Crossing the antimeridian is a short hop, not half the globe.
        let west = RadianPoint::from_degrees(0.0, 179.5);
        let east = RadianPoint::from_degrees(0.0, -179.5);
        assert!((haversine_angle(west, east) - 1.0_f64.to_radians()).abs() < 1e-12);
    }

    #[test]
    fn test_grid_from_meta_keeps_order() {
        let grid = Grid::from_coordinates(&[LatLon(10.0, 20.0), LatLon(-5.0, 30.0)]).unwrap();
        assert_eq!(grid.len(), 2);
        assert_eq!(
            grid.get(1),
            Some(&GridPoint {
                position: 1,
                latitude: -5.0,
                longitude: 30.0
            })
        );
        assert_eq!(grid.meta().height(), 2);
    }

    #[test]
    fn test_grid_accepts_f32_columns() {
        let meta = DataFrame::new(vec![
            Column::new("latitude".into(), vec![35.5f32, 36.5]),
            Column::new("longitude".into(), vec![-150.0f32, -149.0]),
            Column::new("elevation".into(), vec![12i32, 40]),
        ])
        .unwrap();
        let grid = Grid::from_meta(meta).unwrap();
        assert_eq!(grid.points()[1].latitude, 36.5);
        assert_eq!(grid.meta().width(), 3);
    }

    #[test]
    fn test_grid_missing_column() {
        let meta = DataFrame::new(vec![Column::new("latitude".into(), vec![1.0f64])]).unwrap();
        let err = Grid::from_meta(meta).unwrap_err();
        assert!(matches!(err, GridError::MetaColumn { ref column, .. } if column == "longitude"));
    }

    #[test]
    fn test_grid_rejects_non_finite() {
        let err = Grid::from_coordinates(&[LatLon(1.0, 2.0), LatLon(f64::NAN, 2.0)]).unwrap_err();
        assert!(matches!(err, GridError::InvalidCoordinate { position: 1, .. }));
    }

    #[test]
    fn test_grid_rejects_nulls() {
        let meta = DataFrame::new(vec![
            Column::new("latitude".into(), vec![Some(1.0f64), None]),
            Column::new("longitude".into(), vec![Some(2.0f64), Some(3.0)]),
        ])
        .unwrap();
        let err = Grid::from_meta(meta).unwrap_err();
        assert!(matches!(err, GridError::MissingCoordinate { position: 1, .. }));
    }

    #[test]
    fn test_same_coordinates() {
        let a = Grid::from_coordinates(&[LatLon(1.0, 2.0), LatLon(3.0, 4.0)]).unwrap();
        let b = Grid::from_coordinates(&[LatLon(1.0, 2.0), LatLon(3.0, 4.0)]).unwrap();
        let c = Grid::from_coordinates(&[LatLon(3.0, 4.0), LatLon(1.0, 2.0)]).unwrap();
        assert!(a.same_coordinates(&b));
        assert!(!a.same_coordinates(&c));
    }
}
