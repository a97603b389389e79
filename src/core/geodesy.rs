// Geodesic distance between two lat/lon points.
//
// The ellipsoidal model is Karney's geodesic on WGS-84 (via `geo::Geodesic`), which
// converges for every pair of points, antipodes included. The spherical model is
// `geo::Haversine` on the mean Earth radius.

use crate::domain::model::{Coordinates, EarthModel};
use crate::domain::ports::DistanceModel;
use geo::{Distance, Geodesic, Haversine, Point};
use std::cmp::Ordering;

/// Orders the pair so both argument orders run the exact same float operations.
fn canonical(a: Coordinates, b: Coordinates) -> (Point<f64>, Point<f64>) {
    let ordering = a
        .latitude
        .total_cmp(&b.latitude)
        .then(a.longitude.total_cmp(&b.longitude));
    let (first, second) = match ordering {
        Ordering::Greater => (b, a),
        _ => (a, b),
    };
    (to_point(first), to_point(second))
}

fn to_point(coordinates: Coordinates) -> Point<f64> {
    Point::new(coordinates.longitude, coordinates.latitude)
}

/// Ellipsoidal (WGS-84) geodesic distance, Karney's algorithm.
#[derive(Debug, Clone, Copy, Default)]
pub struct KarneyGeodesic;

impl DistanceModel for KarneyGeodesic {
    fn name(&self) -> &'static str {
        "karney-wgs84"
    }

    fn distance_m(&self, a: Coordinates, b: Coordinates) -> f64 {
        if a == b {
            return 0.0;
        }
        let (origin, destination) = canonical(a, b);
        Geodesic.distance(origin, destination)
    }
}

/// Great-circle distance on a sphere of mean Earth radius.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreatCircle;

impl DistanceModel for GreatCircle {
    fn name(&self) -> &'static str {
        "haversine"
    }

    fn distance_m(&self, a: Coordinates, b: Coordinates) -> f64 {
        if a == b {
            return 0.0;
        }
        let (origin, destination) = canonical(a, b);
        Haversine.distance(origin, destination)
    }
}

pub fn distance_model(model: EarthModel) -> Box<dyn DistanceModel> {
    match model {
        EarthModel::Ellipsoidal => Box::new(KarneyGeodesic),
        EarthModel::Spherical => Box::new(GreatCircle),
    }
}
