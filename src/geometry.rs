#[derive(PartialEq, Debug, Clone, Default)]
pub struct Point2d {
    pub x_coord: f64,
    pub y_coord: f64,
}

impl Point2d {
    pub fn new(x_coord: f64, y_coord: f64) -> Point2d {
        Point2d{x_coord, y_coord}
    }

    pub fn plus(&self, other: &Point2d) -> Point2d {
        Point2d::new(self.x_coord + other.x_coord, self.y_coord + other.y_coord)
    }

    pub fn minus(&self, other: &Point2d) -> Point2d {
        Point2d::new(self.x_coord - other.x_coord, self.y_coord - other.y_coord)
    }

    pub fn times(&self, factor: f64) -> Point2d {
        Point2d::new(self.x_coord * factor, self.y_coord * factor)
    }

    pub fn euclidean_distance(&self, other: &Point2d) -> f64 {
        let diff = self.minus(other);
        (diff.x_coord.powi(2) + diff.y_coord.powi(2)).sqrt()
    }

    /// The point a fraction `tt` of the way from self to `other`.
    pub fn lerp(&self, other: &Point2d, tt: f64) -> Point2d {
        self.times(1.0 - tt).plus(&other.times(tt))
    }
}


/// Geographic position of a node, in degrees.
#[derive(PartialEq, Debug, Clone, Copy, Default)]
pub struct GeoCoord {
    pub lat: f64,
    pub lon: f64,
}

impl GeoCoord {
    pub fn new(lat: f64, lon: f64) -> GeoCoord {
        GeoCoord{lat, lon}
    }
}


/// Mean of a set of geographic coordinates.  (0, 0) if there are none.
pub fn mean_geo_coord<'a, II>(coords: II) -> GeoCoord
    where II: IntoIterator<Item = &'a GeoCoord>
{
    let mut count = 0;
    let mut center = GeoCoord::default();
    for coord in coords {
        center.lat += coord.lat;
        center.lon += coord.lon;
        count += 1;
    }
    if count > 0 {
        center.lat /= count as f64;
        center.lon /= count as f64;
    }
    center
}


#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_distance_and_lerp() {
        let aa = Point2d::new(0., 0.);
        let bb = Point2d::new(3., 4.);
        assert_relative_eq!(aa.euclidean_distance(&bb), 5.);
        let mid = aa.lerp(&bb, 0.5);
        assert_eq!(mid, Point2d::new(1.5, 2.));
        assert_eq!(aa.lerp(&bb, 1.0), bb);
    }

    #[test]
    fn test_mean_geo_coord() {
        let coords = vec![GeoCoord::new(45., -73.), GeoCoord::new(47., -75.)];
        let center = mean_geo_coord(&coords);
        assert_relative_eq!(center.lat, 46.);
        assert_relative_eq!(center.lon, -74.);

        let empty: Vec<GeoCoord> = vec![];
        assert_eq!(mean_geo_coord(&empty), GeoCoord::default());
    }
}
