/// Maximum description length, counted in characters after trimming
pub const MAX_DESCRIPTION_LENGTH: usize = 300;

/// Default number of reports returned by a nearby query
pub const DEFAULT_NEARBY_LIMIT: usize = 50;

/// Hard cap on nearby query results
pub const MAX_NEARBY_LIMIT: usize = 200;

/// Largest accepted nearby radius (50km)
pub const MAX_RADIUS_METERS: f64 = 50_000.0;

/// Default number of reports returned by the list endpoint
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Hard cap on list endpoint results
pub const MAX_LIST_LIMIT: usize = 1_000;

/// Mean Earth radius in meters (for Haversine formula)
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Length of one degree of latitude on the mean-radius sphere
pub const METERS_PER_DEGREE: f64 = EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;
