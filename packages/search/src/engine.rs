//! The search engine: validated queries against one zipcode table.

use std::marker::PhantomData;
use std::path::Path;

use duckdb::Connection;
use duckdb::types::Value;
use zip_atlas_database::{DbError, Scan, ZipcodeTable, store};
use zip_atlas_models::{ComprehensiveZipcode, SimpleZipcode, Unit, ZipcodeRecord as _, haversine};

use crate::QueryError;
use crate::bbox::BoundingBox;
use crate::options::SearchOptions;

/// Query engine over a zipcode store.
///
/// Generic over the active record shape; the shape is chosen once here,
/// at construction, and every operation exposes the same query surface
/// for both. The engine owns the process-wide store handle: open once at
/// startup, share freely (all operations are reads), close on shutdown.
pub struct SearchEngine<T: ZipcodeTable> {
    conn: Connection,
    _shape: PhantomData<fn() -> T>,
}

/// Engine over the light record shape.
pub type SimpleSearchEngine = SearchEngine<SimpleZipcode>;

/// Engine over the full demographic record shape.
pub type ComprehensiveSearchEngine = SearchEngine<ComprehensiveZipcode>;

impl<T: ZipcodeTable> SearchEngine<T> {
    /// Opens the store at `path` and wraps it in an engine.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] if the store cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, QueryError> {
        Ok(Self::from_connection(store::open(path.as_ref())?))
    }

    /// Opens an empty in-memory store, mainly for tests and demos.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] if the store cannot be created.
    pub fn open_in_memory() -> Result<Self, QueryError> {
        Ok(Self::from_connection(store::open_in_memory()?))
    }

    /// Wraps an already opened store connection.
    #[must_use]
    pub const fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            _shape: PhantomData,
        }
    }

    /// The underlying store handle.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Closes the store handle.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] if the underlying connection fails to
    /// close cleanly.
    pub fn close(self) -> Result<(), QueryError> {
        self.conn
            .close()
            .map_err(|(_, e)| QueryError::Db(DbError::Database(e)))
    }

    /// Looks up one record by exact zipcode.
    ///
    /// A missing code is a normal outcome, returned as `None`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] if the store read fails.
    pub fn by_zipcode(&self, zipcode: &str) -> Result<Option<T>, QueryError> {
        let rows = Scan::new()
            .and_where("zipcode = ?", [Value::Text(zipcode.to_string())])
            .limit(1)
            .fetch(&self.conn)?;
        Ok(rows.into_iter().next())
    }

    /// Finds records whose city starts with `city` (case-insensitive) in
    /// an exact state.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] on a malformed state abbreviation, invalid
    /// options, or a store failure.
    pub fn by_city_and_state(
        &self,
        city: &str,
        state: &str,
        options: &SearchOptions,
    ) -> Result<Vec<T>, QueryError> {
        options.validate()?;
        let state = validate_state(state)?;
        let scan = Scan::new()
            .and_where(
                "lower(major_city) LIKE ? ESCAPE '\\'",
                [Value::Text(like_prefix(&city.to_lowercase()))],
            )
            .and_where("upper(state) = ?", [Value::Text(state)]);
        self.run(scan, options)
    }

    /// Finds records whose city starts with `city`, case-insensitively,
    /// in any state.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] on invalid options or a store failure.
    pub fn by_city(&self, city: &str, options: &SearchOptions) -> Result<Vec<T>, QueryError> {
        options.validate()?;
        let scan = Scan::new().and_where(
            "lower(major_city) LIKE ? ESCAPE '\\'",
            [Value::Text(like_prefix(&city.to_lowercase()))],
        );
        self.run(scan, options)
    }

    /// Finds every record in a state.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] on a malformed state abbreviation, invalid
    /// options, or a store failure.
    pub fn by_state(&self, state: &str, options: &SearchOptions) -> Result<Vec<T>, QueryError> {
        options.validate()?;
        let state = validate_state(state)?;
        let scan = Scan::new().and_where("upper(state) = ?", [Value::Text(state)]);
        self.run(scan, options)
    }

    /// Finds records whose zipcode starts with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] on invalid options or a store failure.
    pub fn by_prefix(&self, prefix: &str, options: &SearchOptions) -> Result<Vec<T>, QueryError> {
        options.validate()?;
        let scan = Scan::new().and_where(
            "zipcode LIKE ? ESCAPE '\\'",
            [Value::Text(like_prefix(prefix))],
        );
        self.run(scan, options)
    }

    /// Finds records with `population` in `lower..=upper`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] on invalid options or a store failure.
    pub fn by_population(
        &self,
        lower: i64,
        upper: i64,
        options: &SearchOptions,
    ) -> Result<Vec<T>, QueryError> {
        self.by_int_range("population", lower, upper, options)
    }

    /// Finds records with `population_density` in `lower..=upper`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] on invalid options or a store failure.
    pub fn by_population_density(
        &self,
        lower: f64,
        upper: f64,
        options: &SearchOptions,
    ) -> Result<Vec<T>, QueryError> {
        self.by_float_range("population_density", lower, upper, options)
    }

    /// Finds records with `land_area_in_sqmi` in `lower..=upper`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] on invalid options or a store failure.
    pub fn by_land_area(
        &self,
        lower: f64,
        upper: f64,
        options: &SearchOptions,
    ) -> Result<Vec<T>, QueryError> {
        self.by_float_range("land_area_in_sqmi", lower, upper, options)
    }

    /// Finds records with `water_area_in_sqmi` in `lower..=upper`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] on invalid options or a store failure.
    pub fn by_water_area(
        &self,
        lower: f64,
        upper: f64,
        options: &SearchOptions,
    ) -> Result<Vec<T>, QueryError> {
        self.by_float_range("water_area_in_sqmi", lower, upper, options)
    }

    /// Finds records with `housing_units` in `lower..=upper`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] on invalid options or a store failure.
    pub fn by_housing_units(
        &self,
        lower: i64,
        upper: i64,
        options: &SearchOptions,
    ) -> Result<Vec<T>, QueryError> {
        self.by_int_range("housing_units", lower, upper, options)
    }

    /// Finds records with `occupied_housing_units` in `lower..=upper`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] on invalid options or a store failure.
    pub fn by_occupied_housing_units(
        &self,
        lower: i64,
        upper: i64,
        options: &SearchOptions,
    ) -> Result<Vec<T>, QueryError> {
        self.by_int_range("occupied_housing_units", lower, upper, options)
    }

    /// Finds records with `median_home_value` in `lower..=upper`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] on invalid options or a store failure.
    pub fn by_median_home_value(
        &self,
        lower: i64,
        upper: i64,
        options: &SearchOptions,
    ) -> Result<Vec<T>, QueryError> {
        self.by_int_range("median_home_value", lower, upper, options)
    }

    /// Finds records with `median_household_income` in `lower..=upper`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] on invalid options or a store failure.
    pub fn by_median_household_income(
        &self,
        lower: i64,
        upper: i64,
        options: &SearchOptions,
    ) -> Result<Vec<T>, QueryError> {
        self.by_int_range("median_household_income", lower, upper, options)
    }

    /// Finds records within `radius` of a point, nearest first.
    ///
    /// Runs in three phases: a bounding-box pre-filter restricted to the
    /// indexed `lat`/`lng` columns (a superset of the circle), the exact
    /// great-circle filter, then a distance sort with a `zipcode`
    /// tiebreak. `returns` caps the result only after sorting, so a
    /// closer match is never dropped in favor of a farther one.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] if the coordinates or radius are out of
    /// physical range, `returns` is zero, or the store read fails.
    pub fn by_coordinates(
        &self,
        lat: f64,
        lng: f64,
        radius: f64,
        unit: Unit,
        returns: usize,
    ) -> Result<Vec<T>, QueryError> {
        validate_lat(lat)?;
        validate_lng(lng)?;
        if !radius.is_finite() || radius <= 0.0 {
            return Err(QueryError::InvalidRadius(radius));
        }
        if returns == 0 {
            return Err(QueryError::InvalidReturns(returns));
        }

        let bbox = BoundingBox::around(lat, lng, radius, unit);
        let candidates: Vec<T> = Scan::new()
            .and_where(
                "lat BETWEEN ? AND ?",
                [Value::Double(bbox.lat_min), Value::Double(bbox.lat_max)],
            )
            .and_where(
                "lng BETWEEN ? AND ?",
                [Value::Double(bbox.lng_min), Value::Double(bbox.lng_max)],
            )
            .fetch(&self.conn)?;

        log::debug!(
            "Radius query at ({lat}, {lng}) r={radius} {unit}: box admitted {} candidates",
            candidates.len()
        );

        let mut hits: Vec<(f64, T)> = Vec::new();
        for record in candidates {
            let base = record.base();
            let (Some(record_lat), Some(record_lng)) = (base.lat, base.lng) else {
                continue;
            };
            let distance = haversine(record_lat, record_lng, lat, lng, unit);
            if distance <= radius {
                hits.push((distance, record));
            }
        }

        hits.sort_by(|(a_dist, a), (b_dist, b)| {
            a_dist
                .total_cmp(b_dist)
                .then_with(|| a.base().zipcode.cmp(&b.base().zipcode))
        });
        hits.truncate(returns);

        Ok(hits.into_iter().map(|(_, record)| record).collect())
    }

    fn by_int_range(
        &self,
        column: &str,
        lower: i64,
        upper: i64,
        options: &SearchOptions,
    ) -> Result<Vec<T>, QueryError> {
        options.validate()?;
        let scan = Scan::new().and_where(
            &format!("{column} BETWEEN ? AND ?"),
            [Value::BigInt(lower), Value::BigInt(upper)],
        );
        self.run(scan, options)
    }

    fn by_float_range(
        &self,
        column: &str,
        lower: f64,
        upper: f64,
        options: &SearchOptions,
    ) -> Result<Vec<T>, QueryError> {
        options.validate()?;
        let scan = Scan::new().and_where(
            &format!("{column} BETWEEN ? AND ?"),
            [Value::Double(lower), Value::Double(upper)],
        );
        self.run(scan, options)
    }

    fn run(&self, scan: Scan, options: &SearchOptions) -> Result<Vec<T>, QueryError> {
        Ok(scan
            .order_by(options.sort_by.as_ref(), options.ascending)
            .limit(options.returns)
            .fetch(&self.conn)?)
    }
}

fn validate_lat(lat: f64) -> Result<(), QueryError> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        Err(QueryError::InvalidLatitude(lat))
    }
}

fn validate_lng(lng: f64) -> Result<(), QueryError> {
    if (-180.0..=180.0).contains(&lng) {
        Ok(())
    } else {
        Err(QueryError::InvalidLongitude(lng))
    }
}

fn validate_state(state: &str) -> Result<String, QueryError> {
    if state.len() == 2 && state.bytes().all(|b| b.is_ascii_alphabetic()) {
        Ok(state.to_ascii_uppercase())
    } else {
        Err(QueryError::InvalidState(state.to_string()))
    }
}

/// Escapes LIKE wildcards in `value` and appends the trailing `%`.
fn like_prefix(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 1);
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use zip_atlas_database::load;
    use zip_atlas_models::{ZipcodeRecord as _, ZipcodeType};

    use crate::options::SortKey;

    use super::*;

    fn record(
        zipcode: &str,
        city: &str,
        state: &str,
        lat: f64,
        lng: f64,
        population: i64,
    ) -> SimpleZipcode {
        SimpleZipcode {
            zipcode: Some(zipcode.to_string()),
            zipcode_type: Some(ZipcodeType::Standard),
            major_city: Some(city.to_string()),
            state: Some(state.to_string()),
            lat: Some(lat),
            lng: Some(lng),
            population: Some(population),
            ..SimpleZipcode::default()
        }
    }

    fn fixture_engine() -> SimpleSearchEngine {
        let engine = SimpleSearchEngine::open_in_memory().unwrap();

        let mut ten_one = record("10001", "New York", "NY", 40.7506, -73.9972, 21_102);
        ten_one.median_home_value = Some(650_000);
        let mut hoboken = record("07030", "Hoboken", "NJ", 40.7453, -74.0279, 53_193);
        hoboken.median_home_value = Some(550_000);
        let mut ten_three = record("10003", "New York", "NY", 40.7317, -73.9890, 54_682);
        ten_three.median_home_value = Some(850_000);

        let records = vec![
            ten_one,
            ten_three,
            hoboken,
            record("10002", "New York", "NY", 40.7157, -73.9860, 74_993),
            record("10007", "New York", "NY", 40.7139, -74.0079, 6_988),
            record("11201", "Brooklyn", "NY", 40.6946, -73.9896, 51_377),
            // Inside the 5-mile pre-filter box around (40.75, -73.99)
            // but ~6.7 miles out by great-circle distance.
            record("07097", "Jersey City", "NJ", 40.6800, -74.0800, 13_000),
            record("90001", "Los Angeles", "CA", 33.9731, -118.2479, 57_110),
            record("60601", "Chicago", "IL", 41.8858, -87.6229, 14_675),
            record("94105", "San Francisco", "CA", 37.7898, -122.3942, 5_846),
        ];
        load::insert_batch(engine.connection(), &records).unwrap();

        engine
    }

    fn zipcodes(records: &[SimpleZipcode]) -> Vec<&str> {
        records
            .iter()
            .filter_map(|r| r.zipcode.as_deref())
            .collect()
    }

    #[test]
    fn by_zipcode_finds_the_exact_record() {
        let engine = fixture_engine();
        let z = engine.by_zipcode("10001").unwrap().unwrap();
        assert_eq!(z.state.as_deref(), Some("NY"));
        assert_eq!(z.major_city.as_deref(), Some("New York"));
        assert!(z.is_present());
    }

    #[test]
    fn by_zipcode_misses_are_absent_not_errors() {
        let engine = fixture_engine();
        assert!(engine.by_zipcode("99999").unwrap().is_none());
    }

    #[test]
    fn by_city_and_state_matches_case_insensitively() {
        let engine = fixture_engine();
        let results = engine
            .by_city_and_state("new york", "ny", &SearchOptions::default())
            .unwrap();
        assert_eq!(zipcodes(&results), ["10001", "10002", "10003", "10007"]);
    }

    #[test]
    fn by_city_and_state_accepts_a_city_prefix() {
        let engine = fixture_engine();
        let results = engine
            .by_city_and_state("New", "NY", &SearchOptions::default())
            .unwrap();
        assert_eq!(zipcodes(&results), ["10001", "10002", "10003", "10007"]);
    }

    #[test]
    fn by_city_and_state_rejects_malformed_states() {
        let engine = fixture_engine();
        let err = engine
            .by_city_and_state("New York", "New York", &SearchOptions::default())
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidState(_)));

        let err = engine
            .by_city_and_state("New York", "N", &SearchOptions::default())
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidState(_)));
    }

    #[test]
    fn by_city_ignores_state() {
        let engine = fixture_engine();
        let results = engine.by_city("HOBOKEN", &SearchOptions::default()).unwrap();
        assert_eq!(zipcodes(&results), ["07030"]);
    }

    #[test]
    fn by_state_returns_every_record_in_the_state() {
        let engine = fixture_engine();
        let results = engine.by_state("nj", &SearchOptions::default()).unwrap();
        assert_eq!(zipcodes(&results), ["07030", "07097"]);
    }

    #[test]
    fn by_prefix_matches_leading_digits() {
        let engine = fixture_engine();
        let results = engine.by_prefix("100", &SearchOptions::default()).unwrap();
        assert_eq!(zipcodes(&results), ["10001", "10002", "10003", "10007"]);
    }

    #[test]
    fn by_population_is_an_inclusive_range_with_a_cap() {
        let engine = fixture_engine();
        let options = SearchOptions {
            returns: 10,
            ..SearchOptions::default()
        };
        let results = engine.by_population(10_000, 50_000, &options).unwrap();
        assert!(results.len() <= 10);
        assert_eq!(zipcodes(&results), ["07097", "10001", "60601"]);
        for z in &results {
            let population = z.population.unwrap();
            assert!((10_000..=50_000).contains(&population));
        }
    }

    #[test]
    fn sort_override_orders_by_the_requested_attribute() {
        let engine = fixture_engine();
        let options = SearchOptions {
            sort_by: SortKey::Population,
            ascending: false,
            returns: 3,
        };
        let results = engine.by_population(0, 1_000_000, &options).unwrap();
        assert_eq!(zipcodes(&results), ["10002", "90001", "10003"]);
    }

    #[test]
    fn by_median_home_value_filters_its_column() {
        let engine = fixture_engine();
        let options = SearchOptions {
            returns: 10,
            ..SearchOptions::default()
        };
        let results = engine.by_median_home_value(500_000, 700_000, &options).unwrap();
        assert_eq!(zipcodes(&results), ["07030", "10001"]);
    }

    #[test]
    fn by_coordinates_orders_nearest_first_within_radius() {
        let engine = fixture_engine();
        let results = engine
            .by_coordinates(40.75, -73.99, 5.0, Unit::Miles, 10)
            .unwrap();
        assert_eq!(
            zipcodes(&results),
            ["10001", "10003", "07030", "10002", "10007", "11201"]
        );

        let mut previous = 0.0f64;
        for z in &results {
            let distance = z.dist_from(40.75, -73.99, Unit::Miles).unwrap();
            assert!(distance <= 5.0);
            assert!(distance >= previous);
            previous = distance;
        }
    }

    #[test]
    fn by_coordinates_excludes_box_hits_beyond_the_radius() {
        let engine = fixture_engine();

        let bbox = BoundingBox::around(40.75, -73.99, 5.0, Unit::Miles);
        assert!(bbox.contains(40.6800, -74.0800));

        let results = engine
            .by_coordinates(40.75, -73.99, 5.0, Unit::Miles, 10)
            .unwrap();
        assert!(!zipcodes(&results).contains(&"07097"));
    }

    #[test]
    fn by_coordinates_paginates_after_the_exact_sort() {
        let engine = fixture_engine();
        let full = engine
            .by_coordinates(40.75, -73.99, 5.0, Unit::Miles, 10)
            .unwrap();
        let capped = engine
            .by_coordinates(40.75, -73.99, 5.0, Unit::Miles, 3)
            .unwrap();
        assert_eq!(capped, full[..3]);
    }

    #[test]
    fn by_coordinates_supports_kilometers() {
        let engine = fixture_engine();
        let results = engine
            .by_coordinates(40.75, -73.99, 8.0, Unit::Kilometers, 10)
            .unwrap();
        for z in &results {
            assert!(z.dist_from(40.75, -73.99, Unit::Kilometers).unwrap() <= 8.0);
        }
    }

    #[test]
    fn by_coordinates_rejects_out_of_range_parameters() {
        let engine = fixture_engine();
        assert!(matches!(
            engine.by_coordinates(90.5, -73.99, 5.0, Unit::Miles, 10),
            Err(QueryError::InvalidLatitude(_))
        ));
        assert!(matches!(
            engine.by_coordinates(40.75, -200.0, 5.0, Unit::Miles, 10),
            Err(QueryError::InvalidLongitude(_))
        ));
        assert!(matches!(
            engine.by_coordinates(40.75, -73.99, 0.0, Unit::Miles, 10),
            Err(QueryError::InvalidRadius(_))
        ));
        assert!(matches!(
            engine.by_coordinates(40.75, -73.99, f64::NAN, Unit::Miles, 10),
            Err(QueryError::InvalidRadius(_))
        ));
        assert!(matches!(
            engine.by_coordinates(40.75, -73.99, 5.0, Unit::Miles, 0),
            Err(QueryError::InvalidReturns(0))
        ));
    }

    #[test]
    fn zero_returns_is_rejected_on_attribute_queries() {
        let engine = fixture_engine();
        let options = SearchOptions {
            returns: 0,
            ..SearchOptions::default()
        };
        assert!(matches!(
            engine.by_population(0, 1_000_000, &options),
            Err(QueryError::InvalidReturns(0))
        ));
    }

    #[test]
    fn like_wildcards_in_input_are_literal() {
        let engine = fixture_engine();
        let results = engine.by_city("%", &SearchOptions::default()).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn comprehensive_engine_exposes_the_same_surface() {
        let engine = ComprehensiveSearchEngine::open_in_memory().unwrap();
        let z = ComprehensiveZipcode {
            simple: record("10001", "New York", "NY", 40.7506, -73.9972, 21_102),
            population_by_age: Some(json!([{"key": "0-9", "values": [1200]}])),
            ..ComprehensiveZipcode::default()
        };
        load::insert(engine.connection(), &z).unwrap();

        let found = engine.by_zipcode("10001").unwrap().unwrap();
        assert_eq!(found.simple.state.as_deref(), Some("NY"));
        assert_eq!(found.population_by_age, z.population_by_age);
        // Attributes the dataset never populated stay absent.
        assert_eq!(found.polygon, None);

        let nearby = engine
            .by_coordinates(40.75, -73.99, 5.0, Unit::Miles, 10)
            .unwrap();
        assert_eq!(nearby.len(), 1);
    }
}
