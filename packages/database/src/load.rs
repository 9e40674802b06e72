//! Write path for the offline dataset builder.
//!
//! The query layers never call these; they exist for the loader that
//! populates the store once, and for test fixtures.

use duckdb::{Connection, params_from_iter};

use crate::DbError;
use crate::table::ZipcodeTable;

/// Inserts or replaces one record, compressing attribute blobs on write.
///
/// # Errors
///
/// Returns [`DbError`] if encoding or the insert fails.
pub fn insert<T: ZipcodeTable>(conn: &Connection, record: &T) -> Result<(), DbError> {
    let placeholders = vec!["?"; T::COLUMNS.len()].join(", ");
    let sql = format!(
        "INSERT OR REPLACE INTO {} ({}) VALUES ({placeholders})",
        T::TABLE,
        T::COLUMNS.join(", "),
    );

    conn.execute(&sql, params_from_iter(record.to_params()?))?;

    Ok(())
}

/// Inserts a batch of records, returning the number loaded.
///
/// # Errors
///
/// Returns [`DbError`] if any insert fails.
pub fn insert_batch<T: ZipcodeTable>(conn: &Connection, records: &[T]) -> Result<usize, DbError> {
    for record in records {
        insert(conn, record)?;
    }

    log::info!("Loaded {} rows into {}", records.len(), T::TABLE);

    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use duckdb::types::Value;
    use serde_json::json;
    use zip_atlas_models::{ComprehensiveZipcode, SimpleZipcode, ZipcodeType};

    use crate::{Scan, store};

    use super::*;

    fn simple_record() -> SimpleZipcode {
        SimpleZipcode {
            zipcode: Some("10001".to_string()),
            zipcode_type: Some(ZipcodeType::Standard),
            major_city: Some("New York".to_string()),
            post_office_city: Some("New York, NY".to_string()),
            common_city_list: Some(vec!["New York".to_string(), "Manhattan".to_string()]),
            county: Some("New York County".to_string()),
            state: Some("NY".to_string()),
            lat: Some(40.75),
            lng: Some(-73.99),
            timezone: Some("America/New_York".to_string()),
            radius_in_miles: Some(0.9),
            area_code_list: Some(vec!["212".to_string(), "646".to_string()]),
            population: Some(21_102),
            population_density: Some(33_959.0),
            land_area_in_sqmi: Some(0.62),
            water_area_in_sqmi: Some(0.0),
            housing_units: Some(12_476),
            occupied_housing_units: Some(11_031),
            median_home_value: Some(650_000),
            median_household_income: Some(81_671),
            bounds_west: Some(-74.008_621),
            bounds_east: Some(-73.984_076),
            bounds_north: Some(40.759_731),
            bounds_south: Some(40.743_451),
        }
    }

    #[test]
    fn round_trips_a_simple_record() {
        let conn = store::open_in_memory().unwrap();
        let record = simple_record();
        insert(&conn, &record).unwrap();

        let rows: Vec<SimpleZipcode> = Scan::new()
            .and_where("zipcode = ?", [Value::Text("10001".to_string())])
            .fetch(&conn)
            .unwrap();

        assert_eq!(rows.len(), 1);
        let loaded = &rows[0];
        assert_eq!(loaded.zipcode.as_deref(), Some("10001"));
        assert_eq!(loaded.zipcode_type, Some(ZipcodeType::Standard));
        assert_eq!(
            loaded.common_city_list.as_deref(),
            Some(&["New York".to_string(), "Manhattan".to_string()][..])
        );
        assert_eq!(loaded.area_code_list.as_deref(), Some(&["212".to_string(), "646".to_string()][..]));
        assert_eq!(loaded.population, Some(21_102));
        assert_eq!(loaded.bounds_north, Some(40.759_731));
    }

    #[test]
    fn round_trips_a_comprehensive_record() {
        let conn = store::open_in_memory().unwrap();
        let record = ComprehensiveZipcode {
            simple: simple_record(),
            population_by_age: Some(json!([
                {"key": "0-9", "values": [{"x": 2010, "y": 1200}]},
            ])),
            household_income: Some(json!({"under_25k": 18.2, "25k_to_50k": 16.5})),
            ..ComprehensiveZipcode::default()
        };
        insert(&conn, &record).unwrap();

        let rows: Vec<ComprehensiveZipcode> = Scan::new()
            .and_where("zipcode = ?", [Value::Text("10001".to_string())])
            .fetch(&conn)
            .unwrap();

        assert_eq!(rows.len(), 1);
        let loaded = &rows[0];
        assert_eq!(loaded.simple.major_city.as_deref(), Some("New York"));
        assert_eq!(loaded.population_by_age, record.population_by_age);
        assert_eq!(loaded.household_income, record.household_income);
        assert_eq!(loaded.polygon, None);
    }

    #[test]
    fn replaces_on_duplicate_key() {
        let conn = store::open_in_memory().unwrap();
        insert(&conn, &simple_record()).unwrap();

        let mut updated = simple_record();
        updated.population = Some(99_999);
        insert(&conn, &updated).unwrap();

        let rows: Vec<SimpleZipcode> = Scan::new().fetch(&conn).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].population, Some(99_999));
    }

    #[test]
    fn corrupt_blob_is_attributed_to_its_row() {
        let conn = store::open_in_memory().unwrap();
        insert(&conn, &simple_record()).unwrap();

        conn.execute(
            "UPDATE simple_zipcode SET common_city_list = ? WHERE zipcode = ?",
            duckdb::params![
                Value::Blob(vec![0xde, 0xad, 0xbe, 0xef]),
                Value::Text("10001".to_string()),
            ],
        )
        .unwrap();

        let result: Result<Vec<SimpleZipcode>, _> = Scan::new().fetch(&conn);
        match result {
            Err(DbError::Corrupt { zipcode, column, .. }) => {
                assert_eq!(zipcode, "10001");
                assert_eq!(column, "common_city_list");
            }
            other => panic!("expected Corrupt error, got {other:?}"),
        }
    }

    #[test]
    fn batch_insert_reports_count() {
        let conn = store::open_in_memory().unwrap();
        let mut second = simple_record();
        second.zipcode = Some("10002".to_string());
        let n = insert_batch(&conn, &[simple_record(), second]).unwrap();
        assert_eq!(n, 2);
    }
}
