//! Connection lifecycle and schema for the zipcode store.
//!
//! Open-once, read-many, close-on-shutdown: one connection is created at
//! startup, handed to the search engine, and never replaced.

use std::path::Path;

use duckdb::Connection;

use crate::DbError;

/// Opens (or creates) the zipcode store at `path` and ensures the schema
/// exists.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open(path: &Path) -> Result<Connection, DbError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let conn = Connection::open(path)?;

    conn.execute_batch("SET threads = 4; SET memory_limit = '512MB';")?;

    create_schema(&conn)?;

    log::info!("Opened zipcode store at {}", path.display());

    Ok(conn)
}

/// Opens an in-memory zipcode store with the schema created.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open_in_memory() -> Result<Connection, DbError> {
    let conn = Connection::open_in_memory()?;
    create_schema(&conn)?;
    Ok(conn)
}

fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS simple_zipcode (
            zipcode TEXT PRIMARY KEY,
            zipcode_type TEXT,
            major_city TEXT,
            post_office_city TEXT,
            common_city_list BLOB,
            county TEXT,
            state TEXT,
            lat DOUBLE,
            lng DOUBLE,
            timezone TEXT,
            radius_in_miles DOUBLE,
            area_code_list BLOB,
            population BIGINT,
            population_density DOUBLE,
            land_area_in_sqmi DOUBLE,
            water_area_in_sqmi DOUBLE,
            housing_units BIGINT,
            occupied_housing_units BIGINT,
            median_home_value BIGINT,
            median_household_income BIGINT,
            bounds_west DOUBLE,
            bounds_east DOUBLE,
            bounds_north DOUBLE,
            bounds_south DOUBLE
        );

        CREATE INDEX IF NOT EXISTS idx_simple_zipcode_lat ON simple_zipcode (lat);
        CREATE INDEX IF NOT EXISTS idx_simple_zipcode_lng ON simple_zipcode (lng);

        CREATE TABLE IF NOT EXISTS comprehensive_zipcode (
            zipcode TEXT PRIMARY KEY,
            zipcode_type TEXT,
            major_city TEXT,
            post_office_city TEXT,
            common_city_list BLOB,
            county TEXT,
            state TEXT,
            lat DOUBLE,
            lng DOUBLE,
            timezone TEXT,
            radius_in_miles DOUBLE,
            area_code_list BLOB,
            population BIGINT,
            population_density DOUBLE,
            land_area_in_sqmi DOUBLE,
            water_area_in_sqmi DOUBLE,
            housing_units BIGINT,
            occupied_housing_units BIGINT,
            median_home_value BIGINT,
            median_household_income BIGINT,
            bounds_west DOUBLE,
            bounds_east DOUBLE,
            bounds_north DOUBLE,
            bounds_south DOUBLE,
            polygon BLOB,
            population_by_year BLOB,
            population_by_age BLOB,
            population_by_gender BLOB,
            population_by_race BLOB,
            head_of_household_by_age BLOB,
            families_vs_singles BLOB,
            households_with_kids BLOB,
            children_by_age BLOB,
            housing_type BLOB,
            year_housing_was_built BLOB,
            housing_occupancy BLOB,
            vacancy_reason BLOB,
            owner_occupied_home_values BLOB,
            rental_properties_by_number_of_rooms BLOB,
            monthly_rent_including_utilities_studio_apt BLOB,
            monthly_rent_including_utilities_1_b BLOB,
            monthly_rent_including_utilities_2_b BLOB,
            monthly_rent_including_utilities_3plus_b BLOB,
            employment_status BLOB,
            average_household_income_over_time BLOB,
            household_income BLOB,
            annual_individual_earnings BLOB,
            sources_of_household_income_percent_receiving BLOB,
            sources_of_household_income_average_per_household BLOB,
            household_investment_income_percent_receiving BLOB,
            household_investment_income_average_per_household BLOB,
            household_retirement_income_percent_receiving BLOB,
            household_retirement_income_average_per_household BLOB,
            source_of_earnings BLOB,
            means_of_transportation_to_work BLOB,
            travel_time_to_work_in_minutes BLOB,
            educational_attainment BLOB,
            school_enrollment_age_3_to_17 BLOB
        );

        CREATE INDEX IF NOT EXISTS idx_comprehensive_zipcode_lat ON comprehensive_zipcode (lat);
        CREATE INDEX IF NOT EXISTS idx_comprehensive_zipcode_lng ON comprehensive_zipcode (lng);",
    )?;

    Ok(())
}
