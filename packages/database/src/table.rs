//! Row mapping between stored tables and record types.
//!
//! [`ZipcodeTable`] is the seam that keeps the layers above generic over
//! which record shape is active: the shape is chosen once, at engine
//! construction, through the type parameter, never by inspecting rows at
//! query time.

use duckdb::Row;
use duckdb::types::Value;
use serde::Serialize;
use serde::de::DeserializeOwned;
use zip_atlas_codec::Serializer;
use zip_atlas_models::{ComprehensiveZipcode, SimpleZipcode, ZipcodeRecord};

use crate::DbError;

/// A record shape bound to its stored table.
pub trait ZipcodeTable: ZipcodeRecord + Sized {
    /// Stored table name.
    const TABLE: &'static str;

    /// Column list, in the order [`Self::from_row`] reads and
    /// [`Self::to_params`] binds them.
    const COLUMNS: &'static [&'static str];

    /// Wire format for the compressed attribute columns. Writer and
    /// reader must agree per table.
    const SERIALIZER: Serializer = Serializer::Json;

    /// Decodes one stored row into a record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Corrupt`] naming the row and column if a
    /// compressed attribute fails to decode, or [`DbError`] for other
    /// read/conversion failures.
    fn from_row(row: &Row<'_>) -> Result<Self, DbError>;

    /// Binds every column of `self` as an insert parameter row, in
    /// [`Self::COLUMNS`] order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a compressed attribute fails to encode.
    fn to_params(&self) -> Result<Vec<Value>, DbError>;
}

impl ZipcodeTable for SimpleZipcode {
    const TABLE: &'static str = "simple_zipcode";

    const COLUMNS: &'static [&'static str] = &[
        "zipcode",
        "zipcode_type",
        "major_city",
        "post_office_city",
        "common_city_list",
        "county",
        "state",
        "lat",
        "lng",
        "timezone",
        "radius_in_miles",
        "area_code_list",
        "population",
        "population_density",
        "land_area_in_sqmi",
        "water_area_in_sqmi",
        "housing_units",
        "occupied_housing_units",
        "median_home_value",
        "median_household_income",
        "bounds_west",
        "bounds_east",
        "bounds_north",
        "bounds_south",
    ];

    fn from_row(row: &Row<'_>) -> Result<Self, DbError> {
        base_from_row(row, Self::SERIALIZER)
    }

    fn to_params(&self) -> Result<Vec<Value>, DbError> {
        base_params(self, Self::SERIALIZER)
    }
}

impl ZipcodeTable for ComprehensiveZipcode {
    const TABLE: &'static str = "comprehensive_zipcode";

    const COLUMNS: &'static [&'static str] = &[
        "zipcode",
        "zipcode_type",
        "major_city",
        "post_office_city",
        "common_city_list",
        "county",
        "state",
        "lat",
        "lng",
        "timezone",
        "radius_in_miles",
        "area_code_list",
        "population",
        "population_density",
        "land_area_in_sqmi",
        "water_area_in_sqmi",
        "housing_units",
        "occupied_housing_units",
        "median_home_value",
        "median_household_income",
        "bounds_west",
        "bounds_east",
        "bounds_north",
        "bounds_south",
        "polygon",
        "population_by_year",
        "population_by_age",
        "population_by_gender",
        "population_by_race",
        "head_of_household_by_age",
        "families_vs_singles",
        "households_with_kids",
        "children_by_age",
        "housing_type",
        "year_housing_was_built",
        "housing_occupancy",
        "vacancy_reason",
        "owner_occupied_home_values",
        "rental_properties_by_number_of_rooms",
        "monthly_rent_including_utilities_studio_apt",
        "monthly_rent_including_utilities_1_b",
        "monthly_rent_including_utilities_2_b",
        "monthly_rent_including_utilities_3plus_b",
        "employment_status",
        "average_household_income_over_time",
        "household_income",
        "annual_individual_earnings",
        "sources_of_household_income_percent_receiving",
        "sources_of_household_income_average_per_household",
        "household_investment_income_percent_receiving",
        "household_investment_income_average_per_household",
        "household_retirement_income_percent_receiving",
        "household_retirement_income_average_per_household",
        "source_of_earnings",
        "means_of_transportation_to_work",
        "travel_time_to_work_in_minutes",
        "educational_attainment",
        "school_enrollment_age_3_to_17",
    ];

    #[allow(clippy::too_many_lines)]
    fn from_row(row: &Row<'_>) -> Result<Self, DbError> {
        let simple = base_from_row(row, Self::SERIALIZER)?;
        let zipcode = simple.zipcode.clone();
        let zip = zipcode.as_deref();
        let ser = Self::SERIALIZER;

        Ok(Self {
            simple,
            polygon: decode_column(row, 24, "polygon", zip, ser)?,
            population_by_year: decode_column(row, 25, "population_by_year", zip, ser)?,
            population_by_age: decode_column(row, 26, "population_by_age", zip, ser)?,
            population_by_gender: decode_column(row, 27, "population_by_gender", zip, ser)?,
            population_by_race: decode_column(row, 28, "population_by_race", zip, ser)?,
            head_of_household_by_age: decode_column(row, 29, "head_of_household_by_age", zip, ser)?,
            families_vs_singles: decode_column(row, 30, "families_vs_singles", zip, ser)?,
            households_with_kids: decode_column(row, 31, "households_with_kids", zip, ser)?,
            children_by_age: decode_column(row, 32, "children_by_age", zip, ser)?,
            housing_type: decode_column(row, 33, "housing_type", zip, ser)?,
            year_housing_was_built: decode_column(row, 34, "year_housing_was_built", zip, ser)?,
            housing_occupancy: decode_column(row, 35, "housing_occupancy", zip, ser)?,
            vacancy_reason: decode_column(row, 36, "vacancy_reason", zip, ser)?,
            owner_occupied_home_values: decode_column(
                row,
                37,
                "owner_occupied_home_values",
                zip,
                ser,
            )?,
            rental_properties_by_number_of_rooms: decode_column(
                row,
                38,
                "rental_properties_by_number_of_rooms",
                zip,
                ser,
            )?,
            monthly_rent_including_utilities_studio_apt: decode_column(
                row,
                39,
                "monthly_rent_including_utilities_studio_apt",
                zip,
                ser,
            )?,
            monthly_rent_including_utilities_1_b: decode_column(
                row,
                40,
                "monthly_rent_including_utilities_1_b",
                zip,
                ser,
            )?,
            monthly_rent_including_utilities_2_b: decode_column(
                row,
                41,
                "monthly_rent_including_utilities_2_b",
                zip,
                ser,
            )?,
            monthly_rent_including_utilities_3plus_b: decode_column(
                row,
                42,
                "monthly_rent_including_utilities_3plus_b",
                zip,
                ser,
            )?,
            employment_status: decode_column(row, 43, "employment_status", zip, ser)?,
            average_household_income_over_time: decode_column(
                row,
                44,
                "average_household_income_over_time",
                zip,
                ser,
            )?,
            household_income: decode_column(row, 45, "household_income", zip, ser)?,
            annual_individual_earnings: decode_column(
                row,
                46,
                "annual_individual_earnings",
                zip,
                ser,
            )?,
            sources_of_household_income_percent_receiving: decode_column(
                row,
                47,
                "sources_of_household_income_percent_receiving",
                zip,
                ser,
            )?,
            sources_of_household_income_average_per_household: decode_column(
                row,
                48,
                "sources_of_household_income_average_per_household",
                zip,
                ser,
            )?,
            household_investment_income_percent_receiving: decode_column(
                row,
                49,
                "household_investment_income_percent_receiving",
                zip,
                ser,
            )?,
            household_investment_income_average_per_household: decode_column(
                row,
                50,
                "household_investment_income_average_per_household",
                zip,
                ser,
            )?,
            household_retirement_income_percent_receiving: decode_column(
                row,
                51,
                "household_retirement_income_percent_receiving",
                zip,
                ser,
            )?,
            household_retirement_income_average_per_household: decode_column(
                row,
                52,
                "household_retirement_income_average_per_household",
                zip,
                ser,
            )?,
            source_of_earnings: decode_column(row, 53, "source_of_earnings", zip, ser)?,
            means_of_transportation_to_work: decode_column(
                row,
                54,
                "means_of_transportation_to_work",
                zip,
                ser,
            )?,
            travel_time_to_work_in_minutes: decode_column(
                row,
                55,
                "travel_time_to_work_in_minutes",
                zip,
                ser,
            )?,
            educational_attainment: decode_column(row, 56, "educational_attainment", zip, ser)?,
            school_enrollment_age_3_to_17: decode_column(
                row,
                57,
                "school_enrollment_age_3_to_17",
                zip,
                ser,
            )?,
        })
    }

    fn to_params(&self) -> Result<Vec<Value>, DbError> {
        let ser = Self::SERIALIZER;
        let mut params = base_params(&self.simple, ser)?;

        params.push(encoded_blob(self.polygon.as_ref(), "polygon", ser)?);
        params.push(encoded_blob(
            self.population_by_year.as_ref(),
            "population_by_year",
            ser,
        )?);
        params.push(encoded_blob(
            self.population_by_age.as_ref(),
            "population_by_age",
            ser,
        )?);
        params.push(encoded_blob(
            self.population_by_gender.as_ref(),
            "population_by_gender",
            ser,
        )?);
        params.push(encoded_blob(
            self.population_by_race.as_ref(),
            "population_by_race",
            ser,
        )?);
        params.push(encoded_blob(
            self.head_of_household_by_age.as_ref(),
            "head_of_household_by_age",
            ser,
        )?);
        params.push(encoded_blob(
            self.families_vs_singles.as_ref(),
            "families_vs_singles",
            ser,
        )?);
        params.push(encoded_blob(
            self.households_with_kids.as_ref(),
            "households_with_kids",
            ser,
        )?);
        params.push(encoded_blob(
            self.children_by_age.as_ref(),
            "children_by_age",
            ser,
        )?);
        params.push(encoded_blob(self.housing_type.as_ref(), "housing_type", ser)?);
        params.push(encoded_blob(
            self.year_housing_was_built.as_ref(),
            "year_housing_was_built",
            ser,
        )?);
        params.push(encoded_blob(
            self.housing_occupancy.as_ref(),
            "housing_occupancy",
            ser,
        )?);
        params.push(encoded_blob(
            self.vacancy_reason.as_ref(),
            "vacancy_reason",
            ser,
        )?);
        params.push(encoded_blob(
            self.owner_occupied_home_values.as_ref(),
            "owner_occupied_home_values",
            ser,
        )?);
        params.push(encoded_blob(
            self.rental_properties_by_number_of_rooms.as_ref(),
            "rental_properties_by_number_of_rooms",
            ser,
        )?);
        params.push(encoded_blob(
            self.monthly_rent_including_utilities_studio_apt.as_ref(),
            "monthly_rent_including_utilities_studio_apt",
            ser,
        )?);
        params.push(encoded_blob(
            self.monthly_rent_including_utilities_1_b.as_ref(),
            "monthly_rent_including_utilities_1_b",
            ser,
        )?);
        params.push(encoded_blob(
            self.monthly_rent_including_utilities_2_b.as_ref(),
            "monthly_rent_including_utilities_2_b",
            ser,
        )?);
        params.push(encoded_blob(
            self.monthly_rent_including_utilities_3plus_b.as_ref(),
            "monthly_rent_including_utilities_3plus_b",
            ser,
        )?);
        params.push(encoded_blob(
            self.employment_status.as_ref(),
            "employment_status",
            ser,
        )?);
        params.push(encoded_blob(
            self.average_household_income_over_time.as_ref(),
            "average_household_income_over_time",
            ser,
        )?);
        params.push(encoded_blob(
            self.household_income.as_ref(),
            "household_income",
            ser,
        )?);
        params.push(encoded_blob(
            self.annual_individual_earnings.as_ref(),
            "annual_individual_earnings",
            ser,
        )?);
        params.push(encoded_blob(
            self.sources_of_household_income_percent_receiving.as_ref(),
            "sources_of_household_income_percent_receiving",
            ser,
        )?);
        params.push(encoded_blob(
            self.sources_of_household_income_average_per_household.as_ref(),
            "sources_of_household_income_average_per_household",
            ser,
        )?);
        params.push(encoded_blob(
            self.household_investment_income_percent_receiving.as_ref(),
            "household_investment_income_percent_receiving",
            ser,
        )?);
        params.push(encoded_blob(
            self.household_investment_income_average_per_household.as_ref(),
            "household_investment_income_average_per_household",
            ser,
        )?);
        params.push(encoded_blob(
            self.household_retirement_income_percent_receiving.as_ref(),
            "household_retirement_income_percent_receiving",
            ser,
        )?);
        params.push(encoded_blob(
            self.household_retirement_income_average_per_household.as_ref(),
            "household_retirement_income_average_per_household",
            ser,
        )?);
        params.push(encoded_blob(
            self.source_of_earnings.as_ref(),
            "source_of_earnings",
            ser,
        )?);
        params.push(encoded_blob(
            self.means_of_transportation_to_work.as_ref(),
            "means_of_transportation_to_work",
            ser,
        )?);
        params.push(encoded_blob(
            self.travel_time_to_work_in_minutes.as_ref(),
            "travel_time_to_work_in_minutes",
            ser,
        )?);
        params.push(encoded_blob(
            self.educational_attainment.as_ref(),
            "educational_attainment",
            ser,
        )?);
        params.push(encoded_blob(
            self.school_enrollment_age_3_to_17.as_ref(),
            "school_enrollment_age_3_to_17",
            ser,
        )?);

        Ok(params)
    }
}

fn base_from_row(row: &Row<'_>, serializer: Serializer) -> Result<SimpleZipcode, DbError> {
    let zipcode: Option<String> = row.get(0)?;

    let zipcode_type = row
        .get::<_, Option<String>>(1)?
        .as_deref()
        .map(str::parse)
        .transpose()
        .map_err(|e| DbError::Conversion {
            message: format!("invalid zipcode_type for {zipcode:?}: {e}"),
        })?;

    let common_city_list =
        decode_column(row, 4, "common_city_list", zipcode.as_deref(), serializer)?;
    let area_code_list = decode_column(row, 11, "area_code_list", zipcode.as_deref(), serializer)?;

    Ok(SimpleZipcode {
        zipcode,
        zipcode_type,
        major_city: row.get(2)?,
        post_office_city: row.get(3)?,
        common_city_list,
        county: row.get(5)?,
        state: row.get(6)?,
        lat: row.get(7)?,
        lng: row.get(8)?,
        timezone: row.get(9)?,
        radius_in_miles: row.get(10)?,
        area_code_list,
        population: row.get(12)?,
        population_density: row.get(13)?,
        land_area_in_sqmi: row.get(14)?,
        water_area_in_sqmi: row.get(15)?,
        housing_units: row.get(16)?,
        occupied_housing_units: row.get(17)?,
        median_home_value: row.get(18)?,
        median_household_income: row.get(19)?,
        bounds_west: row.get(20)?,
        bounds_east: row.get(21)?,
        bounds_north: row.get(22)?,
        bounds_south: row.get(23)?,
    })
}

fn base_params(record: &SimpleZipcode, serializer: Serializer) -> Result<Vec<Value>, DbError> {
    Ok(vec![
        opt_text(record.zipcode.as_deref()),
        opt_text(record.zipcode_type.map(|t| t.to_string()).as_deref()),
        opt_text(record.major_city.as_deref()),
        opt_text(record.post_office_city.as_deref()),
        encoded_blob(record.common_city_list.as_ref(), "common_city_list", serializer)?,
        opt_text(record.county.as_deref()),
        opt_text(record.state.as_deref()),
        opt_f64(record.lat),
        opt_f64(record.lng),
        opt_text(record.timezone.as_deref()),
        opt_f64(record.radius_in_miles),
        encoded_blob(record.area_code_list.as_ref(), "area_code_list", serializer)?,
        opt_i64(record.population),
        opt_f64(record.population_density),
        opt_f64(record.land_area_in_sqmi),
        opt_f64(record.water_area_in_sqmi),
        opt_i64(record.housing_units),
        opt_i64(record.occupied_housing_units),
        opt_i64(record.median_home_value),
        opt_i64(record.median_household_income),
        opt_f64(record.bounds_west),
        opt_f64(record.bounds_east),
        opt_f64(record.bounds_north),
        opt_f64(record.bounds_south),
    ])
}

fn decode_column<T: DeserializeOwned>(
    row: &Row<'_>,
    idx: usize,
    column: &'static str,
    zipcode: Option<&str>,
    serializer: Serializer,
) -> Result<Option<T>, DbError> {
    let bytes: Option<Vec<u8>> = row.get(idx)?;
    zip_atlas_codec::decode_opt(bytes.as_deref(), serializer).map_err(|source| DbError::Corrupt {
        zipcode: zipcode.unwrap_or_default().to_string(),
        column,
        source,
    })
}

fn encoded_blob<T: Serialize>(
    value: Option<&T>,
    column: &'static str,
    serializer: Serializer,
) -> Result<Value, DbError> {
    let bytes = zip_atlas_codec::encode_opt(value, serializer).map_err(|e| DbError::Conversion {
        message: format!("failed to encode {column}: {e}"),
    })?;
    Ok(bytes.map_or(Value::Null, Value::Blob))
}

fn opt_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |s| Value::Text(s.to_string()))
}

const fn opt_f64(value: Option<f64>) -> Value {
    match value {
        Some(v) => Value::Double(v),
        None => Value::Null,
    }
}

const fn opt_i64(value: Option<i64>) -> Value {
    match value {
        Some(v) => Value::BigInt(v),
        None => Value::Null,
    }
}
