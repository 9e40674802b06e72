//! The zipcode entity model.
//!
//! Two record shapes share the same base attributes: [`SimpleZipcode`]
//! (geometry plus light demographics) and [`ComprehensiveZipcode`] (the
//! same base plus the extended structured demographic attributes). The
//! extended shape embeds the base struct rather than duplicating it;
//! [`ZipcodeRecord`] is the seam that lets callers stay generic over
//! which shape is active.
//!
//! Identity is the `zipcode` string alone: two records with the same code
//! are equal regardless of every other attribute, and ordering a record
//! with no code set is an error rather than a silent answer.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::distance::{Unit, haversine};

/// USPS classification for a zipcode.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum ZipcodeType {
    /// Regular delivery-area zipcode.
    #[serde(rename = "STANDARD")]
    #[strum(serialize = "STANDARD")]
    Standard,
    /// Post-office-box-only zipcode.
    #[serde(rename = "PO BOX")]
    #[strum(serialize = "PO BOX")]
    PoBox,
    /// Zipcode dedicated to a single high-volume recipient.
    #[serde(rename = "UNIQUE")]
    #[strum(serialize = "UNIQUE")]
    Unique,
    /// Military (APO/FPO) zipcode.
    #[serde(rename = "MILITARY")]
    #[strum(serialize = "MILITARY")]
    Military,
}

/// Rectangular border boundary of a zipcode area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Western edge longitude.
    pub west: Option<f64>,
    /// Eastern edge longitude.
    pub east: Option<f64>,
    /// Northern edge latitude.
    pub north: Option<f64>,
    /// Southern edge latitude.
    pub south: Option<f64>,
}

/// Error returned when ordering is attempted against a record with no
/// identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("empty zipcode record does not support comparison")]
pub struct ComparisonError;

/// Error returned when a distance is requested from a record without
/// stored coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("record has no lat/lng coordinates")]
pub struct NoCoordinatesError;

/// One postal code row: geometry, administrative attributes, and light
/// demographics.
///
/// Every attribute is optional. A record whose `zipcode` is `None` is the
/// "empty" record: not present, and not comparable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimpleZipcode {
    /// Five-digit postal code, the primary key.
    pub zipcode: Option<String>,
    /// USPS classification.
    pub zipcode_type: Option<ZipcodeType>,
    /// Primary city name.
    pub major_city: Option<String>,
    /// City name used by the post office.
    pub post_office_city: Option<String>,
    /// Other city names sharing this zipcode.
    pub common_city_list: Option<Vec<String>>,
    /// County name.
    pub county: Option<String>,
    /// Two-letter state code.
    pub state: Option<String>,
    /// Centroid latitude in degrees.
    pub lat: Option<f64>,
    /// Centroid longitude in degrees.
    pub lng: Option<f64>,
    /// Timezone name.
    pub timezone: Option<String>,
    /// Radius of the covered area in miles.
    pub radius_in_miles: Option<f64>,
    /// Telephone area codes in use.
    pub area_code_list: Option<Vec<String>>,
    /// Resident population.
    pub population: Option<i64>,
    /// Residents per square mile.
    pub population_density: Option<f64>,
    /// Land area in square miles.
    pub land_area_in_sqmi: Option<f64>,
    /// Water area in square miles.
    pub water_area_in_sqmi: Option<f64>,
    /// Total housing units.
    pub housing_units: Option<i64>,
    /// Occupied housing units.
    pub occupied_housing_units: Option<i64>,
    /// Median home value in dollars.
    pub median_home_value: Option<i64>,
    /// Median household income in dollars.
    pub median_household_income: Option<i64>,
    /// Western edge of the bounding box.
    pub bounds_west: Option<f64>,
    /// Eastern edge of the bounding box.
    pub bounds_east: Option<f64>,
    /// Northern edge of the bounding box.
    pub bounds_north: Option<f64>,
    /// Southern edge of the bounding box.
    pub bounds_south: Option<f64>,
}

/// One postal code row with the full demographic and economic attribute
/// set.
///
/// A strict superset of [`SimpleZipcode`]: the base attributes are
/// embedded, and each extension attribute is a structured value decoded
/// from a compressed column (time series and categorical breakdowns as
/// nested maps/lists).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComprehensiveZipcode {
    /// Shared base attributes.
    #[serde(flatten)]
    pub simple: SimpleZipcode,

    /// Border polygon geometry.
    pub polygon: Option<Value>,

    // Stats and demographics
    /// Population time series by year.
    pub population_by_year: Option<Value>,
    /// Population breakdown by age bracket.
    pub population_by_age: Option<Value>,
    /// Population breakdown by gender.
    pub population_by_gender: Option<Value>,
    /// Population breakdown by race.
    pub population_by_race: Option<Value>,
    /// Heads of household by age bracket.
    pub head_of_household_by_age: Option<Value>,
    /// Family vs. single households.
    pub families_vs_singles: Option<Value>,
    /// Households with children.
    pub households_with_kids: Option<Value>,
    /// Children by age bracket.
    pub children_by_age: Option<Value>,

    // Real estate and housing
    /// Housing type breakdown.
    pub housing_type: Option<Value>,
    /// Construction year breakdown.
    pub year_housing_was_built: Option<Value>,
    /// Occupancy breakdown.
    pub housing_occupancy: Option<Value>,
    /// Reasons units are vacant.
    pub vacancy_reason: Option<Value>,
    /// Owner-occupied home value brackets.
    pub owner_occupied_home_values: Option<Value>,
    /// Rental properties by number of rooms.
    pub rental_properties_by_number_of_rooms: Option<Value>,
    /// Monthly rent including utilities, studio apartments.
    pub monthly_rent_including_utilities_studio_apt: Option<Value>,
    /// Monthly rent including utilities, one bedroom.
    pub monthly_rent_including_utilities_1_b: Option<Value>,
    /// Monthly rent including utilities, two bedrooms.
    pub monthly_rent_including_utilities_2_b: Option<Value>,
    /// Monthly rent including utilities, three or more bedrooms.
    pub monthly_rent_including_utilities_3plus_b: Option<Value>,

    // Employment, income, earnings, and work
    /// Employment status breakdown.
    pub employment_status: Option<Value>,
    /// Average household income time series.
    pub average_household_income_over_time: Option<Value>,
    /// Household income brackets.
    pub household_income: Option<Value>,
    /// Individual earnings brackets.
    pub annual_individual_earnings: Option<Value>,
    /// Percent of households receiving each income source.
    pub sources_of_household_income_percent_receiving: Option<Value>,
    /// Average income per household by income source.
    pub sources_of_household_income_average_per_household: Option<Value>,
    /// Percent of households receiving investment income.
    pub household_investment_income_percent_receiving: Option<Value>,
    /// Average investment income per receiving household.
    pub household_investment_income_average_per_household: Option<Value>,
    /// Percent of households receiving retirement income.
    pub household_retirement_income_percent_receiving: Option<Value>,
    /// Average retirement income per receiving household.
    pub household_retirement_income_average_per_household: Option<Value>,
    /// Earnings source breakdown.
    pub source_of_earnings: Option<Value>,
    /// Commute mode for workers 16 and over.
    pub means_of_transportation_to_work: Option<Value>,
    /// Commute time brackets in minutes.
    pub travel_time_to_work_in_minutes: Option<Value>,
    /// Educational attainment for population 25 and over.
    pub educational_attainment: Option<Value>,
    /// School enrollment for ages 3 to 17.
    pub school_enrollment_age_3_to_17: Option<Value>,
}

/// Common read surface over the two record shapes.
///
/// The search engine is generic over this trait; which shape is active is
/// chosen once at engine construction, never per row.
pub trait ZipcodeRecord: Serialize {
    /// The shared base attributes.
    fn base(&self) -> &SimpleZipcode;

    /// Whether this record carries an identity. A "not found" result is
    /// an absent record, which is distinguishable from a valid zero-state
    /// record by this flag.
    fn is_present(&self) -> bool {
        self.base().zipcode.is_some()
    }

    /// Alias of the `major_city` attribute.
    fn city(&self) -> Option<&str> {
        self.base().major_city.as_deref()
    }

    /// The record's border bounding box.
    fn bounds(&self) -> Bounds {
        let base = self.base();
        Bounds {
            west: base.bounds_west,
            east: base.bounds_east,
            north: base.bounds_north,
            south: base.bounds_south,
        }
    }

    /// Two-letter state code, uppercased.
    fn state_abbr(&self) -> Option<String> {
        self.base().state.as_ref().map(|s| s.to_ascii_uppercase())
    }

    /// Full state name from the static abbreviation table. Unknown or
    /// absent codes yield `None`.
    fn state_long(&self) -> Option<&'static str> {
        self.base().state.as_deref().and_then(crate::state::state_long)
    }

    /// Orders two records by `zipcode`, lexicographically.
    ///
    /// # Errors
    ///
    /// Returns [`ComparisonError`] if either record is empty; comparison
    /// against a record with no identity is undefined and rejected.
    fn try_cmp(&self, other: &Self) -> Result<Ordering, ComparisonError> {
        match (&self.base().zipcode, &other.base().zipcode) {
            (Some(a), Some(b)) => Ok(a.cmp(b)),
            _ => Err(ComparisonError),
        }
    }

    /// Great-circle distance from this record's centroid to a point, in
    /// `unit`.
    ///
    /// # Errors
    ///
    /// Returns [`NoCoordinatesError`] if the record has no stored
    /// coordinates.
    fn dist_from(&self, lat: f64, lng: f64, unit: Unit) -> Result<f64, NoCoordinatesError> {
        let base = self.base();
        match (base.lat, base.lng) {
            (Some(record_lat), Some(record_lng)) => {
                Ok(haversine(record_lat, record_lng, lat, lng, unit))
            }
            _ => Err(NoCoordinatesError),
        }
    }

    /// Flattens stored and derived attributes into a key-ordered mapping.
    ///
    /// When `include_nulls` is false, attributes whose value is absent are
    /// omitted.
    fn to_serializable(&self, include_nulls: bool) -> Map<String, Value> {
        let mut map = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };

        map.insert(
            "city".to_string(),
            self.city().map_or(Value::Null, |c| Value::String(c.to_string())),
        );
        map.insert(
            "bounds".to_string(),
            serde_json::to_value(self.bounds()).unwrap_or(Value::Null),
        );
        map.insert(
            "state_abbr".to_string(),
            self.state_abbr().map_or(Value::Null, Value::String),
        );
        map.insert(
            "state_long".to_string(),
            self.state_long()
                .map_or(Value::Null, |s| Value::String(s.to_string())),
        );

        if !include_nulls {
            map.retain(|_, value| !value.is_null());
        }

        map
    }
}

impl ZipcodeRecord for SimpleZipcode {
    fn base(&self) -> &SimpleZipcode {
        self
    }
}

impl ZipcodeRecord for ComprehensiveZipcode {
    fn base(&self) -> &SimpleZipcode {
        &self.simple
    }
}

impl PartialEq for SimpleZipcode {
    fn eq(&self, other: &Self) -> bool {
        self.zipcode == other.zipcode
    }
}

impl Eq for SimpleZipcode {}

impl Hash for SimpleZipcode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.zipcode.hash(state);
    }
}

impl PartialEq for ComprehensiveZipcode {
    fn eq(&self, other: &Self) -> bool {
        self.simple.zipcode == other.simple.zipcode
    }
}

impl Eq for ComprehensiveZipcode {}

impl Hash for ComprehensiveZipcode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.simple.zipcode.hash(state);
    }
}
