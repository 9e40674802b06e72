//! Common parameters for multi-result queries.

use strum_macros::{AsRefStr, Display, EnumString};

use crate::QueryError;

/// Default result cap applied when the caller does not choose one.
pub const DEFAULT_RETURNS: usize = 5;

/// Sortable stored attributes.
///
/// The variants name exactly the columns the store can order by; parsing
/// any other attribute name fails validation before the store is touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum SortKey {
    /// Primary key, the default order.
    #[default]
    Zipcode,
    /// Primary city name.
    MajorCity,
    /// County name.
    County,
    /// Two-letter state code.
    State,
    /// Centroid latitude.
    Lat,
    /// Centroid longitude.
    Lng,
    /// Resident population.
    Population,
    /// Residents per square mile.
    PopulationDensity,
    /// Land area in square miles.
    LandAreaInSqmi,
    /// Water area in square miles.
    WaterAreaInSqmi,
    /// Total housing units.
    HousingUnits,
    /// Occupied housing units.
    OccupiedHousingUnits,
    /// Median home value.
    MedianHomeValue,
    /// Median household income.
    MedianHouseholdIncome,
    /// Covered-area radius in miles.
    RadiusInMiles,
}

impl SortKey {
    /// Parses an attribute name.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownSortKey`] for names that are not
    /// sortable attributes.
    pub fn parse(name: &str) -> Result<Self, QueryError> {
        name.parse()
            .map_err(|_| QueryError::UnknownSortKey(name.to_string()))
    }
}

/// Common parameters across multi-result operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    /// Attribute to order by.
    pub sort_by: SortKey,
    /// Sort direction.
    pub ascending: bool,
    /// Maximum rows returned, applied after sorting.
    pub returns: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            sort_by: SortKey::default(),
            ascending: true,
            returns: DEFAULT_RETURNS,
        }
    }
}

impl SearchOptions {
    /// Checks the parameters before any store access.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidReturns`] if the result cap is zero;
    /// an accidental unbounded query is rejected rather than honored.
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.returns == 0 {
            return Err(QueryError::InvalidReturns(self.returns));
        }
        Ok(())
    }
}
