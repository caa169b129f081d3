//! Search criteria and the search-box URL parameters they are built from.

use serde::{Deserialize, Serialize};

use crate::location::{CoordinateError, LocationQuery};

/// Ordering applied to results by provider rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingSort {
    #[default]
    None,
    Ascending,
    Descending,
}

impl RatingSort {
    /// Reads a `ratingSortOrder` token. Unknown tokens mean no sorting.
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "hightolow" | "desc" | "descending" => Self::Descending,
            "lowtohigh" | "asc" | "ascending" => Self::Ascending,
            _ => Self::None,
        }
    }

    #[must_use]
    pub fn as_token(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Ascending => "lowToHigh",
            Self::Descending => "highToLow",
        }
    }
}

/// Which contextual filters a category enables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryKind {
    /// Tutoring and other teaching services: subject and level apply.
    Education,
    /// Repair trades: the sub-category applies.
    HomeRepair,
    Other,
}

impl CategoryKind {
    #[must_use]
    pub fn classify(category: &str) -> Self {
        let lowered = category.to_lowercase();
        if lowered.contains("tutor") || lowered.contains("educat") {
            Self::Education
        } else if lowered.contains("repair") {
            Self::HomeRepair
        } else {
            Self::Other
        }
    }
}

/// Filters the server search understands natively. On the client path they
/// are applied as extra predicates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AdvancedFilters {
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub pricing_type: Option<String>,
    pub min_rating: Option<f64>,
}

impl AdvancedFilters {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.price_min.is_none()
            && self.price_max.is_none()
            && self.pricing_type.is_none()
            && self.min_rating.is_none()
    }
}

/// One search submission. Built once, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchCriteria {
    pub category: Option<String>,
    pub location: LocationQuery,
    pub level: Option<String>,
    pub subject: Option<String>,
    /// Home-repair sub-category, matched exactly against a service subject.
    pub sub_category: Option<String>,
    pub name_filter: Option<String>,
    pub rating_sort: RatingSort,
    #[serde(default)]
    pub advanced: AdvancedFilters,
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

impl SearchCriteria {
    /// Builds criteria from search-box query parameters (already
    /// percent-decoded). Any subset may be present, in any order; unknown keys
    /// are ignored. When a key repeats, the last value wins.
    ///
    /// The name filter comes from `tutorNameFilter` for education categories
    /// and from `providerNameFilter` for everything else.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] when `location` is a `Near Lat/Lon` string
    /// with out-of-range values.
    pub fn from_query_pairs<I, K, V>(pairs: I) -> Result<Self, CoordinateError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = QueryParams::default();
        for (key, value) in pairs {
            let value = value.as_ref();
            match key.as_ref() {
                "serviceType" => params.service_type = non_empty(value),
                "location" => params.location = value.to_owned(),
                "level" => params.level = non_empty(value),
                "subject" => params.subject = non_empty(value),
                "tutorNameFilter" => params.tutor_name = non_empty(value),
                "homeRepairSubCategory" => {
                    params.sub_category =
                        non_empty(value).filter(|v| !v.eq_ignore_ascii_case("all"));
                }
                "providerNameFilter" => params.provider_name = non_empty(value),
                "ratingSortOrder" => params.rating_sort = RatingSort::from_token(value),
                "priceMin" => params.advanced.price_min = parse_number(value),
                "priceMax" => params.advanced.price_max = parse_number(value),
                "pricingType" => params.advanced.pricing_type = non_empty(value),
                "minRating" => params.advanced.min_rating = parse_number(value),
                _ => {}
            }
        }
        params.into_criteria()
    }

    /// Writes the criteria back out as search-box query parameters, omitting
    /// defaults.
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        let kind = self.category_kind();
        if let Some(category) = &self.category {
            pairs.push(("serviceType", category.clone()));
        }
        if self.location != LocationQuery::Unspecified {
            pairs.push(("location", self.location.to_raw()));
        }
        if let Some(level) = &self.level {
            pairs.push(("level", level.clone()));
        }
        if let Some(subject) = &self.subject {
            pairs.push(("subject", subject.clone()));
        }
        if let Some(sub) = &self.sub_category {
            pairs.push(("homeRepairSubCategory", sub.clone()));
        }
        if let Some(name) = &self.name_filter {
            let key = if kind == Some(CategoryKind::Education) {
                "tutorNameFilter"
            } else {
                "providerNameFilter"
            };
            pairs.push((key, name.clone()));
        }
        if self.rating_sort != RatingSort::None {
            pairs.push(("ratingSortOrder", self.rating_sort.as_token().to_owned()));
        }
        if let Some(v) = self.advanced.price_min {
            pairs.push(("priceMin", v.to_string()));
        }
        if let Some(v) = self.advanced.price_max {
            pairs.push(("priceMax", v.to_string()));
        }
        if let Some(v) = &self.advanced.pricing_type {
            pairs.push(("pricingType", v.clone()));
        }
        if let Some(v) = self.advanced.min_rating {
            pairs.push(("minRating", v.to_string()));
        }
        pairs
    }

    /// Kind of the selected category, if any.
    #[must_use]
    pub fn category_kind(&self) -> Option<CategoryKind> {
        self.category.as_deref().map(CategoryKind::classify)
    }

    /// Returns a copy with the location replaced, e.g. after geocoding.
    #[must_use]
    pub fn with_location(&self, location: LocationQuery) -> Self {
        Self {
            location,
            ..self.clone()
        }
    }
}

#[derive(Default)]
struct QueryParams {
    service_type: Option<String>,
    location: String,
    level: Option<String>,
    subject: Option<String>,
    tutor_name: Option<String>,
    sub_category: Option<String>,
    provider_name: Option<String>,
    rating_sort: RatingSort,
    advanced: AdvancedFilters,
}

impl QueryParams {
    fn into_criteria(self) -> Result<SearchCriteria, CoordinateError> {
        let location = LocationQuery::parse_strict(&self.location)?;
        let kind = self.service_type.as_deref().map(CategoryKind::classify);
        let name_filter = match kind {
            Some(CategoryKind::Education) => self.tutor_name,
            _ => self.provider_name,
        };
        Ok(SearchCriteria {
            category: self.service_type,
            location,
            level: self.level,
            subject: self.subject,
            sub_category: self.sub_category,
            name_filter,
            rating_sort: self.rating_sort,
            advanced: self.advanced,
        })
    }
}

#[cfg(test)]
#[path = "criteria_test.rs"]
mod tests;
