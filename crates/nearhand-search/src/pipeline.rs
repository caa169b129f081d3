//! Client-side filtering over a provider snapshot.
//!
//! Stages run in a fixed order: location, category, category-contextual
//! (subject/level for education, sub-category for home repair), name, then the
//! advanced filters. Rating sort is a final stable pass, not a predicate.
//! Every stage is a pure predicate over one record, so the output depends only
//! on the inputs.

use nearhand_core::{
    CategoryKind, Coordinate, LocationQuery, ProviderRecord, RatingSort, SearchCriteria,
};

use crate::proximity::ProximityMatcher;

#[derive(Debug, Clone, PartialEq)]
enum Stage {
    Near(Coordinate),
    Online,
    LocationText(String),
    Category(String),
    Level(String),
    Subject(String),
    SubCategory(String),
    Name(String),
    MinRating(f64),
    PriceRange { min: Option<f64>, max: Option<f64> },
    PricingType(String),
}

impl Stage {
    fn name(&self) -> &'static str {
        match self {
            Stage::Near(_) => "near",
            Stage::Online => "online",
            Stage::LocationText(_) => "location_text",
            Stage::Category(_) => "category",
            Stage::Level(_) => "level",
            Stage::Subject(_) => "subject",
            Stage::SubCategory(_) => "sub_category",
            Stage::Name(_) => "name",
            Stage::MinRating(_) => "min_rating",
            Stage::PriceRange { .. } => "price_range",
            Stage::PricingType(_) => "pricing_type",
        }
    }

    fn matches(&self, provider: &ProviderRecord, proximity: &ProximityMatcher) -> bool {
        match self {
            Stage::Near(center) => proximity.is_near(provider.coordinate.as_ref(), Some(center)),
            Stage::Online => provider
                .location
                .as_deref()
                .is_some_and(|l| l.trim().eq_ignore_ascii_case("online")),
            Stage::LocationText(needle) => provider
                .location
                .as_deref()
                .is_some_and(|l| l.to_lowercase().contains(needle.as_str())),
            Stage::Category(needle) => provider
                .services()
                .any(|s| s.category.to_lowercase().contains(needle.as_str())),
            Stage::Level(wanted) => provider
                .services()
                .any(|s| s.level.as_deref().is_some_and(|l| l.to_lowercase() == *wanted)),
            Stage::Subject(needle) => provider.services().any(|s| {
                s.subject
                    .as_deref()
                    .is_some_and(|v| v.to_lowercase().contains(needle.as_str()))
            }),
            Stage::SubCategory(wanted) => provider
                .services()
                .any(|s| s.subject.as_deref().is_some_and(|v| v.to_lowercase() == *wanted)),
            Stage::Name(needle) => provider.username.to_lowercase().contains(needle.as_str()),
            Stage::MinRating(min) => provider.rating.is_some_and(|r| r >= *min),
            Stage::PriceRange { min, max } => provider.services().any(|s| {
                s.price.is_some_and(|p| {
                    min.is_none_or(|lo| p >= lo) && max.is_none_or(|hi| p <= hi)
                })
            }),
            Stage::PricingType(wanted) => provider.services().any(|s| {
                s.pricing_type
                    .as_deref()
                    .is_some_and(|t| t.to_lowercase() == *wanted)
            }),
        }
    }
}

fn location_stage(location: &LocationQuery) -> Option<Stage> {
    match location {
        LocationQuery::Unspecified => None,
        LocationQuery::Online => Some(Stage::Online),
        LocationQuery::Coordinate(c) => Some(Stage::Near(*c)),
        LocationQuery::TextLabel(s) => Some(Stage::LocationText(s.to_lowercase())),
    }
}

fn lowered(value: Option<&String>) -> Option<String> {
    value.map(|v| v.to_lowercase())
}

/// Predicates derived from `criteria`, in application order.
fn stages(criteria: &SearchCriteria) -> Vec<Stage> {
    let mut stages = Vec::new();

    stages.extend(location_stage(&criteria.location));
    stages.extend(lowered(criteria.category.as_ref()).map(Stage::Category));

    match criteria.category_kind() {
        Some(CategoryKind::Education) => {
            stages.extend(lowered(criteria.level.as_ref()).map(Stage::Level));
            stages.extend(lowered(criteria.subject.as_ref()).map(Stage::Subject));
        }
        Some(CategoryKind::HomeRepair) => {
            stages.extend(lowered(criteria.sub_category.as_ref()).map(Stage::SubCategory));
        }
        Some(CategoryKind::Other) | None => {}
    }

    stages.extend(lowered(criteria.name_filter.as_ref()).map(Stage::Name));

    let advanced = &criteria.advanced;
    stages.extend(advanced.min_rating.map(Stage::MinRating));
    if advanced.price_min.is_some() || advanced.price_max.is_some() {
        stages.push(Stage::PriceRange {
            min: advanced.price_min,
            max: advanced.price_max,
        });
    }
    stages.extend(lowered(advanced.pricing_type.as_ref()).map(Stage::PricingType));

    stages
}

/// Stable sort by rating; unrated providers compare as `0`.
pub fn sort_by_rating(providers: &mut [ProviderRecord], order: RatingSort) {
    match order {
        RatingSort::None => {}
        RatingSort::Ascending => {
            providers.sort_by(|a, b| a.sort_rating().total_cmp(&b.sort_rating()));
        }
        RatingSort::Descending => {
            providers.sort_by(|a, b| b.sort_rating().total_cmp(&a.sort_rating()));
        }
    }
}

/// Ordered client-side filter stages plus the rating sort.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterPipeline {
    proximity: ProximityMatcher,
}

impl FilterPipeline {
    #[must_use]
    pub fn new(proximity: ProximityMatcher) -> Self {
        Self { proximity }
    }

    #[must_use]
    pub fn proximity(&self) -> &ProximityMatcher {
        &self.proximity
    }

    /// Filters `providers` by `criteria` and applies the rating sort.
    /// Base order is the input order.
    #[must_use]
    pub fn apply(&self, providers: &[ProviderRecord], criteria: &SearchCriteria) -> Vec<ProviderRecord> {
        let mut candidates: Vec<&ProviderRecord> = providers.iter().collect();
        for stage in stages(criteria) {
            let before = candidates.len();
            candidates.retain(|p| stage.matches(p, &self.proximity));
            tracing::trace!(
                stage = stage.name(),
                before,
                after = candidates.len(),
                "filter stage applied"
            );
        }
        let mut results: Vec<ProviderRecord> = candidates.into_iter().cloned().collect();
        sort_by_rating(&mut results, criteria.rating_sort);
        results
    }

    /// Post-processes a server result page: the server already filtered by
    /// distance, category, subject and level, but knows nothing about the
    /// name filter, and rating sort is applied on top of its distance order.
    #[must_use]
    pub fn refine_server_results(
        &self,
        providers: Vec<ProviderRecord>,
        criteria: &SearchCriteria,
    ) -> Vec<ProviderRecord> {
        let mut results = match lowered(criteria.name_filter.as_ref()).map(Stage::Name) {
            Some(stage) => providers
                .into_iter()
                .filter(|p| stage.matches(p, &self.proximity))
                .collect(),
            None => providers,
        };
        sort_by_rating(&mut results, criteria.rating_sort);
        results
    }

    /// Names of the stages `apply` would run for `criteria`, in order.
    #[must_use]
    pub fn stage_names(criteria: &SearchCriteria) -> Vec<&'static str> {
        stages(criteria).iter().map(Stage::name).collect()
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
