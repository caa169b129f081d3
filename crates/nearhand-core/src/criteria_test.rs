use super::*;
use crate::location::Coordinate;

#[test]
fn empty_params_give_default_criteria() {
    let criteria = SearchCriteria::from_query_pairs(Vec::<(&str, &str)>::new()).unwrap();
    assert_eq!(criteria, SearchCriteria::default());
}

#[test]
fn tutoring_params_use_tutor_name_filter() {
    let criteria = SearchCriteria::from_query_pairs([
        ("serviceType", "Tutoring"),
        ("location", "Online"),
        ("level", "High School"),
        ("subject", "Math"),
        ("tutorNameFilter", "ann"),
        ("providerNameFilter", "ignored"),
        ("ratingSortOrder", "highToLow"),
    ])
    .unwrap();

    assert_eq!(criteria.category.as_deref(), Some("Tutoring"));
    assert_eq!(criteria.location, LocationQuery::Online);
    assert_eq!(criteria.level.as_deref(), Some("High School"));
    assert_eq!(criteria.subject.as_deref(), Some("Math"));
    assert_eq!(criteria.name_filter.as_deref(), Some("ann"));
    assert_eq!(criteria.rating_sort, RatingSort::Descending);
}

#[test]
fn home_repair_params_use_provider_name_filter() {
    let criteria = SearchCriteria::from_query_pairs([
        ("providerNameFilter", "bob"),
        ("homeRepairSubCategory", "Plumbing"),
        ("serviceType", "Home Repairs"),
    ])
    .unwrap();

    assert_eq!(criteria.name_filter.as_deref(), Some("bob"));
    assert_eq!(criteria.sub_category.as_deref(), Some("Plumbing"));
    assert_eq!(criteria.category_kind(), Some(CategoryKind::HomeRepair));
}

#[test]
fn sub_category_all_means_unset() {
    let criteria =
        SearchCriteria::from_query_pairs([("homeRepairSubCategory", "all")]).unwrap();
    assert!(criteria.sub_category.is_none());
}

#[test]
fn blank_values_are_treated_as_absent() {
    let criteria =
        SearchCriteria::from_query_pairs([("serviceType", "  "), ("level", "")]).unwrap();
    assert!(criteria.category.is_none());
    assert!(criteria.level.is_none());
}

#[test]
fn coordinate_location_is_parsed() {
    let criteria =
        SearchCriteria::from_query_pairs([("location", "Near Lat: 39.7817, Lon: -89.6501")])
            .unwrap();
    assert_eq!(
        criteria.location,
        LocationQuery::Coordinate(Coordinate::new(39.7817, -89.6501).unwrap())
    );
}

#[test]
fn out_of_range_coordinate_location_is_rejected() {
    let result = SearchCriteria::from_query_pairs([("location", "Near Lat: 95, Lon: 10")]);
    assert!(result.is_err());
}

#[test]
fn rating_sort_tokens() {
    assert_eq!(RatingSort::from_token("lowToHigh"), RatingSort::Ascending);
    assert_eq!(RatingSort::from_token("asc"), RatingSort::Ascending);
    assert_eq!(RatingSort::from_token("HIGHTOLOW"), RatingSort::Descending);
    assert_eq!(RatingSort::from_token("none"), RatingSort::None);
    assert_eq!(RatingSort::from_token("sideways"), RatingSort::None);
}

#[test]
fn advanced_filters_parse_numbers_and_skip_garbage() {
    let criteria = SearchCriteria::from_query_pairs([
        ("priceMin", "10"),
        ("priceMax", "abc"),
        ("minRating", "4.5"),
        ("pricingType", "hourly"),
    ])
    .unwrap();
    assert_eq!(criteria.advanced.price_min, Some(10.0));
    assert_eq!(criteria.advanced.price_max, None);
    assert_eq!(criteria.advanced.min_rating, Some(4.5));
    assert_eq!(criteria.advanced.pricing_type.as_deref(), Some("hourly"));
}

#[test]
fn classify_categories() {
    assert_eq!(CategoryKind::classify("Tutoring"), CategoryKind::Education);
    assert_eq!(CategoryKind::classify("Online Education"), CategoryKind::Education);
    assert_eq!(CategoryKind::classify("home repairs"), CategoryKind::HomeRepair);
    assert_eq!(CategoryKind::classify("Pet Sitting"), CategoryKind::Other);
}

#[test]
fn query_pairs_round_trip() {
    let original = SearchCriteria::from_query_pairs([
        ("serviceType", "Tutoring"),
        ("location", "Springfield"),
        ("level", "Middle School"),
        ("tutorNameFilter", "ann"),
        ("ratingSortOrder", "lowToHigh"),
        ("minRating", "4"),
    ])
    .unwrap();

    let pairs = original.to_query_pairs();
    let reparsed = SearchCriteria::from_query_pairs(pairs).unwrap();
    assert_eq!(reparsed, original);
}

#[test]
fn with_location_keeps_other_fields() {
    let criteria = SearchCriteria {
        category: Some("Home Repairs".to_owned()),
        name_filter: Some("john".to_owned()),
        ..SearchCriteria::default()
    };
    let c = Coordinate::new(1.0, 2.0).unwrap();
    let moved = criteria.with_location(LocationQuery::Coordinate(c));
    assert_eq!(moved.category, criteria.category);
    assert_eq!(moved.name_filter, criteria.name_filter);
    assert_eq!(moved.location.coordinate(), Some(c));
}
