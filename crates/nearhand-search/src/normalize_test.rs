use super::*;

fn rows(json: serde_json::Value) -> Vec<WireProvider> {
    serde_json::from_value(json).unwrap()
}

// -----------------------------------------------------------------------
// normalize_provider
// -----------------------------------------------------------------------

#[test]
fn nested_row_maps_account_and_service() {
    let wire = rows(serde_json::json!([{
        "id": 1,
        "user": {
            "username": "John's Plumbing",
            "location": "Springfield, IL",
            "latitude": 39.7817,
            "longitude": -89.6501,
            "rating": 4.2,
            "reviewCount": 18
        },
        "service": { "category": "Home Repairs", "name": "Plumbing", "subject": "Plumbing" }
    }]));
    let record = normalize_provider(wire.into_iter().next().unwrap());
    assert_eq!(record.id, 1);
    assert_eq!(record.username, "John's Plumbing");
    assert_eq!(record.location.as_deref(), Some("Springfield, IL"));
    assert!(record.coordinate.is_some());
    assert_eq!(record.review_count, Some(18));
    assert_eq!(record.service.unwrap().category, "Home Repairs");
    assert!(record.additional_services.is_empty());
}

#[test]
fn out_of_range_coordinate_becomes_none() {
    let wire = rows(serde_json::json!([{
        "id": 2,
        "username": "drifter",
        "latitude": 123.0,
        "longitude": 10.0
    }]));
    let record = normalize_provider(wire.into_iter().next().unwrap());
    assert!(record.coordinate.is_none());
}

#[test]
fn half_coordinate_becomes_none() {
    let wire = rows(serde_json::json!([{ "id": 2, "username": "a", "latitude": 40.0 }]));
    let record = normalize_provider(wire.into_iter().next().unwrap());
    assert!(record.coordinate.is_none());
}

#[test]
fn blank_optional_strings_are_dropped() {
    let wire = rows(serde_json::json!([{
        "id": 3,
        "username": "  ann  ",
        "location": "   ",
        "services": [{ "category": "Tutoring", "name": "Math", "level": "", "subject": "Algebra" }]
    }]));
    let record = normalize_provider(wire.into_iter().next().unwrap());
    assert_eq!(record.username, "ann");
    assert!(record.location.is_none());
    let service = record.service.unwrap();
    assert!(service.level.is_none());
    assert_eq!(service.subject.as_deref(), Some("Algebra"));
}

#[test]
fn flat_services_split_into_primary_and_additional() {
    let wire = rows(serde_json::json!([{
        "id": 4,
        "username": "multi",
        "services": [
            { "category": "Tutoring", "name": "Math" },
            { "category": "Home Repairs", "name": "Painting" },
            { "category": "Tutoring", "name": "Math" }
        ]
    }]));
    let record = normalize_provider(wire.into_iter().next().unwrap());
    assert_eq!(record.service.unwrap().name, "Math");
    assert_eq!(record.additional_services.len(), 1, "duplicate service dropped");
    assert_eq!(record.additional_services[0].name, "Painting");
}

// -----------------------------------------------------------------------
// group_listing_rows
// -----------------------------------------------------------------------

#[test]
fn rows_with_same_id_merge_in_first_seen_order() {
    let wire = rows(serde_json::json!([
        { "id": 10, "user": { "username": "ann" }, "service": { "category": "Tutoring", "name": "Math" } },
        { "id": 11, "user": { "username": "bob" }, "service": { "category": "Home Repairs", "name": "Roofing" } },
        { "id": 10, "user": { "username": "ann" }, "service": { "category": "Tutoring", "name": "Physics" } },
        { "id": 10, "user": { "username": "ann" }, "service": { "category": "Tutoring", "name": "Math" } }
    ]));
    let grouped = group_listing_rows(wire);
    let ids: Vec<i64> = grouped.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![10, 11]);

    let names: Vec<&str> = grouped[0].services().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Math", "Physics"]);
}

#[test]
fn merged_row_fills_missing_coordinate() {
    let wire = rows(serde_json::json!([
        { "id": 5, "user": { "username": "c" } },
        { "id": 5, "user": { "username": "c", "lat": 39.0, "lng": -89.0 } }
    ]));
    let grouped = group_listing_rows(wire);
    assert_eq!(grouped.len(), 1);
    assert!(grouped[0].coordinate.is_some());
}

#[test]
fn empty_listing_groups_to_empty() {
    assert!(group_listing_rows(Vec::new()).is_empty());
}

// -----------------------------------------------------------------------
// metadata_center
// -----------------------------------------------------------------------

#[test]
fn metadata_center_requires_both_axes_in_range() {
    let meta: SearchMetadata = serde_json::from_value(serde_json::json!({
        "centerLatitude": 39.78, "centerLongitude": -89.65, "executionTime": "12ms", "hasMore": false
    }))
    .unwrap();
    assert!(metadata_center(&meta).is_some());

    let meta: SearchMetadata =
        serde_json::from_value(serde_json::json!({ "centerLatitude": 39.78 })).unwrap();
    assert!(metadata_center(&meta).is_none());
}
