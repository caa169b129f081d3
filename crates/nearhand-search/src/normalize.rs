//! Normalization from backend wire shapes to [`nearhand_core::ProviderRecord`].
//!
//! Coordinates that are missing or out of range become `None` rather than an
//! error: the provider stays searchable by text, it just never matches a
//! proximity filter.

use std::collections::HashMap;

use nearhand_core::{Coordinate, ProviderRecord, ServiceSummary};

use crate::types::{SearchMetadata, WireAccount, WireProvider, WireService};

fn normalize_service(service: WireService) -> ServiceSummary {
    ServiceSummary {
        category: service.category.trim().to_owned(),
        name: service.name.trim().to_owned(),
        subject: service.subject.filter(|s| !s.trim().is_empty()),
        level: service.level.filter(|s| !s.trim().is_empty()),
        description: service.description.unwrap_or_default(),
        pricing_type: service.pricing_type.filter(|s| !s.trim().is_empty()),
        price: service.price.filter(|p| p.is_finite()),
    }
}

fn account_coordinate(id: i64, account: &WireAccount) -> Option<Coordinate> {
    let (Some(lat), Some(lon)) = (account.latitude, account.longitude) else {
        return None;
    };
    match Coordinate::new(lat, lon) {
        Ok(c) => Some(c),
        Err(e) => {
            tracing::debug!(provider_id = id, error = %e, "dropping invalid provider coordinate");
            None
        }
    }
}

/// Converts one wire provider into a [`ProviderRecord`]. `service` (if any)
/// is taken as the primary service, followed by the `services` array.
#[must_use]
pub fn normalize_provider(wire: WireProvider) -> ProviderRecord {
    let (id, account, service, services, distance) = match wire {
        WireProvider::Nested(row) => (row.id, row.user, row.service, row.services, row.distance),
        WireProvider::Flat(flat) => (
            flat.id,
            flat.account,
            flat.service,
            flat.services,
            flat.distance,
        ),
    };

    let coordinate = account_coordinate(id, &account);
    let mut all: Vec<ServiceSummary> = service
        .into_iter()
        .chain(services)
        .map(normalize_service)
        .collect();
    dedupe_services(&mut all);
    let mut all = all.into_iter();
    let primary = all.next();

    ProviderRecord {
        id,
        username: account.username.trim().to_owned(),
        location: account.location.filter(|l| !l.trim().is_empty()),
        coordinate,
        rating: account.rating.filter(|r| r.is_finite()),
        review_count: account.review_count,
        service: primary,
        additional_services: all.collect(),
        distance: distance.filter(|d| d.is_finite()),
    }
}

fn dedupe_services(services: &mut Vec<ServiceSummary>) {
    let mut kept: Vec<ServiceSummary> = Vec::with_capacity(services.len());
    for s in services.drain(..) {
        if !kept.contains(&s) {
            kept.push(s);
        }
    }
    *services = kept;
}

/// Normalizes listing rows and merges rows sharing an `id` into one record,
/// keeping first-seen order. Account fields come from the first row.
#[must_use]
pub fn group_listing_rows(rows: Vec<WireProvider>) -> Vec<ProviderRecord> {
    let mut grouped: Vec<ProviderRecord> = Vec::new();
    let mut index_by_id: HashMap<i64, usize> = HashMap::new();

    for record in rows.into_iter().map(normalize_provider) {
        match index_by_id.get(&record.id) {
            Some(&idx) => {
                let existing = &mut grouped[idx];
                let mut services: Vec<ServiceSummary> = existing
                    .service
                    .take()
                    .into_iter()
                    .chain(existing.additional_services.drain(..))
                    .chain(record.service)
                    .chain(record.additional_services)
                    .collect();
                dedupe_services(&mut services);
                let mut services = services.into_iter();
                existing.service = services.next();
                existing.additional_services = services.collect();
                if existing.coordinate.is_none() {
                    existing.coordinate = record.coordinate;
                }
            }
            None => {
                index_by_id.insert(record.id, grouped.len());
                grouped.push(record);
            }
        }
    }

    grouped
}

/// Search center echoed by the server, when present and valid.
#[must_use]
pub fn metadata_center(metadata: &SearchMetadata) -> Option<Coordinate> {
    let (Some(lat), Some(lon)) = (metadata.center_latitude, metadata.center_longitude) else {
        return None;
    };
    Coordinate::new(lat, lon).ok()
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
