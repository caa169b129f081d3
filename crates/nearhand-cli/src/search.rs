//! Command handlers: wire config into the search collaborators and print
//! results.

use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use nearhand_core::{AppConfig, Coordinate, LocationQuery, ProviderRecord, SearchCriteria};
use nearhand_search::{
    ApiClient, FilterPipeline, FixedPosition, GeoResolver, NominatimGeocoder, ProviderCache,
    ProviderDirectory, ProximityMatcher, SearchOptions, SearchOrchestrator, SearchOutcome,
    SearchResult, SearchWarning,
};

/// Search-box fields, one flag per URL query parameter.
#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Service category, e.g. "Tutoring" or "Home Repairs"
    #[arg(long)]
    pub service_type: Option<String>,
    /// Place name, "online", or "Near Lat: <lat>, Lon: <lon>"
    #[arg(long)]
    pub location: Option<String>,
    /// Search around this latitude (needs --here-lon); overrides --location
    #[arg(long, allow_negative_numbers = true, requires = "here_lon")]
    pub here_lat: Option<f64>,
    #[arg(long, allow_negative_numbers = true, requires = "here_lat")]
    pub here_lon: Option<f64>,
    /// Education level (tutoring categories only)
    #[arg(long)]
    pub level: Option<String>,
    /// Subject (tutoring categories only)
    #[arg(long)]
    pub subject: Option<String>,
    /// Home-repair sub-category; "all" means any
    #[arg(long)]
    pub sub_category: Option<String>,
    /// Provider or tutor name contains this text
    #[arg(long)]
    pub name: Option<String>,
    /// highToLow, lowToHigh or none
    #[arg(long)]
    pub rating_sort: Option<String>,
    #[arg(long)]
    pub price_min: Option<f64>,
    #[arg(long)]
    pub price_max: Option<f64>,
    #[arg(long)]
    pub pricing_type: Option<String>,
    #[arg(long)]
    pub min_rating: Option<f64>,
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

impl SearchArgs {
    /// The flags as search-box query parameters. The name goes under both
    /// name keys; criteria parsing keeps the one that fits the category.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let text = [
            ("serviceType", &self.service_type),
            ("location", &self.location),
            ("level", &self.level),
            ("subject", &self.subject),
            ("homeRepairSubCategory", &self.sub_category),
            ("tutorNameFilter", &self.name),
            ("providerNameFilter", &self.name),
            ("ratingSortOrder", &self.rating_sort),
            ("pricingType", &self.pricing_type),
        ];
        let numbers = [
            ("priceMin", self.price_min),
            ("priceMax", self.price_max),
            ("minRating", self.min_rating),
        ];
        text.into_iter()
            .filter_map(|(k, v)| v.clone().map(|v| (k, v)))
            .chain(
                numbers
                    .into_iter()
                    .filter_map(|(k, v)| v.map(|v| (k, v.to_string()))),
            )
            .collect()
    }

    /// Parses the flags into criteria.
    ///
    /// # Errors
    ///
    /// Returns an error for an out-of-range coordinate in `--location` or
    /// `--here-lat/--here-lon`.
    pub fn to_criteria(&self) -> anyhow::Result<SearchCriteria> {
        let criteria = SearchCriteria::from_query_pairs(self.query_pairs())?;
        match (self.here_lat, self.here_lon) {
            (Some(lat), Some(lon)) => {
                let here = Coordinate::new(lat, lon)?;
                Ok(criteria.with_location(LocationQuery::Coordinate(here)))
            }
            _ => Ok(criteria),
        }
    }
}

fn build_resolver(config: &AppConfig) -> anyhow::Result<GeoResolver> {
    let mut resolver = GeoResolver::new().with_geolocation_timeout(config.geolocation_timeout());
    if let Some(geocoder) =
        NominatimGeocoder::from_config(config).context("failed to build geocoding client")?
    {
        resolver = resolver.with_geocoder(Arc::new(geocoder));
    }
    Ok(resolver)
}

fn build_orchestrator(config: &AppConfig) -> anyhow::Result<SearchOrchestrator> {
    let client = ApiClient::from_config(config).context("failed to build API client")?;
    let directory: Arc<dyn ProviderDirectory> = Arc::new(client);
    let cache = Arc::new(ProviderCache::new(Arc::clone(&directory)));
    let pipeline = FilterPipeline::new(ProximityMatcher::new(config.proximity_threshold_degrees));

    Ok(
        SearchOrchestrator::new(build_resolver(config)?, directory, cache, pipeline)
            .with_options(SearchOptions::from_config(config)),
    )
}

pub(crate) async fn run_search(config: &AppConfig, args: &SearchArgs) -> anyhow::Result<()> {
    let criteria = args.to_criteria()?;
    tracing::debug!(?criteria, "search criteria parsed");

    let orchestrator = build_orchestrator(config)?;
    match orchestrator.submit(criteria).await? {
        SearchOutcome::Applied(result) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", render_result(&result));
            }
        }
        SearchOutcome::Superseded => {
            tracing::warn!("search superseded before it completed");
        }
    }
    Ok(())
}

pub(crate) async fn run_providers(config: &AppConfig, json: bool) -> anyhow::Result<()> {
    let orchestrator = build_orchestrator(config)?;
    let providers = orchestrator.browse_all().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&providers)?);
    } else {
        print!("{}", render_table(&providers));
        println!("{} provider(s)", providers.len());
    }
    Ok(())
}

pub(crate) async fn run_locate(config: &AppConfig, lat: f64, lon: f64) -> anyhow::Result<()> {
    let position = Coordinate::new(lat, lon)?;
    let resolver = build_resolver(config)?.with_position_source(Arc::new(FixedPosition(position)));
    let resolved = resolver.resolve_current_position().await?;
    println!("{}", resolved.label);
    println!("{}", resolved.coordinate.near_label());
    Ok(())
}

pub(crate) async fn run_geocode(config: &AppConfig, query: &str) -> anyhow::Result<()> {
    let resolver = build_resolver(config)?;
    if !resolver.can_forward_geocode() {
        anyhow::bail!("geocoding is disabled (NEARHAND_GEOCODER_BASE_URL=off)");
    }
    let hit = resolver.forward_geocode(query).await?;
    println!("{}", hit.display_label);
    println!("{}", hit.coordinate.near_label());
    Ok(())
}

pub(crate) fn format_provider(provider: &ProviderRecord) -> String {
    let rating = provider
        .rating
        .map_or_else(|| "  -".to_owned(), |r| format!("{r:.1}"));
    let category = provider
        .service
        .as_ref()
        .map_or("-", |s| s.category.as_str());
    let location = provider.location.as_deref().unwrap_or("-");
    let mut line = format!(
        "{:>6}  {:<28}  {:>4}  {:<14}  {}",
        provider.id, provider.username, rating, category, location
    );
    if let Some(distance) = provider.distance {
        line.push_str(&format!("  ({distance:.1} away)"));
    }
    line
}

pub(crate) fn render_table(providers: &[ProviderRecord]) -> String {
    providers
        .iter()
        .map(|p| format_provider(p) + "\n")
        .collect()
}

pub(crate) fn render_result(result: &SearchResult) -> String {
    let mut out = render_table(&result.providers);
    if result.providers.is_empty() {
        out.push_str("no providers matched\n");
    }
    let radius = result
        .search_radius
        .map(|r| format!(" within {r}"))
        .unwrap_or_default();
    let more = if result.has_more { " (more available)" } else { "" };
    out.push_str(&format!(
        "{} of {} result(s){radius}{more}\n",
        result.providers.len(),
        result.total
    ));
    if let Some(SearchWarning::StaleCache { reason }) = &result.warning {
        out.push_str(&format!("warning: showing cached providers ({reason})\n"));
    }
    out
}
