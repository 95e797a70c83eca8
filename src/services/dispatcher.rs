//! Capability Dispatcher
//!
//! Executes decoded tool invocations against the geodata backends and the
//! result store. Every tool that produces data writes exactly one new store
//! entry.

use std::sync::Arc;

use indexmap::IndexMap;
use tokyo_map_core::{
    bucket_take, build_itinerary, layer_stats, merge_union, rank_by_distance, GeoPoint, Layers,
    UNION_LAYER,
};
use tokyo_map_tools::{
    CategorySearchArgs, ItineraryArgs, MergeArgs, Mode, ModeArgs, ResultType, SearchArgs,
    ToolInvocation, ToolOutput, TripArgs,
};

use crate::services::geodata::{fetch_category, GeodataBackend, Geocoder, SearchFilter};
use crate::services::store::{EntryKind, ResultStore, StoreMeta};
use crate::services::taxonomy::Taxonomy;
use crate::utils::error::{AppError, AppResult};

const MAX_DAYS: u32 = 14;
const MAX_PER_DAY: u32 = 12;

#[derive(Clone)]
pub struct Dispatcher {
    store: ResultStore,
    backend: Arc<dyn GeodataBackend>,
    geocoder: Arc<dyn Geocoder>,
}

impl Dispatcher {
    pub fn new(
        store: ResultStore,
        backend: Arc<dyn GeodataBackend>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        Self {
            store,
            backend,
            geocoder,
        }
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Run one decoded tool call. Range-tier defaults are applied here for
    /// the tools that take a range.
    pub async fn execute(
        &self,
        taxonomy: &Taxonomy,
        invocation: ToolInvocation,
    ) -> AppResult<ToolOutput> {
        tracing::info!("[dispatcher] tool={}", invocation.tool());
        match invocation {
            ToolInvocation::SearchOsm(mut args) => {
                args.apply_range_defaults();
                self.run_search(taxonomy, args).await
            }
            ToolInvocation::SearchCategory { category, args } => {
                self.search_category(taxonomy, category, args).await
            }
            ToolInvocation::MergeSearchResults(args) => self.merge(args),
            ToolInvocation::PlanTrip(mut args) => {
                args.apply_range_defaults();
                self.plan_trip(taxonomy, args).await
            }
            ToolInvocation::CollectTripCandidates(args) => {
                self.collect_candidates(taxonomy, args).await
            }
            ToolInvocation::BuildTripItinerary { candidate_id, args } => {
                self.build_trip_itinerary(&candidate_id, args).await
            }
        }
    }

    /// Re-run a terminal tool directly from an argument bag, as the retry
    /// and review loops do.
    pub async fn run_mode(&self, taxonomy: &Taxonomy, mut args: ModeArgs) -> AppResult<ToolOutput> {
        args.apply_range_defaults();
        match args {
            ModeArgs::Search(args) => self.run_search(taxonomy, args).await,
            ModeArgs::Trip(args) => self.plan_trip(taxonomy, args).await,
        }
    }

    /// Multi-category search. With `union` set and any results, all layers
    /// collapse into one deduplicated `union` layer.
    pub async fn run_search(&self, taxonomy: &Taxonomy, args: SearchArgs) -> AppResult<ToolOutput> {
        let center = self.resolve_center(args.place.as_deref()).await?;
        let filter = search_filter(taxonomy, &args, center);

        let mut layers = Layers::new();
        for category in &args.categories {
            let Some(tags) = taxonomy.category(category) else {
                tracing::warn!("[dispatcher] unknown category: {}", category);
                continue;
            };
            let rows = fetch_category(self.backend.as_ref(), category, tags, &filter).await?;
            layers.insert(category.clone(), rows);
        }

        if args.union && layers.values().any(|rows| !rows.is_empty()) {
            layers = merge_union(layers);
        }

        let stats = layer_stats(&layers);
        let args = ModeArgs::Search(args);
        let entry = self.store.put(layers, StoreMeta::new(args.to_value()));
        Ok(ToolOutput::stored(ResultType::Search, entry.id.clone(), stats, args))
    }

    /// Single-category search; an intermediate result. An unknown category
    /// yields an empty layer under its label.
    pub async fn search_category(
        &self,
        taxonomy: &Taxonomy,
        category: String,
        args: CategorySearchArgs,
    ) -> AppResult<ToolOutput> {
        let base = args.into_search_args(category.clone());
        let rows = match taxonomy.category(&category) {
            Some(tags) => {
                let center = self.resolve_center(base.place.as_deref()).await?;
                let filter = search_filter(taxonomy, &base, center);
                fetch_category(self.backend.as_ref(), &category, tags, &filter).await?
            }
            None => {
                tracing::warn!("[dispatcher] unknown category: {}", category);
                Vec::new()
            }
        };

        let mut layers = Layers::new();
        layers.insert(category, rows);
        let stats = layer_stats(&layers);
        let args = ModeArgs::Search(base);
        let entry = self.store.put(
            layers,
            StoreMeta::new(args.to_value()).kind(EntryKind::CategorySearch),
        );
        Ok(ToolOutput::stored(ResultType::Category, entry.id.clone(), stats, args))
    }

    pub fn merge(&self, args: MergeArgs) -> AppResult<ToolOutput> {
        let entry = self.store.merge(&args.store_ids, args.union)?;
        let merged_args = ModeArgs::from_value(Mode::Search, entry.meta.args.clone())?;
        Ok(ToolOutput::stored(
            ResultType::Search,
            entry.id.clone(),
            layer_stats(&entry.layers),
            merged_args,
        ))
    }

    /// Collect ranked candidates per interest without scheduling them.
    pub async fn collect_candidates(
        &self,
        taxonomy: &Taxonomy,
        mut args: TripArgs,
    ) -> AppResult<ToolOutput> {
        args.apply_range_defaults();
        let (center, buckets) = self.gather_candidates(taxonomy, &args).await?;

        let stats = layer_stats(&buckets);
        let place = args.place.clone();
        let args = ModeArgs::Trip(args);
        let entry = self.store.put(
            buckets,
            StoreMeta::new(args.to_value())
                .kind(EntryKind::TripCandidates)
                .center(center)
                .place(place),
        );
        Ok(ToolOutput::candidates(entry.id.clone(), stats, args))
    }

    /// Schedule previously collected candidates.
    pub async fn build_trip_itinerary(
        &self,
        candidate_id: &str,
        args: ItineraryArgs,
    ) -> AppResult<ToolOutput> {
        let entry = self.store.get(candidate_id)?;
        let meta = &entry.meta;
        let mut trip: TripArgs = serde_json::from_value(meta.args.clone()).unwrap_or_default();

        let place = args
            .place
            .clone()
            .or_else(|| meta.place.clone())
            .or_else(|| trip.place.clone());
        let center = match meta.center {
            Some(center) => center,
            None => self
                .resolve_center(place.as_deref())
                .await?
                .ok_or_else(|| AppError::geocode_failed("center not found for itinerary"))?,
        };

        let days = args
            .days
            .or(trip.days)
            .filter(|d| *d > 0)
            .unwrap_or(1)
            .clamp(1, MAX_DAYS);
        let per_day = args
            .per_day
            .or(trip.per_day)
            .filter(|p| *p > 0)
            .unwrap_or(6)
            .clamp(1, MAX_PER_DAY);
        let pace = args.pace.or(trip.pace).unwrap_or_default();

        let built = build_itinerary(place.as_deref(), center, &entry.layers, days, per_day, pace);

        trip.place = place;
        trip.days = Some(days);
        trip.per_day = Some(per_day);
        trip.pace = Some(pace);
        if args.start_date.is_some() {
            trip.start_date = args.start_date;
        }

        let stats = trip_stats(days, per_day, built.spots());
        let trip = ModeArgs::Trip(trip);
        let mut layers = Layers::new();
        layers.insert(UNION_LAYER.to_string(), built.union);
        let stored = self.store.put(
            layers,
            StoreMeta::new(trip.to_value())
                .kind(EntryKind::Trip)
                .source_candidate_id(candidate_id),
        );
        Ok(ToolOutput::stored(ResultType::Trip, stored.id.clone(), stats, trip).with_itinerary(built.days))
    }

    /// Collect and schedule in one call.
    pub async fn plan_trip(&self, taxonomy: &Taxonomy, mut args: TripArgs) -> AppResult<ToolOutput> {
        args.normalize();
        let (center, buckets) = self.gather_candidates(taxonomy, &args).await?;
        let days = args.effective_days();
        let per_day = args.effective_per_day();

        let built = build_itinerary(
            args.place.as_deref(),
            center,
            &buckets,
            days,
            per_day,
            args.effective_pace(),
        );

        let stats = trip_stats(days, per_day, built.spots());
        let args = ModeArgs::Trip(args);
        let mut layers = Layers::new();
        layers.insert(UNION_LAYER.to_string(), built.union);
        let entry = self
            .store
            .put(layers, StoreMeta::new(args.to_value()).kind(EntryKind::Trip));
        Ok(ToolOutput::stored(ResultType::Trip, entry.id.clone(), stats, args).with_itinerary(built.days))
    }

    /// Geocode the trip origin and build one ranked, truncated bucket per
    /// known interest.
    async fn gather_candidates(
        &self,
        taxonomy: &Taxonomy,
        args: &TripArgs,
    ) -> AppResult<(GeoPoint, Layers)> {
        let place = args.place.as_deref().unwrap_or_default();
        let center = self
            .resolve_center(Some(place))
            .await?
            .ok_or_else(|| AppError::geocode_failed(place))?;

        let interests: Vec<&String> = args
            .interests
            .iter()
            .filter(|c| {
                let known = taxonomy.has_category(c);
                if !known {
                    tracing::warn!("[dispatcher] dropping unknown interest: {}", c);
                }
                known
            })
            .collect();

        let filter = SearchFilter {
            brand_pattern: None,
            open_24h: args.open_24h,
            wheelchair: args.wheelchair,
            center: Some(center),
            radius_km: Some(args.effective_radius_km()),
            limit: args.effective_limit(),
        };
        let days = args.effective_days();
        let per_day = args.effective_per_day();

        let mut buckets = Layers::new();
        for interest in &interests {
            let Some(tags) = taxonomy.category(interest) else {
                continue;
            };
            let rows = fetch_category(self.backend.as_ref(), interest, tags, &filter).await?;
            let mut ranked = rank_by_distance(rows, &center);
            ranked.truncate(bucket_take(ranked.len(), days, per_day, interests.len()));
            buckets.insert((*interest).clone(), ranked);
        }
        Ok((center, buckets))
    }

    /// `Ok(None)` for no place or an unknown place.
    async fn resolve_center(&self, place: Option<&str>) -> AppResult<Option<GeoPoint>> {
        let Some(place) = place.map(str::trim).filter(|p| !p.is_empty()) else {
            return Ok(None);
        };
        let center = self.geocoder.geocode(place).await?;
        if center.is_none() {
            tracing::warn!("[dispatcher] geocode returned nothing for {}", place);
        }
        Ok(center)
    }
}

fn search_filter(taxonomy: &Taxonomy, args: &SearchArgs, center: Option<GeoPoint>) -> SearchFilter {
    SearchFilter {
        brand_pattern: args
            .brand
            .as_deref()
            .and_then(|b| taxonomy.resolve_brand(b)),
        open_24h: args.open_24h,
        wheelchair: args.wheelchair,
        center,
        radius_km: args.radius_km,
        limit: args.effective_limit(),
    }
}

fn trip_stats(days: u32, per_day: u32, spots: usize) -> IndexMap<String, usize> {
    IndexMap::from([
        ("days".to_string(), days as usize),
        ("per_day".to_string(), per_day as usize),
        ("spots".to_string(), spots),
    ])
}
